use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAuth;
use crate::authz::{Action, ListFilter, Ownership, Resource, list_filter, resolve};
use crate::server::AppState;
use crate::server::dto::{CreateThesisRequest, ListThesesParams, UpdateThesisRequest};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate, require_allowed,
};
use crate::server::validation::{validate_graders, validate_supervisions, validate_topic};
use crate::types::{Grader, Supervision, Thesis, ThesisStatus, ThesisWithRelations};

/// Loads the thesis row's ownership for the policy table: its program plus
/// the supervisors attached to it.
fn thesis_ownership(
    state: &AppState,
    thesis: &Thesis,
) -> Result<Ownership, ApiError> {
    let supervisor_ids = state
        .store
        .list_thesis_supervisions(&thesis.id)
        .api_err("Failed to list supervisions")?
        .into_iter()
        .map(|s| s.user_id)
        .collect();

    Ok(Ownership::Thesis {
        program_id: thesis.program_id.clone(),
        supervisor_ids,
    })
}

fn with_relations(state: &AppState, thesis: Thesis) -> Result<ThesisWithRelations, ApiError> {
    let supervisions = state
        .store
        .list_thesis_supervisions(&thesis.id)
        .api_err("Failed to list supervisions")?;
    let graders = state
        .store
        .list_thesis_graders(&thesis.id)
        .api_err("Failed to list graders")?;
    Ok(ThesisWithRelations {
        thesis,
        supervisions,
        graders,
    })
}

pub async fn list_theses(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListThesesParams>,
) -> impl IntoResponse {
    let cursor = params.cursor.as_deref().unwrap_or("");

    let theses = match list_filter(&auth.scope, Resource::Thesis) {
        ListFilter::All => state
            .store
            .list_theses(params.status, cursor, DEFAULT_PAGE_SIZE + 1)
            .api_err("Failed to list theses")?,
        ListFilter::ProgramsOrSupervised { programs, user_id } => {
            let mut program_ids: Vec<String> = programs.into_iter().collect();
            program_ids.sort();

            let mut rows = state
                .store
                .list_theses_in_programs(&program_ids, params.status, cursor, DEFAULT_PAGE_SIZE + 1)
                .api_err("Failed to list theses")?;
            let supervised = state
                .store
                .list_theses_supervised_by(&user_id, params.status, cursor, DEFAULT_PAGE_SIZE + 1)
                .api_err("Failed to list theses")?;

            rows.extend(supervised);
            rows.sort_by(|a, b| a.id.cmp(&b.id));
            rows.dedup_by(|a, b| a.id == b.id);
            rows
        }
        ListFilter::Departments(_) => Vec::new(),
    };

    let (theses, next_cursor, has_more) =
        paginate(theses, DEFAULT_PAGE_SIZE as usize, |t| t.id.clone());

    let theses = theses
        .into_iter()
        .map(|t| with_relations(&state, t))
        .collect::<Result<Vec<_>, _>>()?;

    Ok::<_, ApiError>(Json(PaginatedResponse::new(theses, next_cursor, has_more)))
}

pub async fn get_thesis(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let thesis = state
        .store
        .get_thesis(&id)
        .api_err("Failed to get thesis")?
        .or_not_found("Thesis not found")?;

    let ownership = thesis_ownership(&state, &thesis)?;
    require_allowed(resolve(&auth.scope, Action::Read, Resource::Thesis, &ownership))?;

    Ok::<_, ApiError>(Json(ApiResponse::success(with_relations(&state, thesis)?)))
}

pub async fn create_thesis(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateThesisRequest>,
) -> impl IntoResponse {
    require_allowed(resolve(
        &auth.scope,
        Action::Create,
        Resource::Thesis,
        &Ownership::Program(req.program_id.clone()),
    ))?;

    validate_topic(&req.topic)?;
    validate_supervisions(&req.supervisions)?;
    validate_graders(&req.graders)?;

    let program = state
        .store
        .get_program(&req.program_id)
        .api_err("Failed to get program")?
        .or_not_found("Program not found")?;

    if let Some(track_id) = &req.study_track_id {
        let track = state
            .store
            .get_study_track(track_id)
            .api_err("Failed to get study track")?
            .or_not_found("Study track not found")?;
        if track.program_id != program.id {
            return Err(ApiError::bad_request(
                "Study track does not belong to the program",
            ));
        }
    }

    for input in req.supervisions.iter().map(|s| &s.user_id) {
        state
            .store
            .get_user(input)
            .api_err("Failed to get user")?
            .or_not_found("Supervisor not found")?;
    }
    for input in req.graders.iter().map(|g| &g.user_id) {
        state
            .store
            .get_user(input)
            .api_err("Failed to get user")?
            .or_not_found("Grader not found")?;
    }

    let now = Utc::now();
    let thesis = Thesis {
        id: Uuid::new_v4().to_string(),
        program_id: program.id,
        study_track_id: req.study_track_id,
        topic: req.topic,
        status: req.status.unwrap_or(ThesisStatus::Planning),
        started_date: req.started_date,
        target_date: req.target_date,
        ethesis_date: req.ethesis_date,
        created_at: now,
        updated_at: now,
    };

    state
        .store
        .create_thesis(&thesis)
        .api_err("Failed to create thesis")?;

    let supervisions: Vec<Supervision> = req
        .supervisions
        .into_iter()
        .map(|s| Supervision {
            thesis_id: thesis.id.clone(),
            user_id: s.user_id,
            percentage: s.percentage,
            is_primary_supervisor: s.is_primary_supervisor,
        })
        .collect();
    state
        .store
        .set_thesis_supervisions(&thesis.id, &supervisions)
        .api_err("Failed to store supervisions")?;

    let graders: Vec<Grader> = req
        .graders
        .into_iter()
        .map(|g| Grader {
            thesis_id: thesis.id.clone(),
            user_id: g.user_id,
            is_primary_grader: g.is_primary_grader,
        })
        .collect();
    state
        .store
        .set_thesis_graders(&thesis.id, &graders)
        .api_err("Failed to store graders")?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(with_relations(&state, thesis)?)),
    ))
}

pub async fn update_thesis(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateThesisRequest>,
) -> impl IntoResponse {
    let mut thesis = state
        .store
        .get_thesis(&id)
        .api_err("Failed to get thesis")?
        .or_not_found("Thesis not found")?;

    let ownership = thesis_ownership(&state, &thesis)?;
    require_allowed(resolve(&auth.scope, Action::Update, Resource::Thesis, &ownership))?;

    if let Some(topic) = req.topic {
        validate_topic(&topic)?;
        thesis.topic = topic;
    }
    if let Some(program_id) = req.program_id {
        state
            .store
            .get_program(&program_id)
            .api_err("Failed to get program")?
            .or_not_found("Program not found")?;
        thesis.program_id = program_id;
    }
    if let Some(track_id) = req.study_track_id {
        let track = state
            .store
            .get_study_track(&track_id)
            .api_err("Failed to get study track")?
            .or_not_found("Study track not found")?;
        if track.program_id != thesis.program_id {
            return Err(ApiError::bad_request(
                "Study track does not belong to the program",
            ));
        }
        thesis.study_track_id = Some(track_id);
    }
    if let Some(status) = req.status {
        thesis.status = status;
    }
    // Dates are nullable; an explicit null clears them.
    if let Some(started_date) = req.started_date {
        thesis.started_date = started_date;
    }
    if let Some(target_date) = req.target_date {
        thesis.target_date = target_date;
    }
    if let Some(ethesis_date) = req.ethesis_date {
        thesis.ethesis_date = ethesis_date;
    }
    thesis.updated_at = Utc::now();

    state
        .store
        .update_thesis(&thesis)
        .api_err("Failed to update thesis")?;

    if let Some(inputs) = req.supervisions {
        validate_supervisions(&inputs)?;
        let supervisions: Vec<Supervision> = inputs
            .into_iter()
            .map(|s| Supervision {
                thesis_id: thesis.id.clone(),
                user_id: s.user_id,
                percentage: s.percentage,
                is_primary_supervisor: s.is_primary_supervisor,
            })
            .collect();
        state
            .store
            .set_thesis_supervisions(&thesis.id, &supervisions)
            .api_err("Failed to store supervisions")?;
    }

    if let Some(inputs) = req.graders {
        validate_graders(&inputs)?;
        let graders: Vec<Grader> = inputs
            .into_iter()
            .map(|g| Grader {
                thesis_id: thesis.id.clone(),
                user_id: g.user_id,
                is_primary_grader: g.is_primary_grader,
            })
            .collect();
        state
            .store
            .set_thesis_graders(&thesis.id, &graders)
            .api_err("Failed to store graders")?;
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(with_relations(&state, thesis)?)))
}

pub async fn delete_thesis(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let thesis = state
        .store
        .get_thesis(&id)
        .api_err("Failed to get thesis")?
        .or_not_found("Thesis not found")?;

    let ownership = thesis_ownership(&state, &thesis)?;
    require_allowed(resolve(&auth.scope, Action::Delete, Resource::Thesis, &ownership))?;

    state
        .store
        .delete_thesis(&thesis.id)
        .api_err("Failed to delete thesis")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn list_thesis_supervisions(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let thesis = state
        .store
        .get_thesis(&id)
        .api_err("Failed to get thesis")?
        .or_not_found("Thesis not found")?;

    let ownership = thesis_ownership(&state, &thesis)?;
    require_allowed(resolve(&auth.scope, Action::Read, Resource::Thesis, &ownership))?;

    let supervisions = state
        .store
        .list_thesis_supervisions(&thesis.id)
        .api_err("Failed to list supervisions")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(supervisions)))
}

pub async fn list_thesis_graders(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let thesis = state
        .store
        .get_thesis(&id)
        .api_err("Failed to get thesis")?
        .or_not_found("Thesis not found")?;

    let ownership = thesis_ownership(&state, &thesis)?;
    require_allowed(resolve(&auth.scope, Action::Read, Resource::Thesis, &ownership))?;

    let graders = state
        .store
        .list_thesis_graders(&thesis.id)
        .api_err("Failed to list graders")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(graders)))
}
