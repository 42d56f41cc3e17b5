use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{RequireAdmin, RequireAuth};
use crate::server::AppState;
use crate::server::dto::{CreateProgramRequest, ListProgramsParams, UpdateProgramRequest};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::server::validation::validate_localized_name;
use crate::types::Program;

/// Programs are public directory data; every employee can list them.
pub async fn list_programs(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListProgramsParams>,
) -> impl IntoResponse {
    let cursor = params.cursor.as_deref().unwrap_or("");
    let include_disabled = params.include_disabled.unwrap_or(false);

    let programs = state
        .store
        .list_programs(include_disabled, cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list programs")?;

    let (programs, next_cursor, has_more) =
        paginate(programs, DEFAULT_PAGE_SIZE as usize, |p| p.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(programs, next_cursor, has_more)))
}

pub async fn get_program(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let program = state
        .store
        .get_program(&id)
        .api_err("Failed to get program")?
        .or_not_found("Program not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(program)))
}

pub async fn list_program_study_tracks(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let program = state
        .store
        .get_program(&id)
        .api_err("Failed to get program")?
        .or_not_found("Program not found")?;

    let tracks = state
        .store
        .list_program_study_tracks(&program.id)
        .api_err("Failed to list study tracks")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tracks)))
}

/// Programs normally arrive through the directory sync; manual creation
/// exists for deployments without a directory connection.
pub async fn create_program(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProgramRequest>,
) -> impl IntoResponse {
    validate_localized_name(&req.name)?;
    if req.level.trim().is_empty() {
        return Err(ApiError::bad_request("Program level cannot be empty"));
    }

    let now = Utc::now();
    let program = Program {
        id: req.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        name: req.name,
        level: req.level,
        enabled: req.enabled,
        created_at: now,
        updated_at: now,
    };

    if state
        .store
        .get_program(&program.id)
        .api_err("Failed to check program")?
        .is_some()
    {
        return Err(ApiError::conflict("Program already exists"));
    }

    state
        .store
        .upsert_program(&program)
        .api_err("Failed to create program")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(program))))
}

pub async fn update_program(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProgramRequest>,
) -> impl IntoResponse {
    let program = state
        .store
        .get_program(&id)
        .api_err("Failed to get program")?
        .or_not_found("Program not found")?;

    state
        .store
        .set_program_enabled(&program.id, req.enabled)
        .api_err("Failed to update program")?;

    let program = state
        .store
        .get_program(&program.id)
        .api_err("Failed to get program")?
        .or_not_found("Program not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(program)))
}
