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
use crate::authz::{Action, Ownership, Resource, resolve};
use crate::server::AppState;
use crate::server::dto::{CreateProgramManagementRequest, PaginationParams};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreInsertExt, StoreOptionExt,
    StoreResultExt, paginate, require_allowed,
};
use crate::types::ProgramManagement;

pub async fn list_program_managements(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let cursor = params.cursor.as_deref().unwrap_or("");

    let links = if auth.scope.is_admin {
        state
            .store
            .list_program_managements(cursor, DEFAULT_PAGE_SIZE + 1)
            .api_err("Failed to list program managements")?
    } else {
        let mut program_ids: Vec<String> = auth.scope.programs.keys().cloned().collect();
        program_ids.sort();
        state
            .store
            .list_program_managements_in_programs(&program_ids, cursor, DEFAULT_PAGE_SIZE + 1)
            .api_err("Failed to list program managements")?
    };

    let (links, next_cursor, has_more) =
        paginate(links, DEFAULT_PAGE_SIZE as usize, |link| link.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(links, next_cursor, has_more)))
}

pub async fn create_program_management(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProgramManagementRequest>,
) -> impl IntoResponse {
    // Handing out approval rights is itself approval-gated.
    let ownership = if req.is_thesis_approver {
        Ownership::ProgramApproval(req.program_id.clone())
    } else {
        Ownership::Program(req.program_id.clone())
    };

    require_allowed(resolve(
        &auth.scope,
        Action::Create,
        Resource::ProgramManagement,
        &ownership,
    ))?;

    let program = state
        .store
        .get_program(&req.program_id)
        .api_err("Failed to get program")?
        .or_not_found("Program not found")?;

    let user = state
        .store
        .get_user(&req.user_id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    let link = ProgramManagement {
        id: Uuid::new_v4().to_string(),
        program_id: program.id,
        user_id: user.id,
        is_thesis_approver: req.is_thesis_approver,
        created_at: Utc::now(),
    };

    state.store.create_program_management(&link).api_err_conflict(
        "User already manages this program",
        "Failed to create program management",
    )?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(link))))
}

pub async fn delete_program_management(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let link = state
        .store
        .get_program_management(&id)
        .api_err("Failed to get program management")?
        .or_not_found("Program management not found")?;

    require_allowed(resolve(
        &auth.scope,
        Action::Delete,
        Resource::ProgramManagement,
        &Ownership::Program(link.program_id.clone()),
    ))?;

    state
        .store
        .delete_program_management(&link.id)
        .api_err("Failed to delete program management")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
