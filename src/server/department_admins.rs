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
use crate::server::dto::{CreateDepartmentAdminRequest, PaginationParams};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreInsertExt, StoreOptionExt,
    StoreResultExt, paginate, require_allowed,
};
use crate::types::DepartmentAdmin;

pub async fn list_department_admins(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let cursor = params.cursor.as_deref().unwrap_or("");

    let links = if auth.scope.is_admin {
        state
            .store
            .list_department_admins(cursor, DEFAULT_PAGE_SIZE + 1)
            .api_err("Failed to list department admins")?
    } else {
        let mut department_ids: Vec<String> = auth.scope.departments.iter().cloned().collect();
        department_ids.sort();
        state
            .store
            .list_department_admins_in_departments(&department_ids, cursor, DEFAULT_PAGE_SIZE + 1)
            .api_err("Failed to list department admins")?
    };

    let (links, next_cursor, has_more) =
        paginate(links, DEFAULT_PAGE_SIZE as usize, |link| link.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(links, next_cursor, has_more)))
}

pub async fn create_department_admin(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDepartmentAdminRequest>,
) -> impl IntoResponse {
    require_allowed(resolve(
        &auth.scope,
        Action::Create,
        Resource::DepartmentAdmin,
        &Ownership::Department(req.department_id.clone()),
    ))?;

    let department = state
        .store
        .get_department(&req.department_id)
        .api_err("Failed to get department")?
        .or_not_found("Department not found")?;

    let user = state
        .store
        .get_user(&req.user_id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    let link = DepartmentAdmin {
        id: Uuid::new_v4().to_string(),
        department_id: department.id,
        user_id: user.id,
        created_at: Utc::now(),
    };

    state.store.create_department_admin(&link).api_err_conflict(
        "User is already an admin of this department",
        "Failed to create department admin",
    )?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(link))))
}

pub async fn delete_department_admin(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let link = state
        .store
        .get_department_admin(&id)
        .api_err("Failed to get department admin")?
        .or_not_found("Department admin not found")?;

    // Out-of-scope links answer 404, indistinguishable from absent rows.
    require_allowed(resolve(
        &auth.scope,
        Action::Delete,
        Resource::DepartmentAdmin,
        &Ownership::Department(link.department_id.clone()),
    ))?;

    state
        .store
        .delete_department_admin(&link.id)
        .api_err("Failed to delete department admin")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
