use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::auth::RequireAuth;
use crate::authz::{Action, Ownership, Resource, resolve};
use crate::server::AppState;
use crate::server::dto::ListUsersParams;
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate, require_allowed,
};

pub async fn me(auth: RequireAuth) -> impl IntoResponse {
    Json(ApiResponse::success(auth.user))
}

/// User search for supervisor and grader pickers; open to all employees.
/// Department filtering is restricted to admins and that department's admins.
pub async fn list_users(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListUsersParams>,
) -> impl IntoResponse {
    if let Some(department_id) = &params.department {
        if !auth.scope.is_admin && !auth.scope.manages_department(department_id) {
            return Err(ApiError::forbidden("Insufficient department permissions"));
        }
    }

    let cursor = params.cursor.as_deref().unwrap_or("");
    let users = state
        .store
        .list_users(
            params.search.as_deref(),
            params.department.as_deref(),
            cursor,
            DEFAULT_PAGE_SIZE + 1,
        )
        .api_err("Failed to list users")?;

    let (users, next_cursor, has_more) =
        paginate(users, DEFAULT_PAGE_SIZE as usize, |u| u.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(users, next_cursor, has_more)))
}

pub async fn get_user(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user = state
        .store
        .get_user(&id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    require_allowed(resolve(
        &auth.scope,
        Action::Read,
        Resource::User,
        &Ownership::User(user.id.clone()),
    ))?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}
