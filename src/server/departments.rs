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
use crate::authz::{ListFilter, Resource, list_filter};
use crate::server::AppState;
use crate::server::dto::{CreateDepartmentRequest, ListDepartmentsParams};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::server::validation::validate_localized_name;
use crate::types::Department;

/// Lists departments within the caller's administrative scope. With
/// `include_not_managed=true` every department is returned read-only;
/// admins always see everything.
pub async fn list_departments(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListDepartmentsParams>,
) -> impl IntoResponse {
    let include_not_managed = params.include_not_managed.unwrap_or(false);
    let cursor = params.cursor.as_deref().unwrap_or("");

    let filter = list_filter(&auth.scope, Resource::Department);

    let departments = match (&filter, include_not_managed) {
        (ListFilter::All, _) | (_, true) => state
            .store
            .list_departments(cursor, DEFAULT_PAGE_SIZE + 1)
            .api_err("Failed to list departments")?,
        (ListFilter::Departments(ids), false) => {
            let mut ids: Vec<String> = ids.iter().cloned().collect();
            ids.sort();
            state
                .store
                .list_departments_by_ids(&ids)
                .api_err("Failed to list departments")?
        }
        _ => Vec::new(),
    };

    let (departments, next_cursor, has_more) =
        paginate(departments, DEFAULT_PAGE_SIZE as usize, |d| d.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(
        departments,
        next_cursor,
        has_more,
    )))
}

pub async fn get_department(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let department = state
        .store
        .get_department(&id)
        .api_err("Failed to get department")?
        .or_not_found("Department not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(department)))
}

pub async fn create_department(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDepartmentRequest>,
) -> impl IntoResponse {
    validate_localized_name(&req.name)?;

    let department = Department {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        created_at: Utc::now(),
    };

    state
        .store
        .create_department(&department)
        .api_err("Failed to create department")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(department))))
}

pub async fn delete_department(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let department = state
        .store
        .get_department(&id)
        .api_err("Failed to get department")?
        .or_not_found("Department not found")?;

    state
        .store
        .delete_department(&department.id)
        .api_err("Failed to delete department")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
