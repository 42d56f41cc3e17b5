use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{delete, get, post},
};

use super::{department_admins, departments, login, program_managements, programs, theses, users};
use crate::config::ServerConfig;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: ServerConfig,
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login::login))
        .route("/logout", post(login::logout))
        .route("/users/me", get(users::me))
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user))
        .route(
            "/departments",
            get(departments::list_departments).post(departments::create_department),
        )
        .route(
            "/departments/{id}",
            get(departments::get_department).delete(departments::delete_department),
        )
        .route(
            "/department-admins",
            get(department_admins::list_department_admins)
                .post(department_admins::create_department_admin),
        )
        .route(
            "/department-admins/{id}",
            delete(department_admins::delete_department_admin),
        )
        .route(
            "/programs",
            get(programs::list_programs).post(programs::create_program),
        )
        .route(
            "/programs/{id}",
            get(programs::get_program).patch(programs::update_program),
        )
        .route(
            "/programs/{id}/study-tracks",
            get(programs::list_program_study_tracks),
        )
        .route(
            "/program-managements",
            get(program_managements::list_program_managements)
                .post(program_managements::create_program_management),
        )
        .route(
            "/program-managements/{id}",
            delete(program_managements::delete_program_management),
        )
        .route(
            "/theses",
            get(theses::list_theses).post(theses::create_thesis),
        )
        .route(
            "/theses/{id}",
            get(theses::get_thesis)
                .put(theses::update_thesis)
                .delete(theses::delete_thesis),
        )
        .route(
            "/theses/{id}/supervisions",
            get(theses::list_thesis_supervisions),
        )
        .route("/theses/{id}/graders", get(theses::list_thesis_graders))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
