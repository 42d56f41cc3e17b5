use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::helpers::{
    SessionValidationError, extract_token_from_header, load_access_scope, validate_session,
};
use crate::authz::AccessScope;
use crate::server::AppState;
use crate::types::{Session, User};

/// Extractor that requires a valid session. Carries the caller's resolved
/// authorization scope so handlers never rebuild it.
pub struct RequireAuth {
    pub session: Session,
    pub user: User,
    pub scope: AccessScope,
}

/// Extractor that additionally requires the admin flag.
pub struct RequireAdmin {
    pub session: Session,
    pub user: User,
}

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidSession,
    SessionExpired,
    NotAdmin,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidSession => (StatusCode::UNAUTHORIZED, "Invalid session"),
            AuthError::SessionExpired => (StatusCode::UNAUTHORIZED, "Session expired"),
            AuthError::NotAdmin => (StatusCode::FORBIDDEN, "Admin access required"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                "WWW-Authenticate",
                "Bearer realm=\"prethesis\"".parse().unwrap(),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let validated = extract_and_validate_session(parts, state)?;

        let scope = load_access_scope(state.store.as_ref(), &validated.user)
            .map_err(|_| AuthError::InternalError)?;

        Ok(RequireAuth {
            session: validated.session,
            user: validated.user,
            scope,
        })
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let validated = extract_and_validate_session(parts, state)?;

        if !validated.user.is_admin {
            return Err(AuthError::NotAdmin);
        }

        Ok(RequireAdmin {
            session: validated.session,
            user: validated.user,
        })
    }
}

fn extract_and_validate_session(
    parts: &mut Parts,
    state: &Arc<AppState>,
) -> Result<super::helpers::ValidatedSession, AuthError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let raw_token = extract_token_from_header(auth_header)
        .map_err(|e| match e {
            SessionValidationError::InvalidScheme => AuthError::InvalidScheme,
            SessionValidationError::InvalidToken => AuthError::InvalidSession,
            _ => AuthError::InternalError,
        })?
        .ok_or(AuthError::MissingAuth)?;

    validate_session(state, &raw_token).map_err(|e| match e {
        SessionValidationError::InvalidScheme => AuthError::InvalidScheme,
        SessionValidationError::InvalidToken => AuthError::InvalidSession,
        SessionValidationError::SessionExpired => AuthError::SessionExpired,
        SessionValidationError::InternalError => AuthError::InternalError,
    })
}
