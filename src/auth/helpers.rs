use std::sync::Arc;

use chrono::Utc;

use super::{SessionTokenGenerator, parse_token};
use crate::authz::AccessScope;
use crate::server::AppState;
use crate::store::Store;
use crate::types::{Session, User};

#[derive(Debug)]
pub enum SessionValidationError {
    InvalidScheme,
    InvalidToken,
    SessionExpired,
    InternalError,
}

pub struct ValidatedSession {
    pub session: Session,
    pub user: User,
}

/// Extracts a session token from a Basic auth header.
/// Expects format: Basic base64(x-session:actual_token)
pub fn extract_basic_auth_token(header: &str) -> Option<String> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    let (username, password) = credentials.split_once(':')?;

    if username != "x-session" {
        return None;
    }

    Some(password.to_string())
}

/// Validates a raw session token against the store.
/// Returns the session and the user it belongs to.
pub fn validate_session(
    state: &Arc<AppState>,
    raw_token: &str,
) -> Result<ValidatedSession, SessionValidationError> {
    let (lookup, _secret) =
        parse_token(raw_token).map_err(|_| SessionValidationError::InvalidToken)?;

    let session = state
        .store
        .get_session_by_lookup(&lookup)
        .map_err(|_| SessionValidationError::InternalError)?
        .ok_or(SessionValidationError::InvalidToken)?;

    let generator = SessionTokenGenerator::new();
    if !generator
        .verify(raw_token, &session.token_hash)
        .map_err(|_| SessionValidationError::InternalError)?
    {
        return Err(SessionValidationError::InvalidToken);
    }

    if session.expires_at < Utc::now() {
        return Err(SessionValidationError::SessionExpired);
    }

    let user = state
        .store
        .get_user(&session.user_id)
        .map_err(|_| SessionValidationError::InternalError)?
        .ok_or(SessionValidationError::InvalidToken)?;

    if let Err(e) = state.store.update_session_last_used(&session.id) {
        tracing::warn!("Failed to update session last_used_at: {e}");
    }

    Ok(ValidatedSession { session, user })
}

/// Extracts a session token from an Authorization header (Bearer or Basic).
/// Returns None if no auth header is present.
/// Returns Err if the auth scheme is unsupported.
pub fn extract_token_from_header(
    auth_header: Option<&str>,
) -> Result<Option<String>, SessionValidationError> {
    match auth_header {
        Some(header) if header.starts_with("Bearer ") => {
            Ok(Some(header.strip_prefix("Bearer ").unwrap().to_string()))
        }
        Some(header) if header.starts_with("Basic ") => extract_basic_auth_token(header)
            .ok_or(SessionValidationError::InvalidToken)
            .map(Some),
        Some(_) => Err(SessionValidationError::InvalidScheme),
        None => Ok(None),
    }
}

/// Builds the caller's authorization scope from their role links. Runs once
/// per authenticated request.
pub fn load_access_scope(store: &dyn Store, user: &User) -> crate::error::Result<AccessScope> {
    let departments = store
        .list_user_department_admins(&user.id)?
        .into_iter()
        .map(|link| link.department_id)
        .collect();

    let programs = store
        .list_user_program_managements(&user.id)?
        .into_iter()
        .map(|link| (link.program_id, link.is_thesis_approver))
        .collect();

    Ok(AccessScope {
        user_id: user.id.clone(),
        is_admin: user.is_admin,
        departments,
        programs,
    })
}
