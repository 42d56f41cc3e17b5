use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::{RequireAuth, SessionTokenGenerator, identity_from_headers};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::LoginResponse;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::types::{Session, User};

/// Establishes a session from identity headers. Users are provisioned on
/// first login; role flags are re-derived from IAM groups on every login.
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let identity = identity_from_headers(state.config.auth_mode, &headers).map_err(|e| match e {
        Error::Unauthorized => ApiError::unauthorized("Missing identity headers"),
        _ => ApiError::internal("Failed to read identity"),
    })?;

    // The IAM gate: neither admin nor employee group means no access at all.
    if !state.config.iam.is_recognized(&identity) {
        return Err(ApiError::forbidden("No recognized IAM group membership"));
    }

    let now = Utc::now();
    let group_admin = state.config.iam.is_admin(&identity);

    let user = match state
        .store
        .get_user_by_username(&identity.username)
        .api_err("Failed to look up user")?
    {
        Some(mut existing) => {
            existing.first_name = identity.first_name.clone();
            existing.last_name = identity.last_name.clone();
            existing.email = identity.email.clone();
            // Group-derived admin is re-derived on every login, so dropping
            // a user from the IAM admin group demotes them. Only operator
            // promotions via `admin init` persist.
            existing.is_admin = group_admin || existing.is_manual_admin;
            existing.updated_at = now;
            state
                .store
                .update_user(&existing)
                .api_err("Failed to update user")?;
            existing
        }
        None => {
            let user = User {
                id: Uuid::new_v4().to_string(),
                username: identity.username.clone(),
                first_name: identity.first_name.clone(),
                last_name: identity.last_name.clone(),
                email: identity.email.clone(),
                department_id: None,
                is_admin: group_admin,
                is_manual_admin: false,
                created_at: now,
                updated_at: now,
            };
            state
                .store
                .create_user(&user)
                .api_err("Failed to create user")?;
            user
        }
    };

    // Opportunistic cleanup; login is the only session write path.
    if let Err(e) = state.store.delete_expired_sessions() {
        tracing::warn!("Failed to clean up expired sessions: {e}");
    }

    let generator = SessionTokenGenerator::new();
    let expires_at = now + Duration::hours(state.config.session_ttl_hours);

    const MAX_RETRIES: u32 = 3;
    for _ in 0..MAX_RETRIES {
        let (raw_token, lookup, hash) = generator
            .generate()
            .map_err(|_| ApiError::internal("Failed to generate session token"))?;

        let session = Session {
            id: Uuid::new_v4().to_string(),
            token_hash: hash,
            token_lookup: lookup,
            user_id: user.id.clone(),
            created_at: now,
            expires_at,
            last_used_at: None,
        };

        match state.store.create_session(&session) {
            Ok(()) => {
                return Ok((
                    StatusCode::CREATED,
                    Json(ApiResponse::success(LoginResponse {
                        token: raw_token,
                        user,
                    })),
                ));
            }
            Err(Error::SessionLookupCollision) => continue,
            Err(_) => return Err(ApiError::internal("Failed to create session")),
        }
    }

    Err(ApiError::internal("Failed to create session after retries"))
}

pub async fn logout(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    state
        .store
        .delete_session(&auth.session.id)
        .api_err("Failed to delete session")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
