mod helpers;
mod identity;
mod middleware;
mod session;

pub use helpers::{
    SessionValidationError, ValidatedSession, extract_basic_auth_token, extract_token_from_header,
    load_access_scope, validate_session,
};
pub use identity::{AuthenticationMode, IamConfig, Identity, identity_from_headers};
pub use middleware::{AuthError, RequireAdmin, RequireAuth};
pub use session::{SessionTokenGenerator, parse_token};
