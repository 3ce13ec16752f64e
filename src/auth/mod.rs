use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod repo_types;

/// Register, login and logout. Open to anonymous callers.
pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}

/// Routes that need a resolved session.
pub fn protected_router() -> Router<AppState> {
    handlers::me_routes()
}
