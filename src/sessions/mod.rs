pub mod manager;
pub mod middleware;
pub mod store;

pub use manager::{SessionManager, SessionPayload};
pub use middleware::require_session;
pub use store::{PgSessionStore, SessionStore};
