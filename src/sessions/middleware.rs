use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use tracing::{debug, warn};

use crate::{auth::extractors::CurrentUser, error::AppError, state::AppState};

/// Gate for protected routes: resolves the session cookie to a [`CurrentUser`]
/// request extension or answers 401 without running the handler.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let sessions = &state.sessions;

    let Some(token) = sessions.token_from(&jar) else {
        debug!("no session cookie");
        return Err(AppError::Unauthorized);
    };

    let Some(session) = sessions.load(&token).await? else {
        debug!("unknown or expired session");
        return Err(AppError::Unauthorized);
    };

    if session.payload.username.is_empty() {
        warn!("session without username");
        return Err(AppError::Unauthorized);
    }

    let Some(user) = state.users.find_by_id(session.payload.user_id).await? else {
        warn!(user_id = session.payload.user_id, "session refers to missing user");
        sessions.destroy(&token).await?;
        return Err(AppError::Unauthorized);
    };

    let refreshed = if sessions.needs_refresh(session.expiry) {
        sessions.refresh(&session).await?;
        true
    } else {
        false
    };

    req.extensions_mut().insert(CurrentUser {
        user_id: user.id,
        username: user.username,
    });
    let res = next.run(req).await;

    if refreshed {
        Ok((jar.add(sessions.cookie(token)), res).into_response())
    } else {
        Ok(res)
    }
}
