use std::sync::Arc;

use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    CookieJar,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::{SessionConfig, MAX_SESSION_LIFETIME_MINUTES},
    error::StoreError,
    sessions::store::SessionStore,
};

/// What a session remembers about its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    pub username: String,
    pub user_id: i64,
}

#[derive(Debug, Clone)]
pub struct LoadedSession {
    pub token: String,
    pub payload: SessionPayload,
    pub expiry: OffsetDateTime,
}

/// Issues, resolves and tears down cookie-carried sessions on top of a [`SessionStore`].
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    cookie_name: String,
    lifetime: Duration,
    secure: bool,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, config: &SessionConfig) -> Self {
        Self {
            store,
            cookie_name: config.cookie_name.clone(),
            lifetime: Duration::minutes(
                config.lifetime_minutes.clamp(1, MAX_SESSION_LIFETIME_MINUTES),
            ),
            secure: config.secure_cookie,
        }
    }

    /// Start a session under a brand-new token.
    pub async fn issue(&self, payload: &SessionPayload) -> Result<String, StoreError> {
        let token = Uuid::new_v4().simple().to_string();
        let data = serde_json::to_vec(payload)?;
        self.store.commit(&token, &data, self.expiry_from_now()?).await?;
        debug!(user_id = payload.user_id, "session issued");
        Ok(token)
    }

    /// Resolve a token to its live session. Undecodable payloads count as no session.
    pub async fn load(&self, token: &str) -> Result<Option<LoadedSession>, StoreError> {
        let Some(record) = self.store.find(token).await? else {
            return Ok(None);
        };
        match serde_json::from_slice::<SessionPayload>(&record.data) {
            Ok(payload) => Ok(Some(LoadedSession {
                token: record.token,
                payload,
                expiry: record.expiry,
            })),
            Err(e) => {
                warn!(error = %e, "undecodable session payload");
                Ok(None)
            }
        }
    }

    fn expiry_from_now(&self) -> Result<OffsetDateTime, StoreError> {
        OffsetDateTime::now_utc()
            .checked_add(self.lifetime)
            .ok_or(StoreError::ExpiryOutOfRange)
    }

    /// True once less than half of the lifetime is left.
    pub fn needs_refresh(&self, expiry: OffsetDateTime) -> bool {
        expiry - OffsetDateTime::now_utc() < self.lifetime / 2
    }

    /// Push the expiry of a live session out to a full lifetime from now.
    pub async fn refresh(&self, session: &LoadedSession) -> Result<OffsetDateTime, StoreError> {
        let data = serde_json::to_vec(&session.payload)?;
        let expiry = self.expiry_from_now()?;
        self.store.commit(&session.token, &data, expiry).await?;
        debug!(user_id = session.payload.user_id, "session refreshed");
        Ok(expiry)
    }

    pub async fn destroy(&self, token: &str) -> Result<(), StoreError> {
        self.store.delete(token).await
    }

    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        self.store.purge_expired().await
    }

    pub fn token_from(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.cookie_name)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
    }

    pub fn cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), token))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(self.lifetime)
            .path("/")
            .build()
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), "")).path("/").build()
    }

    /// Sweep expired sessions every `every` for the life of the process.
    pub fn spawn_cleanup(&self, every: std::time::Duration) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match manager.purge_expired().await {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "purged expired sessions"),
                    Err(e) => warn!(error = %e, "session purge failed"),
                }
            }
        })
    }
}
