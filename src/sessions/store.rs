use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::error::StoreError;

/// Session row as persisted.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRecord {
    pub token: String,
    pub data: Vec<u8>, // JSON-encoded SessionPayload
    pub expiry: OffsetDateTime,
}

impl SessionRecord {
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expiry <= now
    }
}

/// Server-side session storage keyed by opaque token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert the session or overwrite data and expiry of an existing token.
    async fn commit(
        &self,
        token: &str,
        data: &[u8],
        expiry: OffsetDateTime,
    ) -> Result<(), StoreError>;

    /// Live session for `token`. An expired row is deleted and reported as absent.
    async fn find(&self, token: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Remove `token`; unknown tokens are a no-op.
    async fn delete(&self, token: &str) -> Result<(), StoreError>;

    /// Remove every expired row, returning how many were dropped.
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn commit(
        &self,
        token: &str,
        data: &[u8],
        expiry: OffsetDateTime,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token, data, expiry)
            VALUES ($1, $2, $3)
            ON CONFLICT (token) DO UPDATE
               SET data = EXCLUDED.data,
                   expiry = EXCLUDED.expiry,
                   updated_at = now()
            "#,
        )
        .bind(token)
        .bind(data)
        .bind(expiry)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<SessionRecord>, StoreError> {
        let record = sqlx::query_as::<_, SessionRecord>(
            r#"
            SELECT token, data, expiry
              FROM sessions
             WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;

        match record {
            Some(r) if r.is_expired_at(OffsetDateTime::now_utc()) => {
                debug!("session expired; deleting");
                // cleanup failure must not turn an expired session into a 500
                if let Err(e) = self.delete(token).await {
                    warn!(error = %e, "failed to delete expired session");
                }
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let done = sqlx::query("DELETE FROM sessions WHERE expiry <= now()")
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected())
    }
}
