use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    auth::repo::{PgUserStore, UserStore},
    config::AppConfig,
    sessions::{PgSessionStore, SessionManager},
    todos::repo::{PgTodoStore, TodoStore},
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub todos: Arc<dyn TodoStore>,
    pub sessions: SessionManager,
}

impl AppState {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")
    }

    pub fn from_pool(db: PgPool, config: &AppConfig) -> Self {
        let sessions = SessionManager::new(
            Arc::new(PgSessionStore::new(db.clone())),
            &config.session,
        );
        Self {
            users: Arc::new(PgUserStore::new(db.clone())),
            todos: Arc::new(PgTodoStore::new(db)),
            sessions,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        crate::testing::fake_state().0
    }
}
