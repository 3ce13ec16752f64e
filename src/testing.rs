//! In-memory stores backing `AppState::fake()`.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    auth::{repo::UserStore, repo_types::User},
    config::SessionConfig,
    error::StoreError,
    sessions::{store::SessionRecord, SessionManager, SessionStore},
    state::AppState,
    todos::{
        repo::TodoStore,
        repo_types::{NewTodo, Page, Todo},
    },
};

/// Handles on the concrete stores behind a fake state, for poking at them from tests.
pub struct Fakes {
    pub users: Arc<MemoryUserStore>,
    pub sessions: Arc<MemorySessionStore>,
}

pub fn fake_state() -> (AppState, Fakes) {
    let users = Arc::new(MemoryUserStore::default());
    let sessions = Arc::new(MemorySessionStore::default());
    let state = state_with(users.clone(), sessions.clone());
    (state, Fakes { users, sessions })
}

/// State over the given user and session stores, with an in-memory to-do store.
pub fn state_with(users: Arc<dyn UserStore>, sessions: Arc<dyn SessionStore>) -> AppState {
    AppState {
        users,
        todos: Arc::new(MemoryTodoStore::default()),
        sessions: SessionManager::new(sessions, &SessionConfig::default()),
    }
}

/// Every call fails the way a dropped database connection would.
pub struct BrokenStore;

fn unavailable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl UserStore for BrokenStore {
    async fn create(&self, _: &str, _: &str) -> Result<User, StoreError> {
        Err(unavailable())
    }

    async fn find_by_username(&self, _: &str) -> Result<Option<User>, StoreError> {
        Err(unavailable())
    }

    async fn find_by_id(&self, _: i64) -> Result<Option<User>, StoreError> {
        Err(unavailable())
    }
}

#[async_trait]
impl SessionStore for BrokenStore {
    async fn commit(&self, _: &str, _: &[u8], _: OffsetDateTime) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn find(&self, _: &str) -> Result<Option<SessionRecord>, StoreError> {
        Err(unavailable())
    }

    async fn delete(&self, _: &str) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        Err(unavailable())
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn remove(&self, id: i64) {
        self.rows.lock().unwrap().retain(|u| u.id != id);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|u| u.username == username) {
            return Err(StoreError::Conflict);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: rows.iter().map(|u| u.id).max().unwrap_or(0) + 1,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        rows.push(user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|u| u.id == id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryTodoStore {
    inner: Mutex<(i64, BTreeMap<i64, Todo>)>,
}

#[async_trait]
impl TodoStore for MemoryTodoStore {
    async fn list_by_owner(&self, user_id: i64, page: Page) -> Result<Vec<Todo>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let owned = inner
            .1
            .values()
            .filter(|t| t.user_id == user_id)
            .skip(page.offset as usize)
            .cloned();
        Ok(match page.limit {
            Some(limit) => owned.take(limit as usize).collect(),
            None => owned.collect(),
        })
    }

    async fn create(&self, new: NewTodo) -> Result<Todo, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.0 += 1;
        let now = OffsetDateTime::now_utc();
        let todo = Todo {
            id: inner.0,
            title: new.title,
            description: new.description,
            is_completed: new.is_completed,
            user_id: new.user_id,
            created_at: now,
            updated_at: now,
        };
        inner.1.insert(todo.id, todo.clone());
        Ok(todo)
    }

    async fn get(&self, id: i64) -> Result<Option<Todo>, StoreError> {
        Ok(self.inner.lock().unwrap().1.get(&id).cloned())
    }

    async fn update(&self, todo: &Todo) -> Result<Option<Todo>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.1.get_mut(&todo.id) {
            Some(row) if row.user_id == todo.user_id => {
                row.title = todo.title.clone();
                row.description = todo.description.clone();
                row.is_completed = todo.is_completed;
                row.updated_at = OffsetDateTime::now_utc();
                Ok(Some(row.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: i64, user_id: i64) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let owned = inner.1.get(&id).is_some_and(|row| row.user_id == user_id);
        Ok(owned && inner.1.remove(&id).is_some())
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    rows: Mutex<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn commit(
        &self,
        token: &str,
        data: &[u8],
        expiry: OffsetDateTime,
    ) -> Result<(), StoreError> {
        self.rows.lock().unwrap().insert(
            token.to_string(),
            SessionRecord {
                token: token.to_string(),
                data: data.to_vec(),
                expiry,
            },
        );
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<SessionRecord>, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let expired = match rows.get(token) {
            Some(r) => r.is_expired_at(OffsetDateTime::now_utc()),
            None => return Ok(None),
        };
        if expired {
            rows.remove(token);
            return Ok(None);
        }
        Ok(rows.get(token).cloned())
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        self.rows.lock().unwrap().remove(token);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = OffsetDateTime::now_utc();
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|_, r| !r.is_expired_at(now));
        Ok((before - rows.len()) as u64)
    }
}
