use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    error::StoreError,
    todos::repo_types::{NewTodo, Page, Todo},
};

#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn list_by_owner(&self, user_id: i64, page: Page) -> Result<Vec<Todo>, StoreError>;
    async fn create(&self, new: NewTodo) -> Result<Todo, StoreError>;
    async fn get(&self, id: i64) -> Result<Option<Todo>, StoreError>;
    /// Persist the editable fields of `todo`. `None` when the row is gone or changed hands.
    async fn update(&self, todo: &Todo) -> Result<Option<Todo>, StoreError>;
    /// `false` when nothing was deleted.
    async fn delete(&self, id: i64, user_id: i64) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgTodoStore {
    db: PgPool,
}

impl PgTodoStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TodoStore for PgTodoStore {
    async fn list_by_owner(&self, user_id: i64, page: Page) -> Result<Vec<Todo>, StoreError> {
        // LIMIT NULL is LIMIT ALL in Postgres
        let rows = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, title, description, is_completed, user_id, created_at, updated_at
              FROM todos
             WHERE user_id = $1
             ORDER BY id
             LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn create(&self, new: NewTodo) -> Result<Todo, StoreError> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            INSERT INTO todos (title, description, is_completed, user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, description, is_completed, user_id, created_at, updated_at
            "#,
        )
        .bind(new.title)
        .bind(new.description)
        .bind(new.is_completed)
        .bind(new.user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(todo)
    }

    async fn get(&self, id: i64) -> Result<Option<Todo>, StoreError> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, title, description, is_completed, user_id, created_at, updated_at
              FROM todos
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(todo)
    }

    async fn update(&self, todo: &Todo) -> Result<Option<Todo>, StoreError> {
        let updated = sqlx::query_as::<_, Todo>(
            r#"
            UPDATE todos
               SET title = $3,
                   description = $4,
                   is_completed = $5,
                   updated_at = now()
             WHERE id = $1 AND user_id = $2
            RETURNING id, title, description, is_completed, user_id, created_at, updated_at
            "#,
        )
        .bind(todo.id)
        .bind(todo.user_id)
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.is_completed)
        .fetch_optional(&self.db)
        .await?;
        Ok(updated)
    }

    async fn delete(&self, id: i64, user_id: i64) -> Result<bool, StoreError> {
        let done = sqlx::query("DELETE FROM todos WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}
