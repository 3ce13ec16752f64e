use serde::Deserialize;

use crate::{error::AppError, todos::repo_types::{NewTodo, Page, Todo}};

const MAX_PAGE: i64 = 1000;

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
}

impl CreateTodoRequest {
    pub fn into_new(self, user_id: i64) -> Result<NewTodo, AppError> {
        Ok(NewTodo {
            title: required_title(&self.title)?,
            description: self.description,
            is_completed: self.is_completed,
            user_id,
        })
    }
}

/// Partial update. Absent fields keep their stored value; `id` and `user_id` are not editable.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_completed: Option<bool>,
}

impl UpdateTodoRequest {
    pub fn apply(self, todo: &mut Todo) -> Result<(), AppError> {
        if let Some(title) = self.title {
            todo.title = required_title(&title)?;
        }
        if let Some(description) = self.description {
            todo.description = Some(description);
        }
        if let Some(done) = self.is_completed {
            todo.is_completed = done;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<ListParams> for Page {
    fn from(p: ListParams) -> Self {
        Page {
            limit: p.limit.map(|l| l.clamp(0, MAX_PAGE)),
            offset: p.offset.unwrap_or(0).max(0),
        }
    }
}

fn required_title(raw: &str) -> Result<String, AppError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title is required".into()));
    }
    Ok(title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn stored() -> Todo {
        let now = OffsetDateTime::now_utc();
        Todo {
            id: 1,
            title: "Buy milk".into(),
            description: Some("2 litres".into()),
            is_completed: false,
            user_id: 9,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn create_ignores_owner_in_body_and_trims_title() {
        let req: CreateTodoRequest =
            serde_json::from_str(r#"{"title":"  Test Todo ","description":"x","user_id":99}"#)
                .unwrap();
        let new = req.into_new(5).unwrap();
        assert_eq!(new.title, "Test Todo");
        assert_eq!(new.description.as_deref(), Some("x"));
        assert!(!new.is_completed);
        assert_eq!(new.user_id, 5);
    }

    #[test]
    fn create_rejects_blank_title() {
        let req = CreateTodoRequest {
            title: "   ".into(),
            description: None,
            is_completed: false,
        };
        assert!(matches!(req.into_new(1), Err(AppError::Validation(_))));
    }

    #[test]
    fn update_merges_only_present_fields() {
        let mut todo = stored();
        let req: UpdateTodoRequest =
            serde_json::from_str(r#"{"is_completed":true,"user_id":42,"id":77}"#).unwrap();
        req.apply(&mut todo).unwrap();
        assert!(todo.is_completed);
        assert_eq!(todo.title, "Buy milk");
        assert_eq!(todo.description.as_deref(), Some("2 litres"));
        assert_eq!(todo.user_id, 9);
        assert_eq!(todo.id, 1);
    }

    #[test]
    fn update_with_blank_title_is_rejected() {
        let mut todo = stored();
        let req = UpdateTodoRequest {
            title: Some("".into()),
            ..Default::default()
        };
        assert!(req.apply(&mut todo).is_err());
        assert_eq!(todo.title, "Buy milk");
    }

    #[test]
    fn list_params_are_clamped() {
        let page = Page::from(ListParams {
            limit: Some(5000),
            offset: Some(-3),
        });
        assert_eq!(page.limit, Some(MAX_PAGE));
        assert_eq!(page.offset, 0);

        let page = Page::from(ListParams::default());
        assert_eq!(page.limit, None);
        assert_eq!(page.offset, 0);
    }
}
