use axum::{
    extract::{FromRequest, Path, Query, Request, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::extractors::CurrentUser,
    error::{AppError, AppJson},
    state::AppState,
    todos::{
        dto::{CreateTodoRequest, ListParams, UpdateTodoRequest},
        repo_types::Todo,
    },
};

pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/:id",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
}

/// Fetch a to-do and make sure the caller owns it: 404 when absent, 401 when foreign.
async fn owned_todo(state: &AppState, user: &CurrentUser, id: i64) -> Result<Todo, AppError> {
    let todo = state
        .todos
        .get(id)
        .await?
        .ok_or(AppError::NotFound("Todo not found"))?;
    if todo.user_id != user.user_id {
        warn!(todo_id = id, owner_id = todo.user_id, "todo owned by another user");
        return Err(AppError::Unauthorized);
    }
    Ok(todo)
}

#[instrument(skip(state, user), fields(user_id = user.user_id))]
pub async fn list_todos(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Todo>>, AppError> {
    let todos = state
        .todos
        .list_by_owner(user.user_id, params.into())
        .await?;
    Ok(Json(todos))
}

#[instrument(skip(state, user, body), fields(user_id = user.user_id))]
pub async fn create_todo(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(body): AppJson<CreateTodoRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new = body.into_new(user.user_id)?;
    let todo = state.todos.create(new).await?;
    info!(todo_id = todo.id, "todo created");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/todos/{}", todo.id))],
        Json(todo),
    ))
}

#[instrument(skip(state, user), fields(user_id = user.user_id))]
pub async fn get_todo(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Todo>, AppError> {
    Ok(Json(owned_todo(&state, &user, id).await?))
}

/// The body is only extracted once ownership is settled, so a foreign id answers 401
/// whatever the payload looks like. Past that point it goes through [`AppJson`] like
/// every other JSON body, content type check included.
#[instrument(skip(state, user, req), fields(user_id = user.user_id))]
pub async fn update_todo(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    req: Request,
) -> Result<Json<Todo>, AppError> {
    let mut todo = owned_todo(&state, &user, id).await?;

    let AppJson(changes) = AppJson::<UpdateTodoRequest>::from_request(req, &state).await?;
    changes.apply(&mut todo)?;

    let updated = state
        .todos
        .update(&todo)
        .await?
        .ok_or(AppError::NotFound("Todo not found"))?;
    info!(todo_id = id, "todo updated");
    Ok(Json(updated))
}

#[instrument(skip(state, user), fields(user_id = user.user_id))]
pub async fn delete_todo(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    owned_todo(&state, &user, id).await?;
    if !state.todos.delete(id, user.user_id).await? {
        return Err(AppError::NotFound("Todo not found"));
    }
    info!(todo_id = id, "todo deleted");
    Ok(StatusCode::NO_CONTENT)
}
