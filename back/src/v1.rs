use std::{convert::Infallible, sync::Arc};

use ripple_api::v1::{Category, NewTodo, Todo};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::Utc;
use futures::Stream;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::{auth::Identity, AppState, OwnedTodo, Store};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/todos", get(get_todos))
        .route("/todos", post(add_todo))
        .route("/todos/events", get(todo_events))
        .route("/todos/:id", patch(toggle_todo))
        .route("/todos/:id", delete(delete_todo))
        .route("/categories", get(get_categories))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Validation(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };

        (status, self.to_string()).into_response()
    }
}

/// The caller's todos, most recently created first.
fn todos_for(store: &Store, user: Uuid) -> Vec<Todo> {
    let mut todos: Vec<_> = (store.todos.values())
        .filter(|record| record.owner == user)
        .map(|record| record.todo.clone())
        .collect();

    todos.sort_unstable_by(|a, b| a.created_at.cmp(&b.created_at).reverse());
    todos
}

async fn get_todos(
    State(state): State<Arc<AppState>>,
    Identity(user): Identity,
) -> Json<Vec<Todo>> {
    let store = state.store.lock().await;
    Json(todos_for(&store, user))
}

async fn add_todo(
    State(state): State<Arc<AppState>>,
    Identity(user): Identity,
    Json(draft): Json<NewTodo>,
) -> Result<Json<Todo>, ApiError> {
    if draft.title.trim().is_empty() {
        return Err(ApiError::Validation("title must not be empty"));
    }

    let todo = Todo {
        id: Uuid::new_v4(),
        title: draft.title,
        description: draft.description,
        completed: false,
        priority: draft.priority,
        category: draft.category,
        due_date: draft.due_date,
        created_at: Utc::now(),
        recurring: draft.recurring,
    };

    let mut store = state.store.lock().await;
    let record = OwnedTodo {
        owner: user,
        todo: todo.clone(),
    };
    store.todos.insert(todo.id, record);
    drop(store);

    state.notify();

    info!(
        id = %todo.id,
        title = %todo.title,
        "created todo"
    );

    Ok(Json(todo))
}

async fn toggle_todo(
    State(state): State<Arc<AppState>>,
    Identity(user): Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Todo>, ApiError> {
    let mut store = state.store.lock().await;

    // ownership is checked before any mutation
    let record = (store.todos.get_mut(&id))
        .filter(|record| record.owner == user)
        .ok_or(ApiError::NotFound)?;

    record.todo.completed = !record.todo.completed;
    let todo = record.todo.clone();
    drop(store);

    state.notify();

    info!(
        id = %todo.id,
        completed = todo.completed,
        "toggled todo"
    );

    Ok(Json(todo))
}

async fn delete_todo(
    State(state): State<Arc<AppState>>,
    Identity(user): Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Todo>, ApiError> {
    let mut store = state.store.lock().await;

    let owned = (store.todos.get(&id)).is_some_and(|record| record.owner == user);
    if !owned {
        return Err(ApiError::NotFound);
    }

    let Some(record) = store.todos.remove(&id) else {
        return Err(ApiError::NotFound);
    };
    drop(store);

    state.notify();

    info!(id = %record.todo.id, "deleted todo");

    Ok(Json(record.todo))
}

async fn get_categories(
    State(state): State<Arc<AppState>>,
    Identity(user): Identity,
) -> Json<Vec<Category>> {
    let store = state.store.lock().await;

    let mut categories: Vec<_> = (store.categories.values())
        .filter(|record| record.owner == user)
        .map(|record| record.category.clone())
        .collect();

    categories.sort_unstable_by(|a, b| a.name.cmp(&b.name));
    Json(categories)
}

/// Server push stream. Sends the caller's full todo list immediately, then
/// again after every store mutation; the client replaces its state wholesale
/// with each message.
async fn todo_events(
    State(state): State<Arc<AppState>>,
    Identity(user): Identity,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let changes = state.changes.subscribe();

    let stream = futures::stream::unfold(
        (state, changes, false),
        move |(state, mut changes, started)| async move {
            if started {
                loop {
                    match changes.recv().await {
                        Ok(()) => break,
                        // a lagged receiver still wants the latest snapshot
                        Err(broadcast::error::RecvError::Lagged(_)) => break,
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }

            let todos = {
                let store = state.store.lock().await;
                todos_for(&store, user)
            };

            let event = Event::default().json_data(&todos).ok()?;
            Some((Ok::<_, Infallible>(event), (state, changes, true)))
        },
    );

    Sse::new(stream).keep_alive(KeepAlive::default())
}
