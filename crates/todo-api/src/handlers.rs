use crate::error::ApiError;
use crate::request::{ListParams, TodoRequest};
use crate::response::{Envelope, TodoIdBody};
use crate::AppState;
use axum::extract::{Path, State};
use domain::{PageMeta, Todo};

/// GET /
pub async fn health() -> Envelope<()> {
    Envelope::message("Services run properly")
}

/// GET /todo?q=&page=&per_page=
pub async fn list_todos(
    State(state): State<AppState>,
    params: ListParams,
) -> Result<Envelope<Vec<Todo>>, ApiError> {
    let page = params.normalize();

    let (todos, total_count) = state
        .service
        .list(&page.keyword, page.limit(), page.offset())
        .await?;

    Ok(Envelope::list(
        "Get All Todo",
        todos,
        PageMeta::new(&page, total_count),
    ))
}

/// GET /todo/:id
pub async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<Todo>, ApiError> {
    let todo = state.service.get_by_id(&id).await?;
    Ok(Envelope::ok("Get Todo", todo))
}

/// POST /todo
pub async fn create_todo(
    State(state): State<AppState>,
    request: TodoRequest,
) -> Result<Envelope<Todo>, ApiError> {
    let todo = state
        .service
        .create(request.title, request.description)
        .await?;
    Ok(Envelope::created("Create Todo", todo))
}

/// PUT /todo/:id
pub async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: TodoRequest,
) -> Result<Envelope<TodoIdBody>, ApiError> {
    let todo = state
        .service
        .update(&id, request.title, request.description)
        .await?;

    Ok(Envelope::ok(
        format!("Success updated item with id {}", todo.id),
        TodoIdBody { id: todo.id },
    ))
}

/// DELETE /todo/:id
pub async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<TodoIdBody>, ApiError> {
    let id = state.service.delete(&id).await?;

    Ok(Envelope::ok(
        format!("Success deleted item with id {id}"),
        TodoIdBody { id },
    ))
}

/// 未定義のルート
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
