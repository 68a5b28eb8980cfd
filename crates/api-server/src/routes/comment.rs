//! Comment API endpoints

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, post},
    Json, Router,
};
use serde::Deserialize;
use tarefas_core::{policy, view::CommentEntry, Error};
use tracing::info;

use super::{core_error, require_identity, RouteError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub text: String,
}

/// POST /api/tasks/{id}/comments - Comment on a public task
async fn create_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(task_id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentEntry>), RouteError> {
    let identity = require_identity(&state, &headers)?;

    // Tasks the caller cannot see are reported as missing
    let task = state
        .tasks()
        .get_task_by_id(&task_id)
        .await
        .map_err(core_error)?
        .filter(|task| policy::can_view_task(Some(&identity), task))
        .ok_or_else(|| core_error(Error::NotFound(format!("Task {} not found", task_id))))?;

    let comment = state
        .comments()
        .create_comment(&task, Some(&identity), &req.text)
        .await
        .map_err(core_error)?;
    info!("Comment {} added to task {}", comment.id, task.id);

    Ok((
        StatusCode::CREATED,
        Json(CommentEntry::new(comment, Some(&identity))),
    ))
}

/// DELETE /api/comments/{id} - Delete one of the caller's comments
async fn delete_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, RouteError> {
    let identity = require_identity(&state, &headers)?;
    state
        .comments()
        .delete_comment(&id, Some(&identity))
        .await
        .map_err(core_error)?;
    info!("Comment {} deleted", id);

    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tasks/{id}/comments", post(create_comment))
        .route("/api/comments/{id}", delete(delete_comment))
}
