//! Task API endpoints
//!
//! The owner's task list, task creation and deletion.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use tarefas_core::view::DashboardEntry;
use tracing::info;

use super::{core_error, require_identity, RouteError};
use crate::state::AppState;

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub text: String,
    #[serde(default)]
    pub is_public: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/tasks - List the caller's tasks, newest first
async fn list_tasks(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<DashboardEntry>>, RouteError> {
    let identity = require_identity(&state, &headers)?;
    let entries = state
        .views()
        .dashboard_snapshot(Some(&identity))
        .await
        .map_err(core_error)?;

    Ok(Json(entries))
}

/// POST /api/tasks - Create a task owned by the caller
async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<DashboardEntry>), RouteError> {
    let identity = require_identity(&state, &headers)?;
    let task = state
        .tasks()
        .create_task(&identity.email, &req.text, req.is_public)
        .await
        .map_err(core_error)?;
    info!("Task {} created", task.id);

    Ok((
        StatusCode::CREATED,
        Json(DashboardEntry::new(task, state.views().links())),
    ))
}

/// DELETE /api/tasks/{id} - Delete one of the caller's tasks
async fn delete_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, RouteError> {
    let identity = require_identity(&state, &headers)?;
    state
        .tasks()
        .delete_task(&id, Some(&identity))
        .await
        .map_err(core_error)?;
    info!("Task {} deleted", id);

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{id}", delete(delete_task))
}
