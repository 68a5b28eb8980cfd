//! Public pages
//!
//! The shared task page and the landing page counters. Both are readable
//! without signing in.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tarefas_core::Error;
use tracing::{debug, warn};

use super::{core_error, RouteError};
use crate::{auth::resolve_identity, state::AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub amount_of_posts: usize,
    pub amount_of_comments: usize,
}

/// GET /task/{id} - Public task page, or back to the landing page
async fn task_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, RouteError> {
    // A bad token only costs the viewer their permissions
    let identity = resolve_identity(&headers, state.jwt_secret()).unwrap_or_else(|err| {
        warn!("Ignoring credentials on task page: {}", err);
        None
    });

    match state
        .views()
        .build_task_detail_view(&id, identity.as_ref())
        .await
    {
        Ok(view) => Ok(Json(view).into_response()),
        Err(Error::NotFound(message)) => {
            debug!("{}, redirecting home", message);
            Ok(Redirect::temporary("/").into_response())
        }
        Err(err) => Err(core_error(err)),
    }
}

/// GET /api/stats - Landing page counters
async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, RouteError> {
    let home = state.views().build_home_view().await.map_err(core_error)?;
    Ok(Json(StatsResponse {
        amount_of_posts: home.task_count,
        amount_of_comments: home.comment_count,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/task/{id}", get(task_page))
        .route("/api/stats", get(stats))
}
