//! Route handlers

pub mod comment;
pub mod health;
pub mod page;
pub mod task;

use axum::{
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use tarefas_core::{policy::Identity, Error};
use tracing::error;

use crate::{auth::resolve_identity, state::AppState};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type RouteError = (StatusCode, Json<ErrorResponse>);

fn route_error(status: StatusCode, error: impl Into<String>) -> RouteError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

fn unauthorized(error: impl std::fmt::Display) -> RouteError {
    route_error(StatusCode::UNAUTHORIZED, error.to_string())
}

/// Map a core error onto a response. Store failures are logged and reported
/// without detail.
fn core_error(err: Error) -> RouteError {
    if err.is_store_error() {
        error!("Store failure: {}", err);
        return route_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
    }
    let status = match &err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Forbidden(_) => StatusCode::FORBIDDEN,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Unauthenticated => StatusCode::UNAUTHORIZED,
        Error::Io(_) | Error::Serialization(_) | Error::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    route_error(status, err.to_string())
}

fn require_identity(state: &AppState, headers: &HeaderMap) -> Result<Identity, RouteError> {
    resolve_identity(headers, state.jwt_secret())
        .map_err(unauthorized)?
        .ok_or_else(|| core_error(Error::Unauthenticated))
}
