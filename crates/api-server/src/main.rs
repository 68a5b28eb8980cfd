//! API Server for Tarefas+
//!
//! Serves the REST API and public pages on one port and the live dashboard
//! over Socket.IO on another.

mod auth;
mod config;
mod routes;
mod socket;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tarefas_core::store::{DocumentStore, FileDocumentStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::socket::{create_socket_layer, SocketState};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tarefas_server=debug,tarefas_core=debug,tower_http=debug,socketioxide=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let store: Arc<dyn DocumentStore> = if config.in_memory {
        tracing::info!("Using in-memory document store");
        Arc::new(FileDocumentStore::in_memory())
    } else {
        tracing::info!("Using data directory: {:?}", config.data_dir);
        Arc::new(
            FileDocumentStore::new(config.data_dir.clone())
                .await
                .context("Failed to open document store")?,
        )
    };

    let app_state = AppState::new(store, &config);

    // Create Socket.IO layer
    let socket_state = SocketState::new(app_state.views().clone(), app_state.jwt_secret());
    let (socket_layer, _io) = create_socket_layer(socket_state);

    // REST API server
    let rest_app = Router::new()
        .merge(routes::health::router())
        .merge(routes::task::router())
        .merge(routes::comment::router())
        .merge(routes::page::router())
        .with_state(app_state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Socket.IO server
    // Layers are applied bottom-to-top, so CorsLayer is added last to be applied first
    let socket_app = Router::new()
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(socket_layer);

    let rest_addr = SocketAddr::from(([0, 0, 0, 0], config.rest_port));
    let socket_addr = SocketAddr::from(([0, 0, 0, 0], config.socket_port));

    let rest_listener = tokio::net::TcpListener::bind(rest_addr)
        .await
        .with_context(|| format!("Failed to bind REST API on {}", rest_addr))?;
    let socket_listener = tokio::net::TcpListener::bind(socket_addr)
        .await
        .with_context(|| format!("Failed to bind Socket.IO on {}", socket_addr))?;

    tracing::info!("REST API listening on {}", rest_addr);
    tracing::info!("Socket.IO listening on {}", socket_addr);

    let rest_handle = tokio::spawn(async move { axum::serve(rest_listener, rest_app).await });
    let socket_handle = tokio::spawn(async move { axum::serve(socket_listener, socket_app).await });

    let (rest_result, socket_result) = tokio::try_join!(rest_handle, socket_handle)?;
    rest_result.context("REST API server failed")?;
    socket_result.context("Socket.IO server failed")?;

    Ok(())
}
