//! Application state

use std::sync::Arc;

use tarefas_core::comment::CommentRepository;
use tarefas_core::store::DocumentStore;
use tarefas_core::task::TaskRepository;
use tarefas_core::view::{ShareLinks, Views};

use crate::config::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    views: Views,
    jwt_secret: String,
    storage: &'static str,
}

impl AppState {
    /// Create a new AppState over an opened document store
    pub fn new(store: Arc<dyn DocumentStore>, config: &Config) -> Self {
        let views = Views::new(
            TaskRepository::new(Arc::clone(&store)),
            CommentRepository::new(store),
            ShareLinks::new(config.public_base_url.clone()),
        );
        let storage = if config.in_memory { "memory" } else { "file" };

        Self {
            inner: Arc::new(AppStateInner {
                views,
                jwt_secret: config.jwt_secret.clone(),
                storage,
            }),
        }
    }

    pub fn views(&self) -> &Views {
        &self.inner.views
    }

    pub fn tasks(&self) -> &TaskRepository {
        self.inner.views.tasks()
    }

    pub fn comments(&self) -> &CommentRepository {
        self.inner.views.comments()
    }

    pub fn jwt_secret(&self) -> &str {
        &self.inner.jwt_secret
    }

    pub fn storage(&self) -> &'static str {
        self.inner.storage
    }
}
