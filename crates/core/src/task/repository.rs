//! Task repository
//!
//! Typed task operations on top of the document store.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use super::model::{fields, Task};
use crate::policy::{self, Identity};
use crate::store::{Collection, Direction, Document, DocumentStore, Query, SubscriptionHandle};
use crate::{Error, Result};

/// Repository for task CRUD operations
#[derive(Clone)]
pub struct TaskRepository {
    store: Arc<dyn DocumentStore>,
}

/// Tasks of one owner, newest first
fn owned_tasks_query(owner: &str) -> Query {
    Query::new()
        .where_eq(fields::OWNER, owner)
        .order_by(fields::CREATED, Direction::Descending)
}

/// Decode task documents, skipping malformed ones
fn decode_tasks(documents: &[Document]) -> Vec<Task> {
    documents
        .iter()
        .filter_map(|document| match Task::from_document(document) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!("Ignoring malformed task {}: {}", document.id, e);
                None
            }
        })
        .collect()
}

impl TaskRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create a task owned by `owner`
    pub async fn create_task(&self, owner: &str, text: &str, is_public: bool) -> Result<Task> {
        if text.trim().is_empty() {
            return Err(Error::Validation("Task text cannot be empty".to_string()));
        }
        if owner.trim().is_empty() {
            return Err(Error::Validation("Task owner cannot be empty".to_string()));
        }

        let created_at = Utc::now();
        let id = self
            .store
            .create(
                Collection::Tasks,
                Task::new_fields(owner, text, is_public, created_at),
            )
            .await?;
        debug!("Task {} created by {} (public: {})", id, owner, is_public);

        Ok(Task {
            id,
            owner: owner.to_string(),
            text: text.to_string(),
            is_public,
            created_at,
        })
    }

    /// Subscribe to the tasks of `owner`, newest first.
    ///
    /// `on_update` receives the complete list on registration and after every
    /// change; each call replaces whatever the previous one delivered.
    pub async fn list_owned_tasks_live<F>(&self, owner: &str, on_update: F) -> Result<SubscriptionHandle>
    where
        F: Fn(Vec<Task>) + Send + 'static,
    {
        let subscription = self
            .store
            .subscribe(Collection::Tasks, owned_tasks_query(owner))
            .await?;
        debug!("Live task listing opened for {}", owner);

        Ok(subscription.forward(move |documents| on_update(decode_tasks(&documents))))
    }

    /// Point-in-time listing of the tasks of `owner`, newest first
    pub async fn list_owned_tasks(&self, owner: &str) -> Result<Vec<Task>> {
        let documents = self
            .store
            .query(Collection::Tasks, &owned_tasks_query(owner))
            .await?;
        Ok(decode_tasks(&documents))
    }

    /// Get a task by ID
    pub async fn get_task_by_id(&self, id: &str) -> Result<Option<Task>> {
        self.store
            .get(Collection::Tasks, id)
            .await?
            .map(|document| Task::from_document(&document))
            .transpose()
    }

    /// Delete a task on behalf of `requester`.
    ///
    /// Comments on the task are left in place.
    pub async fn delete_task(&self, id: &str, requester: Option<&Identity>) -> Result<()> {
        let task = self
            .get_task_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Task {} not found", id)))?;

        if !policy::can_delete_task(requester, &task) {
            return Err(Error::Forbidden(format!("Not allowed to delete task {}", id)));
        }

        if !self.store.delete(Collection::Tasks, id).await? {
            return Err(Error::NotFound(format!("Task {} not found", id)));
        }
        debug!("Task {} deleted", id);
        Ok(())
    }

    /// Number of stored tasks
    pub async fn count_tasks(&self) -> Result<usize> {
        self.store.count(Collection::Tasks).await
    }
}
