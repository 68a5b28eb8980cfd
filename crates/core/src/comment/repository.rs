//! Comment repository

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use super::model::{fields, Comment};
use crate::policy::{self, Identity};
use crate::store::{Collection, Direction, DocumentStore, Query};
use crate::task::Task;
use crate::{Error, Result};

/// Repository for comments on public tasks
#[derive(Clone)]
pub struct CommentRepository {
    store: Arc<dyn DocumentStore>,
}

impl CommentRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Comment on `task` as `author`.
    ///
    /// The task is read again from the store: it must still exist and be
    /// public at the time of the call, and the author must be authenticated.
    pub async fn create_comment(
        &self,
        task: &Task,
        author: Option<&Identity>,
        text: &str,
    ) -> Result<Comment> {
        if text.trim().is_empty() {
            return Err(Error::Validation("Comment text cannot be empty".to_string()));
        }
        let task = match self.store.get(Collection::Tasks, &task.id).await? {
            Some(document) => Task::from_document(&document)?,
            None => return Err(Error::NotFound(format!("Task {} not found", task.id))),
        };
        let author = match author {
            Some(author) if policy::can_create_comment(Some(author), &task) => author,
            _ => {
                return Err(Error::Forbidden(format!(
                    "Not allowed to comment on task {}",
                    task.id
                )))
            }
        };

        let created_at = Utc::now();
        let id = self
            .store
            .create(
                Collection::Comments,
                Comment::new_fields(&task.id, &author.email, &author.name, text, created_at),
            )
            .await?;
        debug!("Comment {} added to task {} by {}", id, task.id, author.email);

        Ok(Comment {
            id,
            task_id: task.id.clone(),
            author_email: author.email.clone(),
            author_name: author.name.clone(),
            text: text.to_string(),
            created_at,
        })
    }

    /// Comments referencing `task_id`, oldest first
    pub async fn list_comments_for_task(&self, task_id: &str) -> Result<Vec<Comment>> {
        let query = Query::new()
            .where_eq(fields::TASK_ID, task_id)
            .order_by(fields::CREATED, Direction::Ascending);
        let documents = self.store.query(Collection::Comments, &query).await?;

        Ok(documents
            .iter()
            .filter_map(|document| match Comment::from_document(document) {
                Ok(comment) => Some(comment),
                Err(e) => {
                    warn!("Ignoring malformed comment {}: {}", document.id, e);
                    None
                }
            })
            .collect())
    }

    /// Get a comment by ID, whether or not its task still exists
    pub async fn get_comment_by_id(&self, id: &str) -> Result<Option<Comment>> {
        self.store
            .get(Collection::Comments, id)
            .await?
            .map(|document| Comment::from_document(&document))
            .transpose()
    }

    /// Delete a comment on behalf of `requester`
    pub async fn delete_comment(&self, id: &str, requester: Option<&Identity>) -> Result<()> {
        let comment = self
            .get_comment_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Comment {} not found", id)))?;

        if !policy::can_delete_comment(requester, &comment) {
            return Err(Error::Forbidden(format!(
                "Not allowed to delete comment {}",
                id
            )));
        }

        if !self.store.delete(Collection::Comments, id).await? {
            return Err(Error::NotFound(format!("Comment {} not found", id)));
        }
        debug!("Comment {} deleted", id);
        Ok(())
    }

    /// Number of stored comments
    pub async fn count_comments(&self) -> Result<usize> {
        self.store.count(Collection::Comments).await
    }
}
