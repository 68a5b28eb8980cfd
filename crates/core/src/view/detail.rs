//! Public task page read model

use serde::Serialize;

use crate::comment::{Comment, CommentRepository};
use crate::policy::{self, Identity};
use crate::task::Task;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentEntry {
    #[serde(flatten)]
    pub comment: Comment,
    /// Whether the viewer may delete this comment
    pub can_delete: bool,
}

impl CommentEntry {
    pub fn new(comment: Comment, viewer: Option<&Identity>) -> Self {
        let can_delete = policy::can_delete_comment(viewer, &comment);
        Self {
            comment,
            can_delete,
        }
    }
}

/// A public task with its comment thread, computed once per request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetailView {
    pub task: Task,
    pub comments: Vec<CommentEntry>,
    pub can_comment: bool,
}

/// Comment thread as rendered for one viewer.
///
/// Local changes are applied only after the store accepted them; a failed
/// mutation leaves the thread as it was.
#[derive(Debug, Clone)]
pub struct CommentThread {
    task: Task,
    viewer: Option<Identity>,
    entries: Vec<CommentEntry>,
}

impl CommentThread {
    pub fn new(view: TaskDetailView, viewer: Option<Identity>) -> Self {
        Self {
            task: view.task,
            viewer,
            entries: view.comments,
        }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn entries(&self) -> &[CommentEntry] {
        &self.entries
    }

    pub fn can_comment(&self) -> bool {
        policy::can_create_comment(self.viewer.as_ref(), &self.task)
    }

    /// Post a comment and append it locally
    pub async fn submit(&mut self, comments: &CommentRepository, text: &str) -> Result<CommentEntry> {
        let comment = comments
            .create_comment(&self.task, self.viewer.as_ref(), text)
            .await?;
        let entry = CommentEntry::new(comment, self.viewer.as_ref());
        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Delete a comment and drop it locally
    pub async fn remove(&mut self, comments: &CommentRepository, comment_id: &str) -> Result<()> {
        comments
            .delete_comment(comment_id, self.viewer.as_ref())
            .await?;
        self.entries.retain(|entry| entry.comment.id != comment_id);
        Ok(())
    }
}
