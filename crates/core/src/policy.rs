//! Authorization policy
//!
//! Pure decisions about what an identity may see or change. An anonymous
//! caller is represented by `None` and never owns or authors anything.

use serde::{Deserialize, Serialize};

use crate::comment::Comment;
use crate::task::Task;

/// An authenticated principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable account identifier
    pub email: String,
    pub name: String,
}

impl Identity {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }
}

fn is_account(identity: Option<&Identity>, email: &str) -> bool {
    identity.is_some_and(|identity| identity.email == email)
}

pub fn can_view_task(identity: Option<&Identity>, task: &Task) -> bool {
    task.is_public || is_account(identity, &task.owner)
}

pub fn can_create_comment(identity: Option<&Identity>, task: &Task) -> bool {
    identity.is_some() && task.is_public
}

pub fn can_delete_comment(identity: Option<&Identity>, comment: &Comment) -> bool {
    is_account(identity, &comment.author_email)
}

pub fn can_delete_task(identity: Option<&Identity>, task: &Task) -> bool {
    is_account(identity, &task.owner)
}
