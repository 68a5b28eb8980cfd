//! Comment model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{Document, Fields};
use crate::Result;

/// Store field names of a comment document
pub(crate) mod fields {
    pub const TEXT: &str = "comment";
    pub const CREATED: &str = "created";
    pub const AUTHOR_EMAIL: &str = "user";
    pub const AUTHOR_NAME: &str = "name";
    pub const TASK_ID: &str = "taskId";
}

/// A comment left on a public task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub task_id: String,
    pub author_email: String,
    pub author_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub(crate) fn new_fields(
        task_id: &str,
        author_email: &str,
        author_name: &str,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Fields {
        let mut document = Fields::new();
        document.insert(fields::TEXT.to_string(), text.into());
        document.insert(fields::CREATED.to_string(), created_at.into());
        document.insert(fields::AUTHOR_EMAIL.to_string(), author_email.into());
        document.insert(fields::AUTHOR_NAME.to_string(), author_name.into());
        document.insert(fields::TASK_ID.to_string(), task_id.into());
        document
    }

    pub fn from_document(document: &Document) -> Result<Self> {
        Ok(Self {
            id: document.id.clone(),
            task_id: document.string(fields::TASK_ID)?,
            author_email: document.string(fields::AUTHOR_EMAIL)?,
            author_name: document.string(fields::AUTHOR_NAME)?,
            text: document.string(fields::TEXT)?,
            created_at: document.timestamp(fields::CREATED)?,
        })
    }
}
