//! Task model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{Document, Fields};
use crate::Result;

/// Store field names of a task document
pub(crate) mod fields {
    pub const TEXT: &str = "tarefa";
    pub const CREATED: &str = "created";
    pub const PUBLIC: &str = "public";
    pub const OWNER: &str = "user";
}

/// A task owned by one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    /// Email of the creating account; never changes
    pub owner: String,
    pub text: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Build the store fields for a new task
    pub(crate) fn new_fields(
        owner: &str,
        text: &str,
        is_public: bool,
        created_at: DateTime<Utc>,
    ) -> Fields {
        let mut document = Fields::new();
        document.insert(fields::TEXT.to_string(), text.into());
        document.insert(fields::CREATED.to_string(), created_at.into());
        document.insert(fields::PUBLIC.to_string(), is_public.into());
        document.insert(fields::OWNER.to_string(), owner.into());
        document
    }

    /// Decode a task document, normalizing its timestamp
    pub fn from_document(document: &Document) -> Result<Self> {
        Ok(Self {
            id: document.id.clone(),
            owner: document.string(fields::OWNER)?,
            text: document.string(fields::TEXT)?,
            is_public: document.boolean(fields::PUBLIC)?,
            created_at: document.timestamp(fields::CREATED)?,
        })
    }
}
