//! Share links for public tasks

/// Builds `<base>/task/<id>` links
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinks {
    base_url: String,
}

impl ShareLinks {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn share_url(&self, task_id: &str) -> String {
        format!("{}/task/{}", self.base_url, urlencoding::encode(task_id))
    }
}
