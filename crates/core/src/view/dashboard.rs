//! Dashboard read model

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use super::share::ShareLinks;
use crate::task::Task;

/// One task on the owner's dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardEntry {
    #[serde(flatten)]
    pub task: Task,
    /// Present only for public tasks
    pub share_url: Option<String>,
}

impl DashboardEntry {
    pub fn new(task: Task, links: &ShareLinks) -> Self {
        let share_url = task.is_public.then(|| links.share_url(&task.id));
        Self { task, share_url }
    }
}

pub(crate) fn entries(tasks: Vec<Task>, links: &ShareLinks) -> Vec<DashboardEntry> {
    tasks
        .into_iter()
        .map(|task| DashboardEntry::new(task, links))
        .collect()
}

/// Locally rendered dashboard.
///
/// Every update replaces the whole entry list, so a reader never sees a
/// mix of two snapshots.
#[derive(Clone)]
pub struct DashboardState {
    entries: Arc<watch::Sender<Vec<DashboardEntry>>>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardState {
    pub fn new() -> Self {
        let (entries, _) = watch::channel(Vec::new());
        Self {
            entries: Arc::new(entries),
        }
    }

    pub fn replace(&self, entries: Vec<DashboardEntry>) {
        self.entries.send_replace(entries);
    }

    pub fn entries(&self) -> Vec<DashboardEntry> {
        self.entries.borrow().clone()
    }

    /// Watch for replacements
    pub fn watch(&self) -> watch::Receiver<Vec<DashboardEntry>> {
        self.entries.subscribe()
    }

    /// Callback suitable for [`super::Views::build_dashboard_view`]
    pub fn updater(&self) -> impl Fn(Vec<DashboardEntry>) + Send + Sync + 'static {
        let state = self.clone();
        move |entries| state.replace(entries)
    }
}
