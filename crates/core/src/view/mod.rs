//! View assembly
//!
//! Composes repository results into the read models behind the dashboard
//! (live, per owner), the public task page (point-in-time, per task) and
//! the landing page statistics.

mod dashboard;
mod detail;
mod share;

use serde::Serialize;

pub use dashboard::{DashboardEntry, DashboardState};
pub use detail::{CommentEntry, CommentThread, TaskDetailView};
pub use share::ShareLinks;

use crate::comment::CommentRepository;
use crate::policy::{self, Identity};
use crate::store::SubscriptionHandle;
use crate::task::TaskRepository;
use crate::{Error, Result};

/// Landing page counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeView {
    pub task_count: usize,
    pub comment_count: usize,
}

#[derive(Clone)]
pub struct Views {
    tasks: TaskRepository,
    comments: CommentRepository,
    links: ShareLinks,
}

impl Views {
    pub fn new(tasks: TaskRepository, comments: CommentRepository, links: ShareLinks) -> Self {
        Self {
            tasks,
            comments,
            links,
        }
    }

    pub fn tasks(&self) -> &TaskRepository {
        &self.tasks
    }

    pub fn comments(&self) -> &CommentRepository {
        &self.comments
    }

    pub fn links(&self) -> &ShareLinks {
        &self.links
    }

    /// Open the live dashboard of `identity`.
    ///
    /// The returned handle owns the underlying subscription; cancel or drop
    /// it when the dashboard goes away.
    pub async fn build_dashboard_view<F>(
        &self,
        identity: Option<&Identity>,
        on_update: F,
    ) -> Result<SubscriptionHandle>
    where
        F: Fn(Vec<DashboardEntry>) + Send + 'static,
    {
        let identity = identity.ok_or(Error::Unauthenticated)?;
        let links = self.links.clone();
        self.tasks
            .list_owned_tasks_live(&identity.email, move |tasks| {
                on_update(dashboard::entries(tasks, &links))
            })
            .await
    }

    /// Point-in-time version of the dashboard
    pub async fn dashboard_snapshot(&self, identity: Option<&Identity>) -> Result<Vec<DashboardEntry>> {
        let identity = identity.ok_or(Error::Unauthenticated)?;
        let tasks = self.tasks.list_owned_tasks(&identity.email).await?;
        Ok(dashboard::entries(tasks, &self.links))
    }

    /// Assemble the public page of a task.
    ///
    /// A missing task and a private one both yield the same `NotFound`, which
    /// carries nothing but the requested id.
    pub async fn build_task_detail_view(
        &self,
        task_id: &str,
        identity: Option<&Identity>,
    ) -> Result<TaskDetailView> {
        let task = match self.tasks.get_task_by_id(task_id).await? {
            Some(task) if task.is_public => task,
            _ => return Err(Error::NotFound(format!("Task {} not found", task_id))),
        };

        let comments = self
            .comments
            .list_comments_for_task(&task.id)
            .await?
            .into_iter()
            .map(|comment| CommentEntry::new(comment, identity))
            .collect();
        let can_comment = policy::can_create_comment(identity, &task);

        Ok(TaskDetailView {
            task,
            comments,
            can_comment,
        })
    }

    pub async fn build_home_view(&self) -> Result<HomeView> {
        Ok(HomeView {
            task_count: self.tasks.count_tasks().await?,
            comment_count: self.comments.count_comments().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, FileDocumentStore};
    use std::sync::Arc;
    use std::time::Duration;

    fn create_views() -> (Views, Arc<FileDocumentStore>) {
        let store = Arc::new(FileDocumentStore::in_memory());
        let shared: Arc<dyn DocumentStore> = store.clone();
        let views = Views::new(
            TaskRepository::new(Arc::clone(&shared)),
            CommentRepository::new(shared),
            ShareLinks::new("http://localhost:8081"),
        );
        (views, store)
    }

    fn alice() -> Identity {
        Identity::new("a@x.com", "Alice")
    }

    fn bob() -> Identity {
        Identity::new("b@x.com", "Bob")
    }

    #[tokio::test]
    async fn test_dashboard_requires_identity() {
        let (views, _store) = create_views();
        match views.build_dashboard_view(None, |_| {}).await {
            Err(Error::Unauthenticated) => {}
            Err(e) => panic!("Expected Unauthenticated, got: {:?}", e),
            Ok(_) => panic!("Expected Unauthenticated, got a subscription"),
        }
        assert!(matches!(
            views.dashboard_snapshot(None).await,
            Err(Error::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_dashboard_ends_in_final_store_contents() {
        let (views, store) = create_views();
        let state = DashboardState::new();
        let mut watcher = state.watch();

        let handle = views
            .build_dashboard_view(Some(&alice()), state.updater())
            .await
            .unwrap();

        let kept = views.tasks().create_task("a@x.com", "kept", true).await.unwrap();
        let removed = views.tasks().create_task("a@x.com", "removed", false).await.unwrap();
        views.tasks().create_task("b@x.com", "not mine", true).await.unwrap();
        views
            .tasks()
            .delete_task(&removed.id, Some(&alice()))
            .await
            .unwrap();

        let settled = tokio::time::timeout(
            Duration::from_secs(2),
            watcher.wait_for(|entries| {
                entries.len() == 1 && entries[0].task.id == kept.id
            }),
        )
        .await
        .is_ok_and(|result| result.is_ok());
        assert!(settled);

        let entries = state.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].share_url.as_deref(),
            Some(format!("http://localhost:8081/task/{}", kept.id).as_str())
        );

        drop(handle);
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_private_task_detail_is_not_found_for_everyone() {
        let (views, _store) = create_views();
        let task = views.tasks().create_task("a@x.com", "secret", false).await.unwrap();

        for identity in [None, Some(alice()), Some(bob())] {
            match views.build_task_detail_view(&task.id, identity.as_ref()).await {
                Err(Error::NotFound(message)) => assert!(!message.contains("secret")),
                other => panic!("Expected NotFound, got: {:?}", other),
            }
        }

        assert!(matches!(
            views.build_task_detail_view("missing", None).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_public_task_detail_flags() {
        let (views, _store) = create_views();
        let task = views.tasks().create_task("a@x.com", "public", true).await.unwrap();
        let comment = views
            .comments()
            .create_comment(&task, Some(&bob()), "first")
            .await
            .unwrap();

        let anonymous = views.build_task_detail_view(&task.id, None).await.unwrap();
        assert!(!anonymous.can_comment);
        assert_eq!(anonymous.comments.len(), 1);
        assert!(!anonymous.comments[0].can_delete);

        let author = views
            .build_task_detail_view(&task.id, Some(&bob()))
            .await
            .unwrap();
        assert!(author.can_comment);
        assert_eq!(author.comments[0].comment, comment);
        assert!(author.comments[0].can_delete);

        let owner = views
            .build_task_detail_view(&task.id, Some(&alice()))
            .await
            .unwrap();
        assert!(owner.can_comment);
        assert!(!owner.comments[0].can_delete);
    }

    #[tokio::test]
    async fn test_comment_thread_applies_only_successful_mutations() {
        let (views, _store) = create_views();
        let task = views.tasks().create_task("a@x.com", "public", true).await.unwrap();
        let view = views
            .build_task_detail_view(&task.id, Some(&bob()))
            .await
            .unwrap();
        let mut thread = CommentThread::new(view, Some(bob()));

        let posted = thread
            .submit(views.comments(), "hello")
            .await
            .unwrap()
            .comment
            .clone();
        assert_eq!(thread.entries().len(), 1);

        assert!(thread.submit(views.comments(), "").await.is_err());
        assert_eq!(thread.entries().len(), 1);

        // Someone else already removed it from the store
        views
            .comments()
            .delete_comment(&posted.id, Some(&bob()))
            .await
            .unwrap();
        assert!(thread.remove(views.comments(), &posted.id).await.is_err());
        assert_eq!(thread.entries().len(), 1);

        let second = thread
            .submit(views.comments(), "again")
            .await
            .unwrap()
            .comment
            .id
            .clone();
        thread.remove(views.comments(), &second).await.unwrap();
        assert_eq!(thread.entries().len(), 1);
        assert_eq!(thread.entries()[0].comment.id, posted.id);
    }

    #[tokio::test]
    async fn test_thread_cannot_post_after_task_deletion() {
        let (views, _store) = create_views();
        let task = views.tasks().create_task("a@x.com", "public", true).await.unwrap();
        let view = views
            .build_task_detail_view(&task.id, Some(&bob()))
            .await
            .unwrap();
        let mut thread = CommentThread::new(view, Some(bob()));

        views.tasks().delete_task(&task.id, Some(&alice())).await.unwrap();

        assert!(matches!(
            thread.submit(views.comments(), "anyone there?").await,
            Err(Error::NotFound(_))
        ));
        assert!(thread.entries().is_empty());
        assert_eq!(views.comments().count_comments().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_anonymous_thread_cannot_post() {
        let (views, _store) = create_views();
        let task = views.tasks().create_task("a@x.com", "public", true).await.unwrap();
        let view = views.build_task_detail_view(&task.id, None).await.unwrap();
        let mut thread = CommentThread::new(view, None);

        assert!(!thread.can_comment());
        assert!(matches!(
            thread.submit(views.comments(), "hi").await,
            Err(Error::Forbidden(_))
        ));
        assert!(thread.entries().is_empty());
    }

    #[tokio::test]
    async fn test_home_view_counts() {
        let (views, _store) = create_views();
        let task = views.tasks().create_task("a@x.com", "public", true).await.unwrap();
        views.tasks().create_task("a@x.com", "private", false).await.unwrap();
        views
            .comments()
            .create_comment(&task, Some(&bob()), "hi")
            .await
            .unwrap();

        let home = views.build_home_view().await.unwrap();
        assert_eq!(
            home,
            HomeView {
                task_count: 2,
                comment_count: 1
            }
        );
    }
}
