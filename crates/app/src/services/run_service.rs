//! Run service — read-side queries over runs.

use mailflow_domain::error::{MailflowError, NotFoundError};
use mailflow_domain::id::RunId;
use mailflow_domain::run::Run;

use crate::ports::{RunFilter, RunRepository};

pub struct RunService<R> {
    repo: R,
}

impl<R: RunRepository> RunService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] when no run with `id` exists, or a
    /// storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn get_run(&self, id: RunId) -> Result<Run, MailflowError> {
        self.repo.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Run",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// Runs matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_runs(&self, filter: RunFilter) -> Result<Vec<Run>, MailflowError> {
        self.repo.list(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::InMemoryStore;
    use mailflow_domain::id::{AutomationId, SubscriberId};
    use mailflow_domain::run::RunStatus;

    async fn seeded() -> (RunService<InMemoryStore>, Run, Run) {
        let store = InMemoryStore::default();
        let automation_id = AutomationId::new();
        let running = Run::start(automation_id, SubscriberId::new());
        let mut waiting = Run::start(automation_id, SubscriberId::new());
        waiting.suspend();
        store.create(running.clone()).await.unwrap();
        store.create(waiting.clone()).await.unwrap();
        (RunService::new(store), running, waiting)
    }

    #[tokio::test]
    async fn should_get_run_by_id() {
        let (svc, running, _) = seeded().await;
        let fetched = svc.get_run(running.id).await.unwrap();
        assert_eq!(fetched, running);
    }

    #[tokio::test]
    async fn should_return_not_found_when_run_missing() {
        let (svc, _, _) = seeded().await;
        let result = svc.get_run(RunId::new()).await;
        assert!(matches!(result, Err(MailflowError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_filter_runs_by_status() {
        let (svc, _, waiting) = seeded().await;
        let runs = svc
            .list_runs(RunFilter {
                status: Some(RunStatus::Waiting),
                ..RunFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(runs, vec![waiting]);
    }

    #[tokio::test]
    async fn should_filter_runs_by_subscriber() {
        let (svc, running, _) = seeded().await;
        let runs = svc
            .list_runs(RunFilter {
                subscriber_id: Some(running.subscriber_id),
                ..RunFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, running.id);
    }

    #[tokio::test]
    async fn should_list_all_runs_with_empty_filter() {
        let (svc, _, _) = seeded().await;
        let runs = svc.list_runs(RunFilter::default()).await.unwrap();
        assert_eq!(runs.len(), 2);
    }
}
