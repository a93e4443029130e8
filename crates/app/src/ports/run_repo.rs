//! Run repository port — persistence for run records.

use std::future::Future;

use mailflow_domain::error::MailflowError;
use mailflow_domain::id::{AutomationId, RunId, SubscriberId};
use mailflow_domain::run::{Run, RunStatus};

/// Optional constraints for [`RunRepository::list`]. Empty means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFilter {
    pub status: Option<RunStatus>,
    pub automation_id: Option<AutomationId>,
    pub subscriber_id: Option<SubscriberId>,
    pub limit: Option<usize>,
}

impl RunFilter {
    /// Whether `run` satisfies every set constraint (ignores `limit`).
    #[must_use]
    pub fn matches(&self, run: &Run) -> bool {
        self.status.is_none_or(|s| run.status == s)
            && self.automation_id.is_none_or(|id| run.automation_id == id)
            && self.subscriber_id.is_none_or(|id| run.subscriber_id == id)
    }
}

/// Repository for [`Run`]s.
///
/// `paused` is owned by operators: [`update`](Self::update) persists
/// progress only and never overwrites it; use
/// [`set_paused`](Self::set_paused) instead.
pub trait RunRepository {
    fn create(&self, run: Run) -> impl Future<Output = Result<Run, MailflowError>> + Send;

    fn get_by_id(
        &self,
        id: RunId,
    ) -> impl Future<Output = Result<Option<Run>, MailflowError>> + Send;

    /// Runs matching `filter`, newest first.
    fn list(
        &self,
        filter: RunFilter,
    ) -> impl Future<Output = Result<Vec<Run>, MailflowError>> + Send;

    /// Persist progress fields: `current_step`, `status`, `halted_at`,
    /// `completed_at`, `error_message`.
    fn update(&self, run: Run) -> impl Future<Output = Result<Run, MailflowError>> + Send;

    /// Set or clear the operator pause flag. Returns `None` if the run is gone.
    fn set_paused(
        &self,
        id: RunId,
        paused: bool,
    ) -> impl Future<Output = Result<Option<Run>, MailflowError>> + Send;

    /// Clear `halted_at` if it still equals `step` on a `running` run.
    ///
    /// Compare-and-set: of several concurrent callers at most one gets
    /// `Some` and owns re-executing the run from `step`.
    fn claim_halt(
        &self,
        id: RunId,
        step: u32,
    ) -> impl Future<Output = Result<Option<Run>, MailflowError>> + Send;

    /// Delete a run and its delay ticket.
    fn delete(&self, id: RunId) -> impl Future<Output = Result<(), MailflowError>> + Send;
}

impl<T: RunRepository + Send + Sync> RunRepository for std::sync::Arc<T> {
    fn create(&self, run: Run) -> impl Future<Output = Result<Run, MailflowError>> + Send {
        (**self).create(run)
    }

    fn get_by_id(
        &self,
        id: RunId,
    ) -> impl Future<Output = Result<Option<Run>, MailflowError>> + Send {
        (**self).get_by_id(id)
    }

    fn list(
        &self,
        filter: RunFilter,
    ) -> impl Future<Output = Result<Vec<Run>, MailflowError>> + Send {
        (**self).list(filter)
    }

    fn update(&self, run: Run) -> impl Future<Output = Result<Run, MailflowError>> + Send {
        (**self).update(run)
    }

    fn set_paused(
        &self,
        id: RunId,
        paused: bool,
    ) -> impl Future<Output = Result<Option<Run>, MailflowError>> + Send {
        (**self).set_paused(id, paused)
    }

    fn claim_halt(
        &self,
        id: RunId,
        step: u32,
    ) -> impl Future<Output = Result<Option<Run>, MailflowError>> + Send {
        (**self).claim_halt(id, step)
    }

    fn delete(&self, id: RunId) -> impl Future<Output = Result<(), MailflowError>> + Send {
        (**self).delete(id)
    }
}
