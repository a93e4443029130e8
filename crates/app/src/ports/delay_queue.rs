//! Delay queue port — durable resume markers for waiting runs.

use std::future::Future;

use mailflow_domain::delay::DelayTicket;
use mailflow_domain::error::MailflowError;
use mailflow_domain::id::RunId;
use mailflow_domain::run::Run;
use mailflow_domain::time::Timestamp;

/// Outcome of [`DelayQueue::claim`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// The ticket was consumed and its run flipped back to `running`.
    Resumed(Run),
    /// The ticket was consumed but its run is gone or terminal.
    Orphaned,
    /// Another sweep consumed the ticket first.
    AlreadyClaimed,
}

pub trait DelayQueue {
    /// Persist `ticket` and the now-`waiting` `run` in one transaction.
    fn suspend(
        &self,
        run: Run,
        ticket: DelayTicket,
    ) -> impl Future<Output = Result<Run, MailflowError>> + Send;

    /// Tickets with `execute_after <= now`, earliest first, at most `limit`.
    fn due(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<DelayTicket>, MailflowError>> + Send;

    /// Atomically delete `ticket` and, if its run is still resumable, set
    /// the run back to `running`.
    ///
    /// The delete, the eligibility check and the status change happen in a
    /// single transaction so concurrent sweeps cannot both resume a run.
    fn claim(
        &self,
        ticket: &DelayTicket,
    ) -> impl Future<Output = Result<Claim, MailflowError>> + Send;

    fn find_by_run(
        &self,
        run_id: RunId,
    ) -> impl Future<Output = Result<Option<DelayTicket>, MailflowError>> + Send;
}
