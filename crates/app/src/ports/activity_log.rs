//! Activity log port — append-only audit trail.

use std::future::Future;

use mailflow_domain::activity::ActivityEntry;
use mailflow_domain::error::MailflowError;

pub trait ActivityLog {
    fn record(
        &self,
        entry: ActivityEntry,
    ) -> impl Future<Output = Result<(), MailflowError>> + Send;

    /// Most recent entries, newest first.
    fn get_recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ActivityEntry>, MailflowError>> + Send;
}
