//! Event store port — persistence for domain events.

use std::future::Future;

use mailflow_domain::error::MailflowError;
use mailflow_domain::event::Event;
use mailflow_domain::id::{EventId, RunId};

/// Repository for persisting and querying [`Event`]s.
pub trait EventStore {
    /// Persist a new event.
    fn store(&self, event: Event) -> impl Future<Output = Result<Event, MailflowError>> + Send;

    /// Get an event by its unique identifier.
    fn get_by_id(
        &self,
        id: EventId,
    ) -> impl Future<Output = Result<Option<Event>, MailflowError>> + Send;

    /// Get the most recent events, ordered newest-first.
    fn get_recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Event>, MailflowError>> + Send;

    /// Find events for a specific run, ordered newest-first.
    fn find_by_run(
        &self,
        run_id: RunId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Event>, MailflowError>> + Send;
}
