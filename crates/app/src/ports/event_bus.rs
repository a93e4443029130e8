//! Event bus port — fire-and-forget publication of run lifecycle events.

use std::future::Future;

use mailflow_domain::error::MailflowError;
use mailflow_domain::event::Event;

/// Publishes domain events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), MailflowError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), MailflowError>> + Send {
        (**self).publish(event)
    }
}
