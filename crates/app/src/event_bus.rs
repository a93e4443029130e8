//! In-process event bus backed by a tokio broadcast channel.

use std::future::Future;

use tokio::sync::broadcast;

use mailflow_domain::error::MailflowError;
use mailflow_domain::event::Event;

use crate::ports::{EventPublisher, EventStore};

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped).
pub struct InProcessEventBus {
    sender: broadcast::Sender<Event>,
}

impl InProcessEventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events on this bus.
    ///
    /// Returns a receiver that will get all events published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), MailflowError>> + Send {
        // no receivers is not an error
        let _ = self.sender.send(event);
        async { Ok(()) }
    }
}

/// Drain `rx` into `store` until the bus is dropped.
///
/// A receiver that falls behind loses the overwritten events; the loss is
/// logged and recording continues with the oldest event still buffered.
pub async fn persist_events<S: EventStore>(mut rx: broadcast::Receiver<Event>, store: S) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let event_id = event.id;
                if let Err(err) = store.store(event).await {
                    tracing::warn!(%event_id, error = %err, "failed to persist event");
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event recorder lagged behind the bus");
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::debug!("event bus closed, recorder stopping");
                break;
            }
        }
    }
}
