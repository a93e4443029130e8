//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

use std::sync::Arc;

pub mod activity_log;
pub mod automation_repo;
pub mod delay_queue;
pub mod event_bus;
pub mod event_store;
pub mod membership;
pub mod message_sender;
pub mod run_repo;
pub mod subscriber_repo;

pub use activity_log::ActivityLog;
pub use automation_repo::AutomationRepository;
pub use delay_queue::{Claim, DelayQueue};
pub use event_bus::EventPublisher;
pub use event_store::EventStore;
pub use membership::MembershipStore;
pub use message_sender::MessageSender;
pub use run_repo::{RunFilter, RunRepository};
pub use subscriber_repo::SubscriberRepository;

/// Type-level selection of one implementation per port.
///
/// Use-cases are generic over a single `P: Ports` instead of one parameter
/// per collaborator. Implemented by a zero-sized marker in the composition
/// root and in tests.
pub trait Ports: Send + Sync + 'static {
    type Automations: AutomationRepository + Send + Sync + 'static;
    type Runs: RunRepository + Send + Sync + 'static;
    type Delays: DelayQueue + Send + Sync + 'static;
    type Subscribers: SubscriberRepository + Send + Sync + 'static;
    type Memberships: MembershipStore + Send + Sync + 'static;
    type Messages: MessageSender + Send + Sync + 'static;
    type Events: EventPublisher + Send + Sync + 'static;
    type Activity: ActivityLog + Send + Sync + 'static;
}

/// Shared handles to the adapters selected by `P`.
pub struct Adapters<P: Ports> {
    pub automations: Arc<P::Automations>,
    pub runs: Arc<P::Runs>,
    pub delays: Arc<P::Delays>,
    pub subscribers: Arc<P::Subscribers>,
    pub memberships: Arc<P::Memberships>,
    pub messages: Arc<P::Messages>,
    pub events: Arc<P::Events>,
    pub activity: Arc<P::Activity>,
}

impl<P: Ports> Clone for Adapters<P> {
    fn clone(&self) -> Self {
        Self {
            automations: Arc::clone(&self.automations),
            runs: Arc::clone(&self.runs),
            delays: Arc::clone(&self.delays),
            subscribers: Arc::clone(&self.subscribers),
            memberships: Arc::clone(&self.memberships),
            messages: Arc::clone(&self.messages),
            events: Arc::clone(&self.events),
            activity: Arc::clone(&self.activity),
        }
    }
}
