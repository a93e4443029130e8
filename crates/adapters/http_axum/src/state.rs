//! Shared application state for axum handlers.

use std::sync::Arc;

use mailflow_app::automation_engine::AutomationEngine;
use mailflow_app::event_bus::InProcessEventBus;
use mailflow_app::ports::{Adapters, EventStore, Ports};
use mailflow_app::services::automation_service::AutomationService;
use mailflow_app::services::run_service::RunService;
use mailflow_app::services::subscriber_service::SubscriberService;
use mailflow_app::trigger_resolver::TriggerResolver;

/// Application state shared across all axum handlers.
///
/// Generic over the port selection `P` and the event store to avoid dynamic
/// dispatch. `Clone` is implemented manually so the underlying types
/// themselves do not need to be `Clone`; only the `Arc` wrappers are cloned.
pub struct AppState<P: Ports, ES> {
    /// Definition CRUD.
    pub automation_service: Arc<AutomationService<Arc<P::Automations>>>,
    /// Run queries.
    pub run_service: Arc<RunService<Arc<P::Runs>>>,
    /// Subscriber mutations that fire triggers.
    pub subscriber_service: Arc<SubscriberService<P>>,
    /// Manual starts, sweeps, and run control.
    pub engine: Arc<AutomationEngine<P>>,
    pub triggers: Arc<TriggerResolver<P>>,
    /// Persisted lifecycle events.
    pub event_store: Arc<ES>,
    /// Live lifecycle events for the SSE stream.
    pub event_bus: Arc<InProcessEventBus>,
    pub ports: Adapters<P>,
}

impl<P: Ports, ES> Clone for AppState<P, ES> {
    fn clone(&self) -> Self {
        Self {
            automation_service: Arc::clone(&self.automation_service),
            run_service: Arc::clone(&self.run_service),
            subscriber_service: Arc::clone(&self.subscriber_service),
            engine: Arc::clone(&self.engine),
            triggers: Arc::clone(&self.triggers),
            event_store: Arc::clone(&self.event_store),
            event_bus: Arc::clone(&self.event_bus),
            ports: self.ports.clone(),
        }
    }
}

impl<P, ES> AppState<P, ES>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    /// Build every service on top of one shared engine.
    ///
    /// The engine is passed in pre-wrapped so the composition root can share
    /// it with the background sweeper.
    pub fn new(
        ports: Adapters<P>,
        engine: Arc<AutomationEngine<P>>,
        event_store: ES,
        event_bus: Arc<InProcessEventBus>,
    ) -> Self {
        let triggers = Arc::new(TriggerResolver::new(ports.clone(), Arc::clone(&engine)));
        Self {
            automation_service: Arc::new(AutomationService::new(Arc::clone(&ports.automations))),
            run_service: Arc::new(RunService::new(Arc::clone(&ports.runs))),
            subscriber_service: Arc::new(SubscriberService::new(
                ports.clone(),
                Arc::clone(&triggers),
            )),
            engine,
            triggers,
            event_store: Arc::new(event_store),
            event_bus,
            ports,
        }
    }
}
