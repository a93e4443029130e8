//! Trigger resolver — turns business events into runs.

use std::sync::Arc;

use mailflow_domain::automation::TriggerCategory;
use mailflow_domain::error::{MailflowError, NotFoundError};
use mailflow_domain::id::SubscriberId;
use mailflow_domain::run::Run;

use crate::automation_engine::{AutomationEngine, StartOutcome};
use crate::ports::{Adapters, AutomationRepository, Ports, SubscriberRepository};

/// Starts one run per active definition whose trigger matches an event.
///
/// No deduplication: a subscriber that triggers the same category twice gets
/// two concurrent runs of every matching definition.
pub struct TriggerResolver<P: Ports> {
    ports: Adapters<P>,
    engine: Arc<AutomationEngine<P>>,
}

impl<P: Ports> TriggerResolver<P> {
    pub fn new(ports: Adapters<P>, engine: Arc<AutomationEngine<P>>) -> Self {
        Self { ports, engine }
    }

    /// Start runs of every active definition triggered by `category` for
    /// `subscriber_id`. Returns the runs that were created.
    ///
    /// A definition that fails to start is logged and does not prevent the
    /// remaining definitions from starting. [`TriggerCategory::Manual`]
    /// never resolves to anything.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] when the subscriber does not
    /// exist, or a storage error when listing definitions fails.
    #[tracing::instrument(skip(self))]
    pub async fn on_event(
        &self,
        category: TriggerCategory,
        subscriber_id: SubscriberId,
    ) -> Result<Vec<Run>, MailflowError> {
        if !category.is_event_driven() {
            return Ok(Vec::new());
        }
        if self
            .ports
            .subscribers
            .get_by_id(subscriber_id)
            .await?
            .is_none()
        {
            return Err(NotFoundError {
                entity: "Subscriber",
                id: subscriber_id.to_string(),
            }
            .into());
        }

        let automations = self
            .ports
            .automations
            .get_active_by_trigger(category)
            .await?;
        tracing::debug!(matched = automations.len(), "resolved trigger");

        let mut runs = Vec::with_capacity(automations.len());
        for automation in automations {
            match self.engine.start_run(automation.id, subscriber_id).await {
                Ok(StartOutcome::Started(run)) => runs.push(run),
                Ok(StartOutcome::NoSteps) => {}
                Err(err) => {
                    tracing::warn!(automation_id = %automation.id, error = %err, "failed to start triggered run");
                }
            }
        }
        Ok(runs)
    }
}
