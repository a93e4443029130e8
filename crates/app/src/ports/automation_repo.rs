//! Automation repository port — persistence for automation definitions.

use std::future::Future;

use mailflow_domain::automation::{Automation, TriggerCategory};
use mailflow_domain::error::MailflowError;
use mailflow_domain::id::AutomationId;

/// Repository for persisting and querying [`Automation`]s together with
/// their steps.
pub trait AutomationRepository {
    /// Create a new automation and its steps.
    fn create(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, MailflowError>> + Send;

    /// Get an automation by its unique identifier.
    fn get_by_id(
        &self,
        id: AutomationId,
    ) -> impl Future<Output = Result<Option<Automation>, MailflowError>> + Send;

    /// Get all automations.
    fn get_all(&self) -> impl Future<Output = Result<Vec<Automation>, MailflowError>> + Send;

    /// Get every active automation started by `trigger`.
    fn get_active_by_trigger(
        &self,
        trigger: TriggerCategory,
    ) -> impl Future<Output = Result<Vec<Automation>, MailflowError>> + Send;

    /// Update an existing automation's name, trigger and `active` flag.
    /// Stored steps are left exactly as they are.
    fn update(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, MailflowError>> + Send;

    /// [`update`](Self::update), also replacing the stored step list
    /// wholesale by `automation.steps` in the same transaction.
    fn replace_steps(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, MailflowError>> + Send;

    /// Delete an automation, cascading to its steps, runs and tickets.
    fn delete(&self, id: AutomationId) -> impl Future<Output = Result<(), MailflowError>> + Send;
}

impl<T: AutomationRepository + Send + Sync> AutomationRepository for std::sync::Arc<T> {
    fn create(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, MailflowError>> + Send {
        (**self).create(automation)
    }

    fn get_by_id(
        &self,
        id: AutomationId,
    ) -> impl Future<Output = Result<Option<Automation>, MailflowError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Automation>, MailflowError>> + Send {
        (**self).get_all()
    }

    fn get_active_by_trigger(
        &self,
        trigger: TriggerCategory,
    ) -> impl Future<Output = Result<Vec<Automation>, MailflowError>> + Send {
        (**self).get_active_by_trigger(trigger)
    }

    fn update(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, MailflowError>> + Send {
        (**self).update(automation)
    }

    fn replace_steps(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, MailflowError>> + Send {
        (**self).replace_steps(automation)
    }

    fn delete(&self, id: AutomationId) -> impl Future<Output = Result<(), MailflowError>> + Send {
        (**self).delete(id)
    }
}
