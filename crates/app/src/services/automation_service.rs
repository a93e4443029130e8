//! Automation service — use-cases for authoring automation definitions.

use mailflow_domain::automation::{Action, Automation};
use mailflow_domain::error::{MailflowError, NotFoundError, ValidationError};
use mailflow_domain::id::AutomationId;
use mailflow_domain::time::now;

use crate::ports::AutomationRepository;

/// Partial update of an [`Automation`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct AutomationUpdate {
    pub name: Option<String>,
    pub active: Option<bool>,
    /// Full replacement of the step list, renumbered from `0`.
    pub steps: Option<Vec<Action>>,
}

/// Application service for automation CRUD operations.
pub struct AutomationService<R> {
    repo: R,
}

/// Reject steps that would be skipped at execution time.
fn validate_actions<'a>(actions: impl IntoIterator<Item = &'a Action>) -> Result<(), MailflowError> {
    for (order, action) in (0u32..).zip(actions) {
        action
            .validate()
            .map_err(|reason| ValidationError::MalformedStep { order, reason })?;
    }
    Ok(())
}

impl<R: AutomationRepository> AutomationService<R> {
    /// Create a new service backed by the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Create a new automation after validating domain invariants and
    /// every step payload.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::Validation`] if invariants fail or a step is
    /// malformed, or a storage error propagated from the repository.
    #[tracing::instrument(skip(self, automation), fields(automation_name = %automation.name))]
    pub async fn create_automation(
        &self,
        automation: Automation,
    ) -> Result<Automation, MailflowError> {
        automation.validate()?;
        validate_actions(automation.steps.iter().map(|s| &s.action))?;
        self.repo.create(automation).await
    }

    /// Look up an automation by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] when no automation with `id` exists,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn get_automation(&self, id: AutomationId) -> Result<Automation, MailflowError> {
        self.repo.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Automation",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List all automations.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_automations(&self) -> Result<Vec<Automation>, MailflowError> {
        self.repo.get_all().await
    }

    /// Apply a partial update.
    ///
    /// Replacing steps does not touch in-flight runs: they continue by index
    /// against the new list.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] if the automation does not exist,
    /// [`MailflowError::Validation`] if the result is invalid, or a storage
    /// error from the repository.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_automation(
        &self,
        id: AutomationId,
        update: AutomationUpdate,
    ) -> Result<Automation, MailflowError> {
        let mut automation = self.get_automation(id).await?;
        if let Some(name) = update.name {
            automation.name = name;
        }
        if let Some(active) = update.active {
            automation.active = active;
        }
        let Some(actions) = update.steps else {
            automation.updated_at = now();
            automation.validate()?;
            return self.repo.update(automation).await;
        };
        validate_actions(&actions)?;
        automation.replace_steps(actions);
        automation.updated_at = now();
        automation.validate()?;
        self.repo.replace_steps(automation).await
    }

    /// Delete an automation together with its runs and tickets.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] if the automation does not exist,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn delete_automation(&self, id: AutomationId) -> Result<(), MailflowError> {
        self.get_automation(id).await?;
        self.repo.delete(id).await
    }

    /// Set `active` back to `true`. Existing runs are left as they are.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] if the automation does not exist,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn reactivate(&self, id: AutomationId) -> Result<Automation, MailflowError> {
        let mut automation = self.get_automation(id).await?;
        if automation.active {
            return Ok(automation);
        }
        automation.active = true;
        self.repo.update(automation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{InMemoryStore, send};
    use mailflow_domain::automation::{Step, TriggerCategory};

    fn make_service() -> AutomationService<InMemoryStore> {
        AutomationService::new(InMemoryStore::default())
    }

    fn valid_automation() -> Automation {
        Automation::builder()
            .name("Test automation")
            .trigger(TriggerCategory::SubjectCreated)
            .step(send("Welcome"))
            .step(Action::Wait { minutes: 10 })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn should_create_automation_when_valid() {
        let svc = make_service();
        let auto = valid_automation();
        let id = auto.id;

        let created = svc.create_automation(auto).await.unwrap();
        assert_eq!(created.id, id);

        let fetched = svc.get_automation(id).await.unwrap();
        assert_eq!(fetched.name, "Test automation");
        assert_eq!(fetched.steps.len(), 2);
    }

    #[tokio::test]
    async fn should_reject_create_when_name_is_empty() {
        let svc = make_service();
        let mut auto = valid_automation();
        auto.name = String::new();

        let result = svc.create_automation(auto).await;
        assert!(matches!(
            result,
            Err(MailflowError::Validation(ValidationError::EmptyName))
        ));
    }

    #[tokio::test]
    async fn should_reject_create_when_step_is_malformed() {
        let svc = make_service();
        let mut auto = valid_automation();
        auto.steps.push(Step::decode(2, "email", None));

        let result = svc.create_automation(auto).await;
        assert!(matches!(
            result,
            Err(MailflowError::Validation(ValidationError::MalformedStep {
                order: 2,
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn should_return_not_found_when_automation_missing() {
        let svc = make_service();
        let result = svc.get_automation(AutomationId::new()).await;
        assert!(matches!(result, Err(MailflowError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_list_all_automations() {
        let svc = make_service();
        svc.create_automation(valid_automation()).await.unwrap();
        let mut auto2 = valid_automation();
        auto2.id = AutomationId::new();
        auto2.name = "Second".to_string();
        svc.create_automation(auto2).await.unwrap();

        let all = svc.list_automations().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn should_update_name_and_keep_steps() {
        let svc = make_service();
        let auto = svc.create_automation(valid_automation()).await.unwrap();

        let saved = svc
            .update_automation(
                auto.id,
                AutomationUpdate {
                    name: Some("Updated name".to_string()),
                    ..AutomationUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(saved.name, "Updated name");
        assert_eq!(saved.steps, auto.steps);
        assert!(saved.updated_at >= auto.updated_at);
    }

    #[tokio::test]
    async fn should_renumber_replaced_steps_from_zero() {
        let svc = make_service();
        let auto = svc.create_automation(valid_automation()).await.unwrap();

        let saved = svc
            .update_automation(
                auto.id,
                AutomationUpdate {
                    steps: Some(vec![send("a"), send("b"), send("c")]),
                    ..AutomationUpdate::default()
                },
            )
            .await
            .unwrap();

        let orders: Vec<u32> = saved.steps.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn should_reject_update_with_blank_subject() {
        let svc = make_service();
        let auto = svc.create_automation(valid_automation()).await.unwrap();

        let result = svc
            .update_automation(
                auto.id,
                AutomationUpdate {
                    steps: Some(vec![send("ok"), send("")]),
                    ..AutomationUpdate::default()
                },
            )
            .await;

        assert!(matches!(
            result,
            Err(MailflowError::Validation(ValidationError::MalformedStep {
                order: 1,
                ..
            }))
        ));
        assert_eq!(svc.get_automation(auto.id).await.unwrap().steps, auto.steps);
    }

    #[tokio::test]
    async fn should_keep_undecodable_steps_when_only_flags_change() {
        let svc = make_service();
        let auto = svc.create_automation(valid_automation()).await.unwrap();
        let legacy = Step::decode(0, "email", None);
        svc.repo
            .state
            .lock()
            .unwrap()
            .automations
            .get_mut(&auto.id)
            .unwrap()
            .steps[0] = legacy.clone();

        svc.update_automation(
            auto.id,
            AutomationUpdate {
                active: Some(false),
                ..AutomationUpdate::default()
            },
        )
        .await
        .unwrap();

        let stored = svc.get_automation(auto.id).await.unwrap();
        assert!(!stored.active);
        assert_eq!(stored.steps[0], legacy);
        assert_eq!(stored.steps[1], auto.steps[1]);
    }

    #[tokio::test]
    async fn should_reject_update_with_unbounded_wait() {
        let svc = make_service();
        let auto = svc.create_automation(valid_automation()).await.unwrap();

        let result = svc
            .update_automation(
                auto.id,
                AutomationUpdate {
                    steps: Some(vec![Action::Wait { minutes: u32::MAX }]),
                    ..AutomationUpdate::default()
                },
            )
            .await;

        assert!(matches!(
            result,
            Err(MailflowError::Validation(ValidationError::MalformedStep {
                order: 0,
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn should_reactivate_inactive_automation() {
        let svc = make_service();
        let mut auto = valid_automation();
        auto.active = false;
        let auto = svc.create_automation(auto).await.unwrap();

        let reactivated = svc.reactivate(auto.id).await.unwrap();

        assert!(reactivated.active);
        assert_eq!(reactivated.updated_at, auto.updated_at);
    }

    #[tokio::test]
    async fn should_delete_automation() {
        let svc = make_service();
        let auto = svc.create_automation(valid_automation()).await.unwrap();

        svc.delete_automation(auto.id).await.unwrap();

        let result = svc.get_automation(auto.id).await;
        assert!(matches!(result, Err(MailflowError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_return_not_found_when_deleting_missing_automation() {
        let svc = make_service();
        let result = svc.delete_automation(AutomationId::new()).await;
        assert!(matches!(result, Err(MailflowError::NotFound(_))));
    }
}
