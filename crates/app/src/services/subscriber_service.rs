//! Subscriber service — the business events that feed the trigger resolver.
//!
//! Every mutation here that corresponds to a trigger category resolves it
//! after the change is persisted.

use std::collections::BTreeMap;
use std::sync::Arc;

use mailflow_domain::automation::TriggerCategory;
use mailflow_domain::error::{MailflowError, NotFoundError, ValidationError};
use mailflow_domain::id::{GroupId, LabelId, SubscriberId};
use mailflow_domain::run::Run;
use mailflow_domain::subscriber::Subscriber;

use crate::ports::{Adapters, MembershipStore, Ports, SubscriberRepository};
use crate::trigger_resolver::TriggerResolver;

/// A subscriber together with its group and label memberships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberProfile {
    pub subscriber: Subscriber,
    pub groups: Vec<GroupId>,
    pub labels: Vec<LabelId>,
}

pub struct SubscriberService<P: Ports> {
    ports: Adapters<P>,
    triggers: Arc<TriggerResolver<P>>,
}

impl<P: Ports> SubscriberService<P> {
    pub fn new(ports: Adapters<P>, triggers: Arc<TriggerResolver<P>>) -> Self {
        Self { ports, triggers }
    }

    /// Persist a new subscriber and start `subject_created` automations.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateAddress`] if the address is taken,
    /// or a storage error.
    #[tracing::instrument(skip(self, subscriber), fields(subscriber_id = %subscriber.id))]
    pub async fn create_subscriber(
        &self,
        subscriber: Subscriber,
    ) -> Result<(Subscriber, Vec<Run>), MailflowError> {
        subscriber.validate()?;
        if self
            .ports
            .subscribers
            .get_by_email(&subscriber.email)
            .await?
            .is_some()
        {
            return Err(ValidationError::DuplicateAddress(subscriber.email).into());
        }
        let subscriber = self.ports.subscribers.create(subscriber).await?;
        let runs = self
            .triggers
            .on_event(TriggerCategory::SubjectCreated, subscriber.id)
            .await?;
        Ok((subscriber, runs))
    }

    /// Create every subscriber whose address is new, skipping the rest.
    /// Imports resolve `subject_created` like single creations.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::Validation`] if any entry is invalid (nothing
    /// is imported), or a storage error.
    #[tracing::instrument(skip(self, subscribers), fields(count = subscribers.len()))]
    pub async fn import_subscribers(
        &self,
        subscribers: Vec<Subscriber>,
    ) -> Result<Vec<Subscriber>, MailflowError> {
        for subscriber in &subscribers {
            subscriber.validate()?;
        }
        let mut created = Vec::new();
        for subscriber in subscribers {
            match self.create_subscriber(subscriber).await {
                Ok((subscriber, _)) => created.push(subscriber),
                Err(MailflowError::Validation(ValidationError::DuplicateAddress(email))) => {
                    tracing::debug!(%email, "skipping existing subscriber");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] if the subscriber does not exist.
    pub async fn get_subscriber(&self, id: SubscriberId) -> Result<SubscriberProfile, MailflowError> {
        let subscriber = self.load(id).await?;
        let groups = self.ports.memberships.groups_of(id).await?;
        let labels = self.ports.memberships.labels_of(id).await?;
        Ok(SubscriberProfile {
            subscriber,
            groups,
            labels,
        })
    }

    /// Delete a subscriber; its runs and delay tickets go with it.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] if the subscriber does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn delete_subscriber(&self, id: SubscriberId) -> Result<(), MailflowError> {
        self.load(id).await?;
        self.ports.subscribers.delete(id).await
    }

    /// Merge `fields` into the subscriber's field bag and start
    /// `field_changed` automations.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] if the subscriber does not exist.
    #[tracing::instrument(skip(self, fields))]
    pub async fn update_fields(
        &self,
        id: SubscriberId,
        fields: BTreeMap<String, serde_json::Value>,
    ) -> Result<(Subscriber, Vec<Run>), MailflowError> {
        let mut subscriber = self.load(id).await?;
        for (key, value) in &fields {
            subscriber.set_field(key.clone(), value);
        }
        let subscriber = self.ports.subscribers.update(subscriber).await?;
        let runs = self
            .triggers
            .on_event(TriggerCategory::FieldChanged, id)
            .await?;
        Ok((subscriber, runs))
    }

    /// Add the subscriber to a group and start `joined_group` automations.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] if the subscriber does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn join_group(
        &self,
        id: SubscriberId,
        group_id: GroupId,
    ) -> Result<Vec<Run>, MailflowError> {
        self.load(id).await?;
        self.ports.memberships.join_group(id, group_id).await?;
        self.triggers
            .on_event(TriggerCategory::JoinedGroup, id)
            .await
    }

    /// Remove the subscriber from a group and start `left_group` automations.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] if the subscriber does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn leave_group(
        &self,
        id: SubscriberId,
        group_id: GroupId,
    ) -> Result<Vec<Run>, MailflowError> {
        self.load(id).await?;
        self.ports.memberships.leave_group(id, group_id).await?;
        self.triggers.on_event(TriggerCategory::LeftGroup, id).await
    }

    async fn load(&self, id: SubscriberId) -> Result<Subscriber, MailflowError> {
        self.ports.subscribers.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Subscriber",
                id: id.to_string(),
            }
            .into()
        })
    }
}
