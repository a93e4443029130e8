//! Subscriber — the subject an automation runs on behalf of.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{MailflowError, ValidationError};
use crate::id::SubscriberId;
use crate::time::{Timestamp, now};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub email: String,
    pub name: Option<String>,
    /// Free-form custom fields; `None` marks an explicitly cleared value.
    pub fields: BTreeMap<String, Option<String>>,
    pub created_at: Timestamp,
}

impl Subscriber {
    #[must_use]
    pub fn builder() -> SubscriberBuilder {
        SubscriberBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyAddress`] when `email` is blank.
    pub fn validate(&self) -> Result<(), MailflowError> {
        if self.email.trim().is_empty() {
            return Err(ValidationError::EmptyAddress.into());
        }
        Ok(())
    }

    /// Store a JSON value under `key`.
    ///
    /// `null` clears the value, strings are kept verbatim and every other
    /// value is stored in its JSON text form.
    pub fn set_field(&mut self, key: impl Into<String>, value: &serde_json::Value) {
        let text = match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        };
        self.fields.insert(key.into(), text);
    }

    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Option::as_deref)
    }
}

#[derive(Debug, Default)]
pub struct SubscriberBuilder {
    id: Option<SubscriberId>,
    email: Option<String>,
    name: Option<String>,
    fields: BTreeMap<String, Option<String>>,
    created_at: Option<Timestamp>,
}

impl SubscriberBuilder {
    #[must_use]
    pub fn id(mut self, id: SubscriberId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: Option<String>) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn fields(mut self, fields: BTreeMap<String, Option<String>>) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub fn created_at(mut self, ts: Timestamp) -> Self {
        self.created_at = Some(ts);
        self
    }

    /// Consume the builder, validate, and return a [`Subscriber`].
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::Validation`] if the address is blank.
    pub fn build(self) -> Result<Subscriber, MailflowError> {
        let subscriber = Subscriber {
            id: self.id.unwrap_or_default(),
            email: self.email.unwrap_or_default().trim().to_string(),
            name: self.name,
            fields: self.fields,
            created_at: self.created_at.unwrap_or_else(now),
        };
        subscriber.validate()?;
        Ok(subscriber)
    }
}
