//! Automation — a named, ordered list of steps started by a trigger category.
//!
//! A definition's [`Step`]s are numbered contiguously from `0`. Runs execute
//! them in order; see the `run` module for the lifecycle of a single
//! execution.

mod action;
mod step;
mod trigger;

pub use action::Action;
pub use step::Step;
pub use trigger::TriggerCategory;

use serde::{Deserialize, Serialize};

use crate::error::{MailflowError, ValidationError};
use crate::id::AutomationId;
use crate::time::{Timestamp, now};

/// A workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Automation {
    pub id: AutomationId,
    pub name: String,
    pub trigger: TriggerCategory,
    pub active: bool,
    pub steps: Vec<Step>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Automation {
    /// Create a builder for constructing an [`Automation`].
    #[must_use]
    pub fn builder() -> AutomationBuilder {
        AutomationBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::Validation`] when:
    /// - `name` is blank ([`ValidationError::EmptyName`])
    /// - step orders are not exactly `0..len` in sequence
    ///   ([`ValidationError::NonContiguousStepOrder`])
    pub fn validate(&self) -> Result<(), MailflowError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        for (expected, step) in (0u32..).zip(&self.steps) {
            if step.order != expected {
                return Err(ValidationError::NonContiguousStepOrder {
                    expected,
                    found: step.order,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Step at `index`, if the definition is that long.
    #[must_use]
    pub fn step(&self, index: u32) -> Option<&Step> {
        usize::try_from(index).ok().and_then(|i| self.steps.get(i))
    }

    /// Number of steps, saturating at `u32::MAX`.
    #[must_use]
    pub fn step_count(&self) -> u32 {
        u32::try_from(self.steps.len()).unwrap_or(u32::MAX)
    }

    /// Replace every step, renumbering from `0`.
    pub fn replace_steps(&mut self, actions: impl IntoIterator<Item = Action>) {
        self.steps = (0u32..)
            .zip(actions)
            .map(|(order, action)| Step::new(order, action))
            .collect();
    }

    /// Whether the definition was edited after `instant`.
    #[must_use]
    pub fn changed_since(&self, instant: Timestamp) -> bool {
        self.updated_at > instant
    }
}

/// Step-by-step builder for [`Automation`].
#[derive(Debug, Default)]
pub struct AutomationBuilder {
    id: Option<AutomationId>,
    name: Option<String>,
    trigger: Option<TriggerCategory>,
    active: Option<bool>,
    steps: Vec<Step>,
    created_at: Option<Timestamp>,
    updated_at: Option<Timestamp>,
}

impl AutomationBuilder {
    #[must_use]
    pub fn id(mut self, id: AutomationId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn trigger(mut self, trigger: TriggerCategory) -> Self {
        self.trigger = Some(trigger);
        self
    }

    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Append an action at the next free position.
    #[must_use]
    pub fn step(mut self, action: Action) -> Self {
        let order = u32::try_from(self.steps.len()).unwrap_or(u32::MAX);
        self.steps.push(Step::new(order, action));
        self
    }

    /// Use already-numbered steps as-is (e.g. when loading from storage).
    #[must_use]
    pub fn steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = steps;
        self
    }

    #[must_use]
    pub fn created_at(mut self, ts: Timestamp) -> Self {
        self.created_at = Some(ts);
        self
    }

    #[must_use]
    pub fn updated_at(mut self, ts: Timestamp) -> Self {
        self.updated_at = Some(ts);
        self
    }

    /// Consume the builder, validate, and return an [`Automation`].
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::Validation`] if the name is blank or step
    /// orders are not contiguous.
    pub fn build(self) -> Result<Automation, MailflowError> {
        let created_at = self.created_at.unwrap_or_else(now);
        let automation = Automation {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            trigger: self.trigger.unwrap_or(TriggerCategory::Manual),
            active: self.active.unwrap_or(true),
            steps: self.steps,
            created_at,
            updated_at: self.updated_at.unwrap_or(created_at),
        };
        automation.validate()?;
        Ok(automation)
    }
}
