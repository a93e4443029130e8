//! Action — the step catalog: every kind of work a step can perform.

use serde::{Deserialize, Serialize};

use crate::id::{AutomationId, GroupId, LabelId};

/// Longest authorable delay: one hundred years.
pub const MAX_WAIT_MINUTES: u32 = 100 * 365 * 24 * 60;

/// The operation a single step performs when a run enters it.
///
/// Serialized with an internal `type` tag. Legacy tags and field names
/// (`email`/`html`, `delay`/`delay_minutes`, `add_tag`/`tag_id`, …) are
/// accepted as aliases when decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Deliver a message to the subscriber's address.
    #[serde(alias = "email")]
    SendMessage {
        #[serde(default)]
        subject: String,
        #[serde(default, alias = "html")]
        body: String,
    },
    /// Suspend the run; it resumes at the next step once the delay elapses.
    #[serde(alias = "delay")]
    Wait {
        #[serde(alias = "delay_minutes")]
        minutes: u32,
    },
    /// Write a key into the subscriber's free-form field bag.
    #[serde(alias = "update_field")]
    SetField {
        key: String,
        /// `null` clears the value; other scalars are stored as text.
        #[serde(default)]
        value: serde_json::Value,
    },
    #[serde(alias = "add_to_group")]
    JoinGroup { group_id: GroupId },
    #[serde(alias = "remove_from_group")]
    LeaveGroup { group_id: GroupId },
    #[serde(alias = "add_tag")]
    AddLabel {
        #[serde(alias = "tag_id")]
        label_id: LabelId,
    },
    #[serde(alias = "remove_tag")]
    RemoveLabel {
        #[serde(alias = "tag_id")]
        label_id: LabelId,
    },
    /// Start an independent run of another definition for the same subscriber.
    #[serde(alias = "trigger_automation")]
    StartAutomation {
        #[serde(alias = "automation_id")]
        definition_id: AutomationId,
    },
    /// A stored step whose payload could not be decoded. Executes as a no-op.
    Skip { step_type: String },
}

impl Action {
    /// Tag used when the step is persisted.
    #[must_use]
    pub fn step_type(&self) -> &str {
        match self {
            Self::SendMessage { .. } => "send_message",
            Self::Wait { .. } => "wait",
            Self::SetField { .. } => "set_field",
            Self::JoinGroup { .. } => "join_group",
            Self::LeaveGroup { .. } => "leave_group",
            Self::AddLabel { .. } => "add_label",
            Self::RemoveLabel { .. } => "remove_label",
            Self::StartAutomation { .. } => "start_automation",
            Self::Skip { step_type } => step_type,
        }
    }

    /// Payload object persisted next to [`step_type`](Self::step_type).
    ///
    /// `None` for [`Skip`](Self::Skip): the original payload is gone.
    #[must_use]
    pub fn payload(&self) -> Option<serde_json::Value> {
        if matches!(self, Self::Skip { .. }) {
            return None;
        }
        let mut value = serde_json::to_value(self).ok()?;
        if let Some(fields) = value.as_object_mut() {
            fields.remove("type");
        }
        Some(value)
    }

    /// Whether entering this step suspends the run.
    #[must_use]
    pub fn is_suspending(&self) -> bool {
        matches!(self, Self::Wait { .. })
    }

    /// Authoring-time shape check, stricter than decoding.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the payload would be useless at
    /// execution time.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::SendMessage { subject, .. } if subject.trim().is_empty() => {
                Err("subject must not be empty".to_string())
            }
            Self::Wait { minutes } if *minutes > MAX_WAIT_MINUTES => Err(format!(
                "delay of {minutes} minutes exceeds the maximum of {MAX_WAIT_MINUTES}"
            )),
            Self::SetField { key, .. } if key.trim().is_empty() => {
                Err("field key must not be empty".to_string())
            }
            Self::Skip { step_type } => Err(format!(
                "payload for step type `{step_type}` could not be decoded"
            )),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SendMessage { subject, .. } => write!(f, "send_message({subject})"),
            Self::Wait { minutes } => write!(f, "wait({minutes}m)"),
            Self::SetField { key, .. } => write!(f, "set_field({key})"),
            Self::JoinGroup { group_id } => write!(f, "join_group({group_id})"),
            Self::LeaveGroup { group_id } => write!(f, "leave_group({group_id})"),
            Self::AddLabel { label_id } => write!(f, "add_label({label_id})"),
            Self::RemoveLabel { label_id } => write!(f, "remove_label({label_id})"),
            Self::StartAutomation { definition_id } => {
                write!(f, "start_automation({definition_id})")
            }
            Self::Skip { step_type } => write!(f, "skip({step_type})"),
        }
    }
}
