//! Event — an immutable record of a run lifecycle milestone.
//!
//! Events are emitted fire-and-forget by the engine; the daemon persists
//! them and streams them to live listeners.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::{EventId, RunId};
use crate::time::{Timestamp, now};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "automation.entered")]
    AutomationEntered,
    #[serde(rename = "automation.completed")]
    AutomationCompleted,
    #[serde(rename = "automation.failed")]
    AutomationFailed,
}

impl EventType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AutomationEntered => "automation.entered",
            Self::AutomationCompleted => "automation.completed",
            Self::AutomationFailed => "automation.failed",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "automation.entered" => Ok(Self::AutomationEntered),
            "automation.completed" => Ok(Self::AutomationCompleted),
            "automation.failed" => Ok(Self::AutomationFailed),
            other => Err(ValidationError::UnknownEventType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    pub run_id: Option<RunId>,
    pub timestamp: Timestamp,
    pub data: serde_json::Value,
}

impl Event {
    #[must_use]
    pub fn new(event_type: EventType, run_id: Option<RunId>, data: serde_json::Value) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            run_id,
            timestamp: now(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_create_event_with_fresh_id_and_timestamp() {
        let run_id = RunId::new();
        let a = Event::new(EventType::AutomationEntered, Some(run_id), serde_json::json!({}));
        let b = Event::new(EventType::AutomationEntered, Some(run_id), serde_json::json!({}));
        assert_ne!(a.id, b.id);
        assert_eq!(a.run_id, Some(run_id));
    }

    #[test]
    fn should_serialize_event_type_with_dotted_name() {
        let json = serde_json::to_string(&EventType::AutomationCompleted).unwrap();
        assert_eq!(json, "\"automation.completed\"");
    }

    #[test]
    fn should_parse_event_type_names() {
        assert_eq!(
            "automation.failed".parse::<EventType>(),
            Ok(EventType::AutomationFailed)
        );
        assert!("automation.paused".parse::<EventType>().is_err());
    }
}
