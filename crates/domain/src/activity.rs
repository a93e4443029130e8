//! Activity log entries — an audit trail of administrative and engine actions.

use serde::{Deserialize, Serialize};

use crate::id::ActivityId;
use crate::time::{Timestamp, now};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: ActivityId,
    /// Dotted verb such as `automation.entered` or `automation.cancelled`.
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub details: serde_json::Value,
    pub timestamp: Timestamp,
}

impl ActivityEntry {
    #[must_use]
    pub fn new(
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl ToString,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: ActivityId::new(),
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: entity_id.to_string(),
            details,
            timestamp: now(),
        }
    }
}
