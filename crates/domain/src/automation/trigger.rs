//! Trigger category — the business-event class that starts runs.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Which business event causes an automation to start a run.
///
/// Legacy category names are accepted on input so definitions authored
/// against older tooling keep resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerCategory {
    /// A subscriber was created or imported.
    #[serde(alias = "subscriber_added")]
    SubjectCreated,
    /// A subscriber joined a group.
    #[serde(alias = "group_joined")]
    JoinedGroup,
    /// A subscriber left a group.
    #[serde(alias = "group_left")]
    LeftGroup,
    /// A subscriber's custom fields changed.
    #[serde(alias = "field_updated")]
    FieldChanged,
    /// Never matched by events; started explicitly through the API or
    /// another automation.
    Manual,
}

impl TriggerCategory {
    /// Canonical storage/wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SubjectCreated => "subject_created",
            Self::JoinedGroup => "joined_group",
            Self::LeftGroup => "left_group",
            Self::FieldChanged => "field_changed",
            Self::Manual => "manual",
        }
    }

    /// Whether business events can resolve to this category.
    #[must_use]
    pub fn is_event_driven(self) -> bool {
        !matches!(self, Self::Manual)
    }
}

impl std::fmt::Display for TriggerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subject_created" | "subscriber_added" => Ok(Self::SubjectCreated),
            "joined_group" | "group_joined" => Ok(Self::JoinedGroup),
            "left_group" | "group_left" => Ok(Self::LeftGroup),
            "field_changed" | "field_updated" => Ok(Self::FieldChanged),
            "manual" => Ok(Self::Manual),
            other => Err(ValidationError::UnknownTriggerCategory(other.to_string())),
        }
    }
}
