//! Run — one execution of an automation definition against one subscriber.
//!
//! ```text
//!            suspend            resume
//! running ───────────► waiting ────────► running
//!    │                                      │
//!    ├── complete ──► completed             │
//!    └── fail ──────► failed  ◄─────────────┘
//! ```
//!
//! `paused` is orthogonal to status: a pass that observes it stops without
//! touching status or `current_step`, and records where it stopped in
//! `halted_at`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::{AutomationId, RunId, SubscriberId};
use crate::time::{Timestamp, now};

/// Longest error message kept on a failed run, in characters.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 500;

/// Lifecycle state of a [`Run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Waiting,
    Completed,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Waiting => "waiting",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "waiting" => Ok(Self::Waiting),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(ValidationError::UnknownRunStatus(other.to_string())),
        }
    }
}

/// Execution record for a `(definition, subscriber)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub automation_id: AutomationId,
    pub subscriber_id: SubscriberId,
    /// Index of the step most recently entered.
    pub current_step: u32,
    pub status: RunStatus,
    pub paused: bool,
    /// Step a pass was about to enter when it observed `paused`.
    pub halted_at: Option<u32>,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub error_message: Option<String>,
}

impl Run {
    /// A fresh run positioned at step `0`.
    #[must_use]
    pub fn start(automation_id: AutomationId, subscriber_id: SubscriberId) -> Self {
        Self {
            id: RunId::new(),
            automation_id,
            subscriber_id,
            current_step: 0,
            status: RunStatus::Running,
            paused: false,
            halted_at: None,
            started_at: now(),
            completed_at: None,
            error_message: None,
        }
    }

    pub fn enter_step(&mut self, index: u32) {
        self.current_step = index;
        self.halted_at = None;
    }

    pub fn suspend(&mut self) {
        self.status = RunStatus::Waiting;
    }

    /// Put a suspended run back into `running` after its ticket is claimed.
    pub fn resume(&mut self) {
        self.status = RunStatus::Running;
    }

    pub fn complete(&mut self, at: Timestamp) {
        self.status = RunStatus::Completed;
        self.completed_at = Some(at);
        self.halted_at = None;
    }

    /// Mark the run failed, keeping at most [`MAX_ERROR_MESSAGE_CHARS`]
    /// characters of `message`.
    pub fn fail(&mut self, message: &str, at: Timestamp) {
        self.status = RunStatus::Failed;
        self.error_message = Some(message.chars().take(MAX_ERROR_MESSAGE_CHARS).collect());
        self.completed_at = Some(at);
        self.halted_at = None;
    }

    pub fn halt(&mut self, at_step: u32) {
        self.halted_at = Some(at_step);
    }

    /// Whether a claimed ticket for this run may resume it.
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        matches!(self.status, RunStatus::Waiting | RunStatus::Running)
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
