//! In-memory record of accepted messages.

use std::sync::{Mutex, MutexGuard, PoisonError};

use mailflow_domain::time::{Timestamp, now};

/// One accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub sent_at: Timestamp,
}

impl SentMessage {
    pub(crate) fn new(to: &str, subject: &str, body: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            sent_at: now(),
        }
    }
}

#[derive(Default)]
pub struct Outbox {
    messages: Mutex<Vec<SentMessage>>,
}

impl Outbox {
    pub(crate) fn push(&self, message: SentMessage) {
        self.lock().push(message);
    }

    /// Snapshot of every message, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<SentMessage> {
        self.lock().clone()
    }

    /// Messages addressed to `to`, oldest first.
    #[must_use]
    pub fn sent_to(&self, to: &str) -> Vec<SentMessage> {
        self.lock()
            .iter()
            .filter(|m| m.to.eq_ignore_ascii_case(to))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SentMessage>> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
