//! Delay ticket — the durable marker of a suspended run.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::{RunId, TicketId};
use crate::time::{Timestamp, after_minutes};

/// Where and when a waiting run resumes.
///
/// At most one ticket exists per run. The sweep that claims it deletes it
/// and resumes the run at `step_index + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayTicket {
    pub id: TicketId,
    pub run_id: RunId,
    /// Index of the `Wait` step that produced this ticket.
    pub step_index: u32,
    pub execute_after: Timestamp,
    pub created_at: Timestamp,
}

impl DelayTicket {
    /// # Errors
    ///
    /// Returns [`ValidationError::DelayOutOfRange`] when the deadline cannot
    /// be represented.
    pub fn new(
        run_id: RunId,
        step_index: u32,
        now: Timestamp,
        minutes: u32,
    ) -> Result<Self, ValidationError> {
        let execute_after =
            after_minutes(now, minutes).ok_or(ValidationError::DelayOutOfRange { minutes })?;
        Ok(Self {
            id: TicketId::new(),
            run_id,
            step_index,
            execute_after,
            created_at: now,
        })
    }

    #[must_use]
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.execute_after <= now
    }

    /// Step the resumed run continues from.
    #[must_use]
    pub fn resume_index(&self) -> u32 {
        self.step_index.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now;

    #[test]
    fn should_schedule_execute_after_from_minutes() {
        let at = now();
        let ticket = DelayTicket::new(RunId::new(), 1, at, 60).unwrap();
        assert_eq!((ticket.execute_after - at).num_minutes(), 60);
        assert_eq!(ticket.created_at, at);
    }

    #[test]
    fn should_not_be_due_before_execute_after() {
        let at = now();
        let ticket = DelayTicket::new(RunId::new(), 0, at, 5).unwrap();
        assert!(!ticket.is_due(at));
    }

    #[test]
    fn should_be_due_at_execute_after() {
        let at = now();
        let ticket = DelayTicket::new(RunId::new(), 0, at, 5).unwrap();
        assert!(ticket.is_due(ticket.execute_after));
    }

    #[test]
    fn should_be_due_immediately_for_zero_minutes() {
        let at = now();
        let ticket = DelayTicket::new(RunId::new(), 0, at, 0).unwrap();
        assert!(ticket.is_due(at));
    }

    #[test]
    fn should_reject_delay_beyond_latest_year() {
        let result = DelayTicket::new(RunId::new(), 0, now(), u32::MAX);
        assert_eq!(
            result,
            Err(ValidationError::DelayOutOfRange { minutes: u32::MAX })
        );
    }

    #[test]
    fn should_resume_at_next_step() {
        let ticket = DelayTicket::new(RunId::new(), 3, now(), 1).unwrap();
        assert_eq!(ticket.resume_index(), 4);
    }
}
