//! Step — one ordered position inside an automation definition.

use serde::{Deserialize, Serialize};

use crate::automation::Action;
use crate::error::ValidationError;

/// A single [`Action`] at a fixed, zero-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub order: u32,
    pub action: Action,
}

impl Step {
    #[must_use]
    pub fn new(order: u32, action: Action) -> Self {
        Self { order, action }
    }

    /// Decode a persisted `(step_type, payload)` pair.
    ///
    /// A missing, empty, or undecodable payload yields [`Action::Skip`], so
    /// the step executes as a no-op instead of failing the run.
    #[must_use]
    pub fn decode(order: u32, step_type: &str, payload: Option<&serde_json::Value>) -> Self {
        Self::try_decode(order, step_type, payload).unwrap_or_else(|_| Self {
            order,
            action: Action::Skip {
                step_type: step_type.to_string(),
            },
        })
    }

    /// Decode an authored `(step_type, payload)` pair, rejecting anything
    /// [`decode`](Self::decode) would have turned into a skip.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MalformedStep`] when the payload is
    /// missing, does not match the variant's shape, or fails
    /// [`Action::validate`].
    pub fn decode_strict(
        order: u32,
        step_type: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<Self, ValidationError> {
        let step = Self::try_decode(order, step_type, payload)?;
        step.action
            .validate()
            .map_err(|reason| ValidationError::MalformedStep { order, reason })?;
        Ok(step)
    }

    fn try_decode(
        order: u32,
        step_type: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<Self, ValidationError> {
        let malformed = |reason: String| ValidationError::MalformedStep { order, reason };

        let Some(serde_json::Value::Object(fields)) = payload else {
            return Err(malformed("payload must be a JSON object".to_string()));
        };
        if fields.is_empty() {
            return Err(malformed("payload is empty".to_string()));
        }

        let mut tagged = fields.clone();
        tagged.insert(
            "type".to_string(),
            serde_json::Value::String(step_type.to_string()),
        );
        let action: Action = serde_json::from_value(serde_json::Value::Object(tagged))
            .map_err(|err| malformed(err.to_string()))?;
        Ok(Self { order, action })
    }
}
