//! Event Record - free-form events noted during a session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Something that happened during a trial or experiment and is not
/// captured by the stimulus, the response or the status history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventRecord {
    name: String,
    at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<serde_json::Value>,
}

impl EventRecord {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            at: Utc::now(),
            payload: None,
        }
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Override the timestamp (useful for replaying logs and tests).
    #[must_use]
    pub const fn at_time(mut self, at: DateTime<Utc>) -> Self {
        self.at = at;
        self
    }

    /// Event name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// When the event happened.
    #[must_use]
    pub const fn at(&self) -> DateTime<Utc> {
        self.at
    }

    /// Optional payload.
    #[must_use]
    pub const fn payload(&self) -> Option<&serde_json::Value> {
        self.payload.as_ref()
    }
}
