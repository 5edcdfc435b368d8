//! Identification carried by every persisted record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who created a record, where, and when it was last persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordMeta {
    uuid: Uuid,
    created_at: DateTime<Utc>,
    #[serde(default)]
    last_saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    hostname: Option<String>,
}

impl RecordMeta {
    /// Fresh identification for a record created now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            created_at: Utc::now(),
            last_saved_at: None,
            username: env_value(&["USER", "USERNAME"]),
            hostname: env_value(&["HOSTNAME", "COMPUTERNAME"]),
        }
    }

    /// Unique id of this record.
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Timestamp of the most recent persist.
    #[must_use]
    pub const fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    /// User that created the record, if known.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Host the record was created on, if known.
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    pub(crate) fn touch(&mut self, at: DateTime<Utc>) {
        self.last_saved_at = Some(at);
    }
}

impl Default for RecordMeta {
    fn default() -> Self {
        Self::new()
    }
}

fn env_value(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok())
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_is_unique() {
        let a = RecordMeta::new();
        let b = RecordMeta::new();
        assert_ne!(a.uuid(), b.uuid());
        assert!(a.last_saved_at().is_none());
    }

    #[test]
    fn test_touch_updates_last_saved() {
        let mut meta = RecordMeta::new();
        let now = Utc::now();
        meta.touch(now);
        assert_eq!(meta.last_saved_at(), Some(now));
    }
}
