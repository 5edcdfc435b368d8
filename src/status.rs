//! Status state machine shared by trials and experiments
//!
//! ```text
//! pending   -> running, skipped
//! running   -> finished, timed_out, paused
//! paused    -> running
//! timed_out -> (terminal)
//! finished  -> (terminal)
//! skipped   -> (terminal)
//! ```
//!
//! Nothing ever moves back to `pending`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Lifecycle status of a trial or experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Scheduled to run later.
    #[default]
    Pending,
    /// Running right now.
    Running,
    /// Temporarily paused.
    Paused,
    /// Went on too long and has ended.
    TimedOut,
    /// Ended as expected.
    Finished,
    /// Will not run.
    Skipped,
}

impl Status {
    /// Every status, in table order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Running,
        Self::Paused,
        Self::TimedOut,
        Self::Finished,
        Self::Skipped,
    ];

    /// Destinations reachable from this status in one step.
    #[must_use]
    pub const fn transitions(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Running, Self::Skipped],
            Self::Running => &[Self::Finished, Self::TimedOut, Self::Paused],
            Self::Paused => &[Self::Running],
            Self::TimedOut | Self::Finished | Self::Skipped => &[],
        }
    }

    /// Whether `self -> target` is in the transition table.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        self.transitions().contains(&target)
    }

    /// Short human description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Pending => "scheduled to run later",
            Self::Running => "running right now",
            Self::Paused => "temporarily paused",
            Self::TimedOut => "went on too long and has ended",
            Self::Finished => "ended as expected",
            Self::Skipped => "will not run",
        }
    }

    /// Snake-case name, as persisted.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::TimedOut => "timed_out",
            Self::Finished => "finished",
            Self::Skipped => "skipped",
        }
    }

    /// Status is `pending`.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Status is `running`.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    /// Status is `paused`.
    #[must_use]
    pub const fn is_paused(self) -> bool {
        matches!(self, Self::Paused)
    }

    /// Status is `timed_out`.
    #[must_use]
    pub const fn is_timed_out(self) -> bool {
        matches!(self, Self::TimedOut)
    }

    /// Status is `finished`.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Status is `skipped`.
    #[must_use]
    pub const fn is_skipped(self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// True for `finished`, `timed_out` and `skipped`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::TimedOut | Self::Finished | Self::Skipped)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("{s} is not an acceptable status")))
    }
}

/// Check `current -> target` against the table.
#[must_use]
pub fn can_transition(current: Status, target: Status) -> bool {
    current.can_transition_to(target)
}

/// Validate `current -> target` and return `target`.
///
/// # Errors
///
/// Returns [`Error::InvalidTransition`] naming both statuses when the
/// pair is not in the table.
pub fn transition(current: Status, target: Status) -> Result<Status> {
    if current.can_transition_to(target) {
        Ok(target)
    } else {
        Err(Error::invalid_transition(current, target))
    }
}
