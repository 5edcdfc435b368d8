//! Duration Tracker - active (non-paused) time accounting

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::status::Status;

/// A closed pause interval.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PauseInterval {
    paused_at: DateTime<Utc>,
    resumed_at: DateTime<Utc>,
}

impl PauseInterval {
    /// When the entity was paused.
    #[must_use]
    pub const fn paused_at(&self) -> DateTime<Utc> {
        self.paused_at
    }

    /// When the entity went back to running.
    #[must_use]
    pub const fn resumed_at(&self) -> DateTime<Utc> {
        self.resumed_at
    }

    /// Length of the pause.
    #[must_use]
    pub fn length(&self) -> TimeDelta {
        self.resumed_at - self.paused_at
    }
}

/// Accumulates active elapsed time from first start to a terminal status.
///
/// `duration = (ended_at - started_at) - sum(pauses)`, frozen once a
/// terminal status is reached. An entity that never ran (skipped while
/// pending) keeps `duration == None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DurationTracker {
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    last_paused_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pauses: Vec<PauseInterval>,
    /// Seconds of active time.
    duration: Option<f64>,
}

impl DurationTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// First transition into `running`.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Transition into a terminal status, if the entity ran.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Start of the pause currently in progress.
    #[must_use]
    pub const fn last_paused_at(&self) -> Option<DateTime<Utc>> {
        self.last_paused_at
    }

    /// Closed pause intervals, oldest first.
    #[must_use]
    pub fn pauses(&self) -> &[PauseInterval] {
        &self.pauses
    }

    /// Sum of all closed pauses.
    #[must_use]
    pub fn pause_total(&self) -> TimeDelta {
        self.pauses
            .iter()
            .fold(TimeDelta::zero(), |acc, pause| acc + pause.length())
    }

    /// Frozen active duration in seconds.
    #[must_use]
    pub const fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Active time so far, as of `now`.
    ///
    /// Returns the frozen value for terminal entities and excludes the
    /// pause in progress for paused ones.
    #[must_use]
    pub fn active_at(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        let started = self.started_at?;
        let until = self.ended_at.or(self.last_paused_at).unwrap_or(now);
        Some(until - started - self.pause_total())
    }

    /// Update timing for an already-validated `from -> to` transition.
    pub(crate) fn record(&mut self, from: Status, to: Status, at: DateTime<Utc>) {
        match to {
            Status::Running => {
                if from.is_paused() {
                    if let Some(paused_at) = self.last_paused_at.take() {
                        self.pauses.push(PauseInterval {
                            paused_at,
                            resumed_at: at,
                        });
                    }
                } else if self.started_at.is_none() {
                    self.started_at = Some(at);
                }
            }
            Status::Paused => self.last_paused_at = Some(at),
            Status::Finished | Status::TimedOut => {
                self.ended_at = Some(at);
                self.duration = self.active_at(at).map(seconds);
            }
            Status::Skipped | Status::Pending => {}
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn seconds(delta: TimeDelta) -> f64 {
    let delta = delta.max(TimeDelta::zero());
    delta
        .num_microseconds()
        .map_or(delta.num_milliseconds() as f64 / 1e3, |us| us as f64 / 1e6)
}
