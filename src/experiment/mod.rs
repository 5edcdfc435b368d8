//! Participant, experiment and trial records
//!
//! This module holds the persisted data and the state logic that acts on
//! it. Nothing here performs I/O; the autosaving handles in
//! [`crate::session`] wrap these records and persist after every change.
//!
//! ## Schema Overview
//!
//! ```text
//! ParticipantRecord (1) ──< ExperimentRecord (N)
//!                               │
//!                               ├──< Trial (N) [inline, ordered]
//!                               └──< EventRecord (N)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use expflow::experiment::{ExperimentRecord, Trial};
//! use expflow::Tracked;
//!
//! let mut record = ExperimentRecord::new("p001", "stroop");
//! record.append_trial(Trial::builder().trial_number(0).build())?;
//! assert!(record.is_pending());
//! assert_eq!(record.len(), 1);
//! # Ok::<(), expflow::Error>(())
//! ```

mod cursor;
mod duration;
mod event_record;
mod experiment_record;
mod lifecycle;
mod participant_record;
mod record_meta;
mod trial;

pub use duration::{DurationTracker, PauseInterval};
pub use event_record::EventRecord;
pub use experiment_record::ExperimentRecord;
pub use lifecycle::{Lifecycle, StatusChange, Tracked};
pub use participant_record::{ParticipantProfile, ParticipantRecord};
pub use record_meta::RecordMeta;
pub use trial::{Trial, TrialBuilder};
