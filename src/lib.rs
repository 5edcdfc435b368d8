//! # expflow: Crash-Tolerant Experiment Session Bookkeeping
//!
//! **Version**: 0.1.0
//!
//! expflow records what happens while participants run through
//! psychological experiments: who took part, which experiments they ran,
//! every trial's status, response and active duration. Records are
//! persisted after every change so that a crashed or interrupted session
//! can be resumed exactly where it stopped.
//!
//! ## Design Principles
//!
//! - **One state machine**: trials and experiments share the same
//!   [`Status`] transition table; every change goes through it
//! - **Autosave**: each mutating call has reached the store when it returns
//! - **Crash recovery**: a session released or found while `running` is
//!   marked `paused`, never left mid-flight
//! - **Caller-driven loop**: [`Experiment::advance`] returns an explicit
//!   [`Advance`]; the caller checks `is_running()` between steps
//!
//! ## Example Usage
//!
//! ```rust
//! use expflow::{Advance, Config, ParticipantProfile, Registry, Trial, Tracked};
//!
//! let dir = tempfile::tempdir()?;
//! let registry = Registry::open(&Config::builder().base_dir(dir.path()).build())?;
//!
//! registry
//!     .create_participant("p001", ParticipantProfile::new().age(24.0))?
//!     .close()?;
//!
//! let trials = (0..5).map(|i| Trial::builder().trial_number(i).build()).collect();
//! let mut experiment = registry.create_experiment("p001", "stroop", trials)?;
//!
//! // Run two trials, then stop for the day.
//! experiment.advance()?;
//! experiment.advance()?;
//! experiment.close()?;
//!
//! // Later: the session was left paused on trial 1.
//! let mut experiment = registry.load_experiment("p001", "stroop")?;
//! assert!(experiment.is_paused());
//! assert_eq!(experiment.advance()?.index(), Some(1));
//!
//! while let Advance::Next { .. } = experiment.advance()? {}
//! assert!(experiment.is_finished());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod experiment;
pub mod registry;
pub mod session;
pub mod status;
pub mod store;

pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use experiment::{
    EventRecord, ExperimentRecord, ParticipantProfile, ParticipantRecord, Trial, TrialBuilder,
    Tracked,
};
pub use registry::{is_valid_id, Registry};
pub use session::{Advance, Experiment, Participant};
pub use status::{can_transition, transition, Status};
pub use store::{Codec, FileRecordStore, MemoryRecordStore, RecordKey, RecordStore};
