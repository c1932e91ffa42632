//! Types module
//!
//! Contains core data structures used throughout the engine.
//! This module organizes types into logical submodules:
//! - `record`: input records, field values, and group containers
//! - `outcome`: per-record outcomes, progress events, and run summaries
//! - `error`: error types for the bulk submit engine

pub mod error;
pub mod outcome;
pub mod record;

pub use error::{SubmitError, TransportError, TransportErrorKind};
pub use outcome::{
    ErrorInfo, Eta, FollowUpStatus, ProgressUpdate, RunStatus, RunSummary, SubmissionOutcome,
};
pub use record::{FieldValue, GroupKey, InputRecord, RecordGroup};
