//! Bulk Submit Engine Library
//! # Overview
//!
//! This library provides a generic batch submission orchestration engine:
//! it takes a validated list of records, partitions them into groups, and
//! submits each group to a remote service strictly one at a time, with
//! bounded retries, cooperative cancellation, per-record outcome tracking,
//! and live progress reporting.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (InputRecord, SubmissionOutcome, RunSummary, etc.)
//! - [`grouping`] - Partitioning strategies (fixed-size chunks, composite keys)
//! - [`core`] - Engine components:
//!   - [`core::orchestrator`] - The submission state machine
//!   - [`core::retry`] - Transient/permanent classification and backoff
//!   - [`core::aggregator`] - Outcome accumulation, throughput, and ETA
//!   - [`core::traits`] - Boundary interfaces (transport, tokens, progress, follow-up)
//! - [`io`] - CSV ingestion and outcome export
//! - [`cli`] - CLI argument parsing for the rehearsal binary
//!
//! # Run lifecycle
//!
//! A run moves through `Idle -> Running -> {Completed, Cancelled,
//! FatallyErrored}`; per group the orchestrator cycles through
//! `Submitting -> (Succeeded | Retrying | FailedTerminal) -> Advancing`.
//! Per-group transport failures become per-record failure outcomes and
//! never abort the run; only setup faults do.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bulk_submit_engine::core::{BatchOrchestrator, DryRunTransport, RunConfig};
//! use bulk_submit_engine::grouping::GroupingMode;
//! use bulk_submit_engine::types::{FieldValue, InputRecord};
//!
//! # async fn example() -> Result<(), bulk_submit_engine::types::SubmitError> {
//! let records = vec![
//!     InputRecord::from_pairs(0, [("PurchaseOrder", FieldValue::text("4500000001"))]),
//!     InputRecord::from_pairs(1, [("PurchaseOrder", FieldValue::text("4500000002"))]),
//! ];
//!
//! let config = RunConfig {
//!     grouping: GroupingMode::CompositeKey(vec!["PurchaseOrder".to_string()]),
//!     ..RunConfig::default()
//! };
//!
//! let orchestrator = BatchOrchestrator::new(DryRunTransport, config);
//! let handle = orchestrator.cancel_handle(); // callable from any task
//! let summary = orchestrator.run(records).await?;
//! assert_eq!(summary.success_count, 2);
//! # let _ = handle;
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod cli;
pub mod core;
pub mod grouping;
pub mod io;
pub mod types;

pub use crate::core::{
    BatchOrchestrator, CancelHandle, DryRunTransport, FollowUpHook, GroupResponse,
    ProgressAggregator, ProgressSink, RecordResult, RetryPolicy, RunConfig, SubmitContext,
    TokenProvider, TransportAdapter,
};
pub use crate::grouping::{create_grouping, GroupingMode, GroupingStrategy};
pub use crate::io::{write_outcomes_csv, AsyncReader, SyncReader};
pub use crate::types::{
    ErrorInfo, FieldValue, GroupKey, InputRecord, ProgressUpdate, RecordGroup, RunStatus,
    RunSummary, SubmissionOutcome, SubmitError, TransportError,
};
