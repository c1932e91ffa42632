//! Core engine module
//!
//! This module contains the batch submission components:
//! - `traits` - boundary interfaces (transport, token source, progress
//!   sink, follow-up hook)
//! - `orchestrator` - the run state machine and its configuration
//! - `retry` - transient/permanent classification and backoff
//! - `aggregator` - outcome accumulation, throughput and ETA
//! - `followup` - detached dispatch of per-record follow-up calls
//! - `dry_run` - the no-network rehearsal transport

pub mod aggregator;
pub mod dry_run;
mod followup;
pub mod orchestrator;
pub mod retry;
pub mod traits;

pub use aggregator::ProgressAggregator;
pub use dry_run::DryRunTransport;
pub use orchestrator::{BatchOrchestrator, CancelHandle, RunConfig, DEFAULT_CHUNK_SIZE};
pub use retry::RetryPolicy;
pub use traits::{
    FollowUpHook, GroupResponse, ProgressSink, RecordResult, SubmitContext, TokenProvider,
    TransportAdapter,
};
