//! Batch submission orchestration
//!
//! This module provides the `BatchOrchestrator`, the state machine that
//! drives one end-to-end submission run: it partitions the input records
//! into groups, submits the groups strictly one at a time, applies the
//! retry policy on transport failures, records per-record outcomes,
//! honors cooperative cancellation, and emits progress events.
//!
//! # State machine
//!
//! ```text
//! Idle -> Running -> { Completed, Cancelled, FatallyErrored }
//!
//! Running, per group:
//!     Submitting -> (Succeeded | Retrying | FailedTerminal) -> Advancing
//! ```
//!
//! `FatallyErrored` covers faults in setup itself (invalid configuration,
//! grouping failure) and is the only path that returns `Err`; per-group
//! transport failures are always converted into per-record failure
//! outcomes and the loop advances.
//!
//! # Ordering
//!
//! Groups are submitted in the order the grouping strategy produced them,
//! with exactly one submission in flight at any time. This trades
//! throughput for deterministic, replayable progress accounting.
//!
//! # Cancellation
//!
//! A [`CancelHandle`] can cancel the run from any task at any time. The
//! flag is checked before each group and raced against every suspension
//! point (token fetch, the in-flight submission, retry backoff, the
//! inter-group throttle), so cancelling leaves no pending timer or open
//! request behind. Cancellation resolves the run normally with
//! `cancelled: true`; outcomes recorded before the cancel are preserved.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::aggregator::ProgressAggregator;
use crate::core::followup::FollowUpDispatcher;
use crate::core::retry::RetryPolicy;
use crate::core::traits::{
    FollowUpHook, GroupResponse, ProgressSink, SubmitContext, TokenProvider, TransportAdapter,
};
use crate::grouping::{create_grouping, GroupingMode};
use crate::types::{
    ErrorInfo, FollowUpStatus, InputRecord, RecordGroup, RunStatus, RunSummary, SubmissionOutcome,
    SubmitError, TransportError,
};

/// Default chunk size when no grouping mode is configured
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Configuration for one submission run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// How records are partitioned into groups
    pub grouping: GroupingMode,

    /// Maximum additional attempts per group after the first
    pub max_retries: u32,

    /// Fixed delay before each retry attempt
    pub retry_delay: Duration,

    /// Pacing delay between consecutive groups
    ///
    /// A throttle to avoid overwhelming the backend, distinct from retry
    /// backoff. Not a correctness requirement.
    pub inter_group_delay: Duration,

    /// Record field whose flag marks a record for the follow-up hook
    pub follow_up_field: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            grouping: GroupingMode::Chunk(DEFAULT_CHUNK_SIZE),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            inter_group_delay: Duration::from_millis(100),
            follow_up_field: None,
        }
    }
}

impl RunConfig {
    /// Check the configuration for faults that would make the run
    /// meaningless
    ///
    /// # Errors
    ///
    /// Returns `SubmitError::InvalidConfig` for a zero chunk size, an
    /// empty key-field list, or blank key-field names.
    pub fn validate(&self) -> Result<(), SubmitError> {
        match &self.grouping {
            GroupingMode::Chunk(0) => {
                Err(SubmitError::invalid_config("chunk size must be at least 1"))
            }
            GroupingMode::CompositeKey(fields) if fields.is_empty() => {
                Err(SubmitError::invalid_config("no key fields configured"))
            }
            GroupingMode::CompositeKey(fields)
                if fields.iter().any(|f| f.trim().is_empty()) =>
            {
                Err(SubmitError::invalid_config("key field names must not be blank"))
            }
            _ => Ok(()),
        }
    }
}

/// Handle for cancelling a running submission
///
/// Cloneable and callable from any task. `cancel` is idempotent, never
/// blocks, and guarantees that no further group submission begins; the run
/// future still resolves normally, carrying `cancelled: true`.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// Request cancellation of the run
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// How one group's submission ended
enum GroupDisposition {
    /// One outcome per group member, success or failure
    Outcomes(Vec<SubmissionOutcome>),

    /// Cancellation was observed while the group was being handled
    Cancelled,
}

/// The batch submission state machine
///
/// Instantiated once per run with its transport and configuration;
/// optional collaborators (token provider, progress sink, follow-up hook)
/// attach builder-style. `run` consumes the orchestrator, so a second run
/// needs a fresh instance - there is no shared state to reset between
/// runs.
pub struct BatchOrchestrator<T: TransportAdapter> {
    transport: T,
    config: RunConfig,
    retry: RetryPolicy,
    token_provider: Option<Arc<dyn TokenProvider>>,
    progress: Option<Arc<dyn ProgressSink>>,
    follow_up: Option<Arc<dyn FollowUpHook>>,
    cancel: CancellationToken,
}

impl<T: TransportAdapter> BatchOrchestrator<T> {
    /// Create an orchestrator for one run
    pub fn new(transport: T, config: RunConfig) -> Self {
        let retry = RetryPolicy::new(config.max_retries, config.retry_delay);
        Self {
            transport,
            config,
            retry,
            token_provider: None,
            progress: None,
            follow_up: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Attach a session token provider, consulted before every attempt
    pub fn with_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// Attach a progress sink
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Attach the follow-up hook fired for flagged successes
    pub fn with_follow_up_hook(mut self, hook: Arc<dyn FollowUpHook>) -> Self {
        self.follow_up = Some(hook);
        self
    }

    /// Obtain a cancellation handle for this run
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            token: self.cancel.clone(),
        }
    }

    /// Execute the run to completion, cancellation, or fatal error
    ///
    /// # Arguments
    ///
    /// * `records` - the validated records to submit; original indexes
    ///   are (re)assigned from list position before grouping
    ///
    /// # Returns
    ///
    /// The final [`RunSummary`]. An empty input completes benignly with
    /// zero counts. A cancelled run resolves normally with
    /// `cancelled: true` and all outcomes recorded up to that point.
    ///
    /// # Errors
    ///
    /// Only setup faults return `Err`: invalid configuration or a
    /// grouping failure. Transport failures never abort the run.
    pub async fn run(self, mut records: Vec<InputRecord>) -> Result<RunSummary, SubmitError> {
        self.config.validate()?;

        for (index, record) in records.iter_mut().enumerate() {
            record.set_original_index(index);
        }

        let mut aggregator = ProgressAggregator::new(records.len());
        let mut dispatcher =
            FollowUpDispatcher::new(self.follow_up.clone(), self.config.follow_up_field.clone());

        let groups = match self.prepare_groups(&records) {
            Ok(groups) => groups,
            Err(SubmitError::EmptyInput) => {
                debug!("nothing to submit");
                self.emit(&aggregator, RunStatus::NothingToDo, 0, 0);
                return Ok(aggregator.finalize(false, HashMap::new()));
            }
            Err(error) => return Err(error),
        };

        let total_groups = groups.len();
        info!(
            records = records.len(),
            groups = total_groups,
            "starting submission run"
        );

        let mut cancelled = false;
        let mut groups_completed = 0usize;

        for (index, group) in groups.into_iter().enumerate() {
            // Checked before starting each group, and again inside every
            // suspension point below.
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let group_number = index + 1;
            let disposition = self
                .submit_with_retry(&group, group_number, &aggregator, groups_completed, total_groups)
                .await;

            let outcomes = match disposition {
                GroupDisposition::Outcomes(outcomes) => outcomes,
                GroupDisposition::Cancelled => {
                    cancelled = true;
                    break;
                }
            };

            let members: HashMap<usize, &InputRecord> = group
                .records
                .iter()
                .map(|record| (record.original_index(), record))
                .collect();

            for mut outcome in outcomes {
                if let Some(record) = members.get(&outcome.original_index) {
                    if dispatcher.wants_follow_up(record, &outcome) {
                        outcome.follow_up = FollowUpStatus::Pending;
                        dispatcher.spawn(record, &outcome);
                    }
                }
                aggregator.record(outcome);
                self.emit(
                    &aggregator,
                    RunStatus::Submitting {
                        group: group_number,
                        total_groups,
                    },
                    groups_completed,
                    total_groups,
                );
            }

            groups_completed = group_number;
            self.emit(
                &aggregator,
                RunStatus::GroupCompleted {
                    group: group_number,
                    total_groups,
                },
                groups_completed,
                total_groups,
            );

            if group_number < total_groups
                && !self.pause(self.config.inter_group_delay).await
            {
                cancelled = true;
                break;
            }
        }

        cancelled = cancelled || self.cancel.is_cancelled();
        let follow_ups = dispatcher.finish(cancelled).await;

        let terminal = if cancelled {
            RunStatus::Cancelled
        } else if aggregator.failure_count() > 0 {
            RunStatus::CompletedWithFailures(aggregator.failure_count())
        } else {
            RunStatus::Completed
        };
        self.emit(&aggregator, terminal, groups_completed, total_groups);

        Ok(aggregator.finalize(cancelled, follow_ups))
    }

    /// Partition the records, treating "nothing to submit" as its own case
    fn prepare_groups(&self, records: &[InputRecord]) -> Result<Vec<RecordGroup>, SubmitError> {
        if records.is_empty() {
            return Err(SubmitError::EmptyInput);
        }

        let strategy = create_grouping(&self.config.grouping);
        let groups: Vec<RecordGroup> = strategy
            .group(records)?
            .into_iter()
            .filter(|group| !group.is_empty())
            .collect();

        if groups.is_empty() {
            return Err(SubmitError::EmptyInput);
        }
        Ok(groups)
    }

    /// Submit one group, retrying transient failures per the policy
    ///
    /// Returns per-record outcomes in every non-cancelled case: mapped
    /// from the transport response on success, synthesized for the whole
    /// group when the error was permanent or the retry budget ran out.
    async fn submit_with_retry(
        &self,
        group: &RecordGroup,
        group_number: usize,
        aggregator: &ProgressAggregator,
        groups_completed: usize,
        total_groups: usize,
    ) -> GroupDisposition {
        let mut attempt: u32 = 1;

        loop {
            let token = match &self.token_provider {
                Some(provider) => tokio::select! {
                    _ = self.cancel.cancelled() => return GroupDisposition::Cancelled,
                    token = provider.fetch_token() => token,
                },
                None => None,
            };

            let context = SubmitContext {
                token,
                group_key: group.key.clone(),
                attempt,
            };

            debug!(group = %group.key, attempt, size = group.len(), "submitting group");

            // Dropping the in-flight future on cancellation aborts the
            // request handle; outcomes already returned are unaffected.
            let result = tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!(group = %group.key, "cancelled with submission in flight");
                    return GroupDisposition::Cancelled;
                }
                result = self.transport.submit(group, &context) => result,
            };

            match result {
                Ok(response) => {
                    return GroupDisposition::Outcomes(map_response(group, response));
                }
                Err(error) if self.retry.should_retry(&error, attempt) => {
                    warn!(group = %group.key, attempt, %error, "transient failure, backing off");
                    self.emit(
                        aggregator,
                        RunStatus::Retrying {
                            group: group_number,
                            attempt,
                        },
                        groups_completed,
                        total_groups,
                    );
                    if !self.pause(self.retry.backoff(attempt)).await {
                        return GroupDisposition::Cancelled;
                    }
                    attempt += 1;
                }
                Err(error) => {
                    warn!(group = %group.key, attempt, %error, "group failed terminally");
                    return GroupDisposition::Outcomes(fail_group(group, &error));
                }
            }
        }
    }

    /// Sleep for `delay`, racing the cancellation token
    ///
    /// Returns `false` if cancellation won the race (the timer is dropped
    /// with it).
    async fn pause(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            return !self.cancel.is_cancelled();
        }
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Deliver a progress event to the sink, if one is attached
    fn emit(
        &self,
        aggregator: &ProgressAggregator,
        status: RunStatus,
        groups_completed: usize,
        total_groups: usize,
    ) {
        if let Some(sink) = &self.progress {
            sink.on_progress(&aggregator.progress(status, groups_completed, total_groups));
        }
    }
}

/// Map a transport response onto per-record outcomes
///
/// The response must cover exactly the group's record indexes. Anything
/// else - wrong count, unknown or duplicate indexes - is an unrecognized
/// response shape and fails the whole group with a permanent `SHAPE`
/// error.
fn map_response(group: &RecordGroup, response: GroupResponse) -> Vec<SubmissionOutcome> {
    let response_len = response.outcomes.len();
    let mut by_index: HashMap<usize, Result<serde_json::Value, ErrorInfo>> = response
        .outcomes
        .into_iter()
        .map(|outcome| (outcome.original_index, outcome.result))
        .collect();

    let expected: HashSet<usize> = group
        .records
        .iter()
        .map(|record| record.original_index())
        .collect();
    let covered = by_index.len() == group.records.len()
        && response_len == group.records.len()
        && expected.iter().all(|index| by_index.contains_key(index));

    if !covered {
        let error = ErrorInfo::new(
            "SHAPE",
            format!(
                "unrecognized transport response: {} results for {} records in group {}",
                response_len,
                group.records.len(),
                group.key
            ),
        );
        return group
            .records
            .iter()
            .map(|record| {
                SubmissionOutcome::failure(record.original_index(), group.key.clone(), error.clone())
            })
            .collect();
    }

    let mut outcomes = Vec::with_capacity(group.records.len());
    for record in &group.records {
        let outcome = match by_index.remove(&record.original_index()) {
            Some(Ok(payload)) => {
                SubmissionOutcome::success(record.original_index(), group.key.clone(), payload)
            }
            Some(Err(info)) => {
                SubmissionOutcome::failure(record.original_index(), group.key.clone(), info)
            }
            None => SubmissionOutcome::failure(
                record.original_index(),
                group.key.clone(),
                ErrorInfo::new("SHAPE", "transport response missing this record"),
            ),
        };
        outcomes.push(outcome);
    }
    outcomes
}

/// Synthesize failure outcomes for every record in a terminally failed
/// group
fn fail_group(group: &RecordGroup, error: &TransportError) -> Vec<SubmissionOutcome> {
    let info = ErrorInfo::from(error);
    group
        .records
        .iter()
        .map(|record| {
            SubmissionOutcome::failure(record.original_index(), group.key.clone(), info.clone())
        })
        .collect()
}
