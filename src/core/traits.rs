//! Boundary traits for the batch orchestrator
//!
//! This module defines the narrow interfaces the orchestrator consumes:
//! the transport that actually performs a group submission, the session
//! token source, the progress sink, and the optional follow-up hook.
//! Concrete transports (OData batch, SOAP envelope) live outside this
//! crate; the trait seams exist precisely so tests and rehearsal runs can
//! substitute in-process implementations.

use async_trait::async_trait;

use crate::types::{
    ErrorInfo, GroupKey, InputRecord, ProgressUpdate, RecordGroup, SubmissionOutcome,
    TransportError,
};

/// Context handed to the transport alongside a group
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitContext {
    /// Session/CSRF token for this attempt, when a provider is configured
    ///
    /// `None` means "proceed without a token" and is not an error.
    pub token: Option<String>,

    /// The key of the group being submitted
    pub group_key: GroupKey,

    /// 1-based attempt number for this group
    pub attempt: u32,
}

/// The per-record result reported by a transport for one group member
#[derive(Debug, Clone, PartialEq)]
pub struct RecordResult {
    /// Original index of the record this result belongs to
    pub original_index: usize,

    /// Result payload on success, failure detail otherwise
    ///
    /// A group-level "success" response may still carry per-item business
    /// errors; transports surface them here so the orchestrator can
    /// produce mixed outcomes instead of an all-or-nothing classification.
    pub result: Result<serde_json::Value, ErrorInfo>,
}

/// A transport's response for one submitted group
///
/// Must contain exactly one [`RecordResult`] per group member; the
/// orchestrator treats any other shape as a whole-group failure.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupResponse {
    /// Per-record results, one per group member
    pub outcomes: Vec<RecordResult>,
}

impl GroupResponse {
    /// A response accepting every record in the group with the same payload
    pub fn accept_all(group: &RecordGroup, payload: serde_json::Value) -> Self {
        Self {
            outcomes: group
                .records
                .iter()
                .map(|record| RecordResult {
                    original_index: record.original_index(),
                    result: Ok(payload.clone()),
                })
                .collect(),
        }
    }
}

/// The boundary object performing the actual remote call
///
/// Sends one group as one network operation and reports either per-record
/// results or a group-level failure. Implementations must surface enough
/// of the underlying failure (status code, message, raw body) for retry
/// classification and failure reporting.
#[async_trait]
pub trait TransportAdapter: Send + Sync {
    /// Submit one group as a single network operation
    async fn submit(
        &self,
        group: &RecordGroup,
        context: &SubmitContext,
    ) -> Result<GroupResponse, TransportError>;
}

/// Session token source consulted before each submission attempt
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Fetch a token for the next request cycle
    ///
    /// `None` is a valid "proceed without" outcome, not an error.
    async fn fetch_token(&self) -> Option<String>;
}

/// Consumer of progress events
///
/// Invoked after every recorded outcome and after every group; the
/// consumer decides what to render. Implemented for plain closures so a
/// caller can pass `Arc::new(|update: &ProgressUpdate| ...)`.
pub trait ProgressSink: Send + Sync {
    /// Receive one progress event
    fn on_progress(&self, update: &ProgressUpdate);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressUpdate) + Send + Sync,
{
    fn on_progress(&self, update: &ProgressUpdate) {
        self(update)
    }
}

/// Optional per-record follow-up call (e.g. approval after creation)
///
/// Fired only for successfully submitted records that carry the configured
/// flag, as a detached best-effort task that never blocks group
/// advancement. A failed follow-up downgrades the record's display status
/// without touching its primary success classification.
#[async_trait]
pub trait FollowUpHook: Send + Sync {
    /// Perform the follow-up call for one successful record
    async fn follow_up(
        &self,
        record: &InputRecord,
        outcome: &SubmissionOutcome,
    ) -> Result<(), ErrorInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;

    #[test]
    fn test_accept_all_covers_every_record() {
        let group = RecordGroup {
            key: "A".to_string(),
            records: vec![
                InputRecord::from_pairs(3, [("V", FieldValue::text("a"))]),
                InputRecord::from_pairs(7, [("V", FieldValue::text("b"))]),
            ],
        };

        let response = GroupResponse::accept_all(&group, serde_json::json!({"created": true}));

        assert_eq!(response.outcomes.len(), 2);
        assert_eq!(response.outcomes[0].original_index, 3);
        assert_eq!(response.outcomes[1].original_index, 7);
        assert!(response.outcomes.iter().all(|o| o.result.is_ok()));
    }

    #[test]
    fn test_progress_sink_for_closures() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_sink = Arc::clone(&seen);
        let sink: Arc<dyn ProgressSink> = Arc::new(move |_update: &ProgressUpdate| {
            seen_in_sink.fetch_add(1, Ordering::SeqCst);
        });

        let update = ProgressUpdate {
            status: crate::types::RunStatus::Completed,
            total_records: 0,
            processed: 0,
            success_count: 0,
            failure_count: 0,
            groups_completed: 0,
            total_groups: 0,
            throughput_per_sec: 0.0,
            eta: crate::types::Eta::Calculating,
        };
        sink.on_progress(&update);

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
