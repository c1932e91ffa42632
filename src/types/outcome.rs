//! Outcome and progress types
//!
//! Per-record submission outcomes, the run summary assembled from them,
//! and the progress event delivered to the caller's progress sink.

use std::fmt;
use std::time::Duration;

use crate::types::error::TransportError;
use crate::types::record::GroupKey;

/// Failure detail attached to a per-record outcome
///
/// Carries a stable short code, a human-readable message, and whatever raw
/// detail the transport surfaced. Nothing is discarded: the details blob is
/// kept verbatim for later export or inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorInfo {
    /// Stable short code (e.g. `HTTP_503`, `PREPARATION`, `SHAPE`)
    pub code: String,

    /// Human-readable failure description
    pub message: String,

    /// Raw detail from the transport, when available
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    /// Create an error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Attach raw detail
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<&TransportError> for ErrorInfo {
    fn from(error: &TransportError) -> Self {
        Self {
            code: error.code(),
            message: error.message.clone(),
            details: error
                .body
                .as_ref()
                .map(|body| serde_json::Value::String(body.clone())),
        }
    }
}

/// Display-level status of the optional follow-up call
///
/// A failed follow-up downgrades how a successful record is displayed; it
/// never moves the record out of the success list.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FollowUpStatus {
    /// The record was not flagged for follow-up
    #[default]
    NotRequested,

    /// A follow-up task was spawned but its result was never collected
    /// (the run was cancelled while it was in flight)
    Pending,

    /// The follow-up call succeeded
    Completed,

    /// The follow-up call failed; the primary success classification is
    /// unchanged
    Failed(ErrorInfo),
}

impl fmt::Display for FollowUpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FollowUpStatus::NotRequested => write!(f, "-"),
            FollowUpStatus::Pending => write!(f, "pending"),
            FollowUpStatus::Completed => write!(f, "completed"),
            FollowUpStatus::Failed(info) => write!(f, "failed: {}", info.message),
        }
    }
}

/// The result of submitting one record
///
/// Created once - by the transport response mapping on success, or
/// synthesized by the orchestrator when a whole group fails terminally -
/// and appended exactly once to the aggregator's success or failure list.
/// The follow-up annotation is the single display-level field set after
/// creation.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    /// Position of the record in the caller's original list
    pub original_index: usize,

    /// The group the record was submitted in
    pub group_key: GroupKey,

    /// Result payload on success, failure detail otherwise
    pub result: Result<serde_json::Value, ErrorInfo>,

    /// Display status of the optional follow-up call
    pub follow_up: FollowUpStatus,
}

impl SubmissionOutcome {
    /// A successful outcome carrying the backend's result payload
    pub fn success(
        original_index: usize,
        group_key: GroupKey,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            original_index,
            group_key,
            result: Ok(payload),
            follow_up: FollowUpStatus::NotRequested,
        }
    }

    /// A failed outcome carrying the failure detail
    pub fn failure(original_index: usize, group_key: GroupKey, error: ErrorInfo) -> Self {
        Self {
            original_index,
            group_key,
            result: Err(error),
            follow_up: FollowUpStatus::NotRequested,
        }
    }

    /// Whether the record was submitted successfully
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    /// The failure detail, if the record failed
    pub fn error_info(&self) -> Option<&ErrorInfo> {
        self.result.as_ref().err()
    }
}

/// Estimated time to run completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Eta {
    /// Not enough throughput data for a reliable estimate
    Calculating,

    /// Estimated remaining time
    Estimate(Duration),
}

impl fmt::Display for Eta {
    /// Render into human buckets: seconds, minutes, or hours+minutes
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eta::Calculating => write!(f, "calculating"),
            Eta::Estimate(duration) => {
                let total_secs = duration.as_secs();
                if total_secs < 60 {
                    write!(f, "{}s", total_secs)
                } else if total_secs < 3600 {
                    write!(f, "{}m {:02}s", total_secs / 60, total_secs % 60)
                } else {
                    let minutes = (total_secs % 3600) / 60;
                    write!(f, "{}h {:02}m", total_secs / 3600, minutes)
                }
            }
        }
    }
}

/// Where a run currently stands
///
/// Terminal variants distinguish "completed cleanly", "completed with
/// failures", "cancelled", and "nothing to do" so the consumer never has
/// to infer the end state from partial counts.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// A group submission is in flight
    Submitting {
        /// 1-based number of the group being submitted
        group: usize,
        /// Total number of groups in the run
        total_groups: usize,
    },

    /// A group failed transiently and will be resubmitted after backoff
    Retrying {
        /// 1-based number of the group being retried
        group: usize,
        /// The attempt number that just failed
        attempt: u32,
    },

    /// A group finished (all its outcomes are recorded)
    GroupCompleted {
        /// 1-based number of the completed group
        group: usize,
        /// Total number of groups in the run
        total_groups: usize,
    },

    /// All groups processed, every record succeeded
    Completed,

    /// All groups processed, some records failed
    CompletedWithFailures(usize),

    /// The run was cancelled before all groups were processed
    Cancelled,

    /// There was nothing to submit (empty input)
    NothingToDo,
}

impl RunStatus {
    /// Whether this status ends the run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed
                | RunStatus::CompletedWithFailures(_)
                | RunStatus::Cancelled
                | RunStatus::NothingToDo
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Submitting {
                group,
                total_groups,
            } => write!(f, "submitting group {}/{}", group, total_groups),
            RunStatus::Retrying { group, attempt } => {
                write!(f, "retrying group {} (attempt {})", group, attempt)
            }
            RunStatus::GroupCompleted {
                group,
                total_groups,
            } => write!(f, "group {}/{} completed", group, total_groups),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::CompletedWithFailures(count) => {
                write!(f, "completed with {} failures", count)
            }
            RunStatus::Cancelled => write!(f, "cancelled"),
            RunStatus::NothingToDo => write!(f, "nothing to do"),
        }
    }
}

/// A progress event delivered to the caller's progress sink
///
/// Emitted after every recorded outcome and after every group; the
/// consumer decides what to render.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Where the run currently stands
    pub status: RunStatus,

    /// Total records in the run
    pub total_records: usize,

    /// Records with a recorded outcome so far
    pub processed: usize,

    /// Successful outcomes so far
    pub success_count: usize,

    /// Failed outcomes so far
    pub failure_count: usize,

    /// Groups fully processed so far
    pub groups_completed: usize,

    /// Total number of groups in the run
    pub total_groups: usize,

    /// Records per second since run start
    pub throughput_per_sec: f64,

    /// Estimated remaining time
    pub eta: Eta,
}

/// The final (or live snapshot) result of a run
///
/// Built incrementally by the aggregator as outcomes arrive; frozen once
/// by `finalize`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Total records in the run
    pub total_records: usize,

    /// Number of records submitted successfully
    pub success_count: usize,

    /// Number of records that failed
    pub failure_count: usize,

    /// Successful outcomes, in the order they were recorded
    pub success_records: Vec<SubmissionOutcome>,

    /// Failed outcomes, in the order they were recorded
    pub error_records: Vec<SubmissionOutcome>,

    /// Whether the run was cancelled before all groups were processed
    pub cancelled: bool,

    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
}

impl RunSummary {
    /// Records with a recorded outcome
    pub fn processed(&self) -> usize {
        self.success_count + self.failure_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_error_info_from_transport_error_keeps_body() {
        let transport_error =
            TransportError::http(503, "service unavailable").with_body("{\"error\":\"busy\"}");
        let info = ErrorInfo::from(&transport_error);

        assert_eq!(info.code, "HTTP_503");
        assert_eq!(info.message, "service unavailable");
        assert_eq!(
            info.details,
            Some(serde_json::Value::String("{\"error\":\"busy\"}".to_string()))
        );
    }

    #[test]
    fn test_error_info_with_details() {
        let info = ErrorInfo::new("SHAPE", "bad response")
            .with_details(serde_json::json!({"expected": 3, "got": 1}));
        assert_eq!(info.details.unwrap()["expected"], serde_json::json!(3));
    }

    #[test]
    fn test_outcome_classification() {
        let ok = SubmissionOutcome::success(0, "g".to_string(), serde_json::json!({"id": 1}));
        let failed =
            SubmissionOutcome::failure(1, "g".to_string(), ErrorInfo::new("HTTP_400", "rejected"));

        assert!(ok.succeeded());
        assert!(ok.error_info().is_none());
        assert!(!failed.succeeded());
        assert_eq!(failed.error_info().unwrap().code, "HTTP_400");
    }

    #[rstest]
    #[case::seconds(45, "45s")]
    #[case::just_under_a_minute(59, "59s")]
    #[case::minutes(272, "4m 32s")]
    #[case::just_under_an_hour(3599, "59m 59s")]
    #[case::hours(4980, "1h 23m")]
    #[case::many_hours(7260, "2h 01m")]
    fn test_eta_buckets(#[case] secs: u64, #[case] expected: &str) {
        assert_eq!(Eta::Estimate(Duration::from_secs(secs)).to_string(), expected);
    }

    #[test]
    fn test_eta_calculating() {
        assert_eq!(Eta::Calculating.to_string(), "calculating");
    }

    #[rstest]
    #[case::submitting(RunStatus::Submitting { group: 2, total_groups: 5 }, "submitting group 2/5", false)]
    #[case::retrying(RunStatus::Retrying { group: 1, attempt: 2 }, "retrying group 1 (attempt 2)", false)]
    #[case::group_completed(
        RunStatus::GroupCompleted { group: 1, total_groups: 3 },
        "group 1/3 completed",
        false
    )]
    #[case::completed(RunStatus::Completed, "completed", true)]
    #[case::with_failures(RunStatus::CompletedWithFailures(3), "completed with 3 failures", true)]
    #[case::cancelled(RunStatus::Cancelled, "cancelled", true)]
    #[case::nothing(RunStatus::NothingToDo, "nothing to do", true)]
    fn test_run_status_display(
        #[case] status: RunStatus,
        #[case] expected: &str,
        #[case] terminal: bool,
    ) {
        assert_eq!(status.to_string(), expected);
        assert_eq!(status.is_terminal(), terminal);
    }

    #[rstest]
    #[case::not_requested(FollowUpStatus::NotRequested, "-")]
    #[case::pending(FollowUpStatus::Pending, "pending")]
    #[case::completed(FollowUpStatus::Completed, "completed")]
    #[case::failed(
        FollowUpStatus::Failed(ErrorInfo::new("HTTP_500", "approval failed")),
        "failed: approval failed"
    )]
    fn test_follow_up_status_display(#[case] status: FollowUpStatus, #[case] expected: &str) {
        assert_eq!(status.to_string(), expected);
    }
}
