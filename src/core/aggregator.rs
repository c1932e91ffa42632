//! Progress and result aggregation
//!
//! Accumulates per-record outcomes into running counts and ordered
//! success/failure lists, computes timing statistics (elapsed, throughput,
//! ETA), and produces both live snapshots and the final frozen summary.
//!
//! The aggregator is owned exclusively by the orchestrator's control loop;
//! `finalize` consumes it, so a run can only ever be finalized once.

use std::collections::HashMap;
use std::time::Instant;

use tracing::info;

use crate::types::{
    Eta, FollowUpStatus, ProgressUpdate, RunStatus, RunSummary, SubmissionOutcome,
};

/// Throughput below this is statistically unreliable; report
/// "calculating" instead of a garbage ETA.
const MIN_RELIABLE_THROUGHPUT: f64 = 1e-3;

/// Accumulates outcomes and timing statistics for one run
#[derive(Debug)]
pub struct ProgressAggregator {
    started_at: Instant,
    total_records: usize,
    success: Vec<SubmissionOutcome>,
    failure: Vec<SubmissionOutcome>,
}

impl ProgressAggregator {
    /// Start aggregating a run over `total_records` records
    ///
    /// The run clock starts here.
    pub fn new(total_records: usize) -> Self {
        Self {
            started_at: Instant::now(),
            total_records,
            success: Vec::new(),
            failure: Vec::new(),
        }
    }

    /// Record one outcome
    ///
    /// Appends to the success or failure list; outcomes are never moved
    /// or mutated afterwards.
    pub fn record(&mut self, outcome: SubmissionOutcome) {
        if outcome.succeeded() {
            self.success.push(outcome);
        } else {
            self.failure.push(outcome);
        }
    }

    /// Records with a recorded outcome so far
    pub fn processed(&self) -> usize {
        self.success.len() + self.failure.len()
    }

    /// Successful outcomes so far
    pub fn success_count(&self) -> usize {
        self.success.len()
    }

    /// Failed outcomes so far
    pub fn failure_count(&self) -> usize {
        self.failure.len()
    }

    /// Records per second since run start
    ///
    /// Elapsed time is clamped to a minimum of one second so early
    /// readings neither divide by zero nor report absurd rates.
    pub fn throughput(&self) -> f64 {
        let elapsed_secs = self.started_at.elapsed().as_secs_f64().max(1.0);
        self.processed() as f64 / elapsed_secs
    }

    /// Estimated time to completion
    pub fn eta(&self) -> Eta {
        let throughput = self.throughput();
        if throughput < MIN_RELIABLE_THROUGHPUT {
            return Eta::Calculating;
        }
        let remaining = self.total_records.saturating_sub(self.processed());
        Eta::Estimate(std::time::Duration::from_secs_f64(
            remaining as f64 / throughput,
        ))
    }

    /// Build a progress event for the sink
    pub fn progress(
        &self,
        status: RunStatus,
        groups_completed: usize,
        total_groups: usize,
    ) -> ProgressUpdate {
        ProgressUpdate {
            status,
            total_records: self.total_records,
            processed: self.processed(),
            success_count: self.success_count(),
            failure_count: self.failure_count(),
            groups_completed,
            total_groups,
            throughput_per_sec: self.throughput(),
            eta: self.eta(),
        }
    }

    /// A live snapshot of the summary so far
    ///
    /// Obtainable at any time for progress display; the run is not frozen.
    pub fn snapshot(&self) -> RunSummary {
        RunSummary {
            total_records: self.total_records,
            success_count: self.success_count(),
            failure_count: self.failure_count(),
            success_records: self.success.clone(),
            error_records: self.failure.clone(),
            cancelled: false,
            duration_ms: self.started_at.elapsed().as_millis() as u64,
        }
    }

    /// Freeze the run into its final summary
    ///
    /// Consumes the aggregator, so this happens exactly once per run.
    /// Follow-up results (keyed by original index) are applied as display
    /// annotations to the success list; they never reclassify a record.
    pub fn finalize(
        mut self,
        cancelled: bool,
        follow_ups: HashMap<usize, FollowUpStatus>,
    ) -> RunSummary {
        for outcome in &mut self.success {
            if let Some(status) = follow_ups.get(&outcome.original_index) {
                outcome.follow_up = status.clone();
            }
        }

        let summary = RunSummary {
            total_records: self.total_records,
            success_count: self.success.len(),
            failure_count: self.failure.len(),
            success_records: self.success,
            error_records: self.failure,
            cancelled,
            duration_ms: self.started_at.elapsed().as_millis() as u64,
        };

        info!(
            total = summary.total_records,
            succeeded = summary.success_count,
            failed = summary.failure_count,
            cancelled = summary.cancelled,
            duration_ms = summary.duration_ms,
            "run finalized"
        );

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorInfo;

    fn success(index: usize) -> SubmissionOutcome {
        SubmissionOutcome::success(index, "g".to_string(), serde_json::json!({"ok": true}))
    }

    fn failure(index: usize) -> SubmissionOutcome {
        SubmissionOutcome::failure(index, "g".to_string(), ErrorInfo::new("HTTP_400", "rejected"))
    }

    #[test]
    fn test_counts_track_recorded_outcomes() {
        let mut aggregator = ProgressAggregator::new(5);
        aggregator.record(success(0));
        aggregator.record(failure(1));
        aggregator.record(success(2));

        assert_eq!(aggregator.processed(), 3);
        assert_eq!(aggregator.success_count(), 2);
        assert_eq!(aggregator.failure_count(), 1);
    }

    #[test]
    fn test_snapshot_reflects_live_state() {
        let mut aggregator = ProgressAggregator::new(3);
        aggregator.record(success(0));

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.total_records, 3);
        assert_eq!(snapshot.success_count, 1);
        assert_eq!(snapshot.failure_count, 0);
        assert!(!snapshot.cancelled);

        // Recording after a snapshot must not affect the taken snapshot.
        aggregator.record(failure(1));
        assert_eq!(snapshot.success_count, 1);
    }

    #[test]
    fn test_finalize_preserves_order_and_counts() {
        let mut aggregator = ProgressAggregator::new(4);
        aggregator.record(success(2));
        aggregator.record(failure(0));
        aggregator.record(success(3));
        aggregator.record(failure(1));

        let summary = aggregator.finalize(false, HashMap::new());

        assert_eq!(summary.processed(), 4);
        assert_eq!(
            summary.success_records.iter().map(|o| o.original_index).collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert_eq!(
            summary.error_records.iter().map(|o| o.original_index).collect::<Vec<_>>(),
            vec![0, 1]
        );
    }

    #[test]
    fn test_finalize_applies_follow_up_annotations() {
        let mut aggregator = ProgressAggregator::new(2);
        aggregator.record(success(0));
        aggregator.record(success(1));

        let mut follow_ups = HashMap::new();
        follow_ups.insert(
            1,
            FollowUpStatus::Failed(ErrorInfo::new("HTTP_500", "approval failed")),
        );

        let summary = aggregator.finalize(false, follow_ups);

        // The annotation downgrades display status only; both records stay
        // in the success list.
        assert_eq!(summary.success_count, 2);
        assert_eq!(summary.success_records[0].follow_up, FollowUpStatus::NotRequested);
        assert!(matches!(
            summary.success_records[1].follow_up,
            FollowUpStatus::Failed(_)
        ));
    }

    #[test]
    fn test_finalize_carries_cancelled_flag() {
        let mut aggregator = ProgressAggregator::new(10);
        aggregator.record(success(0));

        let summary = aggregator.finalize(true, HashMap::new());
        assert!(summary.cancelled);
        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.total_records, 10);
    }

    #[test]
    fn test_throughput_clamps_elapsed_to_one_second() {
        let mut aggregator = ProgressAggregator::new(100);
        for i in 0..50 {
            aggregator.record(success(i));
        }

        // Well under a second has elapsed, so the clamp makes this read as
        // "50 records over one second" at most.
        let throughput = aggregator.throughput();
        assert!(throughput > 0.0);
        assert!(throughput <= 50.0);
    }

    #[test]
    fn test_eta_is_calculating_before_any_outcome() {
        let aggregator = ProgressAggregator::new(100);
        assert_eq!(aggregator.eta(), Eta::Calculating);
    }

    #[test]
    fn test_eta_estimates_once_outcomes_arrive() {
        let mut aggregator = ProgressAggregator::new(100);
        for i in 0..50 {
            aggregator.record(success(i));
        }

        match aggregator.eta() {
            Eta::Estimate(duration) => {
                // 50 remaining at >= 50/s (clamped) is at most a couple of
                // seconds.
                assert!(duration.as_secs() <= 2);
            }
            Eta::Calculating => panic!("expected an estimate with 50 outcomes recorded"),
        }
    }

    #[test]
    fn test_progress_event_carries_group_counters() {
        let mut aggregator = ProgressAggregator::new(6);
        aggregator.record(success(0));

        let update = aggregator.progress(
            RunStatus::Submitting {
                group: 1,
                total_groups: 3,
            },
            0,
            3,
        );

        assert_eq!(update.processed, 1);
        assert_eq!(update.total_records, 6);
        assert_eq!(update.groups_completed, 0);
        assert_eq!(update.total_groups, 3);
    }
}
