//! Follow-up dispatch for flagged successes
//!
//! Some uploads want a secondary remote call per created record (e.g. an
//! approval step after creation). The dispatcher spawns the configured
//! hook as a detached task for every successful, flagged record so the
//! main loop advances to the next group without waiting. Results are
//! collected at run end; on cancellation, still-running tasks are aborted.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::core::traits::FollowUpHook;
use crate::types::{FollowUpStatus, InputRecord, SubmissionOutcome};

/// Spawns and collects follow-up tasks for one run
pub(crate) struct FollowUpDispatcher {
    hook: Option<Arc<dyn FollowUpHook>>,
    flag_field: Option<String>,
    tasks: JoinSet<(usize, FollowUpStatus)>,
}

impl FollowUpDispatcher {
    pub(crate) fn new(hook: Option<Arc<dyn FollowUpHook>>, flag_field: Option<String>) -> Self {
        Self {
            hook,
            flag_field,
            tasks: JoinSet::new(),
        }
    }

    /// Whether this record/outcome pair qualifies for a follow-up call
    ///
    /// Requires a configured hook and flag field, the flag set on the
    /// original record, and a successful primary outcome. Failed records
    /// never fire the hook.
    pub(crate) fn wants_follow_up(&self, record: &InputRecord, outcome: &SubmissionOutcome) -> bool {
        if self.hook.is_none() {
            return false;
        }
        let Some(field) = &self.flag_field else {
            return false;
        };
        outcome.succeeded() && record.flag(field)
    }

    /// Spawn the follow-up task for a qualifying record
    ///
    /// The task owns clones of the record and outcome and reports back
    /// only through its join handle.
    pub(crate) fn spawn(&mut self, record: &InputRecord, outcome: &SubmissionOutcome) {
        let Some(hook) = self.hook.clone() else {
            return;
        };
        let record = record.clone();
        let outcome = outcome.clone();

        debug!(index = outcome.original_index, "spawning follow-up");
        self.tasks.spawn(async move {
            let status = match hook.follow_up(&record, &outcome).await {
                Ok(()) => FollowUpStatus::Completed,
                Err(error) => FollowUpStatus::Failed(error),
            };
            (outcome.original_index, status)
        });
    }

    /// Collect the results of all spawned follow-ups
    ///
    /// On a cancelled run, outstanding tasks are aborted first; tasks that
    /// already finished still report their status, aborted ones stay
    /// `Pending` in the summary.
    pub(crate) async fn finish(mut self, cancelled: bool) -> HashMap<usize, FollowUpStatus> {
        if cancelled {
            self.tasks.abort_all();
        }

        let mut results = HashMap::new();
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok((index, status)) => {
                    results.insert(index, status);
                }
                Err(error) if error.is_cancelled() => {}
                Err(error) => warn!(%error, "follow-up task panicked"),
            }
        }
        results
    }
}
