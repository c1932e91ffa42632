//! Retry policy for failed group submissions
//!
//! Decides whether a group-level transport failure is worth another
//! attempt and how long to wait before it. The policy is deliberately
//! conservative:
//!
//! - only transient failures are retried: HTTP 429/500/503, or a message
//!   mentioning `busy`/`unavailable`/`timeout` (these show up as status
//!   200 SOAP faults and gateway error pages in practice)
//! - local preparation failures and all other statuses are permanent
//! - backoff is a fixed delay, not exponential
//!
//! Exhausting retries fails the whole group closed: every record becomes a
//! failure outcome and the run advances to the next group.

use std::time::Duration;

use tracing::debug;

use crate::types::{TransportError, TransportErrorKind};

/// HTTP statuses eligible for retry
const TRANSIENT_STATUS: [u16; 3] = [429, 500, 503];

/// Message fragments that mark a failure as transient
const TRANSIENT_MARKERS: [&str; 3] = ["busy", "unavailable", "timeout"];

/// Retry policy with a bounded attempt count and fixed backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Create a policy allowing `max_retries` additional attempts with a
    /// fixed `delay` before each
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Maximum number of additional attempts after the first
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether a failed attempt should be retried
    ///
    /// # Arguments
    ///
    /// * `error` - the failure reported by the transport
    /// * `attempt` - the 1-based attempt number that just failed
    ///
    /// A group is attempted at most `max_retries + 1` times in total.
    pub fn should_retry(&self, error: &TransportError, attempt: u32) -> bool {
        if attempt > self.max_retries {
            debug!(attempt, max_retries = self.max_retries, "retry budget exhausted");
            return false;
        }
        is_transient(error)
    }

    /// Delay to apply before the next attempt
    ///
    /// Fixed regardless of attempt number.
    pub fn backoff(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// Classify a transport error as transient (retryable) or permanent
pub fn is_transient(error: &TransportError) -> bool {
    if error.kind == TransportErrorKind::Preparation {
        return false;
    }
    if let Some(status) = error.status {
        if TRANSIENT_STATUS.contains(&status) {
            return true;
        }
        // A definite non-transient status wins over message text: a 400
        // complaining about a "timeout field" must not be retried.
        return false;
    }

    let message = error.message.to_lowercase();
    TRANSIENT_MARKERS.iter().any(|marker| message.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::too_many_requests(TransportError::http(429, "slow down"), true)]
    #[case::server_error(TransportError::http(500, "internal error"), true)]
    #[case::unavailable(TransportError::http(503, "try later"), true)]
    #[case::bad_request(TransportError::http(400, "malformed payload"), false)]
    #[case::forbidden(TransportError::http(403, "no authorization"), false)]
    #[case::not_found(TransportError::http(404, "unknown service"), false)]
    #[case::status_beats_message(TransportError::http(422, "field timeout invalid"), false)]
    #[case::busy_message(TransportError::network("backend busy, try again"), true)]
    #[case::unavailable_message(TransportError::network("Service Unavailable"), true)]
    #[case::timeout_message(TransportError::network("request timeout after 30s"), true)]
    #[case::plain_network(TransportError::network("connection refused"), false)]
    #[case::preparation(TransportError::preparation("cannot serialize record"), false)]
    fn test_transient_classification(#[case] error: TransportError, #[case] expected: bool) {
        assert_eq!(is_transient(&error), expected);
    }

    #[test]
    fn test_preparation_timeout_text_is_still_permanent() {
        // Preparation failures are local; message text never rescues them.
        let error = TransportError::preparation("serialization timeout");
        assert!(!is_transient(&error));
    }

    #[test]
    fn test_retry_budget_allows_max_retries_plus_one_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let error = TransportError::http(503, "unavailable");

        // Attempts 1..=3 may be followed by a retry; attempt 4 may not.
        assert!(policy.should_retry(&error, 1));
        assert!(policy.should_retry(&error, 2));
        assert!(policy.should_retry(&error, 3));
        assert!(!policy.should_retry(&error, 4));
    }

    #[test]
    fn test_zero_retries_never_retries() {
        let policy = RetryPolicy::new(0, Duration::from_millis(1));
        let error = TransportError::http(503, "unavailable");
        assert!(!policy.should_retry(&error, 1));
    }

    #[test]
    fn test_permanent_error_short_circuits_regardless_of_budget() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1));
        let error = TransportError::http(400, "rejected");
        assert!(!policy.should_retry(&error, 1));
    }

    #[test]
    fn test_backoff_is_fixed() {
        let policy = RetryPolicy::new(3, Duration::from_millis(250));
        assert_eq!(policy.backoff(1), Duration::from_millis(250));
        assert_eq!(policy.backoff(3), Duration::from_millis(250));
    }
}
