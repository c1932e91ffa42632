//! Error types for the bulk submit engine
//!
//! Two families of errors live here:
//!
//! - [`SubmitError`] - faults in orchestration setup and at the record
//!   ingestion boundary. These abort a run (or a file read); per-group
//!   transport failures never surface as `SubmitError`.
//! - [`TransportError`] - a failed group submission as reported by a
//!   transport adapter, carrying enough of the underlying failure (status
//!   code, message, raw body) for retry classification and for failure
//!   reporting.
//!
//! Cancellation is deliberately not an error: a cancelled run resolves
//! normally with `RunSummary::cancelled` set.

use thiserror::Error;

/// Fatal and boundary errors for the bulk submit engine
///
/// Every variant carries the context needed to report the fault without
/// consulting anything else. Per-record failures are represented as
/// `ErrorInfo` on submission outcomes instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    /// No records were supplied (or grouping produced no groups)
    ///
    /// Benign: the orchestrator converts this into a zero-count
    /// completion rather than surfacing it as a failure.
    #[error("no records to submit")]
    EmptyInput,

    /// The run configuration is unusable
    ///
    /// Fatal: the run never starts.
    #[error("invalid run configuration: {message}")]
    InvalidConfig {
        /// What was wrong with the configuration
        message: String,
    },

    /// The grouping strategy failed before any network call
    ///
    /// Fatal: the record list could not be partitioned at all.
    #[error("grouping failed: {message}")]
    Grouping {
        /// Description of the grouping fault
        message: String,
    },

    /// Input file not found at the specified path
    #[error("file not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error while reading records or writing outcomes
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error at the ingestion boundary
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Parse {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl SubmitError {
    /// Create an InvalidConfig error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        SubmitError::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a Grouping error
    pub fn grouping(message: impl Into<String>) -> Self {
        SubmitError::Grouping {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for SubmitError {
    fn from(error: std::io::Error) -> Self {
        SubmitError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for SubmitError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        SubmitError::Parse {
            line,
            message: error.to_string(),
        }
    }
}

/// Where a group submission failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The remote call itself failed (HTTP status, network fault, SOAP
    /// fault)
    Http,

    /// Payload construction failed locally, before any network call
    ///
    /// Never retried: resubmitting the same group would fail the same way.
    Preparation,
}

/// A failed group submission
///
/// Reported by a transport adapter for the whole group. The retry policy
/// classifies it as transient or permanent; if the group is not (or no
/// longer) retryable, every record in the group becomes a failure outcome
/// carrying this error's code and message.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportError {
    /// Which side of the boundary failed
    pub kind: TransportErrorKind,

    /// HTTP status code, when one was received
    pub status: Option<u16>,

    /// Human-readable failure description
    pub message: String,

    /// Raw response body, when one was received
    ///
    /// Kept verbatim so nothing is discarded before export/inspection.
    pub body: Option<String>,
}

impl TransportError {
    /// A failure with an HTTP status code
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Http,
            status: Some(status),
            message: message.into(),
            body: None,
        }
    }

    /// A connection-level failure with no HTTP status
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Http,
            status: None,
            message: message.into(),
            body: None,
        }
    }

    /// A local payload-construction failure
    pub fn preparation(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Preparation,
            status: None,
            message: message.into(),
            body: None,
        }
    }

    /// Attach the raw response body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Stable short code for this error
    ///
    /// `HTTP_<status>` when a status code was received, otherwise
    /// `NETWORK` or `PREPARATION`.
    pub fn code(&self) -> String {
        match (self.kind, self.status) {
            (TransportErrorKind::Http, Some(status)) => format!("HTTP_{}", status),
            (TransportErrorKind::Http, None) => "NETWORK".to_string(),
            (TransportErrorKind::Preparation, _) => "PREPARATION".to_string(),
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "transport error ({}): {}", self.code(), self.message)
    }
}

impl std::error::Error for TransportError {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::empty_input(SubmitError::EmptyInput, "no records to submit")]
    #[case::invalid_config(
        SubmitError::invalid_config("chunk size must be at least 1"),
        "invalid run configuration: chunk size must be at least 1"
    )]
    #[case::grouping(
        SubmitError::grouping("no key fields configured"),
        "grouping failed: no key fields configured"
    )]
    #[case::file_not_found(
        SubmitError::FileNotFound { path: "records.csv".to_string() },
        "file not found: records.csv"
    )]
    #[case::io(
        SubmitError::Io { message: "Permission denied".to_string() },
        "I/O error: Permission denied"
    )]
    #[case::parse_with_line(
        SubmitError::Parse { line: Some(12), message: "bad field".to_string() },
        "CSV parse error at line 12: bad field"
    )]
    #[case::parse_without_line(
        SubmitError::Parse { line: None, message: "bad field".to_string() },
        "CSV parse error: bad field"
    )]
    fn test_submit_error_display(#[case] error: SubmitError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: SubmitError = io_error.into();
        assert!(matches!(error, SubmitError::Io { .. }));
        assert_eq!(error.to_string(), "I/O error: Permission denied");
    }

    #[rstest]
    #[case::http(TransportError::http(503, "service unavailable"), "HTTP_503")]
    #[case::network(TransportError::network("connection reset"), "NETWORK")]
    #[case::preparation(TransportError::preparation("payload too large"), "PREPARATION")]
    fn test_transport_error_codes(#[case] error: TransportError, #[case] expected: &str) {
        assert_eq!(error.code(), expected);
    }

    #[test]
    fn test_transport_error_display_includes_code() {
        let error = TransportError::http(429, "too many requests");
        assert_eq!(error.to_string(), "transport error (HTTP_429): too many requests");
    }

    #[test]
    fn test_with_body_keeps_raw_response() {
        let error = TransportError::http(400, "rejected").with_body("<fault>bad</fault>");
        assert_eq!(error.body.as_deref(), Some("<fault>bad</fault>"));
    }
}
