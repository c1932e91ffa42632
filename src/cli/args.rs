use crate::core::{RunConfig, DEFAULT_CHUNK_SIZE};
use crate::grouping::GroupingMode;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Rehearse a bulk record submission from a CSV file
#[derive(Parser, Debug)]
#[command(name = "bulk-submit")]
#[command(about = "Rehearse a bulk record submission from a CSV file", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing the records to submit
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Key fields for composite grouping
    #[arg(
        long = "group-by",
        value_name = "FIELDS",
        value_delimiter = ',',
        conflicts_with = "chunk_size",
        help = "Comma-separated key fields to group by (e.g. PurchaseOrder,PostingDate)"
    )]
    pub group_by: Option<Vec<String>>,

    /// Records per group for fixed-size chunking
    #[arg(
        long = "chunk-size",
        value_name = "SIZE",
        help = "Records per group for fixed-size chunking (default: 100)"
    )]
    pub chunk_size: Option<usize>,

    /// Maximum additional attempts per group
    #[arg(
        long = "max-retries",
        value_name = "COUNT",
        default_value_t = 3,
        help = "Maximum retries per group for transient failures"
    )]
    pub max_retries: u32,

    /// Fixed delay before each retry
    #[arg(
        long = "retry-delay-ms",
        value_name = "MILLIS",
        default_value_t = 500,
        help = "Delay in milliseconds before each retry attempt"
    )]
    pub retry_delay_ms: u64,

    /// Pacing delay between groups
    #[arg(
        long = "throttle-ms",
        value_name = "MILLIS",
        default_value_t = 100,
        help = "Pacing delay in milliseconds between consecutive groups"
    )]
    pub throttle_ms: u64,

    /// Record field marking rows for the follow-up step
    #[arg(
        long = "follow-up-field",
        value_name = "FIELD",
        help = "Boolean record field that flags a row for follow-up"
    )]
    pub follow_up_field: Option<String>,
}

impl CliArgs {
    /// Create a RunConfig from CLI arguments
    ///
    /// Uses the provided values where given and falls back to defaults
    /// otherwise. A zero chunk size is replaced by the default, with a
    /// warning.
    ///
    /// # Returns
    ///
    /// A `RunConfig` with values from CLI arguments or defaults.
    pub fn to_run_config(&self) -> RunConfig {
        let grouping = match (&self.group_by, self.chunk_size) {
            (Some(fields), _) => GroupingMode::CompositeKey(fields.clone()),
            (None, Some(0)) => {
                warn!(
                    fallback = DEFAULT_CHUNK_SIZE,
                    "invalid --chunk-size 0, using default"
                );
                GroupingMode::Chunk(DEFAULT_CHUNK_SIZE)
            }
            (None, Some(size)) => GroupingMode::Chunk(size),
            (None, None) => GroupingMode::Chunk(DEFAULT_CHUNK_SIZE),
        };

        RunConfig {
            grouping,
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            inter_group_delay: Duration::from_millis(self.throttle_ms),
            follow_up_field: self.follow_up_field.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // Grouping mode selection tests
    #[rstest]
    #[case::default_chunking(&["program", "input.csv"], GroupingMode::Chunk(DEFAULT_CHUNK_SIZE))]
    #[case::explicit_chunk(&["program", "--chunk-size", "10", "input.csv"], GroupingMode::Chunk(10))]
    #[case::zero_chunk_falls_back(
        &["program", "--chunk-size", "0", "input.csv"],
        GroupingMode::Chunk(DEFAULT_CHUNK_SIZE)
    )]
    #[case::single_key(
        &["program", "--group-by", "PurchaseOrder", "input.csv"],
        GroupingMode::CompositeKey(vec!["PurchaseOrder".to_string()])
    )]
    #[case::composite_key(
        &["program", "--group-by", "PurchaseOrder,PostingDate", "input.csv"],
        GroupingMode::CompositeKey(vec!["PurchaseOrder".to_string(), "PostingDate".to_string()])
    )]
    fn test_grouping_mode(#[case] args: &[&str], #[case] expected: GroupingMode) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.to_run_config().grouping, expected);
    }

    // Retry and throttle option tests
    #[rstest]
    #[case::defaults(&["program", "input.csv"], 3, 500, 100)]
    #[case::custom(
        &["program", "--max-retries", "5", "--retry-delay-ms", "250", "--throttle-ms", "50", "input.csv"],
        5,
        250,
        50
    )]
    fn test_retry_options(
        #[case] args: &[&str],
        #[case] max_retries: u32,
        #[case] retry_delay_ms: u64,
        #[case] throttle_ms: u64,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        let config = parsed.to_run_config();

        assert_eq!(config.max_retries, max_retries);
        assert_eq!(config.retry_delay, Duration::from_millis(retry_delay_ms));
        assert_eq!(config.inter_group_delay, Duration::from_millis(throttle_ms));
    }

    #[test]
    fn test_follow_up_field() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "--follow-up-field",
            "Approve",
            "input.csv",
        ])
        .unwrap();
        assert_eq!(
            parsed.to_run_config().follow_up_field,
            Some("Approve".to_string())
        );
    }

    // Error handling tests
    #[rstest]
    #[case::missing_input(&["program"])]
    #[case::conflicting_modes(
        &["program", "--group-by", "PurchaseOrder", "--chunk-size", "10", "input.csv"]
    )]
    fn test_parsing_errors(#[case] args: &[&str]) {
        let result = CliArgs::try_parse_from(args);
        assert!(result.is_err());
    }
}
