//! Bulk submit rehearsal CLI
//!
//! Reads records from a CSV file, groups them, and drives a full
//! submission run against the built-in dry-run transport, writing the
//! per-record outcome CSV to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- records.csv > outcomes.csv
//! cargo run -- --chunk-size 10 records.csv > outcomes.csv
//! cargo run -- --group-by PurchaseOrder,PostingDate records.csv > outcomes.csv
//! cargo run -- --group-by PurchaseOrder --follow-up-field Approve records.csv
//! ```
//!
//! Progress and diagnostics go to stderr via `tracing` (`RUST_LOG`
//! controls verbosity); the outcome CSV goes to stdout. Ctrl-C cancels
//! the run cooperatively - outcomes recorded so far are still written.
//!
//! # Exit Codes
//!
//! - 0: Success (including a cancelled run)
//! - 1: Error (missing file, unreadable CSV, invalid configuration)

use std::process;
use std::sync::Arc;

use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use bulk_submit_engine::cli::{self, CliArgs};
use bulk_submit_engine::core::{BatchOrchestrator, DryRunTransport};
use bulk_submit_engine::io::{write_outcomes_csv, AsyncReader};
use bulk_submit_engine::types::{ProgressUpdate, SubmitError};

/// Rows buffered per read while ingesting the input file
const READ_BATCH_SIZE: usize = 1024;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();

    if let Err(e) = run(args).await {
        error!("{}", e);
        process::exit(1);
    }
}

/// Ingest the input file and drive one rehearsal run
async fn run(args: CliArgs) -> Result<(), SubmitError> {
    let file = tokio::fs::File::open(&args.input_file).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SubmitError::FileNotFound {
                path: args.input_file.display().to_string(),
            }
        } else {
            SubmitError::from(e)
        }
    })?;

    // csv-async speaks futures-io; bridge the tokio file over.
    let mut reader = AsyncReader::new(file.compat());
    let records = reader.read_all(READ_BATCH_SIZE).await;
    info!(records = records.len(), input = %args.input_file.display(), "ingested input file");

    let orchestrator = BatchOrchestrator::new(DryRunTransport, args.to_run_config())
        .with_progress_sink(Arc::new(log_progress));

    // Ctrl-C requests cooperative cancellation; the run still resolves
    // and the outcomes recorded so far are exported below.
    let handle = orchestrator.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("cancellation requested");
            handle.cancel();
        }
    });

    let summary = orchestrator.run(records).await?;
    write_outcomes_csv(&summary, std::io::stdout())?;
    Ok(())
}

/// Progress sink logging to stderr
///
/// Group milestones, retries, and terminal statuses log at info; the
/// per-outcome stream stays at debug. Default output is one line per
/// group plus the final state.
fn log_progress(update: &ProgressUpdate) {
    use bulk_submit_engine::types::RunStatus;

    match &update.status {
        status if status.is_terminal() => info!(
            status = %status,
            processed = update.processed,
            succeeded = update.success_count,
            failed = update.failure_count,
            "run finished"
        ),
        RunStatus::GroupCompleted { .. } | RunStatus::Retrying { .. } => info!(
            status = %update.status,
            processed = update.processed,
            total = update.total_records,
            throughput = format!("{:.1}/s", update.throughput_per_sec),
            eta = %update.eta,
            "progress"
        ),
        _ => debug!(
            status = %update.status,
            processed = update.processed,
            total = update.total_records,
            "progress"
        ),
    }
}
