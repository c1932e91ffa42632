//! Asynchronous CSV reader with batch interface
//!
//! Streams input records out of an async CSV source in batches, keeping
//! memory usage constant for large files. Malformed rows are logged and
//! skipped, matching the synchronous reader's behavior.
//!
//! # Design
//!
//! The AsyncReader uses:
//! - csv-async for streaming CSV parsing
//! - the tokio-util compat layer so tokio files plug in directly
//! - batch reading so the caller controls how much is buffered

use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

use crate::io::csv_format::{normalize_headers, record_from_cells};
use crate::types::InputRecord;

/// Asynchronous CSV reader
///
/// Yields batches of [`InputRecord`]s, assigning original indexes in row
/// order across batches.
pub struct AsyncReader<R: AsyncRead + Unpin + Send> {
    csv_reader: csv_async::AsyncReader<R>,
    headers: Option<Vec<String>>,
    next_index: usize,
}

impl<R: AsyncRead + Unpin + Send> AsyncReader<R> {
    /// Create a new AsyncReader from an async byte source
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_reader(reader);

        Self {
            csv_reader,
            headers: None,
            next_index: 0,
        }
    }

    /// Read a batch of input records
    ///
    /// Reads up to `batch_size` rows, converting each into an
    /// [`InputRecord`]. Rows that fail to parse are logged and skipped.
    ///
    /// # Returns
    ///
    /// The next batch of records; an empty vector means end of input.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<InputRecord> {
        if self.headers.is_none() {
            match self.csv_reader.headers().await {
                Ok(headers) => {
                    self.headers = Some(normalize_headers(headers.iter()));
                }
                Err(error) => {
                    warn!(%error, "failed to read CSV header row");
                    return Vec::new();
                }
            }
        }
        let Some(headers) = self.headers.clone() else {
            return Vec::new();
        };

        let mut batch = Vec::with_capacity(batch_size);
        let mut rows = self.csv_reader.records();

        while batch.len() < batch_size {
            match rows.next().await {
                Some(Ok(row)) => {
                    batch.push(record_from_cells(&headers, row.iter(), self.next_index));
                    self.next_index += 1;
                }
                Some(Err(error)) => warn!(%error, "skipping malformed CSV row"),
                None => break,
            }
        }

        batch
    }

    /// Read every remaining record
    pub async fn read_all(&mut self, batch_size: usize) -> Vec<InputRecord> {
        let mut records = Vec::new();
        loop {
            let batch = self.read_batch(batch_size).await;
            if batch.is_empty() {
                break;
            }
            records.extend(batch);
        }
        records
    }
}
