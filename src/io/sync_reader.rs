//! Synchronous CSV reader with iterator interface
//!
//! Streams input records out of a CSV source one at a time. Malformed
//! rows are logged and skipped; the iterator keeps going so one bad line
//! never abandons the rest of the file.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::warn;

use crate::io::csv_format::{normalize_headers, record_from_cells};
use crate::types::{InputRecord, SubmitError};

/// Synchronous CSV reader
///
/// Yields one [`InputRecord`] per data row, assigning original indexes in
/// row order.
pub struct SyncReader<R: Read> {
    rows: csv::StringRecordsIntoIter<R>,
    headers: Vec<String>,
    next_index: usize,
}

impl<R: Read> SyncReader<R> {
    /// Create a reader over CSV data
    ///
    /// # Errors
    ///
    /// Returns `SubmitError::Parse` if the header row cannot be read.
    pub fn new(reader: R) -> Result<Self, SubmitError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = normalize_headers(csv_reader.headers()?.iter());

        Ok(Self {
            rows: csv_reader.into_records(),
            headers,
            next_index: 0,
        })
    }

    /// Collect every remaining record
    pub fn read_all(self) -> Vec<InputRecord> {
        self.collect()
    }
}

impl SyncReader<File> {
    /// Open a CSV file for reading
    ///
    /// # Errors
    ///
    /// Returns `SubmitError::FileNotFound` when the path does not exist,
    /// `SubmitError::Io` for other open failures.
    pub fn from_path(path: &Path) -> Result<Self, SubmitError> {
        let file = File::open(path).map_err(|error| {
            if error.kind() == std::io::ErrorKind::NotFound {
                SubmitError::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                SubmitError::from(error)
            }
        })?;
        Self::new(file)
    }
}

impl<R: Read> Iterator for SyncReader<R> {
    type Item = InputRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.rows.next()? {
                Ok(row) => {
                    let record =
                        record_from_cells(&self.headers, row.iter(), self.next_index);
                    self.next_index += 1;
                    return Some(record);
                }
                Err(error) => {
                    warn!(%error, "skipping malformed CSV row");
                }
            }
        }
    }
}
