//! I/O module
//!
//! Handles CSV ingestion and outcome export.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (cell typing, row conversion,
//!   outcome serialization)
//! - `sync_reader` - synchronous CSV reader with iterator interface
//! - `async_reader` - asynchronous CSV reader with batch interface

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{normalize_headers, parse_cell, record_from_cells, write_outcomes_csv};
pub use sync_reader::SyncReader;
