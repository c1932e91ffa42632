//! Grouping strategy module
//!
//! This module defines the Strategy pattern for partitioning an input
//! record list into ordered groups. Each group travels in exactly one
//! transport call, so the strategy decides both the batching granularity
//! and the submission order. Two implementations can be selected at
//! runtime:
//!
//! - fixed-size chunking of N consecutive records regardless of content
//! - composite-field grouping, where records whose normalized key fields
//!   match exactly land in the same group

use crate::types::{InputRecord, RecordGroup, SubmitError};

pub mod chunk;
pub mod composite;

pub use chunk::ChunkGrouping;
pub use composite::{CompositeKeyGrouping, UNKNOWN_KEY_PART};

/// How records are partitioned into groups
#[derive(Debug, Clone, PartialEq)]
pub enum GroupingMode {
    /// Fixed-size chunks of N consecutive records
    Chunk(usize),

    /// One group per distinct combination of the named fields
    CompositeKey(Vec<String>),
}

/// Grouping strategy trait
///
/// Partitions a record list into ordered, non-empty groups.
///
/// # Guarantees
///
/// Every implementation must uphold:
/// - each record appears in exactly one group (none lost, none duplicated)
/// - concatenating all groups in order reproduces the input as a multiset
/// - within a group, records keep their input order
/// - group order is deterministic for a given input (repeated calls
///   produce the same partition)
pub trait GroupingStrategy: Send + Sync {
    /// Partition records into submission groups
    ///
    /// # Arguments
    ///
    /// * `records` - the full record list, with original indexes assigned
    ///
    /// # Returns
    ///
    /// The ordered group list; the order is the submission order.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError::Grouping` if the strategy itself is unusable
    /// (zero chunk size, empty key-field list). These are setup faults
    /// that abort the run before any network call.
    fn group(&self, records: &[InputRecord]) -> Result<Vec<RecordGroup>, SubmitError>;
}

/// Create a grouping strategy for the specified mode
///
/// Factory selecting the strategy implementation at runtime from the run
/// configuration.
pub fn create_grouping(mode: &GroupingMode) -> Box<dyn GroupingStrategy> {
    match mode {
        GroupingMode::Chunk(size) => Box::new(ChunkGrouping::new(*size)),
        GroupingMode::CompositeKey(fields) => {
            Box::new(CompositeKeyGrouping::new(fields.clone()))
        }
    }
}
