//! Fixed-size chunk grouping
//!
//! Partitions records into chunks of N consecutive records regardless of
//! content. Group keys are positional (`chunk-0`, `chunk-1`, ...), so the
//! submission order is simply the input order.

use crate::grouping::GroupingStrategy;
use crate::types::{InputRecord, RecordGroup, SubmitError};

/// Fixed-size chunk grouping strategy
///
/// The last chunk may be shorter than the configured size; it is never
/// padded or merged into its neighbor.
#[derive(Debug, Clone)]
pub struct ChunkGrouping {
    chunk_size: usize,
}

impl ChunkGrouping {
    /// Create a chunk grouping with the given chunk size
    ///
    /// A zero size is rejected by `group`, not here, so configuration
    /// validation stays in one place (the run config) while direct
    /// construction still fails loudly.
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }
}

impl GroupingStrategy for ChunkGrouping {
    fn group(&self, records: &[InputRecord]) -> Result<Vec<RecordGroup>, SubmitError> {
        if self.chunk_size == 0 {
            return Err(SubmitError::grouping("chunk size must be at least 1"));
        }

        let groups = records
            .chunks(self.chunk_size)
            .enumerate()
            .map(|(index, chunk)| RecordGroup {
                key: format!("chunk-{}", index),
                records: chunk.to_vec(),
            })
            .collect();

        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;

    fn records(count: usize) -> Vec<InputRecord> {
        (0..count)
            .map(|i| InputRecord::from_pairs(i, [("Value", FieldValue::text(i.to_string()))]))
            .collect()
    }

    #[test]
    fn test_chunks_of_ten_with_remainder() {
        let strategy = ChunkGrouping::new(10);
        let groups = strategy.group(&records(25)).unwrap();

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].len(), 10);
        assert_eq!(groups[1].len(), 10);
        assert_eq!(groups[2].len(), 5);
        assert_eq!(groups[0].key, "chunk-0");
        assert_eq!(groups[2].key, "chunk-2");
    }

    #[test]
    fn test_concatenation_reproduces_input_order() {
        let input = records(7);
        let strategy = ChunkGrouping::new(3);
        let groups = strategy.group(&input).unwrap();

        let flattened: Vec<usize> = groups
            .iter()
            .flat_map(|g| g.records.iter().map(|r| r.original_index()))
            .collect();
        assert_eq!(flattened, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_input_yields_no_groups() {
        let strategy = ChunkGrouping::new(10);
        let groups = strategy.group(&[]).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_chunk_size_larger_than_input() {
        let strategy = ChunkGrouping::new(100);
        let groups = strategy.group(&records(3)).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let strategy = ChunkGrouping::new(0);
        let result = strategy.group(&records(3));

        assert!(matches!(result, Err(SubmitError::Grouping { .. })));
    }

    #[test]
    fn test_grouping_is_deterministic() {
        let input = records(12);
        let strategy = ChunkGrouping::new(5);

        let first = strategy.group(&input).unwrap();
        let second = strategy.group(&input).unwrap();
        assert_eq!(first, second);
    }
}
