//! Composite-field grouping
//!
//! Partitions records by the exact combination of one or more key fields
//! (e.g. purchase order + posting date). Arbitrarily many records can land
//! in one group if their key fields match after normalization.
//!
//! # Key normalization
//!
//! Key parts are string-normalized exactly once, here:
//! - dates render canonically as `YYYY-MM-DD`
//! - numbers render in canonical decimal form (no trailing zeros)
//! - text is trimmed
//! - a missing or empty field becomes the `UNKNOWN` sentinel
//!
//! A record with a missing key field is therefore still grouped (under the
//! sentinel), never silently dropped.

use std::collections::HashMap;

use crate::grouping::GroupingStrategy;
use crate::types::{FieldValue, GroupKey, InputRecord, RecordGroup, SubmitError};

/// Sentinel key part for a missing or empty key field
pub const UNKNOWN_KEY_PART: &str = "UNKNOWN";

/// Separator between key parts in a composite group key
const KEY_SEPARATOR: &str = "::";

/// Composite-field grouping strategy
///
/// Group order is the order in which each distinct key is first seen in
/// the input; within a group, records keep their input order.
#[derive(Debug, Clone)]
pub struct CompositeKeyGrouping {
    fields: Vec<String>,
}

impl CompositeKeyGrouping {
    /// Create a composite grouping over the named fields
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// Derive the normalized group key for one record
    fn key_for(&self, record: &InputRecord) -> GroupKey {
        self.fields
            .iter()
            .map(|field| normalize_key_part(record.get(field)))
            .collect::<Vec<_>>()
            .join(KEY_SEPARATOR)
    }
}

impl GroupingStrategy for CompositeKeyGrouping {
    fn group(&self, records: &[InputRecord]) -> Result<Vec<RecordGroup>, SubmitError> {
        if self.fields.is_empty() {
            return Err(SubmitError::grouping("no key fields configured"));
        }
        if self.fields.iter().any(|f| f.trim().is_empty()) {
            return Err(SubmitError::grouping("key field names must not be blank"));
        }

        // First-seen key order is the submission order, so groups live in
        // a Vec with a key -> position index on the side.
        let mut groups: Vec<RecordGroup> = Vec::new();
        let mut positions: HashMap<GroupKey, usize> = HashMap::new();

        for record in records {
            let key = self.key_for(record);
            match positions.get(&key) {
                Some(&position) => groups[position].records.push(record.clone()),
                None => {
                    positions.insert(key.clone(), groups.len());
                    groups.push(RecordGroup {
                        key,
                        records: vec![record.clone()],
                    });
                }
            }
        }

        Ok(groups)
    }
}

/// Normalize one key part to its canonical string form
///
/// `None` (missing field) and empty text both normalize to
/// [`UNKNOWN_KEY_PART`]. Text that parses as an ISO date is coerced to the
/// canonical `YYYY-MM-DD` form so `2024-3-7` and a real date cell group
/// together.
pub fn normalize_key_part(value: Option<&FieldValue>) -> String {
    match value {
        None => UNKNOWN_KEY_PART.to_string(),
        Some(value) if value.is_empty() => UNKNOWN_KEY_PART.to_string(),
        Some(FieldValue::Date(date)) => date.format("%Y-%m-%d").to_string(),
        Some(FieldValue::Number(number)) => number.normalize().to_string(),
        Some(FieldValue::Bool(flag)) => flag.to_string(),
        Some(FieldValue::Text(text)) => {
            let trimmed = text.trim();
            match chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
                Ok(date) => date.format("%Y-%m-%d").to_string(),
                Err(_) => trimmed.to_string(),
            }
        }
    }
}
