//! Record types for the bulk submit engine
//!
//! This module defines the opaque input record submitted by callers, the
//! typed field values it carries, and the group container produced by the
//! grouping strategies.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Group identity
///
/// A string key derived from one or more record fields (composite mode) or
/// from the record's position (chunk mode). All records sharing a key are
/// submitted together in exactly one transport call.
pub type GroupKey = String;

/// A typed cell value carried by an [`InputRecord`] field
///
/// Business amounts use [`Decimal`] rather than floats so values survive
/// the round-trip to the backend unchanged. Dates are held as calendar
/// dates; the grouping layer renders them canonically as `YYYY-MM-DD`.
///
/// The untagged serde representation mirrors how tabular values appear in
/// payloads: booleans, decimal strings, ISO dates, and plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A boolean flag (e.g., an approval indicator)
    Bool(bool),

    /// A numeric value with exact decimal precision
    Number(Decimal),

    /// A calendar date (no time component)
    Date(NaiveDate),

    /// Free text (identifiers, descriptions, codes)
    Text(String),
}

impl FieldValue {
    /// Create a text value from anything string-like
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// View the value as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Whether the value is empty text
    ///
    /// Empty text is treated like a missing field by the grouping layer.
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.trim().is_empty())
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One business line to submit
///
/// An opaque mapping of field name to value plus a stable `original_index`
/// (the record's position in the caller's original list). The index is what
/// correlates per-record outcomes back to the input regardless of how the
/// records are grouped or reordered; the orchestrator assigns (or verifies)
/// it before grouping.
///
/// Records are immutable once submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    /// Position in the caller's original record list
    original_index: usize,

    /// Field name to value mapping
    ///
    /// Field names are normalized once at ingestion; the engine never
    /// re-interprets them.
    fields: BTreeMap<String, FieldValue>,
}

impl InputRecord {
    /// Create a record with its original position and field map
    pub fn new(original_index: usize, fields: BTreeMap<String, FieldValue>) -> Self {
        Self {
            original_index,
            fields,
        }
    }

    /// Create a record from `(name, value)` pairs
    ///
    /// Convenience constructor for callers assembling records in code
    /// (and for tests).
    pub fn from_pairs<'a, I>(original_index: usize, pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, FieldValue)>,
    {
        let fields = pairs
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        Self::new(original_index, fields)
    }

    /// The record's position in the caller's original list
    pub fn original_index(&self) -> usize {
        self.original_index
    }

    /// Reassign the original index
    ///
    /// Called by the orchestrator before grouping so the index is
    /// guaranteed to match the submitted list even if the caller built the
    /// records with placeholder positions.
    pub fn set_original_index(&mut self, original_index: usize) {
        self.original_index = original_index;
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Look up a field as text
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    /// Whether a boolean-ish field is set
    ///
    /// Accepts `Bool(true)` as well as the textual markers `"true"` and
    /// `"x"` (case-insensitive) that tabular exports commonly use for
    /// checkbox columns. Anything else, including a missing field, is
    /// `false`.
    pub fn flag(&self, name: &str) -> bool {
        match self.get(name) {
            Some(FieldValue::Bool(b)) => *b,
            Some(FieldValue::Text(s)) => {
                let s = s.trim();
                s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("x")
            }
            _ => false,
        }
    }

    /// The full field map
    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }
}

/// An ordered, non-empty run of records sharing one [`GroupKey`]
///
/// Created once by a grouping strategy at orchestration start and consumed
/// exactly once by the orchestrator: the whole group travels in a single
/// transport call, never split and never merged with another group.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordGroup {
    /// The shared group identity
    pub key: GroupKey,

    /// Member records, in input order
    pub records: Vec<InputRecord>,
}

impl RecordGroup {
    /// Number of records in the group
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the group is empty (never true for strategy output)
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
