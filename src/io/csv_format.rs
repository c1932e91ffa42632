//! CSV format handling for input records and outcome export
//!
//! This module centralizes the CSV format concerns:
//! - typed cell parsing (bool, date, number, text)
//! - header-driven conversion of a row into an [`InputRecord`]
//! - outcome export of a finished [`RunSummary`]
//!
//! All functions are pure (no I/O) for easy testing; the readers in this
//! module's siblings feed them, and they work for both the sync and async
//! CSV stacks because rows arrive as plain string cells.

use std::io::Write;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::types::{FieldValue, InputRecord, RunSummary, SubmitError};

/// Date formats accepted for date cells, tried in order
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y"];

/// Parse one CSV cell into a typed field value
///
/// Inference order: boolean literals, dates (see [`DATE_FORMATS`]),
/// decimal numbers, then plain text. A blank cell is `None` - the field
/// is absent from the record, which the grouping layer later maps to its
/// missing-field sentinel.
///
/// Numeric-looking cells parse as numbers, so identifiers that must keep
/// leading zeros should be quoted with a non-numeric prefix by the
/// producing system or mapped back via the record's other fields.
pub fn parse_cell(raw: &str) -> Option<FieldValue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.eq_ignore_ascii_case("true") {
        return Some(FieldValue::Bool(true));
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Some(FieldValue::Bool(false));
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(FieldValue::Date(date));
        }
    }

    if let Ok(number) = Decimal::from_str(trimmed) {
        return Some(FieldValue::Number(number));
    }

    Some(FieldValue::text(trimmed))
}

/// Normalize CSV header names into field names
///
/// Field names are normalized exactly once, here, so nothing downstream
/// has to re-match header spellings.
pub fn normalize_headers<'a, I>(headers: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    headers
        .into_iter()
        .map(|header| header.trim().to_string())
        .collect()
}

/// Build an [`InputRecord`] from one CSV row
///
/// Cells are matched to headers positionally; blank cells leave the field
/// absent. Rows shorter than the header are accepted (trailing fields
/// absent), extra cells beyond the header are ignored.
///
/// # Arguments
///
/// * `headers` - normalized header names (see [`normalize_headers`])
/// * `cells` - the row's cells, in header order
/// * `original_index` - the record's position in the input
pub fn record_from_cells<'a, I>(headers: &[String], cells: I, original_index: usize) -> InputRecord
where
    I: IntoIterator<Item = &'a str>,
{
    let fields = headers
        .iter()
        .zip(cells)
        .filter_map(|(header, cell)| parse_cell(cell).map(|value| (header.clone(), value)))
        .collect();

    InputRecord::new(original_index, fields)
}

/// Write a finished run's per-record outcomes as CSV
///
/// One row per record, ordered by original index so the output lines up
/// with the input file. Columns: `index`, `group`, `status`, `code`,
/// `message`, `follow_up`.
///
/// # Errors
///
/// Returns `SubmitError::Io`/`SubmitError::Parse` if the underlying
/// writer fails.
pub fn write_outcomes_csv<W: Write>(summary: &RunSummary, writer: W) -> Result<(), SubmitError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(["index", "group", "status", "code", "message", "follow_up"])?;

    let mut outcomes: Vec<_> = summary
        .success_records
        .iter()
        .chain(summary.error_records.iter())
        .collect();
    outcomes.sort_by_key(|outcome| outcome.original_index);

    for outcome in outcomes {
        let (status, code, message) = match outcome.error_info() {
            None => ("success", String::new(), String::new()),
            Some(info) => ("failed", info.code.clone(), info.message.clone()),
        };
        csv_writer.write_record([
            outcome.original_index.to_string().as_str(),
            outcome.group_key.as_str(),
            status,
            code.as_str(),
            message.as_str(),
            outcome.follow_up.to_string().as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    use crate::types::{ErrorInfo, FollowUpStatus, SubmissionOutcome};

    #[rstest]
    #[case::blank("", None)]
    #[case::whitespace("   ", None)]
    #[case::bool_true("true", Some(FieldValue::Bool(true)))]
    #[case::bool_mixed_case("TRUE", Some(FieldValue::Bool(true)))]
    #[case::bool_false("false", Some(FieldValue::Bool(false)))]
    #[case::iso_date("2024-03-07", Some(FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap())))]
    #[case::german_date("07.03.2024", Some(FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap())))]
    #[case::us_date("03/07/2024", Some(FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap())))]
    #[case::integer("42", Some(FieldValue::Number(Decimal::from(42))))]
    #[case::decimal("10.50", Some(FieldValue::Number(Decimal::new(1050, 2))))]
    #[case::negative("-3.2", Some(FieldValue::Number(Decimal::new(-32, 1))))]
    #[case::text("WBS-0042", Some(FieldValue::text("WBS-0042")))]
    #[case::padded_text("  hello ", Some(FieldValue::text("hello")))]
    fn test_parse_cell(#[case] raw: &str, #[case] expected: Option<FieldValue>) {
        assert_eq!(parse_cell(raw), expected);
    }

    #[test]
    fn test_normalize_headers_trims() {
        let headers = normalize_headers([" PurchaseOrder ", "PostingDate", " Amount"]);
        assert_eq!(headers, vec!["PurchaseOrder", "PostingDate", "Amount"]);
    }

    #[test]
    fn test_record_from_cells_skips_blank_cells() {
        let headers = normalize_headers(["PurchaseOrder", "PostingDate", "Amount"]);
        let record = record_from_cells(&headers, ["4500000001", "", "10.50"], 3);

        assert_eq!(record.original_index(), 3);
        assert_eq!(record.text("PurchaseOrder"), Some("4500000001"));
        assert_eq!(record.get("PostingDate"), None);
        assert_eq!(
            record.get("Amount"),
            Some(&FieldValue::Number(Decimal::new(1050, 2)))
        );
    }

    #[test]
    fn test_record_from_cells_tolerates_short_rows() {
        let headers = normalize_headers(["A", "B", "C"]);
        let record = record_from_cells(&headers, ["x"], 0);

        assert_eq!(record.text("A"), Some("x"));
        assert_eq!(record.get("B"), None);
        assert_eq!(record.get("C"), None);
    }

    #[test]
    fn test_write_outcomes_csv_orders_by_index() {
        let summary = RunSummary {
            total_records: 3,
            success_count: 2,
            failure_count: 1,
            success_records: vec![
                SubmissionOutcome::success(2, "A".to_string(), serde_json::json!({})),
                SubmissionOutcome::success(0, "A".to_string(), serde_json::json!({})),
            ],
            error_records: vec![SubmissionOutcome::failure(
                1,
                "B".to_string(),
                ErrorInfo::new("HTTP_400", "rejected"),
            )],
            cancelled: false,
            duration_ms: 12,
        };

        let mut output = Vec::new();
        write_outcomes_csv(&summary, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "index,group,status,code,message,follow_up");
        assert_eq!(lines[1], "0,A,success,,,-");
        assert_eq!(lines[2], "1,B,failed,HTTP_400,rejected,-");
        assert_eq!(lines[3], "2,A,success,,,-");
    }

    #[test]
    fn test_write_outcomes_csv_includes_follow_up_status() {
        let mut outcome = SubmissionOutcome::success(0, "A".to_string(), serde_json::json!({}));
        outcome.follow_up = FollowUpStatus::Completed;
        let summary = RunSummary {
            total_records: 1,
            success_count: 1,
            failure_count: 0,
            success_records: vec![outcome],
            error_records: Vec::new(),
            cancelled: false,
            duration_ms: 1,
        };

        let mut output = Vec::new();
        write_outcomes_csv(&summary, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.lines().nth(1).unwrap().ends_with(",completed"));
    }
}
