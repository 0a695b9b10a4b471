//! Manual correction flow.
//!
//! Corrections never mutate extracted lines in place: `apply_edits` returns a
//! fresh line set with each correction attached, and the caller re-runs the
//! whole pipeline on it. Full replayability — the corrected input alone
//! reproduces the corrected output.

use std::collections::BTreeMap;

use crate::model::RawLine;

/// Re-export under the name callers use for the edit-map value.
pub use crate::model::LineCorrection as LineEdit;

/// Apply an edit map (`line id → correction`) to a line set.
///
/// Unknown ids are ignored; lines without an edit pass through untouched.
/// Editing a line that already carries a correction replaces it — the latest
/// reviewer decision wins.
pub fn apply_edits(raw_lines: &[RawLine], edits: &BTreeMap<String, LineEdit>) -> Vec<RawLine> {
    raw_lines
        .iter()
        .map(|line| match edits.get(&line.id) {
            Some(correction) => RawLine {
                correction: Some(correction.clone()),
                ..line.clone()
            },
            None => line.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_line;
    use crate::model::{LineCorrection, LineKind};
    use chrono::NaiveDate;

    fn line(id: &str, text: &str) -> RawLine {
        RawLine {
            id: id.into(),
            page_no: 1,
            row_no: 1,
            raw_row_text: text.into(),
            raw_date_text: None,
            raw_narration_text: None,
            raw_dr_text: None,
            raw_cr_text: None,
            raw_balance_text: None,
            line_kind: LineKind::NonTransaction,
            extraction_method: None,
            source_document_index: 0,
            correction: None,
        }
    }

    #[test]
    fn edits_do_not_touch_originals() {
        let lines = vec![line("l1", "45/13/24 MYSTERY 2,000.00 9,000.00")];
        let mut edits = BTreeMap::new();
        edits.insert("l1".to_string(), LineCorrection::Ignore);

        let edited = apply_edits(&lines, &edits);
        assert!(lines[0].correction.is_none());
        assert_eq!(edited[0].correction, Some(LineCorrection::Ignore));
        assert_eq!(edited[0].id, "l1");
    }

    #[test]
    fn ignore_reclassifies_as_noise() {
        let base = line("l1", "01/04/24 NEFT ACME 1,000.00 0.00 9,000.00");
        assert_eq!(classify_line(&base), LineKind::Transaction);

        let mut edits = BTreeMap::new();
        edits.insert("l1".to_string(), LineCorrection::Ignore);
        let edited = apply_edits(&[base], &edits);
        assert_eq!(classify_line(&edited[0]), LineKind::NonTransaction);
    }

    #[test]
    fn explicit_date_repairs_a_line() {
        let base = line("l1", "45/13/24 MYSTERY CREDIT 2,000.00 9,000.00");
        let mut edits = BTreeMap::new();
        edits.insert(
            "l1".to_string(),
            LineCorrection::Set {
                date: NaiveDate::from_ymd_opt(2024, 4, 13),
                narration: None,
                debit_minor: None,
                credit_minor: None,
                balance_minor: None,
            },
        );
        let edited = apply_edits(&[base], &edits);
        let fields = crate::classify::line_fields(&edited[0]);
        assert_eq!(fields.date, NaiveDate::from_ymd_opt(2024, 4, 13));
        // extracted amounts still flow through
        assert_eq!(fields.debit_minor, Some(200_000));
    }

    #[test]
    fn unknown_id_is_ignored() {
        let lines = vec![line("l1", "header text")];
        let mut edits = BTreeMap::new();
        edits.insert("nope".to_string(), LineCorrection::Ignore);
        let edited = apply_edits(&lines, &edits);
        assert!(edited[0].correction.is_none());
    }
}
