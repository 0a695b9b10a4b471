//! Line classification: transaction rows vs. noise.
//!
//! Pure and total — classification never fails. Any parse ambiguity degrades
//! to [`LineKind::NonTransaction`] so the row surfaces to a reviewer through
//! the reconciliation checker instead of being guessed at.

use crate::model::{LineKind, RawLine};
use crate::money;

/// Parsed field candidates for one line, shared by the classifier and the
/// assembler so both see identical values.
#[derive(Debug, Clone, Default)]
pub struct LineFields {
    pub date_like: bool,
    pub date: Option<chrono::NaiveDate>,
    pub debit_minor: Option<i64>,
    pub credit_minor: Option<i64>,
    pub balance_minor: Option<i64>,
    pub narration: String,
}

/// Extract field candidates from a raw line.
///
/// A reviewer correction wins outright. Otherwise column candidates supplied
/// by the extraction collaborator win over the free-row-text fallback.
/// Negative amounts are rejected — a negative debit or credit column is
/// extraction noise, not a transaction.
pub fn line_fields(line: &RawLine) -> LineFields {
    match &line.correction {
        Some(crate::model::LineCorrection::Ignore) => return LineFields::default(),
        Some(crate::model::LineCorrection::Set {
            date,
            narration,
            debit_minor,
            credit_minor,
            balance_minor,
        }) => {
            let extracted = extracted_fields(line);
            return LineFields {
                date_like: date.is_some() || extracted.date_like,
                date: date.or(extracted.date),
                debit_minor: debit_minor.or(extracted.debit_minor).filter(|v| *v >= 0),
                credit_minor: credit_minor.or(extracted.credit_minor).filter(|v| *v >= 0),
                balance_minor: balance_minor.or(extracted.balance_minor),
                narration: narration.clone().unwrap_or(extracted.narration),
            };
        }
        None => {}
    }
    extracted_fields(line)
}

fn extracted_fields(line: &RawLine) -> LineFields {
    let date_source = line
        .raw_date_text
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(&line.raw_row_text);

    let (row_dr, row_cr, row_bal) = money::extract_amounts_from_row(&line.raw_row_text);

    let candidate = |text: &Option<String>, fallback: Option<i64>| -> Option<i64> {
        text.as_deref()
            .and_then(money::parse_money_minor)
            .or(fallback)
    };

    let debit_minor = candidate(&line.raw_dr_text, row_dr).filter(|v| *v >= 0);
    let credit_minor = candidate(&line.raw_cr_text, row_cr).filter(|v| *v >= 0);
    let balance_minor = candidate(&line.raw_balance_text, row_bal);

    let narration = line
        .raw_narration_text
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| money::strip_amounts(&line.raw_row_text));
    let narration = money::strip_leading_date(&narration);

    LineFields {
        date_like: money::date_like(date_source),
        date: money::normalize_date(date_source),
        debit_minor,
        credit_minor,
        balance_minor,
        narration,
    }
}

/// Classify one raw line.
///
/// `Transaction` iff a date-like token is present AND at least one of
/// debit/credit parses as a non-negative amount. Headers, footers,
/// disclaimers and page breaks all fall out as `NonTransaction`.
pub fn classify_line(line: &RawLine) -> LineKind {
    let fields = line_fields(line);
    classify_fields(&fields)
}

pub(crate) fn classify_fields(fields: &LineFields) -> LineKind {
    let has_amount = fields.debit_minor.is_some() || fields.credit_minor.is_some();
    if fields.date_like && has_amount {
        LineKind::Transaction
    } else {
        LineKind::NonTransaction
    }
}
