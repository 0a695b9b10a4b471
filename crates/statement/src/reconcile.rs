//! Reconciliation: full-coverage and balance-continuity checks.
//!
//! Coverage guarantees no line of the source document is silently dropped;
//! continuity verifies that successive balances are arithmetically consistent
//! with debits/credits. Violations are reported, never corrected.

use std::collections::{BTreeSet, HashMap};

use crate::config::AutopilotConfig;
use crate::model::{
    ContinuityFailure, LineKind, RawLine, ReconStatus, Reconciliation, Transaction,
};

/// Run both checks over the adjusted line set and assembled transactions.
pub fn reconcile(
    adjusted_lines: &[RawLine],
    transactions: &[Transaction],
    config: &AutopilotConfig,
) -> Reconciliation {
    let consumed: BTreeSet<&str> = transactions
        .iter()
        .flat_map(|t| t.source_line_ids.iter().map(String::as_str))
        .collect();

    let txn_lines: Vec<&RawLine> = adjusted_lines
        .iter()
        .filter(|l| l.line_kind == LineKind::Transaction)
        .collect();

    let unmapped_line_ids: Vec<String> = txn_lines
        .iter()
        .filter(|l| !consumed.contains(l.id.as_str()))
        .map(|l| l.id.clone())
        .collect();

    let continuity_failures = check_continuity(adjusted_lines, transactions, config);

    let total_transaction_lines = txn_lines.len();
    let parse_confidence = if total_transaction_lines == 0 {
        0.0
    } else {
        (total_transaction_lines - unmapped_line_ids.len()) as f64
            / total_transaction_lines as f64
    };

    let status = if !unmapped_line_ids.is_empty() {
        ReconStatus::ParseFailed
    } else if !continuity_failures.is_empty() {
        ReconStatus::NeedsReview
    } else {
        ReconStatus::Ok
    };

    Reconciliation {
        total_raw_lines: adjusted_lines.len(),
        total_transaction_lines,
        assembled_count: transactions.len(),
        unmapped_line_ids,
        continuity_failures,
        parse_confidence,
        status,
    }
}

/// Walk transactions in `(date, first source line position)` order and
/// verify `balance[i] == balance[i-1] − debit[i] + credit[i]` within the
/// configured tolerance.
fn check_continuity(
    adjusted_lines: &[RawLine],
    transactions: &[Transaction],
    config: &AutopilotConfig,
) -> Vec<ContinuityFailure> {
    let line_pos: HashMap<&str, usize> = adjusted_lines
        .iter()
        .enumerate()
        .map(|(i, l)| (l.id.as_str(), i))
        .collect();

    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by_key(|t| {
        let pos = t
            .source_line_ids
            .first()
            .and_then(|id| line_pos.get(id.as_str()).copied())
            .unwrap_or(usize::MAX);
        (t.date, pos)
    });

    let mut failures = Vec::new();
    let mut prev: Option<(&str, i64)> = None;

    for txn in ordered {
        if let Some(balance) = txn.balance_minor {
            if let Some((prev_id, prev_balance)) = prev {
                let expected = prev_balance - txn.debit() + txn.credit();
                let diff = (balance - expected).abs();
                if diff > config.balance_tolerance_minor {
                    failures.push(ContinuityFailure {
                        after_transaction_id: prev_id.to_string(),
                        expected_minor: expected,
                        actual_minor: balance,
                        diff_minor: diff,
                    });
                }
            }
            prev = Some((txn.id.as_str(), balance));
        }
    }

    failures
}
