//! Transaction assembly: fold classified lines into logical transactions.
//!
//! Some source formats wrap one transaction across two physical rows; the
//! continuation row has blank date/amounts but carries narration. Those rows
//! are folded into the preceding transaction rather than starting a new one.

use sha2::{Digest, Sha256};

use crate::classify::{classify_fields, line_fields, LineFields};
use crate::config::AutopilotConfig;
use crate::engine::StatementMeta;
use crate::model::{LineKind, RawLine, Transaction, TxnCategory, TxnDirection, TxnFlag};

/// Assembly output: the adjusted line set (continuation rows promoted to
/// transaction kind) plus the assembled transactions.
#[derive(Debug)]
pub struct AssembleOutput {
    pub adjusted_lines: Vec<RawLine>,
    pub transactions: Vec<Transaction>,
}

struct PendingTxn {
    source_line_ids: Vec<String>,
    last_line_index: usize,
    date: chrono::NaiveDate,
    narration: String,
    debit_minor: i64,
    credit_minor: i64,
    balance_minor: Option<i64>,
    page_no: u32,
    row_no: u32,
}

/// Assemble transactions from raw lines, classifying as it walks.
///
/// An anchor row needs a real calendar date and an unambiguous amount. A
/// transaction-kind row whose date-like token is not a valid date, or that
/// carries both a debit and a credit, anchors nothing — it stays unconsumed
/// and the reconciliation checker reports it for human correction.
pub fn assemble(
    raw_lines: &[RawLine],
    meta: &StatementMeta,
    config: &AutopilotConfig,
) -> AssembleOutput {
    let mut adjusted: Vec<RawLine> = raw_lines.to_vec();
    let mut transactions: Vec<Transaction> = Vec::new();
    let mut current: Option<PendingTxn> = None;

    for (idx, line) in raw_lines.iter().enumerate() {
        let fields = line_fields(line);
        let kind = classify_fields(&fields);
        adjusted[idx].line_kind = kind;

        match kind {
            LineKind::Transaction => {
                let ambiguous = fields.debit_minor.unwrap_or(0) > 0
                    && fields.credit_minor.unwrap_or(0) > 0;

                match fields.date {
                    Some(date) if !ambiguous => {
                        if let Some(pending) = current.take() {
                            transactions.push(finish(pending, meta, config, transactions.len()));
                        }
                        current = Some(PendingTxn {
                            source_line_ids: vec![line.id.clone()],
                            last_line_index: idx,
                            date,
                            narration: fields.narration.clone(),
                            debit_minor: fields.debit_minor.unwrap_or(0),
                            credit_minor: fields.credit_minor.unwrap_or(0),
                            balance_minor: fields.balance_minor,
                            page_no: line.page_no,
                            row_no: line.row_no,
                        });
                    }
                    _ => {
                        // Unanchorable transaction row: close the open
                        // transaction and leave this line for reconciliation.
                        if let Some(pending) = current.take() {
                            transactions.push(finish(pending, meta, config, transactions.len()));
                        }
                    }
                }
            }
            LineKind::NonTransaction => {
                if let Some(pending) = current.as_mut() {
                    if is_continuation(&fields, pending.last_line_index, idx) {
                        adjusted[idx].line_kind = LineKind::Transaction;
                        pending.source_line_ids.push(line.id.clone());
                        pending.last_line_index = idx;
                        if !fields.narration.is_empty() {
                            if pending.narration.is_empty() {
                                pending.narration = fields.narration.clone();
                            } else {
                                pending.narration =
                                    format!("{} {}", pending.narration, fields.narration);
                            }
                        }
                    }
                }
            }
        }
    }

    if let Some(pending) = current.take() {
        transactions.push(finish(pending, meta, config, transactions.len()));
    }

    apply_spike_drain_flags(&mut transactions, config);

    AssembleOutput {
        adjusted_lines: adjusted,
        transactions,
    }
}

/// Continuation rows must directly follow the last consumed row and carry
/// narration with no date and no amounts.
fn is_continuation(fields: &LineFields, last_consumed: usize, idx: usize) -> bool {
    idx == last_consumed + 1
        && !fields.date_like
        && fields.debit_minor.is_none()
        && fields.credit_minor.is_none()
        && !fields.narration.is_empty()
}

fn finish(
    pending: PendingTxn,
    meta: &StatementMeta,
    config: &AutopilotConfig,
    seq: usize,
) -> Transaction {
    let narration = if pending.narration.is_empty() {
        "-".to_string()
    } else {
        pending.narration
    };

    let (direction, debit_minor, credit_minor) = if pending.credit_minor > 0 {
        (TxnDirection::Credit, None, Some(pending.credit_minor))
    } else if pending.debit_minor > 0 {
        (TxnDirection::Debit, Some(pending.debit_minor), None)
    } else {
        (TxnDirection::BalanceCarry, None, None)
    };

    let counterparty = normalize_counterparty(&narration);
    let category = categorize(&narration);
    let flags = build_flags(&narration, debit_minor, credit_minor, config);

    let uid = transaction_uid(
        meta,
        pending.date,
        debit_minor,
        credit_minor,
        pending.balance_minor,
        &narration,
        pending.page_no,
        pending.row_no,
    );

    Transaction {
        id: format!("txn_{seq}"),
        source_line_ids: pending.source_line_ids,
        date: pending.date,
        month: pending.date.format("%Y-%m").to_string(),
        narration,
        debit_minor,
        credit_minor,
        balance_minor: pending.balance_minor,
        counterparty,
        direction,
        category,
        flags,
        uid,
    }
}

/// Uppercase, strip punctuation and reference-number noise, keep the first
/// two meaningful tokens.
pub fn normalize_counterparty(narration: &str) -> String {
    let cleaned: String = narration
        .to_uppercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == ' ' {
                c
            } else {
                ' '
            }
        })
        .collect();

    let tokens: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|t| t.len() >= 3)
        .take(2)
        .collect();

    if tokens.is_empty() {
        "UNKNOWN".to_string()
    } else {
        tokens.join(" ")
    }
}

/// Keyword taxonomy. First hit wins; checks run from most to least specific.
pub fn categorize(narration: &str) -> TxnCategory {
    let n = narration.to_uppercase();
    let has = |keys: &[&str]| keys.iter().any(|k| n.contains(k));

    if has(&["RTN", "RETURN", "CHQ RET", "NOT REP", "BOUNCE"]) {
        TxnCategory::BounceReturn
    } else if has(&["GST", "CBDT", "ITD", "TDS", "TAX"]) {
        TxnCategory::Tax
    } else if has(&["SALARY", "WAGES"]) {
        TxnCategory::Salary
    } else if has(&["HAND LOAN", "PVT FIN", "WEEKLY COLLECT"]) {
        TxnCategory::PrivateFinance
    } else if has(&["EMI", "LOAN"]) {
        TxnCategory::Emi
    } else if has(&["INTEREST", "INT PAID", "INT CR"]) {
        TxnCategory::Interest
    } else if has(&["ATM", "CASH", "SELF WDL", "SELF "]) {
        TxnCategory::Cash
    } else if has(&["UPI"]) {
        TxnCategory::Upi
    } else {
        TxnCategory::Unknown
    }
}

fn build_flags(
    narration: &str,
    debit_minor: Option<i64>,
    credit_minor: Option<i64>,
    config: &AutopilotConfig,
) -> Vec<TxnFlag> {
    let n = narration.to_uppercase();
    let amount = debit_minor.unwrap_or(0).max(credit_minor.unwrap_or(0));
    let mut flags = Vec::new();

    if n.contains("PENALTY") || n.contains("CHARGE") {
        flags.push(TxnFlag::Penalty);
    }
    if n.contains("RETURN") || n.contains("BOUNCE") {
        flags.push(TxnFlag::Bounce);
    }
    if amount > config.high_value_minor {
        flags.push(TxnFlag::HighValue);
    }
    // Round-thousand check in rupees: ₹1,000 = 100_000 minor units.
    if amount >= config.odd_figure_minor && amount % 100_000 != 0 {
        flags.push(TxnFlag::OddFigure);
    }
    flags
}

/// Large credit followed by a debit draining most of it — flag both sides.
fn apply_spike_drain_flags(transactions: &mut [Transaction], config: &AutopilotConfig) {
    for i in 0..transactions.len().saturating_sub(1) {
        let credit = transactions[i].credit();
        let next_debit = transactions[i + 1].debit();
        if credit >= config.spike_drain_credit_minor
            && (next_debit as f64) >= (credit as f64) * config.spike_drain_ratio
        {
            for t in &mut transactions[i..=i + 1] {
                if !t.flags.contains(&TxnFlag::SpikeDrain) {
                    t.flags.push(TxnFlag::SpikeDrain);
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn transaction_uid(
    meta: &StatementMeta,
    date: chrono::NaiveDate,
    debit_minor: Option<i64>,
    credit_minor: Option<i64>,
    balance_minor: Option<i64>,
    narration: &str,
    page_no: u32,
    row_no: u32,
) -> String {
    let base = format!(
        "{}|{}|{}|{}|{}|{}|{}|{}|{}",
        meta.bank_name,
        meta.account_type,
        date,
        debit_minor.unwrap_or(0),
        credit_minor.unwrap_or(0),
        balance_minor.map(|b| b.to_string()).unwrap_or_default(),
        narration,
        page_no,
        row_no,
    );
    let digest = Sha256::digest(base.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, row_no: u32, text: &str) -> RawLine {
        RawLine {
            id: id.into(),
            page_no: 1,
            row_no,
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

    fn meta() -> StatementMeta {
        StatementMeta {
            bank_name: "HDFC".into(),
            account_type: "CURRENT".into(),
        }
    }

    #[test]
    fn anchors_and_derives() {
        let lines = vec![
            line("l1", 1, "01/04/24 NEFT SALARY ACME LTD 0.00 50,000.00 1,50,000.00"),
            line("l2", 2, "03/04/24 ATM CASH WDL 10,000.00 0.00 1,40,000.00"),
        ];
        let out = assemble(&lines, &meta(), &AutopilotConfig::default());
        assert_eq!(out.transactions.len(), 2);

        let t0 = &out.transactions[0];
        assert_eq!(t0.month, "2024-04");
        assert_eq!(t0.direction, TxnDirection::Credit);
        assert_eq!(t0.credit_minor, Some(5_000_000));
        assert_eq!(t0.debit_minor, None);
        assert_eq!(t0.category, TxnCategory::Salary);
        assert_eq!(t0.balance_minor, Some(15_000_000));

        let t1 = &out.transactions[1];
        assert_eq!(t1.direction, TxnDirection::Debit);
        assert_eq!(t1.category, TxnCategory::Cash);
    }

    #[test]
    fn continuation_row_folds() {
        let lines = vec![
            line("l1", 1, "01/04/24 NEFT ACME 0.00 50,000.00 1,50,000.00"),
            line("l2", 2, "INVOICE 2231 PART PAYMENT"),
            line("l3", 3, "02/04/24 UPI GROCER 500.00 0.00 1,49,500.00"),
        ];
        let out = assemble(&lines, &meta(), &AutopilotConfig::default());
        assert_eq!(out.transactions.len(), 2);
        assert_eq!(out.transactions[0].source_line_ids, vec!["l1", "l2"]);
        assert!(out.transactions[0].narration.contains("PART PAYMENT"));
        assert_eq!(out.adjusted_lines[1].line_kind, LineKind::Transaction);
    }

    #[test]
    fn continuation_requires_adjacency() {
        let lines = vec![
            line("l1", 1, "01/04/24 NEFT ACME 0.00 50,000.00 1,50,000.00"),
            line("l2", 2, "02/04/24 UPI GROCER 500.00 0.00 1,49,500.00"),
            line("l3", 3, "TRAILING REMARK TEXT"),
        ];
        let out = assemble(&lines, &meta(), &AutopilotConfig::default());
        // l3 follows l2's transaction directly, so it folds into l2.
        assert_eq!(out.transactions[1].source_line_ids, vec!["l2", "l3"]);

        let lines = vec![
            line("l1", 1, "01/04/24 NEFT ACME 0.00 50,000.00 1,50,000.00"),
            line("l2", 2, "45/13/24 BROKEN DATE ROW 100.00 200.00"),
            line("l3", 3, "ORPHAN REMARK"),
        ];
        let out = assemble(&lines, &meta(), &AutopilotConfig::default());
        // The broken row closed l1's transaction; l3 is not adjacent to any
        // consumed row and stays noise.
        assert_eq!(out.transactions.len(), 1);
        assert_eq!(out.transactions[0].source_line_ids, vec!["l1"]);
        assert_eq!(out.adjusted_lines[2].line_kind, LineKind::NonTransaction);
    }

    #[test]
    fn invalid_date_row_left_unconsumed() {
        let lines = vec![line("l1", 1, "45/13/24 MYSTERY 2,000.00 9,000.00")];
        let out = assemble(&lines, &meta(), &AutopilotConfig::default());
        assert!(out.transactions.is_empty());
        assert_eq!(out.adjusted_lines[0].line_kind, LineKind::Transaction);
    }

    #[test]
    fn counterparty_normalization() {
        assert_eq!(
            normalize_counterparty("NEFT/ACME-TRADERS/ref:0098812"),
            "NEFT ACME"
        );
        assert_eq!(normalize_counterparty("a b c"), "UNKNOWN");
    }

    #[test]
    fn category_keywords() {
        assert_eq!(categorize("CHQ RET INSUFF FUNDS"), TxnCategory::BounceReturn);
        assert_eq!(categorize("GST PMT CBDT"), TxnCategory::Tax);
        assert_eq!(categorize("EMI 04/12 HOUSING LOAN"), TxnCategory::Emi);
        assert_eq!(categorize("UPI/GROCER/9981"), TxnCategory::Upi);
        assert_eq!(categorize("NEFT ACME TRADERS"), TxnCategory::Unknown);
    }

    #[test]
    fn high_value_and_odd_figure_flags() {
        let lines = vec![line(
            "l1",
            1,
            "01/04/24 RTGS BIGCO 0.00 10,00,001.00 99,00,000.00",
        )];
        let out = assemble(&lines, &meta(), &AutopilotConfig::default());
        let flags = &out.transactions[0].flags;
        assert!(flags.contains(&TxnFlag::HighValue));
        assert!(flags.contains(&TxnFlag::OddFigure));
    }

    #[test]
    fn spike_drain_pairs() {
        let lines = vec![
            line("l1", 1, "01/04/24 RTGS FUNDER 0.00 6,00,000.00 6,50,000.00"),
            line("l2", 2, "01/04/24 RTGS OUTBOUND 5,00,000.00 0.00 1,50,000.00"),
        ];
        let out = assemble(&lines, &meta(), &AutopilotConfig::default());
        assert!(out.transactions[0].flags.contains(&TxnFlag::SpikeDrain));
        assert!(out.transactions[1].flags.contains(&TxnFlag::SpikeDrain));
    }

    #[test]
    fn uid_stable_across_runs() {
        let lines = vec![line("l1", 1, "01/04/24 NEFT ACME 0.00 50,000.00 1,50,000.00")];
        let a = assemble(&lines, &meta(), &AutopilotConfig::default());
        let b = assemble(&lines, &meta(), &AutopilotConfig::default());
        assert_eq!(a.transactions[0].uid, b.transactions[0].uid);
        assert_eq!(a.transactions[0].uid.len(), 16);
    }
}
