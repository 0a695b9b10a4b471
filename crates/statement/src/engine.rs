//! Autopilot orchestration: classify → assemble → reconcile → aggregate in
//! one deterministic pass.

use serde::{Deserialize, Serialize};

use crate::aggregate::{category_index, heat_table, monthly_aggregates};
use crate::assemble::assemble;
use crate::config::AutopilotConfig;
use crate::model::{HeatSide, RawLine, StatementAutopilotResult};
use crate::reconcile::reconcile;

/// Statement-level context, used only for transaction uid derivation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementMeta {
    #[serde(default)]
    pub bank_name: String,
    #[serde(default)]
    pub account_type: String,
}

/// Run the full statement autopilot pipeline.
///
/// Referentially transparent: identical lines (including any corrections
/// folded in via [`crate::edits::apply_edits`]) always produce an identical
/// result. Malformed rows are routed to the reconciliation surface — this
/// function has no failure mode. Failure is communicated only through
/// `reconciliation.status`.
pub fn run(
    raw_lines: &[RawLine],
    meta: &StatementMeta,
    config: &AutopilotConfig,
) -> StatementAutopilotResult {
    let assembled = assemble(raw_lines, meta, config);
    let reconciliation = reconcile(&assembled.adjusted_lines, &assembled.transactions, config);

    let monthly = monthly_aggregates(&assembled.transactions);
    let credit_heat = heat_table(&assembled.transactions, HeatSide::Credit);
    let debit_heat = heat_table(&assembled.transactions, HeatSide::Debit);
    let categories = category_index(&assembled.transactions);

    StatementAutopilotResult {
        reconciliation,
        raw_lines: assembled.adjusted_lines,
        transactions: assembled.transactions,
        monthly_aggregates: monthly,
        credit_heat,
        debit_heat,
        categories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edits::apply_edits;
    use crate::model::{LineCorrection, LineKind, ReconStatus};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

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

    /// Ten transaction rows with a continuous running balance plus two noise
    /// rows reconcile cleanly.
    #[test]
    fn clean_twelve_line_statement() {
        let mut lines = vec![line("hdr", 1, "Date Narration Debit Credit Balance")];
        let mut balance = 10_000_00i64; // ₹10,000.00 in minor units
        for day in 1..=10 {
            let credit = 1_000_00i64;
            balance += credit;
            lines.push(line(
                &format!("l{day}"),
                day + 1,
                &format!(
                    "{:02}/04/24 NEFT INFLOW SRC 0.00 1,000.00 {}",
                    day,
                    format_minor(balance),
                ),
            ));
        }
        lines.push(line("ftr", 12, "End of statement — page 1 of 1"));

        let result = run(&lines, &meta(), &AutopilotConfig::default());
        let recon = &result.reconciliation;
        assert_eq!(recon.total_raw_lines, 12);
        assert_eq!(recon.total_transaction_lines, 10);
        assert!(recon.unmapped_line_ids.is_empty());
        assert!(recon.continuity_failures.is_empty());
        assert_eq!(recon.status, ReconStatus::Ok);
        assert_eq!(result.transactions.len(), 10);
        assert_eq!(result.monthly_aggregates.len(), 1);
        assert_eq!(result.monthly_aggregates[0].credit_total_minor, 10 * 1_000_00);
    }

    fn format_minor(minor: i64) -> String {
        // minor units → "12,345.67" style text for synthetic rows
        let rupees = minor / 100;
        let paise = minor % 100;
        let mut digits = rupees.to_string();
        let mut parts = Vec::new();
        while digits.len() > 3 {
            parts.push(digits.split_off(digits.len() - 3));
        }
        parts.push(digits);
        parts.reverse();
        format!("{}.{:02}", parts.join(","), paise)
    }

    #[test]
    fn identical_input_identical_output() {
        let lines = vec![
            line("l1", 1, "01/04/24 NEFT ACME 0.00 50,000.00 1,50,000.00"),
            line("l2", 2, "02/04/24 UPI GROCER 500.00 0.00 1,49,500.00"),
            line("l3", 3, "random trailing disclaimer with no numbers at all"),
        ];
        let a = run(&lines, &meta(), &AutopilotConfig::default());
        let b = run(&lines, &meta(), &AutopilotConfig::default());
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn bijection_between_lines_and_transactions() {
        let lines = vec![
            line("l1", 1, "01/04/24 NEFT ACME 0.00 50,000.00 1,50,000.00"),
            line("l2", 2, "TOWARDS INVOICE SETTLEMENT"),
            line("l3", 3, "02/04/24 UPI GROCER 500.00 0.00 1,49,500.00"),
        ];
        let result = run(&lines, &meta(), &AutopilotConfig::default());
        let mut seen = std::collections::BTreeSet::new();
        for t in &result.transactions {
            for id in &t.source_line_ids {
                assert!(seen.insert(id.clone()), "line {id} mapped twice");
            }
        }
    }

    /// An unparseable date surfaces as unmapped; a manual correction
    /// supplying the date repairs it on re-run.
    #[test]
    fn parse_failed_then_manual_fix() {
        let lines = vec![
            line("l1", 1, "01/04/24 NEFT ACME 0.00 50,000.00 1,50,000.00"),
            line("l2", 2, "99/99/24 WEIRD ROW 2,000.00 0.00 1,48,000.00"),
        ];
        let first = run(&lines, &meta(), &AutopilotConfig::default());
        assert_eq!(first.reconciliation.status, ReconStatus::ParseFailed);
        assert_eq!(first.reconciliation.unmapped_line_ids, vec!["l2"]);

        let mut edits = BTreeMap::new();
        edits.insert(
            "l2".to_string(),
            LineCorrection::Set {
                date: NaiveDate::from_ymd_opt(2024, 4, 2),
                narration: None,
                debit_minor: None,
                credit_minor: None,
                balance_minor: None,
            },
        );
        let corrected = apply_edits(&lines, &edits);
        let second = run(&corrected, &meta(), &AutopilotConfig::default());
        assert_eq!(second.reconciliation.status, ReconStatus::Ok);
        assert_eq!(second.transactions.len(), 2);
        assert!(second.transactions[1]
            .source_line_ids
            .contains(&"l2".to_string()));
    }

    /// Marking the broken line as noise is the other way out.
    #[test]
    fn parse_failed_then_ignore() {
        let lines = vec![
            line("l1", 1, "01/04/24 NEFT ACME 0.00 50,000.00 1,50,000.00"),
            line("l2", 2, "99/99/24 WEIRD ROW 2,000.00 0.00 1,48,000.00"),
        ];
        let mut edits = BTreeMap::new();
        edits.insert("l2".to_string(), LineCorrection::Ignore);
        let corrected = apply_edits(&lines, &edits);
        let result = run(&corrected, &meta(), &AutopilotConfig::default());
        assert_eq!(result.reconciliation.status, ReconStatus::Ok);
        assert_eq!(result.transactions.len(), 1);
        assert_eq!(result.reconciliation.total_transaction_lines, 1);
    }
}
