//! Bank cash-flow rule family: fixed threshold comparisons against the
//! policy table. No learned parameters, no exceptions — every rule yields
//! exactly one outcome.

use serde_json::json;

use crate::gst::VolatilityBucket;
use crate::metrics::BankSnapshot;
use crate::model::{RuleCategory, RuleOutcome, RuleSpec, Severity};
use crate::policy::PolicyTable;

pub fn rules(snap: &BankSnapshot, policy: &PolicyTable) -> Vec<RuleOutcome> {
    let bank = &policy.bank;

    vec![
        RuleSpec {
            id: "R001",
            name: "Statement period length",
            category: RuleCategory::Snapshot,
            severity: Severity::Medium,
            score_delta_fail: -10,
            thresholds: json!({ "min_days": bank.min_statement_days }),
            reason_fail: "Short statement window reduces confidence. Demand tighter structure / staged disbursal.",
            reason_pass: "Sufficient statement window for stability checks.",
        }
        .evaluate(
            snap.statement_days >= bank.min_statement_days,
            json!({ "statement_days": snap.statement_days }),
        ),
        RuleSpec {
            id: "R010",
            name: "Credit concentration (top 1 source)",
            category: RuleCategory::Concentration,
            severity: Severity::High,
            score_delta_fail: -18,
            thresholds: json!({ "top1_credit_pct_max": bank.top1_credit_pct_max }),
            reason_fail: "Borrower survival depends on one inflow. Control collections and cap exposure.",
            reason_pass: "No single inflow dominates the account.",
        }
        .evaluate(
            snap.top_credit_pct < bank.top1_credit_pct_max,
            json!({ "top1_credit_pct": snap.top_credit_pct }),
        ),
        RuleSpec {
            id: "R011",
            name: "Credit concentration (top 3 sources)",
            category: RuleCategory::Concentration,
            severity: Severity::Medium,
            score_delta_fail: -10,
            thresholds: json!({ "top3_credit_pct_max": bank.top3_credit_pct_max }),
            reason_fail: "Inflow is concentrated. Stress appears quickly if one or two sources pause.",
            reason_pass: "Inflow sources are reasonably distributed.",
        }
        .evaluate(
            snap.top3_credit_pct < bank.top3_credit_pct_max,
            json!({ "top3_credit_pct": snap.top3_credit_pct }),
        ),
        RuleSpec {
            id: "R020",
            name: "Liquidity stress (low-balance days)",
            category: RuleCategory::Liquidity,
            severity: Severity::High,
            score_delta_fail: -18,
            thresholds: json!({ "low_balance_days_ratio_max": bank.low_balance_ratio_max }),
            reason_fail: "Account frequently hits near-zero. Weekly collections and high upfront deduction required.",
            reason_pass: "Liquidity buffer exists most days.",
        }
        .evaluate(
            snap.low_balance_ratio < bank.low_balance_ratio_max,
            json!({
                "low_balance_days": snap.low_balance_days,
                "statement_days": snap.statement_days,
                "ratio": snap.low_balance_ratio,
            }),
        ),
        RuleSpec {
            id: "R030",
            name: "Banking discipline (penalties/bounces)",
            category: RuleCategory::Discipline,
            severity: Severity::Medium,
            score_delta_fail: -12,
            thresholds: json!({
                "penalty_max": bank.penalty_count_max,
                "bounce_max": bank.bounce_count_max,
            }),
            reason_fail: "Discipline issues indicate payment instability. Price up and shorten tenure.",
            reason_pass: "No major penalty/bounce signal.",
        }
        .evaluate(
            snap.penalty_charge_count <= bank.penalty_count_max
                && snap.bounce_return_count <= bank.bounce_count_max,
            json!({
                "penalty_charges": snap.penalty_charge_count,
                "bounce_returns": snap.bounce_return_count,
            }),
        ),
        RuleSpec {
            id: "R040",
            name: "Private lender competition",
            category: RuleCategory::Competition,
            severity: Severity::High,
            score_delta_fail: -22,
            thresholds: json!({
                "estimated_lenders_max": bank.estimated_lenders_max,
                "weekly_collections_allowed": false,
            }),
            reason_fail: "Borrower is likely already stacked with private lenders. Reduce exposure and enforce weekly control.",
            reason_pass: "No strong stacking/weekly-collection signal.",
        }
        .evaluate(
            snap.lenders.estimated_lenders <= bank.estimated_lenders_max
                && !snap.lenders.weekly_collections_detected,
            json!({
                "estimated_lenders": snap.lenders.estimated_lenders,
                "weekly_collections_detected": snap.lenders.weekly_collections_detected,
            }),
        ),
        RuleSpec {
            id: "R050",
            name: "Cash velocity (same-day spend)",
            category: RuleCategory::Velocity,
            severity: Severity::Medium,
            score_delta_fail: -10,
            thresholds: json!({ "same_day_spend_ratio_max": bank.same_day_spend_ratio_max }),
            reason_fail: "Pass-through behavior: inflows get drained fast. Collections must hit the inflow window.",
            reason_pass: "Cash retention is acceptable.",
        }
        .evaluate(
            snap.velocity.same_day_spend_ratio < bank.same_day_spend_ratio_max,
            json!({ "same_day_spend_ratio": snap.velocity.same_day_spend_ratio }),
        ),
        RuleSpec {
            id: "R060",
            name: "Fixed obligations pressure",
            category: RuleCategory::Obligations,
            severity: Severity::Medium,
            score_delta_fail: -12,
            thresholds: json!({ "fixed_obligation_pct_max": bank.fixed_obligation_ratio_max }),
            reason_fail: "High fixed outflows reduce survivability. Keep tenure short and collect weekly.",
            reason_pass: "Obligation load appears manageable.",
        }
        .evaluate(
            (snap.fixed_obligation_monthly_minor as f64)
                <= snap.avg_monthly_credits_minor * bank.fixed_obligation_ratio_max,
            json!({
                "fixed_obligation_estimate_monthly_minor": snap.fixed_obligation_monthly_minor,
                "avg_monthly_credits_minor": snap.avg_monthly_credits_minor,
                "ratio": if snap.avg_monthly_credits_minor > 0.0 {
                    snap.fixed_obligation_monthly_minor as f64 / snap.avg_monthly_credits_minor
                } else {
                    0.0
                },
            }),
        ),
    ]
}

/// Volatility surcharge input for pricing: reuse the snapshot's bucket.
pub fn is_high_volatility(snap: &BankSnapshot) -> bool {
    snap.credit_volatility == VolatilityBucket::High
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::bank_snapshot;
    use crate::model::BankTransaction;
    use chrono::NaiveDate;

    fn txn(date: &str, narration: &str, debit: i64, credit: i64, balance: Option<i64>) -> BankTransaction {
        BankTransaction {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            narration: narration.into(),
            debit_minor: debit,
            credit_minor: credit,
            balance_minor: balance,
        }
    }

    /// Six months of diversified inflows with healthy balances. Amounts are
    /// deliberately non-round so the informal-lender scorer stays quiet.
    fn healthy_transactions() -> Vec<BankTransaction> {
        let sources = [
            (2, "ALPHA CLIENT"),
            (7, "BETA CLIENT"),
            (13, "GAMMA CLIENT"),
            (19, "DELTA CLIENT"),
            (25, "EPSILON CLIENT"),
        ];
        let mut txns = Vec::new();
        for month in 1..=6 {
            for (day, source) in sources {
                txns.push(txn(
                    &format!("2024-{month:02}-{day:02}"),
                    &format!("NEFT-{source}"),
                    0,
                    4_123_400,
                    Some(20_000_000),
                ));
            }
            txns.push(txn(
                &format!("2024-{month:02}-27"),
                "VENDOR SUPPLIES",
                3_077_700,
                0,
                Some(18_000_000),
            ));
        }
        txns
    }

    #[test]
    fn healthy_account_passes_all() {
        let snap = bank_snapshot(&healthy_transactions(), &PolicyTable::default());
        let outcomes = rules(&snap, &PolicyTable::default());
        assert_eq!(outcomes.len(), 8);
        for outcome in &outcomes {
            assert!(outcome.passed, "{} unexpectedly failed", outcome.id);
            assert_eq!(outcome.score_delta, 0);
        }
    }

    #[test]
    fn short_statement_fails_period_rule() {
        let txns = vec![
            txn("2024-04-01", "NEFT-ALPHA", 0, 1_000_000, Some(5_000_000)),
            txn("2024-04-20", "NEFT-BETA", 0, 1_000_000, Some(6_000_000)),
        ];
        let snap = bank_snapshot(&txns, &PolicyTable::default());
        let outcomes = rules(&snap, &PolicyTable::default());
        let r001 = outcomes.iter().find(|r| r.id == "R001").unwrap();
        assert!(!r001.passed);
        assert_eq!(r001.score_delta, -10);
    }

    #[test]
    fn concentrated_inflow_fails_top1_rule() {
        let mut txns = healthy_transactions();
        txns.push(txn("2024-06-28", "NEFT-ALPHA CLIENT", 0, 300_000_000, Some(320_000_000)));
        let snap = bank_snapshot(&txns, &PolicyTable::default());
        let outcomes = rules(&snap, &PolicyTable::default());
        assert!(!outcomes.iter().find(|r| r.id == "R010").unwrap().passed);
    }

    #[test]
    fn every_rule_produces_exactly_one_outcome() {
        let txns = vec![txn("2024-04-01", "NEFT-ONLY", 0, 1_000_000, None)];
        let snap = bank_snapshot(&txns, &PolicyTable::default());
        let outcomes = rules(&snap, &PolicyTable::default());
        let ids: Vec<&str> = outcomes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            ids,
            ["R001", "R010", "R011", "R020", "R030", "R040", "R050", "R060"]
        );
    }
}
