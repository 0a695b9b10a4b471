//! Underwriting orchestration.
//!
//! Rule families append to one shared log in a fixed order: bank rules, then
//! GST rules (when GST months exist), then ITR rules (when ITR years exist),
//! then cross-verification rules (when a comparison was possible). The log
//! is built by functional accumulation and never mutated afterwards.

use serde_json::json;

use crate::bank_rules;
use crate::credibility;
use crate::cross;
use crate::error::UnderwritingError;
use crate::gst;
use crate::itr;
use crate::metrics::{bank_snapshot, BankSnapshot};
use crate::model::{
    BankTransaction, DocsInput, Metric, RuleOutcome, UnderwritingParams, UnderwritingResult,
};
use crate::policy::PolicyTable;
use crate::recommend;

/// Run the full underwriting evaluation.
///
/// The only failure mode is an empty transaction list (caller precondition);
/// every rule itself always yields an outcome. Absent GST/ITR documents
/// leave their result sections as `None`.
pub fn run_underwriting(
    transactions: &[BankTransaction],
    params: &UnderwritingParams,
    docs: &DocsInput,
    policy: &PolicyTable,
) -> Result<UnderwritingResult, UnderwritingError> {
    if transactions.is_empty() {
        return Err(UnderwritingError::EmptyTransactions);
    }

    let mut sorted: Vec<BankTransaction> = transactions.to_vec();
    sorted.sort_by(|a, b| a.date.cmp(&b.date));

    let snap = bank_snapshot(&sorted, policy);

    let gst_assessment = gst::assess(&docs.gst_months, policy);
    let itr_assessment = itr::assess(&docs.itr_years, policy);
    let cross_verification = cross::assess(
        &snap.monthly_credits,
        snap.avg_monthly_credits_minor,
        gst_assessment.as_ref(),
        itr_assessment.as_ref(),
        policy,
    );
    let credibility_score = credibility::compute(
        gst_assessment.as_ref(),
        itr_assessment.as_ref(),
        cross_verification.as_ref(),
        policy,
    );

    let rule_run_log: Vec<RuleOutcome> = bank_rules::rules(&snap, policy)
        .into_iter()
        .chain(
            gst_assessment
                .iter()
                .flat_map(|g| gst::rules(g, policy)),
        )
        .chain(
            itr_assessment
                .iter()
                .flat_map(|i| itr::rules(i, policy)),
        )
        .chain(
            cross_verification
                .iter()
                .flat_map(|c| cross::rules(c, policy)),
        )
        .collect();

    let score = (100 + rule_run_log.iter().map(|r| r.score_delta).sum::<i32>()).clamp(0, 100) as u32;

    let recommendation =
        recommend::recommendation(params, &snap, score, credibility_score.as_ref(), policy);
    let triggers = recommend::triggers(
        &snap,
        gst_assessment.as_ref(),
        cross_verification.as_ref(),
        itr_assessment.as_ref(),
        policy,
    );
    let verdict = recommend::verdict(score, &snap, &recommendation);
    let aggressive_summary = recommend::aggressive_summary(
        &verdict,
        &recommendation,
        &snap,
        cross_verification.as_ref(),
        credibility_score.as_ref(),
    );

    let metrics = build_metrics(
        &snap,
        gst_assessment.as_ref(),
        itr_assessment.as_ref(),
        cross_verification.as_ref(),
        credibility_score.as_ref(),
    );

    Ok(UnderwritingResult {
        period_start: snap.period_start,
        period_end: snap.period_end,
        statement_days: snap.statement_days,
        metrics,
        credit_heat_map: snap.credit_heat.clone(),
        debit_heat_map: snap.debit_heat.clone(),
        gst: gst_assessment,
        itr: itr_assessment,
        cross_verification,
        credibility: credibility_score,
        private_lender_competition: snap.lenders.clone(),
        cash_velocity: snap.velocity.clone(),
        triggers,
        recommendation,
        verdict,
        rule_run_log,
        aggressive_summary,
    })
}

fn build_metrics(
    snap: &BankSnapshot,
    gst: Option<&gst::GstAssessment>,
    itr: Option<&itr::ItrAssessment>,
    cross: Option<&cross::CrossVerification>,
    credibility: Option<&credibility::CredibilityScore>,
) -> Vec<Metric> {
    let mut metrics = vec![
        Metric::new("total_credits", snap.total_credits_minor as f64, "INR_MINOR"),
        Metric::new("total_debits", snap.total_debits_minor as f64, "INR_MINOR"),
        Metric::new("avg_monthly_credits", snap.avg_monthly_credits_minor, "INR_MINOR"),
        Metric::new("avg_monthly_debits", snap.avg_monthly_debits_minor, "INR_MINOR"),
        Metric::new("avg_weekly_credits", snap.avg_weekly_credits_minor, "INR_MINOR"),
        Metric::new("avg_usable_balance", snap.avg_usable_balance_minor, "INR_MINOR"),
        Metric::new("min_balance", snap.min_balance_minor as f64, "INR_MINOR"),
        Metric::new("low_balance_days", snap.low_balance_days as f64, "DAYS"),
        Metric::new("credit_volatility_score", snap.credit_cv, "")
            .with_meta(json!({ "bucket": snap.credit_volatility.to_string() })),
        Metric::new("penalty_charge_count", snap.penalty_charge_count as f64, "COUNT"),
        Metric::new("bounce_return_count", snap.bounce_return_count as f64, "COUNT"),
        Metric::new(
            "fixed_obligation_estimate_monthly",
            snap.fixed_obligation_monthly_minor as f64,
            "INR_MINOR",
        ),
    ];

    if let Some(gst) = gst {
        let tax_paid_total: i64 = gst.months.iter().map(|m| m.tax_paid_minor.max(0)).sum();
        metrics.extend([
            Metric::new(
                "gst_avg_monthly_turnover",
                gst.avg_monthly_turnover_minor as f64,
                "INR_MINOR",
            ),
            Metric::new("gst_volatility_score", gst.volatility_score, "").with_meta(json!({
                "bucket": gst.volatility_bucket.to_string(),
                "seasonality": gst.seasonality_bucket.to_string(),
            })),
            Metric::new("gst_filing_gap_count", gst.filing_gap_count as f64, "COUNT"),
            Metric::new("gst_late_filing_count", gst.late_filing_count as f64, "COUNT"),
            Metric::new(
                "gst_consecutive_drop_months_count",
                gst.consecutive_drop_months.len() as f64,
                "COUNT",
            ),
            Metric::new("gst_tax_paid_total", tax_paid_total as f64, "INR_MINOR"),
        ]);
    }

    if let Some(itr) = itr {
        metrics.extend([
            Metric::new("itr_latest_turnover", itr.latest_turnover_minor as f64, "INR_MINOR"),
            Metric::new("itr_latest_profit", itr.latest_profit_minor as f64, "INR_MINOR"),
            Metric::new("itr_latest_margin_pct", itr.latest_margin_pct, "PCT"),
            Metric::new("itr_latest_tax_paid", itr.latest_tax_paid_minor as f64, "INR_MINOR"),
        ]);
        if let Some(yoy) = itr.yoy_turnover_pct {
            metrics.push(Metric::new("itr_yoy_turnover_pct", yoy, "PCT"));
        }
        if let Some(yoy) = itr.yoy_profit_pct {
            metrics.push(Metric::new("itr_yoy_profit_pct", yoy, "PCT"));
        }
    }

    if let Some(cross) = cross {
        if let Some(v) = cross.bank_vs_gst_avg_diff_pct {
            metrics.push(Metric::new("bank_vs_gst_avg_diff_pct", v, "PCT"));
        }
        if let Some(v) = cross.bank_vs_itr_avg_diff_pct {
            metrics.push(Metric::new("bank_vs_itr_avg_diff_pct", v, "PCT"));
        }
        if let Some(v) = cross.itr_vs_gst_annual_diff_pct {
            metrics.push(Metric::new("itr_vs_gst_annual_diff_pct", v, "PCT"));
        }
        if let Some(v) = cross.itr_vs_gst_annual_estimated_minor {
            metrics.push(Metric::new(
                "gst_annual_estimated_from_months",
                v as f64,
                "INR_MINOR",
            ));
        }
        metrics.push(Metric::new(
            "gst_nil_months_with_bank_credits_count",
            cross.nil_return_months_with_bank_credits.len() as f64,
            "COUNT",
        ));
    }

    if let Some(credibility) = credibility {
        metrics.extend([
            Metric::new("credibility_score", credibility.score as f64, "SCORE")
                .with_meta(json!({ "band": credibility.band.to_string() })),
            Metric::new("credibility_gst_score", credibility.gst_score as f64, "SCORE"),
            Metric::new("credibility_itr_score", credibility.itr_score as f64, "SCORE"),
            Metric::new(
                "credibility_mismatch_penalty",
                credibility.mismatch_penalty as f64,
                "SCORE",
            ),
        ]);
    }

    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[test]
    fn empty_input_is_a_precondition_error() {
        let err = run_underwriting(
            &[],
            &UnderwritingParams::default(),
            &DocsInput::default(),
            &PolicyTable::default(),
        )
        .unwrap_err();
        assert!(matches!(err, UnderwritingError::EmptyTransactions));
    }

    #[test]
    fn input_order_does_not_matter() {
        let mut txns = vec![
            txn("2024-04-10", "NEFT-BETA TRADERS", 0, 3_123_400, Some(8_000_000)),
            txn("2024-01-05", "NEFT-ALPHA WORKS", 0, 4_123_400, Some(5_000_000)),
            txn("2024-03-02", "VENDOR PAYOUT", 1_077_700, 0, Some(4_876_600)),
        ];
        let a = run_underwriting(
            &txns,
            &UnderwritingParams::default(),
            &DocsInput::default(),
            &PolicyTable::default(),
        )
        .unwrap();
        txns.reverse();
        let b = run_underwriting(
            &txns,
            &UnderwritingParams::default(),
            &DocsInput::default(),
            &PolicyTable::default(),
        )
        .unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
        assert_eq!(a.period_start, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(a.period_end, NaiveDate::from_ymd_opt(2024, 4, 10).unwrap());
    }

    #[test]
    fn rule_family_order_is_fixed() {
        let txns: Vec<BankTransaction> = (1..=6)
            .flat_map(|m| {
                vec![
                    txn(&format!("2024-{m:02}-03"), "NEFT-ALPHA WORKS", 0, 4_123_400, Some(9_000_000)),
                    txn(&format!("2024-{m:02}-17"), "NEFT-BETA TRADERS", 0, 3_123_400, Some(12_000_000)),
                ]
            })
            .collect();
        let docs = DocsInput {
            gst_months: (1..=6)
                .map(|m| crate::model::GstMonth {
                    month: format!("2024-{m:02}"),
                    turnover_minor: 7_000_000,
                    tax_paid_minor: 126_000,
                    days_late: None,
                })
                .collect(),
            itr_years: vec![crate::model::ItrYear {
                year: "FY 2023-24".into(),
                turnover_minor: 84_000_000,
                profit_minor: 8_000_000,
                tax_paid_minor: 1_400_000,
            }],
        };
        let result = run_underwriting(
            &txns,
            &UnderwritingParams::default(),
            &docs,
            &PolicyTable::default(),
        )
        .unwrap();

        let prefixes: Vec<&str> = result
            .rule_run_log
            .iter()
            .map(|r| r.id.split(['-', '0']).next().unwrap())
            .collect();
        let first_gst = prefixes.iter().position(|p| *p == "GST").unwrap();
        let first_itr = prefixes.iter().position(|p| *p == "ITR").unwrap();
        let first_xv = prefixes.iter().position(|p| *p == "XV").unwrap();
        let last_bank = prefixes.iter().rposition(|p| *p == "R").unwrap();
        assert!(last_bank < first_gst);
        assert!(first_gst < first_itr);
        assert!(first_itr < first_xv);
    }

    #[test]
    fn no_docs_degrades_gracefully() {
        let txns = vec![
            txn("2024-01-05", "NEFT-ALPHA WORKS", 0, 4_123_400, Some(5_000_000)),
            txn("2024-04-10", "NEFT-BETA TRADERS", 0, 3_123_400, Some(8_123_400)),
        ];
        let result = run_underwriting(
            &txns,
            &UnderwritingParams::default(),
            &DocsInput::default(),
            &PolicyTable::default(),
        )
        .unwrap();
        assert!(result.gst.is_none());
        assert!(result.itr.is_none());
        assert!(result.cross_verification.is_none());
        assert!(result.credibility.is_none());
        assert!(result.recommendation.recommended_exposure_minor > 0);
        assert!(result.rule_run_log.iter().all(|r| r.id.starts_with('R')));
        assert!(result
            .metrics
            .iter()
            .all(|m| !m.key.starts_with("gst_") && !m.key.starts_with("itr_")));
    }
}
