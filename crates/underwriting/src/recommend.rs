//! Risk grading, pricing, recommendation structure, early-warning triggers
//! and the final verdict. All pure functions of the snapshot, the rule
//! score, and the credibility band, driven by the fixed risk-tier tables in
//! the policy.

use serde_json::json;

use crate::bank_rules::is_high_volatility;
use crate::credibility::{CredibilityBand, CredibilityScore};
use crate::cross::CrossVerification;
use crate::format::{format_inr, pct1};
use crate::gst::GstAssessment;
use crate::itr::ItrAssessment;
use crate::metrics::BankSnapshot;
use crate::model::{
    CollectionFrequency, DisbursementStructure, EarlyWarningTrigger, Recommendation, RiskFit,
    Severity, UnderwritingParams, Verdict,
};
use crate::policy::PolicyTable;

pub fn risk_grade(score: u32) -> &'static str {
    if score >= 80 {
        "A"
    } else if score >= 65 {
        "B"
    } else if score >= 50 {
        "C"
    } else {
        "D"
    }
}

fn grade_index(grade: &str) -> usize {
    match grade {
        "A" => 0,
        "B" => 1,
        "C" => 2,
        _ => 3,
    }
}

/// A weak credibility band worsens the effective tier by one step; the
/// declared documents contradict the cash story, so the tier tables are
/// entered one row lower.
fn effective_grade(grade: &'static str, credibility: Option<&CredibilityScore>) -> &'static str {
    match credibility.map(|c| c.band) {
        Some(CredibilityBand::Weak) => match grade {
            "A" => "B",
            "B" => "C",
            _ => "D",
        },
        _ => grade,
    }
}

pub fn pricing_apr(grade: &str, snap: &BankSnapshot, policy: &PolicyTable) -> f64 {
    let pricing = &policy.pricing;
    let mut apr = pricing.base_apr + pricing.grade_premiums[grade_index(grade)];
    if snap.lenders.estimated_lenders >= 3 || snap.lenders.weekly_collections_detected {
        apr += pricing.competition_premium;
    }
    if snap.bounce_return_count >= 2 || snap.penalty_charge_count >= 4 {
        apr += pricing.discipline_premium;
    }
    if is_high_volatility(snap) {
        apr += pricing.volatility_premium;
    }
    if snap.velocity.same_day_spend_ratio >= 0.9 {
        apr += pricing.velocity_premium;
    }
    apr.clamp(pricing.apr_min, pricing.apr_max)
}

pub fn recommendation(
    params: &UnderwritingParams,
    snap: &BankSnapshot,
    score: u32,
    credibility: Option<&CredibilityScore>,
    policy: &PolicyTable,
) -> Recommendation {
    let pricing = &policy.pricing;
    let grade = effective_grade(risk_grade(score), credibility);
    let tier = grade_index(grade);

    let requested = params
        .requested_exposure_minor
        .clamp(pricing.requested_exposure_min_minor, pricing.requested_exposure_max_minor);
    let max_tenure = params.max_tenure_months.clamp(1, pricing.max_tenure_months_cap);

    let apr = pricing_apr(grade, snap, policy);
    let monthly_rate = apr / 12.0 / 100.0;

    let cash_cap = pricing.cash_cap_floor_minor.max(
        (snap.avg_monthly_credits_minor * pricing.cash_cap_multiple_of_monthly_credits).round()
            as i64,
    );
    let base = requested.min(pricing.requested_exposure_min_minor.max(cash_cap.min(requested)));
    let recommended = ((base as f64 * pricing.exposure_factors[tier]).round() as i64).clamp(
        pricing.recommended_exposure_min_minor,
        pricing.requested_exposure_max_minor,
    );

    let tenure_months = if score >= 80 {
        pricing.tenure_ladder_months[0]
    } else if score >= 65 {
        pricing.tenure_ladder_months[1]
    } else if score >= 50 {
        pricing.tenure_ladder_months[2]
    } else {
        pricing.tenure_ladder_months[3]
    }
    .min(max_tenure);

    let stacked =
        snap.lenders.estimated_lenders >= 3 || snap.lenders.weekly_collections_detected;
    let collection_frequency = if matches!(grade, "C" | "D") || stacked {
        CollectionFrequency::Weekly
    } else {
        CollectionFrequency::Monthly
    };

    let upfront_deduction_pct = (pricing.upfront_pcts[tier]
        + if snap.lenders.estimated_lenders >= 3 { pricing.upfront_stacking_add } else { 0.0 }
        + if snap.low_balance_days > 0 { pricing.upfront_low_balance_add } else { 0.0 })
    .clamp(pricing.upfront_pct_min, pricing.upfront_pct_max);

    let total_interest = (recommended as f64 * monthly_rate * tenure_months as f64).round() as i64;
    let upfront_deduction_amt_minor =
        (total_interest as f64 * upfront_deduction_pct).round() as i64;
    let remaining_interest = (total_interest - upfront_deduction_amt_minor).max(0);

    let periods = match collection_frequency {
        CollectionFrequency::Weekly => (tenure_months * 4).max(1) as i64,
        CollectionFrequency::Monthly => tenure_months.max(1) as i64,
    };
    let collection_amount_minor =
        pricing.collection_amount_min_minor.max(recommended / periods + remaining_interest / periods);

    let staged = matches!(grade, "C" | "D")
        || snap.lenders.estimated_lenders >= 3
        || snap.lenders.rollover_recycling_signals >= 2;
    let stage_1_minor = if staged {
        (recommended as f64 * pricing.stage_1_share).round() as i64
    } else {
        recommended
    };
    let stage_2_minor = recommended - stage_1_minor;

    let structure = DisbursementStructure {
        schedule_type: "amortized_simple".to_string(),
        net_disbursed_estimate_minor: recommended - upfront_deduction_amt_minor,
        staged_disbursement: staged,
        stage_1_minor,
        stage_2_minor,
        stage_2_condition: if staged {
            "Release only after 2 clean collection cycles + no new lender signals.".to_string()
        } else {
            String::new()
        },
        best_collection_weekday: snap.velocity.top_inflow_weekday.to_uppercase(),
    };

    Recommendation {
        recommended_exposure_minor: recommended,
        tenure_months,
        collection_frequency,
        collection_amount_minor,
        upfront_deduction_pct,
        upfront_deduction_amt_minor,
        pricing_apr: apr,
        structure,
    }
}

/// Early-warning trigger sheet for the collections team.
pub fn triggers(
    snap: &BankSnapshot,
    gst: Option<&GstAssessment>,
    cross: Option<&CrossVerification>,
    itr: Option<&ItrAssessment>,
    policy: &PolicyTable,
) -> Vec<EarlyWarningTrigger> {
    let mut out = Vec::new();

    let hard_stop = (snap.avg_weekly_credits_minor * 0.15).round().max(5_000_000.0) as i64;
    let warn = (snap.avg_weekly_credits_minor * 0.25).round().max(10_000_000.0) as i64;
    out.push(EarlyWarningTrigger {
        trigger_type: "BALANCE_HARD_STOP".to_string(),
        severity: Severity::Critical,
        condition: json!({ "balance_lt_minor": hard_stop }),
        description: format!(
            "Hard-stop: if balance drops below ₹{}, freeze disbursal and collect immediately.",
            format_inr(hard_stop),
        ),
    });
    out.push(EarlyWarningTrigger {
        trigger_type: "BALANCE_WARN".to_string(),
        severity: Severity::High,
        condition: json!({ "balance_lt_minor": warn }),
        description: format!(
            "Warning: if balance stays below ₹{} for 2 consecutive days, switch to daily follow-up and tighten collections.",
            format_inr(warn),
        ),
    });

    if snap.lenders.estimated_lenders >= 3 || snap.lenders.weekly_collections_detected {
        out.push(EarlyWarningTrigger {
            trigger_type: "NEW_LENDER_SIGNAL".to_string(),
            severity: Severity::High,
            condition: json!({
                "estimated_lenders": snap.lenders.estimated_lenders,
                "weekly_collections_detected": snap.lenders.weekly_collections_detected,
            }),
            description: "Private-lender stacking detected. Any new lender entry or interest payment: re-price immediately, reduce exposure, stop stage-2.".to_string(),
        });
    }
    if snap.bounce_return_count > 0 {
        out.push(EarlyWarningTrigger {
            trigger_type: "BOUNCE_OR_RETURN".to_string(),
            severity: Severity::High,
            condition: json!({ "bounce_return_count": snap.bounce_return_count }),
            description: "Bounce/return detected. Treat as stress: tighten collection frequency and demand bank-day evidence.".to_string(),
        });
    }
    if snap.velocity.same_day_spend_ratio >= 0.85 {
        out.push(EarlyWarningTrigger {
            trigger_type: "SPIKE_THEN_DRAIN".to_string(),
            severity: Severity::Medium,
            condition: json!({ "same_day_spend_ratio_gte": 0.85 }),
            description: "Spike-then-drain pattern. Collections must align with peak inflow days only.".to_string(),
        });
    }
    out.push(EarlyWarningTrigger {
        trigger_type: "COLLECTION_MISS".to_string(),
        severity: Severity::Critical,
        condition: json!({ "miss_count_gte": 1 }),
        description: "Any single missed collection: classify as early default risk and move to recovery mode.".to_string(),
    });

    if let Some(gst) = gst {
        if gst.filing_gap_count > 0 || gst.late_filing_count >= 2 {
            out.push(EarlyWarningTrigger {
                trigger_type: "GST_DISCIPLINE".to_string(),
                severity: if gst.filing_gap_count > 0 { Severity::High } else { Severity::Medium },
                condition: json!({
                    "filing_gap_count": gst.filing_gap_count,
                    "late_filing_count": gst.late_filing_count,
                }),
                description: "GST discipline risk: gaps/late filings. Further non-compliance: freeze enhancements and move to control collections.".to_string(),
            });
        }
    }
    if let Some(cross) = cross {
        if let Some(v) = cross.bank_vs_gst_avg_diff_pct {
            if v > policy.cross.bank_vs_gst_avg_diff_pct_max {
                out.push(EarlyWarningTrigger {
                    trigger_type: "BANK_GST_MISMATCH".to_string(),
                    severity: if v > 35.0 { Severity::Critical } else { Severity::High },
                    condition: json!({ "avg_abs_diff_pct": v }),
                    description: "Bank vs GST mismatch elevated. Any new lender/cash-recycling signal: reduce exposure immediately.".to_string(),
                });
            }
        }
        if let Some(v) = cross.bank_vs_itr_avg_diff_pct {
            if v > policy.cross.bank_vs_itr_avg_diff_pct_max {
                out.push(EarlyWarningTrigger {
                    trigger_type: "BANK_ITR_MISMATCH".to_string(),
                    severity: if v > 40.0 { Severity::Critical } else { Severity::High },
                    condition: json!({ "avg_abs_diff_pct": v }),
                    description: "Bank vs ITR mismatch elevated. Treat ITR as weak evidence and rely on cash-control collections.".to_string(),
                });
            }
        }
        if let Some(v) = cross.itr_vs_gst_annual_diff_pct {
            if v > policy.cross.itr_vs_gst_annual_diff_pct_max {
                out.push(EarlyWarningTrigger {
                    trigger_type: "ITR_GST_MISMATCH".to_string(),
                    severity: if v > 40.0 { Severity::Critical } else { Severity::High },
                    condition: json!({
                        "annual_abs_diff_pct": v,
                        "gst_annual_estimated_minor": cross.itr_vs_gst_annual_estimated_minor,
                    }),
                    description: "ITR vs GST mismatch elevated. Reported numbers are unreliable: tighten structure and demand reconciliation proof.".to_string(),
                });
            }
        }
        if !cross.nil_return_months_with_bank_credits.is_empty() {
            out.push(EarlyWarningTrigger {
                trigger_type: "GST_NIL_WITH_BANK_CREDITS".to_string(),
                severity: Severity::Critical,
                condition: json!({ "months": cross.nil_return_months_with_bank_credits }),
                description: "NIL GST returns conflict with active bank credits. Demand breakup and compliance proof before any exposure enhancement.".to_string(),
            });
        }
    }
    if let Some(itr) = itr {
        if itr.latest_margin_pct < policy.itr.margin_pct_min {
            out.push(EarlyWarningTrigger {
                trigger_type: "ITR_MARGIN_THIN".to_string(),
                severity: Severity::Medium,
                condition: json!({
                    "latest_margin_pct_lt": policy.itr.margin_pct_min,
                    "latest_margin_pct": itr.latest_margin_pct,
                }),
                description: "Thin margin: small shocks can trigger missed collections. Keep exposure capped; collect weekly.".to_string(),
            });
        }
    }

    out
}

pub fn verdict(score: u32, snap: &BankSnapshot, recommendation: &Recommendation) -> Verdict {
    let risk_fit = if score >= 70 {
        RiskFit::Accept
    } else if score >= 50 {
        RiskFit::AcceptWithControl
    } else {
        RiskFit::Avoid
    };

    let top_source = snap
        .credit_heat
        .first()
        .map(|r| r.counterparty.clone())
        .unwrap_or_else(|| "primary inflow".to_string());
    let top_pct = snap.top_credit_pct;
    let stress_days = if top_pct >= 60.0 {
        7
    } else if top_pct >= 40.0 {
        10
    } else {
        14
    };

    let mut recovery = if top_pct >= 40.0 {
        format!(
            "Recovery leverage weak: inflow concentrated in {} ({}% of credits).",
            top_source,
            top_pct.round(),
        )
    } else {
        "Recovery leverage moderate: no single inflow dominates.".to_string()
    };
    if snap.lenders.estimated_lenders >= 3 {
        recovery.push_str(" Competition high: stacked with private lenders, recovery contest likely.");
    }
    if snap.low_balance_days > 0 {
        recovery.push_str(" Liquidity buffer thin: faster default if inflow pauses.");
    }

    let street_summary = format!(
        "Borrower survives on {} inflow (~{}% of credits). If disrupted, stress appears within ~{} days. {} collections must align on {}. Exposure beyond ₹{} materially increases recovery risk.",
        top_source,
        top_pct.round(),
        stress_days,
        recommendation.collection_frequency,
        recommendation.structure.best_collection_weekday,
        format_inr(recommendation.recommended_exposure_minor),
    );

    Verdict {
        risk_fit,
        risk_grade: risk_grade(score).to_string(),
        score,
        street_summary,
        recovery_leverage_summary: recovery,
    }
}

pub fn aggressive_summary(
    verdict: &Verdict,
    recommendation: &Recommendation,
    snap: &BankSnapshot,
    cross: Option<&CrossVerification>,
    credibility: Option<&CredibilityScore>,
) -> String {
    let fit = match verdict.risk_fit {
        RiskFit::Accept => "Accept",
        RiskFit::AcceptWithControl => "Accept with Control",
        RiskFit::Avoid => "Avoid",
    };
    let top_source = snap
        .credit_heat
        .first()
        .map(|r| r.counterparty.as_str())
        .unwrap_or("primary inflow");

    let mut lines = vec![
        format!(
            "AGGRESSIVE VERDICT: {} | Grade {} | Score {}",
            fit, verdict.risk_grade, verdict.score,
        ),
        format!(
            "Recommended Exposure: ₹{} | Pricing: {}% APR | Collections: {} ₹{}",
            format_inr(recommendation.recommended_exposure_minor),
            recommendation.pricing_apr,
            recommendation.collection_frequency,
            format_inr(recommendation.collection_amount_minor),
        ),
        format!(
            "Cash power: avg monthly credits ₹{}. Top inflow source: {} ({}%).{} Upfront interest deduction: {}% (₹{}).",
            format_inr(snap.avg_monthly_credits_minor.round() as i64),
            top_source,
            snap.top_credit_pct.round(),
            if snap.lenders.estimated_lenders > 0 {
                format!(" Private lenders estimated: {}.", snap.lenders.estimated_lenders)
            } else {
                String::new()
            },
            (recommendation.upfront_deduction_pct * 100.0).round(),
            format_inr(recommendation.upfront_deduction_amt_minor),
        ),
    ];

    if let Some(cross) = cross {
        if !cross.mismatch_flags.is_empty() {
            let mut parts = Vec::new();
            if let Some(v) = cross.bank_vs_gst_avg_diff_pct {
                parts.push(format!("Bank↔GST avg diff {};", pct1(v / 100.0)));
            }
            if let Some(v) = cross.bank_vs_itr_avg_diff_pct {
                parts.push(format!("Bank↔ITR avg diff {};", pct1(v / 100.0)));
            }
            parts.push(format!("Flags: {}.", cross.mismatch_flags.join(", ")));
            lines.push(format!("Cross-check: {}", parts.join(" ")));
        }
    }
    if let Some(credibility) = credibility {
        let mut line = format!(
            "Credibility: {}/100 ({}).",
            credibility.score, credibility.band,
        );
        if !credibility.reasons.is_empty() {
            line.push_str(&format!(" Reasons: {}.", credibility.reasons.join(", ")));
        }
        lines.push(line);
    }

    lines.join("\n")
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

    fn quiet_snapshot() -> BankSnapshot {
        let txns = vec![
            txn("2024-01-05", "NEFT-ALPHA ONE", 0, 4_123_400, Some(20_000_000)),
            txn("2024-02-05", "NEFT-BETA TWO", 0, 4_123_400, Some(24_000_000)),
            txn("2024-03-05", "NEFT-GAMMA THREE", 0, 4_123_400, Some(28_000_000)),
            txn("2024-04-05", "NEFT-DELTA FOUR", 0, 4_123_400, Some(32_000_000)),
            txn("2024-04-20", "VENDOR PAYOUT", 1_077_700, 0, Some(30_922_300)),
        ];
        bank_snapshot(&txns, &PolicyTable::default())
    }

    #[test]
    fn grades_from_score() {
        assert_eq!(risk_grade(92), "A");
        assert_eq!(risk_grade(72), "B");
        assert_eq!(risk_grade(55), "C");
        assert_eq!(risk_grade(30), "D");
    }

    #[test]
    fn apr_scales_with_grade() {
        let snap = quiet_snapshot();
        let policy = PolicyTable::default();
        assert_eq!(pricing_apr("A", &snap, &policy), 30.0);
        assert_eq!(pricing_apr("D", &snap, &policy), 48.0);
    }

    #[test]
    fn weekly_collections_for_low_grades() {
        let snap = quiet_snapshot();
        let policy = PolicyTable::default();
        let params = UnderwritingParams::default();
        let strong = recommendation(&params, &snap, 85, None, &policy);
        assert_eq!(strong.collection_frequency, CollectionFrequency::Monthly);
        assert_eq!(strong.tenure_months, 12);
        assert!(!strong.structure.staged_disbursement);

        let weak = recommendation(&params, &snap, 45, None, &policy);
        assert_eq!(weak.collection_frequency, CollectionFrequency::Weekly);
        assert_eq!(weak.tenure_months, 6);
        assert!(weak.structure.staged_disbursement);
        assert!(weak.recommended_exposure_minor < strong.recommended_exposure_minor);
    }

    #[test]
    fn weak_credibility_tightens_tier() {
        let snap = quiet_snapshot();
        let policy = PolicyTable::default();
        let params = UnderwritingParams::default();
        let weak_credibility = CredibilityScore {
            score: 40,
            band: CredibilityBand::Weak,
            gst_score: 40,
            itr_score: 40,
            mismatch_penalty: 60,
            reasons: vec![],
        };
        let plain = recommendation(&params, &snap, 85, None, &policy);
        let tightened = recommendation(&params, &snap, 85, Some(&weak_credibility), &policy);
        assert!(tightened.recommended_exposure_minor < plain.recommended_exposure_minor);
        assert!(tightened.upfront_deduction_pct > plain.upfront_deduction_pct);
        assert!(tightened.pricing_apr > plain.pricing_apr);
    }

    #[test]
    fn collection_amount_floor() {
        let snap = quiet_snapshot();
        let recommendation =
            recommendation(&UnderwritingParams::default(), &snap, 85, None, &PolicyTable::default());
        assert!(recommendation.collection_amount_minor >= 100_000);
        assert!(recommendation.upfront_deduction_amt_minor > 0);
        assert_eq!(
            recommendation.structure.net_disbursed_estimate_minor,
            recommendation.recommended_exposure_minor
                - recommendation.upfront_deduction_amt_minor,
        );
    }

    #[test]
    fn baseline_triggers_always_present() {
        let snap = quiet_snapshot();
        let sheet = triggers(&snap, None, None, None, &PolicyTable::default());
        let kinds: Vec<&str> = sheet.iter().map(|t| t.trigger_type.as_str()).collect();
        assert!(kinds.contains(&"BALANCE_HARD_STOP"));
        assert!(kinds.contains(&"BALANCE_WARN"));
        assert!(kinds.contains(&"COLLECTION_MISS"));
        assert!(!kinds.contains(&"NEW_LENDER_SIGNAL"));
    }

    #[test]
    fn verdict_bands() {
        let snap = quiet_snapshot();
        let policy = PolicyTable::default();
        let rec = recommendation(&UnderwritingParams::default(), &snap, 85, None, &policy);
        let strong = verdict(85, &snap, &rec);
        assert_eq!(strong.risk_fit, RiskFit::Accept);
        let marginal = verdict(55, &snap, &rec);
        assert_eq!(marginal.risk_fit, RiskFit::AcceptWithControl);
        let bad = verdict(30, &snap, &rec);
        assert_eq!(bad.risk_fit, RiskFit::Avoid);
        assert!(bad.street_summary.contains("collections must align"));
    }
}
