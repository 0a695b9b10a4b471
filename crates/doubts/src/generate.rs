//! Condition-to-question mapping over a finished underwriting result.

use std::collections::BTreeSet;

use serde_json::json;

use lendlens_underwriting::model::{RuleOutcome, UnderwritingResult};

use crate::model::{AnswerType, Doubt, DoubtSeverity};

fn pick_rule<'a>(uw: &'a UnderwritingResult, id: &str) -> Option<&'a RuleOutcome> {
    uw.rule_run_log.iter().find(|r| r.id == id)
}

fn rule_evidence(rule: Option<&RuleOutcome>) -> serde_json::Value {
    rule.map(|r| serde_json::to_value(r).unwrap_or(serde_json::Value::Null))
        .unwrap_or(serde_json::Value::Null)
}

/// Generate the current doubt set for a PD review.
///
/// Codes present in `covered_codes` (the static PD question catalogue) are
/// never emitted. Output is sorted most urgent first, then by code, so the
/// list is stable across runs.
pub fn generate(uw: &UnderwritingResult, covered_codes: &BTreeSet<String>) -> Vec<Doubt> {
    let mut out: Vec<Doubt> = Vec::new();
    let mut add = |doubt: Doubt| {
        if !covered_codes.contains(&doubt.code) {
            out.push(doubt);
        }
    };

    // Concentration
    if let Some(top) = uw.credit_heat_map.first() {
        if top.pct_of_total >= 40.0 {
            let rule = pick_rule(uw, "R010");
            add(Doubt {
                code: "D010_TOP1_CREDIT_CONCENTRATION".into(),
                severity: if top.pct_of_total >= 60.0 {
                    DoubtSeverity::ImmediateAction
                } else {
                    DoubtSeverity::HighRisk
                },
                category: "Concentration".into(),
                question_text: format!(
                    "Top inflow source contributes ~{}% of credits ({}). Explain the relationship and provide contract/order proof. What happens if this inflow stops for 30 days?",
                    top.pct_of_total.round(),
                    top.counterparty,
                ),
                answer_type: AnswerType::Text,
                options: vec![],
                required_upload_hint: Some("Upload contract / work order / invoice proof".into()),
                evidence: json!({
                    "top_counterparty": top.counterparty,
                    "top_credit_pct": top.pct_of_total,
                    "rule": rule_evidence(rule),
                }),
                source_rule_id: rule.map(|r| r.id.clone()),
                covered_by_static_catalogue: false,
            });
        }
    }

    // GST discipline
    if let Some(gst) = &uw.gst {
        if gst.filing_gap_count > 0 {
            let rule = pick_rule(uw, "GST-01");
            let missing: Vec<&str> = gst.missing_months.iter().take(12).map(String::as_str).collect();
            add(Doubt {
                code: "D200_GST_MISSED_FILINGS".into(),
                severity: DoubtSeverity::HighRisk,
                category: "GST".into(),
                question_text: format!(
                    "Missing GST filings detected for months: {}. Explain why these months were missed. Confirm current compliance status and share filing acknowledgements/challans.",
                    if missing.is_empty() { "(unknown months)".to_string() } else { missing.join(", ") },
                ),
                answer_type: AnswerType::File,
                options: vec![],
                required_upload_hint: Some(
                    "Upload GSTR-3B filing acknowledgements + tax payment challans".into(),
                ),
                evidence: json!({
                    "missed_months_count": gst.filing_gap_count,
                    "missing_months": gst.missing_months,
                    "rule": rule_evidence(rule),
                }),
                source_rule_id: rule.map(|r| r.id.clone()),
                covered_by_static_catalogue: false,
            });
        }

        if gst.late_filing_count >= 2 {
            let rule = pick_rule(uw, "GST-02");
            let late: Vec<&str> = gst.late_months.iter().take(12).map(String::as_str).collect();
            add(Doubt {
                code: "D201_GST_LATE_FILINGS".into(),
                severity: DoubtSeverity::Alert,
                category: "GST".into(),
                question_text: format!(
                    "Repeated late GST filings detected (late months: {}). Why repeated delays? Confirm how you will avoid delays going forward.",
                    if late.is_empty() { "unknown".to_string() } else { late.join(", ") },
                ),
                answer_type: AnswerType::Text,
                options: vec![],
                required_upload_hint: Some("Upload CA note / compliance plan (optional)".into()),
                evidence: json!({
                    "late_months_count": gst.late_filing_count,
                    "late_months": gst.late_months,
                    "rule": rule_evidence(rule),
                }),
                source_rule_id: rule.map(|r| r.id.clone()),
                covered_by_static_catalogue: false,
            });
        }

        if gst.volatility_bucket == lendlens_underwriting::gst::VolatilityBucket::High {
            let rule = pick_rule(uw, "GST-03");
            add(Doubt {
                code: "D202_GST_VOLATILITY_HIGH".into(),
                severity: DoubtSeverity::HighRisk,
                category: "GST".into(),
                question_text: format!(
                    "GST turnover volatility is HIGH (CV ~{:.2}). Explain seasonality/contract cycles. Provide top customer list and expected inflow rhythm for the next 3 months.",
                    gst.volatility_score,
                ),
                answer_type: AnswerType::Text,
                options: vec![],
                required_upload_hint: Some("Upload top customer list / contracts (optional)".into()),
                evidence: json!({
                    "volatility_score": gst.volatility_score,
                    "volatility_bucket": gst.volatility_bucket.to_string(),
                    "seasonality_bucket": gst.seasonality_bucket.to_string(),
                    "rule": rule_evidence(rule),
                }),
                source_rule_id: rule.map(|r| r.id.clone()),
                covered_by_static_catalogue: false,
            });
        }

        if gst.consecutive_drop_months.len() >= 2 {
            let rule = pick_rule(uw, "GST-04");
            add(Doubt {
                code: "D203_GST_CONSECUTIVE_DROP".into(),
                severity: DoubtSeverity::ImmediateAction,
                category: "GST".into(),
                question_text: format!(
                    "Turnover dropped sharply for consecutive months ({}). Explain root cause and recovery plan. Provide proof of current month stabilization (orders/invoices).",
                    gst.consecutive_drop_months.join(", "),
                ),
                answer_type: AnswerType::Text,
                options: vec![],
                required_upload_hint: Some(
                    "Upload latest orders / invoices / work orders (recommended)".into(),
                ),
                evidence: json!({
                    "consecutive_drop_months": gst.consecutive_drop_months,
                    "rule": rule_evidence(rule),
                }),
                source_rule_id: rule.map(|r| r.id.clone()),
                covered_by_static_catalogue: false,
            });
        }
    }

    // Cross-verification
    if let Some(cross) = &uw.cross_verification {
        if cross.bank_vs_gst_avg_diff_pct.unwrap_or(0.0) > 25.0 {
            let diff = cross.bank_vs_gst_avg_diff_pct.unwrap();
            let rule = pick_rule(uw, "XV-01");
            add(Doubt {
                code: "D021_BANK_VS_GST_MISMATCH".into(),
                severity: if diff > 35.0 {
                    DoubtSeverity::ImmediateAction
                } else {
                    DoubtSeverity::HighRisk
                },
                category: "Cross Verification".into(),
                question_text: format!(
                    "Bank credits diverge from GST turnover by ~{:.1}%. Break-up: cash sales? inter-account transfers? loan inflows? Provide supporting documents and explain the variance.",
                    diff,
                ),
                answer_type: AnswerType::Text,
                options: vec![],
                required_upload_hint: Some(
                    "Upload sales register / cash sales proof / transfer mapping".into(),
                ),
                evidence: json!({
                    "bank_vs_gst_avg_abs_diff_pct": diff,
                    "rule": rule_evidence(rule),
                }),
                source_rule_id: rule.map(|r| r.id.clone()),
                covered_by_static_catalogue: false,
            });
        }

        if !cross.nil_return_months_with_bank_credits.is_empty() {
            let rule = pick_rule(uw, "XV-02");
            add(Doubt {
                code: "D204_GST_NIL_WITH_BANK_CREDITS".into(),
                severity: DoubtSeverity::ImmediateAction,
                category: "GST".into(),
                question_text: format!(
                    "NIL GST returns but active bank credits detected for months: {}. Explain nature of receipts (cash sales/transfers/loans/refunds) and confirm compliance position with proof.",
                    cross.nil_return_months_with_bank_credits.join(", "),
                ),
                answer_type: AnswerType::File,
                options: vec![],
                required_upload_hint: Some(
                    "Upload reconciliation + GST filing proof / CA note".into(),
                ),
                evidence: json!({
                    "months": cross.nil_return_months_with_bank_credits,
                    "rule": rule_evidence(rule),
                }),
                source_rule_id: rule.map(|r| r.id.clone()),
                covered_by_static_catalogue: false,
            });
        }

        if cross.bank_vs_itr_avg_diff_pct.unwrap_or(0.0) > 25.0 {
            let diff = cross.bank_vs_itr_avg_diff_pct.unwrap();
            let rule = pick_rule(uw, "XV-04");
            add(Doubt {
                code: "D022_BANK_VS_ITR_MISMATCH".into(),
                severity: if diff > 40.0 {
                    DoubtSeverity::ImmediateAction
                } else {
                    DoubtSeverity::HighRisk
                },
                category: "Cross Verification".into(),
                question_text: format!(
                    "Bank cash power diverges from ITR by ~{:.1}%. Explain declared turnover/profit vs actual bank movement. Provide computation summary and reconciliations.",
                    diff,
                ),
                answer_type: AnswerType::Text,
                options: vec![],
                required_upload_hint: Some(
                    "Upload ITR computation + financials + reconciliation notes".into(),
                ),
                evidence: json!({
                    "bank_vs_itr_avg_abs_diff_pct": diff,
                    "rule": rule_evidence(rule),
                }),
                source_rule_id: rule.map(|r| r.id.clone()),
                covered_by_static_catalogue: false,
            });
        }

        if cross.itr_vs_gst_annual_diff_pct.unwrap_or(0.0) > 25.0 {
            let diff = cross.itr_vs_gst_annual_diff_pct.unwrap();
            let rule = pick_rule(uw, "XV-03");
            add(Doubt {
                code: "D212_ITR_VS_GST_MISMATCH".into(),
                severity: DoubtSeverity::ImmediateAction,
                category: "Cross Verification".into(),
                question_text: format!(
                    "ITR vs GST turnover mismatch is ~{:.1}% (annualized). Provide reconciliation and explanation. Upload supporting working/CA note.",
                    diff,
                ),
                answer_type: AnswerType::File,
                options: vec![],
                required_upload_hint: Some("Upload reconciliation + CA note".into()),
                evidence: json!({
                    "itr_vs_gst_annual_abs_diff_pct": diff,
                    "gst_annual_estimated_minor": cross.itr_vs_gst_annual_estimated_minor,
                    "rule": rule_evidence(rule),
                }),
                source_rule_id: rule.map(|r| r.id.clone()),
                covered_by_static_catalogue: false,
            });
        }
    }

    // Competition
    let plc = &uw.private_lender_competition;
    if plc.estimated_lenders >= 2
        || plc.weekly_collections_detected
        || plc.rollover_recycling_signals >= 2
    {
        let rule = pick_rule(uw, "R040");
        add(Doubt {
            code: "D030_PRIVATE_LENDER_STACKING".into(),
            severity: if plc.estimated_lenders >= 3 || plc.weekly_collections_detected {
                DoubtSeverity::ImmediateAction
            } else {
                DoubtSeverity::HighRisk
            },
            category: "Competition".into(),
            question_text: "We detected private-lender competition/repayment signals. List ALL lenders, outstanding, weekly/monthly commitments and next due dates. Confirm if any rollovers/recycling are happening.".into(),
            answer_type: AnswerType::Text,
            options: vec![],
            required_upload_hint: Some(
                "Upload lender list / promissory notes / repayment schedule proof".into(),
            ),
            evidence: json!({
                "estimated_lenders": plc.estimated_lenders,
                "approx_monthly_debt_load_minor": plc.approx_monthly_debt_load_minor,
                "weekly_collections_detected": plc.weekly_collections_detected,
                "rollover_recycling_signals": plc.rollover_recycling_signals,
                "evidence_txns": plc.evidence.iter().take(10).collect::<Vec<_>>(),
                "rule": rule_evidence(rule),
            }),
            source_rule_id: rule.map(|r| r.id.clone()),
            covered_by_static_catalogue: false,
        });
    }

    // Cash control
    let velocity = &uw.cash_velocity;
    if velocity.same_day_spend_ratio >= 0.85 {
        let rule = pick_rule(uw, "R050");
        add(Doubt {
            code: "D040_SPIKE_THEN_DRAIN".into(),
            severity: DoubtSeverity::HighRisk,
            category: "Cash Control".into(),
            question_text: format!(
                "Spike-then-drain behavior detected (same-day spend ~{:.1}%). Who controls outflows? Is this pass-through trading? Share top suppliers + payment terms and confirm margin buffer.",
                velocity.same_day_spend_ratio * 100.0,
            ),
            answer_type: AnswerType::Text,
            options: vec![],
            required_upload_hint: None,
            evidence: json!({
                "same_day_spend_ratio": velocity.same_day_spend_ratio,
                "idle_cash_retention_ratio": velocity.idle_cash_retention_ratio,
                "borrower_type": velocity.borrower_type,
                "rule": rule_evidence(rule),
            }),
            source_rule_id: rule.map(|r| r.id.clone()),
            covered_by_static_catalogue: false,
        });
    }

    // Failed bank rules with direct question mappings
    if let Some(rule) = pick_rule(uw, "R030").filter(|r| !r.passed) {
        add(Doubt {
            code: "D050_PENALTY_BOUNCE_RETURN".into(),
            severity: DoubtSeverity::HighRisk,
            category: "Discipline".into(),
            question_text: "Penalty/bounce/return indicators present. Explain root cause and corrective actions taken. Provide proof of settlement and updated discipline.".into(),
            answer_type: AnswerType::Text,
            options: vec![],
            required_upload_hint: None,
            evidence: json!({ "rule": rule_evidence(Some(rule)) }),
            source_rule_id: Some(rule.id.clone()),
            covered_by_static_catalogue: false,
        });
    }

    if let Some(rule) = pick_rule(uw, "R060").filter(|r| !r.passed) {
        add(Doubt {
            code: "D060_FIXED_OBLIGATIONS_PRESSURE".into(),
            severity: DoubtSeverity::HighRisk,
            category: "Obligations".into(),
            question_text: "Fixed debits appear high versus inflows. Which obligations are non-negotiable? Can any be deferred for the next 90 days to protect collections?".into(),
            answer_type: AnswerType::Text,
            options: vec![],
            required_upload_hint: None,
            evidence: json!({ "rule": rule_evidence(Some(rule)) }),
            source_rule_id: Some(rule.id.clone()),
            covered_by_static_catalogue: false,
        });
    }

    if let Some(rule) = pick_rule(uw, "R020").filter(|r| !r.passed) {
        add(Doubt {
            code: "D061_LIQUIDITY_STRESS".into(),
            severity: DoubtSeverity::ImmediateAction,
            category: "Liquidity".into(),
            question_text: "Account hits near-zero too often. Explain cash buffer plan and what will ensure weekly/monthly collections do not miss. Confirm emergency funding options and backup inflow sources.".into(),
            answer_type: AnswerType::Text,
            options: vec![],
            required_upload_hint: None,
            evidence: json!({ "rule": rule_evidence(Some(rule)) }),
            source_rule_id: Some(rule.id.clone()),
            covered_by_static_catalogue: false,
        });
    }

    // ITR
    if let Some(itr) = &uw.itr {
        if itr.latest_margin_pct < 3.0 {
            let rule = pick_rule(uw, "ITR-01");
            add(Doubt {
                code: "D070_ITR_MARGIN_THIN".into(),
                severity: DoubtSeverity::Alert,
                category: "ITR".into(),
                question_text: format!(
                    "Declared margin is thin (latest ~{:.1}%). Explain how you will absorb collection pressure without disrupting business. Provide gross margin and supplier credit terms.",
                    itr.latest_margin_pct,
                ),
                answer_type: AnswerType::Text,
                options: vec![],
                required_upload_hint: None,
                evidence: json!({
                    "itr_latest_turnover_minor": itr.latest_turnover_minor,
                    "itr_latest_profit_minor": itr.latest_profit_minor,
                    "itr_latest_margin_pct": itr.latest_margin_pct,
                    "rule": rule_evidence(rule),
                }),
                source_rule_id: rule.map(|r| r.id.clone()),
                covered_by_static_catalogue: false,
            });
        }

        if itr.latest_profit_minor < 0 {
            let rule = pick_rule(uw, "ITR-02");
            add(Doubt {
                code: "D210_ITR_LOSS_BUSINESS".into(),
                severity: DoubtSeverity::HighRisk,
                category: "ITR".into(),
                question_text: "Declared loss in ITR. Explain how repayments will be serviced. Provide current month proof of profitability and cash buffer plan.".into(),
                answer_type: AnswerType::Text,
                options: vec![],
                required_upload_hint: Some(
                    "Upload latest management accounts / invoices / bank proof".into(),
                ),
                evidence: json!({
                    "itr_latest_turnover_minor": itr.latest_turnover_minor,
                    "itr_latest_profit_minor": itr.latest_profit_minor,
                    "rule": rule_evidence(rule),
                }),
                source_rule_id: rule.map(|r| r.id.clone()),
                covered_by_static_catalogue: false,
            });
        }

        if itr.yoy_turnover_pct.unwrap_or(0.0) <= -30.0 {
            let rule = pick_rule(uw, "ITR-03");
            add(Doubt {
                code: "D211_ITR_INCOME_DECLINE".into(),
                severity: DoubtSeverity::HighRisk,
                category: "ITR".into(),
                question_text: format!(
                    "YoY turnover declined sharply ({:.1}%). Explain decline and current stabilization plan. Provide proof of current month recovery.",
                    itr.yoy_turnover_pct.unwrap_or(0.0),
                ),
                answer_type: AnswerType::Text,
                options: vec![],
                required_upload_hint: Some(
                    "Upload current month invoices/orders (recommended)".into(),
                ),
                evidence: json!({
                    "yoy_turnover_pct": itr.yoy_turnover_pct,
                    "rule": rule_evidence(rule),
                }),
                source_rule_id: rule.map(|r| r.id.clone()),
                covered_by_static_catalogue: false,
            });
        }

        if itr.latest_profit_minor > 0 && itr.latest_tax_paid_minor == 0 {
            let rule = pick_rule(uw, "ITR-06");
            add(Doubt {
                code: "D213_ITR_TAX_ANOMALY".into(),
                severity: DoubtSeverity::HighRisk,
                category: "ITR".into(),
                question_text: "Profit exists but tax paid = 0 (as per provided ITR inputs). Explain reason and provide computation/proof.".into(),
                answer_type: AnswerType::File,
                options: vec![],
                required_upload_hint: Some("Upload ITR computation / CA note".into()),
                evidence: json!({
                    "itr_latest_profit_minor": itr.latest_profit_minor,
                    "itr_latest_tax_paid_minor": itr.latest_tax_paid_minor,
                    "rule": rule_evidence(rule),
                }),
                source_rule_id: rule.map(|r| r.id.clone()),
                covered_by_static_catalogue: false,
            });
        }
    }

    out.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.code.cmp(&b.code)));
    out
}
