//! Cross-document verification: declared GST/ITR turnover against observed
//! bank credits, month by month.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::gst::{month_from_index, month_index, GstAssessment};
use crate::itr::ItrAssessment;
use crate::model::{RuleCategory, RuleOutcome, RuleSpec, Severity};
use crate::policy::PolicyTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    Filed,
    Late,
    Nil,
    Missing,
}

/// Divergence bucket for one month's bank-vs-GST difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffBucket {
    Ok,
    Review,
    Critical,
}

pub fn diff_bucket(abs_diff_pct: f64, policy: &PolicyTable) -> DiffBucket {
    if abs_diff_pct <= policy.cross.diff_ok_pct_max {
        DiffBucket::Ok
    } else if abs_diff_pct <= policy.cross.diff_review_pct_max {
        DiffBucket::Review
    } else {
        DiffBucket::Critical
    }
}

/// One month of the comparison span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossVerifyRow {
    pub month: String,
    pub bank_credits_minor: i64,
    pub gst_turnover_minor: Option<i64>,
    pub gst_tax_paid_minor: Option<i64>,
    pub gst_days_late: Option<u32>,
    pub filing_status: FilingStatus,
    /// `(bank − gst) / gst × 100`; absent for missing/NIL months.
    pub diff_pct: Option<f64>,
    pub bucket: Option<DiffBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossVerification {
    pub rows: Vec<CrossVerifyRow>,
    pub bank_vs_gst_avg_diff_pct: Option<f64>,
    pub bank_vs_itr_avg_diff_pct: Option<f64>,
    pub itr_vs_gst_annual_diff_pct: Option<f64>,
    pub itr_vs_gst_annual_estimated_minor: Option<i64>,
    /// Months where GST declared NIL turnover but the bank shows material
    /// credits — a stacking / undisclosed-income signal.
    pub nil_return_months_with_bank_credits: Vec<String>,
    pub mismatch_flags: Vec<String>,
    pub commentary: String,
}

/// Compare declared documents against observed bank inflows. `None` when
/// neither GST nor ITR data was supplied.
pub fn assess(
    bank_credits_by_month: &BTreeMap<String, i64>,
    avg_monthly_credits_minor: f64,
    gst: Option<&GstAssessment>,
    itr: Option<&ItrAssessment>,
    policy: &PolicyTable,
) -> Option<CrossVerification> {
    if gst.is_none() && itr.is_none() {
        return None;
    }

    let mut rows = Vec::new();
    if let Some(gst) = gst {
        let indices: Vec<i32> = gst
            .months
            .iter()
            .filter_map(|m| month_index(&m.month))
            .collect();
        if let (Some(&min), Some(&max)) = (indices.iter().min(), indices.iter().max()) {
            let by_month: BTreeMap<&str, &crate::model::GstMonth> =
                gst.months.iter().map(|m| (m.month.as_str(), m)).collect();
            for i in min..=max {
                let ym = month_from_index(i);
                let declared = by_month.get(ym.as_str());
                let bank_credits_minor = bank_credits_by_month.get(&ym).copied().unwrap_or(0);

                let (gst_turnover_minor, gst_tax_paid_minor, gst_days_late, filing_status) =
                    match declared {
                        Some(m) if m.days_late.unwrap_or(0) > 0 => (
                            Some(m.turnover_minor),
                            Some(m.tax_paid_minor),
                            m.days_late,
                            FilingStatus::Late,
                        ),
                        Some(m) if m.turnover_minor == 0 => (
                            Some(0),
                            Some(m.tax_paid_minor),
                            m.days_late,
                            FilingStatus::Nil,
                        ),
                        Some(m) => (
                            Some(m.turnover_minor),
                            Some(m.tax_paid_minor),
                            m.days_late,
                            FilingStatus::Filed,
                        ),
                        None => (None, None, None, FilingStatus::Missing),
                    };

                let diff_pct = gst_turnover_minor.filter(|t| *t > 0).map(|t| {
                    (bank_credits_minor - t) as f64 / t as f64 * 100.0
                });
                let bucket = diff_pct.map(|d| diff_bucket(d.abs(), policy));

                rows.push(CrossVerifyRow {
                    month: ym,
                    bank_credits_minor,
                    gst_turnover_minor,
                    gst_tax_paid_minor,
                    gst_days_late,
                    filing_status,
                    diff_pct,
                    bucket,
                });
                if rows.len() >= 36 {
                    break;
                }
            }
        }
    }

    let nil_return_months_with_bank_credits: Vec<String> = rows
        .iter()
        .filter(|r| {
            r.gst_turnover_minor == Some(0)
                && r.bank_credits_minor > policy.cross.nil_material_credits_min_minor
        })
        .map(|r| r.month.clone())
        .collect();

    let diffs: Vec<f64> = rows.iter().filter_map(|r| r.diff_pct.map(f64::abs)).collect();
    let bank_vs_gst_avg_diff_pct = if diffs.is_empty() {
        None
    } else {
        Some(diffs.iter().sum::<f64>() / diffs.len() as f64)
    };

    let bank_vs_itr_avg_diff_pct = itr
        .filter(|i| i.latest_turnover_minor > 0)
        .map(|i| {
            let itr_monthly = i.latest_turnover_minor as f64 / 12.0;
            (avg_monthly_credits_minor - itr_monthly).abs() / itr_monthly * 100.0
        });

    let itr_vs_gst_annual_estimated_minor = gst.map(|g| {
        let sum: i64 = g.months.iter().map(|m| m.turnover_minor.max(0)).sum();
        let count = g.months.len().max(1);
        if count >= policy.cross.annualize_min_months {
            (sum as f64 / count as f64 * 12.0).round() as i64
        } else {
            sum
        }
    });

    let itr_vs_gst_annual_diff_pct = match (itr, itr_vs_gst_annual_estimated_minor) {
        (Some(i), Some(estimated)) if i.latest_turnover_minor > 0 && estimated > 0 => Some(
            (i.latest_turnover_minor - estimated).abs() as f64 / estimated as f64 * 100.0,
        ),
        _ => None,
    };

    let mut mismatch_flags = Vec::new();
    if bank_vs_gst_avg_diff_pct.unwrap_or(0.0) > policy.cross.diff_review_pct_max {
        mismatch_flags.push("BANK_VS_GST_MISMATCH".to_string());
    }
    if bank_vs_itr_avg_diff_pct.unwrap_or(0.0) > policy.cross.bank_vs_itr_avg_diff_pct_max {
        mismatch_flags.push("BANK_VS_ITR_MISMATCH".to_string());
    }
    if itr_vs_gst_annual_diff_pct.unwrap_or(0.0) > policy.cross.itr_vs_gst_annual_diff_pct_max {
        mismatch_flags.push("ITR_VS_GST_MISMATCH".to_string());
    }
    if !nil_return_months_with_bank_credits.is_empty() {
        mismatch_flags.push("GST_NIL_WITH_BANK_CREDITS".to_string());
    }

    let mut commentary = Vec::new();
    if let Some(v) = bank_vs_gst_avg_diff_pct {
        commentary.push(format!("Bank vs GST avg mismatch ~{:.1}%.", v));
    }
    if let Some(v) = bank_vs_itr_avg_diff_pct {
        commentary.push(format!("Bank vs ITR avg mismatch ~{:.1}%.", v));
    }
    if let Some(v) = itr_vs_gst_annual_diff_pct {
        commentary.push(format!("ITR vs GST (annualized) mismatch ~{:.1}%.", v));
    }
    if !mismatch_flags.is_empty() {
        commentary.push(format!("Mismatch flags: {}.", mismatch_flags.join(", ")));
    }

    Some(CrossVerification {
        rows,
        bank_vs_gst_avg_diff_pct,
        bank_vs_itr_avg_diff_pct,
        itr_vs_gst_annual_diff_pct,
        itr_vs_gst_annual_estimated_minor,
        nil_return_months_with_bank_credits,
        mismatch_flags,
        commentary: commentary.join(" "),
    })
}

/// Cross-verification rule family. Each rule runs only when its metric
/// exists.
pub fn rules(cross: &CrossVerification, policy: &PolicyTable) -> Vec<RuleOutcome> {
    let mut outcomes = Vec::new();

    if let Some(v) = cross.bank_vs_gst_avg_diff_pct {
        outcomes.push(
            RuleSpec {
                id: "XV-01",
                name: "GST vs bank mismatch",
                category: RuleCategory::CrossVerification,
                severity: Severity::Critical,
                score_delta_fail: -18,
                thresholds: json!({
                    "avg_abs_diff_pct_max": policy.cross.bank_vs_gst_avg_diff_pct_max,
                }),
                reason_fail: "GST vs bank mismatch is materially high. Treat as control risk (unreported/cash/recycling). Reduce exposure and increase upfront deduction.",
                reason_pass: "GST vs bank mismatch is within tolerance.",
            }
            .evaluate(
                v <= policy.cross.bank_vs_gst_avg_diff_pct_max,
                json!({ "bank_vs_gst_avg_abs_diff_pct": v }),
            ),
        );
    }

    if !cross.rows.is_empty() {
        let months = &cross.nil_return_months_with_bank_credits;
        outcomes.push(
            RuleSpec {
                id: "XV-02",
                name: "NIL GST return with active bank credits",
                category: RuleCategory::CrossVerification,
                severity: Severity::Critical,
                score_delta_fail: -25,
                thresholds: json!({ "nil_return_months_with_bank_credits_max": 0 }),
                reason_fail: "NIL GST returns conflict with active bank credits. Hard control red flag. Demand full breakup and compliance proof before any exposure.",
                reason_pass: "No NIL GST month carries material bank credits.",
            }
            .evaluate(months.is_empty(), json!({ "months": months })),
        );
    }

    if let Some(v) = cross.itr_vs_gst_annual_diff_pct {
        outcomes.push(
            RuleSpec {
                id: "XV-03",
                name: "ITR vs GST mismatch (annualized)",
                category: RuleCategory::CrossVerification,
                severity: Severity::Critical,
                score_delta_fail: -18,
                thresholds: json!({
                    "annual_abs_diff_pct_max": policy.cross.itr_vs_gst_annual_diff_pct_max,
                }),
                reason_fail: "ITR vs GST mismatch is high. Treat reported numbers as unreliable; restructure with tighter control and documentary proof.",
                reason_pass: "ITR vs GST mismatch is within tolerance.",
            }
            .evaluate(
                v <= policy.cross.itr_vs_gst_annual_diff_pct_max,
                json!({
                    "itr_vs_gst_annual_abs_diff_pct": v,
                    "gst_annual_estimated_minor": cross.itr_vs_gst_annual_estimated_minor,
                }),
            ),
        );
    }

    if let Some(v) = cross.bank_vs_itr_avg_diff_pct {
        outcomes.push(
            RuleSpec {
                id: "XV-04",
                name: "ITR vs bank mismatch",
                category: RuleCategory::CrossVerification,
                severity: Severity::High,
                score_delta_fail: -12,
                thresholds: json!({
                    "avg_abs_diff_pct_max": policy.cross.bank_vs_itr_avg_diff_pct_max,
                }),
                reason_fail: "ITR does not match bank cash power. Treat declared financials as unreliable. Tighten tenure and collections.",
                reason_pass: "ITR vs bank mismatch is within tolerance.",
            }
            .evaluate(
                v <= policy.cross.bank_vs_itr_avg_diff_pct_max,
                json!({ "bank_vs_itr_avg_abs_diff_pct": v }),
            ),
        );
    }

    outcomes
}
