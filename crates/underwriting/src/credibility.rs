//! Credibility score: weighted composite of GST and ITR consistency,
//! penalized by cross-document mismatches.

use serde::{Deserialize, Serialize};

use crate::cross::CrossVerification;
use crate::gst::{GstAssessment, VolatilityBucket};
use crate::itr::ItrAssessment;
use crate::policy::PolicyTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredibilityBand {
    Strong,
    Moderate,
    Weak,
}

impl std::fmt::Display for CredibilityBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strong => write!(f, "Strong"),
            Self::Moderate => write!(f, "Moderate"),
            Self::Weak => write!(f, "Weak"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredibilityScore {
    /// 0–100 composite.
    pub score: u32,
    pub band: CredibilityBand,
    pub gst_score: u32,
    pub itr_score: u32,
    /// 0–100, higher is worse.
    pub mismatch_penalty: u32,
    /// Short, blunt reasons driving the score (≤5, deduped).
    pub reasons: Vec<String>,
}

/// Compute the composite. `None` when no declaration documents exist at all
/// — graceful degradation, not a zero score.
pub fn compute(
    gst: Option<&GstAssessment>,
    itr: Option<&ItrAssessment>,
    cross: Option<&CrossVerification>,
    policy: &PolicyTable,
) -> Option<CredibilityScore> {
    if gst.is_none() && itr.is_none() && cross.is_none() {
        return None;
    }

    let mut reasons: Vec<String> = Vec::new();

    let mut gst_penalty = 0u32;
    if let Some(gst) = gst {
        if gst.filing_gap_count > 0 {
            gst_penalty += (gst.filing_gap_count as u32 * 10).min(40);
            reasons.push("GST missed filings".to_string());
        }
        if gst.late_filing_count >= 2 {
            gst_penalty += (gst.late_filing_count as u32 * 5).min(20);
            reasons.push("Repeated GST late filings".to_string());
        }
        if gst.volatility_bucket == VolatilityBucket::High {
            gst_penalty += 15;
            reasons.push("High GST volatility".to_string());
        }
        if gst.consecutive_drop_months.len() >= 2 {
            gst_penalty += 20;
            reasons.push("GST consecutive turnover drop".to_string());
        }
    }

    let mut itr_penalty = 0u32;
    if let Some(itr) = itr {
        if itr.latest_margin_pct < policy.itr.margin_pct_min {
            itr_penalty += if itr.latest_margin_pct < 1.0 { 20 } else { 10 };
            reasons.push("Low ITR margin".to_string());
        }
        if itr.latest_profit_minor < 0 {
            itr_penalty += 25;
            reasons.push("ITR loss".to_string());
        }
        if itr.yoy_turnover_pct.unwrap_or(0.0) <= policy.itr.yoy_turnover_decline_pct {
            itr_penalty += 15;
            reasons.push("Severe YoY turnover decline".to_string());
        }
        if itr.latest_profit_minor > 0 && itr.latest_tax_paid_minor == 0 {
            itr_penalty += 10;
            reasons.push("Tax anomaly".to_string());
        }
    }

    let mut mismatch_penalty = 0u32;
    if let Some(cross) = cross {
        if let Some(v) = cross.bank_vs_gst_avg_diff_pct {
            if v > 10.0 {
                mismatch_penalty += 10;
                reasons.push("GST vs bank mismatch".to_string());
            }
            if v > 25.0 {
                mismatch_penalty += 15;
            }
            if v > 40.0 {
                mismatch_penalty += 15;
            }
        }
        if let Some(v) = cross.bank_vs_itr_avg_diff_pct {
            if v > 25.0 {
                mismatch_penalty += 10;
                reasons.push("ITR vs bank mismatch".to_string());
            }
            if v > 40.0 {
                mismatch_penalty += 10;
            }
        }
        if let Some(v) = cross.itr_vs_gst_annual_diff_pct {
            if v > 25.0 {
                mismatch_penalty += 10;
                reasons.push("ITR vs GST mismatch".to_string());
            }
            if v > 40.0 {
                mismatch_penalty += 10;
            }
        }
        if !cross.nil_return_months_with_bank_credits.is_empty() {
            mismatch_penalty += 25;
            reasons.push("NIL GST with bank credits".to_string());
        }
    }
    let mismatch_penalty = mismatch_penalty.min(100);

    let gst_score = 100u32.saturating_sub(gst_penalty);
    let itr_score = 100u32.saturating_sub(itr_penalty);
    let composite = (gst_score as f64 * policy.credibility.gst_weight
        + itr_score as f64 * policy.credibility.itr_weight
        + (100 - mismatch_penalty) as f64 * policy.credibility.mismatch_weight)
        .round()
        .clamp(0.0, 100.0) as u32;

    let band = if composite >= policy.credibility.strong_band_min {
        CredibilityBand::Strong
    } else if composite >= policy.credibility.moderate_band_min {
        CredibilityBand::Moderate
    } else {
        CredibilityBand::Weak
    };

    let mut deduped: Vec<String> = Vec::new();
    for reason in reasons {
        if !deduped.contains(&reason) {
            deduped.push(reason);
        }
    }
    deduped.truncate(5);

    Some(CredibilityScore {
        score: composite,
        band,
        gst_score,
        itr_score,
        mismatch_penalty,
        reasons: deduped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GstMonth, ItrYear};

    fn clean_gst() -> GstAssessment {
        let months: Vec<GstMonth> = (1..=6)
            .map(|m| GstMonth {
                month: format!("2024-{m:02}"),
                turnover_minor: 100_000_000,
                tax_paid_minor: 1_800_000,
                days_late: None,
            })
            .collect();
        crate::gst::assess(&months, &PolicyTable::default()).unwrap()
    }

    fn clean_itr() -> ItrAssessment {
        crate::itr::assess(
            &[ItrYear {
                year: "FY 2023-24".into(),
                turnover_minor: 1_200_000_000,
                profit_minor: 120_000_000,
                tax_paid_minor: 20_000_000,
            }],
            &PolicyTable::default(),
        )
        .unwrap()
    }

    #[test]
    fn no_docs_no_score() {
        assert!(compute(None, None, None, &PolicyTable::default()).is_none());
    }

    #[test]
    fn clean_docs_score_strong() {
        let gst = clean_gst();
        let itr = clean_itr();
        let score = compute(Some(&gst), Some(&itr), None, &PolicyTable::default()).unwrap();
        assert_eq!(score.gst_score, 100);
        assert_eq!(score.itr_score, 100);
        assert_eq!(score.mismatch_penalty, 0);
        assert_eq!(score.score, 100);
        assert_eq!(score.band, CredibilityBand::Strong);
        assert!(score.reasons.is_empty());
    }

    #[test]
    fn gst_gaps_drag_score() {
        let months = vec![
            GstMonth { month: "2024-01".into(), turnover_minor: 100_000_000, tax_paid_minor: 0, days_late: None },
            GstMonth { month: "2024-04".into(), turnover_minor: 100_000_000, tax_paid_minor: 0, days_late: None },
        ];
        let gst = crate::gst::assess(&months, &PolicyTable::default()).unwrap();
        let score = compute(Some(&gst), None, None, &PolicyTable::default()).unwrap();
        // two gap months: 20 penalty
        assert_eq!(score.gst_score, 80);
        assert!(score.reasons.contains(&"GST missed filings".to_string()));
    }

    #[test]
    fn mismatch_penalty_ladder() {
        let gst = clean_gst();
        let bank: std::collections::BTreeMap<String, i64> = gst
            .months
            .iter()
            .map(|m| (m.month.clone(), m.turnover_minor * 2))
            .collect();
        let cross = crate::cross::assess(
            &bank,
            200_000_000.0,
            Some(&gst),
            None,
            &PolicyTable::default(),
        )
        .unwrap();
        // 100% average mismatch: 10 + 15 + 15 = 40 penalty
        let score = compute(Some(&gst), None, Some(&cross), &PolicyTable::default()).unwrap();
        assert_eq!(score.mismatch_penalty, 40);
        assert_eq!(score.score, 92);
    }

    #[test]
    fn weak_band_under_stack_of_problems() {
        let months = vec![
            GstMonth { month: "2024-01".into(), turnover_minor: 100_000_000, tax_paid_minor: 0, days_late: Some(10) },
            GstMonth { month: "2024-02".into(), turnover_minor: 0, tax_paid_minor: 0, days_late: Some(20) },
            GstMonth { month: "2024-05".into(), turnover_minor: 5_000_000, tax_paid_minor: 0, days_late: None },
        ];
        let gst = crate::gst::assess(&months, &PolicyTable::default()).unwrap();
        let itr = crate::itr::assess(
            &[ItrYear {
                year: "FY 2023-24".into(),
                turnover_minor: 1_200_000_000,
                profit_minor: -10_000_000,
                tax_paid_minor: 0,
            }],
            &PolicyTable::default(),
        )
        .unwrap();
        let bank: std::collections::BTreeMap<String, i64> =
            [("2024-02".to_string(), 80_000_000)].into();
        let cross = crate::cross::assess(
            &bank,
            80_000_000.0,
            Some(&gst),
            Some(&itr),
            &PolicyTable::default(),
        )
        .unwrap();
        let score = compute(Some(&gst), Some(&itr), Some(&cross), &PolicyTable::default()).unwrap();
        assert_eq!(score.band, CredibilityBand::Weak);
        assert!(score.reasons.len() <= 5);
    }
}
