//! GST filing-discipline assessment and rule family.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::format::format_inr;
use crate::model::{GstMonth, RuleCategory, RuleOutcome, RuleSpec, Severity};
use crate::policy::PolicyTable;

/// Linear month index for `YYYY-MM` keys; `None` for malformed keys.
pub fn month_index(ym: &str) -> Option<i32> {
    let (y, m) = ym.trim().split_once('-')?;
    let year: i32 = y.parse().ok()?;
    let month: i32 = m.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some(year * 12 + (month - 1))
}

pub fn month_from_index(index: i32) -> String {
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) + 1;
    format!("{year:04}-{month:02}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityBucket {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for VolatilityBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

pub fn volatility_bucket(cv: f64, medium: f64, high: f64) -> VolatilityBucket {
    if cv < medium {
        VolatilityBucket::Low
    } else if cv < high {
        VolatilityBucket::Medium
    } else {
        VolatilityBucket::High
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstAssessment {
    /// Valid months, sorted ascending by month key.
    pub months: Vec<GstMonth>,
    pub avg_monthly_turnover_minor: i64,
    pub volatility_score: f64,
    pub volatility_bucket: VolatilityBucket,
    pub seasonality_bucket: VolatilityBucket,
    pub filing_gap_count: usize,
    pub missing_months: Vec<String>,
    pub late_filing_count: usize,
    pub late_months: Vec<String>,
    /// Months where turnover dropped past the policy threshold for the
    /// second consecutive month.
    pub consecutive_drop_months: Vec<String>,
    pub flags: Vec<String>,
    pub commentary: String,
}

/// Assess declared GST months. `None` when nothing usable was supplied.
pub fn assess(months_raw: &[GstMonth], policy: &PolicyTable) -> Option<GstAssessment> {
    let mut months: Vec<GstMonth> = months_raw
        .iter()
        .filter(|m| month_index(&m.month).is_some())
        .cloned()
        .collect();
    if months.is_empty() {
        return None;
    }
    months.sort_by(|a, b| a.month.cmp(&b.month));

    let values: Vec<f64> = months
        .iter()
        .map(|m| m.turnover_minor as f64)
        .filter(|v| *v > 0.0)
        .collect();
    let mean = if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    };
    let cv = if values.len() < 2 || mean <= 0.0 {
        0.0
    } else {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
            / (values.len() - 1) as f64;
        variance.sqrt() / mean
    };
    let volatility = volatility_bucket(cv, policy.gst.volatility_medium_cv, policy.gst.volatility_high_cv);

    let total: i64 = months.iter().map(|m| m.turnover_minor.max(0)).sum();
    let mut sorted_turnover: Vec<i64> = months.iter().map(|m| m.turnover_minor.max(0)).collect();
    sorted_turnover.sort_unstable_by(|a, b| b.cmp(a));
    let top3: i64 = sorted_turnover.iter().take(3).sum();
    let top3_share = if total > 0 {
        top3 as f64 / total as f64
    } else {
        0.0
    };
    let seasonality = if top3_share >= policy.gst.seasonality_high_top3_share {
        VolatilityBucket::High
    } else if top3_share >= policy.gst.seasonality_medium_top3_share {
        VolatilityBucket::Medium
    } else {
        VolatilityBucket::Low
    };

    let indices: Vec<i32> = months.iter().filter_map(|m| month_index(&m.month)).collect();
    let missing_months = missing_between(&indices);
    let filing_gap_count = missing_months.len();

    let late_months: Vec<String> = months
        .iter()
        .filter(|m| m.days_late.unwrap_or(0) > 0)
        .map(|m| m.month.clone())
        .collect();
    let late_filing_count = late_months.len();

    let consecutive_drop_months = consecutive_drops(&months, policy.gst.month_drop_pct);

    let avg_monthly_turnover_minor = mean.round().max(0.0) as i64;

    let mut flags = Vec::new();
    if filing_gap_count > 0 {
        flags.push("GST_MISSED_FILINGS".to_string());
    }
    if late_filing_count >= 2 {
        flags.push("GST_LATE_FILINGS".to_string());
    }
    if volatility == VolatilityBucket::High {
        flags.push("GST_VOLATILITY_HIGH".to_string());
    }
    if consecutive_drop_months.len() >= 2 {
        flags.push("GST_CONSECUTIVE_DROP".to_string());
    }

    let mut commentary = vec![format!(
        "GST avg monthly turnover ₹{}.",
        format_inr(avg_monthly_turnover_minor)
    )];
    if filing_gap_count > 0 {
        commentary.push(format!("Missed filings: {filing_gap_count}."));
    }
    if late_filing_count > 0 {
        commentary.push(format!("Late filings: {late_filing_count}."));
    }
    if volatility == VolatilityBucket::High {
        commentary.push(format!("High turnover volatility (CV {:.2}).", cv));
    }
    if consecutive_drop_months.len() >= 2 {
        commentary.push("Consecutive turnover drop risk detected.".to_string());
    }

    Some(GstAssessment {
        months,
        avg_monthly_turnover_minor,
        volatility_score: cv,
        volatility_bucket: volatility,
        seasonality_bucket: seasonality,
        filing_gap_count,
        missing_months,
        late_filing_count,
        late_months,
        consecutive_drop_months,
        flags,
        commentary: commentary.join(" "),
    })
}

/// Months absent from the contiguous span covered by the filed months.
fn missing_between(indices: &[i32]) -> Vec<String> {
    if indices.len() < 2 {
        return Vec::new();
    }
    let min = *indices.iter().min().unwrap();
    let max = *indices.iter().max().unwrap();
    let present: std::collections::BTreeSet<i32> = indices.iter().copied().collect();
    (min..=max)
        .filter(|i| !present.contains(i))
        .take(24)
        .map(month_from_index)
        .collect()
}

/// Months whose turnover dropped past `drop_pct` vs the previous month, for
/// the second month in a row.
fn consecutive_drops(months: &[GstMonth], drop_pct: f64) -> Vec<String> {
    let mut drop_months = Vec::new();
    for pair in months.windows(2) {
        let prev = pair[0].turnover_minor.max(0) as f64;
        let cur = pair[1].turnover_minor.max(0) as f64;
        if prev <= 0.0 {
            continue;
        }
        if (prev - cur) / prev * 100.0 >= drop_pct {
            drop_months.push(pair[1].month.clone());
        }
    }
    let mut consecutive: Vec<String> = drop_months
        .iter()
        .filter(|m| {
            month_index(m)
                .map(|i| drop_months.contains(&month_from_index(i - 1)))
                .unwrap_or(false)
        })
        .cloned()
        .collect();
    consecutive.dedup();
    consecutive.truncate(24);
    consecutive
}

/// GST rule family. One outcome per rule, passed or failed.
pub fn rules(gst: &GstAssessment, policy: &PolicyTable) -> Vec<RuleOutcome> {
    vec![
        RuleSpec {
            id: "GST-01",
            name: "Missed GST filings (gaps)",
            category: RuleCategory::Gst,
            severity: Severity::High,
            score_delta_fail: -18,
            thresholds: json!({ "missed_months_max": policy.gst.filing_gaps_max }),
            reason_fail: "Missed GST filings weaken enforceability and signal compliance risk. Structure tighter and demand proof before exposure.",
            reason_pass: "No missed GST filing gaps in the provided month range.",
        }
        .evaluate(
            gst.filing_gap_count <= policy.gst.filing_gaps_max,
            json!({
                "missed_months_count": gst.filing_gap_count,
                "missing_months": gst.missing_months,
            }),
        ),
        RuleSpec {
            id: "GST-02",
            name: "Repeated late GST filings",
            category: RuleCategory::Gst,
            severity: Severity::Medium,
            score_delta_fail: -10,
            thresholds: json!({ "late_months_max": policy.gst.late_filings_max }),
            reason_fail: "Repeated late filing indicates weak compliance discipline. Increase control and reduce discretionary exposure.",
            reason_pass: "Late filing count is within tolerance.",
        }
        .evaluate(
            gst.late_filing_count <= policy.gst.late_filings_max,
            json!({
                "late_months_count": gst.late_filing_count,
                "late_months": gst.late_months,
            }),
        ),
        RuleSpec {
            id: "GST-03",
            name: "GST turnover volatility (high)",
            category: RuleCategory::Gst,
            severity: Severity::High,
            score_delta_fail: -12,
            thresholds: json!({ "volatility_bucket_max": "Medium" }),
            reason_fail: "High turnover volatility increases collection miss probability. Prefer weekly collections and staged disbursement.",
            reason_pass: "GST turnover volatility is not flagged as high.",
        }
        .evaluate(
            gst.volatility_bucket != VolatilityBucket::High,
            json!({
                "volatility_score": gst.volatility_score,
                "volatility_bucket": gst.volatility_bucket.to_string(),
                "seasonality_bucket": gst.seasonality_bucket.to_string(),
            }),
        ),
        RuleSpec {
            id: "GST-04",
            name: "Consecutive turnover drop",
            category: RuleCategory::Gst,
            severity: Severity::Critical,
            score_delta_fail: -22,
            thresholds: json!({
                "drop_pct_min": policy.gst.month_drop_pct,
                "consecutive_months_min": 2,
            }),
            reason_fail: "Consecutive sharp turnover drop indicates active stress. Cut exposure, shorten tenure, and demand proof of recovery.",
            reason_pass: "No consecutive sharp turnover drop detected.",
        }
        .evaluate(
            gst.consecutive_drop_months.len() < 2,
            json!({ "consecutive_drop_months": gst.consecutive_drop_months }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(ym: &str, turnover_rupees: i64) -> GstMonth {
        GstMonth {
            month: ym.into(),
            turnover_minor: turnover_rupees * 100,
            tax_paid_minor: 0,
            days_late: None,
        }
    }

    #[test]
    fn month_index_round_trip() {
        assert_eq!(month_index("2024-01"), Some(2024 * 12));
        assert_eq!(month_index("2024-13"), None);
        assert_eq!(month_index("garbage"), None);
        assert_eq!(month_from_index(month_index("2023-12").unwrap()), "2023-12");
    }

    #[test]
    fn clean_filing_history() {
        let months: Vec<GstMonth> = (1..=6)
            .map(|m| month(&format!("2024-{m:02}"), 1_000_000))
            .collect();
        let gst = assess(&months, &PolicyTable::default()).unwrap();
        assert_eq!(gst.filing_gap_count, 0);
        assert_eq!(gst.late_filing_count, 0);
        assert_eq!(gst.volatility_bucket, VolatilityBucket::Low);
        assert_eq!(gst.avg_monthly_turnover_minor, 100_000_000);
        assert!(gst.flags.is_empty());

        let outcomes = rules(&gst, &PolicyTable::default());
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes.iter().all(|r| r.passed));
    }

    #[test]
    fn filing_gaps_detected() {
        let months = vec![
            month("2024-01", 1_000_000),
            month("2024-02", 1_000_000),
            month("2024-05", 1_000_000),
        ];
        let gst = assess(&months, &PolicyTable::default()).unwrap();
        assert_eq!(gst.filing_gap_count, 2);
        assert_eq!(gst.missing_months, vec!["2024-03", "2024-04"]);

        let outcomes = rules(&gst, &PolicyTable::default());
        let gap_rule = outcomes.iter().find(|r| r.id == "GST-01").unwrap();
        assert!(!gap_rule.passed);
        assert_eq!(gap_rule.score_delta, -18);
    }

    #[test]
    fn late_filings_counted() {
        let mut months = vec![
            month("2024-01", 1_000_000),
            month("2024-02", 1_000_000),
            month("2024-03", 1_000_000),
        ];
        months[0].days_late = Some(12);
        months[2].days_late = Some(3);
        let gst = assess(&months, &PolicyTable::default()).unwrap();
        assert_eq!(gst.late_filing_count, 2);
        assert_eq!(gst.late_months, vec!["2024-01", "2024-03"]);
        assert!(gst.flags.contains(&"GST_LATE_FILINGS".to_string()));

        let outcomes = rules(&gst, &PolicyTable::default());
        assert!(!outcomes.iter().find(|r| r.id == "GST-02").unwrap().passed);
    }

    #[test]
    fn consecutive_drop_flagged() {
        let months = vec![
            month("2024-01", 1_000_000),
            month("2024-02", 600_000),
            month("2024-03", 300_000),
        ];
        let gst = assess(&months, &PolicyTable::default()).unwrap();
        // Feb dropped 40%, Mar dropped 50% again; only Mar is the second
        // consecutive drop month.
        assert_eq!(gst.consecutive_drop_months, vec!["2024-03"]);

        let outcomes = rules(&gst, &PolicyTable::default());
        let drop_rule = outcomes.iter().find(|r| r.id == "GST-04").unwrap();
        // policy asks for >= 2 consecutive drop months before failing
        assert!(drop_rule.passed);
    }

    #[test]
    fn volatile_turnover_bucketed_high() {
        let months = vec![
            month("2024-01", 100_000),
            month("2024-02", 2_000_000),
            month("2024-03", 50_000),
            month("2024-04", 3_000_000),
        ];
        let gst = assess(&months, &PolicyTable::default()).unwrap();
        assert_eq!(gst.volatility_bucket, VolatilityBucket::High);
        let outcomes = rules(&gst, &PolicyTable::default());
        assert!(!outcomes.iter().find(|r| r.id == "GST-03").unwrap().passed);
    }

    #[test]
    fn empty_or_malformed_yields_none() {
        assert!(assess(&[], &PolicyTable::default()).is_none());
        assert!(assess(&[month("not-a-month", 5)], &PolicyTable::default()).is_none());
    }
}
