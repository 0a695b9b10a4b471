//! ITR turnover/profit sanity assessment and rule family.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::format::format_inr;
use crate::model::{ItrYear, RuleCategory, RuleOutcome, RuleSpec, Severity};
use crate::policy::PolicyTable;

/// Order key for FY/AY labels: the first `20xx` token in the label.
fn year_key(label: &str) -> i32 {
    let bytes = label.as_bytes();
    for i in 0..bytes.len().saturating_sub(3) {
        if bytes[i] == b'2'
            && bytes[i + 1] == b'0'
            && bytes[i + 2].is_ascii_digit()
            && bytes[i + 3].is_ascii_digit()
        {
            return 2000 + (bytes[i + 2] - b'0') as i32 * 10 + (bytes[i + 3] - b'0') as i32;
        }
    }
    0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItrAssessment {
    /// Years sorted ascending by extracted year number.
    pub years: Vec<ItrYear>,
    pub latest_turnover_minor: i64,
    pub latest_profit_minor: i64,
    pub latest_margin_pct: f64,
    pub latest_tax_paid_minor: i64,
    pub yoy_turnover_pct: Option<f64>,
    pub yoy_profit_pct: Option<f64>,
    pub flags: Vec<String>,
    pub commentary: String,
}

/// Assess declared ITR years. `None` when nothing usable was supplied.
pub fn assess(years_raw: &[ItrYear], policy: &PolicyTable) -> Option<ItrAssessment> {
    let mut years: Vec<ItrYear> = years_raw
        .iter()
        .filter(|y| y.turnover_minor >= 0)
        .cloned()
        .collect();
    if years.is_empty() {
        return None;
    }
    years.sort_by_key(|y| year_key(&y.year));

    let latest = years.last().unwrap().clone();
    let latest_margin_pct = if latest.turnover_minor > 0 {
        latest.profit_minor as f64 / latest.turnover_minor as f64 * 100.0
    } else {
        0.0
    };

    let prev = years
        .iter()
        .rev()
        .find(|y| year_key(&y.year) < year_key(&latest.year));

    let yoy_turnover_pct = prev.and_then(|p| {
        (p.turnover_minor > 0).then(|| {
            (latest.turnover_minor - p.turnover_minor) as f64 / p.turnover_minor as f64 * 100.0
        })
    });
    let yoy_profit_pct = prev.and_then(|p| {
        (p.profit_minor != 0).then(|| {
            (latest.profit_minor - p.profit_minor) as f64 / p.profit_minor.abs() as f64 * 100.0
        })
    });

    let mut flags = Vec::new();
    if latest_margin_pct < policy.itr.margin_pct_min {
        flags.push("ITR_MARGIN_THIN".to_string());
    }
    if latest.profit_minor < 0 {
        flags.push("ITR_LOSS".to_string());
    }
    if yoy_turnover_pct.unwrap_or(0.0) <= policy.itr.yoy_turnover_decline_pct {
        flags.push("ITR_INCOME_DECLINE".to_string());
    }
    if latest.profit_minor > 0 && latest.tax_paid_minor == 0 {
        flags.push("ITR_TAX_ANOMALY".to_string());
    }

    let mut commentary = vec![format!(
        "ITR latest turnover ₹{}, profit ₹{} (margin {:.1}%).",
        format_inr(latest.turnover_minor),
        format_inr(latest.profit_minor),
        latest_margin_pct,
    )];
    if let Some(yoy) = yoy_turnover_pct {
        commentary.push(format!("YoY turnover {:.1}%.", yoy));
    }
    if let Some(yoy) = yoy_profit_pct {
        commentary.push(format!("YoY profit {:.1}%.", yoy));
    }
    if latest_margin_pct < policy.itr.margin_pct_min {
        commentary
            .push("Margin is thin: higher default sensitivity to inflow disruption.".to_string());
    }
    if latest.profit_minor < 0 {
        commentary.push("Loss declared: collections must be control-first.".to_string());
    }

    Some(ItrAssessment {
        latest_turnover_minor: latest.turnover_minor,
        latest_profit_minor: latest.profit_minor,
        latest_margin_pct,
        latest_tax_paid_minor: latest.tax_paid_minor,
        yoy_turnover_pct,
        yoy_profit_pct,
        years,
        flags,
        commentary: commentary.join(" "),
    })
}

/// ITR rule family. YoY rules only run when a prior year exists; the tax
/// anomaly rule only runs when a profit was declared.
pub fn rules(itr: &ItrAssessment, policy: &PolicyTable) -> Vec<RuleOutcome> {
    let mut outcomes = vec![
        RuleSpec {
            id: "ITR-01",
            name: "ITR margin low",
            category: RuleCategory::Itr,
            severity: Severity::Medium,
            score_delta_fail: -10,
            thresholds: json!({ "margin_pct_min": policy.itr.margin_pct_min }),
            reason_fail: "Declared margin is low. Any disruption will hit collections quickly. Prefer weekly collections and cap exposure.",
            reason_pass: "Margin is not critically low.",
        }
        .evaluate(
            itr.latest_margin_pct >= policy.itr.margin_pct_min,
            json!({
                "latest_margin_pct": itr.latest_margin_pct,
                "latest_turnover_minor": itr.latest_turnover_minor,
                "latest_profit_minor": itr.latest_profit_minor,
            }),
        ),
        RuleSpec {
            id: "ITR-02",
            name: "ITR loss business",
            category: RuleCategory::Itr,
            severity: Severity::High,
            score_delta_fail: -20,
            thresholds: json!({ "latest_profit_min": 0 }),
            reason_fail: "Declared loss in ITR. Collections must be control-first (tight tenure, high upfront, staged).",
            reason_pass: "No loss declared in the latest ITR input.",
        }
        .evaluate(
            itr.latest_profit_minor >= 0,
            json!({
                "latest_profit_minor": itr.latest_profit_minor,
                "latest_turnover_minor": itr.latest_turnover_minor,
            }),
        ),
    ];

    if let Some(yoy) = itr.yoy_turnover_pct {
        outcomes.push(
            RuleSpec {
                id: "ITR-03",
                name: "YoY turnover decline",
                category: RuleCategory::Itr,
                severity: Severity::High,
                score_delta_fail: -16,
                thresholds: json!({
                    "yoy_turnover_pct_min": policy.itr.yoy_turnover_decline_pct,
                }),
                reason_fail: "YoY turnover decline is severe. Treat as stress; reduce exposure and shorten tenure aggressively.",
                reason_pass: "YoY turnover decline not flagged as severe.",
            }
            .evaluate(
                yoy > policy.itr.yoy_turnover_decline_pct,
                json!({ "yoy_turnover_pct": yoy }),
            ),
        );
    }

    if itr.latest_profit_minor > 0 {
        outcomes.push(
            RuleSpec {
                id: "ITR-06",
                name: "Tax anomaly (profit but zero tax paid)",
                category: RuleCategory::Itr,
                severity: Severity::High,
                score_delta_fail: -12,
                thresholds: json!({ "tax_paid_min_if_profit": 1 }),
                reason_fail: "Profit declared but tax paid is zero. Treat declared statements as weak evidence; demand computation and proof.",
                reason_pass: "Tax paid is consistent with declared profit.",
            }
            .evaluate(
                itr.latest_tax_paid_minor > 0,
                json!({
                    "latest_profit_minor": itr.latest_profit_minor,
                    "latest_tax_paid_minor": itr.latest_tax_paid_minor,
                }),
            ),
        );
    }

    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn year(label: &str, turnover_rupees: i64, profit_rupees: i64, tax_rupees: i64) -> ItrYear {
        ItrYear {
            year: label.into(),
            turnover_minor: turnover_rupees * 100,
            profit_minor: profit_rupees * 100,
            tax_paid_minor: tax_rupees * 100,
        }
    }

    #[test]
    fn year_labels_order() {
        assert_eq!(year_key("FY 2023-24"), 2023);
        assert_eq!(year_key("AY2024"), 2024);
        assert_eq!(year_key("no year"), 0);
    }

    #[test]
    fn healthy_itr_passes() {
        let years = vec![
            year("FY 2022-23", 10_000_000, 900_000, 120_000),
            year("FY 2023-24", 12_000_000, 1_100_000, 150_000),
        ];
        let itr = assess(&years, &PolicyTable::default()).unwrap();
        assert_eq!(itr.latest_turnover_minor, 1_200_000_000);
        assert!((itr.latest_margin_pct - 9.1667).abs() < 0.01);
        assert_eq!(itr.yoy_turnover_pct.map(|v| v.round()), Some(20.0));
        assert!(itr.flags.is_empty());

        let outcomes = rules(&itr, &PolicyTable::default());
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes.iter().all(|r| r.passed));
    }

    #[test]
    fn single_year_skips_yoy_rule() {
        let years = vec![year("FY 2023-24", 10_000_000, 500_000, 60_000)];
        let itr = assess(&years, &PolicyTable::default()).unwrap();
        assert!(itr.yoy_turnover_pct.is_none());
        let outcomes = rules(&itr, &PolicyTable::default());
        assert!(outcomes.iter().all(|r| r.id != "ITR-03"));
    }

    #[test]
    fn loss_and_thin_margin_flagged() {
        let years = vec![year("FY 2023-24", 10_000_000, -200_000, 0)];
        let itr = assess(&years, &PolicyTable::default()).unwrap();
        assert!(itr.flags.contains(&"ITR_LOSS".to_string()));
        assert!(itr.flags.contains(&"ITR_MARGIN_THIN".to_string()));

        let outcomes = rules(&itr, &PolicyTable::default());
        assert!(!outcomes.iter().find(|r| r.id == "ITR-01").unwrap().passed);
        assert!(!outcomes.iter().find(|r| r.id == "ITR-02").unwrap().passed);
        // no profit, so the tax anomaly rule does not run
        assert!(outcomes.iter().all(|r| r.id != "ITR-06"));
    }

    #[test]
    fn severe_decline_fails_yoy_rule() {
        let years = vec![
            year("FY 2022-23", 10_000_000, 800_000, 90_000),
            year("FY 2023-24", 6_000_000, 400_000, 40_000),
        ];
        let itr = assess(&years, &PolicyTable::default()).unwrap();
        assert_eq!(itr.yoy_turnover_pct.map(|v| v.round()), Some(-40.0));
        let outcomes = rules(&itr, &PolicyTable::default());
        assert!(!outcomes.iter().find(|r| r.id == "ITR-03").unwrap().passed);
    }

    #[test]
    fn tax_anomaly_detected() {
        let years = vec![year("FY 2023-24", 10_000_000, 900_000, 0)];
        let itr = assess(&years, &PolicyTable::default()).unwrap();
        assert!(itr.flags.contains(&"ITR_TAX_ANOMALY".to_string()));
        let outcomes = rules(&itr, &PolicyTable::default());
        assert!(!outcomes.iter().find(|r| r.id == "ITR-06").unwrap().passed);
    }

    #[test]
    fn empty_yields_none() {
        assert!(assess(&[], &PolicyTable::default()).is_none());
    }
}
