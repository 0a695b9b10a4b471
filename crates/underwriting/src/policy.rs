//! Versioned policy table.
//!
//! Every threshold the rule families compare against lives here, named.
//! `Default` is the shipped table; deployments override via TOML. All
//! amounts are minor units, all percentages are 0–100 unless named `ratio`.

use serde::Deserialize;

use crate::error::UnderwritingError;

#[derive(Debug, Clone, Deserialize)]
pub struct PolicyTable {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub bank: BankPolicy,
    #[serde(default)]
    pub gst: GstPolicy,
    #[serde(default)]
    pub itr: ItrPolicy,
    #[serde(default)]
    pub cross: CrossPolicy,
    #[serde(default)]
    pub credibility: CredibilityPolicy,
    #[serde(default)]
    pub pricing: PricingPolicy,
}

fn default_version() -> String {
    "underwriting-policy/1".to_string()
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            version: default_version(),
            bank: BankPolicy::default(),
            gst: GstPolicy::default(),
            itr: ItrPolicy::default(),
            cross: CrossPolicy::default(),
            credibility: CredibilityPolicy::default(),
            pricing: PricingPolicy::default(),
        }
    }
}

impl PolicyTable {
    pub fn from_toml(toml_str: &str) -> Result<Self, UnderwritingError> {
        toml::from_str(toml_str).map_err(|e| UnderwritingError::ConfigParse(e.to_string()))
    }
}

macro_rules! policy_block {
    ($name:ident { $($field:ident : $ty:ty = $value:expr),+ $(,)? }) => {
        #[derive(Debug, Clone, Deserialize)]
        #[serde(default)]
        pub struct $name {
            $(pub $field: $ty),+
        }

        impl Default for $name {
            fn default() -> Self {
                Self { $($field: $value),+ }
            }
        }
    };
}

policy_block!(BankPolicy {
    min_statement_days: i64 = 90,
    top1_credit_pct_max: f64 = 40.0,
    top3_credit_pct_max: f64 = 70.0,
    low_balance_ratio_max: f64 = 0.2,
    low_balance_floor_minor: i64 = 2_500_000,           // ₹25,000
    low_balance_pct_of_monthly_credits: f64 = 0.05,
    penalty_count_max: usize = 2,
    bounce_count_max: usize = 1,
    estimated_lenders_max: usize = 2,
    same_day_spend_ratio_max: f64 = 0.85,
    fixed_obligation_ratio_max: f64 = 0.55,
    volatility_medium_cv: f64 = 0.35,
    volatility_high_cv: f64 = 0.75,
    heat_rows_max: usize = 15,
    recurring_amount_max_deviation: f64 = 0.12,
    lender_ticket_min_minor: i64 = 2_500_000,           // ₹25,000
    lender_ticket_max_minor: i64 = 50_000_000,          // ₹5,00,000
    rollover_amount_max_delta: f64 = 0.08,
    rollover_max_gap_days: i64 = 2,
    weekly_gap_min_days: i64 = 5,
    weekly_gap_max_days: i64 = 9,
    weekly_gap_count_min: usize = 4,
});

policy_block!(GstPolicy {
    volatility_medium_cv: f64 = 0.35,
    volatility_high_cv: f64 = 0.75,
    seasonality_high_top3_share: f64 = 0.5,
    seasonality_medium_top3_share: f64 = 0.35,
    month_drop_pct: f64 = 30.0,
    late_filings_max: usize = 1,
    filing_gaps_max: usize = 0,
});

policy_block!(ItrPolicy {
    margin_pct_min: f64 = 3.0,
    yoy_turnover_decline_pct: f64 = -30.0,
});

policy_block!(CrossPolicy {
    diff_ok_pct_max: f64 = 10.0,
    diff_review_pct_max: f64 = 25.0,
    bank_vs_gst_avg_diff_pct_max: f64 = 25.0,
    bank_vs_itr_avg_diff_pct_max: f64 = 25.0,
    itr_vs_gst_annual_diff_pct_max: f64 = 25.0,
    nil_material_credits_min_minor: i64 = 0,
    annualize_min_months: usize = 6,
});

policy_block!(CredibilityPolicy {
    gst_weight: f64 = 0.4,
    itr_weight: f64 = 0.4,
    mismatch_weight: f64 = 0.2,
    strong_band_min: u32 = 75,
    moderate_band_min: u32 = 55,
});

policy_block!(PricingPolicy {
    base_apr: f64 = 30.0,
    apr_min: f64 = 18.0,
    apr_max: f64 = 72.0,
    grade_premiums: [f64; 4] = [0.0, 6.0, 12.0, 18.0],
    competition_premium: f64 = 6.0,
    discipline_premium: f64 = 6.0,
    volatility_premium: f64 = 4.0,
    velocity_premium: f64 = 4.0,
    exposure_factors: [f64; 4] = [1.0, 0.85, 0.7, 0.55],
    tenure_ladder_months: [u32; 4] = [12, 10, 8, 6],
    upfront_pcts: [f64; 4] = [0.12, 0.18, 0.28, 0.38],
    upfront_stacking_add: f64 = 0.07,
    upfront_low_balance_add: f64 = 0.03,
    upfront_pct_min: f64 = 0.10,
    upfront_pct_max: f64 = 0.60,
    requested_exposure_min_minor: i64 = 500_000_000,     // ₹50,00,000
    requested_exposure_max_minor: i64 = 10_000_000_000,  // ₹10,00,00,000
    recommended_exposure_min_minor: i64 = 100_000_000,   // ₹10,00,000
    cash_cap_multiple_of_monthly_credits: f64 = 1.1,
    cash_cap_floor_minor: i64 = 50_000_000,              // ₹5,00,000
    collection_amount_min_minor: i64 = 100_000,          // ₹1,000
    max_tenure_months_cap: u32 = 12,
    stage_1_share: f64 = 0.6,
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_defaults() {
        let policy = PolicyTable::default();
        assert_eq!(policy.bank.min_statement_days, 90);
        assert_eq!(policy.cross.diff_ok_pct_max, 10.0);
        assert_eq!(policy.pricing.grade_premiums, [0.0, 6.0, 12.0, 18.0]);
        assert!(policy.version.starts_with("underwriting-policy/"));
    }

    #[test]
    fn toml_partial_override() {
        let policy = PolicyTable::from_toml(
            r#"
version = "underwriting-policy/2"

[bank]
penalty_count_max = 4

[cross]
diff_review_pct_max = 20.0
"#,
        )
        .unwrap();
        assert_eq!(policy.bank.penalty_count_max, 4);
        // untouched fields keep shipped values
        assert_eq!(policy.bank.bounce_count_max, 1);
        assert_eq!(policy.cross.diff_review_pct_max, 20.0);
        assert_eq!(policy.cross.diff_ok_pct_max, 10.0);
    }

    #[test]
    fn toml_rejects_bad_shape() {
        assert!(PolicyTable::from_toml("[bank]\npenalty_count_max = \"many\"").is_err());
    }
}
