use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::credibility::CredibilityScore;
use crate::cross::CrossVerification;
use crate::gst::GstAssessment;
use crate::itr::ItrAssessment;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One reconciled bank transaction, as handed over by the statement
/// autopilot. Amounts are non-negative minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankTransaction {
    pub date: NaiveDate,
    pub narration: String,
    #[serde(default)]
    pub debit_minor: i64,
    #[serde(default)]
    pub credit_minor: i64,
    #[serde(default)]
    pub balance_minor: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnderwritingParams {
    /// Requested exposure (minor units). Clamped to the policy band.
    pub requested_exposure_minor: i64,
    /// Max tenure constraint (months). Hard-capped by policy.
    pub max_tenure_months: u32,
}

impl Default for UnderwritingParams {
    fn default() -> Self {
        Self {
            requested_exposure_minor: 500_000_000, // ₹50,00,000
            max_tenure_months: 12,
        }
    }
}

/// One declared GST month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GstMonth {
    /// `YYYY-MM`
    pub month: String,
    pub turnover_minor: i64,
    #[serde(default)]
    pub tax_paid_minor: i64,
    #[serde(default)]
    pub days_late: Option<u32>,
}

/// One declared ITR year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItrYear {
    /// FY/AY label, kept as-is; the first `20xx` token orders years.
    pub year: String,
    pub turnover_minor: i64,
    pub profit_minor: i64,
    #[serde(default)]
    pub tax_paid_minor: i64,
}

/// Optional declaration documents. Each side is independently
/// absent-tolerant; absence is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocsInput {
    #[serde(default)]
    pub gst_months: Vec<GstMonth>,
    #[serde(default)]
    pub itr_years: Vec<ItrYear>,
}

// ---------------------------------------------------------------------------
// Rule log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Snapshot,
    Concentration,
    Liquidity,
    Discipline,
    Competition,
    Velocity,
    Obligations,
    Gst,
    Itr,
    CrossVerification,
}

/// One evaluated rule. Every rule run contributes exactly one outcome,
/// passed or failed; the log is append-only and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub id: String,
    pub name: String,
    pub category: RuleCategory,
    pub severity: Severity,
    pub passed: bool,
    pub score_delta: i32,
    pub thresholds: serde_json::Value,
    pub evidence: serde_json::Value,
    pub reason: String,
}

/// Declarative rule description; `evaluate` turns it into an outcome.
/// The score delta applies only on failure.
pub struct RuleSpec<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub category: RuleCategory,
    pub severity: Severity,
    pub score_delta_fail: i32,
    pub thresholds: serde_json::Value,
    pub reason_fail: &'a str,
    pub reason_pass: &'a str,
}

impl RuleSpec<'_> {
    pub fn evaluate(self, passed: bool, evidence: serde_json::Value) -> RuleOutcome {
        RuleOutcome {
            id: self.id.to_string(),
            name: self.name.to_string(),
            category: self.category,
            severity: self.severity,
            passed,
            score_delta: if passed { 0 } else { self.score_delta_fail },
            thresholds: self.thresholds,
            evidence,
            reason: if passed {
                self.reason_pass.to_string()
            } else {
                self.reason_fail.to_string()
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Metrics + analysis blocks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub key: String,
    pub value: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}

impl Metric {
    pub fn new(key: &str, value: f64, unit: &str) -> Self {
        Self {
            key: key.to_string(),
            value,
            unit: unit.to_string(),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// Counterparty heat-map row for one side of the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatMapRow {
    pub counterparty: String,
    pub nature: String,
    pub freq: usize,
    pub avg_minor: i64,
    pub total_minor: i64,
    pub pct_of_total: f64,
    /// Credit side only: High/Medium/Low dependency on this source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<String>,
    /// Debit side only: obligation priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_level: Option<String>,
    /// Debit side only: whether the outflow looks deferrable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flexi: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceTxn {
    pub date: NaiveDate,
    pub narration: String,
    pub direction: String,
    pub amount_minor: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateLenderCompetition {
    pub estimated_lenders: usize,
    pub approx_monthly_debt_load_minor: i64,
    pub weekly_collections_detected: bool,
    pub rollover_recycling_signals: usize,
    pub evidence: Vec<EvidenceTxn>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashVelocity {
    pub same_day_spend_ratio: f64,
    pub t_plus_one_spend_ratio: f64,
    pub idle_cash_retention_ratio: f64,
    pub top_inflow_weekday: String,
    pub top_inflow_month_days: Vec<u32>,
    pub borrower_type: String,
    pub commentary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyWarningTrigger {
    pub trigger_type: String,
    pub severity: Severity,
    pub condition: serde_json::Value,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Recommendation + verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionFrequency {
    Weekly,
    Monthly,
}

impl std::fmt::Display for CollectionFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weekly => write!(f, "Weekly"),
            Self::Monthly => write!(f, "Monthly"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisbursementStructure {
    pub schedule_type: String,
    pub net_disbursed_estimate_minor: i64,
    pub staged_disbursement: bool,
    pub stage_1_minor: i64,
    pub stage_2_minor: i64,
    pub stage_2_condition: String,
    pub best_collection_weekday: String,
}

/// A pure function of metrics + credibility; no external state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommended_exposure_minor: i64,
    pub tenure_months: u32,
    pub collection_frequency: CollectionFrequency,
    pub collection_amount_minor: i64,
    pub upfront_deduction_pct: f64,
    pub upfront_deduction_amt_minor: i64,
    pub pricing_apr: f64,
    pub structure: DisbursementStructure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFit {
    Accept,
    AcceptWithControl,
    Avoid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub risk_fit: RiskFit,
    pub risk_grade: String,
    pub score: u32,
    pub street_summary: String,
    pub recovery_leverage_summary: String,
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Full underwriting output. Optional sections are absent (`None`) when the
/// corresponding documents were not supplied — never defaulted to zeros,
/// which would corrupt credibility semantics downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderwritingResult {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub statement_days: i64,
    pub metrics: Vec<Metric>,
    pub credit_heat_map: Vec<HeatMapRow>,
    pub debit_heat_map: Vec<HeatMapRow>,
    pub gst: Option<GstAssessment>,
    pub itr: Option<ItrAssessment>,
    pub cross_verification: Option<CrossVerification>,
    pub credibility: Option<CredibilityScore>,
    pub private_lender_competition: PrivateLenderCompetition,
    pub cash_velocity: CashVelocity,
    pub triggers: Vec<EarlyWarningTrigger>,
    pub recommendation: Recommendation,
    pub verdict: Verdict,
    pub rule_run_log: Vec<RuleOutcome>,
    pub aggressive_summary: String,
}
