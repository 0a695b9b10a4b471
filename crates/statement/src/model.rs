use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Classification of one physical statement row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Transaction,
    NonTransaction,
}

impl std::fmt::Display for LineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transaction => write!(f, "transaction"),
            Self::NonTransaction => write!(f, "non_transaction"),
        }
    }
}

/// A reviewer-supplied correction, carried on the line itself so that a
/// re-run of the pure pipeline reproduces the human decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum LineCorrection {
    /// Treat the line as noise regardless of its text.
    Ignore,
    /// Explicit field values; unset fields fall back to the extracted text.
    /// An explicit `Some(0)` amount means "definitely no debit/credit here"
    /// (balance-carry rows are entered this way).
    Set {
        #[serde(default)]
        date: Option<NaiveDate>,
        #[serde(default)]
        narration: Option<String>,
        #[serde(default)]
        debit_minor: Option<i64>,
        #[serde(default)]
        credit_minor: Option<i64>,
        #[serde(default)]
        balance_minor: Option<i64>,
    },
}

/// A single extracted statement row, prior to assembly.
///
/// Produced by the PDF/text extraction collaborator; the engine never parses
/// document bytes itself. Identity is `id`, stable across re-runs for an
/// unchanged source document set. A manual correction yields a new value —
/// extracted rows are never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLine {
    pub id: String,
    pub page_no: u32,
    pub row_no: u32,
    pub raw_row_text: String,
    #[serde(default)]
    pub raw_date_text: Option<String>,
    #[serde(default)]
    pub raw_narration_text: Option<String>,
    #[serde(default)]
    pub raw_dr_text: Option<String>,
    #[serde(default)]
    pub raw_cr_text: Option<String>,
    #[serde(default)]
    pub raw_balance_text: Option<String>,
    #[serde(default = "default_line_kind")]
    pub line_kind: LineKind,
    #[serde(default)]
    pub extraction_method: Option<String>,
    #[serde(default)]
    pub source_document_index: u32,
    #[serde(default)]
    pub correction: Option<LineCorrection>,
}

fn default_line_kind() -> LineKind {
    LineKind::NonTransaction
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Which side of the account a transaction moves.
///
/// `BalanceCarry` covers rows with neither a debit nor a credit (opening /
/// brought-forward balances); these only arise from manual corrections that
/// supply an explicit balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxnDirection {
    Credit,
    Debit,
    BalanceCarry,
}

/// Keyword-taxonomy category assigned during assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxnCategory {
    Salary,
    Emi,
    Upi,
    Cash,
    Interest,
    BounceReturn,
    Tax,
    PrivateFinance,
    Unknown,
}

impl std::fmt::Display for TxnCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Salary => write!(f, "salary"),
            Self::Emi => write!(f, "emi"),
            Self::Upi => write!(f, "upi"),
            Self::Cash => write!(f, "cash"),
            Self::Interest => write!(f, "interest"),
            Self::BounceReturn => write!(f, "bounce_return"),
            Self::Tax => write!(f, "tax"),
            Self::PrivateFinance => write!(f, "private_finance"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxnFlag {
    Penalty,
    Bounce,
    HighValue,
    OddFigure,
    SpikeDrain,
}

/// One assembled logical transaction.
///
/// `source_line_ids` is non-empty and ordered; every transaction-kind raw
/// line belongs to exactly one transaction or is reported unmapped — that
/// bijection is the audit guarantee. Amounts are minor units (paise).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub source_line_ids: Vec<String>,
    pub date: NaiveDate,
    /// `YYYY-MM`, derived from `date`.
    pub month: String,
    pub narration: String,
    pub debit_minor: Option<i64>,
    pub credit_minor: Option<i64>,
    pub balance_minor: Option<i64>,
    pub counterparty: String,
    pub direction: TxnDirection,
    pub category: TxnCategory,
    pub flags: Vec<TxnFlag>,
    /// Stable content hash, used for de-duplication across repeated
    /// extraction passes of the same document.
    pub uid: String,
}

impl Transaction {
    pub fn debit(&self) -> i64 {
        self.debit_minor.unwrap_or(0)
    }

    pub fn credit(&self) -> i64 {
        self.credit_minor.unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconStatus {
    Ok,
    NeedsReview,
    ParseFailed,
}

impl std::fmt::Display for ReconStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::NeedsReview => write!(f, "needs_review"),
            Self::ParseFailed => write!(f, "parse_failed"),
        }
    }
}

/// A running-balance break between two consecutive transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuityFailure {
    pub after_transaction_id: String,
    pub expected_minor: i64,
    pub actual_minor: i64,
    pub diff_minor: i64,
}

/// Full-coverage + continuity evidence for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub total_raw_lines: usize,
    pub total_transaction_lines: usize,
    pub assembled_count: usize,
    pub unmapped_line_ids: Vec<String>,
    pub continuity_failures: Vec<ContinuityFailure>,
    pub parse_confidence: f64,
    pub status: ReconStatus,
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Per-month roll-up. Derived, recomputed each run, never a source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    pub month: String,
    pub credit_count: usize,
    pub credit_total_minor: i64,
    pub debit_count: usize,
    pub debit_total_minor: i64,
    pub cash_deposits_minor: i64,
    pub cash_withdrawals_minor: i64,
    pub penalty_charges: usize,
    pub bounces: usize,
    pub balance_on_10th_minor: Option<i64>,
    pub balance_on_20th_minor: Option<i64>,
    pub balance_on_last_minor: Option<i64>,
    pub overdrawn_days: usize,
    pub volatility_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatSide {
    Credit,
    Debit,
}

/// Counterparty frequency-and-volume row for one side of the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatRow {
    pub name: String,
    pub total_minor: i64,
    pub count: usize,
    pub avg_minor: i64,
    pub pct: f64,
    pub side: HeatSide,
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Output of one autopilot run. A new run supersedes the previous result
/// entirely; there is no incremental update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementAutopilotResult {
    pub reconciliation: Reconciliation,
    /// Input lines with post-assembly `line_kind` adjustments applied.
    pub raw_lines: Vec<RawLine>,
    pub transactions: Vec<Transaction>,
    pub monthly_aggregates: Vec<MonthlyAggregate>,
    pub credit_heat: Vec<HeatRow>,
    pub debit_heat: Vec<HeatRow>,
    /// Category tag → indices into `transactions`, for review surfaces.
    pub categories: BTreeMap<String, Vec<usize>>,
}
