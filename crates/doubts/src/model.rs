use serde::{Deserialize, Serialize};

/// Review urgency, ordered: an `ImmediateAction` doubt outranks `HighRisk`,
/// which outranks `Alert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoubtSeverity {
    Alert,
    HighRisk,
    ImmediateAction,
}

/// How the reviewer's answer is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    Text,
    Number,
    Date,
    YesNo,
    Select,
    File,
}

/// One generated follow-up question.
///
/// `code` is stable and deterministic; the PD workflow uses it for de-dup
/// and audit. `evidence` carries the triggering metrics plus the source rule
/// outcome so a reviewer can see exactly why the question was raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doubt {
    pub code: String,
    pub severity: DoubtSeverity,
    pub category: String,
    pub question_text: String,
    pub answer_type: AnswerType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub required_upload_hint: Option<String>,
    pub evidence: serde_json::Value,
    #[serde(default)]
    pub source_rule_id: Option<String>,
    /// Always `false` on generated doubts; kept in the schema so callers
    /// merging with a static question catalogue can round-trip it.
    #[serde(default)]
    pub covered_by_static_catalogue: bool,
}
