//! `lendlens underwrite` — run the rule engine over reconciled transactions.

use std::path::{Path, PathBuf};

use clap::Args;

use lendlens_statement::StatementAutopilotResult;
use lendlens_underwriting::model::{BankTransaction, DocsInput, GstMonth, ItrYear};
use lendlens_underwriting::{run_underwriting, PolicyTable, UnderwritingError, UnderwritingParams};

use crate::exit_codes::EXIT_UNDERWRITE_NO_TRANSACTIONS;
use crate::CliError;

#[derive(Args)]
#[command(after_help = "\
Examples:
  lendlens underwrite --transactions autopilot.json
  lendlens underwrite --transactions txns.json --gst gst.csv --itr itr.csv
  lendlens underwrite --transactions txns.json --requested-exposure 500000000 --output uw.json

GST CSV columns:  month,turnover_minor,tax_paid_minor,days_late
ITR CSV columns:  year,turnover_minor,profit_minor,tax_paid_minor")]
pub struct UnderwriteArgs {
    /// Transactions JSON: either a bare transaction array or a full
    /// autopilot result file
    #[arg(long)]
    pub transactions: PathBuf,

    /// GST months CSV from the data-entry collaborator
    #[arg(long)]
    pub gst: Option<PathBuf>,

    /// ITR years CSV from the data-entry collaborator
    #[arg(long)]
    pub itr: Option<PathBuf>,

    /// Requested exposure in minor units
    #[arg(long)]
    pub requested_exposure: Option<i64>,

    /// Max tenure in months
    #[arg(long)]
    pub max_tenure_months: Option<u32>,

    /// Policy table TOML (thresholds, risk tiers)
    #[arg(long)]
    pub policy: Option<PathBuf>,

    /// Output JSON to stdout
    #[arg(long)]
    pub json: bool,

    /// Write JSON output to file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Suppress the human summary on stderr
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

pub fn cmd_underwrite(args: UnderwriteArgs) -> Result<(), CliError> {
    let transactions = load_transactions(&args.transactions)?;

    let gst_months = match &args.gst {
        Some(path) => load_csv::<GstMonth>(path, "GST")?,
        None => Vec::new(),
    };
    let itr_years = match &args.itr {
        Some(path) => load_csv::<ItrYear>(path, "ITR")?,
        None => Vec::new(),
    };
    let docs = DocsInput { gst_months, itr_years };

    let defaults = UnderwritingParams::default();
    let params = UnderwritingParams {
        requested_exposure_minor: args
            .requested_exposure
            .unwrap_or(defaults.requested_exposure_minor),
        max_tenure_months: args.max_tenure_months.unwrap_or(defaults.max_tenure_months),
    };

    let policy = match &args.policy {
        Some(path) => {
            let policy_str = std::fs::read_to_string(path)
                .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
            PolicyTable::from_toml(&policy_str).map_err(|e| CliError::parse(e.to_string()))?
        }
        None => PolicyTable::default(),
    };

    let result = run_underwriting(&transactions, &params, &docs, &policy).map_err(|e| match e {
        UnderwritingError::EmptyTransactions => CliError {
            code: EXIT_UNDERWRITE_NO_TRANSACTIONS,
            message: e.to_string(),
            hint: Some("run `lendlens autopilot` first and fix any parse failures".to_string()),
        },
        other => CliError::parse(other.to_string()),
    })?;

    crate::emit_json(&result, &args.output, args.json)?;

    if !args.quiet {
        let failed = result.rule_run_log.iter().filter(|r| !r.passed).count();
        eprintln!(
            "underwrite: {} days, {} rules ({} failed) — grade {} score {} — exposure ₹{} @ {}% APR",
            result.statement_days,
            result.rule_run_log.len(),
            failed,
            result.verdict.risk_grade,
            result.verdict.score,
            result.recommendation.recommended_exposure_minor / 100,
            result.recommendation.pricing_apr,
        );
    }

    Ok(())
}

/// Accept either a bare `BankTransaction` array or a full autopilot result;
/// the latter lets ops pipe the autopilot output straight in.
fn load_transactions(path: &Path) -> Result<Vec<BankTransaction>, CliError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;

    if let Ok(bare) = serde_json::from_str::<Vec<BankTransaction>>(&content) {
        return Ok(bare);
    }

    let autopilot: StatementAutopilotResult = serde_json::from_str(&content).map_err(|e| {
        CliError::parse(format!(
            "bad transactions file (neither a transaction array nor an autopilot result): {e}"
        ))
    })?;
    Ok(autopilot
        .transactions
        .iter()
        .map(|t| BankTransaction {
            date: t.date,
            narration: t.narration.clone(),
            debit_minor: t.debit(),
            credit_minor: t.credit(),
            balance_minor: t.balance_minor,
        })
        .collect())
}

fn load_csv<T: serde::de::DeserializeOwned>(path: &Path, label: &str) -> Result<Vec<T>, CliError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: T =
            record.map_err(|e| CliError::parse(format!("bad {label} CSV row: {e}")))?;
        rows.push(row);
    }
    Ok(rows)
}
