//! `lendlens autopilot` — run the statement pipeline over extracted lines.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;

use lendlens_statement::model::ReconStatus;
use lendlens_statement::{apply_edits, run, AutopilotConfig, LineEdit, RawLine, StatementMeta};

use crate::exit_codes::{EXIT_AUTOPILOT_NEEDS_REVIEW, EXIT_AUTOPILOT_PARSE_FAILED};
use crate::CliError;

#[derive(Args)]
#[command(after_help = "\
Examples:
  lendlens autopilot --lines lines.json
  lendlens autopilot --lines lines.json --edits edits.json --bank HDFC
  lendlens autopilot --lines lines.json --config autopilot.toml --output result.json
  lendlens autopilot --lines lines.json --json | jq .reconciliation.status")]
pub struct AutopilotArgs {
    /// Raw line JSON file (array of extracted lines)
    #[arg(long)]
    pub lines: PathBuf,

    /// Manual correction map JSON file (line id → correction)
    #[arg(long)]
    pub edits: Option<PathBuf>,

    /// Bank name for transaction uid derivation
    #[arg(long, default_value = "")]
    pub bank: String,

    /// Account type for transaction uid derivation
    #[arg(long, default_value = "")]
    pub account_type: String,

    /// Autopilot policy TOML (tolerances, flag thresholds)
    #[arg(long)]
    pub config: Option<PathBuf>,

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

pub fn cmd_autopilot(args: AutopilotArgs) -> Result<(), CliError> {
    let lines_str = std::fs::read_to_string(&args.lines)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", args.lines.display())))?;
    let raw_lines: Vec<RawLine> = serde_json::from_str(&lines_str)
        .map_err(|e| CliError::parse(format!("bad lines file: {e}")))?;

    let raw_lines = match &args.edits {
        Some(path) => {
            let edits_str = std::fs::read_to_string(path)
                .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
            let edits: BTreeMap<String, LineEdit> = serde_json::from_str(&edits_str)
                .map_err(|e| CliError::parse(format!("bad edits file: {e}")))?;
            apply_edits(&raw_lines, &edits)
        }
        None => raw_lines,
    };

    let config = match &args.config {
        Some(path) => {
            let config_str = std::fs::read_to_string(path)
                .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
            AutopilotConfig::from_toml(&config_str)
                .map_err(|e| CliError::parse(e.to_string()))?
        }
        None => AutopilotConfig::default(),
    };

    let meta = StatementMeta {
        bank_name: args.bank.clone(),
        account_type: args.account_type.clone(),
    };
    let result = run(&raw_lines, &meta, &config);

    crate::emit_json(&result, &args.output, args.json)?;

    let recon = &result.reconciliation;
    if !args.quiet {
        eprintln!(
            "autopilot: {} lines — {} transaction lines, {} assembled, {} unmapped, {} continuity failures — {}",
            recon.total_raw_lines,
            recon.total_transaction_lines,
            recon.assembled_count,
            recon.unmapped_line_ids.len(),
            recon.continuity_failures.len(),
            recon.status,
        );
    }

    match recon.status {
        ReconStatus::Ok => Ok(()),
        ReconStatus::NeedsReview => Err(CliError {
            code: EXIT_AUTOPILOT_NEEDS_REVIEW,
            message: format!(
                "balance continuity failures: {}",
                recon.continuity_failures.len()
            ),
            hint: Some("review continuity_failures in the result before export".to_string()),
        }),
        ReconStatus::ParseFailed => Err(CliError {
            code: EXIT_AUTOPILOT_PARSE_FAILED,
            message: format!("unmapped transaction lines: {}", recon.unmapped_line_ids.len()),
            hint: Some(
                "supply --edits with corrections for the unmapped line ids and re-run".to_string(),
            ),
        }),
    }
}
