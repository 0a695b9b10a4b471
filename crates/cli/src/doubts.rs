//! `lendlens doubts` — project an underwriting result into PD questions.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::Args;

use lendlens_doubts::generate;
use lendlens_underwriting::UnderwritingResult;

use crate::CliError;

#[derive(Args)]
#[command(after_help = "\
Examples:
  lendlens doubts --underwriting uw.json
  lendlens doubts --underwriting uw.json --covered D010_TOP1_CREDIT_CONCENTRATION
  lendlens doubts --underwriting uw.json --covered-file pd_catalogue_codes.txt --json")]
pub struct DoubtsArgs {
    /// Underwriting result JSON file
    #[arg(long)]
    pub underwriting: PathBuf,

    /// Code already covered by the static PD catalogue (repeatable)
    #[arg(long)]
    pub covered: Vec<String>,

    /// File with covered codes, one per line
    #[arg(long)]
    pub covered_file: Option<PathBuf>,

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

pub fn cmd_doubts(args: DoubtsArgs) -> Result<(), CliError> {
    let uw_str = std::fs::read_to_string(&args.underwriting)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", args.underwriting.display())))?;
    let uw: UnderwritingResult = serde_json::from_str(&uw_str)
        .map_err(|e| CliError::parse(format!("bad underwriting file: {e}")))?;

    let mut covered: BTreeSet<String> = args.covered.iter().cloned().collect();
    if let Some(path) = &args.covered_file {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
        covered.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(String::from),
        );
    }

    let doubts = generate(&uw, &covered);

    crate::emit_json(&doubts, &args.output, args.json)?;

    if !args.quiet {
        eprintln!(
            "doubts: {} generated ({} covered codes suppressed at source)",
            doubts.len(),
            covered.len(),
        );
    }

    Ok(())
}
