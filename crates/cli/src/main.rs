// LendLens CLI - headless statement autopilot + underwriting runs.

mod autopilot;
mod doubts;
mod exit_codes;
mod underwrite;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_IO_ERROR, EXIT_PARSE_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "lendlens")]
#[command(about = "Statement autopilot and underwriting engine (headless)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the statement autopilot over extracted raw lines
    Autopilot(autopilot::AutopilotArgs),

    /// Run the underwriting rule engine over reconciled transactions
    Underwrite(underwrite::UnderwriteArgs),

    /// Generate PD doubts from an underwriting result
    Doubts(doubts::DoubtsArgs),
}

/// Error carrying its shell exit code. Hints render on stderr below the
/// message.
#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO_ERROR, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE_ERROR, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Autopilot(args) => autopilot::cmd_autopilot(args),
        Commands::Underwrite(args) => underwrite::cmd_underwrite(args),
        Commands::Doubts(args) => doubts::cmd_doubts(args),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = &err.hint {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(err.code)
        }
    }
}

/// Shared output plumbing: JSON to `--output` and/or stdout.
pub fn emit_json(
    value: &impl serde::Serialize,
    output: &Option<std::path::PathBuf>,
    json_stdout: bool,
) -> Result<(), CliError> {
    let json_str = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;

    if let Some(path) = output {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
        eprintln!("wrote {}", path.display());
    }
    if json_stdout {
        println!("{json_str}");
    }
    Ok(())
}
