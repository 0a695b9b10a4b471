//! CLI Exit Code Registry
//!
//! Single source of truth for all CLI exit codes. Exit codes are part of
//! the shell contract — loan-ops scripts gate exports on them.
//!
//! # Exit Code Ranges
//!
//! | Range | Domain     | Description                                   |
//! |-------|------------|-----------------------------------------------|
//! | 0     | Universal  | Success                                       |
//! | 1     | Universal  | General error (unspecified)                   |
//! | 2     | Universal  | CLI usage error (bad args, missing file)      |
//! | 3-4   | Universal  | IO / input parse errors                       |
//! | 10-19 | autopilot  | Statement autopilot reconciliation codes      |
//! | 20-29 | underwrite | Underwriting precondition codes               |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// IO error - cannot read or write a file.
pub const EXIT_IO_ERROR: u8 = 3;

/// Parse error - input file or config is malformed.
pub const EXIT_PARSE_ERROR: u8 = 4;

/// Reconciliation failed: unmapped transaction lines remain.
/// This is the hard gate — no export/decision until resolved.
pub const EXIT_AUTOPILOT_PARSE_FAILED: u8 = 10;

/// Reconciliation produced balance-continuity failures (soft signal).
pub const EXIT_AUTOPILOT_NEEDS_REVIEW: u8 = 11;

/// Underwriting refused to run: empty transaction set.
pub const EXIT_UNDERWRITE_NO_TRANSACTIONS: u8 = 20;
