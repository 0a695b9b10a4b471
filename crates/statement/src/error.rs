use std::fmt;

/// Errors surfaced by this crate. The pipeline itself is total — malformed
/// rows route to the reconciliation surface, not here.
#[derive(Debug)]
pub enum StatementError {
    /// TOML parse / deserialization error for an autopilot config.
    ConfigParse(String),
}

impl fmt::Display for StatementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
        }
    }
}

impl std::error::Error for StatementError {}
