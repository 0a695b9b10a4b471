use std::fmt;

#[derive(Debug)]
pub enum UnderwritingError {
    /// Caller precondition: there is nothing to underwrite.
    EmptyTransactions,
    /// TOML parse / deserialization error for a policy table.
    ConfigParse(String),
}

impl fmt::Display for UnderwritingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTransactions => write!(f, "no transactions to underwrite"),
            Self::ConfigParse(msg) => write!(f, "policy parse error: {msg}"),
        }
    }
}

impl std::error::Error for UnderwritingError {}
