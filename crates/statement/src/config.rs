use serde::Deserialize;

use crate::error::StatementError;

/// Versioned autopilot policy knobs.
///
/// `Default` is the shipped policy table; deployments with known-noisy
/// source documents override via TOML. All amounts are minor units.
#[derive(Debug, Clone, Deserialize)]
pub struct AutopilotConfig {
    #[serde(default = "default_version")]
    pub version: String,
    /// Max |actual − expected| running-balance drift that is still
    /// continuous. 0 = strict: a one-paisa break is a failure.
    #[serde(default)]
    pub balance_tolerance_minor: i64,
    /// Amounts strictly above this are flagged high-value.
    #[serde(default = "default_high_value")]
    pub high_value_minor: i64,
    /// Amounts at or above this that are not round thousands are flagged
    /// odd-figure.
    #[serde(default = "default_odd_figure")]
    pub odd_figure_minor: i64,
    /// Credit size that arms the spike-drain pairing check.
    #[serde(default = "default_spike_credit")]
    pub spike_drain_credit_minor: i64,
    /// Debit/credit ratio at or above which the following debit counts as a
    /// drain.
    #[serde(default = "default_spike_ratio")]
    pub spike_drain_ratio: f64,
}

fn default_version() -> String {
    "autopilot-policy/1".to_string()
}

fn default_high_value() -> i64 {
    50_000_000 // ₹5,00,000
}

fn default_odd_figure() -> i64 {
    100_000_000 // ₹10,00,000
}

fn default_spike_credit() -> i64 {
    50_000_000 // ₹5,00,000
}

fn default_spike_ratio() -> f64 {
    0.7
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            balance_tolerance_minor: 0,
            high_value_minor: default_high_value(),
            odd_figure_minor: default_odd_figure(),
            spike_drain_credit_minor: default_spike_credit(),
            spike_drain_ratio: default_spike_ratio(),
        }
    }
}

impl AutopilotConfig {
    pub fn from_toml(toml_str: &str) -> Result<Self, StatementError> {
        toml::from_str(toml_str).map_err(|e| StatementError::ConfigParse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AutopilotConfig::default();
        assert_eq!(config.balance_tolerance_minor, 0);
        assert_eq!(config.high_value_minor, 50_000_000);
    }

    #[test]
    fn toml_overrides() {
        let config = AutopilotConfig::from_toml(
            r#"
version = "autopilot-policy/2"
balance_tolerance_minor = 500
"#,
        )
        .unwrap();
        assert_eq!(config.version, "autopilot-policy/2");
        assert_eq!(config.balance_tolerance_minor, 500);
        // untouched knobs keep shipped values
        assert_eq!(config.odd_figure_minor, 100_000_000);
    }

    #[test]
    fn toml_rejects_bad_types() {
        assert!(AutopilotConfig::from_toml("balance_tolerance_minor = \"lots\"").is_err());
    }
}
