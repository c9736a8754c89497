//! Optional YAML configuration for the CLI.
//!
//! ```yaml
//! database_url: sqlite://./data/quotes.db
//! policy:
//!   profit_margin: 30
//!   tax: 6
//! ```

use anyhow::{Context, Result};
use quote_core::{input, PricingPolicy};
use serde::Deserialize;
use std::path::Path;

/// Default percentages for new simulations; missing keys keep the built-in
/// defaults.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub profit_margin: Option<f64>,
    pub negotiation_margin: Option<f64>,
    pub discount: Option<f64>,
    pub tax: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub database_url: Option<String>,
    pub policy: PolicyConfig,
}

impl CliConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| persistence::default_sqlite_url().to_string())
    }

    pub fn default_policy(&self) -> PricingPolicy {
        let base = PricingPolicy::default();
        let pct = |v: Option<f64>, fallback| v.map(input::percentage_from_f64).unwrap_or(fallback);
        PricingPolicy {
            profit_margin_percentage: pct(self.policy.profit_margin, base.profit_margin_percentage),
            negotiation_margin_percentage: pct(
                self.policy.negotiation_margin,
                base.negotiation_margin_percentage,
            ),
            discount_percentage: pct(self.policy.discount, base.discount_percentage),
            tax_percentage: pct(self.policy.tax, base.tax_percentage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = CliConfig::parse("{}").unwrap();
        assert_eq!(cfg.default_policy(), PricingPolicy::default());
        assert_eq!(cfg.database_url(), persistence::default_sqlite_url());
    }

    #[test]
    fn partial_policy_overrides_only_given_keys() {
        let cfg = CliConfig::parse(
            "database_url: 'sqlite::memory:'\npolicy:\n  profit_margin: 30\n  tax: -2\n",
        )
        .unwrap();
        let policy = cfg.default_policy();
        assert_eq!(policy.profit_margin_percentage, Decimal::new(30, 0));
        assert_eq!(policy.tax_percentage, Decimal::ZERO);
        assert_eq!(policy.negotiation_margin_percentage, Decimal::ZERO);
        assert_eq!(cfg.database_url(), "sqlite::memory:");
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(CliConfig::parse("policy: [").is_err());
    }
}
