//! Heuristics configuration.
//!
//! The detection threshold and scoring bonuses are empirical constants, not
//! data-integrity invariants, so they live in config instead of code.
//! Resolution is two-layer: an explicit override file when given, otherwise
//! the embedded defaults compiled into the binary.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/kosh.toml");

/// Subscription-detection thresholds
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Coefficient of variation below which charge intervals read as periodic
    pub cov_threshold: f64,
    /// Minimum charges to a merchant before a pattern is considered
    pub min_transactions: usize,
    /// Mean-interval cutoffs in days, inclusive on the upper end
    pub weekly_max_days: f64,
    pub monthly_max_days: f64,
    pub quarterly_max_days: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            cov_threshold: 0.25,
            min_transactions: 2,
            weekly_max_days: 10.0,
            monthly_max_days: 45.0,
            quarterly_max_days: 120.0,
        }
    }
}

/// Confidence-scoring bonuses and windows
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub amount_bonus: f64,
    pub plausible_amount_max: f64,
    pub recency_bonus: f64,
    /// Trailing window, in months up to today inclusive
    pub recency_months: u32,
    pub merchant_bonus: f64,
    pub merchant_len_min: usize,
    pub merchant_len_max: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            amount_bonus: 5.0,
            plausible_amount_max: 100_000.0,
            recency_bonus: 10.0,
            recency_months: 24,
            merchant_bonus: 5.0,
            merchant_len_min: 3,
            merchant_len_max: 50,
        }
    }
}

/// Full heuristics configuration
#[derive(Debug, Clone, Default)]
pub struct CoreConfig {
    pub detection: DetectionConfig,
    pub scoring: ScoringConfig,
}

impl CoreConfig {
    /// Load configuration: the override file when given and present,
    /// otherwise the embedded defaults.
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let content = match override_path {
            Some(path) if path.exists() => fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?,
            _ => DEFAULT_CONFIG.to_string(),
        };
        parse_config(&content)
    }
}

/// Raw config structure for TOML parsing; every field optional so an
/// override file can be partial.
#[derive(Debug, Deserialize)]
struct RawConfig {
    detection: Option<RawDetection>,
    scoring: Option<RawScoring>,
}

#[derive(Debug, Deserialize)]
struct RawDetection {
    cov_threshold: Option<f64>,
    min_transactions: Option<usize>,
    weekly_max_days: Option<f64>,
    monthly_max_days: Option<f64>,
    quarterly_max_days: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawScoring {
    amount_bonus: Option<f64>,
    plausible_amount_max: Option<f64>,
    recency_bonus: Option<f64>,
    recency_months: Option<u32>,
    merchant_bonus: Option<f64>,
    merchant_len_min: Option<usize>,
    merchant_len_max: Option<usize>,
}

fn parse_config(content: &str) -> Result<CoreConfig> {
    let raw: RawConfig =
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = CoreConfig::default();

    if let Some(detection) = raw.detection {
        if let Some(v) = detection.cov_threshold {
            config.detection.cov_threshold = v;
        }
        if let Some(v) = detection.min_transactions {
            config.detection.min_transactions = v;
        }
        if let Some(v) = detection.weekly_max_days {
            config.detection.weekly_max_days = v;
        }
        if let Some(v) = detection.monthly_max_days {
            config.detection.monthly_max_days = v;
        }
        if let Some(v) = detection.quarterly_max_days {
            config.detection.quarterly_max_days = v;
        }
    }

    if let Some(scoring) = raw.scoring {
        if let Some(v) = scoring.amount_bonus {
            config.scoring.amount_bonus = v;
        }
        if let Some(v) = scoring.plausible_amount_max {
            config.scoring.plausible_amount_max = v;
        }
        if let Some(v) = scoring.recency_bonus {
            config.scoring.recency_bonus = v;
        }
        if let Some(v) = scoring.recency_months {
            config.scoring.recency_months = v;
        }
        if let Some(v) = scoring.merchant_bonus {
            config.scoring.merchant_bonus = v;
        }
        if let Some(v) = scoring.merchant_len_min {
            config.scoring.merchant_len_min = v;
        }
        if let Some(v) = scoring.merchant_len_max {
            config.scoring.merchant_len_max = v;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse_and_match_code_defaults() {
        let parsed = parse_config(DEFAULT_CONFIG).unwrap();
        let defaults = CoreConfig::default();
        assert_eq!(parsed.detection.cov_threshold, defaults.detection.cov_threshold);
        assert_eq!(parsed.detection.min_transactions, defaults.detection.min_transactions);
        assert_eq!(parsed.scoring.recency_months, defaults.scoring.recency_months);
        assert_eq!(parsed.scoring.merchant_len_max, defaults.scoring.merchant_len_max);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = parse_config("[detection]\ncov_threshold = 0.4\n").unwrap();
        assert_eq!(config.detection.cov_threshold, 0.4);
        assert_eq!(config.detection.monthly_max_days, 45.0);
        assert_eq!(config.scoring.amount_bonus, 5.0);
    }

    #[test]
    fn missing_override_falls_back_to_embedded() {
        let config = CoreConfig::load(Some(Path::new("/nonexistent/kosh.toml"))).unwrap();
        assert_eq!(config.detection.cov_threshold, 0.25);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        assert!(parse_config("not [ valid").is_err());
    }
}
