use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::errors::CoreError;

/// Trading days used to annualize daily figures.
pub const DEFAULT_TRADING_DAYS_PER_YEAR: u32 = 252;

/// Annual risk-free rate subtracted from daily returns for the Sharpe ratio.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.01;

/// Shortest accepted date range, in calendar days.
pub const DEFAULT_MIN_WINDOW_DAYS: i64 = 30;

/// How many calendar days the first observation may trail the start date
/// (weekend plus a market holiday) before the symbol counts as lacking history.
pub const DEFAULT_START_DATE_GRACE_DAYS: i64 = 4;

pub const DEFAULT_PROVIDER: &str = "Yahoo Finance";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Budget for one whole analysis. A request makes two provider calls per
/// holding plus two for the benchmark, each bounded by the request timeout.
pub const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 300;

/// Engine configuration. Every field has a default, so a settings file only
/// needs the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub trading_days_per_year: u32,

    pub risk_free_rate: f64,

    pub min_window_days: i64,

    pub start_date_grace_days: i64,

    /// Name of the market-data provider to use (see `ProviderRegistry`).
    pub provider: String,

    /// Optional API keys for providers that require them.
    /// Keys: provider key (e.g., "alphavantage"). Values: the API key string.
    pub api_keys: HashMap<String, String>,

    /// Per-HTTP-request timeout used by the providers.
    pub request_timeout_secs: u64,

    /// Upper bound on a whole `analyze` call, enforced by the host.
    pub analysis_timeout_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            trading_days_per_year: DEFAULT_TRADING_DAYS_PER_YEAR,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            min_window_days: DEFAULT_MIN_WINDOW_DAYS,
            start_date_grace_days: DEFAULT_START_DATE_GRACE_DAYS,
            provider: DEFAULT_PROVIDER.to_string(),
            api_keys: HashMap::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            analysis_timeout_secs: DEFAULT_ANALYSIS_TIMEOUT_SECS,
        }
    }
}

impl EngineSettings {
    /// Parse settings from JSON and validate them.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let settings: EngineSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read and parse a JSON settings file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.trading_days_per_year == 0 {
            return Err(CoreError::InvalidSettings(
                "trading_days_per_year must be positive".into(),
            ));
        }
        if !self.risk_free_rate.is_finite() || self.risk_free_rate < 0.0 {
            return Err(CoreError::InvalidSettings(format!(
                "risk_free_rate must be a finite, non-negative annual rate (got {})",
                self.risk_free_rate
            )));
        }
        if self.min_window_days <= 0 {
            return Err(CoreError::InvalidSettings(
                "min_window_days must be positive".into(),
            ));
        }
        if self.start_date_grace_days < 0 {
            return Err(CoreError::InvalidSettings(
                "start_date_grace_days must not be negative".into(),
            ));
        }
        if self.provider.trim().is_empty() {
            return Err(CoreError::InvalidSettings("provider must not be blank".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::InvalidSettings(
                "request_timeout_secs must be positive".into(),
            ));
        }
        if self.analysis_timeout_secs < self.request_timeout_secs {
            return Err(CoreError::InvalidSettings(format!(
                "analysis_timeout_secs ({}) must not be shorter than request_timeout_secs ({})",
                self.analysis_timeout_secs, self.request_timeout_secs
            )));
        }
        Ok(())
    }

    /// Daily risk-free rate: `risk_free_rate / trading_days_per_year`.
    pub fn daily_risk_free_rate(&self) -> f64 {
        self.risk_free_rate / f64::from(self.trading_days_per_year)
    }

    /// √(trading days), the annualization factor for daily figures.
    pub fn annualization_factor(&self) -> f64 {
        f64::from(self.trading_days_per_year).sqrt()
    }
}
