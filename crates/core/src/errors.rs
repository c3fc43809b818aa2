use chrono::NaiveDate;
use thiserror::Error;

/// Unified error type for the entire portfolio-analytics-core library.
/// Every public function returns `Result<T, CoreError>`.
///
/// All variants are terminal for the current analysis: either a full
/// `AnalysisOutput` is produced or exactly one of these is surfaced.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input ───────────────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    // ── Market Data ─────────────────────────────────────────────────
    #[error("No data available for {symbol} starting from {start_date}")]
    DataUnavailable {
        symbol: String,
        start_date: NaiveDate,
    },

    // ── Analytics ───────────────────────────────────────────────────
    #[error("Degenerate return series: {0}")]
    DegenerateSeries(String),

    // ── API / Network ───────────────────────────────────────────────
    #[error("Provider error ({provider}): {message}")]
    Provider {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),
}

impl CoreError {
    /// Provider and network failures are transient: the caller may retry
    /// the whole request. Everything else will fail again on identical input.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::Provider { .. } | CoreError::Network(_))
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::InvalidSettings(e.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::InvalidSettings(format!("cannot read settings file: {e}"))
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors often carry the full request URL, API key included.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
