use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::errors::CoreError;
use crate::models::holding::{normalize_symbol, Allocation, Holdings};
use crate::models::settings::EngineSettings;
use crate::providers::traits::MarketDataProvider;

/// Validates raw user input and turns dollar allocations into weights.
///
/// Validation happens in two stages: [`InputService::validate_request`]
/// is pure and runs before anything touches the network, then
/// [`InputService::verify_symbols`] asks the provider whether each
/// ticker exists. Neither stage has side effects beyond those queries.
pub struct InputService {
    min_window_days: i64,
}

impl InputService {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            min_window_days: settings.min_window_days,
        }
    }

    /// Full normalizer contract: validate, check existence, compute weights.
    pub async fn normalize(
        &self,
        provider: &dyn MarketDataProvider,
        holdings: &Holdings,
        benchmark: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<(Allocation, String), CoreError> {
        let benchmark = self.validate_request(holdings, benchmark, start_date, end_date)?;
        self.verify_symbols(provider, holdings, &benchmark).await?;
        let allocation = self.compute_weights(holdings)?;
        Ok((allocation, benchmark))
    }

    /// Check the request shape. Returns the normalized benchmark symbol.
    pub fn validate_request(
        &self,
        holdings: &Holdings,
        benchmark: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<String, CoreError> {
        let benchmark = normalize_symbol(benchmark);
        if benchmark.is_empty() {
            return Err(CoreError::ValidationError(
                "Please enter a benchmark ticker before running the analysis.".into(),
            ));
        }

        if holdings.is_empty() {
            return Err(CoreError::ValidationError(
                "Please add at least one ticker with a non-zero investment value before running the analysis.".into(),
            ));
        }

        for (symbol, value) in holdings.iter() {
            if symbol.is_empty() {
                return Err(CoreError::ValidationError(
                    "Ticker symbols must not be blank".into(),
                ));
            }
            if !value.is_finite() || value <= 0.0 {
                return Err(CoreError::ValidationError(format!(
                    "Investment value for {symbol} must be a positive amount (got {value})"
                )));
            }
        }

        if end_date <= start_date {
            return Err(CoreError::ValidationError(format!(
                "Start date ({start_date}) must be before end date ({end_date})"
            )));
        }
        let window_days = (end_date - start_date).num_days();
        if window_days < self.min_window_days {
            return Err(CoreError::ValidationError(format!(
                "Date range of {window_days} days is too short; at least {} days are required",
                self.min_window_days
            )));
        }

        Ok(benchmark)
    }

    /// Ask the provider whether every ticker and the benchmark exist.
    /// All unknown portfolio tickers are reported together.
    pub async fn verify_symbols(
        &self,
        provider: &dyn MarketDataProvider,
        holdings: &Holdings,
        benchmark: &str,
    ) -> Result<(), CoreError> {
        let mut wrong_tickers = Vec::new();
        for symbol in holdings.symbols() {
            if !provider.symbol_exists(&symbol).await? {
                wrong_tickers.push(symbol);
            }
        }

        if !wrong_tickers.is_empty() {
            return Err(CoreError::ValidationError(format!(
                "No such portfolio ticker symbol(s) exist: {}",
                wrong_tickers.join(", ")
            )));
        }

        if !provider.symbol_exists(benchmark).await? {
            return Err(CoreError::ValidationError(format!(
                "No such benchmark ticker symbol exists: {benchmark}"
            )));
        }

        Ok(())
    }

    /// weight(symbol) = dollar_value / Σ dollar_values.
    pub fn compute_weights(&self, holdings: &Holdings) -> Result<Allocation, CoreError> {
        let total = holdings.total_value();
        if holdings.is_empty() || !total.is_finite() || total <= 0.0 {
            return Err(CoreError::ValidationError(
                "Portfolio must hold a positive total value".into(),
            ));
        }

        let weights: BTreeMap<String, f64> = holdings
            .iter()
            .map(|(symbol, value)| (symbol.to_string(), value / total))
            .collect();

        tracing::debug!(?weights, total, "computed portfolio weights");
        Ok(Allocation::from_weights(weights))
    }
}
