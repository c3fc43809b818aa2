use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::price::PriceBar;
use crate::models::settings::DEFAULT_REQUEST_TIMEOUT_SECS;
use super::traits::MarketDataProvider;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER_NAME: &str = "Alpha Vantage";

/// Alpha Vantage provider for daily equity prices.
///
/// - **Requires**: API key (set via settings as "alphavantage").
/// - **Coverage**: 100k+ global equity symbols.
/// - **Data**: `TIME_SERIES_DAILY_ADJUSTED`, full history, so one request
///   serves both the existence check and any date range.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
}

impl AlphaVantageProvider {
    pub fn new(api_key: String) -> Result<Self, CoreError> {
        Self::with_timeout(api_key, DEFAULT_REQUEST_TIMEOUT_SECS)
    }

    /// Build a provider whose HTTP requests give up after `timeout_secs`.
    pub fn with_timeout(api_key: String, timeout_secs: u64) -> Result<Self, CoreError> {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(timeout_secs));
        #[cfg(target_arch = "wasm32")]
        let _ = timeout_secs;
        let client = builder.build().map_err(|e| CoreError::Provider {
            provider: PROVIDER_NAME.into(),
            message: format!("Failed to create HTTP client: {e}"),
        })?;
        Ok(Self { client, api_key })
    }
}

// ── Alpha Vantage API response types ────────────────────────────────

#[derive(Deserialize)]
struct AdjustedSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, AdjustedDailyData>>,

    #[serde(rename = "Error Message")]
    error_message: Option<String>,

    #[serde(rename = "Note")]
    note: Option<String>,

    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Deserialize)]
struct AdjustedDailyData {
    #[serde(rename = "4. close")]
    close: String,

    #[serde(rename = "5. adjusted close")]
    adjusted_close: Option<String>,
}

/// Outcome of decoding one `TIME_SERIES_DAILY_ADJUSTED` payload.
#[derive(Debug, PartialEq)]
pub(crate) enum SeriesPayload {
    /// Bars sorted by date
    Bars(Vec<PriceBar>),
    /// Alpha Vantage rejected the symbol itself
    UnknownSymbol,
}

/// Decode a raw payload. Rate-limit notices and malformed bodies are
/// provider errors; an "Error Message" means the symbol is invalid.
pub(crate) fn parse_adjusted_series(body: &str) -> Result<SeriesPayload, CoreError> {
    let resp: AdjustedSeriesResponse = serde_json::from_str(body).map_err(|e| CoreError::Provider {
        provider: PROVIDER_NAME.into(),
        message: format!("Failed to parse time series: {e}"),
    })?;

    if resp.error_message.is_some() {
        return Ok(SeriesPayload::UnknownSymbol);
    }

    let Some(time_series) = resp.time_series else {
        let detail = resp
            .note
            .or(resp.information)
            .unwrap_or_else(|| "no time series in response".into());
        return Err(CoreError::Provider {
            provider: PROVIDER_NAME.into(),
            message: format!("{detail}. API limit may be exceeded."),
        });
    };

    let mut bars: Vec<PriceBar> = time_series
        .iter()
        .filter_map(|(date_str, data)| {
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
            let close: f64 = data.close.parse().ok()?;
            let adj_close = data
                .adjusted_close
                .as_deref()
                .and_then(|s| s.parse::<f64>().ok());
            Some(PriceBar {
                date,
                close,
                adj_close,
            })
        })
        .collect();

    bars.sort_by_key(|b| b.date);
    Ok(SeriesPayload::Bars(bars))
}

impl AlphaVantageProvider {
    async fn fetch_adjusted_series(&self, symbol: &str) -> Result<SeriesPayload, CoreError> {
        let body = self
            .client
            .get(BASE_URL)
            .query(&[
                ("function", "TIME_SERIES_DAILY_ADJUSTED"),
                ("symbol", &symbol.to_uppercase()),
                ("outputsize", "full"),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_adjusted_series(&body)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl MarketDataProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn symbol_exists(&self, symbol: &str) -> Result<bool, CoreError> {
        match self.fetch_adjusted_series(symbol).await? {
            SeriesPayload::Bars(bars) => Ok(!bars.is_empty()),
            SeriesPayload::UnknownSymbol => Ok(false),
        }
    }

    async fn get_price_history(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriceBar>, CoreError> {
        match self.fetch_adjusted_series(symbol).await? {
            SeriesPayload::Bars(bars) => Ok(bars
                .into_iter()
                .filter(|b| b.date >= from && b.date <= to)
                .collect()),
            SeriesPayload::UnknownSymbol => Ok(Vec::new()),
        }
    }
}
