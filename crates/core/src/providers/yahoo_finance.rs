use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use std::time::Duration;
use time::OffsetDateTime;

use crate::errors::CoreError;
use crate::models::price::PriceBar;
use super::traits::MarketDataProvider;

const PROVIDER_NAME: &str = "Yahoo Finance";

/// Yahoo Finance provider for daily equity/ETF/index prices.
///
/// - **Free**: No API key required.
/// - **Coverage**: Global equities, ETFs, indices, mutual funds.
/// - **Data**: Full daily history with both raw and adjusted close.
///
/// **Note**: Not WASM-compatible (uses native reqwest/tokio connectors).
pub struct YahooFinanceProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| CoreError::Provider {
            provider: PROVIDER_NAME.into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }

    /// Build a provider whose HTTP requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Provider {
                provider: PROVIDER_NAME.into(),
                message: format!("Failed to create connector: {e}"),
            })?;
        Ok(Self { connector })
    }

    /// Convert a `chrono::NaiveDate` to `time::OffsetDateTime` (midnight UTC).
    fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime, CoreError> {
        let invalid = |e: &dyn std::fmt::Display| CoreError::Provider {
            provider: PROVIDER_NAME.into(),
            message: format!("Invalid date {date}: {e}"),
        };
        let month = time::Month::try_from(date.month() as u8).map_err(|e| invalid(&e))?;
        let odt = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
            .map_err(|e| invalid(&e))?
            .with_hms(0, 0, 0)
            .map_err(|e| invalid(&e))?
            .assume_utc();
        Ok(odt)
    }

    /// Convert a unix timestamp (seconds) to `chrono::NaiveDate`.
    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }

    /// Yahoo answers an unknown ticker with HTTP 404 rather than an empty chart.
    fn is_unknown_symbol(e: &yahoo_finance_api::YahooError) -> bool {
        let msg = e.to_string();
        msg.contains("404") || msg.contains("Not Found")
    }

    /// A chart without quotes, i.e. no observations in the queried range.
    fn is_empty_chart(e: &yahoo_finance_api::YahooError) -> bool {
        matches!(
            e,
            yahoo_finance_api::YahooError::NoQuotes | yahoo_finance_api::YahooError::NoResult
        )
    }

    /// Quotes from a chart response. An empty chart yields no quotes; any
    /// other decoding failure is a provider error.
    fn decode_quotes(
        symbol: &str,
        quotes: Result<Vec<yahoo_finance_api::Quote>, yahoo_finance_api::YahooError>,
    ) -> Result<Vec<yahoo_finance_api::Quote>, CoreError> {
        match quotes {
            Ok(quotes) => Ok(quotes),
            Err(e) if Self::is_empty_chart(&e) => Ok(Vec::new()),
            Err(e) => Err(CoreError::Provider {
                provider: PROVIDER_NAME.into(),
                message: format!("Failed to parse quotes for {symbol}: {e}"),
            }),
        }
    }

    fn quotes_to_bars(
        quotes: &[yahoo_finance_api::Quote],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<PriceBar> {
        quotes
            .iter()
            .filter_map(|q| {
                let date = Self::timestamp_to_naive_date(q.timestamp)?;
                (date >= from && date <= to).then(|| PriceBar {
                    date,
                    close: q.close,
                    adj_close: Some(q.adjclose).filter(|p| p.is_finite() && *p > 0.0),
                })
            })
            .collect()
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn symbol_exists(&self, symbol: &str) -> Result<bool, CoreError> {
        let resp = match self.connector.get_quote_range(symbol, "1d", "max").await {
            Ok(resp) => resp,
            Err(e) if Self::is_unknown_symbol(&e) => return Ok(false),
            Err(e) => {
                return Err(CoreError::Provider {
                    provider: PROVIDER_NAME.into(),
                    message: format!("Failed to look up {symbol}: {e}"),
                })
            }
        };

        Ok(!Self::decode_quotes(symbol, resp.quotes())?.is_empty())
    }

    async fn get_price_history(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriceBar>, CoreError> {
        let start = Self::to_offset_datetime(from)?;
        let end = Self::to_offset_datetime(to + chrono::Duration::days(1))?; // inclusive end

        let resp = match self.connector.get_quote_history(symbol, start, end).await {
            Ok(resp) => resp,
            Err(e) if Self::is_unknown_symbol(&e) => return Ok(Vec::new()),
            Err(e) => {
                return Err(CoreError::Provider {
                    provider: PROVIDER_NAME.into(),
                    message: format!("Failed to fetch history range for {symbol}: {e}"),
                })
            }
        };

        // Yahoo reports "no quotes" for ranges that predate the listing.
        let quotes = Self::decode_quotes(symbol, resp.quotes())?;
        Ok(Self::quotes_to_bars(&quotes, from, to))
    }
}
