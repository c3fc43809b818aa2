use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::errors::CoreError;
use crate::models::price::{PriceBar, PriceSeries};

/// Trait abstraction for market-data sources.
///
/// Implementations only deliver raw daily bars. Resolving adjusted close
/// versus close happens once in [`MarketDataProvider::fetch_prices`], so the
/// engine always sees a uniform [`PriceSeries`] per symbol no matter how the
/// upstream API shapes its payload.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Whether the provider has any history at all for `symbol`,
    /// queried over the maximum available range.
    ///
    /// `Ok(false)` means the symbol is unknown; `Err` means the provider
    /// could not be asked.
    async fn symbol_exists(&self, symbol: &str) -> Result<bool, CoreError>;

    /// Daily bars for `symbol` with dates in `[from, to]` (inclusive).
    /// An empty Vec means the provider has no observations in that range.
    async fn get_price_history(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriceBar>, CoreError>;

    /// Fetch and resolve prices for several symbols, one after another.
    ///
    /// The first failure aborts the whole fetch; nothing is retried.
    async fn fetch_prices(
        &self,
        symbols: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeMap<String, PriceSeries>, CoreError> {
        let mut series = BTreeMap::new();
        for symbol in symbols {
            let bars = self.get_price_history(symbol, from, to).await?;
            tracing::debug!(
                provider = self.name(),
                symbol = %symbol,
                bars = bars.len(),
                "fetched price history"
            );
            series.insert(symbol.clone(), PriceSeries::from_bars(symbol.clone(), bars));
        }
        Ok(series)
    }
}
