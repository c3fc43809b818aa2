use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::errors::CoreError;
use crate::models::holding::Allocation;
use crate::models::price::PriceSeries;
use crate::models::returns::{ReturnPoint, ReturnSeries};
use crate::models::settings::EngineSettings;
use crate::providers::traits::MarketDataProvider;

/// Daily return series produced for one analysis request.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioReturns {
    /// Each holding's own returns, keyed by symbol
    pub per_security: BTreeMap<String, ReturnSeries>,

    /// Weighted aggregate (or the lone security's returns, unweighted)
    pub portfolio: ReturnSeries,

    pub benchmark: ReturnSeries,
}

/// Fetches price histories and turns them into return series.
pub struct ReturnsService {
    start_date_grace_days: i64,
}

impl ReturnsService {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            start_date_grace_days: settings.start_date_grace_days,
        }
    }

    /// Fetch prices for the portfolio and the benchmark and derive returns.
    ///
    /// 1. Fetch every holding, check each reaches back to `start_date`.
    /// 2. Compute each holding's returns on its own trading calendar.
    /// 3. Weight them on the dates all holdings share (single holding: as-is).
    /// 4. Fetch the benchmark separately and derive its returns the same way.
    pub async fn build(
        &self,
        provider: &dyn MarketDataProvider,
        allocation: &Allocation,
        benchmark: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PortfolioReturns, CoreError> {
        let symbols = allocation.symbols();
        let mut prices = provider.fetch_prices(&symbols, start_date, end_date).await?;

        let mut per_security = BTreeMap::new();
        for symbol in &symbols {
            let series = prices
                .remove(symbol)
                .unwrap_or_else(|| PriceSeries::from_bars(symbol.clone(), Vec::new()));
            self.check_coverage(&series, start_date)?;
            per_security.insert(symbol.clone(), ReturnSeries::from_prices(&series));
        }

        let portfolio = Self::portfolio_returns(allocation, &per_security);

        let benchmark_symbol = benchmark.to_string();
        let benchmark_series = provider
            .fetch_prices(std::slice::from_ref(&benchmark_symbol), start_date, end_date)
            .await?
            .remove(&benchmark_symbol)
            .unwrap_or_else(|| PriceSeries::from_bars(benchmark_symbol.clone(), Vec::new()));
        self.check_coverage(&benchmark_series, start_date)?;
        let benchmark = ReturnSeries::from_prices(&benchmark_series);

        tracing::debug!(
            securities = per_security.len(),
            portfolio_days = portfolio.len(),
            benchmark_days = benchmark.len(),
            "built return series"
        );

        Ok(PortfolioReturns {
            per_security,
            portfolio,
            benchmark,
        })
    }

    /// Fail with `DataUnavailable` when the series has no observations or
    /// its first observation trails `start_date` by more than the grace
    /// period, i.e. the provider has no history back to that date.
    pub fn check_coverage(&self, series: &PriceSeries, start_date: NaiveDate) -> Result<(), CoreError> {
        let unavailable = || CoreError::DataUnavailable {
            symbol: series.symbol.clone(),
            start_date,
        };

        let first = series.first_date().ok_or_else(unavailable)?;
        let lag_days = (first - start_date).num_days();
        if lag_days > self.start_date_grace_days {
            tracing::warn!(
                symbol = %series.symbol,
                %first,
                %start_date,
                "history starts after the requested start date"
            );
            return Err(unavailable());
        }
        Ok(())
    }

    /// Portfolio return series for the given allocation.
    ///
    /// A single-security portfolio uses that security's series unchanged.
    /// Otherwise `p[t] = Σ weight[s] × r_s[t]` over the dates present in
    /// every security's series; dates missing for any security are dropped.
    pub fn portfolio_returns(
        allocation: &Allocation,
        per_security: &BTreeMap<String, ReturnSeries>,
    ) -> ReturnSeries {
        if allocation.is_single_security() {
            if let Some(series) = per_security.values().next() {
                return series.clone();
            }
        }

        let Some(first) = per_security.values().next() else {
            return ReturnSeries::default();
        };

        let points = first
            .dates()
            .into_iter()
            .filter_map(|date| {
                let mut total = 0.0;
                for (symbol, weight) in allocation.iter() {
                    let r = per_security.get(symbol)?.value_on(date)?;
                    total += weight * r;
                }
                Some(ReturnPoint { date, value: total })
            })
            .collect();

        ReturnSeries::new(points)
    }
}
