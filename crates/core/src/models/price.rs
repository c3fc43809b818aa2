use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One raw daily observation as returned by a market-data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,

    /// Raw closing price
    pub close: f64,

    /// Close adjusted for dividends and splits, when the provider has it
    pub adj_close: Option<f64>,
}

impl PriceBar {
    pub fn new(date: NaiveDate, close: f64, adj_close: Option<f64>) -> Self {
        Self {
            date,
            close,
            adj_close,
        }
    }

    /// Price used for return calculations: adjusted close when usable,
    /// raw close otherwise. `None` when neither is a finite positive number.
    pub fn resolved_price(&self) -> Option<f64> {
        self.adj_close
            .filter(|p| is_usable_price(*p))
            .or_else(|| Some(self.close).filter(|p| is_usable_price(*p)))
    }
}

fn is_usable_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// A single resolved price data point (date → price).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Daily prices for one symbol, ordered by date.
///
/// Dates are strictly increasing. Non-trading days are simply absent and
/// are not missing data. Every price is finite and positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Resolve raw provider bars into a uniform series.
    ///
    /// Bars are sorted by date; for duplicate dates the last bar wins.
    /// Bars with no usable price are dropped.
    pub fn from_bars(symbol: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        let symbol = symbol.into();
        bars.sort_by_key(|b| b.date);

        let mut points: Vec<PricePoint> = Vec::with_capacity(bars.len());
        for bar in bars {
            let Some(price) = bar.resolved_price() else {
                tracing::warn!(
                    symbol = %symbol,
                    date = %bar.date,
                    "dropping bar without a usable adjusted or raw close"
                );
                continue;
            };
            match points.last_mut() {
                Some(last) if last.date == bar.date => last.price = price,
                _ => points.push(PricePoint {
                    date: bar.date,
                    price,
                }),
            }
        }

        Self { symbol, points }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Date of the earliest observation, if any.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}
