use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::price::PriceSeries;

/// A dated value in a return series. Daily returns are fractions
/// (0.01 = 1%); cumulative returns are percentages (1.0 = 1%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Simple period-over-period returns: `r[t] = price[t] / price[t-1] - 1`.
///
/// The first price observation has no return, so a series built from `n`
/// prices holds `n - 1` points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    pub fn new(points: Vec<ReturnPoint>) -> Self {
        Self { points }
    }

    /// Derive daily returns from consecutive observations of a price series.
    pub fn from_prices(prices: &PriceSeries) -> Self {
        let points = prices
            .points()
            .windows(2)
            .map(|w| ReturnPoint {
                date: w[1].date,
                value: w[1].price / w[0].price - 1.0,
            })
            .collect();
        Self { points }
    }

    pub fn points(&self) -> &[ReturnPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Return on a given date, if that date is in the series.
    pub fn value_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| self.points[idx].value)
    }
}

/// Compounded returns in percent: `c[t] = (Π(1 + r[i] for i ≤ t) - 1) × 100`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CumulativeReturnSeries {
    points: Vec<ReturnPoint>,
}

impl CumulativeReturnSeries {
    pub(crate) fn new(points: Vec<ReturnPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[ReturnPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total return over the whole period, in percent.
    pub fn last_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.value)
    }
}
