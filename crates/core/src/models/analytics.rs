use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::holding::Allocation;
use super::returns::CumulativeReturnSeries;

/// Round to 2 decimal places, the precision used for display.
/// Exact ties round away from zero (`f64::round`).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Risk figures derived from one daily return series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Sample stdev of daily returns × √(trading days), in percent (full precision)
    pub annualized_volatility: f64,

    /// mean(r − rf/days) / stdev(r) × √(days), rounded to 2 decimals
    pub sharpe_ratio: f64,
}

/// Everything the engine reports for one series: a security, the weighted
/// portfolio, or the benchmark. All three are computed the same way so
/// they can be compared on one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesAnalytics {
    /// Compounded return over time, in percent
    pub cumulative_returns: CumulativeReturnSeries,

    /// Final cumulative return, in percent
    pub total_return: f64,

    /// Annualized volatility, in percent
    pub annualized_volatility: f64,

    /// Annualized Sharpe ratio, already rounded to 2 decimals
    pub sharpe_ratio: f64,
}

impl SeriesAnalytics {
    /// The reward/risk point for charting, rounded for display.
    pub fn summary(&self) -> RiskReturnSummary {
        RiskReturnSummary {
            total_return_pct: round2(self.total_return),
            annualized_volatility_pct: round2(self.annualized_volatility),
            sharpe_ratio: round2(self.sharpe_ratio),
        }
    }
}

/// Display-ready reward/risk figures (all rounded to 2 decimals).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskReturnSummary {
    pub total_return_pct: f64,
    pub annualized_volatility_pct: f64,
    pub sharpe_ratio: f64,
}

/// The weighted portfolio and the benchmark, side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioVsBenchmark {
    pub portfolio: SeriesAnalytics,
    pub benchmark: SeriesAnalytics,
}

/// Result of one analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// Portfolio weights (for a pie/bar rendering)
    pub allocation: Allocation,

    /// Per-security figures; `None` for a single-security portfolio
    pub per_security: Option<BTreeMap<String, SeriesAnalytics>>,

    pub portfolio_vs_benchmark: PortfolioVsBenchmark,
}
