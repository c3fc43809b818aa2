use crate::errors::CoreError;
use crate::models::analytics::{round2, RiskMetrics, SeriesAnalytics};
use crate::models::returns::{CumulativeReturnSeries, ReturnPoint, ReturnSeries};
use crate::models::settings::EngineSettings;

/// Standard deviations at or below this are treated as zero variance.
const MIN_STD_DEV: f64 = 1e-12;

/// Pure risk/return calculator.
///
/// The same formulas apply to a single security, the weighted portfolio
/// and the benchmark. Nothing here talks to a provider.
pub struct MetricsService {
    trading_days_per_year: u32,
    daily_risk_free_rate: f64,
    annualization_factor: f64,
}

impl MetricsService {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            trading_days_per_year: settings.trading_days_per_year,
            daily_risk_free_rate: settings.daily_risk_free_rate(),
            annualization_factor: settings.annualization_factor(),
        }
    }

    pub fn trading_days_per_year(&self) -> u32 {
        self.trading_days_per_year
    }

    /// Compound daily returns into cumulative returns, in percent.
    pub fn cumulative_returns(&self, returns: &ReturnSeries) -> CumulativeReturnSeries {
        let mut growth = 1.0;
        let points = returns
            .points()
            .iter()
            .map(|p| {
                growth *= 1.0 + p.value;
                ReturnPoint {
                    date: p.date,
                    value: (growth - 1.0) * 100.0,
                }
            })
            .collect();
        CumulativeReturnSeries::new(points)
    }

    /// Sample stdev of daily returns × √(trading days), in percent.
    pub fn annualized_volatility(&self, label: &str, returns: &ReturnSeries) -> Result<f64, CoreError> {
        let values = Self::checked_values(label, returns)?;
        let std_dev = Self::non_zero_std_dev(label, &values)?;
        Ok(std_dev * self.annualization_factor * 100.0)
    }

    /// `mean(r − rf/days) / stdev(r) × √days`, rounded to 2 decimals.
    ///
    /// The denominator is the stdev of the raw returns, not of the excess
    /// returns.
    pub fn sharpe_ratio(&self, label: &str, returns: &ReturnSeries) -> Result<f64, CoreError> {
        let values = Self::checked_values(label, returns)?;
        let std_dev = Self::non_zero_std_dev(label, &values)?;
        Ok(self.sharpe_from(&values, std_dev))
    }

    pub fn risk_metrics(&self, label: &str, returns: &ReturnSeries) -> Result<RiskMetrics, CoreError> {
        let values = Self::checked_values(label, returns)?;
        let std_dev = Self::non_zero_std_dev(label, &values)?;
        Ok(RiskMetrics {
            annualized_volatility: std_dev * self.annualization_factor * 100.0,
            sharpe_ratio: self.sharpe_from(&values, std_dev),
        })
    }

    /// Cumulative returns, total return, volatility and Sharpe for one series.
    /// `label` names the series in error messages.
    pub fn analyze_series(&self, label: &str, returns: &ReturnSeries) -> Result<SeriesAnalytics, CoreError> {
        let metrics = self.risk_metrics(label, returns)?;
        let cumulative_returns = self.cumulative_returns(returns);
        let total_return = cumulative_returns.last_value().unwrap_or(0.0);
        if !total_return.is_finite() {
            return Err(CoreError::DegenerateSeries(format!(
                "{label}: cumulative return is not finite"
            )));
        }

        Ok(SeriesAnalytics {
            cumulative_returns,
            total_return,
            annualized_volatility: metrics.annualized_volatility,
            sharpe_ratio: metrics.sharpe_ratio,
        })
    }

    fn sharpe_from(&self, values: &[f64], std_dev: f64) -> f64 {
        let mean_excess = mean(values) - self.daily_risk_free_rate;
        round2(mean_excess / std_dev * self.annualization_factor)
    }

    fn checked_values(label: &str, returns: &ReturnSeries) -> Result<Vec<f64>, CoreError> {
        if returns.len() < 2 {
            return Err(CoreError::DegenerateSeries(format!(
                "{label}: needs at least 2 daily returns, got {}",
                returns.len()
            )));
        }
        if let Some(bad) = returns.points().iter().find(|p| !p.value.is_finite()) {
            return Err(CoreError::DegenerateSeries(format!(
                "{label}: non-finite return on {}",
                bad.date
            )));
        }
        Ok(returns.values())
    }

    fn non_zero_std_dev(label: &str, values: &[f64]) -> Result<f64, CoreError> {
        let std_dev = sample_std_dev(values);
        if !std_dev.is_finite() || std_dev <= MIN_STD_DEV {
            return Err(CoreError::DegenerateSeries(format!(
                "{label}: returns have zero variance, volatility and Sharpe ratio are undefined"
            )));
        }
        Ok(std_dev)
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n − 1 denominator).
fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
