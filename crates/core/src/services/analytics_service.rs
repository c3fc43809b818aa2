use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::errors::CoreError;
use crate::models::analytics::{AnalysisOutput, PortfolioVsBenchmark};
use crate::models::holding::Holdings;
use crate::models::settings::EngineSettings;
use crate::providers::traits::MarketDataProvider;
use crate::services::input_service::InputService;
use crate::services::metrics_service::MetricsService;
use crate::services::returns_service::ReturnsService;

/// Runs one analysis request end to end: normalize → build returns → metrics.
///
/// Every request starts from scratch. Nothing is cached between calls, so
/// identical inputs against identical provider data give identical output.
pub struct AnalyticsService {
    input_service: InputService,
    returns_service: ReturnsService,
    metrics_service: MetricsService,
}

impl AnalyticsService {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            input_service: InputService::new(settings),
            returns_service: ReturnsService::new(settings),
            metrics_service: MetricsService::new(settings),
        }
    }

    /// Analyze `holdings` against `benchmark` over `[start_date, end_date]`.
    ///
    /// Either the full output is produced or a single error is returned;
    /// there are no partial results.
    pub async fn analyze(
        &self,
        provider: &dyn MarketDataProvider,
        holdings: &Holdings,
        start_date: NaiveDate,
        end_date: NaiveDate,
        benchmark: &str,
    ) -> Result<AnalysisOutput, CoreError> {
        let (allocation, benchmark) = self
            .input_service
            .normalize(provider, holdings, benchmark, start_date, end_date)
            .await?;

        let returns = self
            .returns_service
            .build(provider, &allocation, &benchmark, start_date, end_date)
            .await?;

        let per_security = if allocation.is_single_security() {
            None
        } else {
            let mut analytics = BTreeMap::new();
            for (symbol, series) in &returns.per_security {
                analytics.insert(
                    symbol.clone(),
                    self.metrics_service.analyze_series(symbol, series)?,
                );
            }
            Some(analytics)
        };

        let portfolio = self
            .metrics_service
            .analyze_series("portfolio", &returns.portfolio)?;
        let benchmark_analytics = self
            .metrics_service
            .analyze_series(&benchmark, &returns.benchmark)?;

        Ok(AnalysisOutput {
            allocation,
            per_security,
            portfolio_vs_benchmark: PortfolioVsBenchmark {
                portfolio,
                benchmark: benchmark_analytics,
            },
        })
    }
}
