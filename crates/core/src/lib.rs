pub mod errors;
pub mod models;
pub mod providers;
pub mod services;

use chrono::NaiveDate;

use errors::CoreError;
use models::{analytics::AnalysisOutput, holding::Holdings, settings::EngineSettings};
use providers::{registry::ProviderRegistry, traits::MarketDataProvider};
use services::analytics_service::AnalyticsService;

/// Main entry point for the Portfolio Analytics core library.
///
/// Holds the engine configuration and the market-data provider. Each call
/// to [`PortfolioAnalyzer::analyze`] is an independent request; the
/// analyzer keeps no per-request state.
#[must_use]
pub struct PortfolioAnalyzer {
    settings: EngineSettings,
    provider: Box<dyn MarketDataProvider>,
    analytics_service: AnalyticsService,
}

impl std::fmt::Debug for PortfolioAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioAnalyzer")
            .field("provider", &self.provider.name())
            .field("trading_days_per_year", &self.settings.trading_days_per_year)
            .field("risk_free_rate", &self.settings.risk_free_rate)
            .finish()
    }
}

impl PortfolioAnalyzer {
    /// Build an analyzer using the provider named in `settings.provider`.
    pub fn new(settings: EngineSettings) -> Result<Self, CoreError> {
        settings.validate()?;
        let mut registry = ProviderRegistry::new_with_defaults(&settings);
        let provider = registry.take(&settings.provider).ok_or_else(|| {
            CoreError::InvalidSettings(format!(
                "Unknown or unconfigured provider '{}' (available: {})",
                settings.provider,
                registry.names().join(", ")
            ))
        })?;
        Self::with_provider(settings, provider)
    }

    /// Build an analyzer around an explicit provider (tests, custom sources).
    pub fn with_provider(
        settings: EngineSettings,
        provider: Box<dyn MarketDataProvider>,
    ) -> Result<Self, CoreError> {
        settings.validate()?;
        let analytics_service = AnalyticsService::new(&settings);
        Ok(Self {
            settings,
            provider,
            analytics_service,
        })
    }

    /// Compute allocation, per-security figures and portfolio-vs-benchmark
    /// figures for `holdings` over `[start_date, end_date]`.
    pub async fn analyze(
        &self,
        holdings: &Holdings,
        start_date: NaiveDate,
        end_date: NaiveDate,
        benchmark: &str,
    ) -> Result<AnalysisOutput, CoreError> {
        tracing::info!(
            provider = self.provider.name(),
            holdings = holdings.len(),
            %start_date,
            %end_date,
            benchmark,
            "starting portfolio analysis"
        );

        let result = self
            .analytics_service
            .analyze(self.provider.as_ref(), holdings, start_date, end_date, benchmark)
            .await;

        match &result {
            Ok(output) => tracing::info!(
                securities = output.allocation.len(),
                portfolio_return = output.portfolio_vs_benchmark.portfolio.total_return,
                benchmark_return = output.portfolio_vs_benchmark.benchmark.total_return,
                "portfolio analysis finished"
            ),
            Err(e) => tracing::warn!(error = %e, transient = e.is_transient(), "portfolio analysis failed"),
        }

        result
    }

    /// Current engine settings.
    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Name of the market-data provider in use.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }
}
