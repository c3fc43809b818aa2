use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use portfolio_analytics_core::errors::CoreError;
use portfolio_analytics_core::models::holding::Holdings;
use portfolio_analytics_core::models::price::PriceBar;
use portfolio_analytics_core::models::settings::EngineSettings;
use portfolio_analytics_core::providers::traits::MarketDataProvider;
use portfolio_analytics_core::PortfolioAnalyzer;

// ═══════════════════════════════════════════════════════════════════
// Mock Market Data (for testing without real API calls)
// ═══════════════════════════════════════════════════════════════════

#[derive(Default)]
struct Counters {
    lookups: AtomicUsize,
    fetches: AtomicUsize,
}

struct MockMarketData {
    bars: HashMap<String, Vec<PriceBar>>,
    /// Symbols the provider knows about but has no bars for
    listed_without_data: HashSet<String>,
    failing: bool,
    counters: Arc<Counters>,
}

impl MockMarketData {
    fn new() -> Self {
        Self {
            bars: HashMap::new(),
            listed_without_data: HashSet::new(),
            failing: false,
            counters: Arc::new(Counters::default()),
        }
    }

    fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.bars.insert(symbol.to_string(), bars);
        self
    }

    fn with_listed(mut self, symbol: &str) -> Self {
        self.listed_without_data.insert(symbol.to_string());
        self
    }

    fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.counters)
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketData {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn symbol_exists(&self, symbol: &str) -> Result<bool, CoreError> {
        self.counters.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(CoreError::Network("upstream unreachable".into()));
        }
        Ok(self.bars.contains_key(symbol) || self.listed_without_data.contains(symbol))
    }

    async fn get_price_history(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriceBar>, CoreError> {
        self.counters.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(CoreError::Network("upstream unreachable".into()));
        }
        Ok(self
            .bars
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= from && b.date <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

// ═══════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Deterministic daily prices: a sine wave on top of a slow drift.
fn wave(start: NaiveDate, end: NaiveDate, base: f64, amplitude: f64, period: f64) -> Vec<PriceBar> {
    let days = (end - start).num_days();
    (0..=days)
        .map(|i| {
            let t = i as f64;
            let price = base * (1.0 + amplitude * (t / period).sin() + 0.0004 * t);
            PriceBar::new(start + Duration::days(i), price, None)
        })
        .collect()
}

fn year_2020(base: f64, amplitude: f64, period: f64) -> Vec<PriceBar> {
    wave(d(2020, 1, 1), d(2020, 12, 31), base, amplitude, period)
}

/// Market with A, B and BENCH priced every day of 2020.
fn standard_market() -> MockMarketData {
    MockMarketData::new()
        .with_bars("A", year_2020(100.0, 0.05, 7.0))
        .with_bars("B", year_2020(50.0, 0.08, 11.0))
        .with_bars("BENCH", year_2020(300.0, 0.03, 5.0))
}

fn analyzer(provider: MockMarketData) -> PortfolioAnalyzer {
    PortfolioAnalyzer::with_provider(EngineSettings::default(), Box::new(provider)).unwrap()
}

fn a_and_b() -> Holdings {
    Holdings::new().with("A", 6000.0).with("B", 4000.0)
}

// ═══════════════════════════════════════════════════════════════════
// Full analysis
// ═══════════════════════════════════════════════════════════════════

#[tokio::test]
async fn two_security_portfolio_against_benchmark() {
    let analyzer = analyzer(standard_market());
    let output = analyzer
        .analyze(&a_and_b(), d(2020, 1, 1), d(2020, 12, 31), "BENCH")
        .await
        .unwrap();

    assert!((output.allocation.weight("A").unwrap() - 0.6).abs() < 1e-12);
    assert!((output.allocation.weight("B").unwrap() - 0.4).abs() < 1e-12);

    let per_security = output.per_security.as_ref().unwrap();
    assert_eq!(per_security.len(), 2);
    assert_eq!(per_security["A"].cumulative_returns.len(), 365);

    let portfolio = &output.portfolio_vs_benchmark.portfolio;
    let benchmark = &output.portfolio_vs_benchmark.benchmark;
    assert_eq!(portfolio.cumulative_returns.len(), 365);
    assert_eq!(benchmark.cumulative_returns.len(), 365);
    assert!(portfolio.annualized_volatility > 0.0);
    assert!(benchmark.annualized_volatility > 0.0);

    // Sharpe ratios come back already rounded
    for sharpe in [portfolio.sharpe_ratio, benchmark.sharpe_ratio] {
        assert_eq!((sharpe * 100.0).round() / 100.0, sharpe);
    }
}

#[tokio::test]
async fn first_portfolio_return_is_weighted_sum() {
    let a = year_2020(100.0, 0.05, 7.0);
    let b = year_2020(50.0, 0.08, 11.0);
    let r_a = a[1].close / a[0].close - 1.0;
    let r_b = b[1].close / b[0].close - 1.0;

    let output = analyzer(standard_market())
        .analyze(&a_and_b(), d(2020, 1, 1), d(2020, 12, 31), "BENCH")
        .await
        .unwrap();

    let first = output.portfolio_vs_benchmark.portfolio.cumulative_returns.values()[0];
    assert!((first - (0.6 * r_a + 0.4 * r_b) * 100.0).abs() < 1e-9);
}

#[tokio::test]
async fn single_security_portfolio_skips_per_security_table() {
    let provider = MockMarketData::new().with_bars("X", year_2020(20.0, 0.1, 9.0));
    let output = analyzer(provider)
        .analyze(
            &Holdings::new().with("X", 1000.0),
            d(2020, 1, 1),
            d(2020, 12, 31),
            "X",
        )
        .await
        .unwrap();

    assert!(output.per_security.is_none());
    assert_eq!(output.allocation.weight("X"), Some(1.0));
    // Same series on both sides, so the figures match exactly
    assert_eq!(
        output.portfolio_vs_benchmark.portfolio,
        output.portfolio_vs_benchmark.benchmark
    );
}

#[tokio::test]
async fn symbols_are_normalized() {
    let output = analyzer(standard_market())
        .analyze(
            &Holdings::new().with(" a ", 6000.0).with("b", 4000.0),
            d(2020, 1, 1),
            d(2020, 12, 31),
            " bench ",
        )
        .await
        .unwrap();
    assert_eq!(output.allocation.symbols(), vec!["A".to_string(), "B".to_string()]);
}

#[tokio::test]
async fn holiday_start_date_is_tolerated() {
    // Nothing trades on 2020-01-01
    let provider = MockMarketData::new()
        .with_bars("A", wave(d(2020, 1, 2), d(2020, 6, 30), 100.0, 0.05, 7.0))
        .with_bars("BENCH", wave(d(2020, 1, 2), d(2020, 6, 30), 300.0, 0.03, 5.0));
    let result = analyzer(provider)
        .analyze(
            &Holdings::new().with("A", 1.0),
            d(2020, 1, 1),
            d(2020, 6, 30),
            "BENCH",
        )
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn date_gaps_are_not_missing_data() {
    // B skips every seventh day; its returns span the gaps
    let b: Vec<PriceBar> = year_2020(50.0, 0.08, 11.0)
        .into_iter()
        .enumerate()
        .filter(|(i, _)| i % 7 != 3)
        .map(|(_, bar)| bar)
        .collect();
    let b_returns = b.len() - 1;

    let provider = MockMarketData::new()
        .with_bars("A", year_2020(100.0, 0.05, 7.0))
        .with_bars("B", b)
        .with_bars("BENCH", year_2020(300.0, 0.03, 5.0));

    let output = analyzer(provider)
        .analyze(&a_and_b(), d(2020, 1, 1), d(2020, 12, 31), "BENCH")
        .await
        .unwrap();

    let per_security = output.per_security.unwrap();
    assert_eq!(per_security["A"].cumulative_returns.len(), 365);
    assert_eq!(per_security["B"].cumulative_returns.len(), b_returns);
    assert_eq!(
        output.portfolio_vs_benchmark.portfolio.cumulative_returns.len(),
        b_returns
    );
}

// ═══════════════════════════════════════════════════════════════════
// Determinism
// ═══════════════════════════════════════════════════════════════════

#[tokio::test]
async fn repeated_requests_give_identical_output() {
    let analyzer = analyzer(standard_market());
    let first = analyzer
        .analyze(&a_and_b(), d(2020, 1, 1), d(2020, 12, 31), "BENCH")
        .await
        .unwrap();
    let second = analyzer
        .analyze(&a_and_b(), d(2020, 1, 1), d(2020, 12, 31), "BENCH")
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn rescaling_dollar_values_changes_nothing() {
    let analyzer = analyzer(standard_market());
    let small = analyzer
        .analyze(&a_and_b(), d(2020, 1, 1), d(2020, 12, 31), "BENCH")
        .await
        .unwrap();
    let large = analyzer
        .analyze(
            &Holdings::new().with("A", 60_000.0).with("B", 40_000.0),
            d(2020, 1, 1),
            d(2020, 12, 31),
            "BENCH",
        )
        .await
        .unwrap();

    let (p_small, p_large) = (
        &small.portfolio_vs_benchmark.portfolio,
        &large.portfolio_vs_benchmark.portfolio,
    );
    assert!((p_small.total_return - p_large.total_return).abs() < 1e-9);
    assert!((p_small.annualized_volatility - p_large.annualized_volatility).abs() < 1e-9);
    assert_eq!(p_small.sharpe_ratio, p_large.sharpe_ratio);
}

// ═══════════════════════════════════════════════════════════════════
// Validation & data errors
// ═══════════════════════════════════════════════════════════════════

#[tokio::test]
async fn validation_runs_before_any_fetch() {
    let provider = standard_market();
    let counters = provider.counters();
    let analyzer = analyzer(provider);

    let cases = [
        (a_and_b(), "", d(2020, 1, 1), d(2020, 12, 31)),
        (Holdings::new(), "BENCH", d(2020, 1, 1), d(2020, 12, 31)),
        (Holdings::new().with("A", -1.0), "BENCH", d(2020, 1, 1), d(2020, 12, 31)),
        (a_and_b(), "BENCH", d(2020, 12, 31), d(2020, 1, 1)),
        (a_and_b(), "BENCH", d(2020, 1, 1), d(2020, 1, 10)),
    ];
    for (holdings, benchmark, start, end) in cases {
        let err = analyzer.analyze(&holdings, start, end, benchmark).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)), "got {err:?}");
    }

    assert_eq!(counters.lookups.load(Ordering::SeqCst), 0);
    assert_eq!(counters.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_tickers_rejected_without_fetching_prices() {
    let provider = standard_market();
    let counters = provider.counters();
    let err = analyzer(provider)
        .analyze(
            &Holdings::new().with("A", 1.0).with("ZZZZ", 1.0).with("QQQQ", 1.0),
            d(2020, 1, 1),
            d(2020, 12, 31),
            "BENCH",
        )
        .await
        .unwrap_err();

    match err {
        CoreError::ValidationError(msg) => assert!(msg.ends_with("QQQQ, ZZZZ"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(counters.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_benchmark_rejected() {
    let err = analyzer(standard_market())
        .analyze(&a_and_b(), d(2020, 1, 1), d(2020, 12, 31), "NOPE")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationError(ref m) if m.contains("NOPE")));
}

#[tokio::test]
async fn benchmark_without_history_is_data_unavailable() {
    let provider = MockMarketData::new()
        .with_bars("A", year_2020(100.0, 0.05, 7.0))
        .with_listed("DELISTED");
    let err = analyzer(provider)
        .analyze(
            &Holdings::new().with("A", 1.0),
            d(2020, 1, 1),
            d(2020, 12, 31),
            "DELISTED",
        )
        .await
        .unwrap_err();

    match err {
        CoreError::DataUnavailable { symbol, start_date } => {
            assert_eq!(symbol, "DELISTED");
            assert_eq!(start_date, d(2020, 1, 1));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn late_listing_is_data_unavailable() {
    let provider = standard_market().with_bars(
        "NEWCO",
        wave(d(2020, 6, 1), d(2020, 12, 31), 10.0, 0.05, 6.0),
    );
    let err = analyzer(provider)
        .analyze(
            &a_and_b().with("NEWCO", 1000.0),
            d(2020, 1, 1),
            d(2020, 12, 31),
            "BENCH",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DataUnavailable { ref symbol, .. } if symbol == "NEWCO"));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn constant_price_is_degenerate() {
    let flat: Vec<PriceBar> = year_2020(1.0, 0.0, 1.0)
        .into_iter()
        .map(|bar| PriceBar::new(bar.date, 42.0, None))
        .collect();
    let provider = standard_market().with_bars("FLAT", flat);

    let err = analyzer(provider)
        .analyze(
            &Holdings::new().with("FLAT", 1000.0),
            d(2020, 1, 1),
            d(2020, 12, 31),
            "BENCH",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DegenerateSeries(_)));
}

#[tokio::test]
async fn provider_failure_is_transient() {
    let err = analyzer(standard_market().failing())
        .analyze(&a_and_b(), d(2020, 1, 1), d(2020, 12, 31), "BENCH")
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

// ═══════════════════════════════════════════════════════════════════
// Construction
// ═══════════════════════════════════════════════════════════════════

#[test]
fn unknown_provider_name_rejected() {
    let settings = EngineSettings {
        provider: "Nonexistent Data Co".into(),
        ..Default::default()
    };
    let err = PortfolioAnalyzer::new(settings).unwrap_err();
    assert!(matches!(err, CoreError::InvalidSettings(ref m) if m.contains("Nonexistent Data Co")));
}

#[test]
fn invalid_settings_rejected_with_explicit_provider() {
    let settings = EngineSettings {
        trading_days_per_year: 0,
        ..Default::default()
    };
    let err = PortfolioAnalyzer::with_provider(settings, Box::new(MockMarketData::new())).unwrap_err();
    assert!(matches!(err, CoreError::InvalidSettings(_)));
}

#[test]
fn analyzer_exposes_provider_and_settings() {
    let settings = EngineSettings {
        risk_free_rate: 0.03,
        ..Default::default()
    };
    let analyzer = PortfolioAnalyzer::with_provider(settings, Box::new(MockMarketData::new())).unwrap();
    assert_eq!(analyzer.provider_name(), "Mock");
    assert_eq!(analyzer.settings().risk_free_rate, 0.03);
}

#[tokio::test]
async fn risk_free_rate_moves_sharpe_only() {
    let base = analyzer(standard_market())
        .analyze(&a_and_b(), d(2020, 1, 1), d(2020, 12, 31), "BENCH")
        .await
        .unwrap();
    let settings = EngineSettings {
        risk_free_rate: 0.5,
        ..Default::default()
    };
    let high_rate = PortfolioAnalyzer::with_provider(settings, Box::new(standard_market()))
        .unwrap()
        .analyze(&a_and_b(), d(2020, 1, 1), d(2020, 12, 31), "BENCH")
        .await
        .unwrap();

    let (p, q) = (
        &base.portfolio_vs_benchmark.portfolio,
        &high_rate.portfolio_vs_benchmark.portfolio,
    );
    assert_eq!(p.annualized_volatility, q.annualized_volatility);
    assert_eq!(p.total_return, q.total_return);
    assert!(q.sharpe_ratio < p.sharpe_ratio);
}
