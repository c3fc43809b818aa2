use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::Parser;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use portfolio_analytics_core::models::analytics::{AnalysisOutput, SeriesAnalytics};
use portfolio_analytics_core::models::holding::Holdings;
use portfolio_analytics_core::models::settings::EngineSettings;
use portfolio_analytics_core::providers::registry::ALPHAVANTAGE_KEY;
use portfolio_analytics_core::PortfolioAnalyzer;
use tracing_subscriber::EnvFilter;

/// Measure a portfolio's return, volatility and Sharpe ratio against a benchmark.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// A holding as SYMBOL=DOLLARS (e.g., "AAPL=6000"). Repeat for each ticker.
    #[arg(long = "holding", short = 'H', required = true, value_parser = parse_holding)]
    holdings: Vec<(String, f64)>,

    /// Benchmark symbol (e.g., "SPY").
    #[arg(long, short)]
    benchmark: String,

    /// Start date (format: YYYY-MM-DD).
    #[arg(long)]
    from: NaiveDate,

    /// End date (format: YYYY-MM-DD).
    #[arg(long)]
    to: NaiveDate,

    /// JSON settings file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Market-data provider name (e.g., "Yahoo Finance", "Alpha Vantage").
    #[arg(long)]
    provider: Option<String>,

    /// Annual risk-free rate (e.g., 0.01 for 1%).
    #[arg(long)]
    risk_free_rate: Option<f64>,

    /// Trading days per year used for annualization.
    #[arg(long)]
    trading_days: Option<u32>,

    /// Give up on the whole analysis after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Timeout for each individual provider request, in seconds.
    #[arg(long)]
    request_timeout_secs: Option<u64>,

    /// Print the full output as JSON instead of tables.
    #[arg(long)]
    json: bool,
}

fn parse_holding(raw: &str) -> Result<(String, f64), String> {
    let (symbol, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SYMBOL=DOLLARS, got '{raw}'"))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid dollar value in '{raw}': {e}"))?;
    Ok((symbol.trim().to_string(), value))
}

/// Rows left at zero dollars are blank input rows, not holdings.
fn holdings_from_args(rows: &[(String, f64)]) -> Holdings {
    rows.iter()
        .filter(|(symbol, value)| {
            let keep = *value != 0.0;
            if !keep {
                tracing::debug!(symbol = %symbol, "skipping zero-value holding");
            }
            keep
        })
        .map(|(symbol, value)| (symbol.as_str(), *value))
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout only carries results.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    let timeout = Duration::from_secs(settings.analysis_timeout_secs);

    let holdings = holdings_from_args(&cli.holdings);
    let analyzer = PortfolioAnalyzer::new(settings)?;

    let output = match tokio::time::timeout(
        timeout,
        analyzer.analyze(&holdings, cli.from, cli.to, &cli.benchmark),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => bail!("analysis timed out after {}s; try again", timeout.as_secs()),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_report(&output, &cli.benchmark);
    }
    Ok(())
}

fn load_settings(cli: &Cli) -> anyhow::Result<EngineSettings> {
    let mut settings = match &cli.config {
        Some(path) => EngineSettings::from_json_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => EngineSettings::default(),
    };

    if let Some(provider) = &cli.provider {
        settings.provider = provider.clone();
    }
    if let Some(rate) = cli.risk_free_rate {
        settings.risk_free_rate = rate;
    }
    if let Some(days) = cli.trading_days {
        settings.trading_days_per_year = days;
    }
    if let Some(secs) = cli.request_timeout_secs {
        settings.request_timeout_secs = secs;
    }
    if let Some(secs) = cli.timeout_secs {
        settings.analysis_timeout_secs = secs;
    }
    if let Ok(key) = std::env::var("ALPHAVANTAGE_API_KEY") {
        settings.api_keys.entry(ALPHAVANTAGE_KEY.into()).or_insert(key);
    }

    settings.validate()?;
    tracing::debug!(
        provider = %settings.provider,
        risk_free_rate = settings.risk_free_rate,
        trading_days = settings.trading_days_per_year,
        "effective settings"
    );
    Ok(settings)
}

fn print_report(output: &AnalysisOutput, benchmark: &str) {
    let mut allocation = Table::new();
    allocation.load_preset(UTF8_FULL).set_header(vec!["Ticker", "Weight (%)"]);
    for (symbol, weight) in output.allocation.iter() {
        allocation.add_row(vec![Cell::new(symbol), Cell::new(format!("{:.2}", weight * 100.0))]);
    }
    println!("Portfolio Allocation\n{allocation}\n");

    if let Some(per_security) = &output.per_security {
        let mut table = risk_table();
        for (symbol, analytics) in per_security {
            add_risk_row(&mut table, symbol, analytics);
        }
        println!("Portfolio Analysis\n{table}\n");
    }

    let mut comparison = risk_table();
    add_risk_row(&mut comparison, "Portfolio", &output.portfolio_vs_benchmark.portfolio);
    add_risk_row(
        &mut comparison,
        &format!("Benchmark ({})", benchmark.trim().to_uppercase()),
        &output.portfolio_vs_benchmark.benchmark,
    );
    println!("Portfolio vs Benchmark\n{comparison}");
}

fn risk_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Series",
        "Cumulative Return (%)",
        "Annualized Volatility (%)",
        "Sharpe Ratio",
    ]);
    table
}

fn add_risk_row(table: &mut Table, name: &str, analytics: &SeriesAnalytics) {
    let summary = analytics.summary();
    table.add_row(vec![
        Cell::new(name),
        Cell::new(format!("{:.2}", summary.total_return_pct)),
        Cell::new(format!("{:.2}", summary.annualized_volatility_pct)),
        Cell::new(format!("{:.2}", summary.sharpe_ratio)),
    ]);
}
