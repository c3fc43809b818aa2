use std::collections::HashMap;

use crate::models::settings::EngineSettings;

use super::alphavantage::AlphaVantageProvider;
#[cfg(not(target_arch = "wasm32"))]
use super::yahoo_finance::YahooFinanceProvider;
use super::traits::MarketDataProvider;

/// Settings key under which the Alpha Vantage API key is stored.
pub const ALPHAVANTAGE_KEY: &str = "alphavantage";

/// Registry of available market-data providers, looked up by name.
///
/// Exactly one provider serves a request. There is no fallback chain: a
/// provider failure goes straight back to the caller, who may retry.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn MarketDataProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry with every provider the settings make usable.
    pub fn new_with_defaults(settings: &EngineSettings) -> Self {
        Self::from_api_keys(&settings.api_keys, settings.request_timeout_secs)
    }

    /// Create a registry from raw API keys.
    pub fn from_api_keys(api_keys: &HashMap<String, String>, timeout_secs: u64) -> Self {
        let mut registry = Self::new();

        // Yahoo Finance: no API key needed (default).
        // Not available on WASM (uses native reqwest/tokio connectors)
        #[cfg(not(target_arch = "wasm32"))]
        {
            match YahooFinanceProvider::with_timeout(std::time::Duration::from_secs(timeout_secs)) {
                Ok(yahoo) => registry.register(Box::new(yahoo)),
                Err(e) => tracing::warn!(error = %e, "Yahoo Finance provider unavailable"),
            }
        }

        // Alpha Vantage: requires API key
        if let Some(key) = api_keys.get(ALPHAVANTAGE_KEY) {
            match AlphaVantageProvider::with_timeout(key.clone(), timeout_secs) {
                Ok(alpha) => registry.register(Box::new(alpha)),
                Err(e) => tracing::warn!(error = %e, "Alpha Vantage provider unavailable"),
            }
        }

        registry
    }

    /// Register a new provider. Lookups by name return the first registered match.
    pub fn register(&mut self, provider: Box<dyn MarketDataProvider>) {
        self.providers.push(provider);
    }

    /// Find a provider by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&dyn MarketDataProvider> {
        self.position(name).map(|idx| self.providers[idx].as_ref())
    }

    /// Remove and return a provider by name (case-insensitive).
    pub fn take(&mut self, name: &str) -> Option<Box<dyn MarketDataProvider>> {
        self.position(name).map(|idx| self.providers.remove(idx))
    }

    /// Names of all registered providers, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        self.providers
            .iter()
            .position(|p| p.name().eq_ignore_ascii_case(wanted))
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
