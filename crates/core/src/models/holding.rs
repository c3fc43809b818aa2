use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalize a user-entered ticker: trimmed and uppercased (e.g., " aapl " → "AAPL").
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// A user-defined basket: ticker symbol → dollar amount allocated to it.
///
/// Symbols are unique. Inserting a symbol that is already present replaces
/// its value, like a map. Values are NOT validated here; the
/// `InputService` decides what is acceptable before any analysis runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Holdings {
    values: BTreeMap<String, f64>,
}

impl Holdings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dollar value held in `symbol` (normalized).
    pub fn insert(&mut self, symbol: impl AsRef<str>, dollar_value: f64) {
        self.values
            .insert(normalize_symbol(symbol.as_ref()), dollar_value);
    }

    /// Builder-style variant of [`Holdings::insert`].
    #[must_use]
    pub fn with(mut self, symbol: impl AsRef<str>, dollar_value: f64) -> Self {
        self.insert(symbol, dollar_value);
        self
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.values.get(&normalize_symbol(symbol)).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Symbols in ascending order.
    pub fn symbols(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(s, v)| (s.as_str(), *v))
    }

    /// Σ of all dollar values.
    pub fn total_value(&self) -> f64 {
        self.values.values().sum()
    }
}

impl<S: AsRef<str>> FromIterator<(S, f64)> for Holdings {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut holdings = Holdings::new();
        for (symbol, value) in iter {
            holdings.insert(symbol, value);
        }
        holdings
    }
}

/// Portfolio weights: symbol → fraction of the total dollar value.
///
/// Produced only by `InputService::compute_weights`, so for a non-empty
/// portfolio the weights always sum to 1.0 (within floating-point tolerance).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    weights: BTreeMap<String, f64>,
}

impl Allocation {
    pub(crate) fn from_weights(weights: BTreeMap<String, f64>) -> Self {
        Self { weights }
    }

    pub fn weight(&self, symbol: &str) -> Option<f64> {
        self.weights.get(&normalize_symbol(symbol)).copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// A single-security portfolio is analysed without weighting.
    pub fn is_single_security(&self) -> bool {
        self.weights.len() == 1
    }

    pub fn symbols(&self) -> Vec<String> {
        self.weights.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(s, w)| (s.as_str(), *w))
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }
}
