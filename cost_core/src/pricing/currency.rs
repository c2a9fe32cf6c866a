//! Static currency table with USD as the pivot.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Currency every catalog price is denominated in.
pub const USD: &str = "USD";

/// Value of one unit of each currency in USD, as shipped.
static STANDARD_RATES: Lazy<CurrencyRates> = Lazy::new(|| {
    CurrencyRates::new()
        .with_rate(USD, 1.0)
        .with_rate("EUR", 1.08)
        .with_rate("GBP", 1.27)
        .with_rate("CHF", 1.13)
        .with_rate("CAD", 0.73)
        .with_rate("AUD", 0.66)
        .with_rate("SEK", 0.095)
        .with_rate("PLN", 0.25)
        .with_rate("TRY", 0.031)
        .with_rate("INR", 0.012)
        .with_rate("CNY", 0.138)
        .with_rate("JPY", 0.0067)
        .with_rate("KRW", 0.00075)
        .with_rate("MXN", 0.058)
        .with_rate("BRL", 0.20)
});

/// Currency code → value of one unit in USD.
///
/// Passed explicitly to the price resolver; nothing reads a global table.
///
/// ## JSON Example
///
/// ```json
/// { "USD": 1.0, "EUR": 1.08, "INR": 0.012 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyRates(BTreeMap<String, f64>);

impl CurrencyRates {
    /// Empty table
    pub fn new() -> Self {
        CurrencyRates(BTreeMap::new())
    }

    /// The built-in table
    pub fn standard() -> Self {
        STANDARD_RATES.clone()
    }

    pub fn with_rate(mut self, code: impl Into<String>, usd_value: f64) -> Self {
        self.0.insert(code.into(), usd_value);
        self
    }

    /// Usable rate for a code: present, finite and positive.
    pub fn rate(&self, code: &str) -> Option<f64> {
        self.0
            .get(code)
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
    }

    /// `amount · rate[from] / rate[to]`, or `None` if either rate is unusable.
    ///
    /// Same-currency conversion always succeeds unchanged.
    pub fn convert(&self, amount: f64, from: &str, to: &str) -> Option<f64> {
        if from == to {
            return Some(amount);
        }
        Some(amount * self.rate(from)? / self.rate(to)?)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl Default for CurrencyRates {
    fn default() -> Self {
        CurrencyRates::standard()
    }
}
