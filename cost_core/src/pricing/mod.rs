//! # Regional Price Resolution
//!
//! Resolves what a material, machine or tool costs in a region, at a point
//! in time, in the currency the job is quoted in.
//!
//! ## Fallback chain
//!
//! 1. Latest [`RegionCost`] row for `(item, type, region)` with `valid_from ≤ at`.
//! 2. Same lookup in the `"Default"` region.
//! 3. The catalog price, which is always USD.
//!
//! The chosen price is then converted through USD:
//! `price · rate[from] / rate[target]`.
//!
//! Reaching step 2 or 3 is not an error; the returned [`ResolvedPrice`]
//! records which step supplied the price so callers can surface it.
//!
//! ## Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use cost_core::pricing::{
//!     CurrencyRates, ItemType, PriceQuery, PriceResolver, PriceSource, RegionCost, ResolvePrice,
//! };
//! use uuid::Uuid;
//!
//! let steel = Uuid::new_v4();
//! let costs = vec![RegionCost::new(
//!     steel, ItemType::Material, "Germany", 2.0, "EUR",
//!     Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
//! )];
//! let rates = CurrencyRates::standard();
//! let resolver = PriceResolver::new(&costs, &[], &rates);
//!
//! let price = resolver.resolve(&PriceQuery {
//!     item_id: steel,
//!     item_type: ItemType::Material,
//!     region: "Germany",
//!     at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
//!     target_currency: "EUR",
//!     catalog_fallback_price: 1.5,
//! });
//! assert_eq!(price.price, 2.0);
//! assert_eq!(price.source, PriceSource::Region);
//! ```

pub mod currency;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

pub use currency::{CurrencyRates, USD};

/// Name of the region that backs every other region.
pub const DEFAULT_REGION: &str = "Default";

/// Kind of catalog item a price row refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Material,
    Machine,
    Tool,
}

impl ItemType {
    pub fn display_name(&self) -> &'static str {
        match self {
            ItemType::Material => "Material",
            ItemType::Machine => "Machine",
            ItemType::Tool => "Tool",
        }
    }
}

/// One entry of an item's regional price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionCost {
    pub item_id: Uuid,
    pub item_type: ItemType,
    pub region: String,
    pub price: f64,
    pub currency: String,
    pub valid_from: DateTime<Utc>,
}

impl RegionCost {
    pub fn new(
        item_id: Uuid,
        item_type: ItemType,
        region: impl Into<String>,
        price: f64,
        currency: impl Into<String>,
        valid_from: DateTime<Utc>,
    ) -> Self {
        RegionCost {
            item_id,
            item_type,
            region: region.into(),
            price,
            currency: currency.into(),
            valid_from,
        }
    }
}

/// Currency a region quotes in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionCurrency {
    pub region: String,
    pub currency: String,
}

impl RegionCurrency {
    pub fn new(region: impl Into<String>, currency: impl Into<String>) -> Self {
        RegionCurrency {
            region: region.into(),
            currency: currency.into(),
        }
    }
}

/// Which step of the fallback chain produced a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Region,
    DefaultRegion,
    CatalogFallback,
}

/// Inputs of one resolution.
#[derive(Debug, Clone, Copy)]
pub struct PriceQuery<'a> {
    pub item_id: Uuid,
    pub item_type: ItemType,
    pub region: &'a str,
    pub at: DateTime<Utc>,
    pub target_currency: &'a str,
    /// Catalog price in USD, used when no row matches
    pub catalog_fallback_price: f64,
}

/// Outcome of one resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPrice {
    pub item_id: Uuid,
    pub item_type: ItemType,
    /// Price in `currency`
    pub price: f64,
    /// Target currency, or the source currency when it could not be converted
    pub currency: String,
    pub source: PriceSource,
    /// Price and currency before conversion
    pub source_price: f64,
    pub source_currency: String,
    /// `valid_from` of the row used; `None` for the catalog fallback
    pub valid_from: Option<DateTime<Utc>>,
    /// Set when a rate was missing and no conversion was applied
    pub conversion_skipped: bool,
}

impl ResolvedPrice {
    /// True when the region itself had no applicable price.
    pub fn used_fallback(&self) -> bool {
        self.source != PriceSource::Region
    }
}

/// Price-resolution strategy used by the cost aggregator.
pub trait ResolvePrice {
    fn resolve(&self, query: &PriceQuery<'_>) -> ResolvedPrice;

    /// Currency a region quotes in when the caller does not name one.
    fn currency_for_region(&self, region: &str) -> String;
}

/// Resolver over a snapshot of price history, region currencies and rates.
#[derive(Debug, Clone)]
pub struct PriceResolver<'a> {
    costs: &'a [RegionCost],
    currencies: &'a [RegionCurrency],
    rates: &'a CurrencyRates,
    default_region: String,
    fallback_currency: String,
}

impl<'a> PriceResolver<'a> {
    pub fn new(costs: &'a [RegionCost], currencies: &'a [RegionCurrency], rates: &'a CurrencyRates) -> Self {
        PriceResolver {
            costs,
            currencies,
            rates,
            default_region: DEFAULT_REGION.to_string(),
            fallback_currency: USD.to_string(),
        }
    }

    pub fn with_default_region(mut self, region: impl Into<String>) -> Self {
        self.default_region = region.into();
        self
    }

    pub fn with_fallback_currency(mut self, currency: impl Into<String>) -> Self {
        self.fallback_currency = currency.into();
        self
    }

    /// Latest row for the item in `region` that is already valid at `at`.
    ///
    /// Rows with equal `valid_from` resolve to the one listed last.
    pub fn latest_row(&self, item_id: Uuid, item_type: ItemType, region: &str, at: DateTime<Utc>) -> Option<&'a RegionCost> {
        self.costs
            .iter()
            .filter(|row| {
                row.item_id == item_id && row.item_type == item_type && row.region == region && row.valid_from <= at
            })
            .max_by(|a, b| a.valid_from.cmp(&b.valid_from))
    }
}

impl ResolvePrice for PriceResolver<'_> {
    fn resolve(&self, query: &PriceQuery<'_>) -> ResolvedPrice {
        let regional = self
            .latest_row(query.item_id, query.item_type, query.region, query.at)
            .map(|row| (row, PriceSource::Region));

        let found = regional.or_else(|| {
            if query.region == self.default_region {
                return None;
            }
            self.latest_row(query.item_id, query.item_type, &self.default_region, query.at)
                .map(|row| (row, PriceSource::DefaultRegion))
        });

        let (source_price, source_currency, source, valid_from) = match found {
            Some((row, source)) => (row.price, row.currency.clone(), source, Some(row.valid_from)),
            None => (
                query.catalog_fallback_price,
                self.fallback_currency.clone(),
                PriceSource::CatalogFallback,
                None,
            ),
        };

        let (price, currency, conversion_skipped) =
            match self.rates.convert(source_price, &source_currency, query.target_currency) {
                Some(converted) => (converted, query.target_currency.to_string(), false),
                None => (source_price, source_currency.clone(), true),
            };

        debug!(
            item_id = %query.item_id,
            item_type = query.item_type.display_name(),
            region = query.region,
            source = ?source,
            source_price,
            source_currency = %source_currency,
            price,
            currency = %currency,
            "price resolved"
        );

        ResolvedPrice {
            item_id: query.item_id,
            item_type: query.item_type,
            price,
            currency,
            source,
            source_price,
            source_currency,
            valid_from,
            conversion_skipped,
        }
    }

    fn currency_for_region(&self, region: &str) -> String {
        let lookup = |name: &str| {
            self.currencies
                .iter()
                .find(|rc| rc.region == name)
                .map(|rc| rc.currency.clone())
        };
        lookup(region)
            .or_else(|| lookup(&self.default_region))
            .unwrap_or_else(|| self.fallback_currency.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn rates() -> CurrencyRates {
        CurrencyRates::new().with_rate("USD", 1.0).with_rate("EUR", 1.25).with_rate("INR", 0.0125)
    }

    const ITEM: Uuid = Uuid::from_u128(42);

    fn query<'a>(region: &'a str, at: DateTime<Utc>, target: &'a str) -> PriceQuery<'a> {
        PriceQuery {
            item_id: ITEM,
            item_type: ItemType::Machine,
            region,
            at,
            target_currency: target,
            catalog_fallback_price: 40.0,
        }
    }

    #[test]
    fn test_fallback_order() {
        let rates = rates();
        let costs = vec![
            RegionCost::new(ITEM, ItemType::Machine, "India", 2000.0, "INR", date(2024, 1, 1)),
            RegionCost::new(ITEM, ItemType::Machine, DEFAULT_REGION, 50.0, "USD", date(2024, 1, 1)),
        ];
        let resolver = PriceResolver::new(&costs, &[], &rates);

        let regional = resolver.resolve(&query("India", date(2024, 6, 1), "INR"));
        assert_eq!(regional.source, PriceSource::Region);
        assert_eq!(regional.price, 2000.0);
        assert!(!regional.used_fallback());

        let defaulted = resolver.resolve(&query("Germany", date(2024, 6, 1), "USD"));
        assert_eq!(defaulted.source, PriceSource::DefaultRegion);
        assert_eq!(defaulted.price, 50.0);
        assert!(defaulted.used_fallback());

        let empty: Vec<RegionCost> = Vec::new();
        let resolver = PriceResolver::new(&empty, &[], &rates);
        let catalog = resolver.resolve(&query("Germany", date(2024, 6, 1), "USD"));
        assert_eq!(catalog.source, PriceSource::CatalogFallback);
        assert_eq!(catalog.price, 40.0);
        assert_eq!(catalog.valid_from, None);
    }

    #[test]
    fn test_latest_valid_row_never_future() {
        let rates = rates();
        let costs = vec![
            RegionCost::new(ITEM, ItemType::Machine, "India", 1000.0, "INR", date(2023, 1, 1)),
            RegionCost::new(ITEM, ItemType::Machine, "India", 3000.0, "INR", date(2025, 1, 1)),
            RegionCost::new(ITEM, ItemType::Machine, "India", 2000.0, "INR", date(2024, 1, 1)),
        ];
        let resolver = PriceResolver::new(&costs, &[], &rates);

        assert_eq!(resolver.resolve(&query("India", date(2024, 6, 1), "INR")).price, 2000.0);
        assert_eq!(resolver.resolve(&query("India", date(2023, 6, 1), "INR")).price, 1000.0);
        assert_eq!(resolver.resolve(&query("India", date(2025, 1, 1), "INR")).price, 3000.0);

        // Only future rows: region has nothing yet, falls through
        let before_all = resolver.resolve(&query("India", date(2022, 6, 1), "USD"));
        assert_eq!(before_all.source, PriceSource::CatalogFallback);
    }

    #[test]
    fn test_item_type_and_id_must_match() {
        let rates = rates();
        let costs = vec![
            RegionCost::new(ITEM, ItemType::Tool, "India", 999.0, "INR", date(2020, 1, 1)),
            RegionCost::new(Uuid::from_u128(43), ItemType::Machine, "India", 888.0, "INR", date(2020, 1, 1)),
        ];
        let resolver = PriceResolver::new(&costs, &[], &rates);
        let price = resolver.resolve(&query("India", date(2024, 1, 1), "USD"));
        assert_eq!(price.source, PriceSource::CatalogFallback);
    }

    #[test]
    fn test_conversion_through_usd() {
        let rates = rates();
        let costs = vec![RegionCost::new(ITEM, ItemType::Machine, "India", 2000.0, "INR", date(2024, 1, 1))];
        let resolver = PriceResolver::new(&costs, &[], &rates);

        // 2000 INR = 25 USD = 20 EUR
        let price = resolver.resolve(&query("India", date(2024, 6, 1), "EUR"));
        assert!((price.price - 20.0).abs() < 1e-9);
        assert_eq!(price.currency, "EUR");
        assert_eq!(price.source_currency, "INR");

        // Catalog fallback is USD: 40 USD = 3200 INR
        let price = resolver.resolve(&query("Japan", date(2024, 6, 1), "INR"));
        assert!((price.price - 3200.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_currency_skips_conversion() {
        let rates = rates();
        let costs = vec![RegionCost::new(ITEM, ItemType::Machine, "Mars", 7.0, "MRS", date(2024, 1, 1))];
        let resolver = PriceResolver::new(&costs, &[], &rates);
        let price = resolver.resolve(&query("Mars", date(2024, 6, 1), "USD"));
        assert!(price.conversion_skipped);
        assert_eq!(price.price, 7.0);
        assert_eq!(price.currency, "MRS");
    }

    #[test]
    fn test_default_region_query_stops_at_catalog() {
        let rates = rates();
        let empty: Vec<RegionCost> = Vec::new();
        let resolver = PriceResolver::new(&empty, &[], &rates);
        let price = resolver.resolve(&query(DEFAULT_REGION, date(2024, 6, 1), "USD"));
        assert_eq!(price.source, PriceSource::CatalogFallback);
    }

    #[test]
    fn test_equal_valid_from_prefers_later_row() {
        let rates = rates();
        let costs = vec![
            RegionCost::new(ITEM, ItemType::Machine, "India", 1.0, "INR", date(2024, 1, 1)),
            RegionCost::new(ITEM, ItemType::Machine, "India", 2.0, "INR", date(2024, 1, 1)),
        ];
        let resolver = PriceResolver::new(&costs, &[], &rates);
        assert_eq!(resolver.resolve(&query("India", date(2024, 6, 1), "INR")).price, 2.0);
    }

    #[test]
    fn test_region_currency_lookup() {
        let rates = rates();
        let currencies = vec![
            RegionCurrency::new("India", "INR"),
            RegionCurrency::new(DEFAULT_REGION, "EUR"),
        ];
        let resolver = PriceResolver::new(&[], &currencies, &rates);
        assert_eq!(resolver.currency_for_region("India"), "INR");
        assert_eq!(resolver.currency_for_region("Brazil"), "EUR");

        let resolver = PriceResolver::new(&[], &[], &rates);
        assert_eq!(resolver.currency_for_region("Brazil"), "USD");
    }

    #[test]
    fn test_idempotent() {
        let rates = rates();
        let costs = vec![RegionCost::new(ITEM, ItemType::Machine, "India", 2000.0, "INR", date(2024, 1, 1))];
        let resolver = PriceResolver::new(&costs, &[], &rates);
        let q = query("India", date(2024, 6, 1), "EUR");
        assert_eq!(resolver.resolve(&q), resolver.resolve(&q));
    }
}
