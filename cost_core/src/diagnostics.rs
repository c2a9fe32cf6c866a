//! # Diagnostics
//!
//! Non-fatal advisories collected while costing a job. The engine keeps going
//! after every one of these; each is attached to the result in the order it
//! was encountered and logged at `warn` level.

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::formula::{FormulaError, VariableMap};
use crate::pricing::{ItemType, PriceSource};

/// Catalog reference that could not be followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Material,
    Machine,
    Tool,
    Process,
}

/// One advisory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Billet dimensions or density were unusable; raw weight is zero
    InvalidGeometry { reason: String },

    /// A process formula failed; the operation time is zero
    FormulaFailure {
        process: String,
        formula: String,
        variables: VariableMap,
        error: FormulaError,
    },

    /// A price came from the Default region or the catalog
    PriceFallback {
        item_id: Uuid,
        item_type: ItemType,
        region: String,
        source: PriceSource,
    },

    /// A currency had no usable rate; the price was left unconverted
    UnknownCurrency {
        item_id: Uuid,
        item_type: ItemType,
        from: String,
        to: String,
    },

    /// A referenced catalog record does not exist; its component is zero
    MissingReference { kind: ReferenceKind, reference: String },

    /// Setup efficiency outside (0, 1]; 1.0 was used instead
    InvalidEfficiency { setup: usize, value: f64 },
}

impl Diagnostic {
    /// Short code for programmatic handling
    pub fn code(&self) -> &'static str {
        match self {
            Diagnostic::InvalidGeometry { .. } => "INVALID_GEOMETRY",
            Diagnostic::FormulaFailure { .. } => "FORMULA_FAILURE",
            Diagnostic::PriceFallback { source: PriceSource::DefaultRegion, .. } => "PRICE_DEFAULT_REGION",
            Diagnostic::PriceFallback { .. } => "PRICE_CATALOG_FALLBACK",
            Diagnostic::UnknownCurrency { .. } => "UNKNOWN_CURRENCY",
            Diagnostic::MissingReference { .. } => "MISSING_REFERENCE",
            Diagnostic::InvalidEfficiency { .. } => "INVALID_EFFICIENCY",
        }
    }

    /// One-line description for display
    pub fn message(&self) -> String {
        match self {
            Diagnostic::InvalidGeometry { reason } => format!("Raw weight is zero: {}", reason),
            Diagnostic::FormulaFailure { process, error, .. } => {
                format!("Cycle time for '{}' set to 0: {}", process, error)
            }
            Diagnostic::PriceFallback { item_type, region, source, .. } => match source {
                PriceSource::DefaultRegion => format!(
                    "{} price for region '{}' taken from the Default region",
                    item_type.display_name(),
                    region
                ),
                _ => format!(
                    "{} price for region '{}' taken from the catalog (USD)",
                    item_type.display_name(),
                    region
                ),
            },
            Diagnostic::UnknownCurrency { item_type, from, to, .. } => format!(
                "{} price left in {}: no rate to convert to {}",
                item_type.display_name(),
                from,
                to
            ),
            Diagnostic::MissingReference { kind, reference } => {
                format!("Unknown {:?} '{}'; its cost is treated as 0", kind, reference)
            }
            Diagnostic::InvalidEfficiency { setup, value } => {
                format!("Setup {} efficiency {} is outside (0, 1]; using 1.0", setup + 1, value)
            }
        }
    }
}

/// Ordered collection of diagnostics that logs as it grows.
#[derive(Debug, Default)]
pub(crate) struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub(crate) fn push(&mut self, diagnostic: Diagnostic) {
        warn!(code = diagnostic.code(), "{}", diagnostic.message());
        self.entries.push(diagnostic);
    }

    pub(crate) fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_fallback_codes_are_distinct() {
        let default_region = Diagnostic::PriceFallback {
            item_id: Uuid::nil(),
            item_type: ItemType::Material,
            region: "India".to_string(),
            source: PriceSource::DefaultRegion,
        };
        let catalog = Diagnostic::PriceFallback {
            item_id: Uuid::nil(),
            item_type: ItemType::Material,
            region: "India".to_string(),
            source: PriceSource::CatalogFallback,
        };
        assert_eq!(default_region.code(), "PRICE_DEFAULT_REGION");
        assert_eq!(catalog.code(), "PRICE_CATALOG_FALLBACK");
        assert!(catalog.message().contains("catalog"));
    }

    #[test]
    fn test_formula_failure_serializes_snapshot() {
        let diagnostic = Diagnostic::FormulaFailure {
            process: "Slot Milling".to_string(),
            formula: "L / feed".to_string(),
            variables: VariableMap::from([("L".to_string(), 120.0)]),
            error: FormulaError::UnknownIdentifier { name: "feed".to_string() },
        };
        let json = serde_json::to_string(&diagnostic).unwrap();
        assert!(json.contains("\"type\":\"formula_failure\""));
        assert!(json.contains("\"L\":120.0"));
        let roundtrip: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, diagnostic);
    }

    #[test]
    fn test_log_keeps_order() {
        let mut log = DiagnosticLog::default();
        log.push(Diagnostic::InvalidGeometry { reason: "a".to_string() });
        log.push(Diagnostic::InvalidEfficiency { setup: 0, value: 0.0 });
        let entries = log.into_vec();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].code(), "INVALID_EFFICIENCY");
    }
}
