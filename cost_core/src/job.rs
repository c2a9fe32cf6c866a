//! # Costing Job Snapshot
//!
//! The `CostingJob` struct bundles everything one costing run needs: the part
//! input, the catalog, regional price history and the settings that steer
//! price resolution. Jobs serialize to `.bwj` files as human-readable JSON.
//!
//! ## Structure
//!
//! ```text
//! CostingJob
//! ├── meta: JobMetadata (schema version, label, created)
//! ├── settings: CostingSettings (default region, fallback currency, rates)
//! ├── catalog: Catalog (materials, machines, tools, processes)
//! ├── region_costs: [RegionCost]
//! ├── region_currencies: [RegionCurrency]
//! ├── evaluated_at: DateTime<Utc>
//! └── input: MachiningInput
//! ```
//!
//! ## Example
//!
//! ```rust
//! use cost_core::calculations::MachiningInput;
//! use cost_core::job::CostingJob;
//!
//! let job = CostingJob::new("Bracket rev B", MachiningInput::default());
//! let result = job.run();
//! assert_eq!(result.currency, "USD");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calculations::{self, MachiningInput, MachiningResult};
use crate::catalog::Catalog;
use crate::errors::CostError;
use crate::pricing::{CurrencyRates, PriceResolver, RegionCost, RegionCurrency, DEFAULT_REGION, USD};

/// Current schema version for job files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Root job container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostingJob {
    pub meta: JobMetadata,

    #[serde(default)]
    pub settings: CostingSettings,

    #[serde(default)]
    pub catalog: Catalog,

    #[serde(default)]
    pub region_costs: Vec<RegionCost>,

    #[serde(default)]
    pub region_currencies: Vec<RegionCurrency>,

    /// Moment prices are resolved for
    pub evaluated_at: DateTime<Utc>,

    pub input: MachiningInput,
}

impl CostingJob {
    /// New job evaluated now, with the standard process library in its catalog.
    pub fn new(label: impl Into<String>, input: MachiningInput) -> Self {
        let now = Utc::now();
        CostingJob {
            meta: JobMetadata {
                version: SCHEMA_VERSION.to_string(),
                label: label.into(),
                created: now,
            },
            settings: CostingSettings::default(),
            catalog: Catalog::with_standard_processes(),
            region_costs: Vec::new(),
            region_currencies: Vec::new(),
            evaluated_at: now,
            input,
        }
    }

    /// Resolver over this job's price data and settings.
    pub fn resolver(&self) -> PriceResolver<'_> {
        PriceResolver::new(&self.region_costs, &self.region_currencies, &self.settings.rates)
            .with_default_region(self.settings.default_region.clone())
            .with_fallback_currency(self.settings.fallback_currency.clone())
    }

    /// Everything in the job that would zero a cost component.
    ///
    /// Costing tolerates all of these; this is for callers that want to
    /// reject a job up front. Formulas that fail only at evaluation time
    /// (unknown identifiers, negative results) are not caught here.
    pub fn validate(&self) -> Vec<CostError> {
        let mut problems = Vec::new();
        let input = &self.input;

        if let Err(e) = input.billet.shape.validate() {
            problems.push(e);
        }
        if self.catalog.material(input.material_id).is_none() {
            problems.push(CostError::not_found("Material", input.material_id.to_string()));
        }

        for setup in &input.setups {
            if self.catalog.machine(setup.machine_id).is_none() {
                problems.push(CostError::not_found("Machine", setup.machine_id.to_string()));
            }
            for operation in &setup.operations {
                if let Some(tool_id) = operation.tool_id {
                    if self.catalog.tool(tool_id).is_none() {
                        problems.push(CostError::not_found("Tool", tool_id.to_string()));
                    }
                }
                match self.catalog.process(&operation.process) {
                    Some(process) => {
                        if let Err(e) = process.compile() {
                            problems.push(CostError::formula(&process.name, e.to_string()));
                        }
                    }
                    None => problems.push(CostError::not_found("Process", &operation.process)),
                }
            }
        }

        problems
    }

    /// Cost the job's part.
    pub fn run(&self) -> MachiningResult {
        calculations::calculate(&self.input, &self.catalog, &self.resolver(), self.evaluated_at)
    }
}

/// Job metadata stored in the file header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    #[serde(default)]
    pub label: String,

    pub created: DateTime<Utc>,
}

/// Settings that steer price resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostingSettings {
    /// Region every other region falls back to
    pub default_region: String,

    /// Currency of catalog prices, and of regions with no currency mapping
    pub fallback_currency: String,

    /// Value of one unit of each currency in USD
    pub rates: CurrencyRates,
}

impl Default for CostingSettings {
    fn default() -> Self {
        CostingSettings {
            default_region: DEFAULT_REGION.to_string(),
            fallback_currency: USD.to_string(),
            rates: CurrencyRates::standard(),
        }
    }
}
