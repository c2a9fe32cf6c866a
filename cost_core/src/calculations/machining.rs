//! # Machined Part Cost
//!
//! Costs one part (and its batch) from billet to selling price.
//!
//! ## Pipeline
//!
//! 1. Raw weight from the billet; material price resolved for the region and
//!    loaded with transport and heat treatment per kg.
//! 2. Surface treatments, per kg (raw or finished weight) or per m².
//! 3. Per setup: `(setup + tool changes + Σ cycle times) / efficiency` at the
//!    machine's resolved hourly rate; tool wear per operation.
//! 4. Tier 1 = material + machining + tool. Tier 2 = Tier 1 + surface treatment.
//! 5. General, admin, sales and miscellaneous markups on Tier 1; packing,
//!    transport, profit and duty on Tier 2.
//! 6. Cost per part = Tier 2 + all markups; batch totals multiply by volume.
//!
//! Nothing is rounded along the way. Problems never abort the calculation:
//! the affected component becomes zero and a [`Diagnostic`] is attached.
//!
//! ## Example
//!
//! ```rust
//! use chrono::Utc;
//! use cost_core::calculations::machining::{calculate, MachiningInput, Setup};
//! use cost_core::calculations::Operation;
//! use cost_core::catalog::{Catalog, Machine, Material, Tool};
//! use cost_core::geometry::{BilletShape, BilletSpec};
//! use cost_core::pricing::{CurrencyRates, PriceResolver};
//! use uuid::Uuid;
//!
//! let mut catalog = Catalog::with_standard_processes();
//! let aluminium = Material::new(Uuid::new_v4(), "6061-T6", 2.7, 4.0);
//! let mill = Machine { id: Uuid::new_v4(), name: "VMC".into(), hourly_rate: 60.0, machine_type: "Mill".into() };
//! let cutter = Tool { id: Uuid::new_v4(), diameter_mm: Some(10.0), cutting_speed: Some(150.0),
//!     feed_per_tooth: Some(0.06), teeth: Some(4), ..Tool::default() };
//!
//! let input = MachiningInput {
//!     material_id: aluminium.id,
//!     billet: BilletSpec::new(BilletShape::Block { length_mm: 120.0, width_mm: 50.0, height_mm: 30.0 }),
//!     setups: vec![Setup::new(mill.id).with_operation(
//!         Operation::new("Face Milling").with_tool(cutter.id)
//!             .with_param("L", 120.0).with_param("W", 50.0)
//!             .with_param("TD", 10.0).with_param("ap", 5.0),
//!     )],
//!     batch_volume: 10,
//!     region: "Default".into(),
//!     ..MachiningInput::default()
//! };
//! catalog.materials.push(aluminium);
//! catalog.machines.push(mill);
//! catalog.tools.push(cutter);
//!
//! let rates = CurrencyRates::standard();
//! let resolver = PriceResolver::new(&[], &[], &rates);
//! let result = calculate(&input, &catalog, &resolver, Utc::now());
//!
//! println!("Cost per part: {:.2} {}", result.cost_per_part, result.currency);
//! assert!(result.cost_per_part > 0.0);
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::operation_time::{Operation, ProcessTimer};
use crate::catalog::{Catalog, Tool};
use crate::diagnostics::{Diagnostic, DiagnosticLog, ReferenceKind};
use crate::geometry::{self, round_to, BilletShape, BilletSpec};
use crate::pricing::{ItemType, PriceQuery, ResolvePrice, ResolvedPrice, DEFAULT_REGION};
use crate::units::{Hours, Minutes, Seconds};

// ============================================================================
// Input
// ============================================================================

/// One clamping on one machine.
///
/// ## JSON Example
///
/// ```json
/// {
///   "label": "OP10",
///   "machine_id": "00000000-0000-0000-0000-000000000020",
///   "setup_time_min": 30.0,
///   "tool_change_time_sec": 12.0,
///   "efficiency": 0.85,
///   "operations": [ { "process": "Face Milling", "parameters": { "L": 120.0 } } ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    pub machine_id: Uuid,

    /// Setup time in minutes
    #[serde(default)]
    pub setup_time_min: f64,

    /// Time per tool change in seconds; one change per operation
    #[serde(default)]
    pub tool_change_time_sec: f64,

    /// Fraction of clock time spent productively, in (0, 1]
    #[serde(default = "default_efficiency")]
    pub efficiency: f64,

    #[serde(default)]
    pub operations: Vec<Operation>,
}

fn default_efficiency() -> f64 {
    1.0
}

impl Setup {
    pub fn new(machine_id: Uuid) -> Self {
        Setup {
            label: None,
            machine_id,
            setup_time_min: 0.0,
            tool_change_time_sec: 0.0,
            efficiency: 1.0,
            operations: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }
}

/// Which weight a per-kg surface treatment is charged on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightBasis {
    #[default]
    Raw,
    Finished,
}

/// How a surface treatment is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum TreatmentBasis {
    /// Rate per kg of the chosen weight
    PerKg {
        #[serde(default)]
        weight: WeightBasis,
    },
    /// Rate per m² of part surface
    PerArea,
}

/// Coating, anodising, plating and the like.
///
/// ## JSON Example
///
/// ```json
/// { "name": "Anodise", "basis": "per_area", "rate": 12.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceTreatment {
    pub name: String,
    #[serde(flatten)]
    pub basis: TreatmentBasis,
    /// Rate in the job currency per kg or per m²
    pub rate: f64,
}

impl SurfaceTreatment {
    pub fn per_kg(name: impl Into<String>, rate: f64, weight: WeightBasis) -> Self {
        SurfaceTreatment {
            name: name.into(),
            basis: TreatmentBasis::PerKg { weight },
            rate,
        }
    }

    pub fn per_area(name: impl Into<String>, rate: f64) -> Self {
        SurfaceTreatment {
            name: name.into(),
            basis: TreatmentBasis::PerArea,
            rate,
        }
    }

    /// Cost for one part.
    pub fn cost(&self, raw_weight_kg: f64, finished_weight_kg: f64, surface_area_m2: f64) -> f64 {
        match self.basis {
            TreatmentBasis::PerKg { weight: WeightBasis::Raw } => self.rate * raw_weight_kg,
            TreatmentBasis::PerKg { weight: WeightBasis::Finished } => self.rate * finished_weight_kg,
            TreatmentBasis::PerArea => self.rate * surface_area_m2,
        }
    }
}

/// The eight markup percentages.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupRates {
    pub general_pct: f64,
    pub admin_pct: f64,
    pub sales_pct: f64,
    pub miscellaneous_pct: f64,
    pub packing_pct: f64,
    pub transport_pct: f64,
    pub profit_pct: f64,
    pub duty_pct: f64,
}

impl MarkupRates {
    /// First four on `tier1`, last four on `tier2`.
    pub fn apply(&self, tier1: f64, tier2: f64) -> MarkupCosts {
        let pct = |base: f64, rate: f64| base * rate / 100.0;
        MarkupCosts {
            general: pct(tier1, self.general_pct),
            admin: pct(tier1, self.admin_pct),
            sales: pct(tier1, self.sales_pct),
            miscellaneous: pct(tier1, self.miscellaneous_pct),
            packing: pct(tier2, self.packing_pct),
            transport: pct(tier2, self.transport_pct),
            profit: pct(tier2, self.profit_pct),
            duty: pct(tier2, self.duty_pct),
        }
    }
}

/// Everything needed to cost one part design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachiningInput {
    /// User label (e.g., drawing number)
    #[serde(default)]
    pub label: String,

    pub material_id: Uuid,

    pub billet: BilletSpec,

    /// Finished part weight; the raw weight when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_weight_kg: Option<f64>,

    #[serde(default)]
    pub part_surface_area_m2: f64,

    /// Added to the material price, per kg, in the job currency
    #[serde(default)]
    pub transport_cost_per_kg: f64,

    #[serde(default)]
    pub heat_treatment_cost_per_kg: f64,

    #[serde(default)]
    pub surface_treatments: Vec<SurfaceTreatment>,

    #[serde(default)]
    pub setups: Vec<Setup>,

    #[serde(default)]
    pub markups: MarkupRates,

    pub batch_volume: u32,

    pub region: String,

    /// Quote currency; the region's currency when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl Default for MachiningInput {
    fn default() -> Self {
        MachiningInput {
            label: String::new(),
            material_id: Uuid::nil(),
            billet: BilletSpec::new(BilletShape::Cube { side_mm: 0.0 }),
            finished_weight_kg: None,
            part_surface_area_m2: 0.0,
            transport_cost_per_kg: 0.0,
            heat_treatment_cost_per_kg: 0.0,
            surface_treatments: Vec::new(),
            setups: Vec::new(),
            markups: MarkupRates::default(),
            batch_volume: 1,
            region: DEFAULT_REGION.to_string(),
            currency: None,
        }
    }
}

// ============================================================================
// Result
// ============================================================================

/// Markup amounts per part.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MarkupCosts {
    pub general: f64,
    pub admin: f64,
    pub sales: f64,
    pub miscellaneous: f64,
    pub packing: f64,
    pub transport: f64,
    pub profit: f64,
    pub duty: f64,
}

impl MarkupCosts {
    pub fn total(&self) -> f64 {
        self.general
            + self.admin
            + self.sales
            + self.miscellaneous
            + self.packing
            + self.transport
            + self.profit
            + self.duty
    }

    fn rounded(&self, decimals: i32) -> Self {
        let r = |v: f64| round_to(v, decimals);
        MarkupCosts {
            general: r(self.general),
            admin: r(self.admin),
            sales: r(self.sales),
            miscellaneous: r(self.miscellaneous),
            packing: r(self.packing),
            transport: r(self.transport),
            profit: r(self.profit),
            duty: r(self.duty),
        }
    }
}

/// Per-part components multiplied by the batch volume.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchTotals {
    pub material_cost: f64,
    pub surface_treatment_cost: f64,
    pub machining_cost: f64,
    pub tool_cost: f64,
    pub markup_cost: f64,
    pub total_cost: f64,
}

impl BatchTotals {
    fn rounded(&self, decimals: i32) -> Self {
        let r = |v: f64| round_to(v, decimals);
        BatchTotals {
            material_cost: r(self.material_cost),
            surface_treatment_cost: r(self.surface_treatment_cost),
            machining_cost: r(self.machining_cost),
            tool_cost: r(self.tool_cost),
            markup_cost: r(self.markup_cost),
            total_cost: r(self.total_cost),
        }
    }
}

/// Cost and timing of one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationBreakdown {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub process: String,
    /// Raw cycle time in minutes
    pub time_min: f64,
    pub spindle_speed_rpm: f64,
    pub feed_rate_mm_min: f64,
    pub tool_cost: f64,
}

/// Cost and timing of one setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupBreakdown {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub machine_id: Uuid,
    /// Resolved hourly rate in the job currency
    pub machine_rate: f64,
    pub efficiency: f64,
    pub setup_time_min: f64,
    pub tool_change_time_min: f64,
    pub cutting_time_min: f64,
    /// `(setup + tool change + cutting) / efficiency`
    pub effective_time_min: f64,
    pub machining_cost: f64,
    pub tool_cost: f64,
    pub operations: Vec<OperationBreakdown>,
}

/// Complete costing of one part and its batch.
///
/// All amounts are in [`MachiningResult::currency`] and per part unless the
/// field says otherwise. The exception is a price with no usable exchange
/// rate: it enters the totals in its source currency, is listed in
/// `resolved_prices` with `conversion_skipped` set, and raises an
/// `UnknownCurrency` diagnostic. [`MachiningResult::has_mixed_currencies`]
/// reports whether that happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachiningResult {
    pub currency: String,

    // Weights
    pub raw_weight_kg: f64,
    pub finished_weight_kg: f64,

    // Material
    /// Resolved material price per kg
    pub material_price_per_kg: f64,
    /// Price plus transport and heat treatment per kg
    pub material_cost_per_kg: f64,
    pub raw_material_part_cost: f64,

    pub surface_treatment_cost: f64,

    // Time breakdown (minutes)
    pub cutting_time_min: f64,
    pub setup_time_min: f64,
    pub tool_change_time_min: f64,
    /// Sum over setups after efficiency
    pub effective_time_min: f64,

    pub machining_cost: f64,
    pub tool_cost: f64,

    /// Material + machining + tool
    pub tier1_base: f64,
    /// Tier 1 + surface treatment
    pub tier2_base: f64,
    pub markups: MarkupCosts,
    pub total_markup_cost: f64,

    pub cost_per_part: f64,

    pub batch_volume: u32,
    pub batch: BatchTotals,

    pub setups: Vec<SetupBreakdown>,

    /// Every price used, once per item, in resolution order
    pub resolved_prices: Vec<ResolvedPrice>,

    pub diagnostics: Vec<Diagnostic>,
}

impl MachiningResult {
    /// Copy with every amount, weight and time rounded for display.
    pub fn rounded(&self, decimals: i32) -> MachiningResult {
        let r = |v: f64| round_to(v, decimals);
        MachiningResult {
            currency: self.currency.clone(),
            raw_weight_kg: r(self.raw_weight_kg),
            finished_weight_kg: r(self.finished_weight_kg),
            material_price_per_kg: r(self.material_price_per_kg),
            material_cost_per_kg: r(self.material_cost_per_kg),
            raw_material_part_cost: r(self.raw_material_part_cost),
            surface_treatment_cost: r(self.surface_treatment_cost),
            cutting_time_min: r(self.cutting_time_min),
            setup_time_min: r(self.setup_time_min),
            tool_change_time_min: r(self.tool_change_time_min),
            effective_time_min: r(self.effective_time_min),
            machining_cost: r(self.machining_cost),
            tool_cost: r(self.tool_cost),
            tier1_base: r(self.tier1_base),
            tier2_base: r(self.tier2_base),
            markups: self.markups.rounded(decimals),
            total_markup_cost: r(self.total_markup_cost),
            cost_per_part: r(self.cost_per_part),
            batch_volume: self.batch_volume,
            batch: self.batch.rounded(decimals),
            setups: self
                .setups
                .iter()
                .map(|s| SetupBreakdown {
                    label: s.label.clone(),
                    machine_id: s.machine_id,
                    machine_rate: r(s.machine_rate),
                    efficiency: s.efficiency,
                    setup_time_min: r(s.setup_time_min),
                    tool_change_time_min: r(s.tool_change_time_min),
                    cutting_time_min: r(s.cutting_time_min),
                    effective_time_min: r(s.effective_time_min),
                    machining_cost: r(s.machining_cost),
                    tool_cost: r(s.tool_cost),
                    operations: s
                        .operations
                        .iter()
                        .map(|o| OperationBreakdown {
                            label: o.label.clone(),
                            process: o.process.clone(),
                            time_min: r(o.time_min),
                            spindle_speed_rpm: r(o.spindle_speed_rpm),
                            feed_rate_mm_min: r(o.feed_rate_mm_min),
                            tool_cost: r(o.tool_cost),
                        })
                        .collect(),
                })
                .collect(),
            resolved_prices: self.resolved_prices.clone(),
            diagnostics: self.diagnostics.clone(),
        }
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// True when some price could not be converted, so the totals add
    /// amounts from more than one currency.
    pub fn has_mixed_currencies(&self) -> bool {
        self.resolved_prices.iter().any(|p| p.conversion_skipped)
    }
}

// ============================================================================
// Price lookups
// ============================================================================

/// Resolves each item at most once per calculation and records the outcome.
struct PriceBook<'r, R: ResolvePrice + ?Sized> {
    resolver: &'r R,
    region: &'r str,
    currency: &'r str,
    at: DateTime<Utc>,
    cache: HashMap<(ItemType, Uuid), f64>,
    resolved: Vec<ResolvedPrice>,
}

impl<'r, R: ResolvePrice + ?Sized> PriceBook<'r, R> {
    fn new(resolver: &'r R, region: &'r str, currency: &'r str, at: DateTime<Utc>) -> Self {
        PriceBook {
            resolver,
            region,
            currency,
            at,
            cache: HashMap::new(),
            resolved: Vec::new(),
        }
    }

    fn price(&mut self, item_type: ItemType, item_id: Uuid, catalog_price: f64, log: &mut DiagnosticLog) -> f64 {
        if let Some(price) = self.cache.get(&(item_type, item_id)) {
            return *price;
        }

        let resolved = self.resolver.resolve(&PriceQuery {
            item_id,
            item_type,
            region: self.region,
            at: self.at,
            target_currency: self.currency,
            catalog_fallback_price: catalog_price,
        });

        if resolved.used_fallback() {
            log.push(Diagnostic::PriceFallback {
                item_id,
                item_type,
                region: self.region.to_string(),
                source: resolved.source,
            });
        }
        if resolved.conversion_skipped {
            log.push(Diagnostic::UnknownCurrency {
                item_id,
                item_type,
                from: resolved.source_currency.clone(),
                to: self.currency.to_string(),
            });
        }

        let price = resolved.price;
        self.cache.insert((item_type, item_id), price);
        self.resolved.push(resolved);
        price
    }
}

// ============================================================================
// Calculation
// ============================================================================

/// Cost a part.
///
/// `at` is the moment prices are looked up for; pass the same value to get
/// the same result.
pub fn calculate<R: ResolvePrice + ?Sized>(
    input: &MachiningInput,
    catalog: &Catalog,
    resolver: &R,
    at: DateTime<Utc>,
) -> MachiningResult {
    let mut log = DiagnosticLog::default();
    let currency = input
        .currency
        .clone()
        .unwrap_or_else(|| resolver.currency_for_region(&input.region));
    let mut prices = PriceBook::new(resolver, &input.region, &currency, at);

    // === Material ===
    let material = catalog.material(input.material_id);
    if material.is_none() {
        log.push(Diagnostic::MissingReference {
            kind: ReferenceKind::Material,
            reference: input.material_id.to_string(),
        });
    }

    let density = input.billet.density(material.map(|m| m.density_g_cm3));
    let raw_weight_kg = geometry::weight_kg(&input.billet.shape, density).value();
    if let Err(e) = input.billet.shape.validate() {
        log.push(Diagnostic::InvalidGeometry { reason: e.to_string() });
    } else if !(density.0.is_finite() && density.0 > 0.0) {
        log.push(Diagnostic::InvalidGeometry {
            reason: format!("Density must be a positive number, got {}", density.0),
        });
    }
    let finished_weight_kg = input.finished_weight_kg.unwrap_or(raw_weight_kg);

    let material_price_per_kg = match material {
        Some(m) => prices.price(ItemType::Material, m.id, m.cost_per_kg, &mut log),
        None => 0.0,
    };
    let material_cost_per_kg =
        material_price_per_kg + input.transport_cost_per_kg + input.heat_treatment_cost_per_kg;
    let raw_material_part_cost = raw_weight_kg * material_cost_per_kg;

    debug!(
        shape = input.billet.shape.name(),
        raw_weight_kg,
        finished_weight_kg,
        material_price_per_kg,
        material_cost_per_kg,
        raw_material_part_cost,
        "material costed"
    );

    // === Surface treatment ===
    let surface_treatment_cost: f64 = input
        .surface_treatments
        .iter()
        .map(|t| t.cost(raw_weight_kg, finished_weight_kg, input.part_surface_area_m2))
        .sum();

    // === Setups ===
    let mut timers: HashMap<&str, ProcessTimer<'_>> = HashMap::new();
    let mut setups = Vec::with_capacity(input.setups.len());

    for (index, setup) in input.setups.iter().enumerate() {
        let efficiency = if setup.efficiency.is_finite() && setup.efficiency > 0.0 && setup.efficiency <= 1.0 {
            setup.efficiency
        } else {
            log.push(Diagnostic::InvalidEfficiency {
                setup: index,
                value: setup.efficiency,
            });
            1.0
        };

        let machine_rate = match catalog.machine(setup.machine_id) {
            Some(machine) => prices.price(ItemType::Machine, machine.id, machine.hourly_rate, &mut log),
            None => {
                log.push(Diagnostic::MissingReference {
                    kind: ReferenceKind::Machine,
                    reference: setup.machine_id.to_string(),
                });
                0.0
            }
        };

        let mut operations = Vec::with_capacity(setup.operations.len());
        for operation in &setup.operations {
            let tool = lookup_tool(catalog, operation, &mut log);

            let Some(process) = catalog.process(&operation.process) else {
                log.push(Diagnostic::MissingReference {
                    kind: ReferenceKind::Process,
                    reference: operation.process.clone(),
                });
                operations.push(OperationBreakdown {
                    label: operation.label.clone(),
                    process: operation.process.clone(),
                    time_min: 0.0,
                    spindle_speed_rpm: 0.0,
                    feed_rate_mm_min: 0.0,
                    tool_cost: 0.0,
                });
                continue;
            };

            let timer = timers
                .entry(process.name.as_str())
                .or_insert_with(|| ProcessTimer::new(process));
            let timing = timer.time(operation, tool);
            if let Some(error) = &timing.error {
                log.push(Diagnostic::FormulaFailure {
                    process: process.name.clone(),
                    formula: process.formula.clone(),
                    variables: timing.variables.clone(),
                    error: error.clone(),
                });
            }

            let tool_cost = match tool {
                Some(tool) => tool_wear_cost(tool, operation, timing.minutes, input.batch_volume, &mut prices, &mut log),
                None => 0.0,
            };

            debug!(
                process = %process.name,
                time_min = timing.minutes,
                spindle_speed = timing.spindle_speed(),
                feed_rate = timing.feed_rate(),
                tool_cost,
                "operation timed"
            );

            operations.push(OperationBreakdown {
                label: operation.label.clone(),
                process: process.name.clone(),
                time_min: timing.minutes,
                spindle_speed_rpm: timing.spindle_speed(),
                feed_rate_mm_min: timing.feed_rate(),
                tool_cost,
            });
        }

        let cutting_time_min: f64 = operations.iter().map(|o| o.time_min).sum();
        let tool_change_time_min =
            Minutes::from(Seconds(setup.tool_change_time_sec)).value() * setup.operations.len() as f64;
        let effective_time_min = (setup.setup_time_min + tool_change_time_min + cutting_time_min) / efficiency;
        let machining_cost = Hours::from(Minutes(effective_time_min)).value() * machine_rate;
        let tool_cost: f64 = operations.iter().map(|o| o.tool_cost).sum();

        debug!(
            setup = index,
            machine_rate,
            efficiency,
            cutting_time_min,
            effective_time_min,
            machining_cost,
            "setup costed"
        );

        setups.push(SetupBreakdown {
            label: setup.label.clone(),
            machine_id: setup.machine_id,
            machine_rate,
            efficiency,
            setup_time_min: setup.setup_time_min,
            tool_change_time_min,
            cutting_time_min,
            effective_time_min,
            machining_cost,
            tool_cost,
            operations,
        });
    }

    let cutting_time_min: f64 = setups.iter().map(|s| s.cutting_time_min).sum();
    let setup_time_min: f64 = setups.iter().map(|s| s.setup_time_min).sum();
    let tool_change_time_min: f64 = setups.iter().map(|s| s.tool_change_time_min).sum();
    let effective_time_min: f64 = setups.iter().map(|s| s.effective_time_min).sum();
    let machining_cost: f64 = setups.iter().map(|s| s.machining_cost).sum();
    let tool_cost: f64 = setups.iter().map(|s| s.tool_cost).sum();

    // === Markups ===
    let tier1_base = raw_material_part_cost + machining_cost + tool_cost;
    let tier2_base = tier1_base + surface_treatment_cost;
    let markups = input.markups.apply(tier1_base, tier2_base);
    let total_markup_cost = markups.total();
    let cost_per_part = tier2_base + total_markup_cost;

    let volume = f64::from(input.batch_volume);
    let batch = BatchTotals {
        material_cost: raw_material_part_cost * volume,
        surface_treatment_cost: surface_treatment_cost * volume,
        machining_cost: machining_cost * volume,
        tool_cost: tool_cost * volume,
        markup_cost: total_markup_cost * volume,
        total_cost: cost_per_part * volume,
    };

    let resolved_prices = prices.resolved;
    let diagnostics = log.into_vec();

    info!(
        label = %input.label,
        currency = %currency,
        cost_per_part,
        batch_volume = input.batch_volume,
        batch_total = batch.total_cost,
        diagnostics = diagnostics.len(),
        "part costed"
    );

    MachiningResult {
        currency,
        raw_weight_kg,
        finished_weight_kg,
        material_price_per_kg,
        material_cost_per_kg,
        raw_material_part_cost,
        surface_treatment_cost,
        cutting_time_min,
        setup_time_min,
        tool_change_time_min,
        effective_time_min,
        machining_cost,
        tool_cost,
        tier1_base,
        tier2_base,
        markups,
        total_markup_cost,
        cost_per_part,
        batch_volume: input.batch_volume,
        batch,
        setups,
        resolved_prices,
        diagnostics,
    }
}

fn lookup_tool<'c>(catalog: &'c Catalog, operation: &Operation, log: &mut DiagnosticLog) -> Option<&'c Tool> {
    let id = operation.tool_id?;
    let tool = catalog.tool(id);
    if tool.is_none() {
        log.push(Diagnostic::MissingReference {
            kind: ReferenceKind::Tool,
            reference: id.to_string(),
        });
    }
    tool
}

/// `(time · batch / (life · 60)) · price`, or zero unless the tool has a
/// price and a positive life.
fn tool_wear_cost<R: ResolvePrice + ?Sized>(
    tool: &Tool,
    operation: &Operation,
    time_min: f64,
    batch_volume: u32,
    prices: &mut PriceBook<'_, R>,
    log: &mut DiagnosticLog,
) -> f64 {
    let life_hours = operation.tool_life_hours.or(tool.estimated_life_hours);
    match (tool.price, life_hours) {
        (Some(catalog_price), Some(life)) if life.is_finite() && life > 0.0 => {
            let price = prices.price(ItemType::Tool, tool.id, catalog_price, log);
            time_min * f64::from(batch_volume) / Minutes::from(Hours(life)).value() * price
        }
        _ => 0.0,
    }
}
