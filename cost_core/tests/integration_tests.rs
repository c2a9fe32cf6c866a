//! Integration tests for cost_core.

use std::f64::consts::PI;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use cost_core::calculations::{
    calculate, MachiningInput, MarkupRates, Operation, Setup, SurfaceTreatment, WeightBasis,
};
use cost_core::catalog::{Catalog, Machine, Material, Tool};
use cost_core::diagnostics::Diagnostic;
use cost_core::file_io::{load_job, save_job};
use cost_core::geometry::{BilletShape, BilletSpec};
use cost_core::job::CostingJob;
use cost_core::pricing::{
    CurrencyRates, ItemType, PriceResolver, PriceSource, RegionCost, RegionCurrency, DEFAULT_REGION,
};

const ALUMINIUM: Uuid = Uuid::from_u128(0x100);
const VMC: Uuid = Uuid::from_u128(0x200);
const END_MILL: Uuid = Uuid::from_u128(0x300);

fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn catalog() -> Catalog {
    let mut catalog = Catalog::with_standard_processes();
    catalog.materials.push(Material::new(ALUMINIUM, "Al 6061-T6", 2.7, 4.0));
    catalog.machines.push(Machine {
        id: VMC,
        name: "VMC 850".to_string(),
        hourly_rate: 40.0,
        machine_type: "Vertical machining centre".to_string(),
    });
    catalog.tools.push(Tool {
        id: END_MILL,
        name: "Carbide end mill D10 Z4".to_string(),
        diameter_mm: Some(10.0),
        cutting_speed: Some(150.0),
        feed_per_tooth: Some(0.06),
        teeth: Some(4),
        price: Some(45.0),
        estimated_life_hours: Some(2.0),
        ..Tool::default()
    });
    catalog
}

fn rates() -> CurrencyRates {
    CurrencyRates::new().with_rate("USD", 1.0).with_rate("INR", 0.0125)
}

fn region_costs() -> Vec<RegionCost> {
    vec![
        RegionCost::new(ALUMINIUM, ItemType::Material, "India", 350.0, "INR", date(2024, 1, 1)),
        RegionCost::new(ALUMINIUM, ItemType::Material, "India", 900.0, "INR", date(2025, 9, 1)),
        RegionCost::new(VMC, ItemType::Machine, DEFAULT_REGION, 50.0, "USD", date(2023, 1, 1)),
    ]
}

fn face_milling() -> Operation {
    Operation::new("Face Milling")
        .with_tool(END_MILL)
        .with_param("L", 120.0)
        .with_param("W", 50.0)
        .with_param("TD", 10.0)
        .with_param("ap", 5.0)
        .with_param("stepover", 0.7)
}

fn bracket() -> MachiningInput {
    let mut setup = Setup::new(VMC).with_operation(face_milling());
    setup.setup_time_min = 20.0;
    setup.tool_change_time_sec = 12.0;
    setup.efficiency = 0.8;

    MachiningInput {
        label: "Bracket".to_string(),
        material_id: ALUMINIUM,
        billet: BilletSpec::new(BilletShape::Block {
            length_mm: 120.0,
            width_mm: 50.0,
            height_mm: 30.0,
        }),
        transport_cost_per_kg: 10.0,
        setups: vec![setup],
        batch_volume: 10,
        region: "India".to_string(),
        ..MachiningInput::default()
    }
}

mod end_to_end_tests {
    use super::*;

    #[test]
    fn test_face_milling_cycle_time() {
        let rates = rates();
        let resolver = PriceResolver::new(&[], &[], &rates);
        let mut input = bracket();
        input.region = DEFAULT_REGION.to_string();
        let result = calculate(&input, &catalog(), &resolver, date(2025, 6, 1));

        let op = &result.setups[0].operations[0];
        assert!((op.spindle_speed_rpm - 4774.648).abs() < 1e-3);
        assert!((op.feed_rate_mm_min - 1145.916).abs() < 1e-3);
        assert!((op.time_min - 2.0 * 7.0 * (120.0 / op.feed_rate_mm_min)).abs() < 1e-12);
        assert!((result.cutting_time_min - 7.0 * PI / 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_regional_job() {
        let rates = rates();
        let costs = region_costs();
        let currencies = vec![RegionCurrency::new("India", "INR"), RegionCurrency::new(DEFAULT_REGION, "USD")];
        let resolver = PriceResolver::new(&costs, &currencies, &rates);
        let result = calculate(&bracket(), &catalog(), &resolver, date(2025, 6, 1));

        assert_eq!(result.currency, "INR");

        // 120 × 50 × 30 mm at 2.7 g/cm³
        assert!((result.raw_weight_kg - 0.486).abs() < 1e-12);
        // Region row valid now, not the future one
        assert_eq!(result.material_price_per_kg, 350.0);
        assert_eq!(result.material_cost_per_kg, 360.0);
        assert!((result.raw_material_part_cost - 0.486 * 360.0).abs() < 1e-9);

        // Machine from the Default region: 50 USD = 4000 INR
        let cutting = 7.0 * PI / 15.0;
        let effective = (20.0 + 0.2 + cutting) / 0.8;
        assert!((result.setups[0].machine_rate - 4000.0).abs() < 1e-9);
        assert!((result.effective_time_min - effective).abs() < 1e-9);
        assert!((result.machining_cost - effective / 60.0 * 4000.0).abs() < 1e-6);

        // Tool from the catalog: 45 USD = 3600 INR over a 2 h life
        let tool_cost = cutting * 10.0 / 120.0 * 3600.0;
        assert!((result.tool_cost - tool_cost).abs() < 1e-6);

        let sources: Vec<(ItemType, PriceSource)> =
            result.resolved_prices.iter().map(|p| (p.item_type, p.source)).collect();
        assert_eq!(
            sources,
            vec![
                (ItemType::Material, PriceSource::Region),
                (ItemType::Machine, PriceSource::DefaultRegion),
                (ItemType::Tool, PriceSource::CatalogFallback),
            ]
        );

        let codes: Vec<&str> = result.diagnostics.iter().map(Diagnostic::code).collect();
        assert_eq!(codes, vec!["PRICE_DEFAULT_REGION", "PRICE_CATALOG_FALLBACK"]);
    }

    #[test]
    fn test_identical_inputs_identical_results() {
        let rates = rates();
        let costs = region_costs();
        let resolver = PriceResolver::new(&costs, &[], &rates);
        let catalog = catalog();
        let at = date(2025, 6, 1);

        let first = calculate(&bracket(), &catalog, &resolver, at);
        let second = calculate(&bracket(), &catalog, &resolver, at);
        assert_eq!(first, second);
    }

    #[test]
    fn test_evaluation_time_selects_price_row() {
        let rates = rates();
        let costs = region_costs();
        let currencies = vec![RegionCurrency::new("India", "INR")];
        let resolver = PriceResolver::new(&costs, &currencies, &rates);

        let before = calculate(&bracket(), &catalog(), &resolver, date(2025, 6, 1));
        let after = calculate(&bracket(), &catalog(), &resolver, date(2025, 10, 1));
        assert_eq!(before.material_price_per_kg, 350.0);
        assert_eq!(after.material_price_per_kg, 900.0);
    }
}

mod markup_tests {
    use super::*;

    fn markups() -> MarkupRates {
        MarkupRates {
            general_pct: 5.0,
            admin_pct: 3.0,
            sales_pct: 2.0,
            miscellaneous_pct: 1.0,
            packing_pct: 1.5,
            transport_pct: 2.5,
            profit_pct: 15.0,
            duty_pct: 4.0,
        }
    }

    #[test]
    fn test_two_tier_markups() {
        let rates = rates();
        let resolver = PriceResolver::new(&[], &[], &rates);
        let mut input = bracket();
        input.markups = markups();
        input.surface_treatments.push(SurfaceTreatment::per_kg("Anodise", 8.0, WeightBasis::Raw));

        let r = calculate(&input, &catalog(), &resolver, date(2025, 6, 1));

        let tier1 = r.raw_material_part_cost + r.machining_cost + r.tool_cost;
        let tier2 = tier1 + r.surface_treatment_cost;
        assert!((r.tier1_base - tier1).abs() < 1e-12);
        assert!((r.tier2_base - tier2).abs() < 1e-12);
        assert!((r.surface_treatment_cost - 8.0 * r.raw_weight_kg).abs() < 1e-12);

        assert!((r.markups.general - tier1 * 0.05).abs() < 1e-12);
        assert!((r.markups.miscellaneous - tier1 * 0.01).abs() < 1e-12);
        assert!((r.markups.profit - tier2 * 0.15).abs() < 1e-12);
        assert!((r.markups.duty - tier2 * 0.04).abs() < 1e-12);

        let expected = tier2 * (1.0 + 0.015 + 0.025 + 0.15 + 0.04) + tier1 * (0.05 + 0.03 + 0.02 + 0.01);
        assert!((r.cost_per_part - expected).abs() < 1e-9);
        assert!((r.batch.total_cost - r.cost_per_part * 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_surface_treatment_only_moves_tier_two_markups() {
        let rates = rates();
        let resolver = PriceResolver::new(&[], &[], &rates);
        let mut input = bracket();
        input.markups = markups();
        let plain = calculate(&input, &catalog(), &resolver, date(2025, 6, 1));

        input.part_surface_area_m2 = 0.04;
        input.surface_treatments.push(SurfaceTreatment::per_area("Powder coat", 50.0));
        let coated = calculate(&input, &catalog(), &resolver, date(2025, 6, 1));

        assert_eq!(plain.markups.general, coated.markups.general);
        assert_eq!(plain.markups.admin, coated.markups.admin);
        assert_eq!(plain.markups.sales, coated.markups.sales);
        assert_eq!(plain.markups.miscellaneous, coated.markups.miscellaneous);
        assert!(coated.markups.packing > plain.markups.packing);
        assert!(coated.markups.profit > plain.markups.profit);
    }
}

mod degraded_input_tests {
    use super::*;

    #[test]
    fn test_broken_formula_zeroes_only_that_operation() {
        let mut catalog = catalog();
        if let Some(p) = catalog.processes.iter_mut().find(|p| p.name == "Slot Milling") {
            p.formula = "L / undefinedThing".to_string();
        }
        let mut input = bracket();
        input.setups[0]
            .operations
            .push(Operation::new("Slot Milling").with_param("L", 40.0));

        let rates = rates();
        let resolver = PriceResolver::new(&[], &[], &rates);
        let result = calculate(&input, &catalog, &resolver, date(2025, 6, 1));

        let ops = &result.setups[0].operations;
        assert!(ops[0].time_min > 0.0);
        assert_eq!(ops[1].time_min, 0.0);

        let failure = result
            .diagnostics
            .iter()
            .find_map(|d| match d {
                Diagnostic::FormulaFailure { process, variables, .. } => Some((process, variables)),
                _ => None,
            })
            .expect("formula failure diagnostic");
        assert_eq!(failure.0, "Slot Milling");
        assert_eq!(failure.1["L"], 40.0);
    }

    #[test]
    fn test_zero_volume_billet() {
        let mut input = bracket();
        input.billet = BilletSpec::new(BilletShape::RectangleTube {
            width_mm: 40.0,
            height_mm: 20.0,
            wall_thickness_mm: 10.0,
            length_mm: 500.0,
        });
        let rates = rates();
        let resolver = PriceResolver::new(&[], &[], &rates);
        let result = calculate(&input, &catalog(), &resolver, date(2025, 6, 1));

        assert_eq!(result.raw_weight_kg, 0.0);
        assert_eq!(result.raw_material_part_cost, 0.0);
        assert!(result.machining_cost > 0.0);
        assert!(result.diagnostics.iter().any(|d| d.code() == "INVALID_GEOMETRY"));
    }
}

mod job_file_tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_saved_job_costs_the_same() {
        let mut job = CostingJob::new("Bracket", bracket());
        job.catalog = catalog();
        job.region_costs = region_costs();
        job.region_currencies = vec![RegionCurrency::new("India", "INR")];
        job.settings.rates = rates();
        job.evaluated_at = date(2025, 6, 1);

        let dir = tempdir().unwrap();
        let path = dir.path().join("bracket.bwj");
        save_job(&job, &path).unwrap();
        let loaded = load_job(&path).unwrap();

        let before = job.run();
        let after = loaded.run();
        assert_eq!(after.currency, "INR");
        assert_eq!(after.diagnostics.len(), before.diagnostics.len());
        assert!((after.cost_per_part - before.cost_per_part).abs() < 1e-6);
        assert!(job.validate().is_empty());
    }

    #[test]
    fn test_demo_job() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos/bracket.bwj");
        let job = load_job(&path).unwrap();
        assert!(job.validate().is_empty());

        let result = job.run();
        assert_eq!(result.currency, "EUR");
        assert_eq!(result.setups.len(), 2);
        assert!(result.cost_per_part > 0.0);
        assert!(!result
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::FormulaFailure { .. })));
        // Material has a German price row
        assert_eq!(result.material_price_per_kg, 4.6);
    }
}
