//! # Catalog Snapshot
//!
//! Materials, machines, tools and processes as supplied by the surrounding
//! application. The engine only reads them; every lookup returns `Option` and
//! a missing record degrades the corresponding cost component to zero.
//!
//! Catalog prices (`cost_per_kg`, `hourly_rate`, `price`) are the last resort
//! of price resolution and are always denominated in USD.
//!
//! ## Example
//!
//! ```rust
//! use cost_core::catalog::{Catalog, Material};
//! use uuid::Uuid;
//!
//! let mut catalog = Catalog::default();
//! let id = Uuid::new_v4();
//! catalog.materials.push(Material::new(id, "AlMg3", 2.66, 4.2));
//! assert_eq!(catalog.material(id).map(|m| m.density_g_cm3), Some(2.66));
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::formula::{Formula, FormulaError, StandardProcess, ALL_STANDARD_PROCESSES};

/// Raw material record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: Uuid,
    pub name: String,
    /// Density in g/cm³
    pub density_g_cm3: f64,
    /// Catalog price per kilogram (USD)
    pub cost_per_kg: f64,
}

impl Material {
    pub fn new(id: Uuid, name: impl Into<String>, density_g_cm3: f64, cost_per_kg: f64) -> Self {
        Material {
            id,
            name: name.into(),
            density_g_cm3,
            cost_per_kg,
        }
    }
}

/// Machine record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub id: Uuid,
    pub name: String,
    /// Catalog hourly rate (USD)
    pub hourly_rate: f64,
    /// Free-form machine type, e.g. "VMC", "CNC Lathe"
    #[serde(default)]
    pub machine_type: String,
}

/// Cutting tool record. Values here are defaults an operation may override.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tool {
    pub id: Uuid,
    pub name: String,
    /// Tool diameter (mm)
    #[serde(default)]
    pub diameter_mm: Option<f64>,
    /// Cutting speed Vc (m/min)
    #[serde(default)]
    pub cutting_speed: Option<f64>,
    /// Feed per tooth fz (mm)
    #[serde(default)]
    pub feed_per_tooth: Option<f64>,
    /// Feed per revolution fn (mm), used by turning
    #[serde(default)]
    pub feed_per_rev: Option<f64>,
    /// Number of cutting edges z
    #[serde(default)]
    pub teeth: Option<u32>,
    /// Catalog price (USD)
    #[serde(default)]
    pub price: Option<f64>,
    /// Expected cutting life before replacement (hours)
    #[serde(default)]
    pub estimated_life_hours: Option<f64>,
}

/// Process family. Decides how spindle speed and feed rate are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessGroup {
    Milling,
    Turning,
    Sawing,
    HoleMaking,
    Grinding,
    GearCutting,
    Other,
}

impl ProcessGroup {
    pub fn display_name(&self) -> &'static str {
        match self {
            ProcessGroup::Milling => "Milling",
            ProcessGroup::Turning => "Turning",
            ProcessGroup::Sawing => "Sawing",
            ProcessGroup::HoleMaking => "Hole Making",
            ProcessGroup::Grinding => "Grinding",
            ProcessGroup::GearCutting => "Gear Cutting",
            ProcessGroup::Other => "Other",
        }
    }
}

/// One entry of a process parameter schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessParameter {
    /// Variable name as used in the formula
    pub name: String,
    /// Display unit, e.g. "mm", "mm/min", "-"
    #[serde(default)]
    pub unit: String,
    /// Value used when the operation does not supply one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<f64>,
}

/// Machining process definition with its cycle-time formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub id: Uuid,
    pub name: String,
    pub group: ProcessGroup,
    #[serde(default)]
    pub parameters: Vec<ProcessParameter>,
    /// Formula text, see [`crate::formula`]
    #[serde(default)]
    pub formula: String,
}

impl Process {
    /// Compile this process's formula.
    pub fn compile(&self) -> Result<Formula, FormulaError> {
        Formula::parse(&self.formula)
    }
}

/// In-memory catalog snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub machines: Vec<Machine>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub processes: Vec<Process>,
}

impl Catalog {
    /// Catalog seeded with every built-in process, each under a fresh id.
    pub fn with_standard_processes() -> Self {
        Catalog {
            processes: ALL_STANDARD_PROCESSES
                .iter()
                .map(|p| p.to_process(Uuid::new_v4()))
                .collect(),
            ..Catalog::default()
        }
    }

    pub fn material(&self, id: Uuid) -> Option<&Material> {
        self.materials.iter().find(|m| m.id == id)
    }

    pub fn machine(&self, id: Uuid) -> Option<&Machine> {
        self.machines.iter().find(|m| m.id == id)
    }

    pub fn tool(&self, id: Uuid) -> Option<&Tool> {
        self.tools.iter().find(|t| t.id == id)
    }

    /// Processes are referenced by name from operations.
    pub fn process(&self, name: &str) -> Option<&Process> {
        self.processes.iter().find(|p| p.name == name)
    }

    /// Add a built-in process unless one with the same name exists.
    pub fn add_standard_process(&mut self, process: StandardProcess, id: Uuid) -> &Process {
        let name = process.metadata().name;
        match self.processes.iter().position(|p| p.name == name) {
            Some(index) => &self.processes[index],
            None => {
                self.processes.push(process.to_process(id));
                &self.processes[self.processes.len() - 1]
            }
        }
    }
}
