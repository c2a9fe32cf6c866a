//! # Standard Process Library
//!
//! Built-in process definitions a catalog can be seeded with. Each entry has
//! a name, a process group, a parameter schema (with units and defaults) and
//! its cycle-time formula.
//!
//! Formulas see the derived cutting variables in addition to their own
//! parameters:
//!
//! | Variable | Meaning | Unit |
//! |----------|---------|------|
//! | `toolDiameter` | Tool diameter D | mm |
//! | `cuttingSpeed` | Cutting speed Vc | m/min |
//! | `feedPerTooth` | Feed per tooth fz | mm |
//! | `feedPerRev` | Feed per revolution fn | mm |
//! | `numberOfTeeth` | Cutting edges z | - |
//! | `spindleSpeed` | n = 1000·Vc / (π·D) | rpm |
//! | `feedRate` | vf, never below 1 | mm/min |
//!
//! ## Usage
//!
//! ```rust
//! use cost_core::formula::library::StandardProcess;
//! use uuid::Uuid;
//!
//! let meta = StandardProcess::FaceMilling.metadata();
//! assert_eq!(meta.name, "Face Milling");
//!
//! let process = StandardProcess::FaceMilling.to_process(Uuid::new_v4());
//! assert!(process.compile().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{Process, ProcessGroup, ProcessParameter};

/// Exact process names with special kinematics.
pub const DRILLING_ON_LATHE: &str = "Drilling (on Lathe)";
pub const BAND_SAWING: &str = "Band Sawing";
pub const CIRCULAR_SAWING: &str = "Circular Sawing";
pub const ABRASIVE_CUT_OFF: &str = "Abrasive Cut-Off";

/// Parameter schema entry with a static name.
#[derive(Debug, Clone, Copy)]
pub struct ParameterTemplate {
    pub name: &'static str,
    pub unit: &'static str,
    pub description: &'static str,
    pub default: Option<f64>,
}

impl ParameterTemplate {
    const fn new(name: &'static str, unit: &'static str, description: &'static str) -> Self {
        Self { name, unit, description, default: None }
    }

    const fn with_default(mut self, default: f64) -> Self {
        self.default = Some(default);
        self
    }
}

/// Complete definition of a built-in process.
#[derive(Debug, Clone)]
pub struct ProcessTemplate {
    pub name: &'static str,
    pub group: ProcessGroup,
    pub description: &'static str,
    pub parameters: Vec<ParameterTemplate>,
    pub formula: &'static str,
}

// ============================================================================
// Process Enum
// ============================================================================

/// Built-in processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardProcess {
    FaceMilling,
    SlotMilling,
    HelicalInterpolation,
    Drilling,
    OdTurning,
    Facing,
    Parting,
    DrillingOnLathe,
    BandSawing,
    CircularSawing,
    AbrasiveCutOff,
    SurfaceGrinding,
    GearHobbing,
}

/// Every built-in process, in catalog order.
pub const ALL_STANDARD_PROCESSES: &[StandardProcess] = &[
    StandardProcess::FaceMilling,
    StandardProcess::SlotMilling,
    StandardProcess::HelicalInterpolation,
    StandardProcess::Drilling,
    StandardProcess::OdTurning,
    StandardProcess::Facing,
    StandardProcess::Parting,
    StandardProcess::DrillingOnLathe,
    StandardProcess::BandSawing,
    StandardProcess::CircularSawing,
    StandardProcess::AbrasiveCutOff,
    StandardProcess::SurfaceGrinding,
    StandardProcess::GearHobbing,
];

const CUT_LENGTH: ParameterTemplate = ParameterTemplate::new("cutLength", "mm", "Length of cut through the section");
const CUT_COUNT: ParameterTemplate = ParameterTemplate::new("cutCount", "-", "Number of cuts").with_default(1.0);

impl StandardProcess {
    pub fn metadata(&self) -> ProcessTemplate {
        match self {
            StandardProcess::FaceMilling => ProcessTemplate {
                name: "Face Milling",
                group: ProcessGroup::Milling,
                description: "Face a rectangular area in depth passes and stepover rows",
                parameters: vec![
                    ParameterTemplate::new("L", "mm", "Face length"),
                    ParameterTemplate::new("W", "mm", "Face width"),
                    ParameterTemplate::new("TD", "mm", "Total depth to remove"),
                    ParameterTemplate::new("ap", "mm", "Depth of cut per pass"),
                    ParameterTemplate::new("stepover", "-", "Stepover as a fraction of tool diameter").with_default(0.7),
                ],
                formula: "(() => {
  const depthPassCount = Math.ceil(TD / ap);
  const widthPassCount = Math.ceil((W - toolDiameter) / (toolDiameter * stepover)) + 1;
  return depthPassCount * widthPassCount * (L / feedRate);
})()",
            },
            StandardProcess::SlotMilling => ProcessTemplate {
                name: "Slot Milling",
                group: ProcessGroup::Milling,
                description: "Full-width slot in depth passes",
                parameters: vec![
                    ParameterTemplate::new("L", "mm", "Slot length"),
                    ParameterTemplate::new("TD", "mm", "Slot depth"),
                    ParameterTemplate::new("ap", "mm", "Depth of cut per pass"),
                ],
                formula: "Math.ceil(TD / ap) * (L / feedRate)",
            },
            StandardProcess::HelicalInterpolation => ProcessTemplate {
                name: "Helical Interpolation",
                group: ProcessGroup::Milling,
                description: "Bore a hole by helical ramping with an end mill",
                parameters: vec![
                    ParameterTemplate::new("holeDiameter", "mm", "Finished hole diameter"),
                    ParameterTemplate::new("depth", "mm", "Hole depth"),
                    ParameterTemplate::new("pitch", "mm", "Axial advance per revolution").with_default(1.0),
                ],
                formula: "(() => {
  const pathDiameter = holeDiameter - toolDiameter;
  const revolutions = Math.ceil(depth / pitch) + 1;
  return pathDiameter > 0 ? revolutions * PI * pathDiameter / feedRate : 0;
})()",
            },
            StandardProcess::Drilling => ProcessTemplate {
                name: "Drilling",
                group: ProcessGroup::HoleMaking,
                description: "Drill a pattern of identical holes",
                parameters: vec![
                    ParameterTemplate::new("depth", "mm", "Hole depth"),
                    ParameterTemplate::new("approach", "mm", "Approach and tip allowance").with_default(2.0),
                    ParameterTemplate::new("holeCount", "-", "Number of holes").with_default(1.0),
                ],
                formula: "holeCount * (depth + approach) / feedRate",
            },
            StandardProcess::OdTurning => ProcessTemplate {
                name: "OD Turning",
                group: ProcessGroup::Turning,
                description: "Reduce an outside diameter over a length",
                parameters: vec![
                    ParameterTemplate::new("startDiameter", "mm", "Diameter before turning"),
                    ParameterTemplate::new("finalDiameter", "mm", "Diameter after turning"),
                    ParameterTemplate::new("length", "mm", "Turned length"),
                    ParameterTemplate::new("ap", "mm", "Radial depth of cut per pass"),
                ],
                formula: "(() => {
  const passes = Math.ceil((startDiameter - finalDiameter) / (2 * ap));
  return passes * length / feedRate;
})()",
            },
            StandardProcess::Facing => ProcessTemplate {
                name: "Facing",
                group: ProcessGroup::Turning,
                description: "Face the end of a bar",
                parameters: vec![
                    ParameterTemplate::new("facingDiameter", "mm", "Diameter of the faced end"),
                    ParameterTemplate::new("stock", "mm", "Axial stock to remove").with_default(1.0),
                    ParameterTemplate::new("ap", "mm", "Depth of cut per pass").with_default(1.0),
                ],
                formula: "Math.ceil(stock / ap) * (facingDiameter / 2) / feedRate",
            },
            StandardProcess::Parting => ProcessTemplate {
                name: "Parting",
                group: ProcessGroup::Turning,
                description: "Part off the finished piece",
                parameters: vec![ParameterTemplate::new("partingDiameter", "mm", "Diameter at the parting line")],
                formula: "(partingDiameter / 2) / feedRate",
            },
            StandardProcess::DrillingOnLathe => ProcessTemplate {
                name: DRILLING_ON_LATHE,
                group: ProcessGroup::Turning,
                description: "Axial drilling with a stationary drill and rotating work",
                parameters: vec![
                    ParameterTemplate::new("depth", "mm", "Hole depth"),
                    ParameterTemplate::new("approach", "mm", "Approach and tip allowance").with_default(2.0),
                ],
                formula: "(depth + approach) / feedRate",
            },
            StandardProcess::BandSawing => ProcessTemplate {
                name: BAND_SAWING,
                group: ProcessGroup::Sawing,
                description: "Cut stock to length on a band saw",
                parameters: vec![
                    ParameterTemplate::new("bladeTPI", "1/in", "Blade teeth per inch").with_default(6.0),
                    CUT_LENGTH,
                    CUT_COUNT,
                ],
                formula: "cutCount * cutLength / feedRate",
            },
            StandardProcess::CircularSawing => ProcessTemplate {
                name: CIRCULAR_SAWING,
                group: ProcessGroup::Sawing,
                description: "Cut stock to length with a circular cold saw",
                parameters: vec![CUT_LENGTH, CUT_COUNT],
                formula: "cutCount * cutLength / feedRate",
            },
            StandardProcess::AbrasiveCutOff => ProcessTemplate {
                name: ABRASIVE_CUT_OFF,
                group: ProcessGroup::Sawing,
                description: "Cut off with an abrasive wheel at a set plunge rate",
                parameters: vec![
                    ParameterTemplate::new("feedRate", "mm/min", "Plunge rate").with_default(50.0),
                    CUT_LENGTH,
                    CUT_COUNT,
                ],
                formula: "cutCount * cutLength / feedRate",
            },
            StandardProcess::SurfaceGrinding => ProcessTemplate {
                name: "Surface Grinding",
                group: ProcessGroup::Grinding,
                description: "Reciprocating surface grind with cross feed",
                parameters: vec![
                    ParameterTemplate::new("L", "mm", "Ground length"),
                    ParameterTemplate::new("W", "mm", "Ground width"),
                    ParameterTemplate::new("stock", "mm", "Stock to remove"),
                    ParameterTemplate::new("doc", "mm", "Depth per pass").with_default(0.01),
                    ParameterTemplate::new("crossFeed", "mm", "Cross feed per stroke").with_default(5.0),
                    ParameterTemplate::new("tableSpeed", "m/min", "Table speed").with_default(15.0),
                    ParameterTemplate::new("overrun", "mm", "Overrun at each end").with_default(10.0),
                ],
                formula: "(() => {
  const passes = Math.ceil(stock / doc);
  const strokes = Math.ceil(W / crossFeed);
  const strokeTime = (L + 2 * overrun) / (tableSpeed * 1000);
  return passes * strokes * strokeTime;
})()",
            },
            StandardProcess::GearHobbing => ProcessTemplate {
                name: "Gear Hobbing",
                group: ProcessGroup::GearCutting,
                description: "Hob a spur gear across its face width",
                parameters: vec![
                    ParameterTemplate::new("gearTeeth", "-", "Number of teeth on the gear"),
                    ParameterTemplate::new("faceWidth", "mm", "Gear face width"),
                    ParameterTemplate::new("axialFeed", "mm/rev", "Axial feed per work revolution").with_default(1.5),
                    ParameterTemplate::new("hobStarts", "-", "Number of hob starts").with_default(1.0),
                    ParameterTemplate::new("approach", "mm", "Approach and overrun").with_default(10.0),
                ],
                formula: "(() => {
  const workRpm = spindleSpeed * hobStarts / gearTeeth;
  return workRpm > 0 ? (faceWidth + approach) / (axialFeed * workRpm) : 0;
})()",
            },
        }
    }

    /// Catalog record for this process under the given id.
    pub fn to_process(&self, id: Uuid) -> Process {
        let meta = self.metadata();
        Process {
            id,
            name: meta.name.to_string(),
            group: meta.group,
            parameters: meta
                .parameters
                .iter()
                .map(|p| ProcessParameter {
                    name: p.name.to_string(),
                    unit: p.unit.to_string(),
                    default: p.default,
                })
                .collect(),
            formula: meta.formula.to_string(),
        }
    }

    /// Look up a built-in process by its exact name.
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_STANDARD_PROCESSES
            .iter()
            .copied()
            .find(|p| p.metadata().name == name)
    }
}

/// Markdown reference for the built-in processes: a summary table, then one
/// section per process with its parameter schema and formula.
pub fn generate_process_markdown() -> String {
    let mut out = String::from("# Standard Processes\n\n");
    out.push_str("| Process | Group | Description |\n|---------|-------|-------------|\n");
    for process in ALL_STANDARD_PROCESSES {
        let meta = process.metadata();
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            meta.name,
            meta.group.display_name(),
            meta.description
        ));
    }

    for process in ALL_STANDARD_PROCESSES {
        let meta = process.metadata();
        out.push_str(&format!("\n## {}\n\n{}\n\n", meta.name, meta.description));
        out.push_str("| Parameter | Unit | Default | Description |\n|-----------|------|---------|-------------|\n");
        for param in &meta.parameters {
            let default = param.default.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(
                "| `{}` | {} | {} | {} |\n",
                param.name, param.unit, default, param.description
            ));
        }
        out.push_str(&format!("\n```js\n{}\n```\n", meta.formula));
    }
    out
}
