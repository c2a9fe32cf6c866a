//! # Operation Cycle Time
//!
//! Builds the variable set a process formula is evaluated against and runs
//! the formula. The spindle speed and feed rate a formula sees depend on the
//! process kinematics:
//!
//! | Kinematics | Spindle speed n (rpm) | Feed rate vf (mm/min) |
//! |------------|-----------------------|-----------------------|
//! | Milling (and every non-turning, non-sawing group) | 1000·Vc / (π·D_tool) | n · fz · z |
//! | Turning | 1000·Vc / (π·D_work) | n · fn |
//! | Drilling (on Lathe) | 1000·Vc / (π·D_tool) | n · fn |
//! | Band sawing | 1000·Vc / (π·D_tool) | fz · TPI·25.4 · Vc |
//! | Circular sawing | 1000·Vc / (π·D_tool) | n · fz · z |
//! | Abrasive cut-off | 1000·Vc / (π·D_tool) | `feedRate` as entered |
//!
//! The feed rate is never allowed below 1 mm/min before the formula runs.
//!
//! Variables are layered, later layers winning: process parameter defaults,
//! tool defaults, operation overrides, the derived `spindleSpeed` and
//! `feedRate`, and finally `PI`, which nothing can override.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{Process, ProcessGroup, Tool};
use crate::formula::library::{ABRASIVE_CUT_OFF, BAND_SAWING, DRILLING_ON_LATHE};
use crate::formula::{Evaluate, Formula, FormulaError, VariableMap};

pub const TOOL_DIAMETER: &str = "toolDiameter";
pub const CUTTING_SPEED: &str = "cuttingSpeed";
pub const FEED_PER_TOOTH: &str = "feedPerTooth";
pub const FEED_PER_REV: &str = "feedPerRev";
pub const NUMBER_OF_TEETH: &str = "numberOfTeeth";
pub const SPINDLE_SPEED: &str = "spindleSpeed";
pub const FEED_RATE: &str = "feedRate";
pub const BLADE_TPI: &str = "bladeTPI";
pub const PI_NAME: &str = "PI";

/// Turning parameters that name the workpiece diameter, in lookup order.
pub const WORKPIECE_DIAMETER_KEYS: [&str; 5] = [
    "workpieceDiameter",
    "startDiameter",
    "facingDiameter",
    "partingDiameter",
    "diameter",
];

/// Lowest feed rate handed to a formula (mm/min).
pub const MIN_FEED_RATE: f64 = 1.0;

/// One machining operation within a setup.
///
/// ## JSON Example
///
/// ```json
/// {
///   "process": "Face Milling",
///   "tool_id": "00000000-0000-0000-0000-000000000010",
///   "parameters": { "L": 120.0, "W": 50.0, "TD": 10.0, "ap": 5.0 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Process name, matched exactly against the catalog
    pub process: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<Uuid>,

    /// Overrides for process parameters and tool cutting data
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,

    /// Tool life for this operation (hours), overriding the tool's estimate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_life_hours: Option<f64>,
}

impl Operation {
    pub fn new(process: impl Into<String>) -> Self {
        Operation {
            process: process.into(),
            ..Operation::default()
        }
    }

    pub fn with_tool(mut self, tool_id: Uuid) -> Self {
        self.tool_id = Some(tool_id);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn with_tool_life(mut self, hours: f64) -> Self {
        self.tool_life_hours = Some(hours);
        self
    }
}

/// How spindle speed and feed rate are derived for a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kinematics {
    /// Rotating tool: milling, hole making, grinding, gear cutting, other
    Milling,
    /// Rotating work; the tool diameter is used only for lathe drilling
    Turning { tool_diameter: bool },
    BandSaw,
    CircularSaw,
    AbrasiveCutOff,
}

impl Kinematics {
    /// Pick the kinematics once per process.
    pub fn for_process(process: &Process) -> Self {
        match process.group {
            ProcessGroup::Turning => Kinematics::Turning {
                tool_diameter: process.name == DRILLING_ON_LATHE,
            },
            ProcessGroup::Sawing => match process.name.as_str() {
                BAND_SAWING => Kinematics::BandSaw,
                ABRASIVE_CUT_OFF => Kinematics::AbrasiveCutOff,
                _ => Kinematics::CircularSaw,
            },
            ProcessGroup::Milling
            | ProcessGroup::HoleMaking
            | ProcessGroup::Grinding
            | ProcessGroup::GearCutting
            | ProcessGroup::Other => Kinematics::Milling,
        }
    }

    /// Add `spindleSpeed` and `feedRate` to a variable map that already holds
    /// the layered cutting data.
    pub fn derive_variables(&self, vars: &mut VariableMap) {
        let get = |name: &str| vars.get(name).copied().unwrap_or(0.0);
        let vc = get(CUTTING_SPEED);

        let (spindle_speed, feed_rate) = match *self {
            Kinematics::Milling | Kinematics::CircularSaw => {
                let n = spindle_speed(vc, get(TOOL_DIAMETER));
                (n, n * get(FEED_PER_TOOTH) * get(NUMBER_OF_TEETH))
            }
            Kinematics::Turning { tool_diameter } => {
                let diameter = if tool_diameter {
                    get(TOOL_DIAMETER)
                } else {
                    workpiece_diameter(vars)
                };
                let n = spindle_speed(vc, diameter);
                (n, n * get(FEED_PER_REV))
            }
            Kinematics::BandSaw => {
                let n = spindle_speed(vc, get(TOOL_DIAMETER));
                (n, get(FEED_PER_TOOTH) * get(BLADE_TPI) * 25.4 * vc)
            }
            Kinematics::AbrasiveCutOff => (spindle_speed(vc, get(TOOL_DIAMETER)), get(FEED_RATE)),
        };

        vars.insert(SPINDLE_SPEED.to_string(), spindle_speed);
        // NaN.max(1.0) is 1.0, so a broken feed also lands on the floor
        vars.insert(FEED_RATE.to_string(), feed_rate.max(MIN_FEED_RATE));
    }
}

/// n = 1000·Vc / (π·D); zero for a non-positive diameter.
pub fn spindle_speed(cutting_speed: f64, diameter_mm: f64) -> f64 {
    if diameter_mm > 0.0 {
        1000.0 * cutting_speed / (PI * diameter_mm)
    } else {
        0.0
    }
}

fn workpiece_diameter(vars: &VariableMap) -> f64 {
    WORKPIECE_DIAMETER_KEYS
        .iter()
        .find_map(|key| vars.get(*key).copied())
        .unwrap_or(0.0)
}

/// Result of timing one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationTiming {
    /// Raw cycle time in minutes (before setup efficiency); zero on failure
    pub minutes: f64,
    /// The variables the formula was evaluated against
    pub variables: VariableMap,
    /// Why the time is zero, if the formula failed
    pub error: Option<FormulaError>,
}

impl OperationTiming {
    pub fn spindle_speed(&self) -> f64 {
        self.variables.get(SPINDLE_SPEED).copied().unwrap_or(0.0)
    }

    pub fn feed_rate(&self) -> f64 {
        self.variables.get(FEED_RATE).copied().unwrap_or(0.0)
    }
}

/// A catalog process with its formula compiled and kinematics chosen.
#[derive(Debug, Clone)]
pub struct ProcessTimer<'a> {
    pub process: &'a Process,
    pub kinematics: Kinematics,
    formula: Result<Formula, FormulaError>,
}

impl<'a> ProcessTimer<'a> {
    pub fn new(process: &'a Process) -> Self {
        ProcessTimer {
            process,
            kinematics: Kinematics::for_process(process),
            formula: process.compile(),
        }
    }

    pub fn formula(&self) -> Result<&Formula, &FormulaError> {
        self.formula.as_ref()
    }

    /// Full variable set for an operation.
    pub fn variables(&self, operation: &Operation, tool: Option<&Tool>) -> VariableMap {
        let mut vars = VariableMap::new();

        for param in &self.process.parameters {
            if let Some(default) = param.default {
                vars.insert(param.name.clone(), default);
            }
        }

        let tool_defaults = [
            (TOOL_DIAMETER, tool.and_then(|t| t.diameter_mm)),
            (CUTTING_SPEED, tool.and_then(|t| t.cutting_speed)),
            (FEED_PER_TOOTH, tool.and_then(|t| t.feed_per_tooth)),
            (FEED_PER_REV, tool.and_then(|t| t.feed_per_rev.or(t.feed_per_tooth))),
            (NUMBER_OF_TEETH, tool.and_then(|t| t.teeth.map(f64::from))),
        ];
        for (name, value) in tool_defaults {
            match value {
                Some(v) => {
                    vars.insert(name.to_string(), v);
                }
                None => {
                    vars.entry(name.to_string()).or_insert(0.0);
                }
            }
        }

        for (name, value) in &operation.parameters {
            vars.insert(name.clone(), *value);
        }

        self.kinematics.derive_variables(&mut vars);
        vars.insert(PI_NAME.to_string(), PI);
        vars
    }

    /// Raw cycle time for an operation. Never fails: a formula error gives
    /// zero minutes and is returned alongside.
    pub fn time(&self, operation: &Operation, tool: Option<&Tool>) -> OperationTiming {
        let variables = self.variables(operation, tool);
        let outcome = match &self.formula {
            Ok(formula) => formula.evaluate(&variables),
            Err(error) => Err(error.clone()),
        };
        match outcome {
            Ok(minutes) => OperationTiming { minutes, variables, error: None },
            Err(error) => OperationTiming {
                minutes: 0.0,
                variables,
                error: Some(error),
            },
        }
    }
}
