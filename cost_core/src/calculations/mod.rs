//! # Costing Calculations
//!
//! Each calculation follows the pattern:
//!
//! - `*Input` - Input parameters (JSON-serializable)
//! - `*Result` - Calculation results (JSON-serializable)
//! - `calculate(...) -> *Result` - Pure calculation function
//!
//! Costing never fails outright. Anything that would have been an error is
//! reported in the result's diagnostics and the affected amount is zero.
//!
//! ## Available Calculations
//!
//! - [`machining`] - Machined part cost from billet to selling price
//! - [`operation_time`] - Cycle time of a single operation

pub mod machining;
pub mod operation_time;

// Re-export commonly used types
pub use machining::{
    calculate, BatchTotals, MachiningInput, MachiningResult, MarkupCosts, MarkupRates, OperationBreakdown,
    Setup, SetupBreakdown, SurfaceTreatment, TreatmentBasis, WeightBasis,
};
pub use operation_time::{Kinematics, Operation, OperationTiming, ProcessTimer};
