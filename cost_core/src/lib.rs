//! # cost_core - Machined Part Costing Engine
//!
//! `cost_core` is the computational heart of Billetwise. It prices a machined
//! part from raw billet to selling price: stock weight, regional material,
//! machine and tool prices, formula-driven cycle times and a two-tier markup
//! model. All inputs and outputs are JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Stateless**: Pure functions that take input and return results
//! - **JSON-First**: All types implement Serialize/Deserialize
//! - **Never aborts**: Bad data zeroes the affected component and is reported
//!   as a [`Diagnostic`]
//! - **Sandboxed formulas**: Process cycle times come from a small expression
//!   language with no access to anything but its variables
//!
//! ## Quick Start
//!
//! ```rust
//! use cost_core::calculations::MachiningInput;
//! use cost_core::job::CostingJob;
//!
//! let job = CostingJob::new("Bracket", MachiningInput::default());
//! let result = job.run();
//!
//! // Serialize to JSON for storage or transmission
//! let json = serde_json::to_string_pretty(&result).unwrap();
//! assert!(json.contains("cost_per_part"));
//! ```
//!
//! ## Modules
//!
//! - [`job`] - Job snapshot, metadata, and settings
//! - [`calculations`] - Part costing and operation cycle times
//! - [`formula`] - Cycle-time formula language and the standard process library
//! - [`pricing`] - Regional, time-versioned price resolution and currencies
//! - [`catalog`] - Materials, machines, tools, and processes
//! - [`geometry`] - Billet shapes and raw weight
//! - [`diagnostics`] - Non-fatal advisories attached to results
//! - [`units`] - Type-safe unit wrappers
//! - [`errors`] - Structured error types
//! - [`file_io`] - File operations with atomic saves

pub mod calculations;
pub mod catalog;
pub mod diagnostics;
pub mod errors;
pub mod file_io;
pub mod formula;
pub mod geometry;
pub mod job;
pub mod pricing;
pub mod units;

// Re-export commonly used types at crate root for convenience
pub use calculations::{calculate, MachiningInput, MachiningResult};
pub use diagnostics::Diagnostic;
pub use errors::{CostError, CostResult};
pub use file_io::{load_job, save_job, save_result};
pub use job::{CostingJob, CostingSettings, JobMetadata};
