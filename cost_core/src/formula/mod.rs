//! # Cycle-Time Formulas
//!
//! Each catalog [`Process`](crate::catalog::Process) carries a small formula
//! that turns cutting parameters into a cycle time in minutes. Formula text is
//! parsed once into an [`Expr`] tree and evaluated by walking the tree against
//! a [`VariableMap`]. Nothing outside the map and the fixed built-ins is
//! reachable, and the language has no loops, so evaluation always terminates.
//!
//! ## Language
//!
//! - numbers, variables, `PI` / `Math.PI`
//! - `+ - * / %`, `< <= > >= == != === !==`, `&& || !`, `cond ? a : b`
//! - `ceil floor round sqrt abs pow min max`, bare or as `Math.ceil(…)`
//! - local bindings then a return, in any of these spellings:
//!
//! ```text
//! (() => { const passes = Math.ceil(TD / ap); return passes * L / feedRate; })()
//! { const passes = ceil(TD / ap); return passes * L / feedRate; }
//! const passes = ceil(TD / ap); return passes * L / feedRate;
//! ```
//!
//! ## Example
//!
//! ```rust
//! use cost_core::formula::{Evaluate, Formula, VariableMap};
//!
//! let formula = Formula::parse("Math.ceil(TD / ap) * (L / feedRate)").unwrap();
//! let vars = VariableMap::from([
//!     ("TD".to_string(), 10.0),
//!     ("ap".to_string(), 5.0),
//!     ("L".to_string(), 120.0),
//!     ("feedRate".to_string(), 240.0),
//! ]);
//! assert_eq!(formula.evaluate(&vars).unwrap(), 1.0);
//! ```

pub mod ast;
pub mod lexer;
pub mod library;
pub mod parser;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use ast::{BinaryOp, Builtin, Expr, UnaryOp};
pub use library::{StandardProcess, ALL_STANDARD_PROCESSES};

/// Variable name → value. Ordered so diagnostic snapshots are stable.
pub type VariableMap = BTreeMap<String, f64>;

/// Why a formula produced no usable time.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormulaError {
    #[error("formula is empty")]
    Empty,

    #[error("syntax error at {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("'{function}' expects {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: String,
        found: usize,
        position: usize,
    },

    #[error("unknown identifier '{name}'")]
    UnknownIdentifier { name: String },

    /// Result was NaN or ±Infinity (kept as text; JSON has no NaN)
    #[error("result is not a finite number ({value})")]
    NonFinite { value: String },

    #[error("result is negative ({value})")]
    Negative { value: f64 },
}

impl FormulaError {
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        FormulaError::Syntax {
            position,
            message: message.into(),
        }
    }

    /// True for failures detected while compiling rather than evaluating.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            FormulaError::Empty
                | FormulaError::Syntax { .. }
                | FormulaError::UnknownFunction { .. }
                | FormulaError::Arity { .. }
        )
    }
}

/// Evaluation seam: anything that turns bindings into a number.
pub trait Evaluate {
    fn evaluate(&self, vars: &VariableMap) -> Result<f64, FormulaError>;
}

/// A compiled cycle-time formula: source text plus its parsed tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    /// Compile formula text.
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        if source.trim().is_empty() {
            return Err(FormulaError::Empty);
        }
        let tokens = lexer::tokenize(source)?;
        let expr = parser::Parser::new(tokens).parse_program()?;
        Ok(Formula {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

impl FromStr for Formula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Formula::parse(s)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Evaluate for Formula {
    /// Cycle time in minutes: the raw value, rejected if non-finite or negative.
    fn evaluate(&self, vars: &VariableMap) -> Result<f64, FormulaError> {
        let value = self.expr.evaluate(vars)?;
        if !value.is_finite() {
            return Err(FormulaError::NonFinite { value: value.to_string() });
        }
        if value < 0.0 {
            return Err(FormulaError::Negative { value });
        }
        // Normalise -0.0 so results compare bit-identical
        Ok(value + 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn vars(pairs: &[(&str, f64)]) -> VariableMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn eval(src: &str, pairs: &[(&str, f64)]) -> Result<f64, FormulaError> {
        Formula::parse(src)?.evaluate(&vars(pairs))
    }

    #[test]
    fn test_arithmetic_and_precedence() {
        assert_eq!(eval("2 + 3 * 4", &[]).unwrap(), 14.0);
        assert_eq!(eval("(2 + 3) * 4", &[]).unwrap(), 20.0);
        assert_eq!(eval("10 - 4 - 3", &[]).unwrap(), 3.0);
        assert_eq!(eval("7 % 4", &[]).unwrap(), 3.0);
        assert_eq!(eval("-2 * -3", &[]).unwrap(), 6.0);
    }

    #[test]
    fn test_conditionals() {
        assert_eq!(eval("L > 100 ? 2 : 1", &[("L", 120.0)]).unwrap(), 2.0);
        assert_eq!(eval("L > 100 ? 2 : 1", &[("L", 80.0)]).unwrap(), 1.0);
        assert_eq!(eval("a < 1 ? 1 : a < 2 ? 2 : 3", &[("a", 1.5)]).unwrap(), 2.0);
        assert_eq!(eval("a === 3 && b !== 3 ? 5 : 0", &[("a", 3.0), ("b", 4.0)]).unwrap(), 5.0);
        assert_eq!(eval("!(a >= 2) || 4", &[("a", 3.0)]).unwrap(), 4.0);
    }

    #[test]
    fn test_builtins_and_pi() {
        assert_eq!(eval("Math.ceil(40 / 7) + 1", &[]).unwrap(), 7.0);
        assert_eq!(eval("floor(2.9) + sqrt(16) + abs(-1) + pow(2, 3)", &[]).unwrap(), 15.0);
        assert_eq!(eval("Math.max(1, 5, 2) - Math.min(3, 2)", &[]).unwrap(), 3.0);
        assert!((eval("PI * 2", &[]).unwrap() - 2.0 * PI).abs() < 1e-12);
        assert!((eval("Math.PI", &[]).unwrap() - PI).abs() < 1e-12);
    }

    #[test]
    fn test_iife_with_bindings() {
        let src = "(() => {\n  const depthPasses = Math.ceil(TD / ap);\n  const pathLength = L * depthPasses;\n  return pathLength / feedRate;\n})()";
        let t = eval(src, &[("TD", 10.0), ("ap", 4.0), ("L", 100.0), ("feedRate", 300.0)]).unwrap();
        assert_eq!(t, 1.0);
    }

    #[test]
    fn test_local_shadows_variable() {
        assert_eq!(eval("const L = 5; return L * 2;", &[("L", 100.0)]).unwrap(), 10.0);
    }

    #[test]
    fn test_edge_policies() {
        assert_eq!(Formula::parse("   ").unwrap_err(), FormulaError::Empty);
        assert_eq!(
            eval("L / feed", &[("L", 1.0)]).unwrap_err(),
            FormulaError::UnknownIdentifier { name: "feed".to_string() }
        );
        assert!(matches!(eval("L / 0", &[("L", 1.0)]), Err(FormulaError::NonFinite { .. })));
        assert!(matches!(eval("0 / 0", &[]), Err(FormulaError::NonFinite { .. })));
        assert!(matches!(eval("sqrt(-1)", &[]), Err(FormulaError::NonFinite { .. })));
        assert_eq!(eval("1 - 3", &[]).unwrap_err(), FormulaError::Negative { value: -2.0 });
    }

    #[test]
    fn test_negative_zero_normalised() {
        let t = eval("-0 * 5", &[]).unwrap();
        assert_eq!(t.to_bits(), 0.0f64.to_bits());
    }

    #[test]
    fn test_intermediate_infinity_allowed() {
        // 1 / (1 / 0) = 0 in IEEE arithmetic; only the final value is checked
        assert_eq!(eval("1 / (1 / 0)", &[]).unwrap(), 0.0);
    }

    #[test]
    fn test_deeply_nested_formula_is_a_compile_error() {
        let nested = format!("{}1{}", "(".repeat(2000), ")".repeat(2000));
        let err = Formula::parse(&nested).unwrap_err();
        assert!(err.is_compile_error());

        let chain = vec!["1"; 20000].join("+");
        assert!(matches!(Formula::parse(&chain), Err(FormulaError::Syntax { .. })));

        let calls = format!("{}1{}", "abs(".repeat(500), ")".repeat(500));
        assert!(Formula::parse(&calls).is_err());

        assert_eq!(eval(&vec!["1"; 40].join("+"), &[]).unwrap(), 40.0);
    }

    #[test]
    fn test_pi_ignores_variable_map() {
        assert_eq!(eval("PI", &[("PI", 100.0)]).unwrap(), PI);
        assert_eq!(eval("Math.PI", &[("PI", 100.0)]).unwrap(), PI);
    }

    #[test]
    fn test_error_classification() {
        assert!(FormulaError::Empty.is_compile_error());
        assert!(!FormulaError::Negative { value: -1.0 }.is_compile_error());
        let err = FormulaError::NonFinite { value: f64::INFINITY.to_string() };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("inf"));
    }
}
