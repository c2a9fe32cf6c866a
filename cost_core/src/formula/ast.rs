//! Expression tree and tree-walking evaluator.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::{Evaluate, FormulaError, VariableMap};

/// Built-in functions callable from a formula, bare or `Math.`-qualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Builtin {
    Ceil,
    Floor,
    Round,
    Sqrt,
    Abs,
    Pow,
    Min,
    Max,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ceil" => Some(Builtin::Ceil),
            "floor" => Some(Builtin::Floor),
            "round" => Some(Builtin::Round),
            "sqrt" => Some(Builtin::Sqrt),
            "abs" => Some(Builtin::Abs),
            "pow" => Some(Builtin::Pow),
            "min" => Some(Builtin::Min),
            "max" => Some(Builtin::Max),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Ceil => "ceil",
            Builtin::Floor => "floor",
            Builtin::Round => "round",
            Builtin::Sqrt => "sqrt",
            Builtin::Abs => "abs",
            Builtin::Pow => "pow",
            Builtin::Min => "min",
            Builtin::Max => "max",
        }
    }

    /// Check an argument count, returning the expected arity on mismatch.
    pub fn check_arity(&self, count: usize) -> Result<(), &'static str> {
        match self {
            Builtin::Pow if count != 2 => Err("2"),
            Builtin::Min | Builtin::Max if count == 0 => Err("at least 1"),
            Builtin::Pow | Builtin::Min | Builtin::Max => Ok(()),
            _ if count != 1 => Err("1"),
            _ => Ok(()),
        }
    }

    fn apply(&self, args: &[f64]) -> f64 {
        match self {
            Builtin::Ceil => args[0].ceil(),
            Builtin::Floor => args[0].floor(),
            // Halves round toward +∞ (Math.round semantics), not away from zero
            Builtin::Round => (args[0] + 0.5).floor(),
            Builtin::Sqrt => args[0].sqrt(),
            Builtin::Abs => args[0].abs(),
            Builtin::Pow => args[0].powf(args[1]),
            Builtin::Min => fold_nan(args, f64::min),
            Builtin::Max => fold_nan(args, f64::max),
        }
    }
}

/// min/max where any NaN argument poisons the result.
fn fold_nan(args: &[f64], pick: fn(f64, f64) -> f64) -> f64 {
    if args.iter().any(|a| a.is_nan()) {
        return f64::NAN;
    }
    args.iter().copied().reduce(pick).unwrap_or(f64::NAN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

/// Parsed formula.
///
/// `Block` is the "local bindings then return" form; bindings are evaluated in
/// order and each may refer to the ones before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Expr {
    Number { value: f64 },
    Variable { name: String },
    Pi,
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Conditional { condition: Box<Expr>, then_branch: Box<Expr>, else_branch: Box<Expr> },
    Call { function: Builtin, args: Vec<Expr> },
    Block { bindings: Vec<(String, Expr)>, result: Box<Expr> },
}

fn truthy(value: f64) -> bool {
    value != 0.0 && !value.is_nan()
}

fn boolean(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Variable lookup: `PI`, then block locals (innermost last), then the supplied map.
struct Scope<'a> {
    vars: &'a VariableMap,
    locals: Vec<(String, f64)>,
}

impl Scope<'_> {
    fn lookup(&self, name: &str) -> Result<f64, FormulaError> {
        if name == "PI" {
            return Ok(PI);
        }
        if let Some((_, value)) = self.locals.iter().rev().find(|(n, _)| n == name) {
            return Ok(*value);
        }
        if let Some(value) = self.vars.get(name) {
            return Ok(*value);
        }
        Err(FormulaError::UnknownIdentifier { name: name.to_string() })
    }
}

impl Expr {
    /// Height of the tree; a leaf is 1.
    pub fn depth(&self) -> usize {
        let children = match self {
            Expr::Number { .. } | Expr::Variable { .. } | Expr::Pi => 0,
            Expr::Unary { operand, .. } => operand.depth(),
            Expr::Binary { lhs, rhs, .. } => lhs.depth().max(rhs.depth()),
            Expr::Conditional { condition, then_branch, else_branch } => {
                condition.depth().max(then_branch.depth()).max(else_branch.depth())
            }
            Expr::Call { args, .. } => args.iter().map(Expr::depth).max().unwrap_or(0),
            Expr::Block { bindings, result } => bindings
                .iter()
                .map(|(_, expr)| expr.depth())
                .fold(result.depth(), usize::max),
        };
        children + 1
    }

    fn eval(&self, scope: &mut Scope<'_>) -> Result<f64, FormulaError> {
        match self {
            Expr::Number { value } => Ok(*value),
            Expr::Variable { name } => scope.lookup(name),
            Expr::Pi => Ok(PI),
            Expr::Unary { op, operand } => {
                let v = operand.eval(scope)?;
                Ok(match op {
                    UnaryOp::Neg => -v,
                    UnaryOp::Not => boolean(!truthy(v)),
                })
            }
            Expr::Binary { op: BinaryOp::And, lhs, rhs } => {
                let l = lhs.eval(scope)?;
                if truthy(l) {
                    rhs.eval(scope)
                } else {
                    Ok(l)
                }
            }
            Expr::Binary { op: BinaryOp::Or, lhs, rhs } => {
                let l = lhs.eval(scope)?;
                if truthy(l) {
                    Ok(l)
                } else {
                    rhs.eval(scope)
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                let l = lhs.eval(scope)?;
                let r = rhs.eval(scope)?;
                Ok(match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                    BinaryOp::Rem => l % r,
                    BinaryOp::Lt => boolean(l < r),
                    BinaryOp::Le => boolean(l <= r),
                    BinaryOp::Gt => boolean(l > r),
                    BinaryOp::Ge => boolean(l >= r),
                    BinaryOp::Eq => boolean(l == r),
                    BinaryOp::Ne => boolean(l != r),
                    BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit operators handled above"),
                })
            }
            Expr::Conditional { condition, then_branch, else_branch } => {
                if truthy(condition.eval(scope)?) {
                    then_branch.eval(scope)
                } else {
                    else_branch.eval(scope)
                }
            }
            Expr::Call { function, args } => {
                function.check_arity(args.len()).map_err(|expected| FormulaError::Arity {
                    function: function.name().to_string(),
                    expected: expected.to_string(),
                    found: args.len(),
                    position: 0,
                })?;
                let values = args.iter().map(|a| a.eval(scope)).collect::<Result<Vec<_>, _>>()?;
                Ok(function.apply(&values))
            }
            Expr::Block { bindings, result } => {
                let depth = scope.locals.len();
                for (name, expr) in bindings {
                    let value = expr.eval(scope)?;
                    scope.locals.push((name.clone(), value));
                }
                let value = result.eval(scope);
                scope.locals.truncate(depth);
                value
            }
        }
    }
}

impl Evaluate for Expr {
    /// Raw value of the expression; no sign or finiteness checks.
    fn evaluate(&self, vars: &VariableMap) -> Result<f64, FormulaError> {
        let mut scope = Scope { vars, locals: Vec::new() };
        self.eval(&mut scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(value: f64) -> Box<Expr> {
        Box::new(Expr::Number { value })
    }

    fn var(name: &str) -> Box<Expr> {
        Box::new(Expr::Variable { name: name.to_string() })
    }

    #[test]
    fn test_block_scoping() {
        let expr = Expr::Block {
            bindings: vec![
                ("a".to_string(), Expr::Number { value: 2.0 }),
                ("b".to_string(), Expr::Binary { op: BinaryOp::Mul, lhs: var("a"), rhs: var("x") }),
            ],
            result: var("b"),
        };
        let vars = VariableMap::from([("x".to_string(), 5.0)]);
        assert_eq!(expr.evaluate(&vars).unwrap(), 10.0);
    }

    #[test]
    fn test_short_circuit_skips_unknown() {
        let expr = Expr::Binary { op: BinaryOp::And, lhs: num(0.0), rhs: var("missing") };
        assert_eq!(expr.evaluate(&VariableMap::new()).unwrap(), 0.0);

        let expr = Expr::Conditional { condition: num(1.0), then_branch: num(3.0), else_branch: var("missing") };
        assert_eq!(expr.evaluate(&VariableMap::new()).unwrap(), 3.0);
    }

    #[test]
    fn test_unknown_identifier() {
        let err = var("ghost").evaluate(&VariableMap::new()).unwrap_err();
        assert_eq!(err, FormulaError::UnknownIdentifier { name: "ghost".to_string() });
    }

    #[test]
    fn test_builtins() {
        assert_eq!(Builtin::Round.apply(&[2.5]), 3.0);
        assert_eq!(Builtin::Round.apply(&[-2.5]), -2.0);
        assert_eq!(Builtin::Max.apply(&[1.0, 7.0, 3.0]), 7.0);
        assert!(Builtin::Min.apply(&[1.0, f64::NAN]).is_nan());
        assert_eq!(Builtin::Pow.check_arity(1), Err("2"));
        assert_eq!(Builtin::Ceil.check_arity(1), Ok(()));
    }

    #[test]
    fn test_pi_cannot_be_shadowed() {
        let vars = VariableMap::from([("PI".to_string(), 3.0)]);
        assert_eq!(var("PI").evaluate(&vars).unwrap(), PI);
        assert_eq!(var("PI").evaluate(&VariableMap::new()).unwrap(), PI);

        let block = Expr::Block {
            bindings: vec![("PI".to_string(), Expr::Number { value: 3.0 })],
            result: var("PI"),
        };
        assert_eq!(block.evaluate(&VariableMap::new()).unwrap(), PI);
    }

    #[test]
    fn test_call_arity_checked_at_evaluation() {
        let expr: Expr = serde_json::from_str(r#"{"node":"call","function":"ceil","args":[]}"#).unwrap();
        assert!(matches!(
            expr.evaluate(&VariableMap::new()),
            Err(FormulaError::Arity { found: 0, .. })
        ));

        let pow = Expr::Call { function: Builtin::Pow, args: vec![Expr::Number { value: 2.0 }] };
        assert!(matches!(pow.evaluate(&VariableMap::new()), Err(FormulaError::Arity { found: 1, .. })));
    }

    #[test]
    fn test_depth() {
        assert_eq!(num(1.0).depth(), 1);
        let expr = Expr::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(Expr::Unary { op: UnaryOp::Neg, operand: var("a") }),
            rhs: num(2.0),
        };
        assert_eq!(expr.depth(), 3);
    }
}
