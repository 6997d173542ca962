//! Invariant declarations and the constraint-satisfaction engine
//!
//! An invariant is a named, parameterized set of constraints. Dispatch from
//! a concrete parameter tuple to the invariant it targets reuses the prime
//! encoding: the tuple's dimension signature (the product of all parameters'
//! prime products) must match the invariant's declared parameter signature.

use crate::ast::{CompareOp, Constraint, ConstraintKind, Expr};
use crate::check::{comparison_dimensions_match, propagate_expr, State};
use crate::common::Span;
use crate::diagnostics::CompileError;
use crate::scope::ScopeId;
use crate::units::PhysicsId;
use indexmap::IndexMap;

/// A declared invariant: scope, formal parameters, constraints
#[derive(Debug, Clone)]
pub struct Invariant {
    pub name: String,
    pub scope: ScopeId,
    pub params: Vec<InvariantParameter>,
    pub constraints: Vec<Constraint>,
    pub span: Span,
}

/// One formal parameter of an invariant, bound to its Physics record in the
/// invariant's scope
#[derive(Debug, Clone)]
pub struct InvariantParameter {
    pub name: String,
    pub physics: PhysicsId,
}

/// One concrete value in a parameter tuple
#[derive(Debug, Clone)]
pub struct ParameterValue {
    /// The physics quantity giving this value its dimension
    pub physics: PhysicsId,
    pub value: f64,
    /// Positional index, assigned by [`number_parameters_zero_to_n`]
    pub ordinal: usize,
}

/// Outcome of checking one constraint against a bound parameter tuple
#[derive(Debug, Clone)]
pub struct ConstraintReport {
    pub span: Span,
    pub satisfies_value_constraint: bool,
    pub satisfies_dimension_constraint: bool,
    pub value_error: Option<String>,
    pub dimension_error: Option<String>,
}

impl ConstraintReport {
    pub fn satisfied(&self) -> bool {
        self.satisfies_value_constraint && self.satisfies_dimension_constraint
    }
}

/// Per-invariant constraint reports
#[derive(Debug, Clone)]
pub struct InvariantReport {
    pub invariant: String,
    pub constraints: Vec<ConstraintReport>,
}

impl InvariantReport {
    pub fn satisfied(&self) -> bool {
        self.constraints.iter().all(ConstraintReport::satisfied)
    }
}

/// Report over every invariant the parameter tuple dispatched to
#[derive(Debug, Clone)]
pub struct Report {
    pub invariants: Vec<InvariantReport>,
}

impl Report {
    pub fn satisfied(&self) -> bool {
        self.invariants.iter().all(InvariantReport::satisfied)
    }
}

/// Assign sequential ordinal indices to a parameter tuple for positional
/// matching against an invariant's formal parameters.
pub fn number_parameters_zero_to_n(tuple: &mut [ParameterValue]) {
    for (index, param) in tuple.iter_mut().enumerate() {
        param.ordinal = index;
    }
}

/// Dimension signature of a set of physics records: the product of all
/// numerator prime products and of all denominator prime products. `None`
/// when a side of the fold leaves the u128 range; a wrapped signature could
/// dispatch to the wrong invariant.
fn signature(state: &State, mut ids: impl Iterator<Item = PhysicsId>) -> Option<(u128, u128)> {
    ids.try_fold((1u128, 1u128), |(num, den), id| {
        let p = state.physics.get(id);
        Some((
            num.checked_mul(u128::from(p.numerator_prime_product))?,
            den.checked_mul(u128::from(p.denominator_prime_product))?,
        ))
    })
}

/// Select the invariant whose parameter count and dimension signature match
/// the tuple. Parameter *names* play no role in dispatch.
pub fn invariant_by_parameters<'a>(
    state: &'a State,
    tuple: &[ParameterValue],
) -> Option<&'a Invariant> {
    let tuple_sig = signature(state, tuple.iter().map(|p| p.physics))?;
    state.invariants.iter().find(|inv| {
        inv.params.len() == tuple.len()
            && signature(state, inv.params.iter().map(|p| p.physics)) == Some(tuple_sig)
    })
}

/// Check every matching invariant's constraints against the bound tuple.
///
/// Values bind positionally (tuple ordinal i to formal parameter i); the
/// dimension side of each constraint is re-propagated with the same rules
/// the checker applies at declaration time.
pub fn satisfies_constraints(state: &State, tuple: &[ParameterValue]) -> Result<Report, CompileError> {
    let tuple_sig = signature(state, tuple.iter().map(|p| p.physics)).ok_or_else(|| {
        CompileError::DimensionProductOverflow {
            span: Span::dummy().into(),
            src: state.named_source(),
        }
    })?;
    let matching: Vec<&Invariant> = state
        .invariants
        .iter()
        .filter(|inv| {
            inv.params.len() == tuple.len()
                && signature(state, inv.params.iter().map(|p| p.physics)) == Some(tuple_sig)
        })
        .collect();

    if matching.is_empty() {
        return Err(CompileError::NoMatchingInvariant {
            span: Span::dummy().into(),
            src: state.named_source(),
        });
    }

    let mut invariants = Vec::new();
    for inv in matching {
        let mut env = IndexMap::new();
        for (formal, actual) in inv.params.iter().zip(tuple.iter()) {
            env.insert(formal.name.clone(), actual.value);
        }

        let constraints = inv
            .constraints
            .iter()
            .map(|c| check_constraint(state, inv.scope, c, &env))
            .collect();
        invariants.push(InvariantReport {
            invariant: inv.name.clone(),
            constraints,
        });
    }

    Ok(Report { invariants })
}

fn check_constraint(
    state: &State,
    scope: ScopeId,
    constraint: &Constraint,
    env: &IndexMap<String, f64>,
) -> ConstraintReport {
    let src = state.named_source();

    // Dimension side: same propagation rules as declaration-time checking.
    let (dim_ok, dim_err) = match propagate_expr(state, scope, &constraint.lhs, &src) {
        Err(e) => (false, Some(e.to_string())),
        Ok(lhs_dim) => match &constraint.kind {
            ConstraintKind::Compare { rhs, .. } => {
                match propagate_expr(state, scope, rhs, &src) {
                    Err(e) => (false, Some(e.to_string())),
                    Ok(rhs_dim) => {
                        if comparison_dimensions_match(&lhs_dim, &rhs_dim) {
                            (true, None)
                        } else {
                            (
                                false,
                                Some(format!(
                                    "dimension mismatch: {}/{} vs {}/{}",
                                    lhs_dim.numerator_prime_product,
                                    lhs_dim.denominator_prime_product,
                                    rhs_dim.numerator_prime_product,
                                    rhs_dim.denominator_prime_product,
                                )),
                            )
                        }
                    }
                }
            }
            ConstraintKind::Range { .. } => (true, None),
        },
    };

    // Value side.
    let (value_ok, value_err) = match eval_expr(state, scope, &constraint.lhs, env) {
        Err(e) => (false, Some(e)),
        Ok(lhs) => match &constraint.kind {
            ConstraintKind::Compare { op, rhs, tolerance } => {
                match eval_expr(state, scope, rhs, env) {
                    Err(e) => (false, Some(e)),
                    Ok(rhs_value) => {
                        let ok = compare(*op, lhs, rhs_value, *tolerance);
                        let err = (!ok).then(|| {
                            format!("{} {} {} does not hold", lhs, op.as_str(), rhs_value)
                        });
                        (ok, err)
                    }
                }
            }
            ConstraintKind::Range { lo, hi } => {
                let ok = *lo <= lhs && lhs <= *hi;
                let err =
                    (!ok).then(|| format!("{} is outside the range {} .. {}", lhs, lo, hi));
                (ok, err)
            }
        },
    };

    ConstraintReport {
        span: constraint.span,
        satisfies_value_constraint: value_ok,
        satisfies_dimension_constraint: dim_ok,
        value_error: value_err,
        dimension_error: dim_err,
    }
}

fn compare(op: CompareOp, lhs: f64, rhs: f64, tolerance: Option<f64>) -> bool {
    match op {
        CompareOp::Eq => lhs == rhs,
        CompareOp::Ne => lhs != rhs,
        CompareOp::Lt => lhs < rhs,
        CompareOp::Le => lhs <= rhs,
        CompareOp::Gt => lhs > rhs,
        CompareOp::Ge => lhs >= rhs,
        CompareOp::Approx => (lhs - rhs).abs() <= tolerance.unwrap_or(0.0),
    }
}

impl State {
    /// Build one tuple element from a declared physics quantity's name.
    pub fn bind_parameter(&self, physics_name: &str, value: f64) -> Option<ParameterValue> {
        self.physics
            .lookup(&self.scopes, self.scopes.root(), physics_name)
            .map(|physics| ParameterValue {
                physics,
                value,
                ordinal: 0,
            })
    }

    pub fn number_parameters_zero_to_n(&self, tuple: &mut [ParameterValue]) {
        number_parameters_zero_to_n(tuple);
    }

    pub fn invariant_by_parameters(&self, tuple: &[ParameterValue]) -> Option<&Invariant> {
        invariant_by_parameters(self, tuple)
    }

    pub fn satisfies_constraints(&self, tuple: &[ParameterValue]) -> Result<Report, CompileError> {
        satisfies_constraints(self, tuple)
    }
}

/// Numeric evaluation of a constraint expression with bound parameters.
/// Identifiers resolve to bound parameter values first, then to declared
/// constants; `dot` and `cross` multiply magnitudes.
fn eval_expr(
    state: &State,
    scope: ScopeId,
    expr: &Expr,
    env: &IndexMap<String, f64>,
) -> Result<f64, String> {
    match expr {
        Expr::Number { value, .. } => Ok(*value),
        Expr::Ident { name, .. } => {
            if let Some(value) = env.get(name) {
                return Ok(*value);
            }
            state
                .physics
                .lookup(&state.scopes, scope, name)
                .and_then(|id| state.physics.get(id).value)
                .ok_or_else(|| format!("`{}` has no bound value", name))
        }
        Expr::Neg { operand, .. } => Ok(-eval_expr(state, scope, operand, env)?),
        Expr::Low { op, lhs, rhs, .. } => {
            let l = eval_expr(state, scope, lhs, env)?;
            let r = eval_expr(state, scope, rhs, env)?;
            Ok(match op {
                crate::ast::LowOp::Add => l + r,
                crate::ast::LowOp::Sub => l - r,
            })
        }
        Expr::High { op, lhs, rhs, .. } => {
            let l = eval_expr(state, scope, lhs, env)?;
            let r = eval_expr(state, scope, rhs, env)?;
            Ok(match op {
                crate::ast::HighOp::Mul => l * r,
                crate::ast::HighOp::Div => l / r,
            })
        }
        Expr::VectorOp { lhs, rhs, .. } => {
            let l = eval_expr(state, scope, lhs, env)?;
            let r = eval_expr(state, scope, rhs, env)?;
            Ok(l * r)
        }
    }
}
