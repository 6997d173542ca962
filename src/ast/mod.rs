//! Abstract Syntax Tree for the Newton description language
//!
//! This module defines the AST types produced by the parser.

use crate::common::{NodeId, Span};
use serde::{Deserialize, Serialize};

/// Top-level AST: one parsed description file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ast {
    pub items: Vec<Item>,
}

/// Top-level item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Item {
    Dimensions(DimensionBlock),
    Vectors(VectorBlock),
    Integrals(IntegralBlock),
    Laws(LawBlock),
    Constant(ConstantDecl),
    Invariant(InvariantDecl),
}

// ==================== DIMENSIONS ====================

/// `dimensions { meter "m"; second "s"; }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionBlock {
    pub id: NodeId,
    pub entries: Vec<DimensionDecl>,
    pub span: Span,
}

/// One base dimension declaration: name plus printable abbreviation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionDecl {
    pub id: NodeId,
    pub name: String,
    pub abbreviation: String,
    pub span: Span,
}

// ==================== VECTORS ====================

/// `vectors { velocity -> speed; acceleration -> accelerationMagnitude; }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorBlock {
    pub id: NodeId,
    pub pairs: Vec<VectorPairDecl>,
    pub span: Span,
}

/// A vector quantity paired with its scalar-magnitude counterpart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPairDecl {
    pub id: NodeId,
    pub vector: String,
    pub scalar: String,
    pub span: Span,
}

// ==================== INTEGRALS ====================

/// Whether a derivative chain ranges over vector or scalar quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainKind {
    Vector,
    Scalar,
}

/// `integrals vector { displacement -> velocity -> acceleration; }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegralBlock {
    pub id: NodeId,
    pub kind: ChainKind,
    pub chains: Vec<IntegralChain>,
    pub span: Span,
}

/// One derivative chain, outermost integral first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegralChain {
    pub id: NodeId,
    pub members: Vec<ChainMember>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainMember {
    pub name: String,
    pub span: Span,
}

// ==================== LAWS ====================

/// `laws { distance = meter; speed = distance / time; }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LawBlock {
    pub id: NodeId,
    pub laws: Vec<Law>,
    pub span: Span,
}

/// One law: the RHS dimension is propagated onto the LHS identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Law {
    pub id: NodeId,
    pub name: String,
    pub name_span: Span,
    pub rhs: Expr,
    /// Optional `as "mps"` dimension alias
    pub alias: Option<String>,
    pub span: Span,
}

// ==================== CONSTANTS ====================

/// `constant g: distance / (time * time) = 9.80665;`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantDecl {
    pub id: NodeId,
    pub name: String,
    pub dimension: Expr,
    pub value: f64,
    pub span: Span,
}

// ==================== INVARIANTS ====================

/// `invariant name(p: physicsType, ...) { constraints }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantDecl {
    pub id: NodeId,
    pub name: String,
    pub params: Vec<InvariantParam>,
    pub constraints: Vec<Constraint>,
    pub span: Span,
}

/// A formal parameter bound to a declared physics quantity's dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantParam {
    pub id: NodeId,
    pub name: String,
    /// Identifier of the physics quantity giving this parameter its type
    pub physics: String,
    pub span: Span,
}

/// Comparison operator in a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Approximate equality within a declared tolerance
    Approx,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Approx => "~",
        }
    }
}

/// One invariant constraint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub id: NodeId,
    pub lhs: Expr,
    pub kind: ConstraintKind,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// `lhs op rhs` with an optional `tolerance t` for `~`
    Compare {
        op: CompareOp,
        rhs: Expr,
        tolerance: Option<f64>,
    },
    /// `lhs in lo .. hi` (inclusive numeric range)
    Range { lo: f64, hi: f64 },
}

// ==================== EXPRESSIONS ====================

/// High-precedence (Term-level) operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HighOp {
    Mul,
    Div,
}

/// Low-precedence (Expression-level) operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LowOp {
    Add,
    Sub,
}

/// Vector-combining operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VecOp {
    Dot,
    Cross,
}

/// Arithmetic expression over physics quantities.
///
/// Grammar: `Expression := Term (LowOp Term)*`,
/// `Term := ['-'] Factor (HighOp Factor)*`,
/// `Factor := identifier | number | dot(E, E) | cross(E, E) | '(' E ')'`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    Ident {
        id: NodeId,
        name: String,
        span: Span,
    },
    Number {
        id: NodeId,
        value: f64,
        span: Span,
    },
    /// Unary negation; no dimensional effect
    Neg {
        id: NodeId,
        operand: Box<Expr>,
        span: Span,
    },
    /// `lhs + rhs` or `lhs - rhs`
    Low {
        id: NodeId,
        op: LowOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
    /// `lhs * rhs` or `lhs / rhs`
    High {
        id: NodeId,
        op: HighOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
    /// `dot(a, b)` or `cross(a, b)`
    VectorOp {
        id: NodeId,
        op: VecOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Ident { span, .. }
            | Expr::Number { span, .. }
            | Expr::Neg { span, .. }
            | Expr::Low { span, .. }
            | Expr::High { span, .. }
            | Expr::VectorOp { span, .. } => *span,
        }
    }
}
