//! Dimension checking and inference
//!
//! This module walks the parsed description and builds the session `State`:
//! the scope tree, the dimension registry, the physics table, and the list
//! of declared invariants. The heart of it is the expression dimension
//! propagator, which computes the resultant `Physics` of an arithmetic
//! expression bottom-up:
//!
//! - `*` merges both operands' numerators and denominators
//! - `/` cross-swaps the divisor's lists into the accumulator
//! - `+`/`-` require exactly equal prime products and keep the left side
//! - `dot`/`cross` take two vectors and multiply their dimensions
//!
//! Every violated rule produces a recoverable `CompileError` carrying the
//! offending span and the conflicting prime-product signatures; the checker
//! records it and moves on to the next statement, so one pass reports every
//! error in the file.

use crate::ast::{
    Ast, ChainKind, ConstantDecl, Constraint, ConstraintKind, DimensionBlock, Expr, HighOp,
    IntegralBlock, InvariantDecl, Item, Law, LawBlock, VecOp, VectorBlock,
};
use crate::common::Span;
use crate::diagnostics::{CompileError, Reporter, SourceFile};
use crate::invariants::{Invariant, InvariantParameter};
use crate::scope::{ScopeId, ScopeTree};
use crate::units::{DimensionRegistry, Physics, PhysicsTable};
use miette::NamedSource;

/// The base dimension that derivative chains are validated against.
const TIME_DIMENSION: &str = "second";

/// The dimension divided into a `cross` result (the |a||b| sin θ encoding).
const ANGLE_DIMENSION: &str = "radian";

/// Fully analyzed session: every table a consumer needs to query dimensions,
/// quantities, and invariants.
#[derive(Debug)]
pub struct State {
    pub source: SourceFile,
    pub scopes: ScopeTree,
    pub dimensions: DimensionRegistry,
    pub physics: PhysicsTable,
    pub invariants: Vec<Invariant>,
}

impl State {
    fn new(source: SourceFile) -> Self {
        Self {
            source,
            scopes: ScopeTree::new(),
            dimensions: DimensionRegistry::new(),
            physics: PhysicsTable::new(),
            invariants: Vec::new(),
        }
    }

    /// Newest visible physics quantity with this name, from the global scope.
    pub fn physics_by_name(&self, name: &str) -> Option<&Physics> {
        self.physics
            .lookup(&self.scopes, self.scopes.root(), name)
            .map(|id| self.physics.get(id))
    }

    /// A specific redeclaration of a name, by subindex.
    pub fn physics_by_name_and_subindex(&self, name: &str, subindex: u32) -> Option<&Physics> {
        self.physics
            .lookup_with_subindex(&self.scopes, self.scopes.root(), name, subindex)
            .map(|id| self.physics.get(id))
    }

    pub fn dimension_by_name(&self, name: &str) -> Option<&crate::units::Dimension> {
        self.dimensions
            .lookup(&self.scopes, self.scopes.root(), name)
            .map(|id| self.dimensions.get(id))
    }

    pub fn invariants(&self) -> &[Invariant] {
        &self.invariants
    }

    pub(crate) fn named_source(&self) -> NamedSource<String> {
        self.source.to_named_source()
    }
}

/// Check a parsed description, building the session state.
///
/// All semantic errors in the file are collected; the state is only returned
/// when the description is clean.
pub fn check(ast: &Ast, source: &SourceFile) -> Result<State, Vec<CompileError>> {
    let mut checker = Checker::new(source.clone());
    checker.check_program(ast);

    tracing::debug!(
        dimensions = checker.state.dimensions.len(),
        physics = checker.state.physics.len(),
        invariants = checker.state.invariants.len(),
        errors = checker.reporter.error_count(),
        "dimension check finished"
    );

    if checker.reporter.has_errors() {
        Err(checker.reporter.into_errors())
    } else {
        Ok(checker.state)
    }
}

/// Checker state during a single pass over the AST
struct Checker {
    state: State,
    reporter: Reporter,
    src: NamedSource<String>,
}

impl Checker {
    fn new(source: SourceFile) -> Self {
        let src = source.to_named_source();
        Self {
            state: State::new(source.clone()),
            reporter: Reporter::new(source),
            src,
        }
    }

    fn overflow_error(&self, span: Span) -> CompileError {
        CompileError::DimensionProductOverflow {
            span: span.into(),
            src: self.src.clone(),
        }
    }

    fn check_program(&mut self, ast: &Ast) {
        for item in &ast.items {
            match item {
                Item::Dimensions(block) => self.check_dimension_block(block),
                Item::Vectors(block) => self.check_vector_block(block),
                Item::Laws(block) => self.check_law_block(block),
                Item::Constant(decl) => self.check_constant(decl),
                Item::Integrals(block) => self.check_integral_block(block),
                Item::Invariant(decl) => self.check_invariant(decl),
            }
        }
    }

    // ==================== DIMENSIONS ====================

    fn check_dimension_block(&mut self, block: &DimensionBlock) {
        let root = self.state.scopes.root();
        for entry in &block.entries {
            // Same-scope redeclaration of a dimension type name is an error;
            // add_dimension itself would happily hand out a second prime.
            if let Some(existing) =
                self.state
                    .dimensions
                    .lookup_local(&self.state.scopes, root, &entry.name)
            {
                let first_span = self.state.dimensions.get(existing).span;
                self.reporter.error(CompileError::RedeclarationConflict {
                    name: entry.name.clone(),
                    span: entry.span.into(),
                    first_span: first_span.into(),
                    src: self.src.clone(),
                });
                continue;
            }

            let added = self.state.dimensions.add_dimension(
                &mut self.state.scopes,
                root,
                &entry.name,
                &entry.abbreviation,
                entry.span,
            );
            if added.is_none() {
                self.reporter.error(CompileError::PrimeTableExhausted {
                    capacity: self.state.dimensions.capacity(),
                    span: entry.span.into(),
                    src: self.src.clone(),
                });
            }
        }
    }

    // ==================== VECTORS ====================

    fn check_vector_block(&mut self, block: &VectorBlock) {
        let root = self.state.scopes.root();
        for pair in &block.pairs {
            let vector =
                self.state
                    .physics
                    .add_physics(&mut self.state.scopes, root, &pair.vector, pair.span);
            let scalar =
                self.state
                    .physics
                    .add_physics(&mut self.state.scopes, root, &pair.scalar, pair.span);
            let v = self.state.physics.get_mut(vector);
            v.is_vector = true;
            v.vector_counterpart = Some(scalar);
            self.state.physics.get_mut(scalar).vector_counterpart = Some(vector);
        }
    }

    // ==================== LAWS ====================

    fn check_law_block(&mut self, block: &LawBlock) {
        let root = self.state.scopes.root();
        for law in &block.laws {
            if let Err(e) = self.check_law(law, root) {
                self.reporter.error(e);
            }
        }
        tracing::debug!(laws = block.laws.len(), "checked law block");
    }

    fn check_law(&mut self, law: &Law, scope: ScopeId) -> Result<(), CompileError> {
        let rhs = propagate_expr(&self.state, scope, &law.rhs, &self.src)?;

        // A prior declaration of the name (typically from the `vectors`
        // block) fixes the LHS's vector-ness before inference.
        let declared = self
            .state
            .physics
            .lookup(&self.state.scopes, scope, &law.name)
            .map(|id| self.state.physics.get(id).clone());
        let declared_vector = declared.as_ref().is_some_and(|p| p.is_vector);

        if declared_vector && !rhs.is_vector {
            let d = declared.as_ref().expect("declared_vector implies declared");
            return Err(CompileError::DimensionMismatch {
                expected_num: d.numerator_prime_product,
                expected_den: d.denominator_prime_product,
                found_num: rhs.numerator_prime_product,
                found_den: rhs.denominator_prime_product,
                span: law.rhs.span().into(),
                src: self.src.clone(),
            });
        }

        let id =
            self.state
                .physics
                .add_physics(&mut self.state.scopes, scope, &law.name, law.span);
        let p = self.state.physics.get_mut(id);
        let copied = p
            .copy_numerator_dimensions(&rhs)
            .and_then(|_| p.copy_denominator_dimensions(&rhs));
        p.is_vector = declared_vector || rhs.is_vector;
        p.vector_counterpart = declared.as_ref().and_then(|d| d.vector_counterpart);
        p.dimension_alias = law.alias.clone();
        if copied.is_err() {
            return Err(self.overflow_error(law.rhs.span()));
        }
        Ok(())
    }

    // ==================== CONSTANTS ====================

    fn check_constant(&mut self, decl: &ConstantDecl) {
        let root = self.state.scopes.root();
        let dims = match propagate_expr(&self.state, root, &decl.dimension, &self.src) {
            Ok(d) => d,
            Err(e) => {
                self.reporter.error(e);
                return;
            }
        };

        let id = self
            .state
            .physics
            .add_physics(&mut self.state.scopes, root, &decl.name, decl.span);
        let p = self.state.physics.get_mut(id);
        let copied = p
            .copy_numerator_dimensions(&dims)
            .and_then(|_| p.copy_denominator_dimensions(&dims));
        p.value = Some(decl.value);
        p.is_constant = true;
        if copied.is_err() {
            self.reporter
                .error(self.overflow_error(decl.dimension.span()));
        }
    }

    // ==================== INTEGRAL CHAINS ====================

    fn check_integral_block(&mut self, block: &IntegralBlock) {
        for chain in &block.chains {
            if let Err(e) = self.check_chain(block.kind, &chain.members) {
                self.reporter.error(e);
            }
        }
    }

    /// Walk a declared derivative chain pairwise: each member's net time
    /// exponent must be exactly one less than its predecessor's. This
    /// reduces calculus consistency to integer arithmetic on one designated
    /// dimension's net power.
    fn check_chain(
        &self,
        kind: ChainKind,
        members: &[crate::ast::ChainMember],
    ) -> Result<(), CompileError> {
        let scopes = &self.state.scopes;
        let root = scopes.root();
        let chain_span = members
            .first()
            .map(|m| m.span)
            .unwrap_or_else(Span::dummy);

        let time = self
            .state
            .dimensions
            .lookup(scopes, root, TIME_DIMENSION)
            .ok_or_else(|| CompileError::UndeclaredIdentifier {
                name: TIME_DIMENSION.to_string(),
                span: chain_span.into(),
                src: self.src.clone(),
            })?;

        let mut prev: Option<i32> = None;
        for member in members {
            let id = self
                .state
                .physics
                .lookup(scopes, root, &member.name)
                .ok_or_else(|| CompileError::UndeclaredIdentifier {
                    name: member.name.clone(),
                    span: member.span.into(),
                    src: self.src.clone(),
                })?;
            let p = self.state.physics.get(id);

            if kind == ChainKind::Vector && !p.is_vector {
                return Err(CompileError::VectorArityViolation {
                    reason: format!(
                        "`{}` appears in a vector integral chain but is not a declared vector",
                        member.name
                    ),
                    span: member.span.into(),
                    src: self.src.clone(),
                });
            }

            let exponent = p.net_exponent_of(time);
            if let Some(prev_exponent) = prev {
                if exponent != prev_exponent - 1 {
                    return Err(CompileError::IntegralChainInconsistency {
                        name: member.name.clone(),
                        expected: prev_exponent - 1,
                        found: exponent,
                        span: member.span.into(),
                        src: self.src.clone(),
                    });
                }
            }
            prev = Some(exponent);
        }
        Ok(())
    }

    // ==================== INVARIANTS ====================

    fn check_invariant(&mut self, decl: &InvariantDecl) {
        let root = self.state.scopes.root();
        let scope = self
            .state
            .scopes
            .push_child(root, Some(decl.name.clone()), decl.span);

        let mut params = Vec::new();
        let mut broken = false;
        for param in &decl.params {
            let type_id = match self.state.physics.lookup(&self.state.scopes, scope, &param.physics)
            {
                Some(id) => id,
                None => {
                    self.reporter.error(CompileError::UndeclaredIdentifier {
                        name: param.physics.clone(),
                        span: param.span.into(),
                        src: self.src.clone(),
                    });
                    broken = true;
                    continue;
                }
            };
            let type_physics = self.state.physics.get(type_id).clone();

            let id = self.state.physics.add_physics(
                &mut self.state.scopes,
                scope,
                &param.name,
                param.span,
            );
            let p = self.state.physics.get_mut(id);
            let copied = p
                .copy_numerator_dimensions(&type_physics)
                .and_then(|_| p.copy_denominator_dimensions(&type_physics));
            p.is_vector = type_physics.is_vector;
            if copied.is_err() {
                self.reporter.error(self.overflow_error(param.span));
                broken = true;
                continue;
            }

            params.push(InvariantParameter {
                name: param.name.clone(),
                physics: id,
            });
        }

        // Constraint dimensions are validated at declaration time too, so a
        // broken invariant is reported even if it is never dispatched.
        for constraint in &decl.constraints {
            if let Err(e) = self.check_constraint_dimensions(scope, constraint) {
                self.reporter.error(e);
            }
        }

        self.state.scopes.close(scope, decl.span);
        if !broken {
            self.state.invariants.push(Invariant {
                name: decl.name.clone(),
                scope,
                params,
                constraints: decl.constraints.clone(),
                span: decl.span,
            });
        }
    }

    fn check_constraint_dimensions(
        &self,
        scope: ScopeId,
        constraint: &Constraint,
    ) -> Result<(), CompileError> {
        let lhs = propagate_expr(&self.state, scope, &constraint.lhs, &self.src)?;
        match &constraint.kind {
            ConstraintKind::Compare { rhs, .. } => {
                let rhs = propagate_expr(&self.state, scope, rhs, &self.src)?;
                if !comparison_dimensions_match(&lhs, &rhs) {
                    return Err(CompileError::DimensionMismatch {
                        expected_num: lhs.numerator_prime_product,
                        expected_den: lhs.denominator_prime_product,
                        found_num: rhs.numerator_prime_product,
                        found_den: rhs.denominator_prime_product,
                        span: constraint.span.into(),
                        src: self.src.clone(),
                    });
                }
            }
            // Range bounds are bare numeric literals, always dimensionless.
            ConstraintKind::Range { .. } => {}
        }
        Ok(())
    }
}

fn overflow(span: Span, src: &NamedSource<String>) -> CompileError {
    CompileError::DimensionProductOverflow {
        span: span.into(),
        src: src.clone(),
    }
}

/// Comparison constraints demand equal dimensions, except that a purely
/// numeric (dimensionless) side compares against anything.
pub fn comparison_dimensions_match(lhs: &Physics, rhs: &Physics) -> bool {
    lhs.same_dimension(rhs) || lhs.is_dimensionless() || rhs.is_dimensionless()
}

/// Compute the resultant `Physics` of an expression, bottom-up.
///
/// Looked-up quantities are cloned into working values; propagation never
/// mutates a stored table entry.
pub fn propagate_expr(
    state: &State,
    scope: ScopeId,
    expr: &Expr,
    src: &NamedSource<String>,
) -> Result<Physics, CompileError> {
    match expr {
        Expr::Ident { name, span, .. } => resolve_factor(state, scope, name, *span, src),

        Expr::Number { value, span, .. } => {
            let mut p = Physics::anonymous(*span);
            p.value = Some(*value);
            Ok(p)
        }

        Expr::Neg { operand, .. } => propagate_expr(state, scope, operand, src),

        Expr::High { op, lhs, rhs, span, .. } => {
            let left = propagate_expr(state, scope, lhs, src)?;
            let right = propagate_expr(state, scope, rhs, src)?;

            // Vectors combine only through dot/cross; a plain `*` or `/`
            // over two vectors is ill-formed.
            if left.is_vector && right.is_vector {
                return Err(CompileError::VectorArityViolation {
                    reason: format!(
                        "two vector operands combined with `{}`",
                        match op {
                            HighOp::Mul => "*",
                            HighOp::Div => "/",
                        }
                    ),
                    span: (*span).into(),
                    src: src.clone(),
                });
            }

            let is_vector = left.is_vector || right.is_vector;
            let mut result = left;
            match op {
                HighOp::Mul => {
                    result
                        .copy_numerator_dimensions(&right)
                        .and_then(|_| result.copy_denominator_dimensions(&right))
                        .map_err(|_| overflow(*span, src))?;
                }
                HighOp::Div => {
                    result
                        .copy_numerator_to_denominator_dimensions(&right)
                        .and_then(|_| result.copy_denominator_to_numerator_dimensions(&right))
                        .map_err(|_| overflow(*span, src))?;
                }
            }
            result.is_vector = is_vector;
            result.span = *span;
            Ok(result)
        }

        Expr::Low { lhs, rhs, span, .. } => {
            let left = propagate_expr(state, scope, lhs, src)?;
            let right = propagate_expr(state, scope, rhs, src)?;

            // Only like dimensions add or subtract; the operator itself has
            // no dimensional effect and the result keeps the left side.
            if !left.same_dimension(&right) {
                return Err(CompileError::DimensionMismatch {
                    expected_num: left.numerator_prime_product,
                    expected_den: left.denominator_prime_product,
                    found_num: right.numerator_prime_product,
                    found_den: right.denominator_prime_product,
                    span: rhs.span().into(),
                    src: src.clone(),
                });
            }

            let mut result = left;
            result.span = *span;
            Ok(result)
        }

        Expr::VectorOp { op, lhs, rhs, span, .. } => {
            let left = propagate_expr(state, scope, lhs, src)?;
            let right = propagate_expr(state, scope, rhs, src)?;

            for (operand, physics) in [(lhs, &left), (rhs, &right)] {
                if !physics.is_vector {
                    return Err(CompileError::VectorArityViolation {
                        reason: format!(
                            "`{}` requires two vector operands",
                            match op {
                                VecOp::Dot => "dot",
                                VecOp::Cross => "cross",
                            }
                        ),
                        span: operand.span().into(),
                        src: src.clone(),
                    });
                }
            }

            // Both operands contribute multiplicatively.
            let mut result = Physics::anonymous(*span);
            result
                .copy_numerator_dimensions(&left)
                .and_then(|_| result.copy_numerator_dimensions(&right))
                .and_then(|_| result.copy_denominator_dimensions(&left))
                .and_then(|_| result.copy_denominator_dimensions(&right))
                .map_err(|_| overflow(*span, src))?;

            // cross(a, b) = |a||b| sin θ: the result is divided by the angle
            // dimension. Kept exactly as the language defines it even though
            // a radian is physically unitless.
            if *op == VecOp::Cross {
                let radian = state
                    .dimensions
                    .lookup(&state.scopes, scope, ANGLE_DIMENSION)
                    .ok_or_else(|| CompileError::UndeclaredIdentifier {
                        name: ANGLE_DIMENSION.to_string(),
                        span: (*span).into(),
                        src: src.clone(),
                    })?;
                result
                    .add_denominator_dimension(radian, &state.dimensions)
                    .map_err(|_| overflow(*span, src))?;
            }

            // is_vector deliberately stays false for dot/cross results.
            Ok(result)
        }
    }
}

/// Resolve an identifier factor: physics quantities shadow base dimensions,
/// and a bare base dimension denotes a quantity with that single numerator
/// entry.
fn resolve_factor(
    state: &State,
    scope: ScopeId,
    name: &str,
    span: Span,
    src: &NamedSource<String>,
) -> Result<Physics, CompileError> {
    if let Some(id) = state.physics.lookup(&state.scopes, scope, name) {
        let mut p = state.physics.get(id).clone();
        p.span = span;
        return Ok(p);
    }

    if let Some(id) = state.dimensions.lookup(&state.scopes, scope, name) {
        let mut p = Physics::anonymous(span);
        p.identifier = name.to_string();
        p.add_numerator_dimension(id, &state.dimensions)
            .map_err(|_| overflow(span, src))?;
        return Ok(p);
    }

    Err(CompileError::UndeclaredIdentifier {
        name: name.to_string(),
        span: span.into(),
        src: src.clone(),
    })
}
