//! Physical-quantity records and the per-session physics table
//!
//! A `Physics` describes a named quantity as a ratio of base dimensions.
//! Both sides of the ratio are kept twice: as an ordered list of dimension
//! ids (with multiplicity) and as the running product of those dimensions'
//! primes. Unique factorization makes the product pair an exact equality
//! test for compound dimensions; no floating-point exponents are involved.

use crate::common::Span;
use crate::scope::{ScopeId, ScopeTree};
use crate::units::dimension::{DimensionId, DimensionRegistry};
use id_arena::{Arena, Id};

pub type PhysicsId = Id<Physics>;

/// A prime product left the u64 range.
///
/// A wrapped product could collide with a genuinely different dimension's
/// encoding, so every product update is checked and refused on overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductOverflow;

/// A named physical quantity with its dimension encoding
#[derive(Debug, Clone)]
pub struct Physics {
    pub identifier: String,
    /// Sequential ordinal assigned when the record enters the table
    pub id: u32,
    /// Redeclaration ordinal: 0 for the first record of a name, then +1 per
    /// shadowing redeclaration (chained law statements redeclare legally)
    pub subindex: u32,
    pub is_vector: bool,
    /// Scalar counterpart of a vector quantity, and vice versa
    pub vector_counterpart: Option<PhysicsId>,
    /// Numerator dimensions, with multiplicity (distance² lists meter twice)
    pub numerator: Vec<DimensionId>,
    pub denominator: Vec<DimensionId>,
    /// Product of primes over `numerator`; 1 when the list is empty
    pub numerator_prime_product: u64,
    pub denominator_prime_product: u64,
    pub value: Option<f64>,
    pub is_constant: bool,
    pub dimension_alias: Option<String>,
    /// Prior record of the same identifier, if this one shadows it
    pub definition: Option<PhysicsId>,
    pub span: Span,
}

impl Physics {
    /// A fresh, dimensionless working value (both products at the
    /// multiplicative identity). Used by the propagator for intermediate
    /// expression results.
    pub fn anonymous(span: Span) -> Self {
        Self {
            identifier: String::new(),
            id: 0,
            subindex: 0,
            is_vector: false,
            vector_counterpart: None,
            numerator: Vec::new(),
            denominator: Vec::new(),
            numerator_prime_product: 1,
            denominator_prime_product: 1,
            value: None,
            is_constant: false,
            dimension_alias: None,
            definition: None,
            span,
        }
    }

    /// Append one dimension to the numerator. Repeatable: adding the same
    /// dimension twice doubles its exponent contribution to the product.
    /// On overflow the record is left unchanged.
    pub fn add_numerator_dimension(
        &mut self,
        dim: DimensionId,
        dims: &DimensionRegistry,
    ) -> Result<(), ProductOverflow> {
        let product = self
            .numerator_prime_product
            .checked_mul(dims.prime_of(dim))
            .ok_or(ProductOverflow)?;
        self.numerator.push(dim);
        self.numerator_prime_product = product;
        Ok(())
    }

    /// Append one dimension to the denominator.
    pub fn add_denominator_dimension(
        &mut self,
        dim: DimensionId,
        dims: &DimensionRegistry,
    ) -> Result<(), ProductOverflow> {
        let product = self
            .denominator_prime_product
            .checked_mul(dims.prime_of(dim))
            .ok_or(ProductOverflow)?;
        self.denominator.push(dim);
        self.denominator_prime_product = product;
        Ok(())
    }

    /// Append a copy of `source`'s numerator onto this numerator.
    /// The lists stay independent afterwards; `source` is never mutated.
    pub fn copy_numerator_dimensions(&mut self, source: &Physics) -> Result<(), ProductOverflow> {
        let product = self
            .numerator_prime_product
            .checked_mul(source.numerator_prime_product)
            .ok_or(ProductOverflow)?;
        self.numerator.extend_from_slice(&source.numerator);
        self.numerator_prime_product = product;
        Ok(())
    }

    /// Append a copy of `source`'s denominator onto this denominator.
    pub fn copy_denominator_dimensions(&mut self, source: &Physics) -> Result<(), ProductOverflow> {
        let product = self
            .denominator_prime_product
            .checked_mul(source.denominator_prime_product)
            .ok_or(ProductOverflow)?;
        self.denominator.extend_from_slice(&source.denominator);
        self.denominator_prime_product = product;
        Ok(())
    }

    /// Division semantics, first half: the divisor's numerator flows into
    /// this quantity's denominator.
    pub fn copy_numerator_to_denominator_dimensions(
        &mut self,
        source: &Physics,
    ) -> Result<(), ProductOverflow> {
        let product = self
            .denominator_prime_product
            .checked_mul(source.numerator_prime_product)
            .ok_or(ProductOverflow)?;
        self.denominator.extend_from_slice(&source.numerator);
        self.denominator_prime_product = product;
        Ok(())
    }

    /// Division semantics, second half: the divisor's denominator flows into
    /// this quantity's numerator.
    pub fn copy_denominator_to_numerator_dimensions(
        &mut self,
        source: &Physics,
    ) -> Result<(), ProductOverflow> {
        let product = self
            .numerator_prime_product
            .checked_mul(source.denominator_prime_product)
            .ok_or(ProductOverflow)?;
        self.numerator.extend_from_slice(&source.denominator);
        self.numerator_prime_product = product;
        Ok(())
    }

    /// Exact dimensional equality: both prime products must match.
    pub fn same_dimension(&self, other: &Physics) -> bool {
        self.numerator_prime_product == other.numerator_prime_product
            && self.denominator_prime_product == other.denominator_prime_product
    }

    pub fn is_dimensionless(&self) -> bool {
        self.numerator_prime_product == 1 && self.denominator_prime_product == 1
    }

    /// Net power of `dim` in this quantity: occurrences in the numerator
    /// minus occurrences in the denominator. Velocity (m/s) has net
    /// exponent −1 for the time dimension.
    pub fn net_exponent_of(&self, dim: DimensionId) -> i32 {
        let num = self.numerator.iter().filter(|&&d| d == dim).count() as i32;
        let den = self.denominator.iter().filter(|&&d| d == dim).count() as i32;
        num - den
    }
}

/// Table of every physics quantity declared in a session
#[derive(Debug, Default)]
pub struct PhysicsTable {
    arena: Arena<Physics>,
    next_ordinal: u32,
}

impl PhysicsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a new, empty quantity named `identifier` in `scope`.
    ///
    /// If a quantity of the same name is already visible, the new record's
    /// `definition` links back to it and its `subindex` is one greater.
    /// Redeclaration is legal and expected for chained law statements.
    pub fn add_physics(
        &mut self,
        scopes: &mut ScopeTree,
        scope: ScopeId,
        identifier: impl Into<String>,
        span: Span,
    ) -> PhysicsId {
        let identifier = identifier.into();
        let definition = self.lookup(scopes, scope, &identifier);
        let subindex = definition.map_or(0, |d| self.arena[d].subindex + 1);
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;

        let mut physics = Physics::anonymous(span);
        physics.identifier = identifier;
        physics.id = ordinal;
        physics.subindex = subindex;
        physics.definition = definition;

        let id = self.arena.alloc(physics);
        scopes.get_mut(scope).physics.push(id);
        id
    }

    /// Look up a quantity by name along the scope→parent chain,
    /// newest declaration first.
    pub fn lookup(&self, scopes: &ScopeTree, from: ScopeId, name: &str) -> Option<PhysicsId> {
        for (_, scope) in scopes.chain(from) {
            if let Some(id) = scope
                .physics
                .iter()
                .rev()
                .copied()
                .find(|&id| self.arena[id].identifier == name)
            {
                return Some(id);
            }
        }
        None
    }

    /// Look up a specific redeclaration of a name by its subindex.
    pub fn lookup_with_subindex(
        &self,
        scopes: &ScopeTree,
        from: ScopeId,
        name: &str,
        subindex: u32,
    ) -> Option<PhysicsId> {
        for (_, scope) in scopes.chain(from) {
            let found = scope.physics.iter().rev().copied().find(|&id| {
                let p = &self.arena[id];
                p.identifier == name && p.subindex == subindex
            });
            if found.is_some() {
                return found;
            }
        }
        None
    }

    pub fn get(&self, id: PhysicsId) -> &Physics {
        &self.arena[id]
    }

    pub fn get_mut(&mut self, id: PhysicsId) -> &mut Physics {
        &mut self.arena[id]
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (PhysicsId, &Physics)> {
        self.arena.iter()
    }
}
