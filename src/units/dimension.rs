//! Base dimension records and the per-session dimension registry

use crate::common::Span;
use crate::scope::{ScopeId, ScopeTree};
use crate::units::primes::PrimeAllocator;
use id_arena::{Arena, Id};

pub type DimensionId = Id<Dimension>;

/// A base physical dimension (meter, second, ...) with its prime identity
#[derive(Debug, Clone)]
pub struct Dimension {
    pub identifier: String,
    pub abbreviation: String,
    /// Always 1.0 for a freshly declared base dimension
    pub exponent: f64,
    /// Unique prime identity; never reused while the registry is alive
    pub prime: u64,
    pub scope: ScopeId,
    pub span: Span,
}

/// Registry of every base dimension declared in a session.
///
/// Owned by the session `State`; the prime allocator lives here rather than
/// in any process-wide static, so independent sessions never interfere.
#[derive(Debug, Default)]
pub struct DimensionRegistry {
    arena: Arena<Dimension>,
    primes: PrimeAllocator,
}

impl DimensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a new base dimension in `scope`, allocating its prime.
    ///
    /// Returns `None` once the prime table is exhausted. Allocation is not
    /// idempotent: two calls with the same name create two records with two
    /// different primes, so callers must `lookup` first.
    pub fn add_dimension(
        &mut self,
        scopes: &mut ScopeTree,
        scope: ScopeId,
        identifier: impl Into<String>,
        abbreviation: impl Into<String>,
        span: Span,
    ) -> Option<DimensionId> {
        let prime = self.primes.allocate()?;
        let id = self.arena.alloc(Dimension {
            identifier: identifier.into(),
            abbreviation: abbreviation.into(),
            exponent: 1.0,
            prime,
            scope,
            span,
        });
        scopes.get_mut(scope).dimensions.push(id);
        Some(id)
    }

    /// Look up a dimension by name along the scope→parent chain.
    pub fn lookup(&self, scopes: &ScopeTree, from: ScopeId, name: &str) -> Option<DimensionId> {
        for (_, scope) in scopes.chain(from) {
            if let Some(id) = self.lookup_in(scope.dimensions.iter(), name) {
                return Some(id);
            }
        }
        None
    }

    /// Look up a dimension in a single scope only (no parent fallback).
    pub fn lookup_local(&self, scopes: &ScopeTree, scope: ScopeId, name: &str) -> Option<DimensionId> {
        self.lookup_in(scopes.get(scope).dimensions.iter(), name)
    }

    fn lookup_in<'a>(
        &self,
        ids: impl DoubleEndedIterator<Item = &'a DimensionId>,
        name: &str,
    ) -> Option<DimensionId> {
        ids.rev()
            .copied()
            .find(|&id| self.arena[id].identifier == name)
    }

    pub fn get(&self, id: DimensionId) -> &Dimension {
        &self.arena[id]
    }

    pub fn prime_of(&self, id: DimensionId) -> u64 {
        self.arena[id].prime
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.len() == 0
    }

    pub fn capacity(&self) -> usize {
        PrimeAllocator::capacity()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DimensionId, &Dimension)> {
        self.arena.iter()
    }
}
