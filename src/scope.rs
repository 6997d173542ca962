//! Lexical scope tree
//!
//! Scopes are arena-allocated and refer to their parent by index, so the
//! tree is acyclic by construction. Each scope owns the ordered lists of
//! dimension and physics declarations made inside it; name lookup searches
//! the scope's own lists newest-first (shadowing), then recurses to the
//! parent. Siblings and children are never searched.

use crate::common::Span;
use crate::units::{DimensionId, PhysicsId};
use id_arena::{Arena, Id};

pub type ScopeId = Id<Scope>;

/// One lexical scope (global, per-invariant)
#[derive(Debug)]
pub struct Scope {
    /// Name of the construct that opened this scope, if any
    pub name: Option<String>,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Dimensions declared here, in declaration order
    pub dimensions: Vec<DimensionId>,
    /// Physics quantities declared here, in declaration order
    pub physics: Vec<PhysicsId>,
    /// Source range of the block that opened this scope
    pub span: Span,
}

/// Arena of scopes rooted at a single global scope
#[derive(Debug)]
pub struct ScopeTree {
    arena: Arena<Scope>,
    root: ScopeId,
}

impl ScopeTree {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.alloc(Scope {
            name: None,
            parent: None,
            children: Vec::new(),
            dimensions: Vec::new(),
            physics: Vec::new(),
            span: Span::dummy(),
        });
        Self { arena, root }
    }

    pub fn root(&self) -> ScopeId {
        self.root
    }

    /// Open a new child scope under `parent`
    pub fn push_child(&mut self, parent: ScopeId, name: Option<String>, span: Span) -> ScopeId {
        let child = self.arena.alloc(Scope {
            name,
            parent: Some(parent),
            children: Vec::new(),
            dimensions: Vec::new(),
            physics: Vec::new(),
            span,
        });
        self.arena[parent].children.push(child);
        child
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.arena[id]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.arena[id]
    }

    /// Record the closing position of a scope's block
    pub fn close(&mut self, id: ScopeId, end: Span) {
        let scope = &mut self.arena[id];
        scope.span = scope.span.merge(end);
    }

    /// Iterate a scope and its ancestors, innermost first
    pub fn chain(&self, from: ScopeId) -> ScopeChain<'_> {
        ScopeChain {
            tree: self,
            current: Some(from),
        }
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over a scope→parent chain
pub struct ScopeChain<'a> {
    tree: &'a ScopeTree,
    current: Option<ScopeId>,
}

impl<'a> Iterator for ScopeChain<'a> {
    type Item = (ScopeId, &'a Scope);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let scope = self.tree.get(id);
        self.current = scope.parent;
        Some((id, scope))
    }
}
