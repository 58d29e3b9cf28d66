//! The inspection session over a parsed (or partially parsed) store.

use std::collections::HashMap;
use std::sync::Arc;

use pqm_grammar::node::NodeId;
use pqm_grammar::store::NodeStore;

use crate::scope::NodeScope;
use crate::types::Type;

/// Answers scope and type queries over one node store.
///
/// An inspector owns the memoization caches for scope and type
/// resolution; both are write-once per node id and valid only for the
/// store the inspector was created over, which must not change while
/// the inspector lives.
#[derive(Debug)]
pub struct Inspector<'a> {
    /// The store being inspected.
    store: &'a NodeStore,
    /// Memoized scopes by node id.
    pub(crate) scope_by_id: HashMap<NodeId, Arc<NodeScope>>,
    /// Memoized types by node id.
    pub(crate) type_by_id: HashMap<NodeId, Type>,
}

impl<'a> Inspector<'a> {
    /// Creates an inspector over the given store.
    pub fn new(store: &'a NodeStore) -> Self {
        Self {
            store,
            scope_by_id: HashMap::new(),
            type_by_id: HashMap::new(),
        }
    }

    /// Gets the store being inspected.
    pub fn store(&self) -> &'a NodeStore {
        self.store
    }
}
