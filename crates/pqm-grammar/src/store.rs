//! The dual node store.
//!
//! A store holds every node produced by one parse, keyed by id rather
//! than by reference: fully parsed nodes live in one map, in-progress
//! context nodes in another, and an id is always in exactly one of the
//! two. Keying by id is what makes promotion (context becomes AST in
//! place) and checkpoint rollback (delete every id above a watermark)
//! cheap.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::error::InvariantError;
use crate::node::AstNode;
use crate::node::ContextNode;
use crate::node::NodeId;
use crate::node::NodeKind;
use crate::node::NodePayload;
use crate::node::TokenRange;
use crate::node::XorNode;

/// The store of all nodes produced by a single parse.
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    /// Fully parsed nodes by id.
    ast_by_id: BTreeMap<NodeId, AstNode>,
    /// In-progress nodes by id.
    context_by_id: BTreeMap<NodeId, ContextNode>,
    /// Child ids by parent id, in strict attribute index order.
    child_ids_by_parent_id: BTreeMap<NodeId, Vec<NodeId>>,
    /// Parent id by child id.
    parent_id_by_child_id: BTreeMap<NodeId, NodeId>,
    /// Ids of terminal nodes.
    leaf_ids: BTreeSet<NodeId>,
    /// Node ids grouped by kind.
    ids_by_kind: BTreeMap<NodeKind, BTreeSet<NodeId>>,
    /// The value of the next id to allocate.
    next_id: u32,
    /// The id of the root node, set when the first context opens.
    root_id: Option<NodeId>,
}

impl NodeStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Gets the value of the next id to be allocated.
    ///
    /// Every id already allocated is strictly smaller.
    pub fn id_watermark(&self) -> u32 {
        self.next_id
    }

    /// Gets the id of the root node.
    pub fn root_id(&self) -> Option<NodeId> {
        self.root_id
    }

    /// Gets the root node.
    pub fn root(&self) -> Option<XorNode<'_>> {
        self.root_id.and_then(|id| self.xor(id))
    }

    /// Allocates the next node id.
    fn alloc_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Gets a fully parsed node by id.
    pub fn ast(&self, id: NodeId) -> Option<&AstNode> {
        self.ast_by_id.get(&id)
    }

    /// Gets an in-progress node by id.
    pub fn context(&self, id: NodeId) -> Option<&ContextNode> {
        self.context_by_id.get(&id)
    }

    /// Gets a node by id in either form.
    pub fn xor(&self, id: NodeId) -> Option<XorNode<'_>> {
        if let Some(node) = self.ast_by_id.get(&id) {
            return Some(XorNode::Ast(node));
        }

        self.context_by_id.get(&id).map(XorNode::Context)
    }

    /// Gets a node by id in either form, raising an invariant error if
    /// the id is unknown.
    pub fn xor_checked(&self, id: NodeId) -> Result<XorNode<'_>, InvariantError> {
        self.xor(id)
            .ok_or_else(|| InvariantError::new(format!("node {id} is not in the store")))
    }

    /// Iterates over all fully parsed nodes in id order.
    pub fn ast_nodes(&self) -> impl Iterator<Item = &AstNode> {
        self.ast_by_id.values()
    }

    /// Iterates over all in-progress nodes in id order.
    pub fn context_nodes(&self) -> impl Iterator<Item = &ContextNode> {
        self.context_by_id.values()
    }

    /// Gets the ids of terminal nodes.
    pub fn leaf_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.leaf_ids.iter().copied()
    }

    /// Gets the ids of nodes of the given kind.
    pub fn ids_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.ids_by_kind
            .get(&kind)
            .into_iter()
            .flat_map(|ids| ids.iter().copied())
    }

    /// Gets the id of a node's parent.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.parent_id_by_child_id.get(&id).copied()
    }

    /// Gets the ordered child ids of a node.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.child_ids_by_parent_id
            .get(&id)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Gets the ancestry of a node, from the node itself to the root.
    pub fn ancestry(&self, id: NodeId) -> Vec<NodeId> {
        let mut ancestry = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            ancestry.push(parent);
            current = parent;
        }

        ancestry
    }

    /// Gets the child of a node at the given attribute index.
    pub fn child_at_index(&self, parent: NodeId, index: u32) -> Option<XorNode<'_>> {
        self.children(parent)
            .iter()
            .find(|id| self.attribute_index_of(**id) == Some(index))
            .and_then(|id| self.xor(*id))
    }

    /// Gets the child of a node at the given attribute index, raising
    /// an invariant error if the child exists with an unexpected kind.
    pub fn nth_child_xor_checked(
        &self,
        parent: NodeId,
        index: u32,
        expected: &[NodeKind],
    ) -> Result<Option<XorNode<'_>>, InvariantError> {
        match self.child_at_index(parent, index) {
            Some(child) if expected.contains(&child.kind()) => Ok(Some(child)),
            Some(child) => Err(InvariantError::new(format!(
                "child {index} of node {parent} has kind {kind}, expected one of {expected:?}",
                kind = child.kind(),
            ))),
            None => Ok(None),
        }
    }

    /// Gets the fully parsed child of a node at the given attribute
    /// index, raising an invariant error if the child exists with an
    /// unexpected kind.
    ///
    /// Returns `None` when the child is absent or still in progress.
    pub fn nth_child_ast_checked(
        &self,
        parent: NodeId,
        index: u32,
        expected: &[NodeKind],
    ) -> Result<Option<&AstNode>, InvariantError> {
        Ok(self
            .nth_child_xor_checked(parent, index, expected)?
            .and_then(|child| match child {
                XorNode::Ast(node) => Some(node),
                XorNode::Context(_) => None,
            }))
    }

    /// Gets the element nodes of a comma-separated production, in
    /// order.
    ///
    /// Elements of both complete and in-progress wrappers are yielded
    /// uniformly; an element-less trailing csv (one the parser opened
    /// but never filled) is skipped.
    pub fn csv_items(&self, id: NodeId) -> Vec<XorNode<'_>> {
        self.children(id)
            .iter()
            .filter(|child| {
                self.xor(**child)
                    .map(|c| c.kind() == NodeKind::Csv)
                    .unwrap_or(false)
            })
            .filter_map(|csv| self.child_at_index(*csv, 0))
            .collect()
    }

    /// Counts the comma-separated elements of a production, including
    /// any element-less trailing csv.
    pub fn csv_count(&self, id: NodeId) -> usize {
        self.children(id)
            .iter()
            .filter(|child| {
                self.xor(**child)
                    .map(|c| c.kind() == NodeKind::Csv)
                    .unwrap_or(false)
            })
            .count()
    }

    /// Gets the attribute index of a node.
    pub fn attribute_index_of(&self, id: NodeId) -> Option<u32> {
        self.xor(id).and_then(|node| node.attribute_index())
    }

    /// Opens a context node for a production.
    ///
    /// The node becomes a child of `parent` at the parent's next
    /// attribute slot; with no parent it becomes the root.
    pub fn open_context(
        &mut self,
        kind: NodeKind,
        parent: Option<NodeId>,
        token_index_start: u32,
    ) -> Result<NodeId, InvariantError> {
        let id = self.alloc_id();
        let attribute_index = match parent {
            Some(parent_id) => {
                let parent_node = self.context_by_id.get_mut(&parent_id).ok_or_else(|| {
                    InvariantError::new(format!("parent {parent_id} is not an open context"))
                })?;
                Some(parent_node.next_attribute_index())
            }
            None => None,
        };

        let node = ContextNode::new(id, kind, token_index_start, parent, attribute_index);
        self.context_by_id.insert(id, node);
        self.ids_by_kind.entry(kind).or_default().insert(id);

        if let Some(parent_id) = parent {
            self.parent_id_by_child_id.insert(id, parent_id);
            self.child_ids_by_parent_id
                .entry(parent_id)
                .or_default()
                .push(id);
        } else if self.root_id.is_none() {
            self.root_id = Some(id);
        }

        Ok(id)
    }

    /// Adds a terminal node under the given open context.
    pub fn add_leaf(
        &mut self,
        kind: NodeKind,
        parent: Option<NodeId>,
        token_range: TokenRange,
        payload: NodePayload,
    ) -> Result<NodeId, InvariantError> {
        if !kind.is_leaf() {
            return Err(
                InvariantError::new(format!("kind {kind} is not a terminal")).with_details(&kind)
            );
        }

        let id = self.alloc_id();
        let attribute_index = match parent {
            Some(parent_id) => {
                let parent_node = self.context_by_id.get_mut(&parent_id).ok_or_else(|| {
                    InvariantError::new(format!("parent {parent_id} is not an open context"))
                })?;
                Some(parent_node.next_attribute_index())
            }
            None => None,
        };

        let node = AstNode::new(id, kind, parent, attribute_index, token_range, payload);
        self.ast_by_id.insert(id, node);
        self.leaf_ids.insert(id);
        self.ids_by_kind.entry(kind).or_default().insert(id);

        if let Some(parent_id) = parent {
            self.parent_id_by_child_id.insert(id, parent_id);
            self.child_ids_by_parent_id
                .entry(parent_id)
                .or_default()
                .push(id);
        } else if self.root_id.is_none() {
            self.root_id = Some(id);
        }

        Ok(id)
    }

    /// Promotes a context node to a fully parsed node.
    ///
    /// The id, parent links, and children are preserved; the node
    /// simply changes form. Reads through [xor][Self::xor] observe the
    /// node in exactly one form at any point.
    pub fn promote_context(
        &mut self,
        id: NodeId,
        token_range: TokenRange,
        payload: NodePayload,
    ) -> Result<(), InvariantError> {
        let context = self.context_by_id.remove(&id).ok_or_else(|| {
            InvariantError::new(format!("node {id} is not an open context"))
        })?;

        let node = AstNode::new(
            id,
            context.kind(),
            context.parent(),
            context.attribute_index(),
            token_range,
            payload,
        );

        if context.kind().is_leaf() {
            self.leaf_ids.insert(id);
        }

        self.ast_by_id.insert(id, node);
        Ok(())
    }

    /// Deletes a context node, unlinking it from its parent.
    ///
    /// A context with a single child is replaced by that child: the
    /// child takes over the deleted node's slot. A context with more
    /// than one child cannot be deleted.
    pub fn delete_context(&mut self, id: NodeId) -> Result<(), InvariantError> {
        let context = self.context_by_id.remove(&id).ok_or_else(|| {
            InvariantError::new(format!("node {id} is not an open context"))
        })?;

        let children = self.child_ids_by_parent_id.remove(&id).unwrap_or_default();
        if children.len() > 1 {
            return Err(InvariantError::new(format!(
                "cannot delete context {id} with {count} children",
                count = children.len()
            ))
            .with_details(&context));
        }

        self.remove_from_kind_index(context.kind(), id);
        let parent = context.parent();
        let attribute_index = context.attribute_index();

        match children.first().copied() {
            Some(child) => {
                // The child takes over the deleted node's slot.
                self.set_parent_link(child, parent, attribute_index);
                if let Some(parent_id) = parent {
                    self.replace_in_child_list(parent_id, id, child);
                    self.parent_id_by_child_id.insert(child, parent_id);
                } else {
                    self.parent_id_by_child_id.remove(&child);
                    if self.root_id == Some(id) {
                        self.root_id = Some(child);
                    }
                }
            }
            None => {
                if let Some(parent_id) = parent {
                    self.remove_from_child_list(parent_id, id);
                    if let Some(parent_node) = self.context_by_id.get_mut(&parent_id) {
                        // The deleted node held the parent's most
                        // recent slot; reclaim it.
                        let counter = parent_node.attribute_counter().saturating_sub(1);
                        parent_node.set_attribute_counter(counter);
                    }
                } else if self.root_id == Some(id) {
                    self.root_id = None;
                }
            }
        }

        self.parent_id_by_child_id.remove(&id);
        Ok(())
    }

    /// Deletes a fully parsed node.
    ///
    /// When `parent_also_doomed` is set the parent-side unlink is
    /// skipped; batch deletion uses this when the parent is about to
    /// be deleted as well.
    pub fn delete_ast(&mut self, id: NodeId, parent_also_doomed: bool) -> Result<(), InvariantError> {
        let node = self
            .ast_by_id
            .remove(&id)
            .ok_or_else(|| InvariantError::new(format!("node {id} is not a parsed node")))?;

        self.remove_from_kind_index(node.kind(), id);
        self.leaf_ids.remove(&id);
        self.child_ids_by_parent_id.remove(&id);

        if !parent_also_doomed {
            if let Some(parent_id) = node.parent() {
                self.remove_from_child_list(parent_id, id);
            }
        }

        if self.root_id == Some(id) {
            self.root_id = None;
        }

        self.parent_id_by_child_id.remove(&id);
        Ok(())
    }

    /// Deletes every node whose id is at or above the given watermark.
    ///
    /// Ids are visited in descending order so children are always
    /// deleted before their parents; surviving contexts that lost
    /// children have their attribute counters repaired. This is the
    /// rollback half of the checkpoint contract.
    pub fn delete_ids_at_or_above(&mut self, watermark: u32) {
        let mut doomed: Vec<NodeId> = self
            .ast_by_id
            .keys()
            .chain(self.context_by_id.keys())
            .copied()
            .filter(|id| id.get() >= watermark)
            .collect();
        doomed.sort_unstable();

        let mut touched_parents = BTreeSet::new();
        for id in doomed.iter().rev().copied() {
            let kind = self
                .xor(id)
                .map(|node| node.kind())
                .expect("doomed id should be in the store");
            self.remove_from_kind_index(kind, id);
            self.ast_by_id.remove(&id);
            self.context_by_id.remove(&id);
            self.leaf_ids.remove(&id);
            self.child_ids_by_parent_id.remove(&id);

            if let Some(parent_id) = self.parent_id_by_child_id.remove(&id) {
                if parent_id.get() < watermark {
                    self.remove_from_child_list(parent_id, id);
                    touched_parents.insert(parent_id);
                }
            }

            if self.root_id == Some(id) {
                self.root_id = None;
            }
        }

        // Repair the attribute counters of surviving contexts.
        for parent_id in touched_parents {
            let counter = self
                .children(parent_id)
                .last()
                .and_then(|child| self.attribute_index_of(*child))
                .map(|index| index + 1)
                .unwrap_or(0);
            if let Some(parent) = self.context_by_id.get_mut(&parent_id) {
                parent.set_attribute_counter(counter);
            }
        }

        self.next_id = self.next_id.min(watermark);
    }

    /// Creates a fully parsed node with no parent, for later
    /// attachment.
    ///
    /// Operator-chain parsing reads operands first and builds the
    /// chain's interior nodes afterwards through this and
    /// [attach_child][Self::attach_child].
    pub(crate) fn insert_ast_node(
        &mut self,
        kind: NodeKind,
        token_range: TokenRange,
        payload: NodePayload,
    ) -> NodeId {
        let id = self.alloc_id();
        let node = AstNode::new(id, kind, None, None, token_range, payload);
        self.ast_by_id.insert(id, node);
        if kind.is_leaf() {
            self.leaf_ids.insert(id);
        }
        self.ids_by_kind.entry(kind).or_default().insert(id);
        id
    }

    /// Detaches a node from its parent, leaving the node in the store.
    pub(crate) fn detach_child(&mut self, id: NodeId) {
        if let Some(parent_id) = self.parent_id_by_child_id.remove(&id) {
            self.remove_from_child_list(parent_id, id);
        }

        self.set_parent_link(id, None, None);
    }

    /// Attaches a node under a parent at the given attribute index.
    pub(crate) fn attach_child(&mut self, parent: NodeId, child: NodeId, attribute_index: u32) {
        self.set_parent_link(child, Some(parent), Some(attribute_index));
        self.parent_id_by_child_id.insert(child, parent);
        let mut children = self
            .child_ids_by_parent_id
            .get(&parent)
            .cloned()
            .unwrap_or_default();
        let position = children
            .iter()
            .position(|existing| {
                self.attribute_index_of(*existing)
                    .map(|index| index > attribute_index)
                    .unwrap_or(false)
            })
            .unwrap_or(children.len());
        children.insert(position, child);
        self.child_ids_by_parent_id.insert(parent, children);
    }

    /// Replaces the root of the store.
    ///
    /// Chain and wrapper productions that adopt an already-read head
    /// node use this when the head was the document root.
    pub(crate) fn set_root(&mut self, id: NodeId) {
        self.root_id = Some(id);
    }

    /// Sets the attribute counter of an open context.
    pub(crate) fn set_context_attribute_counter(&mut self, id: NodeId, counter: u32) {
        if let Some(context) = self.context_by_id.get_mut(&id) {
            context.set_attribute_counter(counter);
        }
    }

    /// Marks an open context as closed without promoting it.
    pub(crate) fn close_context(&mut self, id: NodeId) {
        if let Some(context) = self.context_by_id.get_mut(&id) {
            context.close();
        }
    }

    /// Replaces a node's parent fields.
    fn set_parent_link(
        &mut self,
        id: NodeId,
        parent: Option<NodeId>,
        attribute_index: Option<u32>,
    ) {
        if let Some(node) = self.ast_by_id.get_mut(&id) {
            node.set_parent(parent, attribute_index);
        } else if let Some(node) = self.context_by_id.get_mut(&id) {
            node.set_parent(parent, attribute_index);
        }
    }

    /// Removes a node id from its kind index.
    fn remove_from_kind_index(&mut self, kind: NodeKind, id: NodeId) {
        if let Some(ids) = self.ids_by_kind.get_mut(&kind) {
            ids.remove(&id);
            if ids.is_empty() {
                self.ids_by_kind.remove(&kind);
            }
        }
    }

    /// Removes a node id from a parent's child list.
    fn remove_from_child_list(&mut self, parent: NodeId, child: NodeId) {
        if let Some(children) = self.child_ids_by_parent_id.get_mut(&parent) {
            children.retain(|id| *id != child);
            if children.is_empty() {
                self.child_ids_by_parent_id.remove(&parent);
            }
        }
    }

    /// Replaces a node id with another in a parent's child list,
    /// preserving order.
    fn replace_in_child_list(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        if let Some(children) = self.child_ids_by_parent_id.get_mut(&parent) {
            for id in children.iter_mut() {
                if *id == old {
                    *id = new;
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::span::Position;

    /// A token range for tests that do not inspect positions.
    fn range(start: u32, end: u32) -> TokenRange {
        TokenRange::new(start, end, Position::default(), Position::default())
    }

    #[test]
    fn ids_are_monotone() {
        let mut store = NodeStore::new();
        let a = store
            .open_context(NodeKind::ListExpression, None, 0)
            .unwrap();
        let b = store
            .add_leaf(
                NodeKind::Constant,
                Some(a),
                range(0, 1),
                NodePayload::Constant(crate::node::ConstantKind::OpenBrace),
            )
            .unwrap();
        let c = store.open_context(NodeKind::Csv, Some(a), 1).unwrap();
        assert!(a < b && b < c);
        assert_eq!(store.root_id(), Some(a));
    }

    #[test]
    fn promotion_preserves_links() {
        let mut store = NodeStore::new();
        let list = store
            .open_context(NodeKind::ListExpression, None, 0)
            .unwrap();
        let constant = store
            .add_leaf(
                NodeKind::Constant,
                Some(list),
                range(0, 1),
                NodePayload::Constant(crate::node::ConstantKind::OpenBrace),
            )
            .unwrap();

        store
            .promote_context(list, range(0, 1), NodePayload::None)
            .unwrap();

        let node = store.ast(list).expect("node should be promoted");
        assert_eq!(node.kind(), NodeKind::ListExpression);
        assert!(store.context(list).is_none());
        assert_eq!(store.parent_of(constant), Some(list));
        assert_eq!(store.children(list), &[constant]);
    }

    #[test]
    fn delete_context_reparents_single_child() {
        let mut store = NodeStore::new();
        let outer = store
            .open_context(NodeKind::ParenthesizedExpression, None, 0)
            .unwrap();
        let speculative = store
            .open_context(NodeKind::ArithmeticExpression, Some(outer), 0)
            .unwrap();
        let literal = store
            .add_leaf(
                NodeKind::LiteralExpression,
                Some(speculative),
                range(0, 1),
                NodePayload::Literal {
                    kind: crate::node::LiteralKind::Numeric,
                    text: "1".to_string(),
                },
            )
            .unwrap();

        store.delete_context(speculative).unwrap();

        assert_eq!(store.parent_of(literal), Some(outer));
        assert_eq!(store.children(outer), &[literal]);
        assert_eq!(store.attribute_index_of(literal), Some(0));
    }

    #[test]
    fn rollback_deletes_ids_above_watermark() {
        let mut store = NodeStore::new();
        let list = store
            .open_context(NodeKind::ListExpression, None, 0)
            .unwrap();
        let constant = store
            .add_leaf(
                NodeKind::Constant,
                Some(list),
                range(0, 1),
                NodePayload::Constant(crate::node::ConstantKind::OpenBrace),
            )
            .unwrap();
        let watermark = store.id_watermark();

        let csv = store.open_context(NodeKind::Csv, Some(list), 1).unwrap();
        let literal = store
            .add_leaf(
                NodeKind::LiteralExpression,
                Some(csv),
                range(1, 2),
                NodePayload::Literal {
                    kind: crate::node::LiteralKind::Numeric,
                    text: "1".to_string(),
                },
            )
            .unwrap();

        store.delete_ids_at_or_above(watermark);

        assert!(store.xor(csv).is_none());
        assert!(store.xor(literal).is_none());
        assert!(store.xor(list).is_some());
        assert!(store.xor(constant).is_some());
        assert_eq!(store.children(list), &[constant]);
        assert_eq!(store.id_watermark(), watermark);
        assert_eq!(
            store.context(list).map(|c| c.attribute_counter()),
            Some(1),
            "surviving context should reclaim deleted child slots"
        );
    }

    #[test]
    fn checked_child_access() {
        let mut store = NodeStore::new();
        let list = store
            .open_context(NodeKind::ListExpression, None, 0)
            .unwrap();
        store
            .add_leaf(
                NodeKind::Constant,
                Some(list),
                range(0, 1),
                NodePayload::Constant(crate::node::ConstantKind::OpenBrace),
            )
            .unwrap();

        assert!(store
            .nth_child_xor_checked(list, 0, &[NodeKind::Constant])
            .unwrap()
            .is_some());
        assert!(store
            .nth_child_xor_checked(list, 0, &[NodeKind::Csv])
            .is_err());
        assert!(store
            .nth_child_xor_checked(list, 5, &[NodeKind::Csv])
            .unwrap()
            .is_none());
    }
}
