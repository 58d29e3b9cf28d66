//! Mapping a cursor position to the active node.
//!
//! The active node is the terminal closest to the cursor together
//! with its ancestry back to the document root; every other editor
//! query starts from it.

use pqm_grammar::node::NodeId;
use pqm_grammar::span::Position;
use pqm_grammar::store::NodeStore;

/// A cursor position within a document: zero-based line and code unit
/// column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor {
    /// The zero-based line of the cursor.
    line: u32,
    /// The zero-based code unit column of the cursor.
    column: u32,
}

impl Cursor {
    /// Creates a cursor from a line and column.
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Gets the zero-based line of the cursor.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Gets the zero-based code unit column of the cursor.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Compares the cursor to a source position.
    fn cmp_position(&self, position: Position) -> std::cmp::Ordering {
        (self.line, self.column).cmp(&(position.line(), position.column()))
    }
}

impl From<Position> for Cursor {
    fn from(position: Position) -> Self {
        Self::new(position.line(), position.column())
    }
}

/// How the cursor relates to the active leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorClassification {
    /// The cursor is exactly at the leaf's first code unit.
    OnTokenStart,
    /// The cursor is exactly one past the leaf's last code unit.
    OnTokenEnd,
    /// The cursor is strictly inside the leaf.
    InsideToken,
    /// The cursor is past the leaf, separated by whitespace.
    BetweenTokens,
}

/// The active node for a cursor position.
#[derive(Debug, Clone)]
pub struct ActiveNode {
    /// The id of the leaf closest to the cursor.
    leaf_id: NodeId,
    /// The ancestry of the leaf, from the leaf itself to the root.
    ancestry: Vec<NodeId>,
    /// How the cursor relates to the leaf.
    classification: CursorClassification,
}

impl ActiveNode {
    /// Gets the id of the leaf closest to the cursor.
    pub fn leaf_id(&self) -> NodeId {
        self.leaf_id
    }

    /// Gets the ancestry of the leaf, from the leaf itself to the
    /// root.
    pub fn ancestry(&self) -> &[NodeId] {
        &self.ancestry
    }

    /// Gets how the cursor relates to the leaf.
    pub fn classification(&self) -> CursorClassification {
        self.classification
    }
}

/// Locates the active node for a cursor position.
///
/// The leaf whose range contains the cursor, or the closest leaf
/// before it, is selected by binary search over the store's leaves.
/// Returns `None` when the cursor is out of bounds: the store has no
/// leaves, or the cursor precedes the first one.
pub fn locate(store: &NodeStore, cursor: Cursor) -> Option<ActiveNode> {
    let mut leaves: Vec<(Position, Position, NodeId)> = store
        .leaf_ids()
        .filter_map(|id| {
            store.ast(id).map(|node| {
                let range = node.token_range();
                (range.position_start(), range.position_end(), id)
            })
        })
        .collect();
    leaves.sort_by_key(|(start, _, _)| (start.line(), start.column()));

    if leaves.is_empty() {
        return None;
    }

    // Find the last leaf whose start is at or before the cursor.
    let index = leaves.partition_point(|(start, _, _)| cursor.cmp_position(*start).is_ge());
    if index == 0 {
        return None;
    }

    let (start, end, leaf_id) = leaves[index - 1];
    let classification = if cursor.cmp_position(start).is_eq() {
        CursorClassification::OnTokenStart
    } else if cursor.cmp_position(end).is_eq() {
        CursorClassification::OnTokenEnd
    } else if cursor.cmp_position(end).is_lt() {
        CursorClassification::InsideToken
    } else {
        CursorClassification::BetweenTokens
    };

    Some(ActiveNode {
        leaf_id,
        ancestry: store.ancestry(leaf_id),
        classification,
    })
}
