//! Invoke-expression inspection for signature help.

use pqm_grammar::node::NodeId;
use pqm_grammar::node::NodeKind;
use pqm_grammar::text::normalize_identifier;

use crate::active::ActiveNode;
use crate::active::Cursor;
use crate::inspector::Inspector;
use crate::types::Type;
use crate::types::TypeVariant;

/// The signature context of the invoke expression enclosing a cursor.
#[derive(Debug, Clone)]
pub struct InvokeInspection {
    /// The type of the value being invoked.
    function_type: Type,
    /// The name of the invoked value, when the callee is a plain
    /// identifier.
    name: Option<String>,
    /// Whether the callee name is bound in the scope at the
    /// invocation.
    is_name_in_local_scope: bool,
    /// The number of arguments supplied, including incomplete ones.
    arguments_provided: usize,
    /// The zero-based ordinal of the argument under the cursor.
    active_argument_ordinal: usize,
}

impl InvokeInspection {
    /// Gets the type of the value being invoked.
    pub fn function_type(&self) -> &Type {
        &self.function_type
    }

    /// Gets the name of the invoked value, when the callee is a plain
    /// identifier.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether the callee name is bound in the scope at the
    /// invocation.
    pub fn is_name_in_local_scope(&self) -> bool {
        self.is_name_in_local_scope
    }

    /// Gets the number of arguments supplied.
    pub fn arguments_provided(&self) -> usize {
        self.arguments_provided
    }

    /// Gets the zero-based ordinal of the argument under the cursor.
    pub fn active_argument_ordinal(&self) -> usize {
        self.active_argument_ordinal
    }
}

/// Inspects the invoke expression nearest to the active node.
///
/// The active argument ordinal counts the commas strictly left of the
/// cursor within the argument list. Returns `None` when no enclosing
/// invoke expression exists.
pub fn invoke_inspection(
    inspector: &mut Inspector<'_>,
    active: &ActiveNode,
    cursor: Cursor,
) -> Option<InvokeInspection> {
    let store = inspector.store();
    let invoke = active.ancestry().iter().copied().find(|id| {
        store
            .xor(*id)
            .map(|node| node.kind() == NodeKind::InvokeExpression)
            .unwrap_or(false)
    })?;

    let arguments_provided = store.csv_count(invoke);
    let active_argument_ordinal = commas_left_of(store, invoke, cursor);

    let function_type = match store.parent_of(invoke) {
        Some(parent)
            if store
                .xor(parent)
                .map(|node| node.kind() == NodeKind::RecursivePrimaryExpression)
                .unwrap_or(false) =>
        {
            let callee = inspector.recursive_primary_type(parent, Some(invoke));
            match callee.variant() {
                TypeVariant::DefinedFunction { .. } | TypeVariant::FunctionType { .. } => callee,
                _ => Type::any(),
            }
        }
        _ => Type::any(),
    };

    let name = callee_name(inspector, invoke);
    let is_name_in_local_scope = match &name {
        Some(name) => inspector
            .try_node_scope(invoke)
            .map(|scope| scope.contains_key(name))
            .unwrap_or(false),
        None => false,
    };

    Some(InvokeInspection {
        function_type,
        name,
        is_name_in_local_scope,
        arguments_provided,
        active_argument_ordinal,
    })
}

/// Counts the commas of an invoke expression's argument list that lie
/// strictly left of the cursor.
fn commas_left_of(store: &pqm_grammar::store::NodeStore, invoke: NodeId, cursor: Cursor) -> usize {
    let mut count = 0;
    for csv in store.children(invoke) {
        let is_csv = store
            .xor(*csv)
            .map(|node| node.kind() == NodeKind::Csv)
            .unwrap_or(false);
        if !is_csv {
            continue;
        }

        for child in store.children(*csv) {
            let Some(node) = store.ast(*child) else {
                continue;
            };

            if node.constant_kind() == Some(pqm_grammar::node::ConstantKind::Comma) {
                let start = node.token_range().position_start();
                if Cursor::from(start) < cursor {
                    count += 1;
                }
            }
        }
    }

    count
}

/// Gets the callee name of an invoke expression when the head of its
/// chain is a plain identifier.
fn callee_name(inspector: &Inspector<'_>, invoke: NodeId) -> Option<String> {
    let store = inspector.store();
    let parent = store.parent_of(invoke)?;
    let head = store.child_at_index(parent, 0)?;
    if head.kind() != NodeKind::IdentifierExpression {
        return None;
    }

    store
        .children(head.id())
        .iter()
        .filter_map(|child| store.ast(*child))
        .find_map(|node| node.identifier_text())
        .map(|text| normalize_identifier(text).to_string())
}
