//! Lexical scope resolution.
//!
//! The scope visible at a node is computed root-down: a node's scope
//! is its parent's (memoized) scope plus whatever the parent
//! contributes to that particular child slot. Inner bindings shadow
//! outer ones; a `let` or section binding is visible inside its own
//! defining expression only through an `@`-marked reference.

use std::sync::Arc;

use indexmap::IndexMap;
use pqm_grammar::error::InvariantError;
use pqm_grammar::node::ConstantKind;
use pqm_grammar::node::NodeId;
use pqm_grammar::node::NodeKind;
use pqm_grammar::node::PrimitiveTypeKind;
use pqm_grammar::text::normalize_identifier;

use crate::inspector::Inspector;

/// The scope visible at a node: identifier literal to scope item, in
/// binding order.
pub type NodeScope = IndexMap<String, ScopeItem>;

/// A named binding visible at a node.
#[derive(Debug, Clone)]
pub enum ScopeItem {
    /// A binding introduced by a `let` expression.
    LetVariable {
        /// The id of the binding's key node.
        key: NodeId,
        /// The id of the binding's value subtree, when present.
        value: Option<NodeId>,
        /// Whether this position reaches the binding only through an
        /// `@`-marked reference.
        is_recursive: bool,
    },
    /// A binding introduced by a section member.
    SectionMember {
        /// The id of the binding's key node.
        key: NodeId,
        /// The id of the binding's value subtree, when present.
        value: Option<NodeId>,
        /// Whether this position reaches the binding only through an
        /// `@`-marked reference.
        is_recursive: bool,
    },
    /// A record field visible to a sibling field's value expression.
    RecordField {
        /// The id of the field's key node.
        key: NodeId,
        /// The id of the field's value subtree, when present.
        value: Option<NodeId>,
    },
    /// A function parameter.
    Parameter {
        /// The id of the parameter's name node.
        key: NodeId,
        /// The parameter's name.
        name: String,
        /// Whether the parameter is optional.
        is_optional: bool,
        /// Whether the parameter's type admits null.
        is_nullable: bool,
        /// The parameter's annotated primitive type, when present.
        type_kind: Option<PrimitiveTypeKind>,
    },
    /// The implicit `_` bound by an `each` expression.
    Each {
        /// The id of the binding `each` expression.
        each_id: NodeId,
    },
    /// A name that was seen but could not be bound.
    Undefined {
        /// The id of the unresolved reference.
        node: NodeId,
    },
}

impl ScopeItem {
    /// Gets the id of the binding's value subtree, when the item has
    /// one.
    pub fn value(&self) -> Option<NodeId> {
        match self {
            Self::LetVariable { value, .. }
            | Self::SectionMember { value, .. }
            | Self::RecordField { value, .. } => *value,
            Self::Parameter { .. } | Self::Each { .. } | Self::Undefined { .. } => None,
        }
    }

    /// Whether this position reaches the binding only through an
    /// `@`-marked reference.
    pub fn is_recursive(&self) -> bool {
        match self {
            Self::LetVariable { is_recursive, .. } | Self::SectionMember { is_recursive, .. } => {
                *is_recursive
            }
            _ => false,
        }
    }
}

/// A binding extracted from a paired-expression node.
struct Binding {
    /// The normalized name of the binding.
    name: String,
    /// The id of the paired-expression node.
    pair: NodeId,
    /// The id of the key node.
    key: NodeId,
    /// The id of the value subtree, when present.
    value: Option<NodeId>,
}

impl<'a> Inspector<'a> {
    /// Computes the scope visible at a node.
    ///
    /// Results are memoized per node id; re-invoking on the same node
    /// returns an equal mapping.
    pub fn try_node_scope(&mut self, id: NodeId) -> Result<Arc<NodeScope>, InvariantError> {
        if let Some(scope) = self.scope_by_id.get(&id) {
            return Ok(scope.clone());
        }

        self.store().xor_checked(id)?;
        let scope = match self.store().parent_of(id) {
            None => NodeScope::new(),
            Some(parent) => {
                let base = self.try_node_scope(parent)?;
                let mut scope = (*base).clone();
                self.add_contributions(parent, id, &mut scope);
                scope
            }
        };

        let scope = Arc::new(scope);
        self.scope_by_id.insert(id, scope.clone());
        Ok(scope)
    }

    /// Adds what `parent` contributes to the scope of the given child
    /// slot.
    fn add_contributions(&self, parent: NodeId, child: NodeId, scope: &mut NodeScope) {
        let store = self.store();
        let Some(parent_node) = store.xor(parent) else {
            return;
        };

        match parent_node.kind() {
            // The `in` expression of a `let` sees every binding.
            NodeKind::LetExpression => {
                if is_expression_slot(store, child) {
                    for binding in paired_bindings(store, parent) {
                        scope.insert(
                            binding.name.clone(),
                            ScopeItem::LetVariable {
                                key: binding.key,
                                value: binding.value,
                                is_recursive: false,
                            },
                        );
                    }
                }
            }
            // A binding's value expression sees every sibling binding
            // and, recursively, itself.
            NodeKind::IdentifierPairedExpression
            | NodeKind::GeneralizedIdentifierPairedExpression => {
                if store.attribute_index_of(child) != Some(2) {
                    return;
                }

                let Some(csv_or_member) = store.parent_of(parent) else {
                    return;
                };
                let Some(container) = store.parent_of(csv_or_member) else {
                    return;
                };
                let Some(container_node) = store.xor(container) else {
                    return;
                };

                match container_node.kind() {
                    NodeKind::LetExpression => {
                        for binding in paired_bindings(store, container) {
                            scope.insert(
                                binding.name.clone(),
                                ScopeItem::LetVariable {
                                    key: binding.key,
                                    value: binding.value,
                                    is_recursive: binding.pair == parent,
                                },
                            );
                        }
                    }
                    NodeKind::RecordExpression | NodeKind::RecordLiteral => {
                        for binding in paired_bindings(store, container) {
                            if binding.pair == parent {
                                continue;
                            }

                            scope.insert(
                                binding.name.clone(),
                                ScopeItem::RecordField {
                                    key: binding.key,
                                    value: binding.value,
                                },
                            );
                        }
                    }
                    NodeKind::Section => {
                        for binding in section_bindings(store, container) {
                            scope.insert(
                                binding.name.clone(),
                                ScopeItem::SectionMember {
                                    key: binding.key,
                                    value: binding.value,
                                    is_recursive: binding.pair == parent,
                                },
                            );
                        }
                    }
                    _ => {}
                }
            }
            // A function body sees the parameters.
            NodeKind::FunctionExpression => {
                if is_expression_slot(store, child) {
                    for item in function_parameters(store, parent) {
                        if let ScopeItem::Parameter { name, .. } = &item {
                            scope.insert(name.clone(), item.clone());
                        }
                    }
                }
            }
            // An `each` body sees the implicit `_`.
            NodeKind::EachExpression => {
                if store.attribute_index_of(child) == Some(1) {
                    scope.insert("_".to_string(), ScopeItem::Each { each_id: parent });
                }
            }
            _ => {}
        }
    }

    /// Resolves an identifier expression against its scope.
    ///
    /// An unresolved name, or a recursion marker that does not match
    /// the binding position, yields [ScopeItem::Undefined].
    pub fn resolve_identifier(&mut self, id: NodeId) -> Result<ScopeItem, InvariantError> {
        let store = self.store();
        let mut is_recursive = false;
        let mut name = None;
        for child in store.children(id) {
            if let Some(node) = store.ast(*child) {
                if node.constant_kind() == Some(ConstantKind::At) {
                    is_recursive = true;
                }
                if let Some(text) = node.identifier_text() {
                    name = Some(normalize_identifier(text).to_string());
                }
            }
        }

        let Some(name) = name else {
            return Ok(ScopeItem::Undefined { node: id });
        };

        let scope = self.try_node_scope(id)?;
        match scope.get(&name) {
            Some(item) => {
                let recursion_matches = match item {
                    ScopeItem::LetVariable { is_recursive: r, .. }
                    | ScopeItem::SectionMember { is_recursive: r, .. } => *r == is_recursive,
                    _ => true,
                };
                if recursion_matches {
                    Ok(item.clone())
                } else {
                    Ok(ScopeItem::Undefined { node: id })
                }
            }
            None => Ok(ScopeItem::Undefined { node: id }),
        }
    }
}

/// Determines if a child occupies an expression slot of its parent
/// (i.e. is not punctuation, a binding list element, or a parameter
/// list).
fn is_expression_slot(store: &pqm_grammar::store::NodeStore, child: NodeId) -> bool {
    store
        .xor(child)
        .map(|node| {
            !matches!(
                node.kind(),
                NodeKind::Constant
                    | NodeKind::Csv
                    | NodeKind::ParameterList
                    | NodeKind::AsNullablePrimitiveType
            )
        })
        .unwrap_or(false)
}

/// Extracts the bindings of a production whose csv elements are
/// paired expressions.
fn paired_bindings(store: &pqm_grammar::store::NodeStore, container: NodeId) -> Vec<Binding> {
    store
        .csv_items(container)
        .iter()
        .filter_map(|pair| binding_of_pair(store, pair.id()))
        .collect()
}

/// Extracts the bindings of a section's members.
fn section_bindings(store: &pqm_grammar::store::NodeStore, section: NodeId) -> Vec<Binding> {
    store
        .children(section)
        .iter()
        .filter(|id| {
            store
                .xor(**id)
                .map(|node| node.kind() == NodeKind::SectionMember)
                .unwrap_or(false)
        })
        .filter_map(|member| {
            let pair = store.children(*member).iter().copied().find(|id| {
                store
                    .xor(*id)
                    .map(|node| node.kind() == NodeKind::IdentifierPairedExpression)
                    .unwrap_or(false)
            })?;
            binding_of_pair(store, pair)
        })
        .collect()
}

/// Extracts the binding of one paired-expression node, tolerating
/// in-progress pairs with a missing value.
fn binding_of_pair(store: &pqm_grammar::store::NodeStore, pair: NodeId) -> Option<Binding> {
    let key = store.child_at_index(pair, 0)?;
    let key_node = key.as_ast()?;
    let name = normalize_identifier(key_node.identifier_text()?).to_string();
    let value = store.child_at_index(pair, 2).map(|node| node.id());
    Some(Binding {
        name,
        pair,
        key: key_node.id(),
        value,
    })
}

/// Extracts the parameters of a function expression as scope items.
pub(crate) fn function_parameters(
    store: &pqm_grammar::store::NodeStore,
    function: NodeId,
) -> Vec<ScopeItem> {
    let Some(list) = store
        .children(function)
        .iter()
        .copied()
        .find(|id| {
            store
                .xor(*id)
                .map(|node| node.kind() == NodeKind::ParameterList)
                .unwrap_or(false)
        })
    else {
        return Vec::new();
    };

    store
        .csv_items(list)
        .iter()
        .filter_map(|parameter| parameter_scope_item(store, parameter.id()))
        .collect()
}

/// Extracts a single parameter as a scope item.
pub(crate) fn parameter_scope_item(
    store: &pqm_grammar::store::NodeStore,
    parameter: NodeId,
) -> Option<ScopeItem> {
    let mut is_optional = false;
    let mut key = None;
    let mut name = None;
    let mut is_nullable = true;
    let mut type_kind = None;

    for child in store.children(parameter) {
        let Some(node) = store.ast(*child) else {
            continue;
        };

        if node.constant_kind() == Some(ConstantKind::Optional) {
            is_optional = true;
        }

        if node.kind() == NodeKind::Identifier {
            key = Some(node.id());
            name = node.identifier_text().map(|t| t.to_string());
        }

        if node.kind() == NodeKind::AsNullablePrimitiveType {
            let (kind, nullable) = annotated_primitive(store, node.id());
            type_kind = kind;
            is_nullable = nullable;
        }
    }

    Some(ScopeItem::Parameter {
        key: key?,
        name: name?,
        is_optional,
        is_nullable,
        type_kind,
    })
}

/// Extracts the primitive type kind and nullability of an `as`
/// annotation.
pub(crate) fn annotated_primitive(
    store: &pqm_grammar::store::NodeStore,
    annotation: NodeId,
) -> (Option<PrimitiveTypeKind>, bool) {
    for child in store.children(annotation) {
        let Some(node) = store.ast(*child) else {
            continue;
        };

        match node.kind() {
            NodeKind::PrimitiveType => {
                return (node.primitive_type_kind(), false);
            }
            NodeKind::NullablePrimitiveType => {
                let kind = store
                    .children(node.id())
                    .iter()
                    .filter_map(|id| store.ast(*id))
                    .find_map(|n| n.primitive_type_kind());
                return (kind, true);
            }
            _ => {}
        }
    }

    (None, true)
}
