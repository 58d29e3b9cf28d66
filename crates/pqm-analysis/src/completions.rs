//! Autocomplete assembly.
//!
//! Candidates come from four sources: the scope at the active node,
//! keywords gated by the ancestry, primitive type names inside type
//! positions, and the language constants wherever an expression is
//! expected.

use pqm_grammar::node::NodeKind;
use pqm_grammar::node::XorNode;
use tracing::debug;

use crate::active::ActiveNode;
use crate::inspector::Inspector;

/// The keywords that may begin an expression.
const EXPRESSION_KEYWORDS: &[&str] = &[
    "each", "error", "if", "let", "not", "try", "type",
];

/// The language constants offered wherever an expression is expected.
const LANGUAGE_CONSTANTS: &[&str] = &["true", "false", "null"];

/// The primitive type names offered inside type positions.
const PRIMITIVE_TYPE_NAMES: &[&str] = &[
    "action",
    "any",
    "anynonnull",
    "binary",
    "date",
    "datetime",
    "datetimezone",
    "duration",
    "function",
    "list",
    "logical",
    "none",
    "null",
    "number",
    "record",
    "table",
    "text",
    "time",
    "type",
];

/// The kind of an autocomplete candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionItemKind {
    /// A keyword.
    Keyword,
    /// A name bound in the scope at the cursor.
    ScopeItem,
    /// A primitive type name.
    PrimitiveType,
    /// A language constant.
    Constant,
}

/// A single autocomplete candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    /// The text of the candidate.
    label: String,
    /// The kind of the candidate.
    kind: CompletionItemKind,
}

impl CompletionItem {
    /// Creates a completion item.
    fn new(label: impl Into<String>, kind: CompletionItemKind) -> Self {
        Self {
            label: label.into(),
            kind,
        }
    }

    /// Gets the text of the candidate.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Gets the kind of the candidate.
    pub fn kind(&self) -> CompletionItemKind {
        self.kind
    }
}

/// Assembles autocomplete candidates for the active node.
///
/// With no active node (an empty document), the candidates are the
/// expression-start keywords and language constants.
pub fn autocomplete(
    inspector: &mut Inspector<'_>,
    active: Option<&ActiveNode>,
) -> Vec<CompletionItem> {
    let Some(active) = active else {
        return expression_candidates();
    };

    debug!(leaf = active.leaf_id().get(), "assembling completions");

    if in_type_position(inspector, active) {
        let mut items: Vec<CompletionItem> = PRIMITIVE_TYPE_NAMES
            .iter()
            .map(|name| CompletionItem::new(*name, CompletionItemKind::PrimitiveType))
            .collect();
        items.push(CompletionItem::new(
            "nullable",
            CompletionItemKind::Keyword,
        ));
        return items;
    }

    let mut items = expression_candidates();
    items.extend(ancestry_keywords(inspector, active));

    if let Ok(scope) = inspector.try_node_scope(active.leaf_id()) {
        for name in scope.keys() {
            items.push(CompletionItem::new(
                name.clone(),
                CompletionItemKind::ScopeItem,
            ));
        }
    }

    items.dedup();
    items
}

/// The expression-position candidates: keywords plus language
/// constants.
fn expression_candidates() -> Vec<CompletionItem> {
    EXPRESSION_KEYWORDS
        .iter()
        .map(|keyword| CompletionItem::new(*keyword, CompletionItemKind::Keyword))
        .chain(
            LANGUAGE_CONSTANTS
                .iter()
                .map(|constant| CompletionItem::new(*constant, CompletionItemKind::Constant)),
        )
        .collect()
}

/// Determines if the active node sits inside a type position.
fn in_type_position(inspector: &Inspector<'_>, active: &ActiveNode) -> bool {
    let store = inspector.store();
    active.ancestry().iter().any(|id| {
        store
            .xor(*id)
            .map(|node| {
                matches!(
                    node.kind(),
                    NodeKind::TypePrimaryType
                        | NodeKind::AsNullablePrimitiveType
                        | NodeKind::NullablePrimitiveType
                        | NodeKind::NullableType
                        | NodeKind::FieldTypeSpecification
                        | NodeKind::AsType
                )
            })
            .unwrap_or(false)
    })
}

/// Collects keywords admitted by in-progress productions in the
/// ancestry, such as `in` inside an unfinished `let`.
fn ancestry_keywords(inspector: &Inspector<'_>, active: &ActiveNode) -> Vec<CompletionItem> {
    let store = inspector.store();
    let mut items = Vec::new();
    for id in active.ancestry() {
        let Some(XorNode::Context(context)) = store.xor(*id) else {
            continue;
        };

        match context.kind() {
            NodeKind::LetExpression => {
                items.push(CompletionItem::new("in", CompletionItemKind::Keyword));
            }
            NodeKind::IfExpression => {
                // After the condition the `then` branch is expected;
                // after the true branch, `else`.
                if context.attribute_counter() <= 2 {
                    items.push(CompletionItem::new("then", CompletionItemKind::Keyword));
                } else {
                    items.push(CompletionItem::new("else", CompletionItemKind::Keyword));
                }
            }
            NodeKind::ErrorHandlingExpression => {
                items.push(CompletionItem::new(
                    "otherwise",
                    CompletionItemKind::Keyword,
                ));
                items.push(CompletionItem::new("catch", CompletionItemKind::Keyword));
            }
            NodeKind::Section | NodeKind::SectionMember => {
                items.push(CompletionItem::new("shared", CompletionItemKind::Keyword));
            }
            _ => {}
        }
    }

    items
}
