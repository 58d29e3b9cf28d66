//! Editor-facing analysis of Power Query / M formula language
//! documents.
//!
//! Queries run against the dual node store produced by `pqm-grammar`,
//! including stores left partial by a failed parse: the active node
//! at a cursor, the lexical scope visible there, the inferred static
//! type of any node, invoke-expression signature context, and
//! autocomplete candidates.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod active;
pub mod completions;
pub mod inspector;
pub mod invoke;
pub mod scope;
pub mod types;

pub use active::locate;
pub use active::ActiveNode;
pub use active::Cursor;
pub use active::CursorClassification;
pub use completions::autocomplete;
pub use completions::CompletionItem;
pub use completions::CompletionItemKind;
pub use inspector::Inspector;
pub use invoke::invoke_inspection;
pub use invoke::InvokeInspection;
pub use scope::NodeScope;
pub use scope::ScopeItem;
pub use types::simplify;
pub use types::Type;
pub use types::TypeKind;
