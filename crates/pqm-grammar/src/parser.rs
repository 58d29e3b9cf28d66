//! The parser reader set and document orchestration.
//!
//! A [Parser] is a table of reader functions, one per overridable
//! production; readers dispatch through the table so a host may swap
//! individual productions without rewriting the rest. The
//! [try_parse] orchestrator attempts an expression document first and
//! a section document second, returning whichever parse consumed more
//! input.

use serde_json::json;

use crate::error::Error;
use crate::error::ParseError;
use crate::grammar;
use crate::lexer::LexSnapshot;
use crate::node::NodeId;
use crate::settings::Settings;
use crate::state::ParserState;
use crate::store::NodeStore;

/// The signature shared by most production readers.
pub type ReadFn = fn(&mut ParserState<'_>, &Parser) -> Result<NodeId, Error>;

/// The signature of suffix readers, which receive the already-read
/// head node.
pub type ReadSuffixFn = fn(&mut ParserState<'_>, &Parser, NodeId) -> Result<NodeId, Error>;

/// The entry production a parse starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// Try an expression document, then a section document.
    Document,
    /// Parse an expression document only.
    Expression,
    /// Parse a section document only.
    Section,
}

/// A set of production readers.
///
/// Readers always dispatch child productions through the set they
/// were handed, so replacing one entry changes behavior everywhere
/// that production is read.
#[derive(Debug, Clone, Copy)]
pub struct Parser {
    /// Reads any expression.
    pub read_expression: ReadFn,
    /// Reads a chain of binary operators.
    pub read_binary_expression: ReadFn,
    /// Reads a unary expression.
    pub read_unary_expression: ReadFn,
    /// Reads a type expression.
    pub read_type_expression: ReadFn,
    /// Reads a primary expression.
    pub read_primary_expression: ReadFn,
    /// Reads the access and invocation suffixes of a primary
    /// expression.
    pub read_recursive_primary_expression: ReadSuffixFn,
    /// Reads a literal expression.
    pub read_literal_expression: ReadFn,
    /// Reads an identifier expression.
    pub read_identifier_expression: ReadFn,
    /// Reads a parenthesized expression.
    pub read_parenthesized_expression: ReadFn,
    /// Reads a not-implemented expression.
    pub read_not_implemented_expression: ReadFn,
    /// Reads a list expression.
    pub read_list_expression: ReadFn,
    /// Reads a record expression.
    pub read_record_expression: ReadFn,
    /// Reads an invocation suffix.
    pub read_invoke_expression: ReadFn,
    /// Reads an item access suffix.
    pub read_item_access_expression: ReadFn,
    /// Reads a field selector.
    pub read_field_selector: ReadFn,
    /// Reads a field projection.
    pub read_field_projection: ReadFn,
    /// Reads an `each` expression.
    pub read_each_expression: ReadFn,
    /// Reads a `let` expression.
    pub read_let_expression: ReadFn,
    /// Reads an `if` expression.
    pub read_if_expression: ReadFn,
    /// Reads an `error` expression.
    pub read_error_raising_expression: ReadFn,
    /// Reads a `try` expression.
    pub read_error_handling_expression: ReadFn,
    /// Reads a function expression.
    pub read_function_expression: ReadFn,
    /// Reads a parameter list.
    pub read_parameter_list: ReadFn,
    /// Reads a primitive type terminal.
    pub read_primitive_type: ReadFn,
    /// Reads a section document.
    pub read_section: ReadFn,
    /// Reads a section member.
    pub read_section_member: ReadFn,
}

impl Parser {
    /// The default recursive descent reader set.
    pub fn recursive_descent() -> Self {
        Self {
            read_expression: grammar::read_expression,
            read_binary_expression: grammar::read_binary_expression,
            read_unary_expression: grammar::read_unary_expression,
            read_type_expression: grammar::read_type_expression,
            read_primary_expression: grammar::read_primary_expression,
            read_recursive_primary_expression: grammar::read_recursive_primary_expression,
            read_literal_expression: grammar::read_literal_expression,
            read_identifier_expression: grammar::read_identifier_expression,
            read_parenthesized_expression: grammar::read_parenthesized_expression,
            read_not_implemented_expression: grammar::read_not_implemented_expression,
            read_list_expression: grammar::read_list_expression,
            read_record_expression: grammar::read_record_expression,
            read_invoke_expression: grammar::read_invoke_expression,
            read_item_access_expression: grammar::read_item_access_expression,
            read_field_selector: grammar::read_field_selector,
            read_field_projection: grammar::read_field_projection,
            read_each_expression: grammar::read_each_expression,
            read_let_expression: grammar::read_let_expression,
            read_if_expression: grammar::read_if_expression,
            read_error_raising_expression: grammar::read_error_raising_expression,
            read_error_handling_expression: grammar::read_error_handling_expression,
            read_function_expression: grammar::read_function_expression,
            read_parameter_list: grammar::read_parameter_list,
            read_primitive_type: grammar::read_primitive_type,
            read_section: grammar::read_section,
            read_section_member: grammar::read_section_member,
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::recursive_descent()
    }
}

/// A successful parse: the root node id and the node store.
#[derive(Debug)]
pub struct ParseOk {
    /// The id of the document root.
    root: NodeId,
    /// The node store of the parse.
    store: NodeStore,
}

impl ParseOk {
    /// Gets the id of the document root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Gets the node store of the parse.
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// Consumes the result, returning the node store.
    pub fn into_store(self) -> NodeStore {
        self.store
    }
}

/// A failed parse: the error, bundled with the partial node store so
/// inspection can still answer queries over the prefix that parsed.
#[derive(Debug)]
pub struct ParseFailure {
    /// The error that ended the parse.
    error: Error,
    /// The node store of the partial parse.
    store: NodeStore,
    /// The number of tokens consumed before the parse ended.
    tokens_consumed: usize,
}

impl ParseFailure {
    /// Gets the error that ended the parse.
    pub fn error(&self) -> &Error {
        &self.error
    }

    /// Gets the node store of the partial parse.
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// Gets the number of tokens consumed before the parse ended.
    pub fn tokens_consumed(&self) -> usize {
        self.tokens_consumed
    }

    /// Consumes the failure, returning the error and the partial node
    /// store.
    pub fn into_parts(self) -> (Error, NodeStore) {
        (self.error, self.store)
    }
}

/// Runs a single parse attempt from the given entry production.
fn attempt(
    settings: &Settings,
    snapshot: &LexSnapshot,
    entry: EntryPoint,
) -> Result<ParseOk, ParseFailure> {
    let parser = settings.parser();
    let mut state = ParserState::new(settings, snapshot);
    let read = match entry {
        EntryPoint::Section => parser.read_section,
        _ => parser.read_expression,
    };

    match read(&mut state, parser) {
        Ok(root) => {
            if state.at_end() {
                let (store, _) = state.into_parts();
                Ok(ParseOk { root, store })
            } else {
                let error = Error::Parse(ParseError::UnusedTokensRemain {
                    found: state.location(),
                });
                let (store, tokens_consumed) = state.into_parts();
                Err(ParseFailure {
                    error,
                    store,
                    tokens_consumed,
                })
            }
        }
        Err(error) => {
            let (store, tokens_consumed) = state.into_parts();
            Err(ParseFailure {
                error,
                store,
                tokens_consumed,
            })
        }
    }
}

/// Parses a document from the given token snapshot.
///
/// With the default entry point, an expression document is attempted
/// first and a section document second; whichever attempt consumed
/// more tokens is returned, ties going to the expression attempt. On
/// failure the error is bundled with the partial node store.
pub fn try_parse(settings: &Settings, snapshot: &LexSnapshot) -> Result<ParseOk, ParseFailure> {
    let trace = settings.trace_manager().entry(
        "parse",
        "document",
        Some(&json!({ "tokens": snapshot.len() })),
    );

    let entry = settings.parser_entry_point().unwrap_or(EntryPoint::Document);
    let result = match entry {
        EntryPoint::Expression | EntryPoint::Section => attempt(settings, snapshot, entry),
        EntryPoint::Document => {
            match attempt(settings, snapshot, EntryPoint::Expression) {
                Ok(ok) => Ok(ok),
                Err(expression_failure) => {
                    // Cancellation propagates immediately rather than
                    // triggering the section fallback.
                    if matches!(expression_failure.error(), Error::Cancelled(_)) {
                        Err(expression_failure)
                    } else {
                        match attempt(settings, snapshot, EntryPoint::Section) {
                            Ok(ok) => Ok(ok),
                            Err(section_failure) => {
                                if section_failure.tokens_consumed()
                                    > expression_failure.tokens_consumed()
                                {
                                    Err(section_failure)
                                } else {
                                    Err(expression_failure)
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    match &result {
        Ok(ok) => trace.exit(Some(&json!({ "root": ok.root().get() }))),
        Err(failure) => trace.exit(Some(
            &json!({ "error": failure.error().to_string(), "consumed": failure.tokens_consumed() }),
        )),
    }

    result
}
