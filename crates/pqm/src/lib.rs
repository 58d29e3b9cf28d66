//! Power Query / M formula language document parsing and analysis.
//!
//! This crate re-exports the grammar and analysis crates and provides
//! the staged lex-then-parse entry points whose results are tagged
//! with the stage reached, so a caller can always inspect the
//! farthest point a document made it to.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

#[doc(inline)]
pub use pqm_analysis as analysis;
#[doc(inline)]
pub use pqm_grammar as grammar;

use pqm_grammar::lexer::LexFailure;
use pqm_grammar::lexer::LexPartial;
use pqm_grammar::lexer::LexSnapshot;
use pqm_grammar::parser::try_parse;
use pqm_grammar::parser::ParseFailure;
use pqm_grammar::parser::ParseOk;
use pqm_grammar::settings::Settings;

/// The pipeline stage a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The lexing stage.
    Lex,
    /// The parsing stage.
    Parse,
}

/// The outcome of lexing and parsing a document.
#[derive(Debug)]
pub enum LexParse {
    /// Both stages succeeded.
    Ok {
        /// The token snapshot of the document.
        snapshot: LexSnapshot,
        /// The successful parse.
        parse: ParseOk,
    },
    /// Lexing failed outright; there was nothing to parse.
    LexError {
        /// The failure from the lexing stage.
        error: LexFailure,
    },
    /// Lexing produced a snapshot (possibly mixed with an error), but
    /// parsing failed.
    ParseError {
        /// The token snapshot of the document.
        snapshot: LexSnapshot,
        /// The failure from the parsing stage, bundled with the
        /// partial store.
        failure: ParseFailure,
    },
}

impl LexParse {
    /// Gets the farthest stage the document reached.
    pub fn stage(&self) -> Stage {
        match self {
            Self::LexError { .. } => Stage::Lex,
            Self::Ok { .. } | Self::ParseError { .. } => Stage::Parse,
        }
    }

    /// Gets the token snapshot, when lexing produced one.
    pub fn snapshot(&self) -> Option<&LexSnapshot> {
        match self {
            Self::Ok { snapshot, .. } | Self::ParseError { snapshot, .. } => Some(snapshot),
            Self::LexError { .. } => None,
        }
    }
}

/// Lexes a document into a token snapshot.
pub fn lex(source: &str) -> LexPartial<LexSnapshot> {
    pqm_grammar::lexer::lex(source)
}

/// Parses a document from an existing token snapshot.
pub fn parse(settings: &Settings, snapshot: &LexSnapshot) -> Result<ParseOk, ParseFailure> {
    try_parse(settings, snapshot)
}

/// Lexes and parses a document, tagging the result with the stage
/// reached.
///
/// A mixed lex outcome still parses: the parser consumes the prefix
/// of tokens that lexed and reports its own error for whatever is
/// missing.
pub fn lex_parse(settings: &Settings, source: &str) -> LexParse {
    let snapshot = match lex(source) {
        LexPartial::Ok { value } | LexPartial::Mixed { value, .. } => value,
        LexPartial::Error { error } => return LexParse::LexError { error },
    };

    match parse(settings, &snapshot) {
        Ok(parse) => LexParse::Ok { snapshot, parse },
        Err(failure) => LexParse::ParseError { snapshot, failure },
    }
}
