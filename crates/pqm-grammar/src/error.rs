//! Error types for parsing.
//!
//! Errors fall into three classes: parse errors describe malformed
//! input and are bundled with the partial tree; invariant errors are
//! contract violations inside the engine; cancellation errors carry a
//! cooperative stop. Speculative readers roll back on parse errors
//! only and re-raise the other two unchanged.

use std::fmt;

use crate::lexer::Token;
use crate::span::Position;

/// Identifies where an error occurred: a token, or the end of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLocation {
    /// The kind of the offending token, or `None` at end of input.
    kind: Option<Token>,
    /// The text of the offending token.
    text: String,
    /// The position of the offending token or of the end of input.
    position: Position,
}

impl TokenLocation {
    /// Creates a location for an offending token.
    pub fn new(kind: Token, text: impl Into<String>, position: Position) -> Self {
        Self {
            kind: Some(kind),
            text: text.into(),
            position,
        }
    }

    /// Creates a location for the end of input.
    pub fn end_of_input(position: Position) -> Self {
        Self {
            kind: None,
            text: String::new(),
            position,
        }
    }

    /// Gets the kind of the offending token, or `None` at end of input.
    pub fn kind(&self) -> Option<Token> {
        self.kind
    }

    /// Gets the text of the offending token.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Gets the position of the error.
    pub fn position(&self) -> Position {
        self.position
    }
}

impl fmt::Display for TokenLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Some(kind) => write!(
                f,
                "{kind} at {position}",
                kind = kind.describe(),
                position = self.position
            ),
            None => write!(f, "the end of input"),
        }
    }
}

/// Represents the kind of an unterminated bracketing sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    /// A `{ … }` sequence.
    Brace,
    /// A `[ … ]` sequence.
    Bracket,
    /// A `( … )` sequence.
    Parenthesis,
}

impl fmt::Display for SequenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Brace => "brace",
            Self::Bracket => "bracket",
            Self::Parenthesis => "parenthesis",
        })
    }
}

/// Represents the production a dangling comma was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvContinuationKind {
    /// A comma with no following element.
    DanglingComma,
    /// A comma with no following binding inside a `let` expression.
    LetExpression,
}

/// Represents a parse error.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// An unexpected token was encountered when a single token kind
    /// was expected.
    #[error("expected {expected}, but found {found}", expected = .expected.describe())]
    ExpectedTokenKind {
        /// The expected token kind.
        expected: Token,
        /// Where the error occurred.
        found: TokenLocation,
    },
    /// An unexpected token was encountered when one of several token
    /// kinds was expected.
    #[error("expected {expected}, but found {found}", expected = DescribeAll(.expected))]
    ExpectedAnyTokenKind {
        /// The expected token kinds.
        expected: &'static [Token],
        /// Where the error occurred.
        found: TokenLocation,
    },
    /// A closing token of a bracketing pair was expected.
    #[error("expected {expected} to close {open}, but found {found}", expected = .expected.describe())]
    ExpectedClosingTokenKind {
        /// The expected closing token kind.
        expected: Token,
        /// Where the sequence was opened.
        open: TokenLocation,
        /// Where the error occurred.
        found: TokenLocation,
    },
    /// A bracketing sequence was still open at the end of input.
    #[error("the {kind} opened at {open} is never closed", open = .open.position())]
    UnterminatedSequence {
        /// The kind of the unterminated sequence.
        kind: SequenceKind,
        /// Where the sequence was opened.
        open: TokenLocation,
        /// The position of the end of input.
        end: Position,
    },
    /// Parsing completed but tokens remain.
    #[error("parsing finished before the end of input, starting at {found}")]
    UnusedTokensRemain {
        /// The first unused token.
        found: TokenLocation,
    },
    /// A required parameter was declared after an optional parameter.
    #[error("a required parameter cannot follow an optional parameter")]
    RequiredParameterAfterOptionalParameter {
        /// The offending parameter name.
        found: TokenLocation,
    },
    /// A `catch` clause carried an invalid handler function.
    #[error("a catch handler takes a single untyped parameter and no return type")]
    InvalidCatchFunction {
        /// Where the handler begins.
        found: TokenLocation,
    },
    /// An invalid primitive type name was encountered.
    #[error("`{name}` is not a primitive type", name = .found.text())]
    InvalidPrimitiveType {
        /// The offending name.
        found: TokenLocation,
    },
    /// A comma-separated production ended with a dangling comma.
    #[error("expected an element to follow the comma at {found}")]
    ExpectedCsvContinuation {
        /// The production the comma dangles in.
        kind: CsvContinuationKind,
        /// Where the error occurred.
        found: TokenLocation,
    },
}

impl ParseError {
    /// Gets the location of the error.
    pub fn location(&self) -> &TokenLocation {
        match self {
            Self::ExpectedTokenKind { found, .. }
            | Self::ExpectedAnyTokenKind { found, .. }
            | Self::ExpectedClosingTokenKind { found, .. }
            | Self::UnusedTokensRemain { found }
            | Self::RequiredParameterAfterOptionalParameter { found }
            | Self::InvalidCatchFunction { found }
            | Self::InvalidPrimitiveType { found }
            | Self::ExpectedCsvContinuation { found, .. } => found,
            Self::UnterminatedSequence { open, .. } => open,
        }
    }
}

/// Utility type for displaying a set of expected tokens.
struct DescribeAll<'a>(&'a [Token]);

impl fmt::Display for DescribeAll<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.0.len();
        for (i, token) in self.0.iter().enumerate() {
            if i > 0 {
                if count == 2 {
                    write!(f, " or ")?;
                } else if i == count - 1 {
                    write!(f, ", or ")?;
                } else {
                    write!(f, ", ")?;
                }
            }

            f.write_str(token.describe())?;
        }

        Ok(())
    }
}

/// Represents a contract violation inside the engine.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invariant violated: {message}")]
pub struct InvariantError {
    /// A description of the violated invariant.
    message: String,
    /// An abbreviated rendering of the offending object.
    details: Option<String>,
}

impl InvariantError {
    /// Creates a new invariant error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    /// Attaches an abbreviated rendering of the offending object.
    pub fn with_details(mut self, details: impl fmt::Debug) -> Self {
        let mut rendered = format!("{details:?}");
        rendered.truncate(120);
        self.details = Some(rendered);
        self
    }

    /// Gets the description of the violated invariant.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Gets the abbreviated rendering of the offending object.
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }
}

/// Represents a cooperative cancellation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("the operation was cancelled: {reason}")]
pub struct Cancelled {
    /// The reason the operation was cancelled.
    reason: String,
}

impl Cancelled {
    /// Creates a new cancellation with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Gets the reason the operation was cancelled.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// The error type for parsing operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The input is malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// A contract was violated inside the engine.
    #[error(transparent)]
    Invariant(#[from] InvariantError),
    /// The operation was cancelled.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl Error {
    /// Determines if the error is a parse error.
    ///
    /// Only parse errors may be suppressed by speculative readers.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    /// Gets the error as a parse error, if it is one.
    pub fn as_parse(&self) -> Option<&ParseError> {
        match self {
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}
