//! Module for the lexer implementation.
//!
//! The lexer produces an immutable snapshot of position-annotated
//! tokens that the parser consumes by index. Trivia (whitespace and
//! comments) is excluded from the token sequence; comments are kept in
//! a side list so hosts may re-attach them.

use std::fmt;
use std::sync::Arc;

use line_index::LineIndex;
use logos::Logos;

use crate::span::Position;
use crate::span::Span;

/// Represents a lexer error.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexError {
    /// An unexpected token was encountered.
    #[default]
    #[error("an unexpected token was encountered")]
    UnexpectedToken,
    /// A text literal was not terminated before the end of input.
    #[error("a text literal is missing its closing quote")]
    UnterminatedText,
    /// A quoted identifier was not terminated before the end of input.
    #[error("a quoted identifier is missing its closing quote")]
    UnterminatedQuotedIdentifier,
    /// A block comment was not terminated before the end of input.
    #[error("a block comment is missing its closing delimiter")]
    UnterminatedBlockComment,
}

/// The result type for the lexer.
pub type LexResult<T> = Result<T, LexError>;

/// Represents a token in an M document.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
#[logos(error = LexError)]
pub enum Token {
    /// Contiguous whitespace.
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    /// A line comment.
    #[regex(r"//[^\r\n]*", allow_greedy = true)]
    Comment,

    /// A block comment.
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    BlockComment,

    /// A number literal.
    #[regex(r"0[xX][0-9a-fA-F]+")]
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?")]
    Number,

    /// A text literal.
    #[regex(r#""([^"]|"")*""#)]
    Text,

    /// An identifier, possibly containing dotted segments.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*")]
    Ident,

    /// A quoted identifier (e.g. `#"a name"`).
    #[regex(r##"#"([^"]|"")*""##)]
    QuotedIdent,

    /// The `and` keyword.
    #[token("and")]
    AndKeyword,

    /// The `as` keyword.
    #[token("as")]
    AsKeyword,

    /// The `each` keyword.
    #[token("each")]
    EachKeyword,

    /// The `else` keyword.
    #[token("else")]
    ElseKeyword,

    /// The `error` keyword.
    #[token("error")]
    ErrorKeyword,

    /// The `false` keyword.
    #[token("false")]
    FalseKeyword,

    /// The `if` keyword.
    #[token("if")]
    IfKeyword,

    /// The `in` keyword.
    #[token("in")]
    InKeyword,

    /// The `is` keyword.
    #[token("is")]
    IsKeyword,

    /// The `let` keyword.
    #[token("let")]
    LetKeyword,

    /// The `meta` keyword.
    #[token("meta")]
    MetaKeyword,

    /// The `not` keyword.
    #[token("not")]
    NotKeyword,

    /// The `null` keyword.
    #[token("null")]
    NullKeyword,

    /// The `or` keyword.
    #[token("or")]
    OrKeyword,

    /// The `otherwise` keyword.
    #[token("otherwise")]
    OtherwiseKeyword,

    /// The `section` keyword.
    #[token("section")]
    SectionKeyword,

    /// The `shared` keyword.
    #[token("shared")]
    SharedKeyword,

    /// The `then` keyword.
    #[token("then")]
    ThenKeyword,

    /// The `true` keyword.
    #[token("true")]
    TrueKeyword,

    /// The `try` keyword.
    #[token("try")]
    TryKeyword,

    /// The `type` keyword.
    #[token("type")]
    TypeKeyword,

    /// The `#binary` keyword.
    #[token("#binary")]
    HashBinary,

    /// The `#date` keyword.
    #[token("#date")]
    HashDate,

    /// The `#datetime` keyword.
    #[token("#datetime")]
    HashDateTime,

    /// The `#datetimezone` keyword.
    #[token("#datetimezone")]
    HashDateTimeZone,

    /// The `#duration` keyword.
    #[token("#duration")]
    HashDuration,

    /// The `#infinity` keyword.
    #[token("#infinity")]
    HashInfinity,

    /// The `#nan` keyword.
    #[token("#nan")]
    HashNan,

    /// The `#sections` keyword.
    #[token("#sections")]
    HashSections,

    /// The `#shared` keyword.
    #[token("#shared")]
    HashShared,

    /// The `#table` keyword.
    #[token("#table")]
    HashTable,

    /// The `#time` keyword.
    #[token("#time")]
    HashTime,

    /// The `(` symbol.
    #[token("(")]
    OpenParen,

    /// The `)` symbol.
    #[token(")")]
    CloseParen,

    /// The `{` symbol.
    #[token("{")]
    OpenBrace,

    /// The `}` symbol.
    #[token("}")]
    CloseBrace,

    /// The `[` symbol.
    #[token("[")]
    OpenBracket,

    /// The `]` symbol.
    #[token("]")]
    CloseBracket,

    /// The `,` symbol.
    #[token(",")]
    Comma,

    /// The `;` symbol.
    #[token(";")]
    Semicolon,

    /// The `@` symbol.
    #[token("@")]
    At,

    /// The `?` symbol.
    #[token("?")]
    QuestionMark,

    /// The `??` operator.
    #[token("??")]
    DoubleQuestion,

    /// The `..` operator.
    #[token("..")]
    DotDot,

    /// The `...` symbol.
    #[token("...")]
    Ellipsis,

    /// The `=` symbol.
    #[token("=")]
    Equal,

    /// The `<>` operator.
    #[token("<>")]
    NotEqual,

    /// The `<` operator.
    #[token("<")]
    LessThan,

    /// The `<=` operator.
    #[token("<=")]
    LessThanOrEqualTo,

    /// The `>` operator.
    #[token(">")]
    GreaterThan,

    /// The `>=` operator.
    #[token(">=")]
    GreaterThanOrEqualTo,

    /// The `+` operator.
    #[token("+")]
    Plus,

    /// The `-` operator.
    #[token("-")]
    Minus,

    /// The `*` operator.
    #[token("*")]
    Asterisk,

    /// The `/` operator.
    #[token("/")]
    Slash,

    /// The `&` operator.
    #[token("&")]
    Ampersand,

    /// The `=>` symbol.
    #[token("=>")]
    FatArrow,
}

impl Token {
    /// Determines if the token is trivia that is excluded from the
    /// token snapshot.
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::Whitespace | Self::Comment | Self::BlockComment)
    }

    /// Determines if the token is a reserved keyword.
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            Self::AndKeyword
                | Self::AsKeyword
                | Self::EachKeyword
                | Self::ElseKeyword
                | Self::ErrorKeyword
                | Self::FalseKeyword
                | Self::IfKeyword
                | Self::InKeyword
                | Self::IsKeyword
                | Self::LetKeyword
                | Self::MetaKeyword
                | Self::NotKeyword
                | Self::NullKeyword
                | Self::OrKeyword
                | Self::OtherwiseKeyword
                | Self::SectionKeyword
                | Self::SharedKeyword
                | Self::ThenKeyword
                | Self::TrueKeyword
                | Self::TryKeyword
                | Self::TypeKeyword
        )
    }

    /// Determines if the token is a hash-prefixed keyword (e.g. `#table`).
    pub fn is_hash_keyword(self) -> bool {
        matches!(
            self,
            Self::HashBinary
                | Self::HashDate
                | Self::HashDateTime
                | Self::HashDateTimeZone
                | Self::HashDuration
                | Self::HashInfinity
                | Self::HashNan
                | Self::HashSections
                | Self::HashShared
                | Self::HashTable
                | Self::HashTime
        )
    }

    /// Describes the token for use in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Whitespace => "whitespace",
            Self::Comment | Self::BlockComment => "a comment",
            Self::Number => "a number literal",
            Self::Text => "a text literal",
            Self::Ident => "an identifier",
            Self::QuotedIdent => "a quoted identifier",
            Self::AndKeyword => "the `and` keyword",
            Self::AsKeyword => "the `as` keyword",
            Self::EachKeyword => "the `each` keyword",
            Self::ElseKeyword => "the `else` keyword",
            Self::ErrorKeyword => "the `error` keyword",
            Self::FalseKeyword => "the `false` keyword",
            Self::IfKeyword => "the `if` keyword",
            Self::InKeyword => "the `in` keyword",
            Self::IsKeyword => "the `is` keyword",
            Self::LetKeyword => "the `let` keyword",
            Self::MetaKeyword => "the `meta` keyword",
            Self::NotKeyword => "the `not` keyword",
            Self::NullKeyword => "the `null` keyword",
            Self::OrKeyword => "the `or` keyword",
            Self::OtherwiseKeyword => "the `otherwise` keyword",
            Self::SectionKeyword => "the `section` keyword",
            Self::SharedKeyword => "the `shared` keyword",
            Self::ThenKeyword => "the `then` keyword",
            Self::TrueKeyword => "the `true` keyword",
            Self::TryKeyword => "the `try` keyword",
            Self::TypeKeyword => "the `type` keyword",
            Self::HashBinary => "the `#binary` keyword",
            Self::HashDate => "the `#date` keyword",
            Self::HashDateTime => "the `#datetime` keyword",
            Self::HashDateTimeZone => "the `#datetimezone` keyword",
            Self::HashDuration => "the `#duration` keyword",
            Self::HashInfinity => "the `#infinity` keyword",
            Self::HashNan => "the `#nan` keyword",
            Self::HashSections => "the `#sections` keyword",
            Self::HashShared => "the `#shared` keyword",
            Self::HashTable => "the `#table` keyword",
            Self::HashTime => "the `#time` keyword",
            Self::OpenParen => "`(`",
            Self::CloseParen => "`)`",
            Self::OpenBrace => "`{`",
            Self::CloseBrace => "`}`",
            Self::OpenBracket => "`[`",
            Self::CloseBracket => "`]`",
            Self::Comma => "`,`",
            Self::Semicolon => "`;`",
            Self::At => "`@`",
            Self::QuestionMark => "`?`",
            Self::DoubleQuestion => "`??`",
            Self::DotDot => "`..`",
            Self::Ellipsis => "`...`",
            Self::Equal => "`=`",
            Self::NotEqual => "`<>`",
            Self::LessThan => "`<`",
            Self::LessThanOrEqualTo => "`<=`",
            Self::GreaterThan => "`>`",
            Self::GreaterThanOrEqualTo => "`>=`",
            Self::Plus => "`+`",
            Self::Minus => "`-`",
            Self::Asterisk => "`*`",
            Self::Slash => "`/`",
            Self::Ampersand => "`&`",
            Self::FatArrow => "`=>`",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Implements an M lexer.
///
/// A lexer produces a stream of tokens from an M source string.
#[allow(missing_debug_implementations)]
pub struct Lexer<'a> {
    /// The inner lexer.
    lexer: logos::Lexer<'a, Token>,
    /// The stored peeked result.
    peeked: Option<Option<(LexResult<Token>, Span)>>,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given source string.
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Token::lexer(source),
            peeked: None,
        }
    }

    /// Gets the source string of the given span.
    pub fn source(&self, span: Span) -> &'a str {
        &self.lexer.source()[span.start()..span.end()]
    }

    /// Peeks at the next token without consuming it.
    pub fn peek(&mut self) -> Option<(LexResult<Token>, Span)> {
        if self.peeked.is_none() {
            self.peeked = Some(
                self.lexer
                    .next()
                    .map(|r| (r, Span::from(self.lexer.span()))),
            );
        }

        self.peeked.as_ref().and_then(|p| *p)
    }
}

impl Iterator for Lexer<'_> {
    type Item = (LexResult<Token>, Span);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(peeked) = self.peeked.take() {
            peeked
        } else {
            self.lexer
                .next()
                .map(|r| (r, Span::from(self.lexer.span())))
        }
    }
}

/// Represents a token in a lexed snapshot along with its source
/// positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexToken {
    /// The kind of the token.
    kind: Token,
    /// The byte span of the token.
    span: Span,
    /// The position of the first code unit of the token.
    start: Position,
    /// The position one past the last code unit of the token.
    end: Position,
}

impl LexToken {
    /// Gets the kind of the token.
    pub fn kind(&self) -> Token {
        self.kind
    }

    /// Gets the byte span of the token.
    pub fn span(&self) -> Span {
        self.span
    }

    /// Gets the start position of the token.
    pub fn start(&self) -> Position {
        self.start
    }

    /// Gets the end position of the token.
    pub fn end(&self) -> Position {
        self.end
    }
}

/// Represents a comment attached to a lexed snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comment {
    /// The byte span of the comment.
    span: Span,
    /// The start position of the comment.
    start: Position,
}

impl Comment {
    /// Gets the byte span of the comment.
    pub fn span(&self) -> Span {
        self.span
    }

    /// Gets the start position of the comment.
    pub fn start(&self) -> Position {
        self.start
    }
}

/// Represents a lexer failure along with the location of the
/// offending source.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{error} at {position}")]
pub struct LexFailure {
    /// The lexer error that occurred.
    error: LexError,
    /// The byte span where the error occurred.
    span: Span,
    /// The position where the error occurred.
    position: Position,
}

impl LexFailure {
    /// Gets the lexer error that occurred.
    pub fn error(&self) -> LexError {
        self.error
    }

    /// Gets the byte span where the error occurred.
    pub fn span(&self) -> Span {
        self.span
    }

    /// Gets the position where the error occurred.
    pub fn position(&self) -> Position {
        self.position
    }
}

/// The three-state outcome of lexing a document.
///
/// A `Mixed` outcome carries both the snapshot of everything that did
/// lex and the first error encountered, so a parse may still proceed
/// over the prefix.
#[derive(Debug, Clone)]
pub enum LexPartial<T> {
    /// The input lexed without error.
    Ok {
        /// The lexed value.
        value: T,
    },
    /// The input lexed partially.
    Mixed {
        /// The lexed value for the portion of input that was valid.
        value: T,
        /// The first error encountered.
        error: LexFailure,
    },
    /// The input did not lex at all.
    Error {
        /// The error encountered.
        error: LexFailure,
    },
}

impl<T> LexPartial<T> {
    /// Gets the lexed value, if any portion of the input lexed.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Ok { value } | Self::Mixed { value, .. } => Some(value),
            Self::Error { .. } => None,
        }
    }

    /// Gets the error, if any portion of the input failed to lex.
    pub fn error(&self) -> Option<&LexFailure> {
        match self {
            Self::Ok { .. } => None,
            Self::Mixed { error, .. } | Self::Error { error } => Some(error),
        }
    }

    /// Converts the outcome into a result, treating `Mixed` as success.
    pub fn into_result(self) -> Result<T, LexFailure> {
        match self {
            Self::Ok { value } | Self::Mixed { value, .. } => Ok(value),
            Self::Error { error } => Err(error),
        }
    }
}

/// An immutable snapshot of a lexed document.
///
/// The snapshot is the parser's only view of the source: tokens are
/// addressed by index and carry their positions, so the parser never
/// touches the source text directly.
#[derive(Debug, Clone)]
pub struct LexSnapshot {
    /// The source text that was lexed.
    source: Arc<str>,
    /// The non-trivia tokens of the document.
    tokens: Vec<LexToken>,
    /// The comments of the document.
    comments: Vec<Comment>,
    /// The position one past the last code unit of the source.
    end_position: Position,
}

impl LexSnapshot {
    /// Gets the number of tokens in the snapshot.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Determines if the snapshot has no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Gets a token by index.
    pub fn get(&self, index: usize) -> Option<&LexToken> {
        self.tokens.get(index)
    }

    /// Gets the tokens of the snapshot.
    pub fn tokens(&self) -> &[LexToken] {
        &self.tokens
    }

    /// Gets the source text of the snapshot.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Gets the text of the given token.
    pub fn text(&self, token: &LexToken) -> &str {
        &self.source[token.span.start()..token.span.end()]
    }

    /// Gets the text of the token at the given index.
    ///
    /// Returns an empty string if the index is out of bounds.
    pub fn text_at(&self, index: usize) -> &str {
        self.get(index).map(|t| self.text(t)).unwrap_or("")
    }

    /// Gets the comments of the snapshot.
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Gets the position one past the last code unit of the source.
    pub fn end_position(&self) -> Position {
        self.end_position
    }
}

/// Converts a byte offset into a position using the given line index.
fn position_at(index: &LineIndex, offset: usize) -> Position {
    let line_col = index.line_col((offset as u32).into());
    Position::new(line_col.line, line_col.col, offset as u32)
}

/// Classifies a lexer error by looking at the offending source text.
fn classify_error(error: LexError, text: &str) -> LexError {
    match error {
        LexError::UnexpectedToken if text.starts_with("#\"") => {
            LexError::UnterminatedQuotedIdentifier
        }
        LexError::UnexpectedToken if text.starts_with('"') => LexError::UnterminatedText,
        LexError::UnexpectedToken if text.starts_with("/*") => LexError::UnterminatedBlockComment,
        other => other,
    }
}

/// Lexes the given source into a token snapshot.
///
/// Returns `Mixed` when any portion of the input failed to lex and
/// `Error` when nothing lexed at all.
pub fn lex(source: &str) -> LexPartial<LexSnapshot> {
    let index = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut comments = Vec::new();
    let mut first_error = None;

    for (result, span) in Lexer::new(source) {
        match result {
            Ok(kind) if kind.is_trivia() => {
                if matches!(kind, Token::Comment | Token::BlockComment) {
                    comments.push(Comment {
                        span,
                        start: position_at(&index, span.start()),
                    });
                }
            }
            Ok(kind) => {
                tokens.push(LexToken {
                    kind,
                    span,
                    start: position_at(&index, span.start()),
                    end: position_at(&index, span.end()),
                });
            }
            Err(error) => {
                if first_error.is_none() {
                    let text = &source[span.start()..span.end()];
                    first_error = Some(LexFailure {
                        error: classify_error(error, text),
                        span,
                        position: position_at(&index, span.start()),
                    });
                }
            }
        }
    }

    let snapshot = LexSnapshot {
        source: source.into(),
        tokens,
        comments,
        end_position: position_at(&index, source.len()),
    };

    match first_error {
        None => LexPartial::Ok { value: snapshot },
        Some(error) if snapshot.tokens.is_empty() => LexPartial::Error { error },
        Some(error) => LexPartial::Mixed {
            value: snapshot,
            error,
        },
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Lexes the source and returns the token kinds and spans.
    fn kinds(source: &str) -> Vec<(Token, std::ops::Range<usize>)> {
        let snapshot = lex(source).into_result().expect("source should lex");
        snapshot
            .tokens()
            .iter()
            .map(|t| (t.kind(), t.span().start()..t.span().end()))
            .collect()
    }

    #[test]
    fn empty_input() {
        let snapshot = lex("").into_result().expect("empty source should lex");
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.end_position(), Position::new(0, 0, 0));
    }

    #[test]
    fn keywords_and_identifiers() {
        use Token::*;
        assert_eq!(
            kinds("let letter = Text.From in letter"),
            &[
                (LetKeyword, 0..3),
                (Ident, 4..10),
                (Equal, 11..12),
                (Ident, 13..22),
                (InKeyword, 23..25),
                (Ident, 26..32),
            ],
        );
    }

    #[test]
    fn numbers() {
        use Token::*;
        assert_eq!(
            kinds("1 1.5 .5 1e3 1.5e-2 0xFF"),
            &[
                (Number, 0..1),
                (Number, 2..5),
                (Number, 6..8),
                (Number, 9..12),
                (Number, 13..19),
                (Number, 20..24),
            ],
        );
    }

    #[test]
    fn range_operator_is_not_a_number() {
        use Token::*;
        assert_eq!(
            kinds("{1..10}"),
            &[
                (OpenBrace, 0..1),
                (Number, 1..2),
                (DotDot, 2..4),
                (Number, 4..6),
                (CloseBrace, 6..7),
            ],
        );
    }

    #[test]
    fn text_with_escaped_quotes() {
        use Token::*;
        assert_eq!(kinds(r#""a""b""#), &[(Text, 0..6)]);
        assert_eq!(
            kinds(r#""a" & "b""#),
            &[(Text, 0..3), (Ampersand, 4..5), (Text, 6..9)],
        );
    }

    #[test]
    fn quoted_identifier() {
        use Token::*;
        assert_eq!(kinds(r#"#"a name""#), &[(QuotedIdent, 0..9)]);
    }

    #[test]
    fn hash_keywords() {
        use Token::*;
        assert_eq!(
            kinds("#date #datetime #datetimezone"),
            &[(HashDate, 0..5), (HashDateTime, 6..15), (HashDateTimeZone, 16..29)],
        );
    }

    #[test]
    fn operators() {
        use Token::*;
        assert_eq!(
            kinds("= => <> <= >= ?? ?"),
            &[
                (Equal, 0..1),
                (FatArrow, 2..4),
                (NotEqual, 5..7),
                (LessThanOrEqualTo, 8..10),
                (GreaterThanOrEqualTo, 11..13),
                (DoubleQuestion, 14..16),
                (QuestionMark, 17..18),
            ],
        );
    }

    #[test]
    fn comments_are_collected() {
        let snapshot = lex("1 // trailing\n/* block */ 2")
            .into_result()
            .expect("source should lex");
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.comments().len(), 2);
        assert_eq!(snapshot.comments()[0].span(), Span::new(2, 11));
    }

    #[test]
    fn positions_track_lines() {
        let snapshot = lex("1\n  2").into_result().expect("source should lex");
        let second = snapshot.get(1).expect("should have a second token");
        assert_eq!(second.start(), Position::new(1, 2, 4));
        assert_eq!(second.end(), Position::new(1, 3, 5));
    }

    #[test]
    fn unterminated_text_is_mixed() {
        let partial = lex(r#"let x = "abc"#);
        let error = partial.error().expect("should have an error");
        assert_eq!(error.error(), LexError::UnterminatedText);

        // The tokens before the unterminated literal still lex.
        let snapshot = partial.value().expect("should have a snapshot");
        assert!(snapshot.len() >= 3);
        assert_eq!(snapshot.get(0).map(|t| t.kind()), Some(Token::LetKeyword));
        assert_eq!(snapshot.get(2).map(|t| t.kind()), Some(Token::Equal));
    }
}
