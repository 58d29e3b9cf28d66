//! The recursive descent readers for every grammar production.
//!
//! Each reader has the uniform shape: open a context for the
//! production, read children in order (dispatching through the
//! [Parser] reader set so behavior is overridable), then promote the
//! context to a parsed node. A reader that fails leaves its context
//! open, pinned at the failing position, so the partial tree remains
//! inspectable.

use crate::error::CsvContinuationKind;
use crate::error::Error;
use crate::error::ParseError;
use crate::error::SequenceKind;
use crate::lexer::Token;
use crate::node::BinaryOperator;
use crate::node::ConstantKind;
use crate::node::LiteralKind;
use crate::node::NodeId;
use crate::node::NodeKind;
use crate::node::NodePayload;
use crate::node::UnaryOperator;
use crate::parser::Parser;
use crate::state::DisambiguationBehavior;
use crate::state::ParserState;

/// The token kinds that may begin an expression.
const EXPRESSION_START: &[Token] = &[
    Token::Ident,
    Token::QuotedIdent,
    Token::Number,
    Token::Text,
    Token::TrueKeyword,
    Token::FalseKeyword,
    Token::NullKeyword,
    Token::EachKeyword,
    Token::LetKeyword,
    Token::IfKeyword,
    Token::ErrorKeyword,
    Token::TryKeyword,
    Token::NotKeyword,
    Token::TypeKeyword,
    Token::HashBinary,
    Token::HashDate,
    Token::HashDateTime,
    Token::HashDateTimeZone,
    Token::HashDuration,
    Token::HashInfinity,
    Token::HashNan,
    Token::HashSections,
    Token::HashShared,
    Token::HashTable,
    Token::HashTime,
    Token::OpenParen,
    Token::OpenBrace,
    Token::OpenBracket,
    Token::At,
    Token::Plus,
    Token::Minus,
    Token::Ellipsis,
];

/// Determines if a token kind may begin an expression.
fn is_expression_start(token: Option<Token>) -> bool {
    token.map(|t| EXPRESSION_START.contains(&t)).unwrap_or(false)
}

/// Gets the binary operator for a token kind, if the token is one.
fn binary_operator_from_token(token: Token) -> Option<BinaryOperator> {
    match token {
        Token::Asterisk => Some(BinaryOperator::Multiplication),
        Token::Slash => Some(BinaryOperator::Division),
        Token::Plus => Some(BinaryOperator::Addition),
        Token::Minus => Some(BinaryOperator::Subtraction),
        Token::Ampersand => Some(BinaryOperator::Concatenation),
        Token::Equal => Some(BinaryOperator::Equal),
        Token::NotEqual => Some(BinaryOperator::NotEqual),
        Token::LessThan => Some(BinaryOperator::LessThan),
        Token::LessThanOrEqualTo => Some(BinaryOperator::LessThanOrEqualTo),
        Token::GreaterThan => Some(BinaryOperator::GreaterThan),
        Token::GreaterThanOrEqualTo => Some(BinaryOperator::GreaterThanOrEqualTo),
        Token::AndKeyword => Some(BinaryOperator::And),
        Token::OrKeyword => Some(BinaryOperator::Or),
        Token::IsKeyword => Some(BinaryOperator::Is),
        Token::AsKeyword => Some(BinaryOperator::As),
        Token::MetaKeyword => Some(BinaryOperator::Meta),
        Token::DoubleQuestion => Some(BinaryOperator::NullCoalescing),
        _ => None,
    }
}

/// Determines if the next token is a given contextual keyword, which
/// the lexer surfaces as a plain identifier.
fn is_contextual(state: &ParserState<'_>, keyword: &str) -> bool {
    state.is_on(Token::Ident) && state.peek_text() == keyword
}

/// Reads the next token as a contextual keyword constant.
fn read_contextual_constant(
    state: &mut ParserState<'_>,
    keyword: &'static str,
    constant: ConstantKind,
) -> Result<NodeId, Error> {
    if !is_contextual(state, keyword) {
        return Err(state.expected_token_error(Token::Ident));
    }

    state.add_leaf_spanning(NodeKind::Constant, NodePayload::Constant(constant), 1)
}

/// Wraps an already-read node in a new context that adopts it as its
/// first child.
///
/// Suffix productions (access chains, ranges) discover their head
/// after it has been read; the new context takes over the head's slot
/// in its parent and covers the head's tokens.
fn wrap_in_context(
    state: &mut ParserState<'_>,
    kind: NodeKind,
    first_child: NodeId,
) -> Result<NodeId, Error> {
    let parent = state.current_context_id();
    let attribute_index = state
        .store()
        .attribute_index_of(first_child)
        .unwrap_or(0);
    let token_start = state
        .store()
        .ast(first_child)
        .map(|node| node.token_range().start())
        .unwrap_or(state.token_index() as u32);

    state.store_mut().detach_child(first_child);
    if let Some(parent) = parent {
        state
            .store_mut()
            .set_context_attribute_counter(parent, attribute_index);
    }

    let id = state.start_context_at(kind, token_start)?;
    state.store_mut().attach_child(id, first_child, 0);
    state.store_mut().set_context_attribute_counter(id, 1);
    if parent.is_none() {
        state.store_mut().set_root(id);
    }

    Ok(id)
}

/// Reads a comma-separated run of elements, each wrapped in a csv
/// node.
///
/// The caller is responsible for deciding the run is non-empty. After
/// a comma, a token that cannot begin another element raises
/// [ExpectedCsvContinuation][ParseError::ExpectedCsvContinuation],
/// leaving the freshly opened csv context in the tree.
fn read_csv_elements(
    state: &mut ParserState<'_>,
    parser: &Parser,
    continuation: CsvContinuationKind,
    is_element_start: fn(&ParserState<'_>) -> bool,
    element: fn(&mut ParserState<'_>, &Parser) -> Result<NodeId, Error>,
) -> Result<(), Error> {
    loop {
        state.throw_if_cancelled()?;
        state.start_context(NodeKind::Csv)?;
        if !is_element_start(state) {
            return Err(Error::Parse(ParseError::ExpectedCsvContinuation {
                kind: continuation,
                found: state.location(),
            }));
        }

        element(state, parser)?;
        let comma = state.maybe_read_token_as_constant(Token::Comma, ConstantKind::Comma)?;
        state.finish_context(NodePayload::None)?;
        if comma.is_none() {
            return Ok(());
        }
    }
}

/// Reads the closing token of a bracketing pair opened at
/// `open_index`.
fn read_close_wrapper(
    state: &mut ParserState<'_>,
    open_index: usize,
    token: Token,
    constant: ConstantKind,
    sequence: SequenceKind,
) -> Result<NodeId, Error> {
    if state.at_end() {
        return Err(Error::Parse(ParseError::UnterminatedSequence {
            kind: sequence,
            open: state.location_at(open_index),
            end: state.end_position(),
        }));
    }

    if !state.is_on(token) {
        return Err(Error::Parse(ParseError::ExpectedClosingTokenKind {
            expected: token,
            open: state.location_at(open_index),
            found: state.location(),
        }));
    }

    state.read_token_as_constant(token, constant)
}

/// Raises an unterminated sequence error when the input ends inside a
/// wrapped production before any content was read.
fn require_content(
    state: &ParserState<'_>,
    open_index: usize,
    sequence: SequenceKind,
) -> Result<(), Error> {
    if state.at_end() {
        return Err(Error::Parse(ParseError::UnterminatedSequence {
            kind: sequence,
            open: state.location_at(open_index),
            end: state.end_position(),
        }));
    }

    Ok(())
}

/// Reads any expression.
pub fn read_expression(state: &mut ParserState<'_>, parser: &Parser) -> Result<NodeId, Error> {
    state.throw_if_cancelled()?;
    match state.peek_kind() {
        Some(Token::EachKeyword) => (parser.read_each_expression)(state, parser),
        Some(Token::LetKeyword) => (parser.read_let_expression)(state, parser),
        Some(Token::IfKeyword) => (parser.read_if_expression)(state, parser),
        Some(Token::ErrorKeyword) => (parser.read_error_raising_expression)(state, parser),
        Some(Token::TryKeyword) => (parser.read_error_handling_expression)(state, parser),
        Some(Token::OpenParen) => disambiguate_parenthesis(state, parser),
        _ => (parser.read_binary_expression)(state, parser),
    }
}

/// Decides between a function expression and a parenthesized
/// expression at an `(` prefix.
fn disambiguate_parenthesis(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    match state.disambiguation_behavior() {
        DisambiguationBehavior::Strict => {
            if parenthesis_starts_function(state) {
                (parser.read_function_expression)(state, parser)
            } else {
                (parser.read_binary_expression)(state, parser)
            }
        }
        DisambiguationBehavior::Thorough => speculate_deeper(
            state,
            parser,
            parser.read_function_expression,
            parser.read_binary_expression,
        ),
    }
}

/// Tries two interpretations of an ambiguous prefix, keeping the
/// deeper parse.
///
/// The first interpretation wins outright on success and wins ties on
/// failure; when both fail, the shallower attempt is rolled back and
/// the deeper attempt is replayed so its contexts remain in the tree.
/// Only parse errors trigger the fallback; invariant and cancellation
/// errors propagate unchanged.
fn speculate_deeper(
    state: &mut ParserState<'_>,
    parser: &Parser,
    first: crate::parser::ReadFn,
    second: crate::parser::ReadFn,
) -> Result<NodeId, Error> {
    let checkpoint = state.checkpoint();
    let first_error = match first(state, parser) {
        Ok(id) => return Ok(id),
        Err(error) if error.is_parse() => error,
        Err(error) => return Err(error),
    };

    let first_consumed = state.token_index();
    state.restore(&checkpoint);

    let second_error = match second(state, parser) {
        Ok(id) => return Ok(id),
        Err(error) if error.is_parse() => error,
        Err(error) => return Err(error),
    };

    if state.token_index() > first_consumed {
        return Err(second_error);
    }

    // The first attempt went at least as deep; replay it so its
    // contexts are the ones left pinned in the tree.
    state.restore(&checkpoint);
    match first(state, parser) {
        Ok(_) => Err(first_error),
        Err(error) => Err(error),
    }
}

/// Scans ahead from an `(` to decide if it starts a function
/// expression: the token after the matching `)` must be `=>` or `as`.
fn parenthesis_starts_function(state: &ParserState<'_>) -> bool {
    let mut depth = 0usize;
    let mut offset = 0usize;
    loop {
        match state.peek_at(offset).map(|t| t.kind()) {
            Some(Token::OpenParen) => depth += 1,
            Some(Token::CloseParen) => {
                depth -= 1;
                if depth == 0 {
                    return matches!(
                        state.peek_at(offset + 1).map(|t| t.kind()),
                        Some(Token::FatArrow) | Some(Token::AsKeyword)
                    );
                }
            }
            Some(_) => {}
            None => return false,
        }

        offset += 1;
    }
}

/// The bracketed form an `[` prefix may begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BracketForm {
    /// A record expression.
    Record,
    /// A field selector with an implicit target.
    FieldSelector,
    /// A field projection with an implicit target.
    FieldProjection,
}

/// Scans ahead from an `[` to decide which bracketed form it begins.
fn classify_bracket(state: &ParserState<'_>) -> BracketForm {
    match state.peek_at(1).map(|t| t.kind()) {
        Some(Token::OpenBracket) => return BracketForm::FieldProjection,
        Some(Token::CloseBracket) => return BracketForm::Record,
        _ => {}
    }

    let mut offset = 1usize;
    loop {
        match state.peek_at(offset).map(|t| t.kind()) {
            Some(Token::Equal) => return BracketForm::Record,
            Some(Token::CloseBracket) | None => return BracketForm::FieldSelector,
            Some(_) => offset += 1,
        }
    }
}

/// Decides between a record expression and an implicit-target field
/// access at an `[` prefix.
fn disambiguate_bracket(state: &mut ParserState<'_>, parser: &Parser) -> Result<NodeId, Error> {
    match state.disambiguation_behavior() {
        DisambiguationBehavior::Strict => match classify_bracket(state) {
            BracketForm::Record => (parser.read_record_expression)(state, parser),
            BracketForm::FieldSelector => (parser.read_field_selector)(state, parser),
            BracketForm::FieldProjection => (parser.read_field_projection)(state, parser),
        },
        DisambiguationBehavior::Thorough => {
            let accessor = match state.peek_at(1).map(|t| t.kind()) {
                Some(Token::OpenBracket) => parser.read_field_projection,
                _ => parser.read_field_selector,
            };
            speculate_deeper(state, parser, parser.read_record_expression, accessor)
        }
    }
}

/// Reads a chain of binary operators iteratively.
///
/// Operands and operator constants are collected first; the interior
/// expression nodes are then built by precedence, leftmost first
/// within a level, so arbitrarily long chains never recurse.
pub fn read_binary_expression(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    state.throw_if_cancelled()?;
    let first = (parser.read_unary_expression)(state, parser)?;

    let mut operands = vec![first];
    let mut operators: Vec<(BinaryOperator, NodeId)> = Vec::new();
    while let Some(operator) = state.peek_kind().and_then(binary_operator_from_token) {
        state.throw_if_cancelled()?;
        let constant = state.add_leaf_spanning(
            NodeKind::Constant,
            NodePayload::Constant(ConstantKind::Operator(operator)),
            1,
        )?;
        let operand = match operator {
            BinaryOperator::Is | BinaryOperator::As => {
                read_nullable_primitive_type(state, parser)?
            }
            _ => (parser.read_unary_expression)(state, parser)?,
        };
        operators.push((operator, constant));
        operands.push(operand);
    }

    if operators.is_empty() {
        return Ok(first);
    }

    combine_binary_chain(state, operands, operators)
}

/// Builds the interior nodes of a collected operator chain.
fn combine_binary_chain(
    state: &mut ParserState<'_>,
    mut operands: Vec<NodeId>,
    mut operators: Vec<(BinaryOperator, NodeId)>,
) -> Result<NodeId, Error> {
    let parent = state.current_context_id();
    let slot = state
        .store()
        .attribute_index_of(operands[0])
        .unwrap_or(0);

    for id in operands
        .iter()
        .chain(operators.iter().map(|(_, constant)| constant))
    {
        state.store_mut().detach_child(*id);
    }

    while !operators.is_empty() {
        let mut best = 0;
        for index in 1..operators.len() {
            if operators[index].0.precedence() > operators[best].0.precedence() {
                best = index;
            }
        }

        let (operator, constant) = operators.remove(best);
        let left = operands[best];
        let right = operands[best + 1];
        let left_range = state
            .store()
            .ast(left)
            .ok_or_else(|| {
                crate::error::InvariantError::new("operand should be a parsed node")
            })?
            .token_range();
        let right_range = state
            .store()
            .ast(right)
            .ok_or_else(|| {
                crate::error::InvariantError::new("operand should be a parsed node")
            })?
            .token_range();
        let range = crate::node::TokenRange::new(
            left_range.start(),
            right_range.end(),
            left_range.position_start(),
            right_range.position_end(),
        );

        let node = state.store_mut().insert_ast_node(
            operator.node_kind(),
            range,
            NodePayload::Operator(operator),
        );
        state.store_mut().attach_child(node, left, 0);
        state.store_mut().attach_child(node, constant, 1);
        state.store_mut().attach_child(node, right, 2);
        operands[best] = node;
        operands.remove(best + 1);
    }

    let result = operands[0];
    match parent {
        Some(parent) => {
            state.store_mut().attach_child(parent, result, slot);
            state
                .store_mut()
                .set_context_attribute_counter(parent, slot + 1);
        }
        None => state.store_mut().set_root(result),
    }

    Ok(result)
}

/// Reads a unary expression (`+ - not` prefixes) or falls through to
/// a type expression.
pub fn read_unary_expression(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    if !matches!(
        state.peek_kind(),
        Some(Token::Plus) | Some(Token::Minus) | Some(Token::NotKeyword)
    ) {
        return (parser.read_type_expression)(state, parser);
    }

    state.start_context(NodeKind::UnaryExpression)?;
    loop {
        let next = match state.peek_kind() {
            Some(Token::Plus) => Some(UnaryOperator::Positive),
            Some(Token::Minus) => Some(UnaryOperator::Negative),
            Some(Token::NotKeyword) => Some(UnaryOperator::Not),
            _ => None,
        };
        let Some(op) = next else {
            break;
        };
        state.add_leaf_spanning(
            NodeKind::Constant,
            NodePayload::Constant(ConstantKind::UnaryOperator(op)),
            1,
        )?;
    }

    (parser.read_type_expression)(state, parser)?;
    state.finish_context(NodePayload::None)
}

/// Reads a type expression (`type …`) or falls through to a primary
/// expression.
pub fn read_type_expression(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    if !state.is_on(Token::TypeKeyword) {
        return (parser.read_primary_expression)(state, parser);
    }

    state.start_context(NodeKind::TypePrimaryType)?;
    state.read_token_as_constant(Token::TypeKeyword, ConstantKind::Type)?;
    read_primary_type(state, parser)?;
    state.finish_context(NodePayload::None)
}

/// Reads a primary expression and any access or invocation suffixes.
pub fn read_primary_expression(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    state.throw_if_cancelled()?;
    let head = match state.peek_kind() {
        Some(Token::Number)
        | Some(Token::Text)
        | Some(Token::TrueKeyword)
        | Some(Token::FalseKeyword)
        | Some(Token::NullKeyword)
        | Some(Token::HashInfinity)
        | Some(Token::HashNan) => (parser.read_literal_expression)(state, parser)?,
        Some(Token::Ident)
        | Some(Token::QuotedIdent)
        | Some(Token::At)
        | Some(Token::HashBinary)
        | Some(Token::HashDate)
        | Some(Token::HashDateTime)
        | Some(Token::HashDateTimeZone)
        | Some(Token::HashDuration)
        | Some(Token::HashSections)
        | Some(Token::HashShared)
        | Some(Token::HashTable)
        | Some(Token::HashTime) => (parser.read_identifier_expression)(state, parser)?,
        Some(Token::OpenParen) => (parser.read_parenthesized_expression)(state, parser)?,
        Some(Token::OpenBrace) => (parser.read_list_expression)(state, parser)?,
        Some(Token::OpenBracket) => disambiguate_bracket(state, parser)?,
        Some(Token::Ellipsis) => (parser.read_not_implemented_expression)(state, parser)?,
        _ => return Err(state.expected_any_token_error(EXPRESSION_START)),
    };

    match state.peek_kind() {
        Some(Token::OpenParen) | Some(Token::OpenBrace) | Some(Token::OpenBracket) => {
            (parser.read_recursive_primary_expression)(state, parser, head)
        }
        _ => Ok(head),
    }
}

/// Reads the access and invocation suffixes of a primary expression,
/// wrapping the head.
pub fn read_recursive_primary_expression(
    state: &mut ParserState<'_>,
    parser: &Parser,
    head: NodeId,
) -> Result<NodeId, Error> {
    let id = wrap_in_context(state, NodeKind::RecursivePrimaryExpression, head)?;
    loop {
        state.throw_if_cancelled()?;
        match state.peek_kind() {
            Some(Token::OpenParen) => (parser.read_invoke_expression)(state, parser)?,
            Some(Token::OpenBrace) => (parser.read_item_access_expression)(state, parser)?,
            Some(Token::OpenBracket) => match state.peek_at(1).map(|t| t.kind()) {
                Some(Token::OpenBracket) => (parser.read_field_projection)(state, parser)?,
                _ => (parser.read_field_selector)(state, parser)?,
            },
            _ => break,
        };
    }

    debug_assert_eq!(state.current_context_id(), Some(id));
    state.finish_context(NodePayload::None)
}

/// Reads a literal expression terminal.
pub fn read_literal_expression(
    state: &mut ParserState<'_>,
    _parser: &Parser,
) -> Result<NodeId, Error> {
    let kind = match state.peek_kind() {
        Some(Token::Number) | Some(Token::HashInfinity) | Some(Token::HashNan) => {
            LiteralKind::Numeric
        }
        Some(Token::Text) => LiteralKind::Text,
        Some(Token::TrueKeyword) | Some(Token::FalseKeyword) => LiteralKind::Logical,
        Some(Token::NullKeyword) => LiteralKind::Null,
        _ => {
            return Err(state.expected_any_token_error(&[
                Token::Number,
                Token::Text,
                Token::TrueKeyword,
                Token::FalseKeyword,
                Token::NullKeyword,
            ]))
        }
    };

    let text = state.peek_text().to_string();
    state.add_leaf_spanning(
        NodeKind::LiteralExpression,
        NodePayload::Literal { kind, text },
        1,
    )
}

/// Reads an identifier expression, optionally `@`-prefixed.
pub fn read_identifier_expression(
    state: &mut ParserState<'_>,
    _parser: &Parser,
) -> Result<NodeId, Error> {
    state.start_context(NodeKind::IdentifierExpression)?;
    state.maybe_read_token_as_constant(Token::At, ConstantKind::At)?;

    let kind = state.peek_kind();
    let acceptable = matches!(kind, Some(Token::Ident) | Some(Token::QuotedIdent))
        || kind.map(|k| k.is_hash_keyword()).unwrap_or(false);
    if !acceptable {
        return Err(state.expected_any_token_error(&[Token::Ident, Token::QuotedIdent]));
    }

    let text = state.peek_text().to_string();
    state.add_leaf_spanning(NodeKind::Identifier, NodePayload::Identifier { text }, 1)?;
    state.finish_context(NodePayload::None)
}

/// Reads a parenthesized expression.
pub fn read_parenthesized_expression(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    let open_index = state.token_index();
    state.start_context(NodeKind::ParenthesizedExpression)?;
    state.read_token_as_constant(Token::OpenParen, ConstantKind::OpenParen)?;
    require_content(state, open_index, SequenceKind::Parenthesis)?;
    (parser.read_expression)(state, parser)?;
    read_close_wrapper(
        state,
        open_index,
        Token::CloseParen,
        ConstantKind::CloseParen,
        SequenceKind::Parenthesis,
    )?;
    state.finish_context(NodePayload::None)
}

/// Reads a not-implemented expression (`…`).
pub fn read_not_implemented_expression(
    state: &mut ParserState<'_>,
    _parser: &Parser,
) -> Result<NodeId, Error> {
    state.start_context(NodeKind::NotImplementedExpression)?;
    state.read_token_as_constant(Token::Ellipsis, ConstantKind::Ellipsis)?;
    state.finish_context(NodePayload::None)
}

/// Reads a list expression, including range items.
pub fn read_list_expression(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    let open_index = state.token_index();
    state.start_context(NodeKind::ListExpression)?;
    state.read_token_as_constant(Token::OpenBrace, ConstantKind::OpenBrace)?;

    if !state.is_on(Token::CloseBrace) {
        require_content(state, open_index, SequenceKind::Brace)?;
        read_csv_elements(
            state,
            parser,
            CsvContinuationKind::DanglingComma,
            |state| is_expression_start(state.peek_kind()),
            read_list_item,
        )?;
    }

    read_close_wrapper(
        state,
        open_index,
        Token::CloseBrace,
        ConstantKind::CloseBrace,
        SequenceKind::Brace,
    )?;
    state.finish_context(NodePayload::None)
}

/// Reads a list item: an expression, or a range of two expressions.
fn read_list_item(state: &mut ParserState<'_>, parser: &Parser) -> Result<NodeId, Error> {
    let first = (parser.read_expression)(state, parser)?;
    if !state.is_on(Token::DotDot) {
        return Ok(first);
    }

    let id = wrap_in_context(state, NodeKind::RangeExpression, first)?;
    state.read_token_as_constant(Token::DotDot, ConstantKind::DotDot)?;
    (parser.read_expression)(state, parser)?;
    debug_assert_eq!(state.current_context_id(), Some(id));
    state.finish_context(NodePayload::None)
}

/// Reads a record expression.
pub fn read_record_expression(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    let open_index = state.token_index();
    state.start_context(NodeKind::RecordExpression)?;
    state.read_token_as_constant(Token::OpenBracket, ConstantKind::OpenBracket)?;

    if !state.is_on(Token::CloseBracket) {
        require_content(state, open_index, SequenceKind::Bracket)?;
        read_csv_elements(
            state,
            parser,
            CsvContinuationKind::DanglingComma,
            is_generalized_identifier_start,
            read_generalized_identifier_paired_expression,
        )?;
    }

    read_close_wrapper(
        state,
        open_index,
        Token::CloseBracket,
        ConstantKind::CloseBracket,
        SequenceKind::Bracket,
    )?;
    state.finish_context(NodePayload::None)
}

/// Determines if a token may begin a generalized identifier.
fn is_generalized_identifier_start(state: &ParserState<'_>) -> bool {
    match state.peek_kind() {
        Some(Token::Ident) | Some(Token::QuotedIdent) | Some(Token::Number) => true,
        Some(kind) => kind.is_keyword(),
        None => false,
    }
}

/// Determines if a token may continue a multi-token generalized
/// identifier.
fn is_generalized_identifier_segment(token: Token) -> bool {
    matches!(token, Token::Ident | Token::Number) || token.is_keyword()
}

/// Reads a generalized identifier terminal.
///
/// A quoted identifier stands alone; otherwise adjacent identifier,
/// keyword, and number tokens merge into one name, spaces included,
/// exactly as written in the source.
fn read_generalized_identifier(state: &mut ParserState<'_>) -> Result<NodeId, Error> {
    if state.is_on(Token::QuotedIdent) {
        let text = state.peek_text().to_string();
        return state.add_leaf_spanning(
            NodeKind::GeneralizedIdentifier,
            NodePayload::GeneralizedIdentifier { text },
            1,
        );
    }

    let mut count = 0usize;
    while let Some(token) = state.peek_at(count) {
        if !is_generalized_identifier_segment(token.kind()) {
            break;
        }

        count += 1;
    }

    if count == 0 {
        return Err(state.expected_any_token_error(&[Token::Ident, Token::QuotedIdent]));
    }

    let first = state.peek().expect("should have a first token");
    let last = state
        .peek_at(count - 1)
        .expect("should have a last token");
    let text =
        state.snapshot().source()[first.span().start()..last.span().end()].to_string();
    state.add_leaf_spanning(
        NodeKind::GeneralizedIdentifier,
        NodePayload::GeneralizedIdentifier { text },
        count,
    )
}

/// Reads a generalized identifier paired with an expression.
fn read_generalized_identifier_paired_expression(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    state.start_context(NodeKind::GeneralizedIdentifierPairedExpression)?;
    read_generalized_identifier(state)?;
    state.read_token_as_constant(Token::Equal, ConstantKind::Equal)?;
    (parser.read_expression)(state, parser)?;
    state.finish_context(NodePayload::None)
}

/// Reads an identifier paired with an expression.
fn read_identifier_paired_expression(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    state.start_context(NodeKind::IdentifierPairedExpression)?;
    match state.peek_kind() {
        Some(Token::Ident) | Some(Token::QuotedIdent) => {
            let text = state.peek_text().to_string();
            state.add_leaf_spanning(NodeKind::Identifier, NodePayload::Identifier { text }, 1)?;
        }
        _ => return Err(state.expected_any_token_error(&[Token::Ident, Token::QuotedIdent])),
    }
    state.read_token_as_constant(Token::Equal, ConstantKind::Equal)?;
    (parser.read_expression)(state, parser)?;
    state.finish_context(NodePayload::None)
}

/// Reads an invocation suffix.
pub fn read_invoke_expression(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    let open_index = state.token_index();
    state.start_context(NodeKind::InvokeExpression)?;
    state.read_token_as_constant(Token::OpenParen, ConstantKind::OpenParen)?;

    if !state.is_on(Token::CloseParen) {
        require_content(state, open_index, SequenceKind::Parenthesis)?;
        read_csv_elements(
            state,
            parser,
            CsvContinuationKind::DanglingComma,
            |state| is_expression_start(state.peek_kind()),
            |state, parser| (parser.read_expression)(state, parser),
        )?;
    }

    read_close_wrapper(
        state,
        open_index,
        Token::CloseParen,
        ConstantKind::CloseParen,
        SequenceKind::Parenthesis,
    )?;
    state.finish_context(NodePayload::None)
}

/// Reads an item access suffix.
pub fn read_item_access_expression(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    let open_index = state.token_index();
    state.start_context(NodeKind::ItemAccessExpression)?;
    state.read_token_as_constant(Token::OpenBrace, ConstantKind::OpenBrace)?;
    require_content(state, open_index, SequenceKind::Brace)?;
    (parser.read_expression)(state, parser)?;
    read_close_wrapper(
        state,
        open_index,
        Token::CloseBrace,
        ConstantKind::CloseBrace,
        SequenceKind::Brace,
    )?;
    state.maybe_read_token_as_constant(Token::QuestionMark, ConstantKind::QuestionMark)?;
    state.finish_context(NodePayload::None)
}

/// Reads a field selector, either as an access suffix or with an
/// implicit target.
pub fn read_field_selector(
    state: &mut ParserState<'_>,
    _parser: &Parser,
) -> Result<NodeId, Error> {
    let open_index = state.token_index();
    state.start_context(NodeKind::FieldSelector)?;
    state.read_token_as_constant(Token::OpenBracket, ConstantKind::OpenBracket)?;
    require_content(state, open_index, SequenceKind::Bracket)?;
    read_generalized_identifier(state)?;
    read_close_wrapper(
        state,
        open_index,
        Token::CloseBracket,
        ConstantKind::CloseBracket,
        SequenceKind::Bracket,
    )?;
    state.maybe_read_token_as_constant(Token::QuestionMark, ConstantKind::QuestionMark)?;
    state.finish_context(NodePayload::None)
}

/// Reads a field projection, either as an access suffix or with an
/// implicit target.
pub fn read_field_projection(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    let open_index = state.token_index();
    state.start_context(NodeKind::FieldProjection)?;
    state.read_token_as_constant(Token::OpenBracket, ConstantKind::OpenBracket)?;
    require_content(state, open_index, SequenceKind::Bracket)?;
    read_csv_elements(
        state,
        parser,
        CsvContinuationKind::DanglingComma,
        |state| state.is_on(Token::OpenBracket),
        |state, parser| (parser.read_field_selector)(state, parser),
    )?;
    read_close_wrapper(
        state,
        open_index,
        Token::CloseBracket,
        ConstantKind::CloseBracket,
        SequenceKind::Bracket,
    )?;
    state.maybe_read_token_as_constant(Token::QuestionMark, ConstantKind::QuestionMark)?;
    state.finish_context(NodePayload::None)
}

/// Reads an `each` expression.
pub fn read_each_expression(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    state.start_context(NodeKind::EachExpression)?;
    state.read_token_as_constant(Token::EachKeyword, ConstantKind::Each)?;
    (parser.read_expression)(state, parser)?;
    state.finish_context(NodePayload::None)
}

/// Reads a `let` expression.
pub fn read_let_expression(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    state.start_context(NodeKind::LetExpression)?;
    state.read_token_as_constant(Token::LetKeyword, ConstantKind::Let)?;
    read_csv_elements(
        state,
        parser,
        CsvContinuationKind::LetExpression,
        |state| matches!(state.peek_kind(), Some(Token::Ident) | Some(Token::QuotedIdent)),
        read_identifier_paired_expression,
    )?;
    state.read_token_as_constant(Token::InKeyword, ConstantKind::In)?;
    (parser.read_expression)(state, parser)?;
    state.finish_context(NodePayload::None)
}

/// Reads an `if` expression.
pub fn read_if_expression(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    state.start_context(NodeKind::IfExpression)?;
    state.read_token_as_constant(Token::IfKeyword, ConstantKind::If)?;
    (parser.read_expression)(state, parser)?;
    state.read_token_as_constant(Token::ThenKeyword, ConstantKind::Then)?;
    (parser.read_expression)(state, parser)?;
    state.read_token_as_constant(Token::ElseKeyword, ConstantKind::Else)?;
    (parser.read_expression)(state, parser)?;
    state.finish_context(NodePayload::None)
}

/// Reads an `error` expression.
pub fn read_error_raising_expression(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    state.start_context(NodeKind::ErrorRaisingExpression)?;
    state.read_token_as_constant(Token::ErrorKeyword, ConstantKind::Error)?;
    (parser.read_expression)(state, parser)?;
    state.finish_context(NodePayload::None)
}

/// Reads a `try` expression with an optional `otherwise` or `catch`
/// handler.
pub fn read_error_handling_expression(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    state.start_context(NodeKind::ErrorHandlingExpression)?;
    state.read_token_as_constant(Token::TryKeyword, ConstantKind::Try)?;
    (parser.read_expression)(state, parser)?;

    if state.is_on(Token::OtherwiseKeyword) {
        state.start_context(NodeKind::OtherwiseExpression)?;
        state.read_token_as_constant(Token::OtherwiseKeyword, ConstantKind::Otherwise)?;
        (parser.read_expression)(state, parser)?;
        state.finish_context(NodePayload::None)?;
    } else if is_contextual(state, "catch") {
        state.start_context(NodeKind::CatchExpression)?;
        let handler_index = state.token_index() + 1;
        read_contextual_constant(state, "catch", ConstantKind::Catch)?;
        let function = (parser.read_function_expression)(state, parser)?;
        validate_catch_function(state, function, handler_index)?;
        state.finish_context(NodePayload::None)?;
    }

    state.finish_context(NodePayload::None)
}

/// Validates the handler of a `catch` clause: a single untyped
/// parameter and no return type annotation.
fn validate_catch_function(
    state: &ParserState<'_>,
    function: NodeId,
    handler_index: usize,
) -> Result<(), Error> {
    let store = state.store();
    let invalid = || {
        Error::Parse(ParseError::InvalidCatchFunction {
            found: state.location_at(handler_index),
        })
    };

    for child in store.children(function) {
        if let Some(node) = store.ast(*child) {
            if node.kind() == NodeKind::AsNullablePrimitiveType {
                return Err(invalid());
            }
        }
    }

    let parameter_list = store
        .nth_child_xor_checked(function, 0, &[NodeKind::ParameterList])?
        .ok_or_else(|| crate::error::InvariantError::new("function should have parameters"))?;
    let parameters = store.csv_items(parameter_list.id());
    if parameters.len() > 1 {
        return Err(invalid());
    }

    for parameter in parameters {
        for child in store.children(parameter.id()) {
            if let Some(node) = store.ast(*child) {
                let typed = node.kind() == NodeKind::AsNullablePrimitiveType;
                let optional = node.constant_kind() == Some(ConstantKind::Optional);
                if typed || optional {
                    return Err(invalid());
                }
            }
        }
    }

    Ok(())
}

/// Reads a function expression.
pub fn read_function_expression(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    state.start_context(NodeKind::FunctionExpression)?;
    (parser.read_parameter_list)(state, parser)?;
    if state.is_on(Token::AsKeyword) {
        read_as_nullable_primitive_type(state, parser)?;
    }
    state.read_token_as_constant(Token::FatArrow, ConstantKind::FatArrow)?;
    (parser.read_expression)(state, parser)?;
    state.finish_context(NodePayload::None)
}

/// Reads a parenthesized parameter list.
pub fn read_parameter_list(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    let open_index = state.token_index();
    state.start_context(NodeKind::ParameterList)?;
    state.read_token_as_constant(Token::OpenParen, ConstantKind::OpenParen)?;

    if !state.is_on(Token::CloseParen) {
        require_content(state, open_index, SequenceKind::Parenthesis)?;
        read_csv_elements(
            state,
            parser,
            CsvContinuationKind::DanglingComma,
            |state| state.is_on(Token::Ident),
            read_parameter,
        )?;
    }

    read_close_wrapper(
        state,
        open_index,
        Token::CloseParen,
        ConstantKind::CloseParen,
        SequenceKind::Parenthesis,
    )?;
    let id = state.finish_context(NodePayload::None)?;
    validate_parameter_order(state, id)?;
    Ok(id)
}

/// Validates that no required parameter follows an optional one.
fn validate_parameter_order(state: &ParserState<'_>, list: NodeId) -> Result<(), Error> {
    let store = state.store();
    let mut optional_seen = false;
    for parameter in store.csv_items(list) {
        let mut is_optional = false;
        let mut name_index = None;
        for child in store.children(parameter.id()) {
            if let Some(node) = store.ast(*child) {
                if node.constant_kind() == Some(ConstantKind::Optional) {
                    is_optional = true;
                }
                if node.kind() == NodeKind::Identifier {
                    name_index = Some(node.token_range().start() as usize);
                }
            }
        }

        if is_optional {
            optional_seen = true;
        } else if optional_seen {
            return Err(Error::Parse(
                ParseError::RequiredParameterAfterOptionalParameter {
                    found: state.location_at(
                        name_index.unwrap_or(state.token_index()),
                    ),
                },
            ));
        }
    }

    Ok(())
}

/// Reads a single function parameter.
fn read_parameter(state: &mut ParserState<'_>, parser: &Parser) -> Result<NodeId, Error> {
    state.start_context(NodeKind::Parameter)?;
    if is_contextual(state, "optional") && matches!(state.peek_at(1).map(|t| t.kind()), Some(Token::Ident)) {
        read_contextual_constant(state, "optional", ConstantKind::Optional)?;
    }

    if !state.is_on(Token::Ident) {
        return Err(state.expected_token_error(Token::Ident));
    }

    let text = state.peek_text().to_string();
    state.add_leaf_spanning(NodeKind::Identifier, NodePayload::Identifier { text }, 1)?;

    if state.is_on(Token::AsKeyword) {
        read_as_nullable_primitive_type(state, parser)?;
    }

    state.finish_context(NodePayload::None)
}

/// Reads an `as` clause carrying a nullable primitive type.
fn read_as_nullable_primitive_type(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    state.start_context(NodeKind::AsNullablePrimitiveType)?;
    state.read_token_as_constant(Token::AsKeyword, ConstantKind::Operator(BinaryOperator::As))?;
    read_nullable_primitive_type(state, parser)?;
    state.finish_context(NodePayload::None)
}

/// Reads a primitive type, optionally `nullable`-prefixed.
fn read_nullable_primitive_type(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    if is_contextual(state, "nullable") {
        state.start_context(NodeKind::NullablePrimitiveType)?;
        read_contextual_constant(state, "nullable", ConstantKind::Nullable)?;
        (parser.read_primitive_type)(state, parser)?;
        return state.finish_context(NodePayload::None);
    }

    (parser.read_primitive_type)(state, parser)
}

/// Reads a primitive type terminal.
pub fn read_primitive_type(
    state: &mut ParserState<'_>,
    _parser: &Parser,
) -> Result<NodeId, Error> {
    let name = match state.peek_kind() {
        Some(Token::Ident) => state.peek_text(),
        Some(Token::NullKeyword) => "null",
        Some(Token::TypeKeyword) => "type",
        _ => return Err(state.expected_token_error(Token::Ident)),
    };

    let kind = crate::node::PrimitiveTypeKind::from_name(name).ok_or_else(|| {
        Error::Parse(ParseError::InvalidPrimitiveType {
            found: state.location(),
        })
    })?;

    state.add_leaf_spanning(NodeKind::PrimitiveType, NodePayload::PrimitiveType(kind), 1)
}

/// Reads a primary type: a primitive, nullable, record, list, table,
/// or function type.
fn read_primary_type(state: &mut ParserState<'_>, parser: &Parser) -> Result<NodeId, Error> {
    match state.peek_kind() {
        Some(Token::OpenBracket) => read_record_type(state, parser),
        Some(Token::OpenBrace) => read_list_type(state, parser),
        Some(Token::Ident) if is_contextual(state, "nullable") => {
            state.start_context(NodeKind::NullableType)?;
            read_contextual_constant(state, "nullable", ConstantKind::Nullable)?;
            read_primary_type(state, parser)?;
            state.finish_context(NodePayload::None)
        }
        Some(Token::Ident)
            if is_contextual(state, "table")
                && (matches!(state.peek_at(1).map(|t| t.kind()), Some(Token::OpenBracket))
                    || is_expression_start(state.peek_at(1).map(|t| t.kind()))) =>
        {
            read_table_type(state, parser)
        }
        Some(Token::Ident)
            if is_contextual(state, "function")
                && matches!(state.peek_at(1).map(|t| t.kind()), Some(Token::OpenParen)) =>
        {
            read_function_type(state, parser)
        }
        _ => (parser.read_primitive_type)(state, parser),
    }
}

/// Reads a record type.
fn read_record_type(state: &mut ParserState<'_>, parser: &Parser) -> Result<NodeId, Error> {
    state.start_context(NodeKind::RecordType)?;
    read_field_specification_list(state, parser)?;
    state.finish_context(NodePayload::None)
}

/// Reads a list type.
fn read_list_type(state: &mut ParserState<'_>, parser: &Parser) -> Result<NodeId, Error> {
    let open_index = state.token_index();
    state.start_context(NodeKind::ListType)?;
    state.read_token_as_constant(Token::OpenBrace, ConstantKind::OpenBrace)?;
    require_content(state, open_index, SequenceKind::Brace)?;
    read_primary_type(state, parser)?;
    read_close_wrapper(
        state,
        open_index,
        Token::CloseBrace,
        ConstantKind::CloseBrace,
        SequenceKind::Brace,
    )?;
    state.finish_context(NodePayload::None)
}

/// Reads a table type: `table` followed by a field specification list
/// or by a primary expression yielding a row type.
fn read_table_type(state: &mut ParserState<'_>, parser: &Parser) -> Result<NodeId, Error> {
    state.start_context(NodeKind::TableType)?;
    read_contextual_constant(state, "table", ConstantKind::Table)?;
    if state.is_on(Token::OpenBracket) {
        read_field_specification_list(state, parser)?;
    } else {
        (parser.read_primary_expression)(state, parser)?;
    }
    state.finish_context(NodePayload::None)
}

/// Reads a function type.
fn read_function_type(state: &mut ParserState<'_>, parser: &Parser) -> Result<NodeId, Error> {
    state.start_context(NodeKind::FunctionType)?;
    read_contextual_constant(state, "function", ConstantKind::Function)?;
    (parser.read_parameter_list)(state, parser)?;
    state.start_context(NodeKind::AsType)?;
    state.read_token_as_constant(Token::AsKeyword, ConstantKind::Operator(BinaryOperator::As))?;
    read_primary_type(state, parser)?;
    state.finish_context(NodePayload::None)?;
    state.finish_context(NodePayload::None)
}

/// Reads a bracketed list of field specifications, with an optional
/// trailing `…` open-record marker.
fn read_field_specification_list(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    let open_index = state.token_index();
    state.start_context(NodeKind::FieldSpecificationList)?;
    state.read_token_as_constant(Token::OpenBracket, ConstantKind::OpenBracket)?;

    if !state.is_on(Token::CloseBracket) {
        require_content(state, open_index, SequenceKind::Bracket)?;
        loop {
            state.throw_if_cancelled()?;
            if state.is_on(Token::Ellipsis) {
                state.read_token_as_constant(Token::Ellipsis, ConstantKind::Ellipsis)?;
                break;
            }

            state.start_context(NodeKind::Csv)?;
            if !is_generalized_identifier_start(state) && !is_contextual(state, "optional") {
                return Err(Error::Parse(ParseError::ExpectedCsvContinuation {
                    kind: CsvContinuationKind::DanglingComma,
                    found: state.location(),
                }));
            }

            read_field_specification(state, parser)?;
            let comma = state.maybe_read_token_as_constant(Token::Comma, ConstantKind::Comma)?;
            state.finish_context(NodePayload::None)?;
            if comma.is_none() {
                break;
            }
        }
    }

    read_close_wrapper(
        state,
        open_index,
        Token::CloseBracket,
        ConstantKind::CloseBracket,
        SequenceKind::Bracket,
    )?;
    state.finish_context(NodePayload::None)
}

/// Reads a single field specification.
fn read_field_specification(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    state.start_context(NodeKind::FieldSpecification)?;
    if is_contextual(state, "optional") && state.peek_at(1).is_some() {
        let next = state.peek_at(1).map(|t| t.kind());
        let continues = matches!(next, Some(k) if is_generalized_identifier_segment(k))
            || matches!(next, Some(Token::QuotedIdent));
        if continues {
            read_contextual_constant(state, "optional", ConstantKind::Optional)?;
        }
    }

    read_generalized_identifier(state)?;

    if state.is_on(Token::Equal) {
        state.start_context(NodeKind::FieldTypeSpecification)?;
        state.read_token_as_constant(Token::Equal, ConstantKind::Equal)?;
        read_primary_type(state, parser)?;
        state.finish_context(NodePayload::None)?;
    }

    state.finish_context(NodePayload::None)
}

/// Reads a section document.
pub fn read_section(state: &mut ParserState<'_>, parser: &Parser) -> Result<NodeId, Error> {
    state.start_context(NodeKind::Section)?;
    if state.is_on(Token::OpenBracket) {
        read_record_literal(state, parser)?;
    }

    state.read_token_as_constant(Token::SectionKeyword, ConstantKind::Section)?;
    if state.is_on(Token::Ident) {
        let text = state.peek_text().to_string();
        state.add_leaf_spanning(NodeKind::Identifier, NodePayload::Identifier { text }, 1)?;
    }
    state.read_token_as_constant(Token::Semicolon, ConstantKind::Semicolon)?;

    while !state.at_end() {
        (parser.read_section_member)(state, parser)?;
    }

    state.finish_context(NodePayload::None)
}

/// Reads a single section member.
pub fn read_section_member(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    state.start_context(NodeKind::SectionMember)?;
    if state.is_on(Token::OpenBracket) {
        read_record_literal(state, parser)?;
    }

    state.maybe_read_token_as_constant(Token::SharedKeyword, ConstantKind::Shared)?;
    read_identifier_paired_expression(state, parser)?;
    state.read_token_as_constant(Token::Semicolon, ConstantKind::Semicolon)?;
    state.finish_context(NodePayload::None)
}

/// Reads a record literal, whose field values are restricted to
/// literals.
fn read_record_literal(state: &mut ParserState<'_>, parser: &Parser) -> Result<NodeId, Error> {
    let open_index = state.token_index();
    state.start_context(NodeKind::RecordLiteral)?;
    state.read_token_as_constant(Token::OpenBracket, ConstantKind::OpenBracket)?;

    if !state.is_on(Token::CloseBracket) {
        require_content(state, open_index, SequenceKind::Bracket)?;
        read_csv_elements(
            state,
            parser,
            CsvContinuationKind::DanglingComma,
            is_generalized_identifier_start,
            read_generalized_identifier_paired_any_literal,
        )?;
    }

    read_close_wrapper(
        state,
        open_index,
        Token::CloseBracket,
        ConstantKind::CloseBracket,
        SequenceKind::Bracket,
    )?;
    state.finish_context(NodePayload::None)
}

/// Reads a generalized identifier paired with an any-literal.
fn read_generalized_identifier_paired_any_literal(
    state: &mut ParserState<'_>,
    parser: &Parser,
) -> Result<NodeId, Error> {
    state.start_context(NodeKind::GeneralizedIdentifierPairedAnyLiteral)?;
    read_generalized_identifier(state)?;
    state.read_token_as_constant(Token::Equal, ConstantKind::Equal)?;
    read_any_literal(state, parser)?;
    state.finish_context(NodePayload::None)
}

/// Reads an any-literal: a literal, record literal, or list literal.
fn read_any_literal(state: &mut ParserState<'_>, parser: &Parser) -> Result<NodeId, Error> {
    match state.peek_kind() {
        Some(Token::OpenBracket) => read_record_literal(state, parser),
        Some(Token::OpenBrace) => read_list_literal(state, parser),
        _ => read_literal_expression(state, parser),
    }
}

/// Reads a list literal, whose elements are restricted to literals.
fn read_list_literal(state: &mut ParserState<'_>, parser: &Parser) -> Result<NodeId, Error> {
    let open_index = state.token_index();
    state.start_context(NodeKind::ListLiteral)?;
    state.read_token_as_constant(Token::OpenBrace, ConstantKind::OpenBrace)?;

    if !state.is_on(Token::CloseBrace) {
        require_content(state, open_index, SequenceKind::Brace)?;
        read_csv_elements(
            state,
            parser,
            CsvContinuationKind::DanglingComma,
            |state| {
                matches!(
                    state.peek_kind(),
                    Some(Token::Number)
                        | Some(Token::Text)
                        | Some(Token::TrueKeyword)
                        | Some(Token::FalseKeyword)
                        | Some(Token::NullKeyword)
                        | Some(Token::OpenBrace)
                        | Some(Token::OpenBracket)
                )
            },
            read_any_literal,
        )?;
    }

    read_close_wrapper(
        state,
        open_index,
        Token::CloseBrace,
        ConstantKind::CloseBrace,
        SequenceKind::Brace,
    )?;
    state.finish_context(NodePayload::None)
}
