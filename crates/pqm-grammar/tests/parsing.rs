//! End-to-end parsing tests over real source text.

use std::sync::Arc;

use pqm_grammar::cancellation::CounterCancellationToken;
use pqm_grammar::error::CsvContinuationKind;
use pqm_grammar::error::Error;
use pqm_grammar::error::ParseError;
use pqm_grammar::error::SequenceKind;
use pqm_grammar::lexer::lex;
use pqm_grammar::lexer::LexSnapshot;
use pqm_grammar::node::BinaryOperator;
use pqm_grammar::node::NodeKind;
use pqm_grammar::parser::try_parse;
use pqm_grammar::parser::ParseFailure;
use pqm_grammar::parser::ParseOk;
use pqm_grammar::settings::Settings;
use pqm_grammar::state::DisambiguationBehavior;
use pqm_grammar::store::NodeStore;
use pretty_assertions::assert_eq;

/// Lexes a source string, panicking when it does not lex.
fn snapshot(source: &str) -> LexSnapshot {
    lex(source).into_result().expect("source should lex")
}

/// Parses a source string with default settings.
fn parse(source: &str) -> Result<ParseOk, ParseFailure> {
    try_parse(&Settings::new(), &snapshot(source))
}

/// Parses a source string, panicking unless it succeeds.
fn parse_ok(source: &str) -> ParseOk {
    parse(source).expect("source should parse")
}

/// Parses a source string, panicking unless it fails.
fn parse_err(source: &str) -> ParseFailure {
    parse(source).expect_err("source should not parse")
}

/// Gets the kind of the root node.
fn root_kind(ok: &ParseOk) -> NodeKind {
    ok.store()
        .xor(ok.root())
        .expect("root should be in the store")
        .kind()
}

#[test]
fn literal_documents() {
    for (source, kind) in [
        ("1", NodeKind::LiteralExpression),
        (r#""hello""#, NodeKind::LiteralExpression),
        ("true", NodeKind::LiteralExpression),
        ("null", NodeKind::LiteralExpression),
        ("foo", NodeKind::IdentifierExpression),
        ("@foo", NodeKind::IdentifierExpression),
        ("...", NodeKind::NotImplementedExpression),
    ] {
        let ok = parse_ok(source);
        assert_eq!(root_kind(&ok), kind, "unexpected root for `{source}`");
    }
}

#[test]
fn node_ids_are_unique_and_monotone() {
    let ok = parse_ok("let a = {1, 2}, b = [c = 3] in if a then b else {4..5}");
    let store = ok.store();

    let mut previous = 0;
    for node in store.ast_nodes() {
        assert!(node.id().get() > previous, "ids should strictly increase");
        previous = node.id().get();
    }

    // A successful parse leaves no open contexts.
    assert_eq!(store.context_nodes().count(), 0);
}

#[test]
fn parent_ranges_cover_children() {
    let ok = parse_ok("let a = {1, 2} in f(a)[b]");
    let store = ok.store();

    for node in store.ast_nodes() {
        let Some(parent) = node.parent() else {
            continue;
        };
        let parent_range = store
            .ast(parent)
            .expect("parents should be parsed in a successful parse")
            .token_range();
        let range = node.token_range();
        assert!(
            parent_range.start() <= range.start() && range.end() <= parent_range.end(),
            "parent range should cover child range"
        );
    }
}

#[test]
fn children_are_ordered_with_no_gaps() {
    let ok = parse_ok("if a then 1 else 2");
    let store = ok.store();

    for node in store.ast_nodes() {
        let children = store.children(node.id());
        for (position, child) in children.iter().enumerate() {
            assert_eq!(
                store.attribute_index_of(*child),
                Some(position as u32),
                "child slots should be dense and ordered"
            );
        }
    }
}

#[test]
fn dangling_list_comma() {
    let failure = parse_err("{1, }");
    match failure.error() {
        Error::Parse(ParseError::ExpectedCsvContinuation { kind, .. }) => {
            assert_eq!(*kind, CsvContinuationKind::DanglingComma);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // The list context survives with the open brace, the parsed
    // element, and the element the parser had just begun.
    let store = failure.store();
    let list = store
        .context_nodes()
        .find(|c| c.kind() == NodeKind::ListExpression)
        .expect("the list context should survive");
    let children = store.children(list.id());
    assert_eq!(children.len(), 3);

    let kinds: Vec<(NodeKind, bool)> = children
        .iter()
        .map(|id| {
            let node = store.xor(*id).expect("child should be in the store");
            (node.kind(), node.is_ast())
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            (NodeKind::Constant, true),
            (NodeKind::Csv, true),
            (NodeKind::Csv, false),
        ],
    );
}

#[test]
fn dangling_comma_inside_let() {
    let failure = parse_err("let a = 1, in a");
    match failure.error() {
        Error::Parse(ParseError::ExpectedCsvContinuation { kind, .. }) => {
            assert_eq!(*kind, CsvContinuationKind::LetExpression);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unterminated_record() {
    let failure = parse_err("let x = [");
    match failure.error() {
        Error::Parse(ParseError::UnterminatedSequence { kind, .. }) => {
            assert_eq!(*kind, SequenceKind::Bracket);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // The partial tree roots a let with one binding whose value is
    // the unterminated record.
    let store = failure.store();
    let record = store
        .context_nodes()
        .find(|c| c.kind() == NodeKind::RecordExpression)
        .expect("the record context should survive");

    let pair = store
        .parent_of(record.id())
        .expect("record should have a parent");
    assert_eq!(
        store.xor(pair).map(|n| n.kind()),
        Some(NodeKind::IdentifierPairedExpression)
    );

    let csv = store.parent_of(pair).expect("pair should have a parent");
    assert_eq!(store.xor(csv).map(|n| n.kind()), Some(NodeKind::Csv));

    let root = store.parent_of(csv).expect("csv should have a parent");
    assert_eq!(
        store.xor(root).map(|n| n.kind()),
        Some(NodeKind::LetExpression)
    );
    assert_eq!(store.root_id(), Some(root));
}

#[test]
fn ambiguous_parenthesis_thorough() {
    let ok = parse_ok("(x) => x");
    assert_eq!(root_kind(&ok), NodeKind::FunctionExpression);

    let ok = parse_ok("(x)");
    assert_eq!(root_kind(&ok), NodeKind::ParenthesizedExpression);
}

#[test]
fn ambiguous_parenthesis_strict() {
    let settings =
        Settings::new().with_disambiguation_behavior(DisambiguationBehavior::Strict);

    let ok = try_parse(&settings, &snapshot("(x) => x")).expect("function should parse");
    assert_eq!(root_kind(&ok), NodeKind::FunctionExpression);

    let ok = try_parse(&settings, &snapshot("(x)")).expect("parenthesized should parse");
    assert_eq!(root_kind(&ok), NodeKind::ParenthesizedExpression);

    let ok = try_parse(&settings, &snapshot("(x as number) => x"))
        .expect("typed function should parse");
    assert_eq!(root_kind(&ok), NodeKind::FunctionExpression);
}

#[test]
fn bracket_disambiguation() {
    for behavior in [
        DisambiguationBehavior::Strict,
        DisambiguationBehavior::Thorough,
    ] {
        let settings = Settings::new().with_disambiguation_behavior(behavior);

        let ok = try_parse(&settings, &snapshot("[a = 1]")).expect("record should parse");
        assert_eq!(root_kind(&ok), NodeKind::RecordExpression);

        let ok = try_parse(&settings, &snapshot("each [a]")).expect("selector should parse");
        let store = ok.store();
        assert!(store
            .ast_nodes()
            .any(|n| n.kind() == NodeKind::FieldSelector));

        let ok =
            try_parse(&settings, &snapshot("each [[a], [b]]")).expect("projection should parse");
        let store = ok.store();
        assert!(store
            .ast_nodes()
            .any(|n| n.kind() == NodeKind::FieldProjection));
    }
}

#[test]
fn binary_chains_fold_by_precedence() {
    let ok = parse_ok("1 + 2 * 3");
    let store = ok.store();

    let root = store.ast(ok.root()).expect("root should be parsed");
    assert_eq!(root.kind(), NodeKind::ArithmeticExpression);
    assert_eq!(root.operator(), Some(BinaryOperator::Addition));

    let right = store
        .nth_child_ast_checked(ok.root(), 2, &[NodeKind::ArithmeticExpression])
        .expect("right operand should have the expected kind")
        .expect("right operand should be present");
    assert_eq!(right.operator(), Some(BinaryOperator::Multiplication));
}

#[test]
fn binary_chains_are_left_associative() {
    let ok = parse_ok("1 - 2 - 3");
    let store = ok.store();

    let root = store.ast(ok.root()).expect("root should be parsed");
    assert_eq!(root.operator(), Some(BinaryOperator::Subtraction));

    let left = store
        .nth_child_ast_checked(ok.root(), 0, &[NodeKind::ArithmeticExpression])
        .expect("left operand should have the expected kind")
        .expect("left operand should be present");
    assert_eq!(left.operator(), Some(BinaryOperator::Subtraction));
}

#[test]
fn comparison_binds_looser_than_arithmetic() {
    let ok = parse_ok("1 + 2 = 3");
    assert_eq!(root_kind(&ok), NodeKind::EqualityExpression);
}

#[test]
fn access_chains() {
    let ok = parse_ok("f(1)[a]{0}");
    let store = ok.store();

    assert_eq!(root_kind(&ok), NodeKind::RecursivePrimaryExpression);
    let kinds: Vec<NodeKind> = store
        .children(ok.root())
        .iter()
        .map(|id| store.xor(*id).expect("child should exist").kind())
        .collect();
    assert_eq!(
        kinds,
        vec![
            NodeKind::IdentifierExpression,
            NodeKind::InvokeExpression,
            NodeKind::FieldSelector,
            NodeKind::ItemAccessExpression,
        ],
    );
}

#[test]
fn list_ranges() {
    let ok = parse_ok("{1..3, 5}");
    let store = ok.store();
    assert!(store
        .ast_nodes()
        .any(|n| n.kind() == NodeKind::RangeExpression));
}

#[test]
fn section_documents() {
    let ok = parse_ok("section Numbers; x = 1; shared y = x;");
    let store = ok.store();

    assert_eq!(root_kind(&ok), NodeKind::Section);
    let members = store
        .children(ok.root())
        .iter()
        .filter(|id| {
            store
                .xor(**id)
                .map(|n| n.kind() == NodeKind::SectionMember)
                .unwrap_or(false)
        })
        .count();
    assert_eq!(members, 2);
}

#[test]
fn document_orchestration_prefers_deeper_parse() {
    // An expression document: the section attempt fails immediately.
    let ok = parse_ok("1 + 1");
    assert_eq!(root_kind(&ok), NodeKind::ArithmeticExpression);

    // A section document: the expression attempt fails immediately.
    let ok = parse_ok("section S; a = 1;");
    assert_eq!(root_kind(&ok), NodeKind::Section);
}

#[test]
fn unused_tokens_remain() {
    let failure = parse_err("1 2");
    assert!(matches!(
        failure.error(),
        Error::Parse(ParseError::UnusedTokensRemain { .. })
    ));
}

#[test]
fn required_parameter_after_optional() {
    let failure = parse_err("(optional x, y) => 1");
    assert!(matches!(
        failure.error(),
        Error::Parse(ParseError::RequiredParameterAfterOptionalParameter { .. })
    ));
}

#[test]
fn catch_handler_validation() {
    parse_ok("try 1 catch (e) => 0");
    parse_ok("try f() otherwise null");

    let failure = parse_err("try 1 catch (e as number) => 0");
    assert!(matches!(
        failure.error(),
        Error::Parse(ParseError::InvalidCatchFunction { .. })
    ));

    let failure = parse_err("try 1 catch (a, b) => 0");
    assert!(matches!(
        failure.error(),
        Error::Parse(ParseError::InvalidCatchFunction { .. })
    ));
}

#[test]
fn invalid_primitive_type() {
    let failure = parse_err("1 as widget");
    assert!(matches!(
        failure.error(),
        Error::Parse(ParseError::InvalidPrimitiveType { .. })
    ));
}

#[test]
fn expected_closing_token() {
    let failure = parse_err("(1 2");
    assert!(matches!(
        failure.error(),
        Error::Parse(ParseError::ExpectedClosingTokenKind { .. })
    ));
}

#[test]
fn type_expressions() {
    for source in [
        "type number",
        "type nullable text",
        "type {number}",
        "type [a = number, b = text]",
        "type [a = number, ...]",
        "type table [x = number]",
        "type function (a as number) as any",
        "1 is number",
        "1 as nullable number",
        "(x as nullable number) => x",
    ] {
        parse_ok(source);
    }
}

#[test]
fn cancellation_propagates() {
    let token = Arc::new(CounterCancellationToken::new(2));
    let settings = Settings::new().with_cancellation_token(token);
    let failure = try_parse(&settings, &snapshot("let a = 1 in a"))
        .expect_err("the parse should be cancelled");
    assert!(matches!(failure.error(), Error::Cancelled(_)));
}

#[test]
fn reparsing_a_well_formed_fragment_is_stable() {
    let first = parse_ok("let a = {1, 2} in a");
    let second = parse_ok("let a = {1, 2} in a");

    let shape = |store: &NodeStore| -> Vec<(u32, NodeKind, Option<u32>)> {
        store
            .ast_nodes()
            .map(|n| (n.id().get(), n.kind(), n.parent().map(|p| p.get())))
            .collect()
    };
    assert_eq!(shape(first.store()), shape(second.store()));
}

#[test]
fn empty_input_fails_to_parse() {
    let failure = parse_err("");
    assert!(matches!(failure.error(), Error::Parse(_)));
    assert_eq!(failure.store().leaf_ids().count(), 0);
}
