//! End-to-end inspection tests over parsed and partially parsed
//! documents.

use pqm_analysis::active::locate;
use pqm_analysis::active::Cursor;
use pqm_analysis::active::CursorClassification;
use pqm_analysis::completions::autocomplete;
use pqm_analysis::completions::CompletionItemKind;
use pqm_analysis::inspector::Inspector;
use pqm_analysis::invoke::invoke_inspection;
use pqm_analysis::scope::ScopeItem;
use pqm_grammar::lexer::lex;
use pqm_grammar::node::NodeId;
use pqm_grammar::node::NodeKind;
use pqm_grammar::parser::try_parse;
use pqm_grammar::settings::Settings;
use pqm_grammar::store::NodeStore;
use pretty_assertions::assert_eq;

/// Parses a source string, returning the store whether or not the
/// parse succeeded.
fn store_of(source: &str) -> NodeStore {
    let snapshot = lex(source).into_result().expect("source should lex");
    match try_parse(&Settings::new(), &snapshot) {
        Ok(ok) => ok.into_store(),
        Err(failure) => failure.into_parts().1,
    }
}

/// Parses a source string, panicking unless it succeeds, and returns
/// the root id and store.
fn parse_ok(source: &str) -> (NodeId, NodeStore) {
    let snapshot = lex(source).into_result().expect("source should lex");
    let ok = try_parse(&Settings::new(), &snapshot).expect("source should parse");
    (ok.root(), ok.into_store())
}

#[test]
fn empty_input_is_out_of_bounds() {
    let store = store_of("");
    assert!(locate(&store, Cursor::new(0, 0)).is_none());
}

#[test]
fn cursor_classification() {
    let store = store_of("foo + 1");

    // `foo` spans columns 0..3.
    let active = locate(&store, Cursor::new(0, 0)).expect("cursor should be in bounds");
    assert_eq!(active.classification(), CursorClassification::OnTokenStart);

    let active = locate(&store, Cursor::new(0, 1)).expect("cursor should be in bounds");
    assert_eq!(active.classification(), CursorClassification::InsideToken);

    let active = locate(&store, Cursor::new(0, 3)).expect("cursor should be in bounds");
    assert_eq!(active.classification(), CursorClassification::OnTokenEnd);

    // Column 9 is past the last token.
    let active = locate(&store, Cursor::new(0, 9)).expect("cursor should be in bounds");
    assert_eq!(active.classification(), CursorClassification::BetweenTokens);
}

#[test]
fn ancestry_reaches_the_root_without_duplicates() {
    let store = store_of("let a = {1, 2} in a");
    let root = store.root_id().expect("the parse should have a root");

    let active = locate(&store, Cursor::new(0, 10)).expect("cursor should be in bounds");
    let ancestry = active.ancestry();
    assert_eq!(*ancestry.last().expect("ancestry should be non-empty"), root);

    let mut seen: Vec<NodeId> = ancestry.to_vec();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), ancestry.len(), "ancestry should have no duplicates");
}

#[test]
fn let_bindings_are_visible_with_shadowing_rules() {
    // The cursor target is the `a` reference in the value of `b`.
    let store = store_of("let a = 1, b = a in b");
    let active = locate(&store, Cursor::new(0, 15)).expect("cursor should be in bounds");
    let mut inspector = Inspector::new(&store);

    let scope = inspector
        .try_node_scope(active.leaf_id())
        .expect("scope should resolve");

    match scope.get("a") {
        Some(ScopeItem::LetVariable {
            value,
            is_recursive,
            ..
        }) => {
            assert!(!is_recursive, "a sibling binding is directly visible");
            assert!(value.is_some());
        }
        other => panic!("unexpected scope item for `a`: {other:?}"),
    }

    match scope.get("b") {
        Some(ScopeItem::LetVariable { is_recursive, .. }) => {
            assert!(
                is_recursive,
                "a binding is recursive inside its own value expression"
            );
        }
        other => panic!("unexpected scope item for `b`: {other:?}"),
    }
}

#[test]
fn scope_of_unterminated_record_value() {
    let store = store_of("let x = [");
    let active = locate(&store, Cursor::new(0, 9)).expect("cursor should be in bounds");
    assert_eq!(active.classification(), CursorClassification::OnTokenEnd);

    let mut inspector = Inspector::new(&store);
    let scope = inspector
        .try_node_scope(active.leaf_id())
        .expect("scope should resolve");

    match scope.get("x") {
        Some(ScopeItem::LetVariable { value, .. }) => {
            let value = value.expect("x should have a value subtree");
            let node = store.xor(value).expect("value should be in the store");
            assert_eq!(node.kind(), NodeKind::RecordExpression);
            assert!(!node.is_ast(), "the record value should still be in progress");
        }
        other => panic!("unexpected scope item for `x`: {other:?}"),
    }
}

#[test]
fn scope_is_monotone_in_nesting_depth() {
    let store = store_of("let a = 1 in let b = 2 in a + b");
    let active = locate(&store, Cursor::new(0, 29)).expect("cursor should be in bounds");
    let mut inspector = Inspector::new(&store);

    // Both the outer and inner binding are visible at the innermost
    // position.
    let scope = inspector
        .try_node_scope(active.leaf_id())
        .expect("scope should resolve");
    assert!(scope.contains_key("a"));
    assert!(scope.contains_key("b"));
}

#[test]
fn scope_queries_are_memoized() {
    let store = store_of("let a = 1 in a");
    let active = locate(&store, Cursor::new(0, 13)).expect("cursor should be in bounds");
    let mut inspector = Inspector::new(&store);

    let first = inspector
        .try_node_scope(active.leaf_id())
        .expect("scope should resolve");
    let second = inspector
        .try_node_scope(active.leaf_id())
        .expect("scope should resolve");

    let first_keys: Vec<&String> = first.keys().collect();
    let second_keys: Vec<&String> = second.keys().collect();
    assert_eq!(first_keys, second_keys);
}

#[test]
fn each_binds_the_implicit_name() {
    let (root, store) = parse_ok("each _ + 1");
    let mut inspector = Inspector::new(&store);

    let ty = inspector.try_scope_type(root);
    assert_eq!(ty.to_string(), "(_: any) => any");
}

#[test]
fn literal_types() {
    for (source, expected) in [
        ("1", "number"),
        (r#""x""#, "text"),
        ("true", "logical"),
        ("null", "null"),
    ] {
        let (root, store) = parse_ok(source);
        let mut inspector = Inspector::new(&store);
        assert_eq!(inspector.try_scope_type(root).to_string(), expected);
    }
}

#[test]
fn let_type_flows_through_bindings() {
    let (root, store) = parse_ok("let a = 1, b = a in b");
    let mut inspector = Inspector::new(&store);
    assert_eq!(inspector.try_scope_type(root).to_string(), "number");
}

#[test]
fn if_branches_simplify() {
    let (root, store) = parse_ok(r#"let a = 1, b = "x" in if true then a else b"#);
    let mut inspector = Inspector::new(&store);
    assert_eq!(inspector.try_scope_type(root).to_string(), "number | text");
}

#[test]
fn recursive_bindings_resolve_to_unknown() {
    let (root, store) = parse_ok("let f = @f in f");
    let mut inspector = Inspector::new(&store);
    assert_eq!(inspector.try_scope_type(root).to_string(), "unknown");
}

#[test]
fn function_types_carry_parameters() {
    let (root, store) = parse_ok("(x as number, optional y as nullable text) => x");
    let mut inspector = Inspector::new(&store);
    assert_eq!(
        inspector.try_scope_type(root).to_string(),
        "(x: number, optional y: nullable text) => number"
    );
}

#[test]
fn invoking_a_known_function_yields_its_return_type() {
    let (root, store) = parse_ok("let f = (x as number) => x in f(1)");
    let mut inspector = Inspector::new(&store);
    assert_eq!(inspector.try_scope_type(root).to_string(), "number");
}

#[test]
fn record_types_and_field_access() {
    let (root, store) = parse_ok(r#"[a = 1, b = "x"]"#);
    let mut inspector = Inspector::new(&store);
    assert_eq!(
        inspector.try_scope_type(root).to_string(),
        "[a: number, b: text]"
    );

    let (root, store) = parse_ok("[a = 1][a]");
    let mut inspector = Inspector::new(&store);
    assert_eq!(inspector.try_scope_type(root).to_string(), "number");

    let (root, store) = parse_ok("[a = 1][b]");
    let mut inspector = Inspector::new(&store);
    assert_eq!(inspector.try_scope_type(root).to_string(), "none");
}

#[test]
fn list_types() {
    let (root, store) = parse_ok(r#"{1, "x"}"#);
    let mut inspector = Inspector::new(&store);
    assert_eq!(inspector.try_scope_type(root).to_string(), "{number, text}");
}

#[test]
fn arithmetic_operator_table() {
    for (source, expected) in [
        ("1 + 2", "number"),
        (r#""a" & "b""#, "text"),
        (r#"1 + "a""#, "none"),
        ("1 < 2", "logical"),
        ("true and false", "logical"),
        ("1 = 2", "logical"),
        ("1 is number", "logical"),
        ("1 as number", "number"),
        ("1 meta [x = 1]", "number"),
    ] {
        let (root, store) = parse_ok(source);
        let mut inspector = Inspector::new(&store);
        assert_eq!(
            inspector.try_scope_type(root).to_string(),
            expected,
            "unexpected type for `{source}`"
        );
    }
}

#[test]
fn null_coalescing_simplifies_both_sides() {
    let (root, store) = parse_ok(r#"let a = 1, b = "x" in a ?? b"#);
    let mut inspector = Inspector::new(&store);
    assert_eq!(inspector.try_scope_type(root).to_string(), "number | text");
}

#[test]
fn type_expression_types() {
    for (source, expected) in [
        ("type number", "type number"),
        ("type {number}", "type {type number}"),
        ("type table [x = number]", "type table [x: type number]"),
    ] {
        let (root, store) = parse_ok(source);
        let mut inspector = Inspector::new(&store);
        assert_eq!(
            inspector.try_scope_type(root).to_string(),
            expected,
            "unexpected type for `{source}`"
        );
    }
}

#[test]
fn types_of_in_progress_nodes_are_unknown() {
    let store = store_of("let x = [");
    let record = store
        .context_nodes()
        .find(|c| c.kind() == NodeKind::RecordExpression)
        .expect("the record context should survive")
        .id();

    let mut inspector = Inspector::new(&store);
    assert_eq!(inspector.try_scope_type(record).to_string(), "unknown");
}

#[test]
fn invoke_active_argument() {
    // The cursor sits immediately after `2`.
    let store = store_of("f(1, 2, 3)");
    let cursor = Cursor::new(0, 6);
    let active = locate(&store, cursor).expect("cursor should be in bounds");
    let mut inspector = Inspector::new(&store);

    let inspection = invoke_inspection(&mut inspector, &active, cursor)
        .expect("an invoke expression should enclose the cursor");
    assert_eq!(inspection.active_argument_ordinal(), 1);
    assert_eq!(inspection.arguments_provided(), 3);
    assert_eq!(inspection.name(), Some("f"));
    assert!(!inspection.is_name_in_local_scope());
    assert_eq!(inspection.function_type().to_string(), "any");
}

#[test]
fn invoke_resolves_known_callees() {
    let store = store_of("let f = (x as number) => x in f(1)");
    let cursor = Cursor::new(0, 32);
    let active = locate(&store, cursor).expect("cursor should be in bounds");
    let mut inspector = Inspector::new(&store);

    let inspection = invoke_inspection(&mut inspector, &active, cursor)
        .expect("an invoke expression should enclose the cursor");
    assert!(inspection.is_name_in_local_scope());
    assert_eq!(
        inspection.function_type().to_string(),
        "(x: number) => number"
    );
}

#[test]
fn autocomplete_offers_constants_and_scope_names() {
    let store = store_of("let abc = 1 in abc");
    let active = locate(&store, Cursor::new(0, 16)).expect("cursor should be in bounds");
    let mut inspector = Inspector::new(&store);

    let items = autocomplete(&mut inspector, Some(&active));
    let labels: Vec<&str> = items.iter().map(|i| i.label()).collect();
    assert!(labels.contains(&"true"));
    assert!(labels.contains(&"null"));
    assert!(labels.contains(&"abc"));
}

#[test]
fn autocomplete_offers_in_inside_unfinished_let() {
    let store = store_of("let x = 1,");
    let active = locate(&store, Cursor::new(0, 10)).expect("cursor should be in bounds");
    let mut inspector = Inspector::new(&store);

    let items = autocomplete(&mut inspector, Some(&active));
    assert!(items
        .iter()
        .any(|i| i.label() == "in" && i.kind() == CompletionItemKind::Keyword));
}

#[test]
fn autocomplete_offers_primitive_types_in_type_positions() {
    let store = store_of("(x as ) => 1");
    let active = locate(&store, Cursor::new(0, 6)).expect("cursor should be in bounds");
    let mut inspector = Inspector::new(&store);

    let items = autocomplete(&mut inspector, Some(&active));
    assert!(items
        .iter()
        .any(|i| i.label() == "number" && i.kind() == CompletionItemKind::PrimitiveType));
    assert!(items.iter().all(|i| i.label() != "each"));
}

#[test]
fn autocomplete_on_empty_input() {
    let store = store_of("");
    let mut inspector = Inspector::new(&store);

    let items = autocomplete(&mut inspector, None);
    assert!(items.iter().any(|i| i.label() == "let"));
    assert!(items.iter().any(|i| i.label() == "true"));
}
