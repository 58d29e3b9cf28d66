//! Tests for the staged lex-then-parse entry points.

use pqm::grammar::settings::Settings;
use pqm::lex_parse;
use pqm::LexParse;
use pqm::Stage;
use pretty_assertions::assert_eq;

#[test]
fn a_valid_document_reaches_the_parse_stage() {
    let result = lex_parse(&Settings::new(), "let a = 1 in a");
    assert_eq!(result.stage(), Stage::Parse);
    assert!(matches!(result, LexParse::Ok { .. }));
}

#[test]
fn a_parse_failure_still_carries_the_snapshot() {
    let result = lex_parse(&Settings::new(), "{1, }");
    assert_eq!(result.stage(), Stage::Parse);

    match result {
        LexParse::ParseError { snapshot, failure } => {
            assert_eq!(snapshot.len(), 4);
            assert!(failure.store().root_id().is_some());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn a_mixed_lex_outcome_still_parses_the_prefix() {
    // The text literal is unterminated; the tokens before it lex and
    // the parser reports the missing value.
    let result = lex_parse(&Settings::new(), r#"let a = "x"#);
    assert_eq!(result.stage(), Stage::Parse);
    assert!(matches!(result, LexParse::ParseError { .. }));
}

#[test]
fn unlexable_input_stops_at_the_lex_stage() {
    let result = lex_parse(&Settings::new(), "\u{1F980}");
    assert_eq!(result.stage(), Stage::Lex);
}
