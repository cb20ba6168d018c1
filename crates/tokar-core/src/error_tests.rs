use std::rc::Rc;

use crate::{ErrorPrinter, ParseError, Pos};

fn label(s: &str) -> Rc<str> {
    Rc::from(s)
}

#[test]
fn later_offset_dominates() {
    let mut err = ParseError::at(2, Pos { line: 0, col: 2 }).expecting(label("\"a\""));
    err.merge(ParseError::at(5, Pos { line: 0, col: 5 }).expecting(label("\"b\"")));

    assert_eq!(err.offset, 5);
    assert_eq!(err.summary(), "expected \"b\"");
}

#[test]
fn earlier_offset_is_ignored() {
    let mut err = ParseError::at(5, Pos { line: 0, col: 5 }).expecting(label("\"b\""));
    err.merge(ParseError::at(2, Pos { line: 0, col: 2 }).expecting(label("\"a\"")));

    assert_eq!(err.offset, 5);
    assert_eq!(err.summary(), "expected \"b\"");
}

#[test]
fn equal_offsets_union_expected() {
    let mut err = ParseError::at(3, Pos { line: 0, col: 3 }).expecting(label("\"a\""));
    err.merge(ParseError::at(3, Pos { line: 0, col: 3 }).expecting(label("\"b\"")));
    err.merge(ParseError::at(3, Pos { line: 0, col: 3 }).expecting(label("\"a\"")));

    assert_eq!(err.summary(), "expected \"a\" or \"b\"");
}

#[test]
fn messages_take_precedence_in_summary() {
    let err = ParseError::at(0, Pos::start())
        .expecting(label("digit"))
        .with_message(label("number too large"));

    assert_eq!(err.summary(), "number too large");
}

#[test]
fn relabel_replaces_expected() {
    let mut err = ParseError::at(0, Pos::start())
        .expecting(label("\"a\""))
        .expecting(label("\"b\""));
    err.relabel(label("an atom"));

    assert_eq!(err.summary(), "expected an atom");
}

#[test]
fn display_carries_position() {
    let err = ParseError::at(4, Pos { line: 1, col: 2 })
        .with_unexpected(label("'q'"))
        .expecting(label("digit"));

    assert_eq!(
        err.to_string(),
        "parse error at line 1, column 2: unexpected 'q'; expected digit"
    );
}

#[test]
fn renders_snippet_with_annotation() {
    let source = "ab\ncd";
    let err = ParseError::at(3, Pos { line: 1, col: 0 }).expecting(label("\"x\""));

    let rendered = ErrorPrinter::new(&err, source).path("input").render();

    assert!(rendered.contains("parse error"));
    assert!(rendered.contains("expected \"x\""));
    assert!(rendered.contains("cd"));
}
