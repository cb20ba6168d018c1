use crate::test_utils::{consumed, parse_err, value_of};
use crate::{
    ParserExt, Value, keyword, operator, raw_string_literal, run, string_literal,
};

#[test]
fn keyword_requires_a_word_boundary() {
    let p = keyword("if");
    assert_eq!(value_of(&p, "if "), Value::Unit);
    assert_eq!(consumed(&p, "if ("), 2);

    let err = parse_err(&p, "iffy");
    assert_eq!(err.offset, 0);
    assert_eq!(err.summary(), "unexpected 'i'; expected if");
}

#[test]
fn operator_requires_an_operator_boundary() {
    let p = operator("+");
    assert_eq!(consumed(&p, "+1"), 1);
    assert!(run(&p, "+=").is_err());

    let wide = operator("+=");
    assert_eq!(consumed(&wide, "+=1"), 2);
}

#[test]
fn string_literal_processes_escapes() {
    let p = string_literal();
    assert_eq!(value_of(&p, r#""ab\n""#), Value::str("ab\n"));
    assert_eq!(consumed(&p, r#""ab\n""#), 6);
}

#[test]
fn raw_string_literal_keeps_backslashes() {
    let p = raw_string_literal();
    assert_eq!(value_of(&p, r#""a\n""#), Value::str("a\\n"));
    assert_eq!(consumed(&p, r#""a\n""#), 5);
}

#[test]
fn unterminated_literal_fails_atomically() {
    let p = string_literal();
    let err = parse_err(&p, "\"ab");
    assert_eq!(err.offset, 0);
    assert_eq!(err.summary(), "unexpected '\"'; expected string");
}

#[test]
fn token_leaves_tablify_together() {
    let p = keyword("if")
        .map(|_| Value::Int(1))
        .or(keyword("else").map(|_| Value::Int(2)))
        .or(string_literal());

    assert_eq!(value_of(&p, "else x"), Value::Int(2));
    assert_eq!(value_of(&p, "\"hi\" rest"), Value::str("hi"));

    let err = parse_err(&p, "for");
    let labels: Vec<String> = err.expected.iter().map(|l| l.to_string()).collect();
    assert_eq!(labels, vec!["if", "else", "string"]);
}
