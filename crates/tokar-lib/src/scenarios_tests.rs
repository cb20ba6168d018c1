//! End-to-end behavior of the compiled machine: backtracking discipline,
//! implicit cut, state locality, and tablified alternation.

use crate::test_utils::{chars, consumed, parse_err, value_of};
use crate::{
    ParserExt, attempt, ch, get, lift2, local_value, look_ahead, many, not_followed_by, pure,
    satisfy, string, Reg, Value, run,
};

#[test]
fn many_leaves_the_rest_of_the_input() {
    let p = many(ch('a'));
    assert_eq!(value_of(&p, "aaab"), chars("aaa"));
    assert_eq!(consumed(&p, "aaab"), 3);
}

#[test]
fn alternation_commits_to_a_shared_prefix() {
    let p = string("foo").or(string("foobar"));
    assert_eq!(value_of(&p, "foobar"), Value::str("foo"));
    assert_eq!(consumed(&p, "foobar"), 3);
}

#[test]
fn attempt_lets_the_longer_branch_lose_gracefully() {
    let p = attempt(string("foo")).or(string("foobar"));
    for input in ["foobar", "foobaz", "fooba"] {
        assert_eq!(value_of(&p, input), Value::str("foo"), "input {input:?}");
    }
}

#[test]
fn bind_counts_at_runtime() {
    let p = many(ch('a')).bind(|xs| pure(Value::Int(xs.as_list().len() as i64)));
    assert_eq!(value_of(&p, "aaaa"), Value::Int(4));
    assert_eq!(value_of(&p, ""), Value::Int(0));
}

#[test]
fn local_scopes_a_register_and_restores_it() {
    let r0 = Reg::new(0);
    let p = lift2(
        |inside, after| Value::list(vec![inside, after]),
        local_value(r0, Value::Int(5), get(r0)),
        get(r0),
    );
    assert_eq!(
        value_of(&p, ""),
        Value::list(vec![Value::Int(5), Value::Unit]),
    );
}

#[test]
fn register_is_restored_across_failure() {
    let r0 = Reg::new(0);
    let p = local_value(r0, Value::Int(5), ch('a')).or(get(r0));
    assert_eq!(value_of(&p, "b"), Value::Unit);
}

#[test]
fn tablified_alternation_reports_every_lead() {
    let p = ('0'..='9')
        .map(ch)
        .reduce(|acc, b| acc.or(b))
        .expect("ten branches");

    let err = parse_err(&p, "q");
    assert_eq!(err.expected.len(), 10);
    assert_eq!(err.summary().matches("expected").count(), 1);
    assert!(err.summary().contains("'0'"));
    assert!(err.summary().contains("'9'"));
}

#[test]
fn implicit_cut_skips_the_right_branch_after_consumption() {
    let p = satisfy(|c| c == 'a')
        .then(satisfy(|c| c == 'b'))
        .or(string("ax"));

    // The left branch consumed 'a' before failing, so "ax" is never tried.
    let err = parse_err(&p, "ax");
    assert_eq!(err.offset, 1);
}

#[test]
fn look_ahead_is_transparent_on_success() {
    let p = look_ahead(string("ab")).then(string("ab"));
    assert_eq!(value_of(&p, "ab"), Value::str("ab"));
    assert_eq!(consumed(&p, "ab"), 2);
}

#[test]
fn look_ahead_failure_propagates() {
    let p = look_ahead(string("ab"));
    assert!(run(&p, "ax").is_err());
}

#[test]
fn not_followed_by_succeeds_without_consuming() {
    let p = ch('a').before(not_followed_by(ch('b')));
    assert_eq!(value_of(&p, "ac"), Value::Char('a'));
    assert_eq!(consumed(&p, "ac"), 1);

    assert!(run(&p, "ab").is_err());
}

#[test]
fn errors_prefer_the_longest_match() {
    let p = attempt(string("ab").then(satisfy(|c| c == 'c'))).or(string("ax"));
    // Left branch reaches offset 2 before failing; its position wins even
    // though attempt rewinds the cursor.
    let err = parse_err(&p, "abd");
    assert_eq!(err.offset, 2);
}
