//! Recursive grammars: fixpoint calls, per-activation loop state, and
//! stack behavior on pathological depths.

use crate::test_utils::{parse_err, value_of};
use crate::{Parser, ParserExt, Value, ch, many, recursive, run, satisfy};

/// parens = '(' parens ')' | 'x'
fn parens() -> Parser {
    recursive(|p| ch('(').then(p).before(ch(')')).or(ch('x')))
}

#[test]
fn recursion_reaches_the_base_case() {
    let p = parens();
    assert_eq!(value_of(&p, "x"), Value::Char('x'));
    assert_eq!(value_of(&p, "((x))"), Value::Char('x'));
}

#[test]
fn unbalanced_nesting_fails() {
    let p = parens();
    let err = parse_err(&p, "((x)");
    assert_eq!(err.offset, 4);
}

#[test]
fn deep_runtime_recursion_stays_on_the_heap() {
    let p = parens();
    let depth = 1_000;
    let input = format!("{}x{}", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(value_of(&p, &input), Value::Char('x'));
}

/// tree = '[' tree* ']' counted | 'a'
///
/// Counts the leaves. The interesting part is `many` inside the recursion:
/// a nested activation reenters the same loop instruction, so its
/// accumulator must be saved into the call frame and restored on return.
fn leaf_counter() -> Parser {
    recursive(|tree| {
        ch('[')
            .then(many(tree))
            .before(ch(']'))
            .map(|xs| {
                Value::Int(xs.as_list().iter().map(|v| v.as_int()).sum())
            })
            .or(ch('a').map(|_| Value::Int(1)))
    })
}

#[test]
fn loop_state_is_isolated_per_activation() {
    let p = leaf_counter();
    assert_eq!(value_of(&p, "a"), Value::Int(1));
    assert_eq!(value_of(&p, "[aa]"), Value::Int(2));
    assert_eq!(value_of(&p, "[a[aa]]"), Value::Int(3));
    assert_eq!(value_of(&p, "[a[a[aa]a]]"), Value::Int(5));
}

#[test]
fn lazy_thunks_force_once_at_compile_time() {
    use std::cell::Cell;
    use std::rc::Rc;

    let forced = Rc::new(Cell::new(0));
    let counter = forced.clone();
    let p = crate::lazy(move || {
        counter.set(counter.get() + 1);
        ch('a')
    });

    assert_eq!(value_of(&p, "a"), Value::Char('a'));
    assert_eq!(value_of(&p, "a"), Value::Char('a'));
    assert_eq!(forced.get(), 1);
}

#[test]
fn deep_left_nested_sequences_compile_and_run() {
    let any = || satisfy(|c| c == 'a');
    let mut p = any();
    for _ in 0..20_000 {
        p = p.then(any());
    }
    let input = "a".repeat(20_001);
    let parsed = run(&p, &input).expect("parse failed");
    assert_eq!(parsed.consumed, 20_001);
    assert_eq!(parsed.value, Value::Char('a'));
}
