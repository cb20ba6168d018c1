//! The algebraic laws, checked by observing parse outcomes over a fuzzed
//! corpus rather than by comparing trees: the optimiser is free to rewrite
//! either side.

use crate::{Parser, ParserExt, RunFailure, Value, ch, empty, item, many, pure, run, string};

/// Deterministic corpus over the alphabet the law parsers consume.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

fn corpus() -> Vec<String> {
    let alphabet: Vec<char> = "abcx+-".chars().collect();
    let mut lcg = Lcg(0x5DEECE66D);
    let mut out = vec![String::new()];
    for len in 1..=10 {
        for _ in 0..8 {
            let s: String = (0..len)
                .map(|_| alphabet[(lcg.next() as usize) % alphabet.len()])
                .collect();
            out.push(s);
        }
    }
    out
}

fn observe(p: &Parser, input: &str) -> String {
    match run(p, input) {
        Ok(parsed) => format!("ok {:?} +{}", parsed.value, parsed.consumed),
        Err(RunFailure::Parse(err)) => format!("fail@{} {}", err.offset, err.summary()),
        Err(RunFailure::Build(err)) => format!("build {err}"),
    }
}

fn assert_equivalent(lhs: &Parser, rhs: &Parser) {
    for input in corpus() {
        assert_eq!(observe(lhs, &input), observe(rhs, &input), "on {input:?}");
    }
}

/// A small zoo of value-producing parsers the laws quantify over.
fn subjects() -> Vec<Parser> {
    vec![
        ch('a'),
        string("ab"),
        ch('a').or(ch('b')),
        many(ch('a')).map(|xs| Value::Int(xs.as_list().len() as i64)),
    ]
}

fn identity() -> impl Fn(Value) -> Value {
    |v| v
}

#[test]
fn functor_identity() {
    for p in subjects() {
        assert_equivalent(&p.clone().map(identity()), &p);
    }
}

#[test]
fn functor_composition() {
    let base = item().map(|v| Value::Int(v.as_char() as i64));
    let f = |v: Value| Value::Int(v.as_int() + 1);
    let g = |v: Value| Value::Int(v.as_int() * 2);

    let lhs = base.clone().map(g).map(f);
    let rhs = base.map(move |v| f(g(v)));
    assert_equivalent(&lhs, &rhs);
}

#[test]
fn applicative_identity() {
    for p in subjects() {
        let lhs = pure(Value::func(identity())).ap(p.clone());
        assert_equivalent(&lhs, &p);
    }
}

#[test]
fn applicative_homomorphism() {
    let f = Value::func(|v| Value::Int(v.as_int() + 40));
    let lhs = pure(f).ap(pure(Value::Int(2)));
    let rhs = pure(Value::Int(42));
    assert_equivalent(&lhs, &rhs);
}

#[test]
fn applicative_interchange() {
    let u = ch('a').map(|_| Value::func(|v| Value::Int(v.as_int() * 2)));
    let lhs = u.clone().ap(pure(Value::Int(21)));
    let rhs = pure(Value::func(|f: Value| f.as_func().call(Value::Int(21)))).ap(u);
    assert_equivalent(&lhs, &rhs);
}

fn continuation(v: Value) -> Parser {
    if v.as_int() > 0 { ch('a') } else { ch('b') }
}

#[test]
fn monad_left_identity() {
    let lhs = pure(Value::Int(1)).bind(continuation);
    let rhs = continuation(Value::Int(1));
    assert_equivalent(&lhs, &rhs);
}

#[test]
fn monad_right_identity() {
    for p in subjects() {
        let lhs = p.clone().bind(pure);
        assert_equivalent(&lhs, &p);
    }
}

fn again(v: Value) -> Parser {
    ch(v.as_char())
}

#[test]
fn monad_associativity() {
    let m = ch('a').or(ch('b'));
    let lhs = m.clone().bind(again).bind(again);
    let rhs = m.bind(|x| again(x).bind(again));
    assert_equivalent(&lhs, &rhs);
}

#[test]
fn alternative_left_catch() {
    let lhs = pure(Value::Int(9)).or(ch('a'));
    let rhs = pure(Value::Int(9));
    assert_equivalent(&lhs, &rhs);
}

#[test]
fn alternative_associativity() {
    let (u, v, w) = (string("ab"), ch('a'), ch('b'));
    let lhs = u.clone().or(v.clone()).or(w.clone());
    let rhs = u.or(v.or(w));
    assert_equivalent(&lhs, &rhs);
}

#[test]
fn unlabelled_empty_is_an_identity() {
    for p in subjects() {
        assert_equivalent(&empty().or(p.clone()), &p);
        assert_equivalent(&p.clone().or(empty()), &p);
    }
}
