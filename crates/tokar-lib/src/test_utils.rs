use tokar_core::ParseError;

use crate::{Parser, RunFailure, Value, run};

pub(crate) fn value_of(p: &Parser, input: &str) -> Value {
    run(p, input).expect("parse failed").value
}

pub(crate) fn consumed(p: &Parser, input: &str) -> usize {
    run(p, input).expect("parse failed").consumed
}

pub(crate) fn parse_err(p: &Parser, input: &str) -> ParseError {
    match run(p, input) {
        Ok(parsed) => panic!("expected failure, parsed {:?}", parsed.value),
        Err(RunFailure::Parse(err)) => err,
        Err(RunFailure::Build(err)) => panic!("expected parse failure, got build error {err}"),
    }
}

pub(crate) fn ints(items: &[i64]) -> Value {
    Value::list(items.iter().map(|&n| Value::Int(n)).collect())
}

pub(crate) fn chars(items: &str) -> Value {
    Value::list(items.chars().map(Value::Char).collect())
}
