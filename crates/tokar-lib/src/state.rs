//! Register combinators: scoped mutable state threaded through a run.

use tokar_compiler::Parser;
use tokar_core::{Func, Reg, Value};

use crate::combinator::pure;

/// Read the current value of a register.
pub fn get(reg: Reg) -> Parser {
    Parser::get(reg)
}

/// Evaluate `p` and store its result in `reg`; yields `()`.
pub fn put(reg: Reg, p: Parser) -> Parser {
    Parser::put(reg, p)
}

/// Store a constant in `reg`; yields `()`.
pub fn put_value(reg: Reg, x: Value) -> Parser {
    put(reg, pure(x))
}

/// Apply `f` to the register in place; yields `()`.
pub fn modify(reg: Reg, f: impl Fn(Value) -> Value + 'static) -> Parser {
    Parser::modify(reg, Func::new(f))
}

/// Evaluate `init` into `reg`, run `body` with that value in place, and
/// restore the previous value on every exit path, success or failure.
pub fn local(reg: Reg, init: Parser, body: Parser) -> Parser {
    Parser::local(reg, init, body)
}

/// [`local`] with a constant initial value.
pub fn local_value(reg: Reg, x: Value, body: Parser) -> Parser {
    local(reg, pure(x), body)
}
