//! Embedded parser combinators compiled to bytecode.
//!
//! Parsers are composed as values, compiled once through an
//! algebraic-law-driven optimiser into a flat instruction stream, and
//! executed by a stack machine. The result of a run is a dynamic
//! [`Value`] or a positioned [`ParseError`] carrying an expected set.
//!
//! ```
//! use tokar_lib::{ch, many, run, Value};
//!
//! let p = many(ch('a'));
//! let parsed = run(&p, "aaab").unwrap();
//! assert_eq!(parsed.consumed, 3);
//! assert_eq!(
//!     parsed.value,
//!     Value::list(vec![Value::Char('a'), Value::Char('a'), Value::Char('a')]),
//! );
//! ```

mod combinator;
mod run;
mod state;
mod token;

#[cfg(test)]
mod test_utils;

#[cfg(test)]
mod debug_tests;
#[cfg(test)]
mod laws_tests;
#[cfg(test)]
mod recursion_tests;
#[cfg(test)]
mod scenarios_tests;
#[cfg(test)]
mod state_tests;
#[cfg(test)]
mod token_tests;

pub use combinator::{
    ParserExt, attempt, ch, chain_post, chain_pre, chainl1, chainr1, col, empty, eof, fail,
    if_else, item, join, label, lazy, lift2, lift3, line, look_ahead, many, many_until,
    not_followed_by, parser_value, pos, pure, recursive, satisfy, sep_end_by1, sequence,
    skip_many, string, traverse, unexpected,
};
pub use run::{RunFailure, run, run_with_tracer};
pub use state::{get, local, local_value, modify, put, put_value};
pub use token::{keyword, operator, raw_string_literal, string_literal};

pub use tokar_compiler::{Breakpoint, CompileError, Parser};
pub use tokar_core::{ErrorPrinter, Func, ParseError, Pos, Reg, Value};
pub use tokar_vm::{MachineView, NoopTracer, Parsed, PrintTracer, Tracer, Verbosity};
