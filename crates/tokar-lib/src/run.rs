//! Run entry points.

use tokar_compiler::{CompileError, Parser, compile};
use tokar_core::ParseError;
use tokar_vm::{Parsed, Tracer};

/// Why a run produced no value: the parser failed to build, or the input
/// failed to parse.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RunFailure {
    #[error(transparent)]
    Build(#[from] CompileError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl RunFailure {
    pub fn as_parse(&self) -> Option<&ParseError> {
        match self {
            RunFailure::Parse(err) => Some(err),
            RunFailure::Build(_) => None,
        }
    }

    pub fn as_build(&self) -> Option<&CompileError> {
        match self {
            RunFailure::Build(err) => Some(err),
            RunFailure::Parse(_) => None,
        }
    }
}

/// Compile (cached on the parser) and run against an input.
///
/// Success does not require the whole input to be consumed; sequence with
/// [`eof`](crate::eof) for that.
pub fn run(parser: &Parser, input: &str) -> Result<Parsed, RunFailure> {
    let program = compile(parser)?;
    Ok(tokar_vm::run(program, input)?)
}

/// [`run`] with a tracer receiving dispatch and log-point callbacks.
pub fn run_with_tracer(
    parser: &Parser,
    input: &str,
    tracer: &mut dyn Tracer,
) -> Result<Parsed, RunFailure> {
    let program = compile(parser)?;
    Ok(tokar_vm::run_with_tracer(program, input, tracer)?)
}
