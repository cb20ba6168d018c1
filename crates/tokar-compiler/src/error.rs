//! Build-time failures.

/// Errors detected while compiling a parser, as opposed to parse failures
/// reported at run time.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// An iteration combinator was given a body that consumes no input and
    /// so would loop forever.
    #[error("{combinator} applied to a parser that consumes no input")]
    NonConsumingLoop { combinator: &'static str },
}
