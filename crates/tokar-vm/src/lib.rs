//! Stack machine executing compiled Tokar programs.
//!
//! Single-threaded, synchronous, deterministic: a program counter walks the
//! frozen instruction array, mutating the value stack, the handler stack
//! (backtracking recovery points), the call stack, the four registers, and
//! the input cursor. A run ends with a parsed value or a positioned
//! [`ParseError`](tokar_core::ParseError).

mod machine;
mod trace;


pub use machine::{Parsed, run, run_with_tracer};
pub use trace::{MachineView, NoopTracer, PrintTracer, Tracer, Verbosity};
