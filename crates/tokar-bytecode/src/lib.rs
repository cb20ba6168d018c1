//! Instruction set and frozen programs for the Tokar machine.
//!
//! This crate defines:
//! - The flat instruction family executed by the machine (`Instr`)
//! - The frozen instruction array with its stateful-position index
//!   (`Program`), including snapshots for overlapping runs and the
//!   drain/reinstate discipline used by call frames
//! - A human-readable program dump

mod dump;
mod instr;
mod program;

#[cfg(test)]
mod program_tests;

pub use dump::dump;
pub use instr::{Addr, BindGen, Expected, Instr, InstrState, IterStop};
pub use program::Program;
