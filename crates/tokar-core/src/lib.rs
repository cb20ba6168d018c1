//! Core data model for Tokar.
//!
//! This crate contains the pieces shared by the compiler and the machine:
//! - Dynamic values carried on the operand stack (`Value` and its callable
//!   wrappers)
//! - Source positions over code points (`Pos`)
//! - Machine registers (`Reg`)
//! - The user-facing parse error (`ParseError`) and its snippet renderer

mod error;
mod pos;
mod reg;
mod report;
mod value;

#[cfg(test)]
mod error_tests;
#[cfg(test)]
mod value_tests;

pub use error::ParseError;
pub use pos::{Pos, TAB_WIDTH};
pub use reg::{REGISTER_COUNT, Reg};
pub use report::ErrorPrinter;
pub use value::{Func, Func2, Func3, MsgGen, Pred, Value};
