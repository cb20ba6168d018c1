//! Parser AST, optimiser, and code generator for Tokar.
//!
//! The pipeline: user code builds a lazy [`Parser`] AST; `preprocess`
//! resolves child thunks, detects recursion back-edges, and lowers error
//! labels; `optimise` rewrites the resolved DAG by the algebraic rule set;
//! `codegen` emits a flat instruction buffer with label pseudo-instructions;
//! `resolve` flattens labels to absolute offsets and applies the final
//! peephole. The frozen [`Program`](tokar_bytecode::Program) is cached on
//! the root node.

mod ast;
mod codegen;
mod error;
mod optimise;
mod preprocess;
mod resolved;
mod resolve;

#[cfg(test)]
mod codegen_tests;
#[cfg(test)]
mod optimise_tests;
#[cfg(test)]
mod preprocess_tests;

use std::rc::Rc;

use tokar_bytecode::Program;

pub use ast::{Binder, Breakpoint, Parser};
pub use error::CompileError;

/// Compile a parser, caching the frozen program on its root node.
pub fn compile(parser: &Parser) -> Result<Rc<Program>, CompileError> {
    if let Some(program) = parser.cached_program() {
        return Ok(program);
    }
    let program = compile_uncached(parser)?;
    Ok(parser.cache_program(program))
}

fn compile_uncached(parser: &Parser) -> Result<Rc<Program>, CompileError> {
    let mut ctx = preprocess::PassCtx::new();
    let root = preprocess::preprocess(parser, &mut ctx);
    let root = optimise::optimise(root, &mut ctx)?;
    optimise::optimise_shared(&mut ctx)?;
    let buffer = codegen::emit(&root, &ctx);
    Ok(Rc::new(resolve::resolve(buffer)))
}
