//! Tracing seam for machine execution.
//!
//! The tracer is a zero-cost abstraction: every method has an empty default
//! body, so [`NoopTracer`] compiles away entirely. [`PrintTracer`] renders
//! execution to stderr at a chosen verbosity; the `debug` combinator's
//! `LogBegin`/`LogEnd` instructions report through the same trait with a
//! snapshot of the machine.

use tokar_bytecode::Instr;
use tokar_core::{Pos, Value};

/// How much the print tracer shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Log points and recovery only.
    #[default]
    Default,
    /// Every instruction dispatched.
    Verbose,
}

/// Snapshot of the machine handed to log points.
pub struct MachineView<'m> {
    pub pc: usize,
    pub pos: Pos,
    pub input_index: usize,
    /// The next few code points of input.
    pub window: String,
    pub stack: &'m [Value],
    pub handler_depth: usize,
    pub call_depth: usize,
}

/// Machine execution instrumentation.
///
/// All methods receive raw data the machine already has; formatting happens
/// in the implementation.
pub trait Tracer {
    /// Called before each instruction is dispatched.
    fn step(&mut self, pc: usize, instr: &Instr) {
        let _ = (pc, instr);
    }

    /// Called when a handler fires and the machine rewinds.
    fn recover(&mut self, pc: usize) {
        let _ = pc;
    }

    /// Called by `LogBegin`.
    fn log_begin(&mut self, name: &str, view: &MachineView<'_>) {
        let _ = (name, view);
    }

    /// Called by `LogEnd`.
    fn log_end(&mut self, name: &str, view: &MachineView<'_>) {
        let _ = (name, view);
    }

    /// Called at a log point whose breakpoint flag is set.
    fn pause(&mut self, name: &str, view: &MachineView<'_>) {
        let _ = (name, view);
    }
}

/// The default tracer; all hooks optimize away.
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// Renders execution to stderr.
pub struct PrintTracer {
    verbosity: Verbosity,
    depth: usize,
}

impl PrintTracer {
    pub fn new(verbosity: Verbosity) -> PrintTracer {
        PrintTracer {
            verbosity,
            depth: 0,
        }
    }

    fn indent(&self) -> String {
        "  ".repeat(self.depth)
    }
}

impl Default for PrintTracer {
    fn default() -> Self {
        Self::new(Verbosity::Default)
    }
}

impl Tracer for PrintTracer {
    fn step(&mut self, pc: usize, instr: &Instr) {
        if self.verbosity == Verbosity::Verbose {
            eprintln!("{}[{pc}] {instr:?}", self.indent());
        }
    }

    fn recover(&mut self, pc: usize) {
        eprintln!("{}! recover -> {pc}", self.indent());
    }

    fn log_begin(&mut self, name: &str, view: &MachineView<'_>) {
        eprintln!(
            "{}> {name} @ {} (input {:?}, stack {})",
            self.indent(),
            view.pos,
            view.window,
            view.stack.len()
        );
        self.depth += 1;
    }

    fn log_end(&mut self, name: &str, view: &MachineView<'_>) {
        self.depth = self.depth.saturating_sub(1);
        eprintln!(
            "{}< {name} @ {} (input {:?}, stack {})",
            self.indent(),
            view.pos,
            view.window,
            view.stack.len()
        );
    }

    fn pause(&mut self, name: &str, view: &MachineView<'_>) {
        eprintln!("{}* paused at {name} ({}:{})", self.indent(), view.pos.line, view.pos.col);
    }
}
