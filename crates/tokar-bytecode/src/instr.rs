//! The machine's instruction family.
//!
//! Instructions are runtime-friendly tagged values addressed by index.
//! Jump-bearing instructions carry an [`Addr`] that holds a label id while
//! the generator is running and an absolute offset once labels resolve.
//!
//! A handful of loop instructions carry their accumulator in a `RefCell`;
//! these are the *stateful* instructions. Their positions are indexed by the
//! surrounding [`Program`](crate::Program) so that snapshots and call frames
//! can swap the state out and back in.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use tokar_core::{Func, Func2, Func3, MsgGen, Pred, Reg, Value};

use crate::program::Program;

/// Label id before resolution, absolute instruction offset after.
pub type Addr = u32;

/// Expected-set label carried by failing instructions. `None` means the
/// instruction reports its default description.
pub type Expected = Option<Rc<str>>;

/// Sentinel pushed by a loop body to terminate a `ManyUntil` iteration.
#[derive(Debug, PartialEq, Eq)]
pub struct IterStop;

/// Compiles a continuation parser at runtime for `DynCall`.
///
/// The wrapped closure owns the whole compile pipeline (and its memo of
/// already-compiled continuations); the machine only executes the result.
#[derive(Clone)]
pub struct BindGen(Rc<dyn Fn(Value) -> Rc<Program>>);

impl BindGen {
    pub fn new(f: impl Fn(Value) -> Rc<Program> + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn produce(&self, x: Value) -> Rc<Program> {
        (self.0)(x)
    }
}

impl fmt::Debug for BindGen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<bind>")
    }
}

/// Drained contents of a stateful instruction.
///
/// Call frames hold these while a callee activation runs so that recursive
/// activations of one loop instruction cannot interleave accumulators.
#[derive(Debug)]
pub enum InstrState {
    Values(Vec<Value>),
    Funcs(Vec<Func>),
    Pairs(Vec<(Value, Value)>),
}

#[derive(Clone, Debug)]
pub enum Instr {
    /// Pseudo-instruction removed by label resolution.
    Label(Addr),

    // Stack manipulation
    Push(Value),
    Pop,
    Apply,
    Perform(Func),
    Exchange(Value),
    Lift2(Func2),
    Lift3(Func3),

    // Primitive consumers and position readers
    CharTok { c: char, expected: Expected },
    StringTok { s: Rc<str>, expected: Expected },
    Satisfies { pred: Pred, expected: Expected },
    Eof { expected: Expected },
    Line,
    Col,

    // Fused consumer forms
    CharTokFastPerform { c: char, f: Func, expected: Expected },
    StringTokFastPerform { s: Rc<str>, f: Func, expected: Expected },
    CharTokExchange { c: char, x: Value, expected: Expected },
    StringTokExchange { s: Rc<str>, x: Value, expected: Expected },
    SatisfiesExchange { pred: Pred, x: Value, expected: Expected },

    // Token-layer leaves
    TokenKeyword { s: Rc<str>, expected: Expected },
    TokenOperator { s: Rc<str>, expected: Expected },
    TokenStringLiteral { raw: bool, expected: Expected },

    // Failure
    Empty { expected: Expected },
    Fail { msg: Rc<str> },
    Unexpected { msg: Rc<str> },
    FastFail { msg_of: MsgGen },
    FastUnexpected { msg_of: MsgGen },

    // Filtering
    Ensure { pred: Pred, expected: Expected },
    Guard { pred: Pred, msg: Rc<str> },
    FastGuard { pred: Pred, msg_of: MsgGen },

    // Control flow and recovery
    Jump(Addr),
    JumpGood(Addr),
    JumpGoodAttempt(Addr),
    PushHandler(Addr),
    InputCheck(Addr),
    UpdateCheck,
    Catch,
    Attempt,
    LookAhead,
    NotFollowedBy { expected: Expected },
    RecoverWith(Value),
    AlwaysRecoverWith(Value),
    If { orelse: Addr },
    JumpTable {
        table: IndexMap<char, Addr>,
        default: Addr,
        catch: Addr,
        expected: Vec<Rc<str>>,
    },

    // Iteration
    Many { body: Addr, acc: RefCell<Vec<Value>> },
    SkipMany { body: Addr },
    ChainPre { body: Addr, acc: RefCell<Vec<Func>> },
    ChainPost { body: Addr },
    ChainLeft { body: Addr },
    ChainRight { body: Addr, acc: RefCell<Vec<(Value, Value)>> },
    SepEndBy1 { body: Addr, acc: RefCell<Vec<Value>> },
    ManyUntil { body: Addr, acc: RefCell<Vec<Value>> },

    // Calls
    Call { target: Addr, expected: Expected },
    Return,
    DynCall { bind: BindGen },

    // Registers
    Get(Reg),
    Put(Reg),
    Modify { reg: Reg, f: Func },
    LocalEntry(Reg),
    LocalExit(Reg),

    // Debug seam
    LogBegin { name: Rc<str>, pause: bool },
    LogEnd { name: Rc<str>, pause: bool },
}

impl Instr {
    /// Whether this instruction carries per-run mutable state.
    pub fn is_stateful(&self) -> bool {
        matches!(
            self,
            Instr::Many { .. }
                | Instr::ChainPre { .. }
                | Instr::ChainRight { .. }
                | Instr::SepEndBy1 { .. }
                | Instr::ManyUntil { .. }
        )
    }

    /// Drain the accumulator, leaving it empty.
    ///
    /// Panics on stateless instructions; callers go through the program's
    /// stateful-position index.
    pub fn save_state(&self) -> InstrState {
        match self {
            Instr::Many { acc, .. }
            | Instr::SepEndBy1 { acc, .. }
            | Instr::ManyUntil { acc, .. } => InstrState::Values(acc.take()),
            Instr::ChainPre { acc, .. } => InstrState::Funcs(acc.take()),
            Instr::ChainRight { acc, .. } => InstrState::Pairs(acc.take()),
            other => panic!("save_state on stateless instruction {other:?}"),
        }
    }

    /// Reinstate a previously drained accumulator.
    pub fn restore_state(&self, state: InstrState) {
        match (self, state) {
            (Instr::Many { acc, .. }, InstrState::Values(values))
            | (Instr::SepEndBy1 { acc, .. }, InstrState::Values(values))
            | (Instr::ManyUntil { acc, .. }, InstrState::Values(values)) => {
                *acc.borrow_mut() = values;
            }
            (Instr::ChainPre { acc, .. }, InstrState::Funcs(funcs)) => {
                *acc.borrow_mut() = funcs;
            }
            (Instr::ChainRight { acc, .. }, InstrState::Pairs(pairs)) => {
                *acc.borrow_mut() = pairs;
            }
            (instr, state) => panic!("restore_state mismatch: {instr:?} given {state:?}"),
        }
    }

    /// Copy of this instruction with empty per-run state.
    pub fn fresh(&self) -> Instr {
        match self {
            Instr::Many { body, .. } => Instr::Many {
                body: *body,
                acc: RefCell::new(Vec::new()),
            },
            Instr::ChainPre { body, .. } => Instr::ChainPre {
                body: *body,
                acc: RefCell::new(Vec::new()),
            },
            Instr::ChainRight { body, .. } => Instr::ChainRight {
                body: *body,
                acc: RefCell::new(Vec::new()),
            },
            Instr::SepEndBy1 { body, .. } => Instr::SepEndBy1 {
                body: *body,
                acc: RefCell::new(Vec::new()),
            },
            Instr::ManyUntil { body, .. } => Instr::ManyUntil {
                body: *body,
                acc: RefCell::new(Vec::new()),
            },
            other => other.clone(),
        }
    }

    /// Apply `fix` to every jump target this instruction carries.
    ///
    /// Label resolution uses this to rewrite label ids into absolute
    /// offsets in one sweep.
    pub fn rewrite_targets(&mut self, mut fix: impl FnMut(Addr) -> Addr) {
        match self {
            Instr::Jump(t)
            | Instr::JumpGood(t)
            | Instr::JumpGoodAttempt(t)
            | Instr::PushHandler(t)
            | Instr::InputCheck(t)
            | Instr::Call { target: t, .. } => *t = fix(*t),
            Instr::If { orelse } => *orelse = fix(*orelse),
            Instr::Many { body, .. }
            | Instr::SkipMany { body }
            | Instr::ChainPre { body, .. }
            | Instr::ChainPost { body }
            | Instr::ChainLeft { body }
            | Instr::ChainRight { body, .. }
            | Instr::SepEndBy1 { body, .. }
            | Instr::ManyUntil { body, .. } => *body = fix(*body),
            Instr::JumpTable {
                table,
                default,
                catch,
                ..
            } => {
                for target in table.values_mut() {
                    *target = fix(*target);
                }
                *default = fix(*default);
                *catch = fix(*catch);
            }
            _ => {}
        }
    }
}
