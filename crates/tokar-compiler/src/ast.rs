//! The lazy parser AST built by user code.
//!
//! A [`Parser`] is a cheap handle (`Rc`) around a node. Nodes are compared
//! and memoized by physical identity; recursion enters through
//! [`Parser::lazy`] or [`Parser::recursive`], whose thunks the preprocess
//! pass forces exactly once. A recursive grammar necessarily ties an
//! ownership knot at this layer; the resolved form produced by preprocess
//! breaks it by referring to back-edge targets by identity only.

use std::cell::OnceCell;
use std::fmt;
use std::mem;
use std::rc::Rc;

use tokar_bytecode::Program;
use tokar_core::{Func, Func2, Func3, MsgGen, Pred, Reg, Value};

/// Physical identity of a node, used as a map key by every pass.
pub(crate) type NodeId = usize;

/// Pause points honoured by the debug tracer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Breakpoint {
    None,
    Entry,
    Exit,
    Both,
}

impl Breakpoint {
    pub(crate) fn on_entry(self) -> bool {
        matches!(self, Breakpoint::Entry | Breakpoint::Both)
    }

    pub(crate) fn on_exit(self) -> bool {
        matches!(self, Breakpoint::Exit | Breakpoint::Both)
    }
}

/// Monadic continuation: maps a parsed value to the next parser.
#[derive(Clone)]
pub struct Binder(Rc<dyn Fn(Value) -> Parser>);

impl Binder {
    pub fn new(f: impl Fn(Value) -> Parser + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn produce(&self, x: Value) -> Parser {
        (self.0)(x)
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<binder>")
    }
}

#[derive(Clone)]
pub(crate) struct LazyThunk {
    thunk: Rc<dyn Fn() -> Parser>,
    forced: Rc<OnceCell<Parser>>,
}

impl LazyThunk {
    pub(crate) fn force(&self) -> Parser {
        self.forced.get_or_init(|| (self.thunk)()).clone()
    }
}

impl fmt::Debug for LazyThunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<lazy>")
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Kind {
    // Pure producers
    Pure(Value),
    Line,
    Col,
    Get(Reg),
    Modify(Reg, Func),

    // Primitive consumers and token leaves
    CharTok(char),
    StringTok(Rc<str>),
    Satisfy(Pred),
    Eof,
    Keyword(Rc<str>),
    Operator(Rc<str>),
    StringLiteral { raw: bool },

    // Sequencing
    Apply(Parser, Parser),
    ThenRight(Parser, Parser),
    ThenLeft(Parser, Parser),
    Bind(Parser, Binder),
    Lift2(Func2, Parser, Parser),
    Lift3(Func3, Parser, Parser, Parser),

    // Choice
    Alt(Parser, Parser),
    Attempt(Parser),
    LookAhead(Parser),
    NotFollowedBy(Parser),
    Ternary(Parser, Parser, Parser),

    // Iteration
    Many(Parser),
    SkipMany(Parser),
    ChainPre { p: Parser, op: Parser },
    ChainPost { p: Parser, op: Parser },
    ChainLeft { p: Parser, op: Parser },
    ChainRight { p: Parser, op: Parser },
    SepEndBy1 { p: Parser, sep: Parser },
    ManyUntil(Parser),

    // Failure
    Empty,
    Fail(Rc<str>),
    Unexpected(Rc<str>),
    FastFail(Parser, MsgGen),
    FastUnexpected(Parser, MsgGen),

    // Filtering
    Ensure(Parser, Pred),
    Guard(Parser, Pred, Rc<str>),
    FastGuard(Parser, Pred, MsgGen),

    // State
    Put(Reg, Parser),
    Local { reg: Reg, init: Parser, body: Parser },

    // Meta
    Relabel(Parser, Rc<str>),
    Subroutine(Parser),
    Debug { inner: Parser, name: Rc<str>, pause: Breakpoint },
    Lazy(LazyThunk),
}

pub(crate) struct Node {
    pub(crate) kind: Kind,
    pub(crate) safe: bool,
    compiled: OnceCell<Rc<Program>>,
}

/// Handle to a parser node.
#[derive(Clone)]
pub struct Parser {
    pub(crate) node: Rc<Node>,
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parser({:?})", self.node.kind)
    }
}

impl Parser {
    fn new(kind: Kind) -> Parser {
        Parser {
            node: Rc::new(Node {
                kind,
                safe: true,
                compiled: OnceCell::new(),
            }),
        }
    }

    pub(crate) fn id(&self) -> NodeId {
        Rc::as_ptr(&self.node) as NodeId
    }

    pub(crate) fn kind(&self) -> &Kind {
        &self.node.kind
    }

    pub(crate) fn cached_program(&self) -> Option<Rc<Program>> {
        self.node.compiled.get().cloned()
    }

    pub(crate) fn cache_program(&self, program: Rc<Program>) -> Rc<Program> {
        self.node.compiled.get_or_init(|| program).clone()
    }

    /// Clears the pure-optimisation latch: the optimiser will not evaluate
    /// user functions reachable from this node at compile time.
    pub fn impure(&self) -> Parser {
        Parser {
            node: Rc::new(Node {
                kind: self.node.kind.clone(),
                safe: false,
                compiled: OnceCell::new(),
            }),
        }
    }

    // --- constructors -----------------------------------------------------

    pub fn pure(x: Value) -> Parser {
        Parser::new(Kind::Pure(x))
    }

    pub fn empty() -> Parser {
        Parser::new(Kind::Empty)
    }

    pub fn fail(msg: Rc<str>) -> Parser {
        Parser::new(Kind::Fail(msg))
    }

    pub fn unexpected(msg: Rc<str>) -> Parser {
        Parser::new(Kind::Unexpected(msg))
    }

    pub fn char_tok(c: char) -> Parser {
        Parser::new(Kind::CharTok(c))
    }

    pub fn string_tok(s: Rc<str>) -> Parser {
        Parser::new(Kind::StringTok(s))
    }

    pub fn satisfy(pred: Pred) -> Parser {
        Parser::new(Kind::Satisfy(pred))
    }

    pub fn eof() -> Parser {
        Parser::new(Kind::Eof)
    }

    pub fn line() -> Parser {
        Parser::new(Kind::Line)
    }

    pub fn col() -> Parser {
        Parser::new(Kind::Col)
    }

    pub fn keyword(s: Rc<str>) -> Parser {
        Parser::new(Kind::Keyword(s))
    }

    pub fn operator(s: Rc<str>) -> Parser {
        Parser::new(Kind::Operator(s))
    }

    pub fn string_literal(raw: bool) -> Parser {
        Parser::new(Kind::StringLiteral { raw })
    }

    pub fn apply(pf: Parser, px: Parser) -> Parser {
        Parser::new(Kind::Apply(pf, px))
    }

    pub fn then_right(p: Parser, q: Parser) -> Parser {
        Parser::new(Kind::ThenRight(p, q))
    }

    pub fn then_left(p: Parser, q: Parser) -> Parser {
        Parser::new(Kind::ThenLeft(p, q))
    }

    pub fn bind(p: Parser, k: Binder) -> Parser {
        Parser::new(Kind::Bind(p, k))
    }

    pub fn lift2(f: Func2, p: Parser, q: Parser) -> Parser {
        Parser::new(Kind::Lift2(f, p, q))
    }

    pub fn lift3(f: Func3, p: Parser, q: Parser, r: Parser) -> Parser {
        Parser::new(Kind::Lift3(f, p, q, r))
    }

    pub fn alt(p: Parser, q: Parser) -> Parser {
        Parser::new(Kind::Alt(p, q))
    }

    pub fn attempt(p: Parser) -> Parser {
        Parser::new(Kind::Attempt(p))
    }

    pub fn look_ahead(p: Parser) -> Parser {
        Parser::new(Kind::LookAhead(p))
    }

    pub fn not_followed_by(p: Parser) -> Parser {
        Parser::new(Kind::NotFollowedBy(p))
    }

    pub fn ternary(b: Parser, p: Parser, q: Parser) -> Parser {
        Parser::new(Kind::Ternary(b, p, q))
    }

    pub fn many(p: Parser) -> Parser {
        Parser::new(Kind::Many(p))
    }

    pub fn skip_many(p: Parser) -> Parser {
        Parser::new(Kind::SkipMany(p))
    }

    pub fn chain_pre(p: Parser, op: Parser) -> Parser {
        Parser::new(Kind::ChainPre { p, op })
    }

    pub fn chain_post(p: Parser, op: Parser) -> Parser {
        Parser::new(Kind::ChainPost { p, op })
    }

    pub fn chain_left(p: Parser, op: Parser) -> Parser {
        Parser::new(Kind::ChainLeft { p, op })
    }

    pub fn chain_right(p: Parser, op: Parser) -> Parser {
        Parser::new(Kind::ChainRight { p, op })
    }

    pub fn sep_end_by1(p: Parser, sep: Parser) -> Parser {
        Parser::new(Kind::SepEndBy1 { p, sep })
    }

    pub fn many_until(body: Parser) -> Parser {
        Parser::new(Kind::ManyUntil(body))
    }

    pub fn fast_fail(p: Parser, msg_of: MsgGen) -> Parser {
        Parser::new(Kind::FastFail(p, msg_of))
    }

    pub fn fast_unexpected(p: Parser, msg_of: MsgGen) -> Parser {
        Parser::new(Kind::FastUnexpected(p, msg_of))
    }

    pub fn ensure(p: Parser, pred: Pred) -> Parser {
        Parser::new(Kind::Ensure(p, pred))
    }

    pub fn guard(p: Parser, pred: Pred, msg: Rc<str>) -> Parser {
        Parser::new(Kind::Guard(p, pred, msg))
    }

    pub fn fast_guard(p: Parser, pred: Pred, msg_of: MsgGen) -> Parser {
        Parser::new(Kind::FastGuard(p, pred, msg_of))
    }

    pub fn get(reg: Reg) -> Parser {
        Parser::new(Kind::Get(reg))
    }

    pub fn modify(reg: Reg, f: Func) -> Parser {
        Parser::new(Kind::Modify(reg, f))
    }

    pub fn put(reg: Reg, p: Parser) -> Parser {
        Parser::new(Kind::Put(reg, p))
    }

    pub fn local(reg: Reg, init: Parser, body: Parser) -> Parser {
        Parser::new(Kind::Local { reg, init, body })
    }

    /// Attach an expected-set label; lowered into descendants by preprocess.
    pub fn label(p: Parser, msg: Rc<str>) -> Parser {
        Parser::new(Kind::Relabel(p, msg))
    }

    /// Explicit code sharing: all call sites of one subroutine node share a
    /// single compiled body.
    pub fn subroutine(p: Parser) -> Parser {
        Parser::new(Kind::Subroutine(p))
    }

    pub fn debug(p: Parser, name: Rc<str>, pause: Breakpoint) -> Parser {
        Parser::new(Kind::Debug {
            inner: p,
            name,
            pause,
        })
    }

    /// Defer construction of a parser; the thunk is forced once, by
    /// preprocess.
    pub fn lazy(thunk: impl Fn() -> Parser + 'static) -> Parser {
        Parser::new(Kind::Lazy(LazyThunk {
            thunk: Rc::new(thunk),
            forced: Rc::new(OnceCell::new()),
        }))
    }

    /// Tie a recursive knot: `f` receives a handle to the parser being
    /// defined and returns its body.
    pub fn recursive(f: impl FnOnce(Parser) -> Parser) -> Parser {
        let slot: Rc<OnceCell<Parser>> = Rc::new(OnceCell::new());
        let hook = slot.clone();
        let proxy = Parser::lazy(move || {
            hook.get()
                .expect("recursive parser forced before its definition completed")
                .clone()
        });
        let body = f(proxy);
        slot.set(body.clone())
            .unwrap_or_else(|_| panic!("recursive slot initialized twice"));
        body
    }
}

impl Kind {
    /// Move direct child handles out, used by the iterative drop below.
    fn into_children(self, sink: &mut Vec<Parser>) {
        match self {
            Kind::Pure(_)
            | Kind::Line
            | Kind::Col
            | Kind::Get(_)
            | Kind::Modify(..)
            | Kind::CharTok(_)
            | Kind::StringTok(_)
            | Kind::Satisfy(_)
            | Kind::Eof
            | Kind::Keyword(_)
            | Kind::Operator(_)
            | Kind::StringLiteral { .. }
            | Kind::Empty
            | Kind::Fail(_)
            | Kind::Unexpected(_) => {}

            Kind::Apply(a, b)
            | Kind::ThenRight(a, b)
            | Kind::ThenLeft(a, b)
            | Kind::Alt(a, b)
            | Kind::Lift2(_, a, b)
            | Kind::ChainPre { p: a, op: b }
            | Kind::ChainPost { p: a, op: b }
            | Kind::ChainLeft { p: a, op: b }
            | Kind::ChainRight { p: a, op: b }
            | Kind::SepEndBy1 { p: a, sep: b } => {
                sink.push(a);
                sink.push(b);
            }

            Kind::Lift3(_, a, b, c) | Kind::Ternary(a, b, c) => {
                sink.push(a);
                sink.push(b);
                sink.push(c);
            }

            Kind::Local { init, body, .. } => {
                sink.push(init);
                sink.push(body);
            }

            Kind::Bind(a, _)
            | Kind::Attempt(a)
            | Kind::LookAhead(a)
            | Kind::NotFollowedBy(a)
            | Kind::Many(a)
            | Kind::SkipMany(a)
            | Kind::ManyUntil(a)
            | Kind::FastFail(a, _)
            | Kind::FastUnexpected(a, _)
            | Kind::Ensure(a, _)
            | Kind::Guard(a, _, _)
            | Kind::FastGuard(a, _, _)
            | Kind::Put(_, a)
            | Kind::Relabel(a, _)
            | Kind::Subroutine(a)
            | Kind::Debug { inner: a, .. } => sink.push(a),

            Kind::Lazy(lazy) => {
                let LazyThunk { thunk, forced } = lazy;
                drop(thunk);
                if let Some(cell) = Rc::into_inner(forced)
                    && let Some(p) = cell.into_inner()
                {
                    sink.push(p);
                }
            }
        }
    }
}

// Deep user chains must not overflow the stack when the AST drops.
impl Drop for Node {
    fn drop(&mut self) {
        let mut stack = vec![mem::replace(&mut self.kind, Kind::Empty)];
        let mut children = Vec::new();
        while let Some(kind) = stack.pop() {
            kind.into_children(&mut children);
            for child in children.drain(..) {
                let Parser { node } = child;
                if let Some(mut inner) = Rc::into_inner(node) {
                    stack.push(mem::replace(&mut inner.kind, Kind::Empty));
                }
            }
        }
    }
}
