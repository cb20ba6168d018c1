//! The resolved AST produced by preprocess.
//!
//! A DAG of `Rc`-shared nodes: every child slot is populated, every
//! back-edge is a [`RKind::Fixpoint`] referring to its target by identity,
//! and expected-set labels sit on the leaves that carry them. The
//! [`RKind::Relabel`] variant exists only so the later passes can assert it
//! never reaches them.

use std::mem;
use std::rc::Rc;

use tokar_bytecode::Expected;
use tokar_core::{Func, Func2, Func3, MsgGen, Pred, Reg, Value};

use crate::ast::{Binder, Breakpoint, NodeId};

pub(crate) type R = Rc<Resolved>;

/// Physical identity of a resolved node, the memo key of the optimise pass.
pub(crate) fn rid(r: &R) -> usize {
    Rc::as_ptr(r) as usize
}

pub(crate) struct Resolved {
    pub(crate) kind: RKind,
    pub(crate) safe: bool,
}

impl Resolved {
    pub(crate) fn new(kind: RKind) -> R {
        Rc::new(Resolved { kind, safe: true })
    }

    pub(crate) fn with_safe(kind: RKind, safe: bool) -> R {
        Rc::new(Resolved { kind, safe })
    }

    /// The failure subset: parsers that can never produce a value.
    pub(crate) fn is_mzero(&self) -> bool {
        matches!(
            self.kind,
            RKind::Empty { .. }
                | RKind::Fail(_)
                | RKind::Unexpected(_)
                | RKind::FastFail(..)
                | RKind::FastUnexpected(..)
        )
    }

    /// Zero-consumption value producers, ill-formed as loop bodies.
    pub(crate) fn is_pure_value(&self) -> bool {
        matches!(
            self.kind,
            RKind::Pure(_) | RKind::Line | RKind::Col | RKind::Get(_)
        )
    }
}

#[derive(Debug)]
pub(crate) enum RKind {
    Pure(Value),
    Line,
    Col,
    Get(Reg),
    Modify(Reg, Func),

    CharTok { c: char, expected: Expected },
    StringTok { s: Rc<str>, expected: Expected },
    Satisfy { pred: Pred, expected: Expected },
    Eof { expected: Expected },
    Keyword { s: Rc<str>, expected: Expected },
    Operator { s: Rc<str>, expected: Expected },
    StringLiteral { raw: bool, expected: Expected },

    Apply(R, R),
    ThenRight(R, R),
    ThenLeft(R, R),
    Bind(R, Binder),
    Lift2(Func2, R, R),
    Lift3(Func3, R, R, R),

    Alt(R, R),
    Attempt(R),
    LookAhead(R),
    NotFollowedBy { inner: R, expected: Expected },
    Ternary(R, R, R),

    Many(R),
    SkipMany(R),
    ChainPre { p: R, op: R },
    ChainPost { p: R, op: R },
    ChainLeft { p: R, op: R },
    ChainRight { p: R, op: R },
    SepEndBy1 { p: R, sep: R },
    ManyUntil(R),

    Empty { expected: Expected },
    Fail(Rc<str>),
    Unexpected(Rc<str>),
    FastFail(R, MsgGen),
    FastUnexpected(R, MsgGen),

    Ensure(R, Pred),
    Guard(R, Pred, Rc<str>),
    FastGuard(R, Pred, MsgGen),

    Put(Reg, R),
    Local { reg: Reg, init: R, body: R },

    /// Call to a shared body, introduced at a recursion back-edge.
    Fixpoint { target: NodeId, expected: Expected },
    /// Call to a shared body, requested explicitly by user code.
    Subroutine { target: NodeId, expected: Expected },

    Debug { inner: R, name: Rc<str>, pause: Breakpoint },

    /// Never produced by preprocess; optimise and codegen panic on it.
    Relabel(R, Rc<str>),
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}

impl RKind {
    fn into_children(self, sink: &mut Vec<R>) {
        match self {
            RKind::Pure(_)
            | RKind::Line
            | RKind::Col
            | RKind::Get(_)
            | RKind::Modify(..)
            | RKind::CharTok { .. }
            | RKind::StringTok { .. }
            | RKind::Satisfy { .. }
            | RKind::Eof { .. }
            | RKind::Keyword { .. }
            | RKind::Operator { .. }
            | RKind::StringLiteral { .. }
            | RKind::Empty { .. }
            | RKind::Fail(_)
            | RKind::Unexpected(_)
            | RKind::Fixpoint { .. }
            | RKind::Subroutine { .. } => {}

            RKind::Apply(a, b)
            | RKind::ThenRight(a, b)
            | RKind::ThenLeft(a, b)
            | RKind::Alt(a, b)
            | RKind::Lift2(_, a, b)
            | RKind::ChainPre { p: a, op: b }
            | RKind::ChainPost { p: a, op: b }
            | RKind::ChainLeft { p: a, op: b }
            | RKind::ChainRight { p: a, op: b }
            | RKind::SepEndBy1 { p: a, sep: b }
            | RKind::Local { init: a, body: b, .. } => {
                sink.push(a);
                sink.push(b);
            }

            RKind::Lift3(_, a, b, c) | RKind::Ternary(a, b, c) => {
                sink.push(a);
                sink.push(b);
                sink.push(c);
            }

            RKind::Bind(a, _)
            | RKind::Attempt(a)
            | RKind::LookAhead(a)
            | RKind::NotFollowedBy { inner: a, .. }
            | RKind::Many(a)
            | RKind::SkipMany(a)
            | RKind::ManyUntil(a)
            | RKind::FastFail(a, _)
            | RKind::FastUnexpected(a, _)
            | RKind::Ensure(a, _)
            | RKind::Guard(a, _, _)
            | RKind::FastGuard(a, _, _)
            | RKind::Put(_, a)
            | RKind::Debug { inner: a, .. }
            | RKind::Relabel(a, _) => sink.push(a),
        }
    }
}

// Same discipline as the lazy AST: deep chains drop iteratively.
impl Drop for Resolved {
    fn drop(&mut self) {
        let mut stack = vec![mem::replace(&mut self.kind, RKind::Empty { expected: None })];
        let mut children = Vec::new();
        while let Some(kind) = stack.pop() {
            kind.into_children(&mut children);
            for child in children.drain(..) {
                if let Some(mut inner) = Rc::into_inner(child) {
                    stack.push(mem::replace(
                        &mut inner.kind,
                        RKind::Empty { expected: None },
                    ));
                }
            }
        }
    }
}
