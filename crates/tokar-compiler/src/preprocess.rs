//! The preprocess pass: lazy AST to resolved DAG.
//!
//! A bottom-up, continuation-passing, trampolined walk that
//! - forces every lazy thunk exactly once,
//! - replaces a node re-entered while on the walk path with a
//!   [`RKind::Fixpoint`] referring to it by identity,
//! - lowers an ambient expected-set label from `Relabel` nodes into the
//!   leaves that carry an `expected` field.
//!
//! Results are memoized by node identity, but only when no ambient label is
//! in force; this preserves DAG sharing across repeated references while
//! still letting labels produce distinct leaf clones.
//!
//! The trampoline bounds native stack use: every logical recursion (both
//! the downward walk and continuation application) passes a fuel gate that
//! trips every [`BOUNCE_DEPTH`] levels and reifies the rest of the walk as
//! a thunk for the driver loop.

use indexmap::{IndexMap, IndexSet};

use tokar_bytecode::Expected;

use crate::ast::{Kind, NodeId, Parser};
use crate::resolved::{R, RKind, Resolved};

pub(crate) const BOUNCE_DEPTH: u32 = 2;

/// Shared state for preprocess, optimise, and codegen.
pub(crate) struct PassCtx {
    /// Label-free resolutions, keyed by lazy-node identity.
    memo: IndexMap<NodeId, R>,
    /// Every completed resolution (latest wins), for shared-body lookup.
    completed: IndexMap<NodeId, R>,
    /// Nodes currently on the walk path.
    in_progress: IndexSet<NodeId>,
    /// Back-edge and subroutine targets awaiting their bodies.
    requested: IndexSet<NodeId>,
    /// Bodies referenced by `Fixpoint`/`Subroutine` call sites.
    pub(crate) shared: IndexMap<NodeId, R>,
    /// Optimise memo, keyed by resolved-node identity.
    pub(crate) opt_memo: IndexMap<usize, R>,
    /// Parsers created during optimise (bind expansion); held so the node
    /// addresses backing the identity keys stay live.
    pub(crate) retained: Vec<Parser>,
    fuel: u32,
}

impl PassCtx {
    pub(crate) fn new() -> PassCtx {
        PassCtx {
            memo: IndexMap::new(),
            completed: IndexMap::new(),
            in_progress: IndexSet::new(),
            requested: IndexSet::new(),
            shared: IndexMap::new(),
            opt_memo: IndexMap::new(),
            retained: Vec::new(),
            fuel: BOUNCE_DEPTH,
        }
    }

    /// Fuel gate; true when the walk should bounce off the native stack.
    pub(crate) fn tick(&mut self) -> bool {
        self.fuel -= 1;
        if self.fuel == 0 {
            self.fuel = BOUNCE_DEPTH;
            true
        } else {
            false
        }
    }

    fn collect_shared(&mut self) {
        let requested = std::mem::take(&mut self.requested);
        for id in requested {
            let body = self
                .completed
                .get(&id)
                .expect("back-edge target never completed")
                .clone();
            self.shared.entry(id).or_insert(body);
        }
    }
}

enum Walk {
    Done(R),
    More(Thunk),
}

type Thunk = Box<dyn FnOnce(&mut PassCtx) -> Walk>;
type Cont = Box<dyn FnOnce(R, &mut PassCtx) -> Walk>;

/// Resolve a parser, driving the trampoline to completion.
pub(crate) fn preprocess(root: &Parser, ctx: &mut PassCtx) -> R {
    let mut step = enter(root.clone(), None, Box::new(|r, _| Walk::Done(r)), ctx);
    let result = loop {
        match step {
            Walk::Done(r) => break r,
            Walk::More(thunk) => step = thunk(ctx),
        }
    };
    ctx.collect_shared();
    result
}

fn enter(p: Parser, label: Expected, k: Cont, ctx: &mut PassCtx) -> Walk {
    if ctx.tick() {
        return Walk::More(Box::new(move |ctx| walk(p, label, k, ctx)));
    }
    walk(p, label, k, ctx)
}

fn resume(k: Cont, r: R, ctx: &mut PassCtx) -> Walk {
    if ctx.tick() {
        return Walk::More(Box::new(move |ctx| k(r, ctx)));
    }
    k(r, ctx)
}

fn finish(
    id: NodeId,
    memoable: bool,
    safe: bool,
    kind: RKind,
    k: Cont,
    ctx: &mut PassCtx,
) -> Walk {
    let r = Resolved::with_safe(kind, safe);
    ctx.in_progress.swap_remove(&id);
    ctx.completed.insert(id, r.clone());
    if memoable {
        ctx.memo.insert(id, r.clone());
    }
    resume(k, r, ctx)
}

/// Continuation that adopts the child's result as this node's own.
fn forward_finish(id: NodeId, memoable: bool, k: Cont) -> Cont {
    Box::new(move |r, ctx| {
        ctx.in_progress.swap_remove(&id);
        ctx.completed.insert(id, r.clone());
        if memoable {
            ctx.memo.insert(id, r.clone());
        }
        resume(k, r, ctx)
    })
}

fn walk1(
    a: Parser,
    label: Expected,
    build: Box<dyn FnOnce(R) -> RKind>,
    id: NodeId,
    memoable: bool,
    safe: bool,
    k: Cont,
    ctx: &mut PassCtx,
) -> Walk {
    enter(
        a,
        label,
        Box::new(move |ra, ctx| finish(id, memoable, safe, build(ra), k, ctx)),
        ctx,
    )
}

#[allow(clippy::too_many_arguments)]
fn walk2(
    a: Parser,
    b: Parser,
    label: Expected,
    build: Box<dyn FnOnce(R, R) -> RKind>,
    id: NodeId,
    memoable: bool,
    safe: bool,
    k: Cont,
    ctx: &mut PassCtx,
) -> Walk {
    let lbl = label.clone();
    enter(
        a,
        label,
        Box::new(move |ra, ctx| {
            enter(
                b,
                lbl,
                Box::new(move |rb, ctx| finish(id, memoable, safe, build(ra, rb), k, ctx)),
                ctx,
            )
        }),
        ctx,
    )
}

#[allow(clippy::too_many_arguments)]
fn walk3(
    a: Parser,
    b: Parser,
    c: Parser,
    label: Expected,
    build: Box<dyn FnOnce(R, R, R) -> RKind>,
    id: NodeId,
    memoable: bool,
    safe: bool,
    k: Cont,
    ctx: &mut PassCtx,
) -> Walk {
    let lbl_b = label.clone();
    let lbl_c = label.clone();
    enter(
        a,
        label,
        Box::new(move |ra, ctx| {
            enter(
                b,
                lbl_b,
                Box::new(move |rb, ctx| {
                    enter(
                        c,
                        lbl_c,
                        Box::new(move |rc, ctx| {
                            finish(id, memoable, safe, build(ra, rb, rc), k, ctx)
                        }),
                        ctx,
                    )
                }),
                ctx,
            )
        }),
        ctx,
    )
}

fn walk(p: Parser, label: Expected, k: Cont, ctx: &mut PassCtx) -> Walk {
    let id = p.id();

    if ctx.in_progress.contains(&id) {
        ctx.requested.insert(id);
        let r = Resolved::with_safe(
            RKind::Fixpoint {
                target: id,
                expected: label,
            },
            true,
        );
        return resume(k, r, ctx);
    }

    if label.is_none()
        && let Some(r) = ctx.memo.get(&id)
    {
        let r = r.clone();
        return resume(k, r, ctx);
    }

    // Relabel is transparent: its child is walked under the new ambient
    // label and the child's resolution stands in for the node.
    if let Kind::Relabel(inner, msg) = p.kind() {
        let (inner, msg) = (inner.clone(), msg.clone());
        return enter(inner, Some(msg), k, ctx);
    }

    let safe = p.node.safe;
    let memoable = label.is_none();
    ctx.in_progress.insert(id);

    match p.kind() {
        Kind::Relabel(..) => unreachable!("relabel handled above"),

        // Leaves without an expected slot drop the ambient label.
        Kind::Pure(x) => finish(id, memoable, safe, RKind::Pure(x.clone()), k, ctx),
        Kind::Line => finish(id, memoable, safe, RKind::Line, k, ctx),
        Kind::Col => finish(id, memoable, safe, RKind::Col, k, ctx),
        Kind::Get(reg) => finish(id, memoable, safe, RKind::Get(*reg), k, ctx),
        Kind::Modify(reg, f) => finish(id, memoable, safe, RKind::Modify(*reg, f.clone()), k, ctx),
        Kind::Fail(msg) => finish(id, memoable, safe, RKind::Fail(msg.clone()), k, ctx),
        Kind::Unexpected(msg) => {
            finish(id, memoable, safe, RKind::Unexpected(msg.clone()), k, ctx)
        }

        // Expected-bearing leaves absorb the ambient label.
        Kind::CharTok(c) => {
            let kind = RKind::CharTok {
                c: *c,
                expected: label,
            };
            finish(id, memoable, safe, kind, k, ctx)
        }
        Kind::StringTok(s) => {
            let kind = RKind::StringTok {
                s: s.clone(),
                expected: label,
            };
            finish(id, memoable, safe, kind, k, ctx)
        }
        Kind::Satisfy(pred) => {
            let kind = RKind::Satisfy {
                pred: pred.clone(),
                expected: label,
            };
            finish(id, memoable, safe, kind, k, ctx)
        }
        Kind::Eof => finish(id, memoable, safe, RKind::Eof { expected: label }, k, ctx),
        Kind::Keyword(s) => {
            let kind = RKind::Keyword {
                s: s.clone(),
                expected: label,
            };
            finish(id, memoable, safe, kind, k, ctx)
        }
        Kind::Operator(s) => {
            let kind = RKind::Operator {
                s: s.clone(),
                expected: label,
            };
            finish(id, memoable, safe, kind, k, ctx)
        }
        Kind::StringLiteral { raw } => {
            let kind = RKind::StringLiteral {
                raw: *raw,
                expected: label,
            };
            finish(id, memoable, safe, kind, k, ctx)
        }
        Kind::Empty => finish(id, memoable, safe, RKind::Empty { expected: label }, k, ctx),

        // Composites forward the ambient label into their children.
        Kind::Apply(a, b) => walk2(
            a.clone(),
            b.clone(),
            label,
            Box::new(RKind::Apply),
            id,
            memoable,
            safe,
            k,
            ctx,
        ),
        Kind::ThenRight(a, b) => walk2(
            a.clone(),
            b.clone(),
            label,
            Box::new(RKind::ThenRight),
            id,
            memoable,
            safe,
            k,
            ctx,
        ),
        Kind::ThenLeft(a, b) => walk2(
            a.clone(),
            b.clone(),
            label,
            Box::new(RKind::ThenLeft),
            id,
            memoable,
            safe,
            k,
            ctx,
        ),
        Kind::Alt(a, b) => walk2(
            a.clone(),
            b.clone(),
            label,
            Box::new(RKind::Alt),
            id,
            memoable,
            safe,
            k,
            ctx,
        ),
        Kind::Lift2(f, a, b) => {
            let f = f.clone();
            walk2(
                a.clone(),
                b.clone(),
                label,
                Box::new(move |ra, rb| RKind::Lift2(f, ra, rb)),
                id,
                memoable,
                safe,
                k,
                ctx,
            )
        }
        Kind::Lift3(f, a, b, c) => {
            let f = f.clone();
            walk3(
                a.clone(),
                b.clone(),
                c.clone(),
                label,
                Box::new(move |ra, rb, rc| RKind::Lift3(f, ra, rb, rc)),
                id,
                memoable,
                safe,
                k,
                ctx,
            )
        }
        Kind::Bind(a, binder) => {
            let binder = binder.clone();
            walk1(
                a.clone(),
                label,
                Box::new(move |ra| RKind::Bind(ra, binder)),
                id,
                memoable,
                safe,
                k,
                ctx,
            )
        }
        Kind::Attempt(a) => walk1(
            a.clone(),
            label,
            Box::new(RKind::Attempt),
            id,
            memoable,
            safe,
            k,
            ctx,
        ),
        Kind::LookAhead(a) => walk1(
            a.clone(),
            label,
            Box::new(RKind::LookAhead),
            id,
            memoable,
            safe,
            k,
            ctx,
        ),
        Kind::NotFollowedBy(a) => {
            // Expected-bearing composite: the label stops here.
            let expected = label;
            walk1(
                a.clone(),
                None,
                Box::new(move |ra| RKind::NotFollowedBy {
                    inner: ra,
                    expected,
                }),
                id,
                memoable,
                safe,
                k,
                ctx,
            )
        }
        Kind::Ternary(a, b, c) => walk3(
            a.clone(),
            b.clone(),
            c.clone(),
            label,
            Box::new(RKind::Ternary),
            id,
            memoable,
            safe,
            k,
            ctx,
        ),
        Kind::Many(a) => walk1(
            a.clone(),
            label,
            Box::new(RKind::Many),
            id,
            memoable,
            safe,
            k,
            ctx,
        ),
        Kind::SkipMany(a) => walk1(
            a.clone(),
            label,
            Box::new(RKind::SkipMany),
            id,
            memoable,
            safe,
            k,
            ctx,
        ),
        Kind::ChainPre { p: a, op: b } => walk2(
            a.clone(),
            b.clone(),
            label,
            Box::new(|ra, rb| RKind::ChainPre { p: ra, op: rb }),
            id,
            memoable,
            safe,
            k,
            ctx,
        ),
        Kind::ChainPost { p: a, op: b } => walk2(
            a.clone(),
            b.clone(),
            label,
            Box::new(|ra, rb| RKind::ChainPost { p: ra, op: rb }),
            id,
            memoable,
            safe,
            k,
            ctx,
        ),
        Kind::ChainLeft { p: a, op: b } => walk2(
            a.clone(),
            b.clone(),
            label,
            Box::new(|ra, rb| RKind::ChainLeft { p: ra, op: rb }),
            id,
            memoable,
            safe,
            k,
            ctx,
        ),
        Kind::ChainRight { p: a, op: b } => walk2(
            a.clone(),
            b.clone(),
            label,
            Box::new(|ra, rb| RKind::ChainRight { p: ra, op: rb }),
            id,
            memoable,
            safe,
            k,
            ctx,
        ),
        Kind::SepEndBy1 { p: a, sep: b } => walk2(
            a.clone(),
            b.clone(),
            label,
            Box::new(|ra, rb| RKind::SepEndBy1 { p: ra, sep: rb }),
            id,
            memoable,
            safe,
            k,
            ctx,
        ),
        Kind::ManyUntil(a) => walk1(
            a.clone(),
            label,
            Box::new(RKind::ManyUntil),
            id,
            memoable,
            safe,
            k,
            ctx,
        ),
        Kind::FastFail(a, msg_of) => {
            let msg_of = msg_of.clone();
            walk1(
                a.clone(),
                label,
                Box::new(move |ra| RKind::FastFail(ra, msg_of)),
                id,
                memoable,
                safe,
                k,
                ctx,
            )
        }
        Kind::FastUnexpected(a, msg_of) => {
            let msg_of = msg_of.clone();
            walk1(
                a.clone(),
                label,
                Box::new(move |ra| RKind::FastUnexpected(ra, msg_of)),
                id,
                memoable,
                safe,
                k,
                ctx,
            )
        }
        Kind::Ensure(a, pred) => {
            let pred = pred.clone();
            walk1(
                a.clone(),
                label,
                Box::new(move |ra| RKind::Ensure(ra, pred)),
                id,
                memoable,
                safe,
                k,
                ctx,
            )
        }
        Kind::Guard(a, pred, msg) => {
            let (pred, msg) = (pred.clone(), msg.clone());
            walk1(
                a.clone(),
                label,
                Box::new(move |ra| RKind::Guard(ra, pred, msg)),
                id,
                memoable,
                safe,
                k,
                ctx,
            )
        }
        Kind::FastGuard(a, pred, msg_of) => {
            let (pred, msg_of) = (pred.clone(), msg_of.clone());
            walk1(
                a.clone(),
                label,
                Box::new(move |ra| RKind::FastGuard(ra, pred, msg_of)),
                id,
                memoable,
                safe,
                k,
                ctx,
            )
        }
        Kind::Put(reg, a) => {
            let reg = *reg;
            walk1(
                a.clone(),
                label,
                Box::new(move |ra| RKind::Put(reg, ra)),
                id,
                memoable,
                safe,
                k,
                ctx,
            )
        }
        Kind::Local { reg, init, body } => {
            let reg = *reg;
            walk2(
                init.clone(),
                body.clone(),
                label,
                Box::new(move |ra, rb| RKind::Local {
                    reg,
                    init: ra,
                    body: rb,
                }),
                id,
                memoable,
                safe,
                k,
                ctx,
            )
        }
        Kind::Subroutine(inner) => {
            // The body is shared across call sites, so it resolves
            // label-free; an ambient label applies at the call site.
            let target = inner.id();
            ctx.requested.insert(target);
            let expected = label;
            walk1(
                inner.clone(),
                None,
                Box::new(move |_| RKind::Subroutine { target, expected }),
                id,
                memoable,
                safe,
                k,
                ctx,
            )
        }
        Kind::Debug { inner, name, pause } => {
            let (name, pause) = (name.clone(), *pause);
            walk1(
                inner.clone(),
                label,
                Box::new(move |ra| RKind::Debug {
                    inner: ra,
                    name,
                    pause,
                }),
                id,
                memoable,
                safe,
                k,
                ctx,
            )
        }
        Kind::Lazy(lazy) => {
            let inner = lazy.force();
            enter(inner, label, forward_finish(id, memoable, k), ctx)
        }
    }
}
