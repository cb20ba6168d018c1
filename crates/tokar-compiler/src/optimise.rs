//! The optimise pass: algebraic rewriting of the resolved DAG.
//!
//! A bottom-up, memoized, trampolined walk; at each node the fixed rule set
//! is applied to a fixed point, first match wins. Every rewrite strictly
//! reduces a well-founded measure, so a single pass suffices.
//!
//! Rules that run user code at compile time (pure fusion, predicate
//! evaluation, continuation expansion) are disabled on nodes whose `safe`
//! latch was cleared by `impure()`. The iteration guards are not: a loop
//! over a zero-consumption body is a build error either way.

use std::rc::Rc;

use tokar_core::{Func, Value};

use crate::ast::Parser;
use crate::error::CompileError;
use crate::preprocess::{PassCtx, preprocess};
use crate::resolved::{R, RKind, Resolved, rid};

enum Walk {
    Done(R),
    More(Thunk),
}

type Thunk = Box<dyn FnOnce(&mut PassCtx) -> Result<Walk, CompileError>>;
type Cont = Box<dyn FnOnce(R, &mut PassCtx) -> Result<Walk, CompileError>>;

/// Optimise a resolved tree, driving the trampoline to completion.
pub(crate) fn optimise(root: R, ctx: &mut PassCtx) -> Result<R, CompileError> {
    let mut step = enter(root, Box::new(|r, _| Ok(Walk::Done(r))), ctx)?;
    loop {
        match step {
            Walk::Done(r) => return Ok(r),
            Walk::More(thunk) => step = thunk(ctx)?,
        }
    }
}

/// Optimise every shared body; bind expansion may add more as we go.
pub(crate) fn optimise_shared(ctx: &mut PassCtx) -> Result<(), CompileError> {
    let mut i = 0;
    while i < ctx.shared.len() {
        let (&id, body) = ctx.shared.get_index(i).expect("index in range");
        let body = body.clone();
        let optimised = optimise(body, ctx)?;
        ctx.shared.insert(id, optimised);
        i += 1;
    }
    Ok(())
}

fn enter(r: R, k: Cont, ctx: &mut PassCtx) -> Result<Walk, CompileError> {
    if ctx.tick() {
        return Ok(Walk::More(Box::new(move |ctx| walk(r, k, ctx))));
    }
    walk(r, k, ctx)
}

fn resume(k: Cont, r: R, ctx: &mut PassCtx) -> Result<Walk, CompileError> {
    if ctx.tick() {
        return Ok(Walk::More(Box::new(move |ctx| k(r, ctx))));
    }
    k(r, ctx)
}

fn finish(original: &R, kind: RKind, k: Cont, ctx: &mut PassCtx) -> Result<Walk, CompileError> {
    let rebuilt = Resolved::with_safe(kind, original.safe);
    check_loop_guard(&rebuilt)?;
    let result = apply_rules(rebuilt, ctx)?;
    ctx.opt_memo.insert(rid(original), result.clone());
    resume(k, result, ctx)
}

fn opt1(
    original: &R,
    a: R,
    build: Box<dyn FnOnce(R) -> RKind>,
    k: Cont,
    ctx: &mut PassCtx,
) -> Result<Walk, CompileError> {
    let original = original.clone();
    enter(
        a,
        Box::new(move |ra, ctx| finish(&original, build(ra), k, ctx)),
        ctx,
    )
}

fn opt2(
    original: &R,
    a: R,
    b: R,
    build: Box<dyn FnOnce(R, R) -> RKind>,
    k: Cont,
    ctx: &mut PassCtx,
) -> Result<Walk, CompileError> {
    let original = original.clone();
    enter(
        a,
        Box::new(move |ra, ctx| {
            enter(
                b,
                Box::new(move |rb, ctx| finish(&original, build(ra, rb), k, ctx)),
                ctx,
            )
        }),
        ctx,
    )
}

#[allow(clippy::too_many_arguments)]
fn opt3(
    original: &R,
    a: R,
    b: R,
    c: R,
    build: Box<dyn FnOnce(R, R, R) -> RKind>,
    k: Cont,
    ctx: &mut PassCtx,
) -> Result<Walk, CompileError> {
    let original = original.clone();
    enter(
        a,
        Box::new(move |ra, ctx| {
            enter(
                b,
                Box::new(move |rb, ctx| {
                    enter(
                        c,
                        Box::new(move |rc, ctx| finish(&original, build(ra, rb, rc), k, ctx)),
                        ctx,
                    )
                }),
                ctx,
            )
        }),
        ctx,
    )
}

fn walk(r: R, k: Cont, ctx: &mut PassCtx) -> Result<Walk, CompileError> {
    if let Some(hit) = ctx.opt_memo.get(&rid(&r)) {
        let hit = hit.clone();
        return resume(k, hit, ctx);
    }

    match &r.kind {
        RKind::Relabel(..) => panic!("relabel node reached the optimiser"),

        // Leaves rewrite in place.
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
        | RKind::Subroutine { .. } => {
            let result = apply_rules(r.clone(), ctx)?;
            ctx.opt_memo.insert(rid(&r), result.clone());
            resume(k, result, ctx)
        }

        RKind::Apply(a, b) => opt2(&r, a.clone(), b.clone(), Box::new(RKind::Apply), k, ctx),
        RKind::ThenRight(a, b) => {
            opt2(&r, a.clone(), b.clone(), Box::new(RKind::ThenRight), k, ctx)
        }
        RKind::ThenLeft(a, b) => opt2(&r, a.clone(), b.clone(), Box::new(RKind::ThenLeft), k, ctx),
        RKind::Alt(a, b) => opt2(&r, a.clone(), b.clone(), Box::new(RKind::Alt), k, ctx),
        RKind::Bind(a, binder) => {
            let binder = binder.clone();
            opt1(
                &r,
                a.clone(),
                Box::new(move |ra| RKind::Bind(ra, binder)),
                k,
                ctx,
            )
        }
        RKind::Lift2(f, a, b) => {
            let f = f.clone();
            opt2(
                &r,
                a.clone(),
                b.clone(),
                Box::new(move |ra, rb| RKind::Lift2(f, ra, rb)),
                k,
                ctx,
            )
        }
        RKind::Lift3(f, a, b, c) => {
            let f = f.clone();
            opt3(
                &r,
                a.clone(),
                b.clone(),
                c.clone(),
                Box::new(move |ra, rb, rc| RKind::Lift3(f, ra, rb, rc)),
                k,
                ctx,
            )
        }
        RKind::Attempt(a) => opt1(&r, a.clone(), Box::new(RKind::Attempt), k, ctx),
        RKind::LookAhead(a) => opt1(&r, a.clone(), Box::new(RKind::LookAhead), k, ctx),
        RKind::NotFollowedBy { inner, expected } => {
            let expected = expected.clone();
            opt1(
                &r,
                inner.clone(),
                Box::new(move |ra| RKind::NotFollowedBy {
                    inner: ra,
                    expected,
                }),
                k,
                ctx,
            )
        }
        RKind::Ternary(a, b, c) => opt3(
            &r,
            a.clone(),
            b.clone(),
            c.clone(),
            Box::new(RKind::Ternary),
            k,
            ctx,
        ),
        RKind::Many(a) => opt1(&r, a.clone(), Box::new(RKind::Many), k, ctx),
        RKind::SkipMany(a) => opt1(&r, a.clone(), Box::new(RKind::SkipMany), k, ctx),
        RKind::ChainPre { p, op } => opt2(
            &r,
            p.clone(),
            op.clone(),
            Box::new(|ra, rb| RKind::ChainPre { p: ra, op: rb }),
            k,
            ctx,
        ),
        RKind::ChainPost { p, op } => opt2(
            &r,
            p.clone(),
            op.clone(),
            Box::new(|ra, rb| RKind::ChainPost { p: ra, op: rb }),
            k,
            ctx,
        ),
        RKind::ChainLeft { p, op } => opt2(
            &r,
            p.clone(),
            op.clone(),
            Box::new(|ra, rb| RKind::ChainLeft { p: ra, op: rb }),
            k,
            ctx,
        ),
        RKind::ChainRight { p, op } => opt2(
            &r,
            p.clone(),
            op.clone(),
            Box::new(|ra, rb| RKind::ChainRight { p: ra, op: rb }),
            k,
            ctx,
        ),
        RKind::SepEndBy1 { p, sep } => opt2(
            &r,
            p.clone(),
            sep.clone(),
            Box::new(|ra, rb| RKind::SepEndBy1 { p: ra, sep: rb }),
            k,
            ctx,
        ),
        RKind::ManyUntil(a) => opt1(&r, a.clone(), Box::new(RKind::ManyUntil), k, ctx),
        RKind::FastFail(a, msg_of) => {
            let msg_of = msg_of.clone();
            opt1(
                &r,
                a.clone(),
                Box::new(move |ra| RKind::FastFail(ra, msg_of)),
                k,
                ctx,
            )
        }
        RKind::FastUnexpected(a, msg_of) => {
            let msg_of = msg_of.clone();
            opt1(
                &r,
                a.clone(),
                Box::new(move |ra| RKind::FastUnexpected(ra, msg_of)),
                k,
                ctx,
            )
        }
        RKind::Ensure(a, pred) => {
            let pred = pred.clone();
            opt1(
                &r,
                a.clone(),
                Box::new(move |ra| RKind::Ensure(ra, pred)),
                k,
                ctx,
            )
        }
        RKind::Guard(a, pred, msg) => {
            let (pred, msg) = (pred.clone(), msg.clone());
            opt1(
                &r,
                a.clone(),
                Box::new(move |ra| RKind::Guard(ra, pred, msg)),
                k,
                ctx,
            )
        }
        RKind::FastGuard(a, pred, msg_of) => {
            let (pred, msg_of) = (pred.clone(), msg_of.clone());
            opt1(
                &r,
                a.clone(),
                Box::new(move |ra| RKind::FastGuard(ra, pred, msg_of)),
                k,
                ctx,
            )
        }
        RKind::Put(reg, a) => {
            let reg = *reg;
            opt1(
                &r,
                a.clone(),
                Box::new(move |ra| RKind::Put(reg, ra)),
                k,
                ctx,
            )
        }
        RKind::Local { reg, init, body } => {
            let reg = *reg;
            opt2(
                &r,
                init.clone(),
                body.clone(),
                Box::new(move |ra, rb| RKind::Local {
                    reg,
                    init: ra,
                    body: rb,
                }),
                k,
                ctx,
            )
        }
        RKind::Debug { inner, name, pause } => {
            let (name, pause) = (name.clone(), *pause);
            opt1(
                &r,
                inner.clone(),
                Box::new(move |ra| RKind::Debug {
                    inner: ra,
                    name,
                    pause,
                }),
                k,
                ctx,
            )
        }
    }
}

/// Iteration over a body that cannot consume is a build error.
fn check_loop_guard(r: &R) -> Result<(), CompileError> {
    let offender = match &r.kind {
        RKind::Many(body) if body.is_pure_value() => "many",
        RKind::SkipMany(body) if body.is_pure_value() => "skip_many",
        RKind::ChainPre { op, .. } if op.is_pure_value() => "chain_pre",
        RKind::ChainPost { op, .. } if op.is_pure_value() => "chain_post",
        _ => return Ok(()),
    };
    Err(CompileError::NonConsumingLoop {
        combinator: offender,
    })
}

fn apply_rules(cur: R, ctx: &mut PassCtx) -> Result<R, CompileError> {
    if !cur.safe {
        return Ok(cur);
    }
    let mut cur = cur;
    loop {
        match rewrite(&cur, ctx)? {
            Some(next) => cur = next,
            None => return Ok(cur),
        }
    }
}

/// Rebuild-and-locally-optimise, for children freshly created by a rule.
fn shallow(kind: RKind, safe: bool, ctx: &mut PassCtx) -> Result<R, CompileError> {
    apply_rules(Resolved::with_safe(kind, safe), ctx)
}

fn pure_val(r: &R) -> Option<&Value> {
    match &r.kind {
        RKind::Pure(x) => Some(x),
        _ => None,
    }
}

fn pure_func(r: &R) -> Option<Func> {
    match &r.kind {
        RKind::Pure(Value::Func(f)) => Some(f.clone()),
        _ => None,
    }
}

fn unlabeled_char(r: &R) -> Option<char> {
    match &r.kind {
        RKind::CharTok { c, expected: None } => Some(*c),
        _ => None,
    }
}

fn unlabeled_string(r: &R) -> Option<Rc<str>> {
    match &r.kind {
        RKind::StringTok { s, expected: None } => Some(s.clone()),
        _ => None,
    }
}

/// Rebuild an alternation tree as a right-associated chain, dropping
/// unlabelled `Empty` branches and cutting everything behind a `Pure`
/// (which catches unconditionally). Iterative, so arbitrarily deep
/// user-built chains cannot overflow the stack.
fn flatten_alt(root: &R, safe: bool) -> R {
    let mut branches = Vec::new();
    let mut todo = vec![root.clone()];
    while let Some(node) = todo.pop() {
        match &node.kind {
            RKind::Alt(a, b) => {
                todo.push(b.clone());
                todo.push(a.clone());
            }
            _ => branches.push(node),
        }
    }

    let mut pruned: Vec<R> = Vec::new();
    for branch in branches {
        if matches!(branch.kind, RKind::Empty { expected: None }) {
            continue;
        }
        let catches = matches!(branch.kind, RKind::Pure(_));
        pruned.push(branch);
        if catches {
            break;
        }
    }

    pruned
        .into_iter()
        .rev()
        .reduce(|acc, branch| Resolved::with_safe(RKind::Alt(branch, acc), safe))
        .unwrap_or_else(|| Resolved::with_safe(RKind::Empty { expected: None }, safe))
}

/// Expand a compile-time continuation: preprocess the produced parser,
/// register it as a shared body, and refer to it through a fixpoint so the
/// expansion is shared rather than re-optimised without end.
fn expand_continuation(parser: Parser, ctx: &mut PassCtx) -> R {
    let id = parser.id();
    let body = preprocess(&parser, ctx);
    ctx.shared.entry(id).or_insert(body);
    ctx.retained.push(parser);
    Resolved::new(RKind::Fixpoint {
        target: id,
        expected: None,
    })
}

/// One rewrite step; rules are tried in order, first match wins.
#[allow(clippy::type_complexity)]
fn rewrite(cur: &R, ctx: &mut PassCtx) -> Result<Option<R>, CompileError> {
    let safe = cur.safe;
    let rn = |kind| Resolved::with_safe(kind, safe);

    let out = match &cur.kind {
        RKind::Apply(pf, px) => {
            // Homomorphism: pure function applied to a pure argument.
            if let (Some(f), Some(x)) = (pure_func(pf), pure_val(px)) {
                Some(rn(RKind::Pure(f.call(x.clone()))))
            }
            // Right-fusion, two deep: Apply(Apply(Pure f, u), Pure x).
            else if let RKind::Apply(ppf, u) = &pf.kind
                && let (Some(f), Some(x)) = (pure_func(ppf), pure_val(px))
            {
                let x = x.clone();
                let g = Func::new(move |y| f.call(y).as_func().call(x.clone()));
                Some(rn(RKind::Apply(
                    rn(RKind::Pure(Value::Func(g))),
                    u.clone(),
                )))
            }
            // Right-fusion, three deep.
            else if let RKind::Apply(mid, v) = &pf.kind
                && let RKind::Apply(ppf, u) = &mid.kind
                && let (Some(f), Some(x)) = (pure_func(ppf), pure_val(px))
            {
                let x = x.clone();
                let g = Func::new(move |y| {
                    let fy = f.call(y).as_func();
                    let x = x.clone();
                    Value::Func(Func::new(move |z| {
                        fy.call(z).as_func().call(x.clone())
                    }))
                });
                let inner = rn(RKind::Apply(
                    rn(RKind::Pure(Value::Func(g))),
                    u.clone(),
                ));
                Some(rn(RKind::Apply(inner, v.clone())))
            }
            // Functor composition: Pure f <*> (Pure g <*> u).
            else if let Some(f) = pure_func(pf)
                && let RKind::Apply(pg, u) = &px.kind
                && let Some(g) = pure_func(pg)
            {
                let h = Func::compose(&f, &g);
                Some(rn(RKind::Apply(
                    rn(RKind::Pure(Value::Func(h))),
                    u.clone(),
                )))
            }
            // Absorption.
            else if pf.is_mzero() {
                Some(pf.clone())
            } else if px.is_mzero() {
                Some(rn(RKind::ThenRight(pf.clone(), px.clone())))
            }
            // Re-association to expose fusions.
            else if let RKind::ThenRight(q, f) = &pf.kind {
                let inner = shallow(RKind::Apply(f.clone(), px.clone()), safe, ctx)?;
                Some(rn(RKind::ThenRight(q.clone(), inner)))
            } else if let RKind::ThenLeft(x, q) = &px.kind {
                let inner = shallow(RKind::Apply(pf.clone(), x.clone()), safe, ctx)?;
                Some(rn(RKind::ThenLeft(inner, q.clone())))
            } else if let RKind::ThenRight(q, px2) = &px.kind
                && matches!(px2.kind, RKind::Pure(_))
            {
                let inner = shallow(RKind::Apply(pf.clone(), px2.clone()), safe, ctx)?;
                Some(rn(RKind::ThenLeft(inner, q.clone())))
            }
            // Interchange: u <*> Pure x.
            else if let Some(x) = pure_val(px) {
                let x = x.clone();
                let g = Func::new(move |fv| fv.as_func().call(x.clone()));
                Some(rn(RKind::Apply(
                    rn(RKind::Pure(Value::Func(g))),
                    pf.clone(),
                )))
            } else {
                None
            }
        }

        RKind::Alt(p, q) => {
            if matches!(p.kind, RKind::Pure(_)) {
                // Left catch.
                Some(p.clone())
            } else if matches!(p.kind, RKind::Empty { expected: None }) {
                Some(q.clone())
            } else if matches!(q.kind, RKind::Empty { expected: None }) {
                Some(p.clone())
            } else if matches!(p.kind, RKind::Alt(..)) {
                // Full right-association in one iterative step: the code
                // generator's tablifier reads the right spine, so nested
                // alternations on the left must be flattened through.
                Some(flatten_alt(cur, safe))
            } else {
                None
            }
        }

        RKind::ThenRight(p, q) => {
            if matches!(p.kind, RKind::Pure(_)) {
                Some(q.clone())
            } else if p.is_mzero() {
                Some(p.clone())
            }
            // Constant fusion: adjacent char/string tokens collapse into
            // one atomic string token.
            else if let (Some(c), Some(d)) = (unlabeled_char(p), unlabeled_char(q)) {
                let s: Rc<str> = Rc::from(format!("{c}{d}"));
                Some(rn(RKind::ThenRight(
                    rn(RKind::StringTok { s, expected: None }),
                    rn(RKind::Pure(Value::Char(d))),
                )))
            } else if let (Some(c), Some(s)) = (unlabeled_char(p), unlabeled_string(q)) {
                let fused: Rc<str> = Rc::from(format!("{c}{s}"));
                Some(rn(RKind::ThenRight(
                    rn(RKind::StringTok {
                        s: fused,
                        expected: None,
                    }),
                    rn(RKind::Pure(Value::Str(s))),
                )))
            } else if let (Some(s), Some(d)) = (unlabeled_string(p), unlabeled_char(q)) {
                let fused: Rc<str> = Rc::from(format!("{s}{d}"));
                Some(rn(RKind::ThenRight(
                    rn(RKind::StringTok {
                        s: fused,
                        expected: None,
                    }),
                    rn(RKind::Pure(Value::Char(d))),
                )))
            } else if let (Some(s), Some(t)) = (unlabeled_string(p), unlabeled_string(q)) {
                let fused: Rc<str> = Rc::from(format!("{s}{t}"));
                Some(rn(RKind::ThenRight(
                    rn(RKind::StringTok {
                        s: fused,
                        expected: None,
                    }),
                    rn(RKind::Pure(Value::Str(t))),
                )))
            }
            // Normal form: right-associate (plain rebuild, as for Alt).
            else if let RKind::ThenRight(u, v) = &p.kind {
                let right = rn(RKind::ThenRight(v.clone(), q.clone()));
                Some(rn(RKind::ThenRight(u.clone(), right)))
            } else {
                None
            }
        }

        RKind::ThenLeft(p, q) => {
            if matches!(q.kind, RKind::Pure(_)) {
                Some(p.clone())
            } else if p.is_mzero() {
                Some(p.clone())
            } else if q.is_mzero() {
                Some(rn(RKind::ThenRight(p.clone(), q.clone())))
            }
            // Swap a pure result past the consumer on the right.
            else if let Some(x) = pure_val(p) {
                Some(rn(RKind::ThenRight(
                    q.clone(),
                    rn(RKind::Pure(x.clone())),
                )))
            }
            // Constant fusion, keeping the left result.
            else if let (Some(c), Some(d)) = (unlabeled_char(p), unlabeled_char(q)) {
                let s: Rc<str> = Rc::from(format!("{c}{d}"));
                Some(rn(RKind::ThenRight(
                    rn(RKind::StringTok { s, expected: None }),
                    rn(RKind::Pure(Value::Char(c))),
                )))
            } else if let (Some(c), Some(s)) = (unlabeled_char(p), unlabeled_string(q)) {
                let fused: Rc<str> = Rc::from(format!("{c}{s}"));
                Some(rn(RKind::ThenRight(
                    rn(RKind::StringTok {
                        s: fused,
                        expected: None,
                    }),
                    rn(RKind::Pure(Value::Char(c))),
                )))
            } else if let (Some(s), Some(d)) = (unlabeled_string(p), unlabeled_char(q)) {
                let fused: Rc<str> = Rc::from(format!("{s}{d}"));
                Some(rn(RKind::ThenRight(
                    rn(RKind::StringTok {
                        s: fused,
                        expected: None,
                    }),
                    rn(RKind::Pure(Value::Str(s))),
                )))
            } else if let (Some(s), Some(t)) = (unlabeled_string(p), unlabeled_string(q)) {
                let fused: Rc<str> = Rc::from(format!("{s}{t}"));
                Some(rn(RKind::ThenRight(
                    rn(RKind::StringTok {
                        s: fused,
                        expected: None,
                    }),
                    rn(RKind::Pure(Value::Str(s))),
                )))
            }
            // Normal form: left-associate (plain rebuild, as for Alt).
            else if let RKind::ThenLeft(u, v) = &q.kind {
                let left = rn(RKind::ThenLeft(p.clone(), u.clone()));
                Some(rn(RKind::ThenLeft(left, v.clone())))
            } else {
                None
            }
        }

        RKind::Bind(p, binder) => {
            if p.is_mzero() {
                Some(p.clone())
            }
            // Left identity: feed the pure value to the continuation now,
            // sharing the expansion behind a fixpoint.
            else if let Some(x) = pure_val(p) {
                let produced = binder.produce(x.clone());
                Some(expand_continuation(produced, ctx))
            }
            // Constant carriers: the token's result is statically known.
            else if let RKind::CharTok { c, .. } = p.kind {
                let produced = binder.produce(Value::Char(c));
                let fix = expand_continuation(produced, ctx);
                Some(rn(RKind::ThenRight(p.clone(), fix)))
            } else if let RKind::StringTok { ref s, .. } = p.kind {
                let produced = binder.produce(Value::Str(s.clone()));
                let fix = expand_continuation(produced, ctx);
                Some(rn(RKind::ThenRight(p.clone(), fix)))
            }
            // Re-association (plain rebuild; the constant-carrier rules
            // already handled the interesting heads).
            else if let RKind::ThenRight(u, v) = &p.kind {
                let inner = rn(RKind::Bind(v.clone(), binder.clone()));
                Some(rn(RKind::ThenRight(u.clone(), inner)))
            }
            // Associativity.
            else if let RKind::Bind(m, g) = &p.kind {
                let (g, outer) = (g.clone(), binder.clone());
                let composed = crate::ast::Binder::new(move |x| {
                    Parser::bind(g.produce(x), outer.clone())
                });
                Some(rn(RKind::Bind(m.clone(), composed)))
            } else {
                None
            }
        }

        RKind::Ternary(b, p, q) => match pure_val(b) {
            Some(Value::Bool(true)) => Some(p.clone()),
            Some(Value::Bool(false)) => Some(q.clone()),
            _ => None,
        },

        RKind::Ensure(p, pred) => match pure_val(p) {
            Some(x) if pred.test(x) => Some(p.clone()),
            Some(_) => Some(rn(RKind::Empty { expected: None })),
            None => None,
        },

        RKind::Guard(p, pred, msg) => match pure_val(p) {
            Some(x) if pred.test(x) => Some(p.clone()),
            Some(_) => Some(rn(RKind::Fail(msg.clone()))),
            None => None,
        },

        RKind::FastGuard(p, pred, msg_of) => match pure_val(p) {
            Some(x) if pred.test(x) => Some(p.clone()),
            Some(x) => Some(rn(RKind::Fail(Rc::from(msg_of.render(x))))),
            None => None,
        },

        RKind::FastFail(p, msg_of) => pure_val(p)
            .map(|x| rn(RKind::Fail(Rc::from(msg_of.render(x))))),

        RKind::FastUnexpected(p, msg_of) => pure_val(p)
            .map(|x| rn(RKind::Unexpected(Rc::from(msg_of.render(x))))),

        RKind::StringTok { s, expected: None } if s.is_empty() => {
            Some(rn(RKind::Pure(Value::str(""))))
        }

        RKind::Many(body) if body.is_mzero() => {
            Some(rn(RKind::Pure(Value::list(Vec::new()))))
        }
        RKind::SkipMany(body) if body.is_mzero() => Some(rn(RKind::Pure(Value::Unit))),
        RKind::ChainPre { p, op } if op.is_mzero() => Some(p.clone()),
        RKind::ChainPost { p, op } if op.is_mzero() => Some(p.clone()),

        _ => None,
    };
    Ok(out)
}
