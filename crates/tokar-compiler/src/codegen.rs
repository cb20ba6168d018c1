//! Code generation: resolved DAG to instruction buffer.
//!
//! A top-down, continuation-passing, trampolined emission pass. Each node
//! knows the instructions it needs; where the shape allows, it fuses with a
//! neighbour (char/string fast-performs and exchanges, `Perform` instead of
//! `Push`+`Apply`). Alternations collect their right spine and, when at
//! least two branches lead with known, pairwise-distinct characters, emit a
//! jump table keyed on the first input character.
//!
//! Shared bodies (fixpoints and subroutines) are queued by target identity
//! and emitted behind the main program as a callable suffix, each closed by
//! `Return`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use tokar_bytecode::{Addr, BindGen, Instr, Program};
use tokar_core::Value;

use crate::ast::{Binder, NodeId, Parser};
use crate::preprocess::{BOUNCE_DEPTH, PassCtx};
use crate::resolved::{R, RKind, Resolved};

struct GenCtx {
    buf: Vec<Instr>,
    next_label: Addr,
    sub_labels: IndexMap<NodeId, Addr>,
    queue: Vec<NodeId>,
    shared: IndexMap<NodeId, R>,
    fuel: u32,
}

impl GenCtx {
    fn fresh(&mut self) -> Addr {
        let label = self.next_label;
        self.next_label += 1;
        label
    }

    fn sub_label(&mut self, target: NodeId) -> Addr {
        if let Some(&label) = self.sub_labels.get(&target) {
            return label;
        }
        let label = self.fresh();
        self.sub_labels.insert(target, label);
        self.queue.push(target);
        label
    }

    fn tick(&mut self) -> bool {
        self.fuel -= 1;
        if self.fuel == 0 {
            self.fuel = BOUNCE_DEPTH;
            true
        } else {
            false
        }
    }
}

enum Walk {
    Done,
    More(Thunk),
}

type Thunk = Box<dyn FnOnce(&mut GenCtx) -> Walk>;
type Cont = Box<dyn FnOnce(&mut GenCtx) -> Walk>;

/// Emit the whole program: main code, then the subroutine suffix.
pub(crate) fn emit(root: &R, ctx: &PassCtx) -> Vec<Instr> {
    let mut g = GenCtx {
        buf: Vec::new(),
        next_label: 0,
        sub_labels: IndexMap::new(),
        queue: Vec::new(),
        shared: ctx.shared.clone(),
        fuel: BOUNCE_DEPTH,
    };

    drive(root.clone(), &mut g);

    if !g.queue.is_empty() {
        let end = g.fresh();
        g.buf.push(Instr::Jump(end));
        let mut i = 0;
        while i < g.queue.len() {
            let id = g.queue[i];
            let label = g.sub_labels[&id];
            g.buf.push(Instr::Label(label));
            let body = g
                .shared
                .get(&id)
                .expect("missing shared body for call target")
                .clone();
            drive(body, &mut g);
            g.buf.push(Instr::Return);
            i += 1;
        }
        g.buf.push(Instr::Label(end));
    }

    g.buf
}

fn drive(r: R, g: &mut GenCtx) {
    let mut step = enter(r, Box::new(|_| Walk::Done), g);
    while let Walk::More(thunk) = step {
        step = thunk(g);
    }
}

fn enter(r: R, k: Cont, g: &mut GenCtx) -> Walk {
    if g.tick() {
        return Walk::More(Box::new(move |g| walk(r, k, g)));
    }
    walk(r, k, g)
}

fn resume(k: Cont, g: &mut GenCtx) -> Walk {
    if g.tick() {
        return Walk::More(Box::new(move |g| k(g)));
    }
    k(g)
}

/// Compile monadic continuations lazily, memoized by produced-parser
/// identity (the parser is retained alongside so the key stays live).
fn make_bindgen(binder: Binder) -> BindGen {
    let memo: RefCell<HashMap<NodeId, (Parser, Rc<Program>)>> = RefCell::new(HashMap::new());
    BindGen::new(move |x| {
        let parser = binder.produce(x);
        let id = parser.id();
        if let Some((_, program)) = memo.borrow().get(&id) {
            return program.clone();
        }
        let program = crate::compile(&parser).expect("monadic continuation failed to compile");
        memo.borrow_mut().insert(id, (parser, program.clone()));
        program
    })
}

/// The right spine of an alternation.
fn collect_spine(r: &R) -> Vec<R> {
    let mut spine = Vec::new();
    let mut cur = r.clone();
    loop {
        let next = match &cur.kind {
            RKind::Alt(a, b) => {
                spine.push(a.clone());
                b.clone()
            }
            _ => {
                spine.push(cur.clone());
                break;
            }
        };
        cur = next;
    }
    spine
}

/// The leading token of a branch, found by a purity-preserving walk, with
/// its expected label.
fn leading(r: &R) -> Option<(char, Rc<str>)> {
    let mut cur = r.clone();
    loop {
        let next = match &cur.kind {
            RKind::CharTok { c, expected } => {
                let label = expected
                    .clone()
                    .unwrap_or_else(|| Rc::from(format!("{c:?}")));
                return Some((*c, label));
            }
            RKind::StringTok { s, expected } => {
                let c = s.chars().next()?;
                let label = expected
                    .clone()
                    .unwrap_or_else(|| Rc::from(format!("\"{s}\"")));
                return Some((c, label));
            }
            RKind::Keyword { s, expected } => {
                let c = s.chars().next()?;
                return Some((c, expected.clone().unwrap_or_else(|| s.clone())));
            }
            RKind::Operator { s, expected } => {
                let c = s.chars().next()?;
                return Some((c, expected.clone().unwrap_or_else(|| s.clone())));
            }
            RKind::StringLiteral { expected, .. } => {
                return Some((
                    '"',
                    expected.clone().unwrap_or_else(|| Rc::from("string")),
                ));
            }
            RKind::Attempt(p) => p.clone(),
            RKind::Apply(pf, px) => {
                if matches!(pf.kind, RKind::Pure(_)) {
                    px.clone()
                } else {
                    pf.clone()
                }
            }
            RKind::Lift2(_, p, _) => p.clone(),
            RKind::Lift3(_, p, _, _) => p.clone(),
            RKind::ThenRight(p, _) | RKind::ThenLeft(p, _) => p.clone(),
            _ => return None,
        };
        cur = next;
    }
}

/// Remaining branches as a plain alternation; `Empty` when none are left.
fn fold_alt(rest: &[R]) -> R {
    rest.iter()
        .rev()
        .cloned()
        .reduce(|acc, branch| Resolved::new(RKind::Alt(branch, acc)))
        .unwrap_or_else(|| Resolved::new(RKind::Empty { expected: None }))
}

fn gen_branches(branches: Vec<(Addr, R)>, idx: usize, exit: Addr, k: Cont, g: &mut GenCtx) -> Walk {
    if idx == branches.len() {
        g.buf.push(Instr::Label(exit));
        return resume(k, g);
    }
    let (label, body) = branches[idx].clone();
    g.buf.push(Instr::Label(label));
    enter(
        body,
        Box::new(move |g| {
            g.buf.push(Instr::JumpGood(exit));
            gen_branches(branches, idx + 1, exit, k, g)
        }),
        g,
    )
}

fn gen_alt(r: &R, p: &R, q: &R, k: Cont, g: &mut GenCtx) -> Walk {
    let spine = collect_spine(r);

    // Tablification: the longest prefix with known, pairwise-distinct leads.
    let mut leads: IndexMap<char, ()> = IndexMap::new();
    let mut labels: Vec<Rc<str>> = Vec::new();
    for branch in &spine {
        match leading(branch) {
            Some((c, label)) if !leads.contains_key(&c) => {
                leads.insert(c, ());
                labels.push(label);
            }
            _ => break,
        }
    }

    if leads.len() >= 2 {
        let prefix = leads.len();
        let catch_l = g.fresh();
        let default_l = g.fresh();
        let exit = g.fresh();
        let branch_labels: Vec<Addr> = (0..prefix).map(|_| g.fresh()).collect();
        let table: IndexMap<char, Addr> = leads
            .keys()
            .zip(branch_labels.iter())
            .map(|(c, l)| (*c, *l))
            .collect();

        g.buf.push(Instr::JumpTable {
            table,
            default: default_l,
            catch: catch_l,
            expected: labels,
        });
        g.buf.push(Instr::Label(catch_l));
        g.buf.push(Instr::Catch);
        g.buf.push(Instr::Label(default_l));

        let default_node = fold_alt(&spine[prefix..]);
        let branches: Vec<(Addr, R)> = branch_labels
            .iter()
            .zip(spine[..prefix].iter())
            .map(|(l, b)| (*l, b.clone()))
            .collect();
        return enter(
            default_node,
            Box::new(move |g| {
                g.buf.push(Instr::Jump(exit));
                gen_branches(branches, 0, exit, k, g)
            }),
            g,
        );
    }

    // Plain alternation shapes.
    match (&p.kind, &q.kind) {
        (RKind::Attempt(u), RKind::Pure(x)) => {
            let h = g.fresh();
            g.buf.push(Instr::PushHandler(h));
            let (u, x) = (u.clone(), x.clone());
            enter(
                u,
                Box::new(move |g| {
                    g.buf.push(Instr::Label(h));
                    g.buf.push(Instr::AlwaysRecoverWith(x));
                    resume(k, g)
                }),
                g,
            )
        }
        (RKind::Attempt(u), _) => {
            let h = g.fresh();
            let s = g.fresh();
            g.buf.push(Instr::PushHandler(h));
            let (u, q) = (u.clone(), q.clone());
            enter(
                u,
                Box::new(move |g| {
                    g.buf.push(Instr::Label(h));
                    g.buf.push(Instr::JumpGoodAttempt(s));
                    enter(
                        q,
                        Box::new(move |g| {
                            g.buf.push(Instr::Label(s));
                            resume(k, g)
                        }),
                        g,
                    )
                }),
                g,
            )
        }
        (_, RKind::Pure(x)) => {
            let h = g.fresh();
            g.buf.push(Instr::InputCheck(h));
            let (p, x) = (p.clone(), x.clone());
            enter(
                p,
                Box::new(move |g| {
                    g.buf.push(Instr::Label(h));
                    g.buf.push(Instr::RecoverWith(x));
                    resume(k, g)
                }),
                g,
            )
        }
        _ => {
            let h = g.fresh();
            let s = g.fresh();
            g.buf.push(Instr::InputCheck(h));
            let (p, q) = (p.clone(), q.clone());
            enter(
                p,
                Box::new(move |g| {
                    g.buf.push(Instr::JumpGood(s));
                    g.buf.push(Instr::Label(h));
                    g.buf.push(Instr::Catch);
                    enter(
                        q,
                        Box::new(move |g| {
                            g.buf.push(Instr::Label(s));
                            resume(k, g)
                        }),
                        g,
                    )
                }),
                g,
            )
        }
    }
}

fn walk(r: R, k: Cont, g: &mut GenCtx) -> Walk {
    match &r.kind {
        RKind::Relabel(..) => panic!("relabel node reached code generation"),

        RKind::Pure(x) => {
            g.buf.push(Instr::Push(x.clone()));
            resume(k, g)
        }
        RKind::Line => {
            g.buf.push(Instr::Line);
            resume(k, g)
        }
        RKind::Col => {
            g.buf.push(Instr::Col);
            resume(k, g)
        }
        RKind::Get(reg) => {
            g.buf.push(Instr::Get(*reg));
            resume(k, g)
        }
        RKind::Modify(reg, f) => {
            g.buf.push(Instr::Modify {
                reg: *reg,
                f: f.clone(),
            });
            resume(k, g)
        }

        RKind::CharTok { c, expected } => {
            g.buf.push(Instr::CharTok {
                c: *c,
                expected: expected.clone(),
            });
            resume(k, g)
        }
        RKind::StringTok { s, expected } => {
            g.buf.push(Instr::StringTok {
                s: s.clone(),
                expected: expected.clone(),
            });
            resume(k, g)
        }
        RKind::Satisfy { pred, expected } => {
            g.buf.push(Instr::Satisfies {
                pred: pred.clone(),
                expected: expected.clone(),
            });
            resume(k, g)
        }
        RKind::Eof { expected } => {
            g.buf.push(Instr::Eof {
                expected: expected.clone(),
            });
            resume(k, g)
        }
        RKind::Keyword { s, expected } => {
            g.buf.push(Instr::TokenKeyword {
                s: s.clone(),
                expected: expected.clone(),
            });
            resume(k, g)
        }
        RKind::Operator { s, expected } => {
            g.buf.push(Instr::TokenOperator {
                s: s.clone(),
                expected: expected.clone(),
            });
            resume(k, g)
        }
        RKind::StringLiteral { raw, expected } => {
            g.buf.push(Instr::TokenStringLiteral {
                raw: *raw,
                expected: expected.clone(),
            });
            resume(k, g)
        }

        RKind::Empty { expected } => {
            g.buf.push(Instr::Empty {
                expected: expected.clone(),
            });
            resume(k, g)
        }
        RKind::Fail(msg) => {
            g.buf.push(Instr::Fail { msg: msg.clone() });
            resume(k, g)
        }
        RKind::Unexpected(msg) => {
            g.buf.push(Instr::Unexpected { msg: msg.clone() });
            resume(k, g)
        }

        RKind::Apply(pf, px) => match (&pf.kind, &px.kind) {
            (RKind::Pure(Value::Func(f)), RKind::CharTok { c, expected }) => {
                g.buf.push(Instr::CharTokFastPerform {
                    c: *c,
                    f: f.clone(),
                    expected: expected.clone(),
                });
                resume(k, g)
            }
            (RKind::Pure(Value::Func(f)), RKind::StringTok { s, expected }) => {
                g.buf.push(Instr::StringTokFastPerform {
                    s: s.clone(),
                    f: f.clone(),
                    expected: expected.clone(),
                });
                resume(k, g)
            }
            (RKind::Pure(Value::Func(f)), _) => {
                let f = f.clone();
                enter(
                    px.clone(),
                    Box::new(move |g| {
                        g.buf.push(Instr::Perform(f));
                        resume(k, g)
                    }),
                    g,
                )
            }
            _ => {
                let px = px.clone();
                enter(
                    pf.clone(),
                    Box::new(move |g| {
                        enter(
                            px,
                            Box::new(move |g| {
                                g.buf.push(Instr::Apply);
                                resume(k, g)
                            }),
                            g,
                        )
                    }),
                    g,
                )
            }
        },

        RKind::ThenRight(p, q) => match (&p.kind, &q.kind) {
            (RKind::CharTok { c, expected }, RKind::Pure(x)) => {
                g.buf.push(Instr::CharTokExchange {
                    c: *c,
                    x: x.clone(),
                    expected: expected.clone(),
                });
                resume(k, g)
            }
            (RKind::StringTok { s, expected }, RKind::Pure(x)) => {
                g.buf.push(Instr::StringTokExchange {
                    s: s.clone(),
                    x: x.clone(),
                    expected: expected.clone(),
                });
                resume(k, g)
            }
            (RKind::Satisfy { pred, expected }, RKind::Pure(x)) => {
                g.buf.push(Instr::SatisfiesExchange {
                    pred: pred.clone(),
                    x: x.clone(),
                    expected: expected.clone(),
                });
                resume(k, g)
            }
            (_, RKind::Pure(x)) => {
                let x = x.clone();
                enter(
                    p.clone(),
                    Box::new(move |g| {
                        g.buf.push(Instr::Exchange(x));
                        resume(k, g)
                    }),
                    g,
                )
            }
            _ => {
                let q = q.clone();
                enter(
                    p.clone(),
                    Box::new(move |g| {
                        g.buf.push(Instr::Pop);
                        enter(q, k, g)
                    }),
                    g,
                )
            }
        },

        RKind::ThenLeft(p, q) => {
            let q = q.clone();
            enter(
                p.clone(),
                Box::new(move |g| {
                    enter(
                        q,
                        Box::new(move |g| {
                            g.buf.push(Instr::Pop);
                            resume(k, g)
                        }),
                        g,
                    )
                }),
                g,
            )
        }

        RKind::Bind(p, binder) => {
            let bind = make_bindgen(binder.clone());
            enter(
                p.clone(),
                Box::new(move |g| {
                    g.buf.push(Instr::DynCall { bind });
                    resume(k, g)
                }),
                g,
            )
        }

        RKind::Lift2(f, p, q) => {
            let (f, q) = (f.clone(), q.clone());
            enter(
                p.clone(),
                Box::new(move |g| {
                    enter(
                        q,
                        Box::new(move |g| {
                            g.buf.push(Instr::Lift2(f));
                            resume(k, g)
                        }),
                        g,
                    )
                }),
                g,
            )
        }

        RKind::Lift3(f, p, q, s) => {
            let (f, q, s) = (f.clone(), q.clone(), s.clone());
            enter(
                p.clone(),
                Box::new(move |g| {
                    enter(
                        q,
                        Box::new(move |g| {
                            enter(
                                s,
                                Box::new(move |g| {
                                    g.buf.push(Instr::Lift3(f));
                                    resume(k, g)
                                }),
                                g,
                            )
                        }),
                        g,
                    )
                }),
                g,
            )
        }

        RKind::Alt(p, q) => gen_alt(&r, p, q, k, g),

        RKind::Attempt(p) => {
            let h = g.fresh();
            g.buf.push(Instr::PushHandler(h));
            enter(
                p.clone(),
                Box::new(move |g| {
                    g.buf.push(Instr::Label(h));
                    g.buf.push(Instr::Attempt);
                    resume(k, g)
                }),
                g,
            )
        }

        RKind::LookAhead(p) => {
            let h = g.fresh();
            g.buf.push(Instr::PushHandler(h));
            enter(
                p.clone(),
                Box::new(move |g| {
                    g.buf.push(Instr::Label(h));
                    g.buf.push(Instr::LookAhead);
                    resume(k, g)
                }),
                g,
            )
        }

        RKind::NotFollowedBy { inner, expected } => {
            let h = g.fresh();
            g.buf.push(Instr::PushHandler(h));
            let expected = expected.clone();
            enter(
                inner.clone(),
                Box::new(move |g| {
                    g.buf.push(Instr::Label(h));
                    g.buf.push(Instr::NotFollowedBy { expected });
                    resume(k, g)
                }),
                g,
            )
        }

        RKind::Ternary(b, p, q) => {
            let orelse = g.fresh();
            let exit = g.fresh();
            let (p, q) = (p.clone(), q.clone());
            enter(
                b.clone(),
                Box::new(move |g| {
                    g.buf.push(Instr::If { orelse });
                    enter(
                        p,
                        Box::new(move |g| {
                            g.buf.push(Instr::Jump(exit));
                            g.buf.push(Instr::Label(orelse));
                            enter(
                                q,
                                Box::new(move |g| {
                                    g.buf.push(Instr::Label(exit));
                                    resume(k, g)
                                }),
                                g,
                            )
                        }),
                        g,
                    )
                }),
                g,
            )
        }

        RKind::Many(p) => {
            let h = g.fresh();
            let body = g.fresh();
            g.buf.push(Instr::InputCheck(h));
            g.buf.push(Instr::Label(body));
            enter(
                p.clone(),
                Box::new(move |g| {
                    g.buf.push(Instr::Label(h));
                    g.buf.push(Instr::Many {
                        body,
                        acc: RefCell::new(Vec::new()),
                    });
                    resume(k, g)
                }),
                g,
            )
        }

        RKind::SkipMany(p) => {
            let h = g.fresh();
            let body = g.fresh();
            g.buf.push(Instr::InputCheck(h));
            g.buf.push(Instr::Label(body));
            enter(
                p.clone(),
                Box::new(move |g| {
                    g.buf.push(Instr::Label(h));
                    g.buf.push(Instr::SkipMany { body });
                    resume(k, g)
                }),
                g,
            )
        }

        RKind::ChainPre { p, op } => {
            let h = g.fresh();
            let body = g.fresh();
            g.buf.push(Instr::InputCheck(h));
            g.buf.push(Instr::Label(body));
            let p = p.clone();
            enter(
                op.clone(),
                Box::new(move |g| {
                    g.buf.push(Instr::Label(h));
                    g.buf.push(Instr::ChainPre {
                        body,
                        acc: RefCell::new(Vec::new()),
                    });
                    enter(
                        p,
                        Box::new(move |g| {
                            g.buf.push(Instr::Apply);
                            resume(k, g)
                        }),
                        g,
                    )
                }),
                g,
            )
        }

        RKind::ChainPost { p, op } => {
            let op = op.clone();
            enter(
                p.clone(),
                Box::new(move |g| {
                    let h = g.fresh();
                    let body = g.fresh();
                    g.buf.push(Instr::InputCheck(h));
                    g.buf.push(Instr::Label(body));
                    enter(
                        op,
                        Box::new(move |g| {
                            g.buf.push(Instr::Label(h));
                            g.buf.push(Instr::ChainPost { body });
                            resume(k, g)
                        }),
                        g,
                    )
                }),
                g,
            )
        }

        RKind::ChainLeft { p, op } => {
            let (p2, op) = (p.clone(), op.clone());
            enter(
                p.clone(),
                Box::new(move |g| {
                    let h = g.fresh();
                    let body = g.fresh();
                    g.buf.push(Instr::InputCheck(h));
                    g.buf.push(Instr::Label(body));
                    enter(
                        op,
                        Box::new(move |g| {
                            enter(
                                p2,
                                Box::new(move |g| {
                                    g.buf.push(Instr::Label(h));
                                    g.buf.push(Instr::ChainLeft { body });
                                    resume(k, g)
                                }),
                                g,
                            )
                        }),
                        g,
                    )
                }),
                g,
            )
        }

        RKind::ChainRight { p, op } => {
            let (p2, op) = (p.clone(), op.clone());
            enter(
                p.clone(),
                Box::new(move |g| {
                    let h = g.fresh();
                    let body = g.fresh();
                    g.buf.push(Instr::InputCheck(h));
                    g.buf.push(Instr::Label(body));
                    enter(
                        op,
                        Box::new(move |g| {
                            enter(
                                p2,
                                Box::new(move |g| {
                                    g.buf.push(Instr::Label(h));
                                    g.buf.push(Instr::ChainRight {
                                        body,
                                        acc: RefCell::new(Vec::new()),
                                    });
                                    resume(k, g)
                                }),
                                g,
                            )
                        }),
                        g,
                    )
                }),
                g,
            )
        }

        RKind::SepEndBy1 { p, sep } => {
            let (p2, sep) = (p.clone(), sep.clone());
            enter(
                p.clone(),
                Box::new(move |g| {
                    let h = g.fresh();
                    let body = g.fresh();
                    g.buf.push(Instr::InputCheck(h));
                    g.buf.push(Instr::Label(body));
                    enter(
                        sep,
                        Box::new(move |g| {
                            g.buf.push(Instr::Pop);
                            g.buf.push(Instr::UpdateCheck);
                            enter(
                                p2,
                                Box::new(move |g| {
                                    g.buf.push(Instr::Label(h));
                                    g.buf.push(Instr::SepEndBy1 {
                                        body,
                                        acc: RefCell::new(Vec::new()),
                                    });
                                    resume(k, g)
                                }),
                                g,
                            )
                        }),
                        g,
                    )
                }),
                g,
            )
        }

        RKind::ManyUntil(p) => {
            let body = g.fresh();
            g.buf.push(Instr::Label(body));
            enter(
                p.clone(),
                Box::new(move |g| {
                    g.buf.push(Instr::ManyUntil {
                        body,
                        acc: RefCell::new(Vec::new()),
                    });
                    resume(k, g)
                }),
                g,
            )
        }

        RKind::FastFail(p, msg_of) => {
            let msg_of = msg_of.clone();
            enter(
                p.clone(),
                Box::new(move |g| {
                    g.buf.push(Instr::FastFail { msg_of });
                    resume(k, g)
                }),
                g,
            )
        }

        RKind::FastUnexpected(p, msg_of) => {
            let msg_of = msg_of.clone();
            enter(
                p.clone(),
                Box::new(move |g| {
                    g.buf.push(Instr::FastUnexpected { msg_of });
                    resume(k, g)
                }),
                g,
            )
        }

        RKind::Ensure(p, pred) => {
            let pred = pred.clone();
            enter(
                p.clone(),
                Box::new(move |g| {
                    g.buf.push(Instr::Ensure {
                        pred,
                        expected: None,
                    });
                    resume(k, g)
                }),
                g,
            )
        }

        RKind::Guard(p, pred, msg) => {
            let (pred, msg) = (pred.clone(), msg.clone());
            enter(
                p.clone(),
                Box::new(move |g| {
                    g.buf.push(Instr::Guard { pred, msg });
                    resume(k, g)
                }),
                g,
            )
        }

        RKind::FastGuard(p, pred, msg_of) => {
            let (pred, msg_of) = (pred.clone(), msg_of.clone());
            enter(
                p.clone(),
                Box::new(move |g| {
                    g.buf.push(Instr::FastGuard { pred, msg_of });
                    resume(k, g)
                }),
                g,
            )
        }

        RKind::Put(reg, p) => {
            let reg = *reg;
            enter(
                p.clone(),
                Box::new(move |g| {
                    g.buf.push(Instr::Put(reg));
                    resume(k, g)
                }),
                g,
            )
        }

        RKind::Local { reg, init, body } => {
            let reg = *reg;
            let body = body.clone();
            enter(
                init.clone(),
                Box::new(move |g| {
                    g.buf.push(Instr::LocalEntry(reg));
                    enter(
                        body,
                        Box::new(move |g| {
                            g.buf.push(Instr::LocalExit(reg));
                            resume(k, g)
                        }),
                        g,
                    )
                }),
                g,
            )
        }

        RKind::Fixpoint { target, expected } | RKind::Subroutine { target, expected } => {
            let label = g.sub_label(*target);
            g.buf.push(Instr::Call {
                target: label,
                expected: expected.clone(),
            });
            resume(k, g)
        }

        RKind::Debug { inner, name, pause } => {
            g.buf.push(Instr::LogBegin {
                name: name.clone(),
                pause: pause.on_entry(),
            });
            let (name, pause) = (name.clone(), *pause);
            enter(
                inner.clone(),
                Box::new(move |g| {
                    g.buf.push(Instr::LogEnd {
                        name,
                        pause: pause.on_exit(),
                    });
                    resume(k, g)
                }),
                g,
            )
        }
    }
}
