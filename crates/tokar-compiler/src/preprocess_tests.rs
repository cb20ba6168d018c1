use std::rc::Rc;

use tokar_bytecode::{Instr, dump};
use tokar_core::{Pred, Value};

use crate::ast::Parser;
use crate::preprocess::PassCtx;
use crate::resolved::{RKind, Resolved};
use crate::{codegen, compile, optimise};

fn count_matching(p: &Parser, pred: impl Fn(&Instr) -> bool) -> usize {
    let program = compile(p).expect("compile failed");
    program.instrs().iter().filter(|i| pred(i)).count()
}

#[test]
fn relabel_is_absorbed_into_leaves() {
    let p = Parser::label(Parser::char_tok('a'), Rc::from("letter"));
    let program = compile(&p).expect("compile failed");

    assert!(program.instrs().iter().any(|i| matches!(
        i,
        Instr::CharTok { c: 'a', expected: Some(label) } if label.as_ref() == "letter"
    )));
}

#[test]
fn relabel_reaches_both_alternation_branches() {
    let p = Parser::label(
        Parser::alt(Parser::char_tok('a'), Parser::string_tok(Rc::from("bc"))),
        Rc::from("token"),
    );
    let program = compile(&p).expect("compile failed");

    let labelled = program
        .instrs()
        .iter()
        .filter(|i| match i {
            Instr::CharTok { expected, .. } | Instr::StringTok { expected, .. } => {
                expected.as_deref() == Some("token")
            }
            _ => false,
        })
        .count();
    assert_eq!(labelled, 2);
}

#[test]
fn back_edges_become_calls_into_a_shared_body() {
    // parens = '(' parens ')' | 'x'
    let p = Parser::recursive(|parens| {
        Parser::alt(
            Parser::then_right(
                Parser::char_tok('('),
                Parser::then_left(parens, Parser::char_tok(')')),
            ),
            Parser::char_tok('x'),
        )
    });

    assert!(count_matching(&p, |i| matches!(i, Instr::Call { .. })) >= 1);
    assert_eq!(count_matching(&p, |i| matches!(i, Instr::Return)), 1);
}

#[test]
fn one_subroutine_node_shares_one_body() {
    let body = Parser::satisfy(Pred::new(|v| matches!(v, Value::Char(c) if c.is_ascii_digit())));
    let sub = Parser::subroutine(body);
    let p = Parser::then_right(sub.clone(), sub);

    assert_eq!(count_matching(&p, |i| matches!(i, Instr::Call { .. })), 2);
    assert_eq!(count_matching(&p, |i| matches!(i, Instr::Return)), 1);
}

#[test]
fn deep_chain_compiles_without_native_recursion() {
    let digit = || Parser::satisfy(Pred::new(|v| matches!(v, Value::Char(_))));
    let mut p = digit();
    for _ in 0..30_000 {
        p = Parser::then_right(p, digit());
    }
    let program = compile(&p).expect("compile failed");
    assert!(program.len() >= 30_000);
}

#[test]
#[should_panic(expected = "relabel node reached the optimiser")]
fn bypassed_relabel_panics_in_optimise() {
    let inner = Resolved::new(RKind::Empty { expected: None });
    let relabel = Resolved::new(RKind::Relabel(inner, Rc::from("label")));
    let mut ctx = PassCtx::new();
    let _ = optimise::optimise(relabel, &mut ctx);
}

#[test]
#[should_panic(expected = "relabel node reached code generation")]
fn bypassed_relabel_panics_in_codegen() {
    let inner = Resolved::new(RKind::Empty { expected: None });
    let relabel = Resolved::new(RKind::Relabel(inner, Rc::from("label")));
    let ctx = PassCtx::new();
    let _ = codegen::emit(&relabel, &ctx);
}

#[test]
fn compile_is_cached_on_the_node() {
    let p = Parser::char_tok('a');
    let first = compile(&p).expect("compile failed");
    let second = compile(&p).expect("compile failed");
    assert!(Rc::ptr_eq(&first, &second));
}

#[test]
fn labelled_and_unlabelled_references_stay_distinct() {
    // The same physical leaf is referenced plain and under a label; the
    // label-free memo must not leak the labelled clone.
    let leaf = Parser::char_tok('a');
    let p = Parser::then_right(
        Parser::label(leaf.clone(), Rc::from("first")),
        leaf,
    );
    let program = compile(&p).expect("compile failed");
    let text = dump(&program);
    assert!(text.contains("char 'a'"));

    let labelled = program
        .instrs()
        .iter()
        .filter(|i| matches!(i, Instr::CharTok { expected: Some(_), .. }))
        .count();
    assert_eq!(labelled, 1);
}
