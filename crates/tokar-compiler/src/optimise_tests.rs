use std::rc::Rc;

use tokar_bytecode::{Instr, Program};
use tokar_core::{Func2, Pred, Value};

use crate::{CompileError, Parser, compile};

fn add_one() -> Value {
    Value::func(|v| Value::Int(v.as_int() + 1))
}

fn compiled(p: &Parser) -> Rc<Program> {
    compile(p).expect("compile failed")
}

#[test]
fn pure_application_folds_at_compile_time() {
    let p = Parser::apply(Parser::pure(add_one()), Parser::pure(Value::Int(2)));
    let program = compiled(&p);

    assert_eq!(program.len(), 1);
    assert!(matches!(program.instr(0), Instr::Push(Value::Int(3))));
}

#[test]
fn impure_latch_disables_folding() {
    let p = Parser::apply(Parser::pure(add_one()), Parser::pure(Value::Int(2))).impure();
    let program = compiled(&p);

    assert_eq!(program.len(), 2);
    assert!(matches!(program.instr(0), Instr::Push(Value::Int(2))));
    assert!(matches!(program.instr(1), Instr::Perform(_)));
}

#[test]
fn map_over_char_fuses_into_one_instruction() {
    let p = Parser::apply(
        Parser::pure(Value::func(|v| Value::Int(v.as_char() as i64))),
        Parser::char_tok('a'),
    );
    let program = compiled(&p);

    assert_eq!(program.len(), 1);
    assert!(matches!(
        program.instr(0),
        Instr::CharTokFastPerform { c: 'a', .. }
    ));
}

#[test]
fn char_then_pure_fuses_into_exchange() {
    let p = Parser::then_right(Parser::char_tok('a'), Parser::pure(Value::Int(7)));
    let program = compiled(&p);

    assert_eq!(program.len(), 1);
    assert!(matches!(
        program.instr(0),
        Instr::CharTokExchange { c: 'a', x: Value::Int(7), .. }
    ));
}

#[test]
fn adjacent_chars_fuse_into_a_string() {
    let p = Parser::then_right(Parser::char_tok('a'), Parser::char_tok('b'));
    let program = compiled(&p);

    assert_eq!(program.len(), 1);
    assert!(matches!(
        program.instr(0),
        Instr::StringTokExchange { s, x: Value::Char('b'), .. } if s.as_ref() == "ab"
    ));
}

#[test]
fn labelled_chars_do_not_fuse() {
    let p = Parser::then_right(
        Parser::label(Parser::char_tok('a'), Rc::from("first")),
        Parser::char_tok('b'),
    );
    let program = compiled(&p);

    assert!(program.len() > 1);
    assert!(matches!(program.instr(0), Instr::CharTok { c: 'a', .. }));
}

#[test]
fn pure_left_of_then_disappears() {
    let p = Parser::then_right(Parser::pure(Value::Int(1)), Parser::char_tok('a'));
    let program = compiled(&p);

    assert_eq!(program.len(), 1);
    assert!(matches!(program.instr(0), Instr::CharTok { c: 'a', .. }));
}

#[test]
fn then_left_of_pure_disappears() {
    let p = Parser::then_left(Parser::char_tok('a'), Parser::pure(Value::Int(1)));
    let program = compiled(&p);

    assert_eq!(program.len(), 1);
    assert!(matches!(program.instr(0), Instr::CharTok { c: 'a', .. }));
}

#[test]
fn alternation_left_catches_on_pure() {
    let p = Parser::alt(Parser::pure(Value::Int(1)), Parser::char_tok('a'));
    let program = compiled(&p);

    assert_eq!(program.len(), 1);
    assert!(matches!(program.instr(0), Instr::Push(Value::Int(1))));
}

#[test]
fn unlabelled_empty_is_an_alternation_identity() {
    let left = Parser::alt(Parser::empty(), Parser::char_tok('a'));
    let right = Parser::alt(Parser::char_tok('a'), Parser::empty());

    for p in [left, right] {
        let program = compiled(&p);
        assert_eq!(program.len(), 1);
        assert!(matches!(program.instr(0), Instr::CharTok { c: 'a', .. }));
    }
}

#[test]
fn labelled_empty_is_not_an_identity() {
    let p = Parser::alt(
        Parser::char_tok('a'),
        Parser::label(Parser::empty(), Rc::from("nothing")),
    );
    let program = compiled(&p);
    assert!(program.len() > 1);
}

#[test]
fn empty_string_token_is_pure() {
    let p = Parser::string_tok(Rc::from(""));
    let program = compiled(&p);

    assert_eq!(program.len(), 1);
    assert!(matches!(
        program.instr(0),
        Instr::Push(Value::Str(s)) if s.is_empty()
    ));
}

#[test]
fn ternary_on_constants_selects_a_branch() {
    let p = Parser::ternary(
        Parser::pure(Value::Bool(true)),
        Parser::char_tok('a'),
        Parser::char_tok('b'),
    );
    let program = compiled(&p);

    assert_eq!(program.len(), 1);
    assert!(matches!(program.instr(0), Instr::CharTok { c: 'a', .. }));
}

#[test]
fn ensure_on_pure_evaluates_the_predicate() {
    let keep = Parser::ensure(
        Parser::pure(Value::Int(4)),
        Pred::new(|v| v.as_int() % 2 == 0),
    );
    let reject = Parser::ensure(
        Parser::pure(Value::Int(3)),
        Pred::new(|v| v.as_int() % 2 == 0),
    );

    assert!(matches!(compiled(&keep).instr(0), Instr::Push(Value::Int(4))));
    assert!(matches!(compiled(&reject).instr(0), Instr::Empty { .. }));
}

#[test]
fn many_over_failure_is_an_empty_list() {
    let p = Parser::many(Parser::empty());
    let program = compiled(&p);

    assert_eq!(program.len(), 1);
    assert!(matches!(
        program.instr(0),
        Instr::Push(Value::List(items)) if items.is_empty()
    ));
}

#[test]
fn non_consuming_loop_bodies_are_build_errors() {
    let cases = [
        (Parser::many(Parser::pure(Value::Unit)), "many"),
        (Parser::skip_many(Parser::line()), "skip_many"),
        (
            Parser::chain_pre(Parser::char_tok('a'), Parser::pure(Value::Unit)),
            "chain_pre",
        ),
        (
            Parser::chain_post(Parser::char_tok('a'), Parser::pure(Value::Unit)),
            "chain_post",
        ),
    ];
    for (p, combinator) in cases {
        assert_eq!(
            compile(&p).unwrap_err(),
            CompileError::NonConsumingLoop { combinator },
        );
    }
}

#[test]
fn bind_of_pure_expands_to_a_shared_call() {
    let p = Parser::bind(
        Parser::pure(Value::Int(1)),
        crate::Binder::new(|v| {
            if v.as_int() > 0 {
                Parser::char_tok('a')
            } else {
                Parser::char_tok('b')
            }
        }),
    );
    let program = compiled(&p);

    assert!(program.instrs().iter().any(|i| matches!(i, Instr::Call { .. })));
    assert!(program
        .instrs()
        .iter()
        .any(|i| matches!(i, Instr::CharTok { c: 'a', .. })));
    assert!(!program
        .instrs()
        .iter()
        .any(|i| matches!(i, Instr::CharTok { c: 'b', .. })));
}

#[test]
fn bind_of_char_prefixes_the_token() {
    let p = Parser::bind(
        Parser::char_tok('a'),
        crate::Binder::new(|v| Parser::char_tok(v.as_char())),
    );
    let program = compiled(&p);

    // The token stays in front, the continuation becomes a shared call.
    assert!(matches!(program.instr(0), Instr::CharTok { c: 'a', .. }));
    assert!(program.instrs().iter().any(|i| matches!(i, Instr::Call { .. })));
    assert!(!program.instrs().iter().any(|i| matches!(i, Instr::DynCall { .. })));
}

#[test]
fn opaque_bind_stays_dynamic() {
    let p = Parser::bind(
        Parser::char_tok('a'),
        crate::Binder::new(|v| Parser::char_tok(v.as_char())),
    )
    .impure();
    let program = compiled(&p);

    assert!(program.instrs().iter().any(|i| matches!(i, Instr::DynCall { .. })));
}

#[test]
fn lift2_survives_as_a_single_instruction() {
    let p = Parser::lift2(
        Func2::new(|a, b| Value::list(vec![a, b])),
        Parser::char_tok('a'),
        Parser::char_tok('b'),
    );
    let program = compiled(&p);

    assert_eq!(program.len(), 3);
    assert!(matches!(program.instr(2), Instr::Lift2(_)));
}
