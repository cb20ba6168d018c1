use std::rc::Rc;

use tokar_bytecode::{Instr, Program, dump};

use crate::{Parser, compile};

fn compiled(p: &Parser) -> Rc<Program> {
    compile(p).expect("compile failed")
}

fn alt_of(branches: Vec<Parser>) -> Parser {
    branches
        .into_iter()
        .rev()
        .reduce(|acc, b| Parser::alt(b, acc))
        .expect("at least one branch")
}

#[test]
fn many_emits_a_checked_loop() {
    let p = Parser::many(Parser::char_tok('a'));

    insta::assert_snapshot!(dump(&compiled(&p)), @r"
    0  input-check @2
    1  char 'a'
    2  many @1
    ");
}

#[test]
fn plain_alternation_shape() {
    let p = Parser::alt(
        Parser::string_tok(Rc::from("foo")),
        Parser::string_tok(Rc::from("foobar")),
    );

    insta::assert_snapshot!(dump(&compiled(&p)), @r#"
    0  input-check @3
    1  string "foo"
    2  jump-good @5
    3  catch
    4  string "foobar"
    "#);
}

#[test]
fn attempt_alternation_shape() {
    let p = Parser::alt(
        Parser::attempt(Parser::string_tok(Rc::from("foo"))),
        Parser::string_tok(Rc::from("foobar")),
    );

    insta::assert_snapshot!(dump(&compiled(&p)), @r#"
    0  push-handler @2
    1  string "foo"
    2  jump-good-attempt @4
    3  string "foobar"
    "#);
}

#[test]
fn alternation_with_pure_right_collapses_to_recover() {
    let p = Parser::alt(
        Parser::char_tok('a'),
        Parser::pure(tokar_core::Value::Int(0)),
    );

    insta::assert_snapshot!(dump(&compiled(&p)), @r"
    0  input-check @2
    1  char 'a'
    2  recover 0
    ");
}

#[test]
fn discriminating_branches_tablify() {
    let p = alt_of(vec![
        Parser::char_tok('a'),
        Parser::string_tok(Rc::from("bc")),
        Parser::char_tok('d'),
    ]);
    let program = compiled(&p);

    let table = program
        .instrs()
        .iter()
        .find_map(|i| match i {
            Instr::JumpTable { table, expected, .. } => Some((table.len(), expected.len())),
            _ => None,
        })
        .expect("expected a jump table");
    assert_eq!(table, (3, 3));
}

#[test]
fn duplicate_leads_fall_back_to_plain_shape() {
    let p = Parser::alt(
        Parser::string_tok(Rc::from("foo")),
        Parser::string_tok(Rc::from("foobar")),
    );
    let program = compiled(&p);

    assert!(!program
        .instrs()
        .iter()
        .any(|i| matches!(i, Instr::JumpTable { .. })));
    assert!(program
        .instrs()
        .iter()
        .any(|i| matches!(i, Instr::InputCheck(_))));
}

#[test]
fn tablified_prefix_keeps_the_rest_as_default() {
    // 'a', 'b', and the first 'c' branch discriminate; the second 'c' lead
    // breaks the prefix and lands in the default chain.
    let p = alt_of(vec![
        Parser::char_tok('a'),
        Parser::char_tok('b'),
        Parser::string_tok(Rc::from("cd")),
        Parser::string_tok(Rc::from("ce")),
    ]);
    let program = compiled(&p);

    let table_len = program
        .instrs()
        .iter()
        .find_map(|i| match i {
            Instr::JumpTable { table, .. } => Some(table.len()),
            _ => None,
        })
        .expect("expected a jump table");
    assert_eq!(table_len, 3);

    // Both 'c' branches survive in the default chain.
    let c_strings = program
        .instrs()
        .iter()
        .filter(|i| matches!(i, Instr::StringTok { s, .. } if s.starts_with('c')))
        .count();
    assert_eq!(c_strings, 2);
}

#[test]
fn leading_token_walk_sees_through_wrappers() {
    // attempt(map(keyword)) still discriminates on 'i'.
    let p = alt_of(vec![
        Parser::attempt(Parser::apply(
            Parser::pure(tokar_core::Value::func(|v| v)),
            Parser::keyword(Rc::from("if")),
        )),
        Parser::keyword(Rc::from("else")),
    ]);
    let program = compiled(&p);

    let leads: Vec<char> = program
        .instrs()
        .iter()
        .find_map(|i| match i {
            Instr::JumpTable { table, .. } => Some(table.keys().copied().collect()),
            _ => None,
        })
        .expect("expected a jump table");
    assert_eq!(leads, vec!['i', 'e']);
}

#[test]
fn sep_end_by_refreshes_its_check_after_the_separator() {
    let p = Parser::sep_end_by1(Parser::char_tok('a'), Parser::char_tok(','));
    let program = compiled(&p);

    insta::assert_snapshot!(dump(&program), @r"
    0  char 'a'
    1  input-check @6
    2  char ','
    3  pop
    4  update-check
    5  char 'a'
    6  sep-end-by1 @2
    ");
}

#[test]
fn ternary_emits_a_conditional_jump() {
    let p = Parser::ternary(
        Parser::apply(
            Parser::pure(tokar_core::Value::func(|v| {
                tokar_core::Value::Bool(v.as_char() == 't')
            })),
            Parser::satisfy(tokar_core::Pred::new(|v| {
                matches!(v, tokar_core::Value::Char(_))
            })),
        ),
        Parser::char_tok('y'),
        Parser::char_tok('n'),
    );

    insta::assert_snapshot!(dump(&compiled(&p)), @r"
    0  satisfy
    1  perform
    2  if-else @5
    3  char 'y'
    4  jump @6
    5  char 'n'
    ");
}

#[test]
fn debug_wraps_the_body_in_log_points() {
    let p = Parser::debug(
        Parser::char_tok('a'),
        Rc::from("probe"),
        crate::Breakpoint::None,
    );

    insta::assert_snapshot!(dump(&compiled(&p)), @r#"
    0  log-begin "probe"
    1  char 'a'
    2  log-end "probe"
    "#);
}
