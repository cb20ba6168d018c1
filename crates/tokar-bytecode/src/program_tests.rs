use std::cell::RefCell;

use tokar_core::Value;

use crate::{Instr, InstrState, Program};

fn loop_program() -> Program {
    Program::new(vec![
        Instr::InputCheck(3),
        Instr::CharTok {
            c: 'a',
            expected: None,
        },
        Instr::Many {
            body: 1,
            acc: RefCell::new(Vec::new()),
        },
        Instr::Eof { expected: None },
    ])
}

#[test]
fn stateful_positions_are_indexed_at_freeze() {
    let program = loop_program();
    assert_eq!(program.stateful_positions(), &[2]);
}

#[test]
fn snapshot_starts_with_fresh_state() {
    let program = loop_program();
    let Instr::Many { acc, .. } = program.instr(2) else {
        panic!("expected a Many at offset 2");
    };
    acc.borrow_mut().push(Value::Char('a'));

    let copy = program.snapshot();

    let Instr::Many { acc: copied, .. } = copy.instr(2) else {
        panic!("expected a Many at offset 2");
    };
    assert!(copied.borrow().is_empty());
    assert_eq!(acc.borrow().len(), 1);
}

#[test]
fn save_drains_and_restore_reinstates() {
    let program = loop_program();
    let Instr::Many { acc, .. } = program.instr(2) else {
        panic!("expected a Many at offset 2");
    };
    acc.borrow_mut().push(Value::Char('a'));
    acc.borrow_mut().push(Value::Char('b'));

    let saved = program.save_states();
    assert!(acc.borrow().is_empty());
    assert!(matches!(&saved[0], InstrState::Values(v) if v.len() == 2));

    program.restore_states(saved);
    assert_eq!(
        acc.borrow().as_slice(),
        &[Value::Char('a'), Value::Char('b')]
    );
}

#[test]
#[should_panic(expected = "save_state on stateless instruction")]
fn save_state_rejects_stateless() {
    Instr::Eof { expected: None }.save_state();
}
