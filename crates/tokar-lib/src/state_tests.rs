use crate::test_utils::value_of;
use crate::{ParserExt, Reg, Value, ch, get, lift2, local_value, modify, put_value};

#[test]
fn put_then_get_round_trips() {
    let r1 = Reg::new(1);
    let p = put_value(r1, Value::Int(10)).then(get(r1));
    assert_eq!(value_of(&p, ""), Value::Int(10));
}

#[test]
fn modify_applies_in_place() {
    let r1 = Reg::new(1);
    let p = put_value(r1, Value::Int(10))
        .then(modify(r1, |v| Value::Int(v.as_int() * 2)))
        .then(get(r1));
    assert_eq!(value_of(&p, ""), Value::Int(20));
}

#[test]
fn registers_start_as_unit() {
    let p = get(Reg::new(3));
    assert_eq!(value_of(&p, ""), Value::Unit);
}

#[test]
fn locals_nest() {
    let r0 = Reg::new(0);
    let inner = lift2(
        |in_scope, after| Value::list(vec![in_scope, after]),
        local_value(r0, Value::Int(2), get(r0)),
        get(r0),
    );
    let p = lift2(
        |pair, after| Value::list(vec![pair, after]),
        local_value(r0, Value::Int(1), inner),
        get(r0),
    );

    assert_eq!(
        value_of(&p, ""),
        Value::list(vec![
            Value::list(vec![Value::Int(2), Value::Int(1)]),
            Value::Unit,
        ]),
    );
}

#[test]
fn local_value_persists_across_input_consumption() {
    let r2 = Reg::new(2);
    let p = local_value(
        r2,
        Value::Int(7),
        ch('a').then(ch('b')).then(get(r2)),
    );
    assert_eq!(value_of(&p, "ab"), Value::Int(7));
}

#[test]
#[should_panic(expected = "register index 4 out of range")]
fn a_fifth_register_is_a_programming_error() {
    Reg::new(4);
}
