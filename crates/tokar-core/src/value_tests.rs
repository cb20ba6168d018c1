use crate::{Func, Value};

#[test]
fn structural_equality() {
    assert_eq!(Value::Int(3), Value::Int(3));
    assert_eq!(Value::Char('a'), Value::Char('a'));
    assert_ne!(Value::Char('a'), Value::Char('b'));
    assert_ne!(Value::Int(0), Value::Unit);
    assert_eq!(
        Value::list(vec![Value::Char('a'), Value::Char('b')]),
        Value::list(vec![Value::Char('a'), Value::Char('b')]),
    );
}

#[test]
fn functions_compare_by_identity() {
    let f = Value::func(|x| x);
    let g = Value::func(|x| x);

    assert_eq!(f, f.clone());
    assert_ne!(f, g);
}

#[test]
fn curried_application() {
    let add = Value::func2(|x, y| Value::Int(x.as_int() + y.as_int()));

    let partial = add.as_func().call(Value::Int(2));
    let result = partial.as_func().call(Value::Int(40));

    assert_eq!(result, Value::Int(42));
}

#[test]
fn compose_applies_inner_first() {
    let double = Func::new(|x| Value::Int(x.as_int() * 2));
    let succ = Func::new(|x| Value::Int(x.as_int() + 1));

    // double . succ
    let composed = Func::compose(&double, &succ);
    assert_eq!(composed.call(Value::Int(3)), Value::Int(8));
}

#[test]
fn opaque_downcast() {
    #[derive(Debug, PartialEq)]
    struct Marker(u8);

    let v = Value::opaque(Marker(7));
    assert_eq!(v.downcast_ref::<Marker>(), Some(&Marker(7)));
    assert_eq!(v.downcast_ref::<String>(), None);
    assert_eq!(Value::Int(1).downcast_ref::<Marker>(), None);
}

#[test]
#[should_panic(expected = "expected a function")]
fn accessor_mismatch_panics() {
    Value::Int(1).as_func();
}

#[test]
fn serializes_to_json() {
    let v = Value::list(vec![
        Value::Unit,
        Value::Bool(true),
        Value::Int(-3),
        Value::Char('x'),
        Value::str("hi"),
        Value::func(|x| x),
    ]);

    let json = serde_json::to_string(&v).unwrap();
    assert_eq!(json, r#"[null,true,-3,"x","hi","<fn>"]"#);
}
