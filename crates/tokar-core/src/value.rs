//! Dynamic values carried on the machine's operand stack.
//!
//! The stack is heterogeneous: a cell may hold a primitive, a list, a
//! function waiting for its argument, or an arbitrary user value behind
//! `Opaque`. Structural data compares by value; callables and opaques
//! compare by allocation identity.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

/// Unary function cell.
///
/// Multi-argument functions on the stack are curried `Func`s; see
/// [`Value::func2`].
#[derive(Clone)]
pub struct Func(Rc<dyn Fn(Value) -> Value>);

impl Func {
    pub fn new(f: impl Fn(Value) -> Value + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, x: Value) -> Value {
        (self.0)(x)
    }

    /// `compose(f, g)` is `x -> f(g(x))`.
    pub fn compose(outer: &Func, inner: &Func) -> Func {
        let (f, g) = (outer.clone(), inner.clone());
        Func::new(move |x| f.call(g.call(x)))
    }

    pub fn ptr_eq(&self, other: &Func) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<fn>")
    }
}

/// Binary function cell, consumed whole by the `Lift2` instruction.
#[derive(Clone)]
pub struct Func2(Rc<dyn Fn(Value, Value) -> Value>);

impl Func2 {
    pub fn new(f: impl Fn(Value, Value) -> Value + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, x: Value, y: Value) -> Value {
        (self.0)(x, y)
    }
}

impl fmt::Debug for Func2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<fn/2>")
    }
}

/// Ternary function cell, consumed whole by the `Lift3` instruction.
#[derive(Clone)]
pub struct Func3(Rc<dyn Fn(Value, Value, Value) -> Value>);

impl Func3 {
    pub fn new(f: impl Fn(Value, Value, Value) -> Value + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, x: Value, y: Value, z: Value) -> Value {
        (self.0)(x, y, z)
    }
}

impl fmt::Debug for Func3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<fn/3>")
    }
}

/// Predicate over a borrowed value, used by the filtering instructions.
#[derive(Clone)]
pub struct Pred(Rc<dyn Fn(&Value) -> bool>);

impl Pred {
    pub fn new(f: impl Fn(&Value) -> bool + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn test(&self, x: &Value) -> bool {
        (self.0)(x)
    }
}

impl fmt::Debug for Pred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<pred>")
    }
}

/// Message generator for the fast-failure instructions.
#[derive(Clone)]
pub struct MsgGen(Rc<dyn Fn(&Value) -> String>);

impl MsgGen {
    pub fn new(f: impl Fn(&Value) -> String + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn render(&self, x: &Value) -> String {
        (self.0)(x)
    }
}

impl fmt::Debug for MsgGen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<msg>")
    }
}

/// A cell on the operand stack, in a register, or produced by a run.
#[derive(Clone)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Char(char),
    Str(Rc<str>),
    List(Rc<Vec<Value>>),
    Func(Func),
    Opaque(Rc<dyn Any>),
}

impl Value {
    pub fn str(s: impl AsRef<str>) -> Value {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(items))
    }

    pub fn func(f: impl Fn(Value) -> Value + 'static) -> Value {
        Value::Func(Func::new(f))
    }

    /// Curried binary function: `func2(f)` applied to `x` yields a `Func`
    /// waiting for `y`. This is the representation binary operators take on
    /// the stack (chain combinators apply them one argument at a time).
    pub fn func2(f: impl Fn(Value, Value) -> Value + Clone + 'static) -> Value {
        Value::Func(Func::new(move |x| {
            let f = f.clone();
            Value::Func(Func::new(move |y| f(x.clone(), y)))
        }))
    }

    pub fn opaque<T: 'static>(v: T) -> Value {
        Value::Opaque(Rc::new(v))
    }

    /// Type mismatches on the stack or in registers are a programming error;
    /// the accessors below panic rather than propagate.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            other => panic!("expected a boolean on the stack, found {other:?}"),
        }
    }

    pub fn as_int(&self) -> i64 {
        match self {
            Value::Int(n) => *n,
            other => panic!("expected an integer on the stack, found {other:?}"),
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Value::Char(c) => *c,
            other => panic!("expected a character on the stack, found {other:?}"),
        }
    }

    pub fn as_str(&self) -> Rc<str> {
        match self {
            Value::Str(s) => s.clone(),
            other => panic!("expected a string on the stack, found {other:?}"),
        }
    }

    pub fn as_func(&self) -> Func {
        match self {
            Value::Func(f) => f.clone(),
            other => panic!("expected a function on the stack, found {other:?}"),
        }
    }

    pub fn as_list(&self) -> Rc<Vec<Value>> {
        match self {
            Value::List(items) => items.clone(),
            other => panic!("expected a list on the stack, found {other:?}"),
        }
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            Value::Opaque(v) => v.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Func(a), Value::Func(b)) => a.ptr_eq(b),
            (Value::Opaque(a), Value::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => f.write_str("()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Char(c) => write!(f, "{c:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Func(_) => f.write_str("<fn>"),
            Value::Opaque(_) => f.write_str("<opaque>"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Unit => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Char(c) => serializer.serialize_char(*c),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Func(_) => serializer.serialize_str("<fn>"),
            Value::Opaque(_) => serializer.serialize_str("<opaque>"),
        }
    }
}
