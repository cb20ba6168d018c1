//! The public combinator surface.
//!
//! Free functions build AST leaves and the common composites; the
//! [`ParserExt`] trait adds the sequencing and choice operators as methods.
//! User closures are wrapped into the dynamic callable cells the machine
//! executes ([`Func`], [`Pred`](tokar_core::Pred), …).

use std::rc::Rc;

use tokar_bytecode::IterStop;
use tokar_compiler::{Binder, Breakpoint, Parser};
use tokar_core::{Func2, Func3, MsgGen, Pred, Value};

/// A parser that consumes nothing and yields `x`.
pub fn pure(x: Value) -> Parser {
    Parser::pure(x)
}

/// The failing parser with an empty expected set.
pub fn empty() -> Parser {
    Parser::empty()
}

/// Fail with a user message.
pub fn fail(msg: &str) -> Parser {
    Parser::fail(Rc::from(msg))
}

/// Fail reporting an unexpected item.
pub fn unexpected(msg: &str) -> Parser {
    Parser::unexpected(Rc::from(msg))
}

/// Match one specific character.
pub fn ch(c: char) -> Parser {
    Parser::char_tok(c)
}

/// Match a literal atomically: on a partial match no input is consumed.
pub fn string(s: &str) -> Parser {
    Parser::string_tok(Rc::from(s))
}

/// Match one character satisfying the predicate.
pub fn satisfy(pred: impl Fn(char) -> bool + 'static) -> Parser {
    Parser::satisfy(Pred::new(move |v| match v {
        Value::Char(c) => pred(*c),
        _ => false,
    }))
}

/// Match any single character.
pub fn item() -> Parser {
    satisfy(|_| true)
}

/// Succeed only at end of input.
pub fn eof() -> Parser {
    Parser::eof()
}

/// The current zero-based line.
pub fn line() -> Parser {
    Parser::line()
}

/// The current zero-based column.
pub fn col() -> Parser {
    Parser::col()
}

/// The current position as a two-element list `[line, col]`.
pub fn pos() -> Parser {
    lift2(
        |l, c| Value::list(vec![l, c]),
        Parser::line(),
        Parser::col(),
    )
}

/// Backtrack the input on failure, so an enclosing alternation can try its
/// next branch even after consumption.
pub fn attempt(p: Parser) -> Parser {
    Parser::attempt(p)
}

/// Run `p` and rewind the input on success.
pub fn look_ahead(p: Parser) -> Parser {
    Parser::look_ahead(p)
}

/// Succeed (with `()`) exactly when `p` fails; never consumes.
pub fn not_followed_by(p: Parser) -> Parser {
    Parser::not_followed_by(p)
}

/// Replace the expected set reported when `p` fails at its start.
pub fn label(p: Parser, msg: &str) -> Parser {
    Parser::label(p, Rc::from(msg))
}

/// Zero or more `p`, collected into a list.
pub fn many(p: Parser) -> Parser {
    Parser::many(p)
}

/// Zero or more `p`, discarding the results.
pub fn skip_many(p: Parser) -> Parser {
    Parser::skip_many(p)
}

/// `p` repeatedly until `end` matches; yields the collected `p` results.
pub fn many_until(p: Parser, end: Parser) -> Parser {
    let stop = end.then(pure(Value::opaque(IterStop)));
    Parser::many_until(stop.or(p))
}

/// Choose by a parsed boolean.
pub fn if_else(b: Parser, p: Parser, q: Parser) -> Parser {
    Parser::ternary(b, p, q)
}

/// Apply a two-argument function across two parsers.
pub fn lift2(f: impl Fn(Value, Value) -> Value + 'static, p: Parser, q: Parser) -> Parser {
    Parser::lift2(Func2::new(f), p, q)
}

/// Apply a three-argument function across three parsers.
pub fn lift3(
    f: impl Fn(Value, Value, Value) -> Value + 'static,
    p: Parser,
    q: Parser,
    r: Parser,
) -> Parser {
    Parser::lift3(Func3::new(f), p, q, r)
}

/// Run each parser in order, collecting the results.
pub fn sequence(ps: Vec<Parser>) -> Parser {
    let mut acc = pure(Value::list(Vec::new()));
    for p in ps {
        acc = lift2(
            |xs, x| {
                let mut items = xs.as_list().as_ref().clone();
                items.push(x);
                Value::list(items)
            },
            acc,
            p,
        );
    }
    acc
}

/// `sequence` over `f` applied to each seed value.
pub fn traverse(f: impl Fn(&Value) -> Parser, xs: &[Value]) -> Parser {
    sequence(xs.iter().map(f).collect())
}

/// Wrap a parser as a value, for `join`.
pub fn parser_value(p: Parser) -> Value {
    Value::opaque(p)
}

/// Collapse a parser-valued parser.
pub fn join(p: Parser) -> Parser {
    p.bind(|v| {
        v.downcast_ref::<Parser>()
            .expect("join applied to a non-parser value")
            .clone()
    })
}

/// `p`, then zero or more prefix operators applied right-to-left.
///
/// `op` must yield unary function values.
pub fn chain_pre(p: Parser, op: Parser) -> Parser {
    Parser::chain_pre(p, op)
}

/// `p`, then zero or more postfix operators applied left-to-right.
pub fn chain_post(p: Parser, op: Parser) -> Parser {
    Parser::chain_post(p, op)
}

/// One or more `p` separated by left-associative binary operators.
///
/// `op` must yield curried binary function values (see [`Value::func2`]).
pub fn chainl1(p: Parser, op: Parser) -> Parser {
    Parser::chain_left(p, op)
}

/// One or more `p` separated by right-associative binary operators.
pub fn chainr1(p: Parser, op: Parser) -> Parser {
    Parser::chain_right(p, op)
}

/// One or more `p` separated by `sep`, allowing a trailing separator.
pub fn sep_end_by1(p: Parser, sep: Parser) -> Parser {
    Parser::sep_end_by1(p, sep)
}

/// Defer construction; the thunk is forced once, at compile time.
pub fn lazy(thunk: impl Fn() -> Parser + 'static) -> Parser {
    Parser::lazy(thunk)
}

/// Tie a recursive knot: `f` receives a handle to the parser being defined.
pub fn recursive(f: impl FnOnce(Parser) -> Parser) -> Parser {
    Parser::recursive(f)
}

/// Sequencing, choice, and filtering as methods.
pub trait ParserExt: Sized {
    /// Map the result through `f`.
    fn map(self, f: impl Fn(Value) -> Value + 'static) -> Parser;
    /// Applicative application: `self` yields a function, `arg` its input.
    fn ap(self, arg: Parser) -> Parser;
    /// Sequence, keeping the right result.
    fn then(self, q: Parser) -> Parser;
    /// Sequence, keeping the left result.
    fn before(self, q: Parser) -> Parser;
    /// Monadic continuation.
    fn bind(self, k: impl Fn(Value) -> Parser + 'static) -> Parser;
    /// Alternation with implicit cut: the right branch runs only if the
    /// left failed without consuming input.
    fn or(self, q: Parser) -> Parser;
    /// Fail (consuming nothing) unless the result satisfies `pred`.
    fn filter(self, pred: impl Fn(&Value) -> bool + 'static) -> Parser;
    /// Like `filter`, failing with a fixed message.
    fn filter_or_fail(self, pred: impl Fn(&Value) -> bool + 'static, msg: &str) -> Parser;
    /// Like `filter`, failing with a message built from the offending value.
    fn filter_with(
        self,
        pred: impl Fn(&Value) -> bool + 'static,
        msg_of: impl Fn(&Value) -> String + 'static,
    ) -> Parser;
    /// Parse, then fail with a message built from the result.
    fn fail_with(self, msg_of: impl Fn(&Value) -> String + 'static) -> Parser;
    /// Parse, then fail reporting the result as unexpected.
    fn unexpected_with(self, msg_of: impl Fn(&Value) -> String + 'static) -> Parser;
    /// Replace the expected set reported at this parser's start.
    fn expects(self, msg: &str) -> Parser;
    /// Report entry and exit to the run's tracer.
    fn debug(self, name: &str, pause: Breakpoint) -> Parser;
}

impl ParserExt for Parser {
    fn map(self, f: impl Fn(Value) -> Value + 'static) -> Parser {
        Parser::apply(pure(Value::func(f)), self)
    }

    fn ap(self, arg: Parser) -> Parser {
        Parser::apply(self, arg)
    }

    fn then(self, q: Parser) -> Parser {
        Parser::then_right(self, q)
    }

    fn before(self, q: Parser) -> Parser {
        Parser::then_left(self, q)
    }

    fn bind(self, k: impl Fn(Value) -> Parser + 'static) -> Parser {
        Parser::bind(self, Binder::new(k))
    }

    fn or(self, q: Parser) -> Parser {
        Parser::alt(self, q)
    }

    fn filter(self, pred: impl Fn(&Value) -> bool + 'static) -> Parser {
        Parser::ensure(self, Pred::new(pred))
    }

    fn filter_or_fail(self, pred: impl Fn(&Value) -> bool + 'static, msg: &str) -> Parser {
        Parser::guard(self, Pred::new(pred), Rc::from(msg))
    }

    fn filter_with(
        self,
        pred: impl Fn(&Value) -> bool + 'static,
        msg_of: impl Fn(&Value) -> String + 'static,
    ) -> Parser {
        Parser::fast_guard(self, Pred::new(pred), MsgGen::new(msg_of))
    }

    fn fail_with(self, msg_of: impl Fn(&Value) -> String + 'static) -> Parser {
        Parser::fast_fail(self, MsgGen::new(msg_of))
    }

    fn unexpected_with(self, msg_of: impl Fn(&Value) -> String + 'static) -> Parser {
        Parser::fast_unexpected(self, MsgGen::new(msg_of))
    }

    fn expects(self, msg: &str) -> Parser {
        label(self, msg)
    }

    fn debug(self, name: &str, pause: Breakpoint) -> Parser {
        Parser::debug(self, Rc::from(name), pause)
    }
}
