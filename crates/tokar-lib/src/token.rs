//! Token-layer leaves.
//!
//! These are the leaves the alternation tablifier knows how to
//! discriminate by first character, alongside `ch` and `string`.

use std::rc::Rc;

use tokar_compiler::Parser;

/// Match a keyword atomically: the literal must not be followed by an
/// identifier character. Yields `()`.
pub fn keyword(s: &str) -> Parser {
    Parser::keyword(Rc::from(s))
}

/// Match an operator atomically: the literal must not be followed by
/// another operator character. Yields `()`.
pub fn operator(s: &str) -> Parser {
    Parser::operator(Rc::from(s))
}

/// A double-quoted string literal with escape processing; yields the
/// unescaped contents.
pub fn string_literal() -> Parser {
    Parser::string_literal(false)
}

/// A double-quoted string literal without escape processing.
pub fn raw_string_literal() -> Parser {
    Parser::string_literal(true)
}
