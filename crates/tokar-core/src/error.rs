//! The user-facing parse error.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexSet;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::pos::Pos;

/// Failure report carried out of a run.
///
/// `offset` is the code-point index of the longest-match failure position.
/// The expected set keeps insertion order so reports are deterministic.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseError {
    pub offset: usize,
    pub pos: Pos,
    pub expected: IndexSet<Rc<str>>,
    pub unexpected: Option<Rc<str>>,
    pub messages: Vec<Rc<str>>,
}

impl ParseError {
    /// Empty failure at a position; callers layer labels onto it.
    pub fn at(offset: usize, pos: Pos) -> ParseError {
        ParseError {
            offset,
            pos,
            expected: IndexSet::new(),
            unexpected: None,
            messages: Vec::new(),
        }
    }

    pub fn expecting(mut self, label: Rc<str>) -> ParseError {
        self.expected.insert(label);
        self
    }

    pub fn expecting_all(mut self, labels: impl IntoIterator<Item = Rc<str>>) -> ParseError {
        self.expected.extend(labels);
        self
    }

    pub fn with_unexpected(mut self, what: Rc<str>) -> ParseError {
        self.unexpected = Some(what);
        self
    }

    pub fn with_message(mut self, msg: Rc<str>) -> ParseError {
        self.messages.push(msg);
        self
    }

    /// Replace the expected set with a single label. Applied when a labelled
    /// call site fails at its entry position.
    pub fn relabel(&mut self, label: Rc<str>) {
        self.expected.clear();
        self.expected.insert(label);
    }

    /// Merge another failure into this one: a later offset dominates, equal
    /// offsets union their expected sets and messages.
    pub fn merge(&mut self, other: ParseError) {
        if other.offset > self.offset {
            *self = other;
        } else if other.offset == self.offset {
            self.expected.extend(other.expected);
            if self.unexpected.is_none() {
                self.unexpected = other.unexpected;
            }
            self.messages.extend(other.messages);
        }
    }

    /// One-line summary used by `Display` and the snippet renderer.
    pub fn summary(&self) -> String {
        if !self.messages.is_empty() {
            return self
                .messages
                .iter()
                .map(|m| m.as_ref())
                .collect::<Vec<_>>()
                .join("; ");
        }
        let mut out = String::new();
        if let Some(unexpected) = &self.unexpected {
            out.push_str("unexpected ");
            out.push_str(unexpected);
        }
        if !self.expected.is_empty() {
            if !out.is_empty() {
                out.push_str("; ");
            }
            out.push_str("expected ");
            let labels: Vec<&str> = self.expected.iter().map(|l| l.as_ref()).collect();
            out.push_str(&labels.join(" or "));
        }
        if out.is_empty() {
            out.push_str("unknown parse error");
        }
        out
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parse error at line {}, column {}: {}",
            self.pos.line,
            self.pos.col,
            self.summary()
        )
    }
}

impl std::error::Error for ParseError {}

impl Serialize for ParseError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_struct("ParseError", 5)?;
        s.serialize_field("offset", &self.offset)?;
        s.serialize_field("pos", &self.pos)?;
        let expected: Vec<&str> = self.expected.iter().map(|l| l.as_ref()).collect();
        s.serialize_field("expected", &expected)?;
        s.serialize_field("unexpected", &self.unexpected.as_deref())?;
        let messages: Vec<&str> = self.messages.iter().map(|m| m.as_ref()).collect();
        s.serialize_field("messages", &messages)?;
        s.end()
    }
}
