//! Source positions over code points.

use serde::Serialize;

/// Tab stops sit at every fourth column.
pub const TAB_WIDTH: u32 = 4;

/// Zero-based line/column position.
///
/// Positions count code points, not bytes or grapheme clusters. A newline
/// bumps the line and resets the column; a tab advances the column to the
/// next multiple of [`TAB_WIDTH`]; every other code point advances it by one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

impl Pos {
    pub fn start() -> Pos {
        Pos { line: 0, col: 0 }
    }

    /// Position after consuming `c`.
    pub fn advance(self, c: char) -> Pos {
        match c {
            '\n' => Pos {
                line: self.line + 1,
                col: 0,
            },
            '\t' => Pos {
                line: self.line,
                col: (self.col / TAB_WIDTH + 1) * TAB_WIDTH,
            },
            _ => Pos {
                line: self.line,
                col: self.col + 1,
            },
        }
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}
