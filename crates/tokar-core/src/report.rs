//! Builder-pattern renderer for parse errors against their source.

use annotate_snippets::{AnnotationKind, Level, Renderer, Snippet};

use crate::error::ParseError;

/// Renders a [`ParseError`] as an annotated snippet.
pub struct ErrorPrinter<'e, 's> {
    error: &'e ParseError,
    source: &'s str,
    path: Option<&'s str>,
    colored: bool,
}

impl<'e, 's> ErrorPrinter<'e, 's> {
    pub fn new(error: &'e ParseError, source: &'s str) -> Self {
        Self {
            error,
            source,
            path: None,
            colored: false,
        }
    }

    pub fn path(mut self, path: &'s str) -> Self {
        self.path = Some(path);
        self
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        let message = self.error.summary();
        let range = self.byte_range();

        let mut snippet = Snippet::source(self.source)
            .line_start(1)
            .annotation(AnnotationKind::Primary.span(range).label(&message));
        if let Some(p) = self.path {
            snippet = snippet.path(p);
        }

        let report = [Level::ERROR.primary_title("parse error").element(snippet)];
        renderer.render(&report).to_string()
    }

    /// The error offset counts code points; the snippet span wants bytes.
    fn byte_range(&self) -> std::ops::Range<usize> {
        match self.source.char_indices().nth(self.error.offset) {
            Some((i, c)) => i..i + c.len_utf8(),
            // Failure at end of input: point at the final code point.
            None => match self.source.char_indices().last() {
                Some((i, c)) => i..i + c.len_utf8(),
                None => 0..0,
            },
        }
    }
}
