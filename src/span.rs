//! Byte ranges into a cell's text, so diagnostics can underline the part of
//! a JSON payload that failed.

/// Byte offset into cell text
pub type Pos = usize;

/// A byte range `start..start + len` of cell text.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy)]
pub struct Span {
    /// First byte
    pub start: Pos,
    /// Number of bytes
    pub len: usize,
}

impl Span {
    /// `len` bytes from `start`.
    pub fn new(start: Pos, len: usize) -> Self {
        Span { start, len }
    }

    /// The range `start..end`; empty if `end` precedes `start`.
    pub fn between(start: Pos, end: Pos) -> Self {
        Span::new(start, end.saturating_sub(start))
    }

    /// One past the last byte.
    pub fn end(&self) -> Pos {
        self.start + self.len
    }

    /// The covered part of `text`, if the range lies on char boundaries
    /// within it.
    pub fn snippet<'t>(&self, text: &'t str) -> Option<&'t str> {
        text.get(self.start..self.end())
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        (span.start, span.len).into()
    }
}

/// A token with the range it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Spanned<T> {
    pub node: T,
    pub span: Span,
}
