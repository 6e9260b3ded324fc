//! Source locations.

#[cfg(test)]
#[path = "./span_tests.rs"]
mod tests;

use std::ops::Range;

/// Byte range of a key, value or header in the parsed text.
///
/// Values created through [`Document::set`](crate::Document::set) and
/// friends have no source text and carry `Span::default()`.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug, Hash)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    #[inline]
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// True for the span of values that were never parsed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == 0 && self.end == 0
    }

    /// The text this span covers in `source`, or `None` when the span
    /// does not belong to it.
    pub fn slice<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.get(Range::from(*self))
    }
}

impl From<Span> for Range<usize> {
    fn from(s: Span) -> Self {
        s.start as usize..s.end as usize
    }
}
