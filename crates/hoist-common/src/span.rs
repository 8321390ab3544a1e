//! Half-open byte ranges into source text.

use serde::{Deserialize, Serialize};

/// A half-open byte range `[start, end)` into a source text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub const EMPTY: Span = Span { start: 0, end: 0 };

    #[inline]
    pub const fn new(start: u32, end: u32) -> Span {
        Span { start, end }
    }

    #[inline]
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether `offset` lies inside `[start, end)`.
    #[inline]
    pub const fn contains(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Whether `other` lies entirely inside this span.
    #[inline]
    pub const fn encloses(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Move both ends by a non-negative offset.
    #[inline]
    pub const fn offset_by(self, by: u32) -> Span {
        Span {
            start: self.start + by,
            end: self.end + by,
        }
    }

    /// Slice the span's text out of `source`, if it lies on char boundaries.
    pub fn text<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.get(self.start as usize..self.end as usize)
    }
}

/// Apply a signed length delta to an offset, clamping at zero.
#[inline]
pub fn shift_offset(offset: u32, delta: i64) -> u32 {
    let shifted = i64::from(offset) + delta;
    if shifted <= 0 {
        0
    } else {
        u32::try_from(shifted).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_half_open() {
        let span = Span::new(3, 7);
        assert!(!span.contains(2));
        assert!(span.contains(3));
        assert!(span.contains(6));
        assert!(!span.contains(7));
    }

    #[test]
    fn shift_offset_clamps_negative() {
        assert_eq!(shift_offset(10, -4), 6);
        assert_eq!(shift_offset(3, -10), 0);
        assert_eq!(shift_offset(3, 5), 8);
    }
}
