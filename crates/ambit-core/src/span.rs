//! Checked index ranges.
//!
//! The projection layers splice contiguous runs of rows and address
//! sub-ranges of cell text. [`Span`] is the value type for those
//! ranges: a half-open `begin..end` pair that is valid by
//! construction, so downstream code never has to re-check ordering.

/// Error raised when a caller-supplied range is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanError {
    /// Begin index is greater than end index.
    Inverted {
        /// Inclusive begin index.
        begin: usize,
        /// Exclusive end index.
        end: usize,
    },
    /// Range reaches past the container it addresses.
    OutOfBounds {
        /// Exclusive end index.
        end: usize,
        /// Length of the addressed container.
        len: usize,
    },
}

impl std::fmt::Display for SpanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpanError::Inverted { begin, end } => {
                write!(f, "Invalid span: begin {} > end {}", begin, end)
            }
            SpanError::OutOfBounds { end, len } => {
                write!(f, "Span end {} exceeds length {}", end, len)
            }
        }
    }
}

impl std::error::Error for SpanError {}

/// A half-open index range `begin..end` with `begin <= end` guaranteed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    begin: usize,
    end: usize,
}

impl Span {
    /// Creates a span from explicit bounds, rejecting inverted ranges.
    pub fn new(begin: usize, end: usize) -> Result<Self, SpanError> {
        if begin > end {
            return Err(SpanError::Inverted { begin, end });
        }
        Ok(Span { begin, end })
    }

    /// Creates a span from a begin index and a length. Cannot be
    /// inverted, so it never fails.
    pub fn at(begin: usize, len: usize) -> Self {
        Span {
            begin,
            end: begin + len,
        }
    }

    /// Empty span positioned at `index`.
    pub fn empty_at(index: usize) -> Self {
        Span {
            begin: index,
            end: index,
        }
    }

    /// Inclusive begin index.
    pub fn begin(&self) -> usize {
        self.begin
    }

    /// Exclusive end index.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of indexes covered.
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    /// Whether the span covers nothing.
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Whether `index` falls inside the span.
    pub fn contains(&self, index: usize) -> bool {
        self.begin <= index && index < self.end
    }

    /// The span as a std range, for direct slice indexing.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.begin..self.end
    }

    /// Borrows the covered part of `slice`, checking the upper bound.
    pub fn slice<'a, T>(&self, slice: &'a [T]) -> Result<&'a [T], SpanError> {
        if self.end > slice.len() {
            return Err(SpanError::OutOfBounds {
                end: self.end,
                len: slice.len(),
            });
        }
        Ok(&slice[self.range()])
    }

    /// Sub-span addressed relative to this span's begin.
    pub fn subspan(&self, begin: usize, end: usize) -> Result<Self, SpanError> {
        let sub = Span::new(self.begin + begin, self.begin + end)?;
        if sub.end > self.end {
            return Err(SpanError::OutOfBounds {
                end: sub.end,
                len: self.end,
            });
        }
        Ok(sub)
    }

    /// Same range shifted right by `amount`.
    pub fn shifted(&self, amount: usize) -> Self {
        Span {
            begin: self.begin + amount,
            end: self.end + amount,
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.begin, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_inverted_range() {
        let result = Span::new(5, 3);
        assert!(matches!(
            result,
            Err(SpanError::Inverted { begin: 5, end: 3 })
        ));
    }

    #[test]
    fn test_at_builds_valid_span() {
        let span = Span::at(2, 3);
        assert_eq!(span.begin(), 2);
        assert_eq!(span.end(), 5);
        assert_eq!(span.len(), 3);
        assert!(!span.is_empty());
    }

    #[test]
    fn test_empty_at() {
        let span = Span::empty_at(4);
        assert!(span.is_empty());
        assert_eq!(span.begin(), 4);
        assert_eq!(span.end(), 4);
    }

    #[test]
    fn test_contains_is_half_open() {
        let span = Span::at(1, 2);
        assert!(!span.contains(0));
        assert!(span.contains(1));
        assert!(span.contains(2));
        assert!(!span.contains(3));
    }

    #[test]
    fn test_slice_checks_upper_bound() {
        let data = [10, 20, 30];
        let ok = Span::at(1, 2).slice(&data).unwrap();
        assert_eq!(ok, &[20, 30]);

        let result = Span::at(1, 4).slice(&data);
        assert!(matches!(
            result,
            Err(SpanError::OutOfBounds { end: 5, len: 3 })
        ));
    }

    #[test]
    fn test_subspan_relative_addressing() {
        let span = Span::at(10, 5);
        let sub = span.subspan(1, 3).unwrap();
        assert_eq!(sub.begin(), 11);
        assert_eq!(sub.end(), 13);

        assert!(span.subspan(2, 1).is_err());
        assert!(span.subspan(0, 6).is_err());
    }

    #[test]
    fn test_shifted() {
        let span = Span::at(3, 2).shifted(4);
        assert_eq!(span.begin(), 7);
        assert_eq!(span.end(), 9);
    }
}
