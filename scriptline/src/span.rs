//! Source positions shared by diagnostics and fragment boundaries.
//!
//! Lines and columns are 1-based. The absolute offset is optional because
//! positions reported by external collaborators often carry only
//! line/column; fragment merging requires it.

/// A single position in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// Line number (1-based).
    pub line: usize,
    /// Column number (1-based, in bytes).
    pub column: usize,
    /// Byte offset from the start of the text (0-based), when known.
    pub offset: Option<usize>,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self {
            line,
            column,
            offset: None,
        }
    }

    pub const fn with_offset(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset: Some(offset),
        }
    }

    /// The very beginning of a source text.
    pub const fn origin() -> Self {
        Self::with_offset(1, 1, 0)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A contiguous region of source text, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Byte offsets of both ends, if both are known.
    pub fn offsets(&self) -> Option<(usize, usize)> {
        Some((self.start.offset?, self.end.offset?))
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Where a diagnostic points: a position, optionally extended to a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub start: Position,
    pub end: Option<Position>,
}

impl Location {
    pub const fn at(start: Position) -> Self {
        Self { start, end: None }
    }

    pub const fn spanning(range: Range) -> Self {
        Self {
            start: range.start,
            end: Some(range.end),
        }
    }
}

impl From<Range> for Location {
    fn from(range: Range) -> Self {
        Self::spanning(range)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}-{}", self.start, end),
            None => write!(f, "{}", self.start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_offsets_require_both_ends() {
        let full = Range::new(
            Position::with_offset(1, 1, 0),
            Position::with_offset(1, 5, 4),
        );
        assert_eq!(full.offsets(), Some((0, 4)));

        let partial =
            Range::new(Position::with_offset(1, 1, 0), Position::new(1, 5));
        assert_eq!(partial.offsets(), None);
    }

    #[test]
    fn display_location() {
        let point = Location::at(Position::new(3, 7));
        assert_eq!(point.to_string(), "3:7");

        let range = Location::from(Range::new(
            Position::new(1, 2),
            Position::new(4, 1),
        ));
        assert_eq!(range.to_string(), "1:2-4:1");
    }
}
