//! Position Translator
//!
//! Converts between absolute character offsets and `(line, column)` coordinates.
//!
//! # Overview
//!
//! Everything in this module is pure: the functions take the *current* line array and return a
//! freshly derived value, so a [`Position`] never has to be trusted across a buffer mutation.
//!
//! - Offsets and columns are counted in Unicode scalar values (`char`), not bytes.
//! - Every line except the last contributes `len + 1` to the running offset (the `'\n'`).
//! - Out-of-range input is clamped to the nearest valid coordinate; nothing here fails.
//!
//! [`LineStarts`] answers the same questions in `O(log n)` using a prefix-sum table. The
//! [`DocumentBuffer`](crate::DocumentBuffer) owns one and rebuilds it on every content change.
//!
//! # Example
//!
//! ```rust
//! use vellum_core::position::{offset_to_position, position_to_offset};
//!
//! let lines = ["foo", "bar", "baz"];
//! let pos = offset_to_position(5, &lines);
//! assert_eq!((pos.line, pos.column, pos.offset), (1, 1, 5));
//! assert_eq!(position_to_offset(1, 1, &lines), 5);
//! ```

use std::cmp::Ordering;
use std::ops::{Range, RangeInclusive};

/// A caret location expressed both as `(line, column)` and as an absolute offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    /// Zero-based logical line index.
    pub line: usize,
    /// Zero-based column in characters within the line.
    pub column: usize,
    /// Zero-based character offset from the start of the document.
    pub offset: usize,
}

impl Position {
    /// Create a position from already-consistent coordinates.
    ///
    /// Callers that only know one representation should go through [`offset_to_position`] or
    /// [`clamp_position`] instead.
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }

    /// The start of the document.
    pub fn zero() -> Self {
        Self::default()
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line
            .cmp(&other.line)
            .then_with(|| self.column.cmp(&other.column))
            .then_with(|| self.offset.cmp(&other.offset))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A span between two positions.
///
/// A range handed in by a caller may be reversed; use [`TextRange::normalized`] before relying on
/// `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextRange {
    /// First endpoint.
    pub start: Position,
    /// Second endpoint.
    pub end: Position,
}

impl TextRange {
    /// Create a range from two endpoints (not normalized).
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A zero-width range at `position`.
    pub fn collapsed(position: Position) -> Self {
        Self::new(position, position)
    }

    /// Return the range with `start <= end` in `(line, column)` order.
    pub fn normalized(self) -> Self {
        if self.start <= self.end {
            self
        } else {
            Self::new(self.end, self.start)
        }
    }

    /// Returns `true` if both endpoints address the same location.
    pub fn is_empty(&self) -> bool {
        self.start.line == self.end.line && self.start.column == self.end.column
    }

    /// Returns `true` if the range starts and ends on the same line.
    pub fn is_single_line(&self) -> bool {
        self.start.line == self.end.line
    }

    /// Normalized half-open character offsets covered by this range.
    pub fn offsets(&self) -> Range<usize> {
        let normalized = self.normalized();
        normalized.start.offset..normalized.end.offset
    }

    /// Lines touched by the range (inclusive on both ends).
    pub fn lines(&self) -> RangeInclusive<usize> {
        let normalized = self.normalized();
        normalized.start.line..=normalized.end.line
    }
}

pub(crate) fn char_len(line: &str) -> usize {
    line.chars().count()
}

/// Convert an absolute character offset to a [`Position`].
///
/// Offsets beyond the end of the document clamp to end-of-document.
pub fn offset_to_position<S: AsRef<str>>(offset: usize, lines: &[S]) -> Position {
    let mut line_start = 0usize;

    for (idx, line) in lines.iter().enumerate() {
        let len = char_len(line.as_ref());
        let is_last = idx + 1 == lines.len();

        if offset <= line_start + len || is_last {
            let column = offset.saturating_sub(line_start).min(len);
            return Position::new(idx, column, line_start + column);
        }

        line_start += len + 1;
    }

    Position::zero()
}

/// Convert `(line, column)` to an absolute character offset.
///
/// The column is clamped to the target line's length; a line past the end of the document maps
/// to end-of-document.
pub fn position_to_offset<S: AsRef<str>>(line: usize, column: usize, lines: &[S]) -> usize {
    let mut offset = 0usize;

    for (idx, text) in lines.iter().enumerate() {
        let len = char_len(text.as_ref());
        if idx == line {
            return offset + column.min(len);
        }
        offset += len;
        if idx + 1 < lines.len() {
            offset += 1;
        }
    }

    offset
}

/// Re-derive a consistent [`Position`] from possibly out-of-range `(line, column)`.
pub fn clamp_position<S: AsRef<str>>(line: usize, column: usize, lines: &[S]) -> Position {
    offset_to_position(position_to_offset(line, column, lines), lines)
}

/// Prefix-sum line table for `O(log n)` offset/position conversion.
///
/// Produces exactly the same answers as [`offset_to_position`] / [`position_to_offset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineStarts {
    starts: Vec<usize>,
    lens: Vec<usize>,
    total: usize,
}

impl LineStarts {
    /// Build the table for the given lines. An empty slice is treated as one empty line.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut starts = Vec::with_capacity(lines.len().max(1));
        let mut lens = Vec::with_capacity(lines.len().max(1));
        let mut offset = 0usize;

        for (idx, line) in lines.iter().enumerate() {
            let len = char_len(line.as_ref());
            starts.push(offset);
            lens.push(len);
            offset += len;
            if idx + 1 < lines.len() {
                offset += 1;
            }
        }

        if starts.is_empty() {
            starts.push(0);
            lens.push(0);
        }

        Self {
            starts,
            lens,
            total: offset,
        }
    }

    /// Number of lines in the table (always at least one).
    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Total character count, including line terminators.
    pub fn total_len(&self) -> usize {
        self.total
    }

    /// Offset of the first character of `line` (clamped to the last line).
    pub fn line_start(&self, line: usize) -> usize {
        let line = line.min(self.starts.len() - 1);
        self.starts[line]
    }

    /// Length of `line` in characters, excluding the terminator. Zero past the end.
    pub fn line_len(&self, line: usize) -> usize {
        self.lens.get(line).copied().unwrap_or(0)
    }

    /// Same as [`offset_to_position`].
    pub fn offset_to_position(&self, offset: usize) -> Position {
        let offset = offset.min(self.total);
        let line = self
            .starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let column = (offset - self.starts[line]).min(self.lens[line]);
        Position::new(line, column, self.starts[line] + column)
    }

    /// Same as [`position_to_offset`].
    pub fn position_to_offset(&self, line: usize, column: usize) -> usize {
        if line >= self.starts.len() {
            return self.total;
        }
        self.starts[line] + column.min(self.lens[line])
    }

    /// Same as [`clamp_position`].
    pub fn clamp_position(&self, line: usize, column: usize) -> Position {
        self.offset_to_position(self.position_to_offset(line, column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINES: [&str; 3] = ["foo", "bar", "baz"];

    #[test]
    fn test_offset_to_position_walks_lines() {
        assert_eq!(offset_to_position(0, &LINES), Position::new(0, 0, 0));
        assert_eq!(offset_to_position(3, &LINES), Position::new(0, 3, 3));
        assert_eq!(offset_to_position(4, &LINES), Position::new(1, 0, 4));
        assert_eq!(offset_to_position(5, &LINES), Position::new(1, 1, 5));
        assert_eq!(offset_to_position(11, &LINES), Position::new(2, 3, 11));
    }

    #[test]
    fn test_offset_past_end_clamps() {
        assert_eq!(offset_to_position(999, &LINES), Position::new(2, 3, 11));
    }

    #[test]
    fn test_position_to_offset_clamps_column() {
        assert_eq!(position_to_offset(1, 1, &LINES), 5);
        assert_eq!(position_to_offset(1, 50, &LINES), 7);
        assert_eq!(position_to_offset(9, 0, &LINES), 11);
    }

    #[test]
    fn test_empty_document_is_one_empty_line() {
        let lines = [""];
        assert_eq!(offset_to_position(10, &lines), Position::zero());
        assert_eq!(position_to_offset(0, 10, &lines), 0);

        let none: [&str; 0] = [];
        assert_eq!(offset_to_position(3, &none), Position::zero());
        assert_eq!(LineStarts::from_lines(&none).line_count(), 1);
    }

    #[test]
    fn test_multibyte_columns_are_chars() {
        let lines = ["a👋b", "你好"];
        assert_eq!(offset_to_position(2, &lines), Position::new(0, 2, 2));
        assert_eq!(offset_to_position(5, &lines), Position::new(1, 1, 5));
        assert_eq!(position_to_offset(1, 2, &lines), 6);
    }

    #[test]
    fn test_round_trip_every_offset() {
        let lines = ["", "abc", "", "de", ""];
        let total = LineStarts::from_lines(&lines).total_len();
        for offset in 0..=total {
            let pos = offset_to_position(offset, &lines);
            assert_eq!(position_to_offset(pos.line, pos.column, &lines), offset);
        }
    }

    #[test]
    fn test_line_starts_agrees_with_linear_walk() {
        let lines = ["fn main() {", "    let x = 1;", "", "}"];
        let table = LineStarts::from_lines(&lines);
        for offset in 0..=table.total_len() + 3 {
            assert_eq!(
                table.offset_to_position(offset),
                offset_to_position(offset, &lines)
            );
        }
        for line in 0..6 {
            for column in 0..20 {
                assert_eq!(
                    table.position_to_offset(line, column),
                    position_to_offset(line, column, &lines)
                );
            }
        }
    }

    #[test]
    fn test_range_normalization() {
        let a = Position::new(2, 1, 9);
        let b = Position::new(0, 4, 4);
        let range = TextRange::new(a, b).normalized();
        assert_eq!(range.start, b);
        assert_eq!(range.end, a);
        assert_eq!(range.offsets(), 4..9);
        assert_eq!(range.lines(), 0..=2);
        assert!(!range.is_single_line());
        assert!(TextRange::collapsed(a).is_empty());
    }
}
