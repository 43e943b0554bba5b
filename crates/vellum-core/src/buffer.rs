//! Document Buffer
//!
//! The single source of truth for document text.
//!
//! The buffer keeps the LF-normalized content together with a derived line array and a
//! [`LineStarts`] table. Both are rebuilt by the one internal writer, `set_content_internal`, so
//! `lines.join("\n") == content` holds after every mutation. A monotonically increasing
//! [`version`](DocumentBuffer::version) lets asynchronous consumers detect staleness.

use std::fmt;
use std::sync::Arc;

use crate::delta::TextEdit;
use crate::line_ending::LineEnding;
use crate::position::{LineStarts, Position, TextRange};

/// Identifier of an open document (usually its path or URI).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(Arc<str>);

impl DocumentId {
    /// Create an identifier.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

/// LF-normalized document text with a derived line table.
#[derive(Debug, Clone)]
pub struct DocumentBuffer {
    content: String,
    lines: Vec<String>,
    line_starts: LineStarts,
    line_ending: LineEnding,
    version: u64,
}

impl DocumentBuffer {
    /// Create a buffer from text, detecting and normalizing its line ending.
    pub fn new(text: &str) -> Self {
        let mut buffer = Self {
            content: String::new(),
            lines: vec![String::new()],
            line_starts: LineStarts::from_lines(&[""]),
            line_ending: LineEnding::detect(text),
            version: 0,
        };
        buffer.content = LineEnding::normalize(text);
        buffer.rebuild_lines();
        buffer
    }

    /// Replace the whole content. CRLF is normalized to LF and the version is bumped.
    pub fn set_content(&mut self, text: &str) {
        self.set_content_internal(LineEnding::normalize(text));
    }

    fn set_content_internal(&mut self, content: String) {
        self.content = content;
        self.rebuild_lines();
        self.version = self.version.wrapping_add(1);
    }

    fn rebuild_lines(&mut self) {
        self.lines = self.content.split('\n').map(str::to_string).collect();
        self.line_starts = LineStarts::from_lines(&self.lines);
    }

    /// The full LF-normalized content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The line array derived from the content (never empty).
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The line at `index`, without its terminator.
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// Number of logical lines (at least one).
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Length of `line` in characters; zero past the end.
    pub fn line_len(&self, line: usize) -> usize {
        self.line_starts.line_len(line)
    }

    /// Total number of characters, including `'\n'` terminators.
    pub fn char_count(&self) -> usize {
        self.line_starts.total_len()
    }

    /// Prefix-sum table for the current lines.
    pub fn line_starts(&self) -> &LineStarts {
        &self.line_starts
    }

    /// Monotonic content version, bumped on every mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Line ending that was detected on load (used when saving).
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Override the line ending used for saving.
    pub fn set_line_ending(&mut self, line_ending: LineEnding) {
        self.line_ending = line_ending;
    }

    /// Content converted to the preferred line ending.
    pub fn text_for_saving(&self) -> String {
        self.line_ending.apply_to_text(&self.content)
    }

    /// Convert a character offset to a clamped position.
    pub fn offset_to_position(&self, offset: usize) -> Position {
        self.line_starts.offset_to_position(offset)
    }

    /// Convert `(line, column)` to a clamped character offset.
    pub fn position_to_offset(&self, line: usize, column: usize) -> usize {
        self.line_starts.position_to_offset(line, column)
    }

    /// Re-derive a consistent position from `(line, column)`.
    pub fn position_at(&self, line: usize, column: usize) -> Position {
        self.line_starts.clamp_position(line, column)
    }

    /// Re-derive a stored position against the current content, trusting its `(line, column)`.
    pub fn clamp_position(&self, position: Position) -> Position {
        self.position_at(position.line, position.column)
    }

    /// Re-derive a range against the current content (keeps its direction).
    pub fn clamp_range(&self, range: TextRange) -> TextRange {
        TextRange::new(
            self.clamp_position(range.start),
            self.clamp_position(range.end),
        )
    }

    /// Range spanning two offsets (clamped, not normalized).
    pub fn range_from_offsets(&self, start: usize, end: usize) -> TextRange {
        TextRange::new(self.offset_to_position(start), self.offset_to_position(end))
    }

    /// Text between two character offsets (order-insensitive, clamped).
    pub fn text_in(&self, start: usize, end: usize) -> String {
        let (start, end) = self.clamp_span(start, end);
        self.content.chars().skip(start).take(end - start).collect()
    }

    /// Insert `text` at `offset`. Returns the applied edit.
    pub fn insert(&mut self, offset: usize, text: &str) -> TextEdit {
        let offset = offset.min(self.char_count());
        self.replace(offset, offset, text)
    }

    /// Delete the characters in `[start, end)`. Returns the applied edit.
    pub fn delete(&mut self, start: usize, end: usize) -> TextEdit {
        self.replace(start, end, "")
    }

    /// Replace the characters in `[start, end)` with `text`. Returns the applied edit.
    ///
    /// Offsets are clamped and may be given in either order. A no-op edit leaves the version
    /// untouched.
    pub fn replace(&mut self, start: usize, end: usize, text: &str) -> TextEdit {
        let (start, end) = self.clamp_span(start, end);
        let inserted = LineEnding::normalize(text);

        let start_byte = self.byte_index(start);
        let end_byte = self.byte_index(end);
        let deleted = self.content[start_byte..end_byte].to_string();
        let edit = TextEdit::new(start, deleted, inserted);

        if edit.is_noop() {
            return edit;
        }

        let mut next = String::with_capacity(self.content.len() + edit.inserted.len());
        next.push_str(&self.content[..start_byte]);
        next.push_str(&edit.inserted);
        next.push_str(&self.content[end_byte..]);
        self.set_content_internal(next);

        edit
    }

    fn clamp_span(&self, start: usize, end: usize) -> (usize, usize) {
        let total = self.char_count();
        let (a, b) = (start.min(total), end.min(total));
        (a.min(b), a.max(b))
    }

    fn byte_index(&self, char_offset: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_offset)
            .map(|(byte, _)| byte)
            .unwrap_or(self.content.len())
    }
}

impl Default for DocumentBuffer {
    fn default() -> Self {
        Self::new("")
    }
}
