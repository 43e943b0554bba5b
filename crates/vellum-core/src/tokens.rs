//! Syntax tokens and their per-line projection.
//!
//! Tokenizers produce flat [`Token`]s over absolute character offsets. Rendering wants them per
//! line, in columns, so [`project_line_tokens`] splits them at line boundaries in one pass and
//! reuses the previous per-line slices when a line's tokens did not change (unchanged lines keep
//! the same `Arc`, so a renderer can skip them by pointer comparison).

use std::borrow::Cow;
use std::sync::Arc;

use crate::delta::TextEdit;
use crate::position::LineStarts;

/// A classified span of absolute character offsets `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    /// Start offset (inclusive).
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
    /// Syntax class, e.g. `"keyword"` or `"string"`.
    pub class: Arc<str>,
}

impl Token {
    /// Create a token.
    pub fn new(start: usize, end: usize, class: impl Into<Arc<str>>) -> Self {
        Self {
            start,
            end,
            class: class.into(),
        }
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` for zero-length tokens.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// A token clipped to one line, in columns `[start_column, end_column)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineToken {
    /// Start column (inclusive).
    pub start_column: usize,
    /// End column (exclusive).
    pub end_column: usize,
    /// Syntax class.
    pub class: Arc<str>,
}

/// Result of [`project_line_tokens`].
#[derive(Debug, Clone, Default)]
pub struct LineTokenProjection {
    /// Tokens for every line, indexed by line number.
    pub lines: Vec<Arc<[LineToken]>>,
    /// Lines whose tokens differ from the previous projection.
    pub changed: Vec<usize>,
}

/// Split flat tokens into per-line column tokens.
///
/// Tokens are expected sorted by `start`; unsorted input is sorted first. Tokens spanning a line
/// break are split across every line they touch; empty lines get an empty slice. A line whose
/// tokens equal `previous[line]` reuses that allocation.
pub fn project_line_tokens(
    tokens: &[Token],
    line_starts: &LineStarts,
    previous: &[Arc<[LineToken]>],
) -> LineTokenProjection {
    let tokens: Cow<'_, [Token]> = if tokens.is_sorted_by_key(|t| t.start) {
        Cow::Borrowed(tokens)
    } else {
        let mut sorted = tokens.to_vec();
        sorted.sort_by_key(|t| t.start);
        Cow::Owned(sorted)
    };

    let line_count = line_starts.line_count();
    let mut projection = LineTokenProjection {
        lines: Vec::with_capacity(line_count),
        changed: Vec::new(),
    };

    // Indices of tokens that started on an earlier line and may still be open.
    let mut carried: Vec<usize> = Vec::new();
    let mut next = 0usize;

    for line in 0..line_count {
        let line_start = line_starts.line_start(line);
        let line_end = line_start + line_starts.line_len(line);

        carried.retain(|&i| tokens[i].end > line_start);
        while next < tokens.len() && tokens[next].start < line_end.max(line_start + 1) {
            if tokens[next].end > line_start {
                carried.push(next);
            }
            next += 1;
        }

        let mut line_tokens = Vec::with_capacity(carried.len());
        for &i in &carried {
            let token = &tokens[i];
            let start = token.start.max(line_start);
            let end = token.end.min(line_end);
            if start < end {
                line_tokens.push(LineToken {
                    start_column: start - line_start,
                    end_column: end - line_start,
                    class: Arc::clone(&token.class),
                });
            }
        }

        let reused = previous
            .get(line)
            .filter(|prev| prev[..] == line_tokens[..])
            .map(Arc::clone);
        match reused {
            Some(prev) => projection.lines.push(prev),
            None => {
                projection.changed.push(line);
                projection.lines.push(Arc::from(line_tokens));
            }
        }
    }

    projection
}

/// Carry tokens across an applied edit so highlighting stays aligned until a fresh result lands.
///
/// Tokens swallowed by a deletion disappear; tokens touching the edit grow or shrink with it.
pub fn map_tokens_through_edit(tokens: &[Token], edit: &TextEdit) -> Vec<Token> {
    tokens
        .iter()
        .filter_map(|token| {
            let (start, end) = edit.map_span(token.start, token.end)?;
            (start < end).then(|| Token::new(start, end, Arc::clone(&token.class)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::DocumentBuffer;

    fn lt(start: usize, end: usize, class: &str) -> LineToken {
        LineToken {
            start_column: start,
            end_column: end,
            class: Arc::from(class),
        }
    }

    #[test]
    fn test_projection_splits_multi_line_tokens() {
        let buffer = DocumentBuffer::new("let s = \"a\nbc\";\n\nx");
        let tokens = vec![
            Token::new(0, 3, "keyword"),
            Token::new(8, 14, "string"),
            Token::new(17, 18, "ident"),
        ];
        let projection = project_line_tokens(&tokens, buffer.line_starts(), &[]);

        assert_eq!(projection.lines.len(), 4);
        assert_eq!(
            projection.lines[0].as_ref(),
            &[lt(0, 3, "keyword"), lt(8, 10, "string")]
        );
        assert_eq!(projection.lines[1].as_ref(), &[lt(0, 3, "string")]);
        assert!(projection.lines[2].is_empty());
        assert_eq!(projection.lines[3].as_ref(), &[lt(0, 1, "ident")]);
        assert_eq!(projection.changed, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_unchanged_lines_reuse_allocation() {
        let buffer = DocumentBuffer::new("ab\ncd");
        let first = project_line_tokens(
            &[Token::new(0, 2, "a"), Token::new(3, 5, "b")],
            buffer.line_starts(),
            &[],
        );
        let second = project_line_tokens(
            &[Token::new(0, 2, "a"), Token::new(3, 4, "c")],
            buffer.line_starts(),
            &first.lines,
        );

        assert!(Arc::ptr_eq(&first.lines[0], &second.lines[0]));
        assert!(!Arc::ptr_eq(&first.lines[1], &second.lines[1]));
        assert_eq!(second.changed, vec![1]);
    }

    #[test]
    fn test_unsorted_and_overlapping_tokens() {
        let buffer = DocumentBuffer::new("abcdef");
        let tokens = vec![Token::new(2, 4, "inner"), Token::new(0, 6, "outer")];
        let projection = project_line_tokens(&tokens, buffer.line_starts(), &[]);
        assert_eq!(
            projection.lines[0].as_ref(),
            &[lt(0, 6, "outer"), lt(2, 4, "inner")]
        );
    }

    #[test]
    fn test_tokens_follow_edits() {
        let tokens = vec![Token::new(0, 3, "kw"), Token::new(4, 9, "ident")];
        let mapped = map_tokens_through_edit(&tokens, &TextEdit::new(0, "", "pub "));
        assert_eq!(mapped, vec![Token::new(4, 7, "kw"), Token::new(8, 13, "ident")]);

        let mapped = map_tokens_through_edit(&tokens, &TextEdit::new(0, "let", ""));
        assert_eq!(mapped, vec![Token::new(1, 6, "ident")]);
    }
}
