//! Structured text edits.
//!
//! Every buffer mutation produces a [`TextEdit`] expressed in **character offsets** (Unicode scalar
//! values). Anything anchored to an offset (carets, selections, persistent decorations, tokens
//! still waiting for a refresh) is carried across the edit with [`TextEdit::map_offset`].

/// Which side of an edit an offset sticks to when it sits exactly on the edited span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// Stay at the start of the edit (does not follow inserted text).
    Before,
    /// Move past the inserted text.
    After,
}

/// A single replace operation: delete `deleted` at `offset`, then insert `inserted` there.
///
/// `offset` is measured in the document **before** the edit is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    /// Start character offset of the edit.
    pub offset: usize,
    /// Exact deleted text (may be empty).
    pub deleted: String,
    /// Exact inserted text (may be empty), LF-normalized.
    pub inserted: String,
}

impl TextEdit {
    /// Create a new edit.
    pub fn new(offset: usize, deleted: impl Into<String>, inserted: impl Into<String>) -> Self {
        Self {
            offset,
            deleted: deleted.into(),
            inserted: inserted.into(),
        }
    }

    /// Length of `deleted` in characters.
    pub fn deleted_len(&self) -> usize {
        self.deleted.chars().count()
    }

    /// Length of `inserted` in characters.
    pub fn inserted_len(&self) -> usize {
        self.inserted.chars().count()
    }

    /// Exclusive end offset of the deleted span in the pre-edit document.
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.deleted_len())
    }

    /// Returns `true` if the edit changes nothing.
    pub fn is_noop(&self) -> bool {
        self.deleted == self.inserted
    }

    /// Net change in document length.
    pub fn len_delta(&self) -> isize {
        self.inserted_len() as isize - self.deleted_len() as isize
    }

    /// Map an offset from the pre-edit document into the post-edit document.
    ///
    /// Offsets before the edit are unchanged, offsets after it shift by [`len_delta`]. Offsets on
    /// the edited span collapse to its start ([`Bias::Before`]) or to the end of the inserted
    /// text ([`Bias::After`]).
    ///
    /// [`len_delta`]: TextEdit::len_delta
    pub fn map_offset(&self, offset: usize, bias: Bias) -> usize {
        let start = self.offset;
        let end = self.end();

        if offset < start {
            return offset;
        }
        if offset > end {
            return offset - self.deleted_len() + self.inserted_len();
        }

        match bias {
            Bias::Before => start,
            Bias::After => start + self.inserted_len(),
        }
    }

    /// Map a half-open `[start, end)` span. Returns `None` if a non-empty span was swallowed by
    /// the deletion.
    ///
    /// The start sticks to text inserted at it, the end does not grow into it.
    pub fn map_span(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        let new_start = self.map_offset(start, Bias::After);
        let new_end = self.map_offset(end, Bias::Before).max(new_start);
        let swallowed = start < end
            && new_start == new_end
            && self.deleted_len() > 0
            && start >= self.offset
            && end <= self.end();
        (!swallowed).then_some((new_start, new_end))
    }
}
