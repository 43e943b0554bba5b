//! Cursor/Selection Controller
//!
//! Owns the caret, the optional selection and the "desired column" used for vertical movement.
//!
//! All state changes go through one private setter that compares old and new state and reports
//! a [`CursorChange`], so callers emit exactly the notifications that correspond to what moved.
//! Positions are always re-derived against the current [`DocumentBuffer`] before being stored.
//!
//! The controller also remembers the last caret position per document in a bounded LRU cache so
//! that switching between open documents restores where the user left off.

use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::trace;
use unicode_segmentation::UnicodeSegmentation;

use crate::buffer::{DocumentBuffer, DocumentId};
use crate::delta::{Bias, TextEdit};
use crate::position::{Position, TextRange};

/// Default capacity of the per-document caret cache.
pub const DEFAULT_POSITION_CACHE_CAPACITY: usize = 50;

/// A selection with a fixed anchor and a moving active end (where the caret is).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selection {
    /// Where the selection started.
    pub anchor: Position,
    /// The moving end; always equal to the caret.
    pub active: Position,
}

impl Selection {
    /// Create a selection.
    pub fn new(anchor: Position, active: Position) -> Self {
        Self { anchor, active }
    }

    /// The selected span in document order.
    pub fn range(&self) -> TextRange {
        TextRange::new(self.anchor, self.active).normalized()
    }

    /// Returns `true` if anchor and active end coincide.
    pub fn is_empty(&self) -> bool {
        self.anchor.offset == self.active.offset
    }

    /// Returns `true` if the active end precedes the anchor.
    pub fn is_reversed(&self) -> bool {
        self.active < self.anchor
    }
}

/// Snapshot of the controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorState {
    /// Caret position.
    pub caret: Position,
    /// Non-empty selection, if any.
    pub selection: Option<Selection>,
    /// Column that vertical movement tries to return to.
    pub desired_column: Option<usize>,
}

/// What changed during a controller operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorChange {
    /// The caret moved.
    pub cursor_moved: bool,
    /// The selection appeared, disappeared or changed.
    pub selection_changed: bool,
}

impl CursorChange {
    /// Returns `true` if nothing observable changed.
    pub fn is_empty(&self) -> bool {
        !self.cursor_moved && !self.selection_changed
    }

    /// Combine two change reports.
    pub fn merge(self, other: CursorChange) -> CursorChange {
        CursorChange {
            cursor_moved: self.cursor_moved || other.cursor_moved,
            selection_changed: self.selection_changed || other.selection_changed,
        }
    }
}

/// Caret motions understood by [`CursorController::apply_motion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorMotion {
    /// One grapheme to the left (wraps to the previous line end).
    Left,
    /// One grapheme to the right (wraps to the next line start).
    Right,
    /// One line up, keeping the desired column.
    Up,
    /// One line down, keeping the desired column.
    Down,
    /// `n` lines down (negative: up), keeping the desired column. Used for paging.
    Lines(isize),
    /// Start of the current line.
    LineStart,
    /// End of the current line.
    LineEnd,
    /// Start of the document.
    DocumentStart,
    /// End of the document.
    DocumentEnd,
}

/// Caret, selection and desired-column state for one editor.
pub struct CursorController {
    state: CursorState,
    position_cache: LruCache<DocumentId, Position>,
}

impl std::fmt::Debug for CursorController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorController")
            .field("state", &self.state)
            .field("cached_documents", &self.position_cache.len())
            .finish()
    }
}

impl CursorController {
    /// Create a controller with the caret at the document start.
    pub fn new(cache_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: CursorState::default(),
            position_cache: LruCache::new(capacity),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Caret position.
    pub fn caret(&self) -> Position {
        self.state.caret
    }

    /// Current non-empty selection.
    pub fn selection(&self) -> Option<Selection> {
        self.state.selection
    }

    /// Column remembered for vertical movement.
    pub fn desired_column(&self) -> Option<usize> {
        self.state.desired_column
    }

    fn apply(&mut self, next: CursorState) -> CursorChange {
        let mut next = next;
        if next.selection.is_some_and(|sel| sel.is_empty()) {
            next.selection = None;
        }

        let change = CursorChange {
            cursor_moved: next.caret != self.state.caret,
            selection_changed: next.selection != self.state.selection,
        };
        self.state = next;
        change
    }

    /// Place the caret (re-derived from its line and column), dropping any selection.
    pub fn set_caret(&mut self, position: Position, buffer: &DocumentBuffer) -> CursorChange {
        let caret = buffer.clamp_position(position);
        self.apply(CursorState {
            caret,
            selection: None,
            desired_column: None,
        })
    }

    /// Place the caret at a character offset, dropping any selection.
    pub fn set_caret_offset(&mut self, offset: usize, buffer: &DocumentBuffer) -> CursorChange {
        let caret = buffer.offset_to_position(offset);
        self.apply(CursorState {
            caret,
            selection: None,
            desired_column: None,
        })
    }

    /// Select from `anchor` to `active`; the caret moves to `active`.
    pub fn set_selection(
        &mut self,
        anchor: Position,
        active: Position,
        buffer: &DocumentBuffer,
    ) -> CursorChange {
        let anchor = buffer.clamp_position(anchor);
        let active = buffer.clamp_position(active);
        self.apply(CursorState {
            caret: active,
            selection: Some(Selection::new(anchor, active)),
            desired_column: None,
        })
    }

    /// Drop the selection, keeping the caret. Ends any run of vertical moves.
    pub fn clear_selection(&mut self) -> CursorChange {
        self.apply(CursorState {
            caret: self.state.caret,
            selection: None,
            desired_column: None,
        })
    }

    /// Select the whole document.
    pub fn select_all(&mut self, buffer: &DocumentBuffer) -> CursorChange {
        let end = buffer.offset_to_position(buffer.char_count());
        self.set_selection(Position::zero(), end, buffer)
    }

    /// Move the caret; with `extend` the selection grows from its anchor (or the old caret).
    pub fn apply_motion(
        &mut self,
        motion: CursorMotion,
        extend: bool,
        buffer: &DocumentBuffer,
    ) -> CursorChange {
        let caret = self.state.caret;

        // Without `extend`, a horizontal move first collapses an existing selection.
        if !extend && let Some(selection) = self.state.selection {
            let range = selection.range();
            let collapsed = match motion {
                CursorMotion::Left => Some(range.start),
                CursorMotion::Right => Some(range.end),
                _ => None,
            };
            if let Some(target) = collapsed {
                return self.apply(CursorState {
                    caret: target,
                    selection: None,
                    desired_column: None,
                });
            }
        }

        let (target, desired_column) = match motion {
            CursorMotion::Left => (self.step_left(caret, buffer), None),
            CursorMotion::Right => (self.step_right(caret, buffer), None),
            CursorMotion::Up | CursorMotion::Down | CursorMotion::Lines(_) => {
                let delta = match motion {
                    CursorMotion::Up => -1,
                    CursorMotion::Down => 1,
                    CursorMotion::Lines(n) => n,
                    _ => 0,
                };
                let desired = self.state.desired_column.unwrap_or(caret.column);
                let line = caret
                    .line
                    .saturating_add_signed(delta)
                    .min(buffer.line_count() - 1);
                let target = if line == caret.line {
                    caret
                } else {
                    buffer.position_at(line, desired)
                };
                (target, Some(desired))
            }
            CursorMotion::LineStart => (buffer.position_at(caret.line, 0), None),
            CursorMotion::LineEnd => (buffer.position_at(caret.line, usize::MAX), None),
            CursorMotion::DocumentStart => (Position::zero(), None),
            CursorMotion::DocumentEnd => (buffer.offset_to_position(buffer.char_count()), None),
        };

        trace!(?motion, extend, from = ?caret, to = ?target, "cursor motion");

        let selection = if extend {
            let anchor = self.state.selection.map_or(caret, |sel| sel.anchor);
            Some(Selection::new(anchor, target))
        } else {
            None
        };

        self.apply(CursorState {
            caret: target,
            selection,
            desired_column,
        })
    }

    fn step_left(&self, caret: Position, buffer: &DocumentBuffer) -> Position {
        if caret.column == 0 {
            if caret.line == 0 {
                return caret;
            }
            return buffer.position_at(caret.line - 1, usize::MAX);
        }
        let line = buffer.line(caret.line).unwrap_or_default();
        buffer.position_at(caret.line, prev_grapheme_column(line, caret.column))
    }

    fn step_right(&self, caret: Position, buffer: &DocumentBuffer) -> Position {
        let len = buffer.line_len(caret.line);
        if caret.column >= len {
            if caret.line + 1 >= buffer.line_count() {
                return caret;
            }
            return buffer.position_at(caret.line + 1, 0);
        }
        let line = buffer.line(caret.line).unwrap_or_default();
        buffer.position_at(caret.line, next_grapheme_column(line, caret.column))
    }

    /// Re-derive caret and selection from their offsets after the content was replaced wholesale.
    pub fn rederive(&mut self, buffer: &DocumentBuffer) -> CursorChange {
        let caret = buffer.offset_to_position(self.state.caret.offset);
        let selection = self.state.selection.map(|sel| {
            Selection::new(
                buffer.offset_to_position(sel.anchor.offset),
                buffer.offset_to_position(sel.active.offset),
            )
        });
        self.apply(CursorState {
            caret,
            selection,
            desired_column: None,
        })
    }

    /// Carry caret and selection across an applied edit. `buffer` is the post-edit buffer.
    pub fn map_through_edit(&mut self, edit: &TextEdit, buffer: &DocumentBuffer) -> CursorChange {
        let map =
            |pos: Position| buffer.offset_to_position(edit.map_offset(pos.offset, Bias::After));
        let caret = map(self.state.caret);
        let selection = self
            .state
            .selection
            .map(|sel| Selection::new(map(sel.anchor), caret));
        self.apply(CursorState {
            caret,
            selection,
            desired_column: None,
        })
    }

    /// Remember the caret for `document`. Returns `false` if the cached value was already current.
    pub fn cache_position(&mut self, document: &DocumentId) -> bool {
        if self.position_cache.peek(document) == Some(&self.state.caret) {
            return false;
        }
        self.position_cache.put(document.clone(), self.state.caret);
        true
    }

    /// Last cached caret for `document`, without touching recency.
    pub fn cached_position(&self, document: &DocumentId) -> Option<Position> {
        self.position_cache.peek(document).copied()
    }

    /// Number of documents with a cached caret.
    pub fn cached_len(&self) -> usize {
        self.position_cache.len()
    }

    /// Switch documents: cache the caret for `outgoing`, then restore the cached caret of
    /// `incoming` (clamped against `buffer`) or move to the document start.
    pub fn swap_document(
        &mut self,
        outgoing: Option<&DocumentId>,
        incoming: &DocumentId,
        buffer: &DocumentBuffer,
    ) -> CursorChange {
        if let Some(outgoing) = outgoing {
            self.cache_position(outgoing);
        }

        let restored = self
            .position_cache
            .get(incoming)
            .map(|pos| buffer.clamp_position(*pos))
            .unwrap_or_default();

        trace!(document = %incoming, caret = ?restored, "restoring caret");
        self.apply(CursorState {
            caret: restored,
            selection: None,
            desired_column: None,
        })
    }
}

fn grapheme_boundaries(line: &str) -> impl Iterator<Item = usize> + '_ {
    let mut column = 0usize;
    std::iter::once(0).chain(line.graphemes(true).map(move |g| {
        column += g.chars().count();
        column
    }))
}

/// Column of the grapheme boundary immediately before `column`.
pub(crate) fn prev_grapheme_column(line: &str, column: usize) -> usize {
    grapheme_boundaries(line)
        .take_while(|&boundary| boundary < column)
        .last()
        .unwrap_or(0)
}

/// Column of the grapheme boundary immediately after `column`.
pub(crate) fn next_grapheme_column(line: &str, column: usize) -> usize {
    grapheme_boundaries(line)
        .find(|&boundary| boundary > column)
        .unwrap_or_else(|| line.chars().count())
}
