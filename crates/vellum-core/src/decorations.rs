//! Decorations: styled annotations anchored to document ranges.
//!
//! A [`Decoration`] attaches a CSS-like class name (and optional text content) to a
//! [`TextRange`]. Persistent decorations live in a [`DecorationStore`] keyed by
//! [`DecorationId`]; they follow edits the same way carets do and are re-derived against the
//! buffer after every mutation.

use indexmap::IndexMap;
use thiserror::Error;
use tracing::trace;

use crate::buffer::DocumentBuffer;
use crate::delta::TextEdit;
use crate::position::TextRange;

/// How a decoration is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecorationKind {
    /// Background/foreground styling of a character span.
    Inline,
    /// Full-width styling of every covered line.
    Line,
    /// A marker in the gutter next to every covered line.
    Gutter,
    /// Free-floating content positioned at the range (hover cards, ghost text).
    Overlay,
}

/// A styled range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    /// Covered span (may be reversed; normalized on insertion into a store).
    pub range: TextRange,
    /// Rendering kind.
    pub kind: DecorationKind,
    /// Style class understood by the renderer.
    pub class_name: String,
    /// Optional text payload (gutter glyph, overlay body).
    pub content: Option<String>,
}

impl Decoration {
    /// Create a decoration without content.
    pub fn new(range: TextRange, kind: DecorationKind, class_name: impl Into<String>) -> Self {
        Self {
            range,
            kind,
            class_name: class_name.into(),
            content: None,
        }
    }

    /// Shorthand for an [`DecorationKind::Inline`] decoration.
    pub fn inline(range: TextRange, class_name: impl Into<String>) -> Self {
        Self::new(range, DecorationKind::Inline, class_name)
    }

    /// Shorthand for a [`DecorationKind::Line`] decoration.
    pub fn line(range: TextRange, class_name: impl Into<String>) -> Self {
        Self::new(range, DecorationKind::Line, class_name)
    }

    /// Shorthand for a [`DecorationKind::Gutter`] decoration.
    pub fn gutter(range: TextRange, class_name: impl Into<String>) -> Self {
        Self::new(range, DecorationKind::Gutter, class_name)
    }

    /// Shorthand for an [`DecorationKind::Overlay`] decoration.
    pub fn overlay(range: TextRange, class_name: impl Into<String>) -> Self {
        Self::new(range, DecorationKind::Overlay, class_name)
    }

    /// Attach text content.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// Handle of a persistent decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecorationId(u64);

impl DecorationId {
    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Errors reported by [`DecorationStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecorationError {
    /// No decoration with this id is stored.
    #[error("unknown decoration id {0:?}")]
    UnknownDecoration(DecorationId),
}

/// Insertion-ordered store of persistent decorations.
#[derive(Debug, Clone, Default)]
pub struct DecorationStore {
    next_id: u64,
    items: IndexMap<DecorationId, Decoration>,
}

impl DecorationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(mut decoration: Decoration, buffer: &DocumentBuffer) -> Decoration {
        decoration.range = buffer.clamp_range(decoration.range).normalized();
        decoration
    }

    /// Store a decoration (range clamped and normalized) and return its id.
    pub fn add(&mut self, decoration: Decoration, buffer: &DocumentBuffer) -> DecorationId {
        self.next_id += 1;
        let id = DecorationId(self.next_id);
        self.items.insert(id, Self::normalize(decoration, buffer));
        id
    }

    /// Remove a decoration, keeping the order of the rest.
    pub fn remove(&mut self, id: DecorationId) -> Option<Decoration> {
        self.items.shift_remove(&id)
    }

    /// Replace a decoration in place.
    pub fn update(
        &mut self,
        id: DecorationId,
        decoration: Decoration,
        buffer: &DocumentBuffer,
    ) -> Result<(), DecorationError> {
        let slot = self
            .items
            .get_mut(&id)
            .ok_or(DecorationError::UnknownDecoration(id))?;
        *slot = Self::normalize(decoration, buffer);
        Ok(())
    }

    /// Remove everything. Returns how many decorations were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.items.len();
        self.items.clear();
        count
    }

    /// Look up a decoration.
    pub fn get(&self, id: DecorationId) -> Option<&Decoration> {
        self.items.get(&id)
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (DecorationId, &Decoration)> {
        self.items.iter().map(|(id, decoration)| (*id, decoration))
    }

    /// Number of stored decorations.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Carry every decoration across an applied edit. `buffer` is the post-edit buffer.
    ///
    /// Non-empty decorations whose whole span was deleted are dropped; their ids are returned.
    pub fn map_through_edit(
        &mut self,
        edit: &TextEdit,
        buffer: &DocumentBuffer,
    ) -> Vec<DecorationId> {
        let mut removed = Vec::new();

        self.items.retain(|id, decoration| {
            let span = decoration.range.offsets();
            match edit.map_span(span.start, span.end) {
                Some((start, end)) => {
                    decoration.range = buffer.range_from_offsets(start, end);
                    true
                }
                None => {
                    removed.push(*id);
                    false
                }
            }
        });

        if !removed.is_empty() {
            trace!(count = removed.len(), "decorations swallowed by edit");
        }
        removed
    }

    /// Re-derive every range from its offsets after a wholesale content replacement.
    pub fn rederive(&mut self, buffer: &DocumentBuffer) {
        for decoration in self.items.values_mut() {
            let span = decoration.range.offsets();
            decoration.range = buffer.range_from_offsets(span.start, span.end);
        }
    }
}
