//! Editor API Facade
//!
//! [`EditorApi`] is the single surface through which hosts, commands and extensions read and
//! mutate editor state. It owns the document buffer, the cursor controller, persistent
//! decorations, settings and the event bus, and it is always passed explicitly (there is no
//! global instance, and several editors can coexist).
//!
//! # Update order
//!
//! Every mutation runs in the same order:
//!
//! 1. the [`DocumentBuffer`] changes (one writer, version bump),
//! 2. caret, selection and decorations are carried across the edit and re-derived,
//! 3. events are emitted: content, then cursor, then selection, then decoration removals.
//!
//! Subscribers therefore always observe a consistent state.
//!
//! # Example
//!
//! ```rust
//! use vellum_core::{EditorApi, EventKind};
//!
//! let mut api = EditorApi::scratch("foo\nbar\nbaz");
//! api.set_cursor_offset(5);
//! assert_eq!((api.cursor().line, api.cursor().column), (1, 1));
//!
//! api.on(EventKind::ContentChange, |event| println!("{event:?}"));
//! api.type_text("X");
//! assert_eq!(api.content(), "foo\nbXar\nbaz");
//! assert_eq!(api.cursor().offset, 6);
//! ```

use serde_json::Value;
use tracing::debug;

use crate::buffer::{DocumentBuffer, DocumentId};
use crate::cursor::{
    CursorChange, CursorController, CursorMotion, CursorState, next_grapheme_column,
    prev_grapheme_column,
};
use crate::decorations::{Decoration, DecorationError, DecorationId, DecorationStore};
use crate::delta::TextEdit;
use crate::events::{DecorationChange, EditorEvent, EventBus, EventKind, SubscriptionId};
use crate::position::{Position, TextRange};
use crate::settings::{EditorSettings, SettingsError};

/// Identifier used by [`EditorApi::scratch`].
pub const SCRATCH_DOCUMENT: &str = "untitled";

/// Explicit editor context.
#[derive(Debug)]
pub struct EditorApi {
    document: DocumentId,
    buffer: DocumentBuffer,
    cursor: CursorController,
    decorations: DecorationStore,
    settings: EditorSettings,
    events: EventBus,
}

impl EditorApi {
    /// Create an editor for `document` with the given text and settings.
    pub fn new(document: impl Into<DocumentId>, text: &str, settings: EditorSettings) -> Self {
        Self {
            document: document.into(),
            buffer: DocumentBuffer::new(text),
            cursor: CursorController::new(settings.cursor.position_cache_capacity),
            decorations: DecorationStore::new(),
            settings,
            events: EventBus::new(),
        }
    }

    /// Create an editor for an untitled document with default settings.
    pub fn scratch(text: &str) -> Self {
        Self::new(SCRATCH_DOCUMENT, text, EditorSettings::default())
    }

    // ------------------------------------------------------------------
    // Document
    // ------------------------------------------------------------------

    /// Identifier of the open document.
    pub fn document_id(&self) -> &DocumentId {
        &self.document
    }

    /// Read-only access to the buffer.
    pub fn buffer(&self) -> &DocumentBuffer {
        &self.buffer
    }

    /// Current buffer version.
    pub fn version(&self) -> u64 {
        self.buffer.version()
    }

    /// Switch to another document.
    ///
    /// The caret of the outgoing document is cached and the incoming document's cached caret (if
    /// any) is restored. Persistent decorations belong to the outgoing document and are cleared.
    pub fn open_document(&mut self, document: impl Into<DocumentId>, text: &str) {
        let document = document.into();
        let outgoing = std::mem::replace(&mut self.document, document.clone());
        self.buffer = DocumentBuffer::new(text);

        debug!(from = %outgoing, to = %document, "open document");

        let change = self
            .cursor
            .swap_document(Some(&outgoing), &document, &self.buffer);
        let cleared = self.decorations.clear();

        self.emit(EditorEvent::ContentChange {
            document,
            version: self.buffer.version(),
            edit: None,
        });
        self.notify_cursor(change);
        if cleared > 0 {
            self.emit(EditorEvent::DecorationChange(DecorationChange::Cleared));
        }
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    /// Full LF-normalized content.
    pub fn content(&self) -> &str {
        self.buffer.content()
    }

    /// Replace the whole content. Caret, selection and decorations are re-derived (clamped).
    pub fn set_content(&mut self, text: &str) {
        self.buffer.set_content(text);
        let change = self.cursor.rederive(&self.buffer);
        self.decorations.rederive(&self.buffer);

        self.emit(EditorEvent::ContentChange {
            document: self.document.clone(),
            version: self.buffer.version(),
            edit: None,
        });
        self.notify_cursor(change);
    }

    /// Insert `text` at `at` (re-derived from its line and column).
    pub fn insert(&mut self, at: Position, text: &str) {
        let offset = self.buffer.clamp_position(at).offset;
        self.edit_offsets(offset, offset, text);
    }

    /// Delete the text covered by `range`.
    pub fn delete(&mut self, range: TextRange) {
        let span = self.buffer.clamp_range(range).offsets();
        self.edit_offsets(span.start, span.end, "");
    }

    /// Replace the text covered by `range` with `text`.
    pub fn replace(&mut self, range: TextRange, text: &str) {
        let span = self.buffer.clamp_range(range).offsets();
        self.edit_offsets(span.start, span.end, text);
    }

    /// Type `text`: replaces the selection if there is one, otherwise inserts at the caret.
    pub fn type_text(&mut self, text: &str) {
        match self.selection() {
            Some(range) => self.replace(range, text),
            None => {
                let offset = self.cursor.caret().offset;
                self.edit_offsets(offset, offset, text);
            }
        }
    }

    /// Delete the selection, or the grapheme (or line break) before the caret.
    pub fn delete_backward(&mut self) {
        if let Some(range) = self.selection() {
            self.delete(range);
            return;
        }

        let caret = self.cursor.caret();
        if caret.offset == 0 {
            return;
        }
        let start = if caret.column == 0 {
            caret.offset - 1
        } else {
            let line = self.buffer.line(caret.line).unwrap_or_default();
            caret.offset - caret.column + prev_grapheme_column(line, caret.column)
        };
        self.edit_offsets(start, caret.offset, "");
    }

    /// Delete the selection, or the grapheme (or line break) after the caret.
    pub fn delete_forward(&mut self) {
        if let Some(range) = self.selection() {
            self.delete(range);
            return;
        }

        let caret = self.cursor.caret();
        if caret.offset >= self.buffer.char_count() {
            return;
        }
        let line = self.buffer.line(caret.line).unwrap_or_default();
        let end = if caret.column >= self.buffer.line_len(caret.line) {
            caret.offset + 1
        } else {
            caret.offset - caret.column + next_grapheme_column(line, caret.column)
        };
        self.edit_offsets(caret.offset, end, "");
    }

    fn edit_offsets(&mut self, start: usize, end: usize, text: &str) {
        let edit = self.buffer.replace(start, end, text);
        self.commit_edit(edit);
    }

    fn commit_edit(&mut self, edit: TextEdit) {
        if edit.is_noop() {
            return;
        }

        let change = self.cursor.map_through_edit(&edit, &self.buffer);
        let removed = self.decorations.map_through_edit(&edit, &self.buffer);

        self.emit(EditorEvent::ContentChange {
            document: self.document.clone(),
            version: self.buffer.version(),
            edit: Some(edit),
        });
        self.notify_cursor(change);
        for id in removed {
            self.emit(EditorEvent::DecorationChange(DecorationChange::Removed(id)));
        }
    }

    // ------------------------------------------------------------------
    // Positions and lines
    // ------------------------------------------------------------------

    /// Clamped position for `(line, column)`.
    pub fn position_at(&self, line: usize, column: usize) -> Position {
        self.buffer.position_at(line, column)
    }

    /// Clamped position for a character offset.
    pub fn position_at_offset(&self, offset: usize) -> Position {
        self.buffer.offset_to_position(offset)
    }

    /// Line text without its terminator.
    pub fn line(&self, index: usize) -> Option<&str> {
        self.buffer.line(index)
    }

    /// Number of lines (at least one).
    pub fn line_count(&self) -> usize {
        self.buffer.line_count()
    }

    /// All lines.
    pub fn lines(&self) -> &[String] {
        self.buffer.lines()
    }

    // ------------------------------------------------------------------
    // Caret and selection
    // ------------------------------------------------------------------

    /// Caret position.
    pub fn cursor(&self) -> Position {
        self.cursor.caret()
    }

    /// Full caret/selection state.
    pub fn cursor_state(&self) -> CursorState {
        self.cursor.state()
    }

    /// Place the caret at `(position.line, position.column)`, clamped. Drops the selection.
    pub fn set_cursor(&mut self, position: Position) {
        let change = self.cursor.set_caret(position, &self.buffer);
        self.notify_cursor(change);
    }

    /// Place the caret at a character offset, clamped. Drops the selection.
    pub fn set_cursor_offset(&mut self, offset: usize) {
        let change = self.cursor.set_caret_offset(offset, &self.buffer);
        self.notify_cursor(change);
    }

    /// Current selection, normalized so that `start <= end`.
    pub fn selection(&self) -> Option<TextRange> {
        self.cursor.selection().map(|sel| sel.range())
    }

    /// Selected text, if any.
    pub fn selected_text(&self) -> Option<String> {
        self.selection().map(|range| {
            let span = range.offsets();
            self.buffer.text_in(span.start, span.end)
        })
    }

    /// Select `range`: `range.start` becomes the anchor, `range.end` the caret.
    pub fn set_selection(&mut self, range: TextRange) {
        let change = self
            .cursor
            .set_selection(range.start, range.end, &self.buffer);
        self.notify_cursor(change);
    }

    /// Drop the selection, keeping the caret.
    pub fn clear_selection(&mut self) {
        let change = self.cursor.clear_selection();
        self.notify_cursor(change);
    }

    /// Select the whole document.
    pub fn select_all(&mut self) {
        let change = self.cursor.select_all(&self.buffer);
        self.notify_cursor(change);
    }

    /// Move the caret; with `extend` the selection grows.
    pub fn move_cursor(&mut self, motion: CursorMotion, extend: bool) {
        let change = self.cursor.apply_motion(motion, extend, &self.buffer);
        self.notify_cursor(change);
    }

    fn notify_cursor(&mut self, change: CursorChange) {
        if change.cursor_moved {
            let position = self.cursor.caret();
            self.emit(EditorEvent::CursorChange { position });
        }
        if change.selection_changed {
            let selection = self.selection();
            self.emit(EditorEvent::SelectionChange { selection });
        }
    }

    // ------------------------------------------------------------------
    // Decorations
    // ------------------------------------------------------------------

    /// Add a persistent decoration.
    pub fn add_decoration(&mut self, decoration: Decoration) -> DecorationId {
        let id = self.decorations.add(decoration, &self.buffer);
        self.emit(EditorEvent::DecorationChange(DecorationChange::Added(id)));
        id
    }

    /// Remove a decoration. Returns `false` if the id is unknown.
    pub fn remove_decoration(&mut self, id: DecorationId) -> bool {
        let removed = self.decorations.remove(id).is_some();
        if removed {
            self.emit(EditorEvent::DecorationChange(DecorationChange::Removed(id)));
        }
        removed
    }

    /// Replace a decoration in place.
    pub fn update_decoration(
        &mut self,
        id: DecorationId,
        decoration: Decoration,
    ) -> Result<(), DecorationError> {
        self.decorations.update(id, decoration, &self.buffer)?;
        self.emit(EditorEvent::DecorationChange(DecorationChange::Updated(id)));
        Ok(())
    }

    /// Remove every persistent decoration. Returns how many were removed.
    pub fn clear_decorations(&mut self) -> usize {
        let count = self.decorations.clear();
        if count > 0 {
            self.emit(EditorEvent::DecorationChange(DecorationChange::Cleared));
        }
        count
    }

    /// Persistent decorations in registration order.
    pub fn decorations(&self) -> impl Iterator<Item = (DecorationId, &Decoration)> {
        self.decorations.iter()
    }

    /// Look up one decoration.
    pub fn decoration(&self, id: DecorationId) -> Option<&Decoration> {
        self.decorations.get(id)
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    /// Current settings.
    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// One setting by dotted key.
    pub fn setting(&self, key: &str) -> Option<Value> {
        self.settings.get(key)
    }

    /// Apply a JSON merge patch to the settings.
    ///
    /// Emits [`EditorEvent::SettingsChange`] when at least one key changed.
    pub fn update_settings(&mut self, patch: &Value) -> Result<Vec<String>, SettingsError> {
        let changed = self.settings.merge_patch(patch)?;
        if !changed.is_empty() {
            debug!(?changed, "settings updated");
            self.emit(EditorEvent::SettingsChange {
                changed: changed.clone(),
            });
        }
        Ok(changed)
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Subscribe to events of `kind`.
    pub fn on<F>(&mut self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: FnMut(&EditorEvent) + 'static,
    {
        self.events.subscribe(kind, callback)
    }

    /// Remove a subscription.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Deliver an event to subscribers of its kind.
    pub fn emit(&mut self, event: EditorEvent) {
        self.events.emit(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorations::DecorationKind;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn record(api: &mut EditorApi) -> Rc<RefCell<Vec<EventKind>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in EventKind::ALL {
            let sink = Rc::clone(&log);
            api.on(kind, move |event| sink.borrow_mut().push(event.kind()));
        }
        log
    }

    #[test]
    fn test_type_text_emits_content_then_cursor() {
        let mut api = EditorApi::scratch("foo\nbar\nbaz");
        api.set_cursor_offset(5);
        let log = record(&mut api);

        api.type_text("X");
        assert_eq!(api.content(), "foo\nbXar\nbaz");
        assert_eq!(api.cursor(), Position::new(1, 2, 6));
        assert_eq!(
            *log.borrow(),
            vec![EventKind::ContentChange, EventKind::CursorChange]
        );
    }

    #[test]
    fn test_type_text_replaces_selection() {
        let mut api = EditorApi::scratch("hello world");
        let range = TextRange::new(api.position_at_offset(6), api.position_at_offset(11));
        api.set_selection(range);
        assert_eq!(api.selected_text().as_deref(), Some("world"));
        let log = record(&mut api);

        api.type_text("there");
        assert_eq!(api.content(), "hello there");
        assert_eq!(api.cursor().offset, 11);
        assert!(api.selection().is_none());
        assert_eq!(
            *log.borrow(),
            vec![EventKind::ContentChange, EventKind::SelectionChange]
        );
    }

    #[test]
    fn test_backspace_and_delete() {
        let mut api = EditorApi::scratch("ab\ncd");
        api.set_cursor_offset(3);
        api.delete_backward();
        assert_eq!(api.content(), "abcd");
        assert_eq!(api.cursor().offset, 2);

        api.delete_forward();
        assert_eq!(api.content(), "abd");

        api.set_cursor_offset(0);
        api.delete_backward();
        assert_eq!(api.content(), "abd");
    }

    #[test]
    fn test_set_content_clamps_caret() {
        let mut api = EditorApi::scratch("a long line of text");
        api.set_cursor_offset(15);
        api.set_content("short");
        assert_eq!(api.cursor(), Position::new(0, 5, 5));
    }

    #[test]
    fn test_decoration_events_and_removal_on_delete() {
        let mut api = EditorApi::scratch("let x = 1;");
        let log = record(&mut api);

        let range = TextRange::new(api.position_at_offset(4), api.position_at_offset(5));
        let id = api.add_decoration(Decoration::new(range, DecorationKind::Inline, "ident"));
        api.delete(TextRange::new(
            api.position_at_offset(3),
            api.position_at_offset(6),
        ));

        assert!(api.decoration(id).is_none());
        assert_eq!(
            *log.borrow(),
            vec![
                EventKind::DecorationChange,
                EventKind::ContentChange,
                EventKind::DecorationChange
            ]
        );
    }

    #[test]
    fn test_update_settings_emits_changed_keys() {
        let mut api = EditorApi::scratch("");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        api.on(EventKind::SettingsChange, move |event| {
            if let EditorEvent::SettingsChange { changed } = event {
                sink.borrow_mut().extend(changed.iter().cloned());
            }
        });

        api.update_settings(&json!({ "tab_size": 2 })).unwrap();
        api.update_settings(&json!({ "tab_size": 2 })).unwrap();
        assert_eq!(*seen.borrow(), vec!["tab_size".to_string()]);
        assert_eq!(api.setting("tab_size"), Some(json!(2)));
    }

    #[test]
    fn test_open_document_swaps_and_restores_caret() {
        let mut api = EditorApi::new("a.rs", "fn main() {}", EditorSettings::default());
        api.set_cursor_offset(3);

        api.open_document("b.rs", "struct B;");
        assert_eq!(api.document_id().as_str(), "b.rs");
        assert_eq!(api.cursor(), Position::zero());

        api.open_document("a.rs", "fn main() {}");
        assert_eq!(api.cursor().offset, 3);
    }
}
