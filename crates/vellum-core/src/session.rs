//! Host integration.
//!
//! [`EditorSession`] wires the pieces together for a host that owns a window (or a terminal, or a
//! test harness):
//!
//! ```text
//!   key / text input
//!        │
//!        ▼
//!   ExtensionRegistry ──► EditorApi (buffer, caret, decorations, events)
//!                              │
//!                              ▼
//!   sync: map tokens through edits, notify the tokenization pipeline,
//!         update the viewport line count, keep the caret in view
//!                              │
//!                              ▼
//!   render_frame(): visible lines + line tokens + composited decorations
//! ```
//!
//! Every entry point that can mutate the editor runs `sync` before returning, so a frame rendered
//! afterwards is always consistent with the buffer.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tracing::{debug, trace};

use crate::api::EditorApi;
use crate::buffer::DocumentId;
use crate::command::CommandError;
use crate::compositor::{CompositeFrame, DecorationCompositor, Rect};
use crate::decorations::Decoration;
use crate::delta::TextEdit;
use crate::events::{EditorEvent, EventKind, SubscriptionId};
use crate::extension::{Extension, ExtensionError};
use crate::keymap::KeyChord;
use crate::pipeline::{PipelineEvent, TokenizationPipeline};
use crate::registry::{DispatchOutcome, ExtensionRegistry};
use crate::tokenizer::Tokenizer;
use crate::tokens::{LineToken, Token, map_tokens_through_edit, project_line_tokens};
use crate::viewport::{Viewport, VisibleRange};

/// Class name of the selection highlight in a [`RenderFrame`].
pub const SELECTION_CLASS: &str = "selection";

/// What happened since the last sync, collected from editor events.
#[derive(Debug, Default)]
struct Signals {
    edits: Vec<Option<TextEdit>>,
    cursor_moved: bool,
    settings_changed: bool,
}

/// One materialized line.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderLine<'a> {
    /// Line index.
    pub index: usize,
    /// Line text without terminator.
    pub text: &'a str,
    /// Syntax tokens of this line.
    pub tokens: Arc<[LineToken]>,
}

/// Everything a renderer needs for one paint.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame<'a> {
    /// Materialized line window.
    pub visible: VisibleRange,
    /// Scroll offset the frame was built for.
    pub scroll_top: f64,
    /// Lines in `visible.lines()`.
    pub lines: Vec<RenderLine<'a>>,
    /// Selection, API and provider decorations.
    pub decorations: CompositeFrame,
    /// Caret rectangle, when the caret line is materialized.
    pub caret: Option<Rect>,
}

/// An editor wired to a viewport, a compositor, extensions and (optionally) a tokenizer.
pub struct EditorSession {
    api: EditorApi,
    registry: ExtensionRegistry,
    viewport: Viewport,
    compositor: DecorationCompositor,
    pipeline: Option<TokenizationPipeline>,
    document: DocumentId,
    file_extension: String,
    tokens: Vec<Token>,
    line_tokens: Vec<Arc<[LineToken]>>,
    seen_version: u64,
    content_width: f64,
    signals: Rc<RefCell<Signals>>,
    subscriptions: Vec<SubscriptionId>,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("document", &self.document)
            .field("version", &self.seen_version)
            .field("viewport", &self.viewport)
            .field("registry", &self.registry)
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

impl EditorSession {
    /// Wrap `api` in a session with a viewport of `viewport_height` pixels.
    pub fn new(mut api: EditorApi, viewport_height: f64, content_width: f64) -> Self {
        let signals = Rc::new(RefCell::new(Signals::default()));
        let subscriptions = subscribe(&mut api, &signals);

        let settings = api.settings();
        let viewport = Viewport::new(viewport_height, settings.line_height, api.line_count())
            .with_policy(settings.overscan_policy())
            .with_settle_window(settings.settle_window());
        let compositor = DecorationCompositor::new(settings.layout_metrics(content_width));

        let document = api.document_id().clone();
        let file_extension = file_extension_of(&document);
        let mut session = Self {
            api,
            registry: ExtensionRegistry::new(),
            viewport,
            compositor,
            pipeline: None,
            document,
            file_extension,
            tokens: Vec::new(),
            line_tokens: Vec::new(),
            seen_version: 0,
            content_width,
            signals,
            subscriptions,
        };
        session.seen_version = session.api.version();
        session.reproject();
        session
    }

    /// Attach a tokenizer. Runs are spawned on `runtime` and the open document is tokenized
    /// right away.
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>, runtime: Handle) -> Self {
        let mut pipeline =
            TokenizationPipeline::new(tokenizer, runtime, self.api.settings().pipeline_config());
        pipeline.open_document(
            self.document.clone(),
            &self.file_extension,
            Arc::from(self.api.content()),
            self.api.version(),
        );
        self.pipeline = Some(pipeline);
        self
    }

    /// Read-only facade access.
    pub fn api(&self) -> &EditorApi {
        &self.api
    }

    /// The extension registry.
    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// The viewport.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// File extension handed to the tokenizer.
    pub fn file_extension(&self) -> &str {
        &self.file_extension
    }

    /// Current flat tokens, carried through edits since the last tokenizer result.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Tokens of one line.
    pub fn line_tokens(&self, line: usize) -> Option<&Arc<[LineToken]>> {
        self.line_tokens.get(line)
    }

    // ------------------------------------------------------------------
    // Extensions and input
    // ------------------------------------------------------------------

    /// Load an extension.
    pub fn load_extension(&mut self, extension: Box<dyn Extension>) -> Result<(), ExtensionError> {
        let result = self.registry.load_extension(extension, &mut self.api);
        self.sync();
        result
    }

    /// Unload an extension.
    pub fn unload_extension(&mut self, name: &str) -> Result<(), ExtensionError> {
        let result = self.registry.unload_extension(name, &mut self.api);
        self.sync();
        result
    }

    /// Switch to another document.
    pub fn open_document(
        &mut self,
        document: impl Into<DocumentId>,
        file_extension: &str,
        text: &str,
    ) {
        let document = document.into();
        self.api.open_document(document.clone(), text);
        self.activate_document(document, file_extension.to_string());
        self.sync();
    }

    /// Dispatch a key chord through the keymap.
    pub fn handle_key(&mut self, chord: &KeyChord) -> Result<DispatchOutcome, CommandError> {
        let outcome = self.registry.dispatch_key(chord, &mut self.api);
        self.sync();
        outcome
    }

    /// Insert typed text (replacing the selection, if any).
    pub fn handle_text_input(&mut self, text: &str) {
        self.api.type_text(text);
        self.sync();
    }

    /// Run a command by id.
    pub fn execute_command(&mut self, id: &str) -> Result<DispatchOutcome, CommandError> {
        let outcome = self.registry.execute_command(id, &mut self.api);
        self.sync();
        outcome
    }

    /// Mutate the editor directly through the facade.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut EditorApi) -> R) -> R {
        let result = f(&mut self.api);
        self.sync();
        result
    }

    // ------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------

    fn activate_document(&mut self, document: DocumentId, file_extension: String) {
        debug!(document = %document, extension = %file_extension, "session: activate document");
        self.signals.borrow_mut().edits.clear();
        self.tokens.clear();
        self.line_tokens.clear();
        self.document = document;
        self.file_extension = file_extension;
        self.seen_version = self.api.version();

        if let Some(pipeline) = self.pipeline.as_mut()
            && let Some(cached) = pipeline.open_document(
                self.document.clone(),
                &self.file_extension,
                Arc::from(self.api.content()),
                self.api.version(),
            )
        {
            self.tokens = cached.tokens.to_vec();
        }
        self.reproject();
    }

    fn sync(&mut self) {
        // A command may have switched documents behind our back.
        if self.api.document_id() != &self.document {
            let document = self.api.document_id().clone();
            let extension = file_extension_of(&document);
            self.activate_document(document, extension);
        }

        let signals = std::mem::take(&mut *self.signals.borrow_mut());
        for edit in &signals.edits {
            match edit {
                Some(edit) => self.tokens = map_tokens_through_edit(&self.tokens, edit),
                None => self.tokens.clear(),
            }
        }

        if signals.settings_changed {
            self.apply_settings();
        }

        let version = self.api.version();
        if version != self.seen_version {
            self.seen_version = version;
            self.reproject();
            if let Some(pipeline) = self.pipeline.as_mut() {
                pipeline.content_changed(Arc::from(self.api.content()), version);
            }
        }

        self.viewport.set_line_count(self.api.line_count());
        if signals.cursor_moved || !signals.edits.is_empty() {
            self.reveal_caret();
        }
    }

    fn reproject(&mut self) {
        let projection = project_line_tokens(
            &self.tokens,
            self.api.buffer().line_starts(),
            &self.line_tokens,
        );
        trace!(changed = projection.changed.len(), "session: reproject tokens");
        self.line_tokens = projection.lines;
    }

    fn apply_settings(&mut self) {
        let settings = self.api.settings();
        self.compositor
            .set_metrics(settings.layout_metrics(self.content_width));
        self.viewport.set_line_height(settings.line_height);
        self.viewport.set_policy(settings.overscan_policy());
        self.viewport.set_settle_window(settings.settle_window());
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.set_debounce(settings.pipeline_config().debounce);
        }
    }

    fn reveal_caret(&mut self) {
        let line = self.api.cursor().line;
        if let Some(target) = self.viewport.ensure_line_visible(line)
            && !self.viewport.set_scroll_top(target)
        {
            // The user is scrolling; leave the request for the host.
            self.viewport.request_scroll(target);
        }
    }

    // ------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------

    /// Apply finished tokenizer runs without waiting. Returns `true` if tokens changed.
    pub fn apply_token_updates(&mut self) -> bool {
        let mut changed = false;
        while let Some(event) = self.pipeline.as_mut().and_then(|p| p.try_recv_event()) {
            changed |= self.apply_pipeline_event(event);
        }
        changed
    }

    /// Wait for the pending tokenizer run and apply its result.
    ///
    /// Returns `None` right away when nothing is pending.
    pub async fn wait_for_tokens(&mut self) -> Option<PipelineEvent> {
        let pipeline = self.pipeline.as_mut().filter(|p| p.has_pending())?;
        let event = pipeline.next_event().await?;
        self.apply_pipeline_event(event.clone());
        Some(event)
    }

    fn apply_pipeline_event(&mut self, event: PipelineEvent) -> bool {
        match event {
            PipelineEvent::Tokens(set)
                if set.document == self.document && set.version == self.api.version() =>
            {
                self.tokens = set.tokens.to_vec();
                self.reproject();
                true
            }
            PipelineEvent::Tokens(_) | PipelineEvent::Failed { .. } => false,
        }
    }

    // ------------------------------------------------------------------
    // Scrolling
    // ------------------------------------------------------------------

    /// Record a scroll offset reported by the host.
    pub fn on_host_scroll(&mut self, actual: f64, now: Instant) -> VisibleRange {
        self.viewport.on_host_scroll(actual, now)
    }

    /// End the scrolling phase once the settle window has passed.
    pub fn settle(&mut self, now: Instant) -> bool {
        self.viewport.settle(now)
    }

    /// Resize the view.
    pub fn resize(&mut self, viewport_height: f64, content_width: f64) {
        self.content_width = content_width;
        self.viewport.resize(viewport_height);
        self.compositor
            .set_metrics(self.api.settings().layout_metrics(content_width));
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Build a frame for the current viewport. Only visible lines are materialized.
    pub fn render_frame(&self) -> RenderFrame<'_> {
        let visible = self.viewport.visible_range();
        let window = visible.lines();
        let lines = self.api.lines();

        let render_lines = window
            .clone()
            .filter_map(|index| {
                let text = lines.get(index)?;
                let tokens = self
                    .line_tokens
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| Arc::from(Vec::new()));
                Some(RenderLine {
                    index,
                    text: text.as_str(),
                    tokens,
                })
            })
            .collect();

        let selection = self
            .api
            .selection()
            .map(|range| Decoration::inline(range, SELECTION_CLASS));
        let provided = self.registry.collect_decorations();
        let layered = selection
            .iter()
            .chain(self.api.decorations().map(|(_, decoration)| decoration))
            .chain(provided.iter());
        let decorations = self.compositor.compose(layered, lines, window.clone());

        let caret_position = self.api.cursor();
        let caret = window
            .contains(&caret_position.line)
            .then(|| self.compositor.caret_rect(caret_position, lines));

        RenderFrame {
            visible,
            scroll_top: self.viewport.scroll_top(),
            lines: render_lines,
            decorations,
            caret,
        }
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        self.registry.initialize(&mut self.api);
        for id in self.subscriptions.drain(..) {
            self.api.off(id);
        }
    }
}

fn subscribe(api: &mut EditorApi, signals: &Rc<RefCell<Signals>>) -> Vec<SubscriptionId> {
    let mut ids = Vec::new();

    let sink = Rc::clone(signals);
    ids.push(api.on(EventKind::ContentChange, move |event| {
        if let EditorEvent::ContentChange { edit, .. } = event {
            sink.borrow_mut().edits.push(edit.clone());
        }
    }));

    let sink = Rc::clone(signals);
    ids.push(api.on(EventKind::CursorChange, move |_| {
        sink.borrow_mut().cursor_moved = true;
    }));

    let sink = Rc::clone(signals);
    ids.push(api.on(EventKind::SettingsChange, move |_| {
        sink.borrow_mut().settings_changed = true;
    }));

    ids
}

fn file_extension_of(document: &DocumentId) -> String {
    Path::new(document.as_str())
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::CoreEditing;
    use crate::settings::EditorSettings;

    fn session(text: &str) -> EditorSession {
        let api = EditorApi::new("main.rs", text, EditorSettings::default());
        let mut session = EditorSession::new(api, 100.0, 400.0);
        session.load_extension(Box::new(CoreEditing)).unwrap();
        session
    }

    #[test]
    fn test_render_frame_materializes_visible_lines_only() {
        let text = (0..1000).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let session = session(&text);
        let frame = session.render_frame();

        // 100px / 20px = 5 visible lines, overscan of 5 below.
        assert_eq!(frame.visible.lines(), 0..10);
        assert_eq!(frame.lines.len(), 10);
        assert_eq!(frame.lines[3].text, "line 3");
        assert!(frame.caret.is_some());
        assert!(frame.decorations.rects.is_empty());
    }

    #[test]
    fn test_caret_stays_visible_after_moving_down() {
        let text = (0..50).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let mut session = session(&text);
        let down = KeyChord::parse("down").unwrap();
        for _ in 0..20 {
            session.handle_key(&down).unwrap();
        }

        assert_eq!(session.api().cursor().line, 20);
        // Line 20 ends at 420px; the 100px viewport scrolls to keep it at the bottom.
        assert_eq!(session.viewport().scroll_top(), 320.0);
        let frame = session.render_frame();
        assert!(frame.visible.visible_lines().contains(&20));
    }

    #[test]
    fn test_selection_is_composited() {
        let mut session = session("hello\nworld");
        session
            .handle_key(&KeyChord::parse("ctrl+a").unwrap())
            .unwrap();

        let frame = session.render_frame();
        let selected: Vec<_> = frame.decorations.rects_with_class(SELECTION_CLASS).collect();
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_settings_change_updates_viewport() {
        let mut session = session("a\nb\nc");
        session
            .edit(|api| api.update_settings(&serde_json::json!({ "line_height": 10.0 })))
            .unwrap();
        assert_eq!(session.viewport().line_height(), 10.0);
    }

    #[test]
    fn test_file_extension_from_document_id() {
        assert_eq!(file_extension_of(&DocumentId::new("src/lib.rs")), "rs");
        assert_eq!(file_extension_of(&DocumentId::new("Makefile")), "");
    }
}
