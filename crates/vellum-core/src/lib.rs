#![warn(missing_docs)]
//! Vellum Core - Virtualized, Extensible Text-Editing Kernel
//!
//! # Overview
//!
//! `vellum-core` is the headless part of a code editor: it owns the document text, the caret and
//! selection, persistent decorations, settings and the extension layer, and it turns them into
//! geometry for the few lines that are actually on screen. Painting is left to the host.
//!
//! # Core Features
//!
//! - **Position model**: character offsets ↔ `(line, column)` with clamping everywhere
//! - **Virtualization**: only the visible window plus an overscan margin is materialized
//! - **Decorations**: inline, line, gutter and overlay marks composited into rectangles
//! - **Async tokenization**: debounced, cancellable, never blocking input
//! - **Extensions**: commands, key chords, decoration providers and declared event hooks
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  EditorSession (input → sync → frame)       │  ← Host integration
//! ├─────────────────────────────────────────────┤
//! │  ExtensionRegistry / Keymap / Commands      │  ← Extension layer
//! ├─────────────────────────────────────────────┤
//! │  EditorApi (facade + event bus)             │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Cursor · Decorations · Settings            │  ← Editor state
//! ├─────────────────────────────────────────────┤
//! │  Viewport · Compositor · Tokenization       │  ← View pipeline
//! ├─────────────────────────────────────────────┤
//! │  DocumentBuffer + Position Translator       │  ← Text storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use vellum_core::{CoreEditing, EditorApi, EditorSession, KeyChord};
//!
//! let api = EditorApi::scratch("fn main() {\n}\n");
//! let mut session = EditorSession::new(api, 400.0, 800.0);
//! session.load_extension(Box::new(CoreEditing)).unwrap();
//!
//! session.handle_key(&KeyChord::parse("down").unwrap()).unwrap();
//! session.handle_text_input("    println!(\"hi\");\n");
//!
//! let frame = session.render_frame();
//! assert_eq!(frame.lines[1].text, "    println!(\"hi\");");
//! ```
//!
//! # Module Description
//!
//! - [`position`] - offset ↔ line/column translation
//! - [`buffer`] - the document text and its version counter
//! - [`cursor`] - caret, selection and desired column
//! - [`viewport`] - visible line window and scroll ownership
//! - [`decorations`] / [`compositor`] - persistent marks and their geometry
//! - [`tokenizer`] / [`tokens`] / [`pipeline`] - syntax tokens and the async pipeline
//! - [`keymap`] / [`command`] / [`extension`] / [`registry`] / [`builtin`] - the extension layer
//! - [`api`] - the editor facade and its events
//! - [`session`] - host integration

pub mod api;
pub mod buffer;
pub mod builtin;
pub mod command;
pub mod compositor;
pub mod cursor;
pub mod decorations;
pub mod delta;
pub mod events;
pub mod extension;
pub mod keymap;
pub mod layout;
pub mod line_ending;
pub mod pipeline;
pub mod position;
pub mod registry;
pub mod session;
pub mod settings;
pub mod tokenizer;
pub mod tokens;
pub mod viewport;

pub use api::EditorApi;
pub use buffer::{DocumentBuffer, DocumentId};
pub use builtin::CoreEditing;
pub use command::{Command, CommandContext, CommandError, ExtensionStorage};
pub use compositor::{
    CompositeFrame, DecorationCompositor, DecorationRect, GutterMark, LayoutMetrics,
    OverlayPlacement, Rect, RectSpan,
};
pub use cursor::{CursorController, CursorMotion, CursorState, Selection};
pub use decorations::{Decoration, DecorationError, DecorationId, DecorationKind};
pub use delta::{Bias, TextEdit};
pub use events::{DecorationChange, EditorEvent, EventKind, SubscriptionId};
pub use extension::{DecorationProvider, Extension, ExtensionError, HookCapabilities};
pub use keymap::{KeyChord, KeyChordError, Keymap, Modifiers};
pub use line_ending::LineEnding;
pub use pipeline::{PipelineConfig, PipelineEvent, RefreshTask, TokenSet, TokenizationPipeline};
pub use position::{LineStarts, Position, TextRange};
pub use registry::{DispatchOutcome, ExtensionRegistry};
pub use session::{EditorSession, RenderFrame, RenderLine};
pub use settings::{EditorSettings, SettingsError};
pub use tokenizer::{Tokenizer, TokenizerError};
pub use tokens::{LineToken, LineTokenProjection, Token};
pub use viewport::{OverscanPolicy, Viewport, VisibleRange, compute_visible_range};
