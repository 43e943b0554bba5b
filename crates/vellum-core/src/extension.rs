//! The extension contract.
//!
//! An [`Extension`] contributes commands, keybindings, an optional decoration provider and event
//! hooks. Hooks are declared up front through [`HookCapabilities`]; the registry only wires
//! [`Extension::on_event`] for the declared kinds.

use std::rc::Rc;

use bitflags::bitflags;
use thiserror::Error;

use crate::api::EditorApi;
use crate::command::Command;
use crate::decorations::Decoration;
use crate::events::{EditorEvent, EventKind};
use crate::keymap::KeyChord;

bitflags! {
    /// Event kinds an extension wants to observe.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HookCapabilities: u8 {
        /// [`EventKind::ContentChange`].
        const CONTENT_CHANGE = 1 << 0;
        /// [`EventKind::SelectionChange`].
        const SELECTION_CHANGE = 1 << 1;
        /// [`EventKind::CursorChange`].
        const CURSOR_CHANGE = 1 << 2;
        /// [`EventKind::SettingsChange`].
        const SETTINGS_CHANGE = 1 << 3;
        /// [`EventKind::DecorationChange`].
        const DECORATION_CHANGE = 1 << 4;
    }
}

impl HookCapabilities {
    /// Capability flag for one event kind.
    pub fn for_kind(kind: EventKind) -> Self {
        match kind {
            EventKind::ContentChange => Self::CONTENT_CHANGE,
            EventKind::SelectionChange => Self::SELECTION_CHANGE,
            EventKind::CursorChange => Self::CURSOR_CHANGE,
            EventKind::SettingsChange => Self::SETTINGS_CHANGE,
            EventKind::DecorationChange => Self::DECORATION_CHANGE,
        }
    }

    /// Event kinds covered by these capabilities.
    pub fn event_kinds(self) -> impl Iterator<Item = EventKind> {
        EventKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(Self::for_kind(*kind)))
    }
}

/// Zero-argument callback returning a fresh decoration snapshot each time it is polled.
pub type DecorationProvider = Rc<dyn Fn() -> Vec<Decoration>>;

/// Errors raised by the extension registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtensionError {
    /// An extension with this name is already active.
    #[error("extension `{0}` is already loaded")]
    AlreadyLoaded(String),
    /// No active extension has this name.
    #[error("extension `{0}` is not loaded")]
    NotLoaded(String),
    /// The command id is already registered.
    #[error("extension `{extension}` registers duplicate command id `{command}`")]
    DuplicateCommand {
        /// Extension being loaded.
        extension: String,
        /// Offending command id.
        command: String,
    },
    /// [`Extension::initialize`] failed; the extension was rolled back.
    #[error("extension `{extension}` failed to activate: {reason}")]
    ActivationFailed {
        /// Extension being loaded.
        extension: String,
        /// Reported reason.
        reason: String,
    },
    /// Raised by extension code to signal a failure.
    #[error("{0}")]
    Custom(String),
}

impl ExtensionError {
    /// Convenience constructor for extension authors.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// A unit of editor functionality that can be loaded and unloaded at runtime.
///
/// Only [`name`](Extension::name) is required; every contribution has an empty default.
pub trait Extension {
    /// Unique name, used as the owner of commands, bindings and storage.
    fn name(&self) -> &str;

    /// Event kinds routed to [`on_event`](Extension::on_event).
    fn capabilities(&self) -> HookCapabilities {
        HookCapabilities::empty()
    }

    /// Commands to register.
    fn commands(&self) -> Vec<Command> {
        Vec::new()
    }

    /// Default chords as `(chord, command id)`.
    fn keybindings(&self) -> Vec<(KeyChord, String)> {
        Vec::new()
    }

    /// Decoration provider polled on every frame.
    fn decoration_provider(&self) -> Option<DecorationProvider> {
        None
    }

    /// Called once after registration. On error, [`Extension::dispose`] runs and the
    /// registration is rolled back; anything else done through `api` persists unless `dispose`
    /// undoes it.
    fn initialize(&mut self, api: &mut EditorApi) -> Result<(), ExtensionError> {
        let _ = api;
        Ok(())
    }

    /// Called on unload after hooks are detached, and after a failed `initialize`.
    fn dispose(&mut self, api: &mut EditorApi) {
        let _ = api;
    }

    /// Receives events for the declared capabilities.
    fn on_event(&mut self, event: &EditorEvent) {
        let _ = event;
    }
}
