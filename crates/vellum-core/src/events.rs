//! Editor events and the subscription bus.
//!
//! Every observable mutation of an [`EditorApi`](crate::EditorApi) is announced as an
//! [`EditorEvent`]. Subscribers register for one [`EventKind`] and receive events synchronously,
//! in emission order, right after the state change is complete.

use crate::buffer::DocumentId;
use crate::decorations::DecorationId;
use crate::delta::TextEdit;
use crate::position::{Position, TextRange};

/// Event categories a subscriber can listen to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Document text changed.
    ContentChange,
    /// Selection appeared, disappeared or changed.
    SelectionChange,
    /// Caret moved.
    CursorChange,
    /// Settings changed.
    SettingsChange,
    /// Persistent decorations changed.
    DecorationChange,
}

impl EventKind {
    /// All kinds, in a stable order.
    pub const ALL: [EventKind; 5] = [
        EventKind::ContentChange,
        EventKind::SelectionChange,
        EventKind::CursorChange,
        EventKind::SettingsChange,
        EventKind::DecorationChange,
    ];
}

/// What happened to the decoration store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecorationChange {
    /// A decoration was added.
    Added(DecorationId),
    /// A decoration was replaced.
    Updated(DecorationId),
    /// A decoration was removed (explicitly or because its text was deleted).
    Removed(DecorationId),
    /// The store was cleared.
    Cleared,
}

/// A state change notification.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// Document text changed.
    ContentChange {
        /// Document that changed.
        document: DocumentId,
        /// Buffer version after the change.
        version: u64,
        /// The applied edit, or `None` when the whole content was replaced.
        edit: Option<TextEdit>,
    },
    /// Selection changed; `None` means no selection.
    SelectionChange {
        /// New normalized selection range.
        selection: Option<TextRange>,
    },
    /// Caret moved.
    CursorChange {
        /// New caret position.
        position: Position,
    },
    /// Settings changed.
    SettingsChange {
        /// Dotted keys that changed.
        changed: Vec<String>,
    },
    /// Persistent decorations changed.
    DecorationChange(DecorationChange),
}

impl EditorEvent {
    /// Category of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            EditorEvent::ContentChange { .. } => EventKind::ContentChange,
            EditorEvent::SelectionChange { .. } => EventKind::SelectionChange,
            EditorEvent::CursorChange { .. } => EventKind::CursorChange,
            EditorEvent::SettingsChange { .. } => EventKind::SettingsChange,
            EditorEvent::DecorationChange(_) => EventKind::DecorationChange,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Event callback type.
pub type EventCallback = Box<dyn FnMut(&EditorEvent)>;

struct Subscriber {
    id: SubscriptionId,
    kind: EventKind,
    callback: EventCallback,
}

/// Synchronous fan-out of [`EditorEvent`]s.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for events of `kind`.
    pub fn subscribe<F>(&mut self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: FnMut(&EditorEvent) + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers.push(Subscriber {
            id,
            kind,
            callback: Box::new(callback),
        });
        id
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Deliver `event` to every subscriber of its kind, in subscription order.
    pub fn emit(&mut self, event: &EditorEvent) {
        let kind = event.kind();
        for subscriber in self.subscribers.iter_mut().filter(|s| s.kind == kind) {
            (subscriber.callback)(event);
        }
    }

    /// Number of subscribers for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.iter().filter(|s| s.kind == kind).count()
    }
}
