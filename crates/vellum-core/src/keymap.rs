//! Key chords and the chord → command table.
//!
//! Chords are written like `"ctrl+shift+k"` and normalized to a canonical form
//! (`Ctrl+Alt+Shift+Meta+Key`), so `"Shift+Ctrl+K"` and `"ctrl+shift+k"` bind the same entry.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    /// Modifier keys held during a chord.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
    pub struct Modifiers: u8 {
        /// Control.
        const CTRL = 1 << 0;
        /// Alt / Option.
        const ALT = 1 << 1;
        /// Shift.
        const SHIFT = 1 << 2;
        /// Meta / Command / Super.
        const META = 1 << 3;
    }
}

/// Errors produced when parsing a chord.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyChordError {
    /// The chord string was empty.
    #[error("empty key chord")]
    Empty,
    /// Only modifiers were given.
    #[error("key chord `{0}` has no key")]
    MissingKey(String),
    /// More than one non-modifier key was given.
    #[error("key chord `{0}` names more than one key")]
    MultipleKeys(String),
}

/// A normalized modifier + key combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyChord {
    modifiers: Modifiers,
    key: String,
}

impl KeyChord {
    /// Build a chord from parts; `key` is normalized.
    pub fn new(modifiers: Modifiers, key: &str) -> Self {
        Self {
            modifiers,
            key: normalize_key(key),
        }
    }

    /// Parse a chord such as `"ctrl+shift+k"`.
    pub fn parse(chord: &str) -> Result<Self, KeyChordError> {
        chord.parse()
    }

    /// Held modifiers.
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Normalized key name (`"K"`, `"ArrowLeft"`, `"F5"`, ...).
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl FromStr for KeyChord {
    type Err = KeyChordError;

    fn from_str(chord: &str) -> Result<Self, Self::Err> {
        let trimmed = chord.trim();
        if trimmed.is_empty() {
            return Err(KeyChordError::Empty);
        }

        // A trailing "++" means the key itself is '+'.
        let (body, plus_key) = match trimmed.strip_suffix("++") {
            Some(rest) => (rest, true),
            None if trimmed == "+" => ("", true),
            None => (trimmed, false),
        };

        let mut modifiers = Modifiers::empty();
        let mut key: Option<String> = plus_key.then(|| "+".to_string());

        for part in body.split('+').map(str::trim).filter(|p| !p.is_empty()) {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers |= Modifiers::CTRL,
                "alt" | "option" | "opt" => modifiers |= Modifiers::ALT,
                "shift" => modifiers |= Modifiers::SHIFT,
                "meta" | "cmd" | "command" | "super" | "win" => modifiers |= Modifiers::META,
                _ => {
                    if key.is_some() {
                        return Err(KeyChordError::MultipleKeys(chord.to_string()));
                    }
                    key = Some(part.to_string());
                }
            }
        }

        let key = key.ok_or_else(|| KeyChordError::MissingKey(chord.to_string()))?;
        Ok(Self::new(modifiers, &key))
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Modifiers::CTRL, "Ctrl"),
            (Modifiers::ALT, "Alt"),
            (Modifiers::SHIFT, "Shift"),
            (Modifiers::META, "Meta"),
        ];
        for (flag, name) in names {
            if self.modifiers.contains(flag) {
                write!(f, "{name}+")?;
            }
        }
        f.write_str(&self.key)
    }
}

fn normalize_key(key: &str) -> String {
    let mut chars = key.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        return ch.to_uppercase().collect();
    }

    let lower = key.to_ascii_lowercase();
    let named = match lower.as_str() {
        "enter" | "return" => "Enter",
        "escape" | "esc" => "Escape",
        "tab" => "Tab",
        "backspace" | "back" => "Backspace",
        "delete" | "del" => "Delete",
        "space" => "Space",
        "up" | "arrowup" => "ArrowUp",
        "down" | "arrowdown" => "ArrowDown",
        "left" | "arrowleft" => "ArrowLeft",
        "right" | "arrowright" => "ArrowRight",
        "home" => "Home",
        "end" => "End",
        "pageup" | "pgup" => "PageUp",
        "pagedown" | "pgdown" | "pgdn" => "PageDown",
        "insert" | "ins" => "Insert",
        _ => {
            if let Some(n) = lower.strip_prefix('f').filter(|n| n.parse::<u8>().is_ok()) {
                return format!("F{n}");
            }
            let mut chars = lower.chars();
            return match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            };
        }
    };
    named.to_string()
}

/// A bound command and the extension that bound it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Command id to execute.
    pub command_id: String,
    /// Name of the extension that owns the binding.
    pub owner: String,
}

/// Chord → command table. One chord maps to exactly one command; rebinding replaces.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: HashMap<KeyChord, Binding>,
}

impl Keymap {
    /// Create an empty keymap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `chord`; returns the binding it replaced, if any.
    pub fn bind(&mut self, chord: KeyChord, binding: Binding) -> Option<Binding> {
        self.bindings.insert(chord, binding)
    }

    /// Remove a binding.
    pub fn unbind(&mut self, chord: &KeyChord) -> Option<Binding> {
        self.bindings.remove(chord)
    }

    /// Look up the binding for `chord`.
    pub fn resolve(&self, chord: &KeyChord) -> Option<&Binding> {
        self.bindings.get(chord)
    }

    /// Drop every binding owned by `owner`. Returns how many were removed.
    pub fn remove_owned_by(&mut self, owner: &str) -> usize {
        let before = self.bindings.len();
        self.bindings.retain(|_, binding| binding.owner != owner);
        before - self.bindings.len()
    }

    /// Chords currently bound to `command_id`.
    pub fn chords_for(&self, command_id: &str) -> Vec<&KeyChord> {
        let mut chords: Vec<_> = self
            .bindings
            .iter()
            .filter(|(_, b)| b.command_id == command_id)
            .map(|(chord, _)| chord)
            .collect();
        chords.sort();
        chords
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Remove every binding.
    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}
