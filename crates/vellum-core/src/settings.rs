//! Editor settings.
//!
//! Settings are plain serde data. Hosts load them from JSON with
//! [`EditorSettings::from_json_str`]; extensions change them through
//! [`EditorApi::update_settings`](crate::EditorApi::update_settings), which applies a JSON merge
//! patch, validates the result and reports the dotted keys that changed.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::compositor::LayoutMetrics;
use crate::cursor::DEFAULT_POSITION_CACHE_CAPACITY;
use crate::pipeline::{DEFAULT_DEBOUNCE, DEFAULT_TOKEN_CACHE_CAPACITY, PipelineConfig};
use crate::viewport::{MIN_OVERSCAN, OVERSCAN_RATIO, OverscanPolicy, SCROLL_SETTLE_WINDOW};

/// Errors raised while loading or patching settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The JSON was malformed or had the wrong shape.
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A patch must be a JSON object.
    #[error("settings patch must be a JSON object")]
    NotAnObject,
    /// A value is out of range.
    #[error("invalid value for `{key}`: {reason}")]
    Invalid {
        /// Dotted key of the offending value.
        key: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Top-level editor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditorSettings {
    /// Tab stop width in cells.
    #[serde(default = "default_tab_size")]
    pub tab_size: usize,
    /// Insert spaces instead of `'\t'` for the Tab key.
    #[serde(default = "default_insert_spaces")]
    pub insert_spaces: bool,
    /// Font size in points (informational for hosts).
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    /// Line height in pixels.
    #[serde(default = "default_line_height")]
    pub line_height: f64,
    /// Monospace cell advance in pixels.
    #[serde(default = "default_char_width")]
    pub char_width: f64,
    /// Theme identifier (e.g. `"vellum-dark"`).
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Virtualization tuning.
    #[serde(default)]
    pub viewport: ViewportSettings,
    /// Syntax tokenization tuning.
    #[serde(default)]
    pub tokenization: TokenizationSettings,
    /// Caret bookkeeping.
    #[serde(default)]
    pub cursor: CursorSettings,
}

/// Virtualization tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewportSettings {
    /// Minimum overscan in lines.
    #[serde(default = "default_min_overscan")]
    pub min_overscan: usize,
    /// Overscan relative to the visible line count.
    #[serde(default = "default_overscan_ratio")]
    pub overscan_ratio: f64,
    /// Quiet period that ends a user scroll, in milliseconds.
    #[serde(default = "default_settle_window_ms")]
    pub settle_window_ms: u64,
}

/// Syntax tokenization tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenizationSettings {
    /// Debounce after the last edit, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Number of documents whose tokens are cached.
    #[serde(default = "default_token_cache_capacity")]
    pub cache_capacity: usize,
}

/// Caret bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CursorSettings {
    /// Number of documents whose caret position is remembered.
    #[serde(default = "default_position_cache_capacity")]
    pub position_cache_capacity: usize,
}

fn default_tab_size() -> usize {
    4
}

fn default_insert_spaces() -> bool {
    true
}

fn default_font_size() -> f64 {
    14.0
}

fn default_line_height() -> f64 {
    20.0
}

fn default_char_width() -> f64 {
    8.4
}

fn default_theme() -> String {
    "vellum-dark".to_string()
}

fn default_min_overscan() -> usize {
    MIN_OVERSCAN
}

fn default_overscan_ratio() -> f64 {
    OVERSCAN_RATIO
}

fn default_settle_window_ms() -> u64 {
    SCROLL_SETTLE_WINDOW.as_millis() as u64
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE.as_millis() as u64
}

fn default_token_cache_capacity() -> usize {
    DEFAULT_TOKEN_CACHE_CAPACITY
}

fn default_position_cache_capacity() -> usize {
    DEFAULT_POSITION_CACHE_CAPACITY
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            tab_size: default_tab_size(),
            insert_spaces: default_insert_spaces(),
            font_size: default_font_size(),
            line_height: default_line_height(),
            char_width: default_char_width(),
            theme: default_theme(),
            viewport: ViewportSettings::default(),
            tokenization: TokenizationSettings::default(),
            cursor: CursorSettings::default(),
        }
    }
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            min_overscan: default_min_overscan(),
            overscan_ratio: default_overscan_ratio(),
            settle_window_ms: default_settle_window_ms(),
        }
    }
}

impl Default for TokenizationSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            cache_capacity: default_token_cache_capacity(),
        }
    }
}

impl Default for CursorSettings {
    fn default() -> Self {
        Self {
            position_cache_capacity: default_position_cache_capacity(),
        }
    }
}

impl EditorSettings {
    /// Parse and validate settings from JSON. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize to a JSON value.
    pub fn to_value(&self) -> Result<Value, SettingsError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Reject values that would break layout or scheduling.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.tab_size == 0 {
            return Err(SettingsError::Invalid {
                key: "tab_size",
                reason: "must be at least 1",
            });
        }
        if self.line_height.is_nan() || self.line_height <= 0.0 {
            return Err(SettingsError::Invalid {
                key: "line_height",
                reason: "must be positive",
            });
        }
        if self.char_width.is_nan() || self.char_width <= 0.0 {
            return Err(SettingsError::Invalid {
                key: "char_width",
                reason: "must be positive",
            });
        }
        if self.viewport.overscan_ratio.is_nan() || self.viewport.overscan_ratio < 0.0 {
            return Err(SettingsError::Invalid {
                key: "viewport.overscan_ratio",
                reason: "must not be negative",
            });
        }
        Ok(())
    }

    /// Read one setting by dotted key, e.g. `"viewport.min_overscan"`.
    pub fn get(&self, key: &str) -> Option<Value> {
        let root = self.to_value().ok()?;
        key.split('.')
            .try_fold(&root, |value, part| value.get(part))
            .cloned()
    }

    /// Apply a JSON merge patch. On success returns the dotted keys whose value changed.
    ///
    /// The settings are left untouched if the patch is malformed or the result is invalid.
    pub fn merge_patch(&mut self, patch: &Value) -> Result<Vec<String>, SettingsError> {
        if !patch.is_object() {
            return Err(SettingsError::NotAnObject);
        }

        let before = self.to_value()?;
        let mut merged = before.clone();
        merge_values(&mut merged, patch);

        let next: Self = serde_json::from_value(merged)?;
        next.validate()?;

        let after = next.to_value()?;
        let mut changed = Vec::new();
        diff_keys(&before, &after, "", &mut changed);

        *self = next;
        Ok(changed)
    }

    /// Overscan policy for the viewport.
    pub fn overscan_policy(&self) -> OverscanPolicy {
        OverscanPolicy {
            min_overscan: self.viewport.min_overscan,
            overscan_ratio: self.viewport.overscan_ratio,
        }
    }

    /// Settle window for the viewport.
    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.viewport.settle_window_ms)
    }

    /// Layout metrics for the compositor.
    pub fn layout_metrics(&self, content_width: f64) -> LayoutMetrics {
        LayoutMetrics {
            line_height: self.line_height,
            char_width: self.char_width,
            tab_size: self.tab_size,
            content_width,
        }
    }

    /// Pipeline configuration.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            debounce: Duration::from_millis(self.tokenization.debounce_ms),
            cache_capacity: self.tokenization.cache_capacity,
        }
    }

    /// Text inserted by the Tab key.
    pub fn indent_unit(&self) -> String {
        if self.insert_spaces {
            " ".repeat(self.tab_size)
        } else {
            "\t".to_string()
        }
    }
}

fn merge_values(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                // `null` resets the key to its default.
                if value.is_null() {
                    target.remove(key);
                    continue;
                }
                let nested = value.is_object() && target.get(key).is_some_and(Value::is_object);
                match target.get_mut(key) {
                    Some(existing) if nested => merge_values(existing, value),
                    _ => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

fn diff_keys(before: &Value, after: &Value, prefix: &str, out: &mut Vec<String>) {
    match (before, after) {
        (Value::Object(a), Value::Object(b)) => {
            for (key, new_value) in b {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                let old_value = a.get(key).unwrap_or(&Value::Null);
                diff_keys(old_value, new_value, &path, out);
            }
        }
        _ if before != after => out.push(prefix.to_string()),
        _ => {}
    }
}
