//! Commands: named, guarded actions executed against an [`EditorApi`].

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::api::EditorApi;
use crate::decorations::DecorationError;
use crate::settings::SettingsError;

/// Errors raised while dispatching or running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// No command is registered under this id.
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    /// A settings update inside the command failed.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// A decoration update inside the command failed.
    #[error(transparent)]
    Decoration(#[from] DecorationError),
    /// The command reported a failure.
    #[error("command `{id}` failed: {message}")]
    Failed {
        /// Command id.
        id: String,
        /// Failure description.
        message: String,
    },
}

/// Private key/value storage of one extension. Cleared when the extension unloads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionStorage {
    values: HashMap<String, Value>,
}

impl ExtensionStorage {
    /// Read a raw value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Read and deserialize a value. Returns `None` if missing or of the wrong shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.values.get(key)?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Store a raw value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    /// Serialize and store a value.
    pub fn set_as<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        self.values.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Remove a value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// What a command sees while running.
pub struct CommandContext<'a> {
    api: &'a mut EditorApi,
    storage: &'a mut ExtensionStorage,
    extension: &'a str,
}

impl<'a> CommandContext<'a> {
    /// Bundle the facade with the owning extension's storage.
    pub fn new(
        api: &'a mut EditorApi,
        storage: &'a mut ExtensionStorage,
        extension: &'a str,
    ) -> Self {
        Self {
            api,
            storage,
            extension,
        }
    }

    /// Read-only facade access.
    pub fn api(&self) -> &EditorApi {
        &*self.api
    }

    /// Mutable facade access.
    pub fn api_mut(&mut self) -> &mut EditorApi {
        &mut *self.api
    }

    /// The owning extension's storage.
    pub fn storage(&self) -> &ExtensionStorage {
        &*self.storage
    }

    /// The owning extension's storage, mutably.
    pub fn storage_mut(&mut self) -> &mut ExtensionStorage {
        &mut *self.storage
    }

    /// Name of the extension that owns the running command.
    pub fn extension_name(&self) -> &str {
        self.extension
    }
}

/// Command body.
pub type CommandHandler = Rc<dyn Fn(&mut CommandContext<'_>) -> Result<(), CommandError>>;
/// Enablement guard evaluated before the body runs.
pub type CommandGuard = Rc<dyn Fn(&CommandContext<'_>) -> bool>;

/// A named action.
#[derive(Clone)]
pub struct Command {
    id: String,
    title: String,
    handler: CommandHandler,
    when: Option<CommandGuard>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("guarded", &self.when.is_some())
            .finish()
    }
}

impl Command {
    /// Create a command.
    pub fn new<F>(id: impl Into<String>, title: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut CommandContext<'_>) -> Result<(), CommandError> + 'static,
    {
        Self {
            id: id.into(),
            title: title.into(),
            handler: Rc::new(handler),
            when: None,
        }
    }

    /// Only run when `guard` returns `true`.
    pub fn when<G>(mut self, guard: G) -> Self
    where
        G: Fn(&CommandContext<'_>) -> bool + 'static,
    {
        self.when = Some(Rc::new(guard));
        self
    }

    /// Command id, e.g. `"edit.deleteLeft"`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human readable title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Evaluate the guard (commands without one are always enabled).
    pub fn is_enabled(&self, ctx: &CommandContext<'_>) -> bool {
        self.when.as_ref().is_none_or(|guard| guard(ctx))
    }

    /// Run the body.
    pub fn run(&self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        (self.handler)(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_guard_and_storage() {
        let mut api = EditorApi::scratch("abc");
        let mut storage = ExtensionStorage::default();

        let count = Command::new("demo.count", "Count", |ctx| {
            let n = ctx.storage().get_as::<u32>("n").unwrap_or(0);
            ctx.storage_mut().set("n", json!(n + 1));
            Ok(())
        })
        .when(|ctx| ctx.api().selection().is_none());

        let mut ctx = CommandContext::new(&mut api, &mut storage, "demo");
        assert!(count.is_enabled(&ctx));
        count.run(&mut ctx).unwrap();
        count.run(&mut ctx).unwrap();
        assert_eq!(ctx.extension_name(), "demo");

        ctx.api_mut().select_all();
        assert!(!count.is_enabled(&ctx));
        assert_eq!(storage.get_as::<u32>("n"), Some(2));
    }
}
