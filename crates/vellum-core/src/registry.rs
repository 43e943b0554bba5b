//! Extension & Command Registry
//!
//! The registry owns every loaded [`Extension`], the command table, the [`Keymap`] and the
//! per-extension [`ExtensionStorage`]. It never owns the [`EditorApi`]; each operation that
//! touches editor state takes it explicitly.
//!
//! Loading is transactional: if any step fails, everything the extension registered so far is
//! rolled back (including key bindings it displaced) and the registry stays usable. An extension
//! whose `initialize` fails is disposed before the rollback. Changes it already made through the
//! [`EditorApi`] (edits, decorations, hooks it attached itself) are left to its `dispose`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::HashSet;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, error, info, warn};

use crate::api::EditorApi;
use crate::command::{Command, CommandContext, CommandError, ExtensionStorage};
use crate::decorations::Decoration;
use crate::events::SubscriptionId;
use crate::extension::{DecorationProvider, Extension, ExtensionError};
use crate::keymap::{Binding, KeyChord, Keymap};

type SharedExtension = Rc<RefCell<Box<dyn Extension>>>;

struct LoadedExtension {
    extension: SharedExtension,
    commands: Vec<String>,
    subscriptions: Vec<SubscriptionId>,
    provider: Option<DecorationProvider>,
}

struct RegisteredCommand {
    command: Command,
    owner: String,
}

/// Result of [`ExtensionRegistry::dispatch_key`] and [`ExtensionRegistry::execute_command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No binding for the chord.
    Unbound,
    /// The command's `when` guard returned `false`.
    GuardRejected {
        /// Command that was skipped.
        command_id: String,
    },
    /// The command ran successfully.
    Executed {
        /// Command that ran.
        command_id: String,
    },
}

impl DispatchOutcome {
    /// Returns `true` if a command ran.
    pub fn is_executed(&self) -> bool {
        matches!(self, DispatchOutcome::Executed { .. })
    }
}

/// Loaded extensions, their commands, key bindings and storage.
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: IndexMap<String, LoadedExtension>,
    commands: HashMap<String, RegisteredCommand>,
    keymap: Keymap,
    storage: HashMap<String, ExtensionStorage>,
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("extensions", &self.extensions.keys().collect::<Vec<_>>())
            .field("commands", &self.commands.len())
            .field("bindings", &self.keymap.len())
            .finish()
    }
}

impl ExtensionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Unload everything, most recently loaded first. Safe to call repeatedly.
    pub fn initialize(&mut self, api: &mut EditorApi) {
        let names: Vec<String> = self.extensions.keys().rev().cloned().collect();
        for name in names {
            if let Err(err) = self.unload_extension(&name, api) {
                warn!(extension = %name, error = %err, "unload during reset failed");
            }
        }
        self.commands.clear();
        self.keymap.clear();
        self.storage.clear();
    }

    /// Register an extension and activate it.
    pub fn load_extension(
        &mut self,
        extension: Box<dyn Extension>,
        api: &mut EditorApi,
    ) -> Result<(), ExtensionError> {
        let name = extension.name().to_string();
        if self.extensions.contains_key(&name) {
            return Err(ExtensionError::AlreadyLoaded(name));
        }

        let commands = extension.commands();
        let mut seen = HashSet::new();
        for command in &commands {
            if self.commands.contains_key(command.id()) || !seen.insert(command.id()) {
                return Err(ExtensionError::DuplicateCommand {
                    extension: name,
                    command: command.id().to_string(),
                });
            }
        }

        let command_ids: Vec<String> = commands.iter().map(|c| c.id().to_string()).collect();
        for command in commands {
            self.commands.insert(
                command.id().to_string(),
                RegisteredCommand {
                    command,
                    owner: name.clone(),
                },
            );
        }

        let mut displaced = Vec::new();
        for (chord, command_id) in extension.keybindings() {
            let binding = Binding {
                command_id,
                owner: name.clone(),
            };
            let previous = self.keymap.bind(chord.clone(), binding);
            if let Some(previous) = &previous {
                warn!(
                    chord = %chord,
                    previous = %previous.command_id,
                    owner = %previous.owner,
                    extension = %name,
                    "key binding overwritten"
                );
            }
            displaced.push((chord, previous));
        }

        let provider = extension.decoration_provider();
        let capabilities = extension.capabilities();
        self.storage.entry(name.clone()).or_default();

        let extension: SharedExtension = Rc::new(RefCell::new(extension));
        let activation = extension.borrow_mut().initialize(api);
        if let Err(err) = activation {
            error!(extension = %name, error = %err, "extension failed to activate");
            extension.borrow_mut().dispose(api);
            self.rollback(&name, &command_ids, displaced);
            return Err(ExtensionError::ActivationFailed {
                extension: name,
                reason: err.to_string(),
            });
        }

        let mut subscriptions = Vec::new();
        for kind in capabilities.event_kinds() {
            let target = Rc::clone(&extension);
            let owner = name.clone();
            let id = api.on(kind, move |event| match target.try_borrow_mut() {
                Ok(mut ext) => ext.on_event(event),
                Err(_) => warn!(extension = %owner, ?kind, "extension busy, event dropped"),
            });
            subscriptions.push(id);
        }

        info!(
            extension = %name,
            commands = command_ids.len(),
            hooks = subscriptions.len(),
            "extension loaded"
        );
        self.extensions.insert(
            name,
            LoadedExtension {
                extension,
                commands: command_ids,
                subscriptions,
                provider,
            },
        );
        Ok(())
    }

    fn rollback(
        &mut self,
        name: &str,
        command_ids: &[String],
        displaced: Vec<(KeyChord, Option<Binding>)>,
    ) {
        for id in command_ids {
            self.commands.remove(id);
        }
        for (chord, previous) in displaced.into_iter().rev() {
            match previous {
                Some(binding) => {
                    self.keymap.bind(chord, binding);
                }
                None => {
                    self.keymap.unbind(&chord);
                }
            }
        }
        self.storage.remove(name);
    }

    /// Deactivate an extension and remove everything it registered.
    ///
    /// Hooks are detached before [`Extension::dispose`] runs, so disposal cannot re-enter the
    /// extension through events.
    pub fn unload_extension(
        &mut self,
        name: &str,
        api: &mut EditorApi,
    ) -> Result<(), ExtensionError> {
        let loaded = self
            .extensions
            .shift_remove(name)
            .ok_or_else(|| ExtensionError::NotLoaded(name.to_string()))?;

        for id in loaded.subscriptions {
            api.off(id);
        }
        loaded.extension.borrow_mut().dispose(api);

        for id in &loaded.commands {
            self.commands.remove(id);
        }
        let unbound = self.keymap.remove_owned_by(name);
        self.storage.remove(name);

        info!(extension = %name, unbound, "extension unloaded");
        Ok(())
    }

    /// Resolve `chord` and run the bound command if its guard allows.
    pub fn dispatch_key(
        &mut self,
        chord: &KeyChord,
        api: &mut EditorApi,
    ) -> Result<DispatchOutcome, CommandError> {
        let Some(binding) = self.keymap.resolve(chord) else {
            debug!(chord = %chord, "no binding");
            return Ok(DispatchOutcome::Unbound);
        };
        let command_id = binding.command_id.clone();
        debug!(chord = %chord, command = %command_id, "dispatch key");
        self.execute_command(&command_id, api)
    }

    /// Run a command by id, honoring its `when` guard.
    pub fn execute_command(
        &mut self,
        id: &str,
        api: &mut EditorApi,
    ) -> Result<DispatchOutcome, CommandError> {
        let registered = self
            .commands
            .get(id)
            .ok_or_else(|| CommandError::UnknownCommand(id.to_string()))?;
        let command = registered.command.clone();
        let owner = registered.owner.clone();

        let storage = self.storage.entry(owner.clone()).or_default();
        let mut ctx = CommandContext::new(api, storage, &owner);
        if !command.is_enabled(&ctx) {
            debug!(command = %id, "command guard rejected");
            return Ok(DispatchOutcome::GuardRejected {
                command_id: id.to_string(),
            });
        }

        command.run(&mut ctx)?;
        debug!(command = %id, "command executed");
        Ok(DispatchOutcome::Executed {
            command_id: id.to_string(),
        })
    }

    /// Poll every decoration provider, in load order.
    pub fn collect_decorations(&self) -> Vec<Decoration> {
        self.extensions
            .values()
            .filter_map(|loaded| loaded.provider.as_ref())
            .flat_map(|provider| provider())
            .collect()
    }

    /// Returns `true` if an extension with this name is active.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.extensions.contains_key(name)
    }

    /// Names of active extensions in load order.
    pub fn loaded_extensions(&self) -> Vec<&str> {
        self.extensions.keys().map(String::as_str).collect()
    }

    /// Look up a registered command.
    pub fn command(&self, id: &str) -> Option<&Command> {
        self.commands.get(id).map(|registered| &registered.command)
    }

    /// Ids of every registered command, sorted.
    pub fn command_ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.commands.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// The chord table.
    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    /// Storage of an active extension.
    pub fn storage(&self, name: &str) -> Option<&ExtensionStorage> {
        self.storage.get(name)
    }
}
