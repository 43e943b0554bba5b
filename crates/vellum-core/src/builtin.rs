//! Built-in editing commands.
//!
//! [`CoreEditing`] is an ordinary [`Extension`]: hosts load it like any other and may override
//! any of its chords by loading a later extension that binds the same chord.

use crate::command::Command;
use crate::cursor::CursorMotion;
use crate::extension::Extension;
use crate::keymap::{KeyChord, Modifiers};

/// Name under which [`CoreEditing`] registers.
pub const CORE_EDITING: &str = "core.editing";

const MOTIONS: [(&str, &str, CursorMotion, Modifiers, &str); 8] = [
    ("left", "Left", CursorMotion::Left, Modifiers::empty(), "ArrowLeft"),
    ("right", "Right", CursorMotion::Right, Modifiers::empty(), "ArrowRight"),
    ("up", "Up", CursorMotion::Up, Modifiers::empty(), "ArrowUp"),
    ("down", "Down", CursorMotion::Down, Modifiers::empty(), "ArrowDown"),
    ("lineStart", "Line Start", CursorMotion::LineStart, Modifiers::empty(), "Home"),
    ("lineEnd", "Line End", CursorMotion::LineEnd, Modifiers::empty(), "End"),
    ("documentStart", "Document Start", CursorMotion::DocumentStart, Modifiers::CTRL, "Home"),
    ("documentEnd", "Document End", CursorMotion::DocumentEnd, Modifiers::CTRL, "End"),
];

/// Caret movement, selection and basic editing commands with their default chords.
///
/// | command | chord |
/// |---|---|
/// | `cursor.left` ... `cursor.documentEnd` | arrows, `Home`, `End`, `Ctrl+Home`, `Ctrl+End` |
/// | `selection.left` ... `selection.documentEnd` | the same chords with `Shift` |
/// | `selection.all` | `Ctrl+A` |
/// | `selection.clear` | `Escape` (only while a selection exists) |
/// | `edit.deleteLeft` / `edit.deleteRight` | `Backspace` / `Delete` |
/// | `edit.newline` | `Enter` |
/// | `edit.indent` | `Tab` |
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreEditing;

impl Extension for CoreEditing {
    fn name(&self) -> &str {
        CORE_EDITING
    }

    fn commands(&self) -> Vec<Command> {
        let mut commands = Vec::new();
        for (suffix, title, motion, _, _) in MOTIONS {
            commands.push(Command::new(
                format!("cursor.{suffix}"),
                format!("Cursor {title}"),
                move |ctx| {
                    ctx.api_mut().move_cursor(motion, false);
                    Ok(())
                },
            ));
            commands.push(Command::new(
                format!("selection.{suffix}"),
                format!("Select {title}"),
                move |ctx| {
                    ctx.api_mut().move_cursor(motion, true);
                    Ok(())
                },
            ));
        }

        commands.push(Command::new("selection.all", "Select All", |ctx| {
            ctx.api_mut().select_all();
            Ok(())
        }));
        commands.push(
            Command::new("selection.clear", "Clear Selection", |ctx| {
                ctx.api_mut().clear_selection();
                Ok(())
            })
            .when(|ctx| ctx.api().selection().is_some()),
        );

        commands.push(Command::new("edit.deleteLeft", "Delete Left", |ctx| {
            ctx.api_mut().delete_backward();
            Ok(())
        }));
        commands.push(Command::new("edit.deleteRight", "Delete Right", |ctx| {
            ctx.api_mut().delete_forward();
            Ok(())
        }));
        commands.push(Command::new("edit.newline", "New Line", |ctx| {
            ctx.api_mut().type_text("\n");
            Ok(())
        }));
        commands.push(Command::new("edit.indent", "Indent", |ctx| {
            let unit = ctx.api().settings().indent_unit();
            ctx.api_mut().type_text(&unit);
            Ok(())
        }));
        commands
    }

    fn keybindings(&self) -> Vec<(KeyChord, String)> {
        let mut bindings = Vec::new();
        for (suffix, _, _, modifiers, key) in MOTIONS {
            bindings.push((KeyChord::new(modifiers, key), format!("cursor.{suffix}")));
            bindings.push((
                KeyChord::new(modifiers | Modifiers::SHIFT, key),
                format!("selection.{suffix}"),
            ));
        }

        let plain = [
            ("Backspace", "edit.deleteLeft"),
            ("Delete", "edit.deleteRight"),
            ("Enter", "edit.newline"),
            ("Tab", "edit.indent"),
            ("Escape", "selection.clear"),
        ];
        for (key, command) in plain {
            bindings.push((KeyChord::new(Modifiers::empty(), key), command.to_string()));
        }
        bindings.push((KeyChord::new(Modifiers::CTRL, "a"), "selection.all".to_string()));
        bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::EditorApi;
    use crate::registry::{DispatchOutcome, ExtensionRegistry};
    use serde_json::json;

    fn setup(text: &str) -> (EditorApi, ExtensionRegistry) {
        let mut api = EditorApi::scratch(text);
        let mut registry = ExtensionRegistry::new();
        registry.load_extension(Box::new(CoreEditing), &mut api).unwrap();
        (api, registry)
    }

    fn press(
        registry: &mut ExtensionRegistry,
        api: &mut EditorApi,
        chord: &str,
    ) -> DispatchOutcome {
        registry
            .dispatch_key(&KeyChord::parse(chord).unwrap(), api)
            .unwrap()
    }

    #[test]
    fn test_every_bound_command_exists() {
        let (_, registry) = setup("");
        for id in registry.command_ids() {
            let chords = registry.keymap().chords_for(id);
            assert!(!chords.is_empty(), "{id} has no default chord");
        }
        assert_eq!(registry.command_ids().len(), 22);
    }

    #[test]
    fn test_shift_arrows_extend_selection() {
        let (mut api, mut registry) = setup("hello");
        press(&mut registry, &mut api, "shift+end");
        assert_eq!(api.selected_text().as_deref(), Some("hello"));

        press(&mut registry, &mut api, "left");
        assert!(api.selection().is_none());
        assert_eq!(api.cursor().offset, 0);
    }

    #[test]
    fn test_escape_guarded_by_selection() {
        let (mut api, mut registry) = setup("abc");
        assert_eq!(
            press(&mut registry, &mut api, "escape"),
            DispatchOutcome::GuardRejected {
                command_id: "selection.clear".into()
            }
        );
        press(&mut registry, &mut api, "ctrl+a");
        assert!(press(&mut registry, &mut api, "esc").is_executed());
        assert!(api.selection().is_none());
    }

    #[test]
    fn test_indent_follows_settings() {
        let (mut api, mut registry) = setup("x");
        press(&mut registry, &mut api, "tab");
        assert_eq!(api.content(), "    x");

        api.update_settings(&json!({ "insert_spaces": false })).unwrap();
        press(&mut registry, &mut api, "tab");
        assert_eq!(api.content(), "    \tx");

        press(&mut registry, &mut api, "enter");
        press(&mut registry, &mut api, "backspace");
        assert_eq!(api.content(), "    \tx");
    }
}
