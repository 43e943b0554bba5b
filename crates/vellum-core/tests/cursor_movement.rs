use vellum_core::{
    CoreEditing, CursorMotion, EditorApi, ExtensionRegistry, KeyChord, Position, TextRange,
};

fn caret(api: &EditorApi) -> (usize, usize) {
    let position = api.cursor();
    (position.line, position.column)
}

#[test]
fn test_vertical_moves_keep_desired_column() {
    let mut api = EditorApi::scratch("abcdef\nab\nabcdefgh");
    api.set_cursor(Position::new(0, 5, 0));

    api.move_cursor(CursorMotion::Down, false);
    assert_eq!(caret(&api), (1, 2));
    api.move_cursor(CursorMotion::Down, false);
    assert_eq!(caret(&api), (2, 5));
    api.move_cursor(CursorMotion::Up, false);
    assert_eq!(caret(&api), (1, 2));
    api.move_cursor(CursorMotion::Down, false);
    assert_eq!(caret(&api), (2, 5));

    // A horizontal move resets the desired column.
    api.move_cursor(CursorMotion::Left, false);
    api.move_cursor(CursorMotion::Up, false);
    api.move_cursor(CursorMotion::Up, false);
    assert_eq!(caret(&api), (0, 4));
}

#[test]
fn test_vertical_move_at_document_edge_stays_put() {
    let mut api = EditorApi::scratch("abc\nde");
    api.set_cursor(Position::new(0, 2, 0));
    api.move_cursor(CursorMotion::Up, false);
    assert_eq!(caret(&api), (0, 2));

    api.move_cursor(CursorMotion::DocumentEnd, false);
    api.move_cursor(CursorMotion::Down, false);
    assert_eq!(caret(&api), (1, 2));
}

#[test]
fn test_horizontal_moves_step_over_graphemes_and_lines() {
    let mut api = EditorApi::scratch("e\u{301}x\ny");
    api.move_cursor(CursorMotion::Right, false);
    assert_eq!(caret(&api), (0, 2));
    api.move_cursor(CursorMotion::Right, false);
    api.move_cursor(CursorMotion::Right, false);
    assert_eq!(caret(&api), (1, 0));
    api.move_cursor(CursorMotion::Left, false);
    assert_eq!(caret(&api), (0, 3));
}

#[test]
fn test_extend_keeps_anchor_and_reports_normalized_range() {
    let mut api = EditorApi::scratch("one\ntwo\nthree");
    api.set_cursor(Position::new(1, 1, 0));
    api.move_cursor(CursorMotion::Up, true);
    api.move_cursor(CursorMotion::LineStart, true);

    let selection = api.selection().unwrap();
    assert_eq!(selection.start.offset, 0);
    assert_eq!(selection.end.offset, 5);
    assert_eq!(api.selected_text().as_deref(), Some("one\nt"));
    assert_eq!(api.cursor().offset, 0);
}

#[test]
fn test_empty_selection_is_dropped() {
    let mut api = EditorApi::scratch("abc");
    let at = api.position_at(0, 1);
    api.set_selection(TextRange::new(at, at));
    assert!(api.selection().is_none());
    assert_eq!(api.cursor().offset, 1);
}

fn editing(text: &str) -> (EditorApi, ExtensionRegistry) {
    let mut api = EditorApi::scratch(text);
    let mut registry = ExtensionRegistry::new();
    registry.load_extension(Box::new(CoreEditing), &mut api).unwrap();
    (api, registry)
}

fn press(registry: &mut ExtensionRegistry, api: &mut EditorApi, chord: &str) {
    let outcome = registry
        .dispatch_key(&KeyChord::parse(chord).unwrap(), api)
        .unwrap();
    assert!(outcome.is_executed(), "{chord}: {outcome:?}");
}

#[test]
fn test_escape_ends_vertical_run() {
    let (mut api, mut registry) = editing("abcdef\nab\nabcdefgh");
    api.set_cursor(Position::new(0, 5, 0));

    press(&mut registry, &mut api, "shift+down");
    assert_eq!(caret(&api), (1, 2));
    assert_eq!(api.cursor_state().desired_column, Some(5));

    press(&mut registry, &mut api, "escape");
    assert!(api.selection().is_none());
    press(&mut registry, &mut api, "down");
    assert_eq!(caret(&api), (2, 2));
}

enum Step {
    Key(&'static str),
    Text(&'static str),
}

#[test]
fn test_non_vertical_commands_reset_desired_column() {
    // Each case starts at (2, 7), moves up to (1, 2) with a desired column of 7, runs one
    // non-vertical step and moves up again. A stale desired column would land on (0, 6).
    let cases = [
        ("escape", "shift+up", Step::Key("escape"), (0, 2)),
        ("typing", "up", Step::Text("x"), (0, 3)),
        ("backspace", "up", Step::Key("backspace"), (0, 1)),
        ("delete", "up", Step::Key("delete"), (0, 2)),
        ("home", "up", Step::Key("home"), (0, 0)),
        ("end", "up", Step::Key("end"), (0, 2)),
        ("left", "up", Step::Key("left"), (0, 1)),
        ("enter", "up", Step::Key("enter"), (1, 0)),
        ("select all", "up", Step::Key("ctrl+a"), (1, 2)),
    ];

    for (name, first, step, expected) in cases {
        let (mut api, mut registry) = editing("abcdef\nab\nabcdefgh");
        api.set_cursor(Position::new(2, 7, 0));

        press(&mut registry, &mut api, first);
        assert_eq!(caret(&api), (1, 2), "{name}");
        assert_eq!(api.cursor_state().desired_column, Some(7), "{name}");

        match step {
            Step::Key(chord) => press(&mut registry, &mut api, chord),
            Step::Text(text) => api.type_text(text),
        }
        assert_eq!(api.cursor_state().desired_column, None, "{name}");

        press(&mut registry, &mut api, "up");
        assert_eq!(caret(&api), expected, "{name}");
    }
}
