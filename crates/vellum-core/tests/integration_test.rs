use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use serde_json::json;
use vellum_core::{
    CoreEditing, Decoration, DecorationChange, EditorApi, EditorEvent, EditorSession,
    EditorSettings, EventKind, KeyChord, Position, TextRange,
};

fn record(api: &mut EditorApi) -> Rc<RefCell<Vec<EditorEvent>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for kind in EventKind::ALL {
        let sink = Rc::clone(&log);
        api.on(kind, move |event| sink.borrow_mut().push(event.clone()));
    }
    log
}

#[test]
fn test_end_to_end_insert_at_caret() {
    let mut api = EditorApi::scratch("foo\nbar\nbaz");
    api.set_cursor_offset(5);
    assert_eq!(api.cursor(), Position::new(1, 1, 5));

    let log = record(&mut api);
    api.type_text("X");

    assert_eq!(api.content(), "foo\nbXar\nbaz");
    assert_eq!(api.cursor().offset, 6);
    let events = log.borrow();
    assert!(matches!(
        &events[0],
        EditorEvent::ContentChange { version: 1, edit: Some(edit), .. } if edit.inserted == "X"
    ));
    assert_eq!(
        events[1],
        EditorEvent::CursorChange {
            position: Position::new(1, 2, 6)
        }
    );
    assert_eq!(events.len(), 2);
}

#[test]
fn test_replace_selection_then_delete_across_decoration() {
    let mut api = EditorApi::scratch("alpha beta gamma");
    let beta = TextRange::new(api.position_at(0, 6), api.position_at(0, 10));
    let id = api.add_decoration(Decoration::inline(beta, "word"));
    let log = record(&mut api);

    api.set_selection(TextRange::new(api.position_at(0, 5), api.position_at(0, 11)));
    api.type_text("-");
    assert_eq!(api.content(), "alpha-gamma");
    assert!(api.decoration(id).is_none());
    assert!(log.borrow().contains(&EditorEvent::DecorationChange(
        DecorationChange::Removed(id)
    )));
}

#[test]
fn test_settings_file_round_trip() {
    let settings = EditorSettings::from_json_str(
        r#"{ "tab_size": 2, "insert_spaces": true, "viewport": { "min_overscan": 8 } }"#,
    )
    .unwrap();
    assert_eq!(settings.indent_unit(), "  ");
    assert_eq!(settings.overscan_policy().min_overscan, 8);

    let mut api = EditorApi::new("doc.txt", "", settings);
    let changed = api
        .update_settings(&json!({ "viewport": { "min_overscan": null }, "theme": "paper" }))
        .unwrap();
    assert_eq!(changed, vec!["theme", "viewport.min_overscan"]);
    assert_eq!(api.setting("viewport.min_overscan"), Some(json!(5)));
    assert!(api.update_settings(&json!({ "no_such_key": 1 })).is_err());
}

#[test]
fn test_session_typing_workflow() {
    let text = (1..=200).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
    let api = EditorApi::new("notes.txt", &text, EditorSettings::default());
    let mut session = EditorSession::new(api, 200.0, 600.0);
    session.load_extension(Box::new(CoreEditing)).unwrap();

    session.handle_key(&KeyChord::parse("ctrl+end").unwrap()).unwrap();
    assert_eq!(session.api().cursor().line, 199);
    let frame = session.render_frame();
    assert!(frame.visible.visible_lines().contains(&199));
    assert!(frame.lines.len() < 30);
    assert!(frame.caret.is_some());

    session.handle_key(&KeyChord::parse("enter").unwrap()).unwrap();
    session.handle_text_input("done");
    assert_eq!(session.api().line(200), Some("done"));
    assert_eq!(session.viewport().line_count(), 201);

    session.handle_key(&KeyChord::parse("ctrl+home").unwrap()).unwrap();
    assert_eq!(session.viewport().scroll_top(), 0.0);
}
