use hoist_common::{LineMap, Position};
use hoist_session::{EditDescriptor, EditError};

#[test]
fn test_net_delta_sums_the_chain() {
    let edit = EditDescriptor::insert(0, "abc")
        .then(EditDescriptor::delete(1, "b"))
        .then(EditDescriptor::new(0, "xyz", "a"));

    assert_eq!(edit.iter().count(), 3);
    assert_eq!(edit.delta(), 3);
    assert_eq!(edit.net_delta(), 3 - 1 + 2);
}

#[test]
fn test_chained_edits_apply_in_order() {
    // Each link is expressed against the text its predecessor produced.
    let edit = EditDescriptor::insert(4, "x")
        .then(EditDescriptor::new(0, "let", "var"))
        .then(EditDescriptor::delete(6, " = 1"));

    let text = edit.apply("var a = 1;").expect("edits apply");

    assert_eq!(text, "let xa;");
}

#[test]
fn test_edit_deserializes_from_json() {
    let edit: EditDescriptor = serde_json::from_str(
        r#"{ "start": 4, "inserted": "b", "next": { "start": 0, "removed": "v" } }"#,
    )
    .expect("valid edit");

    assert_eq!(edit.start, 4);
    assert_eq!(edit.removed, "");
    let next = edit.next.as_deref().expect("chained edit");
    assert_eq!(next.removed, "v");
    assert_eq!(next.inserted, "");
    assert_eq!(edit.apply("var a;").expect("applies"), "ar ba;");
}

#[test]
fn test_edit_from_cursor_position() {
    let text = "var a;\nfunction f() {}\n";
    let map = LineMap::build(text);

    let edit = EditDescriptor::at_position(&map, text, Position::new(1, 9), "g", "f")
        .expect("position inside the text");

    assert_eq!(edit.start, 16);
    assert_eq!(edit.apply(text).expect("applies"), "var a;\nfunction g() {}\n");
    assert!(EditDescriptor::at_position(&map, text, Position::new(9, 0), "", "").is_none());
}

#[test]
fn test_apply_rejects_inconsistent_edits() {
    assert_eq!(
        EditDescriptor::insert(10, "x").apply("short"),
        Err(EditError::OutOfBounds { start: 10, len: 5 })
    );
    assert_eq!(
        EditDescriptor::delete(0, "var").apply("let a;"),
        Err(EditError::RemovedMismatch { start: 0 })
    );
}
