use hoist_binder::{BindingResolver, ScopeId, ScopeSnapshot};
use hoist_common::Span;
use hoist_parser::{EsParser, ParseOptions, SourceParser};

#[test]
fn snapshot_orders_scopes_and_bindings() {
    let source = "function b() {}\nfunction a() { var z, y; }";
    let parsed = EsParser
        .parse(source, &ParseOptions::default())
        .expect("parse");
    let scopes = BindingResolver::resolve_program(&parsed.arena, parsed.root);
    let snapshot = ScopeSnapshot::capture(&scopes, &parsed.arena);

    assert_eq!(snapshot.span, Span::new(0, source.len() as u32));
    assert_eq!(snapshot.scope_count(), 3);
    let names: Vec<&str> = snapshot.bindings.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);

    let second = &snapshot.children[1];
    assert_eq!(second.level, 1);
    let inner: Vec<&str> = second.bindings.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(inner, vec!["arguments", "y", "z"]);
}

#[test]
fn snapshot_round_trips_through_json() {
    let parsed = EsParser
        .parse("var x = function () { return x; };", &ParseOptions::default())
        .expect("parse");
    let scopes = BindingResolver::resolve_program(&parsed.arena, parsed.root);
    let snapshot = ScopeSnapshot::capture(&scopes, &parsed.arena);

    let json = serde_json::to_string(&snapshot).expect("serialize");
    let back: ScopeSnapshot = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, snapshot);
    assert!(json.contains("\"references\""));
}

#[test]
fn snapshot_text_lists_bindings_per_scope() {
    let parsed = EsParser
        .parse("function f(a) { a; }", &ParseOptions::default())
        .expect("parse");
    let scopes = BindingResolver::resolve_program(&parsed.arena, parsed.root);
    let text = ScopeSnapshot::capture(&scopes, &parsed.arena).to_string();

    assert_eq!(
        text,
        "scope 0..20 (level 0)\n\
         \x20 f: 1 decl, 1 ref\n\
         \x20 scope 0..20 (level 1)\n\
         \x20   a: 1 decl, 1 ref\n\
         \x20   arguments: 1 decl, 0 ref\n"
    );
}

#[test]
fn binding_of_returns_all_sibling_occurrences() {
    let parsed = EsParser
        .parse("var n = 1; n++; log(n);", &ParseOptions::default())
        .expect("parse");
    let scopes = BindingResolver::resolve_program(&parsed.arena, parsed.root);
    let last_n = parsed
        .arena
        .subtree(parsed.root)
        .into_iter()
        .filter(|&idx| parsed.arena.identifier_name(idx) == Some("n"))
        .last()
        .expect("n");

    let binding = scopes.binding_of(&parsed.arena, last_n).expect("binding");
    assert_eq!(binding.references.len(), 3);
    assert_eq!(binding.declarations.len(), 1);
}

#[test]
fn retracting_nested_functions_retires_every_owned_scope() {
    let parsed = EsParser
        .parse(
            "function outer() { function inner() { free(); } return inner; }",
            &ParseOptions::default(),
        )
        .expect("parse");
    let mut scopes = BindingResolver::resolve_program(&parsed.arena, parsed.root);
    let outer = parsed.statements()[0];

    assert_eq!(scopes.retract_subtree(&parsed.arena, outer), 2);
    assert_eq!(scopes.live_scopes().count(), 1);
    assert!(scopes.scope_of_function(outer).is_none());

    // Names stay, occurrences go.
    let free = scopes.binding(ScopeId::GLOBAL, "free").expect("name kept");
    assert!(free.is_empty());
    let snapshot = ScopeSnapshot::capture(&scopes, &parsed.arena);
    assert!(snapshot.bindings.is_empty());
    assert!(snapshot.children.is_empty());
}
