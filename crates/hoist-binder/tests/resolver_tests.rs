use hoist_binder::{BindingResolver, ScopeId, ScopeSnapshot, ScopeTree, THIS};
use hoist_parser::{EsParser, NodeData, NodeIndex, ParseOptions, ParsedSource, SourceParser};

fn analyze(source: &str) -> (ParsedSource, ScopeTree) {
    let parsed = EsParser
        .parse(source, &ParseOptions::default())
        .unwrap_or_else(|err| panic!("failed to parse {source:?}: {err}"));
    let scopes = BindingResolver::resolve_program(&parsed.arena, parsed.root);
    (parsed, scopes)
}

/// Identifier nodes with the given name, in source order.
fn identifiers(parsed: &ParsedSource, name: &str) -> Vec<NodeIndex> {
    parsed
        .arena
        .subtree(parsed.root)
        .into_iter()
        .filter(|&idx| parsed.arena.identifier_name(idx) == Some(name))
        .collect()
}

/// The scope owned by the function declared or named `name`.
fn function_scope(parsed: &ParsedSource, scopes: &ScopeTree, name: &str) -> ScopeId {
    parsed
        .arena
        .subtree(parsed.root)
        .into_iter()
        .find(|&idx| {
            parsed
                .arena
                .function_data(idx)
                .is_some_and(|func| parsed.arena.identifier_name(func.id) == Some(name))
        })
        .and_then(|idx| scopes.scope_of_function(idx))
        .unwrap_or_else(|| panic!("no function named {name}"))
}

#[test]
fn test_every_identifier_and_this_resolves() {
    let (parsed, scopes) = analyze(
        "var a = 1;\n\
         function f(p, q) { var r = p + q + undeclared; return this.x + arguments.length; }\n\
         (function named(z) { named(z - 1); })(a);\n\
         try { f(); } catch (e) { log(e); }",
    );

    for idx in parsed.arena.subtree(parsed.root) {
        let node = parsed.arena.get(idx).expect("node");
        if matches!(
            node.data,
            NodeData::Identifier { .. } | NodeData::ThisExpression
        ) {
            assert!(
                scopes.resolved_scope(idx).is_some(),
                "{:?} at {:?} did not resolve",
                node.data,
                node.span
            );
        }
    }
}

#[test]
fn test_named_function_expression_is_only_visible_inside() {
    let (parsed, scopes) = analyze("var g = function h() { return h; };\nh;");
    let h_scope = function_scope(&parsed, &scopes, "h");
    let occurrences = identifiers(&parsed, "h");

    assert_eq!(occurrences.len(), 3);
    assert_eq!(scopes.resolved_scope(occurrences[1]), Some(h_scope));
    assert_eq!(scopes.resolved_scope(occurrences[2]), Some(ScopeId::GLOBAL));

    let outer = scopes.binding(ScopeId::GLOBAL, "h").expect("implicit global");
    assert!(outer.declarations.is_empty());
    assert_eq!(outer.references, vec![occurrences[2]]);
    assert!(scopes.binding(ScopeId::GLOBAL, "g").is_some());
}

#[test]
fn test_function_declaration_binds_in_enclosing_scope() {
    let (parsed, scopes) = analyze("function outer() { function inner() {} inner(); }\nouter();");
    let outer_scope = function_scope(&parsed, &scopes, "outer");
    let inner_scope = function_scope(&parsed, &scopes, "inner");

    let inner = scopes.binding(outer_scope, "inner").expect("inner binding");
    assert_eq!(inner.declarations.len(), 1);
    assert_eq!(scopes.parent(inner_scope), Some(outer_scope));
    assert!(scopes.binding(inner_scope, "inner").is_none());

    let call = *identifiers(&parsed, "inner").last().expect("call");
    assert_eq!(scopes.resolved_scope(call), Some(outer_scope));
    let outer_call = *identifiers(&parsed, "outer").last().expect("call");
    assert_eq!(scopes.resolved_scope(outer_call), Some(ScopeId::GLOBAL));
}

#[test]
fn test_var_in_block_hoists_to_function_scope() {
    let (parsed, scopes) = analyze(
        "function f() { if (c) { for (var i = 0; i < 2; i++) { var v = i; } } return v; }",
    );
    let f_scope = function_scope(&parsed, &scopes, "f");

    assert_eq!(scopes.declared_names(f_scope), vec!["i", "v"]);
    assert!(scopes.binding(ScopeId::GLOBAL, "v").is_none());
    let use_of_v = *identifiers(&parsed, "v").last().expect("return v");
    assert_eq!(scopes.resolved_scope(use_of_v), Some(f_scope));
}

#[test]
fn test_object_key_is_not_a_reference() {
    let (parsed, scopes) = analyze("var o = {x: x};");
    let x = scopes.binding(ScopeId::GLOBAL, "x").expect("value reference");

    assert!(x.declarations.is_empty());
    assert_eq!(x.references, identifiers(&parsed, "x"));
    assert_eq!(x.references.len(), 1);
}

#[test]
fn test_member_property_only_referenced_when_computed() {
    let (_, scopes) = analyze("a.b; a[c];");

    assert_eq!(
        scopes
            .binding(ScopeId::GLOBAL, "a")
            .map(|b| b.references.len()),
        Some(2)
    );
    assert!(scopes.binding(ScopeId::GLOBAL, "c").is_some());
    assert!(scopes.binding(ScopeId::GLOBAL, "b").is_none());
}

#[test]
fn test_parameter_and_var_share_one_record() {
    let (parsed, scopes) = analyze("function f(p) { var p = 2; return p; }");
    let f_scope = function_scope(&parsed, &scopes, "f");
    let p = scopes.binding(f_scope, "p").expect("p");
    let occurrences = identifiers(&parsed, "p");

    assert_eq!(p.declarations.as_slice(), &occurrences[..2]);
    // The parameter is resolved without being counted as a reference.
    assert_eq!(p.references, occurrences[1..].to_vec());
    assert_eq!(scopes.resolved_scope(occurrences[0]), Some(f_scope));
}

#[test]
fn test_this_binds_in_nearest_function_scope() {
    let (parsed, scopes) = analyze("this;\nfunction f() { return this; }");
    let f_scope = function_scope(&parsed, &scopes, "f");

    let global_this = scopes.binding(ScopeId::GLOBAL, THIS).expect("global this");
    assert_eq!(global_this.declarations.as_slice(), &[parsed.root]);
    assert_eq!(global_this.references.len(), 1);

    let f_this = scopes.binding(f_scope, THIS).expect("function this");
    assert_eq!(f_this.references.len(), 1);
    assert!(scopes.declared_names(f_scope).is_empty());
}

#[test]
fn test_arguments_is_declared_per_function() {
    let (parsed, scopes) = analyze("function f() { return arguments; }\narguments;");
    let f_scope = function_scope(&parsed, &scopes, "f");
    let uses = identifiers(&parsed, "arguments");

    assert_eq!(scopes.resolved_scope(uses[0]), Some(f_scope));
    assert_eq!(scopes.resolved_scope(uses[1]), Some(ScopeId::GLOBAL));
    assert!(
        scopes
            .binding(ScopeId::GLOBAL, "arguments")
            .is_some_and(|b| b.declarations.is_empty())
    );
}

#[test]
fn test_shadowing_uses_nearest_enclosing_scope() {
    let (parsed, scopes) =
        analyze("var x;\nfunction f(x) { return x; }\nfunction g() { return x; }");
    let f_scope = function_scope(&parsed, &scopes, "f");
    let uses = identifiers(&parsed, "x");

    assert_eq!(uses.len(), 4);
    assert_eq!(scopes.resolved_scope(uses[2]), Some(f_scope));
    assert_eq!(scopes.resolved_scope(uses[3]), Some(ScopeId::GLOBAL));
}

#[test]
fn test_scope_levels() {
    let (parsed, scopes) = analyze("function a() { function b() { var y; } }");
    let a = function_scope(&parsed, &scopes, "a");
    let b = function_scope(&parsed, &scopes, "b");

    assert_eq!(scopes.level(ScopeId::GLOBAL), 0);
    assert_eq!(scopes.level(a), 1);
    assert_eq!(scopes.level(b), 2);
    assert_eq!(scopes.declared_names(a), vec!["b"]);
    assert_eq!(scopes.declared_names(b), vec!["y"]);
}

#[test]
fn test_subtree_re_resolution_matches_full_resolution() {
    let source = "var shared = 1;\n\
                  function f(a) { var local = a + shared; helper(local); return this; }\n\
                  function g() { return f(shared); }";
    let (parsed, mut scopes) = analyze(source);
    let expected = ScopeSnapshot::capture(&scopes, &parsed.arena);

    let f_node = parsed.statements()[1];
    let retired = scopes.retract_subtree(&parsed.arena, f_node);
    assert_eq!(retired, 1);
    assert!(scopes.resolved_scope(identifiers(&parsed, "local")[1]).is_none());

    BindingResolver::resolve_subtree(&parsed.arena, &mut scopes, f_node, ScopeId::GLOBAL);

    assert_eq!(ScopeSnapshot::capture(&scopes, &parsed.arena), expected);
}
