use hoist_binder::{BindingResolver, ScopeSnapshot};
use hoist_common::{Position, Span};
use hoist_parser::{
    EsParser, GenericKind, NodeData, NodeIndex, ParseError, ParseOptions, ParseResult, ParsedSource,
    RenderHandle, RenderState, SourceParser,
};
use hoist_session::{
    Analysis, Change, Consumer, EditDescriptor, EngineOptions, ReparseError, Session,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// The real parser, plus a log of every text it parsed, an optional gate that
/// holds each parse until the test lets it through, and forced failures.
struct TestParser {
    parsed: Arc<Mutex<Vec<String>>>,
    gate: Option<Mutex<Receiver<()>>>,
    failures: AtomicUsize,
}

impl SourceParser for TestParser {
    fn parse(&self, text: &str, options: &ParseOptions) -> ParseResult<ParsedSource> {
        if let Some(gate) = &self.gate {
            let _ = gate.lock().expect("gate lock").recv();
        }
        self.parsed.lock().expect("log lock").push(text.to_string());
        if self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            return Err(ParseError::new("forced failure", Span::EMPTY, 1001));
        }
        EsParser.parse(text, options)
    }
}

#[derive(Debug, PartialEq)]
enum Event {
    Full {
        version: u64,
        previous: Option<u64>,
    },
    Partial {
        version: u64,
        replaced: Span,
        inserted: Span,
    },
}

#[derive(Default)]
struct Recorder {
    events: Vec<Event>,
    released: Vec<RenderHandle>,
}

impl Consumer for Recorder {
    fn on_analyzed(&mut self, analysis: &Analysis, change: Change<'_>) {
        let event = match change {
            Change::Full { previous } => Event::Full {
                version: analysis.version,
                previous: previous.map(|p| p.version),
            },
            Change::Partial { replaced, inserted } => Event::Partial {
                version: analysis.version,
                replaced: analysis.arena.span(replaced).expect("replaced node kept"),
                inserted: analysis.arena.span(inserted).expect("inserted node"),
            },
        };
        self.events.push(event);
    }

    fn release(&mut self, handle: RenderHandle) {
        self.released.push(handle);
    }
}

struct Harness {
    session: Session<Recorder>,
    parsed: Arc<Mutex<Vec<String>>>,
    gate: Option<Sender<()>>,
}

impl Harness {
    fn start(options: EngineOptions, gated: bool, failures: usize) -> Harness {
        let parsed = Arc::new(Mutex::new(Vec::new()));
        let (gate, permits) = if gated {
            let (tx, rx) = mpsc::channel();
            (Some(tx), Some(Mutex::new(rx)))
        } else {
            (None, None)
        };
        let parser = TestParser {
            parsed: Arc::clone(&parsed),
            gate: permits,
            failures: AtomicUsize::new(failures),
        };
        let session =
            Session::new(parser, Recorder::default(), options).expect("worker starts");
        Harness {
            session,
            parsed,
            gate,
        }
    }

    fn new() -> Harness {
        Harness::start(EngineOptions::default(), false, 0)
    }

    fn gated() -> Harness {
        Harness::start(EngineOptions::default(), true, 0)
    }

    fn open(&mut self, text: &str) {
        self.session.open(text).expect("dispatch");
    }

    fn edit(&mut self, edit: EditDescriptor) {
        let text = edit.apply(self.session.text()).expect("edit applies");
        self.session.on_edit(text, &edit).expect("dispatch");
    }

    fn permit(&self, parses: usize) {
        let gate = self.gate.as_ref().expect("gated harness");
        for _ in 0..parses {
            let _ = gate.send(());
        }
    }

    fn settle(&mut self) {
        let settled = self.session.wait(SETTLE_TIMEOUT).expect("worker alive");
        assert!(settled, "session did not settle");
    }

    fn wait_until(&mut self, ready: impl Fn(&Session<Recorder>) -> bool) {
        let deadline = Instant::now() + SETTLE_TIMEOUT;
        while !ready(&self.session) {
            assert!(Instant::now() < deadline, "session never reached the expected state");
            self.session.poll().expect("worker alive");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn last_parsed(&self) -> String {
        self.parsed
            .lock()
            .expect("log lock")
            .last()
            .cloned()
            .expect("something was parsed")
    }

    fn analysis(&self) -> &Analysis {
        self.session.analysis().expect("analysis available")
    }

    fn events(&self) -> &[Event] {
        &self.session.consumer().events
    }

    /// The session's scope tree matches a from-scratch analysis of its text.
    fn assert_matches_fresh(&self) {
        let analysis = self.analysis();
        assert_eq!(analysis.text, self.session.text());
        let parsed = EsParser
            .parse(&analysis.text, &ParseOptions::default())
            .expect("current text parses");
        let scopes = BindingResolver::resolve_program(&parsed.arena, parsed.root);
        assert_eq!(
            analysis.snapshot(),
            ScopeSnapshot::capture(&scopes, &parsed.arena),
            "incremental analysis diverged for {:?}",
            analysis.text
        );
    }
}

fn offset_after(text: &str, needle: &str) -> u32 {
    let at = text.find(needle).unwrap_or_else(|| panic!("{needle:?} not in {text:?}"));
    (at + needle.len()) as u32
}

fn statements(analysis: &Analysis) -> Vec<NodeIndex> {
    analysis.arena.children(analysis.root).to_vec()
}

#[test]
fn test_open_runs_a_full_analysis() {
    let source = "var a = 1;\nfunction f(x) { return x + a; }\n";
    let mut h = Harness::new();
    h.open(source);
    h.settle();

    assert_eq!(
        h.events(),
        &[Event::Full {
            version: 1,
            previous: None
        }]
    );
    assert_eq!(h.session.version(), 1);
    assert_eq!(h.session.stats().full_reparses, 1);
    assert_eq!(h.last_parsed(), source);
    h.assert_matches_fresh();
}

#[test]
fn test_edit_inside_declaration_reparses_only_that_function() {
    let source = "var a = 1;\nfunction f(x) {\n  return x;\n}\nvar b = f(a);\n";
    let mut h = Harness::new();
    h.open(source);
    h.settle();

    let before = statements(h.analysis());
    let first_span = h.analysis().arena.span(before[0]);
    let f_span = Span::new(
        source.find("function").expect("function") as u32,
        offset_after(source, "}"),
    );

    h.edit(EditDescriptor::insert(offset_after(source, "return x"), " + a"));
    h.settle();

    assert_eq!(h.last_parsed(), "function f(x) {\n  return x + a;\n}");
    let stats = h.session.stats();
    assert_eq!((stats.full_reparses, stats.partial_reparses), (1, 1));
    assert_eq!(
        h.events()[1],
        Event::Partial {
            version: 2,
            replaced: f_span,
            inserted: Span::new(f_span.start, f_span.end + 4),
        }
    );

    let after = statements(h.analysis());
    assert_eq!(after[0], before[0]);
    assert_eq!(h.analysis().arena.span(after[0]), first_span);
    assert_ne!(after[1], before[1]);
    assert_eq!(after[2], before[2]);

    let fresh = EsParser
        .parse(h.session.text(), &ParseOptions::default())
        .expect("parses");
    let fresh_statements = fresh.statements();
    for (kept, expected) in after.iter().zip(fresh_statements) {
        assert_eq!(
            h.analysis().arena.span(*kept),
            fresh.arena.span(*expected)
        );
    }
    h.assert_matches_fresh();
}

#[test]
fn test_function_expression_is_reparsed_in_parentheses() {
    let source = "var g = function (y) { return y; };\ng(1);\n";
    let mut h = Harness::new();
    h.open(source);
    h.settle();

    h.edit(EditDescriptor::insert(offset_after(source, "return y"), " * 2"));
    h.settle();

    assert_eq!(h.last_parsed(), "(function (y) { return y * 2; })");
    assert_eq!(h.session.stats().partial_reparses, 1);
    h.assert_matches_fresh();
}

#[test]
fn test_innermost_function_is_reparsed() {
    let source = "function outer() {\n  function inner(a) { return a; }\n  return inner;\n}\n";
    let mut h = Harness::new();
    h.open(source);
    h.settle();

    h.edit(EditDescriptor::insert(offset_after(source, "return a"), "+1"));
    h.settle();

    assert_eq!(h.last_parsed(), "function inner(a) { return a+1; }");
    assert_eq!(h.session.stats().partial_reparses, 1);
    h.assert_matches_fresh();
}

#[test]
fn test_edit_outside_functions_reparses_everything() {
    let source = "var a = 1;\nfunction f() {}\n";
    let mut h = Harness::new();
    h.open(source);
    h.settle();

    h.edit(EditDescriptor::new(8, "2", "1"));
    h.settle();

    let stats = h.session.stats();
    assert_eq!((stats.full_reparses, stats.partial_reparses), (2, 0));
    assert_eq!(h.last_parsed(), "var a = 2;\nfunction f() {}\n");
    assert_eq!(
        h.events()[1],
        Event::Full {
            version: 2,
            previous: Some(1)
        }
    );
    h.assert_matches_fresh();
}

#[test]
fn test_chained_edits_must_all_land_in_the_function() {
    let source = "function f(x) {\n  return x;\n}\nvar y = 1;\n";
    let mut h = Harness::new();
    h.open(source);
    h.settle();

    let inside = offset_after(source, "return x");
    h.edit(EditDescriptor::insert(inside, " + 1").then(EditDescriptor::insert(inside, " - 1")));
    h.settle();
    assert_eq!(h.session.stats().partial_reparses, 1);
    h.assert_matches_fresh();

    let text = h.session.text().to_string();
    let inside = offset_after(&text, "return x");
    let outside = offset_after(&text, "var y = ");
    h.edit(
        EditDescriptor::insert(inside, " * 3")
            .then(EditDescriptor::new(outside + 4, "2", "1")),
    );
    h.settle();
    let stats = h.session.stats();
    assert_eq!((stats.full_reparses, stats.partial_reparses), (2, 1));
    h.assert_matches_fresh();
}

#[test]
fn test_moved_nodes_release_their_render_handles() {
    let source = "var a = 1;\nfunction f(x) { return x; }\nvar b = f(a);\n";
    let mut h = Harness::new();
    h.open(source);
    h.settle();

    let first = {
        let analysis = h.session.analysis_mut().expect("analysis");
        let root = analysis.root;
        let stmts = analysis.arena.children(root).to_vec();
        for (handle, idx) in [(1, root), (2, stmts[0]), (3, stmts[1]), (4, stmts[2])] {
            analysis.arena.get_mut(idx).expect("node").render = RenderState {
                rendered: true,
                handle: Some(RenderHandle(handle)),
            };
        }
        stmts[0]
    };

    h.edit(EditDescriptor::insert(offset_after(source, "return x"), " + 1"));
    h.settle();

    let mut released: Vec<u64> = h
        .session
        .consumer()
        .released
        .iter()
        .map(|handle| handle.0)
        .collect();
    released.sort_unstable();
    assert_eq!(released, vec![1, 3, 4]);

    let kept = h.analysis().arena.get(first).expect("first statement");
    assert!(kept.render.rendered);
    assert_eq!(kept.render.handle, Some(RenderHandle(2)));
}

#[test]
fn test_full_reparse_releases_every_handle() {
    let source = "var a = 1;\nvar b = a;\n";
    let mut h = Harness::new();
    h.open(source);
    h.settle();

    {
        let analysis = h.session.analysis_mut().expect("analysis");
        for (handle, node) in analysis.arena.nodes.iter_mut().enumerate() {
            node.render.handle = Some(RenderHandle(handle as u64));
        }
    }
    let node_count = h.analysis().arena.len();

    h.edit(EditDescriptor::new(8, "2", "1"));
    h.settle();

    assert_eq!(h.session.consumer().released.len(), node_count);
}

#[test]
fn test_superseded_results_are_never_delivered() {
    let mut h = Harness::gated();
    h.open("var a = 1;\n");
    h.edit(EditDescriptor::new(8, "2", "1"));
    h.permit(2);
    h.settle();

    assert_eq!(
        h.events(),
        &[Event::Full {
            version: 1,
            previous: None
        }]
    );
    assert_eq!(h.analysis().text, "var a = 2;\n");
    let stats = h.session.stats();
    assert_eq!(stats.superseded, 1);
    assert_eq!(stats.full_reparses, 1);
    h.assert_matches_fresh();
}

#[test]
fn test_edits_to_function_being_reparsed_are_coalesced() {
    let source = "function f(x) {\n  return x;\n}\nf(1);\n";
    let mut h = Harness::gated();
    h.open(source);
    h.permit(1);
    h.settle();

    h.edit(EditDescriptor::insert(offset_after(source, "return x"), " + 1"));
    let text = h.session.text().to_string();
    h.edit(EditDescriptor::insert(offset_after(&text, "return x + 1"), " + 2"));
    h.permit(2);
    h.settle();

    assert_eq!(h.last_parsed(), "function f(x) {\n  return x + 1 + 2;\n}");
    let stats = h.session.stats();
    assert_eq!((stats.full_reparses, stats.partial_reparses), (1, 1));
    assert_eq!(stats.superseded, 1);
    assert_eq!(h.events().len(), 2);
    h.assert_matches_fresh();
}

#[test]
fn test_edit_elsewhere_during_partial_reparse_reparses_everything() {
    let source = "function f(x) {\n  return x;\n}\nvar y = 1;\n";
    let mut h = Harness::gated();
    h.open(source);
    h.permit(1);
    h.settle();

    h.edit(EditDescriptor::insert(offset_after(source, "return x"), " + 1"));
    let text = h.session.text().to_string();
    h.edit(EditDescriptor::new(offset_after(&text, "var y = "), "2", "1"));
    h.permit(2);
    h.settle();

    let stats = h.session.stats();
    assert_eq!((stats.full_reparses, stats.partial_reparses), (2, 0));
    assert_eq!(stats.superseded, 1);
    h.assert_matches_fresh();
}

#[test]
fn test_parse_errors_recover_through_full_reparses() {
    let options = EngineOptions {
        recovery_delay_ms: 60_000,
        ..EngineOptions::default()
    };
    let source = "function f() {\n  return 1;\n}\nf();\n";
    let mut h = Harness::start(options, false, 0);
    h.open(source);
    h.settle();

    h.edit(EditDescriptor::insert(offset_after(source, "return 1"), "("));
    h.wait_until(|s| s.recovery_pending());
    assert_eq!(h.session.stats().parse_failures, 1);
    assert!(matches!(
        h.session.last_error(),
        Some(ReparseError::Parse(_))
    ));
    assert_eq!(h.analysis().text, source);
    assert_eq!(h.analysis().version, 1);

    let text = h.session.text().to_string();
    h.edit(EditDescriptor::insert(offset_after(&text, "return 1("), "+"));
    h.wait_until(|s| s.recovery_pending() && s.stats().parse_failures == 2);
    assert_eq!(h.last_parsed(), h.session.text());
    assert_eq!(h.session.stats().full_reparses, 1);

    let text = h.session.text().to_string();
    h.edit(EditDescriptor::delete(offset_after(&text, "return 1"), "(+"));
    h.settle();

    assert_eq!(h.session.text(), source);
    assert!(!h.session.recovery_pending());
    assert!(h.session.last_error().is_none());
    let stats = h.session.stats();
    assert_eq!((stats.full_reparses, stats.partial_reparses), (2, 0));
    assert_eq!(h.session.version(), 2);
    h.assert_matches_fresh();
}

#[test]
fn test_recovery_timer_reparses_current_text() {
    let options = EngineOptions {
        recovery_delay_ms: 60_000,
        ..EngineOptions::default()
    };
    let mut h = Harness::start(options, false, 1);
    h.open("var a = 1;\n");
    h.wait_until(|s| s.recovery_pending());
    assert!(h.session.analysis().is_none());

    h.session
        .poll_at(Instant::now() + Duration::from_secs(120))
        .expect("worker alive");
    assert!(!h.session.recovery_pending());
    h.settle();

    let stats = h.session.stats();
    assert_eq!(stats.recoveries, 1);
    assert_eq!(stats.parse_failures, 1);
    assert_eq!(stats.full_reparses, 1);
    h.assert_matches_fresh();
}

#[test]
fn test_short_recovery_delay_fires_while_waiting() {
    let options = EngineOptions {
        recovery_delay_ms: 10,
        ..EngineOptions::default()
    };
    let mut h = Harness::start(options, false, 1);
    h.open("function f() { return 1; }\n");
    h.settle();

    assert_eq!(h.session.stats().recoveries, 1);
    assert_eq!(h.session.version(), 1);
    h.assert_matches_fresh();
}

#[test]
fn test_slice_that_does_not_fit_falls_back_to_full_reparse() {
    let source = "function f() { a; }\nb;\n";
    let mut h = Harness::new();
    h.open(source);
    h.settle();

    h.edit(EditDescriptor::insert(offset_after(source, "a;"), " } function g() {"));
    h.settle();

    let stats = h.session.stats();
    assert_eq!(stats.structural_mismatches, 1);
    assert_eq!((stats.full_reparses, stats.partial_reparses), (2, 0));
    h.assert_matches_fresh();
}

#[test]
fn test_removal_past_function_end_reparses_everything() {
    let source = "function f() { a; }\nfunction g() { b; }\n";
    let mut h = Harness::new();
    h.open(source);
    h.settle();

    let start = source.find("a;").expect("body") as u32;
    h.edit(EditDescriptor::delete(start, "a; }\nfunction g() { "));
    h.settle();

    let stats = h.session.stats();
    assert_eq!((stats.full_reparses, stats.partial_reparses), (2, 0));
    assert_eq!(stats.structural_mismatches, 0);
    assert_eq!(h.last_parsed(), "function f() { b; }\n");
    h.assert_matches_fresh();
}

#[test]
fn test_renaming_a_declaration_rebinds_callers() {
    let source = "function f() { return 1; }\nf();\n";
    let mut h = Harness::new();
    h.open(source);
    h.settle();

    h.edit(EditDescriptor::new(9, "g", "f"));
    h.settle();

    assert_eq!(h.last_parsed(), "function g() { return 1; }");
    assert_eq!(h.session.stats().partial_reparses, 1);
    let analysis = h.analysis();
    let global = analysis.scopes.global();
    assert_eq!(analysis.scopes.declared_names(global), vec!["g"]);
    h.assert_matches_fresh();
}

#[test]
fn test_oversized_arena_forces_full_reparse() {
    let options = EngineOptions {
        incremental_node_multiplier: 0,
        incremental_min_node_budget: 0,
        ..EngineOptions::default()
    };
    let source = "function f(x) { return x; }\n";
    let mut h = Harness::start(options, false, 0);
    h.open(source);
    h.settle();

    h.edit(EditDescriptor::insert(offset_after(source, "return x"), " + 1"));
    h.settle();

    let stats = h.session.stats();
    assert_eq!((stats.full_reparses, stats.partial_reparses), (2, 0));
}

#[test]
fn test_versions_strictly_increase() {
    let source = "var n = 0;\nfunction f(x) {\n  return x;\n}\n";
    let mut h = Harness::new();
    h.open(source);
    h.settle();

    for round in 0..5 {
        let text = h.session.text().to_string();
        let edit = if round % 2 == 0 {
            EditDescriptor::insert(offset_after(&text, "return x"), " + x")
        } else {
            EditDescriptor::insert(offset_after(&text, "var n = 0"), "0")
        };
        h.edit(edit);
        h.settle();
        h.assert_matches_fresh();
    }

    let versions: Vec<u64> = h
        .events()
        .iter()
        .map(|event| match event {
            Event::Full { version, .. } | Event::Partial { version, .. } => *version,
        })
        .collect();
    assert_eq!(versions, (1..=6).collect::<Vec<_>>());
    assert_eq!(h.session.version(), 6);
}

#[test]
fn test_analysis_queries() {
    let source = "var a = 1;\nfunction f() {\n  return a;\n}\n";
    let mut h = Harness::new();
    h.open(source);
    h.settle();
    let analysis = h.analysis();

    let reference = analysis
        .arena
        .subtree(analysis.root)
        .into_iter()
        .filter(|&idx| analysis.arena.identifier_name(idx) == Some("a"))
        .last()
        .expect("reference to a");
    assert_eq!(analysis.level_of(reference), Some(0));
    assert!(analysis.occurrences_of(reference).contains(&reference));

    let line_start = analysis
        .offset_at(Position::new(2, 0))
        .expect("line 2 exists");
    let line_end = analysis
        .offset_at(Position::new(2, 11))
        .expect("line 2 end");
    let mut kinds = Vec::new();
    analysis.visit_range(line_start, line_end, |_, node| kinds.extend(node.generic_kind()));
    assert!(kinds.contains(&GenericKind::ReturnStatement), "{kinds:?}");
    assert!(!kinds.contains(&GenericKind::VariableDeclaration), "{kinds:?}");

    let functions = analysis
        .arena
        .subtree(analysis.root)
        .into_iter()
        .filter(|&idx| {
            matches!(
                analysis.arena.get(idx).map(|n| &n.data),
                Some(NodeData::FunctionDeclaration(_))
            )
        })
        .count();
    assert_eq!(functions, 1);
}
