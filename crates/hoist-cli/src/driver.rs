//! Subcommand implementations. Each returns the text to print on stdout.

use crate::args::{AnalyzeArgs, OutputFormat, ReplayArgs};
use anyhow::{Context, Result, bail};
use hoist_binder::{BindingResolver, ScopeSnapshot};
use hoist_common::{Diagnostic, LineMap};
use hoist_parser::{EsParser, ParseOptions, SourceParser};
use hoist_session::{EditDescriptor, EngineOptions, Session, SessionStats};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Upper bound on how long replay waits for a single parse.
const PARSE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct AnalyzeReport<'a> {
    scopes: &'a ScopeSnapshot,
    diagnostics: &'a [Diagnostic],
}

#[derive(Serialize)]
struct ReplayReport<'a> {
    scopes: &'a ScopeSnapshot,
    version: u64,
    stats: SessionStats,
}

pub fn analyze(args: &AnalyzeArgs) -> Result<String> {
    let text = read_source(&args.file)?;
    let options = ParseOptions {
        tolerant: args.tolerant,
        ..ParseOptions::default()
    };
    let parsed = EsParser
        .parse(&text, &options)
        .with_context(|| format!("failed to parse {}", args.file.display()))?;
    let scopes = BindingResolver::resolve_program(&parsed.arena, parsed.root);
    let snapshot = ScopeSnapshot::capture(&scopes, &parsed.arena);
    info!(
        nodes = parsed.arena.len(),
        scopes = snapshot.scope_count(),
        diagnostics = parsed.diagnostics.len(),
        "analyzed {}",
        args.file.display()
    );

    match args.format {
        OutputFormat::Json => {
            let report = AnalyzeReport {
                scopes: &snapshot,
                diagnostics: &parsed.diagnostics,
            };
            Ok(serde_json::to_string_pretty(&report)? + "\n")
        }
        OutputFormat::Text => {
            let mut out = snapshot.to_string();
            let line_map = LineMap::build(&text);
            for diag in &parsed.diagnostics {
                let pos = line_map.offset_to_position(diag.start, &text);
                writeln!(
                    out,
                    "{}:{}:{}: error {}: {}",
                    args.file.display(),
                    pos.line + 1,
                    pos.character + 1,
                    diag.code,
                    diag.message_text
                )?;
            }
            Ok(out)
        }
    }
}

pub fn replay(args: &ReplayArgs) -> Result<String> {
    let text = read_source(&args.file)?;
    let edits = load_edits(&args.edits)?;
    let options = match &args.config {
        Some(path) => load_config(path)?,
        None => EngineOptions::default(),
    };

    let mut session =
        Session::new(EsParser, (), options).context("failed to start the reparse engine")?;
    session.open(text)?;
    session.wait_for_parse(PARSE_TIMEOUT)?;

    for (index, edit) in edits.iter().enumerate() {
        let next = edit
            .apply(session.text())
            .with_context(|| format!("edit #{index} does not apply"))?;
        session.on_edit(next, edit)?;
        if !session.wait_for_parse(PARSE_TIMEOUT)? {
            bail!("edit #{index} did not finish parsing within {PARSE_TIMEOUT:?}");
        }
        debug!(index, version = session.version(), "replayed edit");
    }

    // A failed partial reparse only means the slice was invalid. The full
    // reparse armed by the recovery timer decides whether the text is.
    if session.recovery_pending() {
        std::thread::sleep(session.options().recovery_delay());
        session.poll()?;
        if !session.wait_for_parse(PARSE_TIMEOUT)? {
            bail!("recovery reparse did not finish within {PARSE_TIMEOUT:?}");
        }
        debug!(version = session.version(), "recovery reparse settled");
    }

    if let Some(error) = session.last_error() {
        bail!("final text does not analyze cleanly: {error}");
    }
    let analysis = session
        .analysis()
        .context("no analysis was produced for the document")?;
    let snapshot = analysis.snapshot();
    let stats = session.stats();

    match args.format {
        OutputFormat::Json => {
            let report = ReplayReport {
                scopes: &snapshot,
                version: analysis.version,
                stats,
            };
            Ok(serde_json::to_string_pretty(&report)? + "\n")
        }
        OutputFormat::Text => {
            let mut out = snapshot.to_string();
            writeln!(
                out,
                "reparses: {} full, {} partial",
                stats.full_reparses, stats.partial_reparses
            )?;
            Ok(out)
        }
    }
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_edits(path: &Path) -> Result<Vec<EditDescriptor>> {
    let raw = read_source(path)?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse edit script {}", path.display()))
}

fn load_config(path: &Path) -> Result<EngineOptions> {
    let raw = read_source(path)?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse engine config {}", path.display()))
}
