//! The incremental reparse engine.
//!
//! # Flow
//!
//! ```text
//! on_edit ──► plan ──► Full ───────────────► worker ──► apply_full ────┐
//!               │                                                      ├─► Consumer
//!               └────► Partial(function) ──► worker ──► apply_partial ─┘
//!                                                 │
//!                                   parse error ──┴──► recovery timer ──► Full
//! ```
//!
//! Control flow is single-threaded: the worker only parses. Results are
//! collected by [`Session::poll`] (or [`Session::wait`]) and applied only if
//! they belong to the most recent dispatch.

use crate::analysis::Analysis;
use crate::consumer::{Change, Consumer};
use crate::edit::EditDescriptor;
use crate::error::ReparseError;
use crate::options::EngineOptions;
use crate::splice;
use crate::worker::{ParseRequest, ParseResponse, ParseWorker};
use hoist_binder::BindingResolver;
use hoist_common::Span;
use hoist_common::span::shift_offset;
use hoist_parser::{NodeArena, NodeData, NodeIndex, ParsedSource, SourceParser};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Counters describing what a session has done so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Full reparses applied.
    pub full_reparses: u64,
    /// Partial reparses spliced into the tree.
    pub partial_reparses: u64,
    pub parse_failures: u64,
    /// Partial results that did not fit the tree and fell back to a full reparse.
    pub structural_mismatches: u64,
    /// Dispatched parses replaced by a newer one before their result was applied.
    pub superseded: u64,
    /// Full reparses started by the recovery timer.
    pub recoveries: u64,
}

/// A reparse of one function, in the coordinates of the current tree.
#[derive(Clone, Copy, Debug)]
struct PartialJob {
    function: NodeIndex,
    /// Range of the function in the current tree.
    span: Span,
    /// Net length change of every edit since the tree was built.
    delta: i64,
    /// Function expressions are parsed inside parentheses.
    wrapped: bool,
}

impl PartialJob {
    /// Range of the function in the current text.
    fn pending_span(&self) -> Span {
        Span::new(self.span.start, shift_offset(self.span.end, self.delta))
    }
}

#[derive(Clone, Copy, Debug)]
enum Job {
    Full,
    Partial(PartialJob),
}

struct InFlight {
    generation: u64,
    job: Job,
}

/// One document under incremental analysis.
pub struct Session<C: Consumer> {
    options: EngineOptions,
    worker: ParseWorker,
    consumer: C,
    analysis: Option<Analysis>,
    text: String,
    in_flight: Option<InFlight>,
    recovery_deadline: Option<Instant>,
    generation: u64,
    version: u64,
    stats: SessionStats,
    last_error: Option<ReparseError>,
}

impl<C: Consumer> Session<C> {
    /// Start a session with its own parse worker. Nothing is parsed until
    /// [`open`](Session::open) or [`on_edit`](Session::on_edit).
    pub fn new<P: SourceParser>(
        parser: P,
        consumer: C,
        options: EngineOptions,
    ) -> Result<Self, ReparseError> {
        Ok(Session {
            options,
            worker: ParseWorker::spawn(parser)?,
            consumer,
            analysis: None,
            text: String::new(),
            in_flight: None,
            recovery_deadline: None,
            generation: 0,
            version: 0,
            stats: SessionStats::default(),
            last_error: None,
        })
    }

    /// Replace the whole document and start a full reparse.
    pub fn open(&mut self, text: impl Into<String>) -> Result<(), ReparseError> {
        self.text = text.into();
        self.recovery_deadline = None;
        self.dispatch_full()
    }

    /// Report an edit. `text` is the full document after the edit.
    #[tracing::instrument(level = "debug", skip_all, fields(start = edit.start, delta = edit.net_delta()))]
    pub fn on_edit(
        &mut self,
        text: impl Into<String>,
        edit: &EditDescriptor,
    ) -> Result<(), ReparseError> {
        self.text = text.into();
        if self.recovery_deadline.take().is_some() {
            debug!("edit during recovery, forcing full reparse");
            return self.dispatch_full();
        }
        match self.plan(edit) {
            Job::Full => self.dispatch_full(),
            Job::Partial(job) => self.dispatch_partial(job),
        }
    }

    /// Collect finished parses and fire the recovery timer if it is due.
    /// Returns whether a new analysis was applied.
    pub fn poll(&mut self) -> Result<bool, ReparseError> {
        self.poll_at(Instant::now())
    }

    /// [`poll`](Session::poll) with an explicit clock reading.
    pub fn poll_at(&mut self, now: Instant) -> Result<bool, ReparseError> {
        let mut applied = false;
        while let Some(response) = self.worker.try_recv()? {
            applied |= self.handle_response(response, now)?;
        }
        self.fire_recovery(now)?;
        Ok(applied)
    }

    /// Block until no parse is in flight and no recovery is pending, or
    /// until `timeout` passes. Returns whether the session settled.
    pub fn wait(&mut self, timeout: Duration) -> Result<bool, ReparseError> {
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            self.poll_at(now)?;
            if self.is_idle() {
                return Ok(true);
            }
            if now >= deadline {
                return Ok(false);
            }
            let wake = self
                .recovery_deadline
                .map_or(deadline, |recovery| recovery.min(deadline));
            let budget = wake.saturating_duration_since(now);
            if self.in_flight.is_some() {
                if let Some(response) = self.worker.recv_timeout(budget)? {
                    self.handle_response(response, Instant::now())?;
                }
            } else {
                std::thread::sleep(budget);
            }
        }
    }

    /// Block until no parse is in flight, without firing the recovery timer.
    /// Returns whether the last dispatched parse completed within `timeout`.
    pub fn wait_for_parse(&mut self, timeout: Duration) -> Result<bool, ReparseError> {
        let deadline = Instant::now() + timeout;
        while self.in_flight.is_some() {
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            if let Some(response) = self.worker.recv_timeout(deadline - now)? {
                self.handle_response(response, Instant::now())?;
            }
        }
        Ok(true)
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none() && self.recovery_deadline.is_none()
    }

    pub fn recovery_pending(&self) -> bool {
        self.recovery_deadline.is_some()
    }

    /// The latest applied analysis. It may lag [`text`](Session::text)
    /// while a parse is in flight or after a parse error.
    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    /// Mutable access for consumers that record render state on nodes.
    pub fn analysis_mut(&mut self) -> Option<&mut Analysis> {
        self.analysis.as_mut()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Most recent parse failure or structural mismatch, cleared by the
    /// next applied analysis.
    pub fn last_error(&self) -> Option<&ReparseError> {
        self.last_error.as_ref()
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    pub fn consumer_mut(&mut self) -> &mut C {
        &mut self.consumer
    }

    // Planning and dispatch

    /// Decide how to reparse after `edit`.
    fn plan(&self, edit: &EditDescriptor) -> Job {
        let delta = edit.net_delta();

        // The tree lags the text while a parse is in flight. Another edit
        // to the function being reparsed folds into the same job.
        if let Some(in_flight) = &self.in_flight {
            return match in_flight.job {
                Job::Partial(job) if lands_within(job.span, job.delta, edit) => {
                    Job::Partial(PartialJob {
                        delta: job.delta + delta,
                        ..job
                    })
                }
                _ => Job::Full,
            };
        }

        let Some(analysis) = &self.analysis else {
            return Job::Full;
        };
        let budget = self.options.node_budget(self.text.len());
        if analysis.arena.len() > budget {
            debug!(nodes = analysis.arena.len(), budget, "arena over budget");
            return Job::Full;
        }
        let Some(function) = splice::containing_function(&analysis.arena, analysis.root, edit.start)
        else {
            return Job::Full;
        };
        let Some(node) = analysis.arena.get(function) else {
            return Job::Full;
        };
        if !lands_within(node.span, 0, edit) {
            return Job::Full;
        }
        Job::Partial(PartialJob {
            function,
            span: node.span,
            delta,
            wrapped: matches!(node.data, NodeData::FunctionExpression(_)),
        })
    }

    fn dispatch_full(&mut self) -> Result<(), ReparseError> {
        let text = self.text.clone();
        self.dispatch(Job::Full, text)
    }

    fn dispatch_partial(&mut self, job: PartialJob) -> Result<(), ReparseError> {
        let pending = job.pending_span();
        let slice = if pending.is_empty() {
            None
        } else {
            pending.text(&self.text)
        };
        let Some(slice) = slice else {
            debug!(
                start = pending.start,
                end = pending.end,
                "function slice out of range"
            );
            return self.dispatch_full();
        };
        let text = if job.wrapped {
            format!("({slice})")
        } else {
            slice.to_string()
        };
        self.dispatch(Job::Partial(job), text)
    }

    fn dispatch(&mut self, job: Job, text: String) -> Result<(), ReparseError> {
        self.generation += 1;
        let generation = self.generation;
        if let Some(previous) = self.in_flight.take() {
            self.stats.superseded += 1;
            trace!(
                generation = previous.generation,
                "superseding in-flight parse"
            );
        }
        debug!(
            generation,
            partial = matches!(job, Job::Partial(_)),
            len = text.len(),
            "dispatching parse"
        );
        self.worker.dispatch(ParseRequest {
            generation,
            text,
            options: self.options.parse_options.clone(),
        })?;
        self.in_flight = Some(InFlight { generation, job });
        Ok(())
    }

    // Completion

    fn handle_response(
        &mut self,
        response: ParseResponse,
        now: Instant,
    ) -> Result<bool, ReparseError> {
        let Some(in_flight) = self
            .in_flight
            .take_if(|pending| pending.generation == response.generation)
        else {
            trace!(
                generation = response.generation,
                "discarding superseded parse result"
            );
            return Ok(false);
        };

        match (in_flight.job, response.result) {
            (job, Err(error)) => {
                self.stats.parse_failures += 1;
                debug!(
                    generation = in_flight.generation,
                    partial = matches!(job, Job::Partial(_)),
                    %error,
                    "parse failed, arming recovery"
                );
                self.arm_recovery(now);
                self.last_error = Some(ReparseError::Parse(error));
                Ok(false)
            }
            (Job::Full, Ok(parsed)) => {
                self.apply_full(parsed);
                Ok(true)
            }
            (Job::Partial(job), Ok(parsed)) => match self.apply_partial(job, parsed) {
                Ok(()) => Ok(true),
                Err(ReparseError::StructuralMismatch(reason)) => {
                    self.stats.structural_mismatches += 1;
                    warn!(%reason, "partial reparse does not fit the tree, reparsing everything");
                    self.last_error = Some(ReparseError::StructuralMismatch(reason));
                    self.dispatch_full()?;
                    Ok(false)
                }
                Err(other) => Err(other),
            },
        }
    }

    fn arm_recovery(&mut self, now: Instant) {
        if self.recovery_deadline.is_none() {
            self.recovery_deadline = Some(now + self.options.recovery_delay());
        }
    }

    fn fire_recovery(&mut self, now: Instant) -> Result<(), ReparseError> {
        if let Some(deadline) = self.recovery_deadline
            && deadline <= now
        {
            self.recovery_deadline = None;
            self.stats.recoveries += 1;
            debug!("recovery timer expired, reparsing current text");
            self.dispatch_full()?;
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(nodes = parsed.arena.len()))]
    fn apply_full(&mut self, parsed: ParsedSource) {
        if !parsed.diagnostics.is_empty() {
            debug!(
                diagnostics = parsed.diagnostics.len(),
                "parse recovered from errors"
            );
        }
        let scopes = BindingResolver::resolve_program(&parsed.arena, parsed.root);
        self.version += 1;
        let analysis = Analysis {
            arena: parsed.arena,
            root: parsed.root,
            scopes,
            text: self.text.clone(),
            version: self.version,
        };

        let mut previous = self.analysis.replace(analysis);
        if let Some(previous) = previous.as_mut() {
            for node in &mut previous.arena.nodes {
                if let Some(handle) = node.render.invalidate() {
                    self.consumer.release(handle);
                }
            }
        }

        self.recovery_deadline = None;
        self.last_error = None;
        self.stats.full_reparses += 1;
        if let Some(current) = &self.analysis {
            self.consumer.on_analyzed(
                current,
                Change::Full {
                    previous: previous.as_ref(),
                },
            );
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(start = job.span.start, delta = job.delta))]
    fn apply_partial(&mut self, job: PartialJob, parsed: ParsedSource) -> Result<(), ReparseError> {
        let slice_len = job.pending_span().len();
        let candidate =
            splice::partial_root(&parsed.arena, parsed.statements(), job.wrapped, slice_len)?;

        let analysis = self
            .analysis
            .as_mut()
            .ok_or_else(|| ReparseError::mismatch("no tree to splice into"))?;
        if analysis.arena.span(job.function) != Some(job.span) {
            return Err(ReparseError::mismatch("function moved since dispatch"));
        }
        let parent_scope = analysis
            .scopes
            .scope_of_function(job.function)
            .and_then(|own| analysis.scopes.parent(own))
            .ok_or_else(|| ReparseError::mismatch("function has no enclosing scope"))?;
        let old_name = function_name(&analysis.arena, job.function);

        // Partial ranges are relative to the slice, plus one for the
        // opening parenthesis of a wrapped expression.
        let correction = if job.wrapped {
            job.span
                .start
                .checked_sub(1)
                .ok_or_else(|| ReparseError::mismatch("wrapped function at offset 0"))?
        } else {
            job.span.start
        };
        let inserted = analysis
            .arena
            .import_subtree(&parsed.arena, candidate, correction);
        let spliced = splice::replace_function(
            &mut analysis.arena,
            analysis.root,
            job.function,
            inserted,
            job.delta,
        )?;

        analysis.scopes.retract_subtree(&analysis.arena, job.function);
        let mut released = spliced.released;
        released.extend(splice::release_subtree(&mut analysis.arena, job.function));

        let new_name = function_name(&analysis.arena, inserted);
        if !job.wrapped && old_name != new_name {
            debug!(?old_name, ?new_name, "declaration renamed, re-resolving every scope");
            analysis.scopes = BindingResolver::resolve_program(&analysis.arena, analysis.root);
        } else {
            BindingResolver::resolve_subtree(
                &analysis.arena,
                &mut analysis.scopes,
                inserted,
                parent_scope,
            );
        }

        self.version += 1;
        analysis.version = self.version;
        analysis.text.clone_from(&self.text);
        debug!(
            parent = spliced.parent.0,
            shifted = spliced.shifted,
            released = released.len(),
            "spliced partial reparse"
        );

        for handle in released {
            self.consumer.release(handle);
        }
        self.recovery_deadline = None;
        self.last_error = None;
        self.stats.partial_reparses += 1;
        self.consumer.on_analyzed(
            analysis,
            Change::Partial {
                replaced: job.function,
                inserted,
            },
        );
        Ok(())
    }
}

/// Whether every change in `edit` stays inside `span`, a function range that
/// `delta` bytes of earlier edits have already stretched.
fn lands_within(span: Span, mut delta: i64, edit: &EditDescriptor) -> bool {
    edit.iter().all(|change| {
        let end = i64::from(span.end) + delta;
        let removed_end = i64::from(change.start) + change.removed.len() as i64;
        delta += change.delta();
        span.start <= change.start && removed_end <= end && i64::from(change.start) < end
    })
}

fn function_name(arena: &NodeArena, function: NodeIndex) -> Option<String> {
    arena
        .function_data(function)
        .and_then(|func| arena.identifier_name(func.id))
        .map(str::to_owned)
}
