//! Background parse worker.
//!
//! One thread per session receives parse requests over a channel and sends
//! one response per request it runs. Each request carries a generation
//! number; the worker skips queued requests older than the latest dispatched
//! generation, and the session drops any response whose generation is not the
//! one it is waiting for.

use crate::error::ReparseError;
use hoist_parser::{ParseOptions, ParseResult, ParsedSource, SourceParser};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;
use tracing::trace;

/// Recursive descent over deeply nested sources needs more than the default
/// thread stack.
const WORKER_STACK_SIZE: usize = 64 * 1024 * 1024;

pub(crate) struct ParseRequest {
    pub generation: u64,
    pub text: String,
    pub options: ParseOptions,
}

pub(crate) struct ParseResponse {
    pub generation: u64,
    pub result: ParseResult<ParsedSource>,
}

pub(crate) struct ParseWorker {
    requests: Sender<ParseRequest>,
    responses: Receiver<ParseResponse>,
    latest: Arc<AtomicU64>,
}

impl ParseWorker {
    pub fn spawn<P: SourceParser>(parser: P) -> Result<ParseWorker, ReparseError> {
        let (request_tx, request_rx) = mpsc::channel::<ParseRequest>();
        let (response_tx, response_rx) = mpsc::channel::<ParseResponse>();
        let latest = Arc::new(AtomicU64::new(0));
        let worker_latest = Arc::clone(&latest);

        // The thread is detached: it exits once the request channel closes
        // and its current parse, if any, finishes.
        thread::Builder::new()
            .name("hoist-parse".to_string())
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || run(parser, request_rx, response_tx, worker_latest))
            .map_err(ReparseError::Spawn)?;

        Ok(ParseWorker {
            requests: request_tx,
            responses: response_rx,
            latest,
        })
    }

    /// Queue a request, superseding every request with a lower generation.
    pub fn dispatch(&self, request: ParseRequest) -> Result<(), ReparseError> {
        self.latest.store(request.generation, Ordering::Release);
        self.requests
            .send(request)
            .map_err(|_| ReparseError::WorkerGone)
    }

    pub fn try_recv(&self) -> Result<Option<ParseResponse>, ReparseError> {
        match self.responses.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ReparseError::WorkerGone),
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<ParseResponse>, ReparseError> {
        match self.responses.recv_timeout(timeout) {
            Ok(response) => Ok(Some(response)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(ReparseError::WorkerGone),
        }
    }
}

fn run<P: SourceParser>(
    parser: P,
    requests: Receiver<ParseRequest>,
    responses: Sender<ParseResponse>,
    latest: Arc<AtomicU64>,
) {
    for request in requests {
        if request.generation < latest.load(Ordering::Acquire) {
            trace!(generation = request.generation, "skipping superseded parse request");
            continue;
        }
        let result = parser.parse(&request.text, &request.options);
        let response = ParseResponse {
            generation: request.generation,
            result,
        };
        if responses.send(response).is_err() {
            break;
        }
    }
}
