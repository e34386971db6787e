//! Live interpretation over a line stream.
//!
//! Each non-empty input line is an event. The reader never waits for an
//! event to finish: while one is being processed the gate is closed and
//! further lines are dropped with a warning instead of being queued.

use fsml_core::{CoreError, Interpreter, Outcome, SessionGate, TraceSink};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("processing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Whichever of the input and the in-flight event is ready first.
enum Next {
    Finished(Result<Result<Outcome, CoreError>, tokio::task::JoinError>),
    Line(Option<String>),
}

/// What a finished session did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub outcomes: Vec<Outcome>,
    /// Lines dropped because an event was still being processed.
    pub ignored: usize,
    pub final_state: String,
}

/// An interpreter fed from an async line source.
pub struct LiveSession<S> {
    interpreter: Arc<Mutex<Interpreter>>,
    sink: Arc<Mutex<S>>,
    gate: SessionGate,
}

impl<S: TraceSink + Send + 'static> LiveSession<S> {
    pub fn new(interpreter: Interpreter, sink: S) -> Self {
        Self {
            interpreter: Arc::new(Mutex::new(interpreter)),
            sink: Arc::new(Mutex::new(sink)),
            gate: SessionGate::new(),
        }
    }

    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    pub fn sink(&self) -> &Arc<Mutex<S>> {
        &self.sink
    }

    /// Starts the session and consumes `input` until it ends.
    ///
    /// Returns the first fatal interpreter error, if any.
    pub async fn run<R>(&self, input: R) -> Result<SessionSummary, SessionError>
    where
        R: AsyncBufRead + Unpin,
    {
        self.start().await?;

        let mut lines = input.lines();
        let mut summary = SessionSummary::default();
        let mut in_flight: Option<JoinHandle<Result<Outcome, CoreError>>> = None;

        loop {
            // A failed event ends the session even while input stays open.
            let next = match in_flight.as_mut() {
                Some(handle) => tokio::select! {
                    joined = handle => Next::Finished(joined),
                    line = lines.next_line() => Next::Line(line?),
                },
                None => Next::Line(lines.next_line().await?),
            };

            let line = match next {
                Next::Finished(joined) => {
                    in_flight = None;
                    summary.outcomes.push(joined??);
                    continue;
                }
                Next::Line(None) => break,
                Next::Line(Some(line)) => line,
            };

            let event = line.trim();
            if event.is_empty() {
                continue;
            }

            let Some(guard) = self.gate.try_begin() else {
                tracing::warn!("still processing, ignoring input '{}'", event);
                summary.ignored += 1;
                continue;
            };

            // The gate is open again, so the previous task is done with the
            // interpreter; collect its result before starting the next one.
            if let Some(handle) = in_flight.take() {
                summary.outcomes.push(handle.await??);
            }

            let interpreter = Arc::clone(&self.interpreter);
            let sink = Arc::clone(&self.sink);
            let event = event.to_string();
            in_flight = Some(tokio::task::spawn_blocking(move || {
                let _guard = guard;
                let mut interpreter = interpreter.lock();
                let mut sink = sink.lock();
                interpreter.dispatch(&event, &mut *sink)
            }));
        }

        if let Some(handle) = in_flight.take() {
            summary.outcomes.push(handle.await??);
        }

        summary.final_state = self.interpreter.lock().current_state().to_string();
        tracing::info!(
            "input closed: {} event(s) processed, {} ignored, final state '{}'",
            summary.outcomes.len(),
            summary.ignored,
            summary.final_state
        );
        Ok(summary)
    }

    async fn start(&self) -> Result<(), SessionError> {
        let interpreter = Arc::clone(&self.interpreter);
        let sink = Arc::clone(&self.sink);
        tokio::task::spawn_blocking(move || {
            let mut interpreter = interpreter.lock();
            let mut sink = sink.lock();
            interpreter.start(&mut *sink)
        })
        .await??;
        Ok(())
    }
}
