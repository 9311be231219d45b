//! Incremental rendering over an event channel
//!
//! A [`StreamRenderer`] runs as its own task and pushes [`RenderEvent`]s into
//! a bounded channel as soon as each path segment is ready. The consumer
//! reads them through a [`RenderStream`].
//!
//! Every stream starts with exactly one `Setup` and ends with exactly one
//! `Done`. A failure anywhere in between is reported as a single `Error`
//! right before `Done`, and no further paths follow it.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use scrivener_ipc::{PathSegment, RenderEvent, RenderRequest};
use scrivener_sampler::SamplingMode;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::{RenderContext, await_sample};
use crate::error::RenderError;
use crate::path::split_segments;
use crate::validation::validate_request;

/// Where a stream producer is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Init,
    SetupEmitted,
    /// Waiting on the sampler for a line
    Sampling(usize),
    Normalizing(usize),
    /// Emitting path segments for a line
    Flushing(usize),
    Done,
    DoneAfterError,
}

/// Summary of a finished stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOutcome {
    pub phase: StreamPhase,
    /// Lines that produced at least one path
    pub lines_rendered: usize,
    pub paths_emitted: usize,
    /// The consumer went away or asked to stop
    pub cancelled: bool,
}

/// Asks a running stream to stop after its current suspension point
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { flag: Arc::new(tx) }, rx)
    }

    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }
}

enum Stop {
    Cancelled,
    Failed(RenderError),
}

impl From<RenderError> for Stop {
    fn from(err: RenderError) -> Self {
        Stop::Failed(err)
    }
}

/// Producer half of a streaming render.
pub struct StreamRenderer {
    context: Arc<RenderContext>,
    request: RenderRequest,
    events: mpsc::Sender<RenderEvent>,
    cancel: watch::Receiver<bool>,
    phase: StreamPhase,
    lines_rendered: usize,
    paths_emitted: usize,
}

impl StreamRenderer {
    /// Spawn the producer for `request` and hand back the consumer side.
    /// Must be called within a tokio runtime.
    pub(crate) fn spawn(
        context: Arc<RenderContext>,
        request: RenderRequest,
        buffer: usize,
    ) -> RenderStream {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let (cancel, cancel_rx) = CancelHandle::new();
        let renderer = Self {
            context,
            request,
            events: tx,
            cancel: cancel_rx,
            phase: StreamPhase::Init,
            lines_rendered: 0,
            paths_emitted: 0,
        };
        RenderStream {
            events: rx,
            cancel,
            producer: tokio::spawn(renderer.run()),
        }
    }

    async fn run(mut self) -> StreamOutcome {
        let config = self.context.normalizer.config();
        let line_count = self.request.line_count();
        info!(lines = line_count, "Starting streamed render");

        let setup = RenderEvent::Setup {
            view_box: config.view_box(line_count),
            width: config.viewport_width,
            height: config.viewport_height(line_count),
        };
        if !self.emit(setup).await {
            return self.finish_cancelled();
        }
        self.phase = StreamPhase::SetupEmitted;

        match self.render_lines().await {
            Ok(()) => {
                if !self.emit(RenderEvent::Done).await {
                    return self.finish_cancelled();
                }
                self.phase = StreamPhase::Done;
                debug!(paths = self.paths_emitted, "Stream complete");
                self.outcome(false)
            }
            Err(Stop::Cancelled) => self.finish_cancelled(),
            Err(Stop::Failed(err)) => {
                error!(phase = ?self.phase, "Streamed render failed: {err}");
                let message = err.to_string();
                if !self.emit(RenderEvent::Error { message }).await
                    || !self.emit(RenderEvent::Done).await
                {
                    return self.finish_cancelled();
                }
                self.phase = StreamPhase::DoneAfterError;
                self.outcome(false)
            }
        }
    }

    async fn render_lines(&mut self) -> Result<(), Stop> {
        if self.context.scheduler.is_closed() {
            return Err(RenderError::EngineClosed.into());
        }
        let modes = validate_request(&self.request).map_err(RenderError::from)?;
        let context = Arc::clone(&self.context);
        let line_count = self.request.line_count();

        for index in 0..line_count {
            if self.is_cancelled() {
                return Err(Stop::Cancelled);
            }
            let line = self.request.lines[index].clone();
            if line.is_empty() {
                debug!(line = index, "Skipping blank line");
                continue;
            }
            let style = self.request.styles[index].clone();
            let mode: SamplingMode = modes[index];

            self.phase = StreamPhase::Sampling(index);
            let job = context.dispatch_sample(line, style.bias, mode);
            let sample = {
                let (cancel, events) = (&mut self.cancel, &self.events);
                tokio::select! {
                    biased;
                    _ = wait_cancelled(cancel, events) => return Err(Stop::Cancelled),
                    sample = await_sample(job) => sample?,
                }
            };
            if sample.is_empty() {
                debug!(line = index, "Sampler returned no strokes");
                continue;
            }

            self.phase = StreamPhase::Normalizing(index);
            let local = context
                .normalizer
                .fit_cached(&sample, Some(&context.cache))
                .map_err(RenderError::from)?;
            let placed = context.normalizer.place(&local, index, line_count);

            self.phase = StreamPhase::Flushing(index);
            let segments = split_segments(placed.points(), &sample.eos_indices());
            debug!(line = index, segments = segments.len(), "Flushing line");
            for path_data in segments {
                let event = RenderEvent::Path(PathSegment {
                    path_data,
                    color: style.stroke_color.clone(),
                    width: style.stroke_width,
                    line_index: index,
                });
                if !self.emit(event).await {
                    return Err(Stop::Cancelled);
                }
                self.paths_emitted += 1;
                tokio::task::yield_now().await;
            }
            self.lines_rendered += 1;
        }
        Ok(())
    }

    /// Send one event unless the stream has been cancelled first
    async fn emit(&mut self, event: RenderEvent) -> bool {
        if self.is_cancelled() {
            return false;
        }
        let (cancel, events) = (&mut self.cancel, &self.events);
        tokio::select! {
            biased;
            _ = wait_cancelled(cancel, events) => false,
            sent = events.send(event) => sent.is_ok(),
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow() || self.events.is_closed()
    }

    fn finish_cancelled(&mut self) -> StreamOutcome {
        warn!(phase = ?self.phase, paths = self.paths_emitted, "Stream cancelled");
        let _ = self.events.try_send(RenderEvent::Done);
        self.phase = StreamPhase::Done;
        self.outcome(true)
    }

    fn outcome(&self, cancelled: bool) -> StreamOutcome {
        StreamOutcome {
            phase: self.phase,
            lines_rendered: self.lines_rendered,
            paths_emitted: self.paths_emitted,
            cancelled,
        }
    }
}

/// Resolves once a cancel is requested or the consumer is gone
async fn wait_cancelled(cancel: &mut watch::Receiver<bool>, events: &mpsc::Sender<RenderEvent>) {
    tokio::select! {
        _ = cancel.wait_for(|cancelled| *cancelled) => {}
        _ = events.closed() => {}
    }
}

/// Consumer half of a streaming render.
///
/// Yields events in order through [`Stream`] or [`next_event`](Self::next_event).
/// Dropping it cancels the producer at its next suspension point.
pub struct RenderStream {
    events: mpsc::Receiver<RenderEvent>,
    cancel: CancelHandle,
    producer: JoinHandle<StreamOutcome>,
}

impl std::fmt::Debug for RenderStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderStream")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("finished", &self.producer.is_finished())
            .finish()
    }
}

impl RenderStream {
    pub async fn next_event(&mut self) -> Option<RenderEvent> {
        self.events.recv().await
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Whether the producer task has exited
    pub fn is_finished(&self) -> bool {
        self.producer.is_finished()
    }

    /// Drain every remaining event and wait for the producer to exit
    pub async fn finish(mut self) -> (Vec<RenderEvent>, Option<StreamOutcome>) {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        let outcome = (&mut self.producer).await.ok();
        (events, outcome)
    }

    pub async fn collect_events(self) -> Vec<RenderEvent> {
        self.finish().await.0
    }
}

impl Stream for RenderStream {
    type Item = RenderEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}
