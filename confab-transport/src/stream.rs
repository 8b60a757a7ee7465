//! Event-stream decoding.
//!
//! Framing is handled by `eventsource-stream`. [`parse_data`] maps the
//! payload of one event to [`StreamEvent`]s, and [`EventStream`] drives both
//! over an HTTP body as a pull-based [`Stream`].

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use confab_core::StreamEvent;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tokio::time::{Instant, Sleep};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::wire::StreamChunk;

/// Sentinel that ends the stream.
const DONE_MARKER: &str = "[DONE]";

// ============================================================================
// Payload
// ============================================================================

/// Maps the data of one event to stream events.
///
/// Empty payloads produce nothing. A payload that fails to decode is
/// skipped.
pub fn parse_data(data: &str) -> Vec<StreamEvent> {
    let data = data.trim();
    if data.is_empty() {
        return Vec::new();
    }
    if data == DONE_MARKER {
        return vec![StreamEvent::Done];
    }

    let chunk: StreamChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            warn!(error = %e, "Skipping malformed stream frame");
            return Vec::new();
        }
    };

    let mut events = Vec::new();
    if let Some(choice) = chunk.choices.into_iter().next() {
        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
            events.push(StreamEvent::Content(content));
        }
        if let Some(reason) = choice.finish_reason {
            events.push(StreamEvent::Finished(reason));
        }
    }
    events
}

// ============================================================================
// Event Stream
// ============================================================================

/// Body chunks feeding an [`EventStream`].
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

type SseStream = BoxStream<'static, Result<Event, EventStreamError<TransportError>>>;

/// A lazy, finite stream of [`StreamEvent`]s.
///
/// The stream ends after `Done`, after a single `Error`, or when the body
/// ends. It cannot be restarted. Cancelling or dropping it drops the body,
/// which closes the connection.
pub struct EventStream {
    events: Option<SseStream>,
    pending: VecDeque<StreamEvent>,
    finished: bool,
    idle_timeout: Option<Duration>,
    idle: Option<Pin<Box<Sleep>>>,
}

impl EventStream {
    /// Wraps a byte stream.
    pub fn new(body: ByteStream, idle_timeout: Option<Duration>) -> Self {
        Self {
            events: Some(body.eventsource().boxed()),
            pending: VecDeque::new(),
            finished: false,
            idle_timeout,
            idle: None,
        }
    }

    /// Wraps a successful HTTP response.
    pub fn from_response(response: reqwest::Response, idle_timeout: Option<Duration>) -> Self {
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from))
            .boxed();
        Self::new(body, idle_timeout)
    }

    /// A stream that yields a single `Error` and ends.
    pub fn failed(cause: impl Into<String>) -> Self {
        let mut stream = Self::new(futures::stream::empty().boxed(), None);
        stream.fail(cause.into());
        stream
    }

    /// Stops the stream and closes the connection.
    ///
    /// Nothing is delivered afterwards, including buffered events.
    pub fn cancel(&mut self) {
        if !self.finished {
            debug!("Event stream cancelled");
        }
        self.events = None;
        self.idle = None;
        self.pending.clear();
        self.finished = true;
    }

    /// Returns true once no further events will be produced.
    pub fn is_finished(&self) -> bool {
        self.finished && self.pending.is_empty()
    }

    fn fail(&mut self, cause: String) {
        self.events = None;
        self.idle = None;
        self.pending.clear();
        self.pending.push_back(StreamEvent::Error(cause));
        self.finished = true;
    }

    fn end(&mut self) {
        self.events = None;
        self.idle = None;
        self.finished = true;
    }

    /// Queues `events`, stopping at the first terminal one.
    fn enqueue(&mut self, events: Vec<StreamEvent>) {
        for event in events {
            let terminal = event.is_terminal();
            self.pending.push_back(event);
            if terminal {
                self.end();
                return;
            }
        }
    }

    fn reset_idle(&mut self) {
        if let Some(timeout) = self.idle_timeout {
            let deadline = Instant::now() + timeout;
            match self.idle.as_mut() {
                Some(sleep) => sleep.as_mut().reset(deadline),
                None => self.idle = Some(Box::pin(tokio::time::sleep_until(deadline))),
            }
        }
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("pending", &self.pending.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Stream for EventStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(event));
            }
            if this.finished {
                return Poll::Ready(None);
            }
            if this.events.is_none() {
                this.finished = true;
                return Poll::Ready(None);
            }
            if this.idle.is_none() {
                this.reset_idle();
            }

            let polled = match this.events.as_mut() {
                Some(events) => events.as_mut().poll_next(cx),
                None => Poll::Ready(None),
            };

            match polled {
                Poll::Ready(Some(Ok(event))) => {
                    this.enqueue(parse_data(&event.data));
                    if !this.finished {
                        this.reset_idle();
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    warn!(error = %e, "Event stream read failed");
                    this.fail(e.to_string());
                }
                Poll::Ready(None) => this.end(),
                Poll::Pending => {
                    let timed_out = this
                        .idle
                        .as_mut()
                        .is_some_and(|sleep| sleep.as_mut().poll(cx).is_ready());
                    if timed_out {
                        let secs = this.idle_timeout.map_or(0, |d| d.as_secs());
                        warn!(idle_secs = secs, "Event stream idle timeout");
                        this.fail(format!("Stream idle for more than {secs} seconds"));
                        continue;
                    }
                    return Poll::Pending;
                }
            }
        }
    }
}
