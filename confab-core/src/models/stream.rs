//! Streaming events and send results.

use serde::Serialize;

use super::message::Message;

/// One decoded event from a streamed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A content delta.
    Content(String),
    /// The model reported a finish reason.
    Finished(String),
    /// The transport failed. No further events follow.
    Error(String),
    /// The server signalled the end of the stream.
    Done,
}

impl StreamEvent {
    /// Returns true if no further events follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Error(_) | StreamEvent::Done)
    }
}

/// Outcome of a successful send.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendMessageResult {
    /// The user message, now marked sent.
    pub user_message: Message,
    /// The assistant reply.
    pub message: Message,
    /// Messages folded into a new summary during this send.
    pub compressed_count: usize,
}
