//! Session event stream
//!
//! One-directional notifications from the capture task to whatever is
//! embedding it. Ordering follows emission order; the channel is unbounded so
//! the capture task never blocks on a slow consumer.

use serde::Serialize;
use tokio::sync::mpsc;

/// Why a session reached a terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionCause {
    /// The page stopped producing new content
    NaturalEnd,
    /// The configured step bound was reached
    StepLimit,
    /// Cancelled from outside
    UserStopped,
}

impl CompletionCause {
    /// Status line shown when a session ends with this cause
    pub fn label(self) -> &'static str {
        match self {
            Self::NaturalEnd => "Capture complete",
            Self::StepLimit => "Max scrolls reached",
            Self::UserStopped => "Capture stopped",
        }
    }
}

/// Notifications emitted while a session runs
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A frame was appended to the session's sequence
    FrameAccepted { count: usize },
    /// Human-readable progress line
    Status { message: String },
    /// Terminal notification; no events follow it
    Completed {
        cause: CompletionCause,
        count: usize,
    },
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
