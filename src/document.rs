//! Document-assembly boundary
//!
//! The writer that turns a frame sequence into a distributable file lives
//! outside this crate. What lives here is the contract: assembly receives an
//! ordered, non-empty, read-only frame slice, and a writer with a primary
//! and a fallback encoder must surface both causes together when both fail.

use tracing::info;

use crate::capture::Frame;

/// Assembly failure shapes the external writer reports through
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    /// Rejected before the sink is consulted
    #[error("No screenshots to save")]
    NoFrames,

    /// Both encoding paths failed
    #[error("Failed to save document:\nPrimary error: {primary}\nFallback error: {fallback}")]
    EncodersFailed { primary: String, fallback: String },
}

/// Consumer of a finished frame sequence
pub trait DocumentSink {
    /// Assemble the ordered frames into one document
    fn assemble(&mut self, frames: &[Frame]) -> Result<(), AssemblyError>;
}

/// Hand a session's frames to a sink, rejecting an empty sequence up front
pub fn request_assembly(
    frames: &[Frame],
    sink: &mut dyn DocumentSink,
) -> Result<(), AssemblyError> {
    if frames.is_empty() {
        return Err(AssemblyError::NoFrames);
    }
    info!(count = frames.len(), "assembling document");
    sink.assemble(frames)
}
