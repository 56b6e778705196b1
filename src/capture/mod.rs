//! Capture module - frame acquisition, end-of-content detection, and the capture loop

pub mod frame;
pub mod session;
pub mod similarity;

// Re-export commonly used types
pub use frame::{CaptureError, Frame, FrameSource, ScreenGrabber};
pub use session::{CaptureSession, SessionError, SessionHandle, SessionParts, SessionState};
pub use similarity::{FrameComparator, SimilarityConfig, SimilarityDetector, SimilarityResult};
