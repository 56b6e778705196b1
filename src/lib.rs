//! scrollshot - automated capture of vertically-scrolling surfaces
//! Grabs full-screen frames, scrolls, and compares successive frames to
//! decide when the content has run out. No UI here: an embedding layer
//! drives sessions and consumes the event stream.

// Core modules
pub mod capture;
pub mod config;
pub mod document;
pub mod events;
pub mod fullscreen;
pub mod input;
pub mod window;

// Re-export the engine surface
pub use capture::{
    CaptureError, CaptureSession, Frame, FrameComparator, FrameSource, ScreenGrabber,
    SessionError, SessionHandle, SessionParts, SessionState, SimilarityConfig,
    SimilarityDetector, SimilarityResult,
};
pub use config::{ScrollPlan, SessionConfig};
pub use document::{request_assembly, AssemblyError, DocumentSink};
pub use events::{CompletionCause, EventReceiver, EventSender, SessionEvent};
pub use fullscreen::{CoverageProbe, FullscreenNegotiator, FullscreenProbe, NegotiatorConfig};
pub use input::{InputDriver, InputError, Key, SystemInput};
pub use window::{SystemWindows, WindowControl, WindowInfo};
