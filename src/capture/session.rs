//! The capture loop
//!
//! One session turns a scrollable surface into an ordered frame sequence:
//! negotiate the display mode, then grab / compare / append / scroll until
//! the page stops producing new content, a step bound is hit, or the user
//! cancels. The loop is synchronous and single-owner; `spawn` moves it onto
//! a background task and hands back a stop/join handle.

use std::thread;

use tokio::task::{self, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{ScrollPlan, SessionConfig};
use crate::events::{channel, CompletionCause, EventReceiver, EventSender, SessionEvent};
use crate::fullscreen::{CoverageProbe, FullscreenNegotiator, FullscreenProbe, NegotiatorConfig};
use crate::input::{InputDriver, InputError, SystemInput};
use crate::window::{SystemWindows, WindowControl};

use super::frame::{CaptureError, Frame, FrameSource, ScreenGrabber};
use super::similarity::{FrameComparator, SimilarityDetector};

/// Fatal session failure. Distinct from the completion causes: frames
/// accepted before the failure stay in the session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session is not idle")]
    NotIdle,

    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("Input failed: {0}")]
    Input(#[from] InputError),
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Preparing,
    Capturing,
    Finished(CompletionCause),
    Failed,
}

/// The collaborators a session drives. Split out so tests can assemble a
/// session from doubles.
pub struct SessionParts {
    pub source: Box<dyn FrameSource>,
    pub comparator: Box<dyn FrameComparator>,
    pub input: Box<dyn InputDriver>,
    pub windows: Box<dyn WindowControl>,
    pub probe: Box<dyn FullscreenProbe>,
}

impl SessionParts {
    /// Production wiring against the real screen, input, and window system
    pub fn system() -> Self {
        Self {
            source: Box::new(ScreenGrabber::new()),
            comparator: Box::new(SimilarityDetector::new()),
            input: Box::new(SystemInput::new()),
            windows: Box::new(SystemWindows::new()),
            probe: Box::new(CoverageProbe::new(ScreenGrabber::new())),
        }
    }
}

/// One capture run: configuration, collaborators, and the accumulated
/// frame sequence (insertion order = page order, append-only).
pub struct CaptureSession {
    config: SessionConfig,
    negotiator: NegotiatorConfig,
    source: Box<dyn FrameSource>,
    comparator: Box<dyn FrameComparator>,
    input: Box<dyn InputDriver>,
    windows: Box<dyn WindowControl>,
    probe: Box<dyn FullscreenProbe>,
    events: EventSender,
    cancel: CancellationToken,
    frames: Vec<Frame>,
    steps: u32,
    state: SessionState,
}

impl CaptureSession {
    pub fn new(
        config: SessionConfig,
        negotiator: NegotiatorConfig,
        parts: SessionParts,
    ) -> (Self, EventReceiver) {
        let (events, receiver) = channel();
        let session = Self {
            config,
            negotiator,
            source: parts.source,
            comparator: parts.comparator,
            input: parts.input,
            windows: parts.windows,
            probe: parts.probe,
            events,
            cancel: CancellationToken::new(),
            frames: Vec::new(),
            steps: 0,
            state: SessionState::Idle,
        };
        (session, receiver)
    }

    /// Session wired to the real system collaborators
    pub fn system(config: SessionConfig) -> (Self, EventReceiver) {
        Self::new(config, NegotiatorConfig::default(), SessionParts::system())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Accepted frames, in page order
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Scroll steps issued so far
    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Token observed at each iteration boundary. Cancelling it is idempotent
    /// and never interrupts an in-flight step.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drop accepted frames and return to Idle so `run` can be called again
    pub fn clear(&mut self) {
        let dropped = self.frames.len();
        self.frames.clear();
        self.steps = 0;
        self.state = SessionState::Idle;
        self.cancel = CancellationToken::new();
        info!(dropped, "session cleared");
        self.emit_status("Screenshots cleared".to_string());
    }

    /// Run the capture to a terminal state. Blocks the calling thread; timed
    /// waits are plain sleeps, so cancellation only lands between steps.
    pub fn run(&mut self) -> Result<CompletionCause, SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::NotIdle);
        }
        self.state = SessionState::Preparing;

        let (plan, mode_message) = ScrollPlan::resolve(&self.config);
        self.emit_status(mode_message);

        // Best effort; a surface stuck in the wrong mode only costs
        // scroll-step accuracy
        {
            let events = self.events.clone();
            let mut emit = move |message: String| {
                info!("{message}");
                let _ = events.send(SessionEvent::Status { message });
            };
            let mut negotiator = FullscreenNegotiator::new(
                &self.negotiator,
                self.probe.as_mut(),
                self.input.as_mut(),
                self.windows.as_mut(),
            );
            negotiator.reach_state(self.config.fullscreen, &mut emit);
        }

        // Let the mode transition finish rendering before the first grab
        thread::sleep(self.config.startup_delay());
        self.state = SessionState::Capturing;

        let cause = match self.capture_loop(&plan) {
            Ok(cause) => cause,
            Err(err) => {
                error!(%err, "capture loop failed");
                self.state = SessionState::Failed;
                return Err(err);
            }
        };

        self.state = SessionState::Finished(cause);
        self.emit_status(cause.label().to_string());
        let _ = self.events.send(SessionEvent::Completed {
            cause,
            count: self.frames.len(),
        });
        Ok(cause)
    }

    fn capture_loop(&mut self, plan: &ScrollPlan) -> Result<CompletionCause, SessionError> {
        let mut previous: Option<Frame> = None;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(CompletionCause::UserStopped);
            }
            if plan.max_steps != 0 && self.steps >= plan.max_steps {
                return Ok(CompletionCause::StepLimit);
            }

            self.emit_status(format!("Capturing screenshot {}...", self.steps + 1));
            let current = self.source.grab()?;

            if let Some(prev) = previous.as_ref() {
                let reading = self.comparator.compare(&current, prev, plan.step_height);
                if reading.similarity > self.config.end_similarity {
                    self.emit_status(format!(
                        "High similarity detected: {:.3}",
                        reading.similarity
                    ));
                    if reading.remaining_height < self.config.end_remaining_px {
                        // The still-identical tail frame is discarded, not
                        // appended
                        self.emit_status(format!(
                            "Page end detected - remaining content: {}px",
                            reading.remaining_height
                        ));
                        return Ok(CompletionCause::NaturalEnd);
                    }
                    self.emit_status(format!(
                        "Continuing - remaining content: {}px",
                        reading.remaining_height
                    ));
                } else {
                    self.emit_status(format!(
                        "Content differs - similarity: {:.3}",
                        reading.similarity
                    ));
                }
            }

            self.frames.push(current.clone());
            let count = self.frames.len();
            info!(count, "frame accepted");
            let _ = self.events.send(SessionEvent::FrameAccepted { count });

            previous = Some(current);
            self.input.scroll(-(plan.step_height as i32))?;
            self.steps += 1;
            thread::sleep(plan.inter_step_delay);
        }
    }

    fn emit_status(&self, message: String) {
        info!("{message}");
        let _ = self.events.send(SessionEvent::Status { message });
    }

    /// Move the session onto a blocking background task. Needs a tokio
    /// runtime; the session comes back through `SessionHandle::join`.
    pub fn spawn(mut self) -> SessionHandle {
        let cancel = self.cancel_token();
        let task = task::spawn_blocking(move || {
            let result = self.run();
            (self, result)
        });
        SessionHandle { cancel, task }
    }
}

/// Control handle for a spawned session
pub struct SessionHandle {
    cancel: CancellationToken,
    task: JoinHandle<(CaptureSession, Result<CompletionCause, SessionError>)>,
}

impl SessionHandle {
    /// Ask the loop to stop at its next iteration boundary. Idempotent; the
    /// in-flight step still completes and its frame is kept.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait for the task to finish and take the session back, with the run
    /// outcome
    pub async fn join(
        self,
    ) -> Result<(CaptureSession, Result<CompletionCause, SessionError>), task::JoinError> {
        self.task.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::similarity::SimilarityResult;
    use crate::window::WindowInfo;
    use screenshots::image::{Rgba, RgbaImage};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Frames with a varying solid shade so consecutive grabs differ
    struct SolidSource {
        grabs: u32,
    }

    impl SolidSource {
        fn new() -> Self {
            Self { grabs: 0 }
        }
    }

    impl FrameSource for SolidSource {
        fn grab(&mut self) -> Result<Frame, CaptureError> {
            self.grabs += 1;
            let shade = (self.grabs % 251) as u8;
            let image = RgbaImage::from_pixel(8, 8, Rgba([shade, shade, shade, 255]));
            Ok(Frame::new(image))
        }

        fn screen_size(&mut self) -> Result<(u32, u32), CaptureError> {
            Ok((8, 8))
        }
    }

    /// Plays back a fixed sequence of readings, repeating the last one
    struct ScriptedComparator {
        readings: Vec<SimilarityResult>,
        next: usize,
    }

    impl ScriptedComparator {
        fn new(readings: Vec<(f64, u32)>) -> Self {
            Self {
                readings: readings
                    .into_iter()
                    .map(|(similarity, remaining_height)| SimilarityResult {
                        similarity,
                        remaining_height,
                    })
                    .collect(),
                next: 0,
            }
        }
    }

    impl FrameComparator for ScriptedComparator {
        fn compare(
            &mut self,
            _current: &Frame,
            _previous: &Frame,
            _step_height: u32,
        ) -> SimilarityResult {
            let idx = self.next.min(self.readings.len() - 1);
            self.next += 1;
            self.readings[idx]
        }
    }

    struct CountingInput {
        scrolls: Arc<Mutex<Vec<i32>>>,
    }

    impl InputDriver for CountingInput {
        fn scroll(&mut self, amount: i32) -> Result<(), InputError> {
            self.scrolls.lock().unwrap().push(amount);
            Ok(())
        }

        fn send_key(&mut self, _key: crate::input::Key) -> Result<(), InputError> {
            Ok(())
        }

        fn move_cursor(&mut self, _x: i32, _y: i32) -> Result<(), InputError> {
            Ok(())
        }

        fn click(&mut self) -> Result<(), InputError> {
            Ok(())
        }
    }

    struct AbsentWindows;

    impl WindowControl for AbsentWindows {
        fn available(&self) -> bool {
            false
        }

        fn list(&mut self) -> Result<Vec<WindowInfo>, InputError> {
            Ok(Vec::new())
        }

        fn activate(&mut self, _window: &WindowInfo) -> Result<(), InputError> {
            Err(InputError::PlatformError("absent".to_string()))
        }
    }

    struct StubProbe {
        answer: bool,
    }

    impl FullscreenProbe for StubProbe {
        fn is_fullscreen(&mut self, _window: Option<&WindowInfo>) -> Result<bool, CaptureError> {
            Ok(self.answer)
        }
    }

    /// Source that errors once its grabs run out
    struct FailingSource {
        grabs_left: u32,
    }

    impl FrameSource for FailingSource {
        fn grab(&mut self) -> Result<Frame, CaptureError> {
            if self.grabs_left == 0 {
                return Err(CaptureError::NoScreen);
            }
            self.grabs_left -= 1;
            let shade = (self.grabs_left % 251) as u8;
            let image = RgbaImage::from_pixel(8, 8, Rgba([shade, shade, shade, 255]));
            Ok(Frame::new(image))
        }

        fn screen_size(&mut self) -> Result<(u32, u32), CaptureError> {
            Ok((8, 8))
        }
    }

    /// Input whose scroll path is dead while focus actions still work
    struct DeadScrollInput;

    impl InputDriver for DeadScrollInput {
        fn scroll(&mut self, _amount: i32) -> Result<(), InputError> {
            Err(InputError::PlatformError("input server gone".to_string()))
        }

        fn send_key(&mut self, _key: crate::input::Key) -> Result<(), InputError> {
            Ok(())
        }

        fn move_cursor(&mut self, _x: i32, _y: i32) -> Result<(), InputError> {
            Ok(())
        }

        fn click(&mut self) -> Result<(), InputError> {
            Ok(())
        }
    }

    fn instant_config(max_steps: u32) -> SessionConfig {
        SessionConfig {
            delay_secs: 0.0,
            max_steps,
            manual_step_height: 1000,
            fullscreen: false,
            startup_delay_secs: 0.0,
            ..SessionConfig::default()
        }
    }

    fn instant_negotiator() -> NegotiatorConfig {
        NegotiatorConfig {
            focus_settle_ms: 0,
            toggle_settle_ms: 0,
            ..NegotiatorConfig::default()
        }
    }

    fn session_with(
        config: SessionConfig,
        comparator: ScriptedComparator,
        scrolls: Arc<Mutex<Vec<i32>>>,
    ) -> (CaptureSession, EventReceiver) {
        CaptureSession::new(
            config,
            instant_negotiator(),
            SessionParts {
                source: Box::new(SolidSource::new()),
                comparator: Box::new(comparator),
                input: Box::new(CountingInput { scrolls }),
                windows: Box::new(AbsentWindows),
                probe: Box::new(StubProbe { answer: false }),
            },
        )
    }

    fn drain(receiver: &mut EventReceiver) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    fn statuses(events: &[SessionEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                SessionEvent::Status { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_natural_end_discards_duplicate_tail() {
        let scrolls = Arc::new(Mutex::new(Vec::new()));
        let comparator = ScriptedComparator::new(vec![(0.5, 0), (0.99, 10)]);
        let (mut session, mut receiver) =
            session_with(instant_config(0), comparator, scrolls.clone());

        let cause = session.run().unwrap();

        assert_eq!(cause, CompletionCause::NaturalEnd);
        assert_eq!(session.state(), SessionState::Finished(CompletionCause::NaturalEnd));
        assert_eq!(session.frames().len(), 2, "tail frame discarded");
        assert_eq!(session.steps(), 2);
        assert_eq!(*scrolls.lock().unwrap(), vec![-1000, -1000]);

        let events = drain(&mut receiver);
        let lines = statuses(&events);
        assert!(lines.contains(&"Display mode confirmed: non-fullscreen".to_string()));
        assert!(lines.contains(&"Content differs - similarity: 0.500".to_string()));
        assert!(lines.contains(&"High similarity detected: 0.990".to_string()));
        assert!(lines.contains(&"Page end detected - remaining content: 10px".to_string()));
        assert!(lines.contains(&"Capture complete".to_string()));
        assert!(matches!(
            events.last(),
            Some(SessionEvent::Completed {
                cause: CompletionCause::NaturalEnd,
                count: 2
            })
        ));
    }

    #[test]
    fn test_step_limit_accepts_every_frame() {
        let scrolls = Arc::new(Mutex::new(Vec::new()));
        let comparator = ScriptedComparator::new(vec![(0.5, 0)]);
        let (mut session, mut receiver) =
            session_with(instant_config(5), comparator, scrolls.clone());

        let cause = session.run().unwrap();

        assert_eq!(cause, CompletionCause::StepLimit);
        assert_eq!(session.frames().len(), 5);
        assert_eq!(session.steps(), 5);
        assert_eq!(scrolls.lock().unwrap().len(), 5);

        let events = drain(&mut receiver);
        assert!(statuses(&events).contains(&"Max scrolls reached".to_string()));
        assert!(matches!(
            events.last(),
            Some(SessionEvent::Completed {
                cause: CompletionCause::StepLimit,
                count: 5
            })
        ));
    }

    #[test]
    fn test_unbounded_run_stops_only_on_cancellation() {
        let scrolls = Arc::new(Mutex::new(Vec::new()));
        let comparator = ScriptedComparator::new(vec![(0.5, 0)]);
        let mut config = instant_config(0);
        config.delay_secs = 0.01;
        let (mut session, _receiver) = session_with(config, comparator, scrolls);

        let token = session.cancel_token();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            token.cancel();
        });

        let cause = session.run().unwrap();
        canceller.join().unwrap();

        assert_eq!(cause, CompletionCause::UserStopped);
        assert!(!session.frames().is_empty());
        assert_eq!(session.frames().len(), session.steps() as usize);
    }

    #[test]
    fn test_clear_returns_session_to_idle() {
        let scrolls = Arc::new(Mutex::new(Vec::new()));
        let comparator = ScriptedComparator::new(vec![(0.5, 0)]);
        let (mut session, mut receiver) = session_with(instant_config(2), comparator, scrolls);

        session.run().unwrap();
        assert_eq!(session.frames().len(), 2);

        // Terminal states refuse a second run
        assert!(matches!(session.run(), Err(SessionError::NotIdle)));

        session.clear();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.frames().is_empty());
        assert_eq!(session.steps(), 0);
        let events = drain(&mut receiver);
        assert!(statuses(&events).contains(&"Screenshots cleared".to_string()));

        // A fresh run starts from an empty sequence
        let cause = session.run().unwrap();
        assert_eq!(cause, CompletionCause::StepLimit);
        assert_eq!(session.frames().len(), 2);
    }

    #[test]
    fn test_rerun_after_stopped_session_starts_empty() {
        let scrolls = Arc::new(Mutex::new(Vec::new()));
        let comparator = ScriptedComparator::new(vec![(0.5, 0)]);
        let mut config = instant_config(40);
        config.delay_secs = 0.01;
        let (mut session, _receiver) = session_with(config, comparator, scrolls);

        let token = session.cancel_token();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            token.cancel();
        });
        let cause = session.run().unwrap();
        canceller.join().unwrap();
        assert_eq!(cause, CompletionCause::UserStopped);
        assert!(!session.frames().is_empty());

        session.clear();

        // The rerun observes a fresh token; the spent one must not stop it
        let cause = session.run().unwrap();
        assert_eq!(cause, CompletionCause::StepLimit);
        assert_eq!(session.frames().len(), 40);
        assert_eq!(
            session.state(),
            SessionState::Finished(CompletionCause::StepLimit)
        );
    }

    #[test]
    fn test_grab_failure_fails_session_keeping_frames() {
        let comparator = ScriptedComparator::new(vec![(0.5, 0)]);
        let (mut session, mut receiver) = CaptureSession::new(
            instant_config(0),
            instant_negotiator(),
            SessionParts {
                source: Box::new(FailingSource { grabs_left: 2 }),
                comparator: Box::new(comparator),
                input: Box::new(CountingInput {
                    scrolls: Arc::new(Mutex::new(Vec::new())),
                }),
                windows: Box::new(AbsentWindows),
                probe: Box::new(StubProbe { answer: false }),
            },
        );

        let result = session.run();

        assert!(matches!(result, Err(SessionError::Capture(_))));
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.frames().len(), 2, "accepted frames retained");
        let events = drain(&mut receiver);
        assert!(
            !events
                .iter()
                .any(|event| matches!(event, SessionEvent::Completed { .. })),
            "failure is not a completion"
        );
    }

    #[test]
    fn test_scroll_failure_fails_session_keeping_frames() {
        let comparator = ScriptedComparator::new(vec![(0.5, 0)]);
        let (mut session, _receiver) = CaptureSession::new(
            instant_config(0),
            instant_negotiator(),
            SessionParts {
                source: Box::new(SolidSource::new()),
                comparator: Box::new(comparator),
                input: Box::new(DeadScrollInput),
                windows: Box::new(AbsentWindows),
                probe: Box::new(StubProbe { answer: false }),
            },
        );

        let result = session.run();

        assert!(matches!(result, Err(SessionError::Input(_))));
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(
            session.frames().len(),
            1,
            "the frame accepted before the scroll stays"
        );
    }

    #[tokio::test]
    async fn test_spawned_session_stops_and_hands_itself_back() {
        let scrolls = Arc::new(Mutex::new(Vec::new()));
        let comparator = ScriptedComparator::new(vec![(0.5, 0)]);
        let mut config = instant_config(0);
        config.delay_secs = 0.01;
        let (session, _receiver) = session_with(config, comparator, scrolls);

        let handle = session.spawn();
        handle.stop();
        let (session, result) = handle.join().await.unwrap();

        assert_eq!(result.unwrap(), CompletionCause::UserStopped);
        assert_eq!(session.frames().len(), session.steps() as usize);
    }
}
