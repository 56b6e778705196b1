//! Fullscreen detection and best-effort mode negotiation
//!
//! Before capture starts the target surface should occupy the whole screen
//! (or deliberately not, for windowed captures). The probe reads the current
//! state from pixel coverage; the negotiator drives focus, F11 toggles, and
//! re-probes through a bounded retry protocol. Negotiation never fails hard:
//! a surface stuck in the wrong mode costs scroll-step accuracy, not the run.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capture::{CaptureError, FrameSource};
use crate::input::{InputDriver, Key};
use crate::window::{WindowControl, WindowInfo};

/// Fraction of the physical screen a surface must cover to read as fullscreen
pub const COVERAGE_THRESHOLD: f64 = 0.98;

/// How far the window origin may sit from the screen corner, in pixels
pub const ORIGIN_TOLERANCE_PX: i32 = 5;

/// Reports whether the capture surface currently occupies the full screen
pub trait FullscreenProbe: Send {
    /// `window` is the candidate located by the negotiator, when enumeration
    /// found one; it tightens the check with a geometry cross-reference.
    fn is_fullscreen(&mut self, window: Option<&WindowInfo>) -> Result<bool, CaptureError>;
}

/// Production probe comparing grabbed-frame dimensions against the physical
/// display, with an optional window-geometry cross-check
pub struct CoverageProbe<S> {
    source: S,
}

impl<S: FrameSource> CoverageProbe<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: FrameSource> FullscreenProbe for CoverageProbe<S> {
    fn is_fullscreen(&mut self, window: Option<&WindowInfo>) -> Result<bool, CaptureError> {
        let frame = self.source.grab()?;
        let (screen_w, screen_h) = self.source.screen_size()?;
        if screen_w == 0 || screen_h == 0 {
            return Ok(false);
        }

        let covered = frame.width() as f64 / screen_w as f64 >= COVERAGE_THRESHOLD
            && frame.height() as f64 / screen_h as f64 >= COVERAGE_THRESHOLD;
        debug!(
            frame_w = frame.width(),
            frame_h = frame.height(),
            screen_w,
            screen_h,
            covered,
            "probed pixel coverage"
        );

        let Some(win) = window else {
            return Ok(covered);
        };

        // With a located window all three checks must agree: pixel coverage,
        // window size, and a near-origin top-left corner.
        let (x, y, w, h) = win.bounds;
        let sized = w.max(0) as f64 / screen_w as f64 >= COVERAGE_THRESHOLD
            && h.max(0) as f64 / screen_h as f64 >= COVERAGE_THRESHOLD;
        let anchored = x.abs() <= ORIGIN_TOLERANCE_PX && y.abs() <= ORIGIN_TOLERANCE_PX;
        Ok(covered && sized && anchored)
    }
}

/// Negotiation settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NegotiatorConfig {
    /// Bounded retry count
    pub attempts: u32,
    /// Settle delay after focusing the target, in milliseconds
    pub focus_settle_ms: u64,
    /// Settle delay after an F11 toggle, in milliseconds
    pub toggle_settle_ms: u64,
    /// Click target for the no-enumeration focus fallback
    pub corner: (i32, i32),
    /// Title fragments identifying browser windows, matched case-insensitively
    pub browser_titles: Vec<String>,
}

impl Default for NegotiatorConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            focus_settle_ms: 400,
            toggle_settle_ms: 1000,
            corner: (1, 1),
            browser_titles: [
                "chrome", "chromium", "firefox", "edge", "safari", "brave", "opera", "vivaldi",
            ]
            .iter()
            .map(|fragment| fragment.to_string())
            .collect(),
        }
    }
}

/// First visible window whose title contains a known browser fragment
fn pick_browser_window(windows: &[WindowInfo], fragments: &[String]) -> Option<WindowInfo> {
    windows
        .iter()
        .find(|win| {
            if !win.is_visible {
                return false;
            }
            let title = win.title.to_lowercase();
            fragments
                .iter()
                .any(|fragment| title.contains(&fragment.to_lowercase()))
        })
        .cloned()
}

/// Drives the capture surface toward a desired fullscreen state.
///
/// Borrows its collaborators for the duration of one negotiation; the session
/// hands them over between plan resolution and the first grab.
pub struct FullscreenNegotiator<'a> {
    config: &'a NegotiatorConfig,
    probe: &'a mut dyn FullscreenProbe,
    input: &'a mut dyn InputDriver,
    windows: &'a mut dyn WindowControl,
}

impl<'a> FullscreenNegotiator<'a> {
    pub fn new(
        config: &'a NegotiatorConfig,
        probe: &'a mut dyn FullscreenProbe,
        input: &'a mut dyn InputDriver,
        windows: &'a mut dyn WindowControl,
    ) -> Self {
        Self {
            config,
            probe,
            input,
            windows,
        }
    }

    /// Best-effort: returns whether the desired state was confirmed.
    /// Collaborator errors are absorbed into the retry flow; the caller
    /// proceeds either way. Every attempt and the outcome go through `emit`.
    pub fn reach_state(&mut self, desired: bool, emit: &mut dyn FnMut(String)) -> bool {
        let mode = if desired { "fullscreen" } else { "non-fullscreen" };
        let confirmed = format!("Display mode confirmed: {}", mode);
        for attempt in 1..=self.config.attempts {
            emit(format!(
                "Setting {} mode (attempt {}/{})...",
                mode, attempt, self.config.attempts
            ));
            debug!(attempt, desired, "negotiating display mode");
            let candidate = self.focus_target();

            let current = match self.probe.is_fullscreen(candidate.as_ref()) {
                Ok(state) => state,
                Err(err) => {
                    warn!(%err, "fullscreen probe failed");
                    continue;
                }
            };

            if current == desired {
                // A borderless window can read as fullscreen without being
                // one; force a toggle on the first pass to shake that out.
                if desired && attempt == 1 {
                    if self.toggle_and_verify(desired, candidate.as_ref()) {
                        emit(confirmed);
                        return true;
                    }
                    continue;
                }
                emit(confirmed);
                return true;
            }

            if self.toggle_and_verify(desired, candidate.as_ref()) {
                emit(confirmed);
                return true;
            }
        }

        warn!(
            attempts = self.config.attempts,
            desired, "display mode negotiation exhausted its attempts"
        );
        emit("Could not set fullscreen state automatically - press F11 manually if needed".to_string());
        false
    }

    /// Focus the capture surface. Returns the chosen window when enumeration
    /// found and activated one, `None` on the corner-click fallback.
    fn focus_target(&mut self) -> Option<WindowInfo> {
        if self.windows.available() {
            match self.windows.list() {
                Ok(list) => {
                    if let Some(win) = pick_browser_window(&list, &self.config.browser_titles) {
                        debug!(title = %win.title, "focusing browser window");
                        match self.windows.activate(&win) {
                            Ok(()) => {
                                self.settle(self.config.focus_settle_ms);
                                return Some(win);
                            }
                            Err(err) => warn!(%err, "window activation failed"),
                        }
                    }
                }
                Err(err) => warn!(%err, "window enumeration failed"),
            }
        }

        // No usable window: click a screen corner so whatever sits there
        // takes keyboard focus
        let (x, y) = self.config.corner;
        if let Err(err) = self.input.move_cursor(x, y) {
            warn!(%err, "cursor move failed");
        } else if let Err(err) = self.input.click() {
            warn!(%err, "focus click failed");
        }
        self.settle(self.config.focus_settle_ms);
        None
    }

    fn toggle_and_verify(&mut self, desired: bool, window: Option<&WindowInfo>) -> bool {
        debug!("sending fullscreen toggle");
        if let Err(err) = self.input.send_key(Key::F11) {
            warn!(%err, "fullscreen toggle failed");
            return false;
        }
        self.settle(self.config.toggle_settle_ms);

        match self.probe.is_fullscreen(window) {
            Ok(state) => state == desired,
            Err(err) => {
                warn!(%err, "fullscreen probe failed");
                false
            }
        }
    }

    fn settle(&self, ms: u64) {
        if ms > 0 {
            std::thread::sleep(Duration::from_millis(ms));
        }
    }
}
