//! Capture configuration and scroll-step resolution

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const SETTINGS_FILE: &str = "capture_settings.json";

/// Scroll step used when the surface runs fullscreen, in pixels
pub const DEFAULT_FULLSCREEN_STEP: u32 = 1300;
/// Scroll step used for a windowed surface, in pixels
pub const DEFAULT_WINDOWED_STEP: u32 = 1245;
/// Pause between scroll steps, in seconds
pub const DEFAULT_STEP_DELAY_SECS: f64 = 0.5;
/// Pause between negotiation and the first capture, in seconds
pub const DEFAULT_STARTUP_DELAY_SECS: f64 = 3.0;
/// Similarity above which two frames count as near-identical
pub const PAGE_END_SIMILARITY: f64 = 0.98;
/// Remaining-content height below which the page counts as ended, in pixels
pub const PAGE_END_REMAINING_PX: u32 = 35;

/// User-facing capture knobs. Field defaults mirror the long-standing
/// empirical constants above.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds to wait between scroll steps
    pub delay_secs: f64,
    /// Maximum scroll steps; 0 scrolls until the page stops changing
    pub max_steps: u32,
    /// Manual scroll height override in pixels; 0 uses the mode default
    pub manual_step_height: u32,
    /// Negotiate fullscreen before capturing
    pub fullscreen: bool,
    /// Seconds to wait after negotiation before the first capture
    #[serde(default = "default_startup_delay")]
    pub startup_delay_secs: f64,
    /// Similarity gate for the end-of-content check
    #[serde(default = "default_end_similarity")]
    pub end_similarity: f64,
    /// Remaining-height gate for the end-of-content check, in pixels
    #[serde(default = "default_end_remaining")]
    pub end_remaining_px: u32,
}

fn default_startup_delay() -> f64 {
    DEFAULT_STARTUP_DELAY_SECS
}

fn default_end_similarity() -> f64 {
    PAGE_END_SIMILARITY
}

fn default_end_remaining() -> u32 {
    PAGE_END_REMAINING_PX
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            delay_secs: DEFAULT_STEP_DELAY_SECS,
            max_steps: 0,
            manual_step_height: 0,
            fullscreen: false,
            startup_delay_secs: DEFAULT_STARTUP_DELAY_SECS,
            end_similarity: PAGE_END_SIMILARITY,
            end_remaining_px: PAGE_END_REMAINING_PX,
        }
    }
}

impl SessionConfig {
    fn settings_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("scrollshot");
        path.push(SETTINGS_FILE);
        path
    }

    /// Load persisted settings, falling back to defaults. The engine never
    /// calls this itself; it exists for the embedding layer.
    pub fn load() -> Self {
        let path = Self::settings_path();
        if path.exists() {
            if let Ok(contents) = fs::read_to_string(&path) {
                if let Ok(settings) = serde_json::from_str(&contents) {
                    return settings;
                }
            }
        }
        Self::default()
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::settings_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        Ok(())
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs_f64(self.startup_delay_secs.max(0.0))
    }
}

/// Resolved per-session scroll parameters; fixed once a session starts
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollPlan {
    pub step_height: u32,
    pub max_steps: u32,
    pub inter_step_delay: Duration,
}

impl ScrollPlan {
    /// Pick the step height (manual override first, else the mode default)
    /// and return the plan along with the status line describing the choice.
    pub fn resolve(config: &SessionConfig) -> (Self, String) {
        let (step_height, message) = if config.manual_step_height > 0 {
            // Scroll amounts travel as i32; cap the height so negating it
            // cannot wrap
            let height = config.manual_step_height.min(i32::MAX as u32);
            (height, format!("Using manual height: {}px", height))
        } else if config.fullscreen {
            (
                DEFAULT_FULLSCREEN_STEP,
                format!("Using default fullscreen height: {}px", DEFAULT_FULLSCREEN_STEP),
            )
        } else {
            (
                DEFAULT_WINDOWED_STEP,
                format!(
                    "Using default non-fullscreen height: {}px",
                    DEFAULT_WINDOWED_STEP
                ),
            )
        };
        let plan = Self {
            step_height,
            max_steps: config.max_steps,
            inter_step_delay: Duration::from_secs_f64(config.delay_secs.max(0.0)),
        };
        (plan, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_height_wins() {
        let config = SessionConfig {
            manual_step_height: 900,
            fullscreen: true,
            ..SessionConfig::default()
        };
        let (plan, message) = ScrollPlan::resolve(&config);
        assert_eq!(plan.step_height, 900);
        assert_eq!(message, "Using manual height: 900px");
    }

    #[test]
    fn test_mode_defaults() {
        let fullscreen = SessionConfig {
            fullscreen: true,
            ..SessionConfig::default()
        };
        let (plan, message) = ScrollPlan::resolve(&fullscreen);
        assert_eq!(plan.step_height, DEFAULT_FULLSCREEN_STEP);
        assert_eq!(message, "Using default fullscreen height: 1300px");

        let windowed = SessionConfig::default();
        let (plan, message) = ScrollPlan::resolve(&windowed);
        assert_eq!(plan.step_height, DEFAULT_WINDOWED_STEP);
        assert_eq!(message, "Using default non-fullscreen height: 1245px");
    }

    #[test]
    fn test_manual_height_caps_at_scroll_range() {
        let config = SessionConfig {
            manual_step_height: u32::MAX,
            ..SessionConfig::default()
        };
        let (plan, message) = ScrollPlan::resolve(&config);
        assert_eq!(plan.step_height, i32::MAX as u32);
        assert_eq!(message, format!("Using manual height: {}px", i32::MAX));
    }

    #[test]
    fn test_delay_conversion_clamps_negatives() {
        let config = SessionConfig {
            delay_secs: -1.0,
            ..SessionConfig::default()
        };
        let (plan, _) = ScrollPlan::resolve(&config);
        assert_eq!(plan.inter_step_delay, Duration::ZERO);
    }

    #[test]
    fn test_settings_roundtrip_via_json() {
        let config = SessionConfig {
            delay_secs: 1.5,
            max_steps: 12,
            manual_step_height: 800,
            fullscreen: true,
            ..SessionConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.delay_secs, 1.5);
        assert_eq!(back.max_steps, 12);
        assert_eq!(back.manual_step_height, 800);
        assert!(back.fullscreen);
    }

    #[test]
    fn test_missing_optional_fields_take_defaults() {
        let json = r#"{"delay_secs":0.5,"max_steps":0,"manual_step_height":0,"fullscreen":false}"#;
        let config: SessionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.startup_delay_secs, DEFAULT_STARTUP_DELAY_SECS);
        assert_eq!(config.end_similarity, PAGE_END_SIMILARITY);
        assert_eq!(config.end_remaining_px, PAGE_END_REMAINING_PX);
    }
}
