//! Synthetic input for scrolling and window-mode control
//!
//! Cross-platform automation:
//! - macOS: CoreGraphics CGEvent
//! - Windows: SendInput
//! - Linux: X11 xtest

pub mod keyboard;
pub mod mouse;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Input seam used by the capture loop and the fullscreen negotiation
pub trait InputDriver: Send {
    /// Scroll vertically by `amount` pixels; negative moves down the page
    fn scroll(&mut self, amount: i32) -> Result<(), InputError>;

    /// Press and release one key
    fn send_key(&mut self, key: Key) -> Result<(), InputError>;

    /// Move the cursor to absolute screen coordinates
    fn move_cursor(&mut self, x: i32, y: i32) -> Result<(), InputError>;

    /// Left-click at the current cursor position
    fn click(&mut self) -> Result<(), InputError>;
}

/// Key codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    Num0, Num1, Num2, Num3, Num4, Num5, Num6, Num7, Num8, Num9,
    Return, Escape, Backspace, Delete, Tab, Space,
    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,
    Home, End, PageUp, PageDown,
    Left, Right, Up, Down,
    Shift,
    Control,
    Alt,
    Command, // macOS Cmd
}

/// Input error types
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Platform error: {0}")]
    PlatformError(String),

    #[error("No display connection: {0}")]
    NoDisplay(String),

    #[error("Window not found: {0}")]
    WindowNotFound(String),
}

impl From<std::io::Error> for InputError {
    fn from(err: std::io::Error) -> Self {
        InputError::PlatformError(err.to_string())
    }
}

#[cfg(target_os = "linux")]
impl From<x11rb::errors::ConnectError> for InputError {
    fn from(err: x11rb::errors::ConnectError) -> Self {
        InputError::NoDisplay(err.to_string())
    }
}

#[cfg(target_os = "linux")]
impl From<x11rb::errors::ConnectionError> for InputError {
    fn from(err: x11rb::errors::ConnectionError) -> Self {
        InputError::PlatformError(err.to_string())
    }
}

#[cfg(target_os = "linux")]
impl From<x11rb::errors::ReplyError> for InputError {
    fn from(err: x11rb::errors::ReplyError) -> Self {
        InputError::PlatformError(err.to_string())
    }
}

#[cfg(target_os = "windows")]
impl From<::windows::core::Error> for InputError {
    fn from(err: ::windows::core::Error) -> Self {
        InputError::PlatformError(err.to_string())
    }
}

/// Production driver backed by the OS input facilities
pub struct SystemInput;

impl SystemInput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputDriver for SystemInput {
    fn scroll(&mut self, amount: i32) -> Result<(), InputError> {
        debug!("Scrolling by {}px", amount);

        #[cfg(target_os = "macos")]
        mouse::macos::scroll(amount)?;

        #[cfg(target_os = "windows")]
        mouse::windows::scroll(amount)?;

        #[cfg(target_os = "linux")]
        mouse::linux::scroll(amount)?;

        Ok(())
    }

    fn send_key(&mut self, key: Key) -> Result<(), InputError> {
        debug!("Pressing key: {:?}", key);

        #[cfg(target_os = "macos")]
        keyboard::macos::press_key(key)?;

        #[cfg(target_os = "windows")]
        keyboard::windows::press_key(key)?;

        #[cfg(target_os = "linux")]
        keyboard::linux::press_key(key)?;

        Ok(())
    }

    fn move_cursor(&mut self, x: i32, y: i32) -> Result<(), InputError> {
        debug!("Moving cursor to ({}, {})", x, y);

        #[cfg(target_os = "macos")]
        mouse::macos::move_cursor(x, y)?;

        #[cfg(target_os = "windows")]
        mouse::windows::move_cursor(x, y)?;

        #[cfg(target_os = "linux")]
        mouse::linux::move_cursor(x, y)?;

        Ok(())
    }

    fn click(&mut self) -> Result<(), InputError> {
        debug!("Clicking left mouse button");

        #[cfg(target_os = "macos")]
        mouse::macos::click()?;

        #[cfg(target_os = "windows")]
        mouse::windows::click()?;

        #[cfg(target_os = "linux")]
        mouse::linux::click()?;

        Ok(())
    }
}
