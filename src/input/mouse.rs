//! Mouse Control Implementation
//!
//! Cross-platform mouse automation:
//! - macOS: CoreGraphics CGEvent
//! - Windows: SendInput
//! - Linux: X11 xtest

use super::InputError;

/// Wheel units per notch; pixel amounts are folded into notches where the
/// platform scrolls in discrete clicks
const WHEEL_NOTCH: i32 = 120;

// ============================================================================
// macOS Implementation
// ============================================================================
#[cfg(target_os = "macos")]
pub mod macos {
    use super::*;
    use core_graphics::event::{
        CGEvent, CGEventTapLocation, CGEventType, CGMouseButton, ScrollEventUnit,
    };
    use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
    use core_graphics::geometry::CGPoint;

    fn event_source() -> Result<CGEventSource, InputError> {
        CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| InputError::PlatformError("CGEventSource creation failed".to_string()))
    }

    pub fn scroll(amount: i32) -> Result<(), InputError> {
        let source = event_source()?;
        // Pixel-unit wheel event carries the whole magnitude at once
        let event = CGEvent::new_scroll_event(source, ScrollEventUnit::PIXEL, 1, amount, 0, 0)
            .map_err(|_| InputError::PlatformError("CGEvent creation failed".to_string()))?;
        event.post(CGEventTapLocation::HID);
        Ok(())
    }

    pub fn move_cursor(x: i32, y: i32) -> Result<(), InputError> {
        let source = event_source()?;
        let point = CGPoint::new(x as f64, y as f64);
        let event =
            CGEvent::new_mouse_event(source, CGEventType::MouseMoved, point, CGMouseButton::Left)
                .map_err(|_| InputError::PlatformError("CGEvent creation failed".to_string()))?;
        event.post(CGEventTapLocation::HID);
        Ok(())
    }

    pub fn click() -> Result<(), InputError> {
        let source = event_source()?;
        let position = CGEvent::new(source.clone())
            .map_err(|_| InputError::PlatformError("CGEvent creation failed".to_string()))?
            .location();

        let down = CGEvent::new_mouse_event(
            source.clone(),
            CGEventType::LeftMouseDown,
            position,
            CGMouseButton::Left,
        )
        .map_err(|_| InputError::PlatformError("CGEvent creation failed".to_string()))?;
        down.post(CGEventTapLocation::HID);

        std::thread::sleep(std::time::Duration::from_millis(50));

        let up = CGEvent::new_mouse_event(
            source,
            CGEventType::LeftMouseUp,
            position,
            CGMouseButton::Left,
        )
        .map_err(|_| InputError::PlatformError("CGEvent creation failed".to_string()))?;
        up.post(CGEventTapLocation::HID);

        Ok(())
    }
}

// ============================================================================
// Windows Implementation
// ============================================================================
#[cfg(target_os = "windows")]
pub mod windows {
    use super::*;
    use ::windows::Win32::UI::Input::KeyboardAndMouse::{
        SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
        MOUSEEVENTF_WHEEL, MOUSEINPUT, MOUSE_EVENT_FLAGS,
    };
    use ::windows::Win32::UI::WindowsAndMessaging::SetCursorPos;

    /// Helper to create a mouse INPUT struct
    fn make_mouse_input(dx: i32, dy: i32, mouse_data: u32, flags: MOUSE_EVENT_FLAGS) -> INPUT {
        INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx,
                    dy,
                    mouseData: mouse_data,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    pub fn scroll(amount: i32) -> Result<(), InputError> {
        unsafe {
            // The wheel delta field is signed; one event carries the whole
            // magnitude (120 per detent, fractional deltas are honored by
            // scrolling surfaces)
            let input = make_mouse_input(0, 0, amount as u32, MOUSEEVENTF_WHEEL);
            SendInput(&[input], std::mem::size_of::<INPUT>() as i32);
            Ok(())
        }
    }

    pub fn move_cursor(x: i32, y: i32) -> Result<(), InputError> {
        unsafe {
            SetCursorPos(x, y)?;
            Ok(())
        }
    }

    pub fn click() -> Result<(), InputError> {
        unsafe {
            // Mouse down
            let down_input = make_mouse_input(0, 0, 0, MOUSEEVENTF_LEFTDOWN);
            SendInput(&[down_input], std::mem::size_of::<INPUT>() as i32);

            // Small delay
            std::thread::sleep(std::time::Duration::from_millis(50));

            // Mouse up
            let up_input = make_mouse_input(0, 0, 0, MOUSEEVENTF_LEFTUP);
            SendInput(&[up_input], std::mem::size_of::<INPUT>() as i32);

            Ok(())
        }
    }
}

// ============================================================================
// Linux Implementation
// ============================================================================
#[cfg(target_os = "linux")]
pub mod linux {
    use super::*;
    use x11rb::connection::Connection;
    use x11rb::protocol::xtest::ConnectionExt as XtestConnectionExt;

    pub fn scroll(amount: i32) -> Result<(), InputError> {
        let (conn, screen_num) = x11rb::connect(None)?;
        let root = conn.setup().roots[screen_num].root;

        // X has no pixel wheel; buttons 4/5 scroll one notch per click
        let button: u8 = if amount < 0 { 5 } else { 4 };
        let notches = (amount.unsigned_abs() as i32 / WHEEL_NOTCH).max(1);

        for _ in 0..notches {
            conn.xtest_fake_input(
                x11rb::protocol::xproto::BUTTON_PRESS_EVENT,
                button,
                x11rb::CURRENT_TIME,
                root,
                0,
                0,
                0,
            )?;
            conn.xtest_fake_input(
                x11rb::protocol::xproto::BUTTON_RELEASE_EVENT,
                button,
                x11rb::CURRENT_TIME,
                root,
                0,
                0,
                0,
            )?;
        }

        conn.flush()?;

        Ok(())
    }

    pub fn move_cursor(x: i32, y: i32) -> Result<(), InputError> {
        let (conn, screen_num) = x11rb::connect(None)?;
        let root = conn.setup().roots[screen_num].root;

        conn.xtest_fake_input(
            x11rb::protocol::xproto::MOTION_NOTIFY_EVENT,
            0, // detail (unused for motion)
            x11rb::CURRENT_TIME,
            root,
            x as i16,
            y as i16,
            0,
        )?;

        conn.flush()?;

        Ok(())
    }

    pub fn click() -> Result<(), InputError> {
        let (conn, screen_num) = x11rb::connect(None)?;
        let root = conn.setup().roots[screen_num].root;

        conn.xtest_fake_input(
            x11rb::protocol::xproto::BUTTON_PRESS_EVENT,
            1, // left button
            x11rb::CURRENT_TIME,
            root,
            0,
            0,
            0,
        )?;
        conn.flush()?;

        std::thread::sleep(std::time::Duration::from_millis(50));

        conn.xtest_fake_input(
            x11rb::protocol::xproto::BUTTON_RELEASE_EVENT,
            1,
            x11rb::CURRENT_TIME,
            root,
            0,
            0,
            0,
        )?;
        conn.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notch_conversion_never_drops_a_scroll() {
        // Sub-notch magnitudes still produce one click on notch platforms
        let small: i32 = 40;
        assert_eq!((small.unsigned_abs() as i32 / WHEEL_NOTCH).max(1), 1);

        let step: i32 = -1300;
        assert_eq!((step.unsigned_abs() as i32 / WHEEL_NOTCH).max(1), 10);
    }
}
