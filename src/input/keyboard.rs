//! Keyboard Control Implementation
//!
//! Cross-platform keyboard automation:
//! - macOS: CoreGraphics CGEvent
//! - Windows: SendInput with VK codes
//! - Linux: X11 xtest

use super::{InputError, Key};

// ============================================================================
// macOS Implementation
// ============================================================================
#[cfg(target_os = "macos")]
pub mod macos {
    use super::*;
    use core_graphics::event::{CGEvent, CGEventTapLocation, CGKeyCode};
    use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};

    pub fn press_key(key: Key) -> Result<(), InputError> {
        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| InputError::PlatformError("CGEventSource creation failed".to_string()))?;
        let code = map_key_to_keycode(key);

        let down = CGEvent::new_keyboard_event(source.clone(), code, true)
            .map_err(|_| InputError::PlatformError("CGEvent creation failed".to_string()))?;
        down.post(CGEventTapLocation::HID);

        let up = CGEvent::new_keyboard_event(source, code, false)
            .map_err(|_| InputError::PlatformError("CGEvent creation failed".to_string()))?;
        up.post(CGEventTapLocation::HID);

        Ok(())
    }

    // ANSI-layout kVK values
    fn map_key_to_keycode(key: Key) -> CGKeyCode {
        match key {
            Key::A => 0,
            Key::B => 11,
            Key::C => 8,
            Key::D => 2,
            Key::E => 14,
            Key::F => 3,
            Key::G => 5,
            Key::H => 4,
            Key::I => 34,
            Key::J => 38,
            Key::K => 40,
            Key::L => 37,
            Key::M => 46,
            Key::N => 45,
            Key::O => 31,
            Key::P => 35,
            Key::Q => 12,
            Key::R => 15,
            Key::S => 1,
            Key::T => 17,
            Key::U => 32,
            Key::V => 9,
            Key::W => 13,
            Key::X => 7,
            Key::Y => 16,
            Key::Z => 6,
            Key::Num0 => 29,
            Key::Num1 => 18,
            Key::Num2 => 19,
            Key::Num3 => 20,
            Key::Num4 => 21,
            Key::Num5 => 23,
            Key::Num6 => 22,
            Key::Num7 => 26,
            Key::Num8 => 28,
            Key::Num9 => 25,
            Key::Return => 36,
            Key::Escape => 53,
            Key::Backspace => 51,
            Key::Delete => 117,
            Key::Tab => 48,
            Key::Space => 49,
            Key::F1 => 122,
            Key::F2 => 120,
            Key::F3 => 99,
            Key::F4 => 118,
            Key::F5 => 96,
            Key::F6 => 97,
            Key::F7 => 98,
            Key::F8 => 100,
            Key::F9 => 101,
            Key::F10 => 109,
            Key::F11 => 103,
            Key::F12 => 111,
            Key::Home => 115,
            Key::End => 119,
            Key::PageUp => 116,
            Key::PageDown => 121,
            Key::Left => 123,
            Key::Right => 124,
            Key::Up => 126,
            Key::Down => 125,
            Key::Shift => 56,
            Key::Control => 59,
            Key::Alt => 58,
            Key::Command => 55,
        }
    }
}

// ============================================================================
// Windows Implementation
// ============================================================================
#[cfg(target_os = "windows")]
pub mod windows {
    use super::*;
    use ::windows::Win32::UI::Input::KeyboardAndMouse::{
        SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS,
        KEYEVENTF_KEYUP, VIRTUAL_KEY,
    };

    fn make_key_input(vk: VIRTUAL_KEY, flags: KEYBD_EVENT_FLAGS) -> INPUT {
        INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: vk,
                    wScan: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    pub fn press_key(key: Key) -> Result<(), InputError> {
        unsafe {
            let vk = map_key_to_vk(key);

            let down = make_key_input(vk, KEYBD_EVENT_FLAGS(0));
            SendInput(&[down], std::mem::size_of::<INPUT>() as i32);

            let up = make_key_input(vk, KEYEVENTF_KEYUP);
            SendInput(&[up], std::mem::size_of::<INPUT>() as i32);

            Ok(())
        }
    }

    fn map_key_to_vk(key: Key) -> VIRTUAL_KEY {
        use ::windows::Win32::UI::Input::KeyboardAndMouse::*;

        match key {
            Key::A => VK_A,
            Key::B => VK_B,
            Key::C => VK_C,
            Key::D => VK_D,
            Key::E => VK_E,
            Key::F => VK_F,
            Key::G => VK_G,
            Key::H => VK_H,
            Key::I => VK_I,
            Key::J => VK_J,
            Key::K => VK_K,
            Key::L => VK_L,
            Key::M => VK_M,
            Key::N => VK_N,
            Key::O => VK_O,
            Key::P => VK_P,
            Key::Q => VK_Q,
            Key::R => VK_R,
            Key::S => VK_S,
            Key::T => VK_T,
            Key::U => VK_U,
            Key::V => VK_V,
            Key::W => VK_W,
            Key::X => VK_X,
            Key::Y => VK_Y,
            Key::Z => VK_Z,
            Key::Num0 => VK_0,
            Key::Num1 => VK_1,
            Key::Num2 => VK_2,
            Key::Num3 => VK_3,
            Key::Num4 => VK_4,
            Key::Num5 => VK_5,
            Key::Num6 => VK_6,
            Key::Num7 => VK_7,
            Key::Num8 => VK_8,
            Key::Num9 => VK_9,
            Key::Return => VK_RETURN,
            Key::Escape => VK_ESCAPE,
            Key::Backspace => VK_BACK,
            Key::Delete => VK_DELETE,
            Key::Tab => VK_TAB,
            Key::Space => VK_SPACE,
            Key::F1 => VK_F1,
            Key::F2 => VK_F2,
            Key::F3 => VK_F3,
            Key::F4 => VK_F4,
            Key::F5 => VK_F5,
            Key::F6 => VK_F6,
            Key::F7 => VK_F7,
            Key::F8 => VK_F8,
            Key::F9 => VK_F9,
            Key::F10 => VK_F10,
            Key::F11 => VK_F11,
            Key::F12 => VK_F12,
            Key::Home => VK_HOME,
            Key::End => VK_END,
            Key::PageUp => VK_PRIOR,
            Key::PageDown => VK_NEXT,
            Key::Left => VK_LEFT,
            Key::Right => VK_RIGHT,
            Key::Up => VK_UP,
            Key::Down => VK_DOWN,
            Key::Shift => VK_SHIFT,
            Key::Control => VK_CONTROL,
            Key::Alt => VK_MENU,
            // Command maps to Control on Windows
            Key::Command => VK_CONTROL,
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

    pub fn press_key(key: Key) -> Result<(), InputError> {
        let (conn, screen_num) = x11rb::connect(None)?;
        let root = conn.setup().roots[screen_num].root;
        let keycode = map_key_to_keycode(key);

        conn.xtest_fake_input(
            x11rb::protocol::xproto::KEY_PRESS_EVENT,
            keycode,
            x11rb::CURRENT_TIME,
            root,
            0,
            0,
            0,
        )?;
        conn.flush()?;

        conn.xtest_fake_input(
            x11rb::protocol::xproto::KEY_RELEASE_EVENT,
            keycode,
            x11rb::CURRENT_TIME,
            root,
            0,
            0,
            0,
        )?;
        conn.flush()?;

        Ok(())
    }

    // Standard pc105 keycodes
    fn map_key_to_keycode(key: Key) -> u8 {
        match key {
            Key::A => 38,
            Key::B => 56,
            Key::C => 54,
            Key::D => 40,
            Key::E => 26,
            Key::F => 41,
            Key::G => 42,
            Key::H => 43,
            Key::I => 31,
            Key::J => 44,
            Key::K => 45,
            Key::L => 46,
            Key::M => 58,
            Key::N => 57,
            Key::O => 32,
            Key::P => 33,
            Key::Q => 24,
            Key::R => 27,
            Key::S => 39,
            Key::T => 28,
            Key::U => 30,
            Key::V => 55,
            Key::W => 25,
            Key::X => 53,
            Key::Y => 29,
            Key::Z => 52,
            Key::Num0 => 19,
            Key::Num1 => 10,
            Key::Num2 => 11,
            Key::Num3 => 12,
            Key::Num4 => 13,
            Key::Num5 => 14,
            Key::Num6 => 15,
            Key::Num7 => 16,
            Key::Num8 => 17,
            Key::Num9 => 18,
            Key::Return => 36,
            Key::Escape => 9,
            Key::Backspace => 22,
            Key::Delete => 119,
            Key::Tab => 23,
            Key::Space => 65,
            Key::F1 => 67,
            Key::F2 => 68,
            Key::F3 => 69,
            Key::F4 => 70,
            Key::F5 => 71,
            Key::F6 => 72,
            Key::F7 => 73,
            Key::F8 => 74,
            Key::F9 => 75,
            Key::F10 => 76,
            Key::F11 => 95,
            Key::F12 => 96,
            Key::Home => 110,
            Key::End => 115,
            Key::PageUp => 112,
            Key::PageDown => 117,
            Key::Left => 113,
            Key::Right => 114,
            Key::Up => 111,
            Key::Down => 116,
            Key::Shift => 50,
            Key::Control => 37,
            Key::Alt => 64,
            Key::Command => 133, // Super/Windows key
        }
    }
}
