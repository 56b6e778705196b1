//! Top-level window enumeration and activation
//!
//! Optional capability: not every environment can enumerate windows (Wayland,
//! macOS without screen-recording entitlements), so callers must check
//! `available()` and fall back to coordinate-based focusing when it is false.

use serde::{Deserialize, Serialize};

use crate::input::InputError;

/// Window information
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: String,
    pub title: String,
    pub bounds: (i32, i32, i32, i32), // x, y, width, height
    pub is_visible: bool,
    pub is_active: bool,
}

/// Window enumeration and activation seam
pub trait WindowControl: Send {
    /// Whether enumeration works in this environment at all
    fn available(&self) -> bool;

    /// Visible top-level windows, front-of-list first where the platform
    /// provides an ordering
    fn list(&mut self) -> Result<Vec<WindowInfo>, InputError>;

    /// Bring a window to the foreground
    fn activate(&mut self, window: &WindowInfo) -> Result<(), InputError>;
}

/// Production control backed by the platform window system
pub struct SystemWindows;

impl SystemWindows {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemWindows {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowControl for SystemWindows {
    fn available(&self) -> bool {
        #[cfg(target_os = "windows")]
        return true;

        #[cfg(target_os = "linux")]
        return platform::available();

        #[cfg(not(any(target_os = "windows", target_os = "linux")))]
        return false;
    }

    fn list(&mut self) -> Result<Vec<WindowInfo>, InputError> {
        #[cfg(any(target_os = "windows", target_os = "linux"))]
        return platform::list();

        #[cfg(not(any(target_os = "windows", target_os = "linux")))]
        Err(InputError::PlatformError(
            "Window enumeration not available on this platform".to_string(),
        ))
    }

    fn activate(&mut self, window: &WindowInfo) -> Result<(), InputError> {
        #[cfg(any(target_os = "windows", target_os = "linux"))]
        return platform::activate(window);

        #[cfg(not(any(target_os = "windows", target_os = "linux")))]
        {
            let _ = window;
            Err(InputError::PlatformError(
                "Window activation not available on this platform".to_string(),
            ))
        }
    }
}

// ============================================================================
// Windows Implementation
// ============================================================================
#[cfg(target_os = "windows")]
mod platform {
    use super::*;
    use ::windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT, TRUE};
    use ::windows::Win32::UI::WindowsAndMessaging::{
        EnumWindows, GetForegroundWindow, GetWindowRect, GetWindowTextLengthW, GetWindowTextW,
        IsWindowVisible, SetForegroundWindow,
    };

    unsafe extern "system" fn collect_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
        let found = &mut *(lparam.0 as *mut Vec<WindowInfo>);

        if !IsWindowVisible(hwnd).as_bool() {
            return TRUE;
        }
        let len = GetWindowTextLengthW(hwnd);
        if len == 0 {
            return TRUE;
        }
        let mut buf = vec![0u16; len as usize + 1];
        let copied = GetWindowTextW(hwnd, &mut buf);
        if copied == 0 {
            return TRUE;
        }
        let title = String::from_utf16_lossy(&buf[..copied as usize]);

        let mut rect = RECT::default();
        if GetWindowRect(hwnd, &mut rect).is_err() {
            return TRUE;
        }

        found.push(WindowInfo {
            id: (hwnd.0 as isize).to_string(),
            title,
            bounds: (
                rect.left,
                rect.top,
                rect.right - rect.left,
                rect.bottom - rect.top,
            ),
            is_visible: true,
            is_active: hwnd == GetForegroundWindow(),
        });
        TRUE
    }

    pub fn list() -> Result<Vec<WindowInfo>, InputError> {
        let mut found: Vec<WindowInfo> = Vec::new();
        unsafe {
            EnumWindows(
                Some(collect_window),
                LPARAM(&mut found as *mut Vec<WindowInfo> as isize),
            )?;
        }
        Ok(found)
    }

    pub fn activate(window: &WindowInfo) -> Result<(), InputError> {
        let raw: isize = window
            .id
            .parse()
            .map_err(|_| InputError::WindowNotFound(window.title.clone()))?;
        unsafe {
            let _ = SetForegroundWindow(HWND(raw as *mut core::ffi::c_void));
        }
        Ok(())
    }
}

// ============================================================================
// Linux Implementation
// ============================================================================
#[cfg(target_os = "linux")]
mod platform {
    use super::*;
    use x11rb::connection::Connection;
    use x11rb::protocol::xproto::{
        Atom, AtomEnum, ClientMessageEvent, ConnectionExt, EventMask, MapState,
    };
    use x11rb::rust_connection::RustConnection;

    pub fn available() -> bool {
        x11rb::connect(None).is_ok()
    }

    fn intern(conn: &RustConnection, name: &[u8]) -> Result<Atom, InputError> {
        Ok(conn.intern_atom(false, name)?.reply()?.atom)
    }

    /// _NET_WM_NAME (UTF-8) preferred, ICCCM WM_NAME fallback
    fn read_title(
        conn: &RustConnection,
        window: u32,
        net_wm_name: Atom,
        utf8_string: Atom,
    ) -> String {
        if let Ok(cookie) = conn.get_property(false, window, net_wm_name, utf8_string, 0, 1024) {
            if let Ok(reply) = cookie.reply() {
                if !reply.value.is_empty() {
                    return String::from_utf8_lossy(&reply.value).into_owned();
                }
            }
        }
        if let Ok(cookie) =
            conn.get_property(false, window, AtomEnum::WM_NAME, AtomEnum::ANY, 0, 1024)
        {
            if let Ok(reply) = cookie.reply() {
                return String::from_utf8_lossy(&reply.value).into_owned();
            }
        }
        String::new()
    }

    pub fn list() -> Result<Vec<WindowInfo>, InputError> {
        let (conn, screen_num) = x11rb::connect(None)?;
        let root = conn.setup().roots[screen_num].root;

        let client_list = intern(&conn, b"_NET_CLIENT_LIST")?;
        let net_wm_name = intern(&conn, b"_NET_WM_NAME")?;
        let utf8_string = intern(&conn, b"UTF8_STRING")?;
        let net_active = intern(&conn, b"_NET_ACTIVE_WINDOW")?;

        let active = conn
            .get_property(false, root, net_active, AtomEnum::WINDOW, 0, 1)?
            .reply()
            .ok()
            .and_then(|reply| reply.value32().and_then(|mut values| values.next()));

        let reply = conn
            .get_property(false, root, client_list, AtomEnum::WINDOW, 0, u32::MAX)?
            .reply()?;
        let ids: Vec<u32> = reply
            .value32()
            .map(|values| values.collect())
            .unwrap_or_default();

        let mut found = Vec::new();
        for window in ids {
            // Windows can vanish mid-enumeration; skip rather than fail
            let attrs = match conn.get_window_attributes(window)?.reply() {
                Ok(attrs) => attrs,
                Err(_) => continue,
            };
            if attrs.map_state != MapState::VIEWABLE {
                continue;
            }
            let geom = match conn.get_geometry(window)?.reply() {
                Ok(geom) => geom,
                Err(_) => continue,
            };
            let coords = match conn.translate_coordinates(window, root, 0, 0)?.reply() {
                Ok(coords) => coords,
                Err(_) => continue,
            };

            found.push(WindowInfo {
                id: window.to_string(),
                title: read_title(&conn, window, net_wm_name, utf8_string),
                bounds: (
                    coords.dst_x as i32,
                    coords.dst_y as i32,
                    geom.width as i32,
                    geom.height as i32,
                ),
                is_visible: true,
                is_active: active == Some(window),
            });
        }
        Ok(found)
    }

    pub fn activate(window: &WindowInfo) -> Result<(), InputError> {
        let id: u32 = window
            .id
            .parse()
            .map_err(|_| InputError::WindowNotFound(window.title.clone()))?;
        let (conn, screen_num) = x11rb::connect(None)?;
        let root = conn.setup().roots[screen_num].root;
        let net_active = intern(&conn, b"_NET_ACTIVE_WINDOW")?;

        // EWMH activation request; data[0] = 1 marks an application source
        let event =
            ClientMessageEvent::new(32, id, net_active, [1, x11rb::CURRENT_TIME, 0, 0, 0]);
        conn.send_event(
            false,
            root,
            EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
            event,
        )?;
        conn.flush()?;
        Ok(())
    }
}
