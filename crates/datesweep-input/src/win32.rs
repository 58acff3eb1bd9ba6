//! Win32 backends for Windows.
//!
//! Coordinates are physical pixels of the primary monitor. Run datesweep
//! from a DPI-aware terminal or calibrate against the scaled positions.

use tracing::debug;
use windows_sys::Win32::Foundation::POINT;
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_LEFTDOWN,
    MOUSEEVENTF_LEFTUP, MOUSEINPUT, MOUSE_EVENT_FLAGS,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    GetCursorPos, GetSystemMetrics, SetCursorPos, SM_CXSCREEN, SM_CYSCREEN,
};

use datesweep_core::{CancelSensor, InputError, PointerActuator, ScreenPoint};

use crate::at_screen_corner;

/// Virtual-key code for a cancel key name
pub fn key_code(name: &str) -> Option<u16> {
    let code = match name.to_ascii_lowercase().as_str() {
        "escape" | "esc" => 0x1B,
        "space" => 0x20,
        "return" | "enter" => 0x0D,
        "tab" => 0x09,
        "delete" | "backspace" => 0x08,
        "f12" => 0x7B,
        _ => return None,
    };
    Some(code)
}

fn button(flags: MOUSE_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx: 0,
                dy: 0,
                mouseData: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

/// Moves the cursor and clicks with `SendInput`
#[derive(Debug, Default)]
pub struct SendInputActuator;

impl SendInputActuator {
    pub fn new() -> Self {
        Self
    }
}

impl PointerActuator for SendInputActuator {
    #[allow(unsafe_code)]
    fn click_at(&mut self, point: ScreenPoint) -> Result<(), InputError> {
        // SAFETY: plain value arguments; no pointers involved.
        let moved = unsafe { SetCursorPos(point.x, point.y) };
        if moved == 0 {
            return Err(InputError::EventFailed {
                event: "cursor move",
                point,
            });
        }

        let inputs = [button(MOUSEEVENTF_LEFTDOWN), button(MOUSEEVENTF_LEFTUP)];
        // SAFETY: `inputs` is a live array of `inputs.len()` INPUT structs and
        // the size argument matches the element type.
        let sent = unsafe {
            SendInput(
                inputs.len() as u32,
                inputs.as_ptr(),
                std::mem::size_of::<INPUT>() as i32,
            )
        };
        if sent as usize != inputs.len() {
            return Err(InputError::EventFailed {
                event: "mouse click",
                point,
            });
        }
        Ok(())
    }
}

/// Cancelled while the given key is physically held down
pub struct KeySensor {
    key: u16,
}

impl KeySensor {
    pub fn new(key: u16) -> Self {
        Self { key }
    }
}

impl CancelSensor for KeySensor {
    #[allow(unsafe_code)]
    fn is_cancelled(&self) -> bool {
        // SAFETY: plain query of global keyboard state; no pointers involved.
        let state = unsafe { GetAsyncKeyState(i32::from(self.key)) };
        // High bit set while the key is down
        state < 0
    }
}

/// Cancelled when the cursor sits in any corner of the primary monitor
pub struct FailSafeCorner {
    width: f64,
    height: f64,
}

impl FailSafeCorner {
    #[allow(unsafe_code)]
    pub fn new() -> Result<Self, InputError> {
        // SAFETY: metric queries take and return plain integers.
        let (width, height) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        if width <= 0 || height <= 0 {
            return Err(InputError::Unavailable("cannot read primary monitor size".into()));
        }
        Ok(Self {
            width: f64::from(width),
            height: f64::from(height),
        })
    }
}

impl CancelSensor for FailSafeCorner {
    #[allow(unsafe_code)]
    fn is_cancelled(&self) -> bool {
        let mut cursor = POINT { x: 0, y: 0 };
        // SAFETY: `cursor` is a valid, writable POINT for the duration of the call.
        if unsafe { GetCursorPos(&mut cursor) } == 0 {
            return false;
        }
        let hit = at_screen_corner(
            f64::from(cursor.x),
            f64::from(cursor.y),
            self.width,
            self.height,
        );
        if hit {
            debug!("cursor in screen corner");
        }
        hit
    }
}
