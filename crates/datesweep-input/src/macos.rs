//! Core Graphics backends for macOS.
//!
//! Posting synthetic events and reading key state both require the
//! Accessibility permission for the terminal running datesweep.

use core_graphics::display::CGDisplay;
use core_graphics::event::{CGEvent, CGEventTapLocation, CGEventType, CGMouseButton};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use core_graphics::geometry::CGPoint;
use tracing::debug;

use datesweep_core::{CancelSensor, InputError, PointerActuator, ScreenPoint};

use crate::at_screen_corner;

/// `kCGEventSourceStateHIDSystemState`
const HID_SYSTEM_STATE: i32 = 1;

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventSourceKeyState(state_id: i32, key: u16) -> bool;
}

/// Virtual key code for a cancel key name
pub fn key_code(name: &str) -> Option<u16> {
    let code = match name.to_ascii_lowercase().as_str() {
        "escape" | "esc" => 0x35,
        "space" => 0x31,
        "return" | "enter" => 0x24,
        "tab" => 0x30,
        "delete" | "backspace" => 0x33,
        "f12" => 0x6F,
        _ => return None,
    };
    Some(code)
}

fn event_source() -> Result<CGEventSource, InputError> {
    CGEventSource::new(CGEventSourceStateID::HIDSystemState)
        .map_err(|()| InputError::Unavailable("cannot create CoreGraphics event source".into()))
}

/// Moves the pointer and clicks with synthetic HID events
pub struct CoreGraphicsActuator {
    source: CGEventSource,
}

impl CoreGraphicsActuator {
    pub fn new() -> Result<Self, InputError> {
        Ok(Self {
            source: event_source()?,
        })
    }

    fn post(&self, kind: CGEventType, event: &'static str, point: ScreenPoint) -> Result<(), InputError> {
        let location = CGPoint::new(f64::from(point.x), f64::from(point.y));
        let ev = CGEvent::new_mouse_event(self.source.clone(), kind, location, CGMouseButton::Left)
            .map_err(|()| InputError::EventFailed { event, point })?;
        ev.post(CGEventTapLocation::HID);
        Ok(())
    }
}

impl PointerActuator for CoreGraphicsActuator {
    fn click_at(&mut self, point: ScreenPoint) -> Result<(), InputError> {
        self.post(CGEventType::MouseMoved, "mouse move", point)?;
        self.post(CGEventType::LeftMouseDown, "mouse down", point)?;
        self.post(CGEventType::LeftMouseUp, "mouse up", point)?;
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
        unsafe { CGEventSourceKeyState(HID_SYSTEM_STATE, self.key) }
    }
}

/// Cancelled when the pointer sits in any corner of the main display
pub struct FailSafeCorner {
    source: CGEventSource,
    width: f64,
    height: f64,
}

impl FailSafeCorner {
    pub fn new() -> Result<Self, InputError> {
        let bounds = CGDisplay::main().bounds();
        Ok(Self {
            source: event_source()?,
            width: bounds.size.width,
            height: bounds.size.height,
        })
    }
}

impl CancelSensor for FailSafeCorner {
    fn is_cancelled(&self) -> bool {
        match CGEvent::new(self.source.clone()) {
            Ok(ev) => {
                let p = ev.location();
                let hit = at_screen_corner(p.x, p.y, self.width, self.height);
                if hit {
                    debug!("pointer in screen corner");
                }
                hit
            }
            Err(()) => false,
        }
    }
}
