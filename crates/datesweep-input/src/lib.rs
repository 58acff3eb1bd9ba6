//! # datesweep-input
//!
//! Pointer and cancellation backends for the datesweep workflow.
//!
//! - [`LogActuator`]: logs clicks instead of performing them (dry runs,
//!   coordinate calibration); available on every platform
//! - `macos::CoreGraphicsActuator`: posts real mouse events through Core
//!   Graphics
//! - `macos::KeySensor` / `macos::FailSafeCorner`: cancel while a key is held
//!   or when the pointer is pushed into a screen corner
//! - `win32::SendInputActuator`, `win32::KeySensor`, `win32::FailSafeCorner`:
//!   the same trio on Windows
//!
//! [`native_backend`] picks the real backend for the current platform.

#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(windows)]
pub mod win32;

use datesweep_core::config::CancelConfig;
use datesweep_core::{AnySensor, InputError, PointerActuator, ScreenPoint};
use tracing::info;

/// Records clicks in the log and in memory without moving the pointer
#[derive(Debug, Default)]
pub struct LogActuator {
    clicks: Vec<ScreenPoint>,
}

impl LogActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every point clicked so far
    pub fn clicks(&self) -> &[ScreenPoint] {
        &self.clicks
    }
}

impl PointerActuator for LogActuator {
    fn click_at(&mut self, point: ScreenPoint) -> Result<(), InputError> {
        info!(x = point.x, y = point.y, "dry run: click");
        self.clicks.push(point);
        Ok(())
    }
}

/// True when `(x, y)` touches two edges of a `width` x `height` display
pub(crate) fn at_screen_corner(x: f64, y: f64, width: f64, height: f64) -> bool {
    let left = x <= 0.0;
    let right = x >= width - 1.0;
    let top = y <= 0.0;
    let bottom = y >= height - 1.0;
    (left || right) && (top || bottom)
}

fn unknown_key(key: &str) -> InputError {
    InputError::Unavailable(format!("unknown cancel key '{key}'"))
}

/// Real pointer actuator and cancellation sensor for this platform
pub struct NativeBackend {
    pub actuator: Box<dyn PointerActuator>,
    pub sensor: AnySensor,
}

#[cfg(target_os = "macos")]
pub fn native_backend(cancel: &CancelConfig) -> Result<NativeBackend, InputError> {
    let key = macos::key_code(&cancel.key).ok_or_else(|| unknown_key(&cancel.key))?;

    let mut sensor = AnySensor::new().with(macos::KeySensor::new(key));
    if cancel.fail_safe {
        sensor = sensor.with(macos::FailSafeCorner::new()?);
    }
    Ok(NativeBackend {
        actuator: Box::new(macos::CoreGraphicsActuator::new()?),
        sensor,
    })
}

#[cfg(windows)]
pub fn native_backend(cancel: &CancelConfig) -> Result<NativeBackend, InputError> {
    let key = win32::key_code(&cancel.key).ok_or_else(|| unknown_key(&cancel.key))?;

    let mut sensor = AnySensor::new().with(win32::KeySensor::new(key));
    if cancel.fail_safe {
        sensor = sensor.with(win32::FailSafeCorner::new()?);
    }
    Ok(NativeBackend {
        actuator: Box::new(win32::SendInputActuator::new()),
        sensor,
    })
}

#[cfg(not(any(target_os = "macos", windows)))]
pub fn native_backend(_cancel: &CancelConfig) -> Result<NativeBackend, InputError> {
    Err(InputError::Unavailable(format!(
        "no pointer backend for {}; use --dry-run",
        std::env::consts::OS
    )))
}
