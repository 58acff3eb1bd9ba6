//! Capabilities the workflow needs from the outside world.
//!
//! - [`PointerActuator`]: moves the pointer and clicks
//! - [`CancelSensor`]: reports a user request to stop
//! - [`Waiter`]: suspends execution between steps
//!
//! [`Clicker`] combines the three into the single click primitive used by
//! the workflow: check for cancellation, click, then pause.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::ScreenPoint;

// ============================================================================
// Traits
// ============================================================================

/// Pointer move-and-click primitive
pub trait PointerActuator {
    /// Move the pointer to `point` and click the primary button
    fn click_at(&mut self, point: ScreenPoint) -> Result<(), InputError>;
}

/// Source of user cancellation requests
pub trait CancelSensor {
    fn is_cancelled(&self) -> bool;
}

/// Suspension strategy between workflow steps
pub trait Waiter {
    /// Suspend for the full duration
    fn pause(&self, duration: Duration);

    /// Poll `condition` every `interval` until it holds or `timeout` has
    /// elapsed. Returns whether the condition was met.
    fn wait_until(
        &self,
        timeout: Duration,
        interval: Duration,
        condition: &mut dyn FnMut() -> bool,
    ) -> bool {
        let interval = interval.max(Duration::from_millis(1));
        let mut waited = Duration::ZERO;
        loop {
            if condition() {
                return true;
            }
            if waited >= timeout {
                return false;
            }
            let step = interval.min(timeout - waited);
            self.pause(step);
            waited += step;
        }
    }
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("input backend unavailable: {0}")]
    Unavailable(String),

    #[error("failed to post {event} event at {point}")]
    EventFailed {
        event: &'static str,
        point: ScreenPoint,
    },
}

/// Why a click step did not complete
#[derive(Debug, Error)]
pub enum Interrupt {
    #[error("cancellation requested")]
    Cancelled,

    #[error(transparent)]
    Input(#[from] InputError),
}

// ============================================================================
// Sensors
// ============================================================================

/// Shared cancellation flag.
///
/// Clones observe the same flag, so one copy can be handed to a signal
/// handler or test harness while the workflow polls another.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl CancelSensor for CancelToken {
    fn is_cancelled(&self) -> bool {
        CancelToken::is_cancelled(self)
    }
}

/// Cancelled as soon as any of its sensors is
#[derive(Default)]
pub struct AnySensor {
    sensors: Vec<Box<dyn CancelSensor>>,
}

impl AnySensor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sensor: impl CancelSensor + 'static) -> Self {
        self.sensors.push(Box::new(sensor));
        self
    }

}

impl CancelSensor for AnySensor {
    fn is_cancelled(&self) -> bool {
        self.sensors.iter().any(|s| s.is_cancelled())
    }
}

// ============================================================================
// Waiters
// ============================================================================

/// Blocks the current thread
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleeper;

impl Waiter for ThreadSleeper {
    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Never waits; `wait_until` checks its condition exactly once
#[derive(Clone, Copy, Debug, Default)]
pub struct NoWait;

impl Waiter for NoWait {
    fn pause(&self, _duration: Duration) {}

    fn wait_until(
        &self,
        _timeout: Duration,
        _interval: Duration,
        condition: &mut dyn FnMut() -> bool,
    ) -> bool {
        condition()
    }
}

// ============================================================================
// Clicker
// ============================================================================

/// Cancellation-aware click primitive with a fixed post-click delay
pub struct Clicker<'a> {
    actuator: &'a mut dyn PointerActuator,
    sensor: &'a dyn CancelSensor,
    waiter: &'a dyn Waiter,
    delay: Duration,
    clicks: usize,
}

impl<'a> Clicker<'a> {
    pub fn new(
        actuator: &'a mut dyn PointerActuator,
        sensor: &'a dyn CancelSensor,
        waiter: &'a dyn Waiter,
        delay: Duration,
    ) -> Self {
        Self {
            actuator,
            sensor,
            waiter,
            delay,
            clicks: 0,
        }
    }

    /// Fail with [`Interrupt::Cancelled`] if the sensor reports a stop
    pub fn checkpoint(&self) -> Result<(), Interrupt> {
        if self.sensor.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        Ok(())
    }

    /// Click with the default post-click delay
    pub fn click(&mut self, point: ScreenPoint) -> Result<(), Interrupt> {
        self.click_with_delay(point, self.delay)
    }

    pub fn click_with_delay(&mut self, point: ScreenPoint, delay: Duration) -> Result<(), Interrupt> {
        self.checkpoint()?;
        debug!(x = point.x, y = point.y, "click");
        self.actuator.click_at(point)?;
        self.clicks += 1;
        self.waiter.pause(delay);
        Ok(())
    }

    pub fn pause(&self, duration: Duration) {
        self.waiter.pause(duration);
    }

    /// Poll `condition` like [`Waiter::wait_until`], giving up early with
    /// [`Interrupt::Cancelled`] as soon as the sensor reports a stop.
    pub fn wait_until(
        &self,
        timeout: Duration,
        interval: Duration,
        condition: &mut dyn FnMut() -> bool,
    ) -> Result<bool, Interrupt> {
        let mut cancelled = false;
        let met = self.waiter.wait_until(timeout, interval, &mut || {
            if self.sensor.is_cancelled() {
                cancelled = true;
                return true;
            }
            condition()
        });
        if cancelled {
            return Err(Interrupt::Cancelled);
        }
        Ok(met)
    }

    /// Clicks performed so far
    pub fn clicks(&self) -> usize {
        self.clicks
    }
}
