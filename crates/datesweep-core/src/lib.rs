//! # datesweep-core
//!
//! Core domain model for the datesweep export automation.
//!
//! This crate provides:
//! - Domain types: `ScreenPoint`, `DateRange`, `GridPosition`, `Config`
//! - The date-to-grid mapper for a Sunday-first month calendar widget
//! - The latest-file renamer for downloaded exports
//! - Capability traits: `PointerActuator`, `CancelSensor`, `Waiter`
//! - The workflow loop that ties them together
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use datesweep_core::grid::{grid_position, GridGeometry};
//! use datesweep_core::ScreenPoint;
//!
//! let geometry = GridGeometry::new(ScreenPoint::new(2397, 388), 33);
//! let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
//! let position = grid_position(date).unwrap();
//! assert_eq!((position.row, position.column), (1, 7));
//! assert_eq!(geometry.cell_point(position), Ok(ScreenPoint::new(2595, 388)));
//! ```

pub mod config;
pub mod grid;
pub mod input;
pub mod rename;
pub mod workflow;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

pub use config::{Config, ConfigError, ConfigIssue, Controls, IssueLevel, SettleMode, Timing};
pub use grid::{GridError, GridGeometry, GridPosition};
pub use input::{
    AnySensor, CancelSensor, CancelToken, Clicker, InputError, Interrupt, NoWait,
    PointerActuator, ThreadSleeper, Waiter,
};
pub use rename::{DownloadDir, RenameError, RenameOutcome};
pub use workflow::{plan, PlannedDay, RunOutcome, RunReport, Workflow, WorkflowError};

// ============================================================================
// Screen Coordinates
// ============================================================================

/// Absolute pixel position on screen
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for ScreenPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ============================================================================
// Date Range
// ============================================================================

/// Inclusive range of calendar dates.
///
/// `start <= end` is expected but not enforced; an inverted range simply
/// yields no days.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// True when the range contains no days
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Number of days in the range (zero for an inverted range)
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.end - self.start).num_days() as usize + 1
        }
    }

    /// Iterate every day from start to end, inclusive
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        std::iter::successors(Some(self.start), |d| d.succ_opt()).take_while(move |d| *d <= end)
    }
}

/// Saturday and Sunday are weekend days; nothing is exported for them.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

// ============================================================================
// Tests
// ============================================================================
