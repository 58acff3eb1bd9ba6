//! Date-to-grid mapping for a Sunday-first month calendar widget.
//!
//! The date picker renders one month as rows of weeks. Column 1 is Sunday,
//! column 7 is Saturday, and a month spans four to six rows. Screen
//! coordinates of a cell follow a linear layout:
//!
//! ```text
//! x = base_x + (column - 1) * step
//! y = base_y + (row - 1) * step
//! ```

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ScreenPoint;

/// Maximum number of week rows a month can occupy
pub const GRID_ROWS: u32 = 6;

/// Days per week row
pub const GRID_COLUMNS: u32 = 7;

/// One week row; `None` marks a cell outside the month
pub type Week = [Option<u32>; 7];

/// One-based location of a date inside the month grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPosition {
    /// Week index, 1..=6
    pub row: u32,
    /// Day-of-week index, 1 = Sunday ..= 7 = Saturday
    pub column: u32,
}

impl GridPosition {
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("date {0} not found in its month grid")]
    DateNotInGrid(NaiveDate),

    #[error("grid step {step} puts row {row}, column {column} outside the screen coordinate range")]
    CoordinateOverflow { row: u32, column: u32, step: i32 },
}

/// Number of days in the given month, or `None` for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((next - first).num_days() as u32)
}

/// Build the Sunday-first week rows of a month.
///
/// Days before the 1st and after the last day are `None`. Returns an empty
/// grid for an invalid month.
pub fn month_calendar(year: i32, month: u32) -> Vec<Week> {
    let (Some(first), Some(last_day)) = (
        NaiveDate::from_ymd_opt(year, month, 1),
        days_in_month(year, month),
    ) else {
        return Vec::new();
    };

    let lead = first.weekday().num_days_from_sunday() as usize;
    let mut weeks = Vec::with_capacity(GRID_ROWS as usize);
    let mut week: Week = [None; 7];
    let mut slot = lead;

    for day in 1..=last_day {
        week[slot] = Some(day);
        slot += 1;
        if slot == GRID_COLUMNS as usize {
            weeks.push(week);
            week = [None; 7];
            slot = 0;
        }
    }
    if slot > 0 {
        weeks.push(week);
    }
    weeks
}

/// Locate a date in its month grid.
pub fn grid_position(date: NaiveDate) -> Result<GridPosition, GridError> {
    let weeks = month_calendar(date.year(), date.month());
    let day = date.day();

    for (row_idx, week) in weeks.iter().enumerate() {
        if let Some(col_idx) = week.iter().position(|cell| *cell == Some(day)) {
            return Ok(GridPosition::new(row_idx as u32 + 1, col_idx as u32 + 1));
        }
    }
    Err(GridError::DateNotInGrid(date))
}

/// Signed number of calendar months from `from` to `to`.
pub fn month_offset(from: NaiveDate, to: NaiveDate) -> i32 {
    let key = |d: NaiveDate| d.year() * 12 + d.month0() as i32;
    key(to) - key(from)
}

// ============================================================================
// Screen Geometry
// ============================================================================

/// Screen layout of the calendar grid: the row 1 / column 1 cell and the
/// pixel distance between neighbouring cells (same for both axes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridGeometry {
    pub base: ScreenPoint,
    pub step: i32,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            base: ScreenPoint::new(2397, 388),
            step: 33,
        }
    }
}

impl GridGeometry {
    pub const fn new(base: ScreenPoint, step: i32) -> Self {
        Self { base, step }
    }

    /// Derive the grid base from one known cell.
    ///
    /// `anchor` is the measured screen position of `date`'s cell; the base
    /// is moved back by the cell's row and column offsets.
    pub fn from_anchor(date: NaiveDate, anchor: ScreenPoint, step: i32) -> Result<Self, GridError> {
        let pos = grid_position(date)?;
        let err = || overflow(pos, step);
        let x = cell_offset(pos.column, step)
            .and_then(|dx| anchor.x.checked_sub(dx))
            .ok_or_else(err)?;
        let y = cell_offset(pos.row, step)
            .and_then(|dy| anchor.y.checked_sub(dy))
            .ok_or_else(err)?;
        Ok(Self {
            base: ScreenPoint::new(x, y),
            step,
        })
    }

    pub fn cell_point(&self, pos: GridPosition) -> Result<ScreenPoint, GridError> {
        let err = || overflow(pos, self.step);
        let x = cell_offset(pos.column, self.step)
            .and_then(|dx| self.base.x.checked_add(dx))
            .ok_or_else(err)?;
        let y = cell_offset(pos.row, self.step)
            .and_then(|dy| self.base.y.checked_add(dy))
            .ok_or_else(err)?;
        Ok(ScreenPoint::new(x, y))
    }

    /// Grid position and screen point of a date's cell
    pub fn locate(&self, date: NaiveDate) -> Result<(GridPosition, ScreenPoint), GridError> {
        let pos = grid_position(date)?;
        Ok((pos, self.cell_point(pos)?))
    }
}

/// Pixel offset of a one-based row or column index
fn cell_offset(index: u32, step: i32) -> Option<i32> {
    i32::try_from(index.checked_sub(1)?).ok()?.checked_mul(step)
}

fn overflow(pos: GridPosition, step: i32) -> GridError {
    GridError::CoordinateOverflow {
        row: pos.row,
        column: pos.column,
        step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2025, 2), Some(28));
        assert_eq!(days_in_month(1900, 2), Some(28));
        assert_eq!(days_in_month(2000, 2), Some(29));
        assert_eq!(days_in_month(2025, 12), Some(31));
        assert_eq!(days_in_month(2025, 13), None);
    }

    #[test]
    fn march_2025_starts_on_saturday() {
        let weeks = month_calendar(2025, 3);
        assert_eq!(weeks.len(), 6);
        assert_eq!(weeks[0], [None, None, None, None, None, None, Some(1)]);
        assert_eq!(
            weeks[5],
            [Some(30), Some(31), None, None, None, None, None]
        );
    }

    #[test]
    fn february_2015_fits_four_rows() {
        // 2015-02-01 is a Sunday and February 2015 has 28 days
        let weeks = month_calendar(2015, 2);
        assert_eq!(weeks.len(), 4);
        assert_eq!(weeks[0][0], Some(1));
        assert_eq!(weeks[3][6], Some(28));
    }

    #[test]
    fn invalid_month_yields_empty_grid() {
        assert!(month_calendar(2025, 0).is_empty());
        assert!(month_calendar(2025, 13).is_empty());
    }

    #[test]
    fn calibration_anchor_position() {
        // 2025-03-01 is a Saturday: first row, last column
        assert_eq!(grid_position(date(2025, 3, 1)).unwrap(), GridPosition::new(1, 7));
    }

    #[test]
    fn positions_of_september_2025() {
        // September 2025 starts on a Monday
        assert_eq!(grid_position(date(2025, 9, 1)).unwrap(), GridPosition::new(1, 2));
        assert_eq!(grid_position(date(2025, 9, 6)).unwrap(), GridPosition::new(1, 7));
        assert_eq!(grid_position(date(2025, 9, 7)).unwrap(), GridPosition::new(2, 1));
        assert_eq!(grid_position(date(2025, 9, 30)).unwrap(), GridPosition::new(5, 3));
    }

    #[test]
    fn every_day_of_a_year_is_in_bounds() {
        let geometry = GridGeometry::default();
        let mut d = date(2024, 1, 1);
        while d.year() == 2024 {
            let pos = grid_position(d).unwrap();
            assert!((1..=GRID_ROWS).contains(&pos.row), "{d}: row {}", pos.row);
            assert!((1..=GRID_COLUMNS).contains(&pos.column), "{d}: column {}", pos.column);
            assert_eq!(pos.column, d.weekday().num_days_from_sunday() + 1);

            let point = geometry.cell_point(pos).unwrap();
            assert_eq!(point.x, geometry.base.x + (pos.column as i32 - 1) * geometry.step);
            assert_eq!(point.y, geometry.base.y + (pos.row as i32 - 1) * geometry.step);
            d = d.succ_opt().unwrap();
        }
    }

    #[test]
    fn anchor_reproduces_default_base() {
        let geometry =
            GridGeometry::from_anchor(date(2025, 3, 1), ScreenPoint::new(2595, 388), 33).unwrap();
        assert_eq!(geometry, GridGeometry::default());
        assert_eq!(
            geometry.locate(date(2025, 3, 1)).unwrap(),
            (GridPosition::new(1, 7), ScreenPoint::new(2595, 388))
        );
    }

    #[test]
    fn oversized_step_is_an_error() {
        let anchor = GridGeometry::from_anchor(date(2025, 3, 1), ScreenPoint::new(0, 0), 1_000_000_000);
        assert_eq!(
            anchor,
            Err(GridError::CoordinateOverflow {
                row: 1,
                column: 7,
                step: 1_000_000_000
            })
        );

        let geometry = GridGeometry::new(ScreenPoint::new(i32::MAX - 10, 0), 33);
        assert!(geometry.cell_point(GridPosition::new(1, 1)).is_ok());
        assert!(matches!(
            geometry.locate(date(2025, 9, 2)),
            Err(GridError::CoordinateOverflow { column: 3, .. })
        ));
    }

    #[test]
    fn month_offset_across_years() {
        assert_eq!(month_offset(date(2025, 9, 30), date(2025, 10, 1)), 1);
        assert_eq!(month_offset(date(2025, 12, 31), date(2026, 1, 1)), 1);
        assert_eq!(month_offset(date(2025, 9, 1), date(2025, 9, 30)), 0);
        assert_eq!(month_offset(date(2025, 10, 1), date(2025, 9, 1)), -1);
        assert_eq!(month_offset(date(2025, 1, 15), date(2026, 3, 2)), 14);
    }
}
