//! The per-date export loop.
//!
//! For each date in the configured range:
//!
//! 1. stop if cancellation was requested
//! 2. open the date picker, advancing it when the month changed
//! 3. click the date's grid cell
//! 4. on weekdays: query, export as CSV, confirm, wait for the download to
//!    settle and rename the newest export to `YYYY.MM.DD.csv`
//!
//! Cancellation is not an error. It ends the run with
//! [`RunOutcome::Cancelled`]; only grid inconsistencies, input backend
//! failures and filesystem errors abort with a [`WorkflowError`].

use std::time::SystemTime;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, SettleMode};
use crate::grid::{month_offset, GridError, GridPosition};
use crate::input::{CancelSensor, Clicker, InputError, Interrupt, PointerActuator, Waiter};
use crate::rename::{DownloadDir, RenameError, RenameOutcome};
use crate::{is_weekend, ScreenPoint};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Rename(#[from] RenameError),

    #[error(transparent)]
    Input(#[from] InputError),
}

/// How a run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RunOutcome {
    /// Every date up to the end of the range was processed
    #[default]
    Completed,
    /// Stopped on user request while handling `at`
    Cancelled { at: NaiveDate },
}

/// Summary of a finished run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Dates fully handled
    pub days: usize,
    pub weekdays: usize,
    pub weekends: usize,
    pub clicks: usize,
    /// One entry per renamer invocation, in date order
    pub renames: Vec<(NaiveDate, RenameOutcome)>,
}

impl RunReport {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.outcome, RunOutcome::Cancelled { .. })
    }

    /// Number of exports that ended up under their canonical name
    pub fn renamed(&self) -> usize {
        self.renames
            .iter()
            .filter(|(_, o)| matches!(o, RenameOutcome::Renamed { .. }))
            .count()
    }

    /// Weekdays for which no export file was found
    pub fn missing(&self) -> usize {
        self.renames
            .iter()
            .filter(|(_, o)| *o == RenameOutcome::NoSource)
            .count()
    }
}

enum Stop {
    Cancelled,
    Failed(WorkflowError),
}

impl From<Interrupt> for Stop {
    fn from(interrupt: Interrupt) -> Self {
        match interrupt {
            Interrupt::Cancelled => Stop::Cancelled,
            Interrupt::Input(e) => Stop::Failed(e.into()),
        }
    }
}

impl From<GridError> for Stop {
    fn from(e: GridError) -> Self {
        Stop::Failed(e.into())
    }
}

impl From<RenameError> for Stop {
    fn from(e: RenameError) -> Self {
        Stop::Failed(e.into())
    }
}

// ============================================================================
// Workflow
// ============================================================================

pub struct Workflow<'a> {
    config: &'a Config,
    actuator: &'a mut dyn PointerActuator,
    sensor: &'a dyn CancelSensor,
    waiter: &'a dyn Waiter,
    preview_renames: bool,
}

impl<'a> Workflow<'a> {
    pub fn new(
        config: &'a Config,
        actuator: &'a mut dyn PointerActuator,
        sensor: &'a dyn CancelSensor,
        waiter: &'a dyn Waiter,
    ) -> Self {
        Self {
            config,
            actuator,
            sensor,
            waiter,
            preview_renames: false,
        }
    }

    /// Only report the renames that would happen; never move files
    pub fn preview_renames(mut self, preview: bool) -> Self {
        self.preview_renames = preview;
        self
    }

    pub fn run(self) -> Result<RunReport, WorkflowError> {
        let config = self.config;
        let preview = self.preview_renames;
        let dir = DownloadDir::new(&config.download_dir, &config.extension);
        let mut clicker = Clicker::new(
            self.actuator,
            self.sensor,
            self.waiter,
            config.timing.click_delay(),
        );
        let mut report = RunReport::default();
        let mut previous: Option<NaiveDate> = None;

        info!(start = %config.start, end = %config.end, dir = %dir.path().display(), "starting run");

        for current in config.range().days() {
            match process_day(config, &dir, preview, &mut clicker, current, previous, &mut report) {
                Ok(()) if is_weekend(current) => report.weekends += 1,
                Ok(()) => report.weekdays += 1,
                Err(Stop::Cancelled) => {
                    info!(date = %current, "cancellation requested, stopping");
                    report.outcome = RunOutcome::Cancelled { at: current };
                    break;
                }
                Err(Stop::Failed(e)) => return Err(e),
            }
            report.days += 1;
            previous = Some(current);
        }

        report.clicks = clicker.clicks();
        info!(
            days = report.days,
            weekdays = report.weekdays,
            weekends = report.weekends,
            clicks = report.clicks,
            cancelled = report.is_cancelled(),
            "run finished"
        );
        Ok(report)
    }
}

fn process_day(
    config: &Config,
    dir: &DownloadDir,
    preview: bool,
    clicker: &mut Clicker<'_>,
    current: NaiveDate,
    previous: Option<NaiveDate>,
    report: &mut RunReport,
) -> Result<(), Stop> {
    clicker.checkpoint()?;

    let weekend = is_weekend(current);
    info!(date = %current, weekend, "processing date");

    let controls = &config.controls;
    clicker.click(controls.calendar)?;

    if let Some(prev) = previous {
        let months = month_offset(prev, current);
        if months < 0 {
            warn!(from = %prev, to = %current, "date moved backwards; picker not adjusted");
        }
        for _ in 0..months.max(0) {
            info!("new month, advancing picker");
            clicker.click(controls.next_month)?;
        }
    }

    let (pos, point) = config.grid.locate(current)?;
    info!(row = pos.row, column = pos.column, x = point.x, y = point.y, "clicking date cell");
    clicker.click(point)?;

    if weekend {
        info!("weekend, skipping query and export");
        return Ok(());
    }

    let export_started = SystemTime::now();
    clicker.click(controls.query)?;
    clicker.click(controls.excel)?;
    clicker.click(controls.csv)?;
    clicker.click(controls.confirm)?;

    settle(config, dir, clicker, export_started)?;
    clicker.checkpoint()?;

    let outcome = if preview {
        dir.preview(current)?
    } else {
        dir.rename_latest(current)?
    };
    report.renames.push((current, outcome));
    Ok(())
}

fn settle(
    config: &Config,
    dir: &DownloadDir,
    clicker: &Clicker<'_>,
    since: SystemTime,
) -> Result<(), Interrupt> {
    let timing = &config.timing;
    match timing.settle {
        SettleMode::Fixed => clicker.pause(timing.settle_delay()),
        SettleMode::Poll => {
            let ready = clicker.wait_until(timing.settle_timeout(), timing.poll_interval(), &mut || {
                dir.has_fresh_download(since).unwrap_or(false)
            })?;
            if !ready {
                warn!(
                    timeout_ms = timing.settle_timeout_ms,
                    "no finished download detected, renaming newest file anyway"
                );
            }
        }
    }
    Ok(())
}

// ============================================================================
// Plan
// ============================================================================

/// One date as the workflow would handle it
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlannedDay {
    pub date: NaiveDate,
    pub weekend: bool,
    /// Next-month clicks before selecting the date
    pub next_month_clicks: u32,
    pub position: GridPosition,
    pub point: ScreenPoint,
    /// Canonical export name, weekdays only
    pub export_name: Option<String>,
}

/// Compute every step of a run without touching the pointer or files.
pub fn plan(config: &Config) -> Result<Vec<PlannedDay>, GridError> {
    let dir = DownloadDir::new(&config.download_dir, &config.extension);
    let mut previous: Option<NaiveDate> = None;
    let mut days = Vec::with_capacity(config.range().len());

    for date in config.range().days() {
        let weekend = is_weekend(date);
        let next_month_clicks = previous.map_or(0, |p| month_offset(p, date).max(0) as u32);
        let (position, point) = config.grid.locate(date)?;
        days.push(PlannedDay {
            date,
            weekend,
            next_month_clicks,
            position,
            point,
            export_name: (!weekend).then(|| dir.canonical_name(date)),
        });
        previous = Some(date);
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timing;
    use crate::input::{CancelToken, NoWait};
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder {
        points: Vec<ScreenPoint>,
    }

    impl PointerActuator for Recorder {
        fn click_at(&mut self, point: ScreenPoint) -> Result<(), InputError> {
            self.points.push(point);
            Ok(())
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config(start: NaiveDate, end: NaiveDate, dir: &std::path::Path) -> Config {
        Config {
            start,
            end,
            download_dir: dir.to_path_buf(),
            timing: Timing::instant(),
            ..Config::default()
        }
    }

    #[test]
    fn weekend_only_clicks_calendar_and_cell() {
        let dir = tempfile::TempDir::new().unwrap();
        // Saturday and Sunday
        let cfg = config(date(2025, 9, 6), date(2025, 9, 7), dir.path());
        let mut recorder = Recorder::default();
        let token = CancelToken::new();

        let report = Workflow::new(&cfg, &mut recorder, &token, &NoWait).run().unwrap();

        let c = &cfg.controls;
        assert_eq!(
            recorder.points,
            vec![
                c.calendar,
                ScreenPoint::new(2397 + 6 * 33, 388),
                c.calendar,
                ScreenPoint::new(2397, 388 + 33),
            ]
        );
        assert_eq!(report.weekends, 2);
        assert_eq!(report.weekdays, 0);
        assert!(report.renames.is_empty());
        assert_eq!(report.outcome, RunOutcome::Completed);
    }

    #[test]
    fn month_change_clicks_next_month_once() {
        let dir = tempfile::TempDir::new().unwrap();
        // Saturday 2026-02-28 -> Sunday 2026-03-01
        let cfg = config(date(2026, 2, 28), date(2026, 3, 1), dir.path());
        let mut recorder = Recorder::default();
        let token = CancelToken::new();

        Workflow::new(&cfg, &mut recorder, &token, &NoWait).run().unwrap();

        let next = recorder
            .points
            .iter()
            .filter(|p| **p == cfg.controls.next_month)
            .count();
        assert_eq!(next, 1);
        // calendar, cell, calendar, next month, cell
        assert_eq!(recorder.points.len(), 5);
        assert_eq!(recorder.points[3], cfg.controls.next_month);
    }

    #[test]
    fn inverted_range_does_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg = config(date(2025, 9, 2), date(2025, 9, 1), dir.path());
        let mut recorder = Recorder::default();
        let token = CancelToken::new();

        let report = Workflow::new(&cfg, &mut recorder, &token, &NoWait).run().unwrap();
        assert_eq!(report, RunReport::default());
        assert!(recorder.points.is_empty());
    }

    #[test]
    fn plan_marks_weekends_and_month_changes() {
        let cfg = config(date(2025, 9, 26), date(2025, 10, 1), std::path::Path::new("/tmp"));
        let days = plan(&cfg).unwrap();
        assert_eq!(days.len(), 6);

        let weekends: Vec<_> = days.iter().filter(|d| d.weekend).map(|d| d.date).collect();
        assert_eq!(weekends, vec![date(2025, 9, 27), date(2025, 9, 28)]);

        let oct1 = &days[5];
        assert_eq!(oct1.next_month_clicks, 1);
        assert_eq!(oct1.position, GridPosition::new(1, 4));
        assert_eq!(oct1.point, ScreenPoint::new(2397 + 3 * 33, 388));
        assert_eq!(oct1.export_name.as_deref(), Some("2025.10.01.csv"));
        assert_eq!(days[0].next_month_clicks, 0);
        assert_eq!(days[1].export_name, None);
    }
}
