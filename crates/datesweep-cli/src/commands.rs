//! Subcommand implementations

use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

use datesweep_core::config::DEFAULT_CONFIG_FILE;
use datesweep_core::{
    CancelToken, Config, GridGeometry, NoWait, RenameOutcome, RunOutcome, RunReport, ScreenPoint,
    ThreadSleeper, Workflow,
};
use datesweep_input::{native_backend, LogActuator};

use crate::Overrides;

/// Load the config file (explicit path, ./datesweep.toml, or defaults) and
/// apply command-line overrides.
fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<Config> {
    let mut config = match path {
        Some(p) => Config::load(p).with_context(|| format!("loading config {}", p.display()))?,
        None => {
            let local = Path::new(DEFAULT_CONFIG_FILE);
            if local.exists() {
                Config::load(local).with_context(|| format!("loading config {}", local.display()))?
            } else {
                info!("no {DEFAULT_CONFIG_FILE} found, using built-in defaults");
                Config::default()
            }
        }
    };

    if let Some(start) = overrides.start {
        config.start = start;
    }
    if let Some(end) = overrides.end {
        config.end = end;
    }
    if let Some(dir) = &overrides.download_dir {
        config.download_dir = dir.clone();
    }
    Ok(config)
}

/// Print validation issues; fail when any of them is an error
fn check_config(config: &Config) -> Result<()> {
    let issues = config.validate();
    for issue in &issues {
        eprintln!("{issue}");
    }
    let errors = issues.iter().filter(|i| i.is_error()).count();
    if errors > 0 {
        bail!("config has {errors} error(s)");
    }
    Ok(())
}

pub fn run(config_path: Option<&Path>, overrides: &Overrides, dry_run: bool) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    check_config(&config)?;

    let report = if dry_run {
        let mut actuator = LogActuator::new();
        let never = CancelToken::new();
        Workflow::new(&config, &mut actuator, &never, &NoWait)
            .preview_renames(true)
            .run()?
    } else {
        let backend = native_backend(&config.cancel).context("starting pointer backend")?;
        let mut actuator = backend.actuator;
        warn!(key = %config.cancel.key, "hold the cancel key to stop the run");
        Workflow::new(&config, actuator.as_mut(), &backend.sensor, &ThreadSleeper).run()?
    };

    write_report(&mut io::stdout().lock(), &report, dry_run)?;
    Ok(())
}

fn write_report(out: &mut impl Write, report: &RunReport, dry_run: bool) -> io::Result<()> {
    for (date, outcome) in &report.renames {
        match outcome {
            RenameOutcome::NoSource => writeln!(out, "{date}  no export found")?,
            RenameOutcome::AlreadyNamed { path } => {
                writeln!(out, "{date}  already named {}", file_name(path))?;
            }
            RenameOutcome::Renamed { from, to } => {
                writeln!(out, "{date}  {} -> {}", file_name(from), file_name(to))?;
            }
            RenameOutcome::WouldRename { from, to } => {
                writeln!(out, "{date}  would rename {} -> {}", file_name(from), file_name(to))?;
            }
        }
    }

    if let RunOutcome::Cancelled { at } = report.outcome {
        writeln!(out, "Stopped by user at {at}.")?;
    }
    writeln!(
        out,
        "{}Processed {} day(s): {} weekday(s), {} weekend day(s), {} click(s); {} renamed, {} missing.",
        if dry_run { "[dry run] " } else { "" },
        report.days,
        report.weekdays,
        report.weekends,
        report.clicks,
        report.renamed(),
        report.missing(),
    )
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn plan(config_path: Option<&Path>, overrides: &Overrides, json: bool) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    check_config(&config)?;
    let days = datesweep_core::plan(&config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&days)?);
        return Ok(());
    }

    for day in &days {
        let nav = if day.next_month_clicks > 0 {
            " [next month]"
        } else {
            ""
        };
        let action = match &day.export_name {
            Some(name) => format!("-> {name}"),
            None => "weekend, no export".to_string(),
        };
        println!(
            "{} {}  row {} col {}  {}{}  {}",
            day.date,
            day.date.format("%a"),
            day.position.row,
            day.position.column,
            day.point,
            nav,
            action,
        );
    }
    println!("{} date(s) planned.", days.len());
    Ok(())
}

pub fn calibrate(date: NaiveDate, x: i32, y: i32, step: i32) -> Result<()> {
    if step <= 0 {
        bail!("step must be positive, got {step}");
    }
    let anchor = ScreenPoint::new(x, y);
    let geometry = GridGeometry::from_anchor(date, anchor, step)?;
    let (pos, _) = geometry.locate(date)?;

    println!(
        "{date} ({}) is row {}, column {} of its month.",
        date.format("%a"),
        pos.row,
        pos.column
    );
    println!("Grid base: {}, step {}", geometry.base, geometry.step);
    println!();
    println!("[grid]");
    println!("base = {{ x = {}, y = {} }}", geometry.base.x, geometry.base.y);
    println!("step = {}", geometry.step);
    Ok(())
}

pub fn init(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    let text = Config::default().to_toml_string()?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    println!("Created: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn render(report: &RunReport, dry_run: bool) -> String {
        let mut out = Vec::new();
        write_report(&mut out, report, dry_run).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn cancelled_run_tells_the_user() {
        let report = RunReport {
            outcome: RunOutcome::Cancelled { at: date(2025, 9, 2) },
            days: 1,
            weekdays: 1,
            clicks: 8,
            renames: vec![(
                date(2025, 9, 1),
                RenameOutcome::Renamed {
                    from: PathBuf::from("/dl/export.csv"),
                    to: PathBuf::from("/dl/2025.09.01.csv"),
                },
            )],
            ..RunReport::default()
        };

        let text = render(&report, false);
        assert_eq!(
            text,
            "2025-09-01  export.csv -> 2025.09.01.csv\n\
             Stopped by user at 2025-09-02.\n\
             Processed 1 day(s): 1 weekday(s), 0 weekend day(s), 8 click(s); 1 renamed, 0 missing.\n"
        );
    }

    #[test]
    fn completed_run_has_no_stop_notice() {
        let report = RunReport {
            days: 2,
            weekends: 2,
            clicks: 4,
            ..RunReport::default()
        };

        let text = render(&report, true);
        assert!(!text.contains("Stopped by user"), "{text}");
        assert!(text.starts_with("[dry run] Processed 2 day(s)"), "{text}");
    }
}
