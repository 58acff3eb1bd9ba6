//! Tests for the `datesweep` command line

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::{tempdir, TempDir};

fn datesweep_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_datesweep"))
}

/// Write a config into `dir` that downloads into `dir/downloads`
fn write_config(dir: &TempDir, start: &str, end: &str, extra: &str) -> (PathBuf, PathBuf) {
    let downloads = dir.path().join("downloads");
    fs::create_dir_all(&downloads).unwrap();
    let config = dir.path().join("datesweep.toml");
    fs::write(
        &config,
        format!(
            "start = \"{start}\"\nend = \"{end}\"\ndownload_dir = '{}'\n{extra}\n",
            downloads.display()
        ),
    )
    .unwrap();
    (config, downloads)
}

fn datesweep(dir: &Path, args: &[&str]) -> Output {
    Command::new(datesweep_binary())
        .current_dir(dir)
        .env_remove("DATESWEEP_CONFIG")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute command")
}

#[test]
fn init_writes_default_config() {
    let dir = tempdir().unwrap();
    let output = datesweep(dir.path(), &["init"]);

    assert!(output.status.success(), "Command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Created:"), "Should show 'Created:'");

    let content = fs::read_to_string(dir.path().join("datesweep.toml")).unwrap();
    assert!(content.contains("start = \"2025-09-01\""), "{content}");
    assert!(content.contains("end = \"2025-10-30\""), "{content}");
    assert!(content.contains("step = 33"), "{content}");
}

#[test]
fn init_refuses_overwrite() {
    let dir = tempdir().unwrap();
    let existing = dir.path().join("mine.toml");
    fs::write(&existing, "# keep me").unwrap();

    let output = datesweep(dir.path(), &["init", "mine.toml"]);

    assert!(!output.status.success(), "Command should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("already exists"), "{stderr}");
    assert_eq!(fs::read_to_string(&existing).unwrap(), "# keep me");
}

#[test]
fn calibrate_derives_grid_base() {
    let dir = tempdir().unwrap();
    let output = datesweep(
        dir.path(),
        &["calibrate", "--date", "2025-03-01", "-x", "2595", "-y", "388"],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("row 1, column 7"), "{stdout}");
    assert!(stdout.contains("base = { x = 2397, y = 388 }"), "{stdout}");
    assert!(stdout.contains("step = 33"), "{stdout}");
}

#[test]
fn plan_json_lists_every_date() {
    let dir = tempdir().unwrap();
    // Friday through Monday
    let (config, _) = write_config(&dir, "2025-09-05", "2025-09-08", "");

    let output = datesweep(
        dir.path(),
        &["plan", "--json", "--config", config.to_str().unwrap()],
    );

    assert!(output.status.success());
    let days: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let days = days.as_array().unwrap();
    assert_eq!(days.len(), 4);

    let weekend: Vec<bool> = days.iter().map(|d| d["weekend"].as_bool().unwrap()).collect();
    assert_eq!(weekend, vec![false, true, true, false]);
    assert_eq!(days[0]["date"], "2025-09-05");
    assert_eq!(days[0]["position"]["row"], 1);
    assert_eq!(days[0]["position"]["column"], 6);
    assert_eq!(days[0]["point"]["x"], 2397 + 5 * 33);
    assert_eq!(days[3]["export_name"], "2025.09.08.csv");
    assert!(days[1]["export_name"].is_null());
}

#[test]
fn plan_uses_command_line_overrides() {
    let dir = tempdir().unwrap();
    write_config(&dir, "2025-09-01", "2025-09-30", "");

    // ./datesweep.toml is picked up without --config
    let output = datesweep(
        dir.path(),
        &["plan", "--start", "2025-09-06", "--end", "2025-09-07"],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("weekend, no export").count(), 2, "{stdout}");
    assert!(stdout.contains("2 date(s) planned."), "{stdout}");
}

#[test]
fn dry_run_previews_rename_without_moving() {
    let dir = tempdir().unwrap();
    let (config, downloads) = write_config(&dir, "2025-09-01", "2025-09-01", "");
    fs::write(downloads.join("export.csv"), "a,b\n").unwrap();

    let output = datesweep(
        dir.path(),
        &["run", "--dry-run", "--config", config.to_str().unwrap()],
    );

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("would rename export.csv -> 2025.09.01.csv"),
        "{stdout}"
    );
    assert!(stdout.contains("[dry run] Processed 1 day(s)"), "{stdout}");
    assert!(stdout.contains("6 click(s)"), "{stdout}");
    assert!(downloads.join("export.csv").exists());
    assert!(!downloads.join("2025.09.01.csv").exists());
}

#[test]
fn dry_run_weekend_has_no_renames() {
    let dir = tempdir().unwrap();
    let (config, _) = write_config(&dir, "2025-09-06", "2025-09-07", "");

    let output = datesweep(
        dir.path(),
        &["run", "--dry-run", "--config", config.to_str().unwrap()],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("0 weekday(s), 2 weekend day(s), 4 click(s)"),
        "{stdout}"
    );
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempdir().unwrap();
    let (config, _) = write_config(&dir, "2025-09-01", "2025-09-02", "[grid]\nstep = 0");

    let output = datesweep(
        dir.path(),
        &["run", "--dry-run", "--config", config.to_str().unwrap()],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("grid step must be positive"), "{stderr}");
}

#[test]
fn missing_download_dir_is_rejected() {
    let dir = tempdir().unwrap();
    let output = datesweep(
        dir.path(),
        &["run", "--dry-run", "--download-dir", "does-not-exist"],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"), "{stderr}");
}

#[test]
fn calibrate_rejects_step_beyond_coordinate_range() {
    let dir = tempdir().unwrap();
    let output = datesweep(
        dir.path(),
        &[
            "calibrate", "--date", "2025-03-01", "-x", "0", "-y", "0", "--step", "1000000000",
        ],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("outside the screen coordinate range"), "{stderr}");
    assert!(!stderr.contains("panicked"), "{stderr}");
}

#[test]
fn plan_validates_config() {
    let dir = tempdir().unwrap();
    let (config, _) = write_config(&dir, "2025-09-01", "2025-09-02", "[grid]\nstep = 1000000000");

    let output = datesweep(dir.path(), &["plan", "--config", config.to_str().unwrap()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("outside the screen coordinate range"), "{stderr}");
    assert!(stderr.contains("config has 1 error(s)"), "{stderr}");
}
