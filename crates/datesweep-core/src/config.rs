//! Run configuration.
//!
//! Every value has a default calibrated for the reference screen layout, so
//! a config file only needs the fields that differ. Dates are written as
//! quoted strings:
//!
//! ```toml
//! start = "2025-09-01"
//! end = "2025-10-30"
//! download_dir = "C:/Users/me/Downloads"
//!
//! [controls]
//! calendar = { x = 2480, y = 300 }
//!
//! [timing]
//! settle = "poll"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::{GridGeometry, GridPosition, GRID_COLUMNS, GRID_ROWS};
use crate::{DateRange, ScreenPoint};

/// Default config file name looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "datesweep.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ============================================================================
// Sections
// ============================================================================

/// Screen positions of the fixed UI controls
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Controls {
    /// Opens the date picker
    pub calendar: ScreenPoint,
    /// Advances the date picker by one month
    pub next_month: ScreenPoint,
    pub query: ScreenPoint,
    /// Opens the export menu
    pub excel: ScreenPoint,
    /// CSV entry of the export menu
    pub csv: ScreenPoint,
    /// Confirms the export dialog
    pub confirm: ScreenPoint,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            calendar: ScreenPoint::new(2480, 300),
            next_month: ScreenPoint::new(2595, 322),
            query: ScreenPoint::new(3770, 300),
            excel: ScreenPoint::new(3770, 530),
            csv: ScreenPoint::new(3770, 560),
            confirm: ScreenPoint::new(3680, 590),
        }
    }
}

/// How the workflow waits for an export to land on disk
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettleMode {
    /// Sleep for `settle_delay_ms`
    #[default]
    Fixed,
    /// Poll the download directory for a fresh, complete file
    Poll,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timing {
    /// Pause after every click
    pub click_delay_ms: u64,
    /// Wait after confirming an export (fixed mode)
    pub settle_delay_ms: u64,
    pub settle: SettleMode,
    /// Upper bound for poll mode
    pub settle_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            click_delay_ms: 1000,
            settle_delay_ms: 2000,
            settle: SettleMode::Fixed,
            settle_timeout_ms: 30_000,
            poll_interval_ms: 250,
        }
    }
}

impl Timing {
    /// No delays at all; useful for previews and tests
    pub fn instant() -> Self {
        Self {
            click_delay_ms: 0,
            settle_delay_ms: 0,
            settle: SettleMode::Fixed,
            settle_timeout_ms: 0,
            poll_interval_ms: 0,
        }
    }

    pub fn click_delay(&self) -> Duration {
        Duration::from_millis(self.click_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Which physical signals stop a run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CancelConfig {
    /// Key that stops the run while held
    pub key: String,
    /// Moving the pointer into a screen corner stops the run
    pub fail_safe: bool,
}

impl Default for CancelConfig {
    fn default() -> Self {
        Self {
            key: "escape".into(),
            fail_safe: true,
        }
    }
}

// ============================================================================
// Config
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// First date to process
    pub start: NaiveDate,
    /// Last date to process (inclusive)
    pub end: NaiveDate,
    /// Directory the exports are downloaded into
    pub download_dir: PathBuf,
    /// Extension of export files, without the dot
    pub extension: String,
    pub controls: Controls,
    pub grid: GridGeometry,
    pub timing: Timing,
    pub cancel: CancelConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2025, 10, 30).unwrap_or_default(),
            download_dir: default_download_dir(),
            extension: "csv".into(),
            controls: Controls::default(),
            grid: GridGeometry::default(),
            timing: Timing::default(),
            cancel: CancelConfig::default(),
        }
    }
}

/// The platform download folder, or `./downloads` when unknown
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("downloads"))
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&data)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn range(&self) -> DateRange {
        DateRange::new(self.start, self.end)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.range().is_empty() {
            issues.push(ConfigIssue::warning(format!(
                "start {} is after end {}; no dates will be processed",
                self.start, self.end
            )));
        }

        if self.grid.step <= 0 {
            issues.push(ConfigIssue::error(format!(
                "grid step must be positive, got {}",
                self.grid.step
            )));
        } else if let Err(e) = self
            .grid
            .cell_point(GridPosition::new(GRID_ROWS, GRID_COLUMNS))
        {
            issues.push(ConfigIssue::error(e.to_string()));
        }

        let ext = self.extension.trim_start_matches('.');
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            issues.push(ConfigIssue::error(format!(
                "extension '{}' must be non-empty and alphanumeric",
                self.extension
            )));
        }

        if !self.download_dir.is_dir() {
            issues.push(ConfigIssue::error(format!(
                "download directory {} does not exist",
                self.download_dir.display()
            )));
        }

        let c = &self.controls;
        for (name, point) in [
            ("calendar", c.calendar),
            ("next_month", c.next_month),
            ("query", c.query),
            ("excel", c.excel),
            ("csv", c.csv),
            ("confirm", c.confirm),
        ] {
            if point.x < 0 || point.y < 0 {
                issues.push(ConfigIssue::warning(format!(
                    "control '{name}' at {point} is off the primary screen"
                )));
            }
        }

        if self.timing.settle == SettleMode::Poll && self.timing.settle_timeout_ms == 0 {
            issues.push(ConfigIssue::warning(
                "poll settle mode with a zero timeout checks the directory only once",
            ));
        }

        issues
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueLevel {
    Error,
    Warning,
}

/// Problem found by [`Config::validate`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigIssue {
    pub level: IssueLevel,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Warning,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == IssueLevel::Error
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.level {
            IssueLevel::Error => write!(f, "error: {}", self.message),
            IssueLevel::Warning => write!(f, "warning: {}", self.message),
        }
    }
}
