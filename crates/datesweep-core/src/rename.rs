//! Renaming of freshly downloaded exports.
//!
//! The export button drops a file with an arbitrary name into the download
//! directory. The newest file with the configured extension is taken to be
//! that export and is moved to `YYYY.MM.DD.<ext>`. Existing names are never
//! overwritten: `_1`, `_2`, ... is appended before the extension instead.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

/// File suffixes browsers use while a download is still being written
pub const PARTIAL_DOWNLOAD_SUFFIXES: &[&str] = &["crdownload", "part", "download", "tmp"];

#[derive(Debug, Error)]
pub enum RenameError {
    #[error("failed to read download directory {}: {source}", path.display())]
    Scan { path: PathBuf, source: io::Error },

    #[error("failed to check whether {} exists: {source}", path.display())]
    Probe { path: PathBuf, source: io::Error },

    #[error("failed to rename {} to {}: {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

/// Result of one renamer invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenameOutcome {
    /// No matching file in the directory; nothing was done
    NoSource,
    /// The newest file already carries the canonical name
    AlreadyNamed { path: PathBuf },
    /// The newest file was moved
    Renamed { from: PathBuf, to: PathBuf },
    /// Preview only: the move that would have been made
    WouldRename { from: PathBuf, to: PathBuf },
}

impl RenameOutcome {
    /// Final path of the export, if there was one
    pub fn path(&self) -> Option<&Path> {
        match self {
            RenameOutcome::NoSource => None,
            RenameOutcome::AlreadyNamed { path } => Some(path),
            RenameOutcome::Renamed { to, .. } | RenameOutcome::WouldRename { to, .. } => Some(to),
        }
    }
}

enum Resolution {
    NoSource,
    AlreadyNamed(PathBuf),
    Move { from: PathBuf, to: PathBuf },
}

/// A download directory watched for files with one extension
#[derive(Clone, Debug)]
pub struct DownloadDir {
    path: PathBuf,
    extension: String,
}

impl DownloadDir {
    pub fn new(path: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            path: path.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// `YYYY.MM.DD.<ext>` for the given date
    pub fn canonical_name(&self, date: NaiveDate) -> String {
        format!("{}.{}", date.format("%Y.%m.%d"), self.extension)
    }

    fn has_extension(&self, path: &Path, extension: &str) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension))
    }

    /// Every directory entry with its metadata, directories included
    fn read_entries(&self) -> Result<Vec<(PathBuf, fs::Metadata)>, RenameError> {
        let scan_err = |source| RenameError::Scan {
            path: self.path.clone(),
            source,
        };

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.path).map_err(scan_err)? {
            let entry = entry.map_err(scan_err)?;
            // The browser may remove temporary files between listing and stat.
            match entry.metadata() {
                Ok(meta) => entries.push((entry.path(), meta)),
                Err(e) => debug!(path = %entry.path().display(), error = %e, "skipping entry"),
            }
        }
        Ok(entries)
    }

    /// All files with the configured extension and their modification times
    pub fn matching_files(&self) -> Result<Vec<(PathBuf, SystemTime)>, RenameError> {
        Ok(self
            .read_entries()?
            .into_iter()
            .filter(|(path, meta)| meta.is_file() && self.has_extension(path, &self.extension))
            .filter_map(|(path, meta)| meta.modified().ok().map(|t| (path, t)))
            .collect())
    }

    /// The most recently modified matching file.
    ///
    /// Ties keep the first file in directory scan order.
    pub fn latest(&self) -> Result<Option<PathBuf>, RenameError> {
        let mut newest: Option<(PathBuf, SystemTime)> = None;
        for (path, modified) in self.matching_files()? {
            if newest.as_ref().map_or(true, |(_, t)| modified > *t) {
                newest = Some((path, modified));
            }
        }
        Ok(newest.map(|(path, _)| path))
    }

    /// True once a matching file modified at or after `since` exists and no
    /// partial download is left in the directory.
    ///
    /// Partial downloads may be directories (Safari's `.download` bundles).
    pub fn has_fresh_download(&self, since: SystemTime) -> Result<bool, RenameError> {
        let entries = self.read_entries()?;
        let pending = entries.iter().any(|(path, _)| {
            PARTIAL_DOWNLOAD_SUFFIXES
                .iter()
                .any(|suffix| self.has_extension(path, suffix))
        });
        if pending {
            return Ok(false);
        }
        Ok(entries.iter().any(|(path, meta)| {
            meta.is_file()
                && self.has_extension(path, &self.extension)
                && meta.modified().is_ok_and(|t| t >= since)
        }))
    }

    /// First free destination: the canonical name, then `_1`, `_2`, ...
    ///
    /// Any existing entry counts as taken, dangling symlinks included.
    pub fn free_destination(&self, date: NaiveDate) -> Result<PathBuf, RenameError> {
        let stem = date.format("%Y.%m.%d").to_string();
        let mut candidate = self.path.join(self.canonical_name(date));
        let mut idx = 1u32;
        while is_taken(&candidate)? {
            candidate = self.path.join(format!("{stem}_{idx}.{}", self.extension));
            idx += 1;
        }
        Ok(candidate)
    }

    fn resolve(&self, date: NaiveDate) -> Result<Resolution, RenameError> {
        let Some(latest) = self.latest()? else {
            return Ok(Resolution::NoSource);
        };
        let canonical = self.canonical_name(date);
        let already_named = latest
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.eq_ignore_ascii_case(&canonical));
        if already_named {
            return Ok(Resolution::AlreadyNamed(latest));
        }
        let to = self.free_destination(date)?;
        Ok(Resolution::Move { from: latest, to })
    }

    /// Move the newest matching file to the canonical name for `date`.
    pub fn rename_latest(&self, date: NaiveDate) -> Result<RenameOutcome, RenameError> {
        match self.resolve(date)? {
            Resolution::NoSource => {
                warn!(dir = %self.path.display(), ext = %self.extension, "no matching file to rename");
                Ok(RenameOutcome::NoSource)
            }
            Resolution::AlreadyNamed(path) => {
                info!(file = %display_name(&path), "file already correctly named");
                Ok(RenameOutcome::AlreadyNamed { path })
            }
            Resolution::Move { from, to } => {
                fs::rename(&from, &to).map_err(|source| RenameError::Move {
                    from: from.clone(),
                    to: to.clone(),
                    source,
                })?;
                info!(from = %display_name(&from), to = %display_name(&to), "renamed export");
                Ok(RenameOutcome::Renamed { from, to })
            }
        }
    }

    /// Report what [`rename_latest`](Self::rename_latest) would do without
    /// touching the filesystem.
    pub fn preview(&self, date: NaiveDate) -> Result<RenameOutcome, RenameError> {
        match self.resolve(date)? {
            Resolution::NoSource => {
                warn!(dir = %self.path.display(), ext = %self.extension, "no matching file to rename");
                Ok(RenameOutcome::NoSource)
            }
            Resolution::AlreadyNamed(path) => {
                info!(file = %display_name(&path), "file already correctly named");
                Ok(RenameOutcome::AlreadyNamed { path })
            }
            Resolution::Move { from, to } => {
                info!(from = %display_name(&from), to = %display_name(&to), "would rename export");
                Ok(RenameOutcome::WouldRename { from, to })
            }
        }
    }
}

fn is_taken(path: &Path) -> Result<bool, RenameError> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(RenameError::Probe {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
