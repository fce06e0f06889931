//! # Persistent Telemetry Log
//!
//! Line-oriented storage for frames and received snapshots.
//!
//! This module handles:
//! - The [`PersistentLog`] collaborator interface
//! - Writing lines to timestamped files in a log directory
//! - Rotating files after a maximum number of records
//! - Retaining only the newest N files

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Append-only line sink
#[cfg_attr(test, mockall::automock)]
pub trait PersistentLog: Send {
    /// Append one line (a trailing newline is added)
    fn append(&mut self, line: &str) -> Result<()>;
}

/// Rotating file log
///
/// Files are named `<prefix>_<YYYYmmdd_HHMMSS>_<seq>.log` with a 10-digit
/// sequence, so that name order is creation order.
pub struct FileLog {
    dir: PathBuf,
    prefix: String,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
    records_in_file: usize,
    sequence: u32,
}

impl std::fmt::Debug for FileLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLog")
            .field("dir", &self.dir)
            .field("prefix", &self.prefix)
            .field("current_path", &self.current_path)
            .field("records_in_file", &self.records_in_file)
            .finish_non_exhaustive()
    }
}

impl FileLog {
    /// Open a log in `dir`, creating the directory if needed
    ///
    /// No file is created until the first line is appended.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be created.
    pub fn open<P: AsRef<Path>>(
        dir: P,
        prefix: &str,
        max_records_per_file: usize,
        max_files_to_keep: usize,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!("Telemetry log directory: {}", dir.display());

        Ok(Self {
            dir,
            prefix: prefix.to_string(),
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            writer: None,
            current_path: None,
            records_in_file: 0,
            sequence: 0,
        })
    }

    /// Path of the file currently being written, if any
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let path = self.dir.join(file_name(&self.prefix, &stamp, self.sequence));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!("Opened telemetry log file {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.current_path = Some(path);
        self.records_in_file = 0;
        self.sequence = self.sequence.wrapping_add(1);

        self.prune()
    }

    fn prune(&self) -> Result<()> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| self.owns(path))
            .collect();

        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed old telemetry log {}", path.display()),
                Err(e) => warn!("Failed to remove old telemetry log {}: {}", path.display(), e),
            }
        }
        Ok(())
    }

    fn owns(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        name.starts_with(&format!("{}_", self.prefix)) && name.ends_with(".log")
    }
}

/// Build a log file name
///
/// The sequence is zero-padded to the full width of `u32` so that name
/// order matches creation order within one second.
fn file_name(prefix: &str, stamp: &str, sequence: u32) -> String {
    format!("{}_{}_{:010}.log", prefix, stamp, sequence)
}

impl PersistentLog for FileLog {
    fn append(&mut self, line: &str) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", line)?;
            writer.flush()?;
        }
        self.records_in_file += 1;
        Ok(())
    }
}

impl Drop for FileLog {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
    }
}
