//! Success/error status files.
//!
//! The upstream tool polls a shared directory for one of two files to learn
//! how a run ended. Writing one always removes the other so a stale file
//! from a previous run is never mistaken for the current result.

use std::path::{Path, PathBuf};

pub const SUCCESS_FILE: &str = "aebridge_success.log";
pub const ERROR_FILE: &str = "aebridge_error.log";

/// How a run ended, as reported to the status directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failure,
    Interrupted,
}

/// Writes the status files into one directory.
#[derive(Debug, Clone)]
pub struct StatusFiles {
    dir: PathBuf,
}

impl StatusFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn success_path(&self) -> PathBuf {
        self.dir.join(SUCCESS_FILE)
    }

    pub fn error_path(&self) -> PathBuf {
        self.dir.join(ERROR_FILE)
    }

    /// Write the file for `status` and remove the opposite one.
    ///
    /// Returns the path that was written.
    pub fn write(&self, status: RunStatus, message: &str) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let (target, stale) = match status {
            RunStatus::Success => (self.success_path(), self.error_path()),
            RunStatus::Failure | RunStatus::Interrupted => {
                (self.error_path(), self.success_path())
            }
        };
        remove_if_present(&stale)?;

        let label = match status {
            RunStatus::Success => "SUCCESS",
            RunStatus::Failure => "ERROR",
            RunStatus::Interrupted => "INTERRUPTED",
        };
        let body = format!(
            "[{}] {label}: {message}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        std::fs::write(&target, body)?;
        Ok(target)
    }
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
