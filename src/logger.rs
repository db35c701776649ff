//! Append-only trace log for a database handle.
//!
//! Every line is timestamped, flushed immediately and mirrored as a
//! `tracing` event so the same trail shows up in whatever subscriber the
//! host application installs.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tracing::{debug, warn};

/// Human-readable operation log backed by a file.
#[derive(Debug)]
pub struct Logger {
    path: PathBuf,
    file: Option<File>,
}

impl Logger {
    /// Open `path` for appending, creating it and its parent directory.
    ///
    /// An unwritable path degrades to tracing-only output.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file = match open_append(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "log file unavailable");
                None
            }
        };
        Self { path, file }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        debug!(target: "rust_sqlite_handle", "{}", message);

        let Some(mut file) = self.file.as_ref() else {
            return;
        };
        let line = format!(
            "[{}] {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            message
        );
        let written = file.write_all(line.as_bytes());
        if let Err(e) = written.and_then(|_| file.flush()) {
            warn!(path = %self.path.display(), error = %e, "failed to write log line");
        }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}
