//! Append-only line sinks

use crate::output::traits::{OutputError, OutputResult};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A file written one line at a time
pub struct AppendLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl AppendLog {
    /// Creates the file, discarding earlier contents
    pub fn create(path: &Path) -> OutputResult<Self> {
        ensure_parent(path)?;
        let file = File::create(path)?;
        Ok(Self::from_file(path, file))
    }

    /// Opens the file for appending, creating it when missing
    pub fn append_to(path: &Path) -> OutputResult<Self> {
        ensure_parent(path)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::from_file(path, file))
    }

    fn from_file(path: &Path, file: File) -> Self {
        Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line; a trailing newline is added
    pub fn append_line(&self, line: &str) -> OutputResult<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| OutputError::Write(format!("Failed to lock {}: {}", self.path.display(), e)))?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// Appends one value as a single JSON line
    pub fn append_json<T: Serialize>(&self, value: &T) -> OutputResult<()> {
        let line = serde_json::to_string(value)?;
        self.append_line(&line)
    }

    pub fn flush(&self) -> OutputResult<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| OutputError::Write(format!("Failed to lock {}: {}", self.path.display(), e)))?;
        writer.flush()?;
        Ok(())
    }
}

impl Drop for AppendLog {
    fn drop(&mut self) {
        if let Ok(writer) = self.writer.get_mut() {
            let _ = writer.flush();
        }
    }
}

/// Writes a whole newline-delimited list, replacing the file
pub fn write_lines<I, S>(path: &Path, lines: I) -> OutputResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ensure_parent(path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    for line in lines {
        writer.write_all(line.as_ref().as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn ensure_parent(path: &Path) -> OutputResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
