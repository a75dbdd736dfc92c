//! Size-rotated plaintext writer
//!
//! Files are named `syslog_%Y_%m_%d_%H_%M_%S.txt` from the local time they
//! were opened. Two rotations in the same second get `_1`, `_2`, ... suffixes
//! so a rotation never appends to the file it just closed.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// Write buffer per open file
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// File name prefix
const FILE_PREFIX: &str = "syslog_";

/// chrono format for the timestamp part of a file name
const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

struct OpenFile {
    path: PathBuf,
    writer: BufWriter<File>,
    size: u64,
}

/// Outcome of a successful write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Line written, file below threshold
    Written,
    /// Line written, threshold reached, now writing to a new file
    Rotated { previous: PathBuf, current: PathBuf },
    /// Line written, threshold reached, but no new file could be opened;
    /// still writing to the old one
    RotationFailed { error: String },
}

/// Append-only writer that rotates by size
pub struct RotatingFile {
    directory: PathBuf,
    max_size: u64,
    current: Option<OpenFile>,
}

impl RotatingFile {
    /// Create a writer; no file is opened until `open` or the first write
    pub fn new(directory: impl Into<PathBuf>, max_size: u64) -> Self {
        Self {
            directory: directory.into(),
            max_size,
            current: None,
        }
    }

    /// Open a fresh file, replacing the current one on success
    ///
    /// The current file is flushed first. If that flush or the open fails,
    /// the current file (if any) stays open with its buffer intact.
    pub fn open(&mut self) -> io::Result<PathBuf> {
        if let Some(file) = self.current.as_mut() {
            file.writer.flush()?;
        }
        let opened = open_fresh(&self.directory, Local::now())?;
        let path = opened.path.clone();
        self.current = Some(opened);
        Ok(path)
    }

    /// Write one line followed by `\n`, rotating if the threshold is reached
    ///
    /// # Errors
    ///
    /// Fails if no file is open and opening one fails, or the write fails.
    /// A failed rotation is not an error; see `WriteOutcome::RotationFailed`.
    pub fn write_line(&mut self, line: &str) -> io::Result<WriteOutcome> {
        if self.current.is_none() {
            self.open()?;
        }
        let Some(file) = self.current.as_mut() else {
            return Err(io::Error::other("no output file open"));
        };

        file.writer.write_all(line.as_bytes())?;
        file.writer.write_all(b"\n")?;
        file.size += line.len() as u64 + 1;

        if file.size < self.max_size {
            return Ok(WriteOutcome::Written);
        }

        let previous = file.path.clone();
        match self.open() {
            Ok(current) => Ok(WriteOutcome::Rotated { previous, current }),
            Err(e) => Ok(WriteOutcome::RotationFailed {
                error: e.to_string(),
            }),
        }
    }

    /// Flush buffered bytes to the open file
    pub fn flush(&mut self) -> io::Result<()> {
        match self.current.as_mut() {
            Some(file) => file.writer.flush(),
            None => Ok(()),
        }
    }

    /// Path of the open file
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|f| f.path.as_path())
    }

    /// Bytes written to the open file (including bytes still buffered)
    pub fn current_size(&self) -> u64 {
        self.current.as_ref().map_or(0, |f| f.size)
    }

    /// Rotation threshold in bytes
    pub fn max_size(&self) -> u64 {
        self.max_size
    }
}

/// File name for a timestamp and collision index
pub fn file_name(at: DateTime<Local>, index: u32) -> String {
    let stamp = at.format(TIMESTAMP_FORMAT);
    if index == 0 {
        format!("{FILE_PREFIX}{stamp}.txt")
    } else {
        format!("{FILE_PREFIX}{stamp}_{index}.txt")
    }
}

fn open_fresh(directory: &Path, at: DateTime<Local>) -> io::Result<OpenFile> {
    let mut index = 0;
    let path = loop {
        let candidate = directory.join(file_name(at, index));
        if !candidate.exists() {
            break candidate;
        }
        index += 1;
    };

    let file = File::options().create(true).append(true).open(&path)?;
    let size = file.metadata()?.len();

    Ok(OpenFile {
        path,
        writer: BufWriter::with_capacity(WRITE_BUFFER_SIZE, file),
        size,
    })
}
