use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use csv::{Reader, ReaderBuilder, Trim};
use tracing::debug;

use crate::errors::PipelineError;
use crate::transport::LineSink;
use crate::types::EncodedLine;

/// Open a headered, comma-separated log for reading.
///
/// The header row is skipped; fields are trimmed and rows may not vary in
/// width.
pub fn open_csv(path: &Path) -> Result<Reader<File>, PipelineError> {
    let file = File::open(path)?;
    Ok(csv_reader(file))
}

/// Wrap any byte source with the same CSV settings as [`open_csv`].
pub fn csv_reader<R: std::io::Read>(input: R) -> Reader<R> {
    ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(input)
}

/// File sink that truncates its target once, then appends every window.
///
/// The file is created (or emptied) in [`FileLineSink::create`], before any
/// window is encoded, so a run never leaves lines from an earlier run behind
/// and later windows never overwrite earlier ones.
pub struct FileLineSink {
    path: PathBuf,
    writer: BufWriter<File>,
    lines_written: u64,
}

impl FileLineSink {
    /// Create or truncate `path`, creating parent directories as needed.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            lines_written: 0,
        })
    }

    /// Output path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines appended so far.
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }
}

impl LineSink for FileLineSink {
    fn write_window(&mut self, lines: &[EncodedLine]) -> Result<(), PipelineError> {
        for line in lines {
            self.writer.write_all(line.as_bytes())?;
            self.writer.write_all(b"\n")?;
        }
        self.lines_written += lines.len() as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), PipelineError> {
        self.writer.flush()?;
        debug!(
            "[rankprep:sink] flushed {} lines to {}",
            self.lines_written,
            self.path.display()
        );
        Ok(())
    }
}
