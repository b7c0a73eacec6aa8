use crate::errors::PipelineError;
use crate::types::EncodedLine;

/// Filesystem-backed input readers and output sinks.
pub mod fs;

pub use fs::FileLineSink;

/// Destination for finished training lines.
///
/// The orchestrator calls `write_window` once per window, in ascending window
/// order, and `finish` once after the last window.
pub trait LineSink {
    /// Append every line of one window.
    fn write_window(&mut self, lines: &[EncodedLine]) -> Result<(), PipelineError>;

    /// Flush buffered output.
    fn finish(&mut self) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// In-memory sink, mostly useful for tests and dry runs.
impl LineSink for Vec<EncodedLine> {
    fn write_window(&mut self, lines: &[EncodedLine]) -> Result<(), PipelineError> {
        self.extend_from_slice(lines);
        Ok(())
    }
}
