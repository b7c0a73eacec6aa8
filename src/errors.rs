use std::io;

use thiserror::Error;

use crate::types::{ItemId, SourceName, WindowKey};

/// Error type for ingestion, aggregation, encoding, and sink failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed input in '{source_name}' at line {line}: {reason}")]
    MalformedInput {
        source_name: SourceName,
        line: u64,
        reason: String,
    },
    #[error("item {item_id} missing from item statistics of window {window}")]
    CacheLookupMiss { window: WindowKey, item_id: ItemId },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl PipelineError {
    pub(crate) fn malformed(
        source_name: impl Into<SourceName>,
        line: u64,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedInput {
            source_name: source_name.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Short pipeline stage label used when reporting fatal errors.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::MalformedInput { .. } => "ingestion",
            Self::CacheLookupMiss { .. } => "encoding",
            Self::Io(_) => "io",
            Self::Json(_) => "report",
            Self::Configuration(_) => "configuration",
        }
    }
}
