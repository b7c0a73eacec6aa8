#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command-line runner shared by the `rankprep` binary.
pub mod apps;
/// Candidate pools and per-session candidate sampling.
pub mod candidates;
/// Categorical item-metadata catalog and sparse item features.
pub mod catalog;
/// Pipeline configuration types.
pub mod config;
/// Centralized constants used across windows, catalog, candidates, and encoding.
pub mod constants;
/// Raw rows, session summaries, and training line types.
pub mod data;
/// Timestamp parsing for log dates.
pub mod date_helpers;
pub mod encoder;
mod hash;
/// Capacity estimation and formatting helpers.
pub mod heuristics;
/// CSV ingestion of the three input logs.
pub mod ingestion;
/// Per-window item statistics cache.
pub mod item_stats;
/// Run report and window balance metrics.
pub mod metrics;
/// Window planning, encoding, and sink orchestration.
pub mod pipeline;
/// Session aggregation into time windows.
pub mod sessions;
/// Input readers and output sinks (filesystem today).
pub mod transport;
/// Shared type aliases.
pub mod types;

mod errors;

pub use candidates::{Candidate, CandidatePool, sample_candidates};
pub use catalog::{CatalogStats, FeatureCatalog, FeatureKey, SparseFeature};
pub use config::{NegativeStrategy, PipelineConfig, WindowSpec};
pub use data::{Field, ItemFeatureRow, RawEvent, SessionSummary, TrainingLine};
pub use encoder::{LineEncoder, WindowEncoder};
pub use errors::PipelineError;
pub use ingestion::{InputPaths, RawInputs, load_inputs};
pub use item_stats::{ItemCacheEntry, ItemStatsBuilder, ItemStatsTable};
pub use metrics::PipelineReport;
pub use pipeline::{run_from_paths, run_pipeline, write_report};
pub use sessions::{SessionWindows, aggregate_sessions};
pub use transport::{FileLineSink, LineSink};
pub use types::{
    CategoryId, EncodedLine, FieldIndex, ItemId, SessionId, TimestampMs, ValueId, WindowKey,
};
