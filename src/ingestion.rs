use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;

use csv::{Reader, StringRecord};
use tracing::info;

use crate::constants::sources::{ITEM_FEATURES, PURCHASES, SESSIONS};
use crate::data::{ItemFeatureRow, RawEvent};
use crate::date_helpers::parse_timestamp_ms;
use crate::errors::PipelineError;
use crate::transport::fs::open_csv;

/// Locations of the three raw logs.
#[derive(Clone, Debug)]
pub struct InputPaths {
    /// `session_id,item_id,date` view log.
    pub sessions: PathBuf,
    /// `session_id,item_id,date` purchase log, one row per session.
    pub purchases: PathBuf,
    /// `item_id,feature_category_id,feature_value_id` metadata log.
    pub item_features: PathBuf,
}

/// Decoded contents of the three raw logs.
#[derive(Clone, Debug, Default)]
pub struct RawInputs {
    pub sessions: Vec<RawEvent>,
    pub purchases: Vec<RawEvent>,
    pub item_features: Vec<ItemFeatureRow>,
}

/// Read all three logs concurrently.
///
/// Any malformed row aborts the load; there is no partial-row recovery.
pub fn load_inputs(paths: &InputPaths) -> Result<RawInputs, PipelineError> {
    let started = Instant::now();
    let (sessions, (purchases, item_features)) = rayon::join(
        || read_events(open_csv(&paths.sessions)?, SESSIONS),
        || {
            rayon::join(
                || read_events(open_csv(&paths.purchases)?, PURCHASES),
                || read_item_features(open_csv(&paths.item_features)?),
            )
        },
    );
    let inputs = RawInputs {
        sessions: sessions?,
        purchases: purchases?,
        item_features: item_features?,
    };
    info!(
        "[rankprep:ingest] loaded {} session events, {} purchases, {} item feature rows in {:.2}s",
        inputs.sessions.len(),
        inputs.purchases.len(),
        inputs.item_features.len(),
        started.elapsed().as_secs_f64()
    );
    Ok(inputs)
}

/// Decode a `session_id,item_id,date` log.
pub fn read_events<R: Read>(
    mut reader: Reader<R>,
    source_name: &str,
) -> Result<Vec<RawEvent>, PipelineError> {
    let mut events = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| csv_failure(source_name, err))?;
        let line = record_line(&record);
        let (session_id, item_id, date): (i64, i64, String) = record
            .deserialize(None)
            .map_err(|err| PipelineError::malformed(source_name, line, err.to_string()))?;
        let timestamp = parse_timestamp_ms(&date).ok_or_else(|| {
            PipelineError::malformed(source_name, line, format!("unparseable timestamp '{date}'"))
        })?;
        events.push(RawEvent {
            session_id,
            item_id,
            timestamp,
        });
    }
    Ok(events)
}

/// Decode an `item_id,feature_category_id,feature_value_id` log.
pub fn read_item_features<R: Read>(
    mut reader: Reader<R>,
) -> Result<Vec<ItemFeatureRow>, PipelineError> {
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| csv_failure(ITEM_FEATURES, err))?;
        let line = record_line(&record);
        let (item_id, category, value): (i64, i64, i64) = record
            .deserialize(None)
            .map_err(|err| PipelineError::malformed(ITEM_FEATURES, line, err.to_string()))?;
        rows.push(ItemFeatureRow {
            item_id,
            category,
            value,
        });
    }
    Ok(rows)
}

fn record_line(record: &StringRecord) -> u64 {
    record.position().map(|pos| pos.line()).unwrap_or(0)
}

fn csv_failure(source_name: &str, err: csv::Error) -> PipelineError {
    if err.is_io_error() {
        if let csv::ErrorKind::Io(io) = err.into_kind() {
            return PipelineError::Io(io);
        }
        return PipelineError::malformed(source_name, 0, "unreadable input");
    }
    let line = err.position().map(|pos| pos.line()).unwrap_or(0);
    PipelineError::malformed(source_name, line, err.to_string())
}
