//! Assembly of `(session, candidate)` training lines.
//!
//! Field layout of every line, in order:
//!
//! 1. session distinct-item count, session duration in hours
//! 2. last viewed item: 7 window statistics, then its sparse catalog block
//! 3. purchased target: same block
//! 4. candidate: same block
//!
//! Dense fields take one index each. A sparse block reserves the full catalog
//! width: a feature with catalog index `k` lands at `block_start + k`, so the
//! same index always names the same column and indices strictly increase.
//! This layout is what trained models are indexed against; do not reorder it.

use crate::candidates::{CandidatePool, sample_candidates};
use crate::catalog::{FeatureCatalog, SparseFeature};
use crate::config::NegativeStrategy;
use crate::constants::encoder::MS_PER_HOUR;
use crate::data::{Field, SessionSummary, TrainingLine};
use crate::errors::PipelineError;
use crate::item_stats::{ItemCacheEntry, ItemStatsTable};
use crate::types::{FieldIndex, ItemId, SessionId, TimestampMs};

/// Builds one line while owning the running field offset.
#[derive(Clone, Debug, Default)]
pub struct LineEncoder {
    offset: FieldIndex,
    fields: Vec<Field>,
}

impl LineEncoder {
    /// Empty line starting at offset `0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next free field index.
    pub fn offset(&self) -> FieldIndex {
        self.offset
    }

    /// Fields appended so far.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Append one dense field and return the updated offset.
    pub fn append_dense(&mut self, value: f64) -> FieldIndex {
        self.fields.push(Field {
            index: self.offset,
            value,
        });
        self.offset += 1;
        self.offset
    }

    /// Append a sparse block of `width` reserved slots and return the updated
    /// offset. `features` must be sorted by catalog index, each below `width`.
    pub fn append_sparse_block(&mut self, features: &[SparseFeature], width: FieldIndex) -> FieldIndex {
        let start = self.offset;
        self.fields.extend(features.iter().map(|feature| Field {
            index: start + feature.index,
            value: f64::from(feature.count),
        }));
        self.offset = start + width;
        self.offset
    }

    /// Append the 7 statistics of an item followed by its sparse block.
    pub fn append_item_block(
        &mut self,
        stats: &ItemCacheEntry,
        features: &[SparseFeature],
        width: FieldIndex,
    ) -> FieldIndex {
        for value in stats.dense_fields() {
            self.append_dense(value);
        }
        self.append_sparse_block(features, width)
    }

    /// Close the line with its label and query group.
    pub fn finish(self, label: u8, group: SessionId) -> TrainingLine {
        TrainingLine {
            label,
            group,
            fields: self.fields,
        }
    }
}

/// Session duration expressed in hours.
pub fn duration_hours(duration_ms: TimestampMs) -> f64 {
    duration_ms as f64 / MS_PER_HOUR
}

/// Read-only state shared by every session of one window.
#[derive(Clone, Copy)]
pub struct WindowEncoder<'a> {
    pub stats: &'a ItemStatsTable,
    pub pool: &'a CandidatePool,
    pub catalog: &'a FeatureCatalog,
    pub max_candidates: usize,
    pub negative_strategy: NegativeStrategy,
}

impl WindowEncoder<'_> {
    /// Encode every candidate line of `session`, in ascending candidate id.
    pub fn encode_session(&self, session: &SessionSummary) -> Result<Vec<TrainingLine>, PipelineError> {
        let width = self.catalog.width();
        let mut prefix = LineEncoder::new();
        prefix.append_dense(session.distinct_item_count as f64);
        prefix.append_dense(duration_hours(session.duration_ms));
        self.append_item(&mut prefix, session.last_item_id, width)?;
        self.append_item(&mut prefix, session.target_item_id, width)?;

        let candidates = sample_candidates(
            session,
            self.pool,
            self.max_candidates,
            self.negative_strategy,
        );
        let mut lines = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let mut line = prefix.clone();
            self.append_item(&mut line, candidate.item_id, width)?;
            lines.push(line.finish(candidate.label, session.session_id));
        }
        Ok(lines)
    }

    fn append_item(
        &self,
        line: &mut LineEncoder,
        item_id: ItemId,
        width: FieldIndex,
    ) -> Result<FieldIndex, PipelineError> {
        let stats = self.stats.require(item_id)?;
        Ok(line.append_item_block(stats, self.catalog.item_features(item_id), width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::encoder::{ITEM_STAT_FIELDS, SESSION_FIELDS};
    use crate::data::ItemFeatureRow;

    fn session(session_id: SessionId, viewed: &[ItemId], target: ItemId, duration_ms: i64) -> SessionSummary {
        let mut item_sequence = viewed.to_vec();
        item_sequence.push(target);
        let mut distinct = viewed.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        SessionSummary {
            session_id,
            timestamp_sequence: vec![0; item_sequence.len()],
            item_sequence,
            distinct_item_count: distinct.len(),
            duration_ms,
            last_item_id: *viewed.last().unwrap(),
            target_item_id: target,
            target_timestamp: 0,
            window_key: 0,
        }
    }

    fn feature_rows() -> Vec<ItemFeatureRow> {
        // Two items only, so every key clears the 5% threshold.
        vec![
            ItemFeatureRow {
                item_id: 10,
                category: 1,
                value: 1,
            },
            ItemFeatureRow {
                item_id: 30,
                category: 2,
                value: 7,
            },
        ]
    }

    #[test]
    fn dense_and_sparse_offsets_advance() {
        let mut encoder = LineEncoder::new();
        assert_eq!(encoder.append_dense(1.0), 1);
        let features = [
            SparseFeature { index: 0, count: 2 },
            SparseFeature { index: 3, count: 1 },
        ];
        assert_eq!(encoder.append_sparse_block(&features, 5), 6);
        assert_eq!(encoder.append_dense(4.0), 7);
        let indices: Vec<FieldIndex> = encoder.fields().iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 4, 6]);
        assert_eq!(encoder.offset(), 7);
    }

    #[test]
    fn empty_sparse_block_still_reserves_width() {
        let mut encoder = LineEncoder::new();
        assert_eq!(encoder.append_sparse_block(&[], 3), 3);
        assert!(encoder.fields().is_empty());
    }

    #[test]
    fn session_lines_follow_field_layout() {
        let sessions = vec![
            session(1, &[10, 20], 30, 7_200_000),
            session(2, &[30], 40, 0),
        ];
        let stats = ItemStatsTable::build(0, &sessions);
        let pool = CandidatePool::from_sessions(&sessions);
        let catalog = FeatureCatalog::build(&feature_rows(), 0.05);
        assert_eq!(catalog.width(), 4);
        let encoder = WindowEncoder {
            stats: &stats,
            pool: &pool,
            catalog: &catalog,
            max_candidates: 20,
            negative_strategy: NegativeStrategy::LowestItemIds,
        };

        let lines = encoder.encode_session(&sessions[0]).unwrap();
        let candidates: Vec<(u8, String)> = lines
            .iter()
            .map(|line| (line.label, line.to_string()))
            .collect();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].0, 1);
        assert_eq!(candidates[1].0, 0);

        let positive = &lines[0];
        assert_eq!(positive.group, 1);
        assert_eq!(positive.fields[0].value, 2.0);
        assert_eq!(positive.fields[1].value, 2.0);
        assert!(
            positive
                .fields
                .windows(2)
                .all(|pair| pair[0].index < pair[1].index)
        );
        assert_eq!(positive.fields[0].index, 0);

        // last=20 has no features, target=30 and candidate=30 carry two each.
        let expected = SESSION_FIELDS + 3 * ITEM_STAT_FIELDS + 2 + 2;
        assert_eq!(positive.fields.len() as u32, expected);

        // Target block sparse fields sit at block start + catalog index.
        let target_sparse_start = SESSION_FIELDS + ITEM_STAT_FIELDS + catalog.width() + ITEM_STAT_FIELDS;
        let cat2 = catalog
            .index_of(&crate::catalog::FeatureKey::category(2))
            .unwrap();
        assert!(
            positive
                .fields
                .iter()
                .any(|f| f.index == target_sparse_start + cat2 && f.value == 1.0)
        );
    }

    #[test]
    fn candidate_missing_from_stats_is_fatal() {
        let sessions = vec![session(1, &[10], 30, 0)];
        let stats = ItemStatsTable::build(0, &sessions);
        let foreign_pool = CandidatePool::from_sessions(&[session(9, &[1], 99, 0)]);
        let catalog = FeatureCatalog::build(&[], 0.05);
        let encoder = WindowEncoder {
            stats: &stats,
            pool: &foreign_pool,
            catalog: &catalog,
            max_candidates: 20,
            negative_strategy: NegativeStrategy::LowestItemIds,
        };
        let err = encoder.encode_session(&sessions[0]).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::CacheLookupMiss { item_id: 99, .. }
        ));
    }

    #[test]
    fn duration_is_in_hours() {
        assert_eq!(duration_hours(5_400_000), 1.5);
        assert_eq!(duration_hours(0), 0.0);
    }
}
