use std::fmt;

use serde::Serialize;

use crate::constants::encoder::QID_PREFIX;
pub use crate::types::{CategoryId, FieldIndex, ItemId, SessionId, TimestampMs, ValueId, WindowKey};

/// One row of the session or purchase log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawEvent {
    /// Session the event belongs to.
    pub session_id: SessionId,
    /// Viewed (or purchased) item.
    pub item_id: ItemId,
    /// Event instant in UTC milliseconds.
    pub timestamp: TimestampMs,
}

/// One row of the item metadata log. Items usually have many rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemFeatureRow {
    pub item_id: ItemId,
    pub category: CategoryId,
    pub value: ValueId,
}

/// Aggregated view of one purchased session.
///
/// `item_sequence` holds the viewed items in time order followed by the
/// purchased target; `timestamp_sequence` is parallel to it. Built once by the
/// session aggregator and never mutated afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub item_sequence: Vec<ItemId>,
    pub timestamp_sequence: Vec<TimestampMs>,
    /// Distinct items viewed before the purchase.
    pub distinct_item_count: usize,
    /// `max - min` of the pre-purchase timestamps, in milliseconds.
    pub duration_ms: TimestampMs,
    /// Last item viewed before the purchase.
    pub last_item_id: ItemId,
    pub target_item_id: ItemId,
    pub target_timestamp: TimestampMs,
    pub window_key: WindowKey,
}

impl SessionSummary {
    /// Items viewed before the purchase, in time order.
    pub fn viewed_items(&self) -> &[ItemId] {
        &self.item_sequence[..self.item_sequence.len().saturating_sub(1)]
    }
}

/// One `(index, value)` pair of an encoded line.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Field {
    pub index: FieldIndex,
    pub value: f64,
}

/// One `(session, candidate)` training example in sparse ranked-learning form.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingLine {
    /// `1` for the purchased candidate, `0` otherwise.
    pub label: u8,
    /// Query group, the session id.
    pub group: SessionId,
    /// Fields with strictly increasing indices.
    pub fields: Vec<Field>,
}

impl fmt::Display for TrainingLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{}", self.label, QID_PREFIX, self.group)?;
        for field in &self.fields {
            write!(f, " {}:{}", field.index, field.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn training_line_renders_sparse_format() {
        let line = TrainingLine {
            label: 1,
            group: 42,
            fields: vec![
                Field {
                    index: 0,
                    value: 2.0,
                },
                Field {
                    index: 1,
                    value: 0.25,
                },
                Field {
                    index: 9,
                    value: 3.0,
                },
            ],
        };
        assert_eq!(line.to_string(), "1 qid:42 0:2 1:0.25 9:3");
    }

    #[test]
    fn viewed_items_excludes_target() {
        let summary = SessionSummary {
            session_id: 1,
            item_sequence: vec![10, 11, 12],
            timestamp_sequence: vec![0, 1, 2],
            distinct_item_count: 2,
            duration_ms: 1,
            last_item_id: 11,
            target_item_id: 12,
            target_timestamp: 2,
            window_key: 0,
        };
        assert_eq!(summary.viewed_items(), &[10, 11]);
    }
}
