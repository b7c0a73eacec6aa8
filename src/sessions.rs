use std::collections::btree_map;
use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info};

use crate::config::WindowSpec;
use crate::constants::sources::PURCHASES;
use crate::data::{RawEvent, SessionSummary};
use crate::errors::PipelineError;
use crate::types::{SessionId, WindowKey};

/// Purchased sessions grouped by window key.
///
/// Windows iterate in ascending key order and sessions inside a window in
/// ascending session id, so every downstream pass is deterministic.
#[derive(Clone, Debug, Default)]
pub struct SessionWindows {
    windows: BTreeMap<WindowKey, Vec<SessionSummary>>,
}

impl SessionWindows {
    /// Number of non-empty windows.
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Total sessions across all windows.
    pub fn session_count(&self) -> usize {
        self.windows.values().map(Vec::len).sum()
    }

    /// Sessions of one window, if any session started in it.
    pub fn window(&self, key: WindowKey) -> Option<&[SessionSummary]> {
        self.windows.get(&key).map(Vec::as_slice)
    }

    /// Iterate windows in ascending key order.
    pub fn iter(&self) -> btree_map::Iter<'_, WindowKey, Vec<SessionSummary>> {
        self.windows.iter()
    }

    /// Consume into `(key, sessions)` pairs in ascending key order.
    pub fn into_windows(self) -> Vec<(WindowKey, Vec<SessionSummary>)> {
        self.windows.into_iter().collect()
    }
}

/// Group view events per session, join each with its purchase, and bucket the
/// resulting summaries by window.
///
/// Sessions without a purchase are dropped, as are purchases whose session has
/// no views. A second purchase for the same session is malformed input.
pub fn aggregate_sessions(
    session_events: &[RawEvent],
    purchases: &[RawEvent],
    window: &WindowSpec,
) -> Result<SessionWindows, PipelineError> {
    let mut targets: HashMap<SessionId, RawEvent> = HashMap::with_capacity(purchases.len());
    for (row, purchase) in purchases.iter().enumerate() {
        if targets.insert(purchase.session_id, *purchase).is_some() {
            // Header is line 1, so row `n` sits on line `n + 2`.
            return Err(PipelineError::malformed(
                PURCHASES,
                row as u64 + 2,
                format!("duplicate purchase for session {}", purchase.session_id),
            ));
        }
    }

    let mut grouped: HashMap<SessionId, Vec<RawEvent>> = HashMap::new();
    for event in session_events {
        grouped.entry(event.session_id).or_default().push(*event);
    }

    let mut windows: BTreeMap<WindowKey, Vec<SessionSummary>> = BTreeMap::new();
    let mut unpurchased = 0usize;
    for (session_id, mut events) in grouped {
        let Some(target) = targets.get(&session_id) else {
            unpurchased += 1;
            continue;
        };
        events.sort_by_key(|event| event.timestamp);
        let summary = summarize(session_id, &events, target, window);
        windows.entry(summary.window_key).or_default().push(summary);
    }
    for sessions in windows.values_mut() {
        sessions.sort_by_key(|summary| summary.session_id);
    }

    let windows = SessionWindows { windows };
    if unpurchased > 0 {
        debug!(
            "[rankprep:sessions] dropped {} sessions without a purchase",
            unpurchased
        );
    }
    info!(
        "[rankprep:sessions] joined {} sessions into {} windows",
        windows.session_count(),
        windows.window_count()
    );
    Ok(windows)
}

/// Build one summary from a session's time-ordered, non-empty events.
fn summarize(
    session_id: SessionId,
    events: &[RawEvent],
    target: &RawEvent,
    window: &WindowSpec,
) -> SessionSummary {
    let mut item_sequence: Vec<_> = events.iter().map(|event| event.item_id).collect();
    let mut timestamp_sequence: Vec<_> = events.iter().map(|event| event.timestamp).collect();
    let distinct_item_count = item_sequence.iter().collect::<HashSet<_>>().len();
    // `events` is sorted by timestamp, so the ends bound the range.
    let start = timestamp_sequence[0];
    let end = timestamp_sequence[timestamp_sequence.len() - 1];
    let last_item_id = item_sequence[item_sequence.len() - 1];

    item_sequence.push(target.item_id);
    timestamp_sequence.push(target.timestamp);

    SessionSummary {
        session_id,
        item_sequence,
        timestamp_sequence,
        distinct_item_count,
        duration_ms: end - start,
        last_item_id,
        target_item_id: target.item_id,
        target_timestamp: target.timestamp,
        window_key: window.key_for(start),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::windows::{DEFAULT_EPOCH_MS, DEFAULT_WINDOW_LENGTH_MS};

    fn event(session_id: SessionId, item_id: i64, offset_ms: i64) -> RawEvent {
        RawEvent {
            session_id,
            item_id,
            timestamp: DEFAULT_EPOCH_MS + offset_ms,
        }
    }

    #[test]
    fn summary_appends_target_and_orders_by_time() {
        let views = vec![event(1, 20, 5_000), event(1, 10, 1_000), event(1, 20, 3_000)];
        let purchases = vec![event(1, 30, 9_000)];
        let windows = aggregate_sessions(&views, &purchases, &WindowSpec::default()).unwrap();

        let sessions = windows.window(0).unwrap();
        assert_eq!(sessions.len(), 1);
        let summary = &sessions[0];
        assert_eq!(summary.item_sequence, vec![10, 20, 20, 30]);
        assert_eq!(
            summary.timestamp_sequence,
            vec![
                DEFAULT_EPOCH_MS + 1_000,
                DEFAULT_EPOCH_MS + 3_000,
                DEFAULT_EPOCH_MS + 5_000,
                DEFAULT_EPOCH_MS + 9_000,
            ]
        );
        assert_eq!(summary.distinct_item_count, 2);
        assert_eq!(summary.duration_ms, 4_000);
        assert_eq!(summary.last_item_id, 20);
        assert_eq!(summary.target_item_id, 30);
        assert_eq!(summary.viewed_items(), &[10, 20, 20]);
    }

    #[test]
    fn sessions_without_purchase_are_dropped() {
        let views = vec![event(1, 10, 0), event(2, 11, 0)];
        let purchases = vec![event(2, 12, 10), event(3, 13, 10)];
        let windows = aggregate_sessions(&views, &purchases, &WindowSpec::default()).unwrap();
        assert_eq!(windows.session_count(), 1);
        assert_eq!(windows.window(0).unwrap()[0].session_id, 2);
    }

    #[test]
    fn window_key_uses_session_start() {
        let views = vec![
            event(1, 10, DEFAULT_WINDOW_LENGTH_MS - 10),
            event(1, 11, DEFAULT_WINDOW_LENGTH_MS + 10),
            event(2, 10, DEFAULT_WINDOW_LENGTH_MS + 5),
            event(3, 10, -5),
        ];
        let purchases = vec![
            event(1, 12, DEFAULT_WINDOW_LENGTH_MS + 20),
            event(2, 12, DEFAULT_WINDOW_LENGTH_MS + 20),
            event(3, 12, 20),
        ];
        let windows = aggregate_sessions(&views, &purchases, &WindowSpec::default()).unwrap();
        let keys: Vec<WindowKey> = windows.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec![-1, 0, 1]);
        assert_eq!(windows.window(0).unwrap()[0].session_id, 1);
        assert_eq!(windows.window(1).unwrap()[0].session_id, 2);
        assert_eq!(windows.window(-1).unwrap()[0].session_id, 3);
    }

    #[test]
    fn sessions_sorted_within_window() {
        let views = vec![event(9, 1, 0), event(4, 1, 0), event(7, 1, 0)];
        let purchases = vec![event(7, 2, 1), event(9, 2, 1), event(4, 2, 1)];
        let windows = aggregate_sessions(&views, &purchases, &WindowSpec::default()).unwrap();
        let ids: Vec<SessionId> = windows
            .window(0)
            .unwrap()
            .iter()
            .map(|summary| summary.session_id)
            .collect();
        assert_eq!(ids, vec![4, 7, 9]);
    }

    #[test]
    fn duplicate_purchase_is_malformed() {
        let views = vec![event(1, 10, 0)];
        let purchases = vec![event(1, 11, 1), event(1, 12, 2)];
        let err = aggregate_sessions(&views, &purchases, &WindowSpec::default()).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput { line: 3, .. }));
    }
}
