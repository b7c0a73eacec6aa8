use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::data::SessionSummary;
use crate::errors::PipelineError;
use crate::types::{ItemId, SessionId, WindowKey};

/// Per-item statistics for one window.
///
/// Invariants: `buy_count <= session_count`, `buy_percent` is within `[0, 1]`,
/// and every average or percentage is `0.0` when its denominator is zero.
/// Durations are milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ItemCacheEntry {
    pub item_id: ItemId,
    /// Distinct sessions of the window that touched the item.
    pub session_count: u32,
    /// Mean distinct-item count of those sessions.
    pub session_avg_len: f64,
    /// Mean duration of those sessions.
    pub session_avg_dur: f64,
    /// Sessions among them that purchased the item.
    pub buy_count: u32,
    pub bought_session_avg_len: f64,
    pub bought_session_avg_dur: f64,
    /// `buy_count / session_count`.
    pub buy_percent: f64,
}

impl ItemCacheEntry {
    /// The seven dense statistics in encoding order.
    pub fn dense_fields(&self) -> [f64; 7] {
        [
            f64::from(self.session_count),
            f64::from(self.buy_count),
            self.buy_percent,
            self.session_avg_len,
            self.session_avg_dur,
            self.bought_session_avg_len,
            self.bought_session_avg_dur,
        ]
    }
}

/// Running sums for one item while a window is being aggregated.
#[derive(Default)]
struct ItemAccumulator {
    sessions: HashSet<SessionId>,
    session_len: u64,
    session_dur: i128,
    buy_count: u32,
    bought_len: u64,
    bought_dur: i128,
}

impl ItemAccumulator {
    fn observe(&mut self, item_id: ItemId, session: &SessionSummary) {
        // Repeated views of the item in one session count once.
        if !self.sessions.insert(session.session_id) {
            return;
        }
        let len = session.distinct_item_count as u64;
        let dur = i128::from(session.duration_ms);
        self.session_len += len;
        self.session_dur += dur;
        if session.target_item_id == item_id {
            self.buy_count += 1;
            self.bought_len += len;
            self.bought_dur += dur;
        }
    }

    fn freeze(self, item_id: ItemId) -> ItemCacheEntry {
        let session_count = self.sessions.len() as u32;
        let buy_count = self.buy_count;
        ItemCacheEntry {
            item_id,
            session_count,
            session_avg_len: mean(self.session_len as f64, session_count),
            session_avg_dur: mean(self.session_dur as f64, session_count),
            buy_count,
            bought_session_avg_len: mean(self.bought_len as f64, buy_count),
            bought_session_avg_dur: mean(self.bought_dur as f64, buy_count),
            buy_percent: mean(f64::from(buy_count), session_count),
        }
    }
}

fn mean(total: f64, count: u32) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / f64::from(count)
    }
}

/// Accumulates a window's sessions before freezing them into an
/// [`ItemStatsTable`].
pub struct ItemStatsBuilder {
    window: WindowKey,
    items: HashMap<ItemId, ItemAccumulator>,
}

impl ItemStatsBuilder {
    /// Empty builder for `window`.
    pub fn new(window: WindowKey) -> Self {
        Self {
            window,
            items: HashMap::new(),
        }
    }

    /// Fold every item occurrence of `session`, target included.
    pub fn add_session(&mut self, session: &SessionSummary) {
        for item_id in &session.item_sequence {
            self.items
                .entry(*item_id)
                .or_default()
                .observe(*item_id, session);
        }
    }

    /// Finish aggregation. The returned table is read-only.
    pub fn freeze(self) -> ItemStatsTable {
        let entries = self
            .items
            .into_iter()
            .map(|(item_id, acc)| (item_id, acc.freeze(item_id)))
            .collect();
        ItemStatsTable {
            window: self.window,
            entries,
        }
    }
}

/// Frozen per-item statistics of one window.
#[derive(Clone, Debug)]
pub struct ItemStatsTable {
    window: WindowKey,
    entries: HashMap<ItemId, ItemCacheEntry>,
}

impl ItemStatsTable {
    /// Aggregate all sessions of one window.
    pub fn build(window: WindowKey, sessions: &[SessionSummary]) -> Self {
        let mut builder = ItemStatsBuilder::new(window);
        for session in sessions {
            builder.add_session(session);
        }
        builder.freeze()
    }

    /// Window the table was built for.
    pub fn window(&self) -> WindowKey {
        self.window
    }

    /// Number of distinct items seen in the window.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the window touched no items.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Statistics for `item_id`, if it occurred in the window.
    pub fn get(&self, item_id: ItemId) -> Option<&ItemCacheEntry> {
        self.entries.get(&item_id)
    }

    /// Statistics for an item that must have occurred in the window.
    ///
    /// A miss means the encoder referenced an item outside the aggregation
    /// pass, which is reported as [`PipelineError::CacheLookupMiss`].
    pub fn require(&self, item_id: ItemId) -> Result<&ItemCacheEntry, PipelineError> {
        self.entries
            .get(&item_id)
            .ok_or(PipelineError::CacheLookupMiss {
                window: self.window,
                item_id,
            })
    }

    /// Iterate entries in unspecified order.
    pub fn entries(&self) -> impl Iterator<Item = &ItemCacheEntry> {
        self.entries.values()
    }
}
