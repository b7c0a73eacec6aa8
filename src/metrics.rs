use serde::Serialize;

use crate::catalog::CatalogStats;
use crate::types::WindowKey;

/// Aggregate skew metrics for per-window session counts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WindowSkew {
    pub total: usize,
    pub windows: usize,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
    pub max_share: f64,
    pub min_share: f64,
    pub ratio: f64,
    pub per_window: Vec<WindowShare>,
}

/// Per-window share of all sessions.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WindowShare {
    pub window: WindowKey,
    pub sessions: usize,
    pub share: f64,
}

/// Compute skew metrics from `(window, session count)` pairs.
/// `per_window` is sorted by descending count, then ascending window key.
pub fn window_skew(counts: &[(WindowKey, usize)]) -> Option<WindowSkew> {
    let min = counts.iter().map(|(_, count)| *count).min()?;
    let max = counts.iter().map(|(_, count)| *count).max()?;
    let total: usize = counts.iter().map(|(_, count)| *count).sum();
    let windows = counts.len();
    let share = |count: usize| {
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64
        }
    };
    let ratio = if min == 0 {
        f64::INFINITY
    } else {
        max as f64 / min as f64
    };
    let mut per_window: Vec<WindowShare> = counts
        .iter()
        .map(|(window, sessions)| WindowShare {
            window: *window,
            sessions: *sessions,
            share: share(*sessions),
        })
        .collect();
    per_window.sort_by(|a, b| b.sessions.cmp(&a.sessions).then_with(|| a.window.cmp(&b.window)));
    Some(WindowSkew {
        total,
        windows,
        min,
        max,
        mean: total as f64 / windows as f64,
        max_share: share(max),
        min_share: share(min),
        ratio,
        per_window,
    })
}

/// Counters for one pipeline run, written as JSON on request.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PipelineReport {
    /// Rows read from the session log.
    pub session_events: usize,
    /// Rows read from the purchase log.
    pub purchases: usize,
    /// Rows read from the item metadata log.
    pub item_feature_rows: usize,
    /// Sessions that joined with a purchase.
    pub sessions_joined: usize,
    /// Non-empty windows.
    pub windows: usize,
    /// Feature catalog counters.
    pub catalog: CatalogStats,
    /// Upper bound of lines implied by pool sizes and the candidate cap.
    pub estimated_max_lines: u128,
    /// Training groups (sessions) written.
    pub groups_written: usize,
    /// Lines written.
    pub lines_written: usize,
    /// Lines labeled as the purchased item.
    pub positive_lines: usize,
    /// Session balance across windows.
    pub window_skew: Option<WindowSkew>,
    /// Wall-clock seconds spent in the run.
    pub elapsed_secs: f64,
}
