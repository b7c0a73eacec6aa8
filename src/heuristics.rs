use std::collections::HashSet;

use crate::candidates::CandidatePool;
use crate::data::SessionSummary;
use crate::types::ItemId;

/// Upper bound on the lines one window can emit.
///
/// Each session gets its target plus at most `max_candidates - 1` negatives,
/// and never more negatives than the pool holds besides the target.
pub fn window_line_upper_bound(
    sessions: &[SessionSummary],
    pool: &CandidatePool,
    max_candidates: usize,
) -> u128 {
    let negatives_cap = max_candidates.saturating_sub(1) as u128;
    let pool_len = pool.len() as u128;
    sessions
        .iter()
        .map(|session| {
            let target_in_pool = pool.items().binary_search(&session.target_item_id).is_ok();
            let available = pool_len.saturating_sub(u128::from(target_in_pool));
            1 + available.min(negatives_cap)
        })
        .sum()
}

/// Distinct items referenced by a window's sessions, targets included.
pub fn window_item_count(sessions: &[SessionSummary]) -> usize {
    sessions
        .iter()
        .flat_map(|session| session.item_sequence.iter())
        .collect::<HashSet<&ItemId>>()
        .len()
}

/// Render `value` with thousands separators, e.g. `1,234,567`.
pub fn format_u128_with_commas(value: u128) -> String {
    let raw = value.to_string();
    let mut grouped_reversed = String::with_capacity(raw.len() + (raw.len() / 3));
    for (idx, ch) in raw.chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            grouped_reversed.push(',');
        }
        grouped_reversed.push(ch);
    }
    grouped_reversed.chars().rev().collect()
}
