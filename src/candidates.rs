use std::collections::{BTreeSet, HashSet};
use std::hash::Hash;

use rand::seq::SliceRandom;

use crate::config::NegativeStrategy;
use crate::constants::candidates::SESSION_SEED_OFFSET;
use crate::constants::encoder::{NEGATIVE_LABEL, POSITIVE_LABEL};
use crate::data::SessionSummary;
use crate::hash::stable_hash_with;
use crate::types::{ItemId, SessionId};

/// Distinct purchased items of one window, ascending.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CandidatePool {
    items: Vec<ItemId>,
}

impl CandidatePool {
    /// Collect the purchase targets of a window's sessions.
    pub fn from_sessions(sessions: &[SessionSummary]) -> Self {
        let items: BTreeSet<ItemId> = sessions
            .iter()
            .map(|session| session.target_item_id)
            .collect();
        Self {
            items: items.into_iter().collect(),
        }
    }

    /// Pool items in ascending order.
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    /// Number of distinct purchased items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` when the window had no purchases.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One member of a training group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub item_id: ItemId,
    /// `1` for the purchased item, `0` for a sampled negative.
    pub label: u8,
}

/// Build the candidate group for `session`.
///
/// Negatives are pool items the session neither viewed nor purchased, capped
/// at `max_candidates - 1` according to `strategy`. The purchased target is
/// always included on top of the negatives, so a group never exceeds
/// `max_candidates`. The returned group is ordered by item id.
pub fn sample_candidates(
    session: &SessionSummary,
    pool: &CandidatePool,
    max_candidates: usize,
    strategy: NegativeStrategy,
) -> Vec<Candidate> {
    let viewed: HashSet<ItemId> = session.viewed_items().iter().copied().collect();
    let target = session.target_item_id;
    let mut negatives: Vec<ItemId> = pool
        .items()
        .iter()
        .copied()
        .filter(|item| *item != target && !viewed.contains(item))
        .collect();
    let cap = max_candidates.saturating_sub(1);

    match strategy {
        NegativeStrategy::LowestItemIds => negatives.truncate(cap),
        NegativeStrategy::SeededShuffle { seed } => {
            let mut rng = DeterministicRng::new(session_seed(seed, session.session_id));
            negatives.shuffle(&mut rng);
            negatives.truncate(cap);
        }
    }

    let mut group: Vec<Candidate> = negatives
        .into_iter()
        .map(|item_id| Candidate {
            item_id,
            label: NEGATIVE_LABEL,
        })
        .collect();
    group.push(Candidate {
        item_id: target,
        label: POSITIVE_LABEL,
    });
    group.sort_unstable_by_key(|candidate| candidate.item_id);
    group
}

fn session_seed(seed: u64, session_id: SessionId) -> u64 {
    stable_hash_with(|hasher| {
        seed.wrapping_add(SESSION_SEED_OFFSET).hash(hasher);
        session_id.hash(hasher);
    })
}

/// Small splitmix64 RNG so shuffled negatives stay reproducible across runs.
#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64_internal(&mut self) -> u64 {
        let mut z = self.state.wrapping_add(0x9E3779B97F4A7C15);
        self.state = z;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }
}

impl rand::RngCore for DeterministicRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64_internal() as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next_u64_internal()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64_internal().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(session_id: SessionId, viewed: &[ItemId], target: ItemId) -> SessionSummary {
        let mut item_sequence = viewed.to_vec();
        item_sequence.push(target);
        SessionSummary {
            session_id,
            timestamp_sequence: vec![0; item_sequence.len()],
            item_sequence,
            distinct_item_count: viewed.iter().collect::<HashSet<_>>().len(),
            duration_ms: 0,
            last_item_id: *viewed.last().unwrap(),
            target_item_id: target,
            target_timestamp: 0,
            window_key: 0,
        }
    }

    fn pool(items: &[ItemId]) -> CandidatePool {
        let sessions: Vec<SessionSummary> = items
            .iter()
            .enumerate()
            .map(|(idx, item)| session(idx as SessionId, &[-1], *item))
            .collect();
        CandidatePool::from_sessions(&sessions)
    }

    #[test]
    fn pool_is_distinct_and_sorted() {
        let pool = pool(&[30, 10, 20, 10]);
        assert_eq!(pool.items(), &[10, 20, 30]);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn excludes_viewed_items_and_labels_target() {
        let pool = pool(&[1, 2, 3, 4, 5]);
        let group = sample_candidates(
            &session(7, &[2, 4], 3),
            &pool,
            20,
            NegativeStrategy::LowestItemIds,
        );
        assert_eq!(
            group,
            vec![
                Candidate {
                    item_id: 1,
                    label: 0
                },
                Candidate {
                    item_id: 3,
                    label: 1
                },
                Candidate {
                    item_id: 5,
                    label: 0
                },
            ]
        );
    }

    #[test]
    fn target_kept_even_when_viewed_or_outside_pool() {
        let pool = pool(&[1, 2]);
        let group = sample_candidates(
            &session(7, &[9, 1], 9),
            &pool,
            20,
            NegativeStrategy::LowestItemIds,
        );
        let ids: Vec<ItemId> = group.iter().map(|c| c.item_id).collect();
        assert_eq!(ids, vec![2, 9]);
        assert_eq!(group.iter().filter(|c| c.label == 1).count(), 1);
    }

    #[test]
    fn cap_keeps_lowest_ids_plus_target() {
        let pool = pool(&(1..=30).collect::<Vec<_>>());
        let group = sample_candidates(
            &session(1, &[2], 25),
            &pool,
            4,
            NegativeStrategy::LowestItemIds,
        );
        let ids: Vec<ItemId> = group.iter().map(|c| c.item_id).collect();
        assert_eq!(ids, vec![1, 3, 4, 25]);
    }

    #[test]
    fn max_one_yields_only_target() {
        let pool = pool(&[1, 2, 3]);
        let group = sample_candidates(&session(1, &[5], 2), &pool, 1, NegativeStrategy::LowestItemIds);
        assert_eq!(
            group,
            vec![Candidate {
                item_id: 2,
                label: 1
            }]
        );
    }

    #[test]
    fn seeded_shuffle_is_reproducible_and_bounded() {
        let pool = pool(&(1..=100).collect::<Vec<_>>());
        let sess = session(11, &[5, 6], 50);
        let strategy = NegativeStrategy::SeededShuffle { seed: 3 };
        let first = sample_candidates(&sess, &pool, 10, strategy);
        let second = sample_candidates(&sess, &pool, 10, strategy);
        assert_eq!(first, second);
        assert_eq!(first.len(), 10);
        assert!(first.windows(2).all(|pair| pair[0].item_id < pair[1].item_id));
        assert!(first.iter().any(|c| c.item_id == 50 && c.label == 1));
        assert!(first.iter().all(|c| c.item_id != 5 && c.item_id != 6));

        let other_session = sample_candidates(&session(12, &[5, 6], 50), &pool, 10, strategy);
        assert_ne!(first, other_session);
    }
}
