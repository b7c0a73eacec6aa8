use std::collections::{HashMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, warn};

use crate::constants::catalog::{CATEGORY_KEY_PREFIX, VALUE_KEY_SEPARATOR};
use crate::data::ItemFeatureRow;
use crate::types::{CategoryId, FieldIndex, ItemId, ValueId};

/// Categorical signal key: `category=<C>` or `category=<C>,value=<V>`.
///
/// Ordering is numeric by category, with the category-only key ahead of its
/// category/value keys. Catalog indices follow this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureKey {
    pub category: CategoryId,
    pub value: Option<ValueId>,
}

impl FeatureKey {
    /// Key for a whole category.
    pub fn category(category: CategoryId) -> Self {
        Self {
            category,
            value: None,
        }
    }

    /// Key for one value of a category.
    pub fn category_value(category: CategoryId, value: ValueId) -> Self {
        Self {
            category,
            value: Some(value),
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CATEGORY_KEY_PREFIX, self.category)?;
        if let Some(value) = self.value {
            write!(f, "{}{}", VALUE_KEY_SEPARATOR, value)?;
        }
        Ok(())
    }
}

/// One surviving categorical feature of an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SparseFeature {
    /// Catalog index of the key.
    pub index: FieldIndex,
    /// Occurrences of the key among the item's metadata rows.
    pub count: u32,
}

/// Size counters reported after the catalog is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct CatalogStats {
    /// Distinct items in the metadata log.
    pub distinct_items: usize,
    /// Distinct keys before frequency filtering.
    pub keys_seen: usize,
    /// Keys that passed the frequency threshold.
    pub keys_kept: usize,
    /// Items with at least one surviving key.
    pub items_with_features: usize,
    /// Occurrence count a key had to exceed.
    pub threshold: f64,
}

/// Global, frequency-filtered mapping from categorical keys to indices.
///
/// Built once from the metadata log and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct FeatureCatalog {
    index: IndexMap<FeatureKey, FieldIndex>,
    items: HashMap<ItemId, Vec<SparseFeature>>,
    stats: CatalogStats,
}

impl FeatureCatalog {
    /// Build the catalog from raw metadata rows.
    ///
    /// Every row contributes one occurrence of its category key and one of its
    /// category/value key. A key survives when its total occurrences across all
    /// items is strictly greater than `min_share * distinct_items`.
    pub fn build(rows: &[ItemFeatureRow], min_share: f64) -> Self {
        let mut per_item: HashMap<(ItemId, FeatureKey), u32> = HashMap::new();
        let mut totals: HashMap<FeatureKey, u64> = HashMap::new();
        let mut distinct_items: HashSet<ItemId> = HashSet::new();
        for row in rows {
            distinct_items.insert(row.item_id);
            for key in [
                FeatureKey::category(row.category),
                FeatureKey::category_value(row.category, row.value),
            ] {
                *per_item.entry((row.item_id, key)).or_insert(0) += 1;
                *totals.entry(key).or_insert(0) += 1;
            }
        }

        let threshold = min_share * distinct_items.len() as f64;
        let mut kept: Vec<FeatureKey> = totals
            .iter()
            .filter(|(_, total)| **total as f64 > threshold)
            .map(|(key, _)| *key)
            .collect();
        kept.sort_unstable();
        let index: IndexMap<FeatureKey, FieldIndex> = kept
            .into_iter()
            .enumerate()
            .map(|(idx, key)| (key, idx as FieldIndex))
            .collect();

        let mut items: HashMap<ItemId, Vec<SparseFeature>> = HashMap::new();
        for ((item_id, key), count) in per_item {
            if let Some(&idx) = index.get(&key) {
                items
                    .entry(item_id)
                    .or_default()
                    .push(SparseFeature { index: idx, count });
            }
        }
        for features in items.values_mut() {
            features.sort_unstable_by_key(|feature| feature.index);
        }

        let stats = CatalogStats {
            distinct_items: distinct_items.len(),
            keys_seen: totals.len(),
            keys_kept: index.len(),
            items_with_features: items.len(),
            threshold,
        };
        info!(
            "[rankprep:catalog] kept {} of {} keys (threshold {:.2} over {} items); {} items carry features",
            stats.keys_kept,
            stats.keys_seen,
            stats.threshold,
            stats.distinct_items,
            stats.items_with_features
        );
        if index.is_empty() && !rows.is_empty() {
            warn!(
                "[rankprep:catalog] no metadata key cleared share {}; sparse blocks are empty",
                min_share
            );
        }
        Self {
            index,
            items,
            stats,
        }
    }

    /// Number of surviving keys; every sparse block reserves this many slots.
    pub fn width(&self) -> FieldIndex {
        self.index.len() as FieldIndex
    }

    /// Catalog index of `key`, if it survived filtering.
    pub fn index_of(&self, key: &FeatureKey) -> Option<FieldIndex> {
        self.index.get(key).copied()
    }

    /// Surviving keys in index order.
    pub fn keys(&self) -> impl Iterator<Item = &FeatureKey> {
        self.index.keys()
    }

    /// Surviving features of `item_id`, sorted by index.
    ///
    /// Items without surviving keys, or absent from the metadata log, yield an
    /// empty slice.
    pub fn item_features(&self, item_id: ItemId) -> &[SparseFeature] {
        self.items.get(&item_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Build counters.
    pub fn stats(&self) -> CatalogStats {
        self.stats
    }
}
