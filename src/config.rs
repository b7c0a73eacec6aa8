use crate::constants::candidates::{DEFAULT_MAX_CANDIDATES, DEFAULT_NEGATIVE_SEED};
use crate::constants::catalog::DEFAULT_MIN_FEATURE_SHARE;
use crate::constants::windows::{DEFAULT_EPOCH_MS, DEFAULT_WINDOW_LENGTH_MS, MS_PER_DAY};
use crate::errors::PipelineError;
use crate::types::{TimestampMs, WindowKey};

/// Fixed-length time buckets sessions are grouped into by start time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowSpec {
    /// Reference instant (UTC ms) where window `0` starts.
    pub epoch_ms: TimestampMs,
    /// Window length in milliseconds.
    pub length_ms: TimestampMs,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            epoch_ms: DEFAULT_EPOCH_MS,
            length_ms: DEFAULT_WINDOW_LENGTH_MS,
        }
    }
}

impl WindowSpec {
    /// Window spec with the default epoch and a length given in whole days.
    pub fn with_days(days: u32) -> Self {
        Self {
            length_ms: TimestampMs::from(days) * MS_PER_DAY,
            ..Self::default()
        }
    }

    /// Window key for a session starting at `start_ms`.
    ///
    /// Uses floor division so instants before the epoch map to negative keys.
    pub fn key_for(&self, start_ms: TimestampMs) -> WindowKey {
        (start_ms - self.epoch_ms).div_euclid(self.length_ms)
    }
}

/// Strategy for picking negatives out of a window's purchase pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NegativeStrategy {
    /// Keep the lowest item ids among eligible negatives.
    #[default]
    LowestItemIds,
    /// Shuffle eligible negatives with a per-session seed before capping.
    SeededShuffle {
        /// Base seed mixed with the session id.
        seed: u64,
    },
}

impl NegativeStrategy {
    /// Shuffled strategy using the default seed.
    pub fn seeded_default() -> Self {
        Self::SeededShuffle {
            seed: DEFAULT_NEGATIVE_SEED,
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Session windowing.
    pub window: WindowSpec,
    /// Max candidates per training group, the purchased target included.
    pub max_candidates: usize,
    /// A categorical key is kept only when its total occurrence count is
    /// strictly greater than `min_feature_share * distinct_item_count`.
    pub min_feature_share: f64,
    /// How negatives are picked from the window pool.
    pub negative_strategy: NegativeStrategy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window: WindowSpec::default(),
            max_candidates: DEFAULT_MAX_CANDIDATES,
            min_feature_share: DEFAULT_MIN_FEATURE_SHARE,
            negative_strategy: NegativeStrategy::default(),
        }
    }
}

impl PipelineConfig {
    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.window.length_ms <= 0 {
            return Err(PipelineError::Configuration(format!(
                "window length must be positive, got {} ms",
                self.window.length_ms
            )));
        }
        if self.max_candidates == 0 {
            return Err(PipelineError::Configuration(
                "max_candidates must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_feature_share) {
            return Err(PipelineError::Configuration(format!(
                "min_feature_share must be within [0, 1], got {}",
                self.min_feature_share
            )));
        }
        Ok(())
    }
}
