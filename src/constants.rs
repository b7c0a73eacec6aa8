/// Constants used by session windowing.
pub mod windows {
    use crate::types::TimestampMs;

    /// Reference instant for window keys: `2020-01-01T00:00:00Z`.
    pub const DEFAULT_EPOCH_MS: TimestampMs = 1_577_836_800_000;
    /// Length of one window (31 days) in milliseconds.
    pub const DEFAULT_WINDOW_LENGTH_MS: TimestampMs = 2_678_400_000;
    /// Milliseconds per day, used when the window length is configured in days.
    pub const MS_PER_DAY: TimestampMs = 86_400_000;
}

/// Constants used by the feature catalog.
pub mod catalog {
    /// Minimum share of distinct items a categorical key must exceed to be kept.
    pub const DEFAULT_MIN_FEATURE_SHARE: f64 = 0.05;
    /// Prefix of every categorical key (for example `category=56`).
    pub const CATEGORY_KEY_PREFIX: &str = "category=";
    /// Separator between the category and value parts of a key.
    pub const VALUE_KEY_SEPARATOR: &str = ",value=";
}

/// Constants used by candidate sampling.
pub mod candidates {
    /// Default upper bound of candidates per training group (target included).
    pub const DEFAULT_MAX_CANDIDATES: usize = 20;
    /// Default seed for the shuffled negative strategy.
    pub const DEFAULT_NEGATIVE_SEED: u64 = 42;
    /// Offset mixed into per-session shuffle seeds.
    pub const SESSION_SEED_OFFSET: u64 = 0x5E55_10A5;
}

/// Constants used by the line encoder.
pub mod encoder {
    /// Number of dense per-item statistics written for every item block.
    pub const ITEM_STAT_FIELDS: u32 = 7;
    /// Number of dense session-level fields at the start of every line.
    pub const SESSION_FIELDS: u32 = 2;
    /// Milliseconds per hour, used to express session duration in hours.
    pub const MS_PER_HOUR: f64 = 3_600_000.0;
    /// Label written for the purchased candidate.
    pub const POSITIVE_LABEL: u8 = 1;
    /// Label written for sampled negatives.
    pub const NEGATIVE_LABEL: u8 = 0;
    /// Group prefix used by the sparse ranked-learning format.
    pub const QID_PREFIX: &str = "qid:";
}

/// Source names used in errors and logs.
pub mod sources {
    /// Session view log.
    pub const SESSIONS: &str = "sessions";
    /// Purchase log.
    pub const PURCHASES: &str = "purchases";
    /// Item metadata log.
    pub const ITEM_FEATURES: &str = "item_features";
}

/// Default file locations used by the CLI runner.
pub mod paths {
    /// Default training output filename.
    pub const DEFAULT_OUTPUT: &str = "session_features.svm";
}
