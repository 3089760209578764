//! Domain types shared by the origin publisher and the destination proxy.

use serde::{Deserialize, Serialize};

/// One accepted feed update.
///
/// Immutable once committed to a [`crate::RoundStore`]; `round_id` is
/// strictly greater than every previously committed round in that store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Strictly increasing round identifier within a feed.
    pub round_id: u64,
    /// Feed value, scaled by the feed's `decimals`. Always positive once
    /// committed.
    pub answer: i128,
    /// Timestamp at which the round was started upstream.
    pub started_at: u64,
    /// Timestamp at which the answer was last updated upstream.
    pub updated_at: u64,
    /// Round in which the answer was computed.
    pub answered_in_round: u64,
}

/// Feed-level metadata, mutated only by the owning component on a
/// successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedMetadata {
    /// Human-readable feed description, e.g. "ETH/USD".
    pub description: String,
    /// Number of decimal places in `answer`.
    pub decimals: u8,
    /// Feed interface version.
    pub version: u64,
    /// Number of successfully committed updates.
    pub update_count: u64,
    /// Timestamp of the most recent successful commit, 0 if none.
    pub last_update_timestamp: u64,
}

impl FeedMetadata {
    /// Fresh metadata for a feed that has not committed anything yet.
    pub fn new(description: impl Into<String>, decimals: u8, version: u64) -> Self {
        Self {
            description: description.into(),
            decimals,
            version,
            update_count: 0,
            last_update_timestamp: 0,
        }
    }
}

/// Destination feed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Number of decimal places the destination reports.
    pub decimals: u8,
    /// Description the destination reports.
    pub description: String,
    /// Interface version the destination reports.
    pub version: u64,
    /// Circuit breaker; while true every commit attempt fails.
    pub paused: bool,
}

/// Derived health view over a destination feed. Purely computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthMetrics {
    /// True when a round exists and it is within the staleness threshold.
    pub healthy: bool,
    /// Seconds since the latest committed update, `None` if no data.
    pub seconds_since_update: Option<u64>,
    /// Total number of committed rounds.
    pub total_rounds: u64,
}
