//! Error taxonomy for the feedrelay validation gates.

use alloy_primitives::Address;
use thiserror::Error;

/// Validation and dispatch errors shared by all three relay stages.
///
/// Every rejected operation carries its specific kind so operators and
/// monitoring can tell adversarial input apart from infrastructure failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// Non-positive answer submitted at the publish or commit gate.
    #[error("invalid answer: must be positive")]
    InvalidAnswer,

    /// Submitted round is not strictly greater than the store's latest.
    /// Covers both replay and regression.
    #[error("invalid round id: submitted {submitted}, latest committed {latest}")]
    InvalidRoundId {
        /// The round id that was submitted.
        submitted: u64,
        /// The latest committed round id at the time of the attempt.
        latest: u64,
    },

    /// Payload timestamp exceeds the freshness bound.
    #[error("stale update: age {age_secs}s exceeds threshold {threshold_secs}s")]
    StaleUpdate {
        /// Seconds between now and the payload timestamp.
        age_secs: u64,
        /// Configured staleness threshold in seconds.
        threshold_secs: u64,
    },

    /// Publish attempted before the configured minimum interval elapsed.
    #[error("update too frequent: {elapsed_secs}s elapsed, minimum {min_interval_secs}s")]
    UpdateTooFrequent {
        /// Seconds since the last successful publish.
        elapsed_secs: u64,
        /// Configured minimum interval in seconds.
        min_interval_secs: u64,
    },

    /// Commit-time anomaly guard tripped: relative change from the prior
    /// committed answer exceeds the bound.
    #[error("deviation too high: {deviation_bps} bps exceeds maximum {max_bps} bps")]
    DeviationTooHigh {
        /// Observed deviation in basis points.
        deviation_bps: u64,
        /// Maximum permitted deviation in basis points.
        max_bps: u64,
    },

    /// Caller lacks the required capability (owner or authorized relayer).
    #[error("unauthorized caller {0}")]
    Unauthorized(Address),

    /// Destination circuit breaker is engaged.
    #[error("feed is paused")]
    FeedIsPaused,

    /// The dispatcher's bounded retry budget was consumed without success.
    /// Operator-visible only; never surfaced to the origin publisher.
    #[error("dispatch exhausted after {attempts} attempts")]
    DispatchExhausted {
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// Invalid configuration value supplied to an administrative operation
    /// or constructor.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type alias for [`FeedError`].
pub type Result<T> = std::result::Result<T, FeedError>;
