//! Canonical thresholds for the feedrelay protocol.
//!
//! These values are part of the protocol contract between the three relay
//! stages and MUST stay in sync with any on-ledger deployment of the feed
//! contracts.

/// Maximum age of a payload timestamp before a publish or commit is
/// rejected as stale, in seconds.
pub const STALENESS_THRESHOLD_SECS: u64 = 3600;

/// Hard floor for the origin publisher's minimum update interval, in
/// seconds. `set_min_update_interval` rejects anything below this.
pub const MIN_UPDATE_INTERVAL_FLOOR_SECS: u64 = 30;

/// Default minimum interval between two successful publishes, in seconds.
pub const DEFAULT_MIN_UPDATE_INTERVAL_SECS: u64 = 60;

/// Maximum relative change between two consecutive committed answers, in
/// basis points (1000 = 10%). The flash-crash guard.
pub const MAX_DEVIATION_BPS: u64 = 1000;

/// Bounded retry budget for one dispatch of a payload to the destination.
pub const MAX_RELAY_ATTEMPTS: u32 = 3;

/// Confidence at or above this relays immediately, in basis points.
pub const MAX_CONFIDENCE_THRESHOLD_BPS: u16 = 8000;

/// Confidence below this suppresses the relay and enters the drift-healing
/// path, in basis points.
pub const MIN_CONFIDENCE_THRESHOLD_BPS: u16 = 5000;

/// Accumulated drift above this suppresses relaying until healing brings
/// it back under, in seconds.
pub const DRIFT_HEALING_THRESHOLD_SECS: i64 = 5000;

/// Version reported by both the origin and destination feed surfaces.
pub const FEED_VERSION: u64 = 1;

/// Basis-point scale used by the deviation and confidence math.
pub const BPS_SCALE: u64 = 10_000;
