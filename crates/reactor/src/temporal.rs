//! Temporal state and confidence/drift policy.
//!
//! Drift tracks the lag between origin publication and destination
//! commitment. Confidence is a pluggable score over payload freshness; only
//! the MIN/MAX threshold contract is fixed, the formula is policy.

use feedrelay_core::constants::{
    BPS_SCALE, DRIFT_HEALING_THRESHOLD_SECS, STALENESS_THRESHOLD_SECS,
};

/// Dispatcher state carried across relay cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalState {
    /// Timestamp of the last origin publication relayed successfully.
    pub last_origin_update: u64,
    /// Timestamp of the last successful destination commit.
    pub last_destination_relay: u64,
    /// Accumulated publish-to-commit lag, in seconds.
    pub cumulative_drift: i64,
    /// Number of suppressed relay cycles spent healing drift.
    pub healing_attempts: u32,
}

impl TemporalState {
    /// Initial state at dispatcher construction time.
    pub fn new(now: u64) -> Self {
        Self {
            last_origin_update: now,
            last_destination_relay: now,
            cumulative_drift: 0,
            healing_attempts: 0,
        }
    }

    /// True while accumulated drift is above the healing threshold, which
    /// suppresses relaying until healing brings it back under.
    pub fn drift_exceeded(&self) -> bool {
        self.cumulative_drift > DRIFT_HEALING_THRESHOLD_SECS
    }

    /// Charge an observed publish-to-relay gap against the drift budget.
    pub fn record_drift(&mut self, gap_secs: u64) {
        self.cumulative_drift = self
            .cumulative_drift
            .saturating_add(i64::try_from(gap_secs).unwrap_or(i64::MAX));
    }

    /// A suppressed relay cycle: the gap still counts as drift and the
    /// cycle counts as a healing attempt.
    pub fn record_suppression(&mut self, gap_secs: u64) {
        self.record_drift(gap_secs);
        self.healing_attempts += 1;
    }

    /// One healing step while drift is over the threshold: the cycle is
    /// spent decaying drift instead of relaying.
    pub fn heal_step(&mut self) {
        self.healing_attempts += 1;
        self.cumulative_drift /= 2;
    }

    /// A successful relay: advance both watermarks and let the fresh
    /// delivery decay half of the accumulated drift.
    pub fn record_relay(&mut self, origin_updated_at: u64, now: u64) {
        self.last_origin_update = origin_updated_at;
        self.last_destination_relay = now;
        self.cumulative_drift /= 2;
    }
}

/// Pluggable confidence score over payload freshness.
pub trait ConfidencePolicy: Send + Sync {
    /// Confidence in basis points (0..=10000) for a payload whose
    /// timestamp is `age_secs` old.
    fn confidence_bps(&self, age_secs: u64) -> u16;
}

/// Default policy: full confidence for a fresh payload, decaying linearly
/// to zero at the staleness threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreshnessConfidence;

impl ConfidencePolicy for FreshnessConfidence {
    fn confidence_bps(&self, age_secs: u64) -> u16 {
        if age_secs >= STALENESS_THRESHOLD_SECS {
            return 0;
        }
        let decayed = BPS_SCALE - age_secs * BPS_SCALE / STALENESS_THRESHOLD_SECS;
        decayed as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedrelay_core::constants::{
        MAX_CONFIDENCE_THRESHOLD_BPS, MIN_CONFIDENCE_THRESHOLD_BPS,
    };

    #[test]
    fn fresh_payload_has_full_confidence() {
        let policy = FreshnessConfidence;
        assert_eq!(policy.confidence_bps(0), 10_000);
        assert!(policy.confidence_bps(60) >= MAX_CONFIDENCE_THRESHOLD_BPS);
    }

    #[test]
    fn confidence_decays_linearly_to_zero() {
        let policy = FreshnessConfidence;
        assert_eq!(policy.confidence_bps(STALENESS_THRESHOLD_SECS / 2), 5_000);
        assert_eq!(policy.confidence_bps(STALENESS_THRESHOLD_SECS), 0);
        assert_eq!(policy.confidence_bps(STALENESS_THRESHOLD_SECS * 10), 0);
    }

    #[test]
    fn mid_age_payload_lands_between_thresholds() {
        let policy = FreshnessConfidence;
        // 40% of the staleness window: 6000 bps.
        let c = policy.confidence_bps(STALENESS_THRESHOLD_SECS * 2 / 5);
        assert!(c >= MIN_CONFIDENCE_THRESHOLD_BPS);
        assert!(c < MAX_CONFIDENCE_THRESHOLD_BPS);
    }

    #[test]
    fn drift_accumulates_and_heals() {
        let mut state = TemporalState::new(1_000);
        assert!(!state.drift_exceeded());

        state.record_drift(3_000);
        state.record_suppression(2_500);
        assert_eq!(state.cumulative_drift, 5_500);
        assert_eq!(state.healing_attempts, 1);
        assert!(state.drift_exceeded());

        state.heal_step();
        assert_eq!(state.cumulative_drift, 2_750);
        assert_eq!(state.healing_attempts, 2);
        assert!(!state.drift_exceeded());
    }

    #[test]
    fn successful_relay_advances_watermarks_and_decays_drift() {
        let mut state = TemporalState::new(1_000);
        state.record_drift(1_000);
        state.record_relay(2_000, 2_010);

        assert_eq!(state.last_origin_update, 2_000);
        assert_eq!(state.last_destination_relay, 2_010);
        assert_eq!(state.cumulative_drift, 500);
    }
}
