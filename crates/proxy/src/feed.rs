//! The destination feed proxy: commit gates, access control and the
//! read-compatible query surface.

use std::collections::HashSet;
use std::sync::Arc;

use alloy_primitives::Address;
use tracing::info;

use feedrelay_core::constants::{
    BPS_SCALE, FEED_VERSION, MAX_DEVIATION_BPS, STALENESS_THRESHOLD_SECS,
};
use feedrelay_core::{
    Clock, FeedConfig, FeedError, FeedMetadata, HealthMetrics, Result, RoundRecord, RoundStore,
};

/// Relative change between the previous and candidate answer, in basis
/// points. Multiplication overflow (absurd magnitudes) saturates, which
/// the caller treats as excessive deviation.
fn deviation_bps(previous: i128, candidate: i128) -> u64 {
    let prev = previous.unsigned_abs();
    let diff = previous.abs_diff(candidate);
    match diff.checked_mul(BPS_SCALE as u128) {
        Some(scaled) => u64::try_from(scaled / prev).unwrap_or(u64::MAX),
        None => u64::MAX,
    }
}

/// Destination-side feed store.
///
/// Single-threaded, serialized state machine: one candidate update is
/// validated and committed as one atomic unit. Every gate reads
/// pre-mutation state; any failure leaves the store completely unchanged.
pub struct DestinationFeedProxy {
    owner: Address,
    config: FeedConfig,
    metadata: FeedMetadata,
    authorized_relayers: HashSet<Address>,
    store: RoundStore,
    clock: Arc<dyn Clock>,
}

impl DestinationFeedProxy {
    /// Create an unpaused proxy with an empty authorization set.
    pub fn new(
        decimals: u8,
        description: impl Into<String>,
        owner: Address,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let description = description.into();
        Self {
            owner,
            config: FeedConfig {
                decimals,
                description: description.clone(),
                version: FEED_VERSION,
                paused: false,
            },
            metadata: FeedMetadata::new(description, decimals, FEED_VERSION),
            authorized_relayers: HashSet::new(),
            store: RoundStore::new(),
            clock,
        }
    }

    /// Commit one relayed update.
    ///
    /// Gates, in order, first failure wins:
    /// 1. caller is an authorized relayer
    /// 2. feed is not paused
    /// 3. positive answer
    /// 4. round id strictly greater than the latest committed (the sole
    ///    ordering/replay mechanism; there is no separate nonce)
    /// 5. deviation from the previous answer within the bound
    /// 6. payload timestamp within the staleness threshold
    #[allow(clippy::too_many_arguments)]
    pub fn update_price(
        &mut self,
        caller: Address,
        round_id: u64,
        answer: i128,
        started_at: u64,
        updated_at: u64,
        answered_in_round: u64,
    ) -> Result<RoundRecord> {
        if !self.authorized_relayers.contains(&caller) {
            return Err(FeedError::Unauthorized(caller));
        }
        if self.config.paused {
            return Err(FeedError::FeedIsPaused);
        }
        if answer <= 0 {
            return Err(FeedError::InvalidAnswer);
        }
        if let Some(latest) = self.store.latest() {
            if round_id <= latest.round_id {
                return Err(FeedError::InvalidRoundId {
                    submitted: round_id,
                    latest: latest.round_id,
                });
            }
            let deviation = deviation_bps(latest.answer, answer);
            if deviation > MAX_DEVIATION_BPS {
                return Err(FeedError::DeviationTooHigh {
                    deviation_bps: deviation,
                    max_bps: MAX_DEVIATION_BPS,
                });
            }
        }
        let now = self.clock.now_secs();
        let age = now.saturating_sub(updated_at);
        if age > STALENESS_THRESHOLD_SECS {
            return Err(FeedError::StaleUpdate {
                age_secs: age,
                threshold_secs: STALENESS_THRESHOLD_SECS,
            });
        }

        let record = RoundRecord {
            round_id,
            answer,
            started_at,
            updated_at,
            answered_in_round,
        };
        self.store.append(record)?;
        self.metadata.update_count += 1;
        self.metadata.last_update_timestamp = now;

        info!(
            round_id,
            answer,
            updated_at,
            caller = %caller,
            "price_updated"
        );
        Ok(record)
    }

    /// Grant or revoke a relayer's commit capability. Owner-only,
    /// immediate effect.
    pub fn set_relayer_authorization(
        &mut self,
        caller: Address,
        relayer: Address,
        authorized: bool,
    ) -> Result<()> {
        if caller != self.owner {
            return Err(FeedError::Unauthorized(caller));
        }
        if authorized {
            self.authorized_relayers.insert(relayer);
        } else {
            self.authorized_relayers.remove(&relayer);
        }
        info!(relayer = %relayer, authorized, caller = %caller, "relayer_authorized");
        Ok(())
    }

    /// Circuit breaker. Owner-only; while paused every commit fails.
    pub fn set_paused(&mut self, caller: Address, paused: bool) -> Result<()> {
        if caller != self.owner {
            return Err(FeedError::Unauthorized(caller));
        }
        self.config.paused = paused;
        info!(paused, caller = %caller, "feed_paused");
        Ok(())
    }

    /// Latest committed round; `None` when nothing has been committed.
    pub fn latest_round_data(&self) -> Option<RoundRecord> {
        self.store.latest().copied()
    }

    /// Specific round by id; `None` for unknown rounds.
    pub fn get_round_data(&self, round_id: u64) -> Option<RoundRecord> {
        self.store.get(round_id).copied()
    }

    /// Decimals the feed reports, matching the upstream interface.
    pub fn decimals(&self) -> u8 {
        self.config.decimals
    }

    /// Feed description.
    pub fn description(&self) -> &str {
        &self.config.description
    }

    /// Feed interface version.
    pub fn version(&self) -> u64 {
        self.config.version
    }

    /// Whether the given identity may call [`update_price`](Self::update_price).
    pub fn is_authorized(&self, relayer: Address) -> bool {
        self.authorized_relayers.contains(&relayer)
    }

    /// Current feed configuration.
    pub fn feed_config(&self) -> &FeedConfig {
        &self.config
    }

    /// Feed metadata (update count, last update timestamp).
    pub fn metadata(&self) -> &FeedMetadata {
        &self.metadata
    }

    /// Derived health view. Purely computed, no side effects.
    pub fn health_metrics(&self) -> HealthMetrics {
        let now = self.clock.now_secs();
        match self.store.latest() {
            Some(latest) => {
                let since = now.saturating_sub(latest.updated_at);
                HealthMetrics {
                    healthy: since <= STALENESS_THRESHOLD_SECS,
                    seconds_since_update: Some(since),
                    total_rounds: self.store.len(),
                }
            }
            None => HealthMetrics {
                healthy: false,
                seconds_since_update: None,
                total_rounds: 0,
            },
        }
    }

    /// True if no data has ever been committed or the latest round is
    /// past the freshness bound.
    pub fn is_stale(&self) -> bool {
        !self.health_metrics().healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedrelay_core::ManualClock;

    const T0: u64 = 1_700_000_000;
    const PRICE_2000: i128 = 200_000_000_000;

    fn owner() -> Address {
        Address::repeat_byte(0x01)
    }

    fn relayer() -> Address {
        Address::repeat_byte(0x02)
    }

    fn setup() -> (Arc<ManualClock>, DestinationFeedProxy) {
        let clock = Arc::new(ManualClock::new(T0));
        let mut proxy =
            DestinationFeedProxy::new(8, "ETH/USD Mirrored Feed", owner(), clock.clone());
        proxy
            .set_relayer_authorization(owner(), relayer(), true)
            .unwrap();
        (clock, proxy)
    }

    fn commit(proxy: &mut DestinationFeedProxy, round_id: u64, answer: i128, at: u64) -> Result<RoundRecord> {
        proxy.update_price(relayer(), round_id, answer, at, at, round_id)
    }

    #[test]
    fn initial_config_and_reads() {
        let (_clock, proxy) = setup();
        assert_eq!(proxy.decimals(), 8);
        assert_eq!(proxy.description(), "ETH/USD Mirrored Feed");
        assert_eq!(proxy.version(), 1);
        assert!(!proxy.feed_config().paused);
        assert!(proxy.latest_round_data().is_none());
        assert!(proxy.get_round_data(1).is_none());
    }

    #[test]
    fn commits_and_reads_back_byte_identical() {
        let (_clock, mut proxy) = setup();
        commit(&mut proxy, 1, PRICE_2000, T0).unwrap();

        let latest = proxy.latest_round_data().unwrap();
        assert_eq!(latest.round_id, 1);
        assert_eq!(latest.answer, PRICE_2000);
        assert_eq!(latest.answered_in_round, 1);
        assert_eq!(proxy.get_round_data(1).unwrap(), latest);
        assert_eq!(proxy.metadata().update_count, 1);
    }

    #[test]
    fn rejects_unauthorized_caller_regardless_of_payload() {
        let (_clock, mut proxy) = setup();
        let err = proxy
            .update_price(Address::repeat_byte(0x99), 1, PRICE_2000, T0, T0, 1)
            .unwrap_err();
        assert!(matches!(err, FeedError::Unauthorized(_)));
        assert!(proxy.latest_round_data().is_none());
    }

    #[test]
    fn deauthorization_takes_immediate_effect() {
        let (_clock, mut proxy) = setup();
        commit(&mut proxy, 1, PRICE_2000, T0).unwrap();

        proxy
            .set_relayer_authorization(owner(), relayer(), false)
            .unwrap();
        assert!(!proxy.is_authorized(relayer()));
        let err = commit(&mut proxy, 2, PRICE_2000, T0).unwrap_err();
        assert!(matches!(err, FeedError::Unauthorized(_)));
    }

    #[test]
    fn admin_operations_are_owner_gated() {
        let (_clock, mut proxy) = setup();
        let stranger = Address::repeat_byte(0x99);

        assert!(matches!(
            proxy.set_relayer_authorization(stranger, stranger, true),
            Err(FeedError::Unauthorized(_))
        ));
        assert!(matches!(
            proxy.set_paused(stranger, true),
            Err(FeedError::Unauthorized(_))
        ));
        assert!(!proxy.feed_config().paused);
    }

    #[test]
    fn rejects_non_positive_answer() {
        let (_clock, mut proxy) = setup();
        commit(&mut proxy, 1, PRICE_2000, T0).unwrap();

        assert_eq!(commit(&mut proxy, 2, 0, T0).unwrap_err(), FeedError::InvalidAnswer);
        assert_eq!(commit(&mut proxy, 2, -1, T0).unwrap_err(), FeedError::InvalidAnswer);

        // Round 1 remains latest.
        assert_eq!(proxy.latest_round_data().unwrap().round_id, 1);
        assert_eq!(proxy.metadata().update_count, 1);
    }

    #[test]
    fn rejects_replayed_and_regressed_rounds() {
        let (_clock, mut proxy) = setup();
        commit(&mut proxy, 100, PRICE_2000, T0).unwrap();

        let err = commit(&mut proxy, 50, PRICE_2000, T0).unwrap_err();
        assert_eq!(
            err,
            FeedError::InvalidRoundId {
                submitted: 50,
                latest: 100
            }
        );
        let err = commit(&mut proxy, 100, PRICE_2000, T0).unwrap_err();
        assert_eq!(
            err,
            FeedError::InvalidRoundId {
                submitted: 100,
                latest: 100
            }
        );
        assert_eq!(proxy.latest_round_data().unwrap().round_id, 100);
    }

    #[test]
    fn flash_crash_guard_rejects_excess_deviation() {
        let (_clock, mut proxy) = setup();
        commit(&mut proxy, 1, PRICE_2000, T0).unwrap();

        // $20 after $2000: a 99% drop.
        let err = commit(&mut proxy, 2, 2_000_000_000, T0).unwrap_err();
        assert_eq!(
            err,
            FeedError::DeviationTooHigh {
                deviation_bps: 9_900,
                max_bps: MAX_DEVIATION_BPS
            }
        );
        assert_eq!(proxy.latest_round_data().unwrap().answer, PRICE_2000);

        // A 10% move is exactly at the bound and accepted.
        commit(&mut proxy, 2, PRICE_2000 * 110 / 100, T0).unwrap();
        assert_eq!(proxy.latest_round_data().unwrap().round_id, 2);
    }

    #[test]
    fn deviation_math_saturates_on_absurd_magnitudes() {
        assert_eq!(deviation_bps(1, i128::MAX), u64::MAX);
        assert_eq!(deviation_bps(PRICE_2000, PRICE_2000), 0);
    }

    #[test]
    fn rejects_stale_updates() {
        let (clock, mut proxy) = setup();
        clock.set(T0 + STALENESS_THRESHOLD_SECS + 1);

        let err = commit(&mut proxy, 1, PRICE_2000, T0).unwrap_err();
        assert_eq!(
            err,
            FeedError::StaleUpdate {
                age_secs: STALENESS_THRESHOLD_SECS + 1,
                threshold_secs: STALENESS_THRESHOLD_SECS
            }
        );

        // A future-dated timestamp is treated as age zero, not stale.
        commit(&mut proxy, 1, PRICE_2000, clock.now_secs() + 120).unwrap();
    }

    #[test]
    fn pause_blocks_all_commits_and_unpausing_restores_gates() {
        let (_clock, mut proxy) = setup();
        commit(&mut proxy, 1, PRICE_2000, T0).unwrap();

        proxy.set_paused(owner(), true).unwrap();
        assert!(proxy.feed_config().paused);
        assert_eq!(
            commit(&mut proxy, 2, PRICE_2000, T0).unwrap_err(),
            FeedError::FeedIsPaused
        );

        // No residual effect from attempts rejected during the pause.
        proxy.set_paused(owner(), false).unwrap();
        commit(&mut proxy, 2, PRICE_2000, T0).unwrap();
        assert_eq!(proxy.latest_round_data().unwrap().round_id, 2);
        assert_eq!(proxy.metadata().update_count, 2);
    }

    #[test]
    fn health_metrics_track_freshness() {
        let (clock, mut proxy) = setup();

        let health = proxy.health_metrics();
        assert!(!health.healthy);
        assert_eq!(health.seconds_since_update, None);
        assert_eq!(health.total_rounds, 0);
        assert!(proxy.is_stale());

        commit(&mut proxy, 1, PRICE_2000, T0).unwrap();
        let health = proxy.health_metrics();
        assert!(health.healthy);
        assert_eq!(health.seconds_since_update, Some(0));
        assert_eq!(health.total_rounds, 1);
        assert!(!proxy.is_stale());

        clock.advance(STALENESS_THRESHOLD_SECS + 1);
        assert!(proxy.is_stale());
        assert!(!proxy.health_metrics().healthy);
    }
}
