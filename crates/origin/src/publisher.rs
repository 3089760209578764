//! The origin publisher: upstream read -> validation gates -> round store
//! -> outbound notification.

use std::sync::Arc;

use alloy_primitives::Address;
use anyhow::{Context, Result};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use feedrelay_core::constants::{
    DEFAULT_MIN_UPDATE_INTERVAL_SECS, FEED_VERSION, MIN_UPDATE_INTERVAL_FLOOR_SECS,
    STALENESS_THRESHOLD_SECS,
};
use feedrelay_core::{Clock, FeedError, FeedMetadata, PriceUpdate, RoundRecord, RoundStore};

use crate::upstream::UpstreamFeed;

/// Source-side publisher.
///
/// Owns its round store and metadata; every successful
/// [`relay_latest_price`](Self::relay_latest_price) appends one record and
/// emits one notification. Gate failures leave all state unchanged.
pub struct OriginPublisher {
    feed: Arc<dyn UpstreamFeed>,
    feed_address: Address,
    owner: Address,
    destination_chain_id: u64,
    metadata: FeedMetadata,
    store: RoundStore,
    min_update_interval: u64,
    last_published_round_id: u64,
    clock: Arc<dyn Clock>,
    outbound: Option<UnboundedSender<Vec<u8>>>,
}

impl std::fmt::Debug for OriginPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OriginPublisher")
            .field("feed_address", &self.feed_address)
            .field("owner", &self.owner)
            .field("destination_chain_id", &self.destination_chain_id)
            .field("metadata", &self.metadata)
            .field("min_update_interval", &self.min_update_interval)
            .field("last_published_round_id", &self.last_published_round_id)
            .finish_non_exhaustive()
    }
}

impl OriginPublisher {
    /// Create a publisher over the given upstream feed.
    ///
    /// Rejects a zero upstream feed identity.
    pub fn new(
        feed: Arc<dyn UpstreamFeed>,
        feed_address: Address,
        description: impl Into<String>,
        destination_chain_id: u64,
        owner: Address,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, FeedError> {
        if feed_address == Address::ZERO {
            return Err(FeedError::InvalidConfiguration(
                "invalid feed address".to_string(),
            ));
        }
        let decimals = feed.decimals();
        Ok(Self {
            feed,
            feed_address,
            owner,
            destination_chain_id,
            metadata: FeedMetadata::new(description, decimals, FEED_VERSION),
            store: RoundStore::new(),
            min_update_interval: DEFAULT_MIN_UPDATE_INTERVAL_SECS,
            last_published_round_id: 0,
            clock,
            outbound: None,
        })
    }

    /// Attach the outbound notification channel.
    ///
    /// Emission is fire-and-forget: a dropped receiver is logged, never an
    /// error for the publish itself.
    pub fn attach_outbound(&mut self, sender: UnboundedSender<Vec<u8>>) {
        self.outbound = Some(sender);
    }

    /// Read the upstream feed and, if every gate passes, publish a vetted
    /// update.
    ///
    /// Gates, in order, first failure wins:
    /// 1. positive answer
    /// 2. upstream freshness within the staleness threshold
    /// 3. upstream round strictly newer than the last published round
    /// 4. minimum interval elapsed since the last successful publish
    pub fn relay_latest_price(&mut self) -> Result<PriceUpdate> {
        let upstream = self
            .feed
            .latest_round_data()
            .context("failed to read upstream feed")?;
        let now = self.clock.now_secs();

        if upstream.answer <= 0 {
            return Err(FeedError::InvalidAnswer.into());
        }

        let age = now.saturating_sub(upstream.updated_at);
        if age > STALENESS_THRESHOLD_SECS {
            return Err(FeedError::StaleUpdate {
                age_secs: age,
                threshold_secs: STALENESS_THRESHOLD_SECS,
            }
            .into());
        }

        if upstream.round_id <= self.last_published_round_id {
            return Err(FeedError::InvalidRoundId {
                submitted: upstream.round_id,
                latest: self.last_published_round_id,
            }
            .into());
        }

        let elapsed = now.saturating_sub(self.metadata.last_update_timestamp);
        if elapsed < self.min_update_interval {
            return Err(FeedError::UpdateTooFrequent {
                elapsed_secs: elapsed,
                min_interval_secs: self.min_update_interval,
            }
            .into());
        }

        let record = RoundRecord {
            round_id: upstream.round_id,
            answer: upstream.answer,
            started_at: upstream.started_at,
            updated_at: upstream.updated_at,
            answered_in_round: upstream.answered_in_round,
        };
        self.store.append(record)?;
        self.last_published_round_id = upstream.round_id;
        self.metadata.update_count += 1;
        self.metadata.last_update_timestamp = now;

        let update = PriceUpdate {
            round_id: record.round_id,
            answer: record.answer,
            updated_at: record.updated_at,
            decimals: self.metadata.decimals,
            description: self.metadata.description.clone(),
            destination_chain_id: self.destination_chain_id,
            version: self.metadata.version,
        };

        info!(
            round_id = update.round_id,
            answer = update.answer,
            updated_at = update.updated_at,
            decimals = update.decimals,
            description = %update.description,
            destination_chain_id = update.destination_chain_id,
            version = update.version,
            "price_update_emitted"
        );

        if let Some(outbound) = &self.outbound {
            if outbound.send(update.encode()).is_err() {
                warn!(
                    round_id = update.round_id,
                    "notification channel closed, update published locally only"
                );
            }
        } else {
            debug!(round_id = update.round_id, "no outbound channel attached");
        }

        Ok(update)
    }

    /// Update the minimum publish interval. Owner-only, floor 30s.
    pub fn set_min_update_interval(
        &mut self,
        caller: Address,
        interval_secs: u64,
    ) -> Result<(), FeedError> {
        if caller != self.owner {
            return Err(FeedError::Unauthorized(caller));
        }
        if interval_secs < MIN_UPDATE_INTERVAL_FLOOR_SECS {
            return Err(FeedError::InvalidConfiguration(format!(
                "interval too short: {interval_secs}s, floor {MIN_UPDATE_INTERVAL_FLOOR_SECS}s"
            )));
        }
        self.min_update_interval = interval_secs;
        Ok(())
    }

    /// Feed metadata (description, decimals, version, update count).
    pub fn metadata(&self) -> &FeedMetadata {
        &self.metadata
    }

    /// Most recently published round, if any.
    pub fn latest_round(&self) -> Option<&RoundRecord> {
        self.store.latest()
    }

    /// Identity of the upstream feed contract.
    pub fn feed_address(&self) -> Address {
        self.feed_address
    }

    /// Currently configured minimum publish interval in seconds.
    pub fn min_update_interval(&self) -> u64 {
        self.min_update_interval
    }

    /// Timestamp of the last successful publish, 0 if none.
    pub fn last_update_timestamp(&self) -> u64 {
        self.metadata.last_update_timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::{MockPriceFeed, RoundData};
    use feedrelay_core::ManualClock;

    const T0: u64 = 1_700_000_000;

    fn owner() -> Address {
        Address::repeat_byte(0x01)
    }

    fn setup() -> (Arc<MockPriceFeed>, Arc<ManualClock>, OriginPublisher) {
        let clock = Arc::new(ManualClock::new(T0));
        let feed = Arc::new(MockPriceFeed::new(8, clock.clone()));
        let publisher = OriginPublisher::new(
            feed.clone(),
            Address::repeat_byte(0xfe),
            "ETH/USD Relay",
            84532,
            owner(),
            clock.clone(),
        )
        .unwrap();
        (feed, clock, publisher)
    }

    fn unwrap_feed_err(err: anyhow::Error) -> FeedError {
        err.downcast::<FeedError>().expect("expected a FeedError")
    }

    #[test]
    fn rejects_zero_feed_address() {
        let clock = Arc::new(ManualClock::new(T0));
        let feed = Arc::new(MockPriceFeed::new(8, clock.clone()));
        let err = OriginPublisher::new(
            feed,
            Address::ZERO,
            "ETH/USD Relay",
            84532,
            owner(),
            clock,
        )
        .unwrap_err();
        assert!(matches!(err, FeedError::InvalidConfiguration(_)));
    }

    #[test]
    fn publishes_and_emits_the_canonical_payload() {
        let (_feed, _clock, mut publisher) = setup();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        publisher.attach_outbound(tx);

        let update = publisher.relay_latest_price().unwrap();
        assert_eq!(update.round_id, 1);
        assert_eq!(update.answer, MockPriceFeed::DEFAULT_PRICE);
        assert_eq!(update.decimals, 8);
        assert_eq!(update.destination_chain_id, 84532);
        assert_eq!(update.version, 1);

        let bytes = rx.try_recv().unwrap();
        assert_eq!(PriceUpdate::decode(&bytes).unwrap(), update);

        assert_eq!(publisher.metadata().update_count, 1);
        assert_eq!(publisher.latest_round().unwrap().round_id, 1);
    }

    #[test]
    fn rejects_non_positive_answer() {
        let (feed, clock, mut publisher) = setup();
        clock.advance(10);
        feed.set_price(0);

        let err = unwrap_feed_err(publisher.relay_latest_price().unwrap_err());
        assert_eq!(err, FeedError::InvalidAnswer);
        assert_eq!(publisher.metadata().update_count, 0);
        assert!(publisher.latest_round().is_none());
    }

    #[test]
    fn rejects_stale_upstream_round() {
        let (feed, clock, mut publisher) = setup();
        feed.set_round(RoundData {
            round_id: 2,
            answer: 100,
            started_at: T0,
            updated_at: T0,
            answered_in_round: 2,
        });
        clock.set(T0 + STALENESS_THRESHOLD_SECS + 1);

        let err = unwrap_feed_err(publisher.relay_latest_price().unwrap_err());
        assert!(matches!(err, FeedError::StaleUpdate { .. }));
    }

    #[test]
    fn rejects_republishing_the_same_upstream_round() {
        let (_feed, clock, mut publisher) = setup();
        publisher.relay_latest_price().unwrap();

        clock.advance(DEFAULT_MIN_UPDATE_INTERVAL_SECS + 1);
        let err = unwrap_feed_err(publisher.relay_latest_price().unwrap_err());
        assert_eq!(
            err,
            FeedError::InvalidRoundId {
                submitted: 1,
                latest: 1
            }
        );
    }

    #[test]
    fn enforces_minimum_update_interval() {
        let (feed, clock, mut publisher) = setup();
        publisher.relay_latest_price().unwrap();

        // New upstream round at t+30: still inside the 60s default interval.
        clock.advance(30);
        feed.set_price(210_000_000_000);
        let err = unwrap_feed_err(publisher.relay_latest_price().unwrap_err());
        assert_eq!(
            err,
            FeedError::UpdateTooFrequent {
                elapsed_secs: 30,
                min_interval_secs: DEFAULT_MIN_UPDATE_INTERVAL_SECS
            }
        );

        // A third attempt at t+61 succeeds.
        clock.advance(31);
        let update = publisher.relay_latest_price().unwrap();
        assert_eq!(update.round_id, 2);
        assert_eq!(publisher.metadata().update_count, 2);
    }

    #[test]
    fn min_update_interval_is_owner_gated_with_a_floor() {
        let (_feed, _clock, mut publisher) = setup();

        let err = publisher
            .set_min_update_interval(Address::repeat_byte(0x99), 120)
            .unwrap_err();
        assert!(matches!(err, FeedError::Unauthorized(_)));

        let err = publisher.set_min_update_interval(owner(), 20).unwrap_err();
        assert!(matches!(err, FeedError::InvalidConfiguration(_)));

        publisher.set_min_update_interval(owner(), 120).unwrap();
        assert_eq!(publisher.min_update_interval(), 120);
    }

    #[test]
    fn closed_channel_does_not_fail_the_publish() {
        let (_feed, _clock, mut publisher) = setup();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        publisher.attach_outbound(tx);

        let update = publisher.relay_latest_price().unwrap();
        assert_eq!(update.round_id, 1);
        assert_eq!(publisher.metadata().update_count, 1);
    }
}
