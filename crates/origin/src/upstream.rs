//! Upstream feed read interface.
//!
//! The publisher only ever reads from the upstream feed; it never writes.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use feedrelay_core::Clock;

/// One round as read from the upstream feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundData {
    /// Upstream round identifier.
    pub round_id: u64,
    /// Answer, scaled by the feed's decimals.
    pub answer: i128,
    /// When the round was started.
    pub started_at: u64,
    /// When the answer was last updated.
    pub updated_at: u64,
    /// Round in which the answer was computed.
    pub answered_in_round: u64,
}

/// Read-only view of an upstream aggregator feed.
pub trait UpstreamFeed: Send + Sync {
    /// Latest round as reported by the upstream source.
    fn latest_round_data(&self) -> Result<RoundData>;

    /// Number of decimal places in the upstream answer.
    fn decimals(&self) -> u8;
}

/// Settable in-memory feed for local runs and tests.
///
/// Each `set_price` advances the round id and stamps the round with the
/// current clock time, mimicking an aggregator that answers immediately.
pub struct MockPriceFeed {
    decimals: u8,
    clock: Arc<dyn Clock>,
    latest: Mutex<RoundData>,
}

impl MockPriceFeed {
    /// Default mock price: $2000 at 8 decimals.
    pub const DEFAULT_PRICE: i128 = 200_000_000_000;

    /// Create a mock feed seeded with the default price as round 1.
    pub fn new(decimals: u8, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_secs();
        Self {
            decimals,
            clock,
            latest: Mutex::new(RoundData {
                round_id: 1,
                answer: Self::DEFAULT_PRICE,
                started_at: now,
                updated_at: now,
                answered_in_round: 1,
            }),
        }
    }

    /// Publish a new answer as the next upstream round.
    pub fn set_price(&self, answer: i128) {
        let now = self.clock.now_secs();
        let mut latest = self.latest.lock().expect("mock feed lock poisoned");
        let round_id = latest.round_id + 1;
        *latest = RoundData {
            round_id,
            answer,
            started_at: now,
            updated_at: now,
            answered_in_round: round_id,
        };
    }

    /// Overwrite the latest round wholesale. Lets tests shape stale or
    /// otherwise degenerate upstream data.
    pub fn set_round(&self, round: RoundData) {
        *self.latest.lock().expect("mock feed lock poisoned") = round;
    }
}

impl UpstreamFeed for MockPriceFeed {
    fn latest_round_data(&self) -> Result<RoundData> {
        Ok(*self.latest.lock().expect("mock feed lock poisoned"))
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedrelay_core::ManualClock;

    #[test]
    fn set_price_advances_round() {
        let clock = Arc::new(ManualClock::new(1_000));
        let feed = MockPriceFeed::new(8, clock.clone());

        let first = feed.latest_round_data().unwrap();
        assert_eq!(first.round_id, 1);
        assert_eq!(first.answer, MockPriceFeed::DEFAULT_PRICE);

        clock.advance(10);
        feed.set_price(250_000_000_000);

        let second = feed.latest_round_data().unwrap();
        assert_eq!(second.round_id, 2);
        assert_eq!(second.answer, 250_000_000_000);
        assert_eq!(second.updated_at, 1_010);
    }
}
