//! Append-only round history with fast latest lookup.

use crate::error::{FeedError, Result};
use crate::types::RoundRecord;

/// Append-only, monotonically-keyed history of accepted updates.
///
/// Both the origin publisher and the destination proxy keep their own
/// instance. The store itself enforces only the ordering invariant; the
/// remaining validation gates live with the component that owns the store.
#[derive(Debug, Clone, Default)]
pub struct RoundStore {
    rounds: Vec<RoundRecord>,
}

impl RoundStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, enforcing strictly increasing round ids.
    ///
    /// Returns `InvalidRoundId` without mutating the store if the record
    /// does not advance past the latest committed round.
    pub fn append(&mut self, record: RoundRecord) -> Result<()> {
        if let Some(latest) = self.latest() {
            if record.round_id <= latest.round_id {
                return Err(FeedError::InvalidRoundId {
                    submitted: record.round_id,
                    latest: latest.round_id,
                });
            }
        }
        self.rounds.push(record);
        Ok(())
    }

    /// The most recently committed record, if any.
    pub fn latest(&self) -> Option<&RoundRecord> {
        self.rounds.last()
    }

    /// Look up a specific round by id.
    ///
    /// Round ids are strictly increasing, so a binary search over the
    /// arena suffices even when the sequence has gaps.
    pub fn get(&self, round_id: u64) -> Option<&RoundRecord> {
        self.rounds
            .binary_search_by_key(&round_id, |r| r.round_id)
            .ok()
            .map(|idx| &self.rounds[idx])
    }

    /// Number of committed rounds.
    pub fn len(&self) -> u64 {
        self.rounds.len() as u64
    }

    /// True when nothing has been committed yet.
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(round_id: u64, answer: i128) -> RoundRecord {
        RoundRecord {
            round_id,
            answer,
            started_at: 1_000,
            updated_at: 1_000,
            answered_in_round: round_id,
        }
    }

    #[test]
    fn append_and_latest() {
        let mut store = RoundStore::new();
        assert!(store.latest().is_none());

        store.append(record(1, 100)).unwrap();
        store.append(record(2, 110)).unwrap();

        assert_eq!(store.latest().unwrap().round_id, 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn rejects_replay_and_regression() {
        let mut store = RoundStore::new();
        store.append(record(100, 100)).unwrap();

        let err = store.append(record(100, 100)).unwrap_err();
        assert_eq!(
            err,
            FeedError::InvalidRoundId {
                submitted: 100,
                latest: 100
            }
        );

        let err = store.append(record(50, 100)).unwrap_err();
        assert_eq!(
            err,
            FeedError::InvalidRoundId {
                submitted: 50,
                latest: 100
            }
        );

        // Rejections leave the store untouched.
        assert_eq!(store.len(), 1);
        assert_eq!(store.latest().unwrap().round_id, 100);
    }

    #[test]
    fn get_handles_sparse_ids() {
        let mut store = RoundStore::new();
        store.append(record(1, 100)).unwrap();
        store.append(record(5, 110)).unwrap();
        store.append(record(9, 120)).unwrap();

        assert_eq!(store.get(5).unwrap().answer, 110);
        assert!(store.get(4).is_none());
        assert!(store.get(10).is_none());
    }
}
