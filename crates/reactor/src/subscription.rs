//! Subscription bookkeeping for the dispatcher.

use alloy_primitives::{Address, B256};
use feedrelay_core::{FeedError, Result};

/// One (source-ledger, source-contract, event-signature) triple the
/// dispatcher listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    /// Chain id of the source ledger.
    pub source_chain_id: u64,
    /// Contract identity of the origin publisher.
    pub source_contract: Address,
    /// Signature of the subscribed event.
    pub event_signature: B256,
    /// Soft-deactivation flag; inactive subscriptions stop matching but
    /// are never removed, preserving audit history.
    pub active: bool,
}

/// Ordered, append-only collection of subscriptions.
///
/// Duplicates are permitted; each equivalent subscription fires
/// independently at the transport layer.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionSet {
    subs: Vec<Subscription>,
}

impl SubscriptionSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an active subscription, returning its index.
    pub fn add(
        &mut self,
        source_chain_id: u64,
        source_contract: Address,
        event_signature: B256,
    ) -> usize {
        self.subs.push(Subscription {
            source_chain_id,
            source_contract,
            event_signature,
            active: true,
        });
        self.subs.len() - 1
    }

    /// Soft-deactivate the subscription at `index`.
    pub fn deactivate(&mut self, index: usize) -> Result<()> {
        match self.subs.get_mut(index) {
            Some(sub) => {
                sub.active = false;
                Ok(())
            }
            None => Err(FeedError::InvalidConfiguration(format!(
                "no subscription at index {index}"
            ))),
        }
    }

    /// True when any active subscription matches the given source.
    pub fn matches_active(&self, source_chain_id: u64, source_contract: Address) -> bool {
        self.subs.iter().any(|s| {
            s.active && s.source_chain_id == source_chain_id && s.source_contract == source_contract
        })
    }

    /// Subscription at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&Subscription> {
        self.subs.get(index)
    }

    /// Total number of subscriptions ever created, active or not.
    pub fn count(&self) -> usize {
        self.subs.len()
    }
}
