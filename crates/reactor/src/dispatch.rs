//! Notification handling and destination dispatch.

use std::sync::Arc;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use feedrelay_core::constants::{
    MAX_CONFIDENCE_THRESHOLD_BPS, MIN_CONFIDENCE_THRESHOLD_BPS,
};
use feedrelay_core::{Clock, FeedError, PriceUpdate};

use crate::retry::RetryPolicy;
use crate::subscription::SubscriptionSet;
use crate::temporal::{ConfidencePolicy, FreshnessConfidence, TemporalState};

/// One commit call to the destination store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitRequest {
    /// Round identifier from the origin payload.
    pub round_id: u64,
    /// Answer from the origin payload.
    pub answer: i128,
    /// Round start timestamp.
    pub started_at: u64,
    /// Payload update timestamp.
    pub updated_at: u64,
    /// Round in which the answer was computed.
    pub answered_in_round: u64,
}

/// Failure mode of one destination commit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Network/availability failure; the same payload may be retried.
    Transient(String),
    /// The destination's validation gates rejected the payload; retrying
    /// the same payload would fail identically.
    Rejected(FeedError),
}

/// Commit channel to the destination store.
///
/// The in-process transport wraps the destination proxy directly; a real
/// deployment would put an RPC client behind this trait.
#[async_trait]
pub trait DestinationTransport: Send + Sync {
    /// Attempt one commit of the given update.
    async fn commit(&self, request: &CommitRequest) -> Result<(), TransportError>;
}

/// A notification delivered by the transport substrate.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Chain id of the ledger the event was observed on.
    pub source_chain_id: u64,
    /// Contract that emitted the event.
    pub source_contract: Address,
    /// ABI-encoded 7-field payload.
    pub payload: Vec<u8>,
}

/// Operator-facing signal; dispatch failures are surfaced here, never to
/// the origin publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorSignal {
    /// The bounded retry budget was consumed without a successful commit.
    DispatchExhausted {
        /// Round the dropped payload carried.
        round_id: u64,
        /// Attempts made before giving up.
        attempts: u32,
    },
}

/// Why a notification was dropped without reaching the dispatch stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// Payload failed to ABI-decode.
    DecodeFailed,
    /// No active subscription matches the notification's source.
    NoMatchingSubscription,
}

/// Why a decodable, subscribed notification was not relayed this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Confidence fell under the minimum threshold.
    LowConfidence {
        /// The computed confidence in basis points.
        confidence_bps: u16,
    },
    /// Accumulated drift is over the healing threshold.
    DriftHealing,
}

/// Outcome of handling one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Committed at the destination.
    Relayed {
        /// Round that was committed.
        round_id: u64,
        /// Attempts it took.
        attempts: u32,
    },
    /// Dropped before dispatch.
    Discarded(DiscardReason),
    /// Deliberately not relayed this cycle (drift-healing path).
    Suppressed(SuppressReason),
    /// The destination's gates rejected the payload.
    Rejected {
        /// Round the payload carried.
        round_id: u64,
        /// The destination's specific error kind.
        error: FeedError,
    },
    /// Retry budget exhausted on transient failures; payload dropped.
    Exhausted {
        /// Round the dropped payload carried.
        round_id: u64,
        /// Attempts made.
        attempts: u32,
    },
}

/// The dispatcher.
///
/// Event-driven: invoked per notification, never polling. Owns its
/// subscriptions and temporal state; its only side channel is the bounded
/// commit call to the destination.
pub struct Reactor {
    owner: Address,
    destination: Option<(u64, Address)>,
    subscriptions: SubscriptionSet,
    temporal: TemporalState,
    confidence: Box<dyn ConfidencePolicy>,
    retry: RetryPolicy,
    transport: Arc<dyn DestinationTransport>,
    operator: Option<UnboundedSender<OperatorSignal>>,
    clock: Arc<dyn Clock>,
}

impl Reactor {
    /// Create a dispatcher with the default confidence and retry policies.
    pub fn new(owner: Address, transport: Arc<dyn DestinationTransport>, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_secs();
        Self {
            owner,
            destination: None,
            subscriptions: SubscriptionSet::new(),
            temporal: TemporalState::new(now),
            confidence: Box::new(FreshnessConfidence),
            retry: RetryPolicy::default(),
            transport,
            operator: None,
            clock,
        }
    }

    /// Swap in a different confidence policy.
    pub fn with_confidence_policy(mut self, policy: Box<dyn ConfidencePolicy>) -> Self {
        self.confidence = policy;
        self
    }

    /// Swap in a different retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Attach the operator signal channel.
    pub fn attach_operator_channel(&mut self, sender: UnboundedSender<OperatorSignal>) {
        self.operator = Some(sender);
    }

    /// Append an active subscription. Owner-only; duplicates permitted.
    pub fn subscribe(
        &mut self,
        caller: Address,
        source_chain_id: u64,
        source_contract: Address,
        event_signature: B256,
    ) -> Result<usize, FeedError> {
        if caller != self.owner {
            return Err(FeedError::Unauthorized(caller));
        }
        let index = self
            .subscriptions
            .add(source_chain_id, source_contract, event_signature);
        info!(
            index,
            source_chain_id,
            source_contract = %source_contract,
            event_signature = %event_signature,
            "subscription_created"
        );
        Ok(index)
    }

    /// Soft-deactivate a subscription. Owner-only.
    pub fn deactivate_subscription(
        &mut self,
        caller: Address,
        index: usize,
    ) -> Result<(), FeedError> {
        if caller != self.owner {
            return Err(FeedError::Unauthorized(caller));
        }
        self.subscriptions.deactivate(index)
    }

    /// Configure the destination. Owner-only; rejects a zero contract.
    pub fn set_destination(
        &mut self,
        caller: Address,
        chain_id: u64,
        contract: Address,
    ) -> Result<(), FeedError> {
        if caller != self.owner {
            return Err(FeedError::Unauthorized(caller));
        }
        if contract == Address::ZERO {
            return Err(FeedError::InvalidConfiguration(
                "invalid destination".to_string(),
            ));
        }
        self.destination = Some((chain_id, contract));
        Ok(())
    }

    /// Configured destination, if any.
    pub fn destination(&self) -> Option<(u64, Address)> {
        self.destination
    }

    /// Total subscriptions ever created.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.count()
    }

    /// Subscription at `index`.
    pub fn subscription(&self, index: usize) -> Option<&crate::subscription::Subscription> {
        self.subscriptions.get(index)
    }

    /// Current temporal state snapshot.
    pub fn temporal_state(&self) -> TemporalState {
        self.temporal
    }

    /// Handle one delivered notification end to end.
    pub async fn handle_notification(&mut self, notification: &Notification) -> DispatchOutcome {
        let update = match PriceUpdate::decode(&notification.payload) {
            Ok(update) => update,
            Err(err) => {
                debug!(error = %err, "discarding undecodable payload");
                return DispatchOutcome::Discarded(DiscardReason::DecodeFailed);
            }
        };

        if !self
            .subscriptions
            .matches_active(notification.source_chain_id, notification.source_contract)
        {
            debug!(
                source_chain_id = notification.source_chain_id,
                source_contract = %notification.source_contract,
                round_id = update.round_id,
                "discarding notification with no matching subscription"
            );
            return DispatchOutcome::Discarded(DiscardReason::NoMatchingSubscription);
        }

        let now = self.clock.now_secs();
        let age = now.saturating_sub(update.updated_at);

        if self.temporal.drift_exceeded() {
            self.temporal.heal_step();
            warn!(
                round_id = update.round_id,
                cumulative_drift = self.temporal.cumulative_drift,
                healing_attempts = self.temporal.healing_attempts,
                "relay suppressed while drift heals"
            );
            return DispatchOutcome::Suppressed(SuppressReason::DriftHealing);
        }

        let confidence_bps = self.confidence.confidence_bps(age);
        if confidence_bps < MIN_CONFIDENCE_THRESHOLD_BPS {
            self.temporal.record_suppression(age);
            warn!(
                round_id = update.round_id,
                confidence_bps,
                age_secs = age,
                cumulative_drift = self.temporal.cumulative_drift,
                "relay suppressed on low confidence"
            );
            return DispatchOutcome::Suppressed(SuppressReason::LowConfidence { confidence_bps });
        }
        if confidence_bps < MAX_CONFIDENCE_THRESHOLD_BPS {
            // Relayable, but the lag still counts against the drift budget.
            self.temporal.record_drift(age);
        }

        self.dispatch(&update).await
    }

    /// Issue the bounded-retry commit for an accepted update.
    async fn dispatch(&mut self, update: &PriceUpdate) -> DispatchOutcome {
        let request = CommitRequest {
            round_id: update.round_id,
            answer: update.answer,
            started_at: update.updated_at,
            updated_at: update.updated_at,
            answered_in_round: update.round_id,
        };

        let mut attempt = 0;
        while attempt < self.retry.max_attempts {
            attempt += 1;
            match self.transport.commit(&request).await {
                Ok(()) => {
                    let now = self.clock.now_secs();
                    self.temporal.record_relay(update.updated_at, now);
                    info!(round_id = update.round_id, attempts = attempt, "relay committed");
                    return DispatchOutcome::Relayed {
                        round_id: update.round_id,
                        attempts: attempt,
                    };
                }
                Err(TransportError::Rejected(error)) => {
                    warn!(
                        round_id = update.round_id,
                        error = %error,
                        "destination rejected the payload"
                    );
                    return DispatchOutcome::Rejected {
                        round_id: update.round_id,
                        error,
                    };
                }
                Err(TransportError::Transient(reason)) => {
                    warn!(
                        round_id = update.round_id,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        reason = %reason,
                        "commit attempt failed"
                    );
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.backoff_for(attempt)).await;
                    }
                }
            }
        }

        error!(
            round_id = update.round_id,
            attempts = attempt,
            "dispatch_failed"
        );
        if let Some(operator) = &self.operator {
            let _ = operator.send(OperatorSignal::DispatchExhausted {
                round_id: update.round_id,
                attempts: attempt,
            });
        }
        DispatchOutcome::Exhausted {
            round_id: update.round_id,
            attempts: attempt,
        }
    }

    /// Drain the notification channel until it closes.
    ///
    /// Returns the reactor so callers can inspect final state.
    pub async fn run(mut self, mut notifications: UnboundedReceiver<Notification>) -> Self {
        while let Some(notification) = notifications.recv().await {
            self.handle_notification(&notification).await;
        }
        self
    }
}
