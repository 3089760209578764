//! Dispatcher for the feedrelay system.
//!
//! Subscribes to (source-ledger, source-contract, event-signature) triples,
//! decodes the canonical payload, evaluates a confidence/drift policy and
//! forwards accepted updates to the configured destination with bounded
//! retries. Delivery is fire-and-forget with local retry; the origin
//! publisher is never re-invoked.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dispatch;
pub mod retry;
pub mod subscription;
pub mod temporal;

pub use dispatch::{
    CommitRequest, DestinationTransport, DiscardReason, DispatchOutcome, Notification,
    OperatorSignal, Reactor, SuppressReason, TransportError,
};
pub use retry::RetryPolicy;
pub use subscription::{Subscription, SubscriptionSet};
pub use temporal::{ConfidencePolicy, FreshnessConfidence, TemporalState};
