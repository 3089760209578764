//! In-process pipeline wiring.
//!
//! Builds the three relay stages and connects them with the explicit
//! channels the protocol defines: publisher -> (encoded payload) ->
//! dispatcher -> (bounded-retry commit) -> destination proxy.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use alloy_primitives::Address;
use feedrelay_core::{Clock, FeedError, PriceUpdate, SystemClock};
use feedrelay_origin::{MockPriceFeed, OriginPublisher, UpstreamFeed};
use feedrelay_proxy::DestinationFeedProxy;
use feedrelay_reactor::{
    CommitRequest, DestinationTransport, Notification, OperatorSignal, Reactor, RetryPolicy,
    TransportError,
};

use crate::config::Config;

/// Transport that commits straight into a shared destination proxy.
///
/// Stands in for the cross-ledger call; a live deployment would put an
/// RPC client behind the same trait.
pub struct InProcessTransport {
    proxy: Arc<Mutex<DestinationFeedProxy>>,
    relayer: Address,
}

impl InProcessTransport {
    /// Commit into `proxy` with the given relayer identity.
    pub fn new(proxy: Arc<Mutex<DestinationFeedProxy>>, relayer: Address) -> Self {
        Self { proxy, relayer }
    }
}

#[async_trait]
impl DestinationTransport for InProcessTransport {
    async fn commit(&self, request: &CommitRequest) -> Result<(), TransportError> {
        let mut proxy = self
            .proxy
            .lock()
            .map_err(|_| TransportError::Transient("destination lock poisoned".to_string()))?;
        proxy
            .update_price(
                self.relayer,
                request.round_id,
                request.answer,
                request.started_at,
                request.updated_at,
                request.answered_in_round,
            )
            .map(|_| ())
            .map_err(TransportError::Rejected)
    }
}

/// The assembled pipeline, ready to run.
pub struct Pipeline {
    /// Mock upstream feed the daemon nudges each cycle.
    pub feed: Arc<MockPriceFeed>,
    /// Source-side publisher.
    pub publisher: OriginPublisher,
    /// Dispatcher, already subscribed to the origin.
    pub reactor: Reactor,
    /// Shared destination store.
    pub proxy: Arc<Mutex<DestinationFeedProxy>>,
    /// Raw payload bytes emitted by the publisher.
    pub payload_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    /// Operator-facing dispatch failure signals.
    pub operator_rx: mpsc::UnboundedReceiver<OperatorSignal>,
    config: Config,
}

impl Pipeline {
    /// Wire up all three stages from the given configuration.
    pub fn build(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let feed = Arc::new(MockPriceFeed::new(config.feed.decimals, clock.clone()));

        let (payload_tx, payload_rx) = mpsc::unbounded_channel();
        let mut publisher = OriginPublisher::new(
            feed.clone(),
            config.origin.feed_contract,
            config.feed.description.clone(),
            config.destination.chain_id,
            config.relay.owner,
            clock.clone(),
        )?;
        publisher.attach_outbound(payload_tx);
        publisher.set_min_update_interval(
            config.relay.owner,
            config.origin.min_update_interval_secs,
        )?;

        let proxy = Arc::new(Mutex::new(DestinationFeedProxy::new(
            config.feed.decimals,
            config.feed.description.clone(),
            config.relay.owner,
            clock.clone(),
        )));
        proxy
            .lock()
            .map_err(|_| anyhow::anyhow!("destination lock poisoned"))?
            .set_relayer_authorization(config.relay.owner, config.relay.relayer, true)?;

        let transport = Arc::new(InProcessTransport::new(proxy.clone(), config.relay.relayer));
        let mut reactor = Reactor::new(config.relay.owner, transport, clock).with_retry_policy(
            RetryPolicy {
                max_attempts: config.relay.max_attempts,
                backoff: Duration::from_millis(config.relay.backoff_ms),
            },
        );
        reactor.subscribe(
            config.relay.owner,
            config.origin.chain_id,
            config.origin.contract,
            PriceUpdate::event_signature(),
        )?;
        reactor.set_destination(
            config.relay.owner,
            config.destination.chain_id,
            config.destination.contract,
        )?;

        let (operator_tx, operator_rx) = mpsc::unbounded_channel();
        reactor.attach_operator_channel(operator_tx);

        Ok(Self {
            feed,
            publisher,
            reactor,
            proxy,
            payload_rx,
            operator_rx,
            config,
        })
    }

    /// Build against the system clock.
    pub fn from_config(config: Config) -> Result<Self> {
        Self::build(config, Arc::new(SystemClock))
    }

    /// Run one publish cycle synchronously: nudge the mock upstream,
    /// publish, and relay the emitted notification. Returns the outcome
    /// of the destination commit for status reporting.
    pub async fn tick(&mut self, cycle: u64) -> Result<()> {
        // Walk the mock price by ±0.1% so consecutive rounds stay well
        // inside the deviation bound.
        let latest = self.feed.latest_round_data()?;
        let step = latest.answer / 1000;
        let next = if cycle % 2 == 0 {
            latest.answer + step
        } else {
            latest.answer - step
        };
        self.feed.set_price(next);

        match self.publisher.relay_latest_price() {
            Ok(update) => info!(round_id = update.round_id, "published"),
            Err(err) => match err.downcast_ref::<FeedError>() {
                Some(FeedError::UpdateTooFrequent { .. }) => {
                    info!("publish skipped: minimum interval not yet elapsed");
                    return Ok(());
                }
                _ => return Err(err),
            },
        }

        while let Ok(payload) = self.payload_rx.try_recv() {
            let notification = Notification {
                source_chain_id: self.config.origin.chain_id,
                source_contract: self.config.origin.contract,
                payload,
            };
            let outcome = self.reactor.handle_notification(&notification).await;
            info!(?outcome, "notification handled");
        }
        Ok(())
    }

    /// Run the daemon until interrupted: a publish loop on the configured
    /// interval, with every emitted payload dispatched in turn.
    pub async fn run(mut self) -> Result<()> {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.origin.publish_interval_secs));
        let mut cycle: u64 = 0;

        info!(
            description = %self.config.feed.description,
            publish_interval_secs = self.config.origin.publish_interval_secs,
            "relay pipeline started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    cycle += 1;
                    if let Err(err) = self.tick(cycle).await {
                        error!(error = %err, "publish cycle failed");
                    }
                    while let Ok(signal) = self.operator_rx.try_recv() {
                        let OperatorSignal::DispatchExhausted { round_id, attempts } = signal;
                        warn!(round_id, attempts, "operator signal: dispatch exhausted");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown requested");
                    return Ok(());
                }
            }
        }
    }
}
