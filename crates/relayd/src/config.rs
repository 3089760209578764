//! Configuration for the relay daemon.
//!
//! Loaded from a TOML file; every field has a sensible default so a bare
//! `[feed]` section is enough for a local run.

use alloy_primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Feed identity (description, decimals).
    #[serde(default)]
    pub feed: FeedSection,

    /// Origin publisher configuration.
    #[serde(default)]
    pub origin: OriginSection,

    /// Destination configuration.
    #[serde(default)]
    pub destination: DestinationSection,

    /// Relay (dispatch/retry) configuration.
    #[serde(default)]
    pub relay: RelaySection,
}

/// Feed identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSection {
    /// Human-readable pair description.
    #[serde(default = "default_description")]
    pub description: String,

    /// Decimal places in the answer.
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

/// Origin publisher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginSection {
    /// Chain id of the source ledger.
    #[serde(default = "default_origin_chain_id")]
    pub chain_id: u64,

    /// Identity of the origin publisher contract.
    #[serde(default = "default_origin_contract")]
    pub contract: Address,

    /// Identity of the upstream aggregator feed.
    #[serde(default = "default_feed_contract")]
    pub feed_contract: Address,

    /// Seconds between publish attempts in the daemon loop.
    #[serde(default = "default_publish_interval_secs")]
    pub publish_interval_secs: u64,

    /// Minimum interval enforced between successful publishes.
    #[serde(default = "default_min_update_interval_secs")]
    pub min_update_interval_secs: u64,
}

/// Destination configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationSection {
    /// Chain id of the destination ledger.
    #[serde(default = "default_destination_chain_id")]
    pub chain_id: u64,

    /// Identity of the destination feed proxy contract.
    #[serde(default = "default_destination_contract")]
    pub contract: Address,
}

/// Relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySection {
    /// Identity holding the administrative capability on all components.
    #[serde(default = "default_owner")]
    pub owner: Address,

    /// Identity the dispatcher commits with; must be authorized at the
    /// destination.
    #[serde(default = "default_relayer")]
    pub relayer: Address,

    /// Retry attempt ceiling for one dispatch.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff between retry attempts, in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_description() -> String {
    "ETH/USD".to_string()
}

fn default_decimals() -> u8 {
    8
}

fn default_origin_chain_id() -> u64 {
    11155111
}

fn default_origin_contract() -> Address {
    Address::repeat_byte(0x0a)
}

fn default_feed_contract() -> Address {
    Address::repeat_byte(0x0f)
}

fn default_publish_interval_secs() -> u64 {
    70
}

fn default_min_update_interval_secs() -> u64 {
    60
}

fn default_destination_chain_id() -> u64 {
    84532
}

fn default_destination_contract() -> Address {
    Address::repeat_byte(0x0d)
}

fn default_owner() -> Address {
    Address::repeat_byte(0x01)
}

fn default_relayer() -> Address {
    Address::repeat_byte(0x02)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            description: default_description(),
            decimals: default_decimals(),
        }
    }
}

impl Default for OriginSection {
    fn default() -> Self {
        Self {
            chain_id: default_origin_chain_id(),
            contract: default_origin_contract(),
            feed_contract: default_feed_contract(),
            publish_interval_secs: default_publish_interval_secs(),
            min_update_interval_secs: default_min_update_interval_secs(),
        }
    }
}

impl Default for DestinationSection {
    fn default() -> Self {
        Self {
            chain_id: default_destination_chain_id(),
            contract: default_destination_contract(),
        }
    }
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            relayer: default_relayer(),
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.origin.contract != Address::ZERO,
            "origin.contract must not be the zero address"
        );
        anyhow::ensure!(
            self.origin.feed_contract != Address::ZERO,
            "origin.feed_contract must not be the zero address"
        );
        anyhow::ensure!(
            self.destination.contract != Address::ZERO,
            "destination.contract must not be the zero address"
        );
        anyhow::ensure!(
            self.origin.publish_interval_secs > 0,
            "origin.publish_interval_secs must be positive"
        );
        anyhow::ensure!(
            self.relay.max_attempts > 0,
            "relay.max_attempts must be positive"
        );
        Ok(())
    }
}
