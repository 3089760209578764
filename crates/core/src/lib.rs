//! Core types for the feedrelay system.
//!
//! This crate holds everything shared by the three relay stages:
//! - Domain types (`RoundRecord`, `FeedMetadata`, `FeedConfig`)
//! - The validation error taxonomy (`FeedError`)
//! - The append-only round store
//! - The canonical cross-ledger payload codec
//! - Canonical thresholds and a clock abstraction for time-dependent gates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod constants;
pub mod error;
pub mod payload;
pub mod store;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{FeedError, Result};
pub use payload::PriceUpdate;
pub use store::RoundStore;
pub use types::{FeedConfig, FeedMetadata, HealthMetrics, RoundRecord};

// Re-export Alloy identity types for convenience
pub use alloy_primitives::{Address, B256};
