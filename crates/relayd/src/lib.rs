//! Relay daemon library: configuration and in-process pipeline wiring.
//!
//! The daemon runs all three relay stages in one process against a mock
//! upstream feed. The stage boundaries are the same explicit channels and
//! traits a multi-ledger deployment would use, so the full protocol is
//! exercised without a live transport.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod pipeline;

pub use config::Config;
pub use pipeline::{InProcessTransport, Pipeline};
