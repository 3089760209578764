//! Source-side publisher for the feedrelay system.
//!
//! Reads an upstream "latest round" feed, runs the publish validation
//! gates, records accepted updates in its own round store and emits the
//! canonical 7-field notification for the dispatcher to pick up.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod publisher;
pub mod upstream;

pub use publisher::OriginPublisher;
pub use upstream::{MockPriceFeed, RoundData, UpstreamFeed};
