//! Destination-side feed store for the feedrelay system.
//!
//! The canonical, independently-validated sink. Re-runs every safety gate
//! on inbound updates (plus access control and pause) and exposes a read
//! surface signature-compatible with a generic "latest round" oracle, so
//! downstream consumers cannot tell the mirrored feed from an original.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod feed;

pub use feed::DestinationFeedProxy;
