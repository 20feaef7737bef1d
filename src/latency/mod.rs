//! Latency measurement module
//!
//! Tracks outstanding requests and derives per-peer latency estimates
//! from responses, including synthetic responses credited when a
//! request times out.

pub mod peer_data;
pub mod tracker;

// Re-export main types
pub use peer_data::PeerData;
pub use tracker::{AfterTimeout, LatencyTracker};
