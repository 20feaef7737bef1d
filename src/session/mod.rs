//! Session peer management module
//!
//! Tracks which peers participate in one content-retrieval session,
//! ranks them by response latency, and hands bounded candidate lists to
//! the scheduler driving the session.

pub mod manager;
pub mod registry;

// Re-export main types
pub use manager::SessionPeerManager;
pub use registry::PeerRegistry;
