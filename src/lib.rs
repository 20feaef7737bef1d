//! blockswap-session
//!
//! Session-scoped peer tracking and latency ranking for a p2p block
//! exchange. One `SessionPeerManager` per content-retrieval session
//! tracks participating peers, measures their response latency, and
//! hands bounded, latency-ordered candidate lists to the scheduler.

pub mod config;
pub mod discovery;
pub mod error;
pub mod latency;
pub mod session;
pub mod tagging;
pub mod types;

pub use config::SessionConfig;
pub use discovery::ProviderFinder;
pub use error::SessionError;
pub use latency::{AfterTimeout, LatencyTracker, PeerData};
pub use session::{PeerRegistry, SessionPeerManager};
pub use tagging::PeerTagger;
pub use types::{Key, PeerId};
