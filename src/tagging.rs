//! Peer tagging module
//!
//! Boundary to the connection manager: a session marks the peers it is
//! using with a weighted label so the connection layer keeps them alive
//! preferentially. Calls are fire-and-forget; the session never learns
//! whether a tag took effect.

use crate::types::PeerId;

/// Applies weighted labels to peer connections
pub trait PeerTagger: Send + Sync {
    /// Tag a peer with a label and priority weight
    fn tag_peer(&self, peer: PeerId, tag: &str, weight: i32);

    /// Remove a previously applied label from a peer
    fn untag_peer(&self, peer: PeerId, tag: &str);
}
