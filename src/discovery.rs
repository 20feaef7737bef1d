//! Provider discovery module
//!
//! Boundary to the content-routing layer. A search is finite and not
//! restartable: each call starts a fresh lookup and yields discovered
//! peers over a channel until the search completes or is cancelled.

use crate::types::{Key, PeerId};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Finds peers that can provide a given content key
#[async_trait]
pub trait ProviderFinder: Send + Sync {
    /// Start an asynchronous provider search for `key`
    ///
    /// The returned channel closes when the search is exhausted. The
    /// implementation must stop searching promptly once `cancel` fires
    /// or the receiver is dropped.
    async fn find_providers(&self, cancel: CancellationToken, key: Key) -> mpsc::Receiver<PeerId>;
}
