//! Session peer manager demo
//!
//! Drives one session against in-memory collaborators: discovers peers,
//! issues targeted and broadcast requests, records responses, and prints
//! the ranked candidate list.

use anyhow::Result;
use async_trait::async_trait;
use blockswap_session::{
    Key, PeerId, PeerTagger, ProviderFinder, SessionConfig, SessionPeerManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Logs tag calls instead of driving a real connection manager
struct LoggingTagger;

impl PeerTagger for LoggingTagger {
    fn tag_peer(&self, peer: PeerId, tag: &str, weight: i32) {
        info!("tagging peer {} with {} (weight {})", peer, tag, weight);
    }

    fn untag_peer(&self, peer: PeerId, tag: &str) {
        info!("untagging peer {} from {}", peer, tag);
    }
}

/// Hands out a canned provider set for every search
struct CannedFinder {
    providers: Vec<PeerId>,
}

#[async_trait]
impl ProviderFinder for CannedFinder {
    async fn find_providers(&self, cancel: CancellationToken, _key: Key) -> mpsc::Receiver<PeerId> {
        let (found, results) = mpsc::channel(8);
        let providers = self.providers.clone();
        tokio::spawn(async move {
            for peer in providers {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = found.send(peer) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
        });
        results
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = SessionConfig::default();
    config.validate()?;

    let providers: Vec<_> = (0..6).map(|_| PeerId::random()).collect();
    let fast = providers[0];
    let steady = providers[1];

    let lifetime = CancellationToken::new();
    let manager = SessionPeerManager::new(
        lifetime.clone(),
        1,
        Arc::new(LoggingTagger),
        Arc::new(CannedFinder {
            providers: providers.clone(),
        }),
        config,
    );

    let key = Key::for_data(b"demo block");
    info!("searching providers for key {}", key);
    manager.find_more_peers(lifetime.child_token(), key);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // targeted requests to two peers; one answers quickly, one slowly
    manager
        .record_peer_requests(Some(vec![fast, steady]), vec![key])
        .await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    manager.record_peer_response(fast, key).await;
    tokio::time::sleep(Duration::from_millis(120)).await;
    manager.record_peer_response(steady, key).await;

    let ranked = manager.get_optimized_peers().await;
    info!("candidate list ({} peers):", ranked.len());
    for (position, peer) in ranked.iter().enumerate() {
        info!("  {}. {}", position + 1, peer);
    }

    lifetime.cancel();
    tokio::time::sleep(Duration::from_millis(20)).await;
    Ok(())
}
