//! Session peer manager module
//!
//! The manager is an actor: one task owns all registry state and applies
//! a totally ordered stream of commands, so producers never contend on a
//! lock. Callers enqueue commands; the only blocking operation is the
//! candidate query, which waits on a single-use reply slot. Once the
//! session's lifetime token fires, enqueue attempts are silently
//! abandoned and the loop untags every peer and disarms every timer on
//! its way out.

use crate::config::SessionConfig;
use crate::discovery::ProviderFinder;
use crate::latency::{AfterTimeout, LatencyTracker};
use crate::session::registry::PeerRegistry;
use crate::tagging::PeerTagger;
use crate::types::{Key, PeerId};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Commands applied serially by the session loop
enum SessionCommand {
    /// A provider search produced a candidate peer
    PeerFound { peer: PeerId },
    /// A peer answered a request for a key (or its timeout fired)
    PeerResponded { peer: PeerId, key: Key },
    /// A targeted or broadcast request went out for a set of keys
    PeerRequested {
        peers: Option<Vec<PeerId>>,
        keys: Vec<Key>,
    },
    /// Snapshot the current candidate list
    GetPeers {
        reply: oneshot::Sender<Vec<PeerId>>,
    },
}

/// Tracks and ranks the peers of one content-retrieval session
///
/// Cloneable handle; all clones feed the same session loop. The manager
/// lives until the supplied lifetime token is cancelled.
#[derive(Clone)]
pub struct SessionPeerManager {
    commands: mpsc::Sender<SessionCommand>,
    lifetime: CancellationToken,
    finder: Arc<dyn ProviderFinder>,
}

impl SessionPeerManager {
    /// Create a manager for one session and spawn its loop
    pub fn new(
        lifetime: CancellationToken,
        session_id: u64,
        tagger: Arc<dyn PeerTagger>,
        finder: Arc<dyn ProviderFinder>,
        config: SessionConfig,
    ) -> Self {
        let (commands, queue) = mpsc::channel(config.command_queue_size);

        let session = SessionLoop {
            tag: format!("bswap-ses-{}", session_id),
            registry: PeerRegistry::new(&config),
            broadcast: LatencyTracker::new(config.request_timeout),
            tagger,
            config,
            commands: commands.clone(),
            lifetime: lifetime.clone(),
        };
        tokio::spawn(session.run(queue));

        Self {
            commands,
            lifetime,
            finder,
        }
    }

    /// Record that a peer responded with a block for a key
    pub async fn record_peer_response(&self, peer: PeerId, key: Key) {
        self.send(SessionCommand::PeerResponded { peer, key }).await;
    }

    /// Record that a request for `keys` went out
    ///
    /// `peers: None` marks a broadcast: fire-and-forget, its only later
    /// effect is serving as a fallback latency source. With targets
    /// given, each still-active target gets the keys registered on its
    /// own tracker.
    pub async fn record_peer_requests(&self, peers: Option<Vec<PeerId>>, keys: Vec<Key>) {
        self.send(SessionCommand::PeerRequested { peers, keys }).await;
    }

    /// Get the best peers available for this session
    ///
    /// All latency-ranked peers come first, best latency leading,
    /// followed by a random sample of unmeasured peers up to the
    /// configured cap. Returns an empty list once the session is over.
    pub async fn get_optimized_peers(&self) -> Vec<PeerId> {
        let (reply, response) = oneshot::channel();
        if !self.send(SessionCommand::GetPeers { reply }).await {
            return Vec::new();
        }

        tokio::select! {
            _ = self.lifetime.cancelled() => Vec::new(),
            peers = response => peers.unwrap_or_default(),
        }
    }

    /// Search for more session peers able to provide `key`
    ///
    /// Spawns one discovery task per call. The task feeds every found
    /// provider back into the session and stops on `cancel`, on the
    /// session's own lifetime token, or when the search is exhausted.
    pub fn find_more_peers(&self, cancel: CancellationToken, key: Key) {
        let finder = Arc::clone(&self.finder);
        let commands = self.commands.clone();
        let lifetime = self.lifetime.clone();

        tokio::spawn(async move {
            let mut providers = finder.find_providers(cancel.clone(), key).await;
            loop {
                let peer = tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = lifetime.cancelled() => break,
                    found = providers.recv() => match found {
                        Some(peer) => peer,
                        None => break,
                    },
                };
                trace!("discovered provider {} for key {}", peer, key);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = lifetime.cancelled() => break,
                    _ = commands.send(SessionCommand::PeerFound { peer }) => {}
                }
            }
            trace!("provider search for key {} finished", key);
        });
    }

    /// Enqueue a command, abandoning it if the session ends first
    async fn send(&self, command: SessionCommand) -> bool {
        tokio::select! {
            _ = self.lifetime.cancelled() => false,
            sent = self.commands.send(command) => sent.is_ok(),
        }
    }
}

/// Owns all mutable session state; runs until the lifetime token fires
struct SessionLoop {
    tag: String,
    registry: PeerRegistry,
    broadcast: LatencyTracker,
    tagger: Arc<dyn PeerTagger>,
    config: SessionConfig,
    commands: mpsc::Sender<SessionCommand>,
    lifetime: CancellationToken,
}

impl SessionLoop {
    async fn run(mut self, mut queue: mpsc::Receiver<SessionCommand>) {
        debug!("session peer manager {} started", self.tag);
        loop {
            tokio::select! {
                _ = self.lifetime.cancelled() => break,
                command = queue.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }
        self.handle_shutdown();
    }

    fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::PeerFound { peer } => self.handle_peer_found(peer),
            SessionCommand::PeerResponded { peer, key } => self.handle_peer_responded(peer, key),
            SessionCommand::PeerRequested { peers, keys } => self.handle_peer_requested(peers, keys),
            SessionCommand::GetPeers { reply } => self.handle_get_peers(reply),
        }
    }

    fn handle_peer_found(&mut self, peer: PeerId) {
        if self.registry.add(peer) {
            debug!("peer {} joined session {} (total: {})", peer, self.tag, self.registry.len());
            self.tagger.tag_peer(peer, &self.tag, self.config.tag_weight);
        }
    }

    fn handle_peer_responded(&mut self, peer: PeerId, key: Key) {
        let fallback = self.broadcast.check_duration(&key);
        if self.registry.record_response(peer, key, fallback) {
            debug!("peer {} joined session {} via response (total: {})", peer, self.tag, self.registry.len());
            self.tagger.tag_peer(peer, &self.tag, self.config.tag_weight);
        }
        trace!("recorded response from {} for key {}", peer, key);
    }

    fn handle_peer_requested(&mut self, peers: Option<Vec<PeerId>>, keys: Vec<Key>) {
        match peers {
            None => {
                trace!("broadcast request for {} keys", keys.len());
                self.broadcast.setup_requests(&keys, Arc::new(|_key| {}));
            }
            Some(peers) => {
                for peer in peers {
                    // requests to peers that never joined carry no signal
                    if !self.registry.contains(&peer) {
                        continue;
                    }
                    let on_timeout = self.make_timeout(peer);
                    if let Some(data) = self.registry.data_mut(&peer) {
                        data.tracker.setup_requests(&keys, on_timeout);
                    }
                }
            }
        }
    }

    fn handle_get_peers(&mut self, reply: oneshot::Sender<Vec<PeerId>>) {
        let peers = self.registry.select(&mut rand::thread_rng());
        trace!("returning {} candidate peers for {}", peers.len(), self.tag);
        let _ = reply.send(peers);
    }

    /// Timeout callback crediting an unanswered request as a slow response
    ///
    /// Runs on the timer task, so it re-enters the session by enqueueing
    /// and never blocks the timer context.
    fn make_timeout(&self, peer: PeerId) -> AfterTimeout {
        let commands = self.commands.clone();
        let lifetime = self.lifetime.clone();
        Arc::new(move |key| {
            let commands = commands.clone();
            let lifetime = lifetime.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = lifetime.cancelled() => {}
                    _ = commands.send(SessionCommand::PeerResponded { peer, key }) => {}
                }
            });
        })
    }

    fn handle_shutdown(&mut self) {
        debug!("session peer manager {} shutting down", self.tag);
        for (peer, mut data) in self.registry.take_all() {
            self.tagger.untag_peer(peer, &self.tag);
            data.tracker.shutdown();
        }
        self.broadcast.shutdown();
    }
}
