//! Peer registry module
//!
//! Owns the per-session peer collections: peers with a measured latency
//! ranked best-first, peers without one in arrival order, and the
//! latency state backing both. Only the session loop touches a registry,
//! so it needs no internal synchronization.

use crate::config::SessionConfig;
use crate::latency::PeerData;
use crate::types::{Key, PeerId};
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;
use tracing::trace;

/// Tracks every peer participating in one session
///
/// Every active peer appears in exactly one of the two candidate lists:
/// `optimized` (latency known, kept non-decreasing by latency) or
/// `unoptimized` (latency unknown, unordered).
pub struct PeerRegistry {
    /// Latency state for every active peer
    active: HashMap<PeerId, PeerData>,
    /// Peers with a measured latency, best first
    optimized: Vec<PeerId>,
    /// Peers without a latency measurement yet
    unoptimized: Vec<PeerId>,
    /// Timeout window for newly created per-peer trackers
    timeout_window: Duration,
    /// Smoothing weight for latency samples
    latency_smoothing: f64,
    /// Maximum number of peers surfaced by `select`
    max_returned: usize,
}

impl PeerRegistry {
    /// Create an empty registry configured for one session
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            active: HashMap::new(),
            optimized: Vec::new(),
            unoptimized: Vec::new(),
            timeout_window: config.request_timeout,
            latency_smoothing: config.latency_smoothing,
            max_returned: config.max_returned_peers,
        }
    }

    /// Whether a peer is already active in this session
    pub fn contains(&self, peer: &PeerId) -> bool {
        self.active.contains_key(peer)
    }

    /// Number of active peers
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether the registry has no active peers
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Peers with a measured latency, best first
    pub fn optimized(&self) -> &[PeerId] {
        &self.optimized
    }

    /// Peers without a latency measurement yet
    pub fn unoptimized(&self) -> &[PeerId] {
        &self.unoptimized
    }

    /// Latency state for a peer
    pub fn data(&self, peer: &PeerId) -> Option<&PeerData> {
        self.active.get(peer)
    }

    /// Mutable latency state for a peer
    pub fn data_mut(&mut self, peer: &PeerId) -> Option<&mut PeerData> {
        self.active.get_mut(peer)
    }

    /// Add a newly discovered peer
    ///
    /// Returns true if the peer was unseen; re-discovering a known peer
    /// changes nothing.
    pub fn add(&mut self, peer: PeerId) -> bool {
        if self.active.contains_key(&peer) {
            trace!("peer {} already active, skipping", peer);
            return false;
        }
        self.active.insert(peer, PeerData::new(self.timeout_window));
        self.attach(peer);
        true
    }

    /// Record a response from a peer for a key
    ///
    /// Creates the peer if unseen, folds the timing of the response into
    /// its latency estimate (using `fallback` when no targeted request
    /// matches), and repositions it in the candidate lists. Returns true
    /// if the peer was unseen.
    pub fn record_response(&mut self, peer: PeerId, key: Key, fallback: Option<Duration>) -> bool {
        let newly_added = if self.active.contains_key(&peer) {
            self.detach(&peer);
            false
        } else {
            self.active.insert(peer, PeerData::new(self.timeout_window));
            true
        };

        let smoothing = self.latency_smoothing;
        if let Some(data) = self.active.get_mut(&peer) {
            data.adjust_latency(key, fallback, smoothing);
        }
        self.attach(peer);
        newly_added
    }

    /// Build a candidate list of up to `max_returned` peers
    ///
    /// Every optimized peer is returned, best latency first, even when
    /// that alone exceeds the cap. Remaining slots are filled with a
    /// uniform random sample of unoptimized peers, without replacement.
    pub fn select(&self, rng: &mut impl Rng) -> Vec<PeerId> {
        let fill = self
            .max_returned
            .saturating_sub(self.optimized.len())
            .min(self.unoptimized.len());

        let mut peers = self.optimized.clone();
        for index in rand::seq::index::sample(rng, self.unoptimized.len(), fill) {
            peers.push(self.unoptimized[index]);
        }
        peers
    }

    /// Remove and return every active peer, clearing the registry
    pub fn take_all(&mut self) -> HashMap<PeerId, PeerData> {
        self.optimized.clear();
        self.unoptimized.clear();
        std::mem::take(&mut self.active)
    }

    /// Place a peer into the candidate list matching its latency state
    fn attach(&mut self, peer: PeerId) {
        let Some(data) = self.active.get(&peer) else {
            return;
        };
        if data.has_latency {
            let latency = data.latency;
            let active = &self.active;
            let position = self.optimized.partition_point(|other| {
                active.get(other).map_or(false, |d| d.latency <= latency)
            });
            self.optimized.insert(position, peer);
        } else {
            self.unoptimized.push(peer);
        }
    }

    /// Remove a peer from whichever candidate list currently holds it
    fn detach(&mut self, peer: &PeerId) {
        let Some(data) = self.active.get(peer) else {
            return;
        };
        if data.has_latency {
            if let Some(index) = self.optimized.iter().position(|other| other == peer) {
                self.optimized.remove(index);
            }
        } else if let Some(index) = self.unoptimized.iter().position(|other| other == peer) {
            self.unoptimized.swap_remove(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn registry() -> PeerRegistry {
        PeerRegistry::new(&SessionConfig::default())
    }

    fn peers(n: usize) -> Vec<PeerId> {
        (0..n).map(|_| PeerId::random()).collect()
    }

    /// Every active peer sits in exactly one list, matching its flag,
    /// and the optimized list is non-decreasing by latency.
    fn assert_invariants(registry: &PeerRegistry) {
        let mut seen = HashSet::new();
        for peer in registry.optimized() {
            assert!(seen.insert(*peer), "peer {} listed twice", peer);
            assert!(registry.data(peer).unwrap().has_latency);
        }
        for peer in registry.unoptimized() {
            assert!(seen.insert(*peer), "peer {} listed twice", peer);
            assert!(!registry.data(peer).unwrap().has_latency);
        }
        assert_eq!(seen.len(), registry.len());

        let latencies: Vec<_> = registry
            .optimized()
            .iter()
            .map(|p| registry.data(p).unwrap().latency)
            .collect();
        assert!(
            latencies.windows(2).all(|w| w[0] <= w[1]),
            "optimized list out of order: {:?}",
            latencies
        );
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut registry = registry();
        let peer = PeerId::random();

        assert!(registry.add(peer));
        assert!(!registry.add(peer));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.unoptimized().len(), 1);
        assert_invariants(&registry);
    }

    #[test]
    fn test_response_moves_peer_into_optimized() {
        let mut registry = registry();
        let peer = PeerId::random();
        registry.add(peer);

        let newly = registry.record_response(
            peer,
            Key::for_data(b"k1"),
            Some(Duration::from_millis(40)),
        );
        assert!(!newly);
        assert_eq!(registry.optimized(), &[peer]);
        assert!(registry.unoptimized().is_empty());
        assert_eq!(registry.data(&peer).unwrap().latency, Duration::from_millis(40));
        assert_invariants(&registry);
    }

    #[test]
    fn test_response_from_unseen_peer_creates_it() {
        let mut registry = registry();
        let peer = PeerId::random();

        let newly = registry.record_response(peer, Key::for_data(b"k1"), None);
        assert!(newly);
        // no targeted request and no fallback: the peer stays unmeasured
        assert_eq!(registry.unoptimized(), &[peer]);
        assert_invariants(&registry);
    }

    #[test]
    fn test_optimized_is_sorted_by_latency() {
        let mut registry = registry();
        let [a, b, c] = [PeerId::random(), PeerId::random(), PeerId::random()];

        registry.record_response(b, Key::for_data(b"k1"), Some(Duration::from_millis(200)));
        registry.record_response(a, Key::for_data(b"k2"), Some(Duration::from_millis(50)));
        registry.record_response(c, Key::for_data(b"k3"), Some(Duration::from_millis(120)));

        assert_eq!(registry.optimized(), &[a, c, b]);
        assert_invariants(&registry);
    }

    #[test]
    fn test_invariants_under_random_interleavings() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool = peers(12);
        let mut registry = registry();

        for step in 0..1000u32 {
            let peer = pool[rng.gen_range(0..pool.len())];
            if rng.gen_bool(0.4) {
                registry.add(peer);
            } else {
                let key = Key::for_data(&step.to_be_bytes());
                let fallback = if rng.gen_bool(0.7) {
                    Some(Duration::from_millis(rng.gen_range(1..500)))
                } else {
                    None
                };
                registry.record_response(peer, key, fallback);
            }
            assert_invariants(&registry);
        }
    }

    #[test]
    fn test_select_prefers_optimized_and_caps_result() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut registry = registry();
        let measured = peers(3);
        let unmeasured = peers(40);

        for (i, peer) in measured.iter().enumerate() {
            registry.record_response(
                *peer,
                Key::for_data(b"k"),
                Some(Duration::from_millis(10 * (i as u64 + 1))),
            );
        }
        for peer in &unmeasured {
            registry.add(*peer);
        }

        let selected = registry.select(&mut rng);
        assert_eq!(selected.len(), 32);
        assert_eq!(&selected[..3], measured.as_slice());

        let unique: HashSet<_> = selected.iter().collect();
        assert_eq!(unique.len(), selected.len());
    }

    #[test]
    fn test_select_returns_all_optimized_even_past_cap() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut registry = registry();
        let measured = peers(40);

        for (i, peer) in measured.iter().enumerate() {
            registry.record_response(
                *peer,
                Key::for_data(b"k"),
                Some(Duration::from_millis(i as u64 + 1)),
            );
        }
        registry.add(PeerId::random());

        // the cap never truncates measured peers, and the overflow must
        // not underflow the filler count
        let selected = registry.select(&mut rng);
        assert_eq!(selected.len(), 40);
        assert_eq!(selected, registry.optimized());
    }

    #[test]
    fn test_select_exhausts_small_unoptimized_pool() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut registry = registry();
        let pool = peers(5);
        for peer in &pool {
            registry.add(*peer);
        }

        let selected = registry.select(&mut rng);
        assert_eq!(selected.len(), 5);
        let expected: HashSet<_> = pool.iter().collect();
        let got: HashSet<_> = selected.iter().collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_select_fills_uniformly_at_random() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut registry = registry();
        let pool = peers(10);
        for peer in &pool {
            registry.add(*peer);
        }

        // cap the fill at half the pool and count appearances
        registry.max_returned = 5;
        let mut counts: HashMap<PeerId, usize> = HashMap::new();
        let trials = 4000;
        for _ in 0..trials {
            for peer in registry.select(&mut rng) {
                *counts.entry(peer).or_default() += 1;
            }
        }

        // each peer is expected in half of the trials; 2000 +/- 400 is
        // far beyond ten standard deviations
        for peer in &pool {
            let count = *counts.get(peer).unwrap_or(&0);
            assert!(
                (1600..=2400).contains(&count),
                "peer {} selected {} times out of {}",
                peer,
                count,
                trials
            );
        }
    }

    #[test]
    fn test_take_all_clears_registry() {
        let mut registry = registry();
        let pool = peers(4);
        for peer in &pool {
            registry.add(*peer);
        }
        registry.record_response(pool[0], Key::for_data(b"k"), Some(Duration::from_millis(5)));

        let drained = registry.take_all();
        assert_eq!(drained.len(), 4);
        assert!(registry.is_empty());
        assert!(registry.optimized().is_empty());
        assert!(registry.unoptimized().is_empty());
    }
}
