//! Per-peer latency state
//!
//! Each session peer owns one tracker for its targeted requests plus a
//! smoothed latency estimate built from its responses.

use crate::latency::tracker::LatencyTracker;
use crate::types::Key;
use std::time::Duration;

/// Latency state for one session peer
pub struct PeerData {
    /// Whether a latency estimate exists yet
    pub has_latency: bool,
    /// Current latency estimate (meaningless until `has_latency`)
    pub latency: Duration,
    /// Tracker for requests targeted at this peer
    pub tracker: LatencyTracker,
}

impl PeerData {
    /// Create latency state for a newly seen peer
    pub fn new(timeout_window: Duration) -> Self {
        Self {
            has_latency: false,
            latency: Duration::ZERO,
            tracker: LatencyTracker::new(timeout_window),
        }
    }

    /// Fold a response for `key` into the latency estimate
    ///
    /// Prefers the elapsed time of a request targeted at this peer;
    /// falls back to `fallback` when the response satisfied a broadcast
    /// instead. With neither available the response carries no timing
    /// information and the estimate is left untouched. The first sample
    /// is taken verbatim, later ones are folded in by exponential
    /// smoothing with the given weight.
    pub fn adjust_latency(&mut self, key: Key, fallback: Option<Duration>, smoothing: f64) {
        let measured = self.tracker.check_duration(&key);
        self.tracker.remove_request(&key);

        let Some(sample) = measured.or(fallback) else {
            return;
        };

        if self.has_latency {
            self.latency =
                self.latency.mul_f64(1.0 - smoothing) + sample.mul_f64(smoothing);
        } else {
            self.latency = sample;
            self.has_latency = true;
        }
    }
}
