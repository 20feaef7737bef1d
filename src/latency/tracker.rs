//! Latency tracker module
//!
//! Records when requests were issued, answers elapsed-time lookups for
//! keys still outstanding, and fires a callback once per key when no
//! completion arrives within the timeout window.

use crate::types::Key;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

/// Callback invoked (at most once per key) when a request times out.
///
/// Runs on a timer task, never inside the session loop, so it must not
/// block; re-entering the session happens by enqueueing a command.
pub type AfterTimeout = Arc<dyn Fn(Key) + Send + Sync>;

/// One outstanding request
struct RequestData {
    started_at: Instant,
    timeout: JoinHandle<()>,
}

/// Tracks outstanding requests for one peer (or for broadcasts)
pub struct LatencyTracker {
    /// Timeout window applied to every registered key
    window: Duration,
    /// Outstanding requests by key
    requests: HashMap<Key, RequestData>,
}

impl LatencyTracker {
    /// Create a new tracker with the given timeout window
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            requests: HashMap::new(),
        }
    }

    /// Register outstanding requests for the given keys
    ///
    /// Keys already outstanding keep their original start time and timer.
    /// For each new key, `after_timeout` fires once if the key is still
    /// outstanding when the window elapses. Firing does not clear the
    /// key: the elapsed time stays observable so a late or synthetic
    /// response is credited with the full window as its latency.
    pub fn setup_requests(&mut self, keys: &[Key], after_timeout: AfterTimeout) {
        let started_at = Instant::now();
        for &key in keys {
            if self.requests.contains_key(&key) {
                continue;
            }
            let callback = Arc::clone(&after_timeout);
            let window = self.window;
            let timeout = tokio::spawn(async move {
                tokio::time::sleep(window).await;
                trace!("request for key {} timed out after {:?}", key, window);
                callback(key);
            });
            self.requests.insert(
                key,
                RequestData {
                    started_at,
                    timeout,
                },
            );
        }
    }

    /// Peek the elapsed time for a key, if it is still outstanding
    pub fn check_duration(&self, key: &Key) -> Option<Duration> {
        self.requests.get(key).map(|r| r.started_at.elapsed())
    }

    /// Clear a completed request and disarm its timer
    pub fn remove_request(&mut self, key: &Key) {
        if let Some(request) = self.requests.remove(key) {
            request.timeout.abort();
        }
    }

    /// Number of keys still outstanding
    pub fn outstanding(&self) -> usize {
        self.requests.len()
    }

    /// Disarm every timer and drop all outstanding requests
    pub fn shutdown(&mut self) {
        for (_, request) in self.requests.drain() {
            request.timeout.abort();
        }
    }
}
