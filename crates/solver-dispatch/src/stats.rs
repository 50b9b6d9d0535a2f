//! Runtime counters for the status and metrics endpoints.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;

/// Counters written by the dispatcher and broker loop, read by the API.
#[derive(Debug, Default)]
pub struct DispatchStats {
    received: AtomicU64,
    published: AtomicU64,
    dropped: AtomicU64,
    requeued: AtomicU64,
    reconnects: AtomicU64,
    connected: AtomicBool,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub received: u64,
    pub published: u64,
    pub dropped: u64,
    pub requeued: u64,
    pub reconnects: u64,
    pub connected: bool,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_requeued(&self) {
        self.requeued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            connected: self.connected.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let stats = DispatchStats::new();
        stats.record_received();
        stats.record_received();
        stats.record_published();
        stats.record_dropped();
        stats.set_connected(true);

        let snap = stats.snapshot();
        assert_eq!(snap.received, 2);
        assert_eq!(snap.published, 1);
        assert_eq!(snap.dropped, 1);
        assert_eq!(snap.requeued, 0);
        assert!(snap.connected);
    }
}
