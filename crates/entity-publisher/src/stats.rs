use std::sync::atomic::{AtomicU64, Ordering};

/// Delivery counters shared between the client and its dispatcher.
///
/// Failed async batches are never reported to a caller; these counters and the
/// error log are the only place they show up.
#[derive(Debug, Default)]
pub struct Stats {
    batches_sent: AtomicU64,
    entities_sent: AtomicU64,
    sync_failures: AtomicU64,
    async_failures: AtomicU64,
    async_entities_dropped: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_sent(&self, entities: usize) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.entities_sent
            .fetch_add(entities as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_sync_failure(&self) {
        self.sync_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_async_failure(&self, entities: usize) {
        self.async_failures.fetch_add(1, Ordering::Relaxed);
        self.async_entities_dropped
            .fetch_add(entities as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            entities_sent: self.entities_sent.load(Ordering::Relaxed),
            sync_failures: self.sync_failures.load(Ordering::Relaxed),
            async_failures: self.async_failures.load(Ordering::Relaxed),
            async_entities_dropped: self.async_entities_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`Stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub batches_sent: u64,
    pub entities_sent: u64,
    pub sync_failures: u64,
    pub async_failures: u64,
    pub async_entities_dropped: u64,
}
