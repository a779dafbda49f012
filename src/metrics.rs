use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion and retrieval activity.
#[derive(Default)]
pub struct ServiceMetrics {
    folders_ingested: AtomicU64,
    chunks_indexed: AtomicU64,
    queries_answered: AtomicU64,
    ungrounded_answers: AtomicU64,
}

impl ServiceMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed ingestion and the number of chunks it produced.
    pub fn record_store(&self, chunk_count: u64) {
        self.folders_ingested.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed
            .fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record an answered query, noting whether it was grounded in retrieved chunks.
    pub fn record_query(&self, grounded: bool) {
        self.queries_answered.fetch_add(1, Ordering::Relaxed);
        if !grounded {
            self.ungrounded_answers.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            folders_ingested: self.folders_ingested.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            queries_answered: self.queries_answered.load(Ordering::Relaxed),
            ungrounded_answers: self.ungrounded_answers.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of service counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of ingestion calls completed since startup.
    pub folders_ingested: u64,
    /// Total chunk count indexed across all ingestions.
    pub chunks_indexed: u64,
    /// Number of queries answered since startup.
    pub queries_answered: u64,
    /// Number of answers that fell back to the not-found response.
    pub ungrounded_answers: u64,
}
