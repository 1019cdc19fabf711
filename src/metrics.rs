use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion and query activity.
#[derive(Default)]
pub struct ServiceMetrics {
    documents_ingested: AtomicU64,
    chunks_ingested: AtomicU64,
    jobs_failed: AtomicU64,
    questions_answered: AtomicU64,
}

impl ServiceMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully ingested document and the number of chunks it produced.
    pub fn record_document(&self, chunk_count: u64) {
        self.documents_ingested.fetch_add(1, Ordering::Relaxed);
        self.chunks_ingested
            .fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record an ingestion job that ended in the failed state.
    pub fn record_failed_job(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one answered chat question.
    pub fn record_question(&self) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_ingested: self.documents_ingested.load(Ordering::Relaxed),
            chunks_ingested: self.chunks_ingested.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of service counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents ingested to completion since startup.
    pub documents_ingested: u64,
    /// Total chunk count stored across all ingested documents.
    pub chunks_ingested: u64,
    /// Number of ingestion jobs that ended failed.
    pub jobs_failed: u64,
    /// Number of chat questions answered since startup.
    pub questions_answered: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_documents_and_chunks() {
        let metrics = ServiceMetrics::new();
        metrics.record_document(2);
        metrics.record_document(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_ingested, 2);
        assert_eq!(snapshot.chunks_ingested, 5);
    }

    #[test]
    fn records_failures_and_questions() {
        let metrics = ServiceMetrics::new();
        metrics.record_failed_job();
        metrics.record_question();
        metrics.record_question();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.jobs_failed, 1);
        assert_eq!(snapshot.questions_answered, 2);
        assert_eq!(snapshot.documents_ingested, 0);
    }
}
