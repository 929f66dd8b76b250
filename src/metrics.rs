//! In-process counters for the serving loop.

use crate::types::outcome::Action;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for pipeline activity.
pub struct PipelineMetrics {
    /// Total transactions scored
    pub transactions_scored: AtomicU64,
    /// Total transactions blocked
    pub transactions_blocked: AtomicU64,
    /// Risk score distribution buckets (0.0-0.1 .. 0.9-1.0)
    score_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            transactions_scored: AtomicU64::new(0),
            transactions_blocked: AtomicU64::new(0),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record one scored transaction.
    pub fn record(&self, score: f64, action: Action) {
        self.transactions_scored.fetch_add(1, Ordering::Relaxed);
        if action == Action::Block {
            self.transactions_blocked.fetch_add(1, Ordering::Relaxed);
        }

        let bucket = ((score * 10.0) as usize).min(9);
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Transactions per second since startup.
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.transactions_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or([0; 10])
    }

    /// Log a summary of activity so far.
    pub fn print_summary(&self) {
        let scored = self.transactions_scored.load(Ordering::Relaxed);
        let blocked = self.transactions_blocked.load(Ordering::Relaxed);
        let block_rate = if scored > 0 {
            blocked as f64 / scored as f64 * 100.0
        } else {
            0.0
        };

        info!(
            scored = scored,
            blocked = blocked,
            block_rate = format!("{block_rate:.1}%"),
            throughput = format!("{:.1} tx/s", self.throughput()),
            "Pipeline metrics summary"
        );

        let dist = self.score_distribution();
        let total: u64 = dist.iter().sum();
        if total > 0 {
            for (i, &count) in dist.iter().enumerate() {
                if count == 0 {
                    continue;
                }
                let pct = count as f64 / total as f64 * 100.0;
                info!(
                    "  score {:.1}-{:.1}: {:>6} ({:>5.1}%)",
                    i as f64 / 10.0,
                    (i + 1) as f64 / 10.0,
                    count,
                    pct
                );
            }
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodically logs the metrics summary.
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
