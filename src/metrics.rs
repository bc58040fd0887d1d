//! Performance metrics and statistics tracking for the review-risk pipeline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

const MAX_LATENCY_SAMPLES: usize = 10_000;

/// Metrics collector for pipeline performance
pub struct PipelineMetrics {
    /// Total predictions returned
    pub predictions: AtomicU64,
    /// Predictions labelled negative
    pub negative_predictions: AtomicU64,
    /// Predictions returned without an explanation
    pub degraded_explanations: AtomicU64,
    /// Failed requests by error kind
    errors_by_kind: RwLock<HashMap<String, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            predictions: AtomicU64::new(0),
            negative_predictions: AtomicU64::new(0),
            degraded_explanations: AtomicU64::new(0),
            errors_by_kind: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(
        &self,
        processing_time: Duration,
        probability: f64,
        is_negative: bool,
    ) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
        if is_negative {
            self.negative_predictions.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            if times.len() > MAX_LATENCY_SAMPLES {
                times.drain(0..MAX_LATENCY_SAMPLES / 2);
            }
        }

        let bucket = (probability.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a prediction whose explanation was degraded
    pub fn record_degraded_explanation(&self) {
        self.degraded_explanations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed request
    pub fn record_error(&self, kind: &str) {
        if let Ok(mut by_kind) = self.errors_by_kind.write() {
            *by_kind.entry(kind.to_string()).or_insert(0) += 1;
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let sorted = match self.processing_times.read() {
            Ok(times) if !times.is_empty() => {
                let mut sorted = times.clone();
                sorted.sort_unstable();
                sorted
            }
            _ => return ProcessingStats::default(),
        };

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: at(0.5),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (predictions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get probability distribution
    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets.read().map(|b| *b).unwrap_or_default()
    }

    /// Get failed requests by error kind
    pub fn get_errors_by_kind(&self) -> HashMap<String, u64> {
        self.errors_by_kind.read().map(|e| e.clone()).unwrap_or_default()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let count = self.predictions.load(Ordering::Relaxed);
        let negatives = self.negative_predictions.load(Ordering::Relaxed);
        let degraded = self.degraded_explanations.load(Ordering::Relaxed);
        let negative_rate = if count > 0 {
            (negatives as f64 / count as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.get_processing_stats();
        let throughput = self.get_throughput();
        let errors = self.get_errors_by_kind();
        let distribution = self.get_probability_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║             REVIEW RISK PIPELINE - METRICS SUMMARY           ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Predictions:            {:>8}  │  Throughput: {:>6.1} req/s ║",
            count, throughput
        );
        info!(
            "║ Negative:               {:>8}  │  Rate: {:>6.1}%           ║",
            negatives, negative_rate
        );
        info!("║ Degraded explanations:  {:>8}                            ║", degraded);
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        if !errors.is_empty() {
            info!("╠══════════════════════════════════════════════════════════════╣");
            info!("║ Errors by Kind:                                              ║");
            for (kind, n) in &errors {
                info!("║   {:18}: {:>6}                                  ║", kind, n);
            }
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Negative Probability Distribution:                           ║");
        let total: u64 = distribution.iter().sum();
        for (i, &n) in distribution.iter().enumerate() {
            let pct = if total > 0 { (n as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                n,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Real-time metrics reporter that prints periodic summaries
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

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = PipelineMetrics::new();

        metrics.record_prediction(Duration::from_micros(100), 0.15, false);
        metrics.record_prediction(Duration::from_micros(200), 0.81, true);
        metrics.record_degraded_explanation();
        metrics.record_error("validation");
        metrics.record_error("validation");
        metrics.record_error("contract_mismatch");

        assert_eq!(metrics.predictions.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.negative_predictions.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.degraded_explanations.load(Ordering::Relaxed), 1);

        let errors = metrics.get_errors_by_kind();
        assert_eq!(errors.get("validation"), Some(&2));
        assert_eq!(errors.get("contract_mismatch"), Some(&1));
    }

    #[test]
    fn test_probability_buckets() {
        let metrics = PipelineMetrics::new();
        for p in [0.0, 0.05, 0.5, 0.99, 1.0] {
            metrics.record_prediction(Duration::from_micros(10), p, p >= 0.5);
        }

        let dist = metrics.get_probability_distribution();
        assert_eq!(dist[0], 2);
        assert_eq!(dist[5], 1);
        assert_eq!(dist[9], 2);
    }

    #[test]
    fn test_processing_stats() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.get_processing_stats().count, 0);

        for us in 1..=100 {
            metrics.record_prediction(Duration::from_micros(us), 0.2, false);
        }

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 100);
        assert_eq!(stats.mean_us, 50);
        assert_eq!(stats.p50_us, 51);
        assert_eq!(stats.max_us, 100);
        assert!(stats.p95_us <= stats.p99_us);
    }
}
