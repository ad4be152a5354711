//! Serving metrics and statistics tracking for the prediction API.

use crate::models::variant::Variant;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Latency samples kept per variant
const LATENCY_WINDOW: usize = 1000;

#[derive(Debug, Default)]
struct VariantCounters {
    predictions: u64,
    positives: u64,
    /// Latencies in microseconds, most recent last
    latencies: Vec<u64>,
}

/// Metrics collector for the serving path
pub struct ServingMetrics {
    /// Successful predictions across all variants
    pub predictions_total: AtomicU64,
    /// Requests rejected before or during scoring
    pub rejected_total: AtomicU64,
    rejections_by_kind: RwLock<HashMap<&'static str, u64>>,
    per_variant: RwLock<BTreeMap<Variant, VariantCounters>>,
    start_time: Instant,
}

impl ServingMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            predictions_total: AtomicU64::new(0),
            rejected_total: AtomicU64::new(0),
            rejections_by_kind: RwLock::new(HashMap::new()),
            per_variant: RwLock::new(BTreeMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Record a served prediction
    pub fn record_prediction(&self, variant: Variant, prediction: u8, latency: Duration) {
        self.predictions_total.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut per_variant) = self.per_variant.write() {
            let counters = per_variant.entry(variant).or_default();
            counters.predictions += 1;
            counters.positives += u64::from(prediction);
            counters.latencies.push(latency.as_micros() as u64);
            if counters.latencies.len() > LATENCY_WINDOW {
                counters.latencies.drain(0..LATENCY_WINDOW / 2);
            }
        }
    }

    /// Record a rejected request by error kind
    pub fn record_rejection(&self, kind: &'static str) {
        self.rejected_total.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_kind) = self.rejections_by_kind.write() {
            *by_kind.entry(kind).or_insert(0) += 1;
        }
    }

    /// Predictions per second since startup
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions_total.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        let rejections_by_kind: BTreeMap<String, u64> = self
            .rejections_by_kind
            .read()
            .map(|by_kind| by_kind.iter().map(|(k, v)| (k.to_string(), *v)).collect())
            .unwrap_or_default();

        let variants: BTreeMap<String, VariantStats> = self
            .per_variant
            .read()
            .map(|per_variant| {
                per_variant
                    .iter()
                    .map(|(variant, counters)| (variant.config_key().to_string(), VariantStats::from(counters)))
                    .collect()
            })
            .unwrap_or_default();

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            predictions_total: self.predictions_total.load(Ordering::Relaxed),
            rejected_total: self.rejected_total.load(Ordering::Relaxed),
            throughput_per_sec: self.get_throughput(),
            rejections_by_kind,
            variants,
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let snapshot = self.snapshot();

        info!(
            predictions = snapshot.predictions_total,
            rejected = snapshot.rejected_total,
            throughput_per_sec = snapshot.throughput_per_sec,
            uptime_secs = snapshot.uptime_secs,
            "Serving metrics summary"
        );
        for (kind, count) in &snapshot.rejections_by_kind {
            info!(kind = %kind, count = count, "Rejected requests");
        }
        for (variant, stats) in &snapshot.variants {
            info!(
                model = %variant,
                predictions = stats.predictions,
                positive_rate = stats.positive_rate,
                mean_us = stats.mean_us,
                p50_us = stats.p50_us,
                p99_us = stats.p99_us,
                "Model serving stats"
            );
        }
    }
}

impl Default for ServingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable view of [`ServingMetrics`]
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub predictions_total: u64,
    pub rejected_total: u64,
    pub throughput_per_sec: f64,
    pub rejections_by_kind: BTreeMap<String, u64>,
    pub variants: BTreeMap<String, VariantStats>,
}

/// Per-variant serving statistics
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct VariantStats {
    pub predictions: u64,
    pub positives: u64,
    pub positive_rate: f64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
}

impl From<&VariantCounters> for VariantStats {
    fn from(counters: &VariantCounters) -> Self {
        let positive_rate = if counters.predictions > 0 {
            counters.positives as f64 / counters.predictions as f64
        } else {
            0.0
        };

        let mut sorted = counters.latencies.clone();
        sorted.sort_unstable();
        let count = sorted.len();
        let (mean_us, p50_us, p99_us) = if count == 0 {
            (0, 0, 0)
        } else {
            (
                sorted.iter().sum::<u64>() / count as u64,
                sorted[count / 2],
                sorted[((count as f64 * 0.99) as usize).min(count - 1)],
            )
        };

        Self {
            predictions: counters.predictions,
            positives: counters.positives,
            positive_rate,
            mean_us,
            p50_us,
            p99_us,
        }
    }
}

/// Periodically logs a metrics summary
pub struct MetricsReporter {
    metrics: Arc<ServingMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServingMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let period = Duration::from_secs(self.interval_secs.max(1));
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
