//! Prediction metrics collection and reporting
//!
//! In-process counters feed the `/health` snapshot, while the same events
//! are mirrored to the `metrics` facade for the Prometheus exporter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use toxiscan_core::{PredictionResult, PredictionSource};

/// Metrics collector for prediction traffic
#[derive(Clone)]
pub struct PredictionMetrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    total_requests: AtomicU64,
    total_predictions: AtomicU64,
    toxic_predictions: AtomicU64,
    /// Sum of confidences in millionths
    confidence_micros: AtomicU64,
    total_latency_us: AtomicU64,
}

impl PredictionMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                total_requests: AtomicU64::new(0),
                total_predictions: AtomicU64::new(0),
                toxic_predictions: AtomicU64::new(0),
                confidence_micros: AtomicU64::new(0),
                total_latency_us: AtomicU64::new(0),
            }),
        }
    }

    /// Record an incoming scoring request
    pub fn record_request(&self) {
        self.inner.total_requests.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("toxiscan_requests_total").increment(1);
    }

    /// Record one scored text
    pub fn record_prediction(&self, is_toxic: bool, confidence: f64, source: PredictionSource) {
        self.inner.total_predictions.fetch_add(1, Ordering::Relaxed);
        if is_toxic {
            self.inner.toxic_predictions.fetch_add(1, Ordering::Relaxed);
        }
        let micros = (confidence.clamp(0.0, 1.0) * 1_000_000.0).round() as u64;
        self.inner
            .confidence_micros
            .fetch_add(micros, Ordering::Relaxed);

        let label = if is_toxic { "toxic" } else { "not_toxic" };
        metrics::counter!(
            "toxiscan_predictions_total",
            "label" => label,
            "source" => source.as_str()
        )
        .increment(1);
    }

    /// Record scoring latency for one request
    pub fn record_latency(&self, latency_us: u64) {
        self.inner
            .total_latency_us
            .fetch_add(latency_us, Ordering::Relaxed);
        metrics::histogram!("toxiscan_prediction_latency_us").record(latency_us as f64);
    }

    /// Record every result of a scored batch
    pub fn record_results(&self, results: &[PredictionResult], source: PredictionSource) {
        for result in results {
            self.record_prediction(result.is_toxic, result.confidence, source);
        }
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.inner.total_requests.load(Ordering::Relaxed),
            total_predictions: self.inner.total_predictions.load(Ordering::Relaxed),
            toxic_predictions: self.inner.toxic_predictions.load(Ordering::Relaxed),
            confidence_sum: self.inner.confidence_micros.load(Ordering::Relaxed) as f64
                / 1_000_000.0,
            total_latency_us: self.inner.total_latency_us.load(Ordering::Relaxed),
        }
    }
}

impl Default for PredictionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_predictions: u64,
    pub toxic_predictions: u64,
    pub confidence_sum: f64,
    pub total_latency_us: u64,
}

impl MetricsSnapshot {
    /// Calculate average latency per request
    pub fn avg_latency_us(&self) -> u64 {
        if self.total_requests == 0 {
            0
        } else {
            self.total_latency_us / self.total_requests
        }
    }

    /// Fraction of predictions labelled toxic
    pub fn toxic_rate(&self) -> f64 {
        if self.total_predictions == 0 {
            0.0
        } else {
            self.toxic_predictions as f64 / self.total_predictions as f64
        }
    }

    pub fn mean_confidence(&self) -> f64 {
        if self.total_predictions == 0 {
            0.0
        } else {
            self.confidence_sum / self.total_predictions as f64
        }
    }
}
