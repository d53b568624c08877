//! Toxiscan Telemetry
//!
//! Prediction logging, statistics and monitoring for toxiscan.
//!
//! Provides:
//! - Append-only JSON-lines prediction log with rotation and retention
//! - Filtered queries and aggregate statistics over logged predictions
//! - Confidence-drift monitoring
//! - Request and prediction metrics

pub mod metrics;
pub mod monitor;
pub mod persistence;
pub mod service;

pub use metrics::{MetricsSnapshot, PredictionMetrics};
pub use monitor::{ConfidenceComparison, MonitorReport, MonitorStatus, DEFAULT_RECENT_LIMIT};
pub use persistence::{
    PersistenceConfig, PredictionQuery, PredictionReader, PredictionRecord, PredictionStatistics,
    PredictionWriter, DEFAULT_QUERY_LIMIT,
};
pub use service::PredictionLog;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::metrics::PredictionMetrics;
    pub use crate::monitor::{MonitorReport, MonitorStatus};
    pub use crate::persistence::{PersistenceConfig, PredictionQuery, PredictionRecord};
    pub use crate::service::PredictionLog;
}
