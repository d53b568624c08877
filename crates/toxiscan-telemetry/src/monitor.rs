//! Model health monitoring
//!
//! Compares the average confidence of the most recent predictions with the
//! all-time average. A sustained drop in confidence is the cheapest signal
//! that incoming comments have drifted away from the training data.

use crate::persistence::PredictionStatistics;
use serde::{Deserialize, Serialize};

/// Default number of recent predictions compared against history
pub const DEFAULT_RECENT_LIMIT: usize = 100;

/// Confidence drop (percent) above which the model is reported degraded
pub const DEGRADED_DROP_PERCENT: f64 = 10.0;

/// Confidence drop (percent) above which a warning is raised
pub const WARNING_DROP_PERCENT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorStatus {
    Healthy,
    Warning,
    Degraded,
    InsufficientData,
}

impl MonitorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorStatus::Healthy => "healthy",
            MonitorStatus::Warning => "warning",
            MonitorStatus::Degraded => "degraded",
            MonitorStatus::InsufficientData => "insufficient_data",
        }
    }
}

/// Recent versus historical comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceComparison {
    /// Historical average minus recent average
    pub confidence_drop: f64,
    pub confidence_drop_percentage: f64,
    pub recent_limit: usize,
}

/// Result of a monitoring check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorReport {
    pub status: MonitorStatus,
    pub alert: Option<String>,
    pub historical: PredictionStatistics,
    pub recent: PredictionStatistics,
    pub comparison: ConfidenceComparison,
}

impl MonitorReport {
    /// Build a report from historical and recent statistics
    pub fn build(
        historical: PredictionStatistics,
        recent: PredictionStatistics,
        recent_limit: usize,
    ) -> Self {
        let confidence_drop = historical.average_confidence - recent.average_confidence;
        let confidence_drop_percentage = if historical.average_confidence > 0.0 {
            confidence_drop / historical.average_confidence * 100.0
        } else {
            0.0
        };

        let (status, alert) = if historical.total_predictions < recent_limit {
            (MonitorStatus::InsufficientData, None)
        } else if confidence_drop_percentage > DEGRADED_DROP_PERCENT {
            (
                MonitorStatus::Degraded,
                Some(format!(
                    "Model confidence dropped by {:.2}% over the last {} predictions",
                    confidence_drop_percentage, recent_limit
                )),
            )
        } else if confidence_drop_percentage > WARNING_DROP_PERCENT {
            (
                MonitorStatus::Warning,
                Some(format!(
                    "Model confidence dropped by {:.2}%",
                    confidence_drop_percentage
                )),
            )
        } else {
            (MonitorStatus::Healthy, None)
        };

        Self {
            status,
            alert,
            historical,
            recent,
            comparison: ConfidenceComparison {
                confidence_drop,
                confidence_drop_percentage,
                recent_limit,
            },
        }
    }
}
