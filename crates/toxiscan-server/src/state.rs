//! Shared application state

use crate::comments::{CommentSource, FileCommentSource, HttpCommentSource};
use crate::config::{CommentSourceKind, CommentsConfig, ServerConfig};
use anyhow::Context;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use toxiscan_classifiers::ToxicityPredictor;
use toxiscan_core::Error;
use toxiscan_telemetry::{PredictionLog, PredictionMetrics};
use tracing::{info, warn};

/// State injected into every handler
#[derive(Clone)]
pub struct AppState {
    /// `None` while no model is loaded; prediction routes answer 503
    pub predictor: Option<Arc<ToxicityPredictor>>,

    pub prediction_log: Option<Arc<PredictionLog>>,

    pub metrics: PredictionMetrics,

    pub comment_source: Option<Arc<dyn CommentSource>>,

    pub metrics_handle: Option<PrometheusHandle>,

    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// State with nothing attached
    pub fn new(config: ServerConfig) -> Self {
        Self {
            predictor: None,
            prediction_log: None,
            metrics: PredictionMetrics::new(),
            comment_source: None,
            metrics_handle: None,
            config: Arc::new(config),
        }
    }

    /// Build every collaborator described by the configuration
    ///
    /// Missing or unreadable artifacts leave the predictor unset instead of
    /// failing, so the server still starts and reports itself unhealthy.
    pub fn from_config(
        config: ServerConfig,
        metrics_handle: Option<PrometheusHandle>,
    ) -> anyhow::Result<Self> {
        let predictor = match ToxicityPredictor::from_config(&config.classifier) {
            Ok(predictor) => {
                info!(
                    classifier = predictor.classifier_name(),
                    calibration = predictor.calibration_name(),
                    normalizer = predictor.normalizer_name(),
                    "Model loaded"
                );
                Some(Arc::new(predictor))
            }
            Err(Error::ModelUnavailable(reason)) => {
                warn!("Model not loaded, prediction routes disabled: {}", reason);
                None
            }
            Err(e) => return Err(e).context("failed to build predictor"),
        };

        let prediction_log = if config.persistence.enabled {
            let log = PredictionLog::new(config.persistence.clone())
                .context("failed to start prediction log")?;
            Some(Arc::new(log))
        } else {
            info!("Prediction log disabled");
            None
        };

        let comment_source = build_comment_source(&config.comments)?;

        let mut state = Self::new(config);
        state.predictor = predictor;
        state.prediction_log = prediction_log;
        state.comment_source = comment_source;
        state.metrics_handle = metrics_handle;
        Ok(state)
    }

    pub fn with_predictor(mut self, predictor: Arc<ToxicityPredictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn with_prediction_log(mut self, log: Arc<PredictionLog>) -> Self {
        self.prediction_log = Some(log);
        self
    }

    pub fn with_comment_source(mut self, source: Arc<dyn CommentSource>) -> Self {
        self.comment_source = Some(source);
        self
    }
}

fn build_comment_source(config: &CommentsConfig) -> anyhow::Result<Option<Arc<dyn CommentSource>>> {
    let source: Arc<dyn CommentSource> = match config.source {
        CommentSourceKind::None => {
            info!("Comment source not configured, video analysis disabled");
            return Ok(None);
        }
        CommentSourceKind::Http => {
            let base_url = config
                .base_url
                .as_deref()
                .context("comments.base_url is required for the http source")?;
            Arc::new(HttpCommentSource::new(base_url, config.allow_insecure)?)
        }
        CommentSourceKind::File => {
            let dir = config
                .dir
                .as_ref()
                .context("comments.dir is required for the file source")?;
            Arc::new(FileCommentSource::new(dir.clone()))
        }
    };

    info!("Comment source: {}", source.name());
    Ok(Some(source))
}
