//! HTTP routes and handlers

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::comments::{extract_video_id, CommentSort};
use crate::state::AppState;
use toxiscan_classifiers::{ArtifactInfo, ToxicityPredictor};
use toxiscan_core::{Error, PredictionResult, PredictionSource, ToxicityLabel};
use toxiscan_telemetry::{
    MetricsSnapshot, MonitorReport, PredictionLog, PredictionQuery, PredictionRecord,
    PredictionStatistics, DEFAULT_QUERY_LIMIT, DEFAULT_RECENT_LIMIT,
};

/// Largest `max_comments` a caller may request
pub const MAX_REQUESTED_COMMENTS: usize = 500;

/// Largest page size for `/predictions`
pub const MAX_QUERY_LIMIT: usize = 1000;

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/predict", post(predict))
        .route("/predict/batch", post(predict_batch))
        .route("/analyze/youtube", post(analyze_youtube))
        .route("/predictions", get(list_predictions))
        .route("/predictions/stats", get(prediction_stats))
        .route("/predictions/monitor", get(monitor))
        .fallback(fallback)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!("Invalid CORS origin {:?}, allowing any origin", origin);
            layer.allow_origin(Any)
        }
    }
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Toxiscan comment toxicity API",
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health",
        "metrics": "/metrics",
    }))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<ModelDescription>,
    metrics: MetricsSnapshot,
}

#[derive(Debug, Serialize)]
struct ModelDescription {
    classifier: String,
    calibration: &'static str,
    normalizer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifacts: Option<ArtifactInfo>,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let model = state.predictor.as_ref().map(|p| ModelDescription {
        classifier: p.classifier_name().to_string(),
        calibration: p.calibration_name(),
        normalizer: p.normalizer_name().to_string(),
        artifacts: p.artifact_info().cloned(),
    });

    Json(HealthResponse {
        status: if model.is_some() { "healthy" } else { "unhealthy" },
        model_loaded: model.is_some(),
        model,
        metrics: state.metrics.snapshot(),
    })
}

async fn metrics(State(state): State<AppState>) -> String {
    state
        .metrics_handle
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct TextRequest {
    text: String,
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<PredictionResult>, AppError> {
    let Json(req) = payload?;
    let predictor = require_predictor(&state)?;
    validate_text(&req.text, state.config.classifier.max_text_length)?;

    state.metrics.record_request();
    let started = Instant::now();
    let result = predictor.predict_one(&req.text)?;
    state.metrics.record_latency(elapsed_us(started));
    state
        .metrics
        .record_prediction(result.is_toxic, result.confidence, PredictionSource::Api);

    debug!(
        is_toxic = result.is_toxic,
        probability_toxic = result.probability_toxic,
        "Scored text"
    );

    if let Some(log) = &state.prediction_log {
        log.record_result(&result, PredictionSource::Api, None);
    }

    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct BatchRequest {
    texts: Vec<String>,
}

async fn predict_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<Vec<PredictionResult>>, AppError> {
    let Json(req) = payload?;
    let predictor = require_predictor(&state)?;

    if req.texts.is_empty() {
        return Err(AppError::InvalidRequest(
            "texts must contain at least one item".to_string(),
        ));
    }
    let max_batch_size = state.config.classifier.max_batch_size;
    if req.texts.len() > max_batch_size {
        return Err(Error::too_many_items(req.texts.len(), max_batch_size).into());
    }
    for text in &req.texts {
        validate_text(text, state.config.classifier.max_text_length)?;
    }

    state.metrics.record_request();
    let started = Instant::now();
    let results = predictor.predict_batch(&req.texts, max_batch_size)?;
    state.metrics.record_latency(elapsed_us(started));
    state.metrics.record_results(&results, PredictionSource::Batch);

    if let Some(log) = &state.prediction_log {
        log.record_batch(&results, PredictionSource::Batch, None);
    }

    Ok(Json(results))
}

#[derive(Debug, Deserialize)]
struct VideoRequest {
    video_url: String,
    #[serde(default = "default_max_comments")]
    max_comments: usize,
    #[serde(default)]
    sort_by: CommentSort,
}

fn default_max_comments() -> usize {
    100
}

#[derive(Debug, Serialize)]
struct CommentAnalysis {
    comment_id: String,
    text: String,
    author: String,
    likes: u64,
    time: String,
    reply_count: u64,
    is_toxic: bool,
    toxicity_label: ToxicityLabel,
    probability_toxic: f64,
    confidence: f64,
}

#[derive(Debug, Serialize)]
struct VideoAnalysis {
    video_id: String,
    video_url: String,
    total_comments: usize,
    toxic_count: usize,
    non_toxic_count: usize,
    toxic_percentage: f64,
    comments: Vec<CommentAnalysis>,
}

async fn analyze_youtube(
    State(state): State<AppState>,
    payload: Result<Json<VideoRequest>, JsonRejection>,
) -> Result<Json<VideoAnalysis>, AppError> {
    let Json(req) = payload?;
    let predictor = require_predictor(&state)?;

    if req.max_comments == 0 || req.max_comments > MAX_REQUESTED_COMMENTS {
        return Err(AppError::InvalidRequest(format!(
            "max_comments must be between 1 and {}",
            MAX_REQUESTED_COMMENTS
        )));
    }

    let source = state.comment_source.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable("Comment extraction is not configured".to_string())
    })?;

    let video_id = extract_video_id(&req.video_url).ok_or_else(|| {
        AppError::InvalidRequest("Could not extract a video ID from the URL".to_string())
    })?;

    let limit = req.max_comments.min(state.config.comments.max_comments_cap);
    info!(video_id = %video_id, limit, source = source.name(), "Analyzing video comments");

    state.metrics.record_request();
    let comments = source
        .fetch_comments(&video_id, limit, req.sort_by)
        .await
        .map_err(|e| {
            warn!(video_id = %video_id, "Comment extraction failed: {}", e);
            AppError::Upstream(format!("Comment extraction failed: {}", e))
        })?;

    if comments.is_empty() {
        return Err(AppError::NotFound(
            "No comments found for this video".to_string(),
        ));
    }

    let started = Instant::now();
    let mut analyses = Vec::with_capacity(comments.len());
    let mut scored = Vec::with_capacity(comments.len());
    for comment in comments.into_iter().take(limit) {
        let result = match predictor.predict_one(&comment.text) {
            Ok(result) => {
                scored.push(result.clone());
                result
            }
            Err(e) => {
                warn!(comment_id = %comment.comment_id, "Failed to score comment: {}", e);
                unscored(&comment.text)
            }
        };
        analyses.push(CommentAnalysis {
            comment_id: comment.comment_id,
            text: comment.text,
            author: comment.author,
            likes: comment.likes,
            time: comment.time,
            reply_count: comment.reply_count,
            is_toxic: result.is_toxic,
            toxicity_label: result.toxicity_label,
            probability_toxic: result.probability_toxic,
            confidence: result.confidence,
        });
    }
    state.metrics.record_latency(elapsed_us(started));
    state.metrics.record_results(&scored, PredictionSource::Youtube);

    // Unscored placeholders stay out of metrics and history
    if let Some(log) = &state.prediction_log {
        log.record_batch(&scored, PredictionSource::Youtube, Some(&video_id));
    }

    let total = analyses.len();
    let toxic_count = analyses.iter().filter(|c| c.is_toxic).count();
    let toxic_percentage = round2(toxic_count as f64 / total as f64 * 100.0);

    Ok(Json(VideoAnalysis {
        video_id,
        video_url: req.video_url,
        total_comments: total,
        toxic_count,
        non_toxic_count: total - toxic_count,
        toxic_percentage,
        comments: analyses,
    }))
}

/// Zero-probability Not Toxic placeholder for a comment that could not be scored
fn unscored(text: &str) -> PredictionResult {
    PredictionResult {
        text: text.to_string(),
        is_toxic: false,
        toxicity_label: ToxicityLabel::NotToxic,
        probability_toxic: 0.0,
        probability_not_toxic: 0.0,
        confidence: 0.0,
    }
}

#[derive(Debug, Default, Deserialize)]
struct PredictionsParams {
    limit: Option<usize>,
    offset: Option<usize>,
    is_toxic: Option<bool>,
    source: Option<String>,
    video_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct PredictionsResponse {
    predictions: Vec<PredictionRecord>,
    count: usize,
}

async fn list_predictions(
    State(state): State<AppState>,
    params: Result<Query<PredictionsParams>, QueryRejection>,
) -> Result<Json<PredictionsResponse>, AppError> {
    let Query(params) = params?;
    let log = require_log(&state)?;

    let limit = params.limit.unwrap_or(DEFAULT_QUERY_LIMIT);
    if limit == 0 || limit > MAX_QUERY_LIMIT {
        return Err(AppError::InvalidRequest(format!(
            "limit must be between 1 and {}",
            MAX_QUERY_LIMIT
        )));
    }

    let mut query = PredictionQuery::new().paginate(limit, params.offset.unwrap_or(0));
    if let Some(is_toxic) = params.is_toxic {
        query = query.is_toxic(is_toxic);
    }
    if let Some(source) = params.source {
        query = query.source(source.parse::<PredictionSource>()?);
    }
    if let Some(video_id) = params.video_id {
        query = query.video_id(video_id);
    }

    let predictions = log.query(&query)?;
    let count = predictions.len();
    Ok(Json(PredictionsResponse { predictions, count }))
}

async fn prediction_stats(
    State(state): State<AppState>,
) -> Result<Json<PredictionStatistics>, AppError> {
    let log = require_log(&state)?;
    Ok(Json(log.statistics()?))
}

#[derive(Debug, Deserialize)]
struct MonitorParams {
    #[serde(default = "default_recent_limit")]
    recent_limit: usize,
}

fn default_recent_limit() -> usize {
    DEFAULT_RECENT_LIMIT
}

async fn monitor(
    State(state): State<AppState>,
    params: Result<Query<MonitorParams>, QueryRejection>,
) -> Result<Json<MonitorReport>, AppError> {
    let Query(params) = params?;
    let log = require_log(&state)?;

    if params.recent_limit == 0 {
        return Err(AppError::InvalidRequest(
            "recent_limit must be at least 1".to_string(),
        ));
    }

    Ok(Json(log.monitor(params.recent_limit)?))
}

async fn fallback() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

fn require_predictor(state: &AppState) -> Result<&ToxicityPredictor, AppError> {
    state
        .predictor
        .as_deref()
        .ok_or_else(|| AppError::ServiceUnavailable("Model not loaded".to_string()))
}

fn require_log(state: &AppState) -> Result<&Arc<PredictionLog>, AppError> {
    state.prediction_log.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable("Prediction log is not available".to_string())
    })
}

fn validate_text(text: &str, max_len: usize) -> Result<(), AppError> {
    if text.trim().is_empty() {
        return Err(AppError::InvalidRequest("text must not be empty".to_string()));
    }
    let len = text.chars().count();
    if len > max_len {
        return Err(AppError::InvalidRequest(format!(
            "text is {} characters long, the maximum is {}",
            len, max_len
        )));
    }
    Ok(())
}

fn elapsed_us(started: Instant) -> u64 {
    started.elapsed().as_micros() as u64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Error type for HTTP handlers
#[derive(Debug)]
pub enum AppError {
    InvalidRequest(String),
    NotFound(String),
    Upstream(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "invalid_request_error",
            AppError::NotFound(_) => "not_found_error",
            AppError::Upstream(_) => "upstream_error",
            AppError::ServiceUnavailable(_) => "service_unavailable",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        debug!(kind = err.kind(), "Request failed: {}", err);
        match err {
            Error::ModelUnavailable(msg) => AppError::ServiceUnavailable(msg),
            err if err.is_client_error() => AppError::InvalidRequest(err.to_string()),
            err => AppError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        metrics::counter!("toxiscan_errors_total", "type" => kind).increment(1);

        let (status, message) = match self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(msg) => {
                warn!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = json!({
            "error": {
                "message": message,
                "type": kind,
            }
        });

        (status, Json(body)).into_response()
    }
}
