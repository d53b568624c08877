//! Serving facade
//!
//! `ToxicityPredictor` composes normalizer, vectorizer, classifier and
//! calibration strategy. All parts are immutable after construction, so a
//! single predictor is shared across request handlers without locking.

use crate::calibration::{CalibrationStrategy, Decision};
use crate::classifier::ProbabilisticClassifier;
use crate::config::ClassifierConfig;
use crate::loader::{load_artifacts, ArtifactInfo};
use crate::normalizer::Normalizer;
use crate::vectorizer::FittedVectorizer;
use std::sync::Arc;
use std::time::Instant;
use toxiscan_core::{Error, PredictionResult, Result, ToxicityLabel};
use tracing::debug;

/// Scores texts for toxicity
pub struct ToxicityPredictor {
    normalizer: Arc<dyn Normalizer>,
    vectorizer: Arc<FittedVectorizer>,
    classifier: Arc<dyn ProbabilisticClassifier>,
    calibration: Arc<dyn CalibrationStrategy>,
    artifact_info: Option<ArtifactInfo>,
}

impl ToxicityPredictor {
    /// Assemble a predictor from already-built parts
    pub fn new(
        normalizer: Arc<dyn Normalizer>,
        vectorizer: Arc<FittedVectorizer>,
        classifier: Arc<dyn ProbabilisticClassifier>,
        calibration: Arc<dyn CalibrationStrategy>,
    ) -> Result<Self> {
        if classifier.n_features() != vectorizer.vocabulary_size() {
            return Err(Error::model_unavailable(format!(
                "classifier expects {} features but vectorizer produces {}",
                classifier.n_features(),
                vectorizer.vocabulary_size()
            )));
        }

        Ok(Self {
            normalizer,
            vectorizer,
            classifier,
            calibration,
            artifact_info: None,
        })
    }

    /// Build normalizer and calibration from configuration and load artifacts from disk
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        let calibration = config.calibration.build()?;
        let normalizer = config.normalizer.build()?;
        let artifacts = load_artifacts(&config.artifacts)?;

        let mut predictor = Self::new(
            normalizer,
            Arc::new(artifacts.vectorizer),
            Arc::new(artifacts.model),
            calibration,
        )?;
        predictor.artifact_info = Some(artifacts.info);
        Ok(predictor)
    }

    /// Score a single text
    pub fn predict_one(&self, text: &str) -> Result<PredictionResult> {
        let start = Instant::now();
        let decision = self.decide(text)?;

        debug!(
            raw = decision.raw_probability,
            display = decision.display_probability,
            is_toxic = decision.is_toxic,
            latency_us = start.elapsed().as_micros() as u64,
            "Scored text"
        );

        Ok(PredictionResult {
            text: text.to_string(),
            is_toxic: decision.is_toxic,
            toxicity_label: ToxicityLabel::from_decision(decision.is_toxic),
            probability_toxic: decision.display_probability,
            probability_not_toxic: decision.complement_probability,
            confidence: decision.confidence,
        })
    }

    /// Score several texts; rejects the whole batch if it exceeds `max_batch_size`
    pub fn predict_batch<S: AsRef<str>>(
        &self,
        texts: &[S],
        max_batch_size: usize,
    ) -> Result<Vec<PredictionResult>> {
        if texts.len() > max_batch_size {
            return Err(Error::too_many_items(texts.len(), max_batch_size));
        }

        texts.iter().map(|t| self.predict_one(t.as_ref())).collect()
    }

    /// Normalize, vectorize, classify and calibrate one text
    pub fn decide(&self, text: &str) -> Result<Decision> {
        let normalized = self.normalizer.normalize(text);
        let features = vec![self.vectorizer.transform_one(&normalized)];

        let probabilities = self.classifier.predict_proba(&features)?;
        let raw = probabilities
            .first()
            .map(|p| p.toxic)
            .ok_or_else(|| Error::internal("classifier returned no probabilities"))?;

        self.calibration.decide(raw).map_err(|e| match e {
            Error::InvalidArgument(msg) => {
                Error::internal(format!("classifier produced an invalid probability: {}", msg))
            }
            other => other,
        })
    }

    pub fn normalizer_name(&self) -> &str {
        self.normalizer.name()
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    pub fn calibration_name(&self) -> &'static str {
        self.calibration.name()
    }

    pub fn artifact_info(&self) -> Option<&ArtifactInfo> {
        self.artifact_info.as_ref()
    }
}

impl std::fmt::Debug for ToxicityPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToxicityPredictor")
            .field("normalizer", &self.normalizer.name())
            .field("classifier", &self.classifier.name())
            .field("calibration", &self.calibration.name())
            .field("vocabulary_size", &self.vectorizer.vocabulary_size())
            .finish()
    }
}
