//! Trained model artifacts
//!
//! Models are produced by an offline training job and loaded read-only.
//! The on-disk format is a JSON document tagged by `kind`.

use crate::classifier::{check_dimensions, dot, sigmoid, ClassProbabilities, ProbabilisticClassifier};
use crate::vectorizer::FeatureMatrix;
use serde::{Deserialize, Serialize};
use std::path::Path;
use toxiscan_core::{Error, Result};

/// Serialized model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    /// `p = sigmoid(w·x + b)`
    LogisticRegression { coefficients: Vec<f64>, intercept: f64 },

    /// Linear SVM decision function with Platt scaling: `p = 1 / (1 + exp(a·f + b))`
    LinearSvm {
        coefficients: Vec<f64>,
        intercept: f64,
        platt_a: f64,
        platt_b: f64,
    },

    /// Multinomial naive Bayes, classes ordered `[not_toxic, toxic]`
    MultinomialNb {
        class_log_prior: [f64; 2],
        feature_log_prob: [Vec<f64>; 2],
    },
}

impl ModelArtifact {
    /// Parse from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Write to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Validate and turn into a runnable classifier
    pub fn into_classifier(self) -> Result<LinearModel> {
        LinearModel::new(self)
    }
}

/// Classifier backed by a [`ModelArtifact`]
#[derive(Debug, Clone)]
pub struct LinearModel {
    artifact: ModelArtifact,
    n_features: usize,
    name: &'static str,
}

impl LinearModel {
    pub fn new(artifact: ModelArtifact) -> Result<Self> {
        let (n_features, name) = match &artifact {
            ModelArtifact::LogisticRegression { coefficients, intercept } => {
                ensure_finite(coefficients.iter().chain([intercept]))?;
                (coefficients.len(), "logistic_regression")
            }
            ModelArtifact::LinearSvm {
                coefficients,
                intercept,
                platt_a,
                platt_b,
            } => {
                ensure_finite(coefficients.iter().chain([intercept, platt_a, platt_b]))?;
                (coefficients.len(), "linear_svm")
            }
            ModelArtifact::MultinomialNb {
                class_log_prior,
                feature_log_prob,
            } => {
                if feature_log_prob[0].len() != feature_log_prob[1].len() {
                    return Err(Error::model_unavailable(
                        "naive Bayes feature_log_prob rows have different lengths",
                    ));
                }
                ensure_finite(
                    class_log_prior
                        .iter()
                        .chain(feature_log_prob[0].iter())
                        .chain(feature_log_prob[1].iter()),
                )?;
                (feature_log_prob[0].len(), "multinomial_nb")
            }
        };

        if n_features == 0 {
            return Err(Error::model_unavailable("model has no features"));
        }

        Ok(Self {
            artifact,
            n_features,
            name,
        })
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    fn toxic_probability(&self, row: &[f64]) -> f64 {
        match &self.artifact {
            ModelArtifact::LogisticRegression { coefficients, intercept } => {
                sigmoid(dot(coefficients, row) + intercept)
            }
            ModelArtifact::LinearSvm {
                coefficients,
                intercept,
                platt_a,
                platt_b,
            } => {
                let decision = dot(coefficients, row) + intercept;
                sigmoid(-(platt_a * decision + platt_b))
            }
            ModelArtifact::MultinomialNb {
                class_log_prior,
                feature_log_prob,
            } => {
                let not_toxic = class_log_prior[0] + dot(&feature_log_prob[0], row);
                let toxic = class_log_prior[1] + dot(&feature_log_prob[1], row);
                sigmoid(toxic - not_toxic)
            }
        }
    }
}

impl ProbabilisticClassifier for LinearModel {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<ClassProbabilities>> {
        check_dimensions(features, self.n_features)?;
        Ok(features
            .iter()
            .map(|row| ClassProbabilities::from_toxic(self.toxic_probability(row)))
            .collect())
    }

    fn name(&self) -> &str {
        self.name
    }
}

fn ensure_finite<'a>(mut values: impl Iterator<Item = &'a f64>) -> Result<()> {
    if values.any(|v| !v.is_finite()) {
        return Err(Error::model_unavailable("model parameters contain NaN or infinity"));
    }
    Ok(())
}
