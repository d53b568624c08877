//! Base classifier trait and common types

use crate::vectorizer::FeatureMatrix;
use serde::{Deserialize, Serialize};
use toxiscan_core::{Error, Result};

/// Class probabilities for one row; the two fields sum to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub not_toxic: f64,
    pub toxic: f64,
}

impl ClassProbabilities {
    /// Build from the toxic-class probability
    pub fn from_toxic(toxic: f64) -> Self {
        let toxic = toxic.clamp(0.0, 1.0);
        Self {
            not_toxic: 1.0 - toxic,
            toxic,
        }
    }
}

/// Trait for binary toxicity classifiers operating on vectorized text
pub trait ProbabilisticClassifier: Send + Sync {
    /// Expected row width
    fn n_features(&self) -> usize;

    /// Probability of each class for every row
    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<ClassProbabilities>>;

    /// Hard decision for every row
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<bool>> {
        Ok(self
            .predict_proba(features)?
            .into_iter()
            .map(|p| p.toxic > 0.5)
            .collect())
    }

    /// Classifier name
    fn name(&self) -> &str;
}

/// Reject rows whose width differs from the model's
pub(crate) fn check_dimensions(features: &FeatureMatrix, expected: usize) -> Result<()> {
    if let Some((row, width)) = features
        .iter()
        .map(Vec::len)
        .enumerate()
        .find(|(_, width)| *width != expected)
    {
        return Err(Error::internal(format!(
            "feature dimension mismatch at row {}: expected {}, got {}",
            row, expected, width
        )));
    }
    Ok(())
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

pub(crate) fn dot(weights: &[f64], row: &[f64]) -> f64 {
    weights.iter().zip(row).map(|(w, x)| w * x).sum()
}
