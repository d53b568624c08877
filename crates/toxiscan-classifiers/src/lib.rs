//! Toxiscan Classifiers
//!
//! The scoring pipeline for comment toxicity:
//!
//! ```text
//! text -> Normalizer -> FittedVectorizer -> ProbabilisticClassifier -> CalibrationStrategy -> PredictionResult
//! ```
//!
//! Everything here is synchronous and CPU-bound. Artifacts are loaded once
//! and never mutated, so a [`ToxicityPredictor`] can be shared freely
//! between threads.

pub mod calibration;
pub mod classifier;
pub mod config;
pub mod lemmatizer;
pub mod lexicon;
pub mod loader;
pub mod model;
pub mod normalizer;
pub mod predictor;
pub mod vectorizer;

pub use calibration::{
    CalibrationConfig, CalibrationStrategy, Decision, Identity, LinearAmplify, RangeStretch,
    SigmoidAmplify, SqrtAmplify,
};
pub use classifier::{ClassProbabilities, ProbabilisticClassifier};
pub use config::{ArtifactConfig, ClassifierConfig};
pub use loader::{load_artifacts, ArtifactInfo, LoadedArtifacts};
pub use model::{LinearModel, ModelArtifact};
pub use normalizer::{Normalizer, NormalizerBackend, NormalizerConfig, TextNormalizer};
pub use predictor::ToxicityPredictor;
pub use vectorizer::{
    DocFrequency, FeatureMatrix, FittedVectorizer, VectorizerConfig, VectorizerScheme,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::calibration::{CalibrationStrategy, Decision, RangeStretch};
    pub use crate::classifier::{ClassProbabilities, ProbabilisticClassifier};
    pub use crate::normalizer::{Normalizer, TextNormalizer};
    pub use crate::predictor::ToxicityPredictor;
    pub use crate::vectorizer::{FittedVectorizer, VectorizerConfig};
}
