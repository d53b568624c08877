//! Configuration for the scoring pipeline

use crate::calibration::CalibrationConfig;
use crate::normalizer::NormalizerConfig;
use crate::vectorizer::VectorizerConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use toxiscan_core::{Error, Result};

/// Locations of the trained artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    #[serde(default = "default_vectorizer_path")]
    pub vectorizer_path: PathBuf,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/model.json")
}

fn default_vectorizer_path() -> PathBuf {
    PathBuf::from("models/vectorizer.json")
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            vectorizer_path: default_vectorizer_path(),
        }
    }
}

/// Configuration for the whole scoring pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub artifacts: ArtifactConfig,

    #[serde(default)]
    pub normalizer: NormalizerConfig,

    #[serde(default)]
    pub calibration: CalibrationConfig,

    /// Settings used when fitting a new vectorizer
    #[serde(default)]
    pub vectorizer: VectorizerConfig,

    /// Maximum texts per batch
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Maximum characters per text accepted over HTTP
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
}

fn default_max_batch_size() -> usize {
    100
}

fn default_max_text_length() -> usize {
    5000
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            artifacts: ArtifactConfig::default(),
            normalizer: NormalizerConfig::default(),
            calibration: CalibrationConfig::default(),
            vectorizer: VectorizerConfig::default(),
            max_batch_size: default_max_batch_size(),
            max_text_length: default_max_text_length(),
        }
    }
}

impl ClassifierConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on settings that can never work
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(Error::config("max_batch_size must be positive"));
        }
        if self.max_text_length == 0 {
            return Err(Error::config("max_text_length must be positive"));
        }
        self.calibration.build()?;
        self.vectorizer.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::NormalizerBackend;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config = ClassifierConfig::from_yaml("{}").unwrap();
        assert_eq!(config.max_batch_size, 100);
        assert_eq!(config.max_text_length, 5000);
        assert_eq!(config.artifacts, ArtifactConfig::default());
        assert_eq!(config.calibration, CalibrationConfig::default());
        assert_eq!(config.normalizer.backend, NormalizerBackend::Lemmatizing);
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
artifacts:
  model_path: /srv/models/lr.json
  vectorizer_path: /srv/models/tfidf.json
normalizer:
  backend: simple
  extra_stop_words: [video, channel]
calibration:
  strategy: range_stretch
  low_bound: 0.42
  high_bound: 0.50
max_batch_size: 25
"#;
        let config = ClassifierConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.artifacts.model_path, PathBuf::from("/srv/models/lr.json"));
        assert_eq!(config.normalizer.backend, NormalizerBackend::Simple);
        assert_eq!(config.normalizer.extra_stop_words.len(), 2);
        assert_eq!(config.max_batch_size, 25);
    }

    #[test]
    fn test_invalid_calibration_is_config_error() {
        let yaml = "calibration:\n  strategy: range_stretch\n  low_bound: 0.48\n  high_bound: 0.44\n";
        assert!(matches!(ClassifierConfig::from_yaml(yaml), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(matches!(
            ClassifierConfig::from_yaml("max_batch_size: 0"),
            Err(Error::Config(_))
        ));
    }
}
