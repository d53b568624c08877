//! Artifact loading
//!
//! Loads the trained model and fitted vectorizer once at startup. Any
//! problem with either artifact is reported as `ModelUnavailable`; the
//! caller never receives a partially loaded pair.

use crate::config::ArtifactConfig;
use crate::model::{LinearModel, ModelArtifact};
use crate::vectorizer::FittedVectorizer;
use crate::ProbabilisticClassifier;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use toxiscan_core::{Error, Result};
use tracing::{info, warn};

/// Identity of the loaded artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactInfo {
    pub model_kind: String,
    pub model_sha256: String,
    pub vectorizer_sha256: String,
    pub vocabulary_size: usize,
}

/// A consistent model/vectorizer pair
#[derive(Debug)]
pub struct LoadedArtifacts {
    pub model: LinearModel,
    pub vectorizer: FittedVectorizer,
    pub info: ArtifactInfo,
}

fn read_artifact(path: &Path, what: &str) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::model_unavailable(format!("{} file not found: {}", what, path.display()))
        } else {
            Error::model_unavailable(format!("failed to read {} {}: {}", what, path.display(), e))
        }
    })
}

fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Load and cross-check the configured artifacts
pub fn load_artifacts(config: &ArtifactConfig) -> Result<LoadedArtifacts> {
    let model_bytes = read_artifact(&config.model_path, "model")?;
    let vectorizer_bytes = read_artifact(&config.vectorizer_path, "vectorizer")?;

    let model = ModelArtifact::from_bytes(&model_bytes)
        .and_then(ModelArtifact::into_classifier)
        .map_err(|e| {
            Error::model_unavailable(format!(
                "corrupt model artifact {}: {}",
                config.model_path.display(),
                e
            ))
        })?;

    let vectorizer = FittedVectorizer::from_bytes(&vectorizer_bytes).map_err(|e| {
        Error::model_unavailable(format!(
            "corrupt vectorizer artifact {}: {}",
            config.vectorizer_path.display(),
            e
        ))
    })?;

    if model.n_features() != vectorizer.vocabulary_size() {
        warn!(
            model_features = model.n_features(),
            vocabulary_size = vectorizer.vocabulary_size(),
            "Model and vectorizer do not match"
        );
        return Err(Error::model_unavailable(format!(
            "model expects {} features but vectorizer produces {}",
            model.n_features(),
            vectorizer.vocabulary_size()
        )));
    }

    let info = ArtifactInfo {
        model_kind: model.name().to_string(),
        model_sha256: fingerprint(&model_bytes),
        vectorizer_sha256: fingerprint(&vectorizer_bytes),
        vocabulary_size: vectorizer.vocabulary_size(),
    };

    info!(
        model = %config.model_path.display(),
        vectorizer = %config.vectorizer_path.display(),
        kind = %info.model_kind,
        vocabulary_size = info.vocabulary_size,
        model_sha256 = %info.model_sha256,
        "Loaded model artifacts"
    );

    Ok(LoadedArtifacts {
        model,
        vectorizer,
        info,
    })
}
