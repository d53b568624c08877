//! Server configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use toxiscan_classifiers::ClassifierConfig;
use toxiscan_telemetry::PersistenceConfig;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origin, `*` for any
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,

    /// Scoring pipeline
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Prediction log
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Comment extraction
    #[serde(default)]
    pub comments: CommentsConfig,
}

/// Overrides collected from the command line and environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub listen: Option<String>,
    pub port: Option<u16>,
    pub cors_origin: Option<String>,
    pub model_path: Option<PathBuf>,
    pub vectorizer_path: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from file and apply overrides
    ///
    /// A missing file yields the defaults.
    pub fn load(config_path: &Path, overrides: &ConfigOverrides) -> anyhow::Result<Self> {
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(listen) = &overrides.listen {
            self.listen = listen.clone();
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(origin) = &overrides.cors_origin {
            self.cors_origin = origin.clone();
        }
        if let Some(path) = &overrides.model_path {
            self.classifier.artifacts.model_path = path.clone();
        }
        if let Some(path) = &overrides.vectorizer_path {
            self.classifier.artifacts.vectorizer_path = path.clone();
        }
    }

    /// Validate settings that must be correct before serving
    pub fn validate(&self) -> anyhow::Result<()> {
        self.classifier.validate()?;

        if self.comments.max_comments_cap == 0 {
            anyhow::bail!("comments.max_comments_cap must be greater than 0");
        }
        match self.comments.source {
            CommentSourceKind::Http if self.comments.base_url.is_none() => {
                anyhow::bail!("comments.base_url is required when comments.source is http")
            }
            CommentSourceKind::File if self.comments.dir.is_none() => {
                anyhow::bail!("comments.dir is required when comments.source is file")
            }
            _ => {}
        }
        if self.persistence.flush_interval == 0 {
            anyhow::bail!("persistence.flush_interval must be greater than 0");
        }

        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            classifier: ClassifierConfig::default(),
            persistence: PersistenceConfig::default(),
            comments: CommentsConfig::default(),
        }
    }
}

/// Where video comments come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentSourceKind {
    /// Video analysis disabled
    #[default]
    None,
    Http,
    File,
}

/// Comment extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentsConfig {
    #[serde(default)]
    pub source: CommentSourceKind,

    /// Base URL of the extraction service
    #[serde(default)]
    pub base_url: Option<String>,

    /// Directory of `{video_id}.json` files
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Upper bound on comments analysed per video
    #[serde(default = "default_max_comments_cap")]
    pub max_comments_cap: usize,

    /// Allow HTTP and private addresses for the extraction service
    #[serde(default)]
    pub allow_insecure: bool,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            source: CommentSourceKind::None,
            base_url: None,
            dir: None,
            max_comments_cap: default_max_comments_cap(),
            allow_insecure: false,
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origin() -> String {
    "*".to_string()
}

fn default_max_comments_cap() -> usize {
    50
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.cors_origin, "*");
        assert_eq!(config.comments.source, CommentSourceKind::None);
        assert_eq!(config.comments.max_comments_cap, 50);
        assert_eq!(config.classifier.max_batch_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_yaml_with_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("toxiscan.yaml");
        std::fs::write(
            &path,
            r#"
port: 9000
classifier:
  calibration:
    strategy: range_stretch
    low_bound: 0.40
    high_bound: 0.50
comments:
  source: file
  dir: ./comments
"#,
        )
        .unwrap();

        let overrides = ConfigOverrides {
            cors_origin: Some("https://app.example.com".to_string()),
            ..Default::default()
        };
        let config = ServerConfig::load(&path, &overrides).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.listen, "0.0.0.0");
        assert_eq!(config.cors_origin, "https://app.example.com");
        assert_eq!(config.comments.source, CommentSourceKind::File);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let overrides = ConfigOverrides {
            port: Some(8123),
            ..Default::default()
        };
        let config = ServerConfig::load(&dir.path().join("nope.yaml"), &overrides).unwrap();
        assert_eq!(config.port, 8123);
    }

    #[test]
    fn test_invalid_calibration_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(
            &path,
            "classifier:\n  calibration:\n    strategy: range_stretch\n    low_bound: 0.5\n    high_bound: 0.5\n",
        )
        .unwrap();
        assert!(ServerConfig::load(&path, &ConfigOverrides::default()).is_err());
    }

    #[test]
    fn test_http_source_requires_base_url() {
        let mut config = ServerConfig::default();
        config.comments.source = CommentSourceKind::Http;
        assert!(config.validate().is_err());
        config.comments.base_url = Some("https://comments.example.com".to_string());
        assert!(config.validate().is_ok());
    }
}
