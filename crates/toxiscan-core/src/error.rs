//! Error types for toxiscan

/// Result type alias using toxiscan's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for toxiscan operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration (bad calibration bounds, unusable vectorizer settings)
    #[error("configuration error: {0}")]
    Config(String),

    /// The model or vectorizer artifact is missing, unreadable or inconsistent
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Caller supplied an input the service cannot score
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Batch exceeds the configured maximum
    #[error("too many items: {count} exceeds maximum of {max}")]
    TooManyItems { count: usize, max: usize },

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML configuration parse errors
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new model-unavailable error
    pub fn model_unavailable(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Create a new invalid-argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a new too-many-items error
    pub fn too_many_items(count: usize, max: usize) -> Self {
        Self::TooManyItems { count, max }
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short machine-readable name of the variant, attached to request failure logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration_error",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::TooManyItems { .. } => "too_many_items",
            Self::Io(_) => "io_error",
            Self::Serialization(_) => "serialization_error",
            Self::Yaml(_) => "yaml_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Whether the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::TooManyItems { .. })
    }
}
