//! Error types for the embedding layer

/// Result type for embedding operations.
///
/// Used throughout the crate for operations that can fail.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type for all embedding operations.
///
/// Lower-level errors are chained through `#[source]` so callers can inspect
/// the full cause.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Error when model configuration is invalid
    #[error("Invalid model configuration: {message}")]
    InvalidConfig { message: String },

    /// More than one model factory is registered and none was chosen explicitly
    #[error(
        "Conflict: multiple embedding model factories are registered ({}). Please specify the model explicitly.",
        .names.join(", ")
    )]
    ConflictingFactories { names: Vec<String> },

    /// IO errors when reading model files
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Async task join errors
    #[error("Async task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },

    /// Config file parse errors
    #[error("Failed to parse model configuration: {source}")]
    ConfigParse {
        #[from]
        source: toml::de::Error,
    },

    /// Generic errors from other libraries
    #[error("External error: {source}")]
    External {
        #[from]
        source: anyhow::Error,
    },
}

impl EmbedError {
    /// Create an invalid configuration error with a custom message.
    ///
    /// # Arguments
    /// * `message` - What is wrong with the configuration
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
