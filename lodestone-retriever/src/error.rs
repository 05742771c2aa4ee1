//! Error types for retrieval, storage and document loading

use lodestone_embed::EmbedError;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, RetrieverError>;

#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    /// An argument or configuration value is out of range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("An embedding store is required but none was provided")]
    MissingEmbeddingStore,

    #[error(
        "An embedding model is required: provide one explicitly or register exactly one model factory"
    )]
    MissingEmbeddingModel,

    /// The embedding model failed
    #[error(transparent)]
    Embed(#[from] EmbedError),

    /// The storage backend failed
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("IO error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document, filter expression or config file could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}

impl RetrieverError {
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Ensure `value > 0`.
pub fn ensure_greater_than_zero(value: usize, name: &str) -> Result<usize> {
    if value == 0 {
        return Err(RetrieverError::invalid_argument(format!(
            "{name} must be greater than zero, but is: {value}"
        )));
    }
    Ok(value)
}

/// Ensure `min <= value <= max`. NaN is rejected.
pub fn ensure_between(value: f64, min: f64, max: f64, name: &str) -> Result<f64> {
    if !(min..=max).contains(&value) {
        return Err(RetrieverError::invalid_argument(format!(
            "{name} must be between {min} and {max}, but is: {value}"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_greater_than_zero() {
        assert_eq!(ensure_greater_than_zero(3, "maxResults").unwrap(), 3);
        let err = ensure_greater_than_zero(0, "maxResults").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid argument: maxResults must be greater than zero, but is: 0"
        );
    }

    #[test]
    fn test_ensure_between() {
        assert_eq!(ensure_between(0.0, 0.0, 1.0, "minScore").unwrap(), 0.0);
        assert_eq!(ensure_between(1.0, 0.0, 1.0, "minScore").unwrap(), 1.0);
        assert!(ensure_between(-0.01, 0.0, 1.0, "minScore").is_err());
        assert!(ensure_between(1.01, 0.0, 1.0, "minScore").is_err());
        assert!(ensure_between(f64::NAN, 0.0, 1.0, "minScore").is_err());
    }
}
