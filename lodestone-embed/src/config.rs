//! Configuration for embedding models

use crate::error::{EmbedError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which embedding backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Offline hashing model, no model files needed
    #[default]
    Hashing,
    /// Local ONNX model through fastembed
    Fastembed,
}

/// Configuration for embedding models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    pub kind: ModelKind,
    /// Name of the embedding model to use (fastembed only)
    pub model_name: String,
    /// Vector dimension (hashing only; fastembed probes it from the model)
    pub dimension: usize,
    /// Where fastembed keeps downloaded model files
    pub cache_dir: PathBuf,
    /// Maximum batch size for embedding generation
    pub batch_size: usize,
    /// Whether to normalize embeddings
    pub normalize: bool,
    pub show_download_progress: bool,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            kind: ModelKind::Hashing,
            model_name: "all-minilm-l6-v2".to_string(),
            dimension: 256,
            cache_dir: PathBuf::from(".lodestone").join("models"),
            batch_size: 32,
            normalize: true,
            show_download_progress: true,
        }
    }
}

impl EmbedConfig {
    /// Configuration for a named fastembed model
    pub fn fastembed(model_name: impl Into<String>) -> Self {
        Self {
            kind: ModelKind::Fastembed,
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    /// Configuration for the hashing model
    pub fn hashing(dimension: usize) -> Self {
        Self {
            kind: ModelKind::Hashing,
            dimension,
            ..Self::default()
        }
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Set the batch size for embedding generation (builder style)
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    /// Set whether to normalize embeddings (builder style)
    pub fn with_normalize(self, normalize: bool) -> Self {
        Self { normalize, ..self }
    }

    pub fn with_cache_dir<P: AsRef<Path>>(self, cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
            ..self
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EmbedError::invalid_config(
                "batch_size must be greater than zero",
            ));
        }
        match self.kind {
            ModelKind::Hashing if self.dimension == 0 => Err(EmbedError::invalid_config(
                "dimension must be greater than zero",
            )),
            ModelKind::Fastembed if self.model_name.trim().is_empty() => Err(
                EmbedError::invalid_config("model_name must not be blank"),
            ),
            _ => Ok(()),
        }
    }
}
