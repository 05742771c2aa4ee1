//! # lodestone-embed
//!
//! Embedding models for lodestone. Retrieval code talks to the
//! [`EmbeddingModel`] trait only; this crate supplies the implementations and
//! the machinery to pick one.
//!
//! ## Features
//!
//! - **Local ONNX Models**: Run embedding models locally through FastEmbed
//! - **Hashing Model**: Deterministic, file-free model for tests and quick indexing
//! - **Model Discovery**: A [`ModelRegistry`] of factories used when no model is given
//! - **Half-Precision**: f16 vectors throughout
//!
//! ## Quick Start
//!
//! ```no_run
//! use lodestone_embed::{EmbedConfig, EmbeddingModel, create_model};
//!
//! # async fn example() -> lodestone_embed::Result<()> {
//! let model = create_model(&EmbedConfig::hashing(128)).await?;
//! let embedding = model.embed("Hello world").await?;
//! assert_eq!(embedding.dimension(), 128);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`config`]: Model configuration, loadable from TOML
//! - [`embedding`]: The [`Embedding`] type and cosine/relevance math
//! - [`model`]: The [`EmbeddingModel`] trait, factories and the registry
//! - [`provider`]: FastEmbed-backed model with a process-wide model cache
//! - [`hashing`]: Feature-hashing model
//! - [`error`]: Error types and result handling

pub mod config;
pub mod embedding;
pub mod error;
pub mod hashing;
pub mod model;
pub mod provider;

use std::sync::Arc;

// Re-export main types for easy access
pub use config::{EmbedConfig, ModelKind};
pub use embedding::{Embedding, cosine_similarity, relevance_score};
pub use error::{EmbedError, Result};
pub use hashing::{HashingEmbeddingModel, HashingFactory};
pub use model::{EmbeddingModel, EmbeddingModelFactory, ModelRegistry};
pub use provider::{FastEmbedFactory, FastEmbedProvider};

/// Build the model described by `config`.
pub async fn create_model(config: &EmbedConfig) -> Result<Arc<dyn EmbeddingModel>> {
    config.validate()?;
    match config.kind {
        ModelKind::Hashing => Ok(Arc::new(HashingEmbeddingModel::new(config.dimension)?)),
        ModelKind::Fastembed => Ok(Arc::new(FastEmbedProvider::create(config.clone()).await?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_hashing_model() {
        let model = create_model(&EmbedConfig::hashing(48)).await.unwrap();
        assert_eq!(model.dimension(), 48);
        assert_eq!(model.model_name(), "hashing");
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_config() {
        let result = create_model(&EmbedConfig::hashing(0)).await;
        assert!(matches!(result, Err(EmbedError::InvalidConfig { .. })));
    }
}
