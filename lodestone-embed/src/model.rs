//! The embedding-model capability and factory-based model discovery.
//!
//! Retrieval code depends only on [`EmbeddingModel`]. Concrete models are either
//! handed over directly or discovered through a [`ModelRegistry`], which holds
//! [`EmbeddingModelFactory`] entries registered at startup.

use crate::embedding::Embedding;
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, OnceLock};

/// A model that turns text into embeddings
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed several texts; the output has one embedding per input, in order
    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Dimension of the produced vectors
    fn dimension(&self) -> usize;

    /// Name/identifier of the model
    fn model_name(&self) -> &str;
}

/// Creates embedding models on demand.
pub trait EmbeddingModelFactory: Send + Sync {
    /// Short name used in conflict diagnostics
    fn name(&self) -> &str;

    fn create(&self) -> Result<Arc<dyn EmbeddingModel>>;
}

/// Set of registered model factories.
///
/// A registry resolves to a model only when exactly one factory is present;
/// with several it refuses to guess.
#[derive(Default)]
pub struct ModelRegistry {
    factories: Mutex<Vec<Arc<dyn EmbeddingModelFactory>>>,
}

static GLOBAL_REGISTRY: OnceLock<ModelRegistry> = OnceLock::new();

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry consulted when no model is supplied explicitly.
    pub fn global() -> &'static ModelRegistry {
        GLOBAL_REGISTRY.get_or_init(ModelRegistry::new)
    }

    pub fn register(&self, factory: Arc<dyn EmbeddingModelFactory>) {
        let mut factories = self.factories.lock().unwrap_or_else(|e| e.into_inner());
        tracing::debug!("Registering embedding model factory: {}", factory.name());
        factories.push(factory);
    }

    pub fn len(&self) -> usize {
        self.factories.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve the single registered factory into a model.
    ///
    /// Returns `Ok(None)` when nothing is registered.
    pub fn resolve(&self) -> Result<Option<Arc<dyn EmbeddingModel>>> {
        let factories = self
            .factories
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        match factories.as_slice() {
            [] => Ok(None),
            [factory] => {
                tracing::info!("Creating embedding model from factory: {}", factory.name());
                factory.create().map(Some)
            }
            many => Err(EmbedError::ConflictingFactories {
                names: many.iter().map(|f| f.name().to_string()).collect(),
            }),
        }
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("factories", &self.len())
            .finish()
    }
}
