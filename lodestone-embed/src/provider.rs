//! FastEmbed-backed embedding model running local ONNX models

use crate::config::EmbedConfig;
use crate::embedding::Embedding;
use crate::error::{EmbedError, Result};
use crate::model::{EmbeddingModel, EmbeddingModelFactory};
use async_trait::async_trait;
use fastembed::{EmbeddingModel as FastEmbedModel, InitOptions, TextEmbedding};
use fnv::FnvHasher;
use half::f16;
use std::collections::HashMap;
use std::hash::Hasher;
use std::sync::{Arc, Mutex, OnceLock};

/// Type alias for cached model entries (model, dimension)
type ModelCacheEntry = (Arc<Mutex<TextEmbedding>>, usize);

/// Global cache for initialized embedding models to avoid reloading
static MODEL_CACHE: OnceLock<Mutex<HashMap<String, ModelCacheEntry>>> = OnceLock::new();

fn get_model_cache() -> &'static Mutex<HashMap<String, ModelCacheEntry>> {
    MODEL_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Map a configured model name onto a built-in fastembed model.
pub fn builtin_model(name: &str) -> Result<FastEmbedModel> {
    match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" => Ok(FastEmbedModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(FastEmbedModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(FastEmbedModel::BGEBaseENV15),
        "nomic-embed-text-v1.5" => Ok(FastEmbedModel::NomicEmbedTextV15),
        other => Err(EmbedError::invalid_config(format!(
            "Unknown fastembed model: {other}"
        ))),
    }
}

/// FastEmbed-based embedding model
#[derive(Clone)]
pub struct FastEmbedProvider {
    config: EmbedConfig,
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("config", &self.config)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedProvider {
    /// Loads the configured model, reusing a cached instance when one exists.
    pub async fn create(config: EmbedConfig) -> Result<Self> {
        config.validate()?;
        let model_kind = builtin_model(config.model_name())?;
        let cache_key = create_cache_key(&config);

        let cached = {
            let cache = get_model_cache().lock().unwrap_or_else(|e| e.into_inner());
            cache
                .get(&cache_key)
                .map(|(model, dim)| (Arc::clone(model), *dim))
        };

        if let Some((model, dimension)) = cached {
            tracing::info!("Using cached model for: {}", config.model_name());
            return Ok(Self {
                config,
                model,
                dimension,
            });
        }

        tracing::info!(
            "Initializing FastEmbed provider for model: {}",
            config.model_name()
        );

        let load_config = config.clone();
        let (model, dimension) =
            tokio::task::spawn_blocking(move || -> Result<(TextEmbedding, usize)> {
                let init_options = InitOptions::new(model_kind)
                    .with_cache_dir(load_config.cache_dir.clone())
                    .with_show_download_progress(load_config.show_download_progress);

                let mut model = TextEmbedding::try_new(init_options)
                    .map_err(|e| EmbedError::External { source: e })?;

                // Probe the dimension with a test embedding
                let probe = model
                    .embed(vec!["test".to_string()], None)
                    .map_err(|e| EmbedError::External { source: e })?;
                let dimension = probe.first().map(|emb| emb.len()).unwrap_or(0);
                if dimension == 0 {
                    return Err(EmbedError::invalid_config(
                        "Model validation failed: empty embedding",
                    ));
                }

                tracing::info!("Model loaded successfully. Dimension: {}", dimension);
                Ok((model, dimension))
            })
            .await??;

        let model = Arc::new(Mutex::new(model));
        get_model_cache()
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(cache_key, (Arc::clone(&model), dimension));

        Ok(Self {
            config,
            model,
            dimension,
        })
    }

    /// Clears the global model cache.
    pub fn clear_cache() {
        get_model_cache()
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        tracing::info!("Model cache cleared");
    }

    /// Returns the number of cached models.
    pub fn cache_size() -> usize {
        get_model_cache()
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn to_embeddings(&self, raw: Vec<Vec<f32>>) -> Vec<Embedding> {
        raw.into_iter()
            .map(|values| {
                let mut embedding = Embedding::new(values.into_iter().map(f16::from_f32).collect());
                if self.config.normalize {
                    embedding.normalize();
                }
                embedding
            })
            .collect()
    }
}

/// Cache key derived from the full configuration, versioned so a format change
/// never aliases old entries.
fn create_cache_key(config: &EmbedConfig) -> String {
    let mut hasher = FnvHasher::default();
    hasher.write(b"v1:");
    hasher.write(format!("{:?}", config.kind).as_bytes());
    hasher.write(config.model_name.to_lowercase().as_bytes());
    hasher.write(config.cache_dir.to_string_lossy().as_bytes());
    format!("v1:{:x}", hasher.finish())
}

#[async_trait]
impl EmbeddingModel for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let texts = vec![text.to_string()];
        self.embed_all(&texts)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::invalid_config("No embedding generated for text"))
    }

    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_size) {
            let chunk = chunk.to_vec();
            let model = Arc::clone(&self.model);

            let batch = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
                let mut guard = model.lock().unwrap_or_else(|e| e.into_inner());
                guard
                    .embed(chunk, None)
                    .map_err(|e| EmbedError::External { source: e })
            })
            .await??;

            all_embeddings.extend(self.to_embeddings(batch));
        }

        tracing::debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        self.config.model_name()
    }
}

/// Factory that loads a [`FastEmbedProvider`] for a fixed configuration.
///
/// Factories are synchronous, so creation blocks on the current tokio runtime.
#[derive(Debug, Clone)]
pub struct FastEmbedFactory {
    config: EmbedConfig,
}

impl FastEmbedFactory {
    pub fn new(config: EmbedConfig) -> Self {
        Self { config }
    }
}

impl EmbeddingModelFactory for FastEmbedFactory {
    fn name(&self) -> &str {
        "fastembed"
    }

    fn create(&self) -> Result<Arc<dyn EmbeddingModel>> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            EmbedError::invalid_config(format!("fastembed factory needs a tokio runtime: {e}"))
        })?;
        if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::CurrentThread {
            return Err(EmbedError::invalid_config(
                "fastembed factory needs a multi-threaded tokio runtime",
            ));
        }
        let config = self.config.clone();
        let provider = tokio::task::block_in_place(|| {
            handle.block_on(FastEmbedProvider::create(config))
        })?;
        Ok(Arc::new(provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelKind;

    #[test]
    fn test_builtin_model_names() {
        assert!(matches!(
            builtin_model("all-MiniLM-L6-v2"),
            Ok(FastEmbedModel::AllMiniLML6V2)
        ));
        assert!(matches!(
            builtin_model("bge-small-en-v1.5"),
            Ok(FastEmbedModel::BGESmallENV15)
        ));
        assert!(matches!(
            builtin_model("gpt-embedding"),
            Err(EmbedError::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_model_fails_before_loading() {
        let config = EmbedConfig::fastembed("not-a-model");
        let err = FastEmbedProvider::create(config).await.unwrap_err();
        assert!(err.to_string().contains("Unknown fastembed model"));
        assert_eq!(FastEmbedProvider::cache_size(), 0);
    }

    #[test]
    fn test_cache_key_generation() {
        let config = EmbedConfig::fastembed("all-minilm-l6-v2");
        let key1 = create_cache_key(&config);
        let key2 = create_cache_key(&config.clone().with_batch_size(8));
        assert_eq!(key1, key2, "batch size does not affect the loaded model");
        assert!(key1.starts_with("v1:"));

        let other = create_cache_key(&EmbedConfig::fastembed("bge-base-en-v1.5"));
        assert_ne!(key1, other);

        let keys: Vec<String> = (0..5).map(|_| create_cache_key(&config)).collect();
        assert!(keys.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(config.kind, ModelKind::Fastembed);
    }

    #[test]
    fn test_factory_requires_runtime() {
        let factory = FastEmbedFactory::new(EmbedConfig::fastembed("all-minilm-l6-v2"));
        assert_eq!(factory.name(), "fastembed");

        let err = factory.create().err().expect("no runtime is running");
        assert!(err.to_string().contains("needs a tokio runtime"));
    }

    #[tokio::test]
    async fn test_factory_rejects_current_thread_runtime() {
        let factory = FastEmbedFactory::new(EmbedConfig::fastembed("all-minilm-l6-v2"));
        let err = factory.create().err().expect("current-thread runtime");
        assert!(err.to_string().contains("multi-threaded"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_factory_propagates_load_errors() {
        let registry = crate::model::ModelRegistry::new();
        registry.register(Arc::new(FastEmbedFactory::new(EmbedConfig::fastembed(
            "not-a-model",
        ))));

        let err = registry.resolve().err().expect("unknown model");
        assert!(matches!(err, EmbedError::InvalidConfig { .. }));
        assert!(err.to_string().contains("Unknown fastembed model"));
    }

    #[tokio::test]
    #[ignore] // Downloads all-MiniLM-L6-v2; run with: cargo test -p lodestone-embed -- --ignored
    async fn test_fastembed_embedding() -> Result<()> {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .try_init()
            .ok();

        let temp_dir = tempfile::tempdir()?;
        let config = EmbedConfig::fastembed("all-minilm-l6-v2").with_cache_dir(temp_dir.path());
        let provider = FastEmbedProvider::create(config).await?;
        assert_eq!(provider.dimension(), 384);

        let texts = vec![
            "Machine learning models process natural language.".to_string(),
            "Deep neural networks understand text.".to_string(),
        ];
        let embeddings = provider.embed_all(&texts).await?;
        assert_eq!(embeddings.len(), 2);
        assert!(embeddings[0].cosine_similarity(&embeddings[1]) > 0.3);

        FastEmbedProvider::clear_cache();
        assert_eq!(FastEmbedProvider::cache_size(), 0);
        Ok(())
    }
}
