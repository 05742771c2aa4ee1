//! Deterministic, dependency-free embedding model.
//!
//! Tokens are hashed into a fixed number of buckets (the "hashing trick"), so
//! texts that share words end up close in cosine space. It needs no model files,
//! which makes it the default for tests and for quick local indexing.

use crate::embedding::Embedding;
use crate::error::{EmbedError, Result};
use crate::model::{EmbeddingModel, EmbeddingModelFactory};
use async_trait::async_trait;
use fnv::FnvHasher;
use half::f16;
use std::hash::Hasher;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct HashingEmbeddingModel {
    dimension: usize,
}

impl HashingEmbeddingModel {
    pub const NAME: &'static str = "hashing";
    pub const DEFAULT_DIMENSION: usize = 256;

    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(EmbedError::invalid_config(
                "hashing model dimension must be greater than zero",
            ));
        }
        Ok(Self { dimension })
    }

    fn embed_sync(&self, text: &str) -> Embedding {
        let mut buckets = vec![0f32; self.dimension];

        for token in tokenize(text) {
            let mut hasher = FnvHasher::default();
            hasher.write(token.as_bytes());
            let hash = hasher.finish();

            let bucket = (hash % self.dimension as u64) as usize;
            // The top bit picks the sign so collisions tend to cancel out
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            buckets[bucket] += sign;
        }

        let mut embedding = Embedding::new(buckets.into_iter().map(f16::from_f32).collect());
        embedding.normalize();
        embedding
    }
}

impl Default for HashingEmbeddingModel {
    fn default() -> Self {
        Self {
            dimension: Self::DEFAULT_DIMENSION,
        }
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl EmbeddingModel for HashingEmbeddingModel {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.embed_sync(text))
    }

    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        tracing::debug!("Hashing {} texts into {} buckets", texts.len(), self.dimension);
        Ok(texts.iter().map(|text| self.embed_sync(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        Self::NAME
    }
}

/// Factory producing [`HashingEmbeddingModel`] instances of a fixed dimension.
#[derive(Debug, Clone)]
pub struct HashingFactory {
    dimension: usize,
}

impl HashingFactory {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl EmbeddingModelFactory for HashingFactory {
    fn name(&self) -> &str {
        HashingEmbeddingModel::NAME
    }

    fn create(&self) -> Result<Arc<dyn EmbeddingModel>> {
        Ok(Arc::new(HashingEmbeddingModel::new(self.dimension)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(
            HashingEmbeddingModel::new(0),
            Err(EmbedError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_embeddings_are_deterministic_and_normalized() {
        let model = HashingEmbeddingModel::new(64).unwrap();
        let a = tokio_test::block_on(model.embed("The quick brown fox")).unwrap();
        let b = tokio_test::block_on(model.embed("the QUICK brown fox!")).unwrap();

        assert_eq!(a, b, "tokenization should ignore case and punctuation");
        assert_eq!(a.dimension(), 64);

        let norm: f32 = a.to_f32_vec().iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_empty_text_yields_zero_vector() {
        let model = HashingEmbeddingModel::new(8).unwrap();
        let embedding = tokio_test::block_on(model.embed("  ...  ")).unwrap();
        assert!(embedding.to_f32_vec().iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_shared_words_score_higher() {
        let model = HashingEmbeddingModel::default();
        let texts = vec![
            "rust ownership and borrowing rules".to_string(),
            "borrowing rules in rust".to_string(),
            "baking sourdough bread at home".to_string(),
        ];
        let embeddings = model.embed_all(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 3);

        let related = embeddings[0].cosine_similarity(&embeddings[1]);
        let unrelated = embeddings[0].cosine_similarity(&embeddings[2]);
        assert!(
            related > unrelated,
            "related={related} unrelated={unrelated}"
        );
    }

    #[test]
    fn test_factory_creates_model() {
        let factory = HashingFactory::new(12);
        let model = factory.create().unwrap();
        assert_eq!(model.dimension(), 12);
        assert_eq!(factory.name(), "hashing");
    }
}
