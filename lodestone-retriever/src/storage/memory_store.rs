//! In-memory embedding store.
//!
//! Entries live in a `Vec` behind a tokio `RwLock`; search is a linear scan.
//! Useful for tests and for corpora small enough to embed at startup.

use super::{
    EmbeddingId, EmbeddingSearchRequest, EmbeddingSearchResult, EmbeddingStore,
    ensure_same_length, passes_filter, rank_candidates,
};
use crate::error::Result;
use crate::filter::Filter;
use crate::segment::TextSegment;
use async_trait::async_trait;
use lodestone_embed::Embedding;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
    id: EmbeddingId,
    embedding: Embedding,
    embedded: Option<TextSegment>,
}

#[derive(Debug, Default)]
pub struct InMemoryEmbeddingStore {
    entries: RwLock<Vec<Entry>>,
}

impl InMemoryEmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn upsert(&self, entry: Entry) {
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }
}

fn generate_id() -> EmbeddingId {
    uuid::Uuid::new_v4().to_string()
}

#[async_trait]
impl EmbeddingStore for InMemoryEmbeddingStore {
    async fn add(&self, embedding: Embedding) -> Result<EmbeddingId> {
        let id = generate_id();
        self.upsert(Entry {
            id: id.clone(),
            embedding,
            embedded: None,
        })
        .await;
        Ok(id)
    }

    async fn add_with_id(&self, id: &str, embedding: Embedding) -> Result<()> {
        self.upsert(Entry {
            id: id.to_string(),
            embedding,
            embedded: None,
        })
        .await;
        Ok(())
    }

    async fn add_segment(&self, embedding: Embedding, segment: TextSegment) -> Result<EmbeddingId> {
        let id = generate_id();
        self.upsert(Entry {
            id: id.clone(),
            embedding,
            embedded: Some(segment),
        })
        .await;
        Ok(id)
    }

    async fn add_all(
        &self,
        embeddings: Vec<Embedding>,
        segments: Vec<TextSegment>,
    ) -> Result<Vec<EmbeddingId>> {
        ensure_same_length(embeddings.len(), segments.len())?;

        let mut entries = self.entries.write().await;
        let mut ids = Vec::with_capacity(embeddings.len());
        for (embedding, segment) in embeddings.into_iter().zip(segments) {
            let id = generate_id();
            entries.push(Entry {
                id: id.clone(),
                embedding,
                embedded: Some(segment),
            });
            ids.push(id);
        }

        tracing::debug!("Added {} embeddings to in-memory store", ids.len());
        Ok(ids)
    }

    async fn search(&self, request: &EmbeddingSearchRequest) -> Result<EmbeddingSearchResult> {
        let entries = self.entries.read().await;
        let matches = rank_candidates(
            request,
            entries
                .iter()
                .map(|e| (e.id.clone(), e.embedding.clone(), e.embedded.clone())),
        );
        Ok(EmbeddingSearchResult::new(matches))
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.entries.write().await.retain(|e| e.id != id);
        Ok(())
    }

    async fn remove_all_ids(&self, ids: &[EmbeddingId]) -> Result<()> {
        self.entries.write().await.retain(|e| !ids.contains(&e.id));
        Ok(())
    }

    async fn remove_all_matching(&self, filter: &Filter) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| !passes_filter(Some(filter), e.embedded.as_ref()));
        Ok(before - entries.len())
    }

    async fn remove_all(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}
