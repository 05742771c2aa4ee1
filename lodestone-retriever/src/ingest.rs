//! Split, embed and store documents in one pass.

use crate::document::{Document, DocumentSplitter};
use crate::error::Result;
use crate::segment::TextSegment;
use crate::storage::{EmbeddingId, EmbeddingStore};
use lodestone_embed::EmbeddingModel;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Outcome of one [`EmbeddingStoreIngestor::ingest`] call.
#[derive(Debug, Clone)]
pub struct IngestionResult {
    pub documents: usize,
    pub segments: usize,
    /// Ids of the stored embeddings, one per segment
    pub ids: Vec<EmbeddingId>,
    pub elapsed: Duration,
}

/// Feeds documents into an embedding store.
pub struct EmbeddingStoreIngestor {
    splitter: DocumentSplitter,
    embedding_model: Arc<dyn EmbeddingModel>,
    embedding_store: Arc<dyn EmbeddingStore>,
}

impl EmbeddingStoreIngestor {
    pub fn new(
        splitter: DocumentSplitter,
        embedding_model: Arc<dyn EmbeddingModel>,
        embedding_store: Arc<dyn EmbeddingStore>,
    ) -> Self {
        Self {
            splitter,
            embedding_model,
            embedding_store,
        }
    }

    pub async fn ingest(&self, documents: &[Document]) -> Result<IngestionResult> {
        let start = Instant::now();
        let segments: Vec<TextSegment> = self.splitter.split_all(documents);

        let ids = if segments.is_empty() {
            Vec::new()
        } else {
            let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
            let embeddings = self.embedding_model.embed_all(&texts).await?;
            self.embedding_store.add_all(embeddings, segments).await?
        };

        let result = IngestionResult {
            documents: documents.len(),
            segments: ids.len(),
            ids,
            elapsed: start.elapsed(),
        };
        info!(
            "Ingested {} documents as {} segments in {:?}",
            result.documents, result.segments, result.elapsed
        );
        Ok(result)
    }
}
