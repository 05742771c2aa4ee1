//! Storage abstraction layer for lodestone-retriever
//!
//! This module defines the [`EmbeddingStore`] trait that the content retriever
//! searches, together with the request/result types that cross it.
//!
//! ## Key Components
//!
//! - **EmbeddingStore**: add, search and remove embeddings with optional text segments
//! - **EmbeddingSearchRequest**: query vector, result limit, score floor, optional filter
//! - **InMemoryEmbeddingStore**: `RwLock`-guarded store for tests and small corpora
//! - **SqliteEmbeddingStore**: persistent store on SQLite through sqlx
//!
//! ## Architecture
//!
//! ```text
//!                      ┌─ InMemoryEmbeddingStore
//! EmbeddingStore trait ┤
//!                      └─ SqliteEmbeddingStore ── .lodestone.db
//! ```
//!
//! Both backends score candidates the same way (see [`rank_candidates`]):
//! cosine similarity mapped onto `[0, 1]`, filtered by metadata and score floor,
//! sorted descending and truncated.

use crate::error::{Result, RetrieverError, ensure_between, ensure_greater_than_zero};
use crate::filter::Filter;
use crate::segment::TextSegment;
use async_trait::async_trait;
use lodestone_embed::{Embedding, relevance_score};

pub mod memory_store;
pub mod sqlite_store;

pub use memory_store::InMemoryEmbeddingStore;
pub use sqlite_store::SqliteEmbeddingStore;

/// Identifier of a stored embedding.
pub type EmbeddingId = String;

/// One hit of a similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatch {
    /// Relevance score in `[0, 1]`
    pub score: f64,
    pub embedding_id: EmbeddingId,
    pub embedding: Embedding,
    /// The stored segment, if one was stored alongside the embedding
    pub embedded: Option<TextSegment>,
}

/// Parameters of a similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingSearchRequest {
    pub query_embedding: Embedding,
    pub max_results: usize,
    pub min_score: f64,
    pub filter: Option<Filter>,
}

impl EmbeddingSearchRequest {
    pub const DEFAULT_MAX_RESULTS: usize = 3;
    pub const DEFAULT_MIN_SCORE: f64 = 0.0;

    /// Build a validated request.
    ///
    /// `max_results` must be positive and `min_score` must lie in `[0, 1]`.
    pub fn new(
        query_embedding: Embedding,
        max_results: usize,
        min_score: f64,
        filter: Option<Filter>,
    ) -> Result<Self> {
        Ok(Self {
            query_embedding,
            max_results: ensure_greater_than_zero(max_results, "maxResults")?,
            min_score: ensure_between(min_score, 0.0, 1.0, "minScore")?,
            filter,
        })
    }

    /// Request with default limit and score floor and no filter.
    pub fn for_embedding(query_embedding: Embedding) -> Self {
        Self {
            query_embedding,
            max_results: Self::DEFAULT_MAX_RESULTS,
            min_score: Self::DEFAULT_MIN_SCORE,
            filter: None,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Result<Self> {
        self.max_results = ensure_greater_than_zero(max_results, "maxResults")?;
        Ok(self)
    }

    pub fn with_min_score(mut self, min_score: f64) -> Result<Self> {
        self.min_score = ensure_between(min_score, 0.0, 1.0, "minScore")?;
        Ok(self)
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Matches ordered by descending score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingSearchResult {
    pub matches: Vec<EmbeddingMatch>,
}

impl EmbeddingSearchResult {
    pub fn new(matches: Vec<EmbeddingMatch>) -> Self {
        Self { matches }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Vector similarity storage searched by the content retriever.
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Store an embedding under a generated id
    async fn add(&self, embedding: Embedding) -> Result<EmbeddingId>;

    /// Store an embedding under a caller-chosen id, replacing any previous entry
    async fn add_with_id(&self, id: &str, embedding: Embedding) -> Result<()>;

    /// Store an embedding together with the segment it was computed from
    async fn add_segment(&self, embedding: Embedding, segment: TextSegment) -> Result<EmbeddingId>;

    /// Store embeddings with their segments; both slices must have the same length
    async fn add_all(
        &self,
        embeddings: Vec<Embedding>,
        segments: Vec<TextSegment>,
    ) -> Result<Vec<EmbeddingId>>;

    /// Find the stored embeddings most similar to the request's query vector
    async fn search(&self, request: &EmbeddingSearchRequest) -> Result<EmbeddingSearchResult>;

    async fn remove(&self, id: &str) -> Result<()>;

    async fn remove_all_ids(&self, ids: &[EmbeddingId]) -> Result<()>;

    /// Remove every entry whose segment metadata matches `filter`; returns how many
    async fn remove_all_matching(&self, filter: &Filter) -> Result<usize>;

    async fn remove_all(&self) -> Result<()>;

    /// Number of stored embeddings
    async fn count(&self) -> Result<usize>;
}

pub(crate) fn ensure_same_length(embeddings: usize, segments: usize) -> Result<()> {
    if embeddings != segments {
        return Err(RetrieverError::invalid_argument(format!(
            "embeddings and segments count mismatch: {embeddings} != {segments}"
        )));
    }
    Ok(())
}

/// Whether an entry passes the request filter. Entries without a segment have
/// no metadata and therefore fail any filter.
pub(crate) fn passes_filter(filter: Option<&Filter>, segment: Option<&TextSegment>) -> bool {
    match filter {
        None => true,
        Some(filter) => segment.is_some_and(|s| filter.test(&s.metadata)),
    }
}

/// Score, filter, sort and truncate candidate entries for `request`.
///
/// Entries whose dimension differs from the query's were embedded by another
/// model and are never matches.
pub(crate) fn rank_candidates<I>(
    request: &EmbeddingSearchRequest,
    candidates: I,
) -> Vec<EmbeddingMatch>
where
    I: IntoIterator<Item = (EmbeddingId, Embedding, Option<TextSegment>)>,
{
    let dimension = request.query_embedding.dimension();
    let mut matches: Vec<EmbeddingMatch> = candidates
        .into_iter()
        .filter(|(embedding_id, embedding, _)| {
            if embedding.dimension() != dimension {
                tracing::debug!(
                    "Skipping embedding {} with dimension {} (query has {})",
                    embedding_id,
                    embedding.dimension(),
                    dimension
                );
                return false;
            }
            true
        })
        .filter(|(_, _, segment)| passes_filter(request.filter.as_ref(), segment.as_ref()))
        .filter_map(|(embedding_id, embedding, embedded)| {
            let score = relevance_score(request.query_embedding.cosine_similarity(&embedding));
            (score >= request.min_score).then_some(EmbeddingMatch {
                score,
                embedding_id,
                embedding,
                embedded,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    matches.truncate(request.max_results);
    matches
}
