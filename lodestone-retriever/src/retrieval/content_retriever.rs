//! Content retrieval backed by an embedding store.
//!
//! [`EmbeddingStoreContentRetriever`] embeds the query text with an
//! [`EmbeddingModel`], searches an [`EmbeddingStore`] and turns every match into
//! a [`Content`] carrying the relevance score and the embedding id.
//!
//! By default it returns the 3 most similar contents with no score floor and no
//! filter. Each of the three search settings can be fixed or computed per query:
//!
//! - **max results**: how many contents to return
//! - **min score**: contents scoring below this are dropped
//! - **filter**: metadata filter applied to stored segments
//!
//! Per-query settings receive the [`Query`], so they can depend on its text or on
//! [`QueryMetadata::chat_memory_id`](super::query::QueryMetadata) to vary by user.
//!
//! ```no_run
//! use lodestone_embed::HashingEmbeddingModel;
//! use lodestone_retriever::retrieval::{ContentRetriever, EmbeddingStoreContentRetriever, Query};
//! use lodestone_retriever::storage::InMemoryEmbeddingStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> lodestone_retriever::Result<()> {
//! let retriever = EmbeddingStoreContentRetriever::builder()
//!     .embedding_store(Arc::new(InMemoryEmbeddingStore::new()))
//!     .embedding_model(Arc::new(HashingEmbeddingModel::default()))
//!     .max_results(5)
//!     .min_score(0.6)
//!     .dynamic_filter(|_query: &Query| None)
//!     .build()?;
//!
//! let contents = retriever.retrieve(&Query::from("how do lifetimes work?")).await?;
//! # Ok(())
//! # }
//! ```

use super::content::Content;
use super::query::Query;
use crate::error::{Result, RetrieverError, ensure_between, ensure_greater_than_zero};
use crate::filter::Filter;
use crate::storage::{EmbeddingSearchRequest, EmbeddingStore};
use async_trait::async_trait;
use lodestone_embed::{EmbeddingModel, ModelRegistry};
use std::fmt;
use std::sync::Arc;

/// Retrieves [`Content`]s relevant to a [`Query`].
#[async_trait]
pub trait ContentRetriever: Send + Sync {
    async fn retrieve(&self, query: &Query) -> Result<Vec<Content>>;
}

pub type MaxResultsProvider = Arc<dyn Fn(&Query) -> usize + Send + Sync>;
pub type MinScoreProvider = Arc<dyn Fn(&Query) -> f64 + Send + Sync>;
pub type FilterProvider = Arc<dyn Fn(&Query) -> Option<Filter> + Send + Sync>;

pub const DEFAULT_MAX_RESULTS: usize = EmbeddingSearchRequest::DEFAULT_MAX_RESULTS;
pub const DEFAULT_MIN_SCORE: f64 = EmbeddingSearchRequest::DEFAULT_MIN_SCORE;
pub const DEFAULT_DISPLAY_NAME: &str = "Default";

pub struct EmbeddingStoreContentRetriever {
    display_name: String,
    embedding_store: Arc<dyn EmbeddingStore>,
    embedding_model: Arc<dyn EmbeddingModel>,
    max_results_provider: MaxResultsProvider,
    min_score_provider: MinScoreProvider,
    filter_provider: FilterProvider,
}

impl EmbeddingStoreContentRetriever {
    /// Retriever with default settings.
    pub fn new(
        embedding_store: Arc<dyn EmbeddingStore>,
        embedding_model: Arc<dyn EmbeddingModel>,
    ) -> Self {
        Self {
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            embedding_store,
            embedding_model,
            max_results_provider: Arc::new(|_: &Query| DEFAULT_MAX_RESULTS),
            min_score_provider: Arc::new(|_: &Query| DEFAULT_MIN_SCORE),
            filter_provider: Arc::new(|_: &Query| None),
        }
    }

    /// Retriever returning at most `max_results` contents.
    pub fn with_max_results(
        embedding_store: Arc<dyn EmbeddingStore>,
        embedding_model: Arc<dyn EmbeddingModel>,
        max_results: usize,
    ) -> Result<Self> {
        Self::builder()
            .embedding_store(embedding_store)
            .embedding_model(embedding_model)
            .max_results(max_results)
            .build()
    }

    /// Retriever with a fixed result limit and score floor.
    pub fn with_max_results_and_min_score(
        embedding_store: Arc<dyn EmbeddingStore>,
        embedding_model: Arc<dyn EmbeddingModel>,
        max_results: usize,
        min_score: f64,
    ) -> Result<Self> {
        Self::builder()
            .embedding_store(embedding_store)
            .embedding_model(embedding_model)
            .max_results(max_results)
            .min_score(min_score)
            .build()
    }

    /// Retriever over `embedding_store` using the model resolved from the
    /// global [`ModelRegistry`].
    pub fn from_store(embedding_store: Arc<dyn EmbeddingStore>) -> Result<Self> {
        Self::builder().embedding_store(embedding_store).build()
    }

    pub fn builder() -> EmbeddingStoreContentRetrieverBuilder {
        EmbeddingStoreContentRetrieverBuilder::default()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Build the search request for `query` from the configured settings.
    fn search_request(
        &self,
        query: &Query,
        query_embedding: lodestone_embed::Embedding,
    ) -> Result<EmbeddingSearchRequest> {
        EmbeddingSearchRequest::new(
            query_embedding,
            (self.max_results_provider)(query),
            (self.min_score_provider)(query),
            (self.filter_provider)(query),
        )
    }
}

#[async_trait]
impl ContentRetriever for EmbeddingStoreContentRetriever {
    async fn retrieve(&self, query: &Query) -> Result<Vec<Content>> {
        let embedded_query = self.embedding_model.embed(&query.text).await?;
        let request = self.search_request(query, embedded_query)?;

        tracing::debug!(
            "[{}] searching: max_results={}, min_score={}, filter={}",
            self.display_name,
            request.max_results,
            request.min_score,
            request.filter.is_some()
        );

        let result = self.embedding_store.search(&request).await?;

        let contents: Vec<Content> = result
            .matches
            .into_iter()
            .filter_map(|m| match m.embedded {
                Some(segment) => Some(Content::with_match_metadata(
                    segment,
                    m.score,
                    m.embedding_id,
                )),
                None => {
                    tracing::debug!(
                        "[{}] skipping match {} stored without a text segment",
                        self.display_name,
                        m.embedding_id
                    );
                    None
                }
            })
            .collect();

        tracing::debug!("[{}] retrieved {} contents", self.display_name, contents.len());
        Ok(contents)
    }
}

impl fmt::Debug for EmbeddingStoreContentRetriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingStoreContentRetriever")
            .field("display_name", &self.display_name)
            .field("embedding_model", &self.embedding_model.model_name())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for EmbeddingStoreContentRetriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EmbeddingStoreContentRetriever{{displayName='{}'}}",
            self.display_name
        )
    }
}

/// A search setting that is either fixed up front or computed per query.
enum Setting<T, F> {
    Fixed(T),
    Dynamic(F),
}

/// Builder for [`EmbeddingStoreContentRetriever`].
///
/// Fixed values are validated in [`build`](Self::build); values produced by
/// dynamic settings are validated on each retrieval.
#[derive(Default)]
pub struct EmbeddingStoreContentRetrieverBuilder {
    display_name: Option<String>,
    embedding_store: Option<Arc<dyn EmbeddingStore>>,
    embedding_model: Option<Arc<dyn EmbeddingModel>>,
    model_registry: Option<Arc<ModelRegistry>>,
    max_results: Option<Setting<usize, MaxResultsProvider>>,
    min_score: Option<Setting<f64, MinScoreProvider>>,
    filter: Option<Setting<Filter, FilterProvider>>,
}

impl EmbeddingStoreContentRetrieverBuilder {
    /// Name used in log lines, handy when several retrievers are active.
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn embedding_store(mut self, embedding_store: Arc<dyn EmbeddingStore>) -> Self {
        self.embedding_store = Some(embedding_store);
        self
    }

    pub fn embedding_model(mut self, embedding_model: Arc<dyn EmbeddingModel>) -> Self {
        self.embedding_model = Some(embedding_model);
        self
    }

    /// Registry to resolve a model from when none is set. Defaults to
    /// [`ModelRegistry::global`].
    pub fn model_registry(mut self, registry: Arc<ModelRegistry>) -> Self {
        self.model_registry = Some(registry);
        self
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(Setting::Fixed(max_results));
        self
    }

    pub fn min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(Setting::Fixed(min_score));
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(Setting::Fixed(filter));
        self
    }

    pub fn dynamic_max_results<F>(mut self, provider: F) -> Self
    where
        F: Fn(&Query) -> usize + Send + Sync + 'static,
    {
        self.max_results = Some(Setting::Dynamic(Arc::new(provider)));
        self
    }

    pub fn dynamic_min_score<F>(mut self, provider: F) -> Self
    where
        F: Fn(&Query) -> f64 + Send + Sync + 'static,
    {
        self.min_score = Some(Setting::Dynamic(Arc::new(provider)));
        self
    }

    pub fn dynamic_filter<F>(mut self, provider: F) -> Self
    where
        F: Fn(&Query) -> Option<Filter> + Send + Sync + 'static,
    {
        self.filter = Some(Setting::Dynamic(Arc::new(provider)));
        self
    }

    pub fn build(self) -> Result<EmbeddingStoreContentRetriever> {
        let embedding_store = self
            .embedding_store
            .ok_or(RetrieverError::MissingEmbeddingStore)?;

        let max_results_provider: MaxResultsProvider = match self.max_results {
            None => Arc::new(|_: &Query| DEFAULT_MAX_RESULTS),
            Some(Setting::Fixed(n)) => {
                let n = ensure_greater_than_zero(n, "maxResults")?;
                Arc::new(move |_: &Query| n)
            }
            Some(Setting::Dynamic(provider)) => provider,
        };

        let min_score_provider: MinScoreProvider = match self.min_score {
            None => Arc::new(|_: &Query| DEFAULT_MIN_SCORE),
            Some(Setting::Fixed(score)) => {
                let score = ensure_between(score, 0.0, 1.0, "minScore")?;
                Arc::new(move |_: &Query| score)
            }
            Some(Setting::Dynamic(provider)) => provider,
        };

        let filter_provider: FilterProvider = match self.filter {
            None => Arc::new(|_: &Query| None),
            Some(Setting::Fixed(filter)) => Arc::new(move |_: &Query| Some(filter.clone())),
            Some(Setting::Dynamic(provider)) => provider,
        };

        let embedding_model = match self.embedding_model {
            Some(model) => model,
            None => {
                let resolved = match &self.model_registry {
                    Some(registry) => registry.resolve()?,
                    None => ModelRegistry::global().resolve()?,
                };
                resolved.ok_or(RetrieverError::MissingEmbeddingModel)?
            }
        };

        Ok(EmbeddingStoreContentRetriever {
            display_name: self
                .display_name
                .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
            embedding_store,
            embedding_model,
            max_results_provider,
            min_score_provider,
            filter_provider,
        })
    }
}
