//! Query-time retrieval: queries, retrieved contents and the retrievers that
//! produce them.

pub mod content;
pub mod content_retriever;
pub mod query;

pub use content::{Content, ContentMetadata};
pub use content_retriever::{
    ContentRetriever, EmbeddingStoreContentRetriever, EmbeddingStoreContentRetrieverBuilder,
    FilterProvider, MaxResultsProvider, MinScoreProvider,
};
pub use query::{Query, QueryMetadata};
