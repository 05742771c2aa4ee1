//! lodestone-retriever: embedding-store backed content retrieval
//!
//! This crate finds the stored text segments most relevant to a query. Text is
//! embedded with a [`lodestone_embed::EmbeddingModel`], kept in an
//! [`EmbeddingStore`](storage::EmbeddingStore), and searched by cosine
//! similarity with optional metadata filtering.
//!
//! ## Key Modules
//!
//! - **[`retrieval`]**: Queries, retrieved contents and the [`EmbeddingStoreContentRetriever`]
//! - **[`storage`]**: The `EmbeddingStore` trait with in-memory and SQLite backends
//! - **[`document`]**: Document sources, parsers, directory loading and splitting
//! - **[`filter`]**: Metadata filters, built fluently or parsed from `key=value` text
//! - **[`ingest`]**: Split, embed and store documents in one call
//! - **[`config`]**: `lodestone.toml` configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lodestone_embed::HashingEmbeddingModel;
//! use lodestone_retriever::{
//!     EmbeddingStoreContentRetriever, EmbeddingStoreIngestor,
//!     document::{DocumentSplitter, TextDocumentParser, load_documents},
//!     retrieval::{ContentRetriever, Query},
//!     storage::InMemoryEmbeddingStore,
//! };
//! use std::{path::Path, sync::Arc};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = Arc::new(InMemoryEmbeddingStore::new());
//! let model = Arc::new(HashingEmbeddingModel::default());
//!
//! let documents = load_documents(Path::new("docs"), &TextDocumentParser).await?;
//! EmbeddingStoreIngestor::new(DocumentSplitter::default(), model.clone(), store.clone())
//!     .ingest(&documents)
//!     .await?;
//!
//! let retriever = EmbeddingStoreContentRetriever::new(store, model);
//! for content in retriever.retrieve(&Query::from("how do I configure it?")).await? {
//!     println!("{:.3} {}", content.score().unwrap_or_default(), content.text());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! FileSystemSource → Parser → Splitter → EmbeddingModel → EmbeddingStore
//!                                                              ↓
//!                    Query → EmbeddingModel → search ← EmbeddingStoreContentRetriever → Content*
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod metadata;
pub mod retrieval;
pub mod segment;
pub mod storage;

pub use config::RetrieverConfig;
pub use error::{Result, RetrieverError};
pub use ingest::{EmbeddingStoreIngestor, IngestionResult};
pub use retrieval::{ContentRetriever, EmbeddingStoreContentRetriever};
