//! SQLite implementation of [`EmbeddingStore`].
//!
//! ## Database Schema
//!
//! ```sql
//! CREATE TABLE embeddings (
//!     id TEXT PRIMARY KEY,           -- uuid v4 or caller-chosen id
//!     embedding BLOB NOT NULL,       -- f16 vector
//!     text TEXT,                     -- segment text (optional)
//!     metadata_json TEXT,            -- segment metadata as JSON (optional)
//!     created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
//! );
//! ```
//!
//! Similarity is computed in Rust over the loaded rows; SQLite only persists.
//!
//! ## SQLite Optimizations
//!
//! - **WAL mode**: Better concurrency for read/write operations
//! - **Large page size** (64KB): Suited to embedding blob storage
//! - **Auto-vacuum**: Keeps database size manageable

use super::{
    EmbeddingId, EmbeddingSearchRequest, EmbeddingSearchResult, EmbeddingStore,
    ensure_same_length, passes_filter, rank_candidates,
};
use crate::error::{Result, RetrieverError};
use crate::filter::Filter;
use crate::metadata::Metadata;
use crate::segment::TextSegment;
use async_trait::async_trait;
use half::f16;
use lodestone_embed::Embedding;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;

/// Default database file name inside a base directory.
pub const DATABASE_FILE_NAME: &str = ".lodestone.db";

#[derive(Clone, Debug)]
pub struct SqliteEmbeddingStore {
    pool: SqlitePool,
}

impl SqliteEmbeddingStore {
    /// Opens (creating if needed) a persistent store at `db_path`.
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .create_if_missing(true)
                .auto_vacuum(sqlx::sqlite::SqliteAutoVacuum::Full)
                .page_size(1 << 16),
        )
        .await?;
        tracing::debug!("Opened embedding store at {}", db_path.display());
        Self::new_with_pool(pool).await
    }

    /// Opens an in-memory store for testing.
    pub async fn open_memory() -> Result<Self> {
        // A single connection, otherwise every pooled connection gets its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::new_with_pool(pool).await
    }

    async fn new_with_pool(pool: SqlitePool) -> Result<Self> {
        Self::create_tables(&pool).await?;
        Ok(Self { pool })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS embeddings (
                id TEXT PRIMARY KEY,
                embedding BLOB NOT NULL,
                text TEXT,
                metadata_json TEXT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_embeddings_created ON embeddings(created_at)")
            .execute(pool)
            .await?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn insert(
        &self,
        id: &str,
        embedding: &Embedding,
        segment: Option<&TextSegment>,
    ) -> Result<()> {
        let (text, metadata_json) = encode_segment(segment)?;
        sqlx::query(
            r#"
            INSERT INTO embeddings (id, embedding, text, metadata_json)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                embedding = excluded.embedding,
                text = excluded.text,
                metadata_json = excluded.metadata_json
            "#,
        )
        .bind(id)
        .bind(bytemuck::cast_slice::<f16, u8>(&embedding.vector))
        .bind(text)
        .bind(metadata_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<(EmbeddingId, Embedding, Option<TextSegment>)>> {
        let rows = sqlx::query("SELECT id, embedding, text, metadata_json FROM embeddings")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_row).collect()
    }
}

fn generate_id() -> EmbeddingId {
    uuid::Uuid::new_v4().to_string()
}

fn encode_segment(segment: Option<&TextSegment>) -> Result<(Option<String>, Option<String>)> {
    match segment {
        None => Ok((None, None)),
        Some(segment) => {
            // JSON has no NaN or infinity; such values would not read back
            segment.metadata.validate()?;
            let metadata_json = serde_json::to_string(&segment.metadata)
                .map_err(|e| RetrieverError::Parse(format!("cannot encode metadata: {e}")))?;
            Ok((Some(segment.text.clone()), Some(metadata_json)))
        }
    }
}

fn decode_row(row: &SqliteRow) -> Result<(EmbeddingId, Embedding, Option<TextSegment>)> {
    let id: String = row.get("id");
    let embedding_bytes: Vec<u8> = row.get("embedding");
    let text: Option<String> = row.get("text");
    let metadata_json: Option<String> = row.get("metadata_json");

    // Blobs read back from SQLite are not guaranteed to be 2-byte aligned
    let vector: Vec<f16> = bytemuck::pod_collect_to_vec(&embedding_bytes);

    let segment = match text {
        None => None,
        Some(text) => {
            let metadata: Metadata = match metadata_json {
                Some(json) => serde_json::from_str(&json).map_err(|e| {
                    RetrieverError::Parse(format!("corrupt metadata for embedding {id}: {e}"))
                })?,
                None => Metadata::new(),
            };
            Some(TextSegment::new(text, metadata))
        }
    };

    Ok((id, Embedding::new(vector), segment))
}

#[async_trait]
impl EmbeddingStore for SqliteEmbeddingStore {
    async fn add(&self, embedding: Embedding) -> Result<EmbeddingId> {
        let id = generate_id();
        self.insert(&id, &embedding, None).await?;
        Ok(id)
    }

    async fn add_with_id(&self, id: &str, embedding: Embedding) -> Result<()> {
        self.insert(id, &embedding, None).await
    }

    async fn add_segment(&self, embedding: Embedding, segment: TextSegment) -> Result<EmbeddingId> {
        let id = generate_id();
        self.insert(&id, &embedding, Some(&segment)).await?;
        Ok(id)
    }

    async fn add_all(
        &self,
        embeddings: Vec<Embedding>,
        segments: Vec<TextSegment>,
    ) -> Result<Vec<EmbeddingId>> {
        ensure_same_length(embeddings.len(), segments.len())?;

        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(embeddings.len());

        for (embedding, segment) in embeddings.iter().zip(segments.iter()) {
            let id = generate_id();
            let (text, metadata_json) = encode_segment(Some(segment))?;
            sqlx::query(
                "INSERT INTO embeddings (id, embedding, text, metadata_json) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&id)
            .bind(bytemuck::cast_slice::<f16, u8>(&embedding.vector))
            .bind(text)
            .bind(metadata_json)
            .execute(&mut *tx)
            .await?;
            ids.push(id);
        }

        tx.commit().await?;
        tracing::debug!("Added {} embeddings to SQLite store", ids.len());
        Ok(ids)
    }

    async fn search(&self, request: &EmbeddingSearchRequest) -> Result<EmbeddingSearchResult> {
        let candidates = self.load_all().await?;
        tracing::debug!("Scoring {} stored embeddings", candidates.len());
        Ok(EmbeddingSearchResult::new(rank_candidates(
            request, candidates,
        )))
    }

    async fn remove(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM embeddings WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_all_ids(&self, ids: &[EmbeddingId]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for id in ids {
            sqlx::query("DELETE FROM embeddings WHERE id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn remove_all_matching(&self, filter: &Filter) -> Result<usize> {
        // Filters are evaluated in Rust, so select the ids first
        let doomed: Vec<EmbeddingId> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|(_, _, segment)| passes_filter(Some(filter), segment.as_ref()))
            .map(|(id, _, _)| id)
            .collect();

        self.remove_all_ids(&doomed).await?;
        Ok(doomed.len())
    }

    async fn remove_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM embeddings")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM embeddings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::metadata_key;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_embedding_operations() -> Result<()> {
        let store = SqliteEmbeddingStore::open_memory().await?;

        let segments = vec![
            TextSegment::new(
                "fn main() {}",
                Metadata::new().with("file_name", "main.rs").with("index", 0i64),
            ),
            TextSegment::new(
                "fn test() {}",
                Metadata::new().with("file_name", "lib.rs").with("index", 1i64),
            ),
        ];
        let embeddings = vec![
            Embedding::from_f32(&[0.1, 0.2, 0.3]),
            Embedding::from_f32(&[0.9, 0.1, 0.0]),
        ];
        let ids = store.add_all(embeddings.clone(), segments.clone()).await?;
        assert_eq!(ids.len(), 2);
        assert_eq!(store.count().await?, 2);

        let query = Embedding::from_f32(&[0.15, 0.25, 0.35]);
        let request = EmbeddingSearchRequest::new(query.clone(), 10, 0.0, None)?;
        let result = store.search(&request).await?;
        assert_eq!(result.len(), 2);
        assert_eq!(result.matches[0].embedding_id, ids[0]);
        assert!(result.matches[0].score > result.matches[1].score);
        // Segment and metadata survive the round trip through SQLite
        assert_eq!(result.matches[0].embedded.as_ref(), Some(&segments[0]));
        assert_eq!(result.matches[0].embedding, embeddings[0]);

        // Score floor between the two scores keeps only the best
        let threshold = (result.matches[0].score + result.matches[1].score) / 2.0;
        let request = EmbeddingSearchRequest::new(query.clone(), 10, threshold, None)?;
        assert_eq!(store.search(&request).await?.len(), 1);

        let request = EmbeddingSearchRequest::new(query, 10, 0.0, None)?
            .with_filter(metadata_key("file_name").is_equal_to("lib.rs"));
        let filtered = store.search(&request).await?;
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.matches[0].embedding_id, ids[1]);

        Ok(())
    }

    #[tokio::test]
    async fn test_embedding_without_segment() -> Result<()> {
        let store = SqliteEmbeddingStore::open_memory().await?;
        let id = store.add(Embedding::from_f32(&[1.0, 0.0])).await?;
        store
            .add_with_id("custom", Embedding::from_f32(&[0.0, 1.0]))
            .await?;

        let request = EmbeddingSearchRequest::for_embedding(Embedding::from_f32(&[1.0, 0.0]));
        let result = store.search(&request).await?;
        assert_eq!(result.len(), 2);
        assert_eq!(result.matches[0].embedding_id, id);
        assert!(result.matches[0].embedded.is_none());
        assert_eq!(result.matches[1].embedding_id, "custom");
        Ok(())
    }

    #[tokio::test]
    async fn test_removal() -> Result<()> {
        let store = SqliteEmbeddingStore::open_memory().await?;
        let ids = store
            .add_all(
                vec![
                    Embedding::from_f32(&[1.0]),
                    Embedding::from_f32(&[1.0]),
                    Embedding::from_f32(&[1.0]),
                ],
                vec![
                    TextSegment::new("a", Metadata::new().with("lang", "rust")),
                    TextSegment::new("b", Metadata::new().with("lang", "go")),
                    TextSegment::new("c", Metadata::new().with("lang", "go")),
                ],
            )
            .await?;

        store.remove(&ids[0]).await?;
        assert_eq!(store.count().await?, 2);

        let removed = store
            .remove_all_matching(&metadata_key("lang").is_equal_to("go"))
            .await?;
        assert_eq!(removed, 2);
        assert_eq!(store.count().await?, 0);

        store.add(Embedding::from_f32(&[1.0])).await?;
        store.remove_all().await?;
        assert_eq!(store.count().await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_all_ids() -> Result<()> {
        let store = SqliteEmbeddingStore::open_memory().await?;
        let first = store.add(Embedding::from_f32(&[1.0, 0.0])).await?;
        let second = store
            .add_segment(Embedding::from_f32(&[0.0, 1.0]), TextSegment::from("second"))
            .await?;
        store.add_with_id("third", Embedding::from_f32(&[0.5, 0.5])).await?;

        store.remove_all_ids(&[first, "third".to_string(), "missing".to_string()]).await?;
        assert_eq!(store.count().await?, 1);

        let request = EmbeddingSearchRequest::for_embedding(Embedding::from_f32(&[1.0, 0.0]));
        let result = store.search(&request).await?;
        assert_eq!(result.len(), 1);
        assert_eq!(result.matches[0].embedding_id, second);

        store.remove_all_ids(&[]).await?;
        assert_eq!(store.count().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_search_skips_other_dimensions() -> Result<()> {
        let store = SqliteEmbeddingStore::open_memory().await?;
        store
            .add_segment(Embedding::from_f32(&[1.0, 0.0, 0.0]), TextSegment::from("old model"))
            .await?;
        let current = store
            .add_segment(Embedding::from_f32(&[0.0, 1.0]), TextSegment::from("new model"))
            .await?;

        let request = EmbeddingSearchRequest::for_embedding(Embedding::from_f32(&[1.0, 0.0]));
        let result = store.search(&request).await?;
        assert_eq!(result.len(), 1);
        assert_eq!(result.matches[0].embedding_id, current);
        Ok(())
    }

    #[tokio::test]
    async fn test_non_finite_metadata_not_persisted() -> Result<()> {
        let store = SqliteEmbeddingStore::open_memory().await?;
        store
            .add_segment(
                Embedding::from_f32(&[1.0, 0.0]),
                TextSegment::new("ok", Metadata::new().with("weight", 0.5)),
            )
            .await?;

        // TOML has a nan literal, so deserialized metadata can bypass `put`
        let bad: Metadata = toml::from_str("weight = nan").unwrap();
        assert!(bad.get_float("weight").unwrap().is_nan());
        let result = store
            .add_segment(Embedding::from_f32(&[1.0, 0.0]), TextSegment::new("bad", bad))
            .await;
        assert!(matches!(result, Err(RetrieverError::InvalidArgument(_))));

        let request = EmbeddingSearchRequest::for_embedding(Embedding::from_f32(&[1.0, 0.0]));
        let result = store.search(&request).await?;
        assert_eq!(result.len(), 1);
        assert_eq!(result.matches[0].embedded.as_ref().unwrap().text, "ok");
        assert_eq!(
            store
                .remove_all_matching(&metadata_key("weight").is_greater_than(0.1))
                .await?,
            1
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_persistent_store_reopens() -> Result<()> {
        let temp_dir = tempdir().map_err(|e| RetrieverError::io("tempdir", e))?;
        let db_path = temp_dir.path().join(DATABASE_FILE_NAME);

        {
            let store = SqliteEmbeddingStore::open(&db_path).await?;
            store
                .add_segment(Embedding::from_f32(&[0.5, 0.5]), TextSegment::from("kept"))
                .await?;
            store.pool().close().await;
        }

        let reopened = SqliteEmbeddingStore::open(&db_path).await?;
        assert_eq!(reopened.count().await?, 1);
        let request = EmbeddingSearchRequest::for_embedding(Embedding::from_f32(&[0.5, 0.5]));
        let result = reopened.search(&request).await?;
        assert_eq!(result.matches[0].embedded.as_ref().unwrap().text, "kept");
        Ok(())
    }
}
