//! Retriever configuration, read from `lodestone.toml`.
//!
//! ```toml
//! display_name = "docs"
//! max_results = 5
//! min_score = 0.6
//! database = ".lodestone.db"
//!
//! [model]
//! kind = "hashing"
//! dimension = 256
//!
//! [splitter]
//! max_lines = 40
//! overlap_lines = 5
//! ```

use crate::document::DocumentSplitter;
use crate::error::{Result, RetrieverError, ensure_between, ensure_greater_than_zero};
use crate::retrieval::content_retriever::{
    DEFAULT_DISPLAY_NAME, DEFAULT_MAX_RESULTS, DEFAULT_MIN_SCORE,
    EmbeddingStoreContentRetrieverBuilder,
};
use crate::retrieval::EmbeddingStoreContentRetriever;
use crate::storage::sqlite_store::DATABASE_FILE_NAME;
use lodestone_embed::EmbedConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "lodestone.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    pub max_lines: usize,
    pub overlap_lines: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            max_lines: DocumentSplitter::DEFAULT_MAX_LINES,
            overlap_lines: DocumentSplitter::DEFAULT_OVERLAP_LINES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    pub display_name: String,
    pub max_results: usize,
    pub min_score: f64,
    /// SQLite database holding the embeddings
    pub database: PathBuf,
    pub model: EmbedConfig,
    pub splitter: SplitterConfig,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            min_score: DEFAULT_MIN_SCORE,
            database: PathBuf::from(DATABASE_FILE_NAME),
            model: EmbedConfig::default(),
            splitter: SplitterConfig::default(),
        }
    }
}

impl RetrieverConfig {
    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| RetrieverError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| RetrieverError::Parse(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| RetrieverError::Parse(format!("cannot serialize config: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        ensure_greater_than_zero(self.max_results, "maxResults")?;
        ensure_between(self.min_score, 0.0, 1.0, "minScore")?;
        self.model.validate()?;
        self.splitter()?;
        Ok(())
    }

    pub fn splitter(&self) -> Result<DocumentSplitter> {
        DocumentSplitter::new(self.splitter.max_lines, self.splitter.overlap_lines)
    }

    /// Retriever builder preloaded with this configuration's search settings.
    pub fn retriever_builder(&self) -> EmbeddingStoreContentRetrieverBuilder {
        EmbeddingStoreContentRetriever::builder()
            .display_name(self.display_name.clone())
            .max_results(self.max_results)
            .min_score(self.min_score)
    }
}
