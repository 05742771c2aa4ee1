//! Documents and where they come from.
//!
//! A [`DocumentSource`] yields raw bytes plus source metadata, a
//! [`DocumentParser`] turns the bytes into a [`Document`], and a
//! [`DocumentSplitter`] cuts documents into [`TextSegment`]s ready to embed.
//!
//! ```text
//! FileSystemSource ──bytes──▶ TextDocumentParser ──▶ Document ──▶ DocumentSplitter ──▶ TextSegment*
//! ```

use crate::error::Result;
use crate::metadata::Metadata;
use crate::segment::TextSegment;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

pub mod file_system_source;
pub mod loader;
pub mod parser;
pub mod splitter;

pub use file_system_source::FileSystemSource;
pub use loader::{load_document, load_documents};
pub use parser::{DocumentParser, TextDocumentParser};
pub use splitter::DocumentSplitter;

/// A loaded document: its full text and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Metadata key holding the name of the file a document was loaded from
    pub const FILE_NAME: &'static str = "file_name";
    /// Metadata key holding the absolute path of the directory containing that file
    pub const ABSOLUTE_DIRECTORY_PATH: &'static str = "absolute_directory_path";

    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(text, Metadata::new())
    }

    /// The whole document as a single segment
    pub fn to_text_segment(&self) -> TextSegment {
        TextSegment::new(self.text.clone(), self.metadata.clone())
    }
}

/// Somewhere a document's bytes can be read from.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Open a fresh stream over the document's bytes
    async fn input_stream(&self) -> Result<Box<dyn AsyncRead + Send + Unpin>>;

    /// Metadata describing the source, merged into the parsed document
    fn metadata(&self) -> Metadata;
}
