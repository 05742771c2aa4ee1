use super::Document;
use crate::error::{Result, RetrieverError};
use crate::metadata::Metadata;

/// Turns raw bytes into a [`Document`].
pub trait DocumentParser: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<Document>;
}

/// Plain-text parser. Invalid UTF-8 sequences are replaced rather than rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDocumentParser;

impl DocumentParser for TextDocumentParser {
    fn parse(&self, bytes: &[u8]) -> Result<Document> {
        let text = String::from_utf8_lossy(bytes);
        if text.trim().is_empty() {
            return Err(RetrieverError::Parse("document is blank".to_string()));
        }
        Ok(Document::new(text.into_owned(), Metadata::new()))
    }
}
