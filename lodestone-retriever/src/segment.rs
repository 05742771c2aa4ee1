use crate::metadata::Metadata;
use serde::{Deserialize, Serialize};

/// A piece of text that gets embedded and stored, with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSegment {
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl TextSegment {
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl From<&str> for TextSegment {
    fn from(text: &str) -> Self {
        Self::new(text, Metadata::new())
    }
}

impl From<String> for TextSegment {
    fn from(text: String) -> Self {
        Self::new(text, Metadata::new())
    }
}
