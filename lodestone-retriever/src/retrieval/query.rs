use serde::{Deserialize, Serialize};

/// Context that travels with a query, available to dynamic retrieval settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryMetadata {
    /// Identifies the conversation or user the query belongs to
    pub chat_memory_id: Option<String>,
    /// The original user message the query was derived from
    pub user_message: Option<String>,
}

impl QueryMetadata {
    pub fn for_chat(chat_memory_id: impl Into<String>) -> Self {
        Self {
            chat_memory_id: Some(chat_memory_id.into()),
            user_message: None,
        }
    }
}

/// A retrieval query: text to embed plus optional metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub metadata: Option<QueryMetadata>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: QueryMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn chat_memory_id(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.chat_memory_id.as_deref())
    }
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Query {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}
