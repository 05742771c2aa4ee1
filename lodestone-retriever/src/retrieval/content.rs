use crate::segment::TextSegment;
use serde::{Deserialize, Serialize};

/// Retrieval-specific annotations on a [`Content`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentMetadata {
    /// Relevance score in `[0, 1]`
    pub score: Option<f64>,
    /// Id of the stored embedding the content came from
    pub embedding_id: Option<String>,
}

/// A retrieved text segment with its score and source id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub text_segment: TextSegment,
    pub metadata: ContentMetadata,
}

impl Content {
    pub fn with_match_metadata(
        text_segment: TextSegment,
        score: f64,
        embedding_id: impl Into<String>,
    ) -> Self {
        Self {
            text_segment,
            metadata: ContentMetadata {
                score: Some(score),
                embedding_id: Some(embedding_id.into()),
            },
        }
    }

    pub fn score(&self) -> Option<f64> {
        self.metadata.score
    }

    pub fn embedding_id(&self) -> Option<&str> {
        self.metadata.embedding_id.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text_segment.text
    }
}

impl From<TextSegment> for Content {
    fn from(text_segment: TextSegment) -> Self {
        Self {
            text_segment,
            metadata: ContentMetadata::default(),
        }
    }
}
