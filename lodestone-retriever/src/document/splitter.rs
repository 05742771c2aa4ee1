use super::Document;
use crate::error::{Result, RetrieverError, ensure_greater_than_zero};
use crate::segment::TextSegment;

/// Splits documents into overlapping windows of lines.
///
/// Every segment carries the document's metadata plus `index` (ordinal of the
/// segment within the document), `line_start` and `line_end` (1-based,
/// inclusive). Windows containing only whitespace are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentSplitter {
    max_lines: usize,
    overlap_lines: usize,
}

impl Default for DocumentSplitter {
    fn default() -> Self {
        Self {
            max_lines: Self::DEFAULT_MAX_LINES,
            overlap_lines: Self::DEFAULT_OVERLAP_LINES,
        }
    }
}

impl DocumentSplitter {
    pub const DEFAULT_MAX_LINES: usize = 40;
    pub const DEFAULT_OVERLAP_LINES: usize = 5;

    pub const INDEX: &'static str = "index";
    pub const LINE_START: &'static str = "line_start";
    pub const LINE_END: &'static str = "line_end";

    pub fn new(max_lines: usize, overlap_lines: usize) -> Result<Self> {
        let max_lines = ensure_greater_than_zero(max_lines, "maxLines")?;
        if overlap_lines >= max_lines {
            return Err(RetrieverError::invalid_argument(format!(
                "overlapLines must be less than maxLines, but is: {overlap_lines} >= {max_lines}"
            )));
        }
        Ok(Self {
            max_lines,
            overlap_lines,
        })
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    pub fn overlap_lines(&self) -> usize {
        self.overlap_lines
    }

    pub fn split(&self, document: &Document) -> Vec<TextSegment> {
        let lines: Vec<&str> = document.text.lines().collect();
        let step = self.max_lines - self.overlap_lines;

        let mut segments = Vec::new();
        let mut start = 0;
        while start < lines.len() {
            let end = (start + self.max_lines).min(lines.len());
            let text = lines[start..end].join("\n");

            if !text.trim().is_empty() {
                let metadata = document
                    .metadata
                    .clone()
                    .with(Self::INDEX, segments.len())
                    .with(Self::LINE_START, start + 1)
                    .with(Self::LINE_END, end);
                segments.push(TextSegment::new(text, metadata));
            }

            if end == lines.len() {
                break;
            }
            start += step;
        }

        tracing::debug!(
            "Split document into {} segments (max_lines: {}, overlap: {})",
            segments.len(),
            self.max_lines,
            self.overlap_lines
        );
        segments
    }

    pub fn split_all(&self, documents: &[Document]) -> Vec<TextSegment> {
        documents.iter().flat_map(|d| self.split(d)).collect()
    }
}
