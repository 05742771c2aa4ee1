//! Document source backed by a single file on the local file system.

use super::{Document, DocumentSource};
use crate::error::{Result, RetrieverError};
use crate::metadata::Metadata;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;
use url::Url;

/// Reads a document from a file path.
///
/// The path is not checked for existence up front; opening a missing file
/// fails when [`input_stream`](DocumentSource::input_stream) is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemSource {
    path: PathBuf,
}

impl FileSystemSource {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(RetrieverError::invalid_argument("path cannot be empty"));
        }
        if path.file_name().is_none() {
            return Err(RetrieverError::invalid_argument(format!(
                "path has no file name: {}",
                path.display()
            )));
        }
        Ok(Self { path })
    }

    /// Source for a `file://` URI. Percent-encoded bytes are decoded.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let url = Url::parse(uri)
            .map_err(|e| RetrieverError::invalid_argument(format!("invalid URI {uri}: {e}")))?;
        if url.scheme() != "file" {
            return Err(RetrieverError::invalid_argument(format!("not a file URI: {uri}")));
        }
        // Fails for remote hosts; file://localhost/path and file:///path are the same file
        let path = url.to_file_path().map_err(|_| {
            RetrieverError::invalid_argument(format!("file URI does not name a local path: {uri}"))
        })?;
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn absolute_directory_path(&self) -> String {
        let absolute = std::path::absolute(&self.path).unwrap_or_else(|_| self.path.clone());
        absolute
            .parent()
            .map(|dir| dir.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentSource for FileSystemSource {
    async fn input_stream(&self) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| RetrieverError::io(&self.path, e))?;
        Ok(Box::new(file))
    }

    fn metadata(&self) -> Metadata {
        Metadata::new()
            .with(Document::FILE_NAME, self.file_name())
            .with(Document::ABSOLUTE_DIRECTORY_PATH, self.absolute_directory_path())
    }
}

impl TryFrom<&str> for FileSystemSource {
    type Error = RetrieverError;

    fn try_from(path: &str) -> Result<Self> {
        Self::new(path)
    }
}

impl TryFrom<PathBuf> for FileSystemSource {
    type Error = RetrieverError;

    fn try_from(path: PathBuf) -> Result<Self> {
        Self::new(path)
    }
}

impl TryFrom<&Path> for FileSystemSource {
    type Error = RetrieverError;

    fn try_from(path: &Path) -> Result<Self> {
        Self::new(path)
    }
}

impl fmt::Display for FileSystemSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileSystemSource {{ path = {} }}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_reads_file_and_reports_metadata() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        std::fs::write(&path, "hello there").unwrap();

        let source = FileSystemSource::new(&path)?;
        let mut contents = String::new();
        source
            .input_stream()
            .await?
            .read_to_string(&mut contents)
            .await
            .unwrap();
        assert_eq!(contents, "hello there");

        let metadata = source.metadata();
        assert_eq!(metadata.get_string(Document::FILE_NAME), Some("notes.txt"));
        assert_eq!(
            metadata.get_string(Document::ABSOLUTE_DIRECTORY_PATH),
            Some(temp.path().to_string_lossy().as_ref())
        );
        Ok(())
    }

    #[test]
    fn test_relative_path_is_made_absolute() {
        let source = FileSystemSource::try_from("docs/guide.md").unwrap();
        let metadata = source.metadata();
        assert_eq!(metadata.get_string(Document::FILE_NAME), Some("guide.md"));

        let dir = metadata
            .get_string(Document::ABSOLUTE_DIRECTORY_PATH)
            .unwrap();
        assert!(Path::new(dir).is_absolute());
        assert!(dir.ends_with("docs"));
    }

    #[tokio::test]
    async fn test_missing_file_fails_on_open() {
        let source = FileSystemSource::new("/definitely/not/here.txt").unwrap();
        let result = source.input_stream().await;
        assert!(matches!(result, Err(RetrieverError::Io { .. })));
    }

    #[test]
    fn test_rejects_unusable_paths() {
        assert!(FileSystemSource::new("").is_err());
        assert!(FileSystemSource::new("/").is_err());
        assert!(FileSystemSource::new("dir/..").is_err());
    }

    #[test]
    fn test_from_uri() {
        let source = FileSystemSource::from_uri("file:///tmp/my%20notes.txt").unwrap();
        assert_eq!(source.path(), Path::new("/tmp/my notes.txt"));

        let source = FileSystemSource::from_uri("file://localhost/tmp/a.txt").unwrap();
        assert_eq!(source.path(), Path::new("/tmp/a.txt"));

        // Only valid hex escapes are decoded
        let source = FileSystemSource::from_uri("file:///tmp/100%25%2Bdone%+f.txt").unwrap();
        assert_eq!(source.path(), Path::new("/tmp/100%+done%+f.txt"));

        assert!(FileSystemSource::from_uri("https://example.com/a.txt").is_err());
        assert!(FileSystemSource::from_uri("file://host/a.txt").is_err());
        assert!(FileSystemSource::from_uri("not a uri").is_err());
        assert!(FileSystemSource::from_uri("file:///").is_err());
    }

    #[test]
    fn test_display() {
        let source = FileSystemSource::try_from(PathBuf::from("/srv/data/report.txt")).unwrap();
        assert_eq!(
            source.to_string(),
            "FileSystemSource { path = /srv/data/report.txt }"
        );
    }
}
