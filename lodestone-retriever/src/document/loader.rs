//! Loading documents from sources and directories.

use super::{Document, DocumentParser, DocumentSource, FileSystemSource};
use crate::error::{Result, RetrieverError};
use ignore::WalkBuilder;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

/// Read `source` fully, parse it, and attach the source metadata.
///
/// Source metadata wins over keys the parser set.
pub async fn load_document(
    source: &dyn DocumentSource,
    parser: &dyn DocumentParser,
) -> Result<Document> {
    let mut stream = source.input_stream().await?;
    let mut bytes = Vec::new();
    stream
        .read_to_end(&mut bytes)
        .await
        .map_err(|e| RetrieverError::Parse(format!("failed to read document: {e}")))?;

    let mut document = parser.parse(&bytes)?;
    document.metadata.merge(&source.metadata());
    Ok(document)
}

/// Load every text file under `dir`, honoring `.gitignore` rules.
///
/// Hidden and binary-looking files are not visited. Files that fail to load
/// or parse are skipped with a warning.
pub async fn load_documents(dir: &Path, parser: &dyn DocumentParser) -> Result<Vec<Document>> {
    if !dir.is_dir() {
        return Err(RetrieverError::invalid_argument(format!(
            "not a directory: {}",
            dir.display()
        )));
    }

    let mut builder = WalkBuilder::new(dir);
    builder
        .hidden(true)
        .git_ignore(true)
        .git_exclude(true)
        .follow_links(false)
        .require_git(false);
    builder.add_custom_ignore_filename(".lodestoneignore");

    let mut paths: Vec<_> = builder
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(|entry| entry.into_path())
        .filter(|path| should_load_file(path))
        .collect();
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let source = FileSystemSource::new(&path)?;
        match load_document(&source, parser).await {
            Ok(document) => {
                debug!("Loaded {}", path.display());
                documents.push(document);
            }
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    info!("Loaded {} documents from {}", documents.len(), dir.display());
    Ok(documents)
}

/// Whether a file looks like text worth loading, judged by its extension.
pub fn should_load_file(path: &Path) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(
            "exe" | "dll" | "so" | "dylib" | "bin" | "o" | "a" | "png" | "jpg" | "jpeg" | "gif"
            | "ico" | "pdf" | "zip" | "gz" | "tar" | "wasm" | "lock" | "db",
        ) => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextDocumentParser;
    use crate::metadata::Metadata;
    use std::fs;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    #[tokio::test]
    async fn test_load_document_merges_source_metadata() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("readme.md");
        fs::write(&path, "# Title\nBody").unwrap();

        let source = FileSystemSource::new(&path)?;
        let document = load_document(&source, &TextDocumentParser).await?;
        assert_eq!(document.text, "# Title\nBody");
        assert_eq!(
            document.metadata.get_string(Document::FILE_NAME),
            Some("readme.md")
        );
        assert!(document.metadata.contains_key(Document::ABSOLUTE_DIRECTORY_PATH));
        Ok(())
    }

    struct TaggingParser;

    impl DocumentParser for TaggingParser {
        fn parse(&self, bytes: &[u8]) -> Result<Document> {
            Ok(Document::new(
                String::from_utf8_lossy(bytes).into_owned(),
                Metadata::new()
                    .with("parser", "tagging")
                    .with(Document::FILE_NAME, "overridden"),
            ))
        }
    }

    #[tokio::test]
    async fn test_source_metadata_overrides_parser_metadata() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        fs::write(&path, "x").unwrap();

        let document = load_document(&FileSystemSource::new(&path)?, &TaggingParser).await?;
        assert_eq!(document.metadata.get_string("parser"), Some("tagging"));
        assert_eq!(document.metadata.get_string(Document::FILE_NAME), Some("a.txt"));
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn test_load_documents_walks_and_skips() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("nested/deeper")).unwrap();
        fs::create_dir_all(root.join("target")).unwrap();
        fs::write(root.join("one.txt"), "first").unwrap();
        fs::write(root.join("nested/two.md"), "second").unwrap();
        fs::write(root.join("nested/deeper/three.rs"), "fn third() {}").unwrap();
        fs::write(root.join("nested/blank.txt"), "   \n").unwrap();
        fs::write(root.join("image.png"), [0x89, b'P', b'N', b'G']).unwrap();
        fs::write(root.join(".hidden"), "secret").unwrap();
        fs::write(root.join(".gitignore"), "target/\n").unwrap();
        fs::write(root.join("target/out.txt"), "ignored").unwrap();

        let documents = load_documents(root, &TextDocumentParser).await?;
        let mut names: Vec<_> = documents
            .iter()
            .filter_map(|d| d.metadata.get_string(Document::FILE_NAME))
            .collect();
        names.sort();
        assert_eq!(names, vec!["one.txt", "three.rs", "two.md"]);
        assert!(logs_contain("Skipping"));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_documents_requires_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        assert!(load_documents(&file, &TextDocumentParser).await.is_err());
        assert!(
            load_documents(&temp.path().join("missing"), &TextDocumentParser)
                .await
                .is_err()
        );
    }

    #[test]
    fn test_should_load_file() {
        assert!(should_load_file(Path::new("src/lib.rs")));
        assert!(should_load_file(Path::new("README")));
        assert!(should_load_file(Path::new("notes.md")));
        assert!(!should_load_file(Path::new("image.png")));
        assert!(!should_load_file(Path::new("Cargo.lock")));
    }
}
