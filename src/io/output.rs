use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{DispatchError, Result};
use crate::models::Region;

/// Sidecar record written next to every document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub subject: String,
    pub preview_text: String,
    pub byte_length: usize,
    pub region: Region,
    pub generated_at: DateTime<Utc>,
    /// Filled in once the document path is known
    #[serde(default)]
    pub output_path: PathBuf,
}

impl DocumentMetadata {
    pub fn new(subject: &str, preview_text: &str, byte_length: usize, region: Region) -> Self {
        Self {
            subject: subject.to_string(),
            preview_text: preview_text.to_string(),
            byte_length,
            region,
            generated_at: Utc::now(),
            output_path: PathBuf::new(),
        }
    }
}

/// Paths produced by one write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenDocument {
    pub html_path: PathBuf,
    pub meta_path: PathBuf,
}

/// Write `html` to a new timestamped file plus its `.meta.json` sidecar
///
/// Files are opened with create-new semantics; on a name collision a
/// numeric suffix is appended, so nothing is ever overwritten. Either both
/// files are left on disk or neither is.
pub fn write_document(
    output_dir: &Path,
    html: &str,
    mut metadata: DocumentMetadata,
) -> Result<WrittenDocument> {
    std::fs::create_dir_all(output_dir).map_err(|e| DispatchError::io(output_dir, e))?;

    let stem = format!(
        "dispatch_{}",
        metadata.generated_at.format("%Y%m%d_%H%M%S_%3f")
    );

    let (html_path, file) = create_unique(output_dir, &stem)?;
    metadata.output_path = html_path.clone();
    let meta_path = html_path.with_extension("meta.json");

    if let Err(e) = write_pair(file, html, &html_path, &metadata, &meta_path) {
        if let Err(cleanup) = std::fs::remove_file(&html_path) {
            warn!("Could not remove partial document {:?}: {}", html_path, cleanup);
        }
        return Err(e);
    }

    Ok(WrittenDocument {
        html_path,
        meta_path,
    })
}

fn write_pair(
    mut file: std::fs::File,
    html: &str,
    html_path: &Path,
    metadata: &DocumentMetadata,
    meta_path: &Path,
) -> Result<()> {
    file.write_all(html.as_bytes())
        .map_err(|e| DispatchError::io(html_path, e))?;

    let meta = serde_json::to_string_pretty(metadata)
        .map_err(|e| DispatchError::io(meta_path, std::io::Error::other(e)))?;
    std::fs::write(meta_path, meta).map_err(|e| DispatchError::io(meta_path, e))
}

/// Read back a written document and its sidecar
pub fn read_document(html_path: &Path) -> anyhow::Result<(String, DocumentMetadata)> {
    use anyhow::Context;

    let html = std::fs::read_to_string(html_path)
        .with_context(|| format!("Failed to read document: {:?}", html_path))?;
    let meta_path = html_path.with_extension("meta.json");
    let meta = std::fs::read_to_string(&meta_path)
        .with_context(|| format!("Failed to read metadata: {:?}", meta_path))?;
    let metadata: DocumentMetadata =
        serde_json::from_str(&meta).context("Failed to parse document metadata")?;
    Ok((html, metadata))
}

fn create_unique(dir: &Path, stem: &str) -> Result<(PathBuf, std::fs::File)> {
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{}.html", stem)
        } else {
            format!("{}_{}.html", stem, attempt)
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(DispatchError::io(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_document_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = DocumentMetadata::new("Grid rules", "Good morning", 12, Region::Us);
        let written = write_document(dir.path(), "<html></html>", metadata).unwrap();

        assert_eq!(
            std::fs::read_to_string(&written.html_path).unwrap(),
            "<html></html>"
        );
        let name = written.html_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("dispatch_"));
        assert!(name.ends_with(".html"));

        let sidecar: DocumentMetadata =
            serde_json::from_str(&std::fs::read_to_string(&written.meta_path).unwrap()).unwrap();
        assert_eq!(sidecar.subject, "Grid rules");
        assert_eq!(sidecar.output_path, written.html_path);
    }

    #[test]
    fn test_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = DocumentMetadata::new("s", "p", 1, Region::Europe);

        let first = write_document(dir.path(), "one", metadata.clone()).unwrap();
        // Same timestamp, so the stem collides
        let second = write_document(dir.path(), "two", metadata).unwrap();

        assert_ne!(first.html_path, second.html_path);
        assert_eq!(std::fs::read_to_string(&first.html_path).unwrap(), "one");
        assert_eq!(std::fs::read_to_string(&second.html_path).unwrap(), "two");
        assert_ne!(first.meta_path, second.meta_path);
    }

    #[test]
    fn test_failed_sidecar_leaves_no_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut metadata = DocumentMetadata::new("s", "p", 1, Region::Us);
        metadata.generated_at = "2026-01-01T00:00:00Z".parse().unwrap();
        // A directory where the sidecar should go makes its write fail
        std::fs::create_dir(dir.path().join("dispatch_20260101_000000_000.meta.json")).unwrap();

        let err = write_document(dir.path(), "<html></html>", metadata).unwrap_err();
        assert!(matches!(err, DispatchError::Io { .. }));

        let html_files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".html"))
            .collect();
        assert!(html_files.is_empty(), "left behind: {:?}", html_files);
    }

    #[test]
    fn test_read_document() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = DocumentMetadata::new("Grid rules", "Good morning", 13, Region::Us);
        let written = write_document(dir.path(), "<html></html>", metadata).unwrap();

        let (html, metadata) = read_document(&written.html_path).unwrap();
        assert_eq!(html, "<html></html>");
        assert_eq!(metadata.byte_length, 13);
        assert_eq!(metadata.output_path, written.html_path);

        std::fs::remove_file(&written.meta_path).unwrap();
        assert!(read_document(&written.html_path).is_err());
    }
}
