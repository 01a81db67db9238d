use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::{RawItem, Submission};

/// Accepted shapes of a candidate file
#[derive(Deserialize)]
#[serde(untagged)]
enum RawItemsDocument {
    List(Vec<RawItem>),
    Wrapped { items: Vec<RawItem> },
}

/// Parse a scraper output file into raw items
pub fn parse_raw_items_file(path: &Path) -> Result<Vec<RawItem>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    parse_raw_items_json(&content)
}

/// Parse a JSON array of items, or an object with an `items` array
pub fn parse_raw_items_json(json: &str) -> Result<Vec<RawItem>> {
    let document: RawItemsDocument =
        serde_json::from_str(json).context("Failed to parse candidate items JSON")?;
    let items = match document {
        RawItemsDocument::List(items) => items,
        RawItemsDocument::Wrapped { items } => items,
    };
    Ok(items
        .into_iter()
        .filter(|item| !item.title.trim().is_empty())
        .collect())
}

/// Parse a step submission (fields and manual items) from a file
pub fn parse_submission_file(path: &Path) -> Result<Submission> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    serde_json::from_str(&content).context("Failed to parse submission JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let json = r#"[
            {"title": "Texas battery project announced", "url": "https://a.example/1",
             "published_at": "2026-01-20T09:00:00Z", "source": "Energy-Storage.news"},
            {"title": "   "},
            {"title": "Unrelated headline about solar", "description": "Short"}
        ]"#;
        let items = parse_raw_items_json(json).unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].published_at.is_some());
        assert_eq!(items[1].description.as_deref(), Some("Short"));
    }

    #[test]
    fn test_parse_wrapped() {
        let items = parse_raw_items_json(r#"{"items": [{"title": "One"}]}"#).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_raw_items_json("{").is_err());
    }

    #[test]
    fn test_parse_submission_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.json");
        std::fs::write(
            &path,
            r#"{"fields": {"title": "Chart", "image_url": "https://img.example/c.png"}}"#,
        )
        .unwrap();
        let submission = parse_submission_file(&path).unwrap();
        assert_eq!(submission.field_str("title"), Some("Chart"));
        assert!(submission.selections.is_empty());
    }
}
