pub mod similarity;
pub mod tagging;

pub use similarity::*;
pub use tagging::*;

use std::collections::HashSet;

use tracing::debug;

use crate::models::{Item, RawItem};

/// Configuration for candidate aggregation
#[derive(Debug, Clone)]
pub struct AggregateConfig {
    /// Score at or above which a later item is flagged as a duplicate
    pub duplicate_threshold: f64,
    /// Headline similarity metric
    pub metric: SimilarityMetric,
    /// Keep at most this many items (in input order)
    pub max_items: Option<usize>,
    /// Descriptions are cut to this many characters
    pub max_description_chars: usize,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold: DUP_THRESHOLD,
            metric: SimilarityMetric::default(),
            max_items: None,
            max_description_chars: 300,
        }
    }
}

/// Turn raw scraper output into an indexed, tagged candidate list
///
/// 1. Assign dense indices in input order
/// 2. Flag each item against lower-indexed titles (flagged, never dropped)
/// 3. Tag title + description with the keyword table
pub fn aggregate(raw: &[RawItem], table: &KeywordTable, config: &AggregateConfig) -> Vec<Item> {
    let limit = config.max_items.unwrap_or(raw.len());
    let mut items: Vec<Item> = Vec::with_capacity(limit.min(raw.len()));

    for (index, raw_item) in raw.iter().take(limit).enumerate() {
        let duplicate_of = items
            .iter()
            .find(|earlier| {
                config.metric.score(&earlier.title, &raw_item.title) >= config.duplicate_threshold
            })
            .map(|earlier| earlier.index);

        if let Some(earlier) = duplicate_of {
            debug!(
                "Item {} ({:?}) duplicates item {}",
                index, raw_item.title, earlier
            );
        }

        let mut item = Item {
            index,
            title: raw_item.title.trim().to_string(),
            description: raw_item
                .description
                .as_deref()
                .map(|d| clean_description(d, config.max_description_chars))
                .filter(|d| !d.is_empty()),
            url: raw_item.url.clone(),
            published_at: raw_item.published_at,
            thumbnail_url: raw_item.thumbnail_url.clone(),
            source: raw_item.source.clone(),
            tags: Default::default(),
            duplicate_of,
        };
        item.tags = tag(&item.tag_text(), table);
        items.push(item);
    }

    items
}

/// Merge several sources into one recency-ordered list
///
/// Repeats of an already seen URL are dropped; the rest are stable-sorted
/// newest first with undated items last.
pub fn merge_sources(sources: Vec<Vec<RawItem>>) -> Vec<RawItem> {
    let mut seen_urls = HashSet::new();
    let mut merged: Vec<RawItem> = sources
        .into_iter()
        .flatten()
        .filter(|item| match &item.url {
            Some(url) => seen_urls.insert(url.trim().to_string()),
            None => true,
        })
        .collect();

    merged.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    merged
}

/// Collapse whitespace and cut to `max_chars` characters
fn clean_description(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(max_chars) {
        Some((cut, _)) => collapsed[..cut].trim_end().to_string(),
        None => collapsed,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::Region;

    fn raw(titles: &[&str]) -> Vec<RawItem> {
        titles.iter().map(|t| RawItem::new(*t)).collect()
    }

    #[test]
    fn test_duplicate_flagging() {
        let items = aggregate(
            &raw(&[
                "Texas battery project announced",
                "Vistra announces Texas storage project",
                "Unrelated headline about solar",
            ]),
            &KeywordTable::new(),
            &AggregateConfig::default(),
        );

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].duplicate_of, None);
        assert_eq!(items[1].duplicate_of, Some(0));
        assert_eq!(items[2].duplicate_of, None);
    }

    #[test]
    fn test_duplicate_points_to_lowest_index() {
        let items = aggregate(
            &raw(&[
                "Grid fees change for German batteries",
                "Grid fees change for German batteries - Reuters",
                "Grid fees change for German batteries (update)",
            ]),
            &KeywordTable::new(),
            &AggregateConfig::default(),
        );
        assert_eq!(items[1].duplicate_of, Some(0));
        assert_eq!(items[2].duplicate_of, Some(0));
    }

    #[test]
    fn test_empty_and_single_input() {
        let config = AggregateConfig::default();
        assert!(aggregate(&[], &KeywordTable::new(), &config).is_empty());

        let single = aggregate(&raw(&["Only one"]), &KeywordTable::new(), &config);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].index, 0);
        assert_eq!(single[0].duplicate_of, None);
    }

    #[test]
    fn test_indices_are_dense_and_max_items_applies() {
        let config = AggregateConfig {
            max_items: Some(2),
            ..Default::default()
        };
        let items = aggregate(&raw(&["a one", "b two", "c three"]), &KeywordTable::new(), &config);
        let indices: Vec<usize> = items.iter().map(|i| i.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_tags_use_description() {
        let mut item = RawItem::new("Capacity auction clears");
        item.description = Some("Results from  the  PJM   auction".to_string());
        let items = aggregate(
            &[item],
            &KeywordTable::for_region(Region::Us),
            &AggregateConfig::default(),
        );
        assert!(items[0].tags.contains("PJM"));
        assert_eq!(
            items[0].description.as_deref(),
            Some("Results from the PJM auction")
        );
    }

    #[test]
    fn test_threshold_is_configurable() {
        let config = AggregateConfig {
            duplicate_threshold: 0.9,
            ..Default::default()
        };
        let items = aggregate(
            &raw(&[
                "Texas battery project announced",
                "Vistra announces Texas storage project",
            ]),
            &KeywordTable::new(),
            &config,
        );
        assert_eq!(items[1].duplicate_of, None);
    }

    #[test]
    fn test_merge_sources_orders_and_drops_repeated_urls() {
        let mut old = RawItem::new("old");
        old.url = Some("https://a.example/1".to_string());
        old.published_at = Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());

        let mut new = RawItem::new("new");
        new.url = Some("https://b.example/2".to_string());
        new.published_at = Some(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());

        let mut repeat = old.clone();
        repeat.title = "old again".to_string();

        let undated = RawItem::new("undated");

        let merged = merge_sources(vec![vec![old, undated], vec![new, repeat]]);
        let titles: Vec<&str> = merged.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "old", "undated"]);
    }

    #[test]
    fn test_clean_description_truncates_on_chars() {
        assert_eq!(clean_description("héllo wörld", 5), "héllo");
        assert_eq!(clean_description("short", 300), "short");
    }
}
