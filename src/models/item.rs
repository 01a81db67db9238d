use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An item as delivered by a scraper, before aggregation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Name of the feed or site the item came from
    #[serde(default)]
    pub source: Option<String>,
}

impl RawItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// A candidate item presented for selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Dense 0-based position within its batch
    pub index: usize,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub thumbnail_url: Option<String>,
    pub source: Option<String>,
    /// Category tags from the keyword table
    pub tags: BTreeSet<String>,
    /// Lowest index of an earlier item this one duplicates
    pub duplicate_of: Option<usize>,
}

impl Item {
    /// Text used for tagging
    pub fn tag_text(&self) -> String {
        match &self.description {
            Some(description) => format!("{} {}", self.title, description),
            None => self.title.clone(),
        }
    }

    /// Convert to the persisted content record
    pub fn to_entry(&self) -> Entry {
        Entry {
            title: self.title.clone(),
            description: self.description.clone(),
            url: self.url.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
            published_at: self.published_at,
            source: self.source.clone(),
        }
    }
}

/// Identifier of one fetch; indices are only meaningful within it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to one item of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    pub batch_id: BatchId,
    pub index: usize,
}

/// The result of one fetch after aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateBatch {
    pub batch_id: BatchId,
    pub fetched_at: DateTime<Utc>,
    pub items: Vec<Item>,
}

impl CandidateBatch {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            batch_id: BatchId::new(),
            fetched_at: Utc::now(),
            items,
        }
    }

    /// Build a reference to the item at `index` of this batch
    pub fn select(&self, index: usize) -> ItemRef {
        ItemRef {
            batch_id: self.batch_id,
            index,
        }
    }

    /// References for several indices, in the given order
    pub fn select_many(&self, indices: &[usize]) -> Vec<ItemRef> {
        indices.iter().map(|&i| self.select(i)).collect()
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Pairs of (item, earlier item) flagged as near-duplicates
    pub fn duplicate_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.items
            .iter()
            .filter_map(|item| item.duplicate_of.map(|earlier| (item.index, earlier)))
    }
}

/// Persisted content of a chosen item or a user-authored fragment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Entry {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_thumbnail(mut self, thumbnail_url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(thumbnail_url.into());
        self
    }
}
