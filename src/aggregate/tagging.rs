use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::Region;

/// Tag → keywords that trigger it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordTable {
    tags: BTreeMap<String, BTreeSet<String>>,
}

const US_KEYWORDS: &[(&str, &[&str])] = &[
    ("ERCOT", &["ercot", "texas grid", "texas power", "oncor", "centerpoint texas"]),
    ("MISO", &["miso", "midcontinent", "midcon"]),
    ("CAISO", &["caiso", "california iso", "california grid", "cpuc"]),
    ("PJM", &["pjm", "mid-atlantic"]),
    ("NYISO", &["nyiso", "new york iso", "new york grid", "con edison", "nyserda"]),
    ("ISO-NE", &["iso-ne", "iso ne", "new england iso", "new england grid"]),
    ("SPP", &["spp", "southwest power pool"]),
];

const EUROPE_KEYWORDS: &[(&str, &[&str])] = &[
    ("GB", &["uk", "britain", "british", "england", "scotland", "wales", "ofgem", "national grid eso"]),
    ("Germany", &["germany", "german", "deutschland", "bundesnetzagentur"]),
    ("Iberia", &["spain", "spanish", "iberia", "iberian", "portugal", "portuguese"]),
    ("Italy", &["italy", "italian", "terna"]),
    ("France", &["france", "french", "rte"]),
    ("Netherlands", &["netherlands", "dutch", "tennet"]),
    ("Nordics", &["nordic", "sweden", "norway", "denmark", "finland"]),
    ("Ireland", &["ireland", "irish", "eirgrid"]),
    ("Poland", &["poland", "polish"]),
];

const AUSTRALIA_KEYWORDS: &[(&str, &[&str])] = &[
    ("NEM", &["nem", "national electricity market", "aemo"]),
    ("WEM", &["wem", "western australia"]),
    ("Queensland", &["queensland"]),
    ("New South Wales", &["new south wales", "nsw"]),
    ("Victoria", &["victoria", "victorian"]),
    ("South Australia", &["south australia"]),
];

impl KeywordTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add keywords for a tag, keeping any already present
    pub fn insert<I, S>(&mut self, tag: impl Into<String>, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entry = self.tags.entry(tag.into()).or_default();
        for keyword in keywords {
            let keyword = normalize(keyword.as_ref());
            if !keyword.is_empty() {
                entry.insert(keyword);
            }
        }
    }

    /// Built-in table for one edition
    pub fn for_region(region: Region) -> Self {
        let source = match region {
            Region::Us => US_KEYWORDS,
            Region::Europe => EUROPE_KEYWORDS,
            Region::Australia => AUSTRALIA_KEYWORDS,
        };
        let mut table = Self::new();
        for (tag, keywords) in source {
            table.insert(*tag, keywords.iter());
        }
        table
    }

    /// Union of every built-in regional table
    pub fn global() -> Self {
        Region::ALL
            .iter()
            .fold(Self::new(), |mut table, region| {
                table.merge(&Self::for_region(*region));
                table
            })
    }

    pub fn merge(&mut self, other: &KeywordTable) {
        for (tag, keywords) in &other.tags {
            self.insert(tag.clone(), keywords.iter());
        }
    }

    /// Load a table from a JSON object of `tag → [keywords]`
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read keyword table: {:?}", path))?;
        let raw: BTreeMap<String, Vec<String>> =
            serde_json::from_str(&content).context("Failed to parse keyword table JSON")?;
        let mut table = Self::new();
        for (tag, keywords) in raw {
            table.insert(tag, keywords);
        }
        Ok(table)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }
}

/// Tags whose keywords occur in `text` as whole words or phrases
///
/// Matching is case-insensitive and treats punctuation as a word break,
/// so `ISO-NE` matches the keyword `iso-ne` but `cinema` does not match `nem`.
pub fn tag(text: &str, table: &KeywordTable) -> BTreeSet<String> {
    let haystack = format!(" {} ", normalize(text));
    if haystack.trim().is_empty() {
        return BTreeSet::new();
    }

    table
        .tags
        .iter()
        .filter(|(_, keywords)| {
            keywords
                .iter()
                .any(|keyword| haystack.contains(&format!(" {} ", keyword)))
        })
        .map(|(tag, _)| tag.clone())
        .collect()
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
