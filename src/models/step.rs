use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Entry, ItemRef, Region};
use crate::error::DispatchError;

/// Field name that marks a skippable step as deliberately skipped
pub const SKIP_FIELD: &str = "skip";

/// Field name under which resolved entries are stored
pub const ITEMS_FIELD: &str = "items";

/// The closed, ordered set of workflow steps
///
/// Declaration order is workflow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKey {
    Region,
    Articles,
    Subject,
    Intro,
    News,
    Chart,
    MoreArticles,
    Banner,
    Podcast,
    World,
    Assemble,
}

impl StepKey {
    pub const ALL: [StepKey; 11] = [
        StepKey::Region,
        StepKey::Articles,
        StepKey::Subject,
        StepKey::Intro,
        StepKey::News,
        StepKey::Chart,
        StepKey::MoreArticles,
        StepKey::Banner,
        StepKey::Podcast,
        StepKey::World,
        StepKey::Assemble,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKey::Region => "region",
            StepKey::Articles => "articles",
            StepKey::Subject => "subject",
            StepKey::Intro => "intro",
            StepKey::News => "news",
            StepKey::Chart => "chart",
            StepKey::MoreArticles => "more_articles",
            StepKey::Banner => "banner",
            StepKey::Podcast => "podcast",
            StepKey::World => "world",
            StepKey::Assemble => "assemble",
        }
    }

    /// Step-scoped storage key for `field`
    pub fn field_key(&self, field: &str) -> String {
        format!("{}.{}", self.as_str(), field)
    }

    /// The immutable definition of this step
    pub fn definition(self) -> StepDefinition {
        let base = StepDefinition {
            key: self,
            order: self as u32,
            title: "",
            required_fields: &[],
            optional_fields: &[],
            max_selectable: None,
            min_items: 0,
            skippable: false,
            required_for_assembly: true,
            cross_region: false,
            validator: no_extra_checks,
        };

        match self {
            StepKey::Region => StepDefinition {
                title: "Select region",
                required_fields: &["region"],
                validator: validate_region,
                ..base
            },
            StepKey::Articles => StepDefinition {
                title: "Featured articles",
                max_selectable: Some(3),
                min_items: 1,
                ..base
            },
            StepKey::Subject => StepDefinition {
                title: "Subject line",
                required_fields: &["subject"],
                validator: validate_subject,
                ..base
            },
            StepKey::Intro => StepDefinition {
                title: "Intro text",
                required_fields: &["text"],
                ..base
            },
            StepKey::News => StepDefinition {
                title: "This week's news",
                max_selectable: Some(4),
                min_items: 1,
                ..base
            },
            StepKey::Chart => StepDefinition {
                title: "Chart of the week",
                required_fields: &["title", "image_url"],
                optional_fields: &["article_url", "context", "intro_text", "outro_text"],
                skippable: true,
                required_for_assembly: false,
                validator: validate_chart,
                ..base
            },
            StepKey::MoreArticles => StepDefinition {
                title: "More articles",
                max_selectable: Some(10),
                min_items: 1,
                skippable: true,
                required_for_assembly: false,
                ..base
            },
            StepKey::Banner => StepDefinition {
                title: "Promotional banner",
                required_fields: &["image_url", "link"],
                optional_fields: &["alt_text"],
                skippable: true,
                required_for_assembly: false,
                validator: validate_banner,
                ..base
            },
            StepKey::Podcast => StepDefinition {
                title: "Podcast",
                max_selectable: Some(1),
                min_items: 1,
                ..base
            },
            StepKey::World => StepDefinition {
                title: "More from around the world",
                max_selectable: Some(3),
                min_items: 1,
                cross_region: true,
                ..base
            },
            StepKey::Assemble => StepDefinition {
                title: "Assemble",
                ..base
            },
        }
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepKey {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s.trim())
            .ok_or_else(|| DispatchError::UnknownStep(s.to_string()))
    }
}

/// Where the workflow currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum CurrentStep {
    Step(StepKey),
    /// Every step has been completed
    Done,
}

impl CurrentStep {
    pub fn step(&self) -> Option<StepKey> {
        match self {
            CurrentStep::Step(key) => Some(*key),
            CurrentStep::Done => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, CurrentStep::Done)
    }
}

impl fmt::Display for CurrentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurrentStep::Step(key) => write!(f, "{}", key),
            CurrentStep::Done => f.write_str("done"),
        }
    }
}

impl From<CurrentStep> for String {
    fn from(value: CurrentStep) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for CurrentStep {
    type Error = DispatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "done" {
            Ok(CurrentStep::Done)
        } else {
            value.parse().map(CurrentStep::Step)
        }
    }
}

/// Declared schema and behavior of one step
#[derive(Debug, Clone, Copy)]
pub struct StepDefinition {
    pub key: StepKey,
    /// Position in the workflow
    pub order: u32,
    /// Human-readable step name
    pub title: &'static str,
    /// Fields that must be present and non-empty unless the step is skipped
    pub required_fields: &'static [&'static str],
    /// Text fields that may be left out
    pub optional_fields: &'static [&'static str],
    /// Cap on selections plus manual items; `None` means the step takes no items
    pub max_selectable: Option<usize>,
    /// Minimum number of items when the step is not skipped
    pub min_items: usize,
    /// Whether `skip: true` is accepted
    pub skippable: bool,
    /// Whether assembly requires this step
    pub required_for_assembly: bool,
    /// Tag candidates against every region's keywords
    pub cross_region: bool,
    /// Step-specific checks; returns a list of problems
    pub validator: fn(&Submission) -> Vec<String>,
}

impl StepDefinition {
    pub fn accepts_items(&self) -> bool {
        self.max_selectable.is_some()
    }
}

/// The canonical workflow, in order
pub fn workflow() -> Vec<StepDefinition> {
    StepKey::ALL.iter().map(|key| key.definition()).collect()
}

/// What a caller submits for a step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    /// Candidates chosen from the step's current batch
    #[serde(default)]
    pub selections: Vec<ItemRef>,
    /// User-authored or generated entries
    #[serde(default)]
    pub items: Vec<Entry>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    /// A submission that skips an optional step
    pub fn skip() -> Self {
        Self::new().with_field(SKIP_FIELD, Value::Bool(true))
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_selections(mut self, selections: Vec<ItemRef>) -> Self {
        self.selections = selections;
        self
    }

    pub fn with_item(mut self, entry: Entry) -> Self {
        self.items.push(entry);
        self
    }

    pub fn is_skip(&self) -> bool {
        matches!(self.fields.get(SKIP_FIELD), Some(Value::Bool(true)))
    }

    pub fn item_count(&self) -> usize {
        self.selections.len() + self.items.len()
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Whether `name` is absent, null or blank
    pub fn is_blank(&self, name: &str) -> bool {
        match self.fields.get(name) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        }
    }
}

fn no_extra_checks(_: &Submission) -> Vec<String> {
    Vec::new()
}

fn validate_region(submission: &Submission) -> Vec<String> {
    match submission.fields.get("region") {
        Some(Value::String(s)) => match s.parse::<Region>() {
            Ok(_) => Vec::new(),
            Err(e) => vec![e],
        },
        Some(Value::Null) | None => Vec::new(),
        Some(_) => vec!["field `region` must be a string".to_string()],
    }
}

fn validate_subject(submission: &Submission) -> Vec<String> {
    match submission.fields.get("subject") {
        Some(Value::String(_)) | Some(Value::Null) | None => Vec::new(),
        Some(_) => vec!["field `subject` must be a string".to_string()],
    }
}

fn validate_chart(submission: &Submission) -> Vec<String> {
    let mut problems = url_problems(submission, "image_url");
    problems.extend(url_problems(submission, "article_url"));
    problems
}

fn validate_banner(submission: &Submission) -> Vec<String> {
    let mut problems = url_problems(submission, "image_url");
    problems.extend(url_problems(submission, "link"));
    problems
}

/// An optional URL field must be an absolute http(s) URL when present
fn url_problems(submission: &Submission, name: &str) -> Vec<String> {
    if submission.is_blank(name) {
        return Vec::new();
    }
    match submission.field_str(name) {
        Some(url) if is_http_url(url) => Vec::new(),
        Some(url) => vec![format!("field `{}` is not an http(s) URL: {}", name, url)],
        None => vec![format!("field `{}` must be a string", name)],
    }
}

/// Absolute http(s) URL with a host
pub(crate) fn is_http_url(url: &str) -> bool {
    match url::Url::parse(url.trim()) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
                && parsed.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_order_matches_declaration() {
        let steps = workflow();
        assert_eq!(steps.len(), StepKey::ALL.len());
        for (i, def) in steps.iter().enumerate() {
            assert_eq!(def.order as usize, i);
        }
        assert_eq!(steps[0].key, StepKey::Region);
        assert_eq!(steps.last().unwrap().key, StepKey::Assemble);
    }

    #[test]
    fn test_step_key_round_trip_str() {
        for key in StepKey::ALL {
            assert_eq!(key.as_str().parse::<StepKey>().unwrap(), key);
        }
        assert!(matches!(
            "nope".parse::<StepKey>(),
            Err(DispatchError::UnknownStep(_))
        ));
    }

    #[test]
    fn test_current_step_serializes_as_string() {
        let json = serde_json::to_string(&CurrentStep::Step(StepKey::MoreArticles)).unwrap();
        assert_eq!(json, "\"more_articles\"");
        let done: CurrentStep = serde_json::from_str("\"done\"").unwrap();
        assert!(done.is_done());
    }

    #[test]
    fn test_chart_declares_generation_context() {
        let chart = StepKey::Chart.definition();
        assert!(chart.optional_fields.contains(&"context"));
        assert!(!chart.required_fields.contains(&"context"));
    }

    #[test]
    fn test_news_limit_is_four() {
        assert_eq!(StepKey::News.definition().max_selectable, Some(4));
    }

    #[test]
    fn test_only_cosmetic_steps_are_skippable() {
        let skippable: Vec<StepKey> = workflow()
            .into_iter()
            .filter(|d| d.skippable)
            .map(|d| d.key)
            .collect();
        assert_eq!(
            skippable,
            vec![StepKey::Chart, StepKey::MoreArticles, StepKey::Banner]
        );
    }

    #[test]
    fn test_region_validator() {
        let good = Submission::new().with_field("region", "europe");
        assert!(validate_region(&good).is_empty());

        let bad = Submission::new().with_field("region", "antarctica");
        assert_eq!(validate_region(&bad).len(), 1);
    }

    #[test]
    fn test_banner_validator_rejects_non_url() {
        let submission = Submission::new()
            .with_field("image_url", "1")
            .with_field("link", "https://example.com");
        let problems = validate_banner(&submission);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("image_url"));
    }

    #[test]
    fn test_url_fields_need_a_host() {
        for bad in ["https://", "https://not a url", "http://<script>", "ftp://example.com/a.png"] {
            let submission = Submission::new()
                .with_field("image_url", bad)
                .with_field("link", bad);
            assert_eq!(validate_banner(&submission).len(), 2, "accepted {:?}", bad);
        }

        let chart = Submission::new()
            .with_field("image_url", " https://cdn.example.com/chart.png ")
            .with_field("article_url", "http://example.com/research?id=4");
        assert!(validate_chart(&chart).is_empty());
    }

    #[test]
    fn test_submission_skip_and_blank() {
        let submission = Submission::skip().with_field("title", "  ");
        assert!(submission.is_skip());
        assert!(submission.is_blank("title"));
        assert!(submission.is_blank("missing"));
    }
}
