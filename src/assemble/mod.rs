pub mod templates;

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::error::{DispatchError, Result};
use crate::io::{write_document, DocumentMetadata};
use crate::models::{SessionState, StepKey};

/// Subject used when none was submitted
pub const DEFAULT_SUBJECT: &str = "Weekly Dispatch";

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Configuration for assembly
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Steps that must be complete before assembly
    pub required_steps: Vec<StepKey>,
    /// Character budget of the preview text
    pub preview_chars: usize,
    /// Directory receiving documents and sidecars
    pub output_dir: PathBuf,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            required_steps: crate::models::workflow()
                .into_iter()
                .filter(|d| d.required_for_assembly)
                .map(|d| d.key)
                .collect(),
            preview_chars: 150,
            output_dir: PathBuf::from("output"),
        }
    }
}

/// The pure part of assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub html: String,
    pub subject: String,
    pub preview_text: String,
}

/// A rendered document that has been written to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssembledDocument {
    pub html: String,
    pub subject: String,
    pub preview_text: String,
    pub output_path: PathBuf,
    pub byte_length: usize,
}

/// First required step, in workflow order, that is not complete
pub fn first_missing(state: &SessionState, required: &[StepKey]) -> Option<StepKey> {
    let mut required = required.to_vec();
    required.sort();
    required.into_iter().find(|step| !state.is_complete(*step))
}

/// Render the document for `state`
///
/// Same state in, same bytes out.
pub fn render(state: &SessionState, config: &AssemblerConfig) -> Result<RenderedDocument> {
    if let Some(missing) = first_missing(state, &config.required_steps) {
        return Err(DispatchError::IncompleteState { missing });
    }

    let intro_text = state.text(StepKey::Intro, "text").unwrap_or_default();

    let sections = [
        templates::header(state.region.config()),
        templates::intro(intro_text),
        templates::featured_articles(&state.entries(StepKey::Articles)),
        chart_section(state),
        templates::more_articles(&state.entries(StepKey::MoreArticles)),
        banner_section(state),
        templates::news(&state.entries(StepKey::News)),
        state
            .entries(StepKey::Podcast)
            .first()
            .map(templates::podcast)
            .unwrap_or_default(),
        templates::world_articles(&state.entries(StepKey::World)),
        templates::footer(),
    ];

    let body = sections
        .iter()
        .filter(|s| !s.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(RenderedDocument {
        html: templates::document(&body),
        subject: state
            .text(StepKey::Subject, "subject")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
        preview_text: preview_text(intro_text, config.preview_chars),
    })
}

fn chart_section(state: &SessionState) -> String {
    let step = StepKey::Chart;
    if state.is_skipped(step) {
        return String::new();
    }
    match (state.text(step, "title"), state.text(step, "image_url")) {
        (Some(title), Some(image_url)) => templates::chart(&templates::Chart {
            title,
            image_url,
            intro_text: state.text(step, "intro_text").unwrap_or_default(),
            outro_text: state.text(step, "outro_text").unwrap_or_default(),
            article_url: state.text(step, "article_url").unwrap_or_default(),
        }),
        _ => String::new(),
    }
}

fn banner_section(state: &SessionState) -> String {
    let step = StepKey::Banner;
    if state.is_skipped(step) {
        return String::new();
    }
    match (state.text(step, "image_url"), state.text(step, "link")) {
        (Some(image_url), Some(link)) => templates::banner(
            image_url,
            link,
            state
                .text(step, "alt_text")
                .unwrap_or("Promotional Banner"),
        ),
        _ => String::new(),
    }
}

/// Intro with tags stripped, whitespace collapsed, cut to `max_chars`
pub fn preview_text(intro_html: &str, max_chars: usize) -> String {
    let stripped = TAG_PATTERN.replace_all(intro_html, "");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(max_chars).collect()
}

/// Renders session state and writes the result
#[derive(Debug, Clone, Default)]
pub struct Assembler {
    config: AssemblerConfig,
}

impl Assembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Render without touching the filesystem (browser preview)
    pub fn preview(&self, state: &SessionState) -> Result<RenderedDocument> {
        render(state, &self.config)
    }

    /// Render and write a new document plus its metadata sidecar
    pub fn assemble(&self, state: &SessionState) -> Result<AssembledDocument> {
        let rendered = render(state, &self.config)?;
        let byte_length = rendered.html.len();

        let metadata = DocumentMetadata::new(
            &rendered.subject,
            &rendered.preview_text,
            byte_length,
            state.region,
        );
        let written = write_document(&self.config.output_dir, &rendered.html, metadata)?;

        info!(
            "Assembled {} bytes to {:?} (subject: {:?})",
            byte_length, written.html_path, rendered.subject
        );

        Ok(AssembledDocument {
            html: rendered.html,
            subject: rendered.subject,
            preview_text: rendered.preview_text,
            output_path: written.html_path,
            byte_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entry, Region, Submission};
    use crate::workflow::{CheckpointStore, StepMachine};

    const INTRO: &str = r#"Good morning and welcome back to the Weekly Dispatch. This week, we explore <a href="https://modoenergy.com/a" style="color:#000000;">grid fees</a> and <a href="https://modoenergy.com/b">overbuild risks</a>."#;

    fn entry(title: &str, n: usize) -> Entry {
        Entry::new(title)
            .with_url(format!("https://modoenergy.com/research/{}", n))
            .with_thumbnail(format!("https://img.example/{}.png", n))
            .with_description("A description")
    }

    /// Drive a machine through every step
    fn completed_state(dir: &tempfile::TempDir) -> SessionState {
        let mut m = StepMachine::new(CheckpointStore::new(dir.path(), "assemble"));
        m.submit(StepKey::Region, Submission::new().with_field("region", "europe"))
            .unwrap();
        m.submit(
            StepKey::Articles,
            Submission::new()
                .with_item(entry("New rules for German battery storage", 1))
                .with_item(entry("Germany's fundamentals risk", 2)),
        )
        .unwrap();
        m.submit(
            StepKey::Subject,
            Submission::new().with_field("subject", "Fees and fundamentals"),
        )
        .unwrap();
        m.submit(StepKey::Intro, Submission::new().with_field("text", INTRO))
            .unwrap();
        m.submit(
            StepKey::News,
            Submission::new().with_item(entry("Gresham House has completed its merger", 3)),
        )
        .unwrap();
        m.submit(
            StepKey::Chart,
            Submission::new()
                .with_field("title", "What 78 GW of batteries would do")
                .with_field("image_url", "https://img.example/chart.png")
                .with_field("intro_text", "Grid operators approved 78 GW."),
        )
        .unwrap();
        m.submit(StepKey::MoreArticles, Submission::skip()).unwrap();
        m.submit(StepKey::Banner, Submission::skip()).unwrap();
        m.submit(
            StepKey::Podcast,
            Submission::new().with_item(entry("Automation, AI and market enforcement", 4)),
        )
        .unwrap();
        m.submit(
            StepKey::World,
            Submission::new().with_item(entry("NEM Buildout Report", 5)),
        )
        .unwrap();
        m.submit(StepKey::Assemble, Submission::new()).unwrap();
        m.state().clone()
    }

    #[test]
    fn test_render_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let state = completed_state(&dir);
        let config = AssemblerConfig::default();

        let first = render(&state, &config).unwrap();
        let second = render(&state, &config).unwrap();
        assert_eq!(first.html, second.html);
        assert_eq!(first.preview_text, second.preview_text);
    }

    #[test]
    fn test_assemble_twice_same_bytes_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let state = completed_state(&dir);
        let assembler = Assembler::new(AssemblerConfig {
            output_dir: dir.path().join("output"),
            ..Default::default()
        });

        let a = assembler.assemble(&state).unwrap();
        let b = assembler.assemble(&state).unwrap();
        assert_eq!(a.html, b.html);
        assert_eq!(a.preview_text, b.preview_text);
        assert_ne!(a.output_path, b.output_path);
        assert_eq!(a.byte_length, a.html.len());
        assert_eq!(std::fs::read_to_string(&a.output_path).unwrap(), a.html);
    }

    #[test]
    fn test_incomplete_state_names_first_missing_step() {
        let mut state = SessionState::new();
        for step in [StepKey::Region, StepKey::Articles, StepKey::Subject, StepKey::Intro] {
            state.completed_steps.insert(step);
        }
        state.refresh_current_step();

        match render(&state, &AssemblerConfig::default()).unwrap_err() {
            DispatchError::IncompleteState { missing } => assert_eq!(missing, StepKey::News),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_optional_steps_not_required() {
        let mut state = SessionState::new();
        for step in AssemblerConfig::default().required_steps {
            state.completed_steps.insert(step);
        }
        assert!(render(&state, &AssemblerConfig::default()).is_ok());
    }

    #[test]
    fn test_skipped_sections_render_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = completed_state(&dir);
        let html = render(&state, &AssemblerConfig::default()).unwrap().html;

        assert!(!html.contains("PROMOTIONAL BANNER"));
        assert!(!html.contains("MORE ARTICLES"));
        assert!(html.contains("CHART OF THE WEEK"));
        assert!(html.contains("Europe &amp; GB Edition"));
    }

    #[test]
    fn test_section_order() {
        let dir = tempfile::tempdir().unwrap();
        let html = render(&completed_state(&dir), &AssemblerConfig::default())
            .unwrap()
            .html;
        let markers = [
            "<!-- HEADER -->",
            "<!-- INTRO -->",
            "<!-- FEATURED ARTICLES -->",
            "<!-- CHART OF THE WEEK -->",
            "<!-- THIS WEEK'S NEWS -->",
            "<!-- PODCAST -->",
            "<!-- MORE FROM AROUND THE WORLD -->",
            "<!-- FOOTER -->",
        ];
        let positions: Vec<usize> = markers.iter().map(|m| html.find(m).unwrap()).collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_subject_and_preview() {
        let dir = tempfile::tempdir().unwrap();
        let rendered = render(&completed_state(&dir), &AssemblerConfig::default()).unwrap();
        assert_eq!(rendered.subject, "Fees and fundamentals");
        assert!(rendered.preview_text.starts_with("Good morning and welcome back"));
        assert!(!rendered.preview_text.contains('<'));
        assert!(rendered.preview_text.chars().count() <= 150);
    }

    #[test]
    fn test_preview_text() {
        assert_eq!(preview_text("<p>Hello   <b>there</b></p>", 150), "Hello there");
        assert_eq!(preview_text("abcdef", 3), "abc");
        assert_eq!(preview_text("", 10), "");
    }

    #[test]
    fn test_default_subject() {
        let mut state = SessionState::new();
        state.region = Region::Us;
        let config = AssemblerConfig {
            required_steps: vec![],
            ..Default::default()
        };
        assert_eq!(render(&state, &config).unwrap().subject, DEFAULT_SUBJECT);
    }
}
