use anyhow::bail;
use tracing::info;

use super::prompts::{
    build_chart_prompt, build_intro_prompt, build_news_prompt, build_podcast_prompt,
    build_subject_prompt, INTRO_OPENING, LINK_STYLE, SYSTEM_PROMPT,
};
use crate::assemble::templates::escape_html;
use crate::error::{DispatchError, Result};
use crate::models::{Entry, Region, SessionState, StepKey};

/// Longest linked phrase the fallback intro will use
const FALLBACK_LINK_CHARS: usize = 40;
/// News bodies longer than this are cut by the fallback
const FALLBACK_NEWS_CHARS: usize = 150;

/// Everything a generator needs to draft one step's text
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub step: StepKey,
    pub region: Region,
    pub system: String,
    pub prompt: String,
    /// Session entries the prompt was built from
    pub sources: Vec<Entry>,
    /// Free-text subject of the request (the chart title)
    pub topic: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Drafts copy for a step
///
/// Implementations must not touch session state; the caller decides
/// whether to submit what comes back.
#[allow(async_fn_in_trait)]
pub trait Generator {
    /// Name reported in errors and logs
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String>;
}

/// Build the drafting request for `step` from what the session already holds
pub fn build_request(step: StepKey, state: &SessionState) -> anyhow::Result<GenerationRequest> {
    let base = |prompt: String, sources: Vec<Entry>, temperature: f64, max_tokens: u32| {
        GenerationRequest {
            step,
            region: state.region,
            system: SYSTEM_PROMPT.to_string(),
            prompt,
            sources,
            topic: None,
            temperature,
            max_tokens,
        }
    };

    match step {
        StepKey::Subject | StepKey::Intro => {
            let articles = state.entries(StepKey::Articles);
            if articles.is_empty() {
                bail!("no featured articles in the session");
            }
            Ok(if step == StepKey::Subject {
                base(build_subject_prompt(&articles), articles, 0.8, 300)
            } else {
                base(build_intro_prompt(&articles), articles, 0.7, 250)
            })
        }
        StepKey::News => {
            let items = state.entries(StepKey::News);
            if items.is_empty() {
                bail!("no news items in the session");
            }
            let max_tokens = 150 * items.len() as u32;
            Ok(base(
                build_news_prompt(&items, state.region),
                items,
                0.5,
                max_tokens,
            ))
        }
        StepKey::Chart => {
            let Some(title) = state.text(StepKey::Chart, "title") else {
                bail!("chart has no title in the session");
            };
            let prompt = build_chart_prompt(title, state.text(StepKey::Chart, "context"));
            Ok(GenerationRequest {
                topic: Some(title.to_string()),
                ..base(prompt, Vec::new(), 0.7, 300)
            })
        }
        StepKey::Podcast => {
            let episodes = state.entries(StepKey::Podcast);
            let Some(episode) = episodes.first() else {
                bail!("no podcast episode in the session");
            };
            Ok(base(build_podcast_prompt(episode), episodes.clone(), 0.7, 200))
        }
        other => bail!("step `{}` has no generated text", other),
    }
}

/// Draft text for `step`, mapping every failure to [`DispatchError::Generation`]
pub async fn generate_for_step<G: Generator>(
    generator: &G,
    step: StepKey,
    state: &SessionState,
) -> Result<String> {
    let fail = |message: String| DispatchError::Generation {
        step,
        collaborator: generator.name().to_string(),
        message,
    };

    let request = build_request(step, state).map_err(|e| fail(format!("{:#}", e)))?;
    info!("Generating {} text via {}", step, generator.name());

    let text = generator
        .generate(&request)
        .await
        .map_err(|e| fail(format!("{:#}", e)))?;
    let text = text.trim();
    if text.is_empty() {
        return Err(fail("empty response".to_string()));
    }
    Ok(text.to_string())
}

/// Split a subject-line response into options
pub fn parse_subject_options(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim().trim_start_matches("- ").trim_matches('"').trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split an `INTRO: ... OUTRO: ...` response into its two paragraphs
pub fn parse_chart_text(text: &str) -> (String, String) {
    let after_intro = text.split_once("INTRO:").map(|(_, rest)| rest);
    let intro = after_intro
        .map(|rest| rest.split("OUTRO:").next().unwrap_or(rest))
        .unwrap_or_default();
    let outro = text
        .split_once("OUTRO:")
        .map(|(_, rest)| rest)
        .unwrap_or_default();
    (intro.trim().to_string(), outro.trim().to_string())
}

/// Deterministic drafts for use without an API key
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackGenerator;

impl FallbackGenerator {
    fn subject(sources: &[Entry]) -> String {
        let titles: Vec<String> = sources.iter().map(|s| s.title.to_lowercase()).collect();
        let mentions = |words: &[&str]| -> bool {
            titles.iter().any(|t| words.iter().any(|w| t.contains(w)))
        };

        let options: &[&str] = if mentions(&["grid"][..]) && mentions(&["fee", "tariff"][..]) {
            &["Fees and fundamentals", "Grid rules", "Tariff talk"]
        } else if mentions(&["battery", "bess"][..]) {
            &["Battery builds", "Storage signals", "Power plays"]
        } else {
            &["Market moves", "Energy insights", "Weekly roundup"]
        };
        options.join("\n")
    }

    fn intro(sources: &[Entry]) -> String {
        let links: Vec<String> = sources
            .iter()
            .take(2)
            .map(|article| {
                format!(
                    r#"<a href="{}" style="{}">{}</a>"#,
                    escape_html(article.url.as_deref().unwrap_or("")),
                    LINK_STYLE,
                    escape_html(&topic_phrase(&article.title))
                )
            })
            .collect();

        match links.as_slice() {
            [first, second] => format!(
                "{INTRO_OPENING} This week, we examine {first} and explore {second}."
            ),
            [only] => format!("{INTRO_OPENING} This week, we dive into {only}."),
            _ => INTRO_OPENING.to_string(),
        }
    }

    fn news(sources: &[Entry]) -> String {
        sources
            .iter()
            .map(|item| {
                let body = match item.description.as_deref().map(str::trim) {
                    Some(d) if d.chars().count() > FALLBACK_NEWS_CHARS => {
                        let cut: String = d.chars().take(FALLBACK_NEWS_CHARS).collect();
                        format!(", {}...", cut)
                    }
                    Some(d) if !d.is_empty() => format!(", {}", d),
                    _ => ".".to_string(),
                };
                format!("{}{}", item.title.trim(), body)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn chart(topic: &str) -> String {
        format!(
            "INTRO: {} reveals shifting dynamics in the market.\n\
             OUTRO: The data points to changing conditions for operators in this segment.",
            topic
        )
    }

    fn podcast(sources: &[Entry]) -> String {
        let Some(episode) = sources.first() else {
            return String::new();
        };
        match episode.description.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => format!(
                "In this week's episode of Transmission, we explore {}.",
                episode.title.trim().to_lowercase()
            ),
        }
    }
}

impl Generator for FallbackGenerator {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String> {
        let text = match request.step {
            StepKey::Subject => Self::subject(&request.sources),
            StepKey::Intro => Self::intro(&request.sources),
            StepKey::News => Self::news(&request.sources),
            StepKey::Chart => Self::chart(request.topic.as_deref().unwrap_or("This chart")),
            StepKey::Podcast => Self::podcast(&request.sources),
            other => bail!("no fallback text for step `{}`", other),
        };
        Ok(text)
    }
}

/// Short lower-case phrase for an article link
fn topic_phrase(title: &str) -> String {
    let phrase = title.rsplit(':').next().unwrap_or(title).trim();
    let phrase = if phrase.chars().count() > FALLBACK_LINK_CHARS {
        let cut: String = phrase.chars().take(FALLBACK_LINK_CHARS).collect();
        match cut.rsplit_once(' ') {
            Some((head, _)) => head.to_string(),
            None => cut,
        }
    } else {
        phrase.to_string()
    };
    phrase.to_lowercase()
}
