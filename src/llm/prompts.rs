use crate::models::{Entry, Region};

/// System prompt shared by every drafting request
pub const SYSTEM_PROMPT: &str = r#"You draft copy for the Weekly Dispatch, an energy industry newsletter covering battery storage, grid markets and power prices.

RULES:
1. Be factual, specific and analytical. State insights directly.
2. Use neutral, professional language. No marketing speak or hype.
3. Never invent figures, companies or dates that are not in the input.
4. Return only the requested text, with no preamble or explanation."#;

/// Style reference for subject lines
pub const SUBJECT_EXAMPLES: &[&str] = &[
    "Margins in motion",
    "Rules and revenues",
    "Spread the word",
    "Intraday the German way",
    "Flexible Fission",
    "Fees and fundamentals",
];

/// Inline link style used in authored intro HTML
pub const LINK_STYLE: &str = "color:#000000; text-decoration:underline; font-weight:bold;";

pub const INTRO_OPENING: &str = "Good morning and welcome back to the Weekly Dispatch.";

/// Subject line options, one per line
pub fn build_subject_prompt(articles: &[Entry]) -> String {
    let themes = articles
        .iter()
        .map(|a| a.title.as_str())
        .collect::<Vec<_>>()
        .join(" | ");
    let examples = SUBJECT_EXAMPLES
        .iter()
        .map(|ex| format!("- \"{}\"", ex))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Generate 15 catchy email subject lines for this week's newsletter.

The subject lines should be:
- 2-4 words maximum
- Clever wordplay or alliteration preferred
- Professional but engaging
- Related to the topics covered

This week's article topics: {themes}

Style examples (for reference, don't copy):
{examples}

Return only the subject lines, one per line, no numbering or bullets."#
    )
}

/// Intro paragraph with links woven into the prose
pub fn build_intro_prompt(articles: &[Entry]) -> String {
    let article_info = articles
        .iter()
        .take(2)
        .map(|a| {
            format!(
                "- Title: {}\n  URL: {}",
                a.title,
                a.url.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Write a brief intro paragraph (2-3 sentences).

Start with "{INTRO_OPENING}"

Then describe what this week covers, embedding each hyperlink in the sentence where its topic is mentioned. Do not use call-to-action phrases such as "check out" or "read more about".

Featured articles:
{article_info}

Format hyperlinks as: <a href="URL" style="{LINK_STYLE}">short topic phrase</a>

Use short descriptive phrases for the linked text, not full article titles."#
    )
}

/// One factual sentence per news item, one per line, in the given order
pub fn build_news_prompt(items: &[Entry], region: Region) -> String {
    let mut prompt = String::from(
        "Summarize each news item below as one or two factual sentences.\n\n",
    );
    prompt.push_str(&format!("Edition: {}\n\n", region.config().name));

    for (i, item) in items.iter().enumerate() {
        prompt.push_str(&format!("## Item {}\n", i + 1));
        prompt.push_str(&format!("Title: {}\n", item.title));
        if let Some(description) = &item.description {
            prompt.push_str(&format!("Description: {}\n", description));
        }
        if let Some(source) = &item.source {
            prompt.push_str(&format!("Source: {}\n", source));
        }
        prompt.push('\n');
    }

    prompt.push_str(
        "Requirements:\n\
         - Start with the region context when one is clear (\"In Germany, ...\").\n\
         - Include company names, MW figures and dates when available.\n\
         - The first few words should be the key fact.\n\n\
         Return exactly one line per item, in order, with no numbering.",
    );
    prompt
}

/// Intro and outro paragraphs around the chart
pub fn build_chart_prompt(chart_title: &str, context: Option<&str>) -> String {
    let context: String = context.unwrap_or("").chars().take(500).collect();
    format!(
        r#"Write two short paragraphs for a "Chart of the Week" section.

Chart topic: {chart_title}
Article context: {context}

1. INTRO (2-3 sentences): state what the chart shows and the key insight.
2. OUTRO (2-3 sentences): state the practical implication for the market.

Avoid filler such as "This week's chart illustrates" or "It is important to note".

Return as:
INTRO: [text]
OUTRO: [text]"#
    )
}

/// Episode description paragraph
pub fn build_podcast_prompt(episode: &Entry) -> String {
    format!(
        r#"Write a 2-3 sentence description for this podcast episode.

Episode title: {}
Episode notes: {}

Start with "In this week's episode of Transmission, ..." and mention the topics explored.
Wrap guest and company names in <strong></strong>."#,
        episode.title,
        episode.description.as_deref().unwrap_or("")
    )
}
