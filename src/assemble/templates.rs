//! Fixed HTML section templates.
//!
//! Values taken from entries are escaped. Intro and chart copy are authored
//! HTML (they carry inline links) and are inserted as given.

use crate::models::{Entry, RegionConfig};

const RESEARCH_URL: &str = "https://modoenergy.com/research";

/// Wrap the joined sections in the document shell
pub fn document(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en" xmlns="http://www.w3.org/1999/xhtml">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta http-equiv="X-UA-Compatible" content="IE=edge">
    <meta name="x-apple-disable-message-reformatting">
    <title>Weekly Dispatch</title>
    <style type="text/css">
        body {{ margin: 0; padding: 0; width: 100% !important; -webkit-text-size-adjust: 100%; -ms-text-size-adjust: 100%; }}
        table {{ border-collapse: collapse; }}
        img {{ border: 0; outline: none; text-decoration: none; -ms-interpolation-mode: bicubic; }}
        a img {{ border: none; }}
    </style>
</head>
<body style="margin:0; padding:0; background-color:#f5f5f5;">
    <center style="width:100%; background-color:#f5f5f5;">
        <table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0" style="background-color:#f5f5f5;">
            <tr>
                <td align="center" valign="top">
                    <table role="presentation" width="600" cellpadding="0" cellspacing="0" border="0" align="center" style="max-width:600px; background-color:#ffffff;">
                        <tr>
                            <td>
{body}
                            </td>
                        </tr>
                    </table>
                </td>
            </tr>
        </table>
    </center>
</body>
</html>"#
    )
}

pub fn header(region: &RegionConfig) -> String {
    format!(
        r#"<!-- HEADER -->
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0" style="border-collapse:collapse; background-color:#ffffff;">
  <tr>
    <td align="center" style="padding:24px 24px 16px;">
      <a href="{url}" target="_blank" style="display:block; text-decoration:none;">
        <img src="{src}" alt="{alt}" width="560" style="display:block; border:0; width:100%; max-width:560px;">
      </a>
    </td>
  </tr>
</table>"#,
        url = RESEARCH_URL,
        src = escape_html(region.header_url),
        alt = escape_html(region.header_alt),
    )
}

pub fn intro(text: &str) -> String {
    format!(
        r#"<!-- INTRO -->
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0">
  <tr>
    <td style="padding:0 24px 24px; font-family:Arial,sans-serif; font-size:16px; line-height:24px; color:#000000;">
      {text}
    </td>
  </tr>
</table>"#
    )
}

/// One card, two stacked cards, or one card followed by two side by side
pub fn featured_articles(entries: &[Entry]) -> String {
    let cards = match entries {
        [] => return String::new(),
        [only] => vec![article_card(only, "12px 24px 24px")],
        [first, second] => vec![
            article_card(first, "12px 24px 24px"),
            article_card(second, "0 24px 24px"),
        ],
        [first, second, third, ..] => vec![
            article_card(first, "12px 24px 24px"),
            side_by_side(second, third),
        ],
    };

    format!(
        r#"<!-- FEATURED ARTICLES -->
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0" style="border-collapse:collapse; background-color:#ffffff;">
  <tr>
    <td align="center" style="padding:0;">
      <table role="presentation" width="600" cellpadding="0" cellspacing="0" border="0" align="center"
             style="max-width:600px; border-collapse:collapse; font-family:Arial,sans-serif; color:#000000;">

        {cards}

      </table>
    </td>
  </tr>
</table>"#,
        cards = cards.join("\n\n")
    )
}

fn article_card(entry: &Entry, padding: &str) -> String {
    format!(
        r#"<tr>
  <td style="padding:{padding};">
    <a href="{url}" target="_blank" style="text-decoration:none; color:#000000;">
      <img src="{thumb}" alt="{title}" width="552" style="display:block; border:0; width:100%; max-width:552px;">
      <h2 style="margin:16px 0 8px; font-size:20px; line-height:26px;">{title}</h2>
    </a>
    <p style="margin:0; font-size:14px; line-height:21px;">{description}</p>
  </td>
</tr>"#,
        url = escape_opt(&entry.url),
        thumb = escape_opt(&entry.thumbnail_url),
        title = escape_html(&entry.title),
        description = escape_opt(&entry.description),
    )
}

fn half_card(entry: &Entry) -> String {
    format!(
        r#"<td width="50%" valign="top" style="padding:0 6px;">
          <a href="{url}" target="_blank" style="text-decoration:none; color:#000000;">
            <img src="{thumb}" alt="{title}" width="264" style="display:block; border:0; width:100%;">
            <h3 style="margin:12px 0 0; font-size:16px; line-height:22px;">{title}</h3>
          </a>
        </td>"#,
        url = escape_opt(&entry.url),
        thumb = escape_opt(&entry.thumbnail_url),
        title = escape_html(&entry.title),
    )
}

fn side_by_side(left: &Entry, right: &Entry) -> String {
    format!(
        r#"<tr>
  <td align="center" style="padding:0 24px 24px;">
    <table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0">
      <tr>
        {left}
        {right}
      </tr>
    </table>
  </td>
</tr>"#,
        left = half_card(left),
        right = half_card(right),
    )
}

/// Chart of the week; `intro_text` and `outro_text` are authored HTML
pub struct Chart<'a> {
    pub title: &'a str,
    pub image_url: &'a str,
    pub intro_text: &'a str,
    pub outro_text: &'a str,
    pub article_url: &'a str,
}

pub fn chart(chart: &Chart<'_>) -> String {
    format!(
        r#"<!-- CHART OF THE WEEK -->
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0">
  <tr>
    <td style="padding:0 24px 24px; font-family:Arial,sans-serif; color:#000000;">
      <h2 style="margin:0 0 12px; font-size:20px;">Chart of the week: {title}</h2>
      <p style="margin:0 0 12px; font-size:14px; line-height:21px;">{intro}</p>
      <a href="{article}" target="_blank"><img src="{image}" alt="{title}" width="552" style="display:block; border:0; width:100%;"></a>
      <p style="margin:12px 0 0; font-size:14px; line-height:21px;">{outro}</p>
    </td>
  </tr>
</table>"#,
        title = escape_html(chart.title),
        intro = chart.intro_text,
        outro = chart.outro_text,
        article = escape_html(chart.article_url),
        image = escape_html(chart.image_url),
    )
}

/// Compact inline list below the chart
pub fn more_articles(entries: &[Entry]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let items: Vec<String> = entries
        .iter()
        .map(|entry| {
            format!(
                r#"      <li style="margin:0 0 8px;"><a href="{url}" target="_blank" style="color:#000000; font-weight:bold;">{title}</a></li>"#,
                url = escape_opt(&entry.url),
                title = escape_html(&entry.title),
            )
        })
        .collect();

    format!(
        r#"<!-- MORE ARTICLES -->
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0">
  <tr>
    <td style="padding:0 24px 24px; font-family:Arial,sans-serif; font-size:14px; line-height:21px;">
      <ul style="margin:0; padding-left:18px;">
{items}
      </ul>
    </td>
  </tr>
</table>"#,
        items = items.join("\n")
    )
}

pub fn banner(image_url: &str, link: &str, alt_text: &str) -> String {
    format!(
        r#"<!-- PROMOTIONAL BANNER -->
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0">
  <tr>
    <td align="center" style="padding:0 24px 24px;">
      <a href="{link}" target="_blank"><img src="{image}" alt="{alt}" width="552" style="display:block; border:0; width:100%;"></a>
    </td>
  </tr>
</table>"#,
        link = escape_html(link),
        image = escape_html(image_url),
        alt = escape_html(alt_text),
    )
}

/// Bold linked headline followed by the description
pub fn news(entries: &[Entry]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let items: Vec<String> = entries.iter().map(news_item).collect();

    format!(
        r#"<!-- THIS WEEK'S NEWS -->
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0">
  <tr>
    <td style="padding:0 24px 24px; font-family:Arial,sans-serif; color:#000000;">
      <h2 style="margin:0 0 12px; font-size:20px;">This week's news</h2>
{items}
    </td>
  </tr>
</table>"#,
        items = items.join("\n")
    )
}

fn news_item(entry: &Entry) -> String {
    let headline = match &entry.url {
        Some(url) => format!(
            r#"<a href="{}" style="color:#000000; text-decoration:none; font-weight:bold;">{}</a>"#,
            escape_html(url),
            escape_html(&entry.title)
        ),
        None => format!("<strong>{}</strong>", escape_html(&entry.title)),
    };
    let body = match entry.description.as_deref().map(str::trim) {
        Some(d) if !d.is_empty() => format!(", {}", escape_html(d.trim_start_matches(", "))),
        _ => ".".to_string(),
    };
    format!(
        r#"      <p style="margin:0 0 12px; font-size:14px; line-height:21px;">{headline}{body}</p>"#
    )
}

pub fn podcast(entry: &Entry) -> String {
    format!(
        r#"<!-- PODCAST -->
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0">
  <tr>
    <td style="padding:0 24px 24px; font-family:Arial,sans-serif; color:#000000;">
      <h2 style="margin:0 0 12px; font-size:20px;">This week's podcast</h2>
      <a href="{url}" target="_blank" style="text-decoration:none; color:#000000;">
        <img src="{thumb}" alt="{title}" width="552" style="display:block; border:0; width:100%;">
        <h3 style="margin:12px 0 8px; font-size:16px;">{title}</h3>
      </a>
      <p style="margin:0; font-size:14px; line-height:21px;">{description}</p>
    </td>
  </tr>
</table>"#,
        url = escape_opt(&entry.url),
        thumb = escape_opt(&entry.thumbnail_url),
        title = escape_html(&entry.title),
        description = escape_opt(&entry.description),
    )
}

/// At most three thumbnails with titles
pub fn world_articles(entries: &[Entry]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let items: Vec<String> = entries
        .iter()
        .take(3)
        .map(|entry| {
            format!(
                r#"      <tr>
        <td width="120" valign="top" style="padding:0 12px 12px 0;"><a href="{url}" target="_blank"><img src="{thumb}" alt="{title}" width="120" style="display:block; border:0;"></a></td>
        <td valign="top" style="padding:0 0 12px;"><a href="{url}" target="_blank" style="color:#000000; font-weight:bold; text-decoration:none;">{title}</a></td>
      </tr>"#,
                url = escape_opt(&entry.url),
                thumb = escape_opt(&entry.thumbnail_url),
                title = escape_html(&entry.title),
            )
        })
        .collect();

    format!(
        r#"<!-- MORE FROM AROUND THE WORLD -->
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0">
  <tr>
    <td style="padding:0 24px 24px; font-family:Arial,sans-serif; font-size:14px;">
      <h2 style="margin:0 0 12px; font-size:20px;">More from around the world</h2>
      <table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0">
{items}
      </table>
    </td>
  </tr>
</table>"#,
        items = items.join("\n")
    )
}

pub fn footer() -> String {
    format!(
        r#"<!-- FOOTER -->
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0" style="background-color:#000000;">
  <tr>
    <td align="center" style="padding:24px; font-family:Arial,sans-serif; font-size:12px; line-height:18px; color:#ffffff;">
      <a href="{url}" target="_blank" style="color:#ffffff;">Read more research</a><br>
      You are receiving this email because you subscribed to the Weekly Dispatch.<br>
      <a href="{{{{unsubscribe_link}}}}" style="color:#ffffff;">Unsubscribe</a>
    </td>
  </tr>
</table>"#,
        url = RESEARCH_URL
    )
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn escape_opt(value: &Option<String>) -> String {
    value.as_deref().map(escape_html).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str) -> Entry {
        Entry::new(title).with_url(format!("https://modoenergy.com/{}", title.len()))
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Fees" & 'tariffs'</b>"#),
            "&lt;b&gt;&quot;Fees&quot; &amp; &#39;tariffs&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_featured_layouts() {
        let one = featured_articles(&[entry("a")]);
        assert_eq!(one.matches("<h2").count(), 1);

        let two = featured_articles(&[entry("a"), entry("bb")]);
        assert_eq!(two.matches("<h2").count(), 2);
        assert!(!two.contains("<h3"));

        let three = featured_articles(&[entry("a"), entry("bb"), entry("ccc")]);
        assert_eq!(three.matches("<h2").count(), 1);
        assert_eq!(three.matches("<h3").count(), 2);

        assert!(featured_articles(&[]).is_empty());
    }

    #[test]
    fn test_news_item_body() {
        let with_body = news(&[entry("Gresham House completes merger")
            .with_description(", creating a £2.7 billion platform.")]);
        assert!(with_body.contains("Gresham House completes merger</a>, creating a £2.7 billion platform."));

        let bare = news(&[Entry::new("Headline only")]);
        assert!(bare.contains("<strong>Headline only</strong>."));
    }

    #[test]
    fn test_world_articles_capped_at_three() {
        let entries: Vec<Entry> = (0..5).map(|i| entry(&"x".repeat(i + 1))).collect();
        assert_eq!(world_articles(&entries).matches("<img").count(), 3);
    }

    #[test]
    fn test_footer_keeps_merge_tag() {
        assert!(footer().contains("{{unsubscribe_link}}"));
    }
}
