//! HTML page extraction
//!
//! Degrades through four tiers until something is produced:
//!
//! 1. `<title>` text
//! 2. headings and paragraphs; final when either list is non-empty, even if
//!    every entry is an empty string
//! 3. raw text of elements whose `class`/`id` names a content fragment
//! 4. anchor targets, then an advisory message
//!
//! Image alt text is collected on every tier.

use crate::error::ProcessError;
use crate::extractors::{dedup, Extractor};
use crate::types::{ClassMatches, ExtractionResult, WebpageSummary};
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Class/id fragments probed by tier 3, in output order
const CONTENT_FRAGMENTS: &[&str] = &["content", "description", "title", "text", "article"];

/// Advisory when no tier produced anything
pub const NOTHING_SCRAPED_MESSAGE: &str = "nothing could be scraped from the page! use a web search tool call to find more information about this website.";

/// Extractor for HTML documents
pub struct WebpageExtractor;

#[async_trait]
impl Extractor for WebpageExtractor {
    fn name(&self) -> &'static str {
        "webpage"
    }

    async fn extract(&self, content: &[u8]) -> Result<ExtractionResult, ProcessError> {
        let html = String::from_utf8_lossy(content);
        Ok(ExtractionResult::Webpage(extract_webpage(&html)))
    }
}

/// Run the tier cascade over an HTML document
pub fn extract_webpage(html: &str) -> WebpageSummary {
    let document = Html::parse_document(html);

    let mut summary = WebpageSummary {
        title: title_of(&document),
        headers: trimmed_texts(&document, "h1, h2, h3, h4, h5, h6"),
        paragraphs: trimmed_texts(&document, "p"),
        images: image_alts(&document),
        ..Default::default()
    };

    if !summary.headers.is_empty() || !summary.paragraphs.is_empty() {
        return summary;
    }

    debug!("No headers or paragraphs, falling back to class/id matching");
    let classes = class_matches(&document);
    if !classes.is_empty() {
        summary.classes = Some(classes);
        return summary;
    }

    debug!("No class/id matches, falling back to links");
    summary.urls = links_of(&document);
    if summary.urls.is_empty() {
        summary.message = Some(NOTHING_SCRAPED_MESSAGE.to_string());
    }

    summary
}

/// First `<title>` text, trimmed
pub(crate) fn extract_title(html: &str) -> Option<String> {
    title_of(&Html::parse_document(html))
}

/// Every anchor `href`, deduplicated in document order
pub(crate) fn extract_links(html: &str) -> Vec<String> {
    links_of(&Html::parse_document(html))
}

fn select_all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn text_of(element: &ElementRef<'_>) -> String {
    element.text().collect()
}

fn title_of(document: &Html) -> Option<String> {
    select_all(document, "title")
        .first()
        .map(|title| text_of(title).trim().to_string())
}

fn trimmed_texts(document: &Html, css: &str) -> Vec<String> {
    dedup(
        select_all(document, css)
            .iter()
            .map(|element| text_of(element).trim().to_string()),
    )
}

fn image_alts(document: &Html) -> Vec<String> {
    dedup(
        select_all(document, "img[alt]")
            .iter()
            .filter_map(|img| img.value().attr("alt"))
            .filter(|alt| !alt.is_empty())
            .map(str::to_string),
    )
}

fn links_of(document: &Html) -> Vec<String> {
    dedup(
        select_all(document, "a[href]")
            .iter()
            .filter_map(|a| a.value().attr("href"))
            .map(str::to_string),
    )
}

/// Whole-word match of each fragment against `class`, then `id`
fn class_matches(document: &Html) -> ClassMatches {
    let with_class = select_all(document, "[class]");
    let with_id = select_all(document, "[id]");
    let mut matches = ClassMatches::default();

    for fragment in CONTENT_FRAGMENTS {
        let Ok(pattern) = Regex::new(&format!(r"\b{}\b", regex::escape(fragment))) else {
            continue;
        };

        let by_class = with_class
            .iter()
            .filter(|el| el.value().attr("class").is_some_and(|v| pattern.is_match(v)));
        let by_id = with_id
            .iter()
            .filter(|el| el.value().attr("id").is_some_and(|v| pattern.is_match(v)));

        let texts = dedup(
            by_class
                .chain(by_id)
                .map(text_of)
                .filter(|text| !text.is_empty()),
        );

        if texts.is_empty() {
            continue;
        }
        if let Some(slot) = matches.slot_mut(fragment) {
            *slot = Some(texts);
        }
    }

    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_two_is_final() {
        let html = r#"<html><head><title>  My Page </title></head><body>
            <h1>Welcome</h1><h2>Intro</h2><h1>Welcome</h1>
            <p>First.</p><p>  </p><p>Second.</p><p>First.</p>
            <div class="content">ignored</div>
            <a href="/x">x</a>
            <img alt="A cat"><img alt=""><img alt="A cat"><img src="y.png">
        </body></html>"#;

        let summary = extract_webpage(html);
        assert_eq!(summary.title.as_deref(), Some("My Page"));
        assert_eq!(summary.headers, vec!["Welcome", "Intro"]);
        assert_eq!(summary.paragraphs, vec!["First.", "", "Second."]);
        assert_eq!(summary.images, vec!["A cat"]);
        assert!(summary.classes.is_none());
        assert!(summary.urls.is_empty());
        assert!(summary.message.is_none());
    }

    #[test]
    fn test_tier_three_class_and_id_matching() {
        let html = r#"<html><body>
            <div class="main content">Body text</div>
            <span id="content">Body text</span>
            <section id="page-description">About us</section>
            <div class="contents">plural is not a whole word</div>
            <div class="textual">neither is this</div>
            <a href="/ignored">link</a>
        </body></html>"#;

        let summary = extract_webpage(html);
        let classes = summary.classes.expect("tier 3 should fire");
        assert_eq!(classes.content, Some(vec!["Body text".to_string()]));
        assert_eq!(classes.description, Some(vec!["About us".to_string()]));
        assert!(classes.text.is_none());
        assert!(classes.title.is_none());
        assert!(classes.article.is_none());
        assert!(summary.urls.is_empty());
        assert!(summary.message.is_none());

        let json = serde_json::to_value(ExtractionResult::Webpage(extract_webpage(html))).unwrap();
        assert!(json["classes"].get("text").is_none());
    }

    #[test]
    fn test_empty_heading_keeps_tier_two_final() {
        let summary = extract_webpage(r#"<h1></h1><div class="content">Body</div>"#);
        assert_eq!(summary.headers, vec![""]);
        assert!(summary.paragraphs.is_empty());
        assert!(summary.classes.is_none());
        assert!(summary.urls.is_empty());
        assert!(summary.message.is_none());
    }

    #[test]
    fn test_tier_three_keeps_raw_text() {
        let html = r#"<body><div class="content">  Body
 </div><div id="text"></div></body>"#;
        let classes = extract_webpage(html).classes.expect("tier 3 should fire");
        assert_eq!(classes.content, Some(vec!["  Body\n ".to_string()]));
        assert!(classes.text.is_none());
    }

    #[test]
    fn test_tier_four_links() {
        let html = r#"<html><head><title>Links</title></head><body>
            <a href="https://a.com">a</a><a href="/b">b</a><a href="https://a.com">again</a><a>none</a>
        </body></html>"#;

        let summary = extract_webpage(html);
        assert_eq!(summary.title.as_deref(), Some("Links"));
        assert_eq!(summary.urls, vec!["https://a.com", "/b"]);
        assert!(summary.classes.is_none());
        assert!(summary.message.is_none());
    }

    #[test]
    fn test_nothing_scraped_message() {
        let html = r#"<html><head><title>Empty</title></head><body><img alt="logo"></body></html>"#;

        let summary = extract_webpage(html);
        assert_eq!(summary.message.as_deref(), Some(NOTHING_SCRAPED_MESSAGE));
        assert_eq!(summary.images, vec!["logo"]);

        let json = serde_json::to_value(&summary).unwrap();
        for key in ["headers", "paragraphs", "classes", "urls"] {
            assert!(json.get(key).is_none(), "unexpected {key}");
        }
    }

    #[test]
    fn test_missing_title_is_omitted() {
        let summary = extract_webpage("<p>just text</p>");
        assert!(summary.title.is_none());
        assert_eq!(summary.paragraphs, vec!["just text"]);
    }

    #[test]
    fn test_extract_helpers() {
        let html = r#"<title> T </title><a href="1">1</a><a href="2">2</a><a href="1">1</a>"#;
        assert_eq!(extract_title(html).as_deref(), Some("T"));
        assert_eq!(extract_links(html), vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_extractor_decodes_lossy() {
        let mut bytes = b"<p>caf".to_vec();
        bytes.push(0xff);
        bytes.extend_from_slice(b"</p>");
        let result = WebpageExtractor.extract(&bytes).await.unwrap();
        match result {
            ExtractionResult::Webpage(summary) => {
                assert_eq!(summary.paragraphs, vec!["caf\u{fffd}"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
