//! Core types for urlsift

use crate::classify::Category;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Structured summary of an HTML page
///
/// Empty collections and absent fields are omitted from the wire form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WebpageSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paragraphs: Vec<String>,

    /// Alt text of images
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    /// Text of elements whose class or id names a content fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<ClassMatches>,

    /// Anchor targets, only when nothing else could be extracted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,

    /// Advisory when the page yielded nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Per-fragment element text collected by class/id matching
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClassMatches {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<Vec<String>>,
}

impl ClassMatches {
    /// Slot for a fragment name
    pub(crate) fn slot_mut(&mut self, fragment: &str) -> Option<&mut Option<Vec<String>>> {
        match fragment {
            "content" => Some(&mut self.content),
            "description" => Some(&mut self.description),
            "title" => Some(&mut self.title),
            "text" => Some(&mut self.text),
            "article" => Some(&mut self.article),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.description.is_none()
            && self.title.is_none()
            && self.text.is_none()
            && self.article.is_none()
    }
}

/// Tag and stream properties of an audio file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Seconds
    pub duration: f64,
    /// kbps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samplerate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
}

/// Container and stream properties of a video file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoMetadata {
    /// Seconds
    pub duration: Option<f64>,
    pub fps: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub has_audio: bool,
    pub audio_channels: Option<u32>,
    pub audio_fps: Option<u32>,
    /// Raw container information reported by the prober
    pub misc: Option<serde_json::Value>,
}

/// Transcript of a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptSummary {
    /// "(code) name", e.g. "(en) English"
    pub language: String,
    pub auto_generated: bool,
    pub content: String,
    pub words: usize,
}

/// Result of the video-transcript branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct YoutubeResult {
    /// Always "youtube"
    #[serde(rename = "type")]
    pub kind: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<TranscriptSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Category-specific extraction payload
///
/// The shape varies by category; the envelope around it is the stable
/// contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ExtractionResult {
    Webpage(WebpageSummary),
    Audio(AudioMetadata),
    Video(VideoMetadata),
    /// Archive entries, PDF pages
    Listing(Vec<String>),
    /// CSV rows
    Rows(Vec<Vec<String>>),
    /// XML and YAML documents as JSON trees
    Document(serde_json::Value),
    /// Decoded text, base64 payloads and advisories
    Text(String),
}

/// Normalized response for a single fetched URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResponseEnvelope {
    pub url: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub category: Category,
    /// Exact number of bytes fetched
    pub size: u64,
    /// SHA-256 of the fetched bytes, lowercase hex
    pub checksum: String,
    pub domain: String,
    pub data: ExtractionResult,
}

/// Outcome of processing one URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum UrlOutcome {
    Envelope(ResponseEnvelope),
    Youtube(YoutubeResult),
    /// Search pages fan out into a batch
    Search(Box<MultiResult>),
}

impl UrlOutcome {
    pub fn as_envelope(&self) -> Option<&ResponseEnvelope> {
        match self {
            UrlOutcome::Envelope(envelope) => Some(envelope),
            _ => None,
        }
    }
}

/// One slot of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum BatchItem {
    Ok(UrlOutcome),
    /// Single-element list holding the error description
    Failed(Vec<String>),
}

impl BatchItem {
    pub(crate) fn failed(url: &str, err: impl std::fmt::Display) -> Self {
        BatchItem::Failed(vec![format!("ERROR processing URL {url}: {err}")])
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, BatchItem::Ok(_))
    }

    pub fn outcome(&self) -> Option<&UrlOutcome> {
        match self {
            BatchItem::Ok(outcome) => Some(outcome),
            BatchItem::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            BatchItem::Failed(messages) => messages.first().map(String::as_str),
            BatchItem::Ok(_) => None,
        }
    }
}

/// Aggregated batch response, results in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MultiResult {
    pub results: Vec<BatchItem>,
    pub ai_instructions: String,
}

/// A batch input: a bare URL or a one-key mapping holding it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum UrlInput {
    Plain(String),
    Wrapped { url: String },
}

impl UrlInput {
    pub fn url(&self) -> &str {
        match self {
            UrlInput::Plain(url) | UrlInput::Wrapped { url } => url,
        }
    }
}

impl From<&str> for UrlInput {
    fn from(url: &str) -> Self {
        UrlInput::Plain(url.to_string())
    }
}

impl From<String> for UrlInput {
    fn from(url: String) -> Self {
        UrlInput::Plain(url)
    }
}

/// Arguments of the `process_url` tool
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ProcessUrlRequest {
    /// The URL to process (website, document, media, archive, video link...)
    pub url: String,
}

/// Arguments of the `process_multiple_urls` tool
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ProcessMultipleUrlsRequest {
    /// URLs to process concurrently
    pub urls: Vec<UrlInput>,
}

/// Arguments of the `search_web` tool
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SearchWebRequest {
    /// Free-text search query
    pub query: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webpage_summary_omits_empty_fields() {
        let summary = WebpageSummary {
            title: Some("Home".to_string()),
            paragraphs: vec!["Hello".to_string()],
            ..Default::default()
        };
        let json = serde_json::to_value(&summary).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert!(!obj.contains_key("headers"));
        assert!(!obj.contains_key("classes"));
        assert!(!obj.contains_key("message"));
    }

    #[test]
    fn test_envelope_keys() {
        let envelope = ResponseEnvelope {
            url: "https://example.com/a.txt".to_string(),
            filename: "a.txt".to_string(),
            category: Category::PlainText,
            size: 5,
            checksum: "00".repeat(32),
            domain: "example.com".to_string(),
            data: ExtractionResult::Text("hello".to_string()),
        };
        let json = serde_json::to_value(&envelope).unwrap();
        for key in ["filename", "type", "size", "checksum", "domain", "data"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["type"], "plain_text");
        assert_eq!(json["data"], "hello");
    }

    #[test]
    fn test_url_input_accepts_both_shapes() {
        let inputs: Vec<UrlInput> =
            serde_json::from_str(r#"["https://a.com", {"url": "https://b.com"}]"#).unwrap();
        assert_eq!(inputs[0].url(), "https://a.com");
        assert_eq!(inputs[1].url(), "https://b.com");
    }

    #[test]
    fn test_failed_batch_item_shape() {
        let item = BatchItem::failed("https://a.com", "boom");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, serde_json::json!(["ERROR processing URL https://a.com: boom"]));
        assert!(!item.is_ok());
        assert_eq!(item.error(), Some("ERROR processing URL https://a.com: boom"));
    }

    #[test]
    fn test_youtube_result_type_tag() {
        let result = YoutubeResult {
            kind: Category::Youtube,
            title: Some("Video".to_string()),
            transcript: None,
            error: Some("no subtitles".to_string()),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "youtube");
        assert!(json.get("transcript").is_none());
    }
}
