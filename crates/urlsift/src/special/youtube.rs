//! Video-transcript branch
//!
//! Resolves the video id, fetches a transcript (preferred languages first,
//! then whatever track exists) and the page title. A missing transcript is
//! reported in the result's `error` field instead of failing the call.

use crate::classify::{Category, ParsedUrl};
use crate::error::ProcessError;
use crate::events::Emitter;
use crate::extractors::webpage::extract_title;
use crate::transport::Transport;
use crate::types::{TranscriptSummary, YoutubeResult};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Watch page used to discover caption tracks
const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Error text placed on the result when no transcript is available
pub const NO_TRANSCRIPT_MESSAGE: &str =
    "couldn't find subtitles. tell the user the title of the video!";

/// A transcript track offered for a video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptTrack {
    pub language_code: String,
    /// Human readable language name
    pub language: String,
    /// Auto-generated (speech recognition) track
    pub is_generated: bool,
    /// Where the track's captions can be fetched
    pub base_url: String,
}

/// A fetched transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub language_code: String,
    pub language: String,
    pub is_generated: bool,
    pub snippets: Vec<String>,
}

impl Transcript {
    /// Collapse into the wire summary
    pub fn summarize(&self) -> TranscriptSummary {
        let content = self.snippets.join(" ");
        TranscriptSummary {
            language: format!("({}) {}", self.language_code, self.language),
            auto_generated: self.is_generated,
            words: content.split_whitespace().count(),
            content,
        }
    }
}

/// Source of video transcripts
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// All tracks available for a video
    async fn list(&self, video_id: &str) -> Result<Vec<TranscriptTrack>, ProcessError>;

    /// Fetch the captions of one track
    async fn fetch_track(&self, track: &TranscriptTrack) -> Result<Transcript, ProcessError>;
}

/// First track matching `languages` in preference order, manual tracks first
pub fn preferred_track<'a>(
    tracks: &'a [TranscriptTrack],
    languages: &[String],
) -> Option<&'a TranscriptTrack> {
    languages.iter().find_map(|lang| {
        tracks
            .iter()
            .filter(|t| &t.language_code == lang)
            .min_by_key(|t| t.is_generated)
    })
}

/// Transcript source reading caption tracks from the YouTube watch page
pub struct YouTubeTranscripts {
    transport: Arc<dyn Transport>,
}

impl YouTubeTranscripts {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl TranscriptSource for YouTubeTranscripts {
    async fn list(&self, video_id: &str) -> Result<Vec<TranscriptTrack>, ProcessError> {
        let page = self.transport.get(&format!("{WATCH_URL}{video_id}")).await?;
        parse_caption_tracks(&String::from_utf8_lossy(&page))
    }

    async fn fetch_track(&self, track: &TranscriptTrack) -> Result<Transcript, ProcessError> {
        // srv3 is a richer format; the default timedtext XML is enough here
        let url = track.base_url.replace("&fmt=srv3", "");
        let xml = self.transport.get(&url).await?;
        let snippets = parse_timedtext(&String::from_utf8_lossy(&xml))?;
        if snippets.is_empty() {
            return Err(ProcessError::Transcript("empty transcript".to_string()));
        }
        Ok(Transcript {
            language_code: track.language_code.clone(),
            language: track.language.clone(),
            is_generated: track.is_generated,
            snippets,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrackJson {
    base_url: String,
    language_code: String,
    #[serde(default)]
    name: CaptionName,
    #[serde(default)]
    kind: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionName {
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<CaptionRun>,
}

#[derive(Deserialize)]
struct CaptionRun {
    text: String,
}

/// Extract caption tracks from the player response embedded in a watch page
fn parse_caption_tracks(html: &str) -> Result<Vec<TranscriptTrack>, ProcessError> {
    const MARKER: &str = "\"captionTracks\":";
    let start = html
        .find(MARKER)
        .ok_or_else(|| ProcessError::Transcript("transcripts are disabled".to_string()))?;

    let rest = &html[start + MARKER.len()..];
    let tracks = serde_json::Deserializer::from_str(rest)
        .into_iter::<Vec<CaptionTrackJson>>()
        .next()
        .ok_or_else(|| ProcessError::Transcript("caption list missing".to_string()))?
        .map_err(|e| ProcessError::Transcript(format!("unreadable caption list: {e}")))?;

    Ok(tracks
        .into_iter()
        .map(|t| {
            let language = t
                .name
                .simple_text
                .unwrap_or_else(|| t.name.runs.into_iter().map(|r| r.text).collect());
            TranscriptTrack {
                is_generated: t.kind.as_deref() == Some("asr"),
                language_code: t.language_code,
                language,
                base_url: t.base_url,
            }
        })
        .collect())
}

/// Text of every `<text>` element of a timedtext document
fn parse_timedtext(xml: &str) -> Result<Vec<String>, ProcessError> {
    let mut reader = Reader::from_str(xml);
    let mut snippets = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader
            .read_event()
            .map_err(|e| ProcessError::Transcript(format!("unreadable captions: {e}")))?
        {
            Event::Start(e) if e.name().as_ref() == b"text" => current = Some(String::new()),
            Event::Text(t) => {
                if let Some(buf) = current.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| ProcessError::Transcript(format!("unreadable captions: {e}")))?;
                    buf.push_str(&text);
                }
            }
            Event::End(e) if e.name().as_ref() == b"text" => {
                if let Some(text) = current.take() {
                    let text = unescape_entities(&text).replace('\n', " ");
                    let text = text.trim();
                    if !text.is_empty() {
                        snippets.push(text.to_string());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(snippets)
}

/// Captions are HTML-escaped inside the XML escaping
fn unescape_entities(text: &str) -> String {
    text.replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Video identifier: `v` query parameter, or the last path segment for
/// short links
pub fn video_id(parsed: &ParsedUrl) -> Result<String, ProcessError> {
    let id = if parsed.is_short_video_link() {
        parsed.path.split('/').rev().find(|s| !s.is_empty())
    } else {
        parsed.query_value("v")
    };

    match id.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(ProcessError::MalformedUrl(format!(
            "no video id found in {}{}",
            parsed.domain, parsed.path
        ))),
    }
}

/// Preferred-language transcript, falling back to the first listed track
///
/// Tracks are listed once; the fallback reuses that listing.
async fn find_transcript(
    source: &dyn TranscriptSource,
    video_id: &str,
    languages: &[String],
) -> Result<Transcript, ProcessError> {
    let tracks = source.list(video_id).await?;
    let first = tracks
        .first()
        .ok_or_else(|| ProcessError::Transcript("no transcripts listed".to_string()))?;

    match preferred_track(&tracks, languages) {
        Some(track) => match source.fetch_track(track).await {
            Ok(transcript) => return Ok(transcript),
            Err(e) if track == first => return Err(e),
            Err(e) => debug!(video_id, "Preferred transcript unavailable ({}), trying any track", e),
        },
        None => debug!(video_id, "No transcript in {}, trying any track", languages.join(", ")),
    }
    source.fetch_track(first).await
}

/// Run the video branch for an already classified URL
pub(crate) async fn process(
    url: &str,
    parsed: &ParsedUrl,
    transport: &dyn Transport,
    source: &dyn TranscriptSource,
    languages: &[String],
    emitter: &Emitter,
) -> Result<YoutubeResult, ProcessError> {
    let id = video_id(parsed)?;
    emitter.status("Processing youtube video..", false);

    let transcript = find_transcript(source, &id, languages).await;

    let page = transport.get(url).await?;
    let title = extract_title(&String::from_utf8_lossy(&page));

    let mut result = YoutubeResult {
        kind: Category::Youtube,
        title,
        transcript: None,
        error: None,
    };
    match transcript {
        Ok(transcript) => result.transcript = Some(transcript.summarize()),
        Err(e) => {
            warn!(video_id = %id, "No transcript available: {}", e);
            result.error = Some(NO_TRANSCRIPT_MESSAGE.to_string());
        }
    }

    emitter.status("Processed youtube video", true);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn track(code: &str, generated: bool) -> TranscriptTrack {
        TranscriptTrack {
            language_code: code.to_string(),
            language: format!("lang-{code}"),
            is_generated: generated,
            base_url: format!("https://captions.test/{code}/{generated}"),
        }
    }

    /// In-memory transcript source counting calls
    struct FakeSource {
        tracks: Vec<TranscriptTrack>,
        broken: Vec<String>,
        calls: AtomicUsize,
        listed: AtomicUsize,
        fetched: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn new(tracks: Vec<TranscriptTrack>) -> Self {
            Self {
                tracks,
                broken: Vec::new(),
                calls: AtomicUsize::new(0),
                listed: AtomicUsize::new(0),
                fetched: Mutex::new(Vec::new()),
            }
        }

        /// Tracks whose captions fail to download
        fn with_broken(mut self, base_url: &str) -> Self {
            self.broken.push(base_url.to_string());
            self
        }
    }

    #[async_trait]
    impl TranscriptSource for FakeSource {
        async fn list(&self, _video_id: &str) -> Result<Vec<TranscriptTrack>, ProcessError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.listed.fetch_add(1, Ordering::SeqCst);
            Ok(self.tracks.clone())
        }

        async fn fetch_track(&self, track: &TranscriptTrack) -> Result<Transcript, ProcessError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.fetched.lock().unwrap().push(track.base_url.clone());
            if self.broken.contains(&track.base_url) {
                return Err(ProcessError::Transcript("captions unavailable".to_string()));
            }
            Ok(Transcript {
                language_code: track.language_code.clone(),
                language: track.language.clone(),
                is_generated: track.is_generated,
                snippets: vec!["hello there".to_string(), "general kenobi".to_string()],
            })
        }
    }

    struct PageTransport;

    #[async_trait]
    impl Transport for PageTransport {
        async fn get(&self, _url: &str) -> Result<Bytes, ProcessError> {
            Ok(Bytes::from_static(
                b"<html><head><title> A Video - YouTube </title></head></html>",
            ))
        }
    }

    fn parsed(url: &str) -> ParsedUrl {
        ParsedUrl::parse(url).unwrap()
    }

    #[test]
    fn test_video_id_from_query() {
        let id = video_id(&parsed("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42")).unwrap();
        assert_eq!(id, "dQw4w9WgXcQ");
    }

    #[test]
    fn test_video_id_from_short_link() {
        let id = video_id(&parsed("https://youtu.be/dQw4w9WgXcQ?si=abc")).unwrap();
        assert_eq!(id, "dQw4w9WgXcQ");
    }

    #[test]
    fn test_video_id_missing() {
        assert!(matches!(
            video_id(&parsed("https://www.youtube.com/watch?list=PL1")),
            Err(ProcessError::MalformedUrl(_))
        ));
        assert!(matches!(
            video_id(&parsed("https://youtu.be/")),
            Err(ProcessError::MalformedUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_url_fails_before_transcript_lookup() {
        let source = FakeSource::new(vec![track("en", false)]);
        let url = "https://www.youtube.com/watch?feature=share";
        let err = process(
            url,
            &parsed(url),
            &PageTransport,
            &source,
            &["en".to_string()],
            &Emitter::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProcessError::MalformedUrl(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_preferred_language_manual_track() {
        let source = FakeSource::new(vec![track("de", false), track("en", true), track("en", false)]);
        let transcript = find_transcript(&source, "id", &["en".to_string()]).await.unwrap();
        assert_eq!(transcript.language_code, "en");
        assert!(!transcript.is_generated);
    }

    #[tokio::test]
    async fn test_falls_back_to_first_track() {
        let source = FakeSource::new(vec![track("de", true), track("fr", false)]);
        let transcript = find_transcript(&source, "id", &["en".to_string()]).await.unwrap();
        assert_eq!(transcript.language_code, "de");
        assert_eq!(
            source.fetched.lock().unwrap().as_slice(),
            ["https://captions.test/de/true"]
        );
    }

    #[tokio::test]
    async fn test_failed_preferred_track_reuses_listing() {
        let source = FakeSource::new(vec![track("de", false), track("en", false)])
            .with_broken("https://captions.test/en/false");
        let transcript = find_transcript(&source, "id", &["en".to_string()]).await.unwrap();

        assert_eq!(transcript.language_code, "de");
        assert_eq!(source.listed.load(Ordering::SeqCst), 1);
        assert_eq!(
            source.fetched.lock().unwrap().as_slice(),
            ["https://captions.test/en/false", "https://captions.test/de/false"]
        );
    }

    #[tokio::test]
    async fn test_failed_first_track_is_not_retried() {
        let source = FakeSource::new(vec![track("en", false)])
            .with_broken("https://captions.test/en/false");
        let err = find_transcript(&source, "id", &["en".to_string()]).await.unwrap_err();

        assert!(matches!(err, ProcessError::Transcript(_)));
        assert_eq!(source.listed.load(Ordering::SeqCst), 1);
        assert_eq!(source.fetched.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_preferred_track_order() {
        let tracks = vec![track("de", false), track("en", true), track("en", false)];
        let languages = ["fr".to_string(), "en".to_string(), "de".to_string()];
        let chosen = preferred_track(&tracks, &languages).unwrap();
        assert_eq!(chosen.base_url, "https://captions.test/en/false");
        assert!(preferred_track(&tracks, &["fr".to_string()]).is_none());
    }

    #[tokio::test]
    async fn test_result_with_transcript() {
        let source = FakeSource::new(vec![track("en", true)]);
        let url = "https://www.youtube.com/watch?v=abc123";
        let result = process(
            url,
            &parsed(url),
            &PageTransport,
            &source,
            &["en".to_string()],
            &Emitter::default(),
        )
        .await
        .unwrap();

        assert_eq!(result.title.as_deref(), Some("A Video - YouTube"));
        assert!(result.error.is_none());
        let transcript = result.transcript.unwrap();
        assert_eq!(transcript.language, "(en) lang-en");
        assert!(transcript.auto_generated);
        assert_eq!(transcript.content, "hello there general kenobi");
        assert_eq!(transcript.words, 4);
    }

    #[tokio::test]
    async fn test_no_transcript_is_not_fatal() {
        let source = FakeSource::new(Vec::new());
        let url = "https://youtu.be/abc123";
        let result = process(
            url,
            &parsed(url),
            &PageTransport,
            &source,
            &["en".to_string()],
            &Emitter::default(),
        )
        .await
        .unwrap();

        assert_eq!(result.title.as_deref(), Some("A Video - YouTube"));
        assert!(result.transcript.is_none());
        assert_eq!(result.error.as_deref(), Some(NO_TRANSCRIPT_MESSAGE));
    }

    #[test]
    fn test_parse_caption_tracks() {
        let html = r#"<script>var ytInitialPlayerResponse = {"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=x&lang=en","name":{"simpleText":"English"},"languageCode":"en","kind":"asr"},{"baseUrl":"https://www.youtube.com/api/timedtext?v=x&lang=de","name":{"runs":[{"text":"Deutsch"}]},"languageCode":"de"}],"audioTracks":[]}}};</script>"#;

        let tracks = parse_caption_tracks(html).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].language, "English");
        assert!(tracks[0].is_generated);
        assert_eq!(tracks[0].base_url, "https://www.youtube.com/api/timedtext?v=x&lang=en");
        assert_eq!(tracks[1].language, "Deutsch");
        assert!(!tracks[1].is_generated);
    }

    #[test]
    fn test_parse_caption_tracks_disabled() {
        assert!(matches!(
            parse_caption_tracks("<html>no captions</html>"),
            Err(ProcessError::Transcript(_))
        ));
    }

    #[test]
    fn test_parse_timedtext() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0" dur="1.5">It&amp;#39;s
alive</text><text start="1.5" dur="1">   </text><text start="2.5" dur="2">&amp;quot;quoted&amp;quot;</text></transcript>"#;
        let snippets = parse_timedtext(xml).unwrap();
        assert_eq!(snippets, vec!["It's alive", "\"quoted\""]);
    }
}
