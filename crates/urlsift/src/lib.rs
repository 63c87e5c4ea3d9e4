//! urlsift - structured, LLM-friendly content from any URL
//!
//! This crate classifies a URL by host and file extension, fetches it, and
//! runs a category-specific extractor over the bytes. Every result is
//! wrapped in the same [`ResponseEnvelope`] (filename, type, size, SHA-256
//! checksum, domain, data) no matter how different the payloads are.
//!
//! ## Pipeline
//!
//! 1. [`classify`] - domain, filename, extension and [`Category`]
//! 2. special hosts - video links resolve to a transcript, search pages fan
//!    out into a batch over their results
//! 3. [`Transport`] - a single GET with user agent and timeout
//! 4. [`ExtractorRegistry`] - static table from category to [`Extractor`]
//!
//! Batches ([`Processor::process_multiple_urls`]) run under a concurrency
//! cap, keep input order and turn per-URL failures into error records.
//!
//! ```no_run
//! # async fn run() -> Result<(), urlsift::ProcessError> {
//! let processor = urlsift::Processor::new()?;
//! let outcome = processor.process_url("https://example.com/report.pdf").await?;
//! println!("{}", serde_json::to_string_pretty(&outcome).unwrap_or_default());
//! # Ok(())
//! # }
//! ```

mod classify;
mod error;
pub mod events;
pub mod extractors;
mod processor;
pub mod special;
pub mod transport;
mod types;

pub use classify::{classify, Category, ParsedUrl};
pub use error::ProcessError;
pub use events::{EventSink, ProgressEvent};
pub use extractors::{dedup, Extractor, ExtractorRegistry, FfprobeProbe, VideoProbe};
pub use processor::{tool_specs, Processor, ProcessorBuilder, ToolSpec, DEFAULT_MAX_CONCURRENCY};
pub use special::{TranscriptSource, YouTubeTranscripts};
pub use transport::{HttpTransport, Transport, DEFAULT_TIMEOUT};
pub use types::{
    AudioMetadata, BatchItem, ClassMatches, ExtractionResult, MultiResult,
    ProcessMultipleUrlsRequest, ProcessUrlRequest, ResponseEnvelope, SearchWebRequest,
    TranscriptSummary, UrlInput, UrlOutcome, VideoMetadata, WebpageSummary, YoutubeResult,
};

/// Default User-Agent string (desktop Chrome)
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.3";

/// Default guidance attached to batch results
pub const DEFAULT_MULTIPLE_URLS_GUIDANCE: &str =
    "describe what was found. include links to the sources.";

/// Tool description for LLM consumption
pub const TOOL_DESCRIPTION: &str = r#"Processes a URL and returns structured content extracted according to its type.

- Websites: title, headers, paragraphs, image alt texts, links as fallback
- Documents: PDF pages, text and source files, XML/YAML/CSV
- Media: audio tags, video metadata, images as base64
- Archives: zip, rar and tar listings
- YouTube links: title and transcript
- Every result carries size and SHA-256 checksum"#;

/// Extended documentation for LLM consumption (llmtxt)
pub const TOOL_LLMTXT: &str = r#"# urlsift

Fetches a URL and extracts structured content based on the host and file extension.

## Tools
- `process_url` - process a single URL
- `process_multiple_urls` - process several URLs concurrently (max 4 at a time)
- `search_web` - search the web and process the result pages

## Input Parameters
- `url` (process_url): The URL to process
- `urls` (process_multiple_urls): List of URLs; `{"url": "..."}` objects are accepted too
- `query` (search_web): Free-text search query

## Output Fields (single URL)
- `url`: The processed URL
- `filename`: Full last path segment, extension included (`report.final.txt`, not `report`)
- `type`: Content category (website, plain_text, source_text, image, xml, yaml, csv, pdf, audio, video, archive_zip, archive_rar, archive_tar, executable, unknown)
- `size`: Number of bytes fetched
- `checksum`: SHA-256 of the fetched bytes (hex)
- `domain`: Host of the URL
- `data`: Extracted content; its shape depends on `type`

YouTube links return `{type: "youtube", title, transcript}` or `{type: "youtube", title, error}` instead.

## Output Fields (multiple URLs / search)
- `results`: One entry per URL in input order; failed URLs hold `["ERROR processing URL ...: reason"]`
- `ai_instructions`: How to present the results

## Examples

### Process a PDF
```json
{"url": "https://example.com/report.pdf"}
```

### Process several pages
```json
{"urls": ["https://example.com", {"url": "https://example.org/data.csv"}]}
```

### Search the web
```json
{"query": "rust async runtime comparison"}
```

## Notes
- Unknown file types return an advisory string instead of failing
- Executables are not analyzed; search the web for information about them
- Pages with nothing to extract return a message suggesting a web search"#;
