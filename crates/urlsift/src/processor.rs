//! Processor builder and the three URL operations

use crate::classify::{classify, Category};
use crate::error::ProcessError;
use crate::events::{EventSink, Emitter};
use crate::extractors::{
    Extractor, ExtractorRegistry, FfprobeProbe, VideoProbe, UNSUPPORTED_ADVISORY,
};
use crate::special::{search, youtube, TranscriptSource, YouTubeTranscripts};
use crate::transport::{HttpTransport, Transport, DEFAULT_TIMEOUT};
use crate::types::{
    BatchItem, ExtractionResult, MultiResult, ProcessMultipleUrlsRequest, ProcessUrlRequest,
    ResponseEnvelope, SearchWebRequest, UrlInput, UrlOutcome,
};
use crate::{DEFAULT_MULTIPLE_URLS_GUIDANCE, DEFAULT_USER_AGENT, TOOL_DESCRIPTION, TOOL_LLMTXT};
use futures::future::{join_all, BoxFuture};
use schemars::schema_for;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Default cap on concurrently processed URLs in a batch
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Builder for configuring a [`Processor`]
#[derive(Default)]
pub struct ProcessorBuilder {
    user_agent: Option<String>,
    timeout: Option<Duration>,
    max_concurrency: Option<usize>,
    multiple_urls_guidance: Option<String>,
    transcript_languages: Option<Vec<String>>,
    event_sink: Option<Arc<dyn EventSink>>,
    transport: Option<Arc<dyn Transport>>,
    transcripts: Option<Arc<dyn TranscriptSource>>,
    video_probe: Option<Arc<dyn VideoProbe>>,
    extractors: Vec<(Category, Arc<dyn Extractor>)>,
}

impl ProcessorBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the User-Agent sent with every request
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set the per-fetch timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set how many URLs of a batch may be in flight at once (minimum 1)
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max);
        self
    }

    /// Set the guidance string attached to batch results
    pub fn multiple_urls_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.multiple_urls_guidance = Some(guidance.into());
        self
    }

    /// Set preferred transcript language codes, most preferred first
    pub fn transcript_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transcript_languages = Some(languages.into_iter().map(Into::into).collect());
        self
    }

    /// Receive progress events
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Replace the HTTP transport
    ///
    /// `user_agent` and `timeout` only configure the default transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the transcript source
    pub fn transcripts(mut self, source: Arc<dyn TranscriptSource>) -> Self {
        self.transcripts = Some(source);
        self
    }

    /// Replace the video metadata prober
    pub fn video_probe(mut self, probe: Arc<dyn VideoProbe>) -> Self {
        self.video_probe = Some(probe);
        self
    }

    /// Register an extractor for a category, replacing the default one
    pub fn extractor(mut self, category: Category, extractor: Arc<dyn Extractor>) -> Self {
        self.extractors.push((category, extractor));
        self
    }

    /// Build the processor
    pub fn build(self) -> Result<Processor, ProcessError> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(
                self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT),
                self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            )?),
        };
        let transcripts = self
            .transcripts
            .unwrap_or_else(|| Arc::new(YouTubeTranscripts::new(transport.clone())));
        let video_probe = self
            .video_probe
            .unwrap_or_else(|| Arc::new(FfprobeProbe::default()));

        let mut registry = ExtractorRegistry::with_defaults(video_probe);
        for (category, extractor) in self.extractors {
            registry.register(category, extractor);
        }

        Ok(Processor {
            transport,
            transcripts,
            registry: Arc::new(registry),
            max_concurrency: self.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY).max(1),
            multiple_urls_guidance: self
                .multiple_urls_guidance
                .unwrap_or_else(|| DEFAULT_MULTIPLE_URLS_GUIDANCE.to_string()),
            transcript_languages: self
                .transcript_languages
                .unwrap_or_else(|| vec!["en".to_string()]),
            emitter: Emitter::new(self.event_sink),
        })
    }
}

/// Classifies, fetches and extracts URLs
///
/// Cloning is cheap; clones share the transport and extractors.
#[derive(Clone)]
pub struct Processor {
    transport: Arc<dyn Transport>,
    transcripts: Arc<dyn TranscriptSource>,
    registry: Arc<ExtractorRegistry>,
    max_concurrency: usize,
    multiple_urls_guidance: String,
    transcript_languages: Vec<String>,
    emitter: Emitter,
}

impl Processor {
    /// Create a new processor builder
    pub fn builder() -> ProcessorBuilder {
        ProcessorBuilder::new()
    }

    /// Processor with default configuration
    pub fn new() -> Result<Self, ProcessError> {
        ProcessorBuilder::new().build()
    }

    /// Get tool description
    pub fn description(&self) -> &'static str {
        TOOL_DESCRIPTION
    }

    /// Get full documentation (llmtxt)
    pub fn llmtxt(&self) -> &'static str {
        TOOL_LLMTXT
    }

    /// Concurrency cap applied to batches
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Process a single URL
    ///
    /// Errors from fetching or extraction are returned as-is. Video links
    /// and search pages short-circuit the generic pipeline.
    pub fn process_url<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<UrlOutcome, ProcessError>> {
        // Boxed because search pages recurse through process_multiple_urls
        Box::pin(self.process_url_inner(url))
    }

    async fn process_url_inner(&self, url: &str) -> Result<UrlOutcome, ProcessError> {
        self.emitter.status("Checking known domains..", false);
        let (parsed, category) = classify(url)?;

        match category {
            Category::Youtube => {
                debug!(url, "Using video transcript handler");
                let result = youtube::process(
                    url,
                    &parsed,
                    self.transport.as_ref(),
                    self.transcripts.as_ref(),
                    &self.transcript_languages,
                    &self.emitter,
                )
                .await?;
                return Ok(UrlOutcome::Youtube(result));
            }
            Category::Search => {
                debug!(url, "Using search handler");
                let results = self.process_search(url).await?;
                return Ok(UrlOutcome::Search(Box::new(results)));
            }
            _ => {}
        }

        self.emitter.status("Fetching content..", false);
        let content = self.transport.get(url).await?;

        self.emitter.status("Checking file type..", false);
        let data = match self.registry.get(category) {
            Some(extractor) => {
                let label = if parsed.extension.is_empty() {
                    "website"
                } else {
                    parsed.extension.as_str()
                };
                debug!(extractor = extractor.name(), url, "Using extractor");
                self.emitter.status(format!("Processing {label} file.."), false);
                let data = extractor.extract(&content).await?;
                self.emitter.status(format!("Processed {label} file"), true);
                data
            }
            None if parsed.extension.is_empty() => {
                return Err(ProcessError::UnsupportedFormat(format!(
                    "no extractor for {category} content at {url}"
                )));
            }
            None => {
                debug!(url, extension = %parsed.extension, "Unsupported file format");
                self.emitter.message("unsupported file format!");
                ExtractionResult::Text(UNSUPPORTED_ADVISORY.to_string())
            }
        };

        Ok(UrlOutcome::Envelope(ResponseEnvelope {
            url: url.to_string(),
            filename: parsed.filename,
            category,
            size: content.len() as u64,
            checksum: hex::encode(Sha256::digest(&content)),
            domain: parsed.domain,
            data,
        }))
    }

    async fn process_search(&self, url: &str) -> Result<MultiResult, ProcessError> {
        let page = self.transport.get(url).await?;
        self.emitter.status("Processing search..", false);
        let urls = search::result_urls(&String::from_utf8_lossy(&page));
        debug!(url, results = urls.len(), "Processing search results");
        Ok(self.process_multiple_urls(urls).await)
    }

    /// Process many URLs concurrently
    ///
    /// At most `max_concurrency` URLs from this call are in flight. The cap
    /// is per call: a search URL in the batch runs its own nested batch under
    /// a separate cap. Failures become error records in their slot; results
    /// keep input order.
    pub async fn process_multiple_urls<I>(&self, urls: I) -> MultiResult
    where
        I: IntoIterator,
        I::Item: Into<UrlInput>,
    {
        let inputs: Vec<UrlInput> = urls.into_iter().map(Into::into).collect();
        let semaphore = Semaphore::new(self.max_concurrency);

        let tasks = inputs.iter().enumerate().map(|(i, input)| {
            let semaphore = &semaphore;
            async move {
                let url = input.url();
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(e) => return BatchItem::failed(url, e),
                };
                match self.process_url(url).await {
                    Ok(outcome) => {
                        self.emitter.message(format!("Processed link {i}\n"));
                        BatchItem::Ok(outcome)
                    }
                    Err(e) => {
                        warn!(url, "Failed to process URL: {}", e);
                        BatchItem::failed(url, e)
                    }
                }
            }
        });
        let results = join_all(tasks).await;

        self.emitter.status("Processed all links", true);
        MultiResult {
            results,
            ai_instructions: self.multiple_urls_guidance.clone(),
        }
    }

    /// Search the web and process the result pages
    pub async fn search_web(&self, query: &str) -> Result<UrlOutcome, ProcessError> {
        self.process_url(&search::search_url(query)).await
    }

    /// Most recent information about a topic, found by searching the web
    pub async fn latest_information(&self, query: &str) -> Result<UrlOutcome, ProcessError> {
        self.search_web(query).await
    }
}

/// Name, description and input schema of one exposed operation
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// The operations exposed to tool-calling hosts
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "process_url",
            description: TOOL_DESCRIPTION,
            input_schema: schema_value(schema_for!(ProcessUrlRequest)),
        },
        ToolSpec {
            name: "process_multiple_urls",
            description: "Processes several URLs concurrently. Accepts the same content types as process_url; use it instead of process_url when given more than one URL.",
            input_schema: schema_value(schema_for!(ProcessMultipleUrlsRequest)),
        },
        ToolSpec {
            name: "search_web",
            description: "Searches the web for a query and processes the result pages.",
            input_schema: schema_value(schema_for!(SearchWebRequest)),
        },
    ]
}

fn schema_value(schema: schemars::schema::RootSchema) -> Value {
    serde_json::to_value(schema).unwrap_or_default()
}
