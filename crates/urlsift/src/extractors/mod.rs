//! Extractor system for category-specific content extraction
//!
//! Design: each extractor turns fetched bytes into an [`ExtractionResult`].
//! [`ExtractorRegistry`] is a static table from [`Category`] to extractor,
//! filled once at construction.

mod archive;
mod document;
mod media;
mod structured;
mod text;
pub(crate) mod webpage;

pub use archive::{RarExtractor, TarExtractor, ZipExtractor};
pub use document::PdfExtractor;
pub use media::{AudioExtractor, FfprobeProbe, VideoExtractor, VideoProbe};
pub use structured::{CsvExtractor, XmlExtractor, YamlExtractor};
pub use text::{AdvisoryExtractor, ImageExtractor, TextExtractor};
pub use webpage::{extract_webpage, WebpageExtractor};

use crate::classify::Category;
use crate::error::ProcessError;
use crate::types::ExtractionResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Advisory returned for executables
pub const EXECUTABLE_ADVISORY: &str = "user submitted an executable file. use a tool call that searches the web to fetch further information.";

/// Advisory returned for unrecognized formats
pub const UNSUPPORTED_ADVISORY: &str =
    "unsupported file format! you have to use another tool to process this.";

/// Trait for category-specific extractors
///
/// Implementations are pure with respect to the input bytes: no network
/// access, no shared mutable state.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Unique identifier for this extractor (for logging/debugging)
    fn name(&self) -> &'static str;

    /// Turn fetched bytes into a structured result
    async fn extract(&self, content: &[u8]) -> Result<ExtractionResult, ProcessError>;
}

/// Table of extractors keyed by category
pub struct ExtractorRegistry {
    extractors: HashMap<Category, Arc<dyn Extractor>>,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Create a registry with every built-in extractor
    ///
    /// Video probing goes through `video_probe`.
    pub fn with_defaults(video_probe: Arc<dyn VideoProbe>) -> Self {
        let mut registry = Self::new();
        let text: Arc<dyn Extractor> = Arc::new(TextExtractor);

        registry.register(Category::Website, Arc::new(WebpageExtractor));
        registry.register(Category::PlainText, Arc::clone(&text));
        registry.register(Category::SourceText, text);
        registry.register(Category::Image, Arc::new(ImageExtractor));
        registry.register(Category::Xml, Arc::new(XmlExtractor));
        registry.register(Category::Yaml, Arc::new(YamlExtractor));
        registry.register(Category::Csv, Arc::new(CsvExtractor));
        registry.register(Category::Pdf, Arc::new(PdfExtractor));
        registry.register(Category::Audio, Arc::new(AudioExtractor));
        registry.register(Category::Video, Arc::new(VideoExtractor::new(video_probe)));
        registry.register(Category::ArchiveZip, Arc::new(ZipExtractor));
        registry.register(Category::ArchiveRar, Arc::new(RarExtractor));
        registry.register(Category::ArchiveTar, Arc::new(TarExtractor));
        registry.register(
            Category::Executable,
            Arc::new(AdvisoryExtractor::new("executable", EXECUTABLE_ADVISORY)),
        );
        registry
    }

    /// Register (or replace) the extractor for a category
    pub fn register(&mut self, category: Category, extractor: Arc<dyn Extractor>) {
        self.extractors.insert(category, extractor);
    }

    /// Look up the extractor for a category
    pub fn get(&self, category: Category) -> Option<&Arc<dyn Extractor>> {
        self.extractors.get(&category)
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

/// Remove duplicates, keeping the first occurrence of each item
pub fn dedup<T: PartialEq>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
