//! Opaque and text extractors

use crate::error::ProcessError;
use crate::extractors::Extractor;
use crate::types::ExtractionResult;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};

/// Decodes text and source files, replacing invalid UTF-8
pub struct TextExtractor;

#[async_trait]
impl Extractor for TextExtractor {
    fn name(&self) -> &'static str {
        "text"
    }

    async fn extract(&self, content: &[u8]) -> Result<ExtractionResult, ProcessError> {
        Ok(ExtractionResult::Text(
            String::from_utf8_lossy(content).into_owned(),
        ))
    }
}

/// Encodes images as standard base64
pub struct ImageExtractor;

#[async_trait]
impl Extractor for ImageExtractor {
    fn name(&self) -> &'static str {
        "image"
    }

    async fn extract(&self, content: &[u8]) -> Result<ExtractionResult, ProcessError> {
        Ok(ExtractionResult::Text(general_purpose::STANDARD.encode(content)))
    }
}

/// Returns a fixed advisory instead of content
pub struct AdvisoryExtractor {
    name: &'static str,
    advisory: &'static str,
}

impl AdvisoryExtractor {
    pub fn new(name: &'static str, advisory: &'static str) -> Self {
        Self { name, advisory }
    }
}

#[async_trait]
impl Extractor for AdvisoryExtractor {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn extract(&self, _content: &[u8]) -> Result<ExtractionResult, ProcessError> {
        Ok(ExtractionResult::Text(self.advisory.to_string()))
    }
}
