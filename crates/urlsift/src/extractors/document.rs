//! PDF text extraction

use crate::error::ProcessError;
use crate::extractors::Extractor;
use crate::types::ExtractionResult;
use async_trait::async_trait;
use lopdf::Document;
use tracing::warn;

/// Extracts the text of every page that has any
pub struct PdfExtractor;

#[async_trait]
impl Extractor for PdfExtractor {
    fn name(&self) -> &'static str {
        "pdf"
    }

    async fn extract(&self, content: &[u8]) -> Result<ExtractionResult, ProcessError> {
        Ok(ExtractionResult::Listing(pdf_pages(content)?))
    }
}

fn pdf_pages(content: &[u8]) -> Result<Vec<String>, ProcessError> {
    let document = Document::load_mem(content).map_err(|e| ProcessError::decode("pdf", e))?;

    let mut pages = Vec::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) if !text.trim().is_empty() => pages.push(text),
            Ok(_) => {}
            Err(e) => warn!(page = page_number, "Skipping unreadable PDF page: {}", e),
        }
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    fn single_page_pdf(text: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_pdf_page_text() {
        let pages = pdf_pages(&single_page_pdf("Hello PDF")).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].contains("Hello PDF"));
    }

    #[tokio::test]
    async fn test_not_a_pdf() {
        let err = PdfExtractor.extract(b"plain text").await.unwrap_err();
        assert!(matches!(err, ProcessError::Decode { format: "pdf", .. }));
    }
}
