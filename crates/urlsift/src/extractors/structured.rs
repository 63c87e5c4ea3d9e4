//! Structured text formats: XML, YAML, CSV
//!
//! XML is converted to a JSON tree: attributes become `@name` keys, text
//! next to attributes or children becomes `#text`, repeated child elements
//! become arrays, and text-only elements collapse to strings.

use crate::error::ProcessError;
use crate::extractors::Extractor;
use crate::types::ExtractionResult;
use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

/// Converts XML documents into JSON trees
pub struct XmlExtractor;

#[async_trait]
impl Extractor for XmlExtractor {
    fn name(&self) -> &'static str {
        "xml"
    }

    async fn extract(&self, content: &[u8]) -> Result<ExtractionResult, ProcessError> {
        let xml = String::from_utf8_lossy(content);
        Ok(ExtractionResult::Document(xml_to_json(&xml)?))
    }
}

/// Parses YAML documents into JSON values
pub struct YamlExtractor;

#[async_trait]
impl Extractor for YamlExtractor {
    fn name(&self) -> &'static str {
        "yaml"
    }

    async fn extract(&self, content: &[u8]) -> Result<ExtractionResult, ProcessError> {
        let yaml = String::from_utf8_lossy(content);
        let value: Value =
            serde_yaml::from_str(&yaml).map_err(|e| ProcessError::decode("yaml", e))?;
        Ok(ExtractionResult::Document(value))
    }
}

/// Reads CSV into rows of cells, no header handling
pub struct CsvExtractor;

#[async_trait]
impl Extractor for CsvExtractor {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn extract(&self, content: &[u8]) -> Result<ExtractionResult, ProcessError> {
        let text = String::from_utf8_lossy(content);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ProcessError::decode("csv", e))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(ExtractionResult::Rows(rows))
    }
}

/// Element under construction
#[derive(Default)]
struct XmlNode {
    name: String,
    attributes: Map<String, Value>,
    children: Map<String, Value>,
    text: String,
}

impl XmlNode {
    fn open(start: &BytesStart<'_>) -> Result<Self, ProcessError> {
        let mut node = XmlNode {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            ..Default::default()
        };
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ProcessError::decode("xml", e))?;
            let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
            let value = attr
                .unescape_value()
                .map_err(|e| ProcessError::decode("xml", e))?;
            node.attributes.insert(key, Value::String(value.into_owned()));
        }
        Ok(node)
    }

    fn add_child(&mut self, name: String, value: Value) {
        match self.children.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.children.insert(name, value);
            }
        }
    }

    fn into_value(self) -> (String, Value) {
        let text = self.text.trim().to_string();
        if self.attributes.is_empty() && self.children.is_empty() {
            let value = if text.is_empty() {
                Value::Null
            } else {
                Value::String(text)
            };
            return (self.name, value);
        }

        let mut object = self.attributes;
        object.extend(self.children);
        if !text.is_empty() {
            object.insert("#text".to_string(), Value::String(text));
        }
        (self.name, Value::Object(object))
    }
}

fn xml_to_json(xml: &str) -> Result<Value, ProcessError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    // Bottom of the stack collects top-level elements
    let mut stack = vec![XmlNode::default()];

    loop {
        match reader
            .read_event()
            .map_err(|e| ProcessError::decode("xml", e))?
        {
            Event::Start(start) => stack.push(XmlNode::open(&start)?),
            Event::Empty(start) => {
                let (name, value) = XmlNode::open(&start)?.into_value();
                if let Some(parent) = stack.last_mut() {
                    parent.add_child(name, value);
                }
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    return Err(ProcessError::decode("xml", "unexpected closing tag"));
                }
                if let Some(node) = stack.pop() {
                    let (name, value) = node.into_value();
                    if let Some(parent) = stack.last_mut() {
                        parent.add_child(name, value);
                    }
                }
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| ProcessError::decode("xml", e))?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(ProcessError::decode("xml", "unclosed element"));
    }
    let root = stack.remove(0);
    Ok(Value::Object(root.children))
}
