//! Progress notifications
//!
//! Events are fire-and-forget: emission never blocks, never fails, and is a
//! no-op when no sink is installed. Sinks may be called from several
//! workers at once and must not rely on ordering.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Progress update emitted while processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// Pipeline step update
    Status { description: String, done: bool },
    /// Free-form message for the end user
    Message { content: String },
}

impl ProgressEvent {
    /// Create a status event
    pub fn status(description: impl Into<String>, done: bool) -> Self {
        ProgressEvent::Status {
            description: description.into(),
            done,
        }
    }

    /// Create a message event
    pub fn message(content: impl Into<String>) -> Self {
        ProgressEvent::Message {
            content: content.into(),
        }
    }
}

/// Receiver of progress events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl<F> EventSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Optional sink handle shared by all workers
#[derive(Clone, Default)]
pub(crate) struct Emitter(Option<Arc<dyn EventSink>>);

impl Emitter {
    pub(crate) fn new(sink: Option<Arc<dyn EventSink>>) -> Self {
        Self(sink)
    }

    pub(crate) fn status(&self, description: impl Into<String>, done: bool) {
        if let Some(sink) = &self.0 {
            sink.emit(ProgressEvent::status(description, done));
        }
    }

    pub(crate) fn message(&self, content: impl Into<String>) {
        if let Some(sink) = &self.0 {
            sink.emit(ProgressEvent::message(content));
        }
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Emitter").field(&self.0.is_some()).finish()
    }
}
