//! Handlers for hosts that bypass the generic fetch-and-extract pipeline
//!
//! Video links are answered with a transcript and title; search result
//! pages are unwrapped into their target URLs and processed as a batch.

pub mod search;
pub mod youtube;

pub use search::search_url;
pub use youtube::{preferred_track, Transcript, TranscriptSource, TranscriptTrack, YouTubeTranscripts};
