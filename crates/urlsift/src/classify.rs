//! URL classification
//!
//! Derives domain, filename and extension from a URL and resolves the
//! [`Category`] that selects the extractor. Resolution never fails: an
//! unrecognized extension resolves to [`Category::Unknown`].

use crate::error::ProcessError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// Host fragment identifying the full video host
const VIDEO_HOST_MARKER: &str = "youtube";

/// Exact host of the short-link video host
const VIDEO_SHORT_HOST: &str = "youtu.be";

/// Host fragment identifying the search engine
const SEARCH_HOST_MARKER: &str = "duckduckgo";

const WEBSITE_EXTENSIONS: &[&str] = &["htm", "html", "xhtml", "php", "asp"];

const PLAIN_TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "json", "log", "ini", "conf", "cfg", "toml", "diff", "patch",
];

const SOURCE_TEXT_EXTENSIONS: &[&str] = &[
    "asm", "bas", "bat", "c", "cc", "cgi", "clj", "cpp", "css", "dart", "elm", "erl", "ex", "fs",
    "go", "hs", "java", "jl", "js", "kt", "lisp", "lua", "m", "ml", "pl", "ps1", "psm1", "py",
    "r", "rb", "rs", "s1", "scala", "scm", "sh", "sql", "swift", "ts", "tsx", "vim", "zsh",
];

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "svg", "tiff", "webp", "ico", "raw", "heic", "eps", "ai",
];

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "ogg", "flac", "wma", "aiff", "wav", "aac"];

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "wmv", "mpeg", "mpg", "m4v"];

const TAR_EXTENSIONS: &[&str] = &["tar", "gz", "tgz"];

const EXECUTABLE_EXTENSIONS: &[&str] = &[
    "bin", "exe", "dll", "elf", "msi", "com", "cmd", "msp", "so", "a", "la", "dmg", "app",
    "appimage", "flatpak", "x64", "x86", "arm", "jar", "apk", "deb", "rpm",
];

/// Content category driving extractor selection
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Website,
    PlainText,
    SourceText,
    Image,
    Xml,
    Yaml,
    Csv,
    Pdf,
    Audio,
    Video,
    ArchiveZip,
    ArchiveRar,
    ArchiveTar,
    Executable,
    Youtube,
    Search,
    Unknown,
}

impl Category {
    /// Wire tag of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Website => "website",
            Category::PlainText => "plain_text",
            Category::SourceText => "source_text",
            Category::Image => "image",
            Category::Xml => "xml",
            Category::Yaml => "yaml",
            Category::Csv => "csv",
            Category::Pdf => "pdf",
            Category::Audio => "audio",
            Category::Video => "video",
            Category::ArchiveZip => "archive_zip",
            Category::ArchiveRar => "archive_rar",
            Category::ArchiveTar => "archive_tar",
            Category::Executable => "executable",
            Category::Youtube => "youtube",
            Category::Search => "search",
            Category::Unknown => "unknown",
        }
    }

    /// Map an extension to its category
    ///
    /// The empty extension maps to [`Category::Website`].
    pub fn from_extension(extension: &str) -> Category {
        let ext = extension.to_ascii_lowercase();
        let ext = ext.as_str();
        if ext.is_empty() || WEBSITE_EXTENSIONS.contains(&ext) {
            Category::Website
        } else if PLAIN_TEXT_EXTENSIONS.contains(&ext) {
            Category::PlainText
        } else if SOURCE_TEXT_EXTENSIONS.contains(&ext) {
            Category::SourceText
        } else if IMAGE_EXTENSIONS.contains(&ext) {
            Category::Image
        } else if AUDIO_EXTENSIONS.contains(&ext) {
            Category::Audio
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            Category::Video
        } else {
            match ext {
                "xml" => Category::Xml,
                "yaml" => Category::Yaml,
                "csv" => Category::Csv,
                "pdf" => Category::Pdf,
                "zip" => Category::ArchiveZip,
                "rar" => Category::ArchiveRar,
                _ if TAR_EXTENSIONS.contains(&ext) => Category::ArchiveTar,
                _ if EXECUTABLE_EXTENSIONS.contains(&ext) => Category::Executable,
                _ => Category::Unknown,
            }
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Components of a URL relevant to classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    /// Host with port, empty when the URL has no host
    pub domain: String,
    pub path: String,
    /// Last path segment
    pub filename: String,
    /// Lowercased last dot-segment of the filename, empty without a dot
    pub extension: String,
    pub query: HashMap<String, Vec<String>>,
}

impl ParsedUrl {
    /// Parse a URL string
    pub fn parse(raw: &str) -> Result<Self, ProcessError> {
        let url = Url::parse(raw).map_err(|e| ProcessError::InvalidUrl(format!("{raw}: {e}")))?;
        Ok(Self::from_url(&url))
    }

    /// Derive components from an already parsed URL
    pub fn from_url(url: &Url) -> Self {
        let domain = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };

        let path = url.path().to_string();
        let filename = path.rsplit('/').next().unwrap_or_default().to_string();

        let segments: Vec<&str> = filename.split('.').collect();
        let extension = if segments.len() >= 2 {
            segments[segments.len() - 1].to_lowercase()
        } else {
            String::new()
        };

        let mut query: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in url.query_pairs() {
            query
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }

        Self {
            domain,
            path,
            filename,
            extension,
            query,
        }
    }

    /// First value of a query parameter
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Resolve the category; first matching rule wins
    pub fn category(&self) -> Category {
        let host = self.domain.to_lowercase();
        let host_name = host.split(':').next().unwrap_or_default();

        let is_watch_page = self.path.contains("watch") || self.query.contains_key("v");
        if host.contains(VIDEO_HOST_MARKER) && is_watch_page {
            return Category::Youtube;
        }
        if host_name == VIDEO_SHORT_HOST {
            return Category::Youtube;
        }
        if host.contains(SEARCH_HOST_MARKER) {
            return Category::Search;
        }

        Category::from_extension(&self.extension)
    }

    /// True for the short-link video host
    pub fn is_short_video_link(&self) -> bool {
        self.domain.to_lowercase().split(':').next() == Some(VIDEO_SHORT_HOST)
    }
}

/// Parse a URL and resolve its category in one step
pub fn classify(raw: &str) -> Result<(ParsedUrl, Category), ProcessError> {
    let parsed = ParsedUrl::parse(raw)?;
    let category = parsed.category();
    Ok((parsed, category))
}
