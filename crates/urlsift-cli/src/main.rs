//! urlsift CLI - Command-line interface for URL content extraction

mod mcp;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use urlsift::{
    ExtractionResult, Processor, ProcessError, ProgressEvent, ResponseEnvelope, UrlOutcome,
    YoutubeResult, TOOL_LLMTXT,
};

/// Output format for the process subcommand
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Markdown with YAML frontmatter
    #[default]
    Md,
    /// JSON format
    Json,
}

/// urlsift - structured, LLM-friendly content from any URL
#[derive(Parser, Debug)]
#[command(name = "urlsift")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    config: ConfigArgs,

    /// Print full help with examples (llmtxt)
    #[arg(long)]
    llmtxt: bool,
}

/// Processor settings shared by all subcommands
#[derive(Args, Debug, Clone, Default)]
struct ConfigArgs {
    /// Custom User-Agent
    #[arg(long, global = true)]
    user_agent: Option<String>,

    /// Fetch timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Maximum number of URLs processed at once in a batch
    #[arg(long, global = true)]
    max_concurrency: Option<usize>,

    /// Guidance attached to batch results
    #[arg(long, global = true)]
    guidance: Option<String>,

    /// Preferred transcript language (repeatable)
    #[arg(long = "language", global = true)]
    languages: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as MCP (Model Context Protocol) server over stdio
    Mcp,
    /// Process a URL and print the extracted content
    Process {
        /// URL to process
        url: String,

        /// Output format
        #[arg(long, short, default_value = "md")]
        output: OutputFormat,
    },
    /// Process several URLs concurrently and print the batch as JSON
    Batch {
        /// URLs to process
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Search the web and process the result pages
    Search {
        /// Search query
        #[arg(required = true)]
        query: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Handle --llmtxt flag
    if cli.llmtxt {
        writeln_safe(TOOL_LLMTXT);
        std::process::exit(0);
    }

    init_tracing();

    let processor = match build_processor(&cli.config) {
        Ok(processor) => processor,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Mcp) => {
            mcp::run_server(processor).await;
        }
        Some(Commands::Process { url, output }) => {
            let outcome = processor.process_url(&url).await;
            print_outcome(outcome, output);
        }
        Some(Commands::Batch { urls }) => {
            let results = processor.process_multiple_urls(urls).await;
            print_json(&results);
        }
        Some(Commands::Search { query }) => {
            let outcome = processor.search_web(&query.join(" ")).await;
            print_outcome(outcome, OutputFormat::Json);
        }
        None => {
            eprintln!("Usage: urlsift process <URL>");
            eprintln!("   or: urlsift batch <URL>...");
            eprintln!("   or: urlsift search <QUERY>");
            eprintln!("   or: urlsift mcp");
            eprintln!("   or: urlsift --help");
            std::process::exit(1);
        }
    }
}

/// Logs go to stderr; stdout carries results and MCP traffic
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_processor(config: &ConfigArgs) -> Result<Processor, ProcessError> {
    let mut builder = Processor::builder().event_sink(Arc::new(log_progress));

    if let Some(ref ua) = config.user_agent {
        builder = builder.user_agent(ua);
    }
    if let Some(secs) = config.timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if let Some(max) = config.max_concurrency {
        builder = builder.max_concurrency(max);
    }
    if let Some(ref guidance) = config.guidance {
        builder = builder.multiple_urls_guidance(guidance);
    }
    if !config.languages.is_empty() {
        builder = builder.transcript_languages(config.languages.clone());
    }

    builder.build()
}

fn log_progress(event: ProgressEvent) {
    match event {
        ProgressEvent::Status { description, done } => tracing::info!(done, "{}", description),
        ProgressEvent::Message { content } => tracing::info!("{}", content.trim_end()),
    }
}

fn print_outcome(outcome: Result<UrlOutcome, ProcessError>, output: OutputFormat) {
    match outcome {
        Ok(outcome) => match output {
            OutputFormat::Md => writeln_safe(&format_md(&outcome)),
            OutputFormat::Json => print_json(&outcome),
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error serializing response: {}", e);
        std::process::exit(1);
    });
    writeln_safe(&json);
}

/// Format an outcome as markdown with YAML frontmatter
fn format_md(outcome: &UrlOutcome) -> String {
    match outcome {
        UrlOutcome::Envelope(envelope) => format_envelope_md(envelope),
        UrlOutcome::Youtube(video) => format_youtube_md(video),
        UrlOutcome::Search(results) => serde_json::to_string_pretty(results).unwrap_or_default(),
    }
}

fn format_envelope_md(envelope: &ResponseEnvelope) -> String {
    let mut output = String::new();

    output.push_str("---\n");
    output.push_str(&format!("url: {}\n", envelope.url));
    output.push_str(&format!("filename: {}\n", envelope.filename));
    output.push_str(&format!("type: {}\n", envelope.category));
    output.push_str(&format!("size: {}\n", envelope.size));
    output.push_str(&format!("checksum: {}\n", envelope.checksum));
    output.push_str(&format!("domain: {}\n", envelope.domain));
    output.push_str("---\n");

    // Text payloads verbatim, everything else as JSON
    match &envelope.data {
        ExtractionResult::Text(text) => output.push_str(text),
        data => output.push_str(&serde_json::to_string_pretty(data).unwrap_or_default()),
    }

    output
}

fn format_youtube_md(video: &YoutubeResult) -> String {
    let mut output = String::new();

    output.push_str("---\n");
    output.push_str(&format!("type: {}\n", video.kind));
    if let Some(ref title) = video.title {
        output.push_str(&format!("title: {}\n", title));
    }
    if let Some(ref transcript) = video.transcript {
        output.push_str(&format!("language: {}\n", transcript.language));
        output.push_str(&format!("auto_generated: {}\n", transcript.auto_generated));
        output.push_str(&format!("words: {}\n", transcript.words));
    }
    output.push_str("---\n");

    if let Some(ref transcript) = video.transcript {
        output.push_str(&transcript.content);
    } else if let Some(ref err) = video.error {
        output.push_str(err);
    }

    output
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use urlsift::{Category, TranscriptSummary, WebpageSummary};

    fn envelope(data: ExtractionResult) -> ResponseEnvelope {
        ResponseEnvelope {
            url: "https://example.com/notes.txt".to_string(),
            filename: "notes.txt".to_string(),
            category: Category::PlainText,
            size: 5,
            checksum: "ab".repeat(32),
            domain: "example.com".to_string(),
            data,
        }
    }

    #[test]
    fn test_format_envelope_text_body() {
        let output = format_md(&UrlOutcome::Envelope(envelope(ExtractionResult::Text(
            "hello".to_string(),
        ))));

        assert!(output.starts_with("---\n"));
        assert!(output.contains("url: https://example.com/notes.txt\n"));
        assert!(output.contains("type: plain_text\n"));
        assert!(output.contains("size: 5\n"));
        assert!(output.contains(&format!("checksum: {}\n", "ab".repeat(32))));
        assert!(output.ends_with("---\nhello"));
    }

    #[test]
    fn test_format_envelope_structured_body() {
        let summary = WebpageSummary {
            title: Some("Home".to_string()),
            ..Default::default()
        };
        let output = format_md(&UrlOutcome::Envelope(envelope(ExtractionResult::Webpage(
            summary,
        ))));

        assert!(output.contains("---\n{"));
        assert!(output.contains("\"title\": \"Home\""));
    }

    #[test]
    fn test_format_youtube_transcript() {
        let video = YoutubeResult {
            kind: Category::Youtube,
            title: Some("A talk".to_string()),
            transcript: Some(TranscriptSummary {
                language: "(en) English".to_string(),
                auto_generated: false,
                content: "hello there".to_string(),
                words: 2,
            }),
            error: None,
        };

        let output = format_md(&UrlOutcome::Youtube(video));
        assert!(output.contains("type: youtube\n"));
        assert!(output.contains("title: A talk\n"));
        assert!(output.contains("words: 2\n"));
        assert!(output.ends_with("---\nhello there"));
    }

    #[test]
    fn test_format_youtube_error_as_body() {
        let video = YoutubeResult {
            kind: Category::Youtube,
            title: Some("A talk".to_string()),
            transcript: None,
            error: Some("no subtitles".to_string()),
        };

        let output = format_md(&UrlOutcome::Youtube(video));
        assert!(!output.contains("error:"));
        assert!(output.ends_with("---\nno subtitles"));
    }

    #[test]
    fn test_build_processor_from_flags() {
        let config = ConfigArgs {
            max_concurrency: Some(2),
            timeout: Some(3),
            languages: vec!["de".to_string()],
            ..Default::default()
        };
        let processor = build_processor(&config).unwrap();
        assert_eq!(processor.max_concurrency(), 2);
    }

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from([
            "urlsift",
            "batch",
            "https://a.example",
            "https://b.example",
            "--max-concurrency",
            "2",
            "--language",
            "en",
            "--language",
            "de",
        ])
        .unwrap();

        assert_eq!(cli.config.max_concurrency, Some(2));
        assert_eq!(cli.config.languages, vec!["en", "de"]);
        match cli.command {
            Some(Commands::Batch { urls }) => assert_eq!(urls.len(), 2),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
