use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use pdf_topic_core::{
    extract_page_texts, read_pdf, AnswerPolicy, ClassifierOptions, ErrorKind, GeminiConfig,
    GeminiGateway, PageText, RelevanceOutcome, RelevancePipeline, DEFAULT_GEMINI_ENDPOINT,
    DEFAULT_GEMINI_MODEL,
};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const EXIT_BACKEND_FAILURE: u8 = 1;
const EXIT_BAD_INPUT: u8 = 2;
const EXIT_TOPIC_NOT_FOUND: u8 = 3;

#[derive(Parser)]
#[command(name = "pdf-topic", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
    model: String,

    /// Gemini API base URL
    #[arg(long, env = "GEMINI_ENDPOINT", default_value = DEFAULT_GEMINI_ENDPOINT)]
    endpoint: String,

    /// Number of per-page LLM calls in flight at once.
    #[arg(long, default_value = "1")]
    concurrency: usize,

    /// Timeout for a single LLM call, in seconds.
    #[arg(long, default_value = "60")]
    timeout_secs: u64,

    /// Retries for transient LLM failures (rate limits, 5xx, timeouts).
    #[arg(long, default_value = "0")]
    max_retries: u32,

    /// Only accept a bare YES as an affirmative answer.
    #[arg(long, default_value_t = false)]
    strict_answers: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether a topic is discussed in a PDF and list the relevant pages.
    Check {
        /// Path to the PDF file.
        #[arg(long)]
        file: String,
        /// Topic to look for.
        #[arg(long)]
        topic: String,
    },
    /// Print the text extracted from each page, without calling the LLM.
    Extract {
        /// Path to the PDF file.
        #[arg(long)]
        file: String,
        /// Maximum number of pages to print.
        #[arg(long, default_value = "2")]
        max_pages: usize,
    },
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
enum CheckResponse {
    Processed {
        message: &'static str,
        filename: String,
        topic: String,
        relevant_pages: Vec<u32>,
    },
    Failed {
        error: String,
        reason: FailureReason,
    },
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
enum FailureReason {
    TopicNotFound,
    InvalidInput,
    Extraction,
    Gateway,
}

impl From<ErrorKind> for FailureReason {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidInput => Self::InvalidInput,
            ErrorKind::Extraction => Self::Extraction,
            ErrorKind::Gateway => Self::Gateway,
        }
    }
}

impl FailureReason {
    fn exit_code(self) -> u8 {
        match self {
            Self::TopicNotFound => EXIT_TOPIC_NOT_FOUND,
            Self::InvalidInput | Self::Extraction => EXIT_BAD_INPUT,
            Self::Gateway => EXIT_BACKEND_FAILURE,
        }
    }
}

impl CheckResponse {
    fn failed(error: impl Into<String>, reason: FailureReason) -> Self {
        Self::Failed {
            error: error.into(),
            reason,
        }
    }

    fn from_outcome(filename: &str, topic: &str, outcome: RelevanceOutcome) -> Self {
        match outcome {
            RelevanceOutcome::Relevant { pages } => Self::Processed {
                message: "PDF processed successfully",
                filename: filename.to_string(),
                topic: topic.to_string(),
                relevant_pages: pages,
            },
            RelevanceOutcome::TopicNotFound { topic } => Self::failed(
                format!("Topic '{topic}' not found in the document"),
                FailureReason::TopicNotFound,
            ),
            RelevanceOutcome::Failed { kind, message } => Self::failed(message, kind.into()),
        }
    }

    fn exit_code(&self) -> u8 {
        match self {
            Self::Processed { .. } => 0,
            Self::Failed { reason, .. } => reason.exit_code(),
        }
    }
}

fn is_pdf_name(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn load_pdf(path: &Path) -> Result<Vec<u8>, CheckResponse> {
    if !is_pdf_name(path) {
        return Err(CheckResponse::failed(
            "File must be a PDF",
            FailureReason::InvalidInput,
        ));
    }

    read_pdf(path).map_err(|error| {
        CheckResponse::failed(
            format!("Error reading file: {error}"),
            FailureReason::InvalidInput,
        )
    })
}

fn load_pages(path: &Path) -> anyhow::Result<Vec<PageText>> {
    let pdf = read_pdf(path).with_context(|| format!("failed to read {}", path.display()))?;
    extract_page_texts(&pdf)
        .with_context(|| format!("failed to extract text from {}", path.display()))
}

fn classifier_options(cli: &Cli) -> ClassifierOptions {
    ClassifierOptions {
        concurrency: cli.concurrency.max(1),
        call_timeout: Duration::from_secs(cli.timeout_secs),
        max_retries: cli.max_retries,
        answer_policy: if cli.strict_answers {
            AnswerPolicy::Exact
        } else {
            AnswerPolicy::Lenient
        },
        ..ClassifierOptions::default()
    }
}

fn gemini_config(cli: &Cli) -> anyhow::Result<GeminiConfig> {
    let api_key = cli
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("GEMINI_API_KEY is not set (pass --api-key or export it)"))?;

    let mut config = GeminiConfig::new(api_key);
    config.model = cli.model.clone();
    config.endpoint = cli.endpoint.clone();
    config.request_timeout = Duration::from_secs(cli.timeout_secs);
    Ok(config)
}

fn emit(response: &CheckResponse) -> anyhow::Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(ExitCode::from(response.exit_code()))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-topic boot"
    );

    match &cli.command {
        Command::Check { file, topic } => {
            let path = Path::new(file);
            let pdf = match load_pdf(path) {
                Ok(pdf) => pdf,
                Err(response) => {
                    warn!(file = %file, "rejected input file");
                    return emit(&response);
                }
            };

            let gateway =
                GeminiGateway::new(gemini_config(&cli)?).context("failed to build gemini gateway")?;
            let pipeline = RelevancePipeline::new(gateway, classifier_options(&cli));

            info!(file = %file, topic = %topic, bytes = pdf.len(), "classifying pdf");
            let outcome = pipeline.process_outcome(&pdf, topic).await;

            let filename = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or(file.as_str());
            emit(&CheckResponse::from_outcome(filename, topic, outcome))
        }
        Command::Extract { file, max_pages } => {
            let pages = load_pages(Path::new(file))?;

            for page in pages.iter().take(*max_pages) {
                println!("[page {}]\n{}", page.page_number(), page.text);
            }
            if pages.len() > *max_pages {
                println!("... output truncated to first {max_pages} page(s)");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_topic_core::ExtractionError;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn relevant_outcome_renders_the_success_shape() {
        let response = CheckResponse::from_outcome(
            "report.pdf",
            "machine learning",
            RelevanceOutcome::Relevant { pages: vec![2] },
        );

        let json = serde_json::to_value(&response).expect("response should serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "message": "PDF processed successfully",
                "filename": "report.pdf",
                "topic": "machine learning",
                "relevant_pages": [2],
            })
        );
        assert_eq!(response.exit_code(), 0);
    }

    #[test]
    fn negatives_and_faults_get_distinct_reasons() {
        let not_found = CheckResponse::from_outcome(
            "report.pdf",
            "volcanoes",
            RelevanceOutcome::TopicNotFound {
                topic: "volcanoes".to_string(),
            },
        );
        let fault = CheckResponse::from_outcome(
            "report.pdf",
            "volcanoes",
            RelevanceOutcome::Failed {
                kind: ErrorKind::Gateway,
                message: "error checking topic relevance: timed out".to_string(),
            },
        );

        assert_eq!(
            serde_json::to_value(&not_found).expect("response should serialize"),
            serde_json::json!({
                "error": "Topic 'volcanoes' not found in the document",
                "reason": "topic_not_found",
            })
        );
        assert_eq!(not_found.exit_code(), EXIT_TOPIC_NOT_FOUND);
        assert_eq!(fault.exit_code(), EXIT_BACKEND_FAILURE);
    }

    #[test]
    fn non_pdf_files_are_rejected_before_reading() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let notes = dir.path().join("notes.txt");
        fs::write(&notes, b"plain text")?;

        let rejected = load_pdf(&notes);

        assert_eq!(
            rejected,
            Err(CheckResponse::failed("File must be a PDF", FailureReason::InvalidInput))
        );
        Ok(())
    }

    #[test]
    fn pdf_extension_check_ignores_case() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let upper = dir.path().join("SCAN.PDF");
        fs::write(&upper, b"%PDF-1.4\n")?;

        assert_eq!(load_pdf(&upper), Ok(b"%PDF-1.4\n".to_vec()));
        assert!(load_pdf(&dir.path().join("missing.pdf")).is_err());
        Ok(())
    }

    #[test]
    fn page_loading_errors_keep_their_source() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let missing = dir.path().join("missing.pdf");
        let broken = dir.path().join("broken.pdf");
        fs::write(&broken, b"%PDF-1.4\n%broken")?;

        let missing_error = load_pages(&missing).expect_err("missing file should fail");
        let broken_error = load_pages(&broken).expect_err("broken pdf should fail");

        assert!(missing_error.to_string().starts_with("failed to read"));
        assert!(matches!(
            missing_error.downcast_ref::<ExtractionError>(),
            Some(ExtractionError::Io(_))
        ));
        assert!(matches!(
            broken_error.downcast_ref::<ExtractionError>(),
            Some(ExtractionError::PdfParse(_))
        ));
        Ok(())
    }
}
