use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("{backend} returned status {status}: {body}")]
    Status {
        backend: String,
        status: u16,
        body: String,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("llm call timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("llm backend not configured: {0}")]
    NotConfigured(String),
}

impl GatewayError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Url(_) | Self::MalformedResponse(_) | Self::NotConfigured(_) => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("invalid topic: {0}")]
    InvalidTopic(String),

    #[error("PDF processing failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("error checking topic relevance: {0}")]
    DocumentGate(#[source] GatewayError),

    #[error("error identifying relevant pages (page {page}): {source}")]
    PageScan {
        page: u32,
        #[source]
        source: GatewayError,
    },
}

impl ClassifyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTopic(_) => ErrorKind::InvalidInput,
            Self::Extraction(_) => ErrorKind::Extraction,
            Self::DocumentGate(_) | Self::PageScan { .. } => ErrorKind::Gateway,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    Extraction,
    Gateway,
}

impl ErrorKind {
    pub fn is_client_error(self) -> bool {
        matches!(self, Self::InvalidInput | Self::Extraction)
    }
}

pub type Result<T, E = ClassifyError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limits_and_server_errors_are_transient() {
        let status = |status| GatewayError::Status {
            backend: "gemini".to_string(),
            status,
            body: String::new(),
        };

        assert!(status(429).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(401).is_transient());
        assert!(GatewayError::Timeout { millis: 5_000 }.is_transient());
        assert!(!GatewayError::MalformedResponse("empty".to_string()).is_transient());
    }

    #[test]
    fn classify_errors_map_to_kinds() {
        let gate = ClassifyError::DocumentGate(GatewayError::Timeout { millis: 1_000 });
        let extraction = ClassifyError::Extraction(ExtractionError::PdfParse("bad".to_string()));

        assert_eq!(gate.kind(), ErrorKind::Gateway);
        assert!(!gate.kind().is_client_error());
        assert_eq!(extraction.kind(), ErrorKind::Extraction);
        assert!(extraction.kind().is_client_error());
        assert!(gate.to_string().starts_with("error checking topic relevance"));
    }
}
