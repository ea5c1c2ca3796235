pub mod error;
pub mod extractor;
pub mod gateways;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod traits;

pub use error::{ClassifyError, ErrorKind, ExtractionError, GatewayError};
pub use extractor::{extract_page_texts, read_pdf, LopdfExtractor, PageText, PdfExtractor};
pub use gateways::{GeminiConfig, GeminiGateway, DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL};
pub use models::{AnswerPolicy, ClassificationResult, ClassifierOptions, RelevanceOutcome};
pub use pipeline::RelevancePipeline;
pub use traits::LlmGateway;
