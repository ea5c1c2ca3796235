pub mod gemini;

pub use gemini::{GeminiConfig, GeminiGateway, DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL};
