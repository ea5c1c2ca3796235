use crate::error::{ClassifyError, ErrorKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `is_valid == false` always carries an `error_message` and no pages;
/// `is_valid == true` never carries a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassificationResult {
    pub is_valid: bool,
    pub relevant_pages: Vec<u32>,
    pub error_message: Option<String>,
}

impl ClassificationResult {
    pub fn relevant(relevant_pages: Vec<u32>) -> Self {
        Self {
            is_valid: true,
            relevant_pages,
            error_message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            relevant_pages: Vec::new(),
            error_message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelevanceOutcome {
    Relevant { pages: Vec<u32> },
    TopicNotFound { topic: String },
    Failed { kind: ErrorKind, message: String },
}

impl RelevanceOutcome {
    pub fn is_relevant(&self) -> bool {
        matches!(self, Self::Relevant { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<ClassifyError> for RelevanceOutcome {
    fn from(error: ClassifyError) -> Self {
        Self::Failed {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl From<RelevanceOutcome> for ClassificationResult {
    fn from(outcome: RelevanceOutcome) -> Self {
        match outcome {
            RelevanceOutcome::Relevant { pages } => Self::relevant(pages),
            RelevanceOutcome::TopicNotFound { topic } => {
                Self::rejected(format!("Topic '{topic}' not found in the document"))
            }
            RelevanceOutcome::Failed { message, .. } => Self::rejected(message),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnswerPolicy {
    /// Affirmative when the answer contains "yes" anywhere, ignoring case.
    #[default]
    Lenient,
    /// Affirmative only when the whole answer is "yes", ignoring case, quotes and a final period.
    Exact,
}

#[derive(Debug, Clone)]
pub struct ClassifierOptions {
    pub gate_page_chars: usize,
    pub page_chars: usize,
    pub concurrency: usize,
    pub call_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub answer_policy: AnswerPolicy,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            gate_page_chars: 1_000,
            page_chars: 2_000,
            concurrency: 1,
            call_timeout: Duration::from_secs(60),
            max_retries: 0,
            retry_backoff_ms: 500,
            answer_policy: AnswerPolicy::Lenient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_not_found_keeps_the_legacy_message() {
        let result: ClassificationResult = RelevanceOutcome::TopicNotFound {
            topic: "orbital mechanics".to_string(),
        }
        .into();

        assert!(!result.is_valid);
        assert!(result.relevant_pages.is_empty());
        assert_eq!(
            result.error_message.as_deref(),
            Some("Topic 'orbital mechanics' not found in the document")
        );
    }

    #[test]
    fn relevant_outcome_has_no_message_even_without_pages() {
        let result: ClassificationResult = RelevanceOutcome::Relevant { pages: Vec::new() }.into();

        assert!(result.is_valid);
        assert_eq!(result.error_message, None);
    }

    #[test]
    fn result_serializes_with_stable_field_names() {
        let json = serde_json::to_value(ClassificationResult::relevant(vec![2, 5]))
            .expect("result should serialize");

        assert_eq!(
            json,
            serde_json::json!({ "is_valid": true, "relevant_pages": [2, 5], "error_message": null })
        );
    }
}
