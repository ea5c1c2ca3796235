use crate::extractor::PageText;
use crate::models::AnswerPolicy;

pub fn gate_instruction(topic: &str) -> String {
    format!(
        "Analyze if the following topic is discussed in the provided text.\n\
         Topic: {topic}\n\n\
         Respond with ONLY 'YES' if the topic is found, or 'NO' if it's not found.\n\
         Do not include any other text in your response."
    )
}

pub fn page_instruction(page_number: u32, topic: &str) -> String {
    format!(
        "Analyze if the following text from page {page_number} is relevant \
         to the topic: {topic}\n\n\
         Respond with ONLY 'YES' if the page is relevant, or 'NO' if it's not relevant.\n\
         Do not include any other text in your response."
    )
}

pub fn gate_context(pages: &[PageText], max_chars_per_page: usize) -> String {
    pages
        .iter()
        .map(|page| {
            let (text, truncated) = truncate_chars(&page.text, max_chars_per_page);
            let ellipsis = if truncated { "..." } else { "" };
            format!("Page {}: {text}{ellipsis}", page.page_number())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_offset, _)) => (&text[..byte_offset], true),
        None => (text, false),
    }
}

impl AnswerPolicy {
    pub fn is_affirmative(self, response: &str) -> bool {
        let normalized = response.trim().to_lowercase();
        match self {
            Self::Lenient => normalized.contains("yes"),
            Self::Exact => {
                let stripped = normalized
                    .trim_end_matches('.')
                    .trim_matches(|c: char| c == '\'' || c == '"' || c == '`')
                    .trim_end_matches('.')
                    .trim();
                stripped == "yes"
            }
        }
    }
}
