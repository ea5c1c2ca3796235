use crate::error::{ClassifyError, Result};
use crate::extractor::{LopdfExtractor, PageText, PdfExtractor};
use crate::models::{ClassificationResult, ClassifierOptions, RelevanceOutcome};
use crate::prompts::{gate_context, gate_instruction, page_instruction, truncate_chars};
use crate::traits::LlmGateway;
use crate::GatewayError;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

pub struct RelevancePipeline<G, E = LopdfExtractor>
where
    G: LlmGateway,
    E: PdfExtractor,
{
    gateway: G,
    extractor: E,
    options: ClassifierOptions,
}

impl<G> RelevancePipeline<G>
where
    G: LlmGateway,
{
    pub fn new(gateway: G, options: ClassifierOptions) -> Self {
        Self::with_extractor(gateway, LopdfExtractor, options)
    }
}

impl<G, E> RelevancePipeline<G, E>
where
    G: LlmGateway,
    E: PdfExtractor,
{
    pub fn with_extractor(gateway: G, extractor: E, options: ClassifierOptions) -> Self {
        Self {
            gateway,
            extractor,
            options,
        }
    }

    pub fn options(&self) -> &ClassifierOptions {
        &self.options
    }

    pub async fn process(&self, pdf: &[u8], topic: &str) -> ClassificationResult {
        self.process_outcome(pdf, topic).await.into()
    }

    pub async fn process_outcome(&self, pdf: &[u8], topic: &str) -> RelevanceOutcome {
        settle(self.run(pdf, topic).await)
    }

    pub async fn evaluate(&self, pages: &[PageText], topic: &str) -> RelevanceOutcome {
        let result = match validate_topic(topic) {
            Ok(()) => self.classify_pages(pages, topic).await,
            Err(error) => Err(error),
        };
        settle(result)
    }

    async fn run(&self, pdf: &[u8], topic: &str) -> Result<RelevanceOutcome> {
        validate_topic(topic)?;
        let pages = self.extractor.extract_pages(pdf)?;
        self.classify_pages(&pages, topic).await
    }

    async fn classify_pages(&self, pages: &[PageText], topic: &str) -> Result<RelevanceOutcome> {
        if !self.document_gate(pages, topic).await? {
            return Ok(RelevanceOutcome::TopicNotFound {
                topic: topic.to_string(),
            });
        }

        let relevant = self.scan_pages(pages, topic).await?;
        Ok(RelevanceOutcome::Relevant { pages: relevant })
    }

    pub async fn document_gate(&self, pages: &[PageText], topic: &str) -> Result<bool> {
        let context = gate_context(pages, self.options.gate_page_chars);
        let answer = self
            .call_gateway(&context, &gate_instruction(topic))
            .await
            .map_err(ClassifyError::DocumentGate)?;

        let found = self.options.answer_policy.is_affirmative(&answer);
        info!(topic, pages = pages.len(), found, "document gate decided");
        Ok(found)
    }

    /// Stage 2: one call per page. Returns the 1-based numbers of the
    /// affirmative pages in ascending order; the first failing page fails
    /// the whole scan and drops the calls still in flight.
    pub async fn scan_pages(&self, pages: &[PageText], topic: &str) -> Result<Vec<u32>> {
        if pages.is_empty() {
            return Ok(Vec::new());
        }

        let verdicts: Vec<(u32, bool)> = stream::iter(pages)
            .map(|page| self.judge_page(page, topic))
            .buffer_unordered(self.options.concurrency.max(1))
            .try_collect()
            .await?;

        let mut relevant: Vec<u32> = verdicts
            .into_iter()
            .filter_map(|(page_number, is_relevant)| is_relevant.then_some(page_number))
            .collect();
        relevant.sort_unstable();
        relevant.dedup();

        info!(topic, scanned = pages.len(), relevant = ?relevant, "page scan finished");
        Ok(relevant)
    }

    async fn judge_page(&self, page: &PageText, topic: &str) -> Result<(u32, bool)> {
        let page_number = page.page_number();
        let (text, _) = truncate_chars(&page.text, self.options.page_chars);
        let answer = self
            .call_gateway(text, &page_instruction(page_number, topic))
            .await
            .map_err(|source| ClassifyError::PageScan {
                page: page_number,
                source,
            })?;

        let is_relevant = self.options.answer_policy.is_affirmative(&answer);
        debug!(page = page_number, is_relevant, "page judged");
        Ok((page_number, is_relevant))
    }

    async fn call_gateway(
        &self,
        context: &str,
        instruction: &str,
    ) -> std::result::Result<String, GatewayError> {
        let mut attempt = 0u32;
        loop {
            let result = match timeout(
                self.options.call_timeout,
                self.gateway.classify(context, instruction),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(GatewayError::Timeout {
                    millis: self.options.call_timeout.as_millis() as u64,
                }),
            };

            match result {
                Err(error) if error.is_transient() && attempt < self.options.max_retries => {
                    attempt += 1;
                    let backoff = self
                        .options
                        .retry_backoff_ms
                        .saturating_mul(2u64.saturating_pow(attempt - 1));
                    warn!(
                        attempt,
                        max_retries = self.options.max_retries,
                        backoff_ms = backoff,
                        error = %error,
                        "llm call failed, retrying"
                    );
                    sleep(Duration::from_millis(backoff)).await;
                }
                other => return other,
            }
        }
    }
}

fn validate_topic(topic: &str) -> Result<()> {
    if topic.trim().is_empty() {
        return Err(ClassifyError::InvalidTopic("topic is empty".to_string()));
    }
    Ok(())
}

fn settle(result: Result<RelevanceOutcome>) -> RelevanceOutcome {
    match result {
        Ok(outcome) => outcome,
        Err(error) => {
            warn!(kind = ?error.kind(), error = %error, "relevance classification failed");
            error.into()
        }
    }
}
