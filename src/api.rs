//! Structuring-service interaction with exponential backoff retry logic.
//!
//! The external text-understanding service is treated as a black-box
//! capability: article segment in, schema-attempt string out, or
//! [`PipelineError::StructuringUnavailable`] when it cannot be reached.
//!
//! # Architecture
//!
//! - [`StructureAsync`]: core trait for the structuring call
//! - [`OpenAiStructurer`]: chat-completions implementation over `reqwest`
//! - [`RetryStructure`]: decorator adding retry logic to any implementation
//!
//! # Retry strategy
//!
//! - Maximum 3 retry attempts
//! - Exponential backoff starting at 1 second, capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use rand::{Rng, rng};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::config::StructuringConfig;
use crate::errors::PipelineError;

/// System instruction fixing the output schema for the structuring call.
///
/// The service receives one article segment at a time and must answer
/// with a single JSON object, nothing else.
pub const STRUCTURE_INSTRUCTION: &str = r#"You are a financial news analyst. Analyze the single news article below and return structured information with sentiment analysis.

INSTRUCTIONS:
1. Extract the required information according to the JSON structure.
2. Analyze sentiment from a financial/market perspective.
3. Return ONLY one valid JSON object - no additional text or formatting.

SENTIMENT GUIDELINES:
- very_positive (0.7 to 1.0): exceptionally bullish news
- positive (0.3 to 0.7): generally good news
- neutral (-0.3 to 0.3): balanced reporting, mixed signals
- negative (-0.7 to -0.3): concerning developments
- very_negative (-1.0 to -0.7): major negative events

MARKET IMPACT: one of bullish | bearish | neutral | mixed.

REQUIRED JSON STRUCTURE:
{
    "id": "generated-unique-id",
    "title": "Clean article title",
    "summary": "2-3 sentence summary focusing on key financial points",
    "sentiment": "very_positive|positive|neutral|negative|very_negative",
    "sentiment_score": 0.5,
    "key_topics": ["topic1", "topic2", "topic3"],
    "market_impact": "bullish|bearish|neutral|mixed",
    "source_url": "original URL if present in the text",
    "extracted_at": "RFC 3339 timestamp"
}"#;

/// Sampling temperature for the structuring call. Kept low so repeated
/// runs over the same input produce stable output.
const STRUCTURE_TEMPERATURE: f64 = 0.2;
const STRUCTURE_MAX_TOKENS: u32 = 1500;

/// Trait for the async structuring call.
///
/// Implementors send an article segment to the structuring service and
/// receive a raw schema-attempt string. The abstraction keeps the
/// repair/validation pass independent of how the call is invoked.
pub trait StructureAsync {
    /// Submit one article segment and receive the raw schema attempt.
    async fn structure(&self, segment: &str) -> Result<String, PipelineError>;
}

/// Decorator that adds exponential backoff retry logic to any
/// [`StructureAsync`] implementation.
///
/// The delay between retries follows:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryStructure<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryStructure<T>
where
    T: StructureAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryStructure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryStructure")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> StructureAsync for RetryStructure<T>
where
    T: StructureAsync,
{
    #[instrument(level = "info", skip_all)]
    async fn structure(&self, segment: &str) -> Result<String, PipelineError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.structure(segment).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "structure() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "structure() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Chat-completions client for an OpenAI-compatible structuring service.
#[derive(Debug)]
pub struct OpenAiStructurer {
    http: reqwest::Client,
    config: StructuringConfig,
}

impl OpenAiStructurer {
    pub fn new(config: StructuringConfig) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("market_news_etl/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(StdDuration::from_secs(4))
            .timeout(config.timeout)
            .build()
            .map_err(|e| PipelineError::StructuringUnavailable(e.to_string()))?;
        Ok(Self { http, config })
    }
}

impl StructureAsync for OpenAiStructurer {
    #[instrument(level = "info", skip_all)]
    async fn structure(&self, segment: &str) -> Result<String, PipelineError> {
        let t0 = Instant::now();
        let url = format!("{}/chat/completions", self.config.endpoint);
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": STRUCTURE_INSTRUCTION },
                { "role": "user", "content": segment },
            ],
            "temperature": STRUCTURE_TEMPERATURE,
            "max_tokens": STRUCTURE_MAX_TOKENS,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::StructuringUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                %status,
                elapsed_ms = t0.elapsed().as_millis(),
                "Structuring call returned non-success status"
            );
            return Err(PipelineError::StructuringUnavailable(format!(
                "status {status}"
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::StructuringUnavailable(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                PipelineError::StructuringUnavailable("response carried no content".into())
            })?;

        info!(
            elapsed_ms = t0.elapsed().as_millis(),
            bytes = content.len(),
            "Structuring call succeeded"
        );
        Ok(content)
    }
}

impl<T> StructureAsync for &T
where
    T: StructureAsync,
{
    async fn structure(&self, segment: &str) -> Result<String, PipelineError> {
        (*self).structure(segment).await
    }
}
