//! Structured Generation Oracle - turns a prompt into a validated, typed value.
//!
//! A request goes through three stages:
//!
//! 1. **Cache**: a deterministic key over prompt, model and sampling settings.
//!    A hit returns the stored value without calling the model.
//! 2. **Completion**: one call through a [`CompletionClient`]; the first `{`
//!    through the last `}` of the reply is taken as the JSON payload.
//! 3. **Validation**: deserialization into the target type plus its
//!    [`Validate`] rules. Only this stage is retried, a bounded number of times.

mod cache;
mod client;

pub use cache::*;
pub use client::*;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::thread;
use std::time::Duration;
use thiserror::Error;

use world_model::Validate;

use crate::config::NarrativeConfig;

/// System message sent with every completion.
pub const SYSTEM_PROMPT: &str = "You are a world-simulation engine. Reply with one strict JSON object \
that matches the requested schema. Do not add commentary, markdown or code fences.";

const PREVIEW_CHARS: usize = 200;

/// Failure of one structured generation.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("response contains no JSON object: {preview}")]
    MalformedResponse { preview: String },

    #[error("response failed schema validation: {message}")]
    SchemaValidation { message: String },

    #[error("cache error: {0}")]
    Cache(#[from] std::io::Error),

    #[error("failed to encode validated value: {0}")]
    Encode(#[from] serde_json::Error),
}

impl OracleError {
    /// Whether a fresh call may fix this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OracleError::SchemaValidation { .. })
    }
}

/// Values the oracle can produce.
pub trait StructuredOutput: DeserializeOwned + Serialize + Validate {}

impl<T: DeserializeOwned + Serialize + Validate> StructuredOutput for T {}

/// The slice from the first `{` to the last `}`, if both exist in that order.
pub fn extract_json_block(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Parse and validate a JSON payload as `T`.
pub fn parse_validated<T: StructuredOutput>(payload: &str) -> Result<T, OracleError> {
    let value: T = serde_json::from_str(payload).map_err(|err| OracleError::SchemaValidation {
        message: err.to_string(),
    })?;
    value.validate().map_err(|err| OracleError::SchemaValidation {
        message: err.to_string(),
    })?;
    Ok(value)
}

/// Bounded retry on validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &NarrativeConfig) -> Self {
        Self {
            max_retries: config.retry_on_schema_fail,
            delay: config.retry_delay(),
        }
    }

    /// Run `attempt` until it succeeds, fails with a non-retryable error, or
    /// the retry budget is spent.
    pub fn run<T>(
        &self,
        mut attempt: impl FnMut() -> Result<T, OracleError>,
    ) -> Result<T, OracleError> {
        let mut retries = 0;
        loop {
            match attempt() {
                Err(err) if err.is_retryable() && retries < self.max_retries => {
                    retries += 1;
                    tracing::warn!(retry = retries, error = %err, "oracle output rejected, retrying");
                    if !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }
                }
                result => return result,
            }
        }
    }
}

/// One structured generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleRequest {
    pub prompt: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub cache_tag: Option<String>,
}

impl OracleRequest {
    pub fn new(
        prompt: impl Into<String>,
        model: impl Into<String>,
        temperature: f64,
        max_tokens: u32,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            temperature,
            max_tokens,
            cache_tag: None,
        }
    }

    /// A request using the model settings from `config`.
    pub fn from_config(prompt: impl Into<String>, config: &NarrativeConfig) -> Self {
        Self::new(prompt, config.model.clone(), config.temperature, config.max_tokens)
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.cache_tag = Some(tag.into());
        self
    }

    /// `model:prompt-hash:temperature:max_tokens:tag`, where the prompt hash
    /// is the first 16 hex digits of its SHA-256.
    pub fn cache_key(&self) -> String {
        let digest = hex::encode(Sha256::digest(self.prompt.as_bytes()));
        format!(
            "{}:{}:{}:{}:{}",
            self.model,
            &digest[..16],
            self.temperature,
            self.max_tokens,
            self.cache_tag.as_deref().unwrap_or("")
        )
    }

    fn completion(&self) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: self.prompt.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Cached, validated, retried structured generation over a completion client.
///
/// With no cache every request goes to the client.
#[derive(Debug)]
pub struct StructuredOracle<C, K = DiskCache> {
    client: C,
    cache: Option<K>,
    retry: RetryPolicy,
}

impl<C: CompletionClient, K: OracleCache> StructuredOracle<C, K> {
    pub fn new(client: C, cache: Option<K>, retry: RetryPolicy) -> Self {
        Self {
            client,
            cache,
            retry,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn cache(&self) -> Option<&K> {
        self.cache.as_ref()
    }

    /// Produce a validated `T` for `request`.
    pub fn generate<T: StructuredOutput>(&mut self, request: &OracleRequest) -> Result<T, OracleError> {
        let key = request.cache_key();

        if let Some(cache) = &self.cache {
            if let Some(stored) = cache.get(&key)? {
                match parse_validated::<T>(&stored) {
                    Ok(value) => {
                        tracing::debug!(key = %key, "oracle cache hit");
                        return Ok(value);
                    }
                    Err(err) => {
                        tracing::warn!(key = %key, error = %err, "cached entry rejected, regenerating");
                    }
                }
            }
        }
        tracing::debug!(key = %key, model = %request.model, "oracle cache miss");

        let completion = request.completion();
        let value = self.retry.run(|| self.attempt::<T>(&completion))?;

        if let Some(cache) = &mut self.cache {
            cache.put(&key, &serde_json::to_string(&value)?)?;
        }
        Ok(value)
    }

    fn attempt<T: StructuredOutput>(&self, completion: &CompletionRequest) -> Result<T, OracleError> {
        let raw = self.client.complete(completion)?;
        let payload = extract_json_block(&raw).ok_or_else(|| OracleError::MalformedResponse {
            preview: raw.chars().take(PREVIEW_CHARS).collect(),
        })?;
        parse_validated(payload)
    }
}
