//! Google Gemini API client.
//!
//! Talks to the `generateContent` REST endpoint and implements both
//! [`SqlGenerator`] and [`ResultInterpreter`] on top of it.
//!
//! # Example
//!
//! ```rust,ignore
//! use datalyst::providers::GeminiClient;
//!
//! let client = GeminiClient::from_env()?;
//! let model = client.model("gemini-2.5-flash").with_temperature(0.1);
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::prompt::{self, NO_RESULTS};
use super::{ResultInterpreter, SqlGenerator};
use crate::config::DEFAULT_MODEL;
use crate::database::{DatabaseSchema, ResultSet};
use crate::error::LlmError;

/// Default Gemini API base URL.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROVIDER: &str = "gemini";

/// Token cap for SQL generation.
const SQL_MAX_TOKENS: u32 = 1024;
/// Sampling settings for interpretation.
const INTERPRET_TEMPERATURE: f32 = 0.3;
const INTERPRET_MAX_TOKENS: u32 = 512;

/// Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: Arc<str>,
    base_url: Arc<str>,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self, LlmError> {
        Self::builder(api_key).build()
    }

    /// Create a client from the `GOOGLE_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns an authentication error if the variable is unset.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .map_err(|_| LlmError::auth(PROVIDER, "GOOGLE_API_KEY not set"))?;
        Self::new(api_key)
    }

    /// Create a client builder.
    #[must_use]
    pub fn builder(api_key: impl Into<String>) -> GeminiClientBuilder {
        GeminiClientBuilder {
            api_key: api_key.into(),
            base_url: None,
            timeout: None,
        }
    }

    /// Create a model handle.
    #[must_use]
    pub fn model(&self, model_id: impl Into<String>) -> GeminiModel {
        GeminiModel::new(self.clone(), model_id)
    }

    /// The API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one prompt and return the concatenated candidate text.
    ///
    /// # Errors
    ///
    /// Maps HTTP 401/403 to an authentication error, 429 to a rate-limit
    /// error, other non-success statuses to an HTTP status error, and a
    /// reply without text to a response-format error.
    #[instrument(skip(self, prompt, config), fields(model = %model, prompt_len = prompt.len()))]
    pub async fn generate_content(
        &self,
        model: &str,
        prompt: &str,
        config: GenerationConfig,
    ) -> Result<String, LlmError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_owned(),
                }],
            }],
            generation_config: config,
        };

        let response = self
            .http_client
            .post(format!("{}/models/{model}:generateContent", self.base_url))
            .header("x-goog-api-key", &*self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &error_text));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text = parsed.text();
        debug!(chars = text.len(), "content_generated");
        if text.trim().is_empty() {
            return Err(
                LlmError::response_format("candidate text", "empty response").for_provider(PROVIDER)
            );
        }
        Ok(text)
    }
}

/// Builder for [`GeminiClient`].
#[derive(Debug)]
pub struct GeminiClientBuilder {
    api_key: String,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl GeminiClientBuilder {
    /// Set a custom base URL.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set a per-request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] if the HTTP client cannot be built.
    pub fn build(self) -> Result<GeminiClient, LlmError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| LlmError::internal(format!("failed to build HTTP client: {e}")))?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| GEMINI_API_BASE_URL.to_owned());

        Ok(GeminiClient {
            http_client,
            api_key: self.api_key.into(),
            base_url: base_url.trim_end_matches('/').into(),
        })
    }
}

fn status_error(status: StatusCode, body: &str) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LlmError::auth(PROVIDER, format!("Gemini rejected the API key ({status}): {body}"))
        }
        StatusCode::TOO_MANY_REQUESTS => LlmError::rate_limited(PROVIDER),
        _ => LlmError::http_status(status.as_u16(), body).for_provider(PROVIDER),
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// Sampling settings for one request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f32,
    /// Output token cap.
    pub max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

// ============================================================================
// Model
// ============================================================================

/// A Gemini model acting as SQL generator and result interpreter.
#[derive(Debug, Clone)]
pub struct GeminiModel {
    client: GeminiClient,
    model_id: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiModel {
    /// Create a model handle with temperature 0.1 and a 2048-token ceiling.
    #[must_use]
    pub fn new(client: GeminiClient, model_id: impl Into<String>) -> Self {
        Self {
            client,
            model_id: model_id.into(),
            temperature: 0.1,
            max_output_tokens: 2048,
        }
    }

    /// Model handle for the default model.
    #[must_use]
    pub fn default_model(client: GeminiClient) -> Self {
        Self::new(client, DEFAULT_MODEL)
    }

    /// Set the temperature used for SQL generation.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the ceiling on output tokens for every call.
    #[must_use]
    pub const fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// The model identifier.
    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    fn sql_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.temperature,
            max_output_tokens: SQL_MAX_TOKENS.min(self.max_output_tokens),
        }
    }

    fn interpret_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: INTERPRET_TEMPERATURE,
            max_output_tokens: INTERPRET_MAX_TOKENS.min(self.max_output_tokens),
        }
    }
}

#[async_trait]
impl SqlGenerator for GeminiModel {
    async fn generate_sql(
        &self,
        question: &str,
        schema: &DatabaseSchema,
        context: &str,
    ) -> Result<String, LlmError> {
        let prompt = prompt::sql_generation(question, schema, context);
        let text = self
            .client
            .generate_content(&self.model_id, &prompt, self.sql_config())
            .await?;
        Ok(text.trim().to_owned())
    }
}

#[async_trait]
impl ResultInterpreter for GeminiModel {
    async fn interpret(
        &self,
        question: &str,
        sql: &str,
        rows: Option<&ResultSet>,
    ) -> Result<String, LlmError> {
        let Some(rows) = rows.filter(|r| !r.is_empty()) else {
            return Ok(NO_RESULTS.to_owned());
        };

        let prompt = prompt::interpretation(question, sql, rows);
        let text = self
            .client
            .generate_content(&self.model_id, &prompt, self.interpret_config())
            .await?;
        Ok(text.trim().to_owned())
    }
}
