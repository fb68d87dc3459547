
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::{PdfChatError, Result};

/// Default endpoint for the Google Generative Language API.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Vector width produced by the default `embedding-001` model.
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 768;

/// Blocking client for Gemini embedding and generation endpoints.
///
/// Requests are made once, with no retry loop; failures are classified so
/// callers can tell credential problems from rate limits and outages.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: Url,
    api_key: String,
    embedding_model: String,
    chat_model: String,
    batch_size: usize,
    agent: ureq::Agent,
}

/// One conversational turn as sent to the generation endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Model,
}

impl ChatMessage {
    #[inline]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
        }
    }

    #[inline]
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Model,
            text: text.into(),
        }
    }
}

impl MessageRole {
    fn as_wire(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

impl<'a> Content<'a> {
    fn from_text(text: &'a str) -> Self {
        Self {
            parts: vec![Part { text }],
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Turn<'a>>,
}

#[derive(Debug, Serialize)]
struct Turn<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
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
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

impl GeminiClient {
    #[inline]
    pub fn new(config: &Config, api_key: String) -> Result<Self> {
        let base_url = config
            .gemini
            .api_url()
            .map_err(|error| PdfChatError::Config(error.to_string()))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.gemini.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            base_url,
            api_key,
            embedding_model: config.gemini.embedding_model.clone(),
            chat_model: config.gemini.chat_model.clone(),
            batch_size: config.gemini.batch_size as usize,
            agent,
        })
    }

    /// Embed a single text.
    #[inline]
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(chars = text.chars().count(), "Requesting embedding");

        let model = self.qualified_embedding_model();
        let request = EmbedRequest {
            model: &model,
            content: Content::from_text(text),
        };
        let body =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;

        let url = self.endpoint(&format!(
            "/v1beta/models/{}:embedContent",
            bare_model_name(&self.embedding_model)
        ))?;
        let response_text = self.post_json(&url, &body)?;

        let response: EmbedResponse =
            serde_json::from_str(&response_text).context("Failed to parse embedding response")?;

        debug!(
            dimensions = response.embedding.values.len(),
            "Received embedding"
        );
        Ok(response.embedding.values)
    }

    /// Embed many texts, preserving input order. Requests are issued in
    /// batches of the configured size.
    #[inline]
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = texts.len(), "Requesting embeddings");

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_single_batch(batch)?);
        }

        debug!(count = vectors.len(), "Received embeddings");
        Ok(vectors)
    }

    fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if let [only] = texts {
            return Ok(vec![self.embed(only)?]);
        }

        let model = self.qualified_embedding_model();
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: &model,
                    content: Content::from_text(text),
                })
                .collect(),
        };
        let body = serde_json::to_string(&request)
            .context("Failed to serialize batch embedding request")?;

        let url = self.endpoint(&format!(
            "/v1beta/models/{}:batchEmbedContents",
            bare_model_name(&self.embedding_model)
        ))?;
        let response_text = self.post_json(&url, &body)?;

        let response: BatchEmbedResponse = serde_json::from_str(&response_text)
            .context("Failed to parse batch embedding response")?;

        if response.embeddings.len() != texts.len() {
            return Err(anyhow::anyhow!(
                "Embedding count mismatch: sent {} texts, received {} vectors",
                texts.len(),
                response.embeddings.len()
            )
            .into());
        }

        Ok(response
            .embeddings
            .into_iter()
            .map(|embedding| embedding.values)
            .collect())
    }

    /// Run a generation request and return the first candidate's text.
    #[inline]
    pub fn generate(&self, system: &str, messages: &[ChatMessage]) -> Result<String> {
        let request = GenerateRequest {
            system_instruction: Content::from_text(system),
            contents: messages
                .iter()
                .map(|message| Turn {
                    role: message.role.as_wire(),
                    parts: vec![Part {
                        text: &message.text,
                    }],
                })
                .collect(),
        };
        let body =
            serde_json::to_string(&request).context("Failed to serialize generation request")?;

        let url = self.endpoint(&format!(
            "/v1beta/models/{}:generateContent",
            bare_model_name(&self.chat_model)
        ))?;
        let response_text = self.post_json(&url, &body)?;

        let response: GenerateResponse =
            serde_json::from_str(&response_text).context("Failed to parse generation response")?;

        let answer: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        if answer.trim().is_empty() {
            return Err(anyhow::anyhow!("Gemini returned an empty response").into());
        }

        debug!(chars = answer.chars().count(), "Received generation");
        Ok(answer)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self
            .base_url
            .join(path)
            .with_context(|| format!("Failed to build Gemini endpoint for {path}"))?)
    }

    fn qualified_embedding_model(&self) -> String {
        format!("models/{}", bare_model_name(&self.embedding_model))
    }

    fn post_json(&self, url: &Url, body: &str) -> Result<String> {
        let mut response = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .send(body)
            .map_err(transport_failure)?;

        let status = response.status().as_u16();
        let response_text = response
            .body_mut()
            .read_to_string()
            .map_err(transport_failure)?;

        if (200..300).contains(&status) {
            Ok(response_text)
        } else {
            Err(service_failure(status, &response_text))
        }
    }
}

/// Model names are accepted with or without the `models/` prefix.
fn bare_model_name(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

fn transport_failure(error: ureq::Error) -> PdfChatError {
    match &error {
        ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound
        | ureq::Error::Timeout(_)
        | ureq::Error::Io(_) => {
            PdfChatError::TransientService(format!("Request to Gemini failed: {error}"))
        }
        _ => PdfChatError::Other(anyhow::Error::new(error).context("Gemini request failed")),
    }
}

/// Maps a non-2xx response onto the error taxonomy. Invalid API keys arrive
/// as 400 INVALID_ARGUMENT rather than 401, so the body message is consulted
/// to tell them apart from oversized inputs.
fn service_failure(status: u16, body: &str) -> PdfChatError {
    let message = error_message(body);
    match status {
        401 | 403 => PdfChatError::Authentication(message),
        429 => PdfChatError::TransientService(format!("Rate limited by Gemini: {message}")),
        500..=599 => PdfChatError::TransientService(format!(
            "Gemini server error (HTTP {status}): {message}"
        )),
        400 => {
            let lowered = message.to_lowercase();
            if lowered.contains("api key") {
                PdfChatError::Authentication(message)
            } else if lowered.contains("token")
                || lowered.contains("too large")
                || lowered.contains("payload size")
                || lowered.contains("exceeds")
            {
                PdfChatError::InputTooLarge(message)
            } else {
                PdfChatError::Other(anyhow::anyhow!(
                    "Gemini rejected the request (HTTP 400): {message}"
                ))
            }
        }
        _ => PdfChatError::Other(anyhow::anyhow!(
            "Unexpected Gemini response (HTTP {status}): {message}"
        )),
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .map(|error| error.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no response body".to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        })
}
