//! Gemini providers via the Google Generative Language API
//!
//! Embeddings come from `text-embedding-004` and answers from
//! `gemini-2.5-flash`. The API key is read from the environment on every
//! request and sent in the `x-goog-api-key` header, never in the URL.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{credential_present, GeminiConfig};
use crate::error::{Error, Result};

use super::embedding::{EmbeddingProvider, EmbeddingTask};
use super::llm::LlmProvider;

/// Largest batch accepted by `batchEmbedContents`
const MAX_EMBED_BATCH: usize = 100;

/// Shared HTTP client for the Generative Language API
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    /// Create a new client
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Read the API key from the configured environment variable
    fn api_key(&self) -> Result<String> {
        let var = self.config.api_key_env.as_str();
        if !credential_present(var) {
            return Err(Error::MissingCredential(var.to_string()));
        }
        std::env::var(var).map_err(|_| Error::MissingCredential(var.to_string()))
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            model,
            method
        )
    }

    /// POST a JSON body and decode the JSON reply, wrapping failures with `wrap`
    async fn post_json<B, R>(&self, url: &str, body: &B, wrap: fn(String) -> Error) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let api_key = self.api_key()?;

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| wrap(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(wrap(describe_failure(status, &body, &self.config.api_key_env)));
        }

        response
            .json()
            .await
            .map_err(|e| wrap(format!("Failed to parse Gemini response: {}", e)))
    }

    fn embed_request<'a>(&self, text: &'a str, task: EmbeddingTask) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model: format!("models/{}", self.config.embed_model),
            content: Content {
                role: None,
                parts: vec![Part { text }],
            },
            task_type: task_type(task),
        }
    }

    /// Embed one text
    pub async fn embed(&self, text: &str, task: EmbeddingTask) -> Result<Vec<f32>> {
        let url = self.model_url(&self.config.embed_model, "embedContent");
        let response: EmbedContentResponse = self
            .post_json(&url, &self.embed_request(text, task), Error::Embedding)
            .await?;
        Ok(response.embedding.values)
    }

    /// Embed many texts, at most `MAX_EMBED_BATCH` per request
    pub async fn embed_batch(&self, texts: &[String], task: EmbeddingTask) -> Result<Vec<Vec<f32>>> {
        let url = self.model_url(&self.config.embed_model, "batchEmbedContents");
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_EMBED_BATCH) {
            let request = BatchEmbedRequest {
                requests: batch
                    .iter()
                    .map(|text| self.embed_request(text, task))
                    .collect(),
            };

            let response: BatchEmbedResponse =
                self.post_json(&url, &request, Error::Embedding).await?;

            if response.embeddings.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "Gemini returned {} embeddings for {} texts",
                    response.embeddings.len(),
                    batch.len()
                )));
            }

            tracing::debug!("Embedded batch of {} texts", batch.len());
            all_embeddings.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        Ok(all_embeddings)
    }

    /// Generate text for a prompt
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = self.model_url(&self.config.generate_model, "generateContent");
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
            },
        };

        tracing::info!("Generating answer with model: {}", self.config.generate_model);

        let response: GenerateResponse = self.post_json(&url, &request, Error::Llm).await?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::Llm("No text in Gemini response".to_string()));
        }
        Ok(text)
    }
}

fn task_type(task: EmbeddingTask) -> &'static str {
    match task {
        EmbeddingTask::Document => "RETRIEVAL_DOCUMENT",
        EmbeddingTask::Query => "RETRIEVAL_QUERY",
    }
}

/// Describe a failed call, pointing at the key variable when the key was rejected
fn describe_failure(status: StatusCode, body: &str, key_env: &str) -> String {
    let mut message = format!("HTTP {} - {}", status, body.trim());

    let lower = body.to_lowercase();
    let key_rejected = matches!(status.as_u16(), 400 | 401 | 403)
        && (lower.contains("api key") || lower.contains("api_key"));
    if key_rejected {
        message.push_str(&format!(" (check that {} holds a valid API key)", key_env));
    }

    message
}

/// Gemini embedding provider
pub struct GeminiEmbedder {
    client: Arc<GeminiClient>,
}

impl GeminiEmbedder {
    /// Create from a shared client
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(&self, text: &str, task: EmbeddingTask) -> Result<Vec<f32>> {
        self.client.embed(text, task).await
    }

    async fn embed_batch(&self, texts: &[String], task: EmbeddingTask) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.client.embed_batch(texts, task).await
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Gemini answer synthesizer
pub struct GeminiLlm {
    client: Arc<GeminiClient>,
}

impl GeminiLlm {
    /// Create from a shared client
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LlmProvider for GeminiLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.client.generate(prompt).await
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.client.config.generate_model
    }
}
