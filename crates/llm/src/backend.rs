//! Chat backends
//!
//! [`OllamaBackend`] talks to Ollama's `/api/chat` endpoint. Calls are
//! non-streaming: extraction needs a whole JSON object and confirmation a
//! whole YES/NO, so partial tokens are of no use to the engine.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use convoform_config::LlmSettings;
use convoform_core::{FinishReason, GenerateRequest, Message};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::LlmError;

/// Connection and sampling parameters of a chat backend
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,
    pub endpoint: String,
    /// Sent as a bearer token when set
    pub api_key: Option<String>,
    /// Default when the request does not override it
    pub max_tokens: usize,
    /// Default when the request does not override it
    pub temperature: f32,
    pub top_p: f32,
    /// HTTP timeout of a single attempt
    pub timeout: Duration,
    /// Extra attempts after a network error or 5xx
    pub max_retries: u32,
    /// Wait before the first retry; doubles on each further retry
    pub initial_backoff: Duration,
    /// How long Ollama keeps the model loaded ("5m", "-1", "0", ...)
    pub keep_alive: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::from(&LlmSettings::default())
    }
}

impl From<&LlmSettings> for LlmConfig {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            model: settings.model.clone(),
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            top_p: settings.top_p,
            timeout: Duration::from_millis(settings.request_timeout_ms),
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            keep_alive: settings.keep_alive.clone(),
        }
    }
}

/// Raw backend output with accounting
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub text: String,
    /// Completion tokens, 0 when unknown
    pub tokens: usize,
    /// Prompt tokens, 0 when unknown
    pub prompt_tokens: usize,
    /// Wall time including retries
    pub total_time_ms: u64,
    pub finish_reason: FinishReason,
}

/// A chat-completion service
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerationResult, LlmError>;

    async fn is_available(&self) -> bool;

    fn model_name(&self) -> &str;

    /// Rough token estimate, about four graphemes per token
    fn estimate_tokens(&self, text: &str) -> usize {
        use unicode_segmentation::UnicodeSegmentation;

        text.graphemes(true).count().div_ceil(4)
    }
}

/// Ollama chat backend with retry on transient failures
#[derive(Clone)]
pub struct OllamaBackend {
    client: Client,
    config: LlmConfig,
}

impl OllamaBackend {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn chat_body(&self, request: &GenerateRequest) -> ChatBody {
        let max_tokens = request
            .max_tokens
            .map(|n| n as usize)
            .unwrap_or(self.config.max_tokens);

        ChatBody {
            model: self.config.model.clone(),
            messages: request.messages.iter().map(ChatMessage::from).collect(),
            stream: false,
            options: ChatOptions {
                temperature: request.temperature.unwrap_or(self.config.temperature),
                top_p: self.config.top_p,
                num_predict: max_tokens as i32,
            },
            keep_alive: self.config.keep_alive.clone(),
            // thinking models would otherwise put their reasoning before the answer
            think: false,
        }
    }

    async fn post_chat(&self, body: &ChatBody) -> Result<ChatReply, LlmError> {
        let mut http = self.client.post(self.api_url("/chat")).json(body);
        if let Some(key) = &self.config.api_key {
            http = http.bearer_auth(key);
        }

        let response = http.send().await?;
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse(e.to_string()));
        }

        let detail = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => LlmError::ModelNotFound(self.config.model.clone()),
            s if s.is_server_error() => LlmError::Network(format!("Server error {}: {}", s, detail)),
            _ => LlmError::Api(detail),
        })
    }

    /// Network errors, timeouts and 5xx are worth another attempt
    fn is_retryable(error: &LlmError) -> bool {
        matches!(error, LlmError::Network(_) | LlmError::Timeout)
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerationResult, LlmError> {
        let started = Instant::now();
        let body = self.chat_body(request);
        let mut backoff = self.config.initial_backoff;
        let mut attempt = 0;

        loop {
            match self.post_chat(&body).await {
                Ok(reply) => {
                    tracing::debug!(
                        model = %self.config.model,
                        attempts = attempt + 1,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Chat completion finished"
                    );
                    return Ok(GenerationResult {
                        text: reply.message.content,
                        tokens: reply.eval_count.unwrap_or(0) as usize,
                        prompt_tokens: reply.prompt_eval_count.unwrap_or(0) as usize,
                        total_time_ms: started.elapsed().as_millis() as u64,
                        finish_reason: finish_reason(reply.done, reply.done_reason.as_deref()),
                    });
                }
                Err(e) if Self::is_retryable(&e) && attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        error = %e,
                        attempt,
                        max_retries = self.config.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "Chat request failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn is_available(&self) -> bool {
        match self.client.get(self.api_url("/tags")).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

fn finish_reason(done: bool, reason: Option<&str>) -> FinishReason {
    match (done, reason) {
        (false, _) => FinishReason::Cancelled,
        (true, Some("length")) => FinishReason::Length,
        (true, _) => FinishReason::Stop,
    }
}

#[derive(Debug, Serialize)]
struct ChatBody {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
    keep_alive: String,
    think: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    top_p: f32,
    num_predict: i32,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    message: ChatMessage,
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    eval_count: Option<u64>,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
}
