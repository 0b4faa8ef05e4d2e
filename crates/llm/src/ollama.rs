use std::time::Duration;

use agentos_common::{AgentOsError, ChatMessage, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{ChatRequest, GenerateRequest, LlmClient, LlmResponse, TokenUsage};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    stream: bool,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    model: String,
    response: String,
    done_reason: Option<String>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    model: String,
    message: OllamaMessage,
    done_reason: Option<String>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaMessage {
    content: String,
}

fn usage(prompt: Option<u32>, completion: Option<u32>) -> Option<TokenUsage> {
    match (prompt, completion) {
        (None, None) => None,
        (p, c) => Some(TokenUsage {
            prompt_tokens: p.unwrap_or(0),
            completion_tokens: c.unwrap_or(0),
        }),
    }
}

/// Client for a local Ollama server.
pub struct OllamaClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        reqwest::Url::parse(&base_url).map_err(|e| {
            AgentOsError::Config(format!("Invalid Ollama host '{base_url}': {e}"))
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentOsError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn generate_body<'a>(request: &'a GenerateRequest) -> OllamaGenerateRequest<'a> {
        OllamaGenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            format: request.json_mode.then_some("json"),
            stream: false,
        }
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AgentOsError::Inference(format!("Ollama request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(AgentOsError::Inference(format!(
                "Ollama API error {status}: {body_text}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AgentOsError::Inference(format!("Failed to parse Ollama response: {e}")))
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, request: GenerateRequest) -> Result<LlmResponse> {
        debug!(model = %request.model, json_mode = request.json_mode, "Ollama generate");
        let body = Self::generate_body(&request);
        let parsed: OllamaGenerateResponse = self.post("/api/generate", &body).await?;

        Ok(LlmResponse {
            content: parsed.response,
            model: parsed.model,
            usage: usage(parsed.prompt_eval_count, parsed.eval_count),
            finish_reason: parsed.done_reason,
        })
    }

    async fn chat(&self, request: ChatRequest) -> Result<LlmResponse> {
        debug!(model = %request.model, messages = request.messages.len(), "Ollama chat");
        let body = OllamaChatRequest {
            model: &request.model,
            messages: &request.messages,
            stream: false,
        };
        let parsed: OllamaChatResponse = self.post("/api/chat", &body).await?;

        Ok(LlmResponse {
            content: parsed.message.content,
            model: parsed.model,
            usage: usage(parsed.prompt_eval_count, parsed.eval_count),
            finish_reason: parsed.done_reason,
        })
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }
}
