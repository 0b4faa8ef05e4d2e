use std::sync::Arc;
use std::time::Duration;

use agentos_common::{AgentOsError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::{ChatRequest, GenerateRequest, LlmClient, LlmResponse};
use crate::ollama::OllamaClient;

pub const DEFAULT_LIGHT_MODEL: &str = "qwen2.5-coder:1.5b";
pub const DEFAULT_HEAVY_MODEL: &str = "llama3";

/// Environment variable that overrides the configured host.
pub const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_light_model")]
    pub light_model: String,
    #[serde(default = "default_heavy_model")]
    pub heavy_model: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

fn default_provider() -> String {
    "ollama".into()
}

fn default_light_model() -> String {
    DEFAULT_LIGHT_MODEL.into()
}

fn default_heavy_model() -> String {
    DEFAULT_HEAVY_MODEL.into()
}

fn default_timeout_ms() -> u64 {
    120_000
}

fn default_max_concurrent() -> usize {
    2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            host: None,
            light_model: default_light_model(),
            heavy_model: default_heavy_model(),
            timeout_ms: default_timeout_ms(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

impl LlmConfig {
    /// Host to talk to: `OLLAMA_HOST` if set, else the configured host.
    pub fn resolve_host(&self) -> Option<String> {
        std::env::var(OLLAMA_HOST_ENV)
            .ok()
            .filter(|h| !h.trim().is_empty())
            .or_else(|| self.host.clone())
    }
}

/// Caps the number of in-flight inference calls shared by all requests.
pub struct SemaphoredClient {
    inner: Arc<dyn LlmClient>,
    semaphore: Arc<tokio::sync::Semaphore>,
}

impl SemaphoredClient {
    pub fn new(inner: Arc<dyn LlmClient>, max_concurrent: usize) -> Self {
        Self {
            inner,
            semaphore: Arc::new(tokio::sync::Semaphore::new(max_concurrent.max(1))),
        }
    }

    async fn permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>> {
        self.semaphore
            .acquire()
            .await
            .map_err(|e| AgentOsError::Inference(format!("Semaphore acquire failed: {e}")))
    }
}

#[async_trait]
impl LlmClient for SemaphoredClient {
    async fn generate(&self, request: GenerateRequest) -> Result<LlmResponse> {
        let _permit = self.permit().await?;
        self.inner.generate(request).await
    }

    async fn chat(&self, request: ChatRequest) -> Result<LlmResponse> {
        let _permit = self.permit().await?;
        self.inner.chat(request).await
    }

    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }
}

pub fn build_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let base_client: Arc<dyn LlmClient> = match config.provider.as_str() {
        "ollama" => {
            let host = config.resolve_host();
            let client =
                OllamaClient::new(host, Duration::from_millis(config.timeout_ms))?;
            info!(host = %client.base_url(), "Using Ollama inference backend");
            Arc::new(client)
        }
        other => {
            return Err(AgentOsError::Config(format!(
                "Unknown LLM provider: {other}"
            )));
        }
    };

    Ok(Arc::new(SemaphoredClient::new(
        base_client,
        config.max_concurrent_requests,
    )))
}
