pub mod client;
pub mod config;
pub mod ollama;

pub use agentos_common::{ChatMessage, Role};
pub use client::{ChatRequest, GenerateRequest, LlmClient, LlmResponse, TokenUsage};
pub use config::{build_llm_client, LlmConfig, SemaphoredClient};
pub use ollama::OllamaClient;
