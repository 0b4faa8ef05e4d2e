//! Error types for agentos.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentOsError {
    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Memory error: {0}")]
    Memory(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentOsError>;
