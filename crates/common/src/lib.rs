//! Common types shared across the agentos crates.
//!
//! This crate holds the pieces every other crate agrees on: the error type,
//! the chat message shape used for conversation history, and the command
//! safety policy that guards anything headed for the operating system.

pub mod error;
pub mod message;
pub mod security;

pub use error::{AgentOsError, Result};
pub use message::{ChatMessage, Role};
pub use security::{
    wrap_sudo, CommandValidator, SafetyTier, TierPolicy, ValidationResult, DEFAULT_SUDO_WRAPPER,
};
