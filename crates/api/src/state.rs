//! Application state for the API server.

use agentos_common::{ChatMessage, Result};
use agentos_engine::{ResourceMonitor, WorkflowEngine};
use agentos_memory::{ConversationId, ConversationStore};
use tracing::{info, warn};

/// Conversation persistence for the running server.
pub struct MemorySession {
    pub store: ConversationStore,
    pub conversation_id: ConversationId,
    /// Messages loaded when a request arrives without history.
    pub context_limit: usize,
}

impl MemorySession {
    /// Attach to the conversation started within the last hour, or start one.
    pub fn new(store: ConversationStore, context_limit: usize) -> Result<Self> {
        let conversation_id = store.get_or_create_conversation()?;
        info!(conversation_id, "Using conversation");
        Ok(Self {
            store,
            conversation_id,
            context_limit,
        })
    }

    /// Recent messages as chat history. Read failures yield an empty history.
    pub fn recent_history(&self) -> Vec<ChatMessage> {
        match self.store.get_recent_context(self.context_limit) {
            Ok(messages) => messages.iter().map(|m| m.to_chat_message()).collect(),
            Err(e) => {
                warn!(error = %e, "Failed to load recent context");
                Vec::new()
            }
        }
    }
}

/// Shared application state for the API server.
pub struct AppState {
    pub engine: WorkflowEngine,

    pub monitor: ResourceMonitor,

    /// `None` when persistence is disabled
    pub memory: Option<MemorySession>,

    /// Server start time (for health checks)
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(engine: WorkflowEngine, monitor: ResourceMonitor) -> Self {
        Self {
            engine,
            monitor,
            memory: None,
            start_time: std::time::Instant::now(),
        }
    }

    pub fn with_memory(mut self, memory: MemorySession) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Get the uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
