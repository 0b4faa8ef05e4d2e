use std::sync::Arc;

use agentos_common::ChatMessage;
use agentos_llm::{ChatRequest, LlmClient};
use tracing::{error, info};

use crate::prompts::{SYSTEM_IDENTITY, TOOL_RESULT_FRAMING};
use crate::state::RequestState;

/// Produces the final reply from the conversation and any tool result.
pub struct Synthesizer {
    client: Arc<dyn LlmClient>,
}

impl Synthesizer {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Identity prompt, history, the current turn, then the tool result if
    /// one was produced.
    pub fn build_messages(&self, state: &RequestState) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(state.history().len() + 4);
        messages.push(ChatMessage::system(SYSTEM_IDENTITY));
        messages.extend(state.history().iter().cloned());
        messages.push(ChatMessage::user(state.user_input()));

        if let Some(call) = state.tool_call() {
            if let Some(outcome) = call.output() {
                messages.push(ChatMessage::system(TOOL_RESULT_FRAMING));
                messages.push(ChatMessage::user(format!(
                    "Tool Output: Result of tool '{}':\n{}",
                    call.tool(),
                    outcome
                )));
            }
        }
        messages
    }

    /// Never fails: an inference error becomes the reply text.
    pub async fn synthesize(&self, state: &RequestState, model: &str) -> String {
        let request = ChatRequest {
            model: model.to_string(),
            messages: self.build_messages(state),
        };

        match self.client.chat(request).await {
            Ok(response) => {
                info!(model = %model, chars = response.content.len(), "Response synthesized");
                response.content
            }
            Err(e) => {
                error!(model = %model, error = %e, "Synthesis failed");
                format!("I encountered an error: {e}")
            }
        }
    }
}
