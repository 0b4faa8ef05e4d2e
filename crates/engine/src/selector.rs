//! Model-tier selection: complexity assessment, intent classification and
//! the tier precedence rule.
//!
//! Every inference call here is attempted once. Failures degrade to a safe
//! default (`simple`, conversational) rather than erroring.

use std::sync::Arc;

use agentos_llm::{GenerateRequest, LlmClient};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::prompts::{classifier_prompt, request_prompt, COMPLEXITY_PROMPT};
use crate::state::{Classification, Complexity, ModelId};

/// Pick the synthesis model. A caller override wins, then complex requests
/// get the heavy model, everything else the light one.
pub fn resolve_tier(
    model_override: Option<&str>,
    complexity: Complexity,
    light_model: &str,
    heavy_model: &str,
) -> ModelId {
    match (model_override, complexity) {
        (Some(model), _) => model.to_string(),
        (None, Complexity::Complex) => heavy_model.to_string(),
        (None, Complexity::Simple) => light_model.to_string(),
    }
}

pub struct ModelTierSelector {
    client: Arc<dyn LlmClient>,
    light_model: ModelId,
    heavy_model: ModelId,
}

impl ModelTierSelector {
    pub fn new(
        client: Arc<dyn LlmClient>,
        light_model: impl Into<ModelId>,
        heavy_model: impl Into<ModelId>,
    ) -> Self {
        Self {
            client,
            light_model: light_model.into(),
            heavy_model: heavy_model.into(),
        }
    }

    pub fn light_model(&self) -> &str {
        &self.light_model
    }

    pub fn heavy_model(&self) -> &str {
        &self.heavy_model
    }

    pub fn resolve_tier(&self, model_override: Option<&str>, complexity: Complexity) -> ModelId {
        resolve_tier(model_override, complexity, &self.light_model, &self.heavy_model)
    }

    pub async fn assess_complexity(&self, user_input: &str) -> Complexity {
        let request = GenerateRequest::new(self.light_model.clone(), request_prompt(user_input))
            .with_system(COMPLEXITY_PROMPT)
            .json();

        let reply = match self.client.generate(request).await {
            Ok(response) => response.content,
            Err(e) => {
                warn!(error = %e, "Complexity assessment failed, defaulting to simple");
                return Complexity::Simple;
            }
        };

        let complexity = match serde_json::from_str::<Value>(&reply) {
            Ok(value) => match value.get("complexity").and_then(Value::as_str) {
                Some(label) if label.eq_ignore_ascii_case("complex") => Complexity::Complex,
                _ => Complexity::Simple,
            },
            Err(e) => {
                warn!(error = %e, reply = %reply, "Unparseable complexity reply, defaulting to simple");
                Complexity::Simple
            }
        };

        info!(
            complexity = %complexity,
            input_preview = %user_input.chars().take(50).collect::<String>(),
            "Complexity assessed"
        );
        complexity
    }

    /// Classify with the light model regardless of tier.
    pub async fn classify_intent(&self, user_input: &str, tool_names: &[&str]) -> Classification {
        let request = GenerateRequest::new(self.light_model.clone(), request_prompt(user_input))
            .with_system(classifier_prompt(tool_names))
            .json();

        let reply = match self.client.generate(request).await {
            Ok(response) => response.content,
            Err(e) => {
                error!(model = %self.light_model, error = %e, "Classification failed");
                return Classification::conversational();
            }
        };

        match serde_json::from_str::<Value>(&reply) {
            Ok(value) if value.is_object() => {
                let classification = Classification::from_json(&value);
                debug!(
                    intent = %classification.intent,
                    tool = ?classification.tool,
                    "Intent classified"
                );
                classification
            }
            Ok(_) | Err(_) => {
                error!(model = %self.light_model, reply = %reply, "Classifier reply is not a JSON object");
                Classification::conversational()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Intent;
    use agentos_common::{AgentOsError, Result};
    use agentos_llm::{ChatRequest, LlmResponse};
    use async_trait::async_trait;

    struct Canned(std::result::Result<&'static str, &'static str>);

    #[async_trait]
    impl LlmClient for Canned {
        async fn generate(&self, _request: GenerateRequest) -> Result<LlmResponse> {
            match self.0 {
                Ok(text) => Ok(LlmResponse::text("m", text)),
                Err(e) => Err(AgentOsError::Inference(e.into())),
            }
        }
        async fn chat(&self, _request: ChatRequest) -> Result<LlmResponse> {
            Ok(LlmResponse::text("m", ""))
        }
        fn provider_name(&self) -> &str {
            "canned"
        }
    }

    fn selector(reply: std::result::Result<&'static str, &'static str>) -> ModelTierSelector {
        ModelTierSelector::new(Arc::new(Canned(reply)), "light", "heavy")
    }

    #[test]
    fn tier_precedence() {
        assert_eq!(resolve_tier(Some("pinned"), Complexity::Complex, "l", "h"), "pinned");
        assert_eq!(resolve_tier(None, Complexity::Complex, "l", "h"), "h");
        assert_eq!(resolve_tier(None, Complexity::Simple, "l", "h"), "l");
    }

    #[tokio::test]
    async fn complexity_parses_reply() {
        let s = selector(Ok(r#"{"complexity": "complex"}"#));
        assert_eq!(s.assess_complexity("write a compiler").await, Complexity::Complex);

        let s = selector(Ok(r#"{"complexity": "simple"}"#));
        assert_eq!(s.assess_complexity("hi").await, Complexity::Simple);
    }

    #[tokio::test]
    async fn complexity_defaults_to_simple() {
        assert_eq!(selector(Err("down")).assess_complexity("x").await, Complexity::Simple);
        assert_eq!(selector(Ok("not json")).assess_complexity("x").await, Complexity::Simple);
        assert_eq!(selector(Ok("{}")).assess_complexity("x").await, Complexity::Simple);
    }

    #[tokio::test]
    async fn classification_defaults_to_conversational() {
        let names = ["run_command"];
        assert_eq!(
            selector(Err("down")).classify_intent("x", &names).await,
            Classification::conversational()
        );
        assert_eq!(
            selector(Ok("[1, 2]")).classify_intent("x", &names).await,
            Classification::conversational()
        );
    }

    #[tokio::test]
    async fn classification_reads_tool_and_args() {
        let s = selector(Ok(
            r#"{"intent": "tool_use", "tool": "run_command", "args": {"command": "uptime"}}"#,
        ));
        let c = s.classify_intent("how long has it been up", &["run_command"]).await;
        assert_eq!(c.intent, Intent::ToolUse);
        assert_eq!(c.tool.as_deref(), Some("run_command"));
        assert_eq!(c.args["command"], "uptime");
    }
}
