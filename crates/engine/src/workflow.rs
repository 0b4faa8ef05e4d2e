//! The request workflow.
//!
//! A fixed sequence of stages with no back edges:
//!
//! ```text
//! Start -> Classified -> ToolDispatched -> Terminal
//!                   \_______________________/
//! ```
//!
//! `Classified` goes to `ToolDispatched` only when the classifier chose
//! `tool_use` and named a tool. `Terminal` synthesizes the reply.

use std::sync::Arc;
use std::time::Duration;

use agentos_common::{ChatMessage, CommandValidator, Result};
use agentos_llm::{build_llm_client, LlmClient};
use agentos_tools::{ShellTool, SystemCommandRunner, ToolRegistry};
use tracing::{debug, info};

use crate::config::AgentConfig;
use crate::selector::ModelTierSelector;
use crate::state::RequestState;
use crate::synthesizer::Synthesizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Classified,
    ToolDispatched,
    Terminal,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::Classified => "classified",
            Stage::ToolDispatched => "tool_dispatched",
            Stage::Terminal => "terminal",
        }
    }
}

pub struct WorkflowEngine {
    selector: ModelTierSelector,
    registry: ToolRegistry,
    synthesizer: Synthesizer,
}

impl WorkflowEngine {
    pub fn new(
        client: Arc<dyn LlmClient>,
        registry: ToolRegistry,
        light_model: impl Into<String>,
        heavy_model: impl Into<String>,
    ) -> Self {
        Self {
            selector: ModelTierSelector::new(client.clone(), light_model, heavy_model),
            registry,
            synthesizer: Synthesizer::new(client),
        }
    }

    pub fn selector(&self) -> &ModelTierSelector {
        &self.selector
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Answer one user turn. `history` holds the prior turns only.
    ///
    /// `force_light_tier` pins synthesis to the light model, as when the host
    /// is under resource pressure.
    pub async fn respond(
        &self,
        user_input: &str,
        history: Vec<ChatMessage>,
        force_light_tier: bool,
    ) -> RequestState {
        let mut state = RequestState::new(user_input, history);
        if force_light_tier {
            state = state.with_model_override(self.selector.light_model());
        }
        self.run(state).await
    }

    /// Drive `state` through every stage. Infallible: every failure along
    /// the way has already been folded into the state.
    pub async fn run(&self, mut state: RequestState) -> RequestState {
        let mut stage = Stage::Start;
        loop {
            debug!(stage = stage.as_str(), "Entering stage");
            stage = match stage {
                Stage::Start => {
                    self.classify(&mut state).await;
                    Stage::Classified
                }
                Stage::Classified if state.routes_to_tool() => {
                    self.dispatch(&mut state).await;
                    Stage::ToolDispatched
                }
                Stage::Classified => Stage::Terminal,
                Stage::ToolDispatched => Stage::Terminal,
                Stage::Terminal => {
                    self.synthesize(&mut state).await;
                    break;
                }
            };
        }
        state
    }

    async fn classify(&self, state: &mut RequestState) {
        let complexity = self.selector.assess_complexity(state.user_input()).await;
        state.set_complexity(complexity);

        let caller_selected = state.model_override().is_some();
        let model = self.selector.resolve_tier(state.model_override(), complexity);
        info!(model = %model, complexity = %complexity, caller_selected, "Model tier selected");
        state.set_model_override(model);

        let tool_names = self.registry.tool_names();
        let classification = self
            .selector
            .classify_intent(state.user_input(), &tool_names)
            .await;
        state.apply_classification(classification);

        info!(
            intent = %state.intent(),
            tool = ?state.selected_tool(),
            "Request classified"
        );
    }

    async fn dispatch(&self, state: &mut RequestState) {
        let Some(call) = state.tool_call() else {
            return;
        };
        info!(tool = %call.tool(), "Running tool");
        let outcome = self.registry.dispatch_named(call.tool(), call.args()).await;
        debug!(tool = %call.tool(), success = outcome.success, "Tool finished");
        state.record_tool_output(outcome);
    }

    async fn synthesize(&self, state: &mut RequestState) {
        let model = state
            .model_override()
            .unwrap_or(self.selector.light_model())
            .to_string();
        let response = self.synthesizer.synthesize(state, &model).await;
        state.set_final_response(response);
    }
}

/// Wire an engine from configuration: inference client, safety policy,
/// shell tool and registry.
pub fn build_engine(config: &AgentConfig) -> Result<WorkflowEngine> {
    let client = build_llm_client(&config.llm)?;
    Ok(build_engine_with_client(config, client))
}

/// Like [`build_engine`] with a caller-supplied inference client.
pub fn build_engine_with_client(config: &AgentConfig, client: Arc<dyn LlmClient>) -> WorkflowEngine {
    let shell = ShellTool::new(
        CommandValidator::new(config.safety.tier_policy()),
        Arc::new(SystemCommandRunner::new()),
    )
    .with_timeout(Duration::from_secs(config.safety.command_timeout_secs))
    .with_sudo_wrapper(config.safety.sudo_wrapper.clone());

    info!(
        light_model = %config.llm.light_model,
        heavy_model = %config.llm.heavy_model,
        command_timeout_secs = config.safety.command_timeout_secs,
        "Workflow engine ready"
    );

    WorkflowEngine::new(
        client,
        ToolRegistry::new(shell),
        config.llm.light_model.clone(),
        config.llm.heavy_model.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_engine_from_default_config() {
        let engine = build_engine(&AgentConfig::default()).unwrap();
        assert_eq!(engine.selector().light_model(), agentos_llm::config::DEFAULT_LIGHT_MODEL);
        assert_eq!(engine.selector().heavy_model(), agentos_llm::config::DEFAULT_HEAVY_MODEL);
        assert_eq!(engine.registry().tool_names().len(), 5);
    }

    #[test]
    fn build_engine_rejects_unknown_provider() {
        let mut config = AgentConfig::default();
        config.llm.provider = "nowhere".into();
        assert!(build_engine(&config).is_err());
    }

    #[test]
    fn configured_timeout_and_policy_reach_the_shell() {
        let mut config = AgentConfig::default();
        config.safety.read_only.push("uptime".into());
        let engine = build_engine_with_client(
            &config,
            build_llm_client(&config.llm).unwrap(),
        );
        let verdict = engine.registry().shell().validator().validate("uptime");
        assert!(verdict.is_safe);
    }
}
