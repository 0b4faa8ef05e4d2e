//! Per-request state carried through the workflow.

use std::fmt;

use agentos_common::ChatMessage;
use agentos_tools::ToolOutcome;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Name of an inference model, e.g. `llama3`.
pub type ModelId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ToolUse,
    Conversational,
    Ambiguous,
}

impl Intent {
    /// Interpret the classifier's `intent` field. Absent means
    /// conversational; anything unrecognized is ambiguous.
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            None => Intent::Conversational,
            Some("tool_use") => Intent::ToolUse,
            Some("conversational") => Intent::Conversational,
            Some(_) => Intent::Ambiguous,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::ToolUse => "tool_use",
            Intent::Conversational => "conversational",
            Intent::Ambiguous => "ambiguous",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Complex,
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Complexity::Simple => f.write_str("simple"),
            Complexity::Complex => f.write_str("complex"),
        }
    }
}

/// Classifier verdict for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    pub tool: Option<String>,
    pub args: Map<String, Value>,
}

impl Classification {
    pub fn conversational() -> Self {
        Self {
            intent: Intent::Conversational,
            tool: None,
            args: Map::new(),
        }
    }

    /// Build from the classifier's JSON reply. Missing or mistyped fields
    /// fall back to their empty values.
    pub fn from_json(value: &Value) -> Self {
        let intent = Intent::from_label(value.get("intent").and_then(Value::as_str));
        let tool = value
            .get("tool")
            .and_then(Value::as_str)
            .map(str::to_string);
        let args = value
            .get("args")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Self { intent, tool, args }
    }
}

/// The selected tool, its arguments and, once dispatched, its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    tool: String,
    args: Map<String, Value>,
    output: Option<ToolOutcome>,
}

impl ToolCall {
    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn args(&self) -> &Map<String, Value> {
        &self.args
    }

    pub fn output(&self) -> Option<&ToolOutcome> {
        self.output.as_ref()
    }
}

/// Everything known about one user turn.
#[derive(Debug, Clone)]
pub struct RequestState {
    user_input: String,
    history: Vec<ChatMessage>,
    intent: Intent,
    tool_call: Option<ToolCall>,
    final_response: Option<String>,
    model_override: Option<ModelId>,
    complexity: Option<Complexity>,
}

impl RequestState {
    pub fn new(user_input: impl Into<String>, history: Vec<ChatMessage>) -> Self {
        Self {
            user_input: user_input.into(),
            history,
            intent: Intent::Ambiguous,
            tool_call: None,
            final_response: None,
            model_override: None,
            complexity: None,
        }
    }

    /// Pin the model used for synthesis. A caller-set override is never
    /// replaced by tier selection.
    pub fn with_model_override(mut self, model: impl Into<ModelId>) -> Self {
        self.model_override = Some(model.into());
        self
    }

    pub fn user_input(&self) -> &str {
        &self.user_input
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    pub fn tool_call(&self) -> Option<&ToolCall> {
        self.tool_call.as_ref()
    }

    pub fn selected_tool(&self) -> Option<&str> {
        self.tool_call.as_ref().map(ToolCall::tool)
    }

    pub fn tool_output(&self) -> Option<&ToolOutcome> {
        self.tool_call.as_ref().and_then(ToolCall::output)
    }

    pub fn final_response(&self) -> Option<&str> {
        self.final_response.as_deref()
    }

    pub fn model_override(&self) -> Option<&str> {
        self.model_override.as_deref()
    }

    pub fn complexity(&self) -> Option<Complexity> {
        self.complexity
    }

    /// True when the classifier asked for a tool.
    pub fn routes_to_tool(&self) -> bool {
        self.intent == Intent::ToolUse && self.tool_call.is_some()
    }

    pub(crate) fn set_complexity(&mut self, complexity: Complexity) {
        self.complexity = Some(complexity);
    }

    pub(crate) fn set_model_override(&mut self, model: ModelId) {
        self.model_override = Some(model);
    }

    /// Record the classifier verdict. The tool is kept only for `tool_use`.
    pub(crate) fn apply_classification(&mut self, classification: Classification) {
        self.intent = classification.intent;
        self.tool_call = match (classification.intent, classification.tool) {
            (Intent::ToolUse, Some(tool)) => Some(ToolCall {
                tool,
                args: classification.args,
                output: None,
            }),
            _ => None,
        };
    }

    pub(crate) fn record_tool_output(&mut self, outcome: ToolOutcome) {
        if let Some(call) = self.tool_call.as_mut() {
            call.output = Some(outcome);
        }
    }

    /// Set the reply. Later calls are ignored.
    pub(crate) fn set_final_response(&mut self, response: String) {
        if self.final_response.is_some() {
            warn!("Final response already set; ignoring");
            return;
        }
        self.final_response = Some(response);
    }
}
