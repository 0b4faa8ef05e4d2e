//! HTTP route handlers for the API.

use std::collections::BTreeMap;
use std::sync::Arc;

use agentos_common::{ChatMessage, Role};
use agentos_engine::{ResourceMetrics, ResourceStatus};
use agentos_tools::ToolOutcome;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::{AppState, MemorySession};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub agent_status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        agent_status: "ready",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
    })
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub cpu: f64,
    pub memory: f64,
    pub load_avg: BTreeMap<&'static str, f64>,
    pub temperature: f64,
    pub status: ResourceStatus,
    pub mode: &'static str,
}

impl From<ResourceMetrics> for StatusResponse {
    fn from(metrics: ResourceMetrics) -> Self {
        let load_avg = BTreeMap::from([
            ("1m", metrics.load_avg.one),
            ("5m", metrics.load_avg.five),
            ("15m", metrics.load_avg.fifteen),
        ]);
        let mode = match metrics.status {
            ResourceStatus::Critical => "Power Save",
            ResourceStatus::Healthy | ResourceStatus::Warning => "Performance",
        };
        Self {
            cpu: metrics.cpu_percent,
            memory: metrics.memory_percent,
            load_avg,
            temperature: metrics.temperature,
            status: metrics.status,
            mode,
        }
    }
}

/// Run sensor reads or store I/O on the blocking pool. `None` if the task
/// panicked or was cancelled.
async fn blocking<T, F>(state: &Arc<AppState>, work: F) -> Option<T>
where
    F: FnOnce(&AppState) -> T + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    match tokio::task::spawn_blocking(move || work(&state)).await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "Blocking task failed");
            None
        }
    }
}

/// Host resource snapshot.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let metrics = blocking(&state, |state| state.monitor.sample())
        .await
        .unwrap_or_else(ResourceMetrics::zeroed);
    Json(metrics.into())
}

/// Chat request body.
#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

/// Chat response body.
#[derive(Debug, Serialize)]
pub struct ChatResponseBody {
    pub response: String,
    pub tool_output: Option<ToolOutcome>,
    pub model_used: String,
}

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

/// Run one user turn through the workflow.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequestBody>,
) -> Result<Json<ChatResponseBody>, ErrorResponse> {
    if request.message.trim().is_empty() {
        return Err(ErrorResponse {
            error: "message must not be empty".into(),
            code: "EMPTY_MESSAGE",
        });
    }

    info!(
        content_preview = %request.message.chars().take(50).collect::<String>(),
        history_len = request.history.len(),
        "Received message"
    );

    let force_light = blocking(&state, |state| state.monitor.should_force_light_tier())
        .await
        .unwrap_or(false);
    if force_light {
        warn!("Resource pressure detected, forcing light model");
    }

    let history = if state.memory.is_some() && request.history.is_empty() {
        blocking(&state, |state| {
            state
                .memory
                .as_ref()
                .map(MemorySession::recent_history)
                .unwrap_or_default()
        })
        .await
        .unwrap_or_default()
    } else {
        request.history
    };

    let result = state
        .engine
        .respond(&request.message, history, force_light)
        .await;

    let response = result
        .final_response()
        .unwrap_or("No response generated.")
        .to_string();
    let model_used = result.model_override().unwrap_or("unknown").to_string();
    let tool_output = result.tool_output().cloned();

    if state.memory.is_some() {
        let message = request.message;
        let (reply, model, tool) = (response.clone(), model_used.clone(), tool_output.clone());
        blocking(&state, move |state| {
            if let Some(memory) = &state.memory {
                persist_turn(memory, &message, &reply, &model, tool.as_ref());
            }
        })
        .await;
    }

    Ok(Json(ChatResponseBody {
        response,
        tool_output,
        model_used,
    }))
}

/// Persistence failures are logged, never surfaced to the client.
fn persist_turn(
    memory: &MemorySession,
    message: &str,
    response: &str,
    model_used: &str,
    tool_output: Option<&ToolOutcome>,
) {
    let id = memory.conversation_id;
    if let Err(e) = memory.store.save_message(id, Role::User, message, None) {
        warn!(error = %e, "Failed to save user message");
    }
    let metadata = json!({ "model": model_used, "tool_output": tool_output });
    if let Err(e) = memory
        .store
        .save_message(id, Role::Assistant, response, Some(&metadata))
    {
        warn!(error = %e, "Failed to save assistant message");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentos_engine::LoadAverage;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok",
            agent_status: "ready",
            version: "0.1.0",
            uptime_seconds: 100,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["agent_status"], "ready");
    }

    #[test]
    fn test_chat_request_history_defaults_to_empty() {
        let request: ChatRequestBody = serde_json::from_str(r#"{"message": "Hello"}"#).unwrap();
        assert_eq!(request.message, "Hello");
        assert!(request.history.is_empty());
    }

    #[test]
    fn test_chat_request_with_history() {
        let json = r#"{"message": "and now?", "history": [{"role": "user", "content": "hi"}]}"#;
        let request: ChatRequestBody = serde_json::from_str(json).unwrap();
        assert_eq!(request.history, vec![ChatMessage::user("hi")]);
    }

    #[test]
    fn test_status_response_shape() {
        let metrics = ResourceMetrics {
            cpu_percent: 91.0,
            memory_percent: 40.0,
            load_avg: LoadAverage {
                one: 3.0,
                five: 2.0,
                fifteen: 1.0,
            },
            temperature: 70.0,
            status: ResourceStatus::Critical,
        };
        let json = serde_json::to_value(StatusResponse::from(metrics)).unwrap();
        assert_eq!(json["mode"], "Power Save");
        assert_eq!(json["status"], "critical");
        assert_eq!(json["load_avg"]["15m"], 1.0);
    }

    /// Records the thread each reading was taken on.
    #[derive(Clone, Default)]
    struct ThreadRecorder(Arc<std::sync::Mutex<Vec<std::thread::ThreadId>>>);

    impl agentos_engine::SensorSource for ThreadRecorder {
        fn usage(&self) -> agentos_common::Result<agentos_engine::Usage> {
            self.0.lock().unwrap().push(std::thread::current().id());
            Ok(agentos_engine::Usage::default())
        }

        fn temperature(&self) -> f64 {
            0.0
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sensor_reads_run_off_the_runtime_thread() {
        let recorder = ThreadRecorder::default();
        let engine = agentos_engine::build_engine(&agentos_engine::AgentConfig::default()).unwrap();
        let monitor = agentos_engine::ResourceMonitor::new(
            agentos_engine::MonitorConfig::default(),
            Box::new(recorder.clone()),
        );
        let state = Arc::new(AppState::new(engine, monitor));

        let Json(body) = status(State(state)).await;
        assert_eq!(body.status, ResourceStatus::Healthy);

        let threads = recorder.0.lock().unwrap().clone();
        assert_eq!(threads.len(), 1);
        assert_ne!(threads[0], std::thread::current().id());
    }
}
