//! The agent's request pipeline.
//!
//! ```text
//! user input + history
//!      │
//!      ▼
//! ┌─────────────────────┐
//! │  ModelTierSelector  │  complexity, tier, intent
//! └─────────┬───────────┘
//!           │ tool_use?
//!     ┌─────┴──────┐
//!     ▼            │
//! [ToolRegistry]   │   shell (validated) / file tools
//!     │            │
//!     └─────┬──────┘
//!           ▼
//! ┌─────────────────────┐
//! │     Synthesizer     │  final reply
//! └─────────────────────┘
//! ```
//!
//! [`ResourceMonitor`] sits beside the pipeline; callers consult it once per
//! request to decide whether to pin the light model.

pub mod config;
pub mod monitor;
pub mod prompts;
pub mod selector;
pub mod state;
pub mod synthesizer;
pub mod workflow;

pub use config::{AgentConfig, MemoryConfig, MonitorConfig, SafetyConfig, ServerConfig};
pub use monitor::{
    LoadAverage, ResourceMetrics, ResourceMonitor, ResourceStatus, SensorSource, SystemSensors,
    Usage,
};
pub use selector::{resolve_tier, ModelTierSelector};
pub use state::{Classification, Complexity, Intent, ModelId, RequestState, ToolCall};
pub use synthesizer::Synthesizer;
pub use workflow::{build_engine, build_engine_with_client, Stage, WorkflowEngine};
