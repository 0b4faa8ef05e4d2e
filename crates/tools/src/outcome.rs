use agentos_common::SafetyTier;
use serde::{Deserialize, Serialize};

/// Normalized result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    pub output: String,
    /// Safety tier of the command; only the shell tool sets it.
    #[serde(default)]
    pub tier: Option<SafetyTier>,
}

impl ToolOutcome {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            tier: None,
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            tier: None,
        }
    }

    pub fn with_tier(mut self, tier: Option<SafetyTier>) -> Self {
        self.tier = tier;
        self
    }
}

impl std::fmt::Display for ToolOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "success: {}", self.success)?;
        if let Some(tier) = self.tier {
            writeln!(f, "tier: {tier}")?;
        }
        write!(f, "output:\n{}", self.output)
    }
}
