//! Command safety policy.
//!
//! Every shell command proposed by the classifier passes through
//! [`CommandValidator::validate`] before it can reach the operating system.
//! The rules are evaluated in a fixed order and the first match wins:
//!
//! 1. empty command
//! 2. `sudo` as the base token
//! 3. `rm` with `-rf` / `-fr`
//! 4. read-only set (tier 1)
//! 5. write set (tier 2)
//! 6. high-risk set (tier 3)
//! 7. anything else is unknown and rejected

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Risk tier assigned to a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyTier {
    #[serde(rename = "TIER_1_SAFE")]
    Tier1Safe,
    #[serde(rename = "TIER_2_WRITE")]
    Tier2Write,
    #[serde(rename = "TIER_3_HIGH_RISK")]
    Tier3HighRisk,
    #[serde(rename = "TIER_3_SUDO")]
    Tier3Sudo,
    Unknown,
}

impl SafetyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyTier::Tier1Safe => "TIER_1_SAFE",
            SafetyTier::Tier2Write => "TIER_2_WRITE",
            SafetyTier::Tier3HighRisk => "TIER_3_HIGH_RISK",
            SafetyTier::Tier3Sudo => "TIER_3_SUDO",
            SafetyTier::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for SafetyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of validating one command string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_safe: bool,
    pub reason: String,
    /// `None` only for the empty command.
    pub tier: Option<SafetyTier>,
}

impl ValidationResult {
    fn allow(reason: impl Into<String>, tier: SafetyTier) -> Self {
        Self {
            is_safe: true,
            reason: reason.into(),
            tier: Some(tier),
        }
    }

    fn deny(reason: impl Into<String>, tier: Option<SafetyTier>) -> Self {
        Self {
            is_safe: false,
            reason: reason.into(),
            tier,
        }
    }

    /// Tier label used in block messages, `None` rendered as `None`.
    pub fn tier_label(&self) -> &'static str {
        self.tier.as_ref().map(SafetyTier::as_str).unwrap_or("None")
    }
}

/// Command-name sets for each tier.
///
/// Membership is checked against the base token only (the first
/// whitespace-delimited word), so entries are single command names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPolicy {
    #[serde(default)]
    pub read_only: BTreeSet<String>,
    #[serde(default)]
    pub write: BTreeSet<String>,
    #[serde(default)]
    pub high_risk: BTreeSet<String>,
}

const DEFAULT_READ_ONLY: &[&str] = &[
    "ls", "pwd", "whoami", "echo", "cat", "grep", "head", "tail", "tree", "find",
];

const DEFAULT_WRITE: &[&str] = &["touch", "mkdir", "cp", "mv", "rm", "python", "python3"];

const DEFAULT_HIGH_RISK: &[&str] = &[
    "mkfs", "dd", "reboot", "shutdown", "chmod", "chown", "wget", "curl", "ssh",
];

fn to_set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            read_only: to_set(DEFAULT_READ_ONLY),
            write: to_set(DEFAULT_WRITE),
            high_risk: to_set(DEFAULT_HIGH_RISK),
        }
    }
}

impl TierPolicy {
    /// An empty policy: every non-special command is `UNKNOWN`.
    pub fn empty() -> Self {
        Self {
            read_only: BTreeSet::new(),
            write: BTreeSet::new(),
            high_risk: BTreeSet::new(),
        }
    }

    /// Add the commands of `other` to this policy's sets.
    pub fn extend(mut self, other: &TierPolicy) -> Self {
        self.read_only.extend(other.read_only.iter().cloned());
        self.write.extend(other.write.iter().cloned());
        self.high_risk.extend(other.high_risk.iter().cloned());
        self
    }

    pub fn with_read_only(mut self, command: impl Into<String>) -> Self {
        self.read_only.insert(command.into());
        self
    }

    pub fn with_write(mut self, command: impl Into<String>) -> Self {
        self.write.insert(command.into());
        self
    }

    pub fn with_high_risk(mut self, command: impl Into<String>) -> Self {
        self.high_risk.insert(command.into());
        self
    }
}

/// Classifies command strings against a [`TierPolicy`].
#[derive(Debug, Clone, Default)]
pub struct CommandValidator {
    policy: TierPolicy,
}

impl CommandValidator {
    pub fn new(policy: TierPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &TierPolicy {
        &self.policy
    }

    /// Classify `command`. Pure: the same input always yields the same result.
    pub fn validate(&self, command: &str) -> ValidationResult {
        let parts: Vec<&str> = command.split_whitespace().collect();
        let Some((&base, args)) = parts.split_first() else {
            return ValidationResult::deny("Empty command", None);
        };

        if base == "sudo" {
            return ValidationResult::deny(
                "Sudo commands require manual review.",
                Some(SafetyTier::Tier3Sudo),
            );
        }

        if base == "rm" && args.iter().any(|a| *a == "-rf" || *a == "-fr") {
            return ValidationResult::deny(
                "Recursive delete (rm -rf) is dangerous.",
                Some(SafetyTier::Tier3HighRisk),
            );
        }

        if self.policy.read_only.contains(base) {
            return ValidationResult::allow("Safe read-only command.", SafetyTier::Tier1Safe);
        }

        if self.policy.write.contains(base) {
            return ValidationResult::allow(
                "Write operation - Requires Confirmation.",
                SafetyTier::Tier2Write,
            );
        }

        if self.policy.high_risk.contains(base) {
            return ValidationResult::deny("High risk command.", Some(SafetyTier::Tier3HighRisk));
        }

        ValidationResult::deny(
            format!("Unknown command '{base}'. Proceed with caution."),
            Some(SafetyTier::Unknown),
        )
    }
}

/// Default elevation wrapper binary.
pub const DEFAULT_SUDO_WRAPPER: &str = "agentos-sudo";

/// Route `sudo` through a constrained elevation wrapper.
///
/// `sudo apt update` becomes `sudo <wrapper> apt update`; anything not
/// starting with `sudo ` is returned unchanged.
///
/// NOTE: the validator rejects every `sudo` base token, so when this runs
/// after validation (as the shell tool does) the rewrite never fires. Both
/// rules are kept as-is until the elevation policy is decided.
pub fn wrap_sudo(command: &str, wrapper: &str) -> String {
    match command.strip_prefix("sudo ") {
        Some(inner) => format!("sudo {wrapper} {inner}"),
        None => command.to_string(),
    }
}
