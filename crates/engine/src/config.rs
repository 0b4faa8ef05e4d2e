//! Configuration for the agent.
//!
//! Every section defaults, so an empty file (or no file) is a valid
//! configuration.

use std::path::{Path, PathBuf};

use agentos_common::{TierPolicy, DEFAULT_SUDO_WRAPPER};
use agentos_llm::LlmConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub safety: SafetyConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Extra commands per tier, on top of the built-in sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    #[serde(default)]
    pub read_only: Vec<String>,

    #[serde(default)]
    pub write: Vec<String>,

    #[serde(default)]
    pub high_risk: Vec<String>,

    #[serde(default = "default_sudo_wrapper")]
    pub sudo_wrapper: String,

    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

fn default_sudo_wrapper() -> String {
    DEFAULT_SUDO_WRAPPER.into()
}

fn default_command_timeout() -> u64 {
    60
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            read_only: Vec::new(),
            write: Vec::new(),
            high_risk: Vec::new(),
            sudo_wrapper: default_sudo_wrapper(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

impl SafetyConfig {
    pub fn tier_policy(&self) -> TierPolicy {
        let extra = TierPolicy {
            read_only: self.read_only.iter().cloned().collect(),
            write: self.write.iter().cloned().collect(),
            high_risk: self.high_risk.iter().cloned().collect(),
        };
        TierPolicy::default().extend(&extra)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_cpu_critical")]
    pub cpu_critical: f64,

    #[serde(default = "default_memory_critical")]
    pub memory_critical: f64,
}

fn default_cpu_critical() -> f64 {
    85.0
}

fn default_memory_critical() -> f64 {
    90.0
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            cpu_critical: default_cpu_critical(),
            memory_critical: default_memory_critical(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// SQLite database file; `~` is expanded.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Messages loaded when a request arrives without history.
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
}

fn default_db_path() -> String {
    "~/.agentos/memory.db".into()
}

fn default_context_limit() -> usize {
    10
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            context_limit: default_context_limit(),
        }
    }
}

impl MemoryConfig {
    pub fn resolved_db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.db_path).as_ref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from a TOML file.
    ///
    /// On Unix the file must be a regular file and must not be
    /// world-writable, since it decides which commands may run.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        #[cfg(unix)]
        validate_config_file_permissions(path)?;

        Self::from_file_unchecked(path)
    }

    /// Load configuration without permission checks.
    pub fn from_file_unchecked(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(unix)]
fn validate_config_file_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::symlink_metadata(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;

    if !metadata.is_file() {
        anyhow::bail!(
            "Config path '{}' is not a regular file. Symlinks and directories are not allowed.",
            path.display()
        );
    }

    let permission_bits = metadata.permissions().mode() & 0o777;
    if permission_bits & 0o002 != 0 {
        anyhow::bail!(
            "Config file '{}' is world-writable (mode {:04o}). Fix with: chmod o-w {}",
            path.display(),
            permission_bits,
            path.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TOML_CONFIG: &str = r#"
[llm]
host = "http://gpu-box:11434"
heavy_model = "llama3:70b"

[safety]
read_only = ["uptime", "df"]
high_risk = ["nc"]
command_timeout_secs = 15

[monitor]
cpu_critical = 75.0

[memory]
db_path = "/var/lib/agentos/memory.db"

[server]
port = 9000
"#;

    #[test]
    fn deserialize_full_config() {
        let config: AgentConfig = toml::from_str(TOML_CONFIG).unwrap();
        assert_eq!(config.llm.heavy_model, "llama3:70b");
        assert_eq!(config.safety.command_timeout_secs, 15);
        assert_eq!(config.safety.sudo_wrapper, DEFAULT_SUDO_WRAPPER);
        assert_eq!(config.monitor.cpu_critical, 75.0);
        assert_eq!(config.monitor.memory_critical, 90.0);
        assert_eq!(config.memory.context_limit, 10);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn empty_config_is_all_defaults() {
        let config: AgentConfig = toml::from_str("").unwrap();
        assert_eq!(config.safety.command_timeout_secs, 60);
        assert_eq!(config.monitor, MonitorConfig::default());
        assert_eq!(config.server.port, 8000);
        assert!(!config
            .memory
            .resolved_db_path()
            .display()
            .to_string()
            .starts_with('~'));
    }

    #[test]
    fn tier_policy_extends_defaults() {
        let config: AgentConfig = toml::from_str(TOML_CONFIG).unwrap();
        let policy = config.safety.tier_policy();
        assert!(policy.read_only.contains("uptime"));
        assert!(policy.read_only.contains("ls"));
        assert!(policy.high_risk.contains("nc"));
        assert!(policy.write.contains("rm"));
    }

    #[cfg(unix)]
    #[test]
    fn world_writable_config_is_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[server]\nport = 1\n").unwrap();
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o666)).unwrap();
        assert!(AgentConfig::from_file(file.path()).is_err());

        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600)).unwrap();
        let config = AgentConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 1);
    }

    #[test]
    fn directories_are_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(AgentConfig::from_file(dir.path()).is_err());
    }
}
