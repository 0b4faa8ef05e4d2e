//! Static tool registry and dispatcher.
//!
//! Maps a [`ToolId`] to its executor and normalizes every result into a
//! [`ToolOutcome`]. Dispatch never fails: unknown tools and bad arguments come
//! back as failed outcomes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::fs::{FileTool, FsResult};
use crate::outcome::ToolOutcome;
use crate::shell::ShellTool;

/// Identifier of a registered tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    RunCommand,
    ReadFile,
    WriteFile,
    ListDir,
    FindFiles,
}

impl ToolId {
    pub const ALL: [ToolId; 5] = [
        ToolId::RunCommand,
        ToolId::ReadFile,
        ToolId::WriteFile,
        ToolId::ListDir,
        ToolId::FindFiles,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolId::RunCommand => "run_command",
            ToolId::ReadFile => "read_file",
            ToolId::WriteFile => "write_file",
            ToolId::ListDir => "list_dir",
            ToolId::FindFiles => "find_files",
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("unknown tool '{s}'"))
    }
}

pub struct ToolRegistry {
    shell: ShellTool,
    files: FileTool,
}

impl ToolRegistry {
    pub fn new(shell: ShellTool) -> Self {
        Self {
            shell,
            files: FileTool,
        }
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        ToolId::ALL.iter().map(ToolId::as_str).collect()
    }

    pub fn shell(&self) -> &ShellTool {
        &self.shell
    }

    /// Dispatch by raw name, as produced by the classifier.
    pub async fn dispatch_named(&self, name: &str, args: &Map<String, Value>) -> ToolOutcome {
        match name.parse::<ToolId>() {
            Ok(id) => self.dispatch(id, args).await,
            Err(_) => {
                warn!(tool = %name, "Tool not found");
                ToolOutcome::failed("tool not found")
            }
        }
    }

    pub async fn dispatch(&self, tool: ToolId, args: &Map<String, Value>) -> ToolOutcome {
        debug!(tool = %tool, args = ?args, "Dispatching tool");
        match tool {
            ToolId::RunCommand => match required(args, "command") {
                Ok(command) => self.shell.run(command).await,
                Err(e) => invalid(tool, e),
            },
            ToolId::ReadFile => match required(args, "file_path") {
                Ok(path) => {
                    let path = path.to_owned();
                    self.blocking(tool, move |files| files.read_file(&path)).await
                }
                Err(e) => invalid(tool, e),
            },
            ToolId::WriteFile => {
                match (required(args, "file_path"), required(args, "content")) {
                    (Ok(path), Ok(content)) => {
                        let (path, content) = (path.to_owned(), content.to_owned());
                        self.blocking(tool, move |files| files.write_file(&path, &content))
                            .await
                    }
                    (Err(e), _) | (_, Err(e)) => invalid(tool, e),
                }
            }
            ToolId::ListDir => match optional(args, "path", ".") {
                Ok(path) => {
                    let path = path.to_owned();
                    self.blocking(tool, move |files| files.list_dir(&path)).await
                }
                Err(e) => invalid(tool, e),
            },
            ToolId::FindFiles => {
                match (required(args, "pattern"), optional(args, "path", ".")) {
                    (Ok(pattern), Ok(path)) => {
                        let (pattern, path) = (pattern.to_owned(), path.to_owned());
                        self.blocking(tool, move |files| files.find_files(&pattern, &path))
                            .await
                    }
                    (Err(e), _) | (_, Err(e)) => invalid(tool, e),
                }
            }
        }
    }

    /// File tools use `std::fs` and may walk large trees, so they run on the
    /// blocking pool.
    async fn blocking<F>(&self, tool: ToolId, op: F) -> ToolOutcome
    where
        F: FnOnce(FileTool) -> FsResult + Send + 'static,
    {
        let files = self.files;
        match tokio::task::spawn_blocking(move || op(files)).await {
            Ok(result) => normalize(result),
            Err(e) => {
                warn!(tool = %tool, error = %e, "File tool task failed");
                ToolOutcome::failed(format!("Execution error: {e}"))
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(ShellTool::default())
    }
}

fn required<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str, String> {
    match args.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(format!("'{key}' must be a string, got {other}")),
        None => Err(format!("missing required argument '{key}'")),
    }
}

fn optional<'a>(
    args: &'a Map<String, Value>,
    key: &str,
    default: &'a str,
) -> Result<&'a str, String> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(_) => required(args, key),
    }
}

fn invalid(tool: ToolId, detail: String) -> ToolOutcome {
    warn!(tool = %tool, detail = %detail, "Invalid tool arguments");
    ToolOutcome::failed(format!("Invalid arguments: {detail}"))
}

fn normalize(result: FsResult) -> ToolOutcome {
    match result {
        Ok(output) => ToolOutcome::ok(output),
        Err(e) => ToolOutcome::failed(e.to_string()),
    }
}
