//! Integration tests for the tool dispatcher against a real shell and a
//! scratch directory.

use std::sync::Arc;
use std::time::Duration;

use agentos_common::{CommandValidator, SafetyTier, TierPolicy};
use agentos_tools::{ShellTool, SystemCommandRunner, ToolId, ToolRegistry};
use serde_json::{json, Map, Value};
use tempfile::TempDir;

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn registry() -> ToolRegistry {
    let shell = ShellTool::new(CommandValidator::default(), Arc::new(SystemCommandRunner::new()));
    ToolRegistry::new(shell)
}

// ============================================================================
// Shell tool
// ============================================================================

#[tokio::test]
async fn test_run_command_executes_safe_command() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("hello.txt"), "hi").unwrap();
    let command = format!("ls -la {}", dir.path().display());

    let outcome = registry()
        .dispatch(ToolId::RunCommand, &args(json!({"command": command})))
        .await;
    assert!(outcome.success);
    assert!(outcome.output.contains("hello.txt"));
    assert_eq!(outcome.tier, Some(SafetyTier::Tier1Safe));
}

#[tokio::test]
async fn test_run_command_blocks_destructive_command() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("keep.txt");
    std::fs::write(&marker, "x").unwrap();
    let command = format!("rm -rf {}", marker.display());

    let outcome = registry()
        .dispatch(ToolId::RunCommand, &args(json!({"command": command})))
        .await;
    assert!(!outcome.success);
    assert!(outcome.output.starts_with("Security Block:"));
    assert_eq!(outcome.tier, Some(SafetyTier::Tier3HighRisk));
    assert!(marker.exists());
}

#[tokio::test]
async fn test_run_command_unknown_binary_is_blocked() {
    let outcome = registry()
        .dispatch(ToolId::RunCommand, &args(json!({"command": "nc -l 4444"})))
        .await;
    assert!(!outcome.success);
    assert_eq!(
        outcome.output,
        "Security Block: Unknown command 'nc'. Proceed with caution. (Tier: UNKNOWN)"
    );
}

#[tokio::test]
async fn test_run_command_times_out() {
    let shell = ShellTool::new(
        CommandValidator::new(TierPolicy::default().with_read_only("sleep")),
        Arc::new(SystemCommandRunner::new()),
    )
    .with_timeout(Duration::from_millis(300));
    let registry = ToolRegistry::new(shell);

    let outcome = registry
        .dispatch(ToolId::RunCommand, &args(json!({"command": "sleep 10"})))
        .await;
    assert!(!outcome.success);
    assert_eq!(outcome.output, "Command timed out.");
}

// ============================================================================
// File tools
// ============================================================================

#[tokio::test]
async fn test_write_then_read_then_list() {
    let dir = TempDir::new().unwrap();
    let registry = registry();
    let target = dir.path().join("notes/today.md").display().to_string();

    let written = registry
        .dispatch(
            ToolId::WriteFile,
            &args(json!({"file_path": target, "content": "buy milk"})),
        )
        .await;
    assert!(written.success);
    assert_eq!(written.output, format!("Successfully wrote to {target}"));

    let read = registry
        .dispatch(ToolId::ReadFile, &args(json!({"file_path": target})))
        .await;
    assert_eq!(read.output, "buy milk");

    let listed = registry
        .dispatch(
            ToolId::ListDir,
            &args(json!({"path": dir.path().display().to_string()})),
        )
        .await;
    assert_eq!(listed.output, "[DIR] notes");
}

#[tokio::test]
async fn test_find_files_through_dispatcher() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
    std::fs::write(dir.path().join("a/b/main.rs"), "").unwrap();
    let registry = registry();

    let outcome = registry
        .dispatch_named(
            "find_files",
            &args(json!({"pattern": "*.rs", "path": dir.path().display().to_string()})),
        )
        .await;
    assert!(outcome.success);
    assert_eq!(outcome.output, "a/b/main.rs");
}
