//! Shell tool: validate, rewrite, execute.

use std::sync::Arc;
use std::time::Duration;

use agentos_common::{wrap_sudo, CommandValidator, DEFAULT_SUDO_WRAPPER};
use tracing::{info, warn};

use crate::command::{CommandRunner, ExecutionOutcome, SystemCommandRunner};
use crate::outcome::ToolOutcome;

/// Hard wall-clock limit for one command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

pub struct ShellTool {
    validator: CommandValidator,
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
    sudo_wrapper: String,
}

impl ShellTool {
    pub fn new(validator: CommandValidator, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            validator,
            runner,
            timeout: DEFAULT_COMMAND_TIMEOUT,
            sudo_wrapper: DEFAULT_SUDO_WRAPPER.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_sudo_wrapper(mut self, wrapper: impl Into<String>) -> Self {
        self.sudo_wrapper = wrapper.into();
        self
    }

    pub fn validator(&self) -> &CommandValidator {
        &self.validator
    }

    /// Run `command` if the safety policy allows it.
    pub async fn run(&self, command: &str) -> ToolOutcome {
        let verdict = self.validator.validate(command);
        if !verdict.is_safe {
            warn!(
                command = %command,
                reason = %verdict.reason,
                tier = verdict.tier_label(),
                "Blocked command"
            );
            return ToolOutcome::failed(format!(
                "Security Block: {} (Tier: {})",
                verdict.reason,
                verdict.tier_label()
            ))
            .with_tier(verdict.tier);
        }

        let final_command = wrap_sudo(command, &self.sudo_wrapper);
        info!(command = %final_command, tier = verdict.tier_label(), "Executing command");

        let outcome = match self.runner.run(&final_command, self.timeout).await {
            ExecutionOutcome::Completed(out) => {
                let mut output = out.stdout;
                if !out.stderr.is_empty() {
                    output.push_str("\nStderr: ");
                    output.push_str(&out.stderr);
                }
                let output = output.trim();
                let output = if output.is_empty() { "(No output)" } else { output };
                if out.success {
                    ToolOutcome::ok(output)
                } else {
                    ToolOutcome::failed(output)
                }
            }
            ExecutionOutcome::TimedOut => ToolOutcome::failed("Command timed out."),
            ExecutionOutcome::Failed(detail) => {
                ToolOutcome::failed(format!("Execution error: {detail}"))
            }
        };

        outcome.with_tier(verdict.tier)
    }
}

impl Default for ShellTool {
    fn default() -> Self {
        Self::new(
            CommandValidator::default(),
            Arc::new(SystemCommandRunner::new()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandOutput, ScriptedCommandRunner};
    use agentos_common::{SafetyTier, TierPolicy};

    fn scripted(outcome: ExecutionOutcome) -> Arc<ScriptedCommandRunner> {
        Arc::new(ScriptedCommandRunner::new(vec![outcome]))
    }

    fn completed(stdout: &str, stderr: &str, code: i32) -> ExecutionOutcome {
        ExecutionOutcome::Completed(CommandOutput {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code: Some(code),
            success: code == 0,
        })
    }

    #[tokio::test]
    async fn blocked_command_never_reaches_the_runner() {
        let runner = scripted(completed("should not run", "", 0));
        let tool = ShellTool::new(CommandValidator::default(), runner.clone());

        let outcome = tool.run("sudo rm -rf /").await;
        assert!(!outcome.success);
        assert_eq!(
            outcome.output,
            "Security Block: Sudo commands require manual review. (Tier: TIER_3_SUDO)"
        );
        assert_eq!(outcome.tier, Some(SafetyTier::Tier3Sudo));
        assert!(runner.seen().is_empty());
    }

    #[tokio::test]
    async fn empty_command_block_reports_none_tier() {
        let tool = ShellTool::new(CommandValidator::default(), scripted(completed("", "", 0)));
        let outcome = tool.run("  ").await;
        assert_eq!(outcome.output, "Security Block: Empty command (Tier: None)");
        assert_eq!(outcome.tier, None);
    }

    #[tokio::test]
    async fn stderr_is_appended_under_label() {
        let tool = ShellTool::new(
            CommandValidator::default(),
            scripted(completed("out\n", "warn\n", 0)),
        );
        let outcome = tool.run("ls").await;
        assert!(outcome.success);
        assert_eq!(outcome.output, "out\n\nStderr: warn");
        assert_eq!(outcome.tier, Some(SafetyTier::Tier1Safe));
    }

    #[tokio::test]
    async fn empty_output_is_labelled() {
        let tool = ShellTool::new(CommandValidator::default(), scripted(completed("", "", 0)));
        assert_eq!(tool.run("touch a").await.output, "(No output)");
    }

    #[tokio::test]
    async fn non_zero_exit_is_failure_with_output() {
        let tool = ShellTool::new(
            CommandValidator::default(),
            scripted(completed("", "cat: x: No such file", 1)),
        );
        let outcome = tool.run("cat x").await;
        assert!(!outcome.success);
        assert!(outcome.output.contains("No such file"));
    }

    #[tokio::test]
    async fn timeout_and_launch_failure_are_reported() {
        let tool = ShellTool::new(CommandValidator::default(), scripted(ExecutionOutcome::TimedOut));
        let outcome = tool.run("find / -name x").await;
        assert_eq!(outcome.output, "Command timed out.");
        assert!(!outcome.success);
        assert_eq!(outcome.tier, Some(SafetyTier::Tier1Safe));

        let tool = ShellTool::new(
            CommandValidator::default(),
            scripted(ExecutionOutcome::Failed("No such file or directory".into())),
        );
        let outcome = tool.run("ls").await;
        assert_eq!(outcome.output, "Execution error: No such file or directory");
    }

    #[tokio::test]
    async fn real_timeout_discards_partial_output() {
        let policy = TierPolicy::default().with_read_only("sleep");
        let tool = ShellTool::new(
            CommandValidator::new(policy),
            Arc::new(SystemCommandRunner::new()),
        )
        .with_timeout(Duration::from_millis(200));

        let outcome = tool.run("sleep 5").await;
        assert!(!outcome.success);
        assert_eq!(outcome.output, "Command timed out.");
    }

    #[tokio::test]
    async fn allowed_command_reaches_runner_unchanged() {
        let runner = scripted(completed("ok", "", 0));
        let tool = ShellTool::new(CommandValidator::default(), runner.clone());
        tool.run("ls -la").await;
        assert_eq!(runner.seen(), vec!["ls -la"]);
    }
}
