//! Tools the agent can invoke: a policy-guarded shell and plain file
//! operations, behind a single dispatcher.

pub mod command;
pub mod fs;
pub mod outcome;
pub mod registry;
pub mod shell;

pub use command::{CommandOutput, CommandRunner, ExecutionOutcome, SystemCommandRunner};
pub use fs::{FileTool, FsError};
pub use outcome::ToolOutcome;
pub use registry::{ToolId, ToolRegistry};
pub use shell::{ShellTool, DEFAULT_COMMAND_TIMEOUT};
