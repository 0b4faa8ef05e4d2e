//! Interactive read-eval-print loop.

use agentos_common::ChatMessage;
use agentos_engine::{ResourceMonitor, WorkflowEngine};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Read one request per line until `exit`, `quit` or end of input.
///
/// History lives only for the session: each turn appends the user line and
/// the reply.
pub async fn run_repl<R, W>(
    engine: &WorkflowEngine,
    monitor: &ResourceMonitor,
    input: R,
    output: &mut W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut history: Vec<ChatMessage> = Vec::new();

    output
        .write_all(b"agentos ready. Type 'exit' to quit.\n")
        .await?;
    output.write_all(format!("{}\n", "-".repeat(50)).as_bytes()).await?;

    loop {
        output.write_all(b"\n>>> ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let user_input = line.trim();
        if user_input.eq_ignore_ascii_case("exit") || user_input.eq_ignore_ascii_case("quit") {
            break;
        }
        if user_input.is_empty() {
            continue;
        }

        let force_light = monitor.should_force_light_tier();
        if force_light {
            warn!("Resource pressure detected, forcing light model");
        }

        let state = engine
            .respond(user_input, history.clone(), force_light)
            .await;
        let response = state.final_response().unwrap_or("No response.").to_string();
        debug!(model = ?state.model_override(), "Turn complete");

        output
            .write_all(format!("\nAgent: {response}\n").as_bytes())
            .await?;

        history.push(ChatMessage::user(user_input));
        history.push(ChatMessage::assistant(response));
    }

    output.write_all(b"Goodbye!\n").await?;
    output.flush().await?;
    Ok(())
}
