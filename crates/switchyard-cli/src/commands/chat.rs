// Chat command - interactive conversation
//
// Every turn runs the agent against one shared InMemoryChatMemory, so the
// model sees the whole conversation. A failed turn is reported and the
// conversation continues from where it was before that turn.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use switchyard_agent::{ChatMemory, InMemoryChatMemory, ToolCallingAgent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::output::{print_tool_outputs, OutputFormat};

const EXIT_COMMANDS: [&str; 2] = ["exit", "quit"];

pub async fn run(
    agent: &ToolCallingAgent,
    output: OutputFormat,
    quiet: bool,
    window: Option<usize>,
) -> Result<()> {
    let memory = Arc::new(match window {
        Some(turns) => InMemoryChatMemory::with_window(turns),
        None => InMemoryChatMemory::new(),
    });

    if output.is_text() && !quiet {
        println!("Chatting with {} (type 'exit' to quit)", agent.config().model);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if output.is_text() {
            print!("> ");
            std::io::stdout().flush()?;
        }

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if EXIT_COMMANDS.contains(&input) {
            break;
        }

        let memory_handle: Arc<dyn ChatMemory> = memory.clone();
        match agent.run_with_memory(input, memory_handle).await {
            Ok(response) if output.is_text() => {
                if !quiet && !response.tool_outputs.is_empty() {
                    print_tool_outputs(&response.tool_outputs);
                }
                println!("{}", response.reply);
            }
            Ok(response) => output.print_value(&response)?,
            Err(err) if err.is_timeout() => {
                warn!(error = %err, "Turn timed out");
                eprintln!("No answer within {:?}", agent.config().timeout);
            }
            Err(err) => {
                warn!(error = %err, "Turn failed");
                eprintln!("Error: {err}");
            }
        }
    }

    if !quiet {
        eprintln!("{} turns in conversation", memory.len().await?);
    }
    Ok(())
}
