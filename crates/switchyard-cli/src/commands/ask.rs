// Ask command - answer one question

use anyhow::Result;
use switchyard_agent::ToolCallingAgent;
use tracing::debug;

use crate::output::{print_tool_outputs, OutputFormat};

pub async fn run(
    agent: &ToolCallingAgent,
    output: OutputFormat,
    quiet: bool,
    prompt: String,
) -> Result<()> {
    let response = agent.run(prompt).await?;
    debug!(run_id = %response.run_id, steps = response.steps.len(), "Run finished");

    if !output.is_text() {
        return output.print_value(&response);
    }

    if !quiet && !response.tool_outputs.is_empty() {
        println!("Tool calls:");
        print_tool_outputs(&response.tool_outputs);
        println!();
    }
    println!("{}", response.reply);
    Ok(())
}
