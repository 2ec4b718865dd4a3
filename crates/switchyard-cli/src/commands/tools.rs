// Tools command - list the tools offered to the model

use anyhow::Result;
use switchyard_agent::ToolRegistry;

use crate::output::{print_field, OutputFormat};

pub fn run(tools: &ToolRegistry, output: OutputFormat) -> Result<()> {
    let definitions = tools.tool_definitions();

    if !output.is_text() {
        return output.print_value(&definitions);
    }

    for definition in &definitions {
        print_field(&definition.name, &definition.description);
    }
    Ok(())
}
