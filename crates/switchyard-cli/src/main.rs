// Switchyard CLI
//
// Design Decision: Use clap derive for argument parsing; flags override the
// SWITCHYARD_* environment read by AgentConfig::from_env.
// Design Decision: Logs go to stderr so stdout carries only answers (and JSON).
// Design Decision: The model endpoint is any OpenAI-compatible server
// (OPENAI_API_KEY, optional OPENAI_BASE_URL).

mod commands;
mod output;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use switchyard_agent::{
    AgentConfig, EchoTool, OpenAiChatClient, ToolCallingAgent, ToolRegistry,
};
use switchyard_core::TracingEventEmitter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "Switchyard - a tool-calling agent driven by an event-routed step graph")]
#[command(version)]
pub struct Cli {
    /// Model identifier
    #[arg(long, short)]
    pub model: Option<String>,

    /// System prompt
    #[arg(long)]
    pub system_prompt: Option<String>,

    /// Deadline for one run, in seconds
    #[arg(long, short)]
    pub timeout: Option<u64>,

    /// Run the tool calls of one batch concurrently
    #[arg(long)]
    pub parallel_tools: bool,

    /// Output format
    #[arg(long, short, default_value = "text", value_parser = ["text", "json"])]
    pub output: String,

    /// Suppress non-essential output (tool calls, logs below warn)
    #[arg(long, short)]
    pub quiet: bool,

    /// Log every step start and completion
    #[arg(long)]
    pub trace_steps: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask one question and print the answer
    Ask {
        /// Question text
        prompt: String,
    },

    /// Interactive conversation; history is kept across turns
    Chat {
        /// Send at most this many recent turns to the model
        #[arg(long)]
        window: Option<usize>,
    },

    /// List the tools the agent can call
    Tools,
}

fn init_tracing(cli: &Cli) {
    // Run events from TracingEventEmitter are logged at debug
    let default_filter = match (cli.quiet, cli.trace_steps) {
        (true, _) => "warn",
        (false, true) => "switchyard_cli=info,switchyard_agent=info,switchyard_core=debug",
        (false, false) => "switchyard_cli=info,switchyard_agent=info,switchyard_core=info",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Tools offered to the model
fn default_tools() -> ToolRegistry {
    let mut tools = ToolRegistry::math();
    tools.register(EchoTool);
    tools
}

fn agent_config(cli: &Cli) -> anyhow::Result<AgentConfig> {
    let mut config = AgentConfig::from_env()?;
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(prompt) = &cli.system_prompt {
        config.system_prompt = prompt.clone();
    }
    if let Some(secs) = cli.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    if cli.parallel_tools {
        config.parallel_tool_calls = true;
    }
    Ok(config)
}

fn build_agent(cli: &Cli) -> anyhow::Result<ToolCallingAgent> {
    let config = agent_config(cli)?;
    let client = OpenAiChatClient::from_env().context("cannot reach a model")?;

    let mut builder = ToolCallingAgent::builder()
        .config(config)
        .model_client(Arc::new(client))
        .tools(default_tools());
    if cli.trace_steps {
        builder = builder.emitter(Arc::new(TracingEventEmitter));
    }
    Ok(builder.build()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(&cli);
    let output_format = output::OutputFormat::parse(&cli.output);

    match &cli.command {
        Commands::Ask { prompt } => {
            let agent = build_agent(&cli)?;
            commands::ask::run(&agent, output_format, cli.quiet, prompt.clone()).await
        }
        Commands::Chat { window } => {
            let agent = build_agent(&cli)?;
            commands::chat::run(&agent, output_format, cli.quiet, *window).await
        }
        Commands::Tools => commands::tools::run(&default_tools(), output_format),
    }
}
