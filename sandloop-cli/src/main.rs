//! # Sandloop CLI
//!
//! Command-line interface for running the sandboxed agent.
//!
//! Usage:
//!   sandloop [--verbose] [--root DIR] [--model M] [--base-url URL] <prompt>...
//!
//! Examples:
//!   sandloop "What files are in the root?"
//!   sandloop --root calculator "Fix the bug: 3 + 7 * 2 should be 17"
//!   sandloop --verbose --model llama-3.1-8b-instant "Run tests.py"
//!
//! Exit status: 0 when the model answered, 1 on a configuration error,
//! 2 when the loop aborted.

mod config;

use clap::Parser;
use config::Config;
use sandloop_agent::{Agent, AgentOutcome, LoopStatus};
use sandloop_core::{OpenAIProvider, SandboxRoot, ToolDispatcher};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const EXIT_CONFIG: i32 = 1;
const EXIT_ABORTED: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "sandloop")]
#[command(author, version, about = "Sandloop - an LLM coding agent confined to one directory")]
pub struct Cli {
    /// The task or question for the agent
    prompt: Vec<String>,

    /// Show prompts, tool arguments, tool results and token usage
    #[arg(short, long)]
    verbose: bool,

    /// Directory the agent may read, write and run scripts in
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Model name
    #[arg(short, long)]
    model: Option<String>,

    /// OpenAI-compatible endpoint
    #[arg(long)]
    base_url: Option<String>,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_usage(outcome: &AgentOutcome) {
    let usage = &outcome.usage;
    println!();
    println!("Iterations: {}", outcome.iterations);
    println!(
        "Tokens: {} prompt + {} completion = {}",
        usage.total_prompt_tokens,
        usage.total_completion_tokens,
        usage.total_tokens()
    );
    for (model, model_usage) in &usage.by_model {
        println!("  {}: {} tokens", model, model_usage.total_tokens);
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e.message());
            std::process::exit(EXIT_CONFIG);
        }
    };

    let root = match SandboxRoot::new(&config.root) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("Error: invalid root {}: {}", config.root.display(), e.message());
            std::process::exit(EXIT_CONFIG);
        }
    };

    let provider = match OpenAIProvider::new(config.provider_config()) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("Error: {}", e.message());
            std::process::exit(EXIT_CONFIG);
        }
    };

    tracing::info!(root = %root.path().display(), "sandbox ready");
    if config.verbose {
        println!("User prompt: {}", config.prompt);
    }

    let agent = Agent::new(provider, ToolDispatcher::new(root));
    let outcome = agent.run(&config.prompt).await;

    if config.verbose {
        print_usage(&outcome);
    }

    match outcome.status {
        LoopStatus::Finished { answer } => {
            println!("Final response:");
            println!("{}", answer);
        }
        LoopStatus::Aborted {
            reason,
            last_message,
        } => {
            eprintln!("Warning: {}", reason);
            if let Some(message) = last_message {
                println!("Last response:");
                println!("{}", message);
            }
            std::process::exit(EXIT_ABORTED);
        }
    }
}
