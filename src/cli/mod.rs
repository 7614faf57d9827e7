//! CLI entry point for parley.

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default page summarised by `parley team`.
pub const DEFAULT_URL: &str = "https://www.vtc.edu.hk/admission/tc/programme/it114115-higher-diploma-in-cloud-and-data-centre-administration/basic-information/";

/// parley: round-robin multi-agent conversations
#[derive(Parser, Debug)]
#[command(name = "parley", version, about = "Round-robin multi-agent conversations over LLMs and MCP tools")]
pub struct Cli {
    /// Config file (defaults to the platform config dir, e.g. ~/.config/parley/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one prompt to the configured model
    Ask(AskArgs),
    /// Two tool-using assistants summarise a web page into a markdown file
    Team(TeamArgs),
    /// Research a question with a web-reading agent, an assistant and you
    Interactive(InteractiveArgs),
}

/// Arguments for `parley ask`.
#[derive(Args, Debug)]
pub struct AskArgs {
    /// Prompt to send
    #[arg(default_value = "What is the capital of France?")]
    pub prompt: String,

    /// System prompt
    #[arg(short, long)]
    pub system: Option<String>,

    /// Temperature (0.0 - 2.0)
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Max tokens
    #[arg(long)]
    pub max_tokens: Option<u32>,
}

/// Arguments for `parley team`.
#[derive(Args, Debug)]
pub struct TeamArgs {
    /// Page to summarise
    #[arg(long, default_value = DEFAULT_URL)]
    pub url: String,

    /// Directory the filesystem tool server may write to
    #[arg(long, default_value = "task")]
    pub workspace: PathBuf,

    /// File name written inside the workspace
    #[arg(long, default_value = "summary.md")]
    pub output: String,

    /// Override the generated task text
    #[arg(long)]
    pub task: Option<String>,

    /// Stop once a message contains this text
    #[arg(long, default_value = "successfully written")]
    pub stop_phrase: String,

    /// Stop once the transcript holds this many messages (task included)
    #[arg(long, default_value_t = 10)]
    pub max_messages: usize,

    /// Run without MCP tool servers
    #[arg(long)]
    pub no_tools: bool,
}

impl TeamArgs {
    /// Task text handed to the team.
    pub fn task_text(&self) -> String {
        if let Some(task) = &self.task {
            return task.clone();
        }
        let target = self.workspace.join(&self.output);
        format!(
            "Read {url}, summarize it into markdown format. \
             Finally write the summarized result with write_file to {path}.",
            url = self.url,
            path = target.display()
        )
    }
}

/// Arguments for `parley interactive`.
#[derive(Args, Debug)]
pub struct InteractiveArgs {
    /// Opening task
    #[arg(default_value = "Who is Cyrus Wong?")]
    pub task: String,

    /// Typing a message containing this ends the conversation
    #[arg(long, default_value = "exit")]
    pub exit_phrase: String,

    /// Hard ceiling on turns
    #[arg(long, default_value_t = 50)]
    pub max_turns: usize,

    /// Leave out the web_surfer and its fetch tool server
    #[arg(long)]
    pub no_tools: bool,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Filter directive used when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "parley=info",
            1 => "parley=debug",
            _ => "parley=trace",
        }
    }
}

/// Install the global subscriber. Logs go to stderr so they never interleave
/// with the transcript on stdout.
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
