//! Subcommand handlers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{AskArgs, Cli, Commands, InteractiveArgs, TeamArgs};
use crate::agent::{AssistantAgent, UserProxyAgent};
use crate::config::{McpServerConfig, ParleyConfig};
use crate::console::Console;
use crate::error::ParleyError;
use crate::mcp::McpServer;
use crate::provider::{create_provider, ModelProvider};
use crate::team::{AnyOf, MaxMessages, Participant, RoundRobinTeam, TeamResult, TextMention};
use crate::tools::Tool;
use crate::types::GenerationSettings;

/// Load configuration and dispatch the chosen subcommand.
pub async fn run(cli: Cli) -> Result<(), ParleyError> {
    let config = ParleyConfig::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Ask(args) => ask(&config, args).await,
        Commands::Team(args) => team(&config, args).await,
        Commands::Interactive(args) => interactive(&config, args).await,
    }
}

async fn ask(config: &ParleyConfig, args: AskArgs) -> Result<(), ParleyError> {
    let provider = create_provider(config)?;
    let settings = GenerationSettings::builder()
        .maybe_temperature(args.temperature)
        .maybe_max_tokens(args.max_tokens)
        .build();
    let agent = AssistantAgent::new("assistant", provider)
        .with_system_prompt(args.system.unwrap_or_default())
        .with_settings(settings);

    let result = agent.ask(args.prompt).await?;
    println!("{}", result.text);
    info!(
        prompt_tokens = result.usage.input_tokens,
        completion_tokens = result.usage.output_tokens,
        "completion finished"
    );
    Ok(())
}

async fn team(config: &ParleyConfig, mut args: TeamArgs) -> Result<(), ParleyError> {
    let provider = create_provider(config)?;

    tokio::fs::create_dir_all(&args.workspace).await?;
    args.workspace = tokio::fs::canonicalize(&args.workspace).await?;

    let servers = if args.no_tools {
        Vec::new()
    } else {
        let wanted = [
            config
                .mcp_server("fetch")
                .cloned()
                .unwrap_or_else(McpServerConfig::fetch),
            config
                .mcp_server("filesystem")
                .cloned()
                .unwrap_or_else(|| McpServerConfig::filesystem(&args.workspace)),
        ];
        connect_all(&wanted).await?
    };
    let tools: Vec<Arc<dyn Tool>> = servers.iter().flat_map(McpServer::tools).collect();

    let outcome = run_summary_team(provider, tools, &args).await;
    close_all(&servers).await;
    report(outcome?)
}

async fn run_summary_team(
    provider: Arc<dyn ModelProvider>,
    tools: Vec<Arc<dyn Tool>>,
    args: &TeamArgs,
) -> Result<TeamResult, ParleyError> {
    let assistant = |name: &str| {
        AssistantAgent::new(name, Arc::clone(&provider))
            .with_tools(tools.clone())
            .map(|agent| agent.with_reflect_on_tool_use(true))
    };

    let mut team = RoundRobinTeam::builder()
        .participant(assistant("ai_assistant_1")?)
        .participant(assistant("ai_assistant_2")?)
        .termination(
            AnyOf::default()
                .or(TextMention::new(args.stop_phrase.clone()))
                .or(MaxMessages::new(args.max_messages)),
        )
        .event_sink(Console::new(std::io::stdout()).into_sink())
        .build()?;

    team.run(args.task_text(), &cancel_on_ctrl_c()).await
}

async fn interactive(config: &ParleyConfig, args: InteractiveArgs) -> Result<(), ParleyError> {
    let provider = create_provider(config)?;

    let servers = if args.no_tools {
        Vec::new()
    } else {
        let fetch = config
            .mcp_server("fetch")
            .cloned()
            .unwrap_or_else(McpServerConfig::fetch);
        connect_all(&[fetch]).await?
    };
    let web_tools = (!args.no_tools)
        .then(|| servers.iter().flat_map(McpServer::tools).collect::<Vec<_>>());

    let outcome = run_research_team(provider, web_tools, &args).await;
    close_all(&servers).await;
    report(outcome?)
}

async fn run_research_team(
    provider: Arc<dyn ModelProvider>,
    web_tools: Option<Vec<Arc<dyn Tool>>>,
    args: &InteractiveArgs,
) -> Result<TeamResult, ParleyError> {
    let mut team = RoundRobinTeam::builder()
        .participants(research_participants(provider, web_tools)?)
        .termination(TextMention::new(args.exit_phrase.clone()))
        .max_turns(args.max_turns)
        .event_sink(Console::new(std::io::stdout()).into_sink())
        .build()?;

    team.run(args.task.clone(), &cancel_on_ctrl_c()).await
}

/// `web_surfer` (when it has tools), `assistant`, then the human.
fn research_participants(
    provider: Arc<dyn ModelProvider>,
    web_tools: Option<Vec<Arc<dyn Tool>>>,
) -> Result<Vec<Arc<dyn Participant>>, ParleyError> {
    let mut participants: Vec<Arc<dyn Participant>> = Vec::with_capacity(3);
    if let Some(tools) = web_tools {
        let web_surfer = AssistantAgent::new("web_surfer", Arc::clone(&provider))
            .with_description("Reads web pages with the fetch tool and reports what they say.")
            .with_system_prompt(WEB_SURFER_PROMPT)
            .with_tools(tools)?
            .with_reflect_on_tool_use(true);
        participants.push(Arc::new(web_surfer));
    }
    participants.push(Arc::new(AssistantAgent::new("assistant", provider)));
    participants.push(Arc::new(UserProxyAgent::new("user_proxy")));
    Ok(participants)
}

const WEB_SURFER_PROMPT: &str = "You research questions on the web. \
Use the fetch tool to read pages, then report what you found and cite the URLs you read.";

fn report(result: TeamResult) -> Result<(), ParleyError> {
    let result = result.into_completed()?;
    info!(run_id = %result.run_id, turns = result.turns(), reason = %result.stop_reason, "run complete");
    Ok(())
}

/// Connect to every server, closing the ones already started if one fails.
async fn connect_all(configs: &[McpServerConfig]) -> Result<Vec<Arc<McpServer>>, ParleyError> {
    let mut servers = Vec::with_capacity(configs.len());
    for config in configs {
        match McpServer::connect(config).await {
            Ok(server) => servers.push(server),
            Err(error) => {
                warn!(
                    server = %config.name,
                    command = %command_line(&config.command, &config.args),
                    error = %error,
                    "cannot start MCP server"
                );
                close_all(&servers).await;
                return Err(error);
            }
        }
    }
    Ok(servers)
}

async fn close_all(servers: &[Arc<McpServer>]) {
    for server in servers {
        if let Err(error) = server.close().await {
            warn!(server = %server.name(), error = %error, "failed to close MCP server");
        }
    }
}

fn command_line(command: &str, args: &[String]) -> String {
    std::iter::once(command)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Token that fires on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling run");
            trigger.cancel();
        }
    });
    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::provider::{ProviderRequest, ProviderResponse};
    use crate::tools::{FnTool, ParamKind, ToolSchema};

    struct SilentProvider;

    #[async_trait]
    impl ModelProvider for SilentProvider {
        fn provider_name(&self) -> &str {
            "silent"
        }

        fn model_id(&self) -> &str {
            "silent-1"
        }

        async fn generate_text(
            &self,
            _request: &ProviderRequest,
        ) -> Result<ProviderResponse, ParleyError> {
            Ok(ProviderResponse::default())
        }
    }

    fn fetch_tool() -> Arc<dyn Tool> {
        Arc::new(FnTool::new(
            "fetch",
            "Fetch a URL",
            ToolSchema::object()
                .required("url", ParamKind::String, "Page to read")
                .build(),
            |_args, _ctx| async { Ok(serde_json::json!("page text")) },
        ))
    }

    #[test]
    fn research_team_puts_web_surfer_first() {
        let participants =
            research_participants(Arc::new(SilentProvider), Some(vec![fetch_tool()])).unwrap();
        let names: Vec<_> = participants.iter().map(|p| p.name()).collect();
        assert_eq!(names, ["web_surfer", "assistant", "user_proxy"]);
        assert!(participants[0].description().contains("fetch"));
    }

    #[test]
    fn research_team_without_tools_skips_web_surfer() {
        let participants = research_participants(Arc::new(SilentProvider), None).unwrap();
        let names: Vec<_> = participants.iter().map(|p| p.name()).collect();
        assert_eq!(names, ["assistant", "user_proxy"]);
    }

    #[test]
    fn command_line_joins_arguments() {
        assert_eq!(
            command_line("uvx", &["mcp-server-fetch".to_string()]),
            "uvx mcp-server-fetch"
        );
    }
}
