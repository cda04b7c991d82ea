//! Toolrelay CLI
//!
//! Serves the built-in tools over MCP, or talks to a running server.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use config::{get_config_path, ConfigLoader, RelayConfig};
use mcp::handlers::{builtin_registry, WebSearchTool};
use mcp::{ClientOptions, McpClient, McpServer, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "toolrelay",
    about = "Model Context Protocol tool server and client over HTTP + SSE",
    version,
    author
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "TOOLRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server
    Serve(ServeArgs),

    /// List the tools of a running server
    Tools(ToolsArgs),

    /// Call a tool on a running server
    Call(CallArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Listen address (overrides server.bind)
    #[arg(long, env = "TOOLRELAY_BIND")]
    bind: Option<SocketAddr>,
}

#[derive(Args)]
struct ToolsArgs {
    /// Server endpoint (overrides client.url)
    #[arg(long, env = "TOOLRELAY_URL")]
    url: Option<String>,

    /// Print descriptors in function-calling format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CallArgs {
    /// Server endpoint (overrides client.url)
    #[arg(long, env = "TOOLRELAY_URL")]
    url: Option<String>,

    /// Tool name
    name: String,

    /// Tool arguments as a JSON object
    #[arg(long, default_value = "{}")]
    args: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match load_config(cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Serve(args) => cmd_serve(config, args).await,
        Commands::Tools(args) => cmd_tools(config, args).await,
        Commands::Call(args) => cmd_call(config, args).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<RelayConfig> {
    match path {
        // An explicit path must exist
        Some(path) => ConfigLoader::new(&path)
            .use_defaults(false)
            .load()
            .with_context(|| format!("loading {}", path.display())),
        None => {
            let path = get_config_path();
            ConfigLoader::new(&path)
                .load()
                .with_context(|| format!("loading {}", path.display()))
        }
    }
}

fn build_registry(config: &RelayConfig) -> Result<mcp::ToolRegistry> {
    let search = &config.tools.web_search;
    let web_search = if !search.enabled {
        None
    } else if let Some(api_key) = search.api_key() {
        let tool = WebSearchTool::new(
            &search.endpoint,
            &search.deployment,
            api_key,
            search.timeout(),
        )
        .context("configuring web_search")?;
        Some(tool)
    } else {
        warn!(
            "{} is not set; web_search will not be registered",
            search.api_key_env
        );
        None
    };

    Ok(builtin_registry(config.tools.calculator.enabled, web_search)?)
}

async fn cmd_serve(config: RelayConfig, args: ServeArgs) -> Result<ExitCode> {
    let bind = args.bind.unwrap_or(config.server.bind);
    let server_config = ServerConfig {
        name: config.server.name.clone(),
        protocol_version: config.server.protocol_version.clone(),
        supported_versions: config.server.supported_versions.clone(),
        ..ServerConfig::default()
    };

    let server = Arc::new(McpServer::new(server_config, build_registry(&config)?));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {}", bind))?;

    mcp::server::serve(listener, server, &config.server.path, shutdown_signal())
        .await
        .context("serving")?;

    info!("Server stopped");
    Ok(ExitCode::SUCCESS)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn connect(config: &RelayConfig, url: Option<String>) -> Result<McpClient> {
    let url = url.unwrap_or_else(|| config.client.url.clone());
    let client = McpClient::new(ClientOptions {
        timeout: config.client.timeout(),
        client_name: config.client.client_name.clone(),
        ..ClientOptions::default()
    })?;
    client.connect(&url).await?;
    Ok(client)
}

async fn cmd_tools(config: RelayConfig, args: ToolsArgs) -> Result<ExitCode> {
    let client = connect(&config, args.url).await?;
    let tools = client.list_tools().await?;

    if args.json {
        let functions: Vec<_> = tools.iter().map(|t| t.to_function_tool()).collect();
        println!("{}", serde_json::to_string_pretty(&functions)?);
        return Ok(ExitCode::SUCCESS);
    }

    if tools.is_empty() {
        println!("No tools available.");
    }
    for tool in &tools {
        println!("{}", tool.name);
        if !tool.description.is_empty() {
            println!("    {}", tool.description);
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_call(config: RelayConfig, args: CallArgs) -> Result<ExitCode> {
    let arguments: serde_json::Value =
        serde_json::from_str(&args.args).context("--args must be valid JSON")?;
    if !arguments.is_object() {
        bail!("--args must be a JSON object");
    }

    let client = connect(&config, args.url).await?;
    let result = client.call_tool_result(&args.name, arguments).await?;

    println!("{}", mcp::client::result_text(&result));

    Ok(if result.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
