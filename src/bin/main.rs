use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use toolbridge::tools::{Mailer, ToolArgs};
use toolbridge::{
    Dispatcher, OllamaPlanner, PrefixPlanner, ToolConfig, TurnPlanner, builtin_registry,
    create_app, list_tools,
};

#[derive(Parser)]
#[command(name = "toolbridge")]
#[command(about = "Tool registry, dispatcher and chat gateway")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum PlannerKind {
    /// `tool: text` calls a tool, anything else is echoed
    Prefix,
    /// Ask a local Ollama model which tool to call
    Ollama,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP and WebSocket server
    Serve {
        #[arg(long, env = "TOOLBRIDGE_BIND", default_value = "0.0.0.0:8000")]
        bind: String,
        /// How chat turns pick a tool
        #[arg(long, env = "TOOLBRIDGE_PLANNER", value_enum, default_value_t = PlannerKind::Prefix)]
        planner: PlannerKind,
    },
    /// Print the discovery document for every registered tool
    Tools,
    /// Call a tool once and print its result
    Call {
        tool: String,
        /// Arguments as key=value pairs
        args: Vec<String>,
    },
    /// Run the TCP email relay
    Relay {
        #[arg(long, env = "TOOLBRIDGE_RELAY_BIND", default_value = toolbridge::relay::DEFAULT_RELAY_ADDR)]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_log_filter());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = ToolConfig::from_env();
    config.validate()?;

    match cli.command {
        Commands::Serve { bind, planner } => {
            let planner: Arc<dyn TurnPlanner> = match planner {
                PlannerKind::Prefix => Arc::new(PrefixPlanner),
                PlannerKind::Ollama => {
                    info!(
                        "Using Ollama model {} at {}",
                        config.ollama.model, config.ollama.url
                    );
                    Arc::new(OllamaPlanner::new(
                        config.ollama.clone(),
                        reqwest::Client::new(),
                    ))
                }
            };

            let app = create_app(&config, planner);
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("failed to bind {}", bind))?;

            info!("Server listening on http://{}", listener.local_addr()?);
            axum::serve(listener, app).await?;
        }
        Commands::Tools => {
            let registry = builtin_registry(&config);
            println!("{}", serde_json::to_string_pretty(&list_tools(&registry))?);
        }
        Commands::Call { tool, args } => {
            let arguments = parse_key_values(&args)?;
            let dispatcher = Dispatcher::new(Arc::new(builtin_registry(&config)));

            match dispatcher.execute(&tool, arguments).await {
                Ok(result) => println!("{}", result.result),
                Err(e) => bail!("{} (status {})", e, e.status_code()),
            }
        }
        Commands::Relay { bind } => {
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("failed to bind {}", bind))?;
            toolbridge::relay::serve(listener, Mailer::new(config.smtp.clone())).await?;
        }
    }

    Ok(())
}

const DEFAULT_LOG_DIRECTIVES: &str = "toolbridge=info,tower_http=info";

/// Filter used when `RUST_LOG` is unset or unparsable.
fn default_log_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_LOG_DIRECTIVES)
}

/// Turn `key=value` pairs into tool arguments. Values stay strings.
fn parse_key_values(pairs: &[String]) -> Result<ToolArgs> {
    let mut arguments = ToolArgs::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("argument `{}` is not in key=value form", pair);
        };
        if key.is_empty() {
            bail!("argument `{}` has an empty key", pair);
        }
        arguments.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(arguments)
}
