use anyhow::Result;
use clap::{Parser, Subcommand};
use docshard::common::{Config, LogSyncPolicy};
use docshard::NodeServer;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "docshard-node")]
#[command(about = "docshard storage node - serves one document collection over HTTP")]
#[command(version)]
struct Args {
    /// Config file (defaults to $DOCSHARD_CONFIG or ./docshard.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the node HTTP API
    Serve {
        /// Node ID used in logs
        #[arg(short, long, default_value = "node-1")]
        id: String,

        /// HTTP address to listen on
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// Data directory for the document log (in-memory if omitted)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Log sync policy: always, flush or never
        #[arg(long, value_parser = parse_sync)]
        sync: Option<LogSyncPolicy>,

        /// Log level (trace, debug, info, warn, error)
        #[arg(long)]
        log_level: Option<String>,
    },
}

fn parse_sync(s: &str) -> std::result::Result<LogSyncPolicy, String> {
    match s.to_ascii_lowercase().as_str() {
        "always" => Ok(LogSyncPolicy::Always),
        "flush" => Ok(LogSyncPolicy::Flush),
        "never" => Ok(LogSyncPolicy::Never),
        other => Err(format!("unknown sync policy: {}", other)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let Command::Serve {
        id,
        bind,
        data,
        sync,
        log_level,
    } = args.command;

    if let Some(bind) = bind {
        config.node.bind_addr = bind;
    }
    if data.is_some() {
        config.node.data_dir = data;
    }
    if let Some(sync) = sync {
        config.node.sync = sync;
    }
    let log_level = log_level.unwrap_or_else(|| config.log_level.clone());

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(dir) = &config.node.data_dir {
        tokio::fs::create_dir_all(dir).await?;
    }

    NodeServer::new(config.node, id).serve().await?;

    Ok(())
}
