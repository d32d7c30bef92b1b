//! CLI for document store operations

use anyhow::Context;
use clap::{Parser, Subcommand};
use docshard::common::{parse_duration, Config, Document};
use docshard::ops::run_demo;
use docshard::DocumentStore;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "docshard")]
#[command(about = "docshard sharded document store CLI")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $DOCSHARD_CONFIG or ./docshard.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Node addresses in ordinal order, comma separated
    /// (http://host:port, file://dir, mem://name). mem:// nodes only last
    /// for this one command. Defaults to http://127.0.0.1:7100.
    #[arg(long, global = true, value_delimiter = ',')]
    nodes: Option<Vec<String>>,

    /// Per-node connect timeout (e.g. 5s, 500ms)
    #[arg(long, global = true)]
    timeout: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clear the cluster, insert sample documents and report the distribution
    Demo {
        /// Number of sample documents
        #[arg(long, default_value = "100")]
        count: usize,
    },

    /// Insert a document
    Insert {
        /// Document key (generated if omitted)
        #[arg(long)]
        key: Option<String>,

        /// Payload as a JSON object
        #[arg(long)]
        json: String,
    },

    /// Find a document by key
    Find {
        /// Key
        key: String,
    },

    /// Show the per-node load distribution
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete every document on every node
    Clear,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    if let Some(nodes) = cli.nodes {
        config.nodes = nodes;
    }
    if let Some(timeout) = cli.timeout {
        parse_duration(&timeout).context("invalid --timeout")?;
        config.connect_timeout = timeout;
    }
    config.validate()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut store = DocumentStore::connect(&config.nodes, config.connect_timeout()?)
        .context("failed to connect to storage nodes")?;

    let result = run(&store, cli.command);
    store.close();
    result
}

fn run(store: &DocumentStore, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Demo { count } => {
            let report = run_demo(store, count)?;

            println!(
                "Cleared {} documents{}",
                report.cleared.total_deleted(),
                if report.cleared.is_complete() {
                    ""
                } else {
                    " (some nodes failed)"
                }
            );
            println!("Inserted {} documents\n", report.inserted);
            println!("{}", report.stats);
            println!();

            for (key, found) in &report.lookups {
                match found {
                    Some(doc) => println!(
                        "  {} → node {} ({})",
                        key,
                        doc.assigned_node,
                        doc.get("title").and_then(|v| v.as_str()).unwrap_or("-")
                    ),
                    None => println!("  {} → not found", key),
                }
            }
        }

        Commands::Insert { key, json } => {
            let value: serde_json::Value =
                serde_json::from_str(&json).context("--json is not valid JSON")?;
            let outcome = store.insert(Document::from_json(key, value)?)?;
            println!(
                "✓ Inserted {} on node {} (acknowledged: {})",
                outcome.key, outcome.node, outcome.acknowledged
            );
        }

        Commands::Find { key } => match store.find(&key)? {
            Some(doc) => println!("{}", serde_json::to_string_pretty(&doc)?),
            None => anyhow::bail!("{} not found", key),
        },

        Commands::Stats { json } => {
            let report = store.stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
        }

        Commands::Clear => {
            let report = store.clear();
            for node in &report.nodes {
                match (&node.deleted, &node.error) {
                    (Some(deleted), _) => {
                        println!("  node {} ({}): {} deleted", node.index, node.address, deleted)
                    }
                    (None, Some(error)) => {
                        println!("  node {} ({}): ✗ {}", node.index, node.address, error)
                    }
                    (None, None) => {}
                }
            }
            println!("Total deleted: {}", report.total_deleted());
            if !report.is_complete() {
                anyhow::bail!("some nodes could not be cleared");
            }
        }
    }

    Ok(())
}
