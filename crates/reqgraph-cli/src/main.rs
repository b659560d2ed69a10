//! reqgraph CLI - Command-line interface
//!
//! Usage:
//!   reqgraph extract [PATH|-] [--restore-punct] [--profile basic|extended] [--pretty]
//!   reqgraph load [PATH|-] [--recording-id UUID]
//!   reqgraph evaluate --gold GOLD.json [PATH|-]
//!   reqgraph triggers

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use reqgraph_core::{AppConfig, ExtractionProfile, GraphPayload, LoggingConfig};
use reqgraph_extractor::{AggregateMetrics, Evaluator, ExtractionPipeline, RuleBasedRe};
use reqgraph_graph::{GraphLoader, GraphScope, GraphStore, MemoryGraphStore};

#[derive(Parser)]
#[command(name = "reqgraph")]
#[command(about = "Requirements entity and relationship extraction")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables still override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pattern catalogue
    #[arg(long, global = true)]
    profile: Option<ExtractionProfile>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a graph payload and print it as JSON
    Extract {
        /// Transcript file, or `-` for stdin
        #[arg(default_value = "-")]
        input: String,
        /// Restore punctuation even if the text looks punctuated
        #[arg(long)]
        restore_punct: bool,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Extract and load into an in-memory graph store
    Load {
        /// Transcript file, or `-` for stdin
        #[arg(default_value = "-")]
        input: String,
        /// Recording id to scope the nodes with (random if omitted)
        #[arg(long)]
        recording_id: Option<Uuid>,
        /// Restore punctuation even if the text looks punctuated
        #[arg(long)]
        restore_punct: bool,
    },
    /// Compare extraction against a gold payload
    Evaluate {
        /// Gold payload JSON
        #[arg(long)]
        gold: PathBuf,
        /// Transcript file, or `-` for stdin
        #[arg(default_value = "-")]
        input: String,
        /// Match entities by name only
        #[arg(long)]
        ignore_labels: bool,
    },
    /// List the relationship trigger table
    Triggers,
}

fn init_tracing(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.level.as_str().into());

    // stdout carries the payload, logs go to stderr
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    if config.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    if let Some(profile) = cli.profile {
        config.extraction.profile = profile;
    }
    config.validate()?;
    Ok(config)
}

fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {input}"))
    }
}

fn read_gold(path: &Path) -> anyhow::Result<GraphPayload> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read gold payload {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid gold payload {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config.logging);

    let pipeline = ExtractionPipeline::from_config(&config);
    let force = |flag: bool| flag || config.extraction.always_restore_punct;

    match cli.command {
        Commands::Extract {
            input,
            restore_punct,
            pretty,
        } => {
            let text = read_input(&input)?;
            let payload = pipeline.run(&text, force(restore_punct));
            let json = if pretty {
                serde_json::to_string_pretty(&payload)?
            } else {
                serde_json::to_string(&payload)?
            };
            println!("{json}");
        }
        Commands::Load {
            input,
            recording_id,
            restore_punct,
        } => {
            let text = read_input(&input)?;
            let payload = pipeline.run(&text, force(restore_punct));

            let mut scope = GraphScope::new();
            if let Some(id) = recording_id {
                scope = scope.with_recording_id(id);
            }
            if input != "-" {
                scope = scope.with_source(input.clone());
            }

            let store = MemoryGraphStore::new();
            let result = GraphLoader::from_config(&config.graph)
                .load(&store, &payload, &scope)
                .await?;

            println!("{}", serde_json::to_string_pretty(&result)?);
            println!(
                "Store now holds {} nodes and {} edges",
                store.node_count().await?,
                store.edge_count().await?
            );
        }
        Commands::Evaluate {
            gold,
            input,
            ignore_labels,
        } => {
            let gold = read_gold(&gold)?;
            let text = read_input(&input)?;
            let predicted = pipeline.run(&text, force(false));

            let evaluator = Evaluator::new().with_ignore_labels(ignore_labels);
            let mut aggregate = AggregateMetrics::default();
            aggregate.add(&evaluator.evaluate(&predicted, &gold));

            print!("{}", aggregate.report());
        }
        Commands::Triggers => {
            let re = RuleBasedRe::from_config(&config.extraction);
            println!("Relation rules ({} profile):", config.extraction.profile);
            for rule in re.rules() {
                let left = rule
                    .left
                    .iter()
                    .map(|l| l.as_str())
                    .collect::<Vec<_>>()
                    .join(" | ");
                println!(
                    "  {:<16} {} -> {}   [{}]",
                    rule.relation.as_str(),
                    left,
                    rule.right,
                    rule.triggers.join(", ")
                );
            }
        }
    }

    Ok(())
}
