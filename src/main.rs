//! pilina CLI: semantic retrieval and filtering over a community graph.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use pilina::engine::{Engine, EngineConfig};
use pilina::filter::FilterSelection;
use pilina::retrieve::RetrievalOutcome;

#[derive(Parser)]
#[command(name = "pilina", version, about = "Community knowledge graph engine")]
struct Cli {
    /// Data directory for persistent storage. Memory-only when absent.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the deterministic offline embedder (no network providers).
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest triples from a .txt tuple list or .json array.
    Ingest {
        /// Path to the triple file.
        file: PathBuf,
    },

    /// Recompute embeddings for every stored triple.
    Reindex,

    /// List filter categories and their candidate values.
    Filters,

    /// Apply filter selections and show the admitted subgraph.
    Apply {
        /// Selections as `category=value` pairs, repeatable.
        #[arg(long = "select", value_parser = parse_selection)]
        selections: Vec<(String, String)>,

        /// Also list admitted nodes and edges.
        #[arg(long)]
        verbose: bool,
    },

    /// Retrieve the semantic context for a query without generation.
    Retrieve {
        /// Free-text query.
        query: String,

        /// Result-count override.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Answer a free-text question over the corpus.
    Ask {
        /// Free-text question.
        query: String,

        /// Result-count override for the retrieval step.
        #[arg(long)]
        top_k: Option<usize>,

        /// Show the supporting triples with similarity scores.
        #[arg(long)]
        show_context: bool,
    },

    /// Show engine info and statistics.
    Info,

    /// Export all triples as JSON to stdout.
    Export,
}

fn parse_selection(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(c, v)| (c.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("expected category=value, got `{raw}`"))
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_toml_file(path).into_diagnostic()?,
        None => EngineConfig::default(),
    };
    if cli.data_dir.is_some() {
        config.data_dir = cli.data_dir.clone();
    }
    if cli.offline {
        config.offline = true;
    }

    let engine = Engine::new(config).into_diagnostic()?;

    match cli.command {
        Commands::Ingest { file } => {
            let count = engine.ingest_file(&file).into_diagnostic()?;
            println!("Ingested {count} triples from {}", file.display());
        }

        Commands::Reindex => {
            let count = engine.reindex().into_diagnostic()?;
            println!("Reindexed {count} triples");
        }

        Commands::Filters => {
            for (category, values) in engine.filter_domain() {
                println!("{category} ({}):", values.len());
                for value in values {
                    println!("  {value}");
                }
            }
        }

        Commands::Apply {
            selections,
            verbose,
        } => {
            let pairs = selections
                .iter()
                .map(|(c, v)| (c.as_str(), std::iter::once(v.as_str())));
            let response = engine.apply_filters(&FilterSelection::from_named(pairs));
            println!("{}", response.stats);
            println!(
                "main communities: {}, communities: {}",
                response.main_communities, response.communities
            );
            if !response.top_degree.is_empty() {
                println!("most connected:");
                for (name, degree) in &response.top_degree {
                    println!("  {name} ({degree})");
                }
            }
            if verbose {
                println!("nodes:");
                for node in &response.nodes {
                    println!("  {node}");
                }
                println!("edges:");
                for (s, p, o) in &response.edges {
                    println!("  {s} -[{p}]-> {o}");
                }
            }
        }

        Commands::Retrieve { query, top_k } => {
            match engine.retrieve(&query, top_k).into_diagnostic()? {
                RetrievalOutcome::NoRelevantContext => {
                    println!("No relevant context found.");
                }
                RetrievalOutcome::Context(items) => {
                    for item in items {
                        println!("{:.3}  {}", item.similarity, item.text);
                    }
                }
            }
        }

        Commands::Ask {
            query,
            top_k,
            show_context,
        } => {
            let answer = engine.ask(&query, top_k).into_diagnostic()?;
            println!("{}", answer.text);
            if show_context && !answer.degraded {
                println!("\nsupporting facts:");
                for item in &answer.supporting {
                    println!("  {:.3}  {}", item.similarity, item.text);
                }
            }
        }

        Commands::Info => {
            println!("{}", engine.info());
        }

        Commands::Export => {
            let triples = engine.triples();
            let json = serde_json::to_string_pretty(triples.as_ref()).into_diagnostic()?;
            println!("{json}");
        }
    }

    Ok(())
}
