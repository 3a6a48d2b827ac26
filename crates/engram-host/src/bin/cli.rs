//! Engram CLI
//!
//! Thin command-line host that wires `engram-core`'s retrieval engine to a
//! real SQLite-backed bank. Deliberately minimal: `ingest`, `recall`,
//! `stats` — enough to exercise the library end-to-end without
//! reimplementing an MCP transport, dashboard, or websocket plumbing
//! (spec §1 marks those out of scope).

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use directories::ProjectDirs;
use engram_core::config::EngineConfig;
use engram_core::model::{FactType, Scope};
use engram_core::{Engine, RecallOptions, RetainOptions};
use engram_host::{HashEmbedder, PassthroughExtractor};

#[derive(Parser)]
#[command(name = "engram")]
#[command(author = "engram contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CLI for the engram agent memory retrieval engine")]
#[command(long_about = "Engram is an embedded, multi-strategy memory retrieval engine for long-running agents: RRF fusion over semantic/fulltext/graph/temporal candidates, hybrid or ACT-R-inspired cognitive scoring, working-memory and location boosts, tag/scope filtering, and token-budget packing.")]
struct Cli {
    /// Bank name to operate on (created on first use).
    #[arg(long, global = true, default_value = "default")]
    bank: String,

    /// Path to the SQLite database file; defaults to the platform data dir.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a memory (routes through the retain pipeline: extract, embed, link).
    Ingest {
        /// Content to remember.
        content: String,
        /// Tags (comma-separated).
        #[arg(long)]
        tags: Option<String>,
        /// Fact type: experience, world, opinion, or observation.
        #[arg(long, default_value = "world")]
        fact_type: String,
    },

    /// Recall memories relevant to a query.
    Recall {
        /// Natural-language query.
        query: String,
        /// Maximum memories to return.
        #[arg(long, default_value = "10")]
        limit: usize,
        /// Scoring mode: hybrid or cognitive.
        #[arg(long, default_value = "hybrid")]
        mode: String,
        /// Filter by tags (comma-separated).
        #[arg(long)]
        tags: Option<String>,
        /// Session id, for working-memory boost.
        #[arg(long)]
        session: Option<String>,
        /// Emit the recall trace (phase timings, candidate scores) as JSON.
        #[arg(long)]
        trace: bool,
    },

    /// Show bank statistics.
    Stats,
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "engram", "core")
        .ok_or_else(|| anyhow::anyhow!("could not determine project directories"))?;
    Ok(proj_dirs.data_dir().join("engram.db"))
}

fn split_tags(tags: Option<String>) -> Option<Vec<String>> {
    tags.map(|t| t.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
}

fn build_engine(db_path: Option<PathBuf>, default_fact_type: FactType) -> anyhow::Result<Engine> {
    let path = match db_path {
        Some(p) => p,
        None => default_db_path()?,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let extractor = PassthroughExtractor {
        fact_type: default_fact_type,
        ..PassthroughExtractor::default()
    };
    let engine = Engine::new(
        Some(path),
        EngineConfig::default(),
        Box::new(HashEmbedder::default()),
        Box::new(extractor),
        None,
    )?;
    Ok(engine)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let default_fact_type = match &cli.command {
        Commands::Ingest { fact_type, .. } => FactType::parse(fact_type).ok_or_else(|| anyhow::anyhow!("unknown fact type '{fact_type}'"))?,
        _ => FactType::World,
    };
    let engine = build_engine(cli.db_path, default_fact_type)?;
    let bank = engine.get_or_create_bank(&cli.bank)?;

    match cli.command {
        Commands::Ingest { content, tags, fact_type } => run_ingest(&engine, &bank.id, content, tags, fact_type),
        Commands::Recall { query, limit, mode, tags, session, trace } => run_recall(&engine, &bank.id, query, limit, mode, tags, session, trace).await,
        Commands::Stats => run_stats(&engine, &bank.id),
    }
}

fn run_ingest(engine: &Engine, bank_id: &str, content: String, tags: Option<String>, _fact_type: String) -> anyhow::Result<()> {
    if content.trim().is_empty() {
        anyhow::bail!("content cannot be empty");
    }

    let options = RetainOptions {
        tags: split_tags(tags),
        scope: Scope::default(),
    };
    let result = engine.retain(bank_id, &content, &options)?;

    println!("{}", "=== Engram Ingest ===".cyan().bold());
    println!();
    println!("{}: {}", "Memories created".white().bold(), result.memories.len());
    for memory in &result.memories {
        println!("  {} {}", memory.id[..8.min(memory.id.len())].dimmed(), truncate(&memory.content, 70));
    }
    if !result.entities.is_empty() {
        println!("{}: {}", "Entities linked".white().bold(), result.entities.iter().map(|e| e.name.as_str()).collect::<Vec<_>>().join(", "));
    }
    if !result.links.is_empty() {
        println!("{}: {}", "Causal links".white().bold(), result.links.len());
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_recall(
    engine: &Engine,
    bank_id: &str,
    query: String,
    limit: usize,
    mode: String,
    tags: Option<String>,
    session: Option<String>,
    trace: bool,
) -> anyhow::Result<()> {
    let scoring_mode = match mode.as_str() {
        "hybrid" => engram_core::scoring::ScoringMode::Hybrid,
        "cognitive" => engram_core::scoring::ScoringMode::Cognitive,
        other => anyhow::bail!("unknown mode '{other}', expected 'hybrid' or 'cognitive'"),
    };

    let options = RecallOptions {
        limit,
        mode: scoring_mode,
        tags: split_tags(tags),
        session_id: session,
        enable_trace: trace,
        ..RecallOptions::default()
    };

    let result = engine.recall(bank_id, &query, &options).await?;

    println!("{}", "=== Engram Recall ===".cyan().bold());
    println!("{}: {}", "Query".white().bold(), result.query);
    println!("{}: {}", "Returned".white().bold(), result.memories.len());
    println!();

    for (rank, memory) in result.memories.iter().enumerate() {
        println!(
            "{} {} {}",
            format!("{:>2}.", rank + 1).dimmed(),
            format!("[{}]", memory.fact_type.as_str()).yellow(),
            memory.content
        );
    }

    if trace {
        if let Some(trace) = &result.trace {
            println!();
            println!("{}", "=== Trace ===".magenta().bold());
            println!("{}", serde_json::to_string_pretty(trace)?);
        }
    }

    Ok(())
}

fn run_stats(engine: &Engine, bank_id: &str) -> anyhow::Result<()> {
    let stats = engine.bank_stats(bank_id)?;

    println!("{}", "=== Engram Stats ===".cyan().bold());
    println!();
    println!("{}: {}", "Total memories".white().bold(), stats.total_memories);
    println!("{}: {}", "Total entities".white().bold(), stats.total_entities);
    println!("{}: {}", "Total links".white().bold(), stats.total_links);
    println!("{}: {}", "With embeddings".white().bold(), stats.with_embeddings);
    println!("{}: {:.2}", "Average confidence".white().bold(), stats.average_confidence);
    Ok(())
}

fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max_chars {
        s
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}
