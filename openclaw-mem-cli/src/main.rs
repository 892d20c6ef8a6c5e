use std::path::PathBuf;

use clap::{Parser, Subcommand};

use openclaw_mem_cli::commands::{
    export, get, graph, harvest, ingest, pack, search, status, store, timeline, triage,
};
use openclaw_mem_cli::config::load_config;
use openclaw_mem_cli::context::Context;
use openclaw_mem_cli::output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "openclaw-mem")]
#[command(about = "Local-first long-term memory ledger for an agent runtime")]
#[command(version, long_about = None)]
struct Cli {
    /// Path to the ledger database, overriding config/env.
    #[arg(long, value_name = "PATH")]
    db: Option<String>,

    /// Configuration file path (TOML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Shorthand for `--format json`.
    #[arg(long)]
    json: bool,

    /// Enable debug-level tracing.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print ledger-wide counts: observations, embeddings, archived rows.
    Status,

    /// Ingest a JSONL capture file as explicit observations.
    Ingest {
        file: PathBuf,
        /// Override the configured importance scorer for this run.
        #[arg(long, value_name = "SCORER")]
        importance_scorer: Option<String>,
    },

    /// Ingest a JSONL capture file and embed newly-inserted rows.
    Harvest {
        /// Capture file; defaults to `<base-dir>/observations.jsonl`.
        file: Option<PathBuf>,
        /// Skip embedding newly-inserted rows (embedding is on by default).
        #[arg(long)]
        no_embed: bool,
    },

    /// Lexical-only search.
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        scope: Option<String>,
    },

    /// Raw vector search against a caller-supplied query embedding.
    Vsearch {
        #[arg(long, value_name = "JSON", conflicts_with = "query_vector_file")]
        query_vector_json: Option<String>,
        #[arg(long, value_name = "PATH")]
        query_vector_file: Option<PathBuf>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Full hybrid recall: fused lexical + vector, tiered fallback plan.
    Hybrid {
        query: String,
        #[arg(long)]
        query_en: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        scope: Option<String>,
    },

    /// Observations within a `±window` minute range of each given id.
    Timeline {
        ids: Vec<i64>,
        #[arg(long, default_value_t = 15)]
        window: i64,
    },

    /// Fetch full rows by id, preserving input order.
    Get { ids: Vec<i64> },

    /// Explicitly store a note or task, bypassing capture JSONL parsing.
    Store {
        text: String,
        #[arg(long)]
        text_en: Option<String>,
        #[arg(long)]
        lang: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        scope: Option<String>,
        #[arg(long)]
        importance: Option<f64>,
    },

    /// Assemble a bounded, cited context bundle for a query.
    Pack {
        #[arg(long)]
        query: String,
        #[arg(long)]
        scope: Option<String>,
        #[arg(long)]
        budget_tokens: Option<usize>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Include the `pack.trace.v1` trace alongside the bundle.
        #[arg(long)]
        trace: bool,
    },

    /// Run a deterministic scan: new tasks, failing cron jobs, or both.
    Triage {
        #[arg(long, value_enum)]
        mode: triage::TriageModeArg,
    },

    /// Durable JSONL export of the full ledger.
    Export {
        #[arg(long)]
        to: PathBuf,
        /// Required confirmation; without it the export is refused.
        #[arg(long)]
        yes: bool,
    },

    /// Idempotent indexing of external source-control/markdown content.
    Graph {
        #[command(subcommand)]
        command: GraphCommands,
    },
}

#[derive(Subcommand)]
enum GraphCommands {
    /// Index commit metadata from a git repository.
    CaptureGit {
        #[arg(long)]
        source: PathBuf,
        #[arg(long, default_value_t = 24)]
        since_hours: i64,
    },
    /// Index markdown heading spans under a directory.
    CaptureMd {
        #[arg(long)]
        source: PathBuf,
        #[arg(long = "include")]
        include: Vec<String>,
        #[arg(long = "exclude")]
        exclude: Vec<String>,
        #[arg(long, default_value_t = 1)]
        min_heading_level: usize,
        #[arg(long, default_value_t = 24 * 7)]
        since_hours: i64,
    },
}

fn parse_importance_scorer(raw: &str) -> anyhow::Result<openclaw_mem_core::config::ImportanceScorer> {
    match raw {
        "off" => Ok(openclaw_mem_core::config::ImportanceScorer::Off),
        "heuristic-v1" | "heuristic_v1" => {
            Ok(openclaw_mem_core::config::ImportanceScorer::HeuristicV1)
        }
        other => Err(anyhow::anyhow!(
            "unknown --importance-scorer '{other}' (expected heuristic-v1|off)"
        )),
    }
}

fn parse_query_vector(
    json: Option<&str>,
    file: Option<&PathBuf>,
) -> anyhow::Result<Vec<f32>> {
    let raw = match (json, file) {
        (Some(json), _) => json.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => {
            return Err(anyhow::anyhow!(
                "vsearch requires --query-vector-json or --query-vector-file"
            ))
        }
    };
    let vector: Vec<f32> = serde_json::from_str(&raw)?;
    Ok(vector)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let format = if cli.json { OutputFormat::Json } else { cli.format };

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.db_path = Some(db);
    }

    let ctx = Context::open(config).await?;

    match cli.command {
        Commands::Status => {
            let result = status::run(&ctx).await?;
            result.print(format)?;
        }
        Commands::Ingest { file, importance_scorer } => {
            let scorer = importance_scorer.as_deref().map(parse_importance_scorer).transpose()?;
            let result = ingest::run(&ctx, &file, scorer).await?;
            result.print(format)?;
        }
        Commands::Harvest { file, no_embed } => {
            let result = harvest::run(&ctx, file.as_deref(), !no_embed).await?;
            result.print(format)?;
        }
        Commands::Search { query, limit, scope } => {
            let result = search::run_search(&ctx, &query, limit, scope).await?;
            result.print(format)?;
        }
        Commands::Vsearch { query_vector_json, query_vector_file, limit } => {
            let vector = parse_query_vector(query_vector_json.as_deref(), query_vector_file.as_ref())?;
            let result = search::run_vsearch(&ctx, &vector, limit).await?;
            result.print(format)?;
        }
        Commands::Hybrid { query, query_en, limit, scope } => {
            let result = search::run_hybrid(&ctx, &query, query_en.as_deref(), limit, scope).await?;
            result.print(format)?;
        }
        Commands::Timeline { ids, window } => {
            let result = timeline::run(&ctx, &ids, window).await?;
            result.print(format)?;
        }
        Commands::Get { ids } => {
            let result = get::run(&ctx, &ids).await?;
            result.print(format)?;
        }
        Commands::Store { text, text_en, lang, category, scope, importance } => {
            let result = store::run(
                &ctx,
                &text,
                text_en.as_deref(),
                lang.as_deref(),
                category.as_deref(),
                scope,
                importance,
            )
            .await?;
            result.print(format)?;
        }
        Commands::Pack { query, scope, budget_tokens, limit, trace } => {
            let result = pack::run(&ctx, &query, scope, budget_tokens, limit, trace).await?;
            result.print(format)?;
        }
        Commands::Triage { mode } => {
            let result = triage::run(&ctx, mode).await?;
            let exit_code = result.exit_code;
            result.print(format)?;
            std::process::exit(exit_code);
        }
        Commands::Export { to, yes } => {
            let result = export::run(&ctx, &to, yes).await?;
            result.print(format)?;
        }
        Commands::Graph { command } => match command {
            GraphCommands::CaptureGit { source, since_hours } => {
                let result = graph::run_capture_git(&ctx, &source, since_hours).await?;
                result.print(format)?;
            }
            GraphCommands::CaptureMd {
                source,
                include,
                exclude,
                min_heading_level,
                since_hours,
            } => {
                let result = graph::run_capture_md(
                    &ctx,
                    &source,
                    include,
                    exclude,
                    min_heading_level,
                    since_hours,
                )
                .await?;
                result.print(format)?;
            }
        },
    }

    Ok(())
}
