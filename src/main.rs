//! # askdocs CLI
//!
//! Commands for building the index and asking grounded questions.
//!
//! ```bash
//! askdocs --config ./config/askdocs.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `askdocs ingest` | Rebuild the vector index from configured sources |
//! | `askdocs sources` | Show artifact status and configured sources |
//! | `askdocs search "<query>"` | Retrieval only: ranked chunks with scores |
//! | `askdocs ask "<question>"` | Full grounded answer with citations |
//! | `askdocs eval --file qa.yaml` | Score answers against expected keywords |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use askdocs::answer::Composer;
use askdocs::config::{self, Config};
use askdocs::embedding::OpenAiEmbeddings;
use askdocs::error::RagError;
use askdocs::eval;
use askdocs::generation::OpenAiChat;
use askdocs::ingest;
use askdocs::retrieve::Retriever;
use askdocs::sources;

/// askdocs — grounded question answering over a local document corpus.
#[derive(Parser)]
#[command(
    name = "askdocs",
    about = "Grounded question answering over a local document corpus",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/askdocs.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the vector index from the configured sources.
    ///
    /// Fetches allowed web pages from the links file, reads supported
    /// local files, chunks and embeds everything, and writes the two
    /// index artifacts. Always a full rebuild, never incremental.
    Ingest {
        /// Override the links file from config.
        #[arg(long)]
        urls_file: Option<PathBuf>,

        /// Override the local corpus directory from config.
        #[arg(long)]
        local_dir: Option<PathBuf>,
    },

    /// Show index artifact status and configured sources.
    Sources,

    /// Retrieval only: print the top-k chunks with similarity scores.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of chunks to return (default: retrieval.top_k).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Answer a question from the indexed corpus, with cited sources.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Run the keyword-inclusion evaluation harness.
    Eval {
        /// YAML file of `{q, must_include}` records.
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = config::load_config(&cli.config)?;

    let result = match cli.command {
        Commands::Ingest {
            urls_file,
            local_dir,
        } => {
            if let Some(path) = urls_file {
                cfg.sources.urls_file = path;
            }
            if let Some(path) = local_dir {
                cfg.sources.local_dir = path;
            }
            run_ingest(&cfg).await
        }
        Commands::Sources => sources::list_sources(&cfg),
        Commands::Search { query, limit } => run_search(&cfg, &query, limit).await,
        Commands::Ask { question } => run_ask(&cfg, &question).await,
        Commands::Eval { file } => run_eval(&cfg, &file).await,
    };

    // The missing-index condition gets actionable guidance instead of a
    // generic error trace.
    if let Err(e) = result {
        if let Some(RagError::IndexNotFound { .. }) = e.downcast_ref::<RagError>() {
            eprintln!("{}", e);
            std::process::exit(2);
        }
        return Err(e);
    }
    Ok(())
}

async fn run_ingest(cfg: &Config) -> Result<()> {
    let embedder = OpenAiEmbeddings::new(&cfg.embedding)?;
    ingest::run_ingest(cfg, &embedder).await?;
    Ok(())
}

async fn run_search(cfg: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let retriever = Retriever::open(cfg)?;
    let embedder = OpenAiEmbeddings::new(&cfg.embedding)?;
    let top_k = limit.unwrap_or(cfg.retrieval.top_k);
    let results = retriever.retrieve(&embedder, query, top_k).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        let title = result.meta.title.as_deref().unwrap_or("(untitled)");
        println!("{}. [{:.3}] {}", i + 1, result.score, title);
        println!("    source: {}", result.meta.source_identity());
        let excerpt: String = result.meta.text.chars().take(240).collect();
        println!("    excerpt: \"{}\"", excerpt.replace('\n', " ").trim());
        println!();
    }

    Ok(())
}

async fn run_ask(cfg: &Config, question: &str) -> Result<()> {
    let retriever = Retriever::open(cfg)?;
    let embedder = OpenAiEmbeddings::new(&cfg.embedding)?;
    let generator = OpenAiChat::new(&cfg.generation)?;
    let composer = Composer::new(cfg, &retriever, &embedder, &generator);

    let response = composer.answer(question).await?;

    println!("{}", response.answer);

    if !response.sources.is_empty() {
        println!();
        println!("Sources:");
        for (i, source) in response.sources.iter().enumerate() {
            println!("[{}] {} — {}", i + 1, source.title, source.location());
        }
    }

    if !response.attachments.is_empty() {
        println!();
        println!("Attachments:");
        for path in &response.attachments {
            println!("  {}", path.display());
        }
    }

    Ok(())
}

async fn run_eval(cfg: &Config, qa_path: &Path) -> Result<()> {
    let retriever = Retriever::open(cfg)?;
    let embedder = OpenAiEmbeddings::new(&cfg.embedding)?;
    let generator = OpenAiChat::new(&cfg.generation)?;
    let composer = Composer::new(cfg, &retriever, &embedder, &generator);

    eval::run_eval(&composer, qa_path).await
}
