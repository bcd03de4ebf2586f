//! # ragdoc CLI
//!
//! ## Usage
//!
//! ```bash
//! ragdoc --config ./config/ragdoc.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragdoc chunks` | Split the document and print its chunks |
//! | `ragdoc search "<query>"` | Print the passages retrieved for a query |
//! | `ragdoc ask "<question>"` | Answer one question |
//! | `ragdoc chat` | Answer questions read from stdin |
//! | `ragdoc serve` | Start the HTTP API server |
//!
//! Logs go to stderr and are controlled by `RAGDOC_LOG` (or `RUST_LOG`);
//! results go to stdout.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ragdoc::config::{self, Config};
use ragdoc::session::{ChatSession, Role};
use ragdoc_core::chunk;
use ragdoc_core::pipeline::{Answer, AnswerKind};
use tracing_subscriber::EnvFilter;

/// Ask questions about a document and get answers grounded in its text.
#[derive(Parser)]
#[command(name = "ragdoc", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ragdoc.toml")]
    config: PathBuf,

    /// Document to load instead of `[document].path`.
    #[arg(long, global = true)]
    document: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split the document and print its chunks.
    ///
    /// Uses `[chunking]` settings; no embedding provider is contacted.
    Chunks {
        /// Print one JSON object per chunk.
        #[arg(long)]
        json: bool,
    },

    /// Retrieve the passages most similar to a query.
    Search {
        query: String,

        /// Passages to return (defaults to `retrieval.top_k`).
        #[arg(long, short)]
        k: Option<usize>,
    },

    /// Answer a single question from the document.
    Ask {
        question: String,

        /// Also print the passages the answer was grounded on.
        #[arg(long)]
        show_context: bool,
    },

    /// Interactive question answering.
    ///
    /// Reads one question per line. `/history` prints the session so far
    /// and `/clear` forgets it. `/exit` (or end of input) quits.
    Chat,

    /// Start the HTTP API server on `[server].bind`.
    Serve,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("RAGDOC_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut cfg = config::load_config(&cli.config)?;
    if let Some(path) = cli.document {
        cfg.document.path = path;
    }

    match cli.command {
        Commands::Chunks { json } => cmd_chunks(&cfg, json),
        Commands::Search { query, k } => cmd_search(&cfg, &query, k).await,
        Commands::Ask {
            question,
            show_context,
        } => cmd_ask(&cfg, &question, show_context).await,
        Commands::Chat => cmd_chat(&cfg).await,
        Commands::Serve => {
            let pipeline = ragdoc::build_pipeline(&cfg)?;
            let report = ragdoc::ingest_file(&pipeline, &cfg.document.path).await?;
            println!(
                "Indexed {} ({} chunks)",
                report.document_id, report.chunks
            );
            ragdoc::server::run_server(&cfg.server.bind, std::sync::Arc::new(pipeline)).await
        }
    }
}

fn cmd_chunks(cfg: &Config, json: bool) -> Result<()> {
    let document = ragdoc::extract::load_document(&cfg.document.path)?;
    let chunks = chunk::split(&document, cfg.chunking.chunk_size, cfg.chunking.overlap)?;

    for c in &chunks {
        if json {
            println!("{}", serde_json::to_string(c)?);
        } else {
            let preview: String = c.text.chars().take(60).collect();
            println!(
                "#{:<4} {:>7}..{:<7} {}  {}",
                c.id,
                c.start,
                c.end,
                &c.hash[..12.min(c.hash.len())],
                preview.replace('\n', " ")
            );
        }
    }
    if !json {
        println!("{} chunks", chunks.len());
    }
    Ok(())
}

async fn cmd_search(cfg: &Config, query: &str, k: Option<usize>) -> Result<()> {
    let pipeline = ragdoc::build_pipeline(cfg)?;
    ragdoc::ingest_file(&pipeline, &cfg.document.path).await?;

    let ctx = pipeline.retrieve(query, k).await?;
    if let Some(reason) = &ctx.degradation {
        eprintln!("warning: {}", reason);
    }
    if ctx.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for (i, hit) in ctx.hits.iter().enumerate() {
        println!(
            "{}. [{:.3}] chunk #{} ({}..{})",
            i + 1,
            hit.score,
            hit.chunk.id,
            hit.chunk.start,
            hit.chunk.end
        );
        println!("   {}", hit.chunk.text.trim().replace('\n', "\n   "));
    }
    Ok(())
}

fn print_answer(answer: &Answer, show_context: bool) {
    println!("{}", answer.text);
    if let Some(reason) = &answer.context.degradation {
        eprintln!("warning: {}", reason);
    }
    if show_context && answer.kind == AnswerKind::Generated {
        for hit in &answer.context.hits {
            println!();
            println!("--- chunk #{} [{:.3}] ---", hit.chunk.id, hit.score);
            println!("{}", hit.chunk.text.trim());
        }
    }
}

async fn cmd_ask(cfg: &Config, question: &str, show_context: bool) -> Result<()> {
    let pipeline = ragdoc::build_pipeline(cfg)?;
    ragdoc::ingest_file(&pipeline, &cfg.document.path).await?;

    let answer = pipeline.answer(question).await?;
    print_answer(&answer, show_context);
    Ok(())
}

async fn cmd_chat(cfg: &Config) -> Result<()> {
    let pipeline = ragdoc::build_pipeline(cfg)?;
    let report = ragdoc::ingest_file(&pipeline, &cfg.document.path).await?;
    eprintln!(
        "Loaded {} ({} chunks). Ask a question, /history, /clear, or /exit.",
        report.document_id, report.chunks
    );

    let mut session = ChatSession::new(cfg.session.max_turns);
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        eprint!("> ");
        std::io::stderr().flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        let question = line.trim();

        match question {
            "" => continue,
            "/exit" | "/quit" => break,
            "/history" => {
                for turn in session.turns() {
                    let who = match turn.role {
                        Role::User => "you",
                        Role::Assistant => "ragdoc",
                    };
                    println!("[{}] {}: {}", turn.timestamp.format("%H:%M:%S"), who, turn.text);
                }
                continue;
            }
            "/clear" => {
                session.clear();
                eprintln!("History cleared.");
                continue;
            }
            _ => {}
        }

        session.record(Role::User, question);
        match pipeline.answer(question).await {
            Ok(answer) => {
                print_answer(&answer, false);
                session.record(Role::Assistant, answer.text);
            }
            Err(e) => eprintln!("error: {}", e),
        }
    }
    Ok(())
}
