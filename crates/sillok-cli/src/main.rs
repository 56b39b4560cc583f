#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
//! Sillok CLI - interactive REPL for the agentic RAG loop (§6.3).
//!
//! Usage:
//!   `sillok --store-dir ./rag_store`
//!   `sillok --store-dir ./rag_store --hide-docs --no-rerank`

mod providers;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use providers::{HttpProvider, ProviderConfig};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use sillok_core::agent::{self, AgentOutcome, AgentRequest, DocSnapshot};
use sillok_core::index::dense::EmbedCache;
use sillok_core::planner::QueryMode;
use sillok_core::store::Store;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sillok - interactive REPL over the Joseon Dynasty Annals agentic RAG loop.
#[derive(Parser, Debug)]
#[command(name = "sillok")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the loaded store (`index.faiss`, `meta.jsonl`, ...).
    #[arg(long, default_value = "./rag_store", env = "SILLOK_STORE_DIR")]
    store_dir: PathBuf,

    /// Suppress printing retrieved documents before the answer.
    #[arg(long)]
    hide_docs: bool,

    /// Disable LLM reranking of retrieved candidates.
    #[arg(long)]
    no_rerank: bool,

    /// Allow the answer step to cite beyond the retrieved context.
    #[arg(long)]
    relax_context: bool,

    /// OpenAI-compatible API base URL.
    #[arg(long, default_value = "https://api.openai.com/v1", env = "SILLOK_API_BASE")]
    api_base: String,

    /// OpenAI-compatible API key.
    #[arg(long, env = "SILLOK_API_KEY")]
    api_key: String,

    /// Embedding model name.
    #[arg(long, default_value = "text-embedding-3-small", env = "SILLOK_EMBEDDING_MODEL")]
    embedding_model: String,

    /// Chat-completion model name.
    #[arg(long, default_value = "gpt-4o-mini", env = "SILLOK_CHAT_MODEL")]
    chat_model: String,
}

fn mode_str(mode: QueryMode) -> &'static str {
    match mode {
        QueryMode::Definition => "definition",
        QueryMode::Comparison => "comparison",
        QueryMode::MultiHop => "multi_hop",
        QueryMode::List => "list",
        QueryMode::Other => "other",
    }
}

fn print_docs(docs: &[DocSnapshot]) {
    println!("\n{}", "--- Retrieved docs ---".bold());
    for doc in docs {
        let title = if doc.title.trim().is_empty() {
            "(no title)"
        } else {
            doc.title.trim()
        };
        println!(
            "\n[{}] {}",
            doc.index.to_string().yellow(),
            title.green()
        );
        let rrf = doc.rrf_score.unwrap_or(0.0);
        let sim = doc.sim_score.unwrap_or(0.0);
        println!(
            "doc_id={} rrf={:.4} sim={:.4}{}",
            doc.doc_id,
            rrf,
            sim,
            if doc.meta.is_empty() {
                String::new()
            } else {
                format!(" meta=({})", doc.meta)
            }
        );
        if !doc.link.trim().is_empty() {
            println!("link: {}", doc.link.trim());
        }
        println!("{}", doc.text);
    }
    println!("\n{}\n", "--- End docs ---".bold());
}

fn append_log(store_dir: &std::path::Path, raw_query: &str, outcome: &AgentOutcome) -> Result<()> {
    let log_dir = store_dir.join("logs");
    std::fs::create_dir_all(&log_dir).context("failed to create logs directory")?;
    let log_path = log_dir.join("query_log.jsonl");

    let last_round = outcome.rounds.last();
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);

    let entry = serde_json::json!({
        "ts": ts,
        "query": raw_query,
        "filters": outcome.filters,
        "meta_only": outcome.meta_only,
        "mode": mode_str(outcome.mode),
        "queries": last_round.map(|r| r.queries.clone()).unwrap_or_default(),
        "final_ids": last_round.map(|r| r.final_ids.clone()).unwrap_or_default(),
        "action": if outcome.last_action.is_empty() { "answer" } else { outcome.last_action.as_str() },
        "answer": outcome.final_answer,
        "ctx_count": outcome.ctx_count,
    });

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;
    writeln!(file, "{}", serde_json::to_string(&entry)?)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        ))
        .init();

    let cli = Cli::parse();

    println!(
        "\n{}",
        format!("Sillok v{VERSION} - Joseon Annals RAG REPL").bold().cyan()
    );
    println!("Store: {}", cli.store_dir.display().to_string().green());
    println!("Type an empty line to exit\n");

    let store = Store::load(&cli.store_dir).context("failed to load store")?;
    let cache = EmbedCache::new();
    let provider = HttpProvider::new(ProviderConfig {
        base_url: cli.api_base.clone(),
        api_key: cli.api_key.clone(),
        embedding_model: cli.embedding_model.clone(),
        chat_model: cli.chat_model.clone(),
    });

    let mut rl = DefaultEditor::new()?;
    let history_path = cli.store_dir.join(".sillok_history");
    let _ = rl.load_history(&history_path);

    loop {
        let prompt = "Query> ".bold().blue().to_string();
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => {
                println!("{} {err:?}", "Error:".red().bold());
                break;
            }
        };

        let raw_query = line.trim().to_string();
        if raw_query.is_empty() {
            break;
        }
        let _ = rl.add_history_entry(raw_query.as_str());

        let req = AgentRequest {
            query: raw_query.clone(),
            relax_context: cli.relax_context,
            rerank_enabled: !cli.no_rerank,
        };

        let hide_docs = cli.hide_docs;
        let on_docs = move |docs: &[DocSnapshot]| {
            if !hide_docs {
                print_docs(docs);
            }
        };

        match agent::run(&store, &cache, &provider, &provider, &req, 60, 64, on_docs).await {
            Ok(outcome) => {
                println!("{}", outcome.final_answer);
                if let Err(e) = append_log(&cli.store_dir, &raw_query, &outcome) {
                    tracing::warn!(error = %e, "failed to append query log");
                }
            }
            Err(e) => {
                println!("{} {e}", "Error:".red().bold());
            }
        }
        println!();
    }

    let _ = rl.save_history(&history_path);
    println!("Goodbye!");
    Ok(())
}
