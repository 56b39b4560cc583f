//! Sillok server binary - HTTP/SSE front end for the agentic RAG loop.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use sillok_core::config::SillokConfig;
use sillok_core::index::dense::EmbedCache;
use sillok_core::store::Store;
use sillok_server::{chat, health_check, AppState, HttpProvider, ProviderConfig};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Sillok - hybrid retrieval and agentic answer server over the Joseon Dynasty Annals.
#[derive(Parser, Debug)]
#[command(name = "sillok-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to `sillok.toml`.
    #[arg(long, default_value = "sillok.toml", env = "SILLOK_CONFIG")]
    config: String,

    /// Store directory, overriding the config file's `store.dir`.
    #[arg(long, env = "SILLOK_STORE_DIR")]
    store_dir: Option<String>,

    /// Host address to bind to, overriding the config file's `server.host`.
    #[arg(long, env = "SILLOK_HOST")]
    host: Option<String>,

    /// Port to listen on, overriding the config file's `server.port`.
    #[arg(long, env = "SILLOK_PORT")]
    port: Option<u16>,

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

    /// Disable LLM reranking of retrieved candidates.
    #[arg(long)]
    no_rerank: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = SillokConfig::load_from_path(&args.config).unwrap_or_default();
    if let Some(dir) = args.store_dir.clone() {
        config.store.dir = dir;
    }
    if let Some(host) = args.host.clone() {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(std::env::var(
            "RUST_LOG",
        )
        .unwrap_or_else(|_| format!("{},tower_http=info", config.logging.level))))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("loading store from {}", config.store.dir);
    let store = Store::load(&config.store.dir)?;
    tracing::info!(docs = store.len(), "store loaded");

    let provider = HttpProvider::new(ProviderConfig {
        base_url: args.api_base,
        api_key: args.api_key,
        embedding_model: args.embedding_model,
        chat_model: args.chat_model,
    });

    let state = Arc::new(AppState {
        store,
        cache: EmbedCache::new(),
        embedder: Box::new(provider.clone()),
        llm: Box::new(provider),
        top_k_retrieve: config.retrieval.top_k_retrieve,
        pre_rerank_top_k: config.retrieval.pre_rerank_top_k,
        rerank_enabled: !args.no_rerank,
    });

    let app = Router::new()
        .route("/api/chat", post(chat))
        .route("/api/health", get(health_check))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("sillok server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
