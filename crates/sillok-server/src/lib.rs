#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::ref_option)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::enum_glob_use)]
#![allow(clippy::unused_async)]
#![allow(clippy::needless_for_each)]
//! Sillok server - HTTP/SSE front end for the agentic RAG loop (§6.1).
//!
//! This crate owns only transport: request parsing, the event-stream
//! protocol, and process wiring. All retrieval and agent-loop logic lives
//! in `sillok-core`; handlers here just drive [`sillok_core::agent::run`]
//! and translate its callbacks into SSE frames.

mod handlers;
mod providers;
mod types;

use std::sync::Arc;

use sillok_core::index::dense::EmbedCache;
use sillok_core::{Embedder, Llm, Store};

pub use handlers::{chat, health_check};
pub use providers::{HttpProvider, ProviderConfig};
pub use types::*;

/// Application state shared across handlers.
///
/// Held behind an `Arc` and injected into every route via axum's
/// `State` extractor.
pub struct AppState {
    /// The loaded, read-only document store.
    pub store: Store,
    /// Process-lifetime embedding cache shared across requests.
    pub cache: EmbedCache,
    /// Embedding provider.
    pub embedder: Box<dyn Embedder>,
    /// Chat-completion provider.
    pub llm: Box<dyn Llm>,
    /// Candidates requested per retrieval channel.
    pub top_k_retrieve: usize,
    /// Lexical prerank truncation size.
    pub pre_rerank_top_k: usize,
    /// Whether LLM reranking is enabled by default for requests.
    pub rerank_enabled: bool,
}

/// Convenience alias for the shared, reference-counted application state.
pub type SharedState = Arc<AppState>;
