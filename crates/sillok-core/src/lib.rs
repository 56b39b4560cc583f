//! # Sillok Core
//!
//! Hybrid dense + lexical retrieval and the bounded agentic
//! answer-verify-refine loop over a fixed document corpus (the Joseon
//! Dynasty Annals).
//!
//! This crate is the engine: it owns query planning, multi-index dense
//! retrieval, BM25 scoring, reciprocal rank fusion, LLM reranking, and the
//! agent loop that ties them together into one streamed answer. It is
//! deliberately silent on transport — the HTTP surface lives in
//! `sillok-server`, the REPL in `sillok-cli`; both depend on this crate
//! and drive [`agent::run`] against a loaded [`store::Store`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sillok_core::{agent, index::dense::EmbedCache, store::Store};
//!
//! let store = Store::load("./rag_store")?;
//! let cache = EmbedCache::new();
//! let req = agent::AgentRequest {
//!     query: "세종대왕은 누구인가".to_string(),
//!     relax_context: false,
//!     rerank_enabled: true,
//! };
//! let outcome = agent::run(&store, &cache, &embedder, &llm, &req, 60, 64, |_docs| {}).await?;
//! println!("{}", outcome.final_answer);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod fusion;
pub mod index;
pub mod json_util;
pub mod planner;
pub mod prerank;
pub mod providers;
pub mod rerank;
pub mod retrieval;
pub mod store;
pub mod tokenizer;

#[cfg(test)]
mod config_tests;

pub use agent::{AgentOutcome, AgentRequest, DocSnapshot};
pub use config::SillokConfig;
pub use error::{Error, Result};
pub use planner::QueryMode;
pub use providers::{Embedder, Llm};
pub use store::{Doc, Store};
