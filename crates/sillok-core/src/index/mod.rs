//! Retrieval channels: BM25 lexical postings and dense embedding indices (§4.2, §4.3).

pub mod bm25;
pub mod dense;

#[cfg(test)]
mod bm25_tests;

pub use bm25::{Bm25Params, Bm25Store};
pub use dense::{DenseIndex, EmbedCache};
