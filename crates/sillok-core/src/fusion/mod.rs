//! Reciprocal rank fusion across the dense and lexical retrieval channels (§4.4).
//!
//! Each channel (a dense embedding index, or the BM25 lexical index)
//! contributes a per-query ranked list. [`fuse`] combines them into one
//! candidate list using position-based, weight-scaled reciprocal rank
//! fusion, robust to the very different raw score scales of cosine
//! similarity versus Okapi BM25.

mod rrf;

pub use rrf::{fuse, ChannelResults, FusedResult};
