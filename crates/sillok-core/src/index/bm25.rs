//! Okapi BM25 lexical index (§3, §4.2).

use std::collections::HashSet;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::tokenizer::tokenize;

/// BM25 tuning parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term frequency saturation parameter (default: 1.2).
    pub k1: f32,
    /// Document length normalization parameter (default: 0.75).
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

/// An inverted lexical index over a fixed doc-id space.
///
/// `postings[term]` holds `(doc_id, term_frequency)` pairs. Immutable after
/// load (§5); there is no incremental update path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bm25Store {
    /// Inverted index: term -> postings.
    pub postings: FxHashMap<String, Vec<(u32, u32)>>,
    /// Document length, indexed by doc-id.
    pub doc_len: Vec<u32>,
    /// Average document length across the store.
    pub avgdl: f32,
    /// BM25 parameters.
    pub params: Bm25Params,
}

#[allow(clippy::cast_precision_loss)]
impl Bm25Store {
    /// Builds a store from raw documents, for tests and fixtures.
    #[must_use]
    pub fn build(docs: &[String], params: Bm25Params) -> Self {
        let mut postings: FxHashMap<String, Vec<(u32, u32)>> = FxHashMap::default();
        let mut doc_len = Vec::with_capacity(docs.len());
        let mut total_len: u64 = 0;

        for (doc_id, text) in docs.iter().enumerate() {
            let tokens = tokenize(text);
            let mut term_freqs: FxHashMap<String, u32> = FxHashMap::default();
            for t in &tokens {
                *term_freqs.entry(t.clone()).or_insert(0) += 1;
            }
            let len = tokens.len() as u32;
            doc_len.push(len);
            total_len += u64::from(len);
            for (term, tf) in term_freqs {
                postings.entry(term).or_default().push((doc_id as u32, tf));
            }
        }

        let avgdl = if doc_len.is_empty() {
            0.0
        } else {
            total_len as f32 / doc_len.len() as f32
        };

        Self {
            postings,
            doc_len,
            avgdl,
            params,
        }
    }

    /// Decodes a store from its hydrated-artifact byte representation.
    ///
    /// The binary `bm25.pkl`/`bm25_title.pkl` formats are produced by an
    /// out-of-scope ingestion pipeline; this loader-side adapter decodes the
    /// JSON-serialized hydration format used for store fixtures and tests.
    ///
    /// # Errors
    ///
    /// Returns an error string if `bytes` is not a valid encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        serde_json::from_slice(bytes).map_err(|e| e.to_string())
    }

    fn idf(&self, df: usize) -> f32 {
        let n = self.doc_len.len() as f32;
        let df = df as f32;
        (((n - df + 0.5) / (df + 0.5)) + 1.0).ln().max(0.0)
    }

    /// Computes raw BM25 scores for `query`, restricted to `allow` when
    /// present (§4.2).
    #[must_use]
    pub fn scores(&self, query: &str, allow: Option<&HashSet<u32>>) -> FxHashMap<u32, f32> {
        let mut scores: FxHashMap<u32, f32> = FxHashMap::default();
        if self.doc_len.is_empty() || self.avgdl == 0.0 {
            return scores;
        }
        let terms = tokenize(query);
        let k1 = self.params.k1;
        let b = self.params.b;
        for term in &terms {
            let Some(plist) = self.postings.get(term) else {
                continue;
            };
            if plist.is_empty() {
                continue;
            }
            let idf = self.idf(plist.len());
            for &(doc_id, tf) in plist {
                if let Some(allow) = allow {
                    if !allow.contains(&doc_id) {
                        continue;
                    }
                }
                let dl = self.doc_len[doc_id as usize] as f32;
                let denom = tf as f32 + k1 * (1.0 - b + b * (dl / self.avgdl));
                let score = idf * (tf as f32 * (k1 + 1.0)) / denom;
                *scores.entry(doc_id).or_insert(0.0) += score;
            }
        }
        scores
    }

    /// Returns the top-`k` doc-ids for `query` in descending score order.
    #[must_use]
    pub fn top_k(&self, query: &str, k: usize, allow: Option<&HashSet<u32>>) -> Vec<u32> {
        let scores = self.scores(query, allow);
        let mut ranked: Vec<(u32, f32)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(k);
        ranked.into_iter().map(|(id, _)| id).collect()
    }

    /// Number of documents in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.doc_len.len()
    }

    /// Returns `true` if the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.doc_len.is_empty()
    }
}
