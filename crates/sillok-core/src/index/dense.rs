//! Brute-force dense (embedding) index and the process-lifetime embed cache (§3, §4.3).

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// An in-process dense vector index over a fixed doc-id space.
///
/// Implemented as a brute-force cosine/inner-product scan over a dense
/// matrix, adequate for the corpus scale implied by the store contract
/// (§6.2). There is no incremental update path; a `DenseIndex` is loaded
/// once and shared by reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DenseIndex {
    /// Row-major embedding matrix, one row per doc-id.
    pub vectors: Vec<Vec<f32>>,
}

impl DenseIndex {
    /// Builds an index directly from pre-computed vectors, for tests and fixtures.
    #[must_use]
    pub fn new(vectors: Vec<Vec<f32>>) -> Self {
        Self { vectors }
    }

    /// Decodes an index from its hydrated-artifact byte representation.
    ///
    /// The binary `faiss` on-disk format is produced by an out-of-scope
    /// ingestion pipeline; this loader-side adapter decodes the
    /// JSON-serialized hydration format used for store fixtures and tests.
    ///
    /// # Errors
    ///
    /// Returns an error string if `bytes` is not a valid encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        serde_json::from_slice(bytes).map_err(|e| e.to_string())
    }

    /// Number of vectors held by this index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Returns `true` if the index holds no vectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Searches for the `top_k` nearest doc-ids to `query`, by cosine
    /// similarity, restricted to `allow` when present.
    ///
    /// Returns `(doc_id, similarity)` pairs sorted by similarity descending.
    #[must_use]
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        allow: Option<&std::collections::HashSet<u32>>,
    ) -> Vec<(u32, f32)> {
        let query_norm = norm(query);
        if query_norm == 0.0 {
            return Vec::new();
        }
        let mut scored: Vec<(u32, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .filter_map(|(id, vec)| {
                let id = id as u32;
                if let Some(allow) = allow {
                    if !allow.contains(&id) {
                        return None;
                    }
                }
                let sim = cosine(query, vec, query_norm);
                Some((id, sim))
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(top_k);
        scored
    }

    /// Batched variant of [`DenseIndex::search`], one result list per query.
    #[must_use]
    pub fn search_many(
        &self,
        queries: &[Vec<f32>],
        top_k: usize,
        allow: Option<&std::collections::HashSet<u32>>,
    ) -> Vec<Vec<(u32, f32)>> {
        queries
            .iter()
            .map(|q| self.search(q, top_k, allow))
            .collect()
    }
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine(a: &[f32], b: &[f32], a_norm: f32) -> f32 {
    let b_norm = norm(b);
    if b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    dot / (a_norm * b_norm)
}

/// Process-lifetime memoization of string -> embedding vector (§4.3, §4.10).
///
/// Unbounded and last-writer-wins: concurrent inserts for the same key
/// simply overwrite each other, which is harmless since embeddings for a
/// given string are deterministic given a fixed embedding provider.
#[derive(Default)]
pub struct EmbedCache {
    entries: RwLock<FxHashMap<String, Vec<f32>>>,
}

impl EmbedCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a cached embedding for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<f32>> {
        self.entries.read().get(key).cloned()
    }

    /// Inserts or overwrites the cached embedding for `key`.
    pub fn put(&self, key: String, value: Vec<f32>) {
        self.entries.write().insert(key, value);
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_ranks_by_cosine_similarity() {
        let index = DenseIndex::new(vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.7, 0.7],
        ]);
        let results = index.search(&[1.0, 0.0], 3, None);
        assert_eq!(results[0].0, 0);
        assert!((results[0].1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn search_respects_allow_set() {
        let index = DenseIndex::new(vec![vec![1.0, 0.0], vec![1.0, 0.0]]);
        let allow: std::collections::HashSet<u32> = [1u32].into_iter().collect();
        let results = index.search(&[1.0, 0.0], 5, Some(&allow));
        assert_eq!(results, vec![(1, 1.0)]);
    }

    #[test]
    fn search_zero_query_returns_empty() {
        let index = DenseIndex::new(vec![vec![1.0, 0.0]]);
        assert!(index.search(&[0.0, 0.0], 5, None).is_empty());
    }

    #[test]
    fn search_truncates_to_top_k() {
        let index = DenseIndex::new(vec![vec![1.0], vec![1.0], vec![1.0]]);
        let results = index.search(&[1.0], 2, None);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn embed_cache_roundtrip() {
        let cache = EmbedCache::new();
        assert!(cache.get("q").is_none());
        cache.put("q".to_string(), vec![1.0, 2.0]);
        assert_eq!(cache.get("q"), Some(vec![1.0, 2.0]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn embed_cache_last_writer_wins() {
        let cache = EmbedCache::new();
        cache.put("q".to_string(), vec![1.0]);
        cache.put("q".to_string(), vec![2.0]);
        assert_eq!(cache.get("q"), Some(vec![2.0]));
    }
}
