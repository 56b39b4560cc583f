//! Per-round retrieval orchestration: channel selection, dense + BM25
//! fan-out, RRF fusion, lexical prerank, and LLM rerank (§4.3-§4.6, §4.8
//! steps 2-3).
//!
//! This is the glue between the individually-specified retrieval
//! components and the agent loop: given a mode, a meta-only flag, and an
//! expanded query list, it runs one full retrieve -> fuse -> prerank ->
//! rerank pass and hands back the final doc-id list plus score maps.

use std::collections::HashSet;

use rustc_hash::FxHashMap;

use crate::fusion::{fuse, ChannelResults, FusedResult};
use crate::index::dense::EmbedCache;
use crate::planner::{route_weights, QueryMode};
use crate::prerank::lexical_prerank;
use crate::providers::{Embedder, Llm};
use crate::rerank::rerank;
use crate::store::Store;

/// Outcome of one retrieve -> fuse -> prerank -> rerank pass.
pub struct RoundResult {
    /// Final reranked doc-ids, at most `TOP_K_FINAL` long.
    pub final_ids: Vec<u32>,
    /// Fused RRF score per candidate doc-id, from the fusion stage.
    pub rrf_scores: FxHashMap<u32, f32>,
    /// Best dense similarity per candidate doc-id, from the fusion stage.
    pub sim_scores: FxHashMap<u32, f32>,
}

fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Embeds `queries` via the embed cache, normalizing misses to unit length
/// before caching and returning them (§4.3, §4.10).
///
/// # Errors
///
/// Returns the embedder's error if any uncached query fails to embed.
pub async fn embed_queries(
    cache: &EmbedCache,
    embedder: &dyn Embedder,
    queries: &[String],
) -> crate::error::Result<Vec<Vec<f32>>> {
    let mut out: Vec<Option<Vec<f32>>> = vec![None; queries.len()];
    let mut misses = Vec::new();
    for (i, q) in queries.iter().enumerate() {
        if let Some(v) = cache.get(q) {
            out[i] = Some(v);
        } else {
            misses.push(i);
        }
    }
    if !misses.is_empty() {
        let miss_texts: Vec<String> = misses.iter().map(|&i| queries[i].clone()).collect();
        let mut embedded = embedder.embed_many(&miss_texts).await?;
        for (slot, vec) in misses.iter().zip(embedded.iter_mut()) {
            normalize(vec);
            cache.put(queries[*slot].clone(), vec.clone());
            out[*slot] = Some(vec.clone());
        }
    }
    Ok(out.into_iter().map(Option::unwrap_or_default).collect())
}

/// Runs dense search across every available channel plus the BM25 channel
/// selected for the current mode, fusing the results (§4.3, §4.4).
#[allow(clippy::too_many_arguments)]
fn fuse_channels(
    store: &Store,
    query_vecs: &[Vec<f32>],
    queries: &[String],
    meta_only: bool,
    mode: QueryMode,
    allow: Option<&HashSet<u32>>,
    top_k_retrieve: usize,
) -> FusedResult {
    let weights: FxHashMap<String, f32> = if meta_only {
        [("title".to_string(), 1.0), ("bm25".to_string(), 1.0)]
            .into_iter()
            .collect()
    } else {
        route_weights(mode)
    };

    let mut channels = Vec::new();

    if meta_only {
        if let Some(title_idx) = &store.index_title {
            channels.push(ChannelResults {
                name: "title".to_string(),
                weight: weights.get("title").copied().unwrap_or(1.0),
                is_dense: true,
                per_query: title_idx.search_many(query_vecs, top_k_retrieve, allow),
            });
        }
        if let Some(bm25_title) = &store.bm25_title {
            let per_query = queries
                .iter()
                .map(|q| {
                    bm25_title
                        .top_k(q, top_k_retrieve, allow)
                        .into_iter()
                        .map(|id| (id, 0.0))
                        .collect()
                })
                .collect();
            channels.push(ChannelResults {
                name: "bm25".to_string(),
                weight: weights.get("bm25").copied().unwrap_or(1.0),
                is_dense: false,
                per_query,
            });
        }
    } else {
        channels.push(ChannelResults {
            name: "full".to_string(),
            weight: weights.get("full").copied().unwrap_or(1.0),
            is_dense: true,
            per_query: store.index_full.search_many(query_vecs, top_k_retrieve, allow),
        });
        if let Some(sum_idx) = &store.index_summary {
            channels.push(ChannelResults {
                name: "sum".to_string(),
                weight: weights.get("sum").copied().unwrap_or(1.0),
                is_dense: true,
                per_query: sum_idx.search_many(query_vecs, top_k_retrieve, allow),
            });
        }
        if let Some(title_idx) = &store.index_title {
            channels.push(ChannelResults {
                name: "title".to_string(),
                weight: weights.get("title").copied().unwrap_or(1.0),
                is_dense: true,
                per_query: title_idx.search_many(query_vecs, top_k_retrieve, allow),
            });
        }
        if let Some(bm25) = &store.bm25 {
            let per_query = queries
                .iter()
                .map(|q| {
                    bm25.top_k(q, top_k_retrieve, allow)
                        .into_iter()
                        .map(|id| (id, 0.0))
                        .collect()
                })
                .collect();
            channels.push(ChannelResults {
                name: "bm25".to_string(),
                weight: weights.get("bm25").copied().unwrap_or(1.0),
                is_dense: false,
                per_query,
            });
        }
    }

    fuse(&channels, top_k_retrieve)
}

/// Runs one full retrieval round: embed `queries`, fan out across the
/// channels selected for `mode`/`meta_only`, fuse, lexically rerank, and
/// finally LLM-rerank down to the final doc-id list.
///
/// `allow` restricts every stage to the filter-derived doc-id set, when
/// present (§3 invariants).
#[allow(clippy::too_many_arguments)]
pub async fn run_round(
    store: &Store,
    cache: &EmbedCache,
    embedder: &dyn Embedder,
    llm: &dyn Llm,
    queries: &[String],
    mode: QueryMode,
    meta_only: bool,
    allow: Option<&HashSet<u32>>,
    top_k_retrieve: usize,
    pre_rerank_top_k: usize,
    rerank_enabled: bool,
) -> crate::error::Result<RoundResult> {
    let query_vecs = embed_queries(cache, embedder, queries).await?;
    let fused = fuse_channels(
        store,
        &query_vecs,
        queries,
        meta_only,
        mode,
        allow,
        top_k_retrieve,
    );

    let bm25_for_prerank = if meta_only {
        store.bm25_title.as_ref()
    } else {
        store.bm25.as_ref()
    };
    let prerank_query = queries.first().map(String::as_str).unwrap_or("");
    let preranked = lexical_prerank(
        prerank_query,
        &store.metas,
        &fused.candidates,
        bm25_for_prerank,
        pre_rerank_top_k,
    );

    let final_ids = rerank(llm, prerank_query, &store.metas, &preranked, rerank_enabled).await;

    tracing::debug!(
        candidates = fused.candidates.len(),
        preranked = preranked.len(),
        final = final_ids.len(),
        "round retrieval complete"
    );

    Ok(RoundResult {
        final_ids,
        rrf_scores: fused.rrf_scores,
        sim_scores: fused.sim_scores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::bm25::{Bm25Params, Bm25Store};
    use crate::index::dense::DenseIndex;
    use crate::providers::stub::{ScriptedLlm, StubEmbedder};
    use crate::store::Doc;

    fn test_store() -> Store {
        let metas = vec![
            Doc {
                title: "태조실록".into(),
                text: "태조 즉위년 기록".into(),
                ..Default::default()
            },
            Doc {
                title: "세종실록".into(),
                text: "세종 즉위년 기록".into(),
                ..Default::default()
            },
        ];
        let texts: Vec<String> = metas.iter().map(|d| d.text.clone()).collect();
        let bm25 = Bm25Store::build(&texts, Bm25Params::default());
        Store {
            metas,
            index_full: DenseIndex::new(vec![vec![1.0, 0.0], vec![0.0, 1.0]]),
            index_summary: None,
            index_title: None,
            bm25: Some(bm25),
            bm25_title: None,
        }
    }

    #[tokio::test]
    async fn run_round_returns_reranked_ids() {
        let store = test_store();
        let cache = EmbedCache::new();
        let embedder = StubEmbedder::new(2);
        let llm = ScriptedLlm::new(vec!["[0, 1]".to_string()]);
        let result = run_round(
            &store,
            &cache,
            &embedder,
            &llm,
            &["세종".to_string()],
            QueryMode::Other,
            false,
            None,
            10,
            10,
            true,
        )
        .await
        .unwrap();
        assert!(!result.final_ids.is_empty());
    }

    #[tokio::test]
    async fn embed_queries_caches_normalized_vectors() {
        let cache = EmbedCache::new();
        let embedder = StubEmbedder::new(4);
        let vecs = embed_queries(&cache, &embedder, &["q".to_string()]).await.unwrap();
        assert_eq!(vecs.len(), 1);
        assert!(cache.get("q").is_some());
        let norm: f32 = vecs[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5 || norm == 0.0);
    }
}
