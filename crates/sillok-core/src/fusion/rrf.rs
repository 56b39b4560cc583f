//! Weighted multi-channel reciprocal rank fusion (§4.4).

use rustc_hash::FxHashMap;

use crate::constants::{RRF_CANDIDATE_MULTIPLIER, RRF_K, TOP_K_FINAL};

/// One retrieval channel's per-query ranked results, already sorted by that
/// channel's own score descending.
///
/// Dense channels (`is_dense = true`) additionally contribute to the
/// similarity map, tracking the best raw similarity seen for a doc across
/// every query on that channel. BM25 channels do not: their raw scores are
/// not comparable across channels and are not surfaced past fusion.
pub struct ChannelResults {
    /// Channel name, e.g. `"full"`, `"summary"`, `"title"`, `"bm25"`.
    pub name: String,
    /// Route weight applied to every RRF contribution from this channel.
    pub weight: f32,
    /// Whether this channel feeds the similarity map.
    pub is_dense: bool,
    /// `(doc_id, score)` pairs per query, best-first.
    pub per_query: Vec<Vec<(u32, f32)>>,
}

/// The result of fusing one or more channels across one or more queries.
#[derive(Debug, Default, Clone)]
pub struct FusedResult {
    /// Candidate doc-ids, ordered by fused score descending.
    pub candidates: Vec<u32>,
    /// Accumulated RRF score per doc-id.
    pub rrf_scores: FxHashMap<u32, f32>,
    /// Best raw dense similarity seen per doc-id (dense channels only).
    pub sim_scores: FxHashMap<u32, f32>,
}

/// Fuses ranked lists from multiple channels and queries into one candidate
/// list (§4.4).
///
/// For each channel with weight `w`, for each query, for each doc at rank
/// `r` (0-based): `rrf_scores[doc] += w / (RRF_K + r + 1)`. Dense channels
/// additionally track `sim_scores[doc] = max(existing, score_at_rank)`.
///
/// The output is truncated to `max(top_k, TOP_K_FINAL * RRF_CANDIDATE_MULTIPLIER)`,
/// matching the reference implementation's generous candidate cap ahead of
/// the lexical prerank stage.
#[must_use]
pub fn fuse(channels: &[ChannelResults], top_k: usize) -> FusedResult {
    let mut rrf_scores: FxHashMap<u32, f32> = FxHashMap::default();
    let mut sim_scores: FxHashMap<u32, f32> = FxHashMap::default();
    // First-seen order, so tie-breaking matches the reference implementation's
    // stable sort over an insertion-ordered dict rather than doc-id order.
    let mut insertion_order: FxHashMap<u32, usize> = FxHashMap::default();

    for channel in channels {
        for ranked in &channel.per_query {
            for (rank, &(doc_id, score)) in ranked.iter().enumerate() {
                #[allow(clippy::cast_precision_loss)]
                let contribution = channel.weight / (RRF_K as f32 + (rank + 1) as f32);
                *rrf_scores.entry(doc_id).or_insert(0.0) += contribution;
                let next_order = insertion_order.len();
                insertion_order.entry(doc_id).or_insert(next_order);
                if channel.is_dense {
                    sim_scores
                        .entry(doc_id)
                        .and_modify(|s| *s = s.max(score))
                        .or_insert(score);
                }
            }
        }
    }

    let cap = top_k.max(TOP_K_FINAL * RRF_CANDIDATE_MULTIPLIER);
    let mut candidates: Vec<(u32, f32)> = rrf_scores.iter().map(|(&id, &s)| (id, s)).collect();
    candidates.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| insertion_order[&a.0].cmp(&insertion_order[&b.0]))
    });
    candidates.truncate(cap);

    FusedResult {
        candidates: candidates.into_iter().map(|(id, _)| id).collect(),
        rrf_scores,
        sim_scores,
    }
}
