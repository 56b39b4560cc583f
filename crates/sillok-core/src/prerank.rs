//! Lexical prerank: a cheap BM25 + title-overlap rescore ahead of the LLM reranker (§4.5).

use std::collections::HashSet;

use crate::constants::TITLE_MATCH_BONUS;
use crate::index::bm25::Bm25Store;
use crate::store::Doc;
use crate::tokenizer::tokenize;

/// Rescoes `candidates` by BM25 (restricted to the candidate set) plus a
/// flat bonus per distinct query term that also appears in the doc's
/// title, then truncates to `top_k`.
///
/// Returns `candidates` unchanged if it is empty; matches the reference
/// behavior of being a no-op ahead of an empty fusion result.
#[must_use]
pub fn lexical_prerank(
    query: &str,
    metas: &[Doc],
    candidates: &[u32],
    bm25: Option<&Bm25Store>,
    top_k: usize,
) -> Vec<u32> {
    if candidates.is_empty() {
        return Vec::new();
    }
    let allowed: HashSet<u32> = candidates.iter().copied().collect();
    let bm25_scores = bm25
        .map(|b| b.scores(query, Some(&allowed)))
        .unwrap_or_default();
    let q_terms: HashSet<String> = tokenize(query).into_iter().collect();

    // (doc_id, score, original position) — ties break on the incoming
    // fused-candidate order, not doc-id, matching the reference's stable
    // sort over an already-ordered candidate list.
    let mut scored: Vec<(u32, f32, usize)> = candidates
        .iter()
        .enumerate()
        .map(|(pos, &doc_id)| {
            let base = bm25_scores.get(&doc_id).copied().unwrap_or(0.0);
            let title_hits = metas.get(doc_id as usize).map_or(0, |doc| {
                let title_terms: HashSet<String> = tokenize(&doc.title).into_iter().collect();
                q_terms.intersection(&title_terms).count()
            });
            #[allow(clippy::cast_precision_loss)]
            let bonus = title_hits as f32 * TITLE_MATCH_BONUS;
            (doc_id, base + bonus, pos)
        })
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.2.cmp(&b.2)));
    scored.truncate(top_k);
    scored.into_iter().map(|(id, ..)| id).collect()
}
