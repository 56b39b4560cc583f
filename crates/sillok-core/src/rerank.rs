//! LLM-driven reranking of the lexical prerank's candidate list (§4.6).

use serde::Serialize;

use crate::constants::{RERANK_CHAR_LIMIT, TOP_K_FINAL};
use crate::json_util::parse_json_id_list;
use crate::providers::Llm;
use crate::store::Doc;

#[derive(Serialize)]
struct RerankItem<'a> {
    id: u32,
    title: &'a str,
    text: String,
}

fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

fn build_prompt(query: &str, metas: &[Doc], candidates: &[u32]) -> String {
    let items: Vec<RerankItem> = candidates
        .iter()
        .filter_map(|&id| {
            metas.get(id as usize).map(|m| RerankItem {
                id,
                title: &m.title,
                text: truncate_chars(&m.text, RERANK_CHAR_LIMIT),
            })
        })
        .collect();
    let items_json = serde_json::to_string(&items).unwrap_or_else(|_| "[]".to_string());
    format!(
        "당신은 엄격한 재랭커입니다. 질문과 문서 목록이 주어지면, 관련도 내림차순으로 \
         가장 관련 있는 문서 id의 JSON 배열을 반환하세요. \
         최대 {TOP_K_FINAL}개의 id만 반환하고 JSON 배열만 출력하세요.\n\
         이 질문은 조선왕조실록에 관한 검색/질의입니다.\n\n\
         질문: {query}\n\n문서:\n{items_json}"
    )
}

/// Reranks `candidates` against `query` via up to two LLM attempts,
/// falling back to the first `TOP_K_FINAL` candidates (the lexical
/// prerank's own order) on an empty/unusable response (§4.6, §7).
///
/// When `enabled` is `false` (the `--no-rerank` CLI flag, §6.3), this is
/// always the fallback truncation, with no LLM call made.
pub async fn rerank(
    llm: &dyn Llm,
    query: &str,
    metas: &[Doc],
    candidates: &[u32],
    enabled: bool,
) -> Vec<u32> {
    if !enabled || candidates.is_empty() {
        return candidates.iter().copied().take(TOP_K_FINAL).collect();
    }

    let prompt = build_prompt(query, metas, candidates);
    let mut ids: Vec<u32> = Vec::new();
    for _ in 0..2 {
        ids = match llm.complete(&prompt).await {
            Ok(text) => parse_json_id_list(&text),
            Err(_) => Vec::new(),
        };
        if !ids.is_empty() {
            break;
        }
    }

    if ids.is_empty() {
        return candidates.iter().copied().take(TOP_K_FINAL).collect();
    }

    let allowed: std::collections::HashSet<u32> = candidates.iter().copied().collect();
    let filtered: Vec<u32> = ids.into_iter().filter(|id| allowed.contains(id)).collect();
    if filtered.is_empty() {
        candidates.iter().copied().take(TOP_K_FINAL).collect()
    } else {
        filtered.into_iter().take(TOP_K_FINAL).collect()
    }
}
