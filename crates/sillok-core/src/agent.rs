//! The bounded answer -> verify -> refine agent loop (§4.8).
//!
//! Orchestrates up to [`crate::constants::MAX_ROUNDS`] rounds of query
//! planning, hybrid retrieval, and LLM-driven answer generation, growing an
//! accumulated doc context across rounds and streaming a snapshot of that
//! context to the caller after every round.

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::constants::{DOC_CHAR_LIMIT, MAX_CTX_DOCS, MAX_ROUNDS, NOT_FOUND_MSG};
use crate::context::{build_context, build_evidence_block};
use crate::index::dense::EmbedCache;
use crate::json_util::parse_json_object;
use crate::planner::{build_queries, classify_query, QueryMode};
use crate::providers::{Embedder, Llm};
use crate::retrieval::run_round;
use crate::store::{filter_doc_ids, format_meta, Store};
use crate::tokenizer::{parse_filters, parse_meta_only, FilterSet};

/// One document as surfaced to the caller after a round, matching the
/// `docs` SSE payload shape (§6.1).
#[derive(Debug, Clone)]
pub struct DocSnapshot {
    /// Stable 1-based display index, assigned on first appearance.
    pub index: usize,
    /// Document doc-id, for callers that need to correlate against the store.
    pub doc_id: u32,
    /// Document title.
    pub title: String,
    /// Document link.
    pub link: String,
    /// Document body, truncated to [`DOC_CHAR_LIMIT`].
    pub text: String,
    /// Formatted metadata line (§4.9), empty if the doc carries none.
    pub meta: String,
    /// Best-known fused RRF score for this doc, if ever retrieved by a channel.
    pub rrf_score: Option<f32>,
    /// Best-known dense similarity for this doc, if ever retrieved by a dense channel.
    pub sim_score: Option<f32>,
}

/// Request parameters for one agent-loop run (§6.1, §6.3).
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// The raw, unparsed user query (filters and meta-only markers included).
    pub query: String,
    /// Whether the answer step may cite beyond the retrieved context (§4.8).
    pub relax_context: bool,
    /// Whether the LLM reranker is consulted (`--no-rerank`, §6.3).
    pub rerank_enabled: bool,
}

/// Per-round trace entry, used by the CLI query log (§6.3).
#[derive(Debug, Clone)]
pub struct RoundTrace {
    /// The expanded query list used for this round.
    pub queries: Vec<String>,
    /// The final reranked doc-ids surfaced by this round.
    pub final_ids: Vec<u32>,
}

/// Full outcome of an agent-loop run.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// The final answer text, including any appended evidence checklist.
    pub final_answer: String,
    /// The mode classified on the final round.
    pub mode: QueryMode,
    /// Whether the query was parsed as meta-only.
    pub meta_only: bool,
    /// The filters parsed from the query.
    pub filters: FilterSet,
    /// One trace entry per round actually run.
    pub rounds: Vec<RoundTrace>,
    /// The terminal action observed (`answer`, `search_more`, `need_config`, or empty).
    pub last_action: String,
    /// Number of distinct docs in the final accumulated context.
    pub ctx_count: usize,
}

struct AccumulatedContext {
    doc_ids: Vec<u32>,
    doc_index: FxHashMap<u32, usize>,
    rrf_scores: FxHashMap<u32, f32>,
    sim_scores: FxHashMap<u32, f32>,
}

impl AccumulatedContext {
    fn new() -> Self {
        Self {
            doc_ids: Vec::new(),
            doc_index: FxHashMap::default(),
            rrf_scores: FxHashMap::default(),
            sim_scores: FxHashMap::default(),
        }
    }

    /// Merges one round's final ids, per §3/§4.8: existing docs refresh
    /// their scores, new docs append iff under the cap, and display
    /// indices never change once assigned.
    fn merge(
        &mut self,
        final_ids: &[u32],
        rrf_scores: &FxHashMap<u32, f32>,
        sim_scores: &FxHashMap<u32, f32>,
    ) {
        for &doc_id in final_ids {
            if self.doc_index.contains_key(&doc_id) {
                if let Some(&s) = rrf_scores.get(&doc_id) {
                    self.rrf_scores.insert(doc_id, s);
                }
                if let Some(&s) = sim_scores.get(&doc_id) {
                    self.sim_scores.insert(doc_id, s);
                }
                continue;
            }
            if self.doc_ids.len() >= MAX_CTX_DOCS {
                continue;
            }
            self.doc_ids.push(doc_id);
            self.doc_index.insert(doc_id, self.doc_ids.len());
            if let Some(&s) = rrf_scores.get(&doc_id) {
                self.rrf_scores.insert(doc_id, s);
            }
            if let Some(&s) = sim_scores.get(&doc_id) {
                self.sim_scores.insert(doc_id, s);
            }
        }
    }

    fn snapshot(&self, store: &Store) -> Vec<DocSnapshot> {
        self.doc_ids
            .iter()
            .filter_map(|&doc_id| {
                let doc = store.get(doc_id)?;
                let index = self.doc_index[&doc_id];
                Some(DocSnapshot {
                    index,
                    doc_id,
                    title: doc.title.clone(),
                    link: doc.link.clone(),
                    text: doc.text.chars().take(DOC_CHAR_LIMIT).collect(),
                    meta: format_meta(doc),
                    rrf_score: self.rrf_scores.get(&doc_id).copied(),
                    sim_score: self.sim_scores.get(&doc_id).copied(),
                })
            })
            .collect()
    }

    fn context_block(&self, store: &Store) -> String {
        let pairs: Vec<(usize, &crate::store::Doc)> = self
            .doc_ids
            .iter()
            .filter_map(|&doc_id| store.get(doc_id).map(|d| (self.doc_index[&doc_id], d)))
            .collect();
        build_context(&pairs)
    }
}

/// Asks the LLM for one of `answer | search_more | need_config`, per the
/// answer-or-request contract (§4.8).
async fn answer_or_request(
    llm: &dyn Llm,
    query: &str,
    context_block: &str,
    allow_more: bool,
    relax_context: bool,
    mode: QueryMode,
) -> Value {
    let schema = "JSON만 반환하세요. 하나의 action을 선택하세요:\n\
        1) {\"action\":\"answer\",\"answer\":\"...\",\"confidence\":0-1}\n\
        2) {\"action\":\"search_more\",\"query\":\"...\",\"reason\":\"...\"}\n\
        3) {\"action\":\"need_config\",\"message\":\"...\"}\n\
        4) (답변일 때만) \"evidence_found\": [\"...\"], \"evidence_missing\": [\"...\"]\n";
    let guidance = if allow_more {
        String::new()
    } else {
        format!("추가 검색을 요청할 수 없습니다. 답하거나 \"{NOT_FOUND_MSG}\"라고 하세요.\n")
    };
    let relax = if relax_context {
        "문맥에 없는 내용은 추정임을 명확히 표시하고, 문맥 근거가 있는 부분만 [1], [2]처럼 \
         인라인 인용하세요. 문맥 밖 정보에는 인용을 붙이지 마세요.\n"
    } else {
        ""
    };
    let compare = if mode == QueryMode::Comparison {
        "비교 질문이면 2열 표 형식으로 답하세요. 질문에 나온 비교 대상을 각 열 제목으로 쓰고, \
         각 셀에 근거를 요약하세요.\n"
    } else {
        ""
    };
    let base_instruction = if relax_context {
        "문맥을 우선 사용하세요."
    } else {
        "문맥만 사용하세요."
    };
    let prompt = format!(
        "당신은 검색 증강 어시스턴트입니다. {base_instruction} \
         근거는 [1], [2]처럼 본문에 인라인으로 표시하세요. \
         문맥에 답이 없으면 \"{NOT_FOUND_MSG}\"라고 하세요.\n\
         이 질문은 조선왕조실록에 관한 검색/질의입니다.\n\
         {compare}{relax}{guidance}{schema}\n문맥:\n{context_block}\n\n질문: {query}"
    );
    match llm.complete(&prompt).await {
        Ok(text) => parse_json_object(&text),
        Err(_) => {
            serde_json::json!({"action": "answer", "answer": NOT_FOUND_MSG})
        }
    }
}

/// Asks the LLM whether `answer` is supported by `context_block` (§4.8).
/// A provider or parse failure is treated as supported (§7).
async fn verify_answer(llm: &dyn Llm, query: &str, context_block: &str, answer: &str) -> (bool, String) {
    let prompt = format!(
        "답변이 문맥에 의해 충분히 뒷받침되는지 확인하세요. \
         JSON으로 반환: {{\"supported\": true/false, \"missing\": \"...\"}}.\n\
         이 질문은 조선왕조실록에 관한 검색/질의입니다.\n\n\
         질문: {query}\n\n문맥:\n{context_block}\n\n답변: {answer}"
    );
    match llm.complete(&prompt).await {
        Ok(text) => {
            let data = parse_json_object(&text);
            let supported = data.get("supported").and_then(Value::as_bool).unwrap_or(false);
            let missing = data
                .get("missing")
                .and_then(Value::as_str)
                .unwrap_or("")
                .trim()
                .to_string();
            (supported, missing)
        }
        Err(_) => (true, String::new()),
    }
}

/// Rewrites the original query to target `missing` evidence (§4.8). Returns
/// the empty string, resetting the focus hint, when `missing` is empty or
/// the provider fails.
async fn refine_query(llm: &dyn Llm, query: &str, missing: &str) -> String {
    if missing.is_empty() {
        return String::new();
    }
    let prompt = format!(
        "부족한 정보를 겨냥하도록 질문을 다시 작성하세요. 개선된 단일 질의를 반환하세요.\n\
         이 질문은 조선왕조실록에 관한 검색/질의입니다.\n\n\
         원본 질문: {query}\n부족한 정보: {missing}"
    );
    llm.complete(&prompt).await.map(|t| t.trim().to_string()).unwrap_or_default()
}

/// Runs the full agent loop for one request (§4.8).
///
/// `on_docs` is invoked once per round with a snapshot of the accumulated
/// doc context, mirroring the reference implementation's one-`docs`-event-
/// per-round streaming contract (§5, §6.1). It is synchronous so that
/// callers can forward snapshots over an unbounded channel without the
/// loop itself depending on a transport.
///
/// # Errors
///
/// Returns the embedder's error if an embedding call fails irrecoverably
/// (the LLM and dense/BM25 stages all have documented fallbacks, §7, and
/// never error out of the loop).
pub async fn run(
    store: &Store,
    cache: &EmbedCache,
    embedder: &dyn Embedder,
    llm: &dyn Llm,
    req: &AgentRequest,
    top_k_retrieve: usize,
    pre_rerank_top_k: usize,
    mut on_docs: impl FnMut(&[DocSnapshot]),
) -> crate::error::Result<AgentOutcome> {
    let (after_meta, meta_only) = parse_meta_only(&req.query);
    let (clean_query, filters) = parse_filters(&after_meta);
    let allowed = filter_doc_ids(&store.metas, &filters);

    let mut ctx = AccumulatedContext::new();
    let mut refined_q = String::new();
    let mut final_answer = String::new();
    let mut mode = QueryMode::Other;
    let mut last_action = String::new();
    let mut rounds = Vec::new();

    for round_idx in 0..MAX_ROUNDS {
        mode = classify_query(llm, &clean_query).await;
        let queries = build_queries(llm, &clean_query, mode, &refined_q).await;
        tracing::debug!(round = round_idx, mode = ?mode, meta_only, query_count = queries.len(), "agent round start");

        let round = run_round(
            store,
            cache,
            embedder,
            llm,
            &queries,
            mode,
            meta_only,
            allowed.as_ref(),
            top_k_retrieve,
            pre_rerank_top_k,
            req.rerank_enabled,
        )
        .await?;

        ctx.merge(&round.final_ids, &round.rrf_scores, &round.sim_scores);
        rounds.push(RoundTrace {
            queries,
            final_ids: round.final_ids,
        });

        let snapshot = ctx.snapshot(store);
        on_docs(&snapshot);

        let context_block = ctx.context_block(store);
        let allow_more = round_idx < MAX_ROUNDS - 1;
        let resp = answer_or_request(
            llm,
            &req.query,
            &context_block,
            allow_more,
            req.relax_context,
            mode,
        )
        .await;

        let action = resp.get("action").and_then(Value::as_str).unwrap_or("").to_string();
        last_action = action.clone();
        tracing::debug!(round = round_idx, action = %action, ctx_docs = ctx.doc_ids.len(), "agent round action");

        if action == "search_more" {
            let requested = resp.get("query").and_then(Value::as_str).unwrap_or("").trim();
            refined_q = if requested.is_empty() {
                refine_query(llm, &clean_query, "more specific evidence").await
            } else {
                requested.to_string()
            };
            continue;
        }
        if action == "need_config" {
            let msg = resp.get("message").and_then(Value::as_str).unwrap_or("").trim();
            final_answer = if msg.is_empty() {
                "Configuration change needed.".to_string()
            } else {
                msg.to_string()
            };
            break;
        }

        let answer = if action == "answer" {
            resp.get("answer").and_then(Value::as_str).unwrap_or("").to_string()
        } else {
            let a = resp.get("answer").and_then(Value::as_str).unwrap_or("");
            if a.is_empty() { NOT_FOUND_MSG.to_string() } else { a.to_string() }
        };

        let evidence_block = build_evidence_block(&resp);
        final_answer = if !evidence_block.is_empty() && !answer.contains(&evidence_block) {
            format!("{answer}{evidence_block}")
        } else {
            answer
        };

        if req.relax_context {
            break;
        }
        let (supported, missing) = verify_answer(llm, &req.query, &context_block, &final_answer).await;
        if supported {
            break;
        }
        refined_q = refine_query(llm, &clean_query, &missing).await;
    }

    if ctx.doc_ids.is_empty() && final_answer.is_empty() {
        final_answer = NOT_FOUND_MSG.to_string();
    }

    Ok(AgentOutcome {
        final_answer,
        mode,
        meta_only,
        filters,
        rounds,
        last_action,
        ctx_count: ctx.doc_ids.len(),
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
        let metas = vec![Doc {
            title: "태조실록".into(),
            text: "태조 즉위년 기록 본문".into(),
            link: "link0".into(),
            ..Default::default()
        }];
        let texts: Vec<String> = metas.iter().map(|d| d.text.clone()).collect();
        let bm25 = Bm25Store::build(&texts, Bm25Params::default());
        Store {
            metas,
            index_full: DenseIndex::new(vec![vec![1.0, 0.0]]),
            index_summary: None,
            index_title: None,
            bm25: Some(bm25),
            bm25_title: None,
        }
    }

    #[tokio::test]
    async fn unknown_topic_falls_back_to_not_found() {
        let store = Store {
            metas: vec![],
            index_full: DenseIndex::new(vec![]),
            index_summary: None,
            index_title: None,
            bm25: None,
            bm25_title: None,
        };
        let cache = EmbedCache::new();
        let embedder = StubEmbedder::new(4);
        // classify -> other; planner calls; answer_or_request -> not found.
        let llm = ScriptedLlm::new(vec![format!(
            "{{\"action\":\"answer\",\"answer\":\"{NOT_FOUND_MSG}\"}}"
        )]);
        let req = AgentRequest {
            query: "화성에서의 삶".to_string(),
            relax_context: false,
            rerank_enabled: true,
        };
        let outcome = run(&store, &cache, &embedder, &llm, &req, 10, 10, |_| {})
            .await
            .unwrap();
        assert_eq!(outcome.final_answer, NOT_FOUND_MSG);
    }

    #[tokio::test]
    async fn loop_terminates_within_max_rounds_on_persistent_search_more() {
        let store = test_store();
        let cache = EmbedCache::new();
        let embedder = StubEmbedder::new(2);
        let llm = ScriptedLlm::new(vec!["{\"action\":\"search_more\",\"query\":\"more\"}".to_string()]);
        let req = AgentRequest {
            query: "세종".to_string(),
            relax_context: false,
            rerank_enabled: false,
        };
        let mut round_count = 0;
        let outcome = run(&store, &cache, &embedder, &llm, &req, 10, 10, |_| {
            round_count += 1;
        })
        .await
        .unwrap();
        assert_eq!(round_count, MAX_ROUNDS);
        assert_eq!(outcome.last_action, "search_more");
    }

    #[tokio::test]
    async fn answer_terminates_loop_when_relax_context_set() {
        let store = test_store();
        let cache = EmbedCache::new();
        let embedder = StubEmbedder::new(2);
        let llm = ScriptedLlm::new(vec!["{\"action\":\"answer\",\"answer\":\"세종은...[1]\"}".to_string()]);
        let req = AgentRequest {
            query: "세종은 누구인가".to_string(),
            relax_context: true,
            rerank_enabled: false,
        };
        let mut rounds_seen = 0;
        let outcome = run(&store, &cache, &embedder, &llm, &req, 10, 10, |_| {
            rounds_seen += 1;
        })
        .await
        .unwrap();
        assert_eq!(rounds_seen, 1);
        assert!(outcome.final_answer.contains("세종은"));
    }

    #[test]
    fn display_indices_are_stable_across_merges() {
        let mut ctx = AccumulatedContext::new();
        let scores: FxHashMap<u32, f32> = [(1u32, 0.5), (2u32, 0.3)].into_iter().collect();
        ctx.merge(&[1, 2], &scores, &FxHashMap::default());
        assert_eq!(ctx.doc_index[&1], 1);
        assert_eq!(ctx.doc_index[&2], 2);

        // Second round resurfaces doc 1 with a fresh score and introduces doc 3;
        // doc 1's display index must not change.
        let scores2: FxHashMap<u32, f32> = [(1u32, 0.9), (3u32, 0.1)].into_iter().collect();
        ctx.merge(&[1, 3], &scores2, &FxHashMap::default());
        assert_eq!(ctx.doc_index[&1], 1);
        assert_eq!(ctx.doc_index[&2], 2);
        assert_eq!(ctx.doc_index[&3], 3);
        assert_eq!(ctx.rrf_scores[&1], 0.9);
    }

    #[test]
    fn merge_stops_appending_once_capped() {
        let mut ctx = AccumulatedContext::new();
        let ids: Vec<u32> = (0..MAX_CTX_DOCS as u32 + 5).collect();
        ctx.merge(&ids, &FxHashMap::default(), &FxHashMap::default());
        assert_eq!(ctx.doc_ids.len(), MAX_CTX_DOCS);
    }
}
