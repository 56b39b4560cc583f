//! Tuning constants shared by the retrieval and agent-loop components.
//!
//! A subset of these are overridable at runtime via [`crate::config::RetrievalConfig`];
//! the rest (RRF_K, bonuses, char limits) are fixed algorithmic parameters.

/// Candidates requested from each retrieval channel per query.
pub const TOP_K_RETRIEVE: usize = 60;
/// Final number of documents kept after reranking, per round.
pub const TOP_K_FINAL: usize = 8;
/// Reciprocal rank fusion smoothing constant.
pub const RRF_K: u32 = 60;
/// Hard upper bound on agent-loop rounds.
pub const MAX_ROUNDS: usize = 3;
/// Max characters of document body included in the context block.
pub const DOC_CHAR_LIMIT: usize = 1200;
/// Max characters of document body sent to the LLM reranker.
pub const RERANK_CHAR_LIMIT: usize = 1200;
/// Max number of expanded queries per planning round.
pub const MAX_QUERY_EXPANSIONS: usize = 10;
/// Lexical prerank truncation size.
pub const PRE_RERANK_TOP_K: usize = 64;
/// Bonus added per distinct query term that also appears in a doc's title.
pub const TITLE_MATCH_BONUS: f32 = 0.5;
/// Max distinct documents accumulated across all rounds of one request.
pub const MAX_CTX_DOCS: usize = 24;
/// Ad hoc multiplier applied to `TOP_K_FINAL` for the RRF candidate cap (see open question in design notes).
pub const RRF_CANDIDATE_MULTIPLIER: usize = 12;
/// SSE token-chunk size used for the cosmetic token stream.
pub const TOKEN_CHUNK_SIZE: usize = 3;
/// Delay between token-chunk emissions.
pub const TOKEN_CHUNK_DELAY_MS: u64 = 20;

/// Fixed message declaring the corpus does not support an answer.
pub const NOT_FOUND_MSG: &str = "제공된 데이터로는 답을 확정하기 어렵습니다. \
더 가져오고 싶어도 과도한 확장은 RAG의 본질적 한계와 맞닿아 있어, \
현 시점에선 확답이 어렵습니다.";
