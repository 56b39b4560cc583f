//! Query mode classification and multi-query planning (§4.7).

use rustc_hash::FxHashMap;

use crate::constants::MAX_QUERY_EXPANSIONS;
use crate::providers::Llm;

/// The coarse intent label assigned to an incoming query, driving both
/// channel routing weights and whether the query is decomposed (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryMode {
    /// "What is X" style questions.
    Definition,
    /// Questions contrasting two or more things.
    Comparison,
    /// Questions requiring chaining multiple facts together.
    MultiHop,
    /// Questions asking for an enumeration.
    List,
    /// Anything not confidently classified as one of the above.
    Other,
}

impl QueryMode {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "definition" => Some(Self::Definition),
            "comparison" => Some(Self::Comparison),
            "multi-hop" => Some(Self::MultiHop),
            "list" => Some(Self::List),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Classifies `query` into a [`QueryMode`] via a single LLM call,
/// collapsing any unrecognized label (or a provider failure) to
/// [`QueryMode::Other`].
pub async fn classify_query(llm: &dyn Llm, query: &str) -> QueryMode {
    let prompt = format!(
        "다음 질문을 다음 중 하나로 분류하세요: definition, comparison, multi-hop, list, other. \
         라벨만 반환하세요.\n\
         이 질문은 조선왕조실록에 관한 검색/질의입니다.\n\n\
         질문: {query}"
    );
    match llm.complete(&prompt).await {
        Ok(text) => QueryMode::from_label(text.trim().to_lowercase().as_str())
            .unwrap_or(QueryMode::Other),
        Err(_) => QueryMode::Other,
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|l| l.trim().trim_start_matches('-').trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

/// Decomposes `query` into 2-4 focused sub-questions, for comparison,
/// multi-hop, and list queries only. Returns an empty vec for other modes
/// or on provider failure.
pub async fn decompose_query(llm: &dyn Llm, query: &str, mode: QueryMode) -> Vec<String> {
    if !matches!(
        mode,
        QueryMode::Comparison | QueryMode::MultiHop | QueryMode::List
    ) {
        return Vec::new();
    }
    let prompt = format!(
        "질문을 2-4개의 집중된 하위 질문으로 분해하세요. 각 하위 질문은 독립적으로 \
         답할 수 있어야 합니다. 한 줄에 하나씩, 번호 없이 반환하세요.\n\
         이 질문은 조선왕조실록에 관한 검색/질의입니다.\n\n\
         질문: {query}"
    );
    match llm.complete(&prompt).await {
        Ok(text) => split_lines(&text),
        Err(_) => Vec::new(),
    }
}

/// Rewrites `query` one level more general, for background retrieval.
/// Returns an empty string on provider failure.
pub async fn step_back_query(llm: &dyn Llm, query: &str) -> String {
    let prompt = format!(
        "배경 정보를 찾기 위해 질문을 더 상위의 일반적인 수준으로 다시 작성하세요. \
         한 줄만 반환하세요.\n\
         이 질문은 조선왕조실록에 관한 검색/질의입니다.\n\n\
         질문: {query}"
    );
    llm.complete(&prompt)
        .await
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

/// Generates up to 3 short search queries that might surface the answer.
/// Returns an empty vec on provider failure.
pub async fn multi_query(llm: &dyn Llm, query: &str) -> Vec<String> {
    let prompt = format!(
        "질문에 답할 수 있는 구절을 찾기 위해 짧은 검색 질의 3개를 생성하세요. \
         한 줄에 하나씩, 번호 없이 반환하세요.\n\
         이 질문은 조선왕조실록에 관한 검색/질의입니다.\n\n\
         질문: {query}"
    );
    match llm.complete(&prompt).await {
        Ok(text) => split_lines(&text),
        Err(_) => Vec::new(),
    }
}

/// Generates a hypothetical short answer to `query`, for HyDE-style dense
/// retrieval. Returns an empty string on provider failure.
pub async fn hyde_query(llm: &dyn Llm, query: &str) -> String {
    let prompt = format!(
        "질문에 대한 그럴듯한 짧은 답을 작성하세요. 3문장 이내로 유지하세요. \
         이 답변은 검색용입니다.\n\
         이 질문은 조선왕조실록에 관한 검색/질의입니다.\n\n\
         질문: {query}"
    );
    llm.complete(&prompt)
        .await
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

/// Per-channel route weights for a given [`QueryMode`] (§4.4, §4.7).
#[must_use]
pub fn route_weights(mode: QueryMode) -> FxHashMap<String, f32> {
    let pairs: [(&str, f32); 4] = match mode {
        QueryMode::Definition => [("full", 0.8), ("sum", 1.4), ("title", 1.0), ("bm25", 1.0)],
        QueryMode::List => [("full", 1.0), ("sum", 1.2), ("title", 0.8), ("bm25", 1.0)],
        QueryMode::Comparison => [("full", 1.3), ("sum", 0.8), ("title", 0.8), ("bm25", 1.2)],
        QueryMode::MultiHop => [("full", 1.4), ("sum", 0.8), ("title", 0.8), ("bm25", 1.2)],
        QueryMode::Other => [("full", 1.0), ("sum", 1.0), ("title", 1.0), ("bm25", 1.0)],
    };
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Deterministic Korean domain-expansion rules, appended in a fixed order
/// ahead of deduplication (§4.7).
#[must_use]
pub fn domain_expansions(query: &str, mode: QueryMode) -> Vec<String> {
    let mut ex = Vec::new();
    if !query.contains("조선왕조실록") {
        ex.push(format!("조선왕조실록 {query}"));
    }
    if query.contains("수정실록") || query.contains("편찬") || query.contains("실록") {
        ex.push(format!("{query} 편찬 주체 사견"));
    }
    if query.contains("노론") || query.contains("소론") {
        ex.push(format!("{query} 당파 갈등 사건"));
    }
    if mode == QueryMode::Comparison || query.contains("비교") {
        ex.push(format!("{query} 차이점"));
        ex.push(format!("{query} 서로 다른 기록"));
    }
    if query.contains("기사") {
        ex.push(format!("{query} 기록"));
    }
    ex
}

/// Assembles the full expanded query list for one planning round (§4.7):
/// the original query, sub-questions, a step-back query, multi-queries, a
/// HyDE passage, an optional `extra_hint` (the refined query from a prior
/// round), and the domain expansions, deduplicated case-insensitively and
/// truncated to [`MAX_QUERY_EXPANSIONS`].
pub async fn build_queries(
    llm: &dyn Llm,
    query: &str,
    mode: QueryMode,
    extra_hint: &str,
) -> Vec<String> {
    let mut queries = vec![query.to_string()];

    let subqs = decompose_query(llm, query, mode).await;
    queries.extend(
        subqs
            .into_iter()
            .filter(|s| !s.eq_ignore_ascii_case(query) && s.to_lowercase() != query.to_lowercase()),
    );

    let step_back = step_back_query(llm, query).await;
    if !step_back.is_empty() && step_back.to_lowercase() != query.to_lowercase() {
        queries.push(step_back);
    }

    queries.extend(multi_query(llm, query).await.into_iter().filter(|s| !s.is_empty()));

    let hyde = hyde_query(llm, query).await;
    if !hyde.is_empty() {
        queries.push(hyde);
    }

    if !extra_hint.is_empty() {
        queries.push(extra_hint.to_string());
    }

    queries.extend(domain_expansions(query, mode));

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for s in queries {
        let key = s.to_lowercase();
        if seen.insert(key) {
            out.push(s);
        }
    }
    out.truncate(MAX_QUERY_EXPANSIONS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::stub::ScriptedLlm;

    #[tokio::test]
    async fn classify_accepts_known_label() {
        let llm = ScriptedLlm::new(vec!["Comparison".to_string()]);
        assert_eq!(classify_query(&llm, "q").await, QueryMode::Comparison);
    }

    #[tokio::test]
    async fn classify_collapses_unknown_label_to_other() {
        let llm = ScriptedLlm::new(vec!["not-a-label".to_string()]);
        assert_eq!(classify_query(&llm, "q").await, QueryMode::Other);
    }

    #[tokio::test]
    async fn decompose_skips_non_decomposable_modes() {
        let llm = ScriptedLlm::new(vec!["a\nb".to_string()]);
        assert!(decompose_query(&llm, "q", QueryMode::Definition).await.is_empty());
    }

    #[tokio::test]
    async fn decompose_strips_dash_prefixes() {
        let llm = ScriptedLlm::new(vec!["- first\n-- second\nthird".to_string()]);
        let out = decompose_query(&llm, "q", QueryMode::List).await;
        assert_eq!(out, vec!["first", "second", "third"]);
    }

    #[test]
    fn route_weights_match_table() {
        let w = route_weights(QueryMode::MultiHop);
        assert_eq!(w["full"], 1.4);
        assert_eq!(w["bm25"], 1.2);
    }

    #[test]
    fn domain_expansions_prepend_corpus_name() {
        let ex = domain_expansions("세종대왕은 누구인가", QueryMode::Other);
        assert_eq!(ex[0], "조선왕조실록 세종대왕은 누구인가");
    }

    #[test]
    fn domain_expansions_comparison_adds_two_suffixes() {
        let ex = domain_expansions("조선왕조실록 비교 질문", QueryMode::Other);
        assert!(ex.contains(&"조선왕조실록 비교 질문 차이점".to_string()));
        assert!(ex.contains(&"조선왕조실록 비교 질문 서로 다른 기록".to_string()));
    }

    #[tokio::test]
    async fn build_queries_dedups_case_insensitively_and_truncates() {
        let llm = ScriptedLlm::new(vec!["Hello".to_string()]);
        let out = build_queries(&llm, "hello", QueryMode::Other, "").await;
        assert_eq!(out[0], "hello");
        assert!(out.len() <= MAX_QUERY_EXPANSIONS);
        assert!(!out.iter().skip(1).any(|s| s.eq_ignore_ascii_case("hello")));
    }

    #[tokio::test]
    async fn build_queries_includes_extra_hint() {
        let llm = ScriptedLlm::new(vec![String::new()]);
        let out = build_queries(&llm, "q", QueryMode::Other, "refined hint").await;
        assert!(out.contains(&"refined hint".to_string()));
    }
}
