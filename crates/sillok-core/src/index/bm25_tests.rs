//! Tests for `bm25` module

use super::bm25::*;
use std::collections::HashSet;

#[test]
fn empty_store_returns_no_scores() {
    let store = Bm25Store::default();
    assert!(store.is_empty());
    assert!(store.scores("세종", None).is_empty());
    assert!(store.top_k("세종", 5, None).is_empty());
}

#[test]
fn unknown_term_contributes_zero() {
    let docs = vec!["세종 실록".to_string(), "태조 실록".to_string()];
    let store = Bm25Store::build(&docs, Bm25Params::default());
    let scores = store.scores("존재하지않는단어", None);
    assert!(scores.is_empty());
}

#[test]
fn matches_okapi_formula_on_synthetic_corpus() {
    let docs = vec![
        "세종 세종 실록".to_string(),
        "태조 실록".to_string(),
        "세종 편찬".to_string(),
    ];
    let store = Bm25Store::build(&docs, Bm25Params::default());

    let scores = store.scores("세종", None);

    let n = 3.0_f32;
    let df = 2.0_f32; // docs 0 and 2 contain "세종"
    let idf = (((n - df + 0.5) / (df + 0.5)) + 1.0).ln().max(0.0);
    let k1 = 1.2_f32;
    let b = 0.75_f32;
    let avgdl = (3.0 + 2.0 + 2.0) / 3.0;

    let tf0 = 2.0_f32;
    let dl0 = 3.0_f32;
    let expected0 = idf * (tf0 * (k1 + 1.0)) / (tf0 + k1 * (1.0 - b + b * dl0 / avgdl));
    assert!((scores[&0] - expected0).abs() < 1e-5);

    let tf2 = 1.0_f32;
    let dl2 = 2.0_f32;
    let expected2 = idf * (tf2 * (k1 + 1.0)) / (tf2 + k1 * (1.0 - b + b * dl2 / avgdl));
    assert!((scores[&2] - expected2).abs() < 1e-5);

    assert!(!scores.contains_key(&1));
}

#[test]
fn top_k_respects_allow_set() {
    let docs = vec![
        "세종 실록".to_string(),
        "세종 대왕".to_string(),
        "세종 편찬".to_string(),
    ];
    let store = Bm25Store::build(&docs, Bm25Params::default());
    let allow: HashSet<u32> = [1u32].into_iter().collect();

    let top = store.top_k("세종", 10, Some(&allow));

    assert_eq!(top, vec![1]);
}

#[test]
fn top_k_ordered_descending() {
    let docs = vec![
        "세종".to_string(),
        "세종 세종 세종".to_string(),
        "다른 문서".to_string(),
    ];
    let store = Bm25Store::build(&docs, Bm25Params::default());

    let top = store.top_k("세종", 10, None);

    assert_eq!(top[0], 1);
    assert_eq!(top.len(), 2);
}
