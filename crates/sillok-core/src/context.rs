//! Context block assembly and evidence-checklist formatting (§4.9).

use serde_json::Value;

use crate::constants::DOC_CHAR_LIMIT;
use crate::store::{format_meta, Doc};

fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

/// Builds one context block for a doc at stable display index `display_idx`
/// (1-based), per §4.9: `"[i] {title}\nLINK: {link}\nMETA: {meta}\n{text}"`,
/// with the META line omitted entirely when [`format_meta`] is empty.
#[must_use]
pub fn build_doc_block(display_idx: usize, doc: &Doc) -> String {
    let meta = format_meta(doc);
    let meta_line = if meta.is_empty() {
        String::new()
    } else {
        format!("\nMETA: {meta}")
    };
    let text = truncate_chars(&doc.text, DOC_CHAR_LIMIT);
    format!(
        "[{display_idx}] {title}\nLINK: {link}{meta_line}\n{text}",
        title = doc.title,
        link = doc.link,
    )
}

/// Joins the doc blocks for a sequence of `(display_idx, doc)` pairs into
/// one context string, in display order.
#[must_use]
pub fn build_context(docs: &[(usize, &Doc)]) -> String {
    docs.iter()
        .map(|(idx, doc)| build_doc_block(*idx, doc))
        .collect::<Vec<_>>()
        .join("")
}

fn join_or_dash(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(items)) => {
            let joined = items
                .iter()
                .map(value_to_trimmed_string)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", ");
            if joined.is_empty() {
                "-".to_string()
            } else {
                joined
            }
        }
        Some(other) => {
            let s = value_to_trimmed_string(other);
            if s.is_empty() {
                "-".to_string()
            } else {
                s
            }
        }
        None => "-".to_string(),
    }
}

fn value_to_trimmed_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn has_content(v: Option<&Value>) -> bool {
    match v {
        Some(Value::Null) | None => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

/// Builds the `"증거 체크리스트"` block from an `answer_or_request` response,
/// or an empty string if neither `evidence_found` nor `evidence_missing`
/// was present or both were empty lists (§4.9).
#[must_use]
pub fn build_evidence_block(resp: &Value) -> String {
    let found = resp.get("evidence_found");
    let missing = resp.get("evidence_missing");
    if !has_content(found) && !has_content(missing) {
        return String::new();
    }
    format!(
        "\n\n증거 체크리스트:\n- 근거 있음: {}\n- 근거 부족: {}",
        join_or_dash(found),
        join_or_dash(missing),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn doc_block_omits_meta_line_when_empty() {
        let doc = Doc {
            title: "T".into(),
            link: "L".into(),
            text: "body".into(),
            ..Default::default()
        };
        assert_eq!(build_doc_block(1, &doc), "[1] T\nLINK: L\nbody");
    }

    #[test]
    fn doc_block_includes_meta_line_when_present() {
        let doc = Doc {
            title: "T".into(),
            link: "L".into(),
            text: "body".into(),
            king: Some("세종".into()),
            ..Default::default()
        };
        assert_eq!(build_doc_block(2, &doc), "[2] T\nLINK: L\nMETA: 왕:세종\nbody");
    }

    #[test]
    fn evidence_block_empty_when_neither_field_present() {
        assert_eq!(build_evidence_block(&json!({"action":"answer"})), "");
    }

    #[test]
    fn evidence_block_empty_when_both_fields_are_empty_lists() {
        let resp = json!({"evidence_found": [], "evidence_missing": []});
        assert_eq!(build_evidence_block(&resp), "");
    }

    #[test]
    fn evidence_block_formats_lists() {
        let resp = json!({"evidence_found": ["a", "b"], "evidence_missing": []});
        let block = build_evidence_block(&resp);
        assert_eq!(
            block,
            "\n\n증거 체크리스트:\n- 근거 있음: a, b\n- 근거 부족: -"
        );
    }
}
