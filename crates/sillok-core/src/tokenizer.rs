//! Word tokenizer and inline control-token parsers (§4.1).

use rustc_hash::FxHashMap;

/// Lowercases and extracts maximal runs of word characters: ASCII letters,
/// digits, and Hangul syllables.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if is_word_char(ch) {
            current.extend(ch.to_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ('\u{AC00}'..='\u{D7A3}').contains(&ch)
}

/// Filter keys recognized by [`parse_filters`].
pub const FILTER_KEYS: [&str; 4] = ["title", "link", "row_id", "chunk_id"];

/// Accumulated filter values, keyed by lowercase filter key.
pub type FilterSet = FxHashMap<String, Vec<String>>;

/// Strips `~word` meta-only markers from the query.
///
/// Returns the residual, whitespace-normalized query and whether any marker
/// was found.
#[must_use]
pub fn parse_meta_only(query: &str) -> (String, bool) {
    let mut found = false;
    let mut out = String::with_capacity(query.len());
    let mut chars = query.char_indices().peekable();
    let bytes = query.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let ch = query[i..].chars().next().unwrap();
        if ch == '~' && (i == 0 || query[..i].ends_with(char::is_whitespace)) {
            // consume the marker and the following non-whitespace run
            let rest = &query[i + ch.len_utf8()..];
            let word_len: usize = rest
                .char_indices()
                .take_while(|(_, c)| !c.is_whitespace())
                .map(|(_, c)| c.len_utf8())
                .sum();
            if word_len > 0 {
                found = true;
                out.push(' ');
                i += ch.len_utf8() + word_len;
                continue;
            }
        }
        out.push(ch);
        i += ch.len_utf8();
    }
    let _ = &mut chars;
    let normalized: String = out.split_whitespace().collect::<Vec<_>>().join(" ");
    (normalized, found)
}

/// Parses `key:value` and `key:"quoted value"` tokens for
/// `key ∈ {title, link, row_id, chunk_id}` (case-insensitive), accumulating
/// possibly-repeated values per key. Filter tokens are removed from the
/// residual query; malformed filters leave the query untouched for that
/// token.
#[must_use]
pub fn parse_filters(query: &str) -> (String, FilterSet) {
    let mut filters: FilterSet = FxHashMap::default();
    let mut residual = String::with_capacity(query.len());

    let chars: Vec<char> = query.chars().collect();
    let n = chars.len();
    let mut i = 0;
    while i < n {
        if let Some((key, value, consumed)) = try_match_filter(&chars, i) {
            filters
                .entry(key.to_lowercase())
                .or_default()
                .push(value);
            i += consumed;
            continue;
        }
        residual.push(chars[i]);
        i += 1;
    }

    let cleaned: String = residual.split_whitespace().collect::<Vec<_>>().join(" ");
    (cleaned, filters)
}

/// Attempts to match a filter token starting at `chars[start]`. Returns the
/// key, the unquoted value, and the number of chars consumed, or `None` if
/// no filter token starts here.
fn try_match_filter(chars: &[char], start: usize) -> Option<(String, String, usize)> {
    // A filter may begin at a word boundary only.
    if start > 0 && (chars[start - 1].is_alphanumeric() || chars[start - 1] == '_') {
        return None;
    }
    let n = chars.len();
    let mut i = start;
    let key_start = i;
    while i < n && chars[i].is_ascii_alphabetic() || (i < n && chars[i] == '_') {
        i += 1;
    }
    if i == key_start {
        return None;
    }
    let key: String = chars[key_start..i].iter().collect();
    if !FILTER_KEYS
        .iter()
        .any(|k| k.eq_ignore_ascii_case(key.as_str()))
    {
        return None;
    }
    if i >= n || chars[i] != ':' {
        return None;
    }
    i += 1;
    if i < n && chars[i] == '"' {
        let val_start = i + 1;
        let mut j = val_start;
        while j < n && chars[j] != '"' {
            j += 1;
        }
        if j >= n {
            return None; // unterminated quote: malformed, leave untouched
        }
        let value: String = chars[val_start..j].iter().collect();
        return Some((key, value, j + 1 - start));
    }
    let val_start = i;
    let mut j = val_start;
    while j < n && !chars[j].is_whitespace() {
        j += 1;
    }
    if j == val_start {
        return None;
    }
    let value: String = chars[val_start..j].iter().collect();
    Some((key, value, j - start))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_mixed_alphabet() {
        let toks = tokenize("Sejong 세종 25년 and more!");
        assert_eq!(toks, vec!["sejong", "세종", "25년", "and", "more"]);
    }

    #[test]
    fn tokenize_skips_punctuation() {
        let toks = tokenize("실록, 편찬.");
        assert_eq!(toks, vec!["실록", "편찬"]);
    }

    #[test]
    fn meta_only_strips_marker() {
        let (q, meta_only) = parse_meta_only("~실록 title:태조");
        assert!(meta_only);
        assert_eq!(q, "title:태조");
    }

    #[test]
    fn meta_only_absent() {
        let (q, meta_only) = parse_meta_only("plain query");
        assert!(!meta_only);
        assert_eq!(q, "plain query");
    }

    #[test]
    fn filters_quoted_value() {
        let (q, f) = parse_filters(r#"title:"태조 실록" 세종"#);
        assert_eq!(q, "세종");
        assert_eq!(f.get("title").unwrap(), &vec!["태조 실록".to_string()]);
    }

    #[test]
    fn filters_multiple_same_key() {
        let (_q, f) = parse_filters("row_id:1 row_id:2");
        assert_eq!(f.get("row_id").unwrap(), &vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn filters_unrecognized_key_untouched() {
        let (q, f) = parse_filters("author:someone 세종");
        assert_eq!(q, "author:someone 세종");
        assert!(f.is_empty());
    }

    #[test]
    fn filters_case_insensitive_key() {
        let (_q, f) = parse_filters("TITLE:foo");
        assert_eq!(f.get("title").unwrap(), &vec!["foo".to_string()]);
    }

    #[test]
    fn filters_malformed_unterminated_quote_left_untouched() {
        let (q, f) = parse_filters(r#"title:"unterminated"#);
        assert!(f.is_empty());
        assert_eq!(q, r#"title:"unterminated"#);
    }
}
