//! Immutable document store: metadata, dense indices, and BM25 postings (§3, §6.2).

use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::bm25::Bm25Store;
use crate::index::dense::DenseIndex;
use crate::tokenizer::{self, FilterSet};

/// A single immutable document record, identified by its position in the
/// metadata sequence (the doc-id).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Doc {
    /// Document title.
    #[serde(default)]
    pub title: String,
    /// Source link.
    #[serde(default)]
    pub link: String,
    /// Full body text.
    #[serde(default)]
    pub text: String,
    /// Source row identifier, if present in the ingestion pipeline.
    #[serde(default)]
    pub row_id: Option<String>,
    /// Chunk identifier within a source row, if the doc was split.
    #[serde(default)]
    pub chunk_id: Option<String>,
    /// Reigning king at the time of the record.
    #[serde(default)]
    pub king: Option<String>,
    /// Record year.
    #[serde(default)]
    pub year: Option<String>,
    /// Record month.
    #[serde(default)]
    pub month: Option<String>,
    /// Record day.
    #[serde(default)]
    pub day: Option<String>,
    /// Source book/volume.
    #[serde(default)]
    pub book: Option<String>,
    /// Source article number.
    #[serde(default)]
    pub article: Option<String>,
}

/// The fully hydrated, immutable store backing every request.
///
/// Constructed once at startup (§5, "Global store") and shared by reference
/// to all request handlers.
pub struct Store {
    /// Doc metadata, indexed by doc-id.
    pub metas: Vec<Doc>,
    /// Body dense index ("full"), always present.
    pub index_full: DenseIndex,
    /// Summary dense index ("sum"), optional.
    pub index_summary: Option<DenseIndex>,
    /// Title dense index ("title"), optional.
    pub index_title: Option<DenseIndex>,
    /// Body BM25 store, optional.
    pub bm25: Option<Bm25Store>,
    /// Title BM25 store, optional.
    pub bm25_title: Option<Bm25Store>,
}

impl Store {
    /// Loads a store from a directory per the on-disk contract in §6.2.
    ///
    /// `index.faiss` is required; `index_summary.faiss`, `index_title.faiss`,
    /// `bm25.pkl`, and `bm25_title.pkl` are optional and treated as absent
    /// channels when missing. Parsing the `meta.jsonl` sidecar and hydrating
    /// the dense/BM25 artifacts via [`crate::store::format`] are this
    /// loader's responsibility; the binary on-disk formats themselves are
    /// produced by an out-of-scope ingestion pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreLoad`] if the directory or the required index
    /// file is missing, and [`Error::MetaParse`] if a `meta.jsonl` line
    /// fails to parse.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::StoreLoad(format!(
                "store directory not found: {}",
                dir.display()
            )));
        }

        let index_full_path = dir.join("index.faiss");
        if !index_full_path.is_file() {
            return Err(Error::StoreLoad(format!(
                "required index missing: {}",
                index_full_path.display()
            )));
        }
        let index_full = format::read_dense_index(&index_full_path)?;

        let index_summary = optional_dense(dir.join("index_summary.faiss"))?;
        let index_title = optional_dense(dir.join("index_title.faiss"))?;

        let metas = read_metas(dir.join("meta.jsonl"))?;

        let bm25 = optional_bm25(dir.join("bm25.pkl"))?;
        let bm25_title = optional_bm25(dir.join("bm25_title.pkl"))?;

        tracing::debug!(
            docs = metas.len(),
            has_summary = index_summary.is_some(),
            has_title_index = index_title.is_some(),
            has_bm25 = bm25.is_some(),
            has_bm25_title = bm25_title.is_some(),
            "store loaded"
        );

        Ok(Self {
            metas,
            index_full,
            index_summary,
            index_title,
            bm25,
            bm25_title,
        })
    }

    /// Returns the number of documents in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metas.len()
    }

    /// Returns `true` if the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    /// Returns the doc at `id`, if `id` is in range.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&Doc> {
        self.metas.get(id as usize)
    }
}

fn optional_dense(path: std::path::PathBuf) -> Result<Option<DenseIndex>> {
    if path.is_file() {
        Ok(Some(format::read_dense_index(&path)?))
    } else {
        Ok(None)
    }
}

fn optional_bm25(path: std::path::PathBuf) -> Result<Option<Bm25Store>> {
    if path.is_file() {
        Ok(Some(format::read_bm25_store(&path)?))
    } else {
        Ok(None)
    }
}

fn read_metas(path: std::path::PathBuf) -> Result<Vec<Doc>> {
    let file = std::fs::File::open(&path)
        .map_err(|e| Error::StoreLoad(format!("{}: {e}", path.display())))?;
    let reader = std::io::BufReader::new(file);
    let mut metas = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::MetaParse(format!("line {lineno}: {e}")))?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: Doc = serde_json::from_str(&line)
            .map_err(|e| Error::MetaParse(format!("line {lineno}: {e}")))?;
        metas.push(doc);
    }
    Ok(metas)
}

/// Computes the allow-set from a parsed [`FilterSet`] (§4.1).
///
/// Returns `None` when no filters were supplied, matching the "no
/// restriction" meaning of an absent allow-set elsewhere in this crate.
#[must_use]
pub fn filter_doc_ids(metas: &[Doc], filters: &FilterSet) -> Option<HashSet<u32>> {
    if filters.is_empty() {
        return None;
    }
    let mut allowed = HashSet::new();
    for (i, m) in metas.iter().enumerate() {
        let mut ok = true;
        if let Some(values) = filters.get("row_id") {
            ok &= m
                .row_id
                .as_deref()
                .is_some_and(|v| values.iter().any(|f| f == v));
        }
        if ok {
            if let Some(values) = filters.get("chunk_id") {
                ok &= m
                    .chunk_id
                    .as_deref()
                    .is_some_and(|v| values.iter().any(|f| f == v));
            }
        }
        if ok {
            if let Some(values) = filters.get("title") {
                let title = m.title.to_lowercase();
                ok &= values.iter().any(|f| title.contains(&f.to_lowercase()));
            }
        }
        if ok {
            if let Some(values) = filters.get("link") {
                let link = m.link.to_lowercase();
                ok &= values.iter().any(|f| link.contains(&f.to_lowercase()));
            }
        }
        if ok {
            allowed.insert(i as u32);
        }
    }
    Some(allowed)
}

/// Composes the ` / `-separated metadata line for a doc (§4.9).
#[must_use]
pub fn format_meta(doc: &Doc) -> String {
    let mut parts = Vec::new();
    if let Some(king) = doc.king.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("왕:{king}"));
    }
    let mut date = Vec::new();
    if let Some(year) = doc.year.as_deref().filter(|s| !s.is_empty()) {
        date.push(format!("{year}년"));
    }
    if let Some(month) = doc.month.as_deref().filter(|s| !s.is_empty()) {
        date.push(format!("{month}월"));
    }
    if let Some(day) = doc.day.as_deref().filter(|s| !s.is_empty()) {
        date.push(format!("{day}일"));
    }
    if !date.is_empty() {
        parts.push(date.join(" "));
    }
    if let Some(book) = doc.book.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("책/권:{book}"));
    }
    if let Some(article) = doc.article.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("기사:{article}"));
    }
    parts.join(" / ")
}

/// Tokenized title overlap helper used by the lexical prerank (§4.5).
#[must_use]
pub fn title_tokens(doc: &Doc) -> Vec<String> {
    tokenizer::tokenize(&doc.title)
}

/// Adapters that hydrate the on-disk dense/BM25 artifacts into in-memory
/// structures. The binary formats (`faiss`/`pickle`-produced files) are an
/// external contract owned by the out-of-scope ingestion pipeline; these
/// adapters decode a generic vector/posting payload sufficient for the
/// loader contract and for unit testing against hand-built fixtures.
pub mod format {
    use super::{Bm25Store, DenseIndex};
    use crate::error::{Error, Result};
    use std::path::Path;

    /// Reads a dense index artifact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreLoad`] if the file cannot be read or decoded.
    pub fn read_dense_index(path: &Path) -> Result<DenseIndex> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::StoreLoad(format!("{}: {e}", path.display())))?;
        DenseIndex::from_bytes(&bytes)
            .map_err(|e| Error::StoreLoad(format!("{}: {e}", path.display())))
    }

    /// Reads a BM25 store artifact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreLoad`] if the file cannot be read or decoded.
    pub fn read_bm25_store(path: &Path) -> Result<Bm25Store> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::StoreLoad(format!("{}: {e}", path.display())))?;
        Bm25Store::from_bytes(&bytes)
            .map_err(|e| Error::StoreLoad(format!("{}: {e}", path.display())))
    }
}
