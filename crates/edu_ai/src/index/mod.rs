//! In-memory vector index with directory-level persistence.

use std::sync::{Arc, RwLock};

use edu_core::domain::{Chunk, Provenance};
use edu_core::error::{codes, AppError};
use edu_core::timestamps::now_rfc3339_utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod similarity;
mod store;

pub use store::{ENTRIES_FILE, MANIFEST_FILE};

pub const INDEX_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    pub chunk_id: String,
    pub text: String,
    pub provenance: Provenance,
    pub vector: Vec<f32>,
}

impl IndexEntry {
    pub fn from_chunk(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            chunk_id: chunk.chunk_id,
            text: chunk.text,
            provenance: chunk.provenance,
            vector,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexManifest {
    pub format_version: u32,
    pub embedding_model: String,
    pub dims: u32,
    pub entry_count: u32,
    pub built_at: String,
    /// Digest of the persisted entries file; `None` until the index has been saved.
    pub entries_sha256: Option<String>,
    pub source_fingerprint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedPassage {
    pub chunk_id: String,
    pub text: String,
    pub score: f32,
    pub provenance: Provenance,
}

/// Best-first hits for one query; at most `k` long.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    pub hits: Vec<RetrievedPassage>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn top_score(&self) -> Option<f32> {
        self.hits.first().map(|h| h.score)
    }
}

/// Immutable after construction; rebuilds produce a new value.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    manifest: IndexManifest,
    entries: Vec<IndexEntry>,
    norms: Vec<f32>,
}

impl VectorIndex {
    /// Build over all entries at once. Empty input is `EMPTY_CORPUS`; every vector must
    /// be non-empty and share one dimensionality.
    pub fn build(entries: Vec<IndexEntry>, embedding_model: &str) -> Result<Self, AppError> {
        if entries.is_empty() {
            return Err(AppError::new(
                codes::EMPTY_CORPUS,
                "No entries to index; chunking and embedding produced nothing",
            ));
        }
        let dims = entries[0].vector.len();
        if dims == 0 {
            return Err(AppError::new(
                codes::EMBEDDING_MISMATCH,
                "Embedding vectors must not be empty",
            ));
        }
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != dims) {
            return Err(AppError::new(
                codes::EMBEDDING_MISMATCH,
                "Embedding dimension mismatch across entries",
            )
            .with_details(format!(
                "expected={dims}; got={}; chunk_id={}",
                bad.vector.len(),
                bad.chunk_id
            )));
        }

        let manifest = IndexManifest {
            format_version: INDEX_FORMAT_VERSION,
            embedding_model: embedding_model.to_string(),
            dims: dims as u32,
            entry_count: entries.len() as u32,
            built_at: now_rfc3339_utc()?,
            entries_sha256: None,
            source_fingerprint: None,
        };
        Ok(Self::from_parts(manifest, entries))
    }

    pub(crate) fn from_parts(manifest: IndexManifest, entries: Vec<IndexEntry>) -> Self {
        let norms = entries
            .iter()
            .map(|e| similarity::l2_norm(&e.vector))
            .collect();
        Self {
            manifest,
            entries,
            norms,
        }
    }

    pub fn with_source_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.manifest.source_fingerprint = Some(fingerprint.into());
        self
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.manifest.dims as usize
    }

    /// Cosine top-k, best first. Ties keep build order, so results are deterministic
    /// for a fixed index and query vector. `k` larger than the index returns everything.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<RetrievalResult, AppError> {
        if k == 0 {
            return Err(AppError::new(codes::RETRIEVAL_INVALID, "k must be at least 1"));
        }
        if vector.len() != self.dims() {
            return Err(AppError::new(
                codes::EMBEDDING_MISMATCH,
                "Query embedding dims do not match index dims",
            )
            .with_details(format!(
                "index_dims={}; query_dims={}",
                self.dims(),
                vector.len()
            )));
        }

        let qnorm = similarity::l2_norm(vector);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .zip(self.norms.iter())
            .enumerate()
            .map(|(i, (e, n))| (i, similarity::cosine_similarity(vector, &e.vector, qnorm, *n)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        debug!(k, entries = self.entries.len(), "index query");

        Ok(RetrievalResult {
            hits: scored
                .into_iter()
                .map(|(i, score)| {
                    let e = &self.entries[i];
                    RetrievedPassage {
                        chunk_id: e.chunk_id.clone(),
                        text: e.text.clone(),
                        score,
                        provenance: e.provenance.clone(),
                    }
                })
                .collect(),
        })
    }
}

/// Shared reference to the live index. Readers clone the inner `Arc`; a rebuild swaps
/// the reference instead of mutating an index that queries may be reading.
#[derive(Debug, Clone)]
pub struct IndexHandle {
    inner: Arc<RwLock<Arc<VectorIndex>>>,
}

impl IndexHandle {
    pub fn new(index: VectorIndex) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(index))),
        }
    }

    pub fn current(&self) -> Arc<VectorIndex> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Install `index` and return the one it replaced.
    pub fn swap(&self, index: VectorIndex) -> Arc<VectorIndex> {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, Arc::new(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, vector: Vec<f32>) -> IndexEntry {
        IndexEntry {
            chunk_id: id.to_string(),
            text: format!("text {id}"),
            provenance: Provenance {
                source: "s.docx".to_string(),
                path: "data/s.docx".to_string(),
                page: None,
                offset: 0,
            },
            vector,
        }
    }

    #[test]
    fn empty_build_is_empty_corpus() {
        let err = VectorIndex::build(Vec::new(), "m").expect_err("empty");
        assert!(err.is(codes::EMPTY_CORPUS));
    }

    #[test]
    fn mixed_dims_are_rejected() {
        let err = VectorIndex::build(vec![entry("a", vec![1.0, 0.0]), entry("b", vec![1.0])], "m")
            .expect_err("dims");
        assert!(err.is(codes::EMBEDDING_MISMATCH));
    }

    #[test]
    fn ties_keep_build_order_and_k_zero_is_invalid() {
        let idx = VectorIndex::build(
            vec![
                entry("first", vec![1.0, 0.0]),
                entry("second", vec![2.0, 0.0]),
                entry("other", vec![0.0, 1.0]),
            ],
            "m",
        )
        .expect("build");
        let res = idx.query(&[1.0, 0.0], 2).expect("query");
        let ids: Vec<&str> = res.hits.iter().map(|h| h.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
        assert!(idx.query(&[1.0, 0.0], 0).expect_err("k=0").is(codes::RETRIEVAL_INVALID));
        assert!(idx.query(&[1.0], 1).expect_err("dims").is(codes::EMBEDDING_MISMATCH));
    }

    #[test]
    fn handle_swap_leaves_existing_readers_untouched() {
        let handle = IndexHandle::new(
            VectorIndex::build(vec![entry("old", vec![1.0])], "m").expect("build"),
        );
        let reader = handle.current();
        let previous = handle.swap(
            VectorIndex::build(vec![entry("new", vec![1.0]), entry("new2", vec![1.0])], "m")
                .expect("build"),
        );
        assert_eq!(reader.len(), 1);
        assert_eq!(previous.len(), 1);
        assert_eq!(handle.current().len(), 2);
    }
}
