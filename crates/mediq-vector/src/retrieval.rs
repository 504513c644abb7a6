//! Relevance-filtered passage retrieval.

use std::sync::Arc;

use mediq_core::error::{MediqError, Result};
use tracing::{debug, info};

use crate::embedding::SimilarityBackend;
use crate::index::VectorIndex;

/// Vector-similarity search over a pre-built passage corpus.
///
/// Distances are converted to a relative similarity score via
/// `exp(-d / (max_distance_in_batch + eps))`, so an exact match scores 1.0
/// and the furthest candidate in the batch scores about `1/e`.
pub struct RetrievalEngine {
    backend: Arc<dyn SimilarityBackend>,
    index: VectorIndex,
    documents: Vec<String>,
}

impl std::fmt::Debug for RetrievalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalEngine")
            .field("documents", &self.documents.len())
            .finish()
    }
}

impl RetrievalEngine {
    pub fn new(backend: Arc<dyn SimilarityBackend>) -> Self {
        Self {
            backend,
            index: VectorIndex::new(),
            documents: Vec::new(),
        }
    }

    /// Number of indexed passages.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Embed and store all documents, replacing any existing index.
    ///
    /// Full rebuild only; there is no incremental update or per-entry
    /// deletion.
    pub fn build_index(&mut self, documents: Vec<String>) -> Result<()> {
        self.index.clear();
        self.documents.clear();

        for doc in documents {
            let vector = self.backend.embed(&doc)?;
            self.index.add(vector)?;
            self.documents.push(doc);
        }

        info!(passages = self.documents.len(), "Retrieval index built");
        Ok(())
    }

    /// Search and return `(text, score)` pairs sorted by score descending.
    ///
    /// Retrieves `min(2 * top_k, corpus)` nearest candidates, scores them,
    /// and discards anything below `min_relevance`.
    pub fn search_with_scores(
        &self,
        query: &str,
        top_k: usize,
        min_relevance: f32,
    ) -> Result<Vec<(String, f32)>> {
        if query.trim().is_empty() {
            return Err(MediqError::Retrieval("empty query".to_string()));
        }
        if self.documents.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query_vec = self.backend.embed(query)?;
        let fetch = (2 * top_k).min(self.documents.len());
        let candidates = self.index.search(&query_vec, fetch);

        let max_distance = candidates
            .iter()
            .map(|(_, d)| *d)
            .fold(0.0f32, f32::max);

        let mut scored: Vec<(String, f32)> = candidates
            .into_iter()
            .filter_map(|(pos, distance)| {
                let similarity = (-distance / (max_distance + 1e-6)).exp();
                if similarity >= min_relevance {
                    Some((self.documents[pos].clone(), similarity))
                } else {
                    None
                }
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        debug!(query, results = scored.len(), "Retrieval search");
        Ok(scored)
    }

    /// Search and return the surviving passages newline-joined, or an empty
    /// string when nothing clears the relevance threshold.
    pub fn search(&self, query: &str, top_k: usize, min_relevance: f32) -> Result<String> {
        let results = self.search_with_scores(query, top_k, min_relevance)?;
        Ok(results
            .into_iter()
            .map(|(text, _)| text)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
