//! Flat vector index.
//!
//! Brute-force L2 nearest-neighbor search over an append-only list of
//! vectors keyed by insertion order. The corpus here is a few hundred
//! passages at most, so a flat scan beats any approximate structure.

use mediq_core::error::MediqError;

use crate::embedding::l2_distance;

/// Append-only vector index. Entries are identified by insertion order;
/// there is no per-entry deletion, only full replacement via [`clear`].
///
/// [`clear`]: VectorIndex::clear
#[derive(Debug, Default)]
pub struct VectorIndex {
    vectors: Vec<Vec<f32>>,
    dimensions: Option<usize>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Append a vector, returning its position.
    ///
    /// The first insertion fixes the index dimensionality; later insertions
    /// with a different length are rejected.
    pub fn add(&mut self, vector: Vec<f32>) -> Result<usize, MediqError> {
        match self.dimensions {
            Some(dims) if dims != vector.len() => {
                return Err(MediqError::Retrieval(format!(
                    "dimension mismatch: index has {}, vector has {}",
                    dims,
                    vector.len()
                )));
            }
            None => self.dimensions = Some(vector.len()),
            _ => {}
        }
        self.vectors.push(vector);
        Ok(self.vectors.len() - 1)
    }

    /// Drop all entries, allowing a full rebuild.
    pub fn clear(&mut self) {
        self.vectors.clear();
        self.dimensions = None;
    }

    /// Return the `k` nearest entries to `query` as `(position, distance)`
    /// pairs, sorted by ascending L2 distance.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, l2_distance(query, v)))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_index_search() {
        let index = VectorIndex::new();
        assert!(index.search(&[1.0, 0.0], 5).is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_add_assigns_sequential_positions() {
        let mut index = VectorIndex::new();
        assert_eq!(index.add(vec![1.0, 0.0]).unwrap(), 0);
        assert_eq!(index.add(vec![0.0, 1.0]).unwrap(), 1);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut index = VectorIndex::new();
        index.add(vec![1.0, 0.0]).unwrap();
        let result = index.add(vec![1.0, 0.0, 0.0]);
        assert!(matches!(result, Err(MediqError::Retrieval(_))));
    }

    #[test]
    fn test_search_returns_nearest_first() {
        let mut index = VectorIndex::new();
        index.add(vec![0.0, 0.0]).unwrap();
        index.add(vec![10.0, 10.0]).unwrap();
        index.add(vec![1.0, 1.0]).unwrap();

        let results = index.search(&[0.9, 0.9], 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 2);
        assert_eq!(results[1].0, 0);
        assert!(results[0].1 < results[1].1);
    }

    #[test]
    fn test_search_k_larger_than_corpus() {
        let mut index = VectorIndex::new();
        index.add(vec![1.0]).unwrap();
        let results = index.search(&[1.0], 10);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_exact_match_has_zero_distance() {
        let mut index = VectorIndex::new();
        index.add(vec![0.3, 0.7]).unwrap();
        let results = index.search(&[0.3, 0.7], 1);
        assert_eq!(results[0].1, 0.0);
    }

    #[test]
    fn test_clear_resets_dimensions() {
        let mut index = VectorIndex::new();
        index.add(vec![1.0, 2.0]).unwrap();
        index.clear();
        assert!(index.is_empty());
        // A different dimensionality is accepted after clear.
        assert!(index.add(vec![1.0, 2.0, 3.0]).is_ok());
    }
}
