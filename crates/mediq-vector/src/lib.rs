//! Vector similarity primitives for Mediq.
//!
//! Provides the embedding backend seam, a flat L2 index, and the
//! relevance-filtered retrieval engine used for FAQ fallback answers.

pub mod embedding;
pub mod index;
pub mod retrieval;

pub use embedding::{cosine_similarity, l2_distance, HashEmbedding, SimilarityBackend};
pub use index::VectorIndex;
pub use retrieval::RetrievalEngine;
