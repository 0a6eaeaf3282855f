//! Vector storage, search and projection.
//!
//! This module owns everything that operates on embeddings as numbers:
//! the exact in-memory index, its on-disk artifact pair, the embedding
//! generator seam and the 2-D projector used for visualization.
//!
//! # Architecture
//! The corpus is a few hundred profiles at most, so search is a brute-force
//! scan over unit-normalized vectors. Saved indexes are memory-mapped on
//! load and validated before use.

mod embedding;
mod index;
mod projection;
mod storage;
mod types;

// Re-export core types for public API
#[cfg(test)]
pub use embedding::MockEmbeddingGenerator;
pub use embedding::{
    EmbeddingGenerator, FastEmbedGenerator, parse_embedding_model, preprocess_text,
};
pub use index::{VectorIndex, dot_product, l2_norm, normalize_vector};
pub use projection::{PROJECTION_COMPONENTS, PcaModel, ProjectionError, Projector};
pub use storage::IndexStorage;
pub use types::{VectorDimension, VectorError};
