//! Exact in-memory vector index over unit-normalized embeddings.
//!
//! The corpus is small enough that brute-force comparison against every
//! stored vector is the right trade-off: results are exact and ordering is
//! fully deterministic.
//!
//! # Lifecycle
//! The index is populated once with [`VectorIndex::add`] and then only read.
//! Concurrent readers share it behind an `Arc`; hot reload replaces the
//! whole index rather than mutating it.

use tracing::{debug, info, warn};

use crate::corpus::CorpusRecord;
use crate::vector::{VectorDimension, VectorError};

/// Norms at or below this value are treated as zero.
const EPSILON: f32 = 1e-12;

/// Searchable collection of (vector, record) pairs.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    /// Unit-normalized vectors, in insertion order
    vectors: Vec<Vec<f32>>,

    /// Records, parallel to `vectors`
    records: Vec<CorpusRecord>,

    /// Fixed vector dimension for validation
    dimension: VectorDimension,
}

impl VectorIndex {
    /// Creates an empty index for vectors of the given dimension.
    #[must_use]
    pub fn new(dimension: VectorDimension) -> Self {
        info!("Initialized vector index with dimension {dimension}");
        Self {
            vectors: Vec::new(),
            records: Vec::new(),
            dimension,
        }
    }

    /// Rebuilds an index from already-normalized parts, e.g. after a load.
    pub(crate) fn from_parts(
        dimension: VectorDimension,
        vectors: Vec<Vec<f32>>,
        records: Vec<CorpusRecord>,
    ) -> Result<Self, VectorError> {
        if vectors.len() != records.len() {
            return Err(VectorError::CountMismatch {
                vectors: vectors.len(),
                records: records.len(),
            });
        }
        for vector in &vectors {
            dimension.validate_vector(vector)?;
        }
        Ok(Self {
            vectors,
            records,
            dimension,
        })
    }

    /// Appends a batch of vectors with their records.
    ///
    /// Every vector is L2-normalized before it is stored; an all-zero vector
    /// stays all-zero. The whole batch is validated first, so a failed call
    /// leaves the index untouched.
    ///
    /// # Errors
    /// - [`VectorError::DimensionMismatch`] if any vector has the wrong length
    /// - [`VectorError::CountMismatch`] if `vectors.len() != records.len()`
    pub fn add(
        &mut self,
        mut vectors: Vec<Vec<f32>>,
        records: Vec<CorpusRecord>,
    ) -> Result<(), VectorError> {
        for vector in &vectors {
            self.dimension.validate_vector(vector)?;
        }

        if vectors.len() != records.len() {
            return Err(VectorError::CountMismatch {
                vectors: vectors.len(),
                records: records.len(),
            });
        }

        for vector in &mut vectors {
            normalize_vector(vector);
        }

        let added = vectors.len();
        self.vectors.append(&mut vectors);
        self.records.extend(records);

        info!(
            "Added {added} vectors to index. Total: {}",
            self.vectors.len()
        );
        Ok(())
    }

    /// Returns the `min(k, len)` most similar records, best first.
    ///
    /// The query is normalized on a private copy. Similarity is the inner
    /// product of unit vectors, so scores lie in `[-1, 1]` and are not
    /// clamped. Equal scores keep insertion order. An empty index yields an
    /// empty result rather than an error.
    ///
    /// # Errors
    /// [`VectorError::DimensionMismatch`] if the query has the wrong length.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<(f32, &CorpusRecord)>, VectorError> {
        if self.vectors.is_empty() {
            warn!("Index is empty");
            return Ok(Vec::new());
        }

        self.dimension.validate_vector(query)?;

        let mut query = query.to_vec();
        normalize_vector(&mut query);

        let mut scored: Vec<(f32, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, stored)| (dot_product(&query, stored), i))
            .collect();

        // sort_by is stable: ties stay in insertion order
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(k.min(self.vectors.len()));

        debug!("Search returned {} of {} candidates", scored.len(), self.len());

        Ok(scored
            .into_iter()
            .map(|(score, i)| (score, &self.records[i]))
            .collect())
    }

    /// Search that drops results scoring below `threshold`.
    pub fn search_with_threshold(
        &self,
        query: &[f32],
        k: usize,
        threshold: f32,
    ) -> Result<Vec<(f32, &CorpusRecord)>, VectorError> {
        let results = self.search(query, k)?;
        Ok(results
            .into_iter()
            .filter(|(score, _)| *score >= threshold)
            .collect())
    }

    /// All stored (normalized) vectors in insertion order.
    #[must_use]
    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    /// All stored records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[CorpusRecord] {
        &self.records
    }

    /// Number of indexed vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// The fixed vector dimension of this index.
    #[must_use]
    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }
}

/// Normalizes a vector in-place to unit length.
///
/// Vectors with a (near) zero norm are left as they are.
pub fn normalize_vector(vector: &mut [f32]) {
    let norm = l2_norm(vector);
    if norm > EPSILON {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Euclidean length of a vector.
#[must_use]
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Inner product of two vectors of equal length.
#[must_use]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
