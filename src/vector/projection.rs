//! Two-component PCA projection for visualizing embeddings in 2-D.
//!
//! The projector is fit once over the corpus embeddings and then applied to
//! any vector, including live queries that were never part of the fit set.
//!
//! # Algorithm Details
//! - Centering: per-dimension mean of the fit set
//! - Components: top two eigenvectors of the sample covariance, found by
//!   power iteration with Gram-Schmidt deflation (no covariance matrix is
//!   materialized, each step costs O(n * d))
//! - Initialization: seeded RNG, so identical input gives identical output
//! - Sign: each component is flipped so its largest-magnitude coordinate
//!   is positive
//! - Degenerate directions (zero remaining variance) fall back to the first
//!   standard basis vector orthogonal to earlier components

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info};

/// Number of output dimensions.
pub const PROJECTION_COMPONENTS: usize = 2;

/// Fixed seed for the power-iteration start vectors.
const PCA_SEED: u64 = 42;

/// Maximum power iterations per component.
const MAX_ITERATIONS: usize = 500;

/// Convergence tolerance on `1 - |cos|` between successive iterates.
const CONVERGENCE_TOLERANCE: f64 = 1e-12;

/// Norms below this are treated as zero.
const EPSILON: f64 = 1e-10;

/// Errors raised by [`Projector`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("Projection needs at least one vector to fit\nSuggestion: Populate the index before fitting the projector")]
    InsufficientData,

    #[error("Projector has not been fit\nSuggestion: Call fit() with the corpus embeddings first")]
    NotFit,

    #[error("Projection dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Learned centering and basis of a fitted projection.
#[derive(Debug, Clone, PartialEq)]
pub struct PcaModel {
    mean: Vec<f64>,
    components: [Vec<f64>; PROJECTION_COMPONENTS],
    explained_variance: [f64; PROJECTION_COMPONENTS],
}

impl PcaModel {
    /// Input dimension this model accepts.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    /// Variance captured by each component, in component order.
    #[must_use]
    pub fn explained_variance(&self) -> [f64; PROJECTION_COMPONENTS] {
        self.explained_variance
    }

    fn project(&self, vector: &[f32]) -> [f32; PROJECTION_COMPONENTS] {
        let mut point = [0.0f32; PROJECTION_COMPONENTS];
        for (out, component) in point.iter_mut().zip(self.components.iter()) {
            let value: f64 = vector
                .iter()
                .zip(self.mean.iter())
                .zip(component.iter())
                .map(|((&x, &m), &c)| (f64::from(x) - m) * c)
                .sum();
            *out = value as f32;
        }
        point
    }
}

/// A 2-D linear projection that is either unfit or fit.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Projector {
    #[default]
    Unfit,
    Fit(PcaModel),
}

impl Projector {
    /// Creates an unfit projector.
    #[must_use]
    pub fn new() -> Self {
        Self::Unfit
    }

    /// Fits the projection over `vectors`, replacing any previous fit.
    ///
    /// # Errors
    /// - [`ProjectionError::InsufficientData`] when `vectors` is empty
    /// - [`ProjectionError::DimensionMismatch`] when vector lengths differ
    pub fn fit(&mut self, vectors: &[Vec<f32>]) -> Result<(), ProjectionError> {
        let model = fit_pca(vectors)?;
        info!(
            "PCA fitted for 2D projection over {} vectors (explained variance {:.4}, {:.4})",
            vectors.len(),
            model.explained_variance[0],
            model.explained_variance[1]
        );
        *self = Self::Fit(model);
        Ok(())
    }

    /// Projects each vector to `(x, y)`, in input order.
    ///
    /// # Errors
    /// - [`ProjectionError::NotFit`] before [`fit`](Self::fit)
    /// - [`ProjectionError::DimensionMismatch`] for vectors of the wrong length
    pub fn transform(
        &self,
        vectors: &[Vec<f32>],
    ) -> Result<Vec<[f32; PROJECTION_COMPONENTS]>, ProjectionError> {
        let Self::Fit(model) = self else {
            return Err(ProjectionError::NotFit);
        };

        vectors
            .iter()
            .map(|vector| {
                if vector.len() != model.dimension() {
                    return Err(ProjectionError::DimensionMismatch {
                        expected: model.dimension(),
                        actual: vector.len(),
                    });
                }
                Ok(model.project(vector))
            })
            .collect()
    }

    #[must_use]
    pub fn is_fit(&self) -> bool {
        matches!(self, Self::Fit(_))
    }

    /// The fitted model, if any.
    #[must_use]
    pub fn model(&self) -> Option<&PcaModel> {
        match self {
            Self::Fit(model) => Some(model),
            Self::Unfit => None,
        }
    }
}

fn fit_pca(vectors: &[Vec<f32>]) -> Result<PcaModel, ProjectionError> {
    let first = vectors.first().ok_or(ProjectionError::InsufficientData)?;
    let dimension = first.len();
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(ProjectionError::DimensionMismatch {
            expected: dimension,
            actual: bad.len(),
        });
    }

    let n = vectors.len();
    let mut mean = vec![0.0f64; dimension];
    for vector in vectors {
        for (m, &x) in mean.iter_mut().zip(vector.iter()) {
            *m += f64::from(x);
        }
    }
    for m in &mut mean {
        *m /= n as f64;
    }

    let centered: Vec<Vec<f64>> = vectors
        .iter()
        .map(|v| {
            v.iter()
                .zip(mean.iter())
                .map(|(&x, &m)| f64::from(x) - m)
                .collect()
        })
        .collect();

    // Sample covariance; a single vector has zero variance either way
    let denominator = if n > 1 { (n - 1) as f64 } else { 1.0 };

    let mut rng = StdRng::seed_from_u64(PCA_SEED);
    let mut components: Vec<Vec<f64>> = Vec::with_capacity(PROJECTION_COMPONENTS);
    let mut explained_variance = [0.0f64; PROJECTION_COMPONENTS];

    for slot in explained_variance.iter_mut() {
        let start: Vec<f64> = (0..dimension).map(|_| rng.random_range(-1.0..1.0)).collect();
        let (component, variance) =
            leading_eigenvector(&centered, denominator, &components, start);
        *slot = variance;
        components.push(component);
    }

    let [first_component, second_component]: [Vec<f64>; PROJECTION_COMPONENTS] = components
        .try_into()
        .map_err(|_| ProjectionError::InsufficientData)?;

    Ok(PcaModel {
        mean,
        components: [first_component, second_component],
        explained_variance,
    })
}

/// Power iteration for the leading eigenvector of the covariance restricted
/// to the orthogonal complement of `previous`.
fn leading_eigenvector(
    centered: &[Vec<f64>],
    denominator: f64,
    previous: &[Vec<f64>],
    start: Vec<f64>,
) -> (Vec<f64>, f64) {
    let dimension = start.len();

    let mut current = start;
    orthogonalize(&mut current, previous);
    if !normalize(&mut current) {
        return (fallback_direction(dimension, previous), 0.0);
    }

    let mut iterations = 0;
    loop {
        iterations += 1;

        let mut next = covariance_times(centered, denominator, &current);
        orthogonalize(&mut next, previous);
        if !normalize(&mut next) {
            // No variance left in this subspace
            return (fallback_direction(dimension, previous), 0.0);
        }

        let agreement = dot(&current, &next).abs();
        current = next;

        if 1.0 - agreement < CONVERGENCE_TOLERANCE || iterations >= MAX_ITERATIONS {
            break;
        }
    }

    debug!("Power iteration finished after {iterations} iterations");

    fix_sign(&mut current);
    let variance = dot(&current, &covariance_times(centered, denominator, &current));
    (current, variance.max(0.0))
}

/// Computes `C v` with `C = Xᵀ X / denominator` without forming `C`.
fn covariance_times(centered: &[Vec<f64>], denominator: f64, v: &[f64]) -> Vec<f64> {
    let mut result = vec![0.0f64; v.len()];
    for row in centered {
        let weight = dot(row, v);
        if weight == 0.0 {
            continue;
        }
        for (r, &x) in result.iter_mut().zip(row.iter()) {
            *r += weight * x;
        }
    }
    for r in &mut result {
        *r /= denominator;
    }
    result
}

fn orthogonalize(v: &mut [f64], basis: &[Vec<f64>]) {
    for b in basis {
        let projection = dot(v, b);
        for (x, &y) in v.iter_mut().zip(b.iter()) {
            *x -= projection * y;
        }
    }
}

fn normalize(v: &mut [f64]) -> bool {
    let norm = dot(v, v).sqrt();
    if norm < EPSILON {
        return false;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
    true
}

/// First standard basis vector with a non-zero residual against `previous`.
/// Returns the zero vector when the space is exhausted (dimension 1).
fn fallback_direction(dimension: usize, previous: &[Vec<f64>]) -> Vec<f64> {
    for axis in 0..dimension {
        let mut candidate = vec![0.0f64; dimension];
        candidate[axis] = 1.0;
        orthogonalize(&mut candidate, previous);
        if normalize(&mut candidate) {
            fix_sign(&mut candidate);
            return candidate;
        }
    }
    vec![0.0f64; dimension]
}

fn fix_sign(v: &mut [f64]) {
    let pivot = v
        .iter()
        .copied()
        .fold(0.0f64, |best, x| if x.abs() > best.abs() { x } else { best });
    if pivot < 0.0 {
        for x in v.iter_mut() {
            *x = -*x;
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spread_vectors() -> Vec<Vec<f32>> {
        // Uncorrelated axes: variance 10 on axis 0, 1 on axis 1, none on axis 2
        vec![
            vec![-4.0, 1.0, 0.5],
            vec![-2.0, -1.0, 0.5],
            vec![0.0, 0.0, 0.5],
            vec![2.0, -1.0, 0.5],
            vec![4.0, 1.0, 0.5],
        ]
    }

    #[test]
    fn test_transform_before_fit() {
        let projector = Projector::new();
        assert!(!projector.is_fit());
        assert_eq!(
            projector.transform(&[vec![1.0, 2.0]]),
            Err(ProjectionError::NotFit)
        );
    }

    #[test]
    fn test_fit_requires_data() {
        let mut projector = Projector::new();
        assert_eq!(projector.fit(&[]), Err(ProjectionError::InsufficientData));
        assert!(!projector.is_fit());
    }

    #[test]
    fn test_fit_rejects_ragged_input() {
        let mut projector = Projector::new();
        let result = projector.fit(&[vec![1.0, 2.0], vec![1.0]]);
        assert_eq!(
            result,
            Err(ProjectionError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_components_follow_variance() {
        let mut projector = Projector::new();
        projector.fit(&spread_vectors()).unwrap();

        let model = projector.model().unwrap();
        let [first, second] = &model.components;

        assert!(first[0].abs() > 0.99, "first component should track axis 0");
        assert!(second[1].abs() > 0.99, "second component should track axis 1");
        assert!(dot(first, second).abs() < 1e-8);

        let variance = model.explained_variance();
        assert!(variance[0] >= variance[1]);
        assert!((variance[0] - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_transform_is_deterministic() {
        let vectors = spread_vectors();

        let mut a = Projector::new();
        a.fit(&vectors).unwrap();
        let mut b = Projector::new();
        b.fit(&vectors).unwrap();

        let first = a.transform(&vectors).unwrap();
        let second = b.transform(&vectors).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, a.transform(&vectors).unwrap());
    }

    #[test]
    fn test_transform_preserves_order_and_length() {
        let vectors = spread_vectors();
        let mut projector = Projector::new();
        projector.fit(&vectors).unwrap();

        let points = projector.transform(&vectors).unwrap();
        assert_eq!(points.len(), vectors.len());

        // Points along axis 0 come out monotonic along x
        for pair in points.windows(2) {
            assert!(pair[0][0] < pair[1][0]);
        }

        // Centered data projects around the origin
        let mean_x: f32 = points.iter().map(|p| p[0]).sum::<f32>() / points.len() as f32;
        assert!(mean_x.abs() < 1e-4);
    }

    #[test]
    fn test_transform_accepts_unseen_vectors() {
        let mut projector = Projector::new();
        projector.fit(&spread_vectors()).unwrap();

        let points = projector.transform(&[vec![10.0, 0.0, 0.0]]).unwrap();
        assert!(points[0][0] > 9.0);

        assert_eq!(
            projector.transform(&[vec![1.0]]),
            Err(ProjectionError::DimensionMismatch {
                expected: 3,
                actual: 1
            })
        );
    }

    #[test]
    fn test_single_vector_fit() {
        let mut projector = Projector::new();
        projector.fit(&[vec![0.3, 0.4, 0.5]]).unwrap();

        let points = projector.transform(&[vec![0.3, 0.4, 0.5]]).unwrap();
        assert_eq!(points, vec![[0.0, 0.0]]);

        // Fallback basis is still orthonormal
        let [first, second] = &projector.model().unwrap().components;
        assert!((dot(first, first) - 1.0).abs() < 1e-12);
        assert!(dot(first, second).abs() < 1e-12);
    }

    #[test]
    fn test_one_dimensional_input() {
        let mut projector = Projector::new();
        projector.fit(&[vec![1.0], vec![3.0]]).unwrap();

        let points = projector.transform(&[vec![1.0], vec![3.0]]).unwrap();
        assert!((points[0][0] + 1.0).abs() < 1e-6);
        assert!((points[1][0] - 1.0).abs() < 1e-6);
        assert_eq!(points[0][1], 0.0);
    }

    #[test]
    fn test_refit_replaces_state() {
        let mut projector = Projector::new();
        projector.fit(&spread_vectors()).unwrap();
        projector.fit(&[vec![1.0, 1.0], vec![-1.0, -1.0]]).unwrap();

        let model = projector.model().unwrap();
        assert_eq!(model.dimension(), 2);

        let mut fresh = Projector::new();
        fresh.fit(&[vec![1.0, 1.0], vec![-1.0, -1.0]]).unwrap();
        assert_eq!(&projector, &fresh);
    }
}
