//! The process-scoped analysis context and the per-request pipeline.
//!
//! An [`Analyzer`] is assembled once at startup from an embedder, a populated
//! [`VectorIndex`] and a projector fit over that index. Request handlers hold
//! it through an [`AnalyzerHandle`], which hot reload replaces wholesale.

use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::analysis::explain::{AnalysisMode, Match, MatchExplainer, QueryProfile};
use crate::analysis::features::QueryFeatures;
use crate::analysis::themes::Theme;
use crate::config::AnalysisSettings;
use crate::error::MuseResult;
use crate::vector::{
    EmbeddingGenerator, ProjectionError, Projector, VectorError, VectorIndex, l2_norm,
    normalize_vector,
};

/// Label of the query point in a display projection.
pub const QUERY_LABEL: &str = "You";

/// One plotted point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    pub x: f32,
    pub y: f32,
    pub label: String,
}

/// What the analyzer learned about the query itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySummary {
    pub features: QueryFeatures,
    pub themes: Vec<Theme>,
    /// L2 norm of the raw query embedding.
    pub embedding_norm: f32,
}

/// Result of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub matches: Vec<Match>,
    pub projection: Vec<ProjectionPoint>,
    pub summary: QuerySummary,
    pub processing_time_ms: f64,
}

/// Shared, read-only analysis state.
pub struct Analyzer {
    embedder: Arc<dyn EmbeddingGenerator>,
    index: VectorIndex,
    projector: Projector,
    settings: AnalysisSettings,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("model", &self.embedder.model_name())
            .field("index_size", &self.index.len())
            .field("projector_fit", &self.projector.is_fit())
            .finish()
    }
}

impl Analyzer {
    /// Assembles an analyzer and fits the projector over the index.
    ///
    /// A projector that cannot be fit (empty index) is left unfit and the
    /// display projection comes back empty.
    ///
    /// # Errors
    /// [`VectorError::DimensionMismatch`] if the embedder and the index
    /// disagree on dimension.
    pub fn new(
        embedder: Arc<dyn EmbeddingGenerator>,
        index: VectorIndex,
        settings: AnalysisSettings,
    ) -> Result<Self, VectorError> {
        if embedder.dimension() != index.dimension() {
            return Err(VectorError::DimensionMismatch {
                expected: index.dimension().get(),
                actual: embedder.dimension().get(),
            });
        }

        let mut projector = Projector::new();
        if let Err(e) = projector.fit(index.vectors()) {
            warn!("Projection disabled: {e}");
        }

        Ok(Self {
            embedder,
            index,
            projector,
            settings,
        })
    }

    /// Runs the full pipeline with an unseeded sampler for the projection.
    pub fn analyze(&self, text: &str, top_k: usize, mode: AnalysisMode) -> MuseResult<AnalysisReport> {
        self.analyze_with_rng(text, top_k, mode, &mut rand::rng())
    }

    /// Runs the full pipeline, drawing the projection sample from `rng`.
    ///
    /// Only the projection sample depends on `rng`; matches and scores are
    /// fully determined by the text.
    pub fn analyze_with_rng<R: Rng + ?Sized>(
        &self,
        text: &str,
        top_k: usize,
        mode: AnalysisMode,
        rng: &mut R,
    ) -> MuseResult<AnalysisReport> {
        let start = Instant::now();
        info!(
            "Analyzing text of length {} in {mode} mode",
            text.chars().count()
        );

        let embedding = self.embedder.embed(text)?;
        let profile = QueryProfile::from_text(text);

        let matches = MatchExplainer::new(&self.index)
            .with_min_score(self.settings.min_score)
            .rank_profile(&embedding, &profile, top_k, mode)?;

        let projection = match project_for_display(
            &self.projector,
            &self.index,
            &embedding,
            self.settings.projection_sample,
            rng,
        ) {
            Ok(points) => points,
            Err(e) => {
                debug!("Skipping projection: {e}");
                Vec::new()
            }
        };

        let summary = QuerySummary {
            features: profile.features,
            themes: profile.themes,
            embedding_norm: l2_norm(&embedding),
        };

        let processing_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            "Analysis complete. Found {} matches in {processing_time_ms:.2}ms",
            matches.len()
        );

        Ok(AnalysisReport {
            matches,
            projection,
            summary,
            processing_time_ms,
        })
    }

    #[must_use]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    #[must_use]
    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    #[must_use]
    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// The embedder, for building a replacement analyzer on reload.
    #[must_use]
    pub fn embedder(&self) -> Arc<dyn EmbeddingGenerator> {
        Arc::clone(&self.embedder)
    }
}

/// Places the query among a sample of the corpus in 2-D.
///
/// The whole corpus and the query are transformed in one batch. At most
/// `cap` corpus points are drawn uniformly without replacement, followed by
/// the query point labelled [`QUERY_LABEL`]. An empty index yields no points.
///
/// # Errors
/// [`ProjectionError::NotFit`] for an unfit projector, or a dimension
/// mismatch between the query and the fitted model.
pub fn project_for_display<R: Rng + ?Sized>(
    projector: &Projector,
    index: &VectorIndex,
    query: &[f32],
    cap: usize,
    rng: &mut R,
) -> Result<Vec<ProjectionPoint>, ProjectionError> {
    if index.is_empty() {
        return Ok(Vec::new());
    }

    // Corpus vectors are stored normalized, so the query is placed the same way
    let mut query = query.to_vec();
    normalize_vector(&mut query);

    let mut batch = Vec::with_capacity(index.len() + 1);
    batch.extend_from_slice(index.vectors());
    batch.push(query);

    let coordinates = projector.transform(&batch)?;
    let Some((query_point, corpus_points)) = coordinates.split_last() else {
        return Ok(Vec::new());
    };

    let records = index.records();
    let amount = cap.min(records.len());
    let mut points: Vec<ProjectionPoint> = rand::seq::index::sample(rng, records.len(), amount)
        .into_iter()
        .map(|i| ProjectionPoint {
            x: corpus_points[i][0],
            y: corpus_points[i][1],
            label: records[i].name.clone(),
        })
        .collect();

    points.push(ProjectionPoint {
        x: query_point[0],
        y: query_point[1],
        label: QUERY_LABEL.to_string(),
    });

    Ok(points)
}

/// Shared handle to the current analyzer.
///
/// Readers take a cheap `Arc` clone and keep using it for the whole request;
/// [`swap`](Self::swap) installs a replacement without disturbing them.
#[derive(Clone)]
pub struct AnalyzerHandle {
    inner: Arc<RwLock<Arc<Analyzer>>>,
}

impl AnalyzerHandle {
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(analyzer))),
        }
    }

    /// The analyzer in service right now.
    #[must_use]
    pub fn current(&self) -> Arc<Analyzer> {
        Arc::clone(&self.inner.read())
    }

    /// Replaces the analyzer, returning the previous one.
    pub fn swap(&self, analyzer: Analyzer) -> Arc<Analyzer> {
        let replacement = Arc::new(analyzer);
        let previous = std::mem::replace(&mut *self.inner.write(), replacement);
        info!(
            "Analyzer swapped: {} -> {} indexed profiles",
            previous.index().len(),
            self.current().index().len()
        );
        previous
    }
}
