//! Semantic profile matching.
//!
//! Free-form text is embedded, ranked against a fixed corpus of reference
//! profiles by cosine similarity, explained in plain language and placed on
//! a 2-D map next to a sample of the corpus.

pub mod analysis;
pub mod config;
pub mod corpus;
pub mod display;
pub mod error;
pub mod logging;
pub mod server;
pub mod vector;

// Explicit exports for better API clarity
pub use analysis::{
    AnalysisMode, AnalysisReport, Analyzer, AnalyzerHandle, Match, MatchExplainer,
    ProjectionPoint, QueryFeatures, QuerySummary, Theme, build_analyzer, detect_themes,
    extract_features,
};
pub use config::Settings;
pub use corpus::{CorpusEntry, CorpusError, CorpusRecord, Recommendation};
pub use error::{MuseError, MuseResult};
pub use vector::{
    EmbeddingGenerator, FastEmbedGenerator, IndexStorage, ProjectionError, Projector,
    VectorDimension, VectorError, VectorIndex,
};
