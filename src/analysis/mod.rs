//! Query analysis: lexical features, theme tagging, match explanation and
//! the analyzer context that ties them to the vector index.

pub mod analyzer;
pub mod explain;
pub mod features;
pub mod startup;
pub mod themes;

pub use analyzer::{
    AnalysisReport, Analyzer, AnalyzerHandle, ProjectionPoint, QUERY_LABEL, QuerySummary,
    project_for_display,
};
pub use explain::{
    AnalysisMode, ConfidenceTier, MAX_KEY_THEMES, Match, MatchExplainer, QueryProfile, thresholds,
};
pub use features::{QueryFeatures, extract_features};
pub use startup::{BuildOptions, BuildOutcome, IndexSource, build_analyzer, index_corpus};
pub use themes::{MAX_THEMES, Theme, detect_themes};
