//! Full pipeline: dataset on disk, index build, ranking, explanation and
//! projection, driven through the public API with a deterministic embedder.

use crate::common::{
    MarkerEmbedder, PROFILE_COUNT, PROFILE_THEMES, TestCorpus, marker, profile_name,
};
use muse::analysis::{
    AnalysisMode, BuildOptions, IndexSource, QUERY_LABEL, Theme, build_analyzer,
};
use muse::server::{AnalyzeRequest, AnalyzeResponse, RequestError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::sync::Arc;

/// Profile whose marker and only theme (`romantic`) the query carries.
const ROMANTIC_PROFILE: usize = 2;

/// Mentions a single theme keyword ("love") and the romantic profile's marker.
fn query_text() -> String {
    format!(
        "I keep coming back to the {} pages whenever I wonder about love and loss.",
        marker(ROMANTIC_PROFILE)
    )
}

#[test]
fn test_single_theme_query_ranks_theme_sharing_profile_first() {
    let corpus = TestCorpus::new();
    let outcome = build_analyzer(
        &corpus.settings,
        Arc::new(MarkerEmbedder::new()),
        BuildOptions::default(),
    )
    .unwrap();
    assert_eq!(outcome.source, IndexSource::Rebuilt);

    let analyzer = outcome.analyzer;
    assert_eq!(analyzer.index().len(), PROFILE_COUNT);
    assert!(analyzer.projector().is_fit());

    let mut rng = StdRng::seed_from_u64(7);
    let report = analyzer
        .analyze_with_rng(&query_text(), 3, AnalysisMode::Detailed, &mut rng)
        .unwrap();

    assert_eq!(report.summary.themes, vec![Theme::Romantic]);
    assert_eq!(PROFILE_THEMES[ROMANTIC_PROFILE], Theme::Romantic.as_str());

    let names: Vec<&str> = report.matches.iter().map(|m| m.name.as_str()).collect();
    // Remaining profiles tie, so they keep dataset order
    assert_eq!(names, vec!["Profile 2", "Profile 0", "Profile 1"]);

    let best = &report.matches[0];
    assert!(best.score > 0.99, "score was {}", best.score);
    assert!(best.score <= 1.0);
    assert_eq!(best.key_themes, vec!["romantic".to_string()]);
    assert_eq!(
        best.recommendation.get("book").map(String::as_str),
        Some("Collected glyph2")
    );
    assert_eq!(
        best.reason,
        "Your writing explores romantic themes similar to Profile 2."
    );

    // No shared theme and no style or inquiry cue: the tier fallback applies
    assert_eq!(
        report.matches[1].reason,
        "The semantic patterns in your text show possible alignment with Profile 0's characteristic expression."
    );

    for pair in report.matches.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    assert!(report.summary.features.word_count > 0);
    assert!((report.summary.embedding_norm - (1.0f32 + 0.0025).sqrt()).abs() < 1e-4);
}

#[test]
fn test_projection_places_query_last() {
    let corpus = TestCorpus::new();
    let analyzer = build_analyzer(
        &corpus.settings,
        Arc::new(MarkerEmbedder::new()),
        BuildOptions::default(),
    )
    .unwrap()
    .analyzer;

    let report = analyzer
        .analyze(&query_text(), 3, AnalysisMode::Quick)
        .unwrap();

    // Default sample cap exceeds the corpus, so every profile is shown
    assert_eq!(report.projection.len(), PROFILE_COUNT + 1);
    let last = report.projection.last().unwrap();
    assert_eq!(last.label, QUERY_LABEL);

    let labels: HashSet<&str> = report.projection[..PROFILE_COUNT]
        .iter()
        .map(|p| p.label.as_str())
        .collect();
    assert_eq!(labels.len(), PROFILE_COUNT);
    for i in 0..PROFILE_COUNT {
        assert!(labels.contains(profile_name(i).as_str()));
    }

    for point in &report.projection {
        assert!(point.x.is_finite() && point.y.is_finite());
    }
}

#[test]
fn test_projection_sample_is_capped() {
    let mut corpus = TestCorpus::new();
    corpus.settings.analysis.projection_sample = 4;

    let analyzer = build_analyzer(
        &corpus.settings,
        Arc::new(MarkerEmbedder::new()),
        BuildOptions::default(),
    )
    .unwrap()
    .analyzer;

    let mut rng = StdRng::seed_from_u64(42);
    let report = analyzer
        .analyze_with_rng(&query_text(), 3, AnalysisMode::Detailed, &mut rng)
        .unwrap();

    assert_eq!(report.projection.len(), 5);
    let distinct: HashSet<&str> = report.projection.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(distinct.len(), 5);
}

#[test]
fn test_min_score_filters_weak_matches() {
    let mut corpus = TestCorpus::new();
    corpus.settings.analysis.min_score = Some(0.5);

    let analyzer = build_analyzer(
        &corpus.settings,
        Arc::new(MarkerEmbedder::new()),
        BuildOptions::default(),
    )
    .unwrap()
    .analyzer;

    let report = analyzer
        .analyze(&query_text(), 5, AnalysisMode::Detailed)
        .unwrap();
    assert_eq!(report.matches.len(), 1);
    assert_eq!(report.matches[0].name, "Profile 2");
}

#[test]
fn test_request_validation_then_response() {
    let corpus = TestCorpus::new();
    let analyzer = build_analyzer(
        &corpus.settings,
        Arc::new(MarkerEmbedder::new()),
        BuildOptions::default(),
    )
    .unwrap()
    .analyzer;

    let short = AnalyzeRequest::new("too short").validate(&corpus.settings.analysis);
    assert!(matches!(short, Err(RequestError::TextTooShort { .. })));

    let request = AnalyzeRequest {
        text: query_text(),
        mode: "quick".to_string(),
        top_k: Some(2),
    }
    .validate(&corpus.settings.analysis)
    .unwrap();
    assert_eq!(request.mode, AnalysisMode::Quick);

    let report = analyzer
        .analyze(&request.text, request.top_k, request.mode)
        .unwrap();
    let response = AnalyzeResponse::from(report);
    assert_eq!(response.matches.len(), 2);

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["matches"][0]["name"], "Profile 2");
    assert!(json["user_embedding_summary"]["themes"].is_array());
    assert!(json["processing_time_ms"].as_f64().unwrap() >= 0.0);
}
