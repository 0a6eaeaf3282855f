//! Saved index artifacts: reuse, round trip and rebuild on mismatch.

use crate::common::{MarkerEmbedder, PROFILE_COUNT, TestCorpus, marker};
use muse::analysis::{AnalysisMode, BuildOptions, IndexSource, build_analyzer};
use muse::vector::{EmbeddingGenerator, IndexStorage, VectorError};
use std::sync::Arc;

#[test]
fn test_second_build_reuses_saved_index() {
    let corpus = TestCorpus::new();
    let embedder: Arc<dyn EmbeddingGenerator> = Arc::new(MarkerEmbedder::new());

    let first = build_analyzer(&corpus.settings, Arc::clone(&embedder), BuildOptions::default())
        .unwrap();
    assert_eq!(first.source, IndexSource::Rebuilt);
    assert!(IndexStorage::new(corpus.index_path()).exists());

    let second = build_analyzer(&corpus.settings, embedder, BuildOptions::default()).unwrap();
    assert_eq!(second.source, IndexSource::Loaded);

    let query = format!("Reading the {} letters again tonight, slowly and carefully.", marker(3));
    let before = first
        .analyzer
        .analyze(&query, 4, AnalysisMode::Quick)
        .unwrap();
    let after = second
        .analyzer
        .analyze(&query, 4, AnalysisMode::Quick)
        .unwrap();

    assert_eq!(before.matches, after.matches);
    assert_eq!(after.matches[0].name, "Profile 3");
}

#[test]
fn test_storage_round_trip_preserves_search() {
    let corpus = TestCorpus::new();
    let analyzer = build_analyzer(
        &corpus.settings,
        Arc::new(MarkerEmbedder::new()),
        BuildOptions::default(),
    )
    .unwrap()
    .analyzer;

    let storage = IndexStorage::new(corpus.dir.path().join("copy"));
    storage.save(analyzer.index()).unwrap();
    let loaded = storage.load().unwrap();

    assert_eq!(loaded.len(), PROFILE_COUNT);
    assert_eq!(loaded.dimension(), analyzer.index().dimension());
    assert_eq!(loaded.records(), analyzer.index().records());
    assert_eq!(loaded.vectors(), analyzer.index().vectors());

    let query = MarkerEmbedder::new().embed(&marker(5)).unwrap();
    let original: Vec<(f32, String)> = analyzer
        .index()
        .search(&query, 3)
        .unwrap()
        .into_iter()
        .map(|(score, record)| (score, record.name.clone()))
        .collect();
    let reloaded: Vec<(f32, String)> = loaded
        .search(&query, 3)
        .unwrap()
        .into_iter()
        .map(|(score, record)| (score, record.name.clone()))
        .collect();
    assert_eq!(original, reloaded);
}

#[test]
fn test_dimension_change_forces_rebuild() {
    let corpus = TestCorpus::new();
    build_analyzer(
        &corpus.settings,
        Arc::new(MarkerEmbedder::new()),
        BuildOptions::default(),
    )
    .unwrap();

    let wider = build_analyzer(
        &corpus.settings,
        Arc::new(MarkerEmbedder::with_dimension(PROFILE_COUNT + 5)),
        BuildOptions::default(),
    )
    .unwrap();
    assert_eq!(wider.source, IndexSource::Rebuilt);
    assert_eq!(wider.analyzer.index().dimension().get(), PROFILE_COUNT + 5);
}

#[test]
fn test_corrupt_artifact_forces_rebuild() {
    let corpus = TestCorpus::new();
    build_analyzer(
        &corpus.settings,
        Arc::new(MarkerEmbedder::new()),
        BuildOptions::default(),
    )
    .unwrap();

    let storage = IndexStorage::new(corpus.index_path());
    std::fs::write(storage.records_path(), "not json").unwrap();
    assert!(matches!(
        storage.load(),
        Err(VectorError::CorruptState { .. })
    ));

    let rebuilt = build_analyzer(
        &corpus.settings,
        Arc::new(MarkerEmbedder::new()),
        BuildOptions::default(),
    )
    .unwrap();
    assert_eq!(rebuilt.source, IndexSource::Rebuilt);
    assert_eq!(rebuilt.analyzer.index().len(), PROFILE_COUNT);
}

#[test]
fn test_missing_dataset_is_an_error() {
    let mut corpus = TestCorpus::new();
    corpus.settings.dataset_path = corpus.dir.path().join("absent.json");

    let result = build_analyzer(
        &corpus.settings,
        Arc::new(MarkerEmbedder::new()),
        BuildOptions::default(),
    );
    let err = result.unwrap_err();
    assert_eq!(err.status_code(), "DATASET_NOT_FOUND");
}
