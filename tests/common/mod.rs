use muse::vector::{EmbeddingGenerator, VectorDimension, VectorError};
use muse::Settings;
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

/// Number of synthetic profiles in the test corpus.
pub const PROFILE_COUNT: usize = 10;

/// Theme tag attached to each synthetic profile, by position.
pub const PROFILE_THEMES: [&str; PROFILE_COUNT] = [
    "existential",
    "political",
    "romantic",
    "rational",
    "spiritual",
    "nature",
    "human_condition",
    "artistic",
    "social",
    "language",
];

/// Marker word that ties a text to profile `i`.
pub fn marker(i: usize) -> String {
    format!("glyph{i}")
}

pub fn profile_name(i: usize) -> String {
    format!("Profile {i}")
}

/// Embeds texts as one-hot vectors over the profile markers they contain.
///
/// The last dimension carries a small constant so no text embeds to zero.
pub struct MarkerEmbedder {
    dimension: VectorDimension,
}

impl MarkerEmbedder {
    pub fn new() -> Self {
        Self::with_dimension(PROFILE_COUNT + 1)
    }

    /// Wider embedders pad with zeros, which changes the index dimension.
    pub fn with_dimension(dim: usize) -> Self {
        assert!(dim > PROFILE_COUNT);
        Self {
            dimension: VectorDimension::new(dim).unwrap(),
        }
    }
}

impl EmbeddingGenerator for MarkerEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
        let dim = self.dimension.get();
        Ok(texts
            .iter()
            .map(|text| {
                let mut embedding = vec![0.0; dim];
                for (i, slot) in embedding.iter_mut().take(PROFILE_COUNT).enumerate() {
                    if text.contains(&marker(i)) {
                        *slot = 1.0;
                    }
                }
                embedding[PROFILE_COUNT] = 0.05;
                embedding
            })
            .collect())
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "marker"
    }
}

/// Writes the synthetic dataset into a temp dir and points settings at it.
pub struct TestCorpus {
    pub dir: TempDir,
    pub settings: Settings,
}

impl TestCorpus {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");

        let entries: Vec<_> = (0..PROFILE_COUNT)
            .map(|i| {
                json!({
                    "name": profile_name(i),
                    "category": if i % 2 == 0 { "writer" } else { "philosopher" },
                    "period": format!("{} century", 14 + i),
                    "themes": [PROFILE_THEMES[i]],
                    "writing_style": "plain",
                    "recommendation": {"book": format!("Collected {}", marker(i)), "year": "1900"},
                    "texts": [format!("The {} essays.", marker(i)), "Notes and letters."]
                })
            })
            .collect();

        let dataset = dir.path().join("dataset.json");
        std::fs::write(&dataset, serde_json::to_string_pretty(&entries).unwrap())
            .expect("Failed to write dataset");

        let mut settings = Settings::default();
        settings.dataset_path = dataset;
        settings.index_path = dir.path().join("index");

        Self { dir, settings }
    }

    pub fn index_path(&self) -> PathBuf {
        self.settings.index_path.clone()
    }
}
