//! Embedding generation for query texts and corpus blobs.
//!
//! The rest of the crate only sees the [`EmbeddingGenerator`] trait, so the
//! index and analyzer can be exercised with deterministic generators in
//! tests. [`FastEmbedGenerator`] is the production implementation backed by
//! fastembed.

use crate::vector::{VectorDimension, VectorError};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use regex::Regex;
use std::path::Path;
use std::sync::{LazyLock, Mutex};
use tracing::info;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

static DISALLOWED_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.,!?;:'-]").expect("static regex"));

/// Trait for generating embeddings from text.
///
/// Implementations must be thread-safe; the analyzer shares one generator
/// across request handlers.
pub trait EmbeddingGenerator: Send + Sync {
    /// Generate embeddings for multiple texts, one per input, in order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError>;

    /// Get the dimension of embeddings produced by this generator.
    #[must_use]
    fn dimension(&self) -> VectorDimension;

    /// Human-readable model identifier.
    fn model_name(&self) -> &str;

    /// Generate the embedding for a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, VectorError> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| VectorError::EmbeddingFailed("Model returned no embedding".to_string()))
    }
}

/// FastEmbed implementation of [`EmbeddingGenerator`].
///
/// Inputs are cleaned with [`preprocess_text`] before embedding.
pub struct FastEmbedGenerator {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimension: VectorDimension,
    batch_size: Option<usize>,
}

impl std::fmt::Debug for FastEmbedGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedGenerator")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("model", &"<TextEmbedding>")
            .finish()
    }
}

impl FastEmbedGenerator {
    /// Loads (downloading on first use) the named model into `cache_dir`.
    ///
    /// # Errors
    /// Returns an error if the model name is unknown or the model fails to
    /// initialize or download.
    pub fn new(
        model_name: &str,
        cache_dir: impl AsRef<Path>,
        show_download_progress: bool,
        batch_size: Option<usize>,
    ) -> Result<Self, VectorError> {
        let model = parse_embedding_model(model_name)?;
        info!("Loading embedding model: {model_name}");

        let mut text_model = TextEmbedding::try_new(
            InitOptions::new(model)
                .with_cache_dir(cache_dir.as_ref().to_path_buf())
                .with_show_download_progress(show_download_progress),
        )
        .map_err(|e| VectorError::EmbeddingFailed(
            format!("Failed to initialize embedding model: {e}. Ensure you have internet connection for first-time model download")
        ))?;

        // Probe the output width instead of trusting a lookup table
        let probe = text_model
            .embed(vec!["dimension probe"], None)
            .map_err(|e| VectorError::EmbeddingFailed(e.to_string()))?;
        let width = probe.first().map(Vec::len).unwrap_or(0);
        let dimension = VectorDimension::new(width)?;

        info!("Model loaded successfully. Embedding dimension: {dimension}");

        Ok(Self {
            model: Mutex::new(text_model),
            model_name: model_name.to_string(),
            dimension,
            batch_size,
        })
    }
}

impl EmbeddingGenerator for FastEmbedGenerator {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let processed: Vec<String> = texts.iter().map(|t| preprocess_text(t)).collect();

        let embeddings = self
            .model
            .lock()
            .map_err(|_| {
                VectorError::EmbeddingFailed(
                    "Failed to acquire embedding model lock - model may be poisoned".to_string(),
                )
            })?
            .embed(processed, self.batch_size)
            .map_err(|e| {
                VectorError::EmbeddingFailed(format!("Failed to generate embeddings: {e}"))
            })?;

        for embedding in &embeddings {
            self.dimension.validate_vector(embedding)?;
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Cleans raw text before embedding.
///
/// Collapses whitespace runs and strips everything except word characters,
/// whitespace and basic punctuation. Curly quotes count as symbols and are
/// dropped, only straight apostrophes survive.
#[must_use]
pub fn preprocess_text(text: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(text, " ");
    DISALLOWED_CHARS
        .replace_all(&collapsed, "")
        .trim()
        .to_string()
}

/// Maps a configured model name onto a fastembed model.
pub fn parse_embedding_model(name: &str) -> Result<EmbeddingModel, VectorError> {
    match name {
        "AllMiniLML6V2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "ParaphraseMLMiniLML12V2" => Ok(EmbeddingModel::ParaphraseMLMiniLML12V2),
        "ParaphraseMLMpnetBaseV2" => Ok(EmbeddingModel::ParaphraseMLMpnetBaseV2),
        "MultilingualE5Small" => Ok(EmbeddingModel::MultilingualE5Small),
        "BGESmallENV15" => Ok(EmbeddingModel::BGESmallENV15),
        other => Err(VectorError::EmbeddingFailed(format!(
            "Unknown embedding model '{other}'. Supported: AllMiniLML6V2, ParaphraseMLMiniLML12V2, ParaphraseMLMpnetBaseV2, MultilingualE5Small, BGESmallENV15"
        ))),
    }
}

/// Mock embedding generator for testing.
///
/// Produces deterministic, unit-length embeddings from the theme keywords a
/// text mentions, so texts sharing a theme land close together.
#[cfg(test)]
pub struct MockEmbeddingGenerator {
    dimension: VectorDimension,
}

#[cfg(test)]
impl Default for MockEmbeddingGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl MockEmbeddingGenerator {
    /// Create a mock generator with 16 dimensions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dimension: VectorDimension::new(16).unwrap(),
        }
    }
}

#[cfg(test)]
impl EmbeddingGenerator for MockEmbeddingGenerator {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
        use crate::analysis::Theme;

        let dim = self.dimension.get();
        let embeddings = texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let mut embedding = vec![0.05; dim];
                for (i, theme) in Theme::ALL.iter().enumerate() {
                    if theme.keywords().iter().any(|k| lower.contains(k)) {
                        embedding[i % dim] += 1.0;
                    }
                }
                crate::vector::normalize_vector(&mut embedding);
                embedding
            })
            .collect();
        Ok(embeddings)
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_text() {
        let processed = preprocess_text("This   is  a    test   with   extra     spaces!");
        assert!(!processed.contains("  "));
        assert_eq!(processed, processed.trim());
        assert_eq!(processed, "This is a test with extra spaces!");
    }

    #[test]
    fn test_preprocess_strips_symbols_and_quotes() {
        assert_eq!(preprocess_text("  \tlove & <death>\n "), "love  death");
        assert_eq!(preprocess_text("it's l'amour; oui? - non."), "it's l'amour; oui? - non.");
        // Curly quotes are stripped with the other symbols
        assert_eq!(preprocess_text("it\u{2019}s"), "its");
        assert_eq!(preprocess_text("\u{201C}hello\u{201D} \u{2018}world\u{2019}"), "hello world");
        // Accented letters count as word characters
        assert_eq!(preprocess_text("être et néant"), "être et néant");
    }

    #[test]
    fn test_parse_embedding_model() {
        assert!(matches!(
            parse_embedding_model("ParaphraseMLMpnetBaseV2"),
            Ok(EmbeddingModel::ParaphraseMLMpnetBaseV2)
        ));
        assert!(parse_embedding_model("NoSuchModel").is_err());
    }

    #[test]
    fn test_mock_embedding_generator() {
        let generator = MockEmbeddingGenerator::new();

        let embeddings = generator
            .embed_batch(&["love and passion", "reason and logic", "love"])
            .unwrap();
        assert_eq!(embeddings.len(), 3);
        for embedding in &embeddings {
            assert_eq!(embedding.len(), 16);
            let magnitude = crate::vector::l2_norm(embedding);
            assert!((magnitude - 1.0).abs() < 1e-5);
        }

        // Same theme, same direction
        assert_eq!(embeddings[0], embeddings[2]);
        assert_ne!(embeddings[0], embeddings[1]);

        let single = generator.embed("love").unwrap();
        assert_eq!(single, embeddings[2]);
    }
}
