//! Building the analyzer at startup and on reload.
//!
//! A saved index is reused when it loads cleanly and matches the embedder's
//! dimension. Anything else falls back to re-embedding the dataset.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::analysis::analyzer::Analyzer;
use crate::config::Settings;
use crate::corpus::{CorpusEntry, load_dataset, prepare_for_indexing};
use crate::display::create_progress_bar;
use crate::error::MuseResult;
use crate::vector::{EmbeddingGenerator, IndexStorage, VectorError, VectorIndex};

/// Texts embedded per call while building the index.
const EMBED_CHUNK_SIZE: usize = 32;

/// Where the index of a freshly built analyzer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    /// Loaded from the saved artifact pair
    Loaded,
    /// Embedded from the dataset
    Rebuilt,
}

/// Options for [`build_analyzer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Ignore any saved index and re-embed the dataset
    pub force_rebuild: bool,
    /// Draw a progress bar while embedding
    pub show_progress: bool,
}

#[derive(Debug)]
pub struct BuildOutcome {
    pub analyzer: Analyzer,
    pub source: IndexSource,
    pub elapsed: Duration,
}

/// Loads or rebuilds the index, then assembles the analyzer.
pub fn build_analyzer(
    settings: &Settings,
    embedder: Arc<dyn EmbeddingGenerator>,
    options: BuildOptions,
) -> MuseResult<BuildOutcome> {
    let start = Instant::now();
    let storage = IndexStorage::new(&settings.index_path);

    let loaded = if options.force_rebuild {
        info!("Forced rebuild requested, ignoring saved index");
        None
    } else {
        load_saved(&storage, embedder.as_ref())?
    };

    let (index, source) = match loaded {
        Some(index) => (index, IndexSource::Loaded),
        None => {
            let entries = load_dataset(&settings.dataset_path)?;
            let index = index_corpus(entries, embedder.as_ref(), options.show_progress)?;
            if settings.analysis.persist_index {
                storage.save(&index)?;
            }
            (index, IndexSource::Rebuilt)
        }
    };

    let analyzer = Analyzer::new(embedder, index, settings.analysis.clone())?;
    let elapsed = start.elapsed();
    info!(
        "Analyzer ready with {} profiles ({source:?}) in {elapsed:?}",
        analyzer.index().len()
    );

    Ok(BuildOutcome {
        analyzer,
        source,
        elapsed,
    })
}

/// Tries the saved index. Missing, corrupt, outdated or foreign-dimension
/// artifacts all mean "rebuild"; I/O failures are surfaced.
fn load_saved(
    storage: &IndexStorage,
    embedder: &dyn EmbeddingGenerator,
) -> Result<Option<VectorIndex>, VectorError> {
    match storage.load() {
        Ok(index) if index.dimension() == embedder.dimension() => Ok(Some(index)),
        Ok(index) => {
            warn!(
                "Saved index has dimension {} but model {} produces {}, rebuilding",
                index.dimension(),
                embedder.model_name(),
                embedder.dimension()
            );
            Ok(None)
        }
        Err(VectorError::NotFound { path }) => {
            info!("No saved index at {}, building from dataset", path.display());
            Ok(None)
        }
        Err(e @ (VectorError::CorruptState { .. } | VectorError::VersionMismatch { .. })) => {
            warn!("Saved index unusable, rebuilding: {e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Embeds every entry and populates a fresh index, in dataset order.
pub fn index_corpus(
    entries: Vec<CorpusEntry>,
    embedder: &dyn EmbeddingGenerator,
    show_progress: bool,
) -> Result<VectorIndex, VectorError> {
    let (texts, records) = prepare_for_indexing(entries);
    info!("Encoding {} texts with {}", texts.len(), embedder.model_name());

    let progress =
        show_progress.then(|| create_progress_bar(texts.len() as u64, "Embedding profiles"));

    let mut vectors = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(EMBED_CHUNK_SIZE) {
        let refs: Vec<&str> = chunk.iter().map(String::as_str).collect();
        vectors.extend(embedder.embed_batch(&refs)?);
        if let Some(bar) = &progress {
            bar.inc(chunk.len() as u64);
        }
    }

    if let Some(bar) = progress {
        bar.finish_with_message("Embedded");
    }

    let mut index = VectorIndex::new(embedder.dimension());
    index.add(vectors, records)?;
    Ok(index)
}
