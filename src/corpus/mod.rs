//! Reference corpus: profile records and the dataset loader.
//!
//! The dataset is a JSON array of profile entries. Each entry carries the
//! metadata that ends up in a [`CorpusRecord`] plus one or more raw texts that
//! are concatenated into the blob handed to the embedding generator.

use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Fields every dataset entry must carry.
const REQUIRED_FIELDS: [&str; 4] = ["name", "category", "period", "texts"];

/// Recommendation key/value pairs in dataset order.
pub type Recommendation = IndexMap<String, String>;

/// One reference profile as stored alongside its vector in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    /// Unique identifier, also the display name.
    pub name: String,
    /// Category tag, e.g. `philosopher`, `writer`, `artist`.
    pub category: String,
    /// Period label, e.g. `20th century`.
    pub period: String,
    /// Theme tags in dataset order. May be empty.
    #[serde(default)]
    pub themes: Vec<String>,
    /// Free-form style descriptor.
    #[serde(default)]
    pub writing_style: String,
    /// Recommendation key/value pairs (book, type, year, ...).
    #[serde(default)]
    pub recommendation: Recommendation,
}

impl CorpusRecord {
    /// Creates a record with empty themes, style and recommendation.
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        period: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            period: period.into(),
            themes: Vec::new(),
            writing_style: String::new(),
            recommendation: Recommendation::new(),
        }
    }

    pub fn with_themes<I, S>(mut self, themes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.themes = themes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_writing_style(mut self, style: impl Into<String>) -> Self {
        self.writing_style = style.into();
        self
    }

    pub fn with_recommendation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.recommendation.insert(key.into(), value.into());
        self
    }
}

/// A raw dataset entry: record metadata plus the texts to embed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusEntry {
    #[serde(flatten)]
    pub record: CorpusRecord,
    pub texts: Vec<String>,
}

/// Errors raised while loading or validating the corpus dataset.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error(
        "Dataset not found: {}\nSuggestion: Set 'dataset_path' in .muse/settings.toml or MUSE_DATASET_PATH",
        path.display()
    )]
    NotFound { path: PathBuf },

    #[error("Failed to read dataset '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse dataset: {0}\nSuggestion: The dataset must be a JSON array of profile objects")]
    Parse(String),

    #[error("Record {index} missing required field: {field}")]
    MissingField { index: usize, field: &'static str },

    #[error("Record {index} has invalid 'texts' field\nSuggestion: 'texts' must be a non-empty list of strings")]
    InvalidTexts { index: usize },

    #[error("Duplicate profile name '{name}' at record {index}\nSuggestion: Profile names must be unique")]
    DuplicateName { index: usize, name: String },
}

/// Loads and validates the dataset at `path`.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Vec<CorpusEntry>, CorpusError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CorpusError::NotFound {
            path: path.to_path_buf(),
        });
    }

    info!("Loading dataset from {}", path.display());
    let json = std::fs::read_to_string(path).map_err(|source| CorpusError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let entries = parse_dataset(&json)?;
    info!("Loaded {} profiles", entries.len());
    Ok(entries)
}

/// Parses a dataset from its JSON text, checking required fields first so
/// that errors name the offending record instead of a serde position.
pub fn parse_dataset(json: &str) -> Result<Vec<CorpusEntry>, CorpusError> {
    let raw: Vec<serde_json::Value> =
        serde_json::from_str(json).map_err(|e| CorpusError::Parse(e.to_string()))?;

    for (index, value) in raw.iter().enumerate() {
        for field in REQUIRED_FIELDS {
            if value.get(field).is_none() {
                return Err(CorpusError::MissingField { index, field });
            }
        }
        match value.get("texts").and_then(|t| t.as_array()) {
            Some(texts) if !texts.is_empty() => {}
            _ => return Err(CorpusError::InvalidTexts { index }),
        }
    }

    let entries = raw
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<CorpusEntry>, _>>()
        .map_err(|e| CorpusError::Parse(e.to_string()))?;

    validate_dataset(&entries)?;
    Ok(entries)
}

/// Validates entries built in memory (non-empty texts, unique names).
pub fn validate_dataset(entries: &[CorpusEntry]) -> Result<(), CorpusError> {
    let mut seen = HashSet::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        if entry.texts.is_empty() {
            return Err(CorpusError::InvalidTexts { index });
        }
        if !seen.insert(entry.record.name.as_str()) {
            return Err(CorpusError::DuplicateName {
                index,
                name: entry.record.name.clone(),
            });
        }
    }

    info!("Dataset validation successful: {} records", entries.len());
    Ok(())
}

/// Splits entries into embedding texts and records, preserving order.
///
/// Each entry's texts are joined with a single space into one blob.
pub fn prepare_for_indexing(entries: Vec<CorpusEntry>) -> (Vec<String>, Vec<CorpusRecord>) {
    let mut texts = Vec::with_capacity(entries.len());
    let mut records = Vec::with_capacity(entries.len());

    for entry in entries {
        texts.push(entry.texts.join(" "));
        records.push(entry.record);
    }

    info!("Prepared {} texts for indexing", texts.len());
    (texts, records)
}
