//! Error types for the muse analyzer
//!
//! Each subsystem owns a thiserror enum ([`VectorError`], [`ProjectionError`],
//! [`CorpusError`], [`RequestError`]); [`MuseError`] wraps them at the crate
//! boundary and adds stable status codes for JSON output.

use crate::corpus::CorpusError;
use crate::server::RequestError;
use crate::vector::{ProjectionError, VectorError};
use thiserror::Error;

/// Crate-level error type
#[derive(Error, Debug)]
pub enum MuseError {
    #[error(transparent)]
    Vector(#[from] VectorError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    Request(#[from] RequestError),

    /// Configuration errors
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl MuseError {
    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> String {
        match self {
            Self::Vector(e) => match e {
                VectorError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
                VectorError::CountMismatch { .. } => "COUNT_MISMATCH",
                VectorError::InvalidDimension { .. } => "INVALID_DIMENSION",
                VectorError::NotFound { .. } => "INDEX_NOT_FOUND",
                VectorError::CorruptState { .. } => "INDEX_CORRUPTED",
                VectorError::Storage(_) => "STORAGE_ERROR",
                VectorError::Serialization(_) => "SERIALIZATION_ERROR",
                VectorError::EmbeddingFailed(_) => "EMBEDDING_FAILED",
                VectorError::VersionMismatch { .. } => "VERSION_MISMATCH",
            },
            Self::Projection(e) => match e {
                ProjectionError::InsufficientData => "INSUFFICIENT_DATA",
                ProjectionError::NotFit => "PROJECTOR_NOT_FIT",
                ProjectionError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            },
            Self::Corpus(e) => match e {
                CorpusError::NotFound { .. } => "DATASET_NOT_FOUND",
                CorpusError::Read { .. } => "FILE_READ_ERROR",
                CorpusError::Parse(_) => "DATASET_PARSE_ERROR",
                CorpusError::MissingField { .. }
                | CorpusError::InvalidTexts { .. }
                | CorpusError::DuplicateName { .. } => "DATASET_INVALID",
            },
            Self::Request(_) => "INVALID_REQUEST",
            Self::Config { .. } => "CONFIG_ERROR",
        }
        .to_string()
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Vector(VectorError::NotFound { .. }) => vec![
                "Run 'muse index' to build the index from the dataset",
                "Check 'index_path' in .muse/settings.toml",
            ],
            Self::Vector(VectorError::CorruptState { .. } | VectorError::VersionMismatch { .. }) => {
                vec![
                    "Run 'muse index --force' to rebuild from scratch",
                    "Check for disk errors or filesystem corruption",
                ]
            }
            Self::Vector(VectorError::DimensionMismatch { .. }) => vec![
                "The saved index was built with a different embedding model",
                "Run 'muse index --force' after changing 'embedding.model'",
            ],
            Self::Vector(VectorError::EmbeddingFailed(_)) => vec![
                "Check your internet connection for the first model download",
                "Verify 'embedding.model' names a supported model",
            ],
            Self::Corpus(CorpusError::NotFound { .. }) => vec![
                "Set 'dataset_path' in .muse/settings.toml or MUSE_DATASET_PATH",
            ],
            Self::Corpus(_) => vec![
                "The dataset must be a JSON array of profile objects",
                "Each profile needs name, category, period and a non-empty texts list",
            ],
            Self::Config { .. } => vec!["Run 'muse init --force' to regenerate the configuration"],
            _ => vec![],
        }
    }
}

/// Result type alias for crate-level operations
pub type MuseResult<T> = Result<T, MuseError>;
