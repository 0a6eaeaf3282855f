//! Request validation and response bodies shared by the HTTP server and the
//! `analyze` command.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::{AnalysisMode, AnalysisReport, Match, ProjectionPoint, QuerySummary};
use crate::config::AnalysisSettings;

/// Rejections raised before a request reaches the analyzer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Text must be at least {min} characters (got {actual})")]
    TextTooShort { min: usize, actual: usize },

    #[error("Text must be at most {max} characters (got {actual})")]
    TextTooLong { max: usize, actual: usize },

    #[error("Mode must be 'detailed' or 'quick' (got '{0}')")]
    InvalidMode(String),

    #[error("top_k must be between 1 and {max} (got {value})")]
    TopKOutOfRange { value: usize, max: usize },
}

/// Raw analysis request as received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Falls back to `analysis.default_top_k` when absent
    #[serde(default)]
    pub top_k: Option<usize>,
}

fn default_mode() -> String {
    AnalysisMode::Detailed.as_str().to_string()
}

/// A request that passed every check, ready for the analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    /// Trimmed text
    pub text: String,
    pub mode: AnalysisMode,
    pub top_k: usize,
}

impl AnalyzeRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: default_mode(),
            top_k: None,
        }
    }

    /// Checks length, mode and `top_k` against `limits`.
    ///
    /// The upper length bound applies to the raw text, the lower bound to the
    /// trimmed text.
    pub fn validate(self, limits: &AnalysisSettings) -> Result<ValidatedRequest, RequestError> {
        let raw_len = self.text.chars().count();
        if raw_len > limits.max_text_chars {
            return Err(RequestError::TextTooLong {
                max: limits.max_text_chars,
                actual: raw_len,
            });
        }

        let text = self.text.trim();
        let trimmed_len = text.chars().count();
        if trimmed_len < limits.min_text_chars {
            return Err(RequestError::TextTooShort {
                min: limits.min_text_chars,
                actual: trimmed_len,
            });
        }

        let mode = self
            .mode
            .parse::<AnalysisMode>()
            .map_err(|_| RequestError::InvalidMode(self.mode.clone()))?;

        let top_k = self.top_k.unwrap_or(limits.default_top_k);
        if top_k == 0 || top_k > limits.max_top_k {
            return Err(RequestError::TopKOutOfRange {
                value: top_k,
                max: limits.max_top_k,
            });
        }

        Ok(ValidatedRequest {
            text: text.to_string(),
            mode,
            top_k,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub matches: Vec<Match>,
    pub projection: Vec<ProjectionPoint>,
    pub user_embedding_summary: QuerySummary,
    pub processing_time_ms: f64,
}

impl From<AnalysisReport> for AnalyzeResponse {
    fn from(report: AnalysisReport) -> Self {
        Self {
            matches: report.matches,
            projection: report.projection,
            user_embedding_summary: report.summary,
            processing_time_ms: report.processing_time_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub index_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
}

/// Error body, `{"detail": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
