//! Turning similarity scores into ranked, explained matches.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::analysis::features::{QueryFeatures, extract_features};
use crate::analysis::themes::{Theme, detect_themes};
use crate::corpus::{CorpusRecord, Recommendation};
use crate::vector::{VectorError, VectorIndex};

/// Score boundaries between confidence tiers.
pub mod thresholds {
    /// Scores above this are a strong match
    pub const STRONG: f32 = 0.75;

    /// Scores above this (up to [`STRONG`]) are a moderate match
    pub const MODERATE: f32 = 0.60;
}

/// Sentences longer than this many words on average count as complex.
const COMPLEX_SENTENCE_WORDS: f32 = 20.0;

/// Question marks per sentence above which a text counts as inquiring.
const INQUIRING_QUESTION_DENSITY: f32 = 0.2;

/// Maximum number of a record's own themes copied onto a [`Match`].
pub const MAX_KEY_THEMES: usize = 3;

/// How confident an explanation sounds, derived from the raw score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceTier {
    Strong,
    Moderate,
    Possible,
}

impl ConfidenceTier {
    #[must_use]
    pub fn from_score(score: f32) -> Self {
        if score > thresholds::STRONG {
            Self::Strong
        } else if score > thresholds::MODERATE {
            Self::Moderate
        } else {
            Self::Possible
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Moderate => "moderate",
            Self::Possible => "possible",
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explanation style for a ranked match list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    #[default]
    Detailed,
    Quick,
}

impl AnalysisMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Detailed => "detailed",
            Self::Quick => "quick",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "detailed" => Ok(Self::Detailed),
            "quick" => Ok(Self::Quick),
            other => Err(format!("Mode must be 'detailed' or 'quick', got '{other}'")),
        }
    }
}

/// One ranked result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub name: String,
    /// Similarity clamped into `[0, 1]`.
    pub score: f32,
    /// Human-readable explanation.
    pub reason: String,
    pub category: String,
    pub period: String,
    /// Up to three of the record's own theme tags.
    pub key_themes: Vec<String>,
    pub recommendation: Recommendation,
}

/// Features and themes of a query, computed once from the raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryProfile {
    pub features: QueryFeatures,
    pub themes: Vec<Theme>,
}

impl QueryProfile {
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            features: extract_features(text),
            themes: detect_themes(text),
        }
    }
}

/// Ranks index candidates and explains each one.
#[derive(Debug, Clone, Copy)]
pub struct MatchExplainer<'a> {
    index: &'a VectorIndex,
    min_score: Option<f32>,
}

impl<'a> MatchExplainer<'a> {
    #[must_use]
    pub fn new(index: &'a VectorIndex) -> Self {
        Self {
            index,
            min_score: None,
        }
    }

    /// Drops candidates scoring below `min_score` when set.
    #[must_use]
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    /// Builds the detailed explanation for one candidate.
    ///
    /// Conditional sentences are emitted for theme overlap, complex sentence
    /// structure against a "complex" style, and questioning against a
    /// philosopher. Without any of them the explanation falls back to the
    /// confidence tier.
    #[must_use]
    pub fn explain(
        &self,
        profile: &QueryProfile,
        record: &CorpusRecord,
        score: f32,
    ) -> String {
        let mut sentences = Vec::new();

        let shared: Vec<&str> = profile
            .themes
            .iter()
            .map(Theme::as_str)
            .filter(|theme| record.themes.iter().any(|t| t == theme))
            .collect();
        if !shared.is_empty() {
            sentences.push(format!(
                "Your writing explores {} themes similar to {}",
                shared.join(", "),
                record.name
            ));
        }

        if profile.features.avg_sentence_length > COMPLEX_SENTENCE_WORDS
            && record.writing_style.contains("complex")
        {
            sentences.push(
                "Your complex sentence structure mirrors their philosophical depth".to_string(),
            );
        }

        if profile.features.question_density > INQUIRING_QUESTION_DENSITY
            && record.category == "philosopher"
        {
            sentences
                .push("Your questioning nature reflects their philosophical inquiry".to_string());
        }

        if sentences.is_empty() {
            sentences.push(format!(
                "The semantic patterns in your text show {} alignment with {}'s characteristic expression",
                ConfidenceTier::from_score(score),
                record.name
            ));
        }

        format!("{}.", sentences.join(". "))
    }

    /// The one-line explanation used in quick mode.
    #[must_use]
    pub fn quick_explanation(record: &CorpusRecord, score: f32) -> String {
        format!(
            "Your text shows semantic similarity to {}'s work (score: {score:.2}).",
            record.name
        )
    }

    /// Searches the index for the top `k` candidates and explains each.
    ///
    /// # Errors
    /// [`VectorError::DimensionMismatch`] if the query vector has the wrong length.
    pub fn rank(
        &self,
        query_vector: &[f32],
        query_text: &str,
        k: usize,
        mode: AnalysisMode,
    ) -> Result<Vec<Match>, VectorError> {
        let profile = QueryProfile::from_text(query_text);
        self.rank_profile(query_vector, &profile, k, mode)
    }

    /// Like [`rank`](Self::rank) with the query profile already computed.
    pub fn rank_profile(
        &self,
        query_vector: &[f32],
        profile: &QueryProfile,
        k: usize,
        mode: AnalysisMode,
    ) -> Result<Vec<Match>, VectorError> {
        let candidates = match self.min_score {
            Some(threshold) => self.index.search_with_threshold(query_vector, k, threshold)?,
            None => self.index.search(query_vector, k)?,
        };

        Ok(candidates
            .into_iter()
            .map(|(score, record)| {
                let reason = match mode {
                    AnalysisMode::Detailed => self.explain(profile, record, score),
                    AnalysisMode::Quick => Self::quick_explanation(record, score),
                };
                Match {
                    name: record.name.clone(),
                    score: score.clamp(0.0, 1.0),
                    reason,
                    category: record.category.clone(),
                    period: record.period.clone(),
                    key_themes: record.themes.iter().take(MAX_KEY_THEMES).cloned().collect(),
                    recommendation: record.recommendation.clone(),
                }
            })
            .collect())
    }
}
