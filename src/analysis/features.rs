//! Lexical and structural statistics of a query text.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static SENTENCE_TERMINATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("static regex"));

/// Words longer than this many characters count as complex.
const COMPLEX_WORD_CHARS: usize = 8;

const PUNCTUATION: [char; 6] = ['.', ',', '!', '?', ';', ':'];

/// Derived statistics for one text. Every ratio is 0 when its denominator is 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFeatures {
    pub sentence_count: usize,
    pub word_count: usize,
    /// Mean words per sentence.
    pub avg_sentence_length: f32,
    /// Mean characters per word.
    pub avg_word_length: f32,
    /// Punctuation marks per word.
    pub punctuation_density: f32,
    /// Question marks per sentence.
    pub question_density: f32,
    /// Fraction of words longer than eight characters.
    pub complex_word_ratio: f32,
}

/// Computes [`QueryFeatures`] for `text`.
#[must_use]
pub fn extract_features(text: &str) -> QueryFeatures {
    let sentences: Vec<&str> = SENTENCE_TERMINATORS
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let words: Vec<&str> = text.split_whitespace().collect();

    let sentence_count = sentences.len();
    let word_count = words.len();

    let sentence_words: usize = sentences.iter().map(|s| s.split_whitespace().count()).sum();
    let word_chars: usize = words.iter().map(|w| w.chars().count()).sum();
    let punctuation = text.chars().filter(|c| PUNCTUATION.contains(c)).count();
    let questions = text.matches('?').count();
    let complex = words
        .iter()
        .filter(|w| w.chars().count() > COMPLEX_WORD_CHARS)
        .count();

    QueryFeatures {
        sentence_count,
        word_count,
        avg_sentence_length: ratio(sentence_words, sentence_count),
        avg_word_length: ratio(word_chars, word_count),
        punctuation_density: ratio(punctuation, word_count),
        question_density: ratio(questions, sentence_count),
        complex_word_ratio: ratio(complex, word_count),
    }
}

fn ratio(numerator: usize, denominator: usize) -> f32 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f32 / denominator as f32
    }
}
