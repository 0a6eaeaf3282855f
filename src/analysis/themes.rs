//! Keyword-based theme tagging.
//!
//! A theme is present when the lowercased text contains any of its keywords
//! as a substring. The theme set, the keyword tables and the canonical order
//! are fixed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of themes reported for one text.
pub const MAX_THEMES: usize = 5;

/// The closed set of theme categories, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Existential,
    Political,
    Romantic,
    Rational,
    Spiritual,
    Nature,
    HumanCondition,
    Artistic,
    Social,
    Language,
}

impl Theme {
    /// Every theme in canonical order.
    pub const ALL: [Theme; 10] = [
        Theme::Existential,
        Theme::Political,
        Theme::Romantic,
        Theme::Rational,
        Theme::Spiritual,
        Theme::Nature,
        Theme::HumanCondition,
        Theme::Artistic,
        Theme::Social,
        Theme::Language,
    ];

    /// The tag used in datasets and responses.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Theme::Existential => "existential",
            Theme::Political => "political",
            Theme::Romantic => "romantic",
            Theme::Rational => "rational",
            Theme::Spiritual => "spiritual",
            Theme::Nature => "nature",
            Theme::HumanCondition => "human_condition",
            Theme::Artistic => "artistic",
            Theme::Social => "social",
            Theme::Language => "language",
        }
    }

    /// Lowercase keywords that mark this theme.
    #[must_use]
    pub const fn keywords(&self) -> &'static [&'static str] {
        match self {
            Theme::Existential => &[
                "existence",
                "being",
                "mortality",
                "death",
                "life",
                "meaning",
                "absurd",
            ],
            Theme::Political => &[
                "power",
                "society",
                "justice",
                "freedom",
                "oppression",
                "revolution",
                "state",
            ],
            Theme::Romantic => &[
                "love", "passion", "desire", "beauty", "emotion", "heart", "soul",
            ],
            Theme::Rational => &[
                "reason",
                "logic",
                "mind",
                "thought",
                "intellect",
                "rational",
                "analysis",
            ],
            Theme::Spiritual => &[
                "god",
                "divine",
                "soul",
                "faith",
                "religious",
                "spiritual",
                "transcendent",
            ],
            Theme::Nature => &[
                "nature",
                "natural",
                "world",
                "earth",
                "organic",
                "wild",
                "landscape",
            ],
            Theme::HumanCondition => &[
                "suffering",
                "joy",
                "pain",
                "happiness",
                "consciousness",
                "identity",
            ],
            Theme::Artistic => &[
                "art",
                "beauty",
                "aesthetic",
                "creative",
                "imagination",
                "expression",
            ],
            Theme::Social => &[
                "community",
                "relationship",
                "other",
                "society",
                "collective",
                "individual",
            ],
            Theme::Language => &[
                "language",
                "words",
                "writing",
                "discourse",
                "communication",
                "text",
            ],
        }
    }

    /// Whether `lowercase_text` mentions any keyword of this theme.
    #[must_use]
    pub fn matches(&self, lowercase_text: &str) -> bool {
        self.keywords().iter().any(|k| lowercase_text.contains(k))
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the themes mentioned in `text`, in canonical order, at most
/// [`MAX_THEMES`].
#[must_use]
pub fn detect_themes(text: &str) -> Vec<Theme> {
    let lower = text.to_lowercase();
    Theme::ALL
        .iter()
        .copied()
        .filter(|theme| theme.matches(&lower))
        .take(MAX_THEMES)
        .collect()
}
