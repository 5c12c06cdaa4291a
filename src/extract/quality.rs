//! Content quality gate.
//!
//! Two independent pieces: a weighted score in `[0, 1]` used for diagnostics
//! and as one acceptance input, and an acceptance predicate that requires
//! every condition to hold.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::AcquireError;
use crate::models::ScrapedContent;

pub const WEIGHT_TITLE: f64 = 0.15;
pub const WEIGHT_META_DESCRIPTION: f64 = 0.15;
pub const WEIGHT_HEADINGS: f64 = 0.15;
pub const WEIGHT_ABOUT: f64 = 0.20;
pub const WEIGHT_WORD_COUNT: f64 = 0.15;
pub const WEIGHT_NAV: f64 = 0.10;
pub const WEIGHT_LOGO: f64 = 0.10;

/// About text must be strictly longer than this to count.
pub const ABOUT_MIN_CHARS: usize = 100;
/// Word count needed for the word-count weight.
pub const RICH_WORD_COUNT: usize = 200;

/// Minimum word count for acceptance.
pub const MIN_WORD_COUNT: usize = 50;
/// Minimum score for acceptance.
pub const MIN_SCORE: f64 = 0.5;

/// Case-insensitive substrings that mark an error page.
pub const ERROR_SIGNATURES: &[&str] = &[
    "404",
    "page not found",
    "403",
    "access denied",
    "500",
    "internal server error",
    "503",
    "service unavailable",
];

/// A bare HTTP status code at the very start of the text.
static BARE_STATUS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*[1-5]\d{2}\b").unwrap());

/// Field-level inputs to the score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QualitySignals {
    pub has_title: bool,
    pub has_meta_description: bool,
    pub heading_count: usize,
    pub about_chars: usize,
    pub word_count: usize,
    pub nav_count: usize,
    pub has_logo: bool,
}

/// Weighted quality score, always within `[0, 1]`.
pub fn score(s: &QualitySignals) -> f64 {
    let mut total = 0.0;
    if s.has_title {
        total += WEIGHT_TITLE;
    }
    if s.has_meta_description {
        total += WEIGHT_META_DESCRIPTION;
    }
    if s.heading_count >= 1 {
        total += WEIGHT_HEADINGS;
    }
    if s.about_chars > ABOUT_MIN_CHARS {
        total += WEIGHT_ABOUT;
    }
    if s.word_count >= RICH_WORD_COUNT {
        total += WEIGHT_WORD_COUNT;
    }
    if s.nav_count > 0 {
        total += WEIGHT_NAV;
    }
    if s.has_logo {
        total += WEIGHT_LOGO;
    }
    // Three decimal places; weights are multiples of 0.05.
    ((total * 1000.0).round() / 1000.0).clamp(0.0, 1.0)
}

/// Return the first error-page signature found in `text`, if any.
pub fn detect_error_page(text: &str) -> Option<String> {
    if let Some(m) = BARE_STATUS.find(text) {
        return Some(m.as_str().trim().to_string());
    }
    let lower = text.to_lowercase();
    ERROR_SIGNATURES
        .iter()
        .find(|sig| lower.contains(*sig))
        .map(|sig| sig.to_string())
}

/// Why content was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    TooFewWords { count: usize, min: usize },
    MissingTitleAndDescription,
    LowScore { score: f64, min: f64 },
    ErrorPage { signature: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::TooFewWords { count, min } => {
                write!(f, "word count {} below minimum {}", count, min)
            }
            Rejection::MissingTitleAndDescription => {
                write!(f, "neither title nor meta description present")
            }
            Rejection::LowScore { score, min } => {
                write!(f, "quality score {:.2} below minimum {:.2}", score, min)
            }
            Rejection::ErrorPage { signature } => {
                write!(f, "text matches error page signature '{}'", signature)
            }
        }
    }
}

/// Gate decision with the score reported alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub score: f64,
    pub rejection: Option<Rejection>,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        self.rejection.is_none()
    }

    /// Convert to `Err(QualityRejected)` when rejected.
    pub fn into_result(self) -> Result<f64, AcquireError> {
        match self.rejection {
            None => Ok(self.score),
            Some(r) => Err(AcquireError::QualityRejected {
                score: self.score,
                reason: r.to_string(),
            }),
        }
    }
}

/// Accept/reject predicate applied to extracted content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityGate {
    pub min_word_count: usize,
    pub min_score: f64,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self {
            min_word_count: MIN_WORD_COUNT,
            min_score: MIN_SCORE,
        }
    }
}

impl QualityGate {
    pub fn score(&self, content: &ScrapedContent) -> f64 {
        score(&content.signals())
    }

    pub fn is_acceptable(&self, content: &ScrapedContent) -> bool {
        self.evaluate(content).is_accepted()
    }

    /// Check every acceptance condition, reporting the first that fails.
    pub fn evaluate(&self, content: &ScrapedContent) -> Verdict {
        let score = self.score(content);
        let rejection = if content.word_count() < self.min_word_count {
            Some(Rejection::TooFewWords {
                count: content.word_count(),
                min: self.min_word_count,
            })
        } else if content.title().trim().is_empty() && content.meta_description().trim().is_empty()
        {
            Some(Rejection::MissingTitleAndDescription)
        } else if score < self.min_score {
            Some(Rejection::LowScore {
                score,
                min: self.min_score,
            })
        } else {
            detect_error_page(content.text()).map(|signature| Rejection::ErrorPage { signature })
        };

        Verdict { score, rejection }
    }
}
