//! Per-attempt and per-URL acquisition results.

use std::time::Duration;

use serde::Serialize;

use super::ScrapedContent;
use crate::error::AcquireError;

/// Result of one strategy attempt within an escalation.
///
/// `content` is only trusted when `error` is `None`; content that failed the
/// quality gate is kept for diagnostics alongside a `QualityRejected` error.
#[derive(Debug, Clone)]
pub struct AcquisitionOutcome {
    pub strategy: String,
    pub content: Option<ScrapedContent>,
    pub error: Option<AcquireError>,
    pub duration: Duration,
}

impl AcquisitionOutcome {
    pub fn accepted(strategy: &str, content: ScrapedContent, duration: Duration) -> Self {
        Self {
            strategy: strategy.to_string(),
            content: Some(content),
            error: None,
            duration,
        }
    }

    pub fn failed(strategy: &str, error: AcquireError, duration: Duration) -> Self {
        Self {
            strategy: strategy.to_string(),
            content: None,
            error: Some(error),
            duration,
        }
    }

    pub fn rejected(
        strategy: &str,
        content: ScrapedContent,
        error: AcquireError,
        duration: Duration,
    ) -> Self {
        Self {
            strategy: strategy.to_string(),
            content: Some(content),
            error: Some(error),
            duration,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.content.is_some()
    }

    pub fn summary(&self) -> OutcomeSummary {
        OutcomeSummary {
            strategy: self.strategy.clone(),
            success: self.is_success(),
            error: self.error.as_ref().map(|e| e.to_string()),
            quality_score: self.content.as_ref().map(|c| c.quality_score()),
            duration_ms: self.duration.as_millis() as u64,
        }
    }
}

/// Serializable view of an outcome for reports.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeSummary {
    pub strategy: String,
    pub success: bool,
    pub error: Option<String>,
    pub quality_score: Option<f64>,
    pub duration_ms: u64,
}

/// Successful escalation: accepted content and the strategy that produced it.
#[derive(Debug, Clone)]
pub struct Acquired {
    pub content: ScrapedContent,
    pub strategy: String,
    pub outcomes: Vec<AcquisitionOutcome>,
}

/// Terminal outcome of one URL's escalation.
pub type EscalationResult = Result<Acquired, AcquireError>;
