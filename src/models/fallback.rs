//! Fallback attempt records.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ScrapedContent;
use crate::extract;

/// Kind of second-tier recovery attempted by the fallback manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackKind {
    UserAgentRotation,
    HeaderCustomization,
    ProxyRotation,
    AlternativeSource,
}

impl FallbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserAgentRotation => "user_agent_rotation",
            Self::HeaderCustomization => "header_customization",
            Self::ProxyRotation => "proxy_rotation",
            Self::AlternativeSource => "alternative_source",
        }
    }
}

impl fmt::Display for FallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one fallback attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success { http_status: u16 },
    Failed { error: String },
}

/// One try within a fallback run.
#[derive(Debug, Clone, Serialize)]
pub struct FallbackAttempt {
    pub kind: FallbackKind,
    /// User agent string, header template name, proxy URL, or source name.
    pub identity: String,
    pub outcome: AttemptOutcome,
    /// 1-based position of this attempt within the run.
    pub attempt: usize,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl FallbackAttempt {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Success { .. })
    }
}

/// Unstructured content returned by a successful fallback.
#[derive(Debug, Clone, Serialize)]
pub struct RawContent {
    /// URL the body was actually read from (may be an archive snapshot).
    pub fetched_from: String,
    pub status: u16,
    #[serde(skip_serializing)]
    pub body: String,
}

impl RawContent {
    /// Run structured extraction over the raw body.
    pub fn into_scraped(self, original_url: &str) -> ScrapedContent {
        extract::extract(self.body, original_url)
    }
}

/// Terminal result of a fallback run. Exhaustion is not an error.
#[derive(Debug, Clone, Serialize)]
pub struct FallbackResult {
    pub url: String,
    pub content: Option<RawContent>,
    pub attempts: Vec<FallbackAttempt>,
    pub original_error: String,
    /// Set when the run stopped because the shared budget ran out.
    pub budget_exhausted: bool,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl FallbackResult {
    pub fn is_success(&self) -> bool {
        self.content.is_some()
    }

    pub fn winning_attempt(&self) -> Option<&FallbackAttempt> {
        self.attempts.iter().find(|a| a.is_success())
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}
