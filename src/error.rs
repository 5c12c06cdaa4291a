//! Error taxonomy for content acquisition.

use thiserror::Error;

use crate::models::AcquisitionOutcome;

/// Result alias used throughout the acquisition engine.
pub type Result<T> = std::result::Result<T, AcquireError>;

/// Errors produced while acquiring website content.
///
/// Every variant owns its data so that errors can be cloned into per-attempt
/// diagnostics without holding on to transport-level error types.
#[derive(Debug, Clone, Error)]
pub enum AcquireError {
    /// The URL is malformed or could not be parsed. Never retried.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Network, DNS, TLS or timeout failure.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// 4xx response. Excluded from retry loops.
    #[error("HTTP {status} from {url}")]
    NonRetryableHttp { status: u16, url: String },

    /// 5xx response. Retryable.
    #[error("server error HTTP {status} from {url}")]
    ServerStatus { status: u16, url: String },

    /// The caller's context was cancelled or its deadline passed.
    #[error("context cancelled: {0}")]
    ContextCancelled(String),

    /// Content was fetched but failed the quality gate.
    #[error("content rejected by quality gate (score {score:.2}): {reason}")]
    QualityRejected { score: f64, reason: String },

    /// Body exceeded the configured byte ceiling.
    #[error("response too large: {actual} bytes exceeds limit of {limit} bytes")]
    ResponseTooLarge { limit: u64, actual: u64 },

    /// Render or fast-scrape service returned non-2xx or `success=false`.
    #[error("{service} service error: {message}")]
    RemoteService { service: String, message: String },

    /// Body could not be decoded (bad JSON, not JSON, invalid UTF-8).
    #[error("decode error: {0}")]
    Decode(String),

    /// Every strategy in the escalation failed.
    #[error("acquisition of {url} failed after {} strategies; last error: {last}", outcomes.len())]
    Exhausted {
        url: String,
        last: Box<AcquireError>,
        outcomes: Vec<AcquisitionOutcome>,
    },
}

impl AcquireError {
    pub fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        AcquireError::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn remote(service: &str, message: impl Into<String>) -> Self {
        AcquireError::RemoteService {
            service: service.to_string(),
            message: message.into(),
        }
    }

    /// Map an HTTP status to the matching error, or `None` for 2xx/3xx.
    pub fn from_status(status: u16, url: &str) -> Option<Self> {
        match status {
            400..=499 => Some(AcquireError::NonRetryableHttp {
                status,
                url: url.to_string(),
            }),
            500..=599 => Some(AcquireError::ServerStatus {
                status,
                url: url.to_string(),
            }),
            _ => None,
        }
    }

    /// Whether a retry loop may try this request again.
    pub fn is_retryable(&self) -> bool {
        match self {
            AcquireError::TransportFailure(_)
            | AcquireError::ServerStatus { .. }
            | AcquireError::RemoteService { .. } => true,
            AcquireError::Exhausted { last, .. } => last.is_retryable(),
            _ => false,
        }
    }

    /// True for a cancellation, including an escalation cut short by one.
    pub fn is_cancelled(&self) -> bool {
        match self {
            AcquireError::ContextCancelled(_) => true,
            AcquireError::Exhausted { last, .. } => last.is_cancelled(),
            _ => false,
        }
    }

    /// Per-strategy outcomes, when this is an aggregate escalation failure.
    pub fn outcomes(&self) -> &[AcquisitionOutcome] {
        match self {
            AcquireError::Exhausted { outcomes, .. } => outcomes,
            _ => &[],
        }
    }
}

impl From<reqwest::Error> for AcquireError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AcquireError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            let url = err.url().map(|u| u.to_string()).unwrap_or_default();
            AcquireError::from_status(status.as_u16(), &url)
                .unwrap_or_else(|| AcquireError::TransportFailure(err.to_string()))
        } else {
            AcquireError::TransportFailure(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AcquireError {
    fn from(err: serde_json::Error) -> Self {
        AcquireError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status() {
        assert!(matches!(
            AcquireError::from_status(404, "https://example.com"),
            Some(AcquireError::NonRetryableHttp { status: 404, .. })
        ));
        assert!(matches!(
            AcquireError::from_status(503, "https://example.com"),
            Some(AcquireError::ServerStatus { status: 503, .. })
        ));
        assert!(AcquireError::from_status(200, "https://example.com").is_none());
        assert!(AcquireError::from_status(301, "https://example.com").is_none());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(AcquireError::TransportFailure("reset".into()).is_retryable());
        assert!(AcquireError::ServerStatus {
            status: 502,
            url: String::new()
        }
        .is_retryable());
        assert!(!AcquireError::NonRetryableHttp {
            status: 403,
            url: String::new()
        }
        .is_retryable());
        assert!(!AcquireError::ContextCancelled("deadline".into()).is_retryable());
        assert!(!AcquireError::invalid_url("::", "empty host").is_retryable());
        assert!(!AcquireError::ResponseTooLarge { limit: 1, actual: 2 }.is_retryable());
    }

    #[test]
    fn exhausted_names_last_cause() {
        let err = AcquireError::Exhausted {
            url: "https://example.com".into(),
            last: Box::new(AcquireError::TransportFailure("connection refused".into())),
            outcomes: Vec::new(),
        };
        let msg = err.to_string();
        assert!(msg.contains("connection refused"));
        assert!(msg.contains("https://example.com"));
    }
}
