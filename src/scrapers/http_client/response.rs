//! HTTP response wrapper and size-limited body reading.

use std::collections::HashMap;

use reqwest::Response;

use crate::error::{AcquireError, Result};

/// A fetched response with its body already read.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    /// URL after redirects.
    pub final_url: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get the Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(|s| s.as_str())
    }

    /// Whether the Content-Type is JSON.
    pub fn is_json(&self) -> bool {
        self.content_type()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
    }
}

pub(crate) fn header_map(response: &Response) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for (name, value) in response.headers() {
        if let Ok(v) = value.to_str() {
            headers.insert(name.to_string(), v.to_string());
        }
    }
    headers
}

/// Read the body, failing with `ResponseTooLarge` once it exceeds `limit`.
///
/// A declared `Content-Length` over the limit fails before any body is read;
/// the chunked read enforces the limit regardless of what was declared.
pub(crate) async fn read_limited(mut response: Response, limit: u64) -> Result<Vec<u8>> {
    if let Some(declared) = response.content_length() {
        if declared > limit {
            return Err(AcquireError::ResponseTooLarge {
                limit,
                actual: declared,
            });
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let total = body.len() as u64 + chunk.len() as u64;
        if total > limit {
            return Err(AcquireError::ResponseTooLarge {
                limit,
                actual: total,
            });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Body bytes as text, replacing invalid UTF-8.
pub(crate) fn decode_body(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}
