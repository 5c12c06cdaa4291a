//! Realistic browser header sets.
//!
//! `BROWSER_HEADERS` is what the browser-header strategy sends. Accept-Encoding
//! is left to the client, which decompresses gzip and brotli bodies. The named
//! templates are rotated by the fallback manager when every primary strategy
//! has been blocked.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// A named set of request headers, excluding `User-Agent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderTemplate {
    pub name: &'static str,
    pub headers: &'static [(&'static str, &'static str)],
}

impl HeaderTemplate {
    pub fn to_header_map(&self) -> HeaderMap {
        to_header_map(self.headers)
    }
}

/// Full desktop Chrome navigation headers.
pub const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    ),
    ("accept-language", "en-US,en;q=0.9"),
    ("cache-control", "no-cache"),
    ("pragma", "no-cache"),
    ("dnt", "1"),
    ("upgrade-insecure-requests", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
];

pub const HEADER_TEMPLATES: &[HeaderTemplate] = &[
    HeaderTemplate {
        name: "chrome_desktop",
        headers: BROWSER_HEADERS,
    },
    HeaderTemplate {
        name: "firefox_desktop",
        headers: &[
            (
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
            ("accept-language", "en-US,en;q=0.5"),
            ("dnt", "1"),
            ("upgrade-insecure-requests", "1"),
            ("sec-fetch-dest", "document"),
            ("sec-fetch-mode", "navigate"),
            ("sec-fetch-site", "none"),
            ("sec-fetch-user", "?1"),
        ],
    },
    HeaderTemplate {
        name: "safari_mobile",
        headers: &[
            (
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
            ("accept-language", "en-US,en;q=0.9"),
        ],
    },
    HeaderTemplate {
        name: "referred_search",
        headers: &[
            (
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
            ("accept-language", "en-US,en;q=0.9"),
            ("referer", "https://www.google.com/"),
            ("sec-fetch-dest", "document"),
            ("sec-fetch-mode", "navigate"),
            ("sec-fetch-site", "cross-site"),
        ],
    },
];

/// Build a `HeaderMap`, skipping any pair that is not a valid header.
pub fn to_header_map(pairs: &[(&str, &str)]) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            map.insert(name, value);
        }
    }
    map
}

pub fn browser_headers() -> HeaderMap {
    to_header_map(BROWSER_HEADERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_headers_include_sec_fetch() {
        let headers = browser_headers();
        assert_eq!(headers.get("dnt").unwrap(), "1");
        assert_eq!(headers.get("sec-fetch-mode").unwrap(), "navigate");
        assert!(headers.get("accept-language").is_some());
    }

    #[test]
    fn test_templates_are_valid() {
        for template in HEADER_TEMPLATES {
            assert_eq!(template.to_header_map().len(), template.headers.len());
        }
    }
}
