//! Value types created and consumed within a single acquisition call.

mod content;
mod fallback;
mod outcome;

pub use content::{ContentFields, ScrapedContent};
pub use fallback::{AttemptOutcome, FallbackAttempt, FallbackKind, FallbackResult, RawContent};
pub use outcome::{Acquired, AcquisitionOutcome, EscalationResult, OutcomeSummary};

/// Best-effort robots.txt / sitemap.xml probe result.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct SiteProbe {
    pub robots_txt: Option<String>,
    pub sitemap_xml: Option<String>,
}

impl SiteProbe {
    /// `Sitemap:` directives declared in robots.txt.
    pub fn declared_sitemaps(&self) -> Vec<String> {
        self.robots_txt
            .as_deref()
            .map(|text| {
                text.lines()
                    .filter_map(|line| {
                        let line = line.trim();
                        let directive = line.get(..8)?;
                        if directive.eq_ignore_ascii_case("sitemap:") {
                            Some(line[8..].trim().to_string()).filter(|s| !s.is_empty())
                        } else {
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
