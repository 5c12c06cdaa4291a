//! Structured page content produced by a successful acquisition attempt.
//!
//! `ScrapedContent` is immutable once built. Its word count and quality score
//! are derived from the other fields at construction time and cannot be set
//! independently.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::extract::quality::{self, QualitySignals};

/// Extracted page sections, the raw input to `ScrapedContent::new`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentFields {
    pub raw_html: String,
    pub title: String,
    pub meta_description: String,
    pub headings: Vec<String>,
    pub nav_items: Vec<String>,
    pub about_text: String,
    pub products: Vec<String>,
    pub contact_text: String,
    /// Visible body text with navigation and boilerplate removed.
    pub body_text: String,
    pub language: Option<String>,
    pub has_logo: bool,
}

/// Canonical output unit of the acquisition engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapedContent {
    #[serde(skip_serializing)]
    raw_html: String,
    text: String,
    title: String,
    meta_description: String,
    headings: Vec<String>,
    nav_items: Vec<String>,
    about_text: String,
    products: Vec<String>,
    contact_text: String,
    word_count: usize,
    language: Option<String>,
    has_logo: bool,
    quality_score: f64,
    source_domain: String,
    captured_at: DateTime<Utc>,
}

impl ScrapedContent {
    /// Build content from extracted fields, captured now.
    pub fn new(fields: ContentFields, source_domain: impl Into<String>) -> Self {
        Self::with_timestamp(fields, source_domain, Utc::now())
    }

    /// Build content with an explicit capture timestamp.
    pub fn with_timestamp(
        fields: ContentFields,
        source_domain: impl Into<String>,
        captured_at: DateTime<Utc>,
    ) -> Self {
        let text = compose_text(&fields);
        let word_count = count_words(&text);

        let mut content = Self {
            quality_score: 0.0,
            raw_html: fields.raw_html,
            text,
            title: fields.title,
            meta_description: fields.meta_description,
            headings: fields.headings,
            nav_items: fields.nav_items,
            about_text: fields.about_text,
            products: fields.products,
            contact_text: fields.contact_text,
            word_count,
            language: fields.language,
            has_logo: fields.has_logo,
            source_domain: source_domain.into(),
            captured_at,
        };
        content.quality_score = quality::score(&content.signals());
        content
    }

    pub fn raw_html(&self) -> &str {
        &self.raw_html
    }

    /// Weighted plain-text composite (title, description, body, contact).
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn meta_description(&self) -> &str {
        &self.meta_description
    }

    pub fn headings(&self) -> &[String] {
        &self.headings
    }

    pub fn nav_items(&self) -> &[String] {
        &self.nav_items
    }

    pub fn about_text(&self) -> &str {
        &self.about_text
    }

    pub fn products(&self) -> &[String] {
        &self.products
    }

    pub fn contact_text(&self) -> &str {
        &self.contact_text
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn has_logo(&self) -> bool {
        self.has_logo
    }

    pub fn quality_score(&self) -> f64 {
        self.quality_score
    }

    pub fn source_domain(&self) -> &str {
        &self.source_domain
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Inputs the quality score is derived from.
    pub fn signals(&self) -> QualitySignals {
        QualitySignals {
            has_title: !self.title.trim().is_empty(),
            has_meta_description: !self.meta_description.trim().is_empty(),
            heading_count: self.headings.len(),
            about_chars: self.about_text.trim().chars().count(),
            word_count: self.word_count,
            nav_count: self.nav_items.len(),
            has_logo: self.has_logo,
        }
    }
}

/// Join the high-signal sections first, then the body. About and contact
/// text are only appended when the body does not already contain them
/// (header, aside and footer are stripped from the body, so those blocks
/// are often missing from it).
fn compose_text(fields: &ContentFields) -> String {
    let body = fields.body_text.trim();

    let mut parts: Vec<&str> = Vec::with_capacity(5);
    for part in [fields.title.trim(), fields.meta_description.trim(), body] {
        if !part.is_empty() {
            parts.push(part);
        }
    }
    for extra in [fields.about_text.trim(), fields.contact_text.trim()] {
        if !extra.is_empty() && !body.contains(extra) {
            parts.push(extra);
        }
    }
    parts.join("\n")
}

fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count_matches_text_tokens() {
        let content = ScrapedContent::new(
            ContentFields {
                title: "Acme Inc".into(),
                meta_description: "Widgets for everyone".into(),
                body_text: "We build   widgets\nand gadgets.".into(),
                ..Default::default()
            },
            "acme.test",
        );
        assert_eq!(content.word_count(), content.text().split_whitespace().count());
        assert_eq!(content.word_count(), 2 + 3 + 5);
    }

    #[test]
    fn test_contact_not_duplicated_when_in_body() {
        let content = ScrapedContent::new(
            ContentFields {
                body_text: "Call us at 555-0100 today".into(),
                contact_text: "555-0100".into(),
                ..Default::default()
            },
            "acme.test",
        );
        assert_eq!(content.text(), "Call us at 555-0100 today");
    }

    #[test]
    fn test_contact_appended_when_missing_from_body() {
        let content = ScrapedContent::new(
            ContentFields {
                body_text: "Hello".into(),
                contact_text: "1 Main St".into(),
                ..Default::default()
            },
            "acme.test",
        );
        assert_eq!(content.text(), "Hello\n1 Main St");
    }

    #[test]
    fn test_about_counted_once() {
        let outside = ScrapedContent::new(
            ContentFields {
                body_text: "Fresh bread daily".into(),
                about_text: "Family bakery since the war".into(),
                ..Default::default()
            },
            "acme.test",
        );
        assert_eq!(outside.text(), "Fresh bread daily\nFamily bakery since the war");
        assert_eq!(outside.word_count(), 8);

        let inside = ScrapedContent::new(
            ContentFields {
                body_text: "Welcome. Family bakery since the war. Fresh bread daily".into(),
                about_text: "Family bakery since the war".into(),
                ..Default::default()
            },
            "acme.test",
        );
        assert_eq!(inside.word_count(), 9);
    }

    #[test]
    fn test_score_is_derived_from_fields() {
        let fields = ContentFields {
            title: "Acme".into(),
            has_logo: true,
            ..Default::default()
        };
        let a = ScrapedContent::new(fields.clone(), "acme.test");
        let b = ScrapedContent::new(fields, "acme.test");
        assert_eq!(a.quality_score(), b.quality_score());
        assert_eq!(a.quality_score(), quality::score(&a.signals()));
    }
}
