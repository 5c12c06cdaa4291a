//! Structured content extraction from raw HTML.
//!
//! Pure and synchronous: given a document and the URL it came from, build a
//! `ScrapedContent` with title, description, headings, navigation, about
//! text, products/services, contact block, visible body text, language and
//! logo detection. The quality score is derived by `ScrapedContent` itself.

pub mod quality;

pub use quality::{QualityGate, Rejection, Verdict};

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::models::{ContentFields, ScrapedContent};

const MAX_HEADINGS: usize = 100;
const MAX_NAV_ITEMS: usize = 50;
const MAX_PRODUCTS: usize = 50;
const MAX_ABOUT_CHARS: usize = 2000;
const MAX_CONTACT_CHARS: usize = 1000;

/// Subtrees never included in body text.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "iframe", "nav", "header", "footer",
    "aside", "head",
];

fn sel(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

static TITLE: LazyLock<Selector> = LazyLock::new(|| sel("title"));
static META_NAMED: LazyLock<Selector> = LazyLock::new(|| sel("meta[name]"));
static META_PROPERTY: LazyLock<Selector> = LazyLock::new(|| sel("meta[property]"));
static META_HTTP_EQUIV: LazyLock<Selector> = LazyLock::new(|| sel("meta[http-equiv]"));
static HTML_ROOT: LazyLock<Selector> = LazyLock::new(|| sel("html"));
static BODY: LazyLock<Selector> = LazyLock::new(|| sel("body"));
static HEADINGS: LazyLock<Selector> = LazyLock::new(|| sel("h1, h2, h3, h4, h5, h6"));
static NAV_LINKS: LazyLock<Selector> =
    LazyLock::new(|| sel("nav a, [role='navigation'] a, header a"));
static ABOUT_BLOCKS: LazyLock<Selector> = LazyLock::new(|| {
    sel("#about, .about, [id*='about'], [class*='about'], [id*='About'], [class*='About']")
});
static PRODUCTS: LazyLock<Selector> = LazyLock::new(|| {
    sel("[class*='product'] h2, [class*='product'] h3, [class*='product'] h4, \
         [class*='service'] h2, [class*='service'] h3, [class*='service'] h4, \
         [id*='product'] li, [id*='service'] li, \
         [class*='product-title'], [class*='product-name']")
});
static CONTACT: LazyLock<Selector> =
    LazyLock::new(|| sel("address, [id*='contact'], [class*='contact']"));
static LOGO: LazyLock<Selector> = LazyLock::new(|| {
    sel("img[src*='logo'], img[alt*='logo'], img[alt*='Logo'], img[class*='logo'], \
         [class*='logo'], [id*='logo'], [class*='Logo'], [id*='Logo']")
});

/// Extract structured content from `html` fetched from `url`.
pub fn extract(html: String, url: &str) -> ScrapedContent {
    let fields = extract_fields(&html);
    let fields = ContentFields {
        raw_html: html,
        ..fields
    };
    ScrapedContent::new(fields, source_domain(url))
}

/// Extract every field except `raw_html`.
pub fn extract_fields(html: &str) -> ContentFields {
    let doc = Html::parse_document(html);

    ContentFields {
        raw_html: String::new(),
        title: extract_title(&doc),
        meta_description: extract_meta_description(&doc),
        headings: collect_unique(doc.select(&HEADINGS), MAX_HEADINGS, false),
        nav_items: collect_unique(doc.select(&NAV_LINKS), MAX_NAV_ITEMS, true),
        about_text: extract_about(&doc),
        products: collect_unique(
            doc.select(&PRODUCTS)
                .filter(|el| (2..=120).contains(&element_text(el).chars().count())),
            MAX_PRODUCTS,
            true,
        ),
        contact_text: extract_contact(&doc),
        body_text: extract_body_text(&doc),
        language: extract_language(&doc),
        has_logo: doc.select(&LOGO).next().is_some(),
    }
}

/// Host portion of `url`, empty if it cannot be parsed.
pub fn source_domain(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .unwrap_or_default()
}

fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: &ElementRef<'_>) -> String {
    normalize_ws(&el.text().collect::<Vec<_>>().join(" "))
}

fn truncate_chars(text: String, max: usize) -> String {
    if text.chars().count() <= max {
        text
    } else {
        text.chars().take(max).collect()
    }
}

fn collect_unique<'a>(
    elements: impl Iterator<Item = ElementRef<'a>>,
    limit: usize,
    case_insensitive: bool,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for el in elements {
        let text = element_text(&el);
        if text.is_empty() {
            continue;
        }
        let key = if case_insensitive {
            text.to_lowercase()
        } else {
            text.clone()
        };
        if seen.insert(key) {
            out.push(text);
            if out.len() >= limit {
                break;
            }
        }
    }
    out
}

fn meta_content<'a>(
    doc: &'a Html,
    selector: &Selector,
    attr: &str,
    wanted: &str,
) -> Option<&'a str> {
    doc.select(selector)
        .find(|el| {
            el.value()
                .attr(attr)
                .is_some_and(|v| v.trim().eq_ignore_ascii_case(wanted))
        })
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|c| !c.is_empty())
}

fn extract_title(doc: &Html) -> String {
    doc.select(&TITLE)
        .map(|el| element_text(&el))
        .find(|t| !t.is_empty())
        .or_else(|| meta_content(doc, &META_PROPERTY, "property", "og:title").map(normalize_ws))
        .unwrap_or_default()
}

fn extract_meta_description(doc: &Html) -> String {
    meta_content(doc, &META_NAMED, "name", "description")
        .or_else(|| meta_content(doc, &META_PROPERTY, "property", "og:description"))
        .map(normalize_ws)
        .unwrap_or_default()
}

/// Longest about-like block; otherwise the siblings following an "About"
/// heading up to the next heading.
fn extract_about(doc: &Html) -> String {
    let block = doc
        .select(&ABOUT_BLOCKS)
        .filter(|el| !matches!(el.value().name(), "a" | "nav" | "li"))
        .map(|el| element_text(&el))
        .max_by_key(|t| t.len())
        .filter(|t| !t.is_empty());

    if let Some(text) = block {
        return truncate_chars(text, MAX_ABOUT_CHARS);
    }

    for heading in doc.select(&HEADINGS) {
        if !element_text(&heading).to_lowercase().contains("about") {
            continue;
        }
        let mut parts = Vec::new();
        for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
            if matches!(
                sibling.value().name(),
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
            ) {
                break;
            }
            let text = element_text(&sibling);
            if !text.is_empty() {
                parts.push(text);
            }
            if parts.len() >= 3 {
                break;
            }
        }
        if !parts.is_empty() {
            return truncate_chars(parts.join(" "), MAX_ABOUT_CHARS);
        }
    }

    String::new()
}

fn extract_contact(doc: &Html) -> String {
    let mut seen = HashSet::new();
    let mut parts = Vec::new();
    for el in doc.select(&CONTACT) {
        if el.value().name() == "a" {
            continue;
        }
        let text = element_text(&el);
        if text.chars().count() < 10 {
            continue;
        }
        // Skip blocks nested in one already taken.
        if parts.iter().any(|p: &String| p.contains(&text)) {
            continue;
        }
        if seen.insert(text.clone()) {
            parts.push(text);
        }
    }
    truncate_chars(parts.join("\n"), MAX_CONTACT_CHARS)
}

fn extract_body_text(doc: &Html) -> String {
    let mut out = String::new();
    match doc.select(&BODY).next() {
        Some(body) => collect_visible(body, &mut out),
        None => collect_visible(doc.root_element(), &mut out),
    }
    normalize_ws(&out)
}

fn collect_visible(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if SKIP_TAGS.contains(&child_el.value().name()) {
                continue;
            }
            collect_visible(child_el, out);
            out.push(' ');
        } else if let Node::Text(text) = child.value() {
            out.push_str(text);
            out.push(' ');
        }
    }
}

/// Primary language subtag from `<html lang>` or a content-language meta.
fn extract_language(doc: &Html) -> Option<String> {
    let declared = doc
        .select(&HTML_ROOT)
        .next()
        .and_then(|el| el.value().attr("lang"))
        .map(str::to_string)
        .or_else(|| {
            meta_content(doc, &META_HTTP_EQUIV, "http-equiv", "content-language")
                .map(str::to_string)
        })?;

    let primary = declared
        .split([',', '-', '_'])
        .next()
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default();
    if primary.is_empty() {
        None
    } else {
        Some(primary)
    }
}
