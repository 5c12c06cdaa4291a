//! Shared helper functions for CLI commands.

use std::path::Path;
use std::time::Duration;

use console::style;

use crate::context::AcquireContext;
use crate::models::{AcquisitionOutcome, ScrapedContent};

/// Root context for a command, with an optional overall deadline.
/// Ctrl-C cancels it so in-flight requests are dropped.
pub fn command_context(timeout_secs: Option<u64>) -> AcquireContext {
    let ctx = match timeout_secs {
        Some(secs) => AcquireContext::with_timeout(Duration::from_secs(secs)),
        None => AcquireContext::background(),
    };

    let handle = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{} Interrupted, cancelling", style("!").yellow());
            handle.cancel();
        }
    });

    ctx
}

/// Parse a URL list: one per line, blank lines and `#` comments skipped.
pub fn parse_url_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub async fn read_url_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    Ok(parse_url_list(&contents))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}

/// Human-readable rendering of accepted content.
pub fn print_content(content: &ScrapedContent) {
    let title = if content.title().is_empty() {
        "(untitled)"
    } else {
        content.title()
    };
    println!("  {:<14} {}", style("Title:").bold(), title);
    println!("  {:<14} {}", style("Domain:").bold(), content.source_domain());
    println!(
        "  {:<14} {:.2} ({} words)",
        style("Quality:").bold(),
        content.quality_score(),
        content.word_count()
    );
    if let Some(lang) = content.language() {
        println!("  {:<14} {}", style("Language:").bold(), lang);
    }
    if !content.meta_description().is_empty() {
        println!(
            "  {:<14} {}",
            style("Description:").bold(),
            truncate(content.meta_description(), 160)
        );
    }
    if !content.nav_items().is_empty() {
        println!(
            "  {:<14} {}",
            style("Navigation:").bold(),
            truncate(&content.nav_items().join(", "), 160)
        );
    }
    if !content.products().is_empty() {
        println!(
            "  {:<14} {}",
            style("Products:").bold(),
            truncate(&content.products().join(", "), 160)
        );
    }
    if !content.about_text().is_empty() {
        println!(
            "  {:<14} {}",
            style("About:").bold(),
            truncate(content.about_text(), 240)
        );
    }
    if !content.contact_text().is_empty() {
        println!(
            "  {:<14} {}",
            style("Contact:").bold(),
            truncate(content.contact_text(), 160)
        );
    }
}

/// One line per strategy attempt.
pub fn print_outcomes(outcomes: &[AcquisitionOutcome]) {
    for outcome in outcomes {
        let marker = if outcome.is_success() {
            style("✓").green()
        } else {
            style("✗").red()
        };
        let detail = match &outcome.error {
            Some(e) => e.to_string(),
            None => "accepted".to_string(),
        };
        println!(
            "  {} {:<12} {:>6}ms  {}",
            marker,
            outcome.strategy,
            outcome.duration.as_millis(),
            style(detail).dim()
        );
    }
}
