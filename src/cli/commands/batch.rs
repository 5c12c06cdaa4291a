//! Concurrent multi-URL acquisition command.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::cli::helpers::{command_context, read_url_file};
use crate::config::Settings;
use crate::models::ScrapedContent;
use crate::scrapers::{BatchSummary, EscalationController, Orchestrator};

pub struct BatchArgs {
    pub urls: Vec<String>,
    pub file: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub timeout: Option<u64>,
    pub url_timeout: Option<u64>,
    pub json: bool,
}

#[derive(Serialize)]
struct UrlReport<'a> {
    success: bool,
    strategy: Option<&'a str>,
    content: Option<&'a ScrapedContent>,
    error: Option<String>,
}

#[derive(Serialize)]
struct BatchReport<'a> {
    summary: BatchSummary,
    interrupted: Option<String>,
    results: BTreeMap<&'a str, UrlReport<'a>>,
}

pub async fn cmd_batch(settings: &Settings, args: BatchArgs) -> anyhow::Result<()> {
    let mut urls = args.urls;
    if let Some(ref path) = args.file {
        urls.extend(read_url_file(path).await?);
    }
    if urls.is_empty() {
        anyhow::bail!("No URLs given (pass URLs or --file)");
    }

    let controller = Arc::new(EscalationController::from_settings(settings)?);
    let mut orchestrator = Orchestrator::new(controller)
        .with_max_concurrency(args.concurrency.unwrap_or(settings.max_concurrency));
    if let Some(secs) = args.url_timeout {
        orchestrator = orchestrator.with_per_url_timeout(Duration::from_secs(secs));
    }

    let ctx = command_context(args.timeout);
    let submitted = dedup_count(&urls);

    let pb = if args.json {
        ProgressBar::hidden()
    } else {
        println!(
            "{} Acquiring {} URLs ({} at a time)",
            style("→").cyan(),
            submitted,
            orchestrator.max_concurrency()
        );
        let pb = ProgressBar::new(submitted as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
                .unwrap()
                .progress_chars("=>-"),
        );
        pb
    };

    let outcome = orchestrator
        .scrape_many_with(&ctx, &urls, |url, result| {
            pb.inc(1);
            match result {
                Ok(acquired) => pb.set_message(format!("{} via {}", url, acquired.strategy)),
                Err(e) => pb.println(format!("  {} {}: {}", style("✗").red(), url, e)),
            }
        })
        .await;
    pb.finish_and_clear();

    let summary = outcome.summary(submitted);

    if args.json {
        let results = outcome
            .results
            .iter()
            .map(|(url, result)| {
                let report = match result {
                    Ok(acquired) => UrlReport {
                        success: true,
                        strategy: Some(acquired.strategy.as_str()),
                        content: Some(&acquired.content),
                        error: None,
                    },
                    Err(e) => UrlReport {
                        success: false,
                        strategy: None,
                        content: None,
                        error: Some(e.to_string()),
                    },
                };
                (url.as_str(), report)
            })
            .collect();
        let report = BatchReport {
            summary,
            interrupted: outcome.interrupted.as_ref().map(|e| e.to_string()),
            results,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} {} succeeded, {} failed, {} not attempted",
            style("✓").green(),
            summary.succeeded,
            summary.failed,
            summary.missing
        );
        if let Some(ref e) = outcome.interrupted {
            println!("{} Batch interrupted: {}", style("!").yellow(), e);
        }
    }

    if summary.failed > 0 || outcome.interrupted.is_some() {
        anyhow::bail!(
            "{} of {} URLs not acquired",
            summary.failed + summary.missing,
            summary.submitted
        );
    }
    Ok(())
}

fn dedup_count(urls: &[String]) -> usize {
    let mut seen = std::collections::HashSet::new();
    urls.iter().filter(|u| seen.insert(u.as_str())).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_count() {
        let urls = vec![
            "a.test".to_string(),
            "b.test".to_string(),
            "a.test".to_string(),
        ];
        assert_eq!(dedup_count(&urls), 2);
    }
}
