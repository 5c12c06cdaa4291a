//! Single-URL acquisition command.

use console::style;
use serde::Serialize;

use crate::cli::helpers::{command_context, print_content, print_outcomes};
use crate::config::Settings;
use crate::error::AcquireError;
use crate::models::{FallbackResult, OutcomeSummary, ScrapedContent};
use crate::scrapers::{EscalationController, FallbackManager};

#[derive(Serialize)]
struct AcquireReport<'a> {
    url: &'a str,
    success: bool,
    /// Strategy or fallback identity that produced the content.
    source: Option<String>,
    content: Option<&'a ScrapedContent>,
    outcomes: Vec<OutcomeSummary>,
    fallback: Option<&'a FallbackResult>,
    error: Option<String>,
}

pub async fn cmd_acquire(
    settings: &Settings,
    url: &str,
    use_fallback: bool,
    timeout: Option<u64>,
    json: bool,
) -> anyhow::Result<()> {
    let controller = EscalationController::from_settings(settings)?;
    let ctx = command_context(timeout);

    if !json {
        println!(
            "{} Acquiring {} ({})",
            style("→").cyan(),
            url,
            controller.strategy_names().join(" → ")
        );
    }

    let err = match controller.acquire(&ctx, url).await {
        Ok(acquired) => {
            let outcomes: Vec<_> = acquired.outcomes.iter().map(|o| o.summary()).collect();
            if json {
                let report = AcquireReport {
                    url,
                    success: true,
                    source: Some(acquired.strategy.clone()),
                    content: Some(&acquired.content),
                    outcomes,
                    fallback: None,
                    error: None,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_outcomes(&acquired.outcomes);
                println!(
                    "{} Accepted via {}",
                    style("✓").green(),
                    style(&acquired.strategy).bold()
                );
                print_content(&acquired.content);
            }
            return Ok(());
        }
        Err(e) => e,
    };

    let outcomes: Vec<_> = err.outcomes().iter().map(|o| o.summary()).collect();
    if !json {
        print_outcomes(err.outcomes());
        println!("{} {}", style("✗").red(), err);
    }

    // Fallbacks work from the normalized URL the escalation carried out.
    let target = match &err {
        AcquireError::Exhausted { url, .. } if use_fallback && !err.is_cancelled() => {
            Some(url.clone())
        }
        _ => None,
    };
    let Some(target) = target else {
        if json {
            let report = AcquireReport {
                url,
                success: false,
                source: None,
                content: None,
                outcomes,
                fallback: None,
                error: Some(err.to_string()),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        return Err(err.into());
    };

    if !json {
        println!("{} Trying fallbacks", style("→").cyan());
    }
    let manager = FallbackManager::new(settings.http_config(), settings.fallback.clone())?;
    let result = manager.execute_fallbacks(&ctx, &target, &err).await;
    let content = result.content.clone().map(|raw| raw.into_scraped(&target));
    let source = result
        .winning_attempt()
        .map(|a| format!("{}:{}", a.kind, a.identity));

    if json {
        let report = AcquireReport {
            url,
            success: content.is_some(),
            source,
            content: content.as_ref(),
            outcomes,
            fallback: Some(&result),
            error: content.is_none().then(|| err.to_string()),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for attempt in &result.attempts {
            let marker = if attempt.is_success() {
                style("✓").green()
            } else {
                style("✗").red()
            };
            println!(
                "  {} {:<10} {} #{} {:>6}ms",
                marker,
                attempt.kind,
                attempt.identity,
                attempt.attempt,
                attempt.duration.as_millis()
            );
        }
        match (&content, &source) {
            (Some(content), Some(source)) => {
                println!("{} Recovered via {}", style("✓").green(), style(source).bold());
                print_content(content);
            }
            (Some(content), None) => {
                println!("{} Recovered via fallback", style("✓").green());
                print_content(content);
            }
            _ => {
                let reason = if result.budget_exhausted {
                    "budget exhausted"
                } else {
                    "all fallbacks failed"
                };
                println!("{} Fallbacks: {}", style("✗").red(), reason);
            }
        }
    }

    if content.is_some() {
        Ok(())
    } else {
        Err(err.into())
    }
}
