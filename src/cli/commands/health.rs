//! Remote service health command.

use console::style;

use crate::cli::helpers::command_context;
use crate::config::Settings;
use crate::scrapers::{FastScrapeClient, HttpClient, RenderClient};

pub async fn cmd_health(settings: &Settings) -> anyhow::Result<()> {
    let http = HttpClient::new(settings.http_config())?;
    let ctx = command_context(None);
    let mut unhealthy = 0;

    let report = |name: &str, url: Option<&str>, healthy: Option<bool>| match (url, healthy) {
        (Some(url), Some(true)) => println!("  {} {:<12} {}", style("✓").green(), name, url),
        (Some(url), _) => println!(
            "  {} {:<12} {} {}",
            style("✗").red(),
            name,
            url,
            style("(unreachable)").dim()
        ),
        (None, _) => println!(
            "  {} {:<12} {}",
            style("-").dim(),
            name,
            style("not configured").dim()
        ),
    };

    println!("{} Service health", style("→").cyan());

    let render = match settings.render_service_url.as_deref() {
        Some(url) => Some(RenderClient::new(http.clone(), url).health(&ctx).await),
        None => None,
    };
    report("render", settings.render_service_url.as_deref(), render);
    if render == Some(false) {
        unhealthy += 1;
    }

    let fast = match settings.fast_scrape_url.as_deref() {
        Some(url) => Some(FastScrapeClient::new(http, url).health(&ctx).await),
        None => None,
    };
    report("fast_scrape", settings.fast_scrape_url.as_deref(), fast);
    if fast == Some(false) {
        unhealthy += 1;
    }

    if unhealthy > 0 {
        anyhow::bail!("{} service(s) unhealthy", unhealthy);
    }
    Ok(())
}
