//! robots.txt / sitemap.xml probe command.

use console::style;
use serde::Serialize;

use crate::cli::helpers::command_context;
use crate::config::Settings;
use crate::models::SiteProbe;
use crate::scrapers::{probe_site, HttpClient};

#[derive(Serialize)]
struct ProbeReport<'a> {
    url: &'a str,
    #[serde(flatten)]
    probe: &'a SiteProbe,
    declared_sitemaps: Vec<String>,
}

pub async fn cmd_probe(settings: &Settings, url: &str, json: bool) -> anyhow::Result<()> {
    let http = HttpClient::new(settings.http_config())?;
    let ctx = command_context(None);
    let probe = probe_site(&http, &ctx, url).await?;
    let declared_sitemaps = probe.declared_sitemaps();

    if json {
        let report = ProbeReport {
            url,
            probe: &probe,
            declared_sitemaps,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mark = |present: bool| {
        if present {
            style("found").green()
        } else {
            style("absent").dim()
        }
    };

    println!("{} {}", style("→").cyan(), url);
    match probe.robots_txt {
        Some(ref body) => println!(
            "  {:<12} {} ({} lines)",
            "robots.txt",
            mark(true),
            body.lines().count()
        ),
        None => println!("  {:<12} {}", "robots.txt", mark(false)),
    }
    match probe.sitemap_xml {
        Some(ref body) => println!(
            "  {:<12} {} ({} bytes)",
            "sitemap.xml",
            mark(true),
            body.len()
        ),
        None => println!("  {:<12} {}", "sitemap.xml", mark(false)),
    }
    for sitemap in &declared_sitemaps {
        println!("  {} {}", style("sitemap:").dim(), sitemap);
    }
    Ok(())
}
