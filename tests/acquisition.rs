//! End-to-end acquisition through the public API against mock sites.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use siteacquire::models::FallbackKind;
use siteacquire::scrapers::{AlternativeSourceConfig, FallbackConfig, SourceKind};
use siteacquire::{
    AcquireContext, AcquireError, Config, EscalationController, FallbackManager, Orchestrator,
    QualityGate, Settings,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GOOD_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <title>Harbor Bakery</title>
  <meta name="description" content="Neighborhood bakery with sourdough, pastries and coffee.">
</head>
<body>
  <nav><a href="/">Home</a><a href="/menu">Menu</a><a href="/visit">Visit</a></nav>
  <main>
    <h1>Fresh bread every morning</h1>
    <p>Harbor Bakery bakes sourdough loaves, croissants, seasonal fruit tarts and
    rye bread from scratch every single morning before the doors open. We mill
    part of our own flour, ferment our dough slowly overnight and bake in a stone
    deck oven. Our small team also roasts coffee beans each week and serves
    espresso drinks at the counter. Stop by for breakfast, order a celebration
    cake for the weekend, or join one of our bread classes where we teach home
    bakers how to keep a starter alive and shape a proper loaf at home.</p>
  </main>
</body>
</html>"#;

const THIN_PAGE: &str = "<html><body><div id=\"root\"></div></body></html>";

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

#[tokio::test]
async fn acquires_through_first_strategy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(GOOD_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let controller = EscalationController::from_settings(&Settings::default()).unwrap();
    assert_eq!(controller.strategy_names(), vec!["direct", "browser"]);

    let acquired = controller
        .acquire(&AcquireContext::background(), &server.uri())
        .await
        .unwrap();

    assert_eq!(acquired.strategy, "direct");
    assert_eq!(acquired.outcomes.len(), 1);
    assert_eq!(acquired.content.title(), "Harbor Bakery");
    assert!(acquired.content.word_count() >= 50);
    assert!(QualityGate::default().is_acceptable(&acquired.content));
}

#[tokio::test]
async fn thin_page_escalates_to_render_service() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app"))
        .respond_with(html(THIN_PAGE))
        .expect(2)
        .mount(&site)
        .await;

    let render = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/scrape"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "html": GOOD_PAGE,
            "success": true
        })))
        .expect(1)
        .mount(&render)
        .await;

    let settings = Settings {
        render_service_url: Some(render.uri()),
        ..Default::default()
    };
    let controller = EscalationController::from_settings(&settings).unwrap();
    assert_eq!(controller.strategy_names(), vec!["direct", "browser", "render"]);

    let url = format!("{}/app", site.uri());
    let acquired = controller
        .acquire(&AcquireContext::background(), &url)
        .await
        .unwrap();

    assert_eq!(acquired.strategy, "render");
    assert_eq!(acquired.outcomes.len(), 3);
    for rejected in &acquired.outcomes[..2] {
        assert!(rejected.content.is_some());
        assert!(matches!(
            rejected.error,
            Some(AcquireError::QualityRejected { .. })
        ));
    }
    assert!(acquired.outcomes[2].is_success());
}

#[tokio::test]
async fn blocked_site_recovers_from_archive() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blocked"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&site)
        .await;
    let snapshot = format!("{}/web/20240101000000/blocked", site.uri());
    Mock::given(method("GET"))
        .and(path("/wayback/available"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "archived_snapshots": {
                "closest": {"available": true, "url": snapshot, "status": "200"}
            }
        })))
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/web/20240101000000/blocked"))
        .respond_with(html(GOOD_PAGE))
        .mount(&site)
        .await;

    let settings = Settings::default();
    let url = format!("{}/blocked", site.uri());
    let ctx = AcquireContext::with_timeout(Duration::from_secs(30));

    let controller = EscalationController::from_settings(&settings).unwrap();
    let err = controller.acquire(&ctx, &url).await.unwrap_err();
    assert!(matches!(err, AcquireError::Exhausted { .. }));
    assert_eq!(err.outcomes().len(), 2);

    let fallback = FallbackConfig {
        enable_header_customization: false,
        max_attempts_per_kind: 1,
        attempt_delay_ms: 0,
        sources: vec![AlternativeSourceConfig {
            kind: SourceKind::Wayback,
            base_url: site.uri(),
            priority: 1,
            enabled: true,
        }],
        ..Default::default()
    };
    let manager = FallbackManager::new(settings.http_config(), fallback).unwrap();
    let result = manager.execute_fallbacks(&ctx, &url, &err).await;

    assert!(result.is_success());
    assert_eq!(result.attempts.len(), 2);
    assert!(!result.attempts[0].is_success());
    let winner = result.winning_attempt().unwrap();
    assert_eq!(winner.kind, FallbackKind::AlternativeSource);

    let content = result.content.unwrap().into_scraped(&url);
    assert_eq!(content.title(), "Harbor Bakery");
}

#[tokio::test]
async fn batch_reports_each_url() {
    let server = MockServer::start().await;
    for page in ["/one", "/two"] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(html(GOOD_PAGE))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let controller = Arc::new(EscalationController::from_settings(&Settings::default()).unwrap());
    let orchestrator = Orchestrator::new(controller).with_max_concurrency(2);
    let urls: Vec<String> = ["/one", "/two", "/gone", "/one"]
        .iter()
        .map(|p| format!("{}{}", server.uri(), p))
        .collect();

    let mut seen = Vec::new();
    let outcome = orchestrator
        .scrape_many_with(&AcquireContext::background(), &urls, |url, _| {
            seen.push(url.to_string())
        })
        .await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.results.len(), 3);
    assert_eq!(seen.len(), 3);
    let summary = outcome.summary(3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.missing, 0);
    assert!(outcome.results[&urls[2]].is_err());
}

#[tokio::test]
async fn config_file_enables_remote_strategies() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write!(
        file,
        r#"
fast_scrape_url = "http://fast.internal:8000"
render_service_url = "http://render.internal:3000"
render_timeout = 45
"#
    )
    .unwrap();

    let config = Config::load_from_path(file.path()).await.unwrap();
    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings);
    assert_eq!(settings.render_timeout, Duration::from_secs(45));

    let controller = EscalationController::from_settings(&settings).unwrap();
    assert_eq!(
        controller.strategy_names(),
        vec!["direct", "browser", "fast_scrape", "render"]
    );
}
