//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use site_scanner::config::{Config, CrawlerConfig, OutputConfig, ScopeConfig, UserAgentConfig};
use site_scanner::crawler::{crawl, Crawler, FailurePolicy};
use site_scanner::storage::{Datastore, MemoryDatastore, SqliteDatastore};
use site_scanner::ScanError;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling from `seeds`
fn create_test_config(seeds: Vec<String>, prefixes: Vec<String>) -> Config {
    Config {
        crawler: CrawlerConfig {
            parallel: 4,
            failure_policy: FailurePolicy::Isolate,
            request_timeout_secs: 5,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        scope: ScopeConfig {
            seeds,
            prefixes,
            domains: vec![],
        },
        output: OutputConfig::default(),
    }
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, page: &str, response: ResponseTemplate, times: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html(format!(
            r#"<html><body>
            <a href="{base}/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            <a href="/page1#section">Page 1 again</a>
            <a href="mailto:someone@example.com">Mail</a>
            </body></html>"#
        )),
        1,
    )
    .await;
    mount_page(&server, "/page1", html(r#"<a href="/">Home</a>"#.to_string()), 1).await;
    mount_page(&server, "/page2", html(r#"<a href="page1">One</a>"#.to_string()), 1).await;

    let config = create_test_config(vec![format!("{}/", base)], vec![]);
    let store = Arc::new(MemoryDatastore::new());

    let stats = crawl(&config, store.clone()).await.expect("crawl failed");

    assert_eq!(stats.pages_fetched, 3);
    assert_eq!(stats.pages_failed, 0);
    assert_eq!(stats.added, 3);
    assert_eq!(stats.wrong_protocol, 1);
    assert_eq!(stats.visited, 3);
    assert!(stats.bytes_downloaded > 0);

    assert_eq!(store.queued_count(), 3);
    let responses = store.responses();
    assert_eq!(responses.len(), 3);
    assert!(responses.iter().all(|r| r.status == 200));
    assert!(responses
        .iter()
        .all(|r| r.content_type.as_deref() == Some("text/html")));
}

#[tokio::test]
async fn test_redirect_chain_followed_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        ResponseTemplate::new(301).insert_header("location", "/moved"),
        1,
    )
    .await;
    mount_page(
        &server,
        "/moved",
        ResponseTemplate::new(302).insert_header("location", format!("{}/final", base).as_str()),
        1,
    )
    .await;
    mount_page(
        &server,
        "/final",
        html(r#"<a href="/">Back to start</a>"#.to_string()),
        1,
    )
    .await;

    let config = create_test_config(vec![format!("{}/", base)], vec![]);
    let store = Arc::new(MemoryDatastore::new());

    let stats = crawl(&config, store.clone()).await.expect("crawl failed");
    assert_eq!(stats.pages_fetched, 3);
    assert_eq!(stats.visited, 1);

    let redirects: Vec<_> = store
        .references()
        .into_iter()
        .filter(|r| r.node == "location-header")
        .collect();
    assert_eq!(redirects.len(), 2);
    assert_eq!(redirects[0].url, format!("{}/moved", base));
    assert_eq!(redirects[0].status, Some(301));
}

#[tokio::test]
async fn test_missing_location_is_isolated() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html(r#"<a href="/broken">x</a><a href="/fine">y</a>"#.to_string()),
        1,
    )
    .await;
    mount_page(&server, "/broken", ResponseTemplate::new(302), 1).await;
    mount_page(&server, "/fine", html("fine".to_string()), 1).await;

    let config = create_test_config(vec![format!("{}/", base)], vec![]);
    let stats = crawl(&config, Arc::new(MemoryDatastore::new()))
        .await
        .expect("crawl failed");

    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.pages_failed, 1);
}

#[tokio::test]
async fn test_fail_fast_stops_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html(r#"<a href="/broken">x</a>"#.to_string()),
        1,
    )
    .await;
    mount_page(&server, "/broken", ResponseTemplate::new(307), 1).await;

    let mut config = create_test_config(vec![format!("{}/", base)], vec![]);
    config.crawler.failure_policy = FailurePolicy::FailFast;

    let result = crawl(&config, Arc::new(MemoryDatastore::new())).await;
    match result {
        Err(ScanError::MissingLocationHeader { url, status }) => {
            assert_eq!(url, format!("{}/broken", base));
            assert_eq!(status, 307);
        }
        other => panic!("expected MissingLocationHeader, got {:?}", other),
    }
}

#[tokio::test]
async fn test_prefix_scope_limits_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/docs/",
        html(r#"<a href="/docs/intro">Intro</a><a href="/blog/">Blog</a>"#.to_string()),
        1,
    )
    .await;
    mount_page(&server, "/docs/intro", html("intro".to_string()), 1).await;
    mount_page(&server, "/blog/", html("blog".to_string()), 0).await;

    let config = create_test_config(
        vec![format!("{}/docs/", base)],
        vec![format!("{}/docs/", base)],
    );
    let stats = crawl(&config, Arc::new(MemoryDatastore::new()))
        .await
        .expect("crawl failed");

    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.filtered, 1);
}

#[tokio::test]
async fn test_seed_outside_scope_is_rejected() {
    let server = MockServer::start().await;
    let base = server.uri();

    let config = create_test_config(
        vec![format!("{}/blog/", base)],
        vec![format!("{}/docs/", base)],
    );
    let result = crawl(&config, Arc::new(MemoryDatastore::new())).await;
    assert!(matches!(result, Err(ScanError::NoSeedsAccepted)));

    let received = server.received_requests().await.unwrap_or_default();
    assert!(received.is_empty());
}

#[tokio::test]
async fn test_stylesheet_references_followed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html(r#"<link rel="stylesheet" href="/css/site.css"><img src="/logo.png">"#.to_string()),
        1,
    )
    .await;
    mount_page(
        &server,
        "/css/site.css",
        ResponseTemplate::new(200).set_body_raw(
            "@import 'print.css';\nbody { background: url(\"../bg.png\") }",
            "text/css",
        ),
        1,
    )
    .await;
    for image in ["/logo.png", "/bg.png"] {
        mount_page(
            &server,
            image,
            ResponseTemplate::new(200).set_body_raw(vec![0u8; 16], "image/png"),
            1,
        )
        .await;
    }
    mount_page(
        &server,
        "/css/print.css",
        ResponseTemplate::new(200).set_body_raw("a { color: black }", "text/css"),
        1,
    )
    .await;

    let config = create_test_config(vec![format!("{}/", base)], vec![]);
    let stats = crawl(&config, Arc::new(MemoryDatastore::new()))
        .await
        .expect("crawl failed");

    assert_eq!(stats.pages_fetched, 5);
}

#[tokio::test]
async fn test_referer_header_sent() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html(r#"<a href="/next">Next</a>"#.to_string()), 1).await;
    Mock::given(method("GET"))
        .and(path("/next"))
        .and(header("referer", format!("{}/", base).as_str()))
        .respond_with(html("next".to_string()))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(vec![format!("{}/", base)], vec![]);
    let stats = crawl(&config, Arc::new(MemoryDatastore::new()))
        .await
        .expect("crawl failed");
    assert_eq!(stats.pages_failed, 0);
    assert_eq!(stats.pages_fetched, 2);
}

#[tokio::test]
async fn test_crawl_into_sqlite() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html(r#"<a href="/a">A</a><a href="/missing">Missing</a>"#.to_string()),
        1,
    )
    .await;
    mount_page(&server, "/a", html(r#"<a href="/">Home</a>"#.to_string()), 1).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("scan.db");
    let store = Arc::new(SqliteDatastore::new(&db_path).expect("Failed to open database"));

    let run_id = store.create_run("test-hash").expect("Failed to create run");
    let config = create_test_config(vec![format!("{}/", base)], vec![]);
    let crawler = Crawler::from_config(&config, Arc::clone(&store) as Arc<dyn Datastore>)
        .expect("Failed to build crawler");
    crawler
        .run(config.scope.seeds.iter().map(String::as_str))
        .await
        .expect("crawl failed");
    store
        .finish_run(run_id, site_scanner::storage::RunStatus::Completed)
        .expect("Failed to finish run");

    let counts = store.counts().expect("Failed to count");
    assert_eq!(counts.queued, 3);
    assert_eq!(counts.responses, 3);
    assert_eq!(counts.references, 3);
    assert_eq!(counts.runs, 1);

    assert_eq!(
        store.status_breakdown().expect("Failed to group"),
        vec![(200, 2), (404, 1)]
    );
    assert!(store
        .is_queued(&format!("{}/a", base))
        .await
        .expect("Failed to query"));

    drop(crawler);
    drop(store);

    // A second store on the same file sees the finished run
    let reopened = SqliteDatastore::new(&db_path).expect("Failed to reopen database");
    let run = reopened
        .latest_run()
        .expect("Failed to load run")
        .expect("No run recorded");
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(run.status, site_scanner::storage::RunStatus::Completed);
}

#[tokio::test]
async fn test_second_run_on_same_database_crawls_again() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html(r#"<a href="/a">A</a>"#.to_string()), 2).await;
    mount_page(&server, "/a", html("leaf".to_string()), 2).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("scan.db");
    let config = create_test_config(vec![format!("{}/", base)], vec![]);

    for expected_runs in 1..=2 {
        let store = Arc::new(SqliteDatastore::new(&db_path).expect("Failed to open database"));
        let run_id = store.create_run("test-hash").expect("Failed to create run");

        let stats = crawl(&config, Arc::clone(&store) as Arc<dyn Datastore>)
            .await
            .expect("crawl failed");
        assert_eq!(stats.pages_fetched, 2);
        assert_eq!(stats.pages_failed, 0);

        store
            .finish_run(run_id, site_scanner::storage::RunStatus::Completed)
            .expect("Failed to finish run");
        let counts = store.counts().expect("Failed to count");
        assert_eq!(counts.runs, expected_runs);
        assert_eq!(counts.queued, 2 * expected_runs);
    }
}
