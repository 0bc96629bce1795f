//! Integration tests for the collector
//!
//! These tests use wiremock to create mock HTTP servers and drive the
//! full fetch / callback / extraction cycle end-to-end over real HTTP.

use ripple_collector::config::UserAgentConfig;
use ripple_collector::{
    Collector, CollectorError, CollectorOptions, ConcurrencyMode, HttpFetcher, Policy,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// `set_body_string` pins `text/plain`, so the content type goes through `set_body_raw`
fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=utf-8")
}

fn test_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: Some("https://example.com/contact".to_string()),
    }
}

fn create_collector(options: CollectorOptions) -> Collector {
    let fetcher = HttpFetcher::from_config(&test_agent()).expect("Failed to build client");
    Collector::with_options(fetcher, options)
}

fn follow_links(collector: &Collector) {
    collector
        .on_html("a[href]", |e| {
            if let Some(href) = e.attr("href") {
                let _ = e.visit(href);
            }
        })
        .expect("Failed to register link follower");
}

fn server_host(server: &MockServer) -> String {
    url::Url::parse(&server.uri())
        .expect("Failed to parse base URL")
        .host_str()
        .expect("Failed to extract host")
        .to_string()
}

#[tokio::test]
async fn test_full_crawl_respects_depth() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(r#"<a href="/b">B</a> <a href="/c">C</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html(r#"<a href="/a">A</a> <a href="/d">D</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(html(r#"<a href="/b">B</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/d"))
        .respond_with(html("<p>too deep</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let collector = create_collector(CollectorOptions::default());
    collector
        .set_policy(
            Policy::new()
                .max_depth(1)
                .mode(ConcurrencyMode::Asynchronous { parallelism: 2 }),
        )
        .unwrap();
    follow_links(&collector);

    let scraped = Arc::new(Mutex::new(Vec::new()));
    let sink = scraped.clone();
    collector
        .on_scraped(move |r| sink.lock().unwrap().push(r.url().path().to_string()))
        .unwrap();

    collector.visit(&format!("{}/a", mock_server.uri())).unwrap();
    collector.run().await.unwrap();
    let stats = collector.wait().await.unwrap();

    let mut scraped = scraped.lock().unwrap().clone();
    scraped.sort();
    assert_eq!(scraped, vec!["/a", "/b", "/c"]);
    assert_eq!(stats.scraped, 3);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn test_not_found_goes_to_on_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/missing">gone</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let collector = create_collector(CollectorOptions::default());
    follow_links(&collector);

    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();
    collector
        .on_error(move |request, error| {
            if let CollectorError::HttpStatus { status, .. } = error {
                sink.lock()
                    .unwrap()
                    .push((request.url().path().to_string(), *status));
            }
        })
        .unwrap();

    collector.visit(&format!("{}/", mock_server.uri())).unwrap();
    collector.run().await.unwrap();
    let stats = collector.wait().await.unwrap();

    assert_eq!(*errors.lock().unwrap(), vec![("/missing".to_string(), 404)]);
    assert_eq!(stats.scraped, 1);
    assert_eq!(stats.failed, 1);
}

#[tokio::test]
async fn test_links_resolve_against_redirect_target() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new/"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new/"))
        .respond_with(html(r#"<a href="child">child</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new/child"))
        .respond_with(html("<p>child</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let collector = create_collector(CollectorOptions::default());
    follow_links(&collector);

    let final_urls = Arc::new(Mutex::new(Vec::new()));
    let sink = final_urls.clone();
    collector
        .on_response(move |r| sink.lock().unwrap().push(r.url().path().to_string()))
        .unwrap();

    collector.visit(&format!("{}/old", mock_server.uri())).unwrap();
    collector.run().await.unwrap();

    assert_eq!(*final_urls.lock().unwrap(), vec!["/new/", "/new/child"]);
}

#[tokio::test]
async fn test_allowed_domains_blocks_offsite_links() {
    let mock_server = MockServer::start().await;
    let host = server_host(&mock_server);

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="http://offsite.invalid/">away</a> <a href="/local">local</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/local"))
        .respond_with(html("<p>local</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let collector = create_collector(CollectorOptions::default());
    collector
        .set_policy(Policy::new().allowed_domains([host]))
        .unwrap();
    follow_links(&collector);

    let rejected = Arc::new(Mutex::new(Vec::new()));
    let sink = rejected.clone();
    collector
        .on_rejected(move |e| {
            if let CollectorError::DomainRejected { host, .. } = e {
                sink.lock().unwrap().push(host.clone());
            }
        })
        .unwrap();
    collector.visit(&format!("{}/", mock_server.uri())).unwrap();
    collector.run().await.unwrap();
    let stats = collector.wait().await.unwrap();

    assert_eq!(*rejected.lock().unwrap(), vec!["offsite.invalid"]);
    assert_eq!(stats.scraped, 2);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.rejected, 1);
}

#[tokio::test]
async fn test_redirect_to_other_host_is_not_scraped() {
    let mock_server = MockServer::start().await;
    let port = url::Url::parse(&mock_server.uri())
        .expect("Failed to parse base URL")
        .port()
        .expect("Mock server has a port");

    // Same server, reached under a second host name
    Mock::given(method("GET"))
        .and(path("/hop"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("http://localhost:{}/secret", port).as_str()),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/secret"))
        .respond_with(html("<p>offsite</p>"))
        .mount(&mock_server)
        .await;

    let collector = create_collector(CollectorOptions::default());
    collector
        .set_policy(Policy::new().allowed_domains(["127.0.0.1"]))
        .unwrap();

    let html_seen = Arc::new(Mutex::new(Vec::new()));
    let sink = html_seen.clone();
    collector
        .on_html("p", move |e| sink.lock().unwrap().push(e.text()))
        .unwrap();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();
    collector
        .on_error(move |_, e| {
            if let CollectorError::DomainRejected { host, .. } = e {
                sink.lock().unwrap().push(host.clone());
            }
        })
        .unwrap();

    collector
        .visit(&format!("http://127.0.0.1:{}/hop", port))
        .unwrap();
    collector.run().await.unwrap();
    let stats = collector.wait().await.unwrap();

    assert!(html_seen.lock().unwrap().is_empty());
    assert_eq!(*errors.lock().unwrap(), vec!["localhost"]);
    assert_eq!(stats.scraped, 0);
    assert_eq!(stats.failed, 1);
}

#[tokio::test]
async fn test_request_headers_and_user_agent_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("x-trace", "abc"))
        .and(header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact)",
        ))
        .respond_with(html("<title>ok</title>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let collector = create_collector(CollectorOptions::default());
    collector
        .on_request(|r| {
            r.set_header("x-trace", "abc");
        })
        .unwrap();

    let titles = Arc::new(Mutex::new(Vec::new()));
    let sink = titles.clone();
    collector
        .on_html("title", move |e| sink.lock().unwrap().push(e.text()))
        .unwrap();

    collector.visit(&format!("{}/", mock_server.uri())).unwrap();
    collector.run().await.unwrap();

    assert_eq!(*titles.lock().unwrap(), vec!["ok"]);
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<p>late</p>").set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let collector = create_collector(CollectorOptions {
        request_timeout: Duration::from_millis(100),
        ..CollectorOptions::default()
    });

    let timed_out = Arc::new(Mutex::new(false));
    let sink = timed_out.clone();
    collector
        .on_error(move |_, e| {
            if matches!(e, CollectorError::Timeout { .. }) {
                *sink.lock().unwrap() = true;
            }
        })
        .unwrap();

    collector.visit(&format!("{}/slow", mock_server.uri())).unwrap();
    collector.run().await.unwrap();

    assert!(*timed_out.lock().unwrap());
}

#[tokio::test]
async fn test_non_html_skips_extraction() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                r#"{"a": "<a href='/x'>x</a>"}"#.as_bytes().to_vec(),
                "application/json",
            ),
        )
        .mount(&mock_server)
        .await;

    let collector = create_collector(CollectorOptions::default());
    let matched = Arc::new(Mutex::new(0));
    let sink = matched.clone();
    collector
        .on_html("a", move |_| *sink.lock().unwrap() += 1)
        .unwrap();

    let bodies = Arc::new(Mutex::new(Vec::new()));
    let sink = bodies.clone();
    collector
        .on_scraped(move |r| sink.lock().unwrap().push(r.body().len()))
        .unwrap();

    collector
        .visit(&format!("{}/data.json", mock_server.uri()))
        .unwrap();
    collector.run().await.unwrap();
    let stats = collector.wait().await.unwrap();

    assert_eq!(bodies.lock().unwrap().len(), 1);
    assert_eq!(*matched.lock().unwrap(), 0);
    assert_eq!(stats.faults, 0);
}
