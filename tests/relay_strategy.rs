//! End-to-end tests of the relay strategy.

use std::net::SocketAddr;

use rewrite_proxy::config::{FetchStrategy, ProxyConfig, RelayConfig};

mod common;
use common::{address_for, client, proxied_url, request_path, start_mock_upstream, start_proxy, MockResponse};

fn relay_config(relay: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.upstream.strategy = FetchStrategy::Relay;
    config.upstream.relay = Some(RelayConfig {
        endpoint: format!("http://{relay}/raw"),
        query_param: "url".into(),
    });
    config
}

#[tokio::test]
async fn test_relay_receives_target_and_body_is_rewritten_against_it() {
    let (relay, recorded) = start_mock_upstream(|_| {
        MockResponse::new(200, "text/html", r#"<head></head><a href="/about">a</a>"#)
            .header("X-Frame-Options", "DENY")
    })
    .await;
    let (proxy, _shutdown) = start_proxy(relay_config(relay)).await;

    let res = client()
        .get(proxied_url(proxy, "https://site.example/page"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().get("x-frame-options").is_none());
    assert_eq!(res.headers()["access-control-allow-origin"], "*");

    let body = res.text().await.unwrap();
    assert!(body.starts_with(r#"<head><base href="https://site.example/page">"#));
    assert!(body.contains(&address_for("https://site.example/about")));

    assert_eq!(
        request_path(&recorded.last_head()),
        "/raw?url=https%3A%2F%2Fsite.example%2Fpage"
    );
}

#[tokio::test]
async fn test_healthz_reports_relay() {
    let (relay, _) = start_mock_upstream(|_| MockResponse::new(200, "text/plain", "")).await;
    let (proxy, _shutdown) = start_proxy(relay_config(relay)).await;

    let health: serde_json::Value = client()
        .get(format!("http://{proxy}/healthz"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["strategy"], "relay");
}

#[tokio::test]
async fn test_relay_failure_is_html_error_page() {
    let (relay, _) = start_mock_upstream(|_| MockResponse::new(502, "text/plain", "bad gateway")).await;
    let (proxy, _shutdown) = start_proxy(relay_config(relay)).await;

    let res = client()
        .get(proxied_url(proxy, "https://site.example/"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    assert!(res.headers()["content-type"].to_str().unwrap().starts_with("text/html"));

    let body = res.text().await.unwrap();
    assert!(body.contains("https://site.example/"));
    assert!(body.contains("relay responded with 502"));
}

#[tokio::test]
async fn test_relay_rejects_non_get_without_contacting_relay() {
    let (relay, recorded) = start_mock_upstream(|_| MockResponse::new(200, "text/plain", "ok")).await;
    let mut config = relay_config(relay);
    config.proxy.error_page = Some(rewrite_proxy::config::ErrorPageFormat::Plain);
    let (proxy, _shutdown) = start_proxy(config).await;

    let res = client()
        .post(proxied_url(proxy, "https://site.example/form"))
        .body("a=1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    let body = res.text().await.unwrap();
    assert!(body.starts_with("Proxy Error: relay strategy only supports GET"));
    assert!(recorded.heads().is_empty());
}
