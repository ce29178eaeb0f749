use std::time::Duration;

use hnbrief_client::{ClientConfig, HnApiClient, ReadabilityExtractor, ReqwestFetcher, build_http_client};
use hnbrief_core::{EnrichConfig, EnrichmentCoordinator, ItemId};
use reqwest::Client;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ARTICLE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Scaling a tiny queue</title><script>track();</script></head>
<body>
  <nav><a href="/">Home</a> <a href="/archive">Archive</a></nav>
  <article class="post">
    <h1>Scaling a tiny queue</h1>
    <p>We run a small job queue on a single Postgres table, and for years it handled
       every workload we threw at it without complaint, until the night it did not.</p>
    <p>The fix was not a new broker. We added a partial index on pending rows, moved
       retries to a separate column, and switched workers to SKIP LOCKED polling.</p>
    <p>Throughput went up by an order of magnitude, latency dropped, and the on-call
       rotation finally got a quiet week, which was the real goal all along.</p>
  </article>
  <footer><p>Copyright 2025, the queue people, all rights reserved.</p></footer>
</body>
</html>"#;

/// A paywall notice and nothing else.
pub const PAYWALL_STUB: &str =
    "<html><body><p>Subscribe to keep reading this article now.</p></body></html>";

pub fn id(raw: u64) -> ItemId {
    ItemId::new(raw).unwrap()
}

pub fn http_client() -> Client {
    build_http_client(&ClientConfig::default()).unwrap()
}

pub fn hn_client(server: &MockServer, client: Client) -> HnApiClient {
    HnApiClient::new(client).with_base_url(&format!("{}/v0", server.uri()))
}

/// The mock server listens on loopback, so the SSRF guard must be off.
pub fn fetcher(client: Client) -> ReqwestFetcher {
    ReqwestFetcher::with_client(client).allow_private_urls()
}

pub fn coordinator(
    server: &MockServer,
    fetch_timeout: Duration,
) -> EnrichmentCoordinator<HnApiClient, ReqwestFetcher, ReadabilityExtractor> {
    let client = http_client();
    EnrichmentCoordinator::new(
        hn_client(server, client.clone()),
        fetcher(client),
        ReadabilityExtractor::new(),
        EnrichConfig::default().with_fetch_timeout(fetch_timeout),
    )
    .unwrap()
}

pub fn story(server: &MockServer, raw_id: u64, page: &str) -> Value {
    json!({
        "id": raw_id,
        "type": "story",
        "by": "alice",
        "time": 1_700_000_000,
        "title": format!("Story {raw_id}"),
        "url": format!("{}{page}", server.uri()),
        "score": 42,
        "descendants": 7,
    })
}

pub async fn mount_item(server: &MockServer, raw_id: u64, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/v0/item/{raw_id}.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_page(server: &MockServer, page: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(response)
        .mount(server)
        .await;
}

pub fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=utf-8")
}
