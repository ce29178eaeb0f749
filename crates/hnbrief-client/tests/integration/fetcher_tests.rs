use std::time::Duration;

use hnbrief_core::{AppError, Fetcher};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::integration::common::*;

#[tokio::test]
async fn fetches_html_with_content_type() {
    let server = MockServer::start().await;
    mount_page(&server, "/article", html(ARTICLE_HTML)).await;

    let page = fetcher(http_client())
        .fetch(&format!("{}/article", server.uri()))
        .await
        .unwrap();

    assert_eq!(page.content_type.as_deref(), Some("text/html; charset=utf-8"));
    assert_eq!(page.body, ARTICLE_HTML.as_bytes());
    assert!(page.final_url.ends_with("/article"));
}

#[tokio::test]
async fn sends_user_agent_and_accept_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/strict"))
        .and(header_exists("accept"))
        .respond_with(html(ARTICLE_HTML))
        .expect(1)
        .mount(&server)
        .await;

    let page = fetcher(http_client())
        .fetch(&format!("{}/strict", server.uri()))
        .await
        .unwrap();
    assert!(!page.body.is_empty());

    let requests = server.received_requests().await.unwrap();
    let headers = &requests[0].headers;
    let agent = headers.get("user-agent").unwrap().to_str().unwrap();
    assert!(agent.starts_with("hnbrief/"));
    let accept = headers.get("accept").unwrap().to_str().unwrap();
    assert!(accept.starts_with("text/html"));
}

#[tokio::test]
async fn error_status_is_http_status() {
    let server = MockServer::start().await;
    mount_page(&server, "/forbidden", ResponseTemplate::new(403)).await;

    let err = fetcher(http_client())
        .fetch(&format!("{}/forbidden", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::HttpStatus { status: 403, .. }));
}

#[tokio::test]
async fn non_html_is_rejected() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/image.png",
        ResponseTemplate::new(200).set_body_raw(vec![0x89, b'P', b'N', b'G'], "image/png"),
    )
    .await;

    let err = fetcher(http_client())
        .fetch(&format!("{}/image.png", server.uri()))
        .await
        .unwrap_err();

    match err {
        AppError::UnsupportedContentType(ct) => assert_eq!(ct, "image/png"),
        other => panic!("expected UnsupportedContentType, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/slow",
        html(ARTICLE_HTML).set_delay(Duration::from_secs(5)),
    )
    .await;

    let err = fetcher(http_client())
        .with_timeout(Duration::from_millis(300))
        .fetch(&format!("{}/slow", server.uri()))
        .await
        .unwrap_err();

    assert!(
        matches!(err, AppError::Timeout(after) if after == Duration::from_millis(300)),
        "{err:?}"
    );
    assert!(err.to_string().ends_with("after 300ms"));
}

#[tokio::test]
async fn refused_connection_is_network_error() {
    // Nothing listens on port 1.
    let err = fetcher(http_client())
        .fetch("http://127.0.0.1:1/article")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NetworkError(_)), "{err:?}");
}

#[tokio::test]
async fn loopback_is_blocked_with_ssrf_guard() {
    let server = MockServer::start().await;
    mount_page(&server, "/article", html(ARTICLE_HTML)).await;

    let guarded = hnbrief_client::ReqwestFetcher::with_client(http_client());
    let err = guarded
        .fetch(&format!("{}/article", server.uri()))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("SSRF blocked"));
    assert!(server.received_requests().await.unwrap().is_empty());
}
