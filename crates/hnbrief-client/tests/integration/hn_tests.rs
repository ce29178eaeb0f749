use hnbrief_client::Feed;
use hnbrief_core::{AppError, ItemSource};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::integration::common::*;

async fn mount_listing(server: &MockServer, endpoint: &str, ids: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/v0/{endpoint}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(ids))
        .mount(server)
        .await;
}

#[tokio::test]
async fn story_ids_are_truncated_in_ranking_order() {
    let server = MockServer::start().await;
    mount_listing(&server, "newstories.json", json!([45, 44, 43, 42, 41])).await;

    let ids = hn_client(&server, http_client())
        .story_ids(Feed::New, 3)
        .await
        .unwrap();

    assert_eq!(ids, vec![id(45), id(44), id(43)]);
}

#[tokio::test]
async fn each_feed_reads_its_own_listing() {
    let server = MockServer::start().await;
    mount_listing(&server, "topstories.json", json!([1, 2])).await;
    mount_listing(&server, "beststories.json", json!([3])).await;

    let client = hn_client(&server, http_client());
    assert_eq!(client.story_ids(Feed::Top, 10).await.unwrap(), vec![id(1), id(2)]);
    assert_eq!(client.story_ids(Feed::Best, 10).await.unwrap(), vec![id(3)]);
}

#[tokio::test]
async fn listing_failure_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/newstories.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = hn_client(&server, http_client())
        .story_ids(Feed::New, 5)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::HttpStatus { status: 500, .. }));
}

#[tokio::test]
async fn malformed_listing_is_rejected() {
    let server = MockServer::start().await;
    mount_listing(&server, "newstories.json", json!({ "ids": [1, 2] })).await;

    let err = hn_client(&server, http_client())
        .story_ids(Feed::New, 5)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::MalformedPayload(_)));
}

#[tokio::test]
async fn get_item_maps_null_to_none() {
    let server = MockServer::start().await;
    mount_item(&server, 7, story(&server, 7, "/article")).await;
    mount_item(&server, 8, serde_json::Value::Null).await;

    let client = hn_client(&server, http_client());
    let found = client.get_item(id(7)).await.unwrap().unwrap();
    assert_eq!(found["title"], "Story 7");
    assert!(client.get_item(id(8)).await.unwrap().is_none());
}
