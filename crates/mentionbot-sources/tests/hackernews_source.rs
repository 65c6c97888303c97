//! Integration tests for `HackerNewsSource`.

use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mentionbot_sources::{FetchContext, HackerNewsSource, MentionSource, SourceSettings};

fn test_source(server: &MockServer) -> HackerNewsSource {
    let settings = SourceSettings {
        timeout: Duration::from_secs(5),
        user_agent: "mentionbot-test/0.1".to_owned(),
        max_retries: 0,
        backoff_base_ms: 0,
    };
    HackerNewsSource::with_base_url(settings, &server.uri())
        .expect("failed to build test HackerNewsSource")
}

fn ctx() -> FetchContext {
    FetchContext::with_timeout(Duration::from_secs(30))
}

async fn mount_item(server: &MockServer, id: u64, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/item/{id}.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn keeps_matching_items_and_skips_failures() {
    let server = MockServer::start().await;
    let now = Utc::now().timestamp();

    Mock::given(method("GET"))
        .and(path("/newstories.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2, 3, 4])))
        .mount(&server)
        .await;

    mount_item(
        &server,
        1,
        json!({"id": 1, "type": "story", "by": "alice", "time": now, "title": "Show HN: AKS cost dashboard", "url": "https://example.com/aks", "score": 50, "descendants": 12}),
    )
    .await;
    mount_item(
        &server,
        2,
        json!({"id": 2, "type": "story", "by": "bob", "time": now, "title": "Rust in the kernel"}),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/item/3.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_item(&server, 4, serde_json::Value::Null).await;

    let mentions = test_source(&server)
        .fetch_mentions(&ctx(), &["AKS".to_owned()], Duration::from_secs(86_400))
        .await
        .expect("per-item failures must not fail the fetch");

    assert_eq!(mentions.len(), 1);
    let m = &mentions[0];
    assert_eq!(m.id, "hackernews_1");
    assert_eq!(m.url, "https://example.com/aks");
    assert_eq!(m.platform, "Hacker News");
    assert_eq!(m.comment_count, 12);
}

#[tokio::test]
async fn newstories_failure_is_a_total_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/newstories.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = test_source(&server)
        .fetch_mentions(&ctx(), &["AKS".to_owned()], Duration::from_secs(86_400))
        .await;

    assert!(result.is_err(), "expected Err, got: {result:?}");
}

#[tokio::test]
async fn stale_batch_ends_the_walk() {
    let server = MockServer::start().await;
    let stale = (Utc::now() - chrono::Duration::days(3)).timestamp();

    let ids: Vec<u64> = (1..=15).collect();
    Mock::given(method("GET"))
        .and(path("/newstories.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(ids)))
        .mount(&server)
        .await;

    for id in 1..=10 {
        mount_item(
            &server,
            id,
            json!({"id": id, "type": "story", "time": stale, "title": "AKS old news"}),
        )
        .await;
    }
    Mock::given(method("GET"))
        .and(path("/item/11.json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mentions = test_source(&server)
        .fetch_mentions(&ctx(), &["AKS".to_owned()], Duration::from_secs(86_400))
        .await
        .unwrap();

    assert!(mentions.is_empty());
}

#[tokio::test]
async fn rate_limited_story_list_yields_empty_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/newstories.json"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
        .mount(&server)
        .await;

    let mentions = test_source(&server)
        .fetch_mentions(&ctx(), &["AKS".to_owned()], Duration::from_secs(86_400))
        .await
        .expect("rate limits are not errors");

    assert!(mentions.is_empty());
}

#[tokio::test]
async fn rate_limited_item_is_skipped() {
    let server = MockServer::start().await;
    let now = Utc::now().timestamp();

    Mock::given(method("GET"))
        .and(path("/newstories.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/item/1.json"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    mount_item(
        &server,
        2,
        json!({"id": 2, "type": "story", "by": "carol", "time": now, "title": "AKS egress gateway"}),
    )
    .await;

    let mentions = test_source(&server)
        .fetch_mentions(&ctx(), &["AKS".to_owned()], Duration::from_secs(86_400))
        .await
        .expect("rate limits are not errors");

    assert_eq!(mentions.len(), 1);
    assert_eq!(mentions[0].id, "hackernews_2");
    assert_eq!(mentions[0].url, "https://news.ycombinator.com/item?id=2");
}
