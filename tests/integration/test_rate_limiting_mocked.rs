//! Throttling tests: calls on one session stay inside the configured budget

mod common;

use std::time::{Duration, Instant};

use common::*;
use tracing::info;
use tracing_test::traced_test;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer};
use wos_client::{ClientConfig, SearchOptions, WosClient, WosError, paging};

fn throttled_client(mock_server: &MockServer, calls: u32, window: Duration) -> WosClient {
    let config = ClientConfig::new()
        .with_base_url(mock_server.uri())
        .with_sid(TEST_SID)
        .with_close_on_exit(false)
        .with_throttle(calls, window);

    WosClient::with_config(config).expect("client should build")
}

async fn mount_search(mock_server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(xml_response(premium_search_response(
            "search",
            1,
            &uids(1, 1),
        )))
        .expect(expected)
        .mount(mock_server)
        .await;
}

#[tokio::test]
#[traced_test]
async fn test_third_call_waits_for_window() {
    let mock_server = MockServer::start().await;
    mount_search(&mock_server, 3).await;

    let client = throttled_client(&mock_server, 2, Duration::from_secs(1));

    let start = Instant::now();
    for _ in 0..3 {
        client
            .search("AU=Knuth", 1, 1, &SearchOptions::default())
            .await
            .expect("search should succeed");
    }
    let elapsed = start.elapsed();

    info!(elapsed_ms = elapsed.as_millis(), "Three throttled searches");
    // Two tokens are available up front; the third call waits half a window
    assert!(
        elapsed >= Duration::from_millis(450),
        "third call should have been delayed, took {elapsed:?}"
    );
}

#[tokio::test]
#[traced_test]
async fn test_calls_within_budget_are_not_delayed() {
    let mock_server = MockServer::start().await;
    mount_search(&mock_server, 2).await;

    let client = throttled_client(&mock_server, 2, Duration::from_secs(1));

    let start = Instant::now();
    for _ in 0..2 {
        client
            .search("AU=Knuth", 1, 1, &SearchOptions::default())
            .await
            .unwrap();
    }

    assert!(start.elapsed() < Duration::from_millis(400));
}

#[tokio::test]
#[traced_test]
async fn test_paged_query_is_throttled() {
    let mock_server = MockServer::start().await;
    mount_search(&mock_server, 3).await;

    let client = throttled_client(&mock_server, 2, Duration::from_secs(1));

    let start = Instant::now();
    paging::query(&client, "AU=Knuth", Some("./REC/UID"), 3, 1, 1)
        .await
        .expect("paged query should succeed");

    assert!(start.elapsed() >= Duration::from_millis(450));
}

#[tokio::test]
#[traced_test]
async fn test_rejected_calls_do_not_consume_budget() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEARCH_LITE_PATH))
        .respond_with(xml_response(lite_search_response(1, &uids(1, 1))))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = ClientConfig::new()
        .with_base_url(mock_server.uri())
        .with_lite(true)
        .with_sid(TEST_SID)
        .with_close_on_exit(false)
        .with_throttle(2, Duration::from_secs(1));
    let client = WosClient::with_config(config).unwrap();

    for _ in 0..5 {
        assert!(matches!(
            client.cited_references("WOS:1", 1, 1).await,
            Err(WosError::PremiumRequired { .. })
        ));
    }

    let start = Instant::now();
    for _ in 0..2 {
        client
            .search("TS=graphene", 1, 1, &SearchOptions::default())
            .await
            .unwrap();
    }
    assert!(start.elapsed() < Duration::from_millis(400));
}

#[tokio::test]
#[traced_test]
async fn test_unthrottled_client() {
    let mock_server = MockServer::start().await;
    mount_search(&mock_server, 5).await;

    let client = create_connected_client(&mock_server, false);

    let start = Instant::now();
    for _ in 0..5 {
        client
            .search("AU=Knuth", 1, 1, &SearchOptions::default())
            .await
            .unwrap();
    }

    assert!(start.elapsed() < Duration::from_millis(400));
}

#[tokio::test]
#[traced_test]
async fn test_concurrent_searches_are_delayed_not_rejected() {
    let mock_server = MockServer::start().await;
    mount_search(&mock_server, 3).await;

    let client = throttled_client(&mock_server, 1, Duration::from_millis(200));
    let options = SearchOptions::default();

    let start = Instant::now();
    let (a, b, c) = tokio::join!(
        client.search("AU=Knuth", 1, 1, &options),
        client.search("AU=Dijkstra", 1, 1, &options),
        client.search("AU=Hoare", 1, 1, &options),
    );

    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert!(start.elapsed() >= Duration::from_millis(380));
}
