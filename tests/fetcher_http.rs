//! HTTP-level tests for the page fetcher against a local mock server.
//!
//! The fetcher is blocking, so each call runs inside `spawn_blocking`.

use book_etl_lib::config::{FetchConfig, SelectorConfig};
use book_etl_lib::{FetchError, ListingExtractor, PageFetcher, PageSource, Paginator, StopReason};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> FetchConfig {
    FetchConfig {
        endpoint: format!("{}/s", server.uri()),
        timeout_secs: 5,
        ..FetchConfig::default()
    }
}

async fn fetch(config: FetchConfig, page: u32) -> Result<String, FetchError> {
    tokio::task::spawn_blocking(move || {
        let fetcher = PageFetcher::new(&config).unwrap();
        fetcher.fetch_page(page)
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_sends_profile_headers_and_query() {
    // --- 1. Arrange ---
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s"))
        .and(query_param("k", "data engineering books"))
        .and(query_param("page", "2"))
        .and(header("referer", "https://www.amazon.com/"))
        .and(header("sec-ch-ua", "Not_A Brand"))
        .and(header("sec-ch-ua-mobile", "?0"))
        .and(header("sec-ch-ua-platform", "Windows"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>page two</html>"))
        .expect(1)
        .mount(&server)
        .await;

    // --- 2. Act ---
    let result = fetch(config_for(&server), 2).await;

    // --- 3. Assert ---
    assert_eq!(result.unwrap(), "<html>page two</html>");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_non_200_is_fetch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let result = fetch(config_for(&server), 1).await;

    match result {
        Err(FetchError::Status { page, status }) => {
            assert_eq!(page, 1);
            assert_eq!(status, 503);
        }
        other => panic!("Expected status failure, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_other_success_codes_are_failures_too() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let result = fetch(config_for(&server), 1).await;
    assert!(matches!(result, Err(FetchError::Status { status: 204, .. })));
}

#[test]
fn test_unreachable_host_stops_walk_with_transport_failure() {
    // nothing listens on the discard port
    let config = FetchConfig {
        endpoint: "http://127.0.0.1:9/s".to_string(),
        timeout_secs: 5,
        ..FetchConfig::default()
    };
    let fetcher = PageFetcher::new(&config).unwrap();
    let extractor = ListingExtractor::new(&SelectorConfig::default()).unwrap();

    let harvest = Paginator::new(&fetcher, &extractor, 20).collect(3);

    assert!(harvest.batch.is_empty());
    assert_eq!(harvest.pages_fetched, 0);
    assert!(matches!(
        harvest.stop,
        StopReason::FetchFailed(FetchError::Transport { page: 1, .. })
    ));
}
