//! Integration tests for the CDX index client against a stub endpoint.
//!
//! These tests verify:
//! - Row order is preserved as sent by the index
//! - Both response encodings, header rows and malformed rows
//! - Error mapping for non-2xx answers and transport failures
//! - Request parameters of the convenience queries

mod helpers;

use std::time::Duration;

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use helpers::{index_client, json_body, row, text_body, StubIndex};
use wayback_harvest::cdx::{MatchType, OutputFormat};
use wayback_harvest::config::IndexClientConfig;
use wayback_harvest::{Error, IndexClient};

#[tokio::test]
async fn test_search_preserves_remote_row_order() {
    let server = MockServer::start().await;
    let rows = vec![
        row("20200301000000", "C"),
        row("20200101000000", "A"),
        row("20200201000000", "B"),
    ];
    Mock::given(method("GET"))
        .and(path("/cdx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(json_body(&rows)))
        .mount(&server)
        .await;

    let client = index_client(&server);
    let spec = client.query("example.com").build().unwrap();
    let records = client.search(&spec).await.unwrap();

    let stamps: Vec<&str> = records.iter().map(|r| r.timestamp.as_str()).collect();
    assert_eq!(
        stamps,
        vec!["20200301000000", "20200101000000", "20200201000000"]
    );
}

#[tokio::test]
async fn test_text_output_with_header_and_malformed_row() {
    let server = MockServer::start().await;
    let mut body = String::from("urlkey timestamp original mimetype statuscode digest length\n");
    body.push_str(&text_body(&[row("20200101000000", "A")]));
    body.push_str("garbage\n");
    body.push_str(&text_body(&[row("20200102000000", "B")]));
    Mock::given(method("GET"))
        .and(path("/cdx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let client = index_client(&server);
    let spec = client
        .query("example.com")
        .output(OutputFormat::Text)
        .build()
        .unwrap();
    let response = client.execute(&spec).await.unwrap();
    assert_eq!(response.records.len(), 2);
    assert_eq!(response.skipped_rows, 1);
}

#[tokio::test]
async fn test_empty_result_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let client = index_client(&server);
    let spec = client.query("example.com").build().unwrap();
    assert!(client.search(&spec).await.unwrap().is_empty());
    assert!(client.get_latest("example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_non_success_status_is_index_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(403).set_body_string("org.archive.wayback.exception.AdministrativeAccessControlException: Blocked Site Error"),
        )
        .mount(&server)
        .await;

    let client = index_client(&server);
    let spec = client.query("blocked.example").build().unwrap();
    match client.search(&spec).await {
        Err(Error::Index {
            status_code,
            body_excerpt,
        }) => {
            assert_eq!(status_code, 403);
            assert!(body_excerpt.contains("Blocked Site Error"));
        }
        other => panic!("expected index error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let config = IndexClientConfig {
        endpoint: format!("{}/cdx", server.uri()),
        timeout: Duration::from_millis(200),
        ..Default::default()
    };
    let client = IndexClient::new(config).unwrap();
    let spec = client.query("example.com").build().unwrap();
    let err = client.search(&spec).await.unwrap_err();
    assert!(matches!(err, Error::Transport(ref e) if e.is_timeout()), "{err:?}");
}

#[tokio::test]
async fn test_latest_and_oldest_request_single_sorted_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("sort", "reverse"))
        .and(query_param("limit", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(json_body(&[row("20231231000000", "Z")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("sort", "regular"))
        .and(query_param("limit", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(json_body(&[row("19990101000000", "A")])),
        )
        .mount(&server)
        .await;

    let client = index_client(&server);
    let latest = client.get_latest("example.com").await.unwrap().unwrap();
    let oldest = client.get_oldest("example.com").await.unwrap().unwrap();
    assert_eq!(latest.timestamp, "20231231000000");
    assert_eq!(oldest.timestamp, "19990101000000");
}

#[tokio::test]
async fn test_get_closest_ranks_locally() {
    let server = MockServer::start().await;
    // Deliberately not in distance order
    let rows = vec![
        row("20200110000000", "A"),
        row("20200104000000", "B"),
        row("20200106000000", "C"),
    ];
    Mock::given(method("GET"))
        .and(query_param("sort", "closest"))
        .and(query_param("closest", "20200105000000"))
        .respond_with(ResponseTemplate::new(200).set_body_string(json_body(&rows)))
        .mount(&server)
        .await;

    let client = index_client(&server);
    let closest = client.get_closest("example.com", "20200105").await.unwrap();
    assert_eq!(closest.unwrap().timestamp, "20200104000000");
}

#[tokio::test]
async fn test_year_prefix_is_sent_expanded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("from", "20200101000000"))
        .and(query_param("to", "20201231235959"))
        .and(query_param("matchType", "prefix"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let client = index_client(&server);
    let spec = client
        .query("example.com")
        .match_type(MatchType::Prefix)
        .from_date("2020")
        .to_date("2020")
        .build()
        .unwrap();
    client.search(&spec).await.unwrap();
}

#[tokio::test]
async fn test_auth_token_is_sent_as_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("cookie", "cdx-auth-token=s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let config = IndexClientConfig {
        endpoint: format!("{}/cdx", server.uri()),
        auth_token: Some("s3cret".to_string()),
        ..Default::default()
    };
    let client = IndexClient::new(config).unwrap();
    let spec = client.query("example.com").build().unwrap();
    client.search(&spec).await.unwrap();
}

#[tokio::test]
async fn test_get_num_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cdx"))
        .respond_with(StubIndex::new(helpers::hourly_rows(25)))
        .mount(&server)
        .await;

    let client = index_client(&server);
    let pages = client
        .get_num_pages("example.com", Some(MatchType::Exact), Some(10))
        .await
        .unwrap();
    assert_eq!(pages, 3);
}

#[tokio::test]
async fn test_invalid_query_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = index_client(&server);
    let result = client
        .query("example.com")
        .sort(wayback_harvest::cdx::SortType::Closest)
        .build();
    assert!(matches!(result, Err(Error::Configuration(_))));
}
