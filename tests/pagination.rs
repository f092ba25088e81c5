//! Integration tests for page-indexed and resume-key iteration.
//!
//! A stateful stub index serves 25 records; both strategies must yield the
//! same records in batches of 10, 10 and 5.

mod helpers;

use futures::TryStreamExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer};

use helpers::{hourly_rows, index_client, StubIndex};
use wayback_harvest::cdx::{OutputFormat, PageIterator, ResumeKeyIterator};
use wayback_harvest::{CaptureRecord, Error};

async fn stub_server(stub: StubIndex) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cdx"))
        .respond_with(stub)
        .mount(&server)
        .await;
    server
}

fn sizes(batches: &[Vec<CaptureRecord>]) -> Vec<usize> {
    batches.iter().map(Vec::len).collect()
}

#[tokio::test]
async fn test_page_and_resume_iteration_agree() {
    let server = stub_server(StubIndex::new(hourly_rows(25))).await;
    let client = index_client(&server);

    let paged_spec = client.query("example.com").page_size(10).build().unwrap();
    let mut pages = PageIterator::new(client.clone(), paged_spec);
    let mut page_batches = Vec::new();
    while let Some(batch) = pages.next_batch().await.unwrap() {
        page_batches.push(batch);
    }

    let resume_spec = client.query("example.com").build().unwrap();
    let mut resumed = ResumeKeyIterator::new(client, resume_spec, 10).unwrap();
    let mut resume_batches = Vec::new();
    while let Some(batch) = resumed.next_batch().await.unwrap() {
        resume_batches.push(batch);
    }

    assert_eq!(sizes(&page_batches), vec![10, 10, 5]);
    assert_eq!(sizes(&resume_batches), vec![10, 10, 5]);
    assert_eq!(
        page_batches.concat(),
        resume_batches.concat(),
        "both strategies must return the same records in the same order"
    );
}

#[tokio::test]
async fn test_text_output_resume_iteration() {
    let server = stub_server(StubIndex::new(hourly_rows(25))).await;
    let client = index_client(&server);

    let spec = client
        .query("example.com")
        .output(OutputFormat::Text)
        .build()
        .unwrap();
    let batches: Vec<Vec<CaptureRecord>> = ResumeKeyIterator::new(client, spec, 10)
        .unwrap()
        .into_stream()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(sizes(&batches), vec![10, 10, 5]);
}

#[tokio::test]
async fn test_key_only_response_means_more_data() {
    let stub = StubIndex::new(hourly_rows(25)).with_key_only_first_response();
    let server = stub_server(stub.clone()).await;
    let client = index_client(&server);

    let spec = client.query("example.com").build().unwrap();
    let mut iter = ResumeKeyIterator::new(client, spec, 10).unwrap();
    let mut total = 0;
    while let Some(batch) = iter.next_batch().await.unwrap() {
        assert!(!batch.is_empty());
        total += batch.len();
    }
    assert_eq!(total, 25);
    // One key-only response plus three data batches
    assert_eq!(stub.request_count(), 4);
}

#[tokio::test]
async fn test_resume_iteration_restarts_from_scratch() {
    let server = stub_server(StubIndex::new(hourly_rows(25))).await;
    let client = index_client(&server);

    let spec = client.query("example.com").build().unwrap();
    let mut iter = ResumeKeyIterator::new(client, spec, 10).unwrap();
    let first = iter.next_batch().await.unwrap().unwrap();
    assert_eq!(iter.resume_key(), Some("key-10"));

    iter.reset();
    assert_eq!(iter.resume_key(), None);
    let again = iter.next_batch().await.unwrap().unwrap();
    assert_eq!(first, again);
}

#[tokio::test]
async fn test_page_iterator_is_restartable_and_respects_probe() {
    let stub = StubIndex::new(hourly_rows(20));
    let server = stub_server(stub.clone()).await;
    let client = index_client(&server);

    let spec = client.query("example.com").page_size(10).build().unwrap();
    let mut pages = PageIterator::with_page_count(client, spec).await.unwrap();
    assert_eq!(pages.num_pages(), Some(2));

    let batches: Vec<Vec<CaptureRecord>> = {
        let mut out = Vec::new();
        while let Some(batch) = pages.next_batch().await.unwrap() {
            out.push(batch);
        }
        out
    };
    // 20 rows fill both pages exactly; the probe stops iteration without
    // requesting an empty third page
    assert_eq!(sizes(&batches), vec![10, 10]);
    assert_eq!(stub.request_count(), 3);

    pages.reset();
    assert_eq!(pages.next_batch().await.unwrap().map(|b| b.len()), Some(10));
}

#[tokio::test]
async fn test_zero_batch_size_is_rejected() {
    let server = MockServer::start().await;
    let client = index_client(&server);
    let spec = client.query("example.com").build().unwrap();
    assert!(matches!(
        ResumeKeyIterator::new(client, spec, 0),
        Err(Error::Configuration(_))
    ));
}
