//! Paged query tests: stride planning, reassembly and extraction over mocked pages

mod common;

use common::*;
use tracing_test::traced_test;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer};
use wos_client::paging::{self, QueryResult, XmlPath};
use wos_client::WosError;

/// Mount one premium page answering the `(first, count)` window
async fn mount_premium_page(mock_server: &MockServer, first: u32, count: u32) {
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_string_contains(format!(
            "<firstRecord>{first}</firstRecord><count>{count}</count>"
        )))
        .respond_with(xml_response(premium_search_response(
            "search",
            1000,
            &uids(first, count),
        )))
        .expect(1)
        .mount(mock_server)
        .await;
}

#[tokio::test]
#[traced_test]
async fn test_query_splits_into_bounded_pages() {
    let mock_server = MockServer::start().await;
    mount_premium_page(&mock_server, 1, 100).await;
    mount_premium_page(&mock_server, 101, 100).await;
    mount_premium_page(&mock_server, 201, 50).await;

    let client = create_connected_client(&mock_server, false);
    let result = paging::query(&client, "TS=rust", Some("./REC/UID"), 250, 1, 100)
        .await
        .expect("paged query should succeed");

    assert_eq!(result.into_values(), uids(1, 250));

    let windows: Vec<(u32, u32)> = received_bodies(&mock_server, SEARCH_PATH)
        .await
        .iter()
        .map(|body| retrieve_window(body))
        .collect();
    assert_eq!(windows, vec![(1, 100), (101, 100), (201, 50)]);
}

#[tokio::test]
#[traced_test]
async fn test_small_query_is_a_single_request() {
    let mock_server = MockServer::start().await;
    mount_premium_page(&mock_server, 1, 100).await;

    let client = create_connected_client(&mock_server, false);
    let values = paging::query(&client, "TS=rust", Some("./REC/UID"), 100, 1, 100)
        .await
        .unwrap()
        .into_values();

    assert_eq!(values.len(), 100);
    assert_eq!(received_bodies(&mock_server, SEARCH_PATH).await.len(), 1);
}

#[tokio::test]
#[traced_test]
async fn test_query_reassembles_single_document() {
    let mock_server = MockServer::start().await;
    mount_premium_page(&mock_server, 51, 100).await;
    mount_premium_page(&mock_server, 151, 20).await;

    let client = create_connected_client(&mock_server, false);
    let result = paging::query(&client, "TS=rust", None, 120, 51, 100)
        .await
        .unwrap();
    let document = result.as_document().expect("document result");

    assert!(document.starts_with("<?xml version=\"1.0\" ?>\n<records>\n"));
    assert!(document.ends_with("\n</records>"));
    assert_eq!(document.matches("<?xml").count(), 1);
    assert_eq!(document.matches("<records").count(), 1);
    assert_eq!(document.matches("<REC ").count(), 120);
    assert!(!document.lines().any(|line| line.trim().is_empty()));

    // The records namespace is removed, the per-record one survives
    assert!(!document.contains("wok5.4/public/FullRecord"));
    assert_eq!(
        document
            .matches(r#"<abstract_text xmlns="http://example.org/abstract">"#)
            .count(),
        120
    );

    // Extraction from the stitched document equals per-page extraction
    let from_document = XmlPath::parse("./REC/UID").unwrap().select(document).unwrap();
    assert_eq!(from_document, uids(51, 120));
}

#[tokio::test]
#[traced_test]
async fn test_extraction_round_trip_matches_pages() {
    let mock_server = MockServer::start().await;
    for (first, count) in [(1, 100), (101, 100), (201, 50)] {
        Mock::given(method("POST"))
            .and(path(SEARCH_PATH))
            .and(body_string_contains(format!(
                "<firstRecord>{first}</firstRecord><count>{count}</count>"
            )))
            .respond_with(xml_response(premium_search_response(
                "search",
                250,
                &uids(first, count),
            )))
            .mount(&mock_server)
            .await;
    }

    let client = create_connected_client(&mock_server, false);
    let path = ".//abstract_text";

    let aggregated = paging::query(&client, "TS=rust", None, 250, 1, 100)
        .await
        .unwrap();
    let from_aggregate = XmlPath::parse(path)
        .unwrap()
        .select(aggregated.as_document().unwrap())
        .unwrap();

    let mut from_pages = Vec::new();
    for (first, count) in [(1, 100), (101, 100), (201, 50)] {
        let page = paging::single(&client, "TS=rust", Some(path), count, first)
            .await
            .unwrap();
        from_pages.extend(page.into_values());
    }

    assert_eq!(from_aggregate.len(), 250);
    assert_eq!(from_aggregate, from_pages);
}

#[tokio::test]
#[traced_test]
async fn test_zero_count_returns_summary() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_string_contains("<firstRecord>1</firstRecord><count>0</count>"))
        .respond_with(xml_response(summary_response(4321)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_connected_client(&mock_server, false);
    let result = paging::query(&client, "TS=rust", Some("./REC/UID"), 0, 1, 100)
        .await
        .unwrap();

    match result {
        QueryResult::Summary(summary) => {
            assert_eq!(summary.records_found, 4321);
            assert_eq!(summary.query_id.as_deref(), Some("4"));
        }
        other => panic!("expected summary, got {other:?}"),
    }
}

#[tokio::test]
#[traced_test]
async fn test_single_pretty_prints_page() {
    let mock_server = MockServer::start().await;
    mount_premium_page(&mock_server, 1, 2).await;

    let client = create_connected_client(&mock_server, false);
    let result = paging::single(&client, "TS=rust", None, 2, 1).await.unwrap();
    let document = result.as_document().unwrap();

    let lines: Vec<&str> = document.lines().take(4).collect();
    assert_eq!(
        lines,
        vec![
            "<?xml version=\"1.0\" ?>",
            "<records>",
            "    <REC r_id_disclaimer=\"ResearcherID data provided by Clarivate\">",
            "        <UID>WOS:000000000001</UID>",
        ]
    );
}

#[tokio::test]
#[traced_test]
async fn test_failed_page_aborts_query() {
    let mock_server = MockServer::start().await;
    mount_premium_page(&mock_server, 1, 100).await;

    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_string_contains("<firstRecord>101</firstRecord>"))
        .respond_with(fault(fault_response("Invalid session ID")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_string_contains("<firstRecord>201</firstRecord>"))
        .respond_with(xml_response(premium_search_response("search", 0, &[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_connected_client(&mock_server, false);
    let result = paging::query(&client, "TS=rust", Some("./REC/UID"), 300, 1, 100).await;

    assert!(matches!(result, Err(WosError::SoapFault { .. })));
}

#[tokio::test]
#[traced_test]
async fn test_invalid_path_fails_before_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(xml_response(summary_response(0)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_connected_client(&mock_server, false);
    let result = paging::query(&client, "TS=rust", Some("/records/REC"), 10, 1, 100).await;

    assert!(matches!(result, Err(WosError::InvalidPath(_))));
}

#[tokio::test]
#[traced_test]
async fn test_doi_to_wos() {
    let mock_server = MockServer::start().await;

    let body = premium_search_response("search", 1, &["WOS:000123456789".to_string()]);
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_string_contains(
            "<userQuery>DO=&quot;10.1145/2180861.2180863&quot;</userQuery>",
        ))
        .and(body_string_contains("<firstRecord>1</firstRecord><count>1</count>"))
        .respond_with(xml_response(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_connected_client(&mock_server, false);
    let uid = paging::doi_to_wos(&client, "10.1145/2180861.2180863")
        .await
        .unwrap();

    assert_eq!(uid.as_deref(), Some("000123456789"));
}

#[tokio::test]
#[traced_test]
async fn test_doi_to_wos_without_match() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(xml_response(premium_search_response("search", 0, &[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_connected_client(&mock_server, false);
    let uid = paging::doi_to_wos(&client, "10.0000/none").await.unwrap();

    assert!(uid.is_none());
}

#[tokio::test]
#[traced_test]
async fn test_doi_to_wos_rejected_on_lite() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(xml_response(lite_search_response(0, &[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_connected_client(&mock_server, true);
    let result = paging::doi_to_wos(&client, "10.1145/2180861.2180863").await;

    assert!(matches!(
        result,
        Err(WosError::NotSupportedInLite {
            operation: "doi_to_wos"
        })
    ));
}

#[tokio::test]
#[traced_test]
async fn test_lite_query_reassembles_under_return() {
    let mock_server = MockServer::start().await;

    for (first, count) in [(1, 3), (4, 2)] {
        Mock::given(method("POST"))
            .and(path(SEARCH_LITE_PATH))
            .and(body_string_contains(format!(
                "<firstRecord>{first}</firstRecord><count>{count}</count>"
            )))
            .respond_with(xml_response(lite_search_response(5, &uids(first, count))))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let client = create_connected_client(&mock_server, true);

    let document = paging::query(&client, "TS=graphene", None, 5, 1, 3)
        .await
        .unwrap();
    let document = document.as_document().unwrap();
    assert!(document.starts_with("<?xml version=\"1.0\" ?>\n<return>\n"));
    assert!(document.ends_with("\n</return>"));
    assert_eq!(document.matches("<return>").count(), 1);
    assert_eq!(document.matches("<queryId>").count(), 2);

    let values = XmlPath::parse("./records/uid")
        .unwrap()
        .select(document)
        .unwrap();
    assert_eq!(values, uids(1, 5));
}

#[tokio::test]
#[traced_test]
async fn test_lite_query_extracts_values() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEARCH_LITE_PATH))
        .respond_with(xml_response(lite_search_response(2, &uids(1, 2))))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_connected_client(&mock_server, true);
    let titles = paging::query(&client, "TS=graphene", Some("./records/title/value"), 2, 1, 100)
        .await
        .unwrap()
        .into_values();

    assert_eq!(
        titles,
        vec!["Title of WOS:000000000001", "Title of WOS:000000000002"]
    );
}

#[tokio::test]
#[traced_test]
async fn test_single_empty_page_is_well_formed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(xml_response(summary_response(0)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_connected_client(&mock_server, false);
    let result = paging::single(&client, "TS=nothing", None, 10, 1).await.unwrap();

    let document = result.as_document().expect("document result");
    assert!(document.starts_with("<?xml version=\"1.0\" ?>\n<records>"));
    assert!(document.ends_with("</records>"));
    assert!(XmlPath::parse("./REC").unwrap().select(document).unwrap().is_empty());
}
