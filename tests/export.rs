//! End-to-end export tests against a mocked review listing API.

use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use steam_reviews::config::{ExportConfig, OutputConfig, RetryConfig};
use steam_reviews::{export_reviews, Error, MetricsCollector, Termination};
use tempfile::tempdir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const APP_ID: u64 = 1091500;

fn review(id: &str, language: &str, text: &str, created: i64) -> Value {
    json!({
        "recommendationid": id,
        "author": {
            "steamid": "76561198000000000",
            "num_games_owned": 120,
            "num_reviews": 4,
            "playtime_forever": 3000,
            "playtime_at_review": 1500
        },
        "language": language,
        "review": text,
        "timestamp_created": created,
        "timestamp_updated": created,
        "voted_up": true,
        "votes_up": 7,
        "votes_funny": 1,
        "weighted_vote_score": "0.5",
        "steam_purchase": true,
        "received_for_free": false,
        "written_during_early_access": false
    })
}

fn page(reviews: Vec<Value>, cursor: &str, num_reviews: u64) -> Value {
    json!({
        "success": 1,
        "query_summary": {
            "num_reviews": num_reviews,
            "review_score": 8,
            "review_score_desc": "Very Positive",
            "total_positive": 3,
            "total_negative": 0,
            "total_reviews": 3
        },
        "reviews": reviews,
        "cursor": cursor
    })
}

async fn mount_page(server: &MockServer, cursor: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/appreviews/{}", APP_ID)))
        .and(query_param("cursor", cursor))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn config(server: &MockServer, out: &Path) -> ExportConfig {
    ExportConfig {
        app_id: APP_ID,
        base_url: server.uri(),
        delay_ms: 0,
        output: OutputConfig {
            path: out.to_string_lossy().into_owned(),
            delimiter: ',',
        },
        retry: RetryConfig {
            transport_cooldown_ms: 0,
            unsuccessful_cooldown_ms: 0,
            ..RetryConfig::default()
        },
        ..ExportConfig::default()
    }
}

fn read_rows(out: &Path) -> Vec<csv::StringRecord> {
    let mut reader = csv::Reader::from_path(out).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        steam_reviews::ReviewRecord::HEADER.to_vec()
    );
    reader.records().map(|r| r.unwrap()).collect()
}

#[tokio::test]
async fn test_two_pages_exported_until_summary_is_zero() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "*",
        page(
            vec![
                review("101", "english", "  Loved it  ", 1700000000),
                review("102", "english", "Solid, with bugs", 1700000000),
            ],
            "c1",
            2,
        ),
    )
    .await;
    mount_page(
        &server,
        "c1",
        page(vec![review("103", "english", "Meh", 1600000000)], "*", 0),
    )
    .await;

    let dir = tempdir().unwrap();
    let out = dir.path().join("reviews.csv");
    let summary = export_reviews(&config(&server, &out), None).await.unwrap();

    assert_eq!(summary.counts(), (3, 3));
    assert_eq!(summary.termination, Termination::SummaryExhausted);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);

    let rows = read_rows(&out);
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][0], "Loved it");
    assert_eq!(&rows[1][0], "Solid, with bugs");
    assert_eq!(
        rows[0].iter().skip(1).collect::<Vec<_>>(),
        vec!["1", "1", "0", "7", "1", "2023-11-14", "2023-11-14", "120", "4", "3000", "1500"]
    );
    assert_eq!(&rows[2][6], "2020-09-13");
}

#[tokio::test]
async fn test_failures_retry_the_same_cursor() {
    let server = MockServer::start().await;
    let opaque = "AoJ4+/x=";
    mount_page(
        &server,
        "*",
        page(vec![review("1", "english", "first", 1700000000)], opaque, 1),
    )
    .await;

    Mock::given(method("GET"))
        .and(query_param("cursor", opaque))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("cursor", opaque))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("cursor", opaque))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": 2 })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(
        &server,
        opaque,
        page(vec![review("2", "english", "second", 1700000000)], "", 1),
    )
    .await;

    let dir = tempdir().unwrap();
    let out = dir.path().join("reviews.csv");
    let metrics = Arc::new(MetricsCollector::new());
    let summary = export_reviews(&config(&server, &out), Some(metrics.clone()))
        .await
        .unwrap();

    assert_eq!(summary.counts(), (2, 2));
    assert_eq!(summary.termination, Termination::NoCursor);
    assert_eq!(server.received_requests().await.unwrap().len(), 5);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.transport_failures, 2);
    assert_eq!(snapshot.unsuccessful_responses, 1);
    assert_eq!(snapshot.total_reviews, Some(3));

    let rows = read_rows(&out);
    assert_eq!(&rows[1][0], "second");
}

#[tokio::test]
async fn test_language_filter_and_overlapping_pages() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "*",
        page(
            vec![
                review("1", "english", "one", 1700000000),
                review("2", "schinese", "二", 1700000000),
            ],
            "c1",
            2,
        ),
    )
    .await;
    mount_page(
        &server,
        "c1",
        page(
            vec![
                review("1", "english", "one again", 1700000000),
                review("3", "english", "three", 1700000000),
            ],
            "c1",
            2,
        ),
    )
    .await;

    let dir = tempdir().unwrap();
    let out = dir.path().join("reviews.csv");
    let mut config = config(&server, &out);
    config.language = "english".to_string();

    let summary = export_reviews(&config, None).await.unwrap();
    assert_eq!(summary.counts(), (2, 4));
    assert_eq!(summary.termination, Termination::RepeatedCursor);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests
        .iter()
        .all(|r| r.url.query_pairs().any(|(k, v)| k == "language" && v == "english")));

    let texts: Vec<String> = read_rows(&out).iter().map(|r| r[0].to_string()).collect();
    assert_eq!(texts, vec!["one", "three"]);
}

#[tokio::test]
async fn test_unwritable_output_fails_before_fetching() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let out = dir.path().join("missing").join("reviews.csv");

    let err = export_reviews(&config(&server, &out), None).await.unwrap_err();
    assert!(matches!(err, Error::Io(_)), "{}", err);
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(!fs::exists(&out).unwrap());
}
