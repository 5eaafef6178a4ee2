mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use covgate_core::SObject;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use common::{connection, spawn, with_token_endpoint};

fn make_records(n: usize) -> Vec<SObject> {
    (0..n)
        .map(|i| SObject::new("Account").field("Name", format!("Test{i}")))
        .collect()
}

fn success_responses(n: usize) -> Value {
    let responses: Vec<Value> = (0..n)
        .map(|i| json!({ "id": format!("001{i:03}"), "success": true, "errors": [] }))
        .collect();
    Value::Array(responses)
}

fn collections_app(handler_fails_small_batch: bool, saw_all_or_none: Arc<AtomicBool>) -> Router {
    with_token_endpoint(Router::new().route(
        "/services/data/v60.0/composite/sobjects",
        post(move |Json(body): Json<Value>| {
            let saw_all_or_none = saw_all_or_none.clone();
            async move {
                if body["allOrNone"].as_bool() == Some(true) {
                    saw_all_or_none.store(true, Ordering::SeqCst);
                }
                let count = body["records"].as_array().map_or(0, Vec::len);
                if handler_fails_small_batch && count < 200 {
                    return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
                        .into_response();
                }
                Json(success_responses(count)).into_response()
            }
        }),
    ))
}

#[tokio::test]
async fn splits_250_records_into_two_batches() {
    let app = collections_app(false, Arc::new(AtomicBool::new(false)));
    let conn = connection(&spawn(app).await);
    let cancel = CancellationToken::new();

    let report = conn
        .collections_create(false, &make_records(250), &cancel)
        .await
        .unwrap();

    assert!(report.is_success());
    let lengths: Vec<usize> = report.batches.iter().map(Vec::len).collect();
    assert_eq!(lengths, vec![200, 50]);
}

#[tokio::test]
async fn exact_multiple_produces_no_empty_batch() {
    let app = collections_app(false, Arc::new(AtomicBool::new(false)));
    let conn = connection(&spawn(app).await);
    let cancel = CancellationToken::new();

    let report = conn
        .collections_create(false, &make_records(400), &cancel)
        .await
        .unwrap();

    let lengths: Vec<usize> = report.batches.iter().map(Vec::len).collect();
    assert_eq!(lengths, vec![200, 200]);
}

#[tokio::test]
async fn failed_batch_is_isolated_and_reported() {
    // The 50-record batch fails; the 200-record batch must keep its results.
    let app = collections_app(true, Arc::new(AtomicBool::new(false)));
    let conn = connection(&spawn(app).await);
    let cancel = CancellationToken::new();

    let report = conn
        .collections_create(false, &make_records(250), &cancel)
        .await
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.batches[0].len(), 200);
    assert!(report.batches[1].is_empty());

    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.batch, 1);
    assert_eq!((failure.from, failure.to), (200, 250));
    assert!(failure.reason.contains("500"), "{}", failure.reason);

    let err = report.into_result().unwrap_err();
    assert!(err.to_string().contains("batch 1"), "{err}");
}

#[tokio::test]
async fn all_or_none_flag_reaches_the_wire() {
    let saw = Arc::new(AtomicBool::new(false));
    let app = collections_app(false, saw.clone());
    let conn = connection(&spawn(app).await);
    let cancel = CancellationToken::new();

    conn.collections_create(true, &make_records(3), &cancel)
        .await
        .unwrap();
    assert!(saw.load(Ordering::SeqCst));
}

#[tokio::test]
async fn empty_record_set_issues_no_batches() {
    let conn = connection("http://127.0.0.1:9");
    let cancel = CancellationToken::new();

    let report = conn
        .collections_create(false, &[], &cancel)
        .await
        .unwrap();
    assert!(report.batches.is_empty());
    assert!(report.is_success());
}
