mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use covgate_core::CovgateError;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use common::{connection, spawn, with_token_endpoint};

#[tokio::test]
async fn refreshes_token_exactly_once_on_403() {
    let data_hits = Arc::new(AtomicUsize::new(0));
    let token_hits = Arc::new(AtomicUsize::new(0));

    let app = Router::new()
        .route(
            "/services/oauth2/token",
            post({
                let token_hits = token_hits.clone();
                move || {
                    let token_hits = token_hits.clone();
                    async move {
                        token_hits.fetch_add(1, Ordering::SeqCst);
                        Json(json!({ "access_token": "token-1" }))
                    }
                }
            }),
        )
        .route(
            "/services/data/v60.0/tooling/query/",
            get({
                let data_hits = data_hits.clone();
                move || {
                    let data_hits = data_hits.clone();
                    async move {
                        if data_hits.fetch_add(1, Ordering::SeqCst) == 0 {
                            (StatusCode::FORBIDDEN, "session expired").into_response()
                        } else {
                            Json(json!({ "records": [] })).into_response()
                        }
                    }
                }
            }),
        );

    let conn = connection(&spawn(app).await);
    let cancel = CancellationToken::new();

    let records = conn
        .request_coverage(&["Class1".to_string()], &cancel)
        .await
        .unwrap();

    assert!(records.is_empty());
    assert_eq!(data_hits.load(Ordering::SeqCst), 2, "one retry after 403");
    assert_eq!(
        token_hits.load(Ordering::SeqCst),
        2,
        "initial acquisition plus one refresh"
    );
}

#[tokio::test]
async fn second_403_is_not_retried_again() {
    let data_hits = Arc::new(AtomicUsize::new(0));

    let app = with_token_endpoint(Router::new().route(
        "/services/data/v60.0/tooling/query/",
        get({
            let data_hits = data_hits.clone();
            move || {
                let data_hits = data_hits.clone();
                async move {
                    data_hits.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::FORBIDDEN, "still denied")
                }
            }
        }),
    ));

    let conn = connection(&spawn(app).await);
    let cancel = CancellationToken::new();

    let err = conn
        .request_coverage(&["Class1".to_string()], &cancel)
        .await
        .unwrap_err();

    match err {
        CovgateError::Api { status, body } => {
            assert_eq!(status, 403);
            assert!(body.contains("still denied"), "{body}");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert_eq!(data_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn non_success_status_carries_status_and_body() {
    let app = with_token_endpoint(Router::new().route(
        "/services/data/v60.0/tooling/query/",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    ));

    let conn = connection(&spawn(app).await);
    let cancel = CancellationToken::new();

    let err = conn
        .request_coverage(&["Class1".to_string()], &cancel)
        .await
        .unwrap_err();

    match err {
        CovgateError::Api { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("boom"), "{body}");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn token_endpoint_failure_is_an_auth_error() {
    let app = Router::new().route(
        "/services/oauth2/token",
        post(|| async { (StatusCode::BAD_REQUEST, "invalid_client") }),
    );

    let conn = connection(&spawn(app).await);
    let cancel = CancellationToken::new();

    let err = conn
        .request_coverage(&["Class1".to_string()], &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, CovgateError::Auth(_)), "{err:?}");
}

#[tokio::test]
async fn malformed_token_body_is_an_auth_error() {
    let app = Router::new().route(
        "/services/oauth2/token",
        post(|| async { "not json at all" }),
    );

    let conn = connection(&spawn(app).await);
    let cancel = CancellationToken::new();

    let err = conn
        .request_coverage(&["Class1".to_string()], &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, CovgateError::Auth(_)), "{err:?}");
}

#[tokio::test]
async fn canceled_call_short_circuits_without_network() {
    // Nothing is listening here; a network attempt would fail as Transport.
    let conn = connection("http://127.0.0.1:9");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = conn
        .request_coverage(&["Class1".to_string()], &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, CovgateError::Canceled), "{err:?}");
}

#[tokio::test]
async fn execute_anonymous_reports_compile_failures() {
    let app = with_token_endpoint(Router::new().route(
        "/services/data/v60.0/tooling/executeAnonymous/",
        get(|| async {
            Json(json!({
                "line": -1,
                "column": -1,
                "compiled": false,
                "success": false,
                "compileProblem": "Unexpected token",
                "exceptionStackTrace": null,
                "exceptionMessage": null
            }))
        }),
    ));

    let conn = connection(&spawn(app).await);
    let cancel = CancellationToken::new();

    let err = conn
        .execute_anonymous("System.debug('x')", &cancel)
        .await
        .unwrap_err();
    assert!(
        err.to_string().contains("didn't compile: Unexpected token"),
        "{err}"
    );
}
