mod common;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use covgate_core::{CovgateError, FieldValue};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use common::{connection, spawn, with_token_endpoint};

#[tokio::test]
async fn decodes_records_with_nested_relationships() {
    let app = with_token_endpoint(Router::new().route(
        "/services/data/v60.0/query/",
        get(|| async {
            Json(json!({
                "totalSize": 1,
                "done": true,
                "records": [{
                    "attributes": { "type": "Contact", "url": "/sobjects/Contact/1" },
                    "LastName": "Smith",
                    "Account": {
                        "attributes": { "type": "Account", "url": "/sobjects/Account/1" },
                        "Name": "Acme"
                    }
                }]
            }))
        }),
    ));

    let conn = connection(&spawn(app).await);
    let cancel = CancellationToken::new();

    let records = conn
        .query_records("SELECT LastName, Account.Name FROM Contact", &cancel)
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    let contact = &records[0];
    assert_eq!(contact.sobject_type, "Contact");
    assert_eq!(contact.get_str("LastName"), Some("Smith"));

    let account = contact
        .get("Account")
        .and_then(FieldValue::as_record)
        .expect("nested record");
    assert_eq!(account.sobject_type, "Account");
    assert_eq!(account.get_str("Name"), Some("Acme"));
}

#[tokio::test]
async fn renders_structured_error_payloads() {
    let app = with_token_endpoint(Router::new().route(
        "/services/data/v60.0/query/",
        get(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!([{
                    "message": "No such column 'Bogus'",
                    "errorCode": "INVALID_FIELD"
                }])),
            )
        }),
    ));

    let conn = connection(&spawn(app).await);
    let cancel = CancellationToken::new();

    let err = conn
        .query_records("SELECT Bogus FROM Contact", &cancel)
        .await
        .unwrap_err();

    match err {
        CovgateError::Api { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "INVALID_FIELD: No such column 'Bogus'");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_record_set_is_valid() {
    let app = with_token_endpoint(Router::new().route(
        "/services/data/v60.0/query/",
        get(|| async { Json(json!({ "totalSize": 0, "done": true, "records": [] })) }),
    ));

    let conn = connection(&spawn(app).await);
    let cancel = CancellationToken::new();

    let records = conn
        .query_records("SELECT Id FROM Contact WHERE Name IN ('')", &cancel)
        .await
        .unwrap();
    assert!(records.is_empty());
}
