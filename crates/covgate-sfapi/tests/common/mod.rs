#![allow(dead_code)]

use axum::routing::post;
use axum::{Json, Router};
use covgate_core::OrgConfig;
use covgate_sfapi::Connection;
use serde_json::json;

/// Serve `router` on an ephemeral port and return the base URL.
pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Add a token endpoint that always hands out the same token.
pub fn with_token_endpoint(router: Router) -> Router {
    router.route(
        "/services/oauth2/token",
        post(|| async { Json(json!({ "access_token": "token-1" })) }),
    )
}

pub fn connection(base_url: &str) -> Connection {
    let cfg: OrgConfig = serde_json::from_value(json!({
        "apiVersion": "60.0",
        "baseUrl": base_url,
        "clientId": "id",
        "clientSecret": "secret",
    }))
    .unwrap();
    Connection::new(cfg).unwrap()
}
