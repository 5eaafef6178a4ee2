use std::time::Duration;

use covgate_core::{CovgateError, OrgConfig, Result};
use parking_lot::RwLock;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Request, Response, StatusCode};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Authenticated request executor for one org.
///
/// Owns the HTTP client and a cached bearer token. The token cache is the
/// only shared mutable state in the API layer; it is never held across an
/// await, so a `Connection` can be shared freely between concurrent callers.
pub struct Connection {
    cfg: OrgConfig,
    http: Client,
    token: RwLock<Option<String>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl Connection {
    pub fn new(cfg: OrgConfig) -> Result<Self> {
        cfg.validate()?;
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(transport)?;
        Ok(Self {
            cfg,
            http,
            token: RwLock::new(None),
        })
    }

    pub fn api_version(&self) -> &str {
        &self.cfg.api_version
    }

    pub fn base_url(&self) -> &str {
        &self.cfg.base_url
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Versioned data-API URL: `{base}/services/data/v{ver}/{suffix}`.
    pub(crate) fn data_url(&self, suffix: &str) -> String {
        format!(
            "{}/services/data/v{}/{}",
            self.cfg.base_url, self.cfg.api_version, suffix
        )
    }

    /// Execute a prepared request with a bearer token attached and return the
    /// response body bytes.
    ///
    /// On HTTP 403 the token is refreshed exactly once and the request
    /// retried exactly once; the retry's response is then authoritative. Any
    /// other non-success status surfaces as `Api` with the status code and
    /// body so callers can decode structured error payloads.
    pub async fn send(&self, mut req: Request, cancel: &CancellationToken) -> Result<Vec<u8>> {
        if cancel.is_cancelled() {
            return Err(CovgateError::Canceled);
        }

        let token = self.access_token(cancel).await?;
        // Clone before the body is consumed by the first attempt.
        let retry_req = req.try_clone();
        set_bearer(&mut req, &token)?;

        let mut resp = self.execute(req, cancel).await?;

        if resp.status() == StatusCode::FORBIDDEN {
            if let Some(mut retry) = retry_req {
                warn!("authorization failure, refreshing token and retrying once");
                let fresh = self.refresh_token(cancel).await?;
                set_bearer(&mut retry, &fresh)?;
                resp = self.execute(retry, cancel).await?;
            }
        }

        let status = resp.status();
        let body = resp.bytes().await.map_err(transport)?;
        if status.is_success() {
            Ok(body.to_vec())
        } else {
            Err(CovgateError::Api {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            })
        }
    }

    async fn access_token(&self, cancel: &CancellationToken) -> Result<String> {
        if let Some(token) = self.token.read().clone() {
            return Ok(token);
        }
        self.refresh_token(cancel).await
    }

    /// Acquire a fresh token and store it. Concurrent refreshes each perform
    /// their own (idempotent) exchange; last writer wins with a whole value.
    async fn refresh_token(&self, cancel: &CancellationToken) -> Result<String> {
        let token = self.token_client_credentials(cancel).await?;
        *self.token.write() = Some(token.clone());
        Ok(token)
    }

    async fn token_client_credentials(&self, cancel: &CancellationToken) -> Result<String> {
        debug!("requesting access token via client credentials");
        let req = self
            .http
            .post(format!("{}/services/oauth2/token", self.cfg.base_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.cfg.client_id.as_str()),
                ("client_secret", self.cfg.client_secret.as_str()),
            ])
            .build()
            .map_err(transport)?;

        let resp = self.execute(req, cancel).await?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(CovgateError::Auth(format!(
                "token request returned {}",
                status.as_u16()
            )));
        }

        let body = resp.bytes().await.map_err(transport)?;
        let token: TokenResponse = serde_json::from_slice(&body)
            .map_err(|e| CovgateError::Auth(format!("malformed token response: {e}")))?;
        Ok(token.access_token)
    }

    async fn execute(&self, req: Request, cancel: &CancellationToken) -> Result<Response> {
        tokio::select! {
            _ = cancel.cancelled() => Err(CovgateError::Canceled),
            res = self.http.execute(req) => res.map_err(transport),
        }
    }
}

fn set_bearer(req: &mut Request, token: &str) -> Result<()> {
    let value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| CovgateError::Auth(format!("invalid token value: {e}")))?;
    req.headers_mut().insert(AUTHORIZATION, value);
    Ok(())
}

pub(crate) fn transport(e: reqwest::Error) -> CovgateError {
    CovgateError::Transport(e.to_string())
}
