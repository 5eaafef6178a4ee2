use covgate_core::{CovgateError, Result, SObject};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::connection::{transport, Connection};

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default = "Vec::new")]
    records: Vec<SObject>,
}

/// Structured error payload the query endpoint returns alongside a
/// non-success status.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryError {
    pub message: String,
    #[serde(rename = "errorCode")]
    pub error_code: String,
}

impl Connection {
    /// Run one SOQL query against the data API and decode the `records`
    /// array into polymorphic records; nested attribute-carrying objects
    /// recurse into the same shape.
    pub async fn query_records(
        &self,
        soql: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<SObject>> {
        let req = self
            .http()
            .get(self.data_url("query/"))
            .query(&[("q", soql)])
            .header(CONTENT_TYPE, "application/json")
            .build()
            .map_err(transport)?;

        let body = match self.send(req, cancel).await {
            Ok(body) => body,
            // The endpoint wraps failures in a [{message, errorCode}] array;
            // surface those fields when the body parses as one.
            Err(CovgateError::Api { status, body }) => {
                if let Ok(errors) = serde_json::from_str::<Vec<QueryError>>(&body) {
                    if let Some(first) = errors.first() {
                        return Err(CovgateError::Api {
                            status,
                            body: format!("{}: {}", first.error_code, first.message),
                        });
                    }
                }
                return Err(CovgateError::Api { status, body });
            }
            Err(e) => return Err(e),
        };

        let resp: QueryResponse = serde_json::from_slice(&body)?;
        debug!(records = resp.records.len(), "query decoded");
        Ok(resp.records)
    }
}
