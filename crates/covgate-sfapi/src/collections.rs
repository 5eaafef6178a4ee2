use covgate_core::{BatchError, BatchFailure, Result, SObject};
use futures::future::join_all;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::connection::{transport, Connection};

/// Maximum records per sObject Collections call, fixed by the platform.
pub const BATCH_SIZE: usize = 200;

#[derive(Serialize)]
struct CollectionsRequest<'a> {
    #[serde(rename = "allOrNone")]
    all_or_none: bool,
    records: &'a [SObject],
}

/// Per-record outcome of a collections create call.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CollectionsResponse {
    #[serde(default)]
    pub id: String,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<CollectionsError>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CollectionsError {
    #[serde(rename = "statusCode")]
    pub status_code: String,
    pub message: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Outcome of one bulk write: per-batch response lists positionally aligned
/// with batch order, plus the batches that failed outright. A failed batch
/// keeps an empty response slot and is described in `failures`.
#[derive(Debug)]
pub struct BulkWriteReport {
    pub batches: Vec<Vec<CollectionsResponse>>,
    pub failures: Vec<BatchFailure>,
}

impl BulkWriteReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold batch failures into an error, discarding partial responses.
    pub fn into_result(self) -> Result<Vec<Vec<CollectionsResponse>>> {
        if self.failures.is_empty() {
            Ok(self.batches)
        } else {
            Err(BatchError {
                failures: self.failures,
            }
            .into())
        }
    }
}

impl Connection {
    /// Create records via the sObject Collections API in concurrent batches
    /// of at most 200.
    ///
    /// `all_or_none` is honored by the platform only within a batch: if a
    /// later batch fails, earlier successful batches are not rolled back.
    /// A batch failure neither cancels nor blocks the other in-flight
    /// batches; every batch is attempted and reported independently.
    pub async fn collections_create(
        &self,
        all_or_none: bool,
        records: &[SObject],
        cancel: &CancellationToken,
    ) -> Result<BulkWriteReport> {
        let url = self.data_url("composite/sobjects");

        // Serialize every batch body up front; a serialization failure is
        // fatal before anything is sent.
        let mut bodies = Vec::with_capacity(records.len().div_ceil(BATCH_SIZE));
        for chunk in records.chunks(BATCH_SIZE) {
            bodies.push(serde_json::to_vec(&CollectionsRequest {
                all_or_none,
                records: chunk,
            })?);
        }

        let total = records.len();
        let tasks = bodies.into_iter().enumerate().map(|(i, body)| {
            let url = url.clone();
            async move {
                let from = i * BATCH_SIZE;
                let to = (from + BATCH_SIZE).min(total);
                (i, from, to, self.create_batch(&url, body, cancel).await)
            }
        });

        let mut batches = Vec::new();
        let mut failures = Vec::new();
        let results = join_all(tasks).await;
        batches.resize(results.len(), Vec::new());
        for (i, from, to, outcome) in results {
            match outcome {
                Ok(responses) => batches[i] = responses,
                Err(e) => failures.push(BatchFailure {
                    batch: i,
                    from,
                    to,
                    reason: e.to_string(),
                }),
            }
        }

        info!(
            batches = batches.len(),
            failed = failures.len(),
            "bulk create finished"
        );
        Ok(BulkWriteReport { batches, failures })
    }

    async fn create_batch(
        &self,
        url: &str,
        body: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<Vec<CollectionsResponse>> {
        let req = self
            .http()
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .build()
            .map_err(transport)?;

        let resp = self.send(req, cancel).await?;
        Ok(serde_json::from_slice(&resp)?)
    }
}
