// src/pipeline/sender.rs
use std::sync::Arc;

use serde_json::Value;

use super::client::SubmitError;
use crate::record::CanonicalHealthRecord;

/// What the server answered to a submitted batch
#[derive(Clone, Debug, PartialEq)]
pub struct SinkResponse {
    pub status: u16,
    pub submitted: usize,
    /// Parsed JSON body, or the raw text as a string when not JSON
    pub body: Value,
}

/// Trait for submitting canonical batches (abstracts the HTTP client)
#[async_trait::async_trait]
pub trait RecordSink: Send + Sync {
    async fn submit(&self, batch: &[CanonicalHealthRecord]) -> Result<SinkResponse, SubmitError>;
}

#[async_trait::async_trait]
impl<T: RecordSink + ?Sized> RecordSink for Arc<T> {
    async fn submit(&self, batch: &[CanonicalHealthRecord]) -> Result<SinkResponse, SubmitError> {
        (**self).submit(batch).await
    }
}
