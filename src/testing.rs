// src/testing.rs
//! In-memory source and sink shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset};
use serde_json::json;

use crate::convert::Unit;
use crate::metric::{MetricDescriptor, MetricKind};
use crate::pipeline::{RecordSink, SinkResponse, SubmitError};
use crate::record::{AggregatedRecord, CanonicalHealthRecord, Quantity, RawPayload, RawRecord};
use crate::source::{BridgeError, PermissionRequest, RecordSource, SourceError};
use crate::window::SyncWindow;

pub(crate) fn ts(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

/// One-minute step interval ending at `end`.
pub(crate) fn steps(end: &str, count: f64) -> RawRecord {
    let end = ts(end);
    RawRecord::interval(
        end - Duration::minutes(1),
        end,
        RawPayload::Quantity(Quantity::new(count, Unit::Count)),
    )
}

pub(crate) fn daily(date: &str, value: f64, record_type: &str) -> AggregatedRecord {
    AggregatedRecord {
        date: date.parse().unwrap(),
        value,
        record_type: record_type.to_string(),
    }
}

pub(crate) struct FakeSource {
    available: bool,
    grants: bool,
    records: HashMap<MetricKind, Vec<RawRecord>>,
    statistics: HashMap<MetricKind, Vec<AggregatedRecord>>,
    failing: HashSet<MetricKind>,
    unsupported: HashSet<MetricKind>,
    reads: AtomicUsize,
    prompts: AtomicUsize,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self {
            available: true,
            grants: true,
            records: HashMap::new(),
            statistics: HashMap::new(),
            failing: HashSet::new(),
            unsupported: HashSet::new(),
            reads: AtomicUsize::new(0),
            prompts: AtomicUsize::new(0),
        }
    }

    pub(crate) fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub(crate) fn denying(mut self) -> Self {
        self.grants = false;
        self
    }

    pub(crate) fn with_records(mut self, kind: MetricKind, records: Vec<RawRecord>) -> Self {
        self.records.insert(kind, records);
        self
    }

    pub(crate) fn with_statistic(mut self, kind: MetricKind, rows: Vec<AggregatedRecord>) -> Self {
        self.statistics.insert(kind, rows);
        self
    }

    pub(crate) fn failing(mut self, kind: MetricKind) -> Self {
        self.failing.insert(kind);
        self
    }

    pub(crate) fn unsupported(mut self, kind: MetricKind) -> Self {
        self.unsupported.insert(kind);
        self
    }

    pub(crate) fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn permission_prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    fn check(&self, kind: MetricKind) -> Result<(), SourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&kind) {
            return Err(SourceError::Platform(BridgeError::new(format!("{} query failed", kind))));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordSource for FakeSource {
    fn platform(&self) -> &'static str {
        "fake"
    }

    async fn initialize(&self) -> bool {
        self.available
    }

    fn supports_metric(&self, kind: MetricKind) -> bool {
        !self.unsupported.contains(&kind)
    }

    fn supports_statistic(&self, kind: MetricKind) -> bool {
        self.statistics.contains_key(&kind)
    }

    async fn request_permissions(&self, _requests: &[PermissionRequest]) -> bool {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.grants
    }

    async fn try_read_records(
        &self,
        kind: MetricKind,
        _window: &SyncWindow,
    ) -> Result<Vec<RawRecord>, SourceError> {
        self.check(kind)?;
        Ok(self.records.get(&kind).cloned().unwrap_or_default())
    }

    async fn try_read_aggregated_statistic(
        &self,
        descriptor: &MetricDescriptor,
        _window: &SyncWindow,
    ) -> Result<Vec<AggregatedRecord>, SourceError> {
        self.check(descriptor.kind)?;
        Ok(self.statistics.get(&descriptor.kind).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    batches: Mutex<Vec<Vec<CanonicalHealthRecord>>>,
    fail_with: Option<u16>,
}

impl RecordingSink {
    pub(crate) fn failing(status: u16) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            fail_with: Some(status),
        }
    }

    pub(crate) fn batches(&self) -> Vec<Vec<CanonicalHealthRecord>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSink for RecordingSink {
    async fn submit(&self, batch: &[CanonicalHealthRecord]) -> Result<SinkResponse, SubmitError> {
        self.batches.lock().unwrap().push(batch.to_vec());
        match self.fail_with {
            Some(status) => Err(SubmitError::Http {
                status,
                endpoint: "memory".to_string(),
                body: "unavailable".to_string(),
            }),
            None => Ok(SinkResponse {
                status: 200,
                submitted: batch.len(),
                body: json!({"accepted": batch.len()}),
            }),
        }
    }
}
