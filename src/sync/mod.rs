// src/sync/mod.rs
//! Sync orchestration: one pass over the enabled metrics.
//!
//! A pass moves through `Idle -> ComputingWindow -> PerMetricLoop ->
//! Submitting -> {Completed | Failed}`. Per-metric failures are collected and
//! the loop continues; only unavailability, refused permissions and transport
//! errors fail the pass as a whole.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregator::{aggregate, derive_total};
use crate::diagnostics::{DiagnosticLog, Severity, TracingLog};
use crate::metric::{MetricCatalog, MetricDescriptor, MetricKind, Reduction};
use crate::pipeline::{RecordSink, SinkResponse};
use crate::record::{AggregatedRecord, CanonicalHealthRecord};
use crate::source::{PermissionRequest, RecordSource, SourceError};
use crate::transform::{transform_aggregated, transform_records, TransformOutput};
use crate::window::{SyncDuration, SyncWindow, WindowError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    ComputingWindow,
    PerMetricLoop,
    Submitting,
    Completed,
    Failed,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::ComputingWindow => "computing_window",
            SyncState::PerMetricLoop => "per_metric_loop",
            SyncState::Submitting => "submitting",
            SyncState::Completed => "completed",
            SyncState::Failed => "failed",
        }
    }
}

/// Foreground runs may prompt for permissions; background runs never do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncMode {
    Foreground,
    Background,
}

/// Reason a whole pass failed.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SyncFailure {
    #[error("invalid sync window: {0}")]
    Window(#[from] WindowError),
    #[error("{platform} health data is not available on this device")]
    Unavailable { platform: &'static str },
    #[error("health data access was not granted; allow access in {platform} settings and try again")]
    PermissionDenied { platform: &'static str },
    #[error("failed to send health data to the server: {0}")]
    Transport(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetricError {
    pub metric: MetricKind,
    pub message: String,
}

/// Outcome of one pass. Always a fresh value.
#[derive(Clone, Debug)]
pub struct SyncResult {
    pub state: SyncState,
    pub success: bool,
    pub window: Option<SyncWindow>,
    pub transformed_count: usize,
    pub submitted_count: usize,
    /// Canonical records produced per wire `type`
    pub per_type_counts: BTreeMap<String, usize>,
    pub per_type_errors: Vec<MetricError>,
    pub failure: Option<SyncFailure>,
    pub response: Option<SinkResponse>,
    /// What was (or would have been) submitted
    pub batch: Vec<CanonicalHealthRecord>,
}

impl SyncResult {
    fn new(window: Option<SyncWindow>) -> Self {
        Self {
            state: SyncState::Idle,
            success: false,
            window,
            transformed_count: 0,
            submitted_count: 0,
            per_type_counts: BTreeMap::new(),
            per_type_errors: Vec::new(),
            failure: None,
            response: None,
            batch: Vec::new(),
        }
    }

    fn fail(mut self, failure: SyncFailure) -> Self {
        self.state = SyncState::Failed;
        self.success = false;
        self.failure = Some(failure);
        self
    }

    fn complete(mut self) -> Self {
        self.state = SyncState::Completed;
        self.success = true;
        self
    }
}

pub struct SyncEngine<S, K> {
    source: S,
    sink: K,
    catalog: MetricCatalog,
    log: Arc<dyn DiagnosticLog>,
}

impl<S: RecordSource, K: RecordSink> SyncEngine<S, K> {
    pub fn new(source: S, sink: K) -> Self {
        Self {
            source,
            sink,
            catalog: MetricCatalog::builtin(),
            log: Arc::new(TracingLog),
        }
    }

    pub fn with_catalog(mut self, catalog: MetricCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_log(mut self, log: Arc<dyn DiagnosticLog>) -> Self {
        self.log = log;
        self
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Foreground sync over a duration token ending at `now`.
    #[tracing::instrument(
        name = "health_sync",
        skip(self, enabled, now),
        fields(platform = self.source.platform(), metrics = enabled.len())
    )]
    pub async fn sync(
        &self,
        enabled: &[MetricKind],
        duration: SyncDuration,
        now: DateTime<FixedOffset>,
    ) -> SyncResult {
        transition(SyncState::ComputingWindow);
        match SyncWindow::resolve(duration, now) {
            Ok(window) => self.sync_window(enabled, window, SyncMode::Foreground).await,
            Err(e) => {
                let result = SyncResult::new(None).fail(SyncFailure::from(e));
                self.report(&result);
                result
            }
        }
    }

    /// Sync an already computed window.
    pub async fn sync_window(
        &self,
        enabled: &[MetricKind],
        window: SyncWindow,
        mode: SyncMode,
    ) -> SyncResult {
        let mut result = SyncResult::new(Some(window));
        debug!(start = %window.start(), end = %window.end(), ?mode, "window resolved");

        let mut kinds: Vec<MetricKind> = Vec::with_capacity(enabled.len());
        for kind in enabled {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        if kinds.is_empty() {
            info!("no metrics enabled, nothing to sync");
            let result = result.complete();
            self.report(&result);
            return result;
        }

        let platform = self.source.platform();
        if !self.source.initialize().await {
            let result = result.fail(SyncFailure::Unavailable { platform });
            self.report(&result);
            return result;
        }
        if mode == SyncMode::Foreground {
            let requests: Vec<PermissionRequest> =
                kinds.iter().copied().map(PermissionRequest::read).collect();
            if !self.source.request_permissions(&requests).await {
                let result = result.fail(SyncFailure::PermissionDenied { platform });
                self.report(&result);
                return result;
            }
        }

        transition(SyncState::PerMetricLoop);
        for kind in kinds {
            match self.collect_metric(kind, &window).await {
                Ok(output) => {
                    debug!(
                        metric = %kind,
                        emitted = output.stats.emitted,
                        dropped = output.stats.dropped,
                        "metric transformed"
                    );
                    for record in &output.records {
                        *result
                            .per_type_counts
                            .entry(record.record_type.clone())
                            .or_default() += 1;
                    }
                    result.batch.extend(output.records);
                }
                Err(e) => {
                    warn!(metric = %kind, error = %e, "metric sync failed, continuing");
                    self.log
                        .add_log(&format!("{} sync failed: {}", kind, e), Severity::Warn);
                    result.per_type_errors.push(MetricError {
                        metric: kind,
                        message: e.to_string(),
                    });
                }
            }
        }
        result.transformed_count = result.batch.len();

        transition(SyncState::Submitting);
        if result.batch.is_empty() {
            info!("no records in window, skipping submit");
            let result = result.complete();
            self.report(&result);
            return result;
        }

        let submitted = self.sink.submit(&result.batch).await;
        let result = match submitted {
            Ok(response) => {
                result.submitted_count = result.batch.len();
                result.response = Some(response);
                result.complete()
            }
            Err(e) => result.fail(SyncFailure::Transport(e.to_string())),
        };
        self.report(&result);
        result
    }

    async fn collect_metric(
        &self,
        kind: MetricKind,
        window: &SyncWindow,
    ) -> Result<TransformOutput, SourceError> {
        let descriptor = self.descriptor(kind)?;
        if !self.source.supports_metric(kind) {
            return Err(SourceError::Unsupported {
                metric: kind,
                platform: self.source.platform(),
            });
        }

        match descriptor.reduction {
            Reduction::Sum | Reduction::Mean => {
                let rows = self.daily_rows(descriptor, window).await?;
                Ok(transform_aggregated(descriptor, &rows))
            }
            Reduction::DerivedTotal => {
                let mut parts: Vec<Vec<AggregatedRecord>> = Vec::new();
                for part in kind.constituents() {
                    let part_descriptor = self.descriptor(*part)?;
                    parts.push(self.daily_rows(part_descriptor, window).await?);
                }
                let (basal, active) = match parts.as_slice() {
                    [basal, active] => (basal.as_slice(), active.as_slice()),
                    _ => (&[][..], &[][..]),
                };
                let rows = derive_total(descriptor, basal, active);
                Ok(transform_aggregated(descriptor, &rows))
            }
            Reduction::None => {
                let records = self.source.try_read_records(kind, window).await?;
                Ok(transform_records(descriptor, &records, &window.offset()))
            }
        }
    }

    /// Native daily statistic when the platform has one, otherwise raw records
    /// reduced per local day.
    async fn daily_rows(
        &self,
        descriptor: &MetricDescriptor,
        window: &SyncWindow,
    ) -> Result<Vec<AggregatedRecord>, SourceError> {
        let kind = descriptor.kind;
        if descriptor.native_statistic && self.source.supports_statistic(kind) {
            let rows = self.source.try_read_aggregated_statistic(descriptor, window).await?;
            // Statistic rows may carry the platform's identifier; the wire type wins.
            return Ok(rows
                .into_iter()
                .map(|row| AggregatedRecord {
                    record_type: descriptor.record_type.to_string(),
                    ..row
                })
                .collect());
        }
        let records = self.source.try_read_records(kind, window).await?;
        Ok(aggregate(descriptor, &records, &window.offset()))
    }

    fn descriptor(&self, kind: MetricKind) -> Result<&MetricDescriptor, SourceError> {
        self.catalog.get(kind).ok_or(SourceError::Unsupported {
            metric: kind,
            platform: self.source.platform(),
        })
    }

    fn report(&self, result: &SyncResult) {
        transition(result.state);
        let message = match &result.failure {
            None => format!(
                "Sync completed: {} records transformed, {} submitted, {} metric errors",
                result.transformed_count,
                result.submitted_count,
                result.per_type_errors.len()
            ),
            Some(failure) => format!("Sync failed: {}", failure),
        };
        let severity = if result.success {
            Severity::Info
        } else {
            Severity::Error
        };
        self.log.add_log(&message, severity);
    }
}

fn transition(state: SyncState) {
    debug!(state = state.as_str(), "sync state");
}
