// src/source/mod.rs
//! Platform record sources.
//!
//! Every health backend implements [`RecordSource`]. The orchestrator only
//! sees this trait; the concrete adapter is picked when the engine is built.

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::metric::{MetricDescriptor, MetricKind};
use crate::record::{AggregatedRecord, RawRecord};
use crate::window::{SyncWindow, WindowError};

pub mod garmin;
pub mod health_connect;
pub mod healthkit;

pub use garmin::{GarminConfig, GarminSource};
pub use health_connect::{HealthConnectBridge, HealthConnectSource};
pub use healthkit::{HealthKitBridge, HealthKitSource};

/// Error reported by a native SDK bridge.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct BridgeError(pub String);

impl BridgeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("health store not initialized; call initialize() first")]
    NotInitialized,
    #[error("{metric} is not supported by {platform}")]
    Unsupported {
        metric: MetricKind,
        platform: &'static str,
    },
    #[error("platform error: {0}")]
    Platform(#[from] BridgeError),
    #[error("http error: {0}")]
    Http(String),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error(transparent)]
    Window(#[from] WindowError),
}

/// Outcome of `initialize()`, stored inside each adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable { reason: String },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PermissionRequest {
    pub metric: MetricKind,
    pub access: Access,
}

impl PermissionRequest {
    pub fn read(metric: MetricKind) -> Self {
        Self {
            metric,
            access: Access::Read,
        }
    }
}

/// Contract shared by all platform adapters.
///
/// The `try_*` reads report failures; the provided `read_*` methods are the
/// fail-soft form that logs and returns an empty list, so one broken metric
/// never aborts a sync.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Short platform name for logs and error messages
    fn platform(&self) -> &'static str;

    /// Check platform availability. Idempotent; must run before any read.
    async fn initialize(&self) -> bool;

    /// Whether raw records (or a derivation) exist for this metric on this platform.
    fn supports_metric(&self, kind: MetricKind) -> bool;

    /// Whether the platform offers native deduplicated daily statistics for this metric.
    fn supports_statistic(&self, kind: MetricKind) -> bool;

    /// May prompt the user. True when the request round-trip completed; some
    /// platforms never report per-item grants.
    async fn request_permissions(&self, requests: &[PermissionRequest]) -> bool;

    async fn try_read_records(
        &self,
        kind: MetricKind,
        window: &SyncWindow,
    ) -> Result<Vec<RawRecord>, SourceError>;

    /// Native per-day totals, with rows typed and converted per `descriptor`.
    async fn try_read_aggregated_statistic(
        &self,
        descriptor: &MetricDescriptor,
        window: &SyncWindow,
    ) -> Result<Vec<AggregatedRecord>, SourceError>;

    async fn read_records(&self, kind: MetricKind, window: &SyncWindow) -> Vec<RawRecord> {
        match self.try_read_records(kind, window).await {
            Ok(records) => records,
            Err(e) => {
                warn!(platform = self.platform(), metric = %kind, error = %e, "read failed, returning no records");
                Vec::new()
            }
        }
    }

    async fn read_aggregated_statistic(
        &self,
        descriptor: &MetricDescriptor,
        window: &SyncWindow,
    ) -> Vec<AggregatedRecord> {
        match self.try_read_aggregated_statistic(descriptor, window).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(platform = self.platform(), metric = %descriptor.kind, error = %e, "statistic read failed, returning no rows");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl<T: RecordSource + ?Sized> RecordSource for std::sync::Arc<T> {
    fn platform(&self) -> &'static str {
        (**self).platform()
    }

    async fn initialize(&self) -> bool {
        (**self).initialize().await
    }

    fn supports_metric(&self, kind: MetricKind) -> bool {
        (**self).supports_metric(kind)
    }

    fn supports_statistic(&self, kind: MetricKind) -> bool {
        (**self).supports_statistic(kind)
    }

    async fn request_permissions(&self, requests: &[PermissionRequest]) -> bool {
        (**self).request_permissions(requests).await
    }

    async fn try_read_records(
        &self,
        kind: MetricKind,
        window: &SyncWindow,
    ) -> Result<Vec<RawRecord>, SourceError> {
        (**self).try_read_records(kind, window).await
    }

    async fn try_read_aggregated_statistic(
        &self,
        descriptor: &MetricDescriptor,
        window: &SyncWindow,
    ) -> Result<Vec<AggregatedRecord>, SourceError> {
        (**self).try_read_aggregated_statistic(descriptor, window).await
    }
}

/// Derived metrics are supported when every constituent is.
pub(crate) fn supports_via_constituents(kind: MetricKind, supports: impl Fn(MetricKind) -> bool) -> bool {
    let parts = kind.constituents();
    !parts.is_empty() && parts.iter().all(|part| supports(*part))
}
