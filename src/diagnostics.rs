// src/diagnostics.rs
//! Fire-and-forget diagnostic log capability.
//!
//! The on-device log store is an external collaborator; the engine only calls
//! `add_log`. Implementations must never fail the caller.

use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

/// Injected logging side channel
pub trait DiagnosticLog: Send + Sync {
    fn add_log(&self, message: &str, severity: Severity);
}

/// Forwards diagnostics to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLog;

impl DiagnosticLog for TracingLog {
    fn add_log(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Debug => tracing::debug!(target: "healthsync::diagnostics", "{}", message),
            Severity::Info => tracing::info!(target: "healthsync::diagnostics", "{}", message),
            Severity::Warn => tracing::warn!(target: "healthsync::diagnostics", "{}", message),
            Severity::Error => tracing::error!(target: "healthsync::diagnostics", "{}", message),
        }
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLog;

impl DiagnosticLog for NoopLog {
    fn add_log(&self, _message: &str, _severity: Severity) {}
}

impl<T: DiagnosticLog + ?Sized> DiagnosticLog for Arc<T> {
    fn add_log(&self, message: &str, severity: Severity) {
        (**self).add_log(message, severity)
    }
}
