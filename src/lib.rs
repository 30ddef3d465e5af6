pub mod aggregator;
pub mod cli;
pub mod convert;
pub mod diagnostics;
pub mod metric;
pub mod native;
pub mod pipeline;
pub mod prefs;
pub mod record;
pub mod scheduler;
pub mod source;
pub mod sync;
pub mod transform;
pub mod window;

#[cfg(test)]
mod testing;

// Re-export tracing for use in other modules
pub use tracing;

pub use diagnostics::{DiagnosticLog, Severity};
pub use metric::{MetricCatalog, MetricDescriptor, MetricKind};
pub use pipeline::{RecordSink, ServerClient, SinkResponse, SubmitError};
pub use prefs::{FilePreferences, MemoryPreferences, PreferenceStore, SyncPreferences};
pub use record::{AggregatedRecord, CanonicalHealthRecord, RawRecord};
pub use scheduler::{run_background_tick, BackgroundFetchResult, SyncCadence, SyncTime, TaskCompletion};
pub use source::{RecordSource, SourceError};
pub use sync::{SyncEngine, SyncFailure, SyncMode, SyncResult, SyncState};
pub use window::{SyncDuration, SyncWindow};
