use anyhow::{bail, Result};
use chrono::Local;
use serde_json::json;

use super::resolve_metrics;
use crate::cli::config::Config;
use crate::cli::SyncArgs;
use crate::metric::MetricCatalog;
use crate::pipeline::{RecordSink, ServerClient, SinkResponse, SubmitError};
use crate::prefs::SyncPreferences;
use crate::record::CanonicalHealthRecord;
use crate::source::GarminSource;
use crate::sync::{SyncEngine, SyncResult};
use crate::window::SyncDuration;

/// Accepts every batch without sending it anywhere.
struct DryRunSink;

#[async_trait::async_trait]
impl RecordSink for DryRunSink {
    async fn submit(&self, batch: &[CanonicalHealthRecord]) -> Result<SinkResponse, SubmitError> {
        Ok(SinkResponse {
            status: 0,
            submitted: batch.len(),
            body: json!({ "dry_run": true }),
        })
    }
}

pub async fn execute_sync(config: &Config, args: SyncArgs) -> Result<()> {
    let duration: SyncDuration = args.duration.parse()?;
    let catalog = MetricCatalog::builtin();
    let enabled = if args.metrics.is_empty() {
        config.preferences()?.enabled_metrics(&catalog)
    } else {
        resolve_metrics(&catalog, &args.metrics)?
    };
    if enabled.is_empty() {
        bail!("No metrics enabled. Run 'healthsync metrics enable <type>' first.");
    }

    let source = GarminSource::new(config.garmin()?)?;
    let now = Local::now().fixed_offset();
    println!("==> Syncing {} metrics over {}", enabled.len(), duration);

    let result = if args.dry_run {
        SyncEngine::new(source, DryRunSink)
            .sync(&enabled, duration, now)
            .await
    } else {
        let client = ServerClient::new(&config.server_url, config.resolve_api_key(args.api_key)?)?;
        SyncEngine::new(source, client)
            .sync(&enabled, duration, now)
            .await
    };

    print_result(&result);
    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&result.batch)?);
    }
    if let Some(failure) = result.failure {
        bail!("Sync failed: {}", failure);
    }
    Ok(())
}

pub(crate) fn print_result(result: &SyncResult) {
    if let Some(window) = result.window {
        println!("    window: {} .. {}", window.start().to_rfc3339(), window.end().to_rfc3339());
    }
    println!("    state: {}", result.state.as_str());
    for (record_type, count) in &result.per_type_counts {
        println!("    {}: {}", record_type, count);
    }
    for error in &result.per_type_errors {
        println!("    {}: ERROR {}", error.metric, error.message);
    }
    println!(
        "    transformed: {}, submitted: {}",
        result.transformed_count, result.submitted_count
    );
}
