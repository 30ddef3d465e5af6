use anyhow::Result;

use crate::cli::config::Config;
use crate::cli::StatusArgs;
use crate::metric::MetricCatalog;
use crate::prefs::SyncPreferences;
use crate::source::{Availability, GarminSource, RecordSource};

pub async fn execute_status(config: &Config, args: StatusArgs) -> Result<()> {
    let prefs = config.preferences()?;
    let catalog = MetricCatalog::builtin();

    println!("==> Server");
    println!("    url: {}/health-data", config.server_url.trim_end_matches('/'));
    println!(
        "    api key: {}",
        if config.resolve_api_key(None).is_ok() { "configured" } else { "from environment or missing" }
    );

    println!("\n==> Schedule");
    println!("    cadence: {}", prefs.load_sync_cadence());
    println!("    time: {}", prefs.load_sync_time());
    match prefs.load_last_synced() {
        Some(at) => println!("    last synced: {}", at.to_rfc3339()),
        None => println!("    last synced: never"),
    }
    if let Some(at) = prefs.load_last_attempt() {
        println!("    last attempt: {}", at.to_rfc3339());
    }

    println!("\n==> Enabled metrics");
    let enabled = prefs.enabled_metrics(&catalog);
    if enabled.is_empty() {
        println!("    none");
    }
    for kind in enabled {
        if let Some(descriptor) = catalog.get(kind) {
            println!("    {}", descriptor.record_type);
        }
    }

    println!("\n==> Garmin");
    match config.garmin() {
        Err(e) => println!("    {}", e),
        Ok(_) if args.offline => println!("    probe skipped"),
        Ok(garmin) => {
            let source = GarminSource::new(garmin)?;
            source.initialize().await;
            match source.availability() {
                Some(Availability::Available) => println!("    available"),
                Some(Availability::Unavailable { reason }) => println!("    unavailable: {}", reason),
                None => println!("    unknown"),
            }
        }
    }

    Ok(())
}
