use anyhow::{Context, Result};

use crate::cli::config::Config;
use crate::cli::ScheduleArgs;
use crate::prefs::SyncPreferences;
use crate::scheduler::{SyncCadence, SyncTime};

pub fn execute_schedule(config: &Config, args: ScheduleArgs) -> Result<()> {
    let prefs = config.preferences()?;

    if let Some(raw) = args.cadence {
        let cadence: SyncCadence = raw.parse().context("Invalid --cadence")?;
        prefs.save_sync_cadence(cadence);
    }
    if let Some(raw) = args.time {
        let time: SyncTime = raw.parse().context("Invalid --time")?;
        prefs.save_sync_time(time);
    }

    println!("==> Background schedule");
    println!("    cadence: {}", prefs.load_sync_cadence());
    println!("    time: {}", prefs.load_sync_time());
    match prefs.load_last_synced() {
        Some(at) => println!("    last synced: {}", at.to_rfc3339()),
        None => println!("    last synced: never"),
    }

    Ok(())
}
