use anyhow::{bail, Result};
use chrono::Local;
use tracing::info;

use crate::cli::config::Config;
use crate::cli::TickArgs;
use crate::pipeline::ServerClient;
use crate::scheduler::{run_background_tick, BackgroundFetchResult};
use crate::source::GarminSource;
use crate::sync::SyncEngine;

pub async fn execute_tick(config: &Config, args: TickArgs) -> Result<()> {
    let prefs = config.preferences()?;
    let source = GarminSource::new(config.garmin()?)?;
    let client = ServerClient::new(&config.server_url, config.resolve_api_key(args.api_key)?)?;
    let engine = SyncEngine::new(source, client);

    let completion = |result: BackgroundFetchResult| info!(?result, "background task complete");
    let outcome = run_background_tick(&engine, &prefs, Local::now().fixed_offset(), &completion).await;

    match outcome {
        BackgroundFetchResult::NewData => println!("new data submitted"),
        BackgroundFetchResult::NoData => println!("nothing to sync"),
        BackgroundFetchResult::Failed => bail!("Background sync failed; see log output"),
    }
    Ok(())
}
