use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::cli::config::{Config, API_KEY_ENV, CONFIG_FILENAME};
use crate::cli::InitArgs;

pub fn execute_init(args: InitArgs) -> Result<()> {
    if Path::new(CONFIG_FILENAME).exists() && !args.force {
        bail!(
            "{} already exists. Use --force to overwrite.",
            CONFIG_FILENAME
        );
    }

    let garmin_tokens = match &args.garmin_tokens_file {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read Garmin tokens from {}", path.display()))?
                .trim()
                .to_string(),
        ),
        None => None,
    };

    let config = Config {
        server_url: args.server_url.trim_end_matches('/').to_string(),
        api_key: None,
        garmin_url: args.garmin_url,
        garmin_user_id: args.garmin_user_id,
        garmin_tokens,
        preferences_path: args.preferences,
    };

    config.save()?;

    eprintln!("Created {}", CONFIG_FILENAME);
    eprintln!("  server_url: {}", config.server_url);
    if let Some(ref url) = config.garmin_url {
        eprintln!("  garmin_url: {}", url);
    }
    eprintln!("  preferences: {}", config.preferences_location()?.display());
    eprintln!();
    eprintln!("Next: export {}=<key> && healthsync metrics enable step", API_KEY_ENV);

    Ok(())
}
