use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::prefs::FilePreferences;
use crate::source::GarminConfig;

pub const CONFIG_FILENAME: &str = ".healthsync.toml";
pub const API_KEY_ENV: &str = "HEALTHSYNC_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub server_url: String,
    /// Prefer the HEALTHSYNC_API_KEY env var over storing the key here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garmin_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garmin_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garmin_tokens: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences_path: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_config_from_path(CONFIG_FILENAME)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(CONFIG_FILENAME)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Key from the command line or env, falling back to the config file.
    pub fn resolve_api_key(&self, from_args: Option<String>) -> Result<String> {
        match from_args.or_else(|| self.api_key.clone()) {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => bail!(
                "No API key configured. Set {} or pass --api-key.",
                API_KEY_ENV
            ),
        }
    }

    pub fn garmin(&self) -> Result<GarminConfig> {
        let base_url = self
            .garmin_url
            .clone()
            .context("garmin_url is not set; run 'healthsync init --garmin-url <url>'")?;
        Ok(GarminConfig {
            base_url,
            user_id: self.garmin_user_id.clone().unwrap_or_default(),
            tokens: self.garmin_tokens.clone().unwrap_or_default(),
        })
    }

    pub fn preferences_location(&self) -> Result<PathBuf> {
        match &self.preferences_path {
            Some(path) => Ok(path.clone()),
            None => Ok(FilePreferences::default_path()?),
        }
    }

    pub fn preferences(&self) -> Result<FilePreferences> {
        Ok(FilePreferences::open(self.preferences_location()?))
    }
}

pub fn load_config_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Invalid config in {}", path.as_ref().display()))?;
    Ok(config)
}

pub fn try_load_config() -> Option<Config> {
    Config::load().ok()
}
