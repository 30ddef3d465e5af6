pub mod commands;
pub mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "healthsync")]
#[command(about = "Sync daily health metrics to a fitness server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a .healthsync.toml in the current directory
    Init(InitArgs),
    /// Run a foreground sync over a duration
    Sync(SyncArgs),
    /// Run one background wake-up (for cron or launchd)
    Tick(TickArgs),
    /// List, enable or disable metrics
    Metrics(MetricsArgs),
    /// Show or change the background schedule
    Schedule(ScheduleArgs),
    /// Show configuration, schedule and source availability
    Status(StatusArgs),
}

#[derive(clap::Args)]
pub struct InitArgs {
    /// Fitness server base URL (records are posted to {url}/health-data)
    #[arg(long)]
    pub server_url: String,

    /// Garmin microservice base URL
    #[arg(long)]
    pub garmin_url: Option<String>,

    /// Garmin user id passed to the microservice
    #[arg(long)]
    pub garmin_user_id: Option<String>,

    /// File containing the serialized Garmin session tokens
    #[arg(long)]
    pub garmin_tokens_file: Option<PathBuf>,

    /// Preference file location (defaults to the user config directory)
    #[arg(long)]
    pub preferences: Option<PathBuf>,

    /// Overwrite an existing config
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args)]
pub struct SyncArgs {
    /// Window to sync: today, 24h, 3d, 7d, 30d or 90d
    #[arg(long, default_value = "7d")]
    pub duration: String,

    /// Sync these metrics instead of the enabled ones (repeatable)
    #[arg(long = "metric")]
    pub metrics: Vec<String>,

    /// Print the batch as JSON instead of submitting it
    #[arg(long)]
    pub dry_run: bool,

    /// Server API key
    #[arg(long, env = "HEALTHSYNC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(clap::Args)]
pub struct TickArgs {
    /// Server API key
    #[arg(long, env = "HEALTHSYNC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(clap::Args)]
pub struct MetricsArgs {
    #[command(subcommand)]
    pub command: MetricsCommands,
}

#[derive(Subcommand)]
pub enum MetricsCommands {
    /// List every metric and whether it is enabled
    List,
    /// Enable metrics by type (e.g. step, heart_rate)
    Enable(MetricNamesArgs),
    /// Disable metrics by type
    Disable(MetricNamesArgs),
}

#[derive(clap::Args)]
pub struct MetricNamesArgs {
    #[arg(required = true)]
    pub names: Vec<String>,
}

#[derive(clap::Args)]
pub struct ScheduleArgs {
    /// Background cadence: 1h, 4h or 24h
    #[arg(long)]
    pub cadence: Option<String>,

    /// Local time of day the slot opens, HH:MM
    #[arg(long)]
    pub time: Option<String>,
}

#[derive(clap::Args)]
pub struct StatusArgs {
    /// Skip probing the Garmin service
    #[arg(long)]
    pub offline: bool,
}
