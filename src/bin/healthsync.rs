use anyhow::Context;
use clap::Parser;
use healthsync::cli::{commands, config, Cli, Commands};

/// Load config or error with helpful message
fn require_config() -> anyhow::Result<config::Config> {
    config::Config::load().with_context(|| {
        format!(
            "No {} found. Run 'healthsync init --server-url <url>' first.",
            config::CONFIG_FILENAME
        )
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    healthsync::native::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init(args) => commands::execute_init(args)?,
        Commands::Sync(args) => commands::execute_sync(&require_config()?, args).await?,
        Commands::Tick(args) => commands::execute_tick(&require_config()?, args).await?,
        Commands::Metrics(args) => commands::execute_metrics(&require_config()?, args)?,
        Commands::Schedule(args) => commands::execute_schedule(&require_config()?, args)?,
        Commands::Status(args) => commands::execute_status(&require_config()?, args).await?,
    }

    Ok(())
}
