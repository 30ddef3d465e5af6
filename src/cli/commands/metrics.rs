use anyhow::Result;

use super::resolve_metrics;
use crate::cli::config::Config;
use crate::cli::{MetricNamesArgs, MetricsArgs, MetricsCommands};
use crate::metric::MetricCatalog;
use crate::prefs::SyncPreferences;

pub fn execute_metrics(config: &Config, args: MetricsArgs) -> Result<()> {
    let prefs = config.preferences()?;
    let catalog = MetricCatalog::builtin();

    match args.command {
        MetricsCommands::List => {
            println!("==> Metrics ({})", prefs.path().display());
            for descriptor in catalog.iter() {
                let mark = if prefs.is_metric_enabled(descriptor) { "x" } else { " " };
                println!(
                    "    [{}] {:<26} {}",
                    mark,
                    descriptor.record_type,
                    descriptor.unit.symbol()
                );
            }
        }
        MetricsCommands::Enable(MetricNamesArgs { names }) => {
            for kind in resolve_metrics(&catalog, &names)? {
                if let Some(descriptor) = catalog.get(kind) {
                    prefs.set_metric_enabled(descriptor, true);
                    println!("    enabled {}", descriptor.record_type);
                }
            }
        }
        MetricsCommands::Disable(MetricNamesArgs { names }) => {
            for kind in resolve_metrics(&catalog, &names)? {
                if let Some(descriptor) = catalog.get(kind) {
                    prefs.set_metric_enabled(descriptor, false);
                    println!("    disabled {}", descriptor.record_type);
                }
            }
        }
    }

    Ok(())
}
