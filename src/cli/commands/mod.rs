mod init;
mod metrics;
mod schedule;
mod status;
mod sync;
mod tick;

pub use init::execute_init;
pub use metrics::execute_metrics;
pub use schedule::execute_schedule;
pub use status::execute_status;
pub use sync::execute_sync;
pub use tick::execute_tick;

use anyhow::{Context, Result};

use crate::metric::{MetricCatalog, MetricKind};

/// Map user-supplied metric names (wire type or record identifier) to kinds.
pub(crate) fn resolve_metrics(catalog: &MetricCatalog, names: &[String]) -> Result<Vec<MetricKind>> {
    names
        .iter()
        .map(|name| {
            catalog
                .find(name)
                .map(|d| d.kind)
                .with_context(|| format!("Unknown metric '{}'. Run 'healthsync metrics list'.", name))
        })
        .collect()
}
