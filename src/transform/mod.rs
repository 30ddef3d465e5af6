// src/transform/mod.rs
//! Maps aggregated rows and raw records into canonical wire records.
//!
//! Raw-record transforms dispatch through a table keyed by record identifier.
//! Identifiers without a handler are logged and skipped.

mod handlers;
mod sleep;

use std::collections::HashMap;

use chrono::FixedOffset;
use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::metric::{MetricDescriptor, MetricKind};
use crate::record::{AggregatedRecord, CanonicalHealthRecord, RawRecord};

pub use sleep::SLEEP_SESSION_GAP_MINUTES;

/// Emitted vs. dropped counts for one transform call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransformStats {
    pub emitted: usize,
    pub dropped: usize,
}

impl TransformStats {
    pub(crate) fn push(&mut self, out: &mut Vec<CanonicalHealthRecord>, record: Option<CanonicalHealthRecord>) {
        match record {
            Some(r) => {
                self.emitted += 1;
                out.push(r);
            }
            None => self.dropped += 1,
        }
    }
}

#[derive(Debug, Default)]
pub struct TransformOutput {
    pub records: Vec<CanonicalHealthRecord>,
    pub stats: TransformStats,
}

type Handler = fn(&MetricDescriptor, &[RawRecord], &FixedOffset, &mut TransformStats) -> Vec<CanonicalHealthRecord>;

static HANDLERS: Lazy<HashMap<&'static str, Handler>> = Lazy::new(|| {
    let mut table: HashMap<&'static str, Handler> = HashMap::new();
    for kind in [
        MetricKind::Weight,
        MetricKind::Height,
        MetricKind::BodyFat,
        MetricKind::BloodGlucose,
        MetricKind::OxygenSaturation,
        MetricKind::RestingHeartRate,
        MetricKind::RespiratoryRate,
        MetricKind::Vo2Max,
        MetricKind::LeanBodyMass,
        MetricKind::HeartRateVariability,
        MetricKind::Stress,
        MetricKind::BodyBattery,
    ] {
        table.insert(kind.id(), handlers::instant as Handler);
    }
    table.insert(MetricKind::BloodPressure.id(), handlers::blood_pressure);
    table.insert(MetricKind::Exercise.id(), handlers::exercise);
    table.insert(MetricKind::Workout.id(), handlers::exercise);
    table.insert(MetricKind::Sleep.id(), sleep::sessions);
    table
});

/// Whether raw records of this metric can be transformed directly.
pub fn has_handler(kind: MetricKind) -> bool {
    HANDLERS.contains_key(kind.id())
}

/// Pass-through for per-day rows, attaching the descriptor's unit.
pub fn transform_aggregated(descriptor: &MetricDescriptor, rows: &[AggregatedRecord]) -> TransformOutput {
    let mut output = TransformOutput::default();
    for row in rows {
        let record = CanonicalHealthRecord::checked(
            row.record_type.clone(),
            Some(row.date),
            Some(row.value),
            descriptor.unit,
        );
        output.stats.push(&mut output.records, record);
    }
    output
}

/// Transform raw records of a non-cumulative metric.
pub fn transform_records(
    descriptor: &MetricDescriptor,
    records: &[RawRecord],
    offset: &FixedOffset,
) -> TransformOutput {
    let Some(handler) = HANDLERS.get(descriptor.id()) else {
        warn!(metric = %descriptor.kind, records = records.len(), "no transform for metric, skipping");
        return TransformOutput {
            records: Vec::new(),
            stats: TransformStats {
                emitted: 0,
                dropped: records.len(),
            },
        };
    };
    let mut stats = TransformStats::default();
    let records = handler(descriptor, records, offset, &mut stats);
    if stats.dropped > 0 {
        debug!(metric = %descriptor.kind, emitted = stats.emitted, dropped = stats.dropped, "dropped unusable records");
    }
    TransformOutput { records, stats }
}
