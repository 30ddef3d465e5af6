// src/aggregator/mod.rs
//! Daily aggregation of raw records: sums for cumulative metrics, rounded
//! means for sampled ones, and the basal + active calorie total.

mod stats;

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate};
use tracing::{debug, warn};

use crate::metric::{MetricDescriptor, Reduction};
use crate::record::{AggregatedRecord, RawPayload, RawRecord};
use crate::window::local_day;

pub use stats::{DailyMean, DailySum};

/// Yield `(bucket time, value in the descriptor's unit)` for every usable
/// observation. Missing, non-finite, unconvertible and non-positive values
/// are dropped here.
fn observations<'a>(
    descriptor: &'a MetricDescriptor,
    records: &'a [RawRecord],
) -> impl Iterator<Item = (DateTime<FixedOffset>, f64)> + 'a {
    records.iter().flat_map(move |record| {
        let found: Vec<(DateTime<FixedOffset>, f64)> = match &record.payload {
            RawPayload::Quantity(q) => record
                .bucket_time()
                .zip(q.value_in(descriptor.unit))
                .into_iter()
                .collect(),
            RawPayload::Samples { unit, samples } => samples
                .iter()
                .filter_map(|s| {
                    let value = s.value.and_then(|v| crate::convert::convert(v, *unit, descriptor.unit))?;
                    Some((s.time, value))
                })
                .collect(),
            other => {
                debug!(metric = %descriptor.kind, payload = ?other, "payload cannot be aggregated");
                Vec::new()
            }
        };
        found.into_iter().filter(|(_, v)| v.is_finite() && *v > 0.0)
    })
}

fn rows(descriptor: &MetricDescriptor, days: BTreeMap<NaiveDate, f64>) -> Vec<AggregatedRecord> {
    days.into_iter()
        .map(|(date, value)| AggregatedRecord {
            date,
            value,
            record_type: descriptor.record_type.to_string(),
        })
        .collect()
}

/// Sum every value whose bucket falls on the same local day.
pub fn sum_by_day(
    descriptor: &MetricDescriptor,
    records: &[RawRecord],
    offset: &FixedOffset,
) -> Vec<AggregatedRecord> {
    let mut buckets: BTreeMap<NaiveDate, DailySum> = BTreeMap::new();
    for (time, value) in observations(descriptor, records) {
        buckets.entry(local_day(&time, offset)).or_default().accumulate(value);
    }
    let contributing: usize = buckets.values().map(|b| b.count).sum();
    debug!(
        metric = %descriptor.kind,
        records = records.len(),
        contributing,
        days = buckets.len(),
        "summed by day"
    );
    rows(
        descriptor,
        buckets.into_iter().map(|(d, b)| (d, b.total)).collect(),
    )
}

/// Average every value sharing a local day; each in-record sample counts once.
pub fn mean_by_day(
    descriptor: &MetricDescriptor,
    records: &[RawRecord],
    offset: &FixedOffset,
) -> Vec<AggregatedRecord> {
    let mut buckets: BTreeMap<NaiveDate, DailyMean> = BTreeMap::new();
    for (time, value) in observations(descriptor, records) {
        buckets.entry(local_day(&time, offset)).or_default().accumulate(value);
    }
    rows(
        descriptor,
        buckets
            .into_iter()
            .filter_map(|(d, m)| m.rounded().map(|v| (d, v)))
            .collect(),
    )
}

/// Reduce raw records according to the descriptor's reduction.
pub fn aggregate(
    descriptor: &MetricDescriptor,
    records: &[RawRecord],
    offset: &FixedOffset,
) -> Vec<AggregatedRecord> {
    match descriptor.reduction {
        Reduction::Sum => sum_by_day(descriptor, records, offset),
        Reduction::Mean => mean_by_day(descriptor, records, offset),
        Reduction::DerivedTotal | Reduction::None => {
            warn!(metric = %descriptor.kind, reduction = ?descriptor.reduction, "metric is not aggregated from raw records");
            Vec::new()
        }
    }
}

/// Per-day basal + active total. A day with only one constituent still
/// yields a row carrying that constituent's value.
pub fn derive_total(
    descriptor: &MetricDescriptor,
    basal: &[AggregatedRecord],
    active: &[AggregatedRecord],
) -> Vec<AggregatedRecord> {
    let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for row in basal.iter().chain(active) {
        if row.value.is_finite() && row.value > 0.0 {
            *days.entry(row.date).or_default() += row.value;
        }
    }
    rows(descriptor, days)
}
