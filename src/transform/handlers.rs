// src/transform/handlers.rs
//! Per-shape transform handlers for instant values, blood pressure and exercise.

use chrono::FixedOffset;
use tracing::debug;

use super::TransformStats;
use crate::convert::Unit;
use crate::metric::MetricDescriptor;
use crate::record::{
    CanonicalHealthRecord, ExerciseDetail, LapDetail, RawPayload, RawRecord,
};
use crate::window::local_day;

pub(super) const SYSTOLIC_TYPE: &str = "blood_pressure_systolic";
pub(super) const DIASTOLIC_TYPE: &str = "blood_pressure_diastolic";

/// One value per record, stamped with the event's local date.
pub(super) fn instant(
    descriptor: &MetricDescriptor,
    records: &[RawRecord],
    offset: &FixedOffset,
    stats: &mut TransformStats,
) -> Vec<CanonicalHealthRecord> {
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        let date = record.event_time().map(|t| local_day(&t, offset));
        let value = match &record.payload {
            RawPayload::Quantity(q) => q.value_in(descriptor.unit),
            other => {
                debug!(metric = %descriptor.kind, payload = ?other, "unexpected payload for instant metric");
                None
            }
        };
        stats.push(
            &mut out,
            CanonicalHealthRecord::checked(descriptor.record_type, date, value, descriptor.unit),
        );
    }
    out
}

/// Split each reading into systolic and diastolic records. A missing
/// sub-value drops only that half.
pub(super) fn blood_pressure(
    descriptor: &MetricDescriptor,
    records: &[RawRecord],
    offset: &FixedOffset,
    stats: &mut TransformStats,
) -> Vec<CanonicalHealthRecord> {
    let mut out = Vec::with_capacity(records.len() * 2);
    for record in records {
        let date = record.event_time().map(|t| local_day(&t, offset));
        match &record.payload {
            RawPayload::BloodPressure { systolic, diastolic } => {
                for (record_type, value) in [(SYSTOLIC_TYPE, systolic), (DIASTOLIC_TYPE, diastolic)] {
                    stats.push(
                        &mut out,
                        CanonicalHealthRecord::checked(record_type, date, *value, descriptor.unit),
                    );
                }
            }
            other => {
                debug!(metric = %descriptor.kind, payload = ?other, "unexpected payload for blood pressure");
                stats.dropped += 1;
            }
        }
    }
    out
}

/// Exercise sessions: value is the session length in minutes, keyed by start date.
pub(super) fn exercise(
    descriptor: &MetricDescriptor,
    records: &[RawRecord],
    offset: &FixedOffset,
    stats: &mut TransformStats,
) -> Vec<CanonicalHealthRecord> {
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        let (RawPayload::Exercise(session), Some(start), Some(end)) =
            (&record.payload, record.start_time, record.end_time)
        else {
            debug!(metric = %descriptor.kind, "exercise record without session payload or bounds");
            stats.dropped += 1;
            continue;
        };
        if end < start {
            debug!(metric = %descriptor.kind, %start, %end, "exercise ends before it starts");
            stats.dropped += 1;
            continue;
        }
        let minutes = (end - start).num_seconds() as f64 / 60.0;
        let laps = session
            .laps
            .iter()
            .filter(|lap| lap.end >= lap.start)
            .map(|lap| LapDetail {
                start_time: lap.start,
                end_time: lap.end,
                duration_minutes: (lap.end - lap.start).num_seconds() as f64 / 60.0,
                distance_km: lap.distance.and_then(|d| d.value_in(Unit::Kilometers)),
            })
            .collect();
        let detail = ExerciseDetail {
            activity_type: session.activity_type.clone(),
            title: session.title.clone(),
            start_time: start,
            end_time: end,
            calories_kcal: session.energy.and_then(|e| e.value_in(Unit::Kilocalories)),
            distance_km: session.distance.and_then(|d| d.value_in(Unit::Kilometers)),
            laps,
        };
        let record = CanonicalHealthRecord::checked(
            descriptor.record_type,
            Some(local_day(&start, offset)),
            Some(minutes),
            descriptor.unit,
        )
        .map(|r| r.with_exercise(detail));
        stats.push(&mut out, record);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{MetricCatalog, MetricKind};
    use crate::record::{ExerciseSession, Lap, Quantity};
    use chrono::DateTime;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn descriptor(kind: MetricKind) -> MetricDescriptor {
        MetricCatalog::builtin().get(kind).unwrap().clone()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn instant_values_convert_to_canonical_unit() {
        let records = vec![
            RawRecord::instant(
                ts("2024-06-01T07:00:00Z"),
                RawPayload::Quantity(Quantity::new(0.215, Unit::Fraction)),
            ),
            RawRecord::instant(
                ts("2024-06-02T07:00:00Z"),
                RawPayload::Quantity(Quantity::missing(Unit::Fraction)),
            ),
        ];
        let mut stats = TransformStats::default();
        let out = instant(&descriptor(MetricKind::BodyFat), &records, &utc(), &mut stats);
        assert_eq!(out.len(), 1);
        assert!((out[0].value - 21.5).abs() < 1e-9);
        assert_eq!(out[0].unit, "%");
        assert_eq!(stats, TransformStats { emitted: 1, dropped: 1 });
    }

    #[test]
    fn instant_date_uses_local_day() {
        let records = vec![RawRecord::instant(
            ts("2024-06-01T23:30:00Z"),
            RawPayload::Quantity(Quantity::new(72.5, Unit::Kilograms)),
        )];
        let mut stats = TransformStats::default();
        let berlin = FixedOffset::east_opt(2 * 3600).unwrap();
        let out = instant(&descriptor(MetricKind::Weight), &records, &berlin, &mut stats);
        assert_eq!(out[0].date.to_string(), "2024-06-02");
    }

    #[test]
    fn systolic_only_reading_yields_one_record() {
        let records = vec![RawRecord::instant(
            ts("2024-06-01T07:00:00Z"),
            RawPayload::BloodPressure {
                systolic: Some(121.0),
                diastolic: None,
            },
        )];
        let mut stats = TransformStats::default();
        let out = blood_pressure(&descriptor(MetricKind::BloodPressure), &records, &utc(), &mut stats);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].record_type, SYSTOLIC_TYPE);
        assert_eq!(out[0].unit, "mmHg");
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn exercise_sessions_carry_detail() {
        let session = ExerciseSession {
            activity_type: Some("running".into()),
            title: Some("Lunch run".into()),
            energy: Some(Quantity::new(2092.0, Unit::Kilojoules)),
            distance: Some(Quantity::new(5000.0, Unit::Meters)),
            laps: vec![Lap {
                start: ts("2024-06-01T12:00:00Z"),
                end: ts("2024-06-01T12:05:00Z"),
                distance: Some(Quantity::new(1000.0, Unit::Meters)),
            }],
        };
        let records = vec![RawRecord::interval(
            ts("2024-06-01T12:00:00Z"),
            ts("2024-06-01T12:30:00Z"),
            RawPayload::Exercise(session),
        )];
        let mut stats = TransformStats::default();
        let out = exercise(&descriptor(MetricKind::Exercise), &records, &utc(), &mut stats);
        assert_eq!(out[0].value, 30.0);
        assert_eq!(out[0].unit, "min");
        let detail = out[0].exercise.as_ref().unwrap();
        assert!((detail.calories_kcal.unwrap() - 500.0).abs() < 1e-6);
        assert_eq!(detail.distance_km, Some(5.0));
        assert_eq!(detail.laps[0].duration_minutes, 5.0);
        assert_eq!(detail.laps[0].distance_km, Some(1.0));
    }

    #[test]
    fn exercise_without_end_is_dropped() {
        let records = vec![RawRecord::instant(
            ts("2024-06-01T12:00:00Z"),
            RawPayload::Exercise(ExerciseSession::default()),
        )];
        let mut stats = TransformStats::default();
        assert!(exercise(&descriptor(MetricKind::Exercise), &records, &utc(), &mut stats).is_empty());
        assert_eq!(stats.dropped, 1);
    }
}
