// src/transform/sleep.rs
//! Sleep sessions.
//!
//! Stage intervals (one record per stage) are merged into sessions when they
//! come from the same source and the gap between them is at most
//! `SLEEP_SESSION_GAP_MINUTES`. Records that already describe a whole session
//! keep their own bounds.

use chrono::{DateTime, Duration, FixedOffset};
use tracing::debug;

use super::TransformStats;
use crate::metric::MetricDescriptor;
use crate::record::{
    CanonicalHealthRecord, RawPayload, RawRecord, SleepDetail, SleepStage, SleepStageEvent,
    StageMinutes,
};
use crate::window::local_day;

/// Largest gap, in minutes, between stages of one session
pub const SLEEP_SESSION_GAP_MINUTES: i64 = 30;

#[derive(Debug)]
struct Session {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    source: Option<String>,
    events: Vec<SleepStageEvent>,
}

impl Session {
    fn add_event(&mut self, stage: SleepStage, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) {
        self.start = self.start.min(start);
        self.end = self.end.max(end);
        self.events.push(SleepStageEvent {
            stage,
            start_time: start,
            end_time: end,
            duration_in_seconds: (end - start).num_seconds(),
        });
    }

    fn into_record(mut self, descriptor: &MetricDescriptor, offset: &FixedOffset) -> Option<CanonicalHealthRecord> {
        self.events.sort_by_key(|e| e.start_time);
        let mut stage_minutes = StageMinutes::default();
        for event in &self.events {
            stage_minutes.add(event.stage, event.duration_in_seconds as f64 / 60.0);
        }
        let total_minutes = (self.end - self.start).num_seconds() as f64 / 60.0;
        let time_asleep_minutes = if self.events.is_empty() {
            total_minutes
        } else {
            stage_minutes.time_asleep()
        };
        let detail = SleepDetail {
            bedtime: self.start,
            wake_time: self.end,
            source: self.source,
            time_asleep_minutes,
            stage_minutes,
            stage_events: self.events,
        };
        CanonicalHealthRecord::checked(
            descriptor.record_type,
            Some(local_day(&self.start, offset)),
            Some(total_minutes),
            descriptor.unit,
        )
        .map(|r| r.with_sleep(detail))
    }
}

/// Build one canonical record per sleep session.
pub(super) fn sessions(
    descriptor: &MetricDescriptor,
    records: &[RawRecord],
    offset: &FixedOffset,
    stats: &mut TransformStats,
) -> Vec<CanonicalHealthRecord> {
    let mut whole: Vec<Session> = Vec::new();
    let mut stages: Vec<(SleepStage, DateTime<FixedOffset>, DateTime<FixedOffset>, Option<String>)> = Vec::new();

    for record in records {
        let (Some(start), Some(end)) = (record.start_time, record.end_time) else {
            stats.dropped += 1;
            continue;
        };
        if end < start {
            stats.dropped += 1;
            continue;
        }
        match &record.payload {
            RawPayload::SleepStage(stage) => stages.push((*stage, start, end, record.source.clone())),
            RawPayload::SleepSession { stages: segments } => {
                let mut session = Session {
                    start,
                    end,
                    source: record.source.clone(),
                    events: Vec::new(),
                };
                for segment in segments.iter().filter(|s| s.end >= s.start) {
                    session.add_event(segment.stage, segment.start, segment.end);
                }
                whole.push(session);
            }
            other => {
                debug!(payload = ?other, "unexpected payload for sleep");
                stats.dropped += 1;
            }
        }
    }

    // Sources never share a session, so overlapping devices are not double counted.
    stages.sort_by(|a, b| a.3.cmp(&b.3).then(a.1.cmp(&b.1)));
    let mut merged: Vec<Session> = Vec::new();
    for (stage, start, end, source) in stages {
        match merged.last_mut() {
            Some(current)
                if current.source == source
                    && start - current.end <= Duration::minutes(SLEEP_SESSION_GAP_MINUTES) =>
            {
                current.add_event(stage, start, end);
            }
            _ => {
                let mut session = Session {
                    start,
                    end,
                    source,
                    events: Vec::new(),
                };
                session.add_event(stage, start, end);
                merged.push(session);
            }
        }
    }
    debug!(sessions = merged.len() + whole.len(), "built sleep sessions");

    let mut all: Vec<Session> = whole.into_iter().chain(merged).collect();
    all.sort_by_key(|s| s.start);
    let mut out = Vec::with_capacity(all.len());
    for session in all {
        stats.push(&mut out, session.into_record(descriptor, offset));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{MetricCatalog, MetricKind};
    use crate::record::StageSegment;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn descriptor() -> MetricDescriptor {
        MetricCatalog::builtin().get(MetricKind::Sleep).unwrap().clone()
    }

    fn stage(stage: SleepStage, start: &str, end: &str) -> RawRecord {
        RawRecord::interval(ts(start), ts(end), RawPayload::SleepStage(stage))
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn contiguous_stages_merge_into_one_session() {
        let records = vec![
            stage(SleepStage::Light, "2024-06-01T23:00:00Z", "2024-06-02T01:00:00Z"),
            stage(SleepStage::Deep, "2024-06-02T01:00:00Z", "2024-06-02T02:00:00Z"),
            stage(SleepStage::Awake, "2024-06-02T02:20:00Z", "2024-06-02T02:30:00Z"),
            stage(SleepStage::Rem, "2024-06-02T02:30:00Z", "2024-06-02T03:00:00Z"),
        ];
        let mut stats = TransformStats::default();
        let out = sessions(&descriptor(), &records, &utc(), &mut stats);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].date.to_string(), "2024-06-01");
        assert_eq!(out[0].value, 240.0);
        let detail = out[0].sleep.as_ref().unwrap();
        assert_eq!(detail.stage_events.len(), 4);
        assert_eq!(detail.stage_minutes.deep, 60.0);
        assert_eq!(detail.time_asleep_minutes, 210.0);
    }

    #[test]
    fn gap_over_threshold_starts_new_session() {
        let records = vec![
            stage(SleepStage::Asleep, "2024-06-01T23:00:00Z", "2024-06-02T06:00:00Z"),
            stage(SleepStage::Asleep, "2024-06-02T13:00:00Z", "2024-06-02T13:40:00Z"),
        ];
        let mut stats = TransformStats::default();
        let out = sessions(&descriptor(), &records, &utc(), &mut stats);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].value, 40.0);
        assert_eq!(out[1].date.to_string(), "2024-06-02");
    }

    #[test]
    fn whole_sessions_keep_bounds_and_stages() {
        let record = RawRecord::interval(
            ts("2024-06-01T22:00:00Z"),
            ts("2024-06-02T06:00:00Z"),
            RawPayload::SleepSession {
                stages: vec![StageSegment {
                    stage: SleepStage::Rem,
                    start: ts("2024-06-02T03:00:00Z"),
                    end: ts("2024-06-02T03:45:00Z"),
                }],
            },
        )
        .with_source("com.fitbit");
        let mut stats = TransformStats::default();
        let out = sessions(&descriptor(), &[record], &utc(), &mut stats);
        assert_eq!(out[0].value, 480.0);
        let detail = out[0].sleep.as_ref().unwrap();
        assert_eq!(detail.stage_minutes.rem, 45.0);
        assert_eq!(detail.source.as_deref(), Some("com.fitbit"));
    }

    #[test]
    fn session_without_stages_counts_all_as_asleep() {
        let record = RawRecord::interval(
            ts("2024-06-01T00:00:00Z"),
            ts("2024-06-01T07:30:00Z"),
            RawPayload::SleepSession { stages: Vec::new() },
        );
        let mut stats = TransformStats::default();
        let out = sessions(&descriptor(), &[record], &utc(), &mut stats);
        assert_eq!(out[0].sleep.as_ref().unwrap().time_asleep_minutes, 450.0);
    }

    #[test]
    fn overlapping_sources_form_separate_sessions() {
        let records = vec![
            stage(SleepStage::Deep, "2024-06-01T23:00:00Z", "2024-06-02T01:00:00Z").with_source("watch"),
            stage(SleepStage::Deep, "2024-06-01T23:10:00Z", "2024-06-02T01:00:00Z").with_source("ring"),
            stage(SleepStage::Rem, "2024-06-02T01:00:00Z", "2024-06-02T02:00:00Z").with_source("watch"),
            stage(SleepStage::Light, "2024-06-02T01:00:00Z", "2024-06-02T01:30:00Z").with_source("ring"),
        ];
        let mut stats = TransformStats::default();
        let out = sessions(&descriptor(), &records, &utc(), &mut stats);
        assert_eq!(out.len(), 2);
        for record in &out {
            let detail = record.sleep.as_ref().unwrap();
            assert_eq!(detail.stage_events.len(), 2);
            match detail.source.as_deref() {
                Some("watch") => {
                    assert_eq!(detail.stage_minutes.deep, 120.0);
                    assert_eq!(record.value, 180.0);
                }
                Some("ring") => {
                    assert_eq!(detail.stage_minutes.deep, 110.0);
                    assert_eq!(record.value, 140.0);
                }
                other => panic!("unexpected source {:?}", other),
            }
        }
    }

    #[test]
    fn records_without_bounds_are_dropped() {
        let record = RawRecord::instant(ts("2024-06-01T00:00:00Z"), RawPayload::SleepStage(SleepStage::Deep));
        let mut stats = TransformStats::default();
        assert!(sessions(&descriptor(), &[record], &utc(), &mut stats).is_empty());
        assert_eq!(stats.dropped, 1);
    }
}
